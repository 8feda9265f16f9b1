use std::time::Duration;

use crate::events::MatchEvent;
use crate::phase::Phase;
use crate::registry::ParticipantRegistry;
use crate::world::WorldPort;

/// Mutable state for one running match: the world, the participants, the
/// phase, the match clock, and an outbox of emitted events.
///
/// Passed explicitly to the arena controller; nothing is global.
pub struct MatchContext<W: WorldPort> {
    pub world: W,
    pub registry: ParticipantRegistry,
    phase: Phase,
    now: Duration,
    /// A reset moved us to `PreGameplay`; the next arena readiness may re-open the lobby.
    awaiting_lobby: bool,
    events: Vec<MatchEvent>,
}

impl<W: WorldPort> MatchContext<W> {
    pub fn new(world: W) -> Self {
        Self {
            world,
            registry: ParticipantRegistry::new(),
            phase: Phase::CreatingArena,
            now: Duration::ZERO,
            awaiting_lobby: false,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Advance the match clock. The clock never runs backwards.
    pub fn set_now(&mut self, now: Duration) {
        if now > self.now {
            self.now = now;
        }
    }

    /// Step forward one phase. Returns false (and changes nothing) for any
    /// transition that is not a single forward step.
    pub fn advance_phase(&mut self, next: Phase) -> bool {
        let old = self.phase;
        if !old.can_advance_to(next) {
            tracing::debug!(%old, %next, "Ignoring illegal phase transition");
            return false;
        }
        self.set_phase(next);
        true
    }

    /// Open the lobby after an arena became ready. Legal from `CreatingArena`,
    /// or from `PreGameplay` when a reset is waiting for its new arena.
    pub fn enter_lobby(&mut self) -> bool {
        let from_reset = self.awaiting_lobby && self.phase == Phase::PreGameplay;
        if self.phase != Phase::CreatingArena && !from_reset {
            tracing::debug!(phase = %self.phase, "Lobby can only open for a fresh arena");
            return false;
        }
        self.awaiting_lobby = false;
        self.set_phase(Phase::Lobby);
        true
    }

    /// Begin a new match: joining closes immediately and the lobby re-opens
    /// once the replacement arena is ready.
    pub fn begin_reset(&mut self) {
        self.awaiting_lobby = true;
        if self.phase != Phase::PreGameplay {
            self.set_phase(Phase::PreGameplay);
        }
    }

    pub fn can_join(&self) -> bool {
        self.phase.allows_joining()
    }

    pub fn emit(&mut self, event: MatchEvent) {
        self.events.push(event);
    }

    /// Events emitted since the last drain.
    pub fn pending_events(&self) -> &[MatchEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<MatchEvent> {
        std::mem::take(&mut self.events)
    }

    fn set_phase(&mut self, next: Phase) {
        let old = self.phase;
        self.phase = next;
        tracing::info!(%old, new = %next, "Phase changed");
        self.emit(MatchEvent::PhaseChanged { old, new: next });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeWorld;

    fn phase_changes(ctx: &mut MatchContext<FakeWorld>) -> Vec<(Phase, Phase)> {
        ctx.drain_events()
            .into_iter()
            .filter_map(|e| match e {
                MatchEvent::PhaseChanged { old, new } => Some((old, new)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn forward_path_emits_each_change() {
        let mut ctx = MatchContext::new(FakeWorld::new());
        assert!(ctx.enter_lobby());
        assert!(ctx.advance_phase(Phase::PreGameplay));
        assert!(ctx.advance_phase(Phase::Gameplay));
        assert_eq!(
            phase_changes(&mut ctx),
            vec![
                (Phase::CreatingArena, Phase::Lobby),
                (Phase::Lobby, Phase::PreGameplay),
                (Phase::PreGameplay, Phase::Gameplay),
            ]
        );
    }

    #[test]
    fn backwards_and_skipping_transitions_are_rejected() {
        let mut ctx = MatchContext::new(FakeWorld::new());
        assert!(!ctx.advance_phase(Phase::Gameplay));
        assert!(ctx.enter_lobby());
        assert!(!ctx.enter_lobby());
        assert!(!ctx.advance_phase(Phase::CreatingArena));
        assert_eq!(ctx.phase(), Phase::Lobby);
    }

    #[test]
    fn reset_goes_to_pre_gameplay_then_lobby() {
        let mut ctx = MatchContext::new(FakeWorld::new());
        ctx.enter_lobby();
        ctx.advance_phase(Phase::PreGameplay);
        ctx.advance_phase(Phase::Gameplay);
        ctx.drain_events();

        ctx.begin_reset();
        assert_eq!(ctx.phase(), Phase::PreGameplay);
        assert!(!ctx.can_join());
        assert!(ctx.enter_lobby());
        assert!(ctx.can_join());
        assert_eq!(
            phase_changes(&mut ctx),
            vec![
                (Phase::Gameplay, Phase::PreGameplay),
                (Phase::PreGameplay, Phase::Lobby),
            ]
        );
    }

    #[test]
    fn pre_gameplay_without_reset_cannot_reopen_lobby() {
        let mut ctx = MatchContext::new(FakeWorld::new());
        ctx.enter_lobby();
        ctx.advance_phase(Phase::PreGameplay);
        assert!(!ctx.enter_lobby());
    }

    #[test]
    fn clock_is_monotonic() {
        let mut ctx = MatchContext::new(FakeWorld::new());
        ctx.set_now(Duration::from_secs(5));
        ctx.set_now(Duration::from_secs(3));
        assert_eq!(ctx.now(), Duration::from_secs(5));
    }
}
