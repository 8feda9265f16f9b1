use std::fmt;
use std::time::Duration;

/// The four scheduled activities an arena owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    ReadinessProbe,
    AutoStart,
    RoundCadence,
    Hazard,
}

impl TimerKind {
    pub const ALL: [TimerKind; 4] = [
        TimerKind::ReadinessProbe,
        TimerKind::AutoStart,
        TimerKind::RoundCadence,
        TimerKind::Hazard,
    ];
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerKind::ReadinessProbe => "readiness_probe",
            TimerKind::AutoStart => "auto_start",
            TimerKind::RoundCadence => "round_cadence",
            TimerKind::Hazard => "hazard",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Pending { fire_at: Duration },
    Repeating { next_at: Duration, period: Duration },
}

/// A single cancellable schedule slot, driven by an external clock.
///
/// `seq` records submission order so timers due at the same instant fire in
/// the order they were scheduled.
#[derive(Debug, Clone)]
pub struct Timer {
    state: TimerState,
    seq: u64,
    cancellations: u32,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            seq: 0,
            cancellations: 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Replace any existing schedule with a one-shot.
    pub fn schedule_once(&mut self, fire_at: Duration, seq: u64) {
        self.state = TimerState::Pending { fire_at };
        self.seq = seq;
    }

    /// Replace any existing schedule with a repeating timer whose first run is `first_at`.
    pub fn schedule_repeating(&mut self, first_at: Duration, period: Duration, seq: u64) {
        self.state = TimerState::Repeating {
            next_at: first_at,
            period,
        };
        self.seq = seq;
    }

    /// Returns whether anything was actually cancelled. Safe to call repeatedly.
    pub fn cancel(&mut self) -> bool {
        if self.state == TimerState::Idle {
            return false;
        }
        self.state = TimerState::Idle;
        self.cancellations += 1;
        true
    }

    pub fn is_active(&self) -> bool {
        self.state != TimerState::Idle
    }

    pub fn due_at(&self) -> Option<Duration> {
        match self.state {
            TimerState::Idle => None,
            TimerState::Pending { fire_at } => Some(fire_at),
            TimerState::Repeating { next_at, .. } => Some(next_at),
        }
    }

    pub fn is_due(&self, now: Duration) -> bool {
        self.due_at().is_some_and(|at| at <= now)
    }

    /// Mark one firing. One-shots go idle; repeating timers move to the next
    /// period after `now`, so missed periods are skipped rather than replayed.
    pub fn consume(&mut self, now: Duration) {
        match self.state {
            TimerState::Idle => {},
            TimerState::Pending { .. } => self.state = TimerState::Idle,
            TimerState::Repeating { period, .. } => {
                self.state = TimerState::Repeating {
                    next_at: now + period,
                    period,
                };
            },
        }
    }

    /// How many times an active schedule was cancelled.
    pub fn cancellations(&self) -> u32 {
        self.cancellations
    }
}
