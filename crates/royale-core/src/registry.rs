use std::collections::HashMap;

use crate::participant::{AvatarRef, Participant, ParticipantId};
use crate::world::WorldPort;

/// Everyone who has issued a command this match, in join order.
///
/// Liveness queries take the world by reference and ask it every time;
/// nothing here caches whether an avatar is alive.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: Vec<Participant>,
    index: HashMap<ParticipantId, usize>,
    next_join_order: u64,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.index.get(id).map(|&i| &self.participants[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.index.get(id).map(|&i| &mut self.participants[i])
    }

    /// Look up a participant, registering them on first contact.
    pub fn get_or_create(&mut self, id: &str, display_name: Option<&str>) -> &mut Participant {
        let idx = match self.index.get(id) {
            Some(&i) => i,
            None => {
                let participant =
                    Participant::new(id, display_name.map(str::to_string), self.next_join_order);
                self.next_join_order += 1;
                self.participants.push(participant);
                let i = self.participants.len() - 1;
                self.index.insert(id.to_string(), i);
                tracing::debug!(participant = id, "Registered participant");
                i
            },
        };
        &mut self.participants[idx]
    }

    /// All participants in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|p| p.id.clone()).collect()
    }

    pub fn is_alive(&self, id: &str, world: &impl WorldPort) -> bool {
        self.get(id)
            .and_then(|p| p.avatar)
            .is_some_and(|avatar| world.is_avatar_alive(avatar))
    }

    pub fn living<'a>(&'a self, world: &'a impl WorldPort) -> impl Iterator<Item = &'a Participant> {
        self.participants
            .iter()
            .filter(move |p| p.avatar.is_some_and(|a| world.is_avatar_alive(a)))
    }

    pub fn living_count(&self, world: &impl WorldPort) -> usize {
        self.living(world).count()
    }

    /// The surviving participant with the lowest join order, if any.
    pub fn last_remaining<'a>(&'a self, world: &'a impl WorldPort) -> Option<&'a Participant> {
        self.living(world).min_by_key(|p| p.join_order)
    }

    pub fn owner_of(&self, avatar: AvatarRef) -> Option<&Participant> {
        self.participants.iter().find(|p| p.avatar == Some(avatar))
    }

    pub fn record_kill(&mut self, id: &str) {
        if let Some(p) = self.get_mut(id) {
            p.kills += 1;
        }
    }

    /// Drop every participant. Join order keeps counting so it stays unique
    /// for the lifetime of the registry.
    pub fn remove_all(&mut self) {
        self.participants.clear();
        self.index.clear();
    }
}
