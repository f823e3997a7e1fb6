//! Who is responsible for damage that did not come straight from a player's hands.

use std::collections::BTreeMap;

use web_time::{Duration, Instant};

use crate::player::PlayerSnapshot;
use crate::{Config, EffectId, PlayerId, TrapId, UserId};

/// The resolved owner of an area effect, as seen by one potential target.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution<T: Config> {
    /// Effect that created this entry.
    pub effect: EffectId,
    /// Responsible player. May be disconnected.
    pub actor: PlayerSnapshot<T>,
    /// Team the actor held when the effect was created.
    pub team: T::Team,
    /// Creation time.
    pub created_at: Instant,
}

impl<T: Config> Attribution<T> {
    /// Account id of the responsible player.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.actor.user_id
    }
}

/// A player who triggered a trap, and until when the trap's damage is charged to them.
#[derive(Debug, Clone, PartialEq)]
pub struct TrapTrigger<T: Config> {
    /// Triggering player at trigger time.
    pub player: PlayerSnapshot<T>,
    /// Trigger time. Expiry tasks compare against this.
    pub triggered_at: Instant,
    /// End of the attribution window.
    pub expires_at: Instant,
}

/// Indirect attribution entries keyed by potential target, plus trap triggers keyed by trap.
#[derive(Debug, Clone)]
pub struct AttributionStore<T: Config> {
    entries: BTreeMap<PlayerId, Attribution<T>>,
    traps: BTreeMap<TrapId, TrapTrigger<T>>,
}

impl<T: Config> Default for AttributionStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Config> AttributionStore<T> {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            traps: BTreeMap::new(),
        }
    }

    /// Points `target` at `attribution`, replacing any older entry.
    pub fn attribute(&mut self, target: PlayerId, attribution: Attribution<T>) {
        self.entries.insert(target, attribution);
    }

    /// The entry for `target`.
    #[must_use]
    pub fn get(&self, target: PlayerId) -> Option<&Attribution<T>> {
        self.entries.get(&target)
    }

    /// Removes the entries of `targets` that still point at `actor`.
    ///
    /// Entries overwritten by a newer effect from someone else are left alone.
    pub fn release(
        &mut self,
        targets: impl IntoIterator<Item = PlayerId>,
        actor: &UserId,
    ) -> usize {
        let mut removed = 0;
        for target in targets {
            if self
                .entries
                .get(&target)
                .is_some_and(|a| a.user_id() == actor)
            {
                self.entries.remove(&target);
                removed += 1;
            }
        }
        removed
    }

    /// Number of attribution entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no attribution entries and no trap triggers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.traps.is_empty()
    }

    /// Charges `trap` to `player` for `window`. Returns the trigger time for expiry.
    pub fn trigger_trap(
        &mut self,
        trap: TrapId,
        player: PlayerSnapshot<T>,
        now: Instant,
        window: Duration,
    ) -> Instant {
        self.traps.insert(
            trap,
            TrapTrigger {
                player,
                triggered_at: now,
                expires_at: now + window,
            },
        );
        now
    }

    /// The live trigger for `trap`.
    #[must_use]
    pub fn trap(&self, trap: TrapId, now: Instant) -> Option<&TrapTrigger<T>> {
        self.traps.get(&trap).filter(|t| now < t.expires_at)
    }

    /// Removes the trigger for `trap` if it is the one from `triggered_at`.
    pub fn expire_trap(&mut self, trap: TrapId, triggered_at: Instant) -> bool {
        if self
            .traps
            .get(&trap)
            .is_some_and(|t| t.triggered_at == triggered_at)
        {
            self.traps.remove(&trap);
            return true;
        }
        false
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &Attribution<T>> {
        self.entries.values()
    }
}
