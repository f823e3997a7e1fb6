//! Team and role each player held right before their most recent death.

use std::collections::BTreeMap;

use web_time::{Duration, Instant};

use crate::{Config, PlayerId};

/// What a player was before dying.
#[derive(Debug, Clone, PartialEq)]
pub struct DeceasedRecord<T: Config> {
    /// Team at death.
    pub team: T::Team,
    /// Role at death.
    pub role: T::Role,
    /// When the record was made. Expiry tasks compare against this.
    pub created_at: Instant,
    /// When the record stops answering lookups.
    pub expires_at: Instant,
}

impl<T: Config> DeceasedRecord<T> {
    /// Whether the record is still within its grace window.
    #[must_use]
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// At most one live [`DeceasedRecord`] per player.
///
/// Records are removed by a scheduled expiry task; lookups additionally ignore records past
/// their expiry so a late-running task never makes a stale record observable.
#[derive(Debug, Clone)]
pub struct DeceasedCache<T: Config> {
    records: BTreeMap<PlayerId, DeceasedRecord<T>>,
}

impl<T: Config> Default for DeceasedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Config> DeceasedCache<T> {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Records a death unless a live record already exists for `player`.
    ///
    /// Returns the creation time of the new record so the caller can schedule its expiry.
    pub fn record_death(
        &mut self,
        player: PlayerId,
        team: T::Team,
        role: T::Role,
        now: Instant,
        grace: Duration,
    ) -> Option<Instant> {
        if self.get(player, now).is_some() {
            return None;
        }
        self.records.insert(
            player,
            DeceasedRecord {
                team,
                role,
                created_at: now,
                expires_at: now + grace,
            },
        );
        Some(now)
    }

    /// The live record for `player`.
    #[must_use]
    pub fn get(&self, player: PlayerId, now: Instant) -> Option<&DeceasedRecord<T>> {
        self.records.get(&player).filter(|r| r.is_live(now))
    }

    /// Removes the record for `player` only if it is the one created at `created_at`.
    ///
    /// A newer record for the same player survives an older record's expiry task.
    pub fn expire(&mut self, player: PlayerId, created_at: Instant) -> bool {
        if self
            .records
            .get(&player)
            .is_some_and(|r| r.created_at == created_at)
        {
            self.records.remove(&player);
            return true;
        }
        false
    }

    /// Number of stored records, including ones past expiry that were not collected yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&PlayerId, &DeceasedRecord<T>)> {
        self.records.iter()
    }
}
