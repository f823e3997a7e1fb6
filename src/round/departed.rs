//! Players who left while the round was running.

use std::collections::BTreeMap;
use std::net::IpAddr;

use web_time::Instant;

use crate::player::PlayerSnapshot;
use crate::{Config, UserId};

/// Last known state of a player who left.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartedRecord<T: Config> {
    /// Snapshot taken when they left, marked disconnected.
    pub snapshot: PlayerSnapshot<T>,
    /// Address captured while they were connected.
    pub ip: Option<IpAddr>,
    /// When they left.
    pub left_at: Instant,
}

/// Departed players keyed by account id. A player who leaves twice keeps the latest entry.
#[derive(Debug, Clone)]
pub struct DepartedDirectory<T: Config> {
    records: BTreeMap<UserId, DepartedRecord<T>>,
}

impl<T: Config> Default for DepartedDirectory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Config> DepartedDirectory<T> {
    /// An empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Records a departure.
    pub fn record(&mut self, player: PlayerSnapshot<T>, now: Instant) {
        let ip = player.ip;
        let snapshot = player.disconnected();
        self.records.insert(
            snapshot.user_id.clone(),
            DepartedRecord {
                snapshot,
                ip,
                left_at: now,
            },
        );
    }

    /// The record for `user_id`.
    #[must_use]
    pub fn get(&self, user_id: &UserId) -> Option<&DepartedRecord<T>> {
        self.records.get(user_id)
    }

    /// Captured address for `user_id`.
    #[must_use]
    pub fn ip_of(&self, user_id: &UserId) -> Option<IpAddr> {
        self.records.get(user_id).and_then(|r| r.ip)
    }

    /// Number of departed players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nobody has left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
