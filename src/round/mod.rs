//! State that only lives for one round.
//!
//! A [`RoundState`] is built fresh by [`TeamKillGuard::start_round`] and dropped wholesale
//! at the next start, so nothing recorded in one round can leak into the next.
//!
//! [`TeamKillGuard::start_round`]: crate::TeamKillGuard::start_round

pub mod attribution;
pub mod deceased;
pub mod departed;

use std::collections::BTreeSet;

use web_time::Instant;

use crate::telemetry::{InvariantChecker, InvariantViolation};
use crate::{Config, RoundId, UserId};
use attribution::AttributionStore;
use deceased::DeceasedCache;
use departed::DepartedDirectory;

/// Caches and debounce markers of the running round.
#[derive(Debug, Clone)]
pub struct RoundState<T: Config> {
    /// Round identity. Scheduled tasks carry it and no-op when it no longer matches.
    pub id: RoundId,
    /// When the round started.
    pub started_at: Instant,
    /// Pre-death team and role.
    pub deceased: DeceasedCache<T>,
    /// Area-effect and trap attribution.
    pub attributions: AttributionStore<T>,
    /// Players who left during the round.
    pub departed: DepartedDirectory<T>,
    /// Offenders with a punishment evaluation queued.
    pub pending_punishments: BTreeSet<UserId>,
}

impl<T: Config> RoundState<T> {
    /// An empty round.
    #[must_use]
    pub fn new(id: RoundId, started_at: Instant) -> Self {
        Self {
            id,
            started_at,
            deceased: DeceasedCache::new(),
            attributions: AttributionStore::new(),
            departed: DepartedDirectory::new(),
            pending_punishments: BTreeSet::new(),
        }
    }
}

impl<T: Config> InvariantChecker for RoundState<T> {
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if let Some((player, _)) = self
            .deceased
            .iter()
            .find(|(_, r)| r.created_at < self.started_at)
        {
            return Err(
                InvariantViolation::new("RoundState", "deceased record predates the round")
                    .with_details(format!("round={}, player={}", self.id, player)),
            );
        }
        if let Some(entry) = self
            .attributions
            .entries()
            .find(|a| a.created_at < self.started_at)
        {
            return Err(
                InvariantViolation::new("RoundState", "attribution predates the round")
                    .with_details(format!("round={}, effect={}", self.id, entry.effect)),
            );
        }
        if self.pending_punishments.iter().any(UserId::is_blank) {
            return Err(InvariantViolation::new(
                "RoundState",
                "pending punishment for a blank user id",
            ));
        }
        Ok(())
    }
}
