//! Per-round incident history.
//!
//! The current round's list starts empty at every round start and only ever grows.
//! A configurable number of previous rounds is retained for the operator reports; offense
//! counting only ever looks at the current round.

use std::collections::BTreeMap;

use web_time::Instant;

use crate::classifier::{Hit, HostileFire};
use crate::incident::{Incident, IncidentKind};
use crate::telemetry::{InvariantChecker, InvariantViolation};
use crate::{Config, RoundId, UserId};

/// Append-only incident lists keyed by round.
#[derive(Debug, Clone)]
pub struct IncidentLedger<T: Config> {
    rounds: BTreeMap<RoundId, Vec<Incident<T>>>,
    current: RoundId,
    retained_rounds: usize,
    next_sequence: u64,
}

impl<T: Config> IncidentLedger<T> {
    /// An empty ledger keeping `retained_rounds` previous rounds besides the current one.
    #[must_use]
    pub fn new(retained_rounds: usize) -> Self {
        Self {
            rounds: BTreeMap::new(),
            current: RoundId::default(),
            retained_rounds,
            next_sequence: 0,
        }
    }

    /// Opens an empty list for `round` and drops rounds beyond the retention limit.
    pub fn begin_round(&mut self, round: RoundId) {
        self.current = round;
        self.rounds.insert(round, Vec::new());
        let retained = self.retained_rounds;
        self.rounds
            .retain(|id, _| *id <= round && id.rounds_before(round) as usize <= retained);
    }

    /// Records an incident in the current round. This is the only way incidents are made.
    pub(crate) fn record(
        &mut self,
        at: Instant,
        kind: IncidentKind,
        fire: HostileFire<T>,
        hit: Hit<T>,
    ) -> &Incident<T> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let incident = Incident::new(sequence, self.current, at, kind, fire, hit);
        let list = self.rounds.entry(self.current).or_default();
        list.push(incident);
        &list[list.len() - 1]
    }

    /// The round incidents are currently recorded into.
    #[must_use]
    pub const fn current_round(&self) -> RoundId {
        self.current
    }

    /// Incidents of the current round in arrival order.
    #[must_use]
    pub fn current(&self) -> &[Incident<T>] {
        self.rounds.get(&self.current).map_or(&[], Vec::as_slice)
    }

    /// Incidents of any retained round.
    #[must_use]
    pub fn round(&self, round: RoundId) -> &[Incident<T>] {
        self.rounds.get(&round).map_or(&[], Vec::as_slice)
    }

    /// Team kills by `attacker` in the current round, optionally only those at or after
    /// `since`.
    #[must_use]
    pub fn team_kills_by(&self, attacker: &UserId, since: Option<Instant>) -> usize {
        self.current()
            .iter()
            .filter(|i| i.kind() == IncidentKind::TeamKill)
            .filter(|i| i.attacker().user_id == *attacker)
            .filter(|i| since.is_none_or(|s| i.at() >= s))
            .count()
    }

    /// Every retained incident where `victim` was the victim, newest first.
    #[must_use]
    pub fn against(&self, victim: &UserId) -> Vec<&Incident<T>> {
        self.newest_first(|i| i.victim().user_id == *victim)
    }

    /// Every retained incident where `attacker` was the attacker, newest first.
    #[must_use]
    pub fn by(&self, attacker: &UserId) -> Vec<&Incident<T>> {
        self.newest_first(|i| i.attacker().user_id == *attacker)
    }

    fn newest_first(&self, mut keep: impl FnMut(&Incident<T>) -> bool) -> Vec<&Incident<T>> {
        let mut found: Vec<&Incident<T>> = self
            .rounds
            .values()
            .flatten()
            .filter(|i| keep(i))
            .collect();
        found.sort_by(|a, b| b.sequence().cmp(&a.sequence()));
        found
    }

    /// Total incidents across retained rounds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rounds.values().map(Vec::len).sum()
    }

    /// Whether no incidents are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rounds.values().all(Vec::is_empty)
    }

    /// Retained round ids, oldest first.
    pub fn rounds(&self) -> impl Iterator<Item = RoundId> + '_ {
        self.rounds.keys().copied()
    }
}

impl<T: Config> InvariantChecker for IncidentLedger<T> {
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for (round, incidents) in &self.rounds {
            if let Some(stray) = incidents.iter().find(|i| i.round() != *round) {
                return Err(
                    InvariantViolation::new("IncidentLedger", "incident filed under wrong round")
                        .with_details(format!("filed={}, actual={}", round, stray.round())),
                );
            }
            if incidents
                .windows(2)
                .any(|w| w[0].sequence() >= w[1].sequence())
            {
                return Err(InvariantViolation::new(
                    "IncidentLedger",
                    "incidents out of arrival order",
                )
                .with_details(format!("round={}", round)));
            }
        }
        if self.rounds.len() > self.retained_rounds + 1 {
            return Err(InvariantViolation::new(
                "IncidentLedger",
                "more rounds than the retention limit",
            )
            .with_details(format!(
                "rounds={}, retained={}",
                self.rounds.len(),
                self.retained_rounds
            )));
        }
        Ok(())
    }
}
