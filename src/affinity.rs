//! Which team pairs count as friendly fire.

use std::collections::BTreeSet;

use crate::player::{Attacker, PlayerSnapshot};
use crate::{Config, UserId};

/// One ordered (attacker team, victim team) pair that is a violation.
///
/// Lookups are exact: listing `(A, B)` does not make `(B, A)` hostile. Use
/// [`AffinityRule::both_ways`] for crossover pairs that apply in both directions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AffinityRule<Team> {
    /// Team of the damage dealer.
    pub attacker: Team,
    /// Team of the damage receiver.
    pub victim: Team,
}

impl<Team: Copy> AffinityRule<Team> {
    /// Damage from `attacker` to `victim` is a violation.
    pub const fn new(attacker: Team, victim: Team) -> Self {
        Self { attacker, victim }
    }

    /// Damage within `team` is a violation.
    pub const fn same_team(team: Team) -> Self {
        Self::new(team, team)
    }

    /// Damage between `a` and `b` is a violation in either direction.
    pub const fn both_ways(a: Team, b: Team) -> [Self; 2] {
        [Self::new(a, b), Self::new(b, a)]
    }
}

/// Whether hurting yourself can count as friendly fire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum SelfHarmPolicy {
    /// Self-inflicted damage is never hostile.
    #[default]
    Ignore,
    /// Self-inflicted damage is hostile whenever the player's own team pair is listed.
    Count,
}

/// Static lookup of hostile team pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinityMatrix<Team: Ord> {
    rules: BTreeSet<(Team, Team)>,
    self_harm: SelfHarmPolicy,
}

impl<Team: Copy + Ord> AffinityMatrix<Team> {
    /// Builds a matrix from a rule list. Duplicates are ignored.
    pub fn new(rules: impl IntoIterator<Item = AffinityRule<Team>>) -> Self {
        Self {
            rules: rules.into_iter().map(|r| (r.attacker, r.victim)).collect(),
            self_harm: SelfHarmPolicy::default(),
        }
    }

    /// Sets the self-harm policy.
    #[must_use]
    pub fn with_self_harm(mut self, policy: SelfHarmPolicy) -> Self {
        self.self_harm = policy;
        self
    }

    /// The configured self-harm policy.
    #[must_use]
    pub const fn self_harm(&self) -> SelfHarmPolicy {
        self.self_harm
    }

    /// Number of distinct rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no pair is hostile.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True iff the ordered pair is listed.
    #[must_use]
    pub fn is_hostile_fire(&self, attacker: Team, victim: Team) -> bool {
        self.rules.contains(&(attacker, victim))
    }

    /// Whether `attacker` damaging `victim` is friendly fire.
    ///
    /// The host is never hostile. `attacker_team` overrides the attacker's current team,
    /// for when they have changed team since dealing the damage.
    #[must_use]
    pub fn is_hostile<T>(
        &self,
        attacker: &Attacker<T>,
        victim: &PlayerSnapshot<T>,
        attacker_team: Option<Team>,
    ) -> bool
    where
        T: Config<Team = Team>,
    {
        let Attacker::Player(player) = attacker else {
            return false;
        };
        if player.is_same_player(victim) && self.self_harm == SelfHarmPolicy::Ignore {
            return false;
        }
        self.is_hostile_fire(attacker_team.unwrap_or(player.team), victim.team)
    }

    /// Same as [`is_hostile`](Self::is_hostile) for an actor only known by account id,
    /// as with area effects whose thrower has left.
    #[must_use]
    pub fn is_hostile_from<T>(
        &self,
        actor: &UserId,
        actor_team: Team,
        victim: &PlayerSnapshot<T>,
    ) -> bool
    where
        T: Config<Team = Team>,
    {
        let is_self = !actor.is_blank() && *actor == victim.user_id;
        if is_self && self.self_harm == SelfHarmPolicy::Ignore {
            return false;
        }
        self.is_hostile_fire(actor_team, victim.team)
    }
}

impl<Team: Copy + Ord> FromIterator<AffinityRule<Team>> for AffinityMatrix<Team> {
    fn from_iter<I: IntoIterator<Item = AffinityRule<Team>>>(iter: I) -> Self {
        Self::new(iter)
    }
}
