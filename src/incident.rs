//! Classified friendly-fire incidents.

use web_time::Instant;

use crate::classifier::{HostileFire, Hit};
use crate::player::{DamageTool, PlayerSnapshot};
use crate::{Config, RoundId};

/// Whether the victim died.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum IncidentKind {
    /// The victim was killed.
    TeamKill,
    /// The victim was damaged.
    TeamAttack,
}

impl IncidentKind {
    /// `TeamKill` or `TeamAttack`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TeamKill => "TeamKill",
            Self::TeamAttack => "TeamAttack",
        }
    }

    const fn major(self) -> u8 {
        match self {
            Self::TeamKill => 1,
            Self::TeamAttack => 2,
        }
    }
}

impl std::fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which classification step recognised the incident.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AttributionPath {
    /// Attacker's current team.
    Direct,
    /// Team recorded when the attacker died.
    Retroactive,
    /// Owner of an area effect.
    AreaEffect,
    /// Player who triggered a trap.
    Trap,
}

impl AttributionPath {
    const fn minor(self) -> u8 {
        match self {
            Self::Direct => 2,
            Self::Retroactive => 3,
            Self::AreaEffect => 5,
            Self::Trap => 9,
        }
    }
}

/// Operator-facing code identifying how an incident was detected, e.g. `1.5` for a team
/// kill attributed through an area effect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DetectionCode {
    /// Kill or attack.
    pub kind: IncidentKind,
    /// Detection step.
    pub path: AttributionPath,
}

impl DetectionCode {
    /// Combines an incident kind with the step that detected it.
    #[must_use]
    pub const fn new(kind: IncidentKind, path: AttributionPath) -> Self {
        Self { kind, path }
    }
}

impl std::fmt::Display for DetectionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.kind.major(), self.path.minor())
    }
}

/// One classified team attack or team kill. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident<T: Config> {
    sequence: u64,
    round: RoundId,
    kind: IncidentKind,
    attacker: PlayerSnapshot<T>,
    attacker_team: T::Team,
    victim: PlayerSnapshot<T>,
    code: DetectionCode,
    tool: DamageTool,
    amount: f32,
    at: Instant,
}

impl<T: Config> Incident<T> {
    pub(crate) fn new(
        sequence: u64,
        round: RoundId,
        at: Instant,
        kind: IncidentKind,
        fire: HostileFire<T>,
        hit: Hit<T>,
    ) -> Self {
        Self {
            sequence,
            round,
            kind,
            code: DetectionCode::new(kind, fire.path),
            attacker: fire.attacker,
            attacker_team: fire.team,
            victim: hit.victim,
            tool: hit.tool,
            amount: hit.amount,
            at,
        }
    }

    /// Position in the global recording order.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Round the incident happened in.
    #[must_use]
    pub const fn round(&self) -> RoundId {
        self.round
    }

    /// Kill or attack.
    #[must_use]
    pub const fn kind(&self) -> IncidentKind {
        self.kind
    }

    /// The attributed attacker, which may differ from the engine's proximate attacker.
    #[must_use]
    pub const fn attacker(&self) -> &PlayerSnapshot<T> {
        &self.attacker
    }

    /// Team the attacker was charged under.
    #[must_use]
    pub fn attacker_team(&self) -> T::Team {
        self.attacker_team
    }

    /// The victim.
    #[must_use]
    pub const fn victim(&self) -> &PlayerSnapshot<T> {
        &self.victim
    }

    /// Team the victim held when hit.
    #[must_use]
    pub fn victim_team(&self) -> T::Team {
        self.victim.team
    }

    /// How the incident was detected.
    #[must_use]
    pub const fn code(&self) -> DetectionCode {
        self.code
    }

    /// What dealt the damage.
    #[must_use]
    pub const fn tool(&self) -> &DamageTool {
        &self.tool
    }

    /// Damage dealt.
    #[must_use]
    pub const fn amount(&self) -> f32 {
        self.amount
    }

    /// When it was recorded.
    #[must_use]
    pub const fn at(&self) -> Instant {
        self.at
    }
}
