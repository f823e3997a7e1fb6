//! Decides whether a hit is friendly fire and who is charged for it.
//!
//! Steps run in a fixed order and the first that applies decides:
//!
//! 1. **Direct**: the attacker's current team is hostile to the victim's.
//! 2. **Retroactive**: the attacker died recently and the team they held then is hostile.
//! 3. **Area effect**: explosive damage on a victim with an attribution entry is charged to
//!    the effect's owner. A non-hostile owner is a deliberate "no" that ends classification.
//! 4. **Trap**: trap damage within the trigger window is charged to the triggering player,
//!    with the same explicit "no".
//! 5. Otherwise not hostile.

use web_time::Instant;

use crate::affinity::AffinityMatrix;
use crate::incident::AttributionPath;
use crate::player::{Attacker, DamageTool, PlayerSnapshot};
use crate::round::RoundState;
use crate::Config;

/// The parts of a damage or death event that end up in an incident.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<T: Config> {
    /// Victim as of the event, before any death side effects.
    pub victim: PlayerSnapshot<T>,
    /// What dealt the damage.
    pub tool: DamageTool,
    /// Damage dealt.
    pub amount: f32,
}

/// Positive classification.
#[derive(Debug, Clone, PartialEq)]
pub struct HostileFire<T: Config> {
    /// Who is charged. May differ from the engine's proximate attacker.
    pub attacker: PlayerSnapshot<T>,
    /// Team they are charged under.
    pub team: T::Team,
    /// Step that matched.
    pub path: AttributionPath,
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<T: Config> {
    /// Friendly fire.
    Hostile(HostileFire<T>),
    /// Indirect attribution found an owner who is not hostile to the victim.
    Suppressed(AttributionPath),
    /// No step matched.
    NotHostile,
}

impl<T: Config> Verdict<T> {
    /// The positive classification, if any.
    #[must_use]
    pub fn hostile(self) -> Option<HostileFire<T>> {
        match self {
            Self::Hostile(fire) => Some(fire),
            _ => None,
        }
    }
}

/// Classifies `hit` dealt by `attacker`. Pure: reads the round caches, never mutates them.
#[must_use]
pub fn classify<T: Config>(
    affinity: &AffinityMatrix<T::Team>,
    round: &RoundState<T>,
    attacker: &Attacker<T>,
    hit: &Hit<T>,
    now: Instant,
) -> Verdict<T> {
    let victim = &hit.victim;

    if let Attacker::Player(player) = attacker {
        if affinity.is_hostile(attacker, victim, None) {
            return Verdict::Hostile(HostileFire {
                attacker: player.clone(),
                team: player.team,
                path: AttributionPath::Direct,
            });
        }
        if let Some(record) = round.deceased.get(player.id, now) {
            if affinity.is_hostile(attacker, victim, Some(record.team)) {
                return Verdict::Hostile(HostileFire {
                    attacker: player.clone(),
                    team: record.team,
                    path: AttributionPath::Retroactive,
                });
            }
        }
    }

    if hit.tool.is_explosive() {
        if let Some(entry) = round.attributions.get(victim.id) {
            if affinity.is_hostile_from(entry.user_id(), entry.team, victim) {
                return Verdict::Hostile(HostileFire {
                    attacker: entry.actor.clone(),
                    team: entry.team,
                    path: AttributionPath::AreaEffect,
                });
            }
            return Verdict::Suppressed(AttributionPath::AreaEffect);
        }
    }

    if let Some(trigger) = hit
        .tool
        .trap()
        .and_then(|trap| round.attributions.trap(trap, now))
    {
        let by = &trigger.player;
        if affinity.is_hostile_from(&by.user_id, by.team, victim) {
            return Verdict::Hostile(HostileFire {
                attacker: by.clone(),
                team: by.team,
                path: AttributionPath::Trap,
            });
        }
        return Verdict::Suppressed(AttributionPath::Trap);
    }

    Verdict::NotHostile
}
