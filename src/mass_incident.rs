//! Area-effect attribution and mass team-kill rollback.
//!
//! When a lethal area effect goes off, every potential target is pointed at the effect's
//! owner in the attribution store and a settle check is queued. Once the damage has landed
//! the check releases those entries and, if every target was friendly and more of them
//! died than the threshold allows, restores the dead to their pre-death roles.

use smallvec::SmallVec;
use web_time::Instant;

use crate::player::{AreaEffectEvent, AreaEffectKind, Attacker, PlayerSnapshot};
use crate::round::attribution::Attribution;
use crate::round::RoundState;
use crate::scheduler::{MassCheck, MassTarget, Task};
use crate::telemetry::{ViolationKind, ViolationSeverity};
use crate::{
    notify, report_violation_to, Config, GameWorld, GuardEvent, GuardRequest, PlayerId,
    TeamKillGuard,
};

/// Why an area effect could not be charged to anyone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttributionMiss {
    /// The projectile has no recorded owner.
    NoOwner,
    /// The owner's account id could not be determined.
    NoUserId,
    /// The owner is gone and did not leave during this round.
    Unlogged,
}

impl AttributionMiss {
    /// Operator-facing skip code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoOwner => "3.6",
            Self::NoUserId => "3.10",
            Self::Unlogged => "3.8",
        }
    }
}

impl std::fmt::Display for AttributionMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::NoOwner => "thrown by nobody",
            Self::NoUserId => "thrower user id was empty",
            Self::Unlogged => "thrower left the server and was not logged",
        };
        write!(f, "Skip Code: {} | {}", self.code(), reason)
    }
}

/// Finds the player responsible for `event` and the team they are charged under.
///
/// A live thrower is taken as is. A missing or host thrower falls back to the projectile's
/// previous owner, looked up among connected players and then among players who left.
pub fn resolve_owner<T: Config, W: GameWorld<T>>(
    world: &W,
    round: &RoundState<T>,
    event: &AreaEffectEvent<T>,
) -> Result<(PlayerSnapshot<T>, T::Team), AttributionMiss> {
    if let Some(Attacker::Player(thrower)) = &event.thrower {
        return Ok((thrower.clone(), thrower.team));
    }
    let owner = event.previous_owner.as_ref().ok_or(AttributionMiss::NoOwner)?;
    let user_id = owner
        .user_id
        .as_ref()
        .filter(|id| !id.is_blank())
        .ok_or(AttributionMiss::NoUserId)?;
    if let Some(live) = world.player_by_user_id(user_id) {
        return Ok((live, owner.team));
    }
    let departed = round.departed.get(user_id).ok_or(AttributionMiss::Unlogged)?;
    tracing::debug!(user_id = %user_id, "Status Code: 3.7");
    Ok((departed.snapshot.clone(), owner.team))
}

impl<T: Config> TeamKillGuard<T> {
    pub(crate) fn handle_area_effect<W: GameWorld<T>>(
        &mut self,
        world: &W,
        event: &AreaEffectEvent<T>,
        now: Instant,
    ) -> Vec<GuardRequest<T>> {
        if !event.allowed {
            self.skip("3.4");
            return Vec::new();
        }
        match event.kind {
            AreaEffectKind::Flash => self.flash(event),
            AreaEffectKind::Fragmentation => {
                self.fragmentation(world, event, now);
                Vec::new()
            },
            AreaEffectKind::Other => {
                self.skip("3.5");
                Vec::new()
            },
        }
    }

    fn flash(&self, event: &AreaEffectEvent<T>) -> Vec<GuardRequest<T>> {
        let Some(Attacker::Player(thrower)) = &event.thrower else {
            return Vec::new();
        };
        let attacker = Attacker::Player(thrower.clone());
        let victims: Vec<&PlayerSnapshot<T>> = event
            .targets
            .iter()
            .filter(|&target| self.affinity.is_hostile(&attacker, target, None))
            .collect();
        notify::flash_notices(&self.translations, thrower, &victims)
    }

    fn fragmentation<W: GameWorld<T>>(
        &mut self,
        world: &W,
        event: &AreaEffectEvent<T>,
        now: Instant,
    ) {
        let Some(round) = self.round.as_mut() else {
            return;
        };
        let (actor, team) = match resolve_owner(world, round, event) {
            Ok(owner) => owner,
            Err(miss) => {
                report_violation_to!(
                    self.observer.as_ref(),
                    Some(round.id),
                    ViolationSeverity::Warning,
                    ViolationKind::AttributionMiss,
                    "{} (effect {})",
                    miss,
                    event.effect
                );
                return;
            },
        };

        let mut targets: SmallVec<[MassTarget; 8]> = SmallVec::with_capacity(event.targets.len());
        for target in &event.targets {
            // a departed thrower's engine id may already belong to someone else
            let is_actor = if actor.connected {
                target.is_same_player(&actor)
            } else {
                !actor.user_id.is_blank() && target.user_id == actor.user_id
            };
            let friendly = is_actor || self.affinity.is_hostile_from(&actor.user_id, team, target);
            targets.push(MassTarget {
                player: target.id,
                friendly,
                is_actor,
            });
            round.attributions.attribute(
                target.id,
                Attribution {
                    effect: event.effect,
                    actor: actor.clone(),
                    team,
                    created_at: now,
                },
            );
        }

        tracing::debug!(
            effect = %event.effect,
            actor = %actor.describe(),
            targets = targets.len(),
            "Area effect attributed"
        );
        self.tasks.schedule(
            now + self.config.settle_delay,
            Task::SettleAreaEffect {
                round: round.id,
                check: MassCheck {
                    effect: event.effect,
                    actor: actor.user_id,
                    targets,
                },
            },
        );
    }

    /// Runs the settle check of one area effect.
    pub(crate) fn settle_area_effect<W: GameWorld<T>>(
        &mut self,
        world: &W,
        check: &MassCheck,
        now: Instant,
    ) -> Vec<GuardRequest<T>> {
        let Some(round) = self.round.as_mut() else {
            return Vec::new();
        };
        round
            .attributions
            .release(check.targets.iter().map(|t| t.player), &check.actor);

        if check.targets.iter().any(|t| !t.friendly) {
            if self.config.verbose {
                tracing::debug!(effect = %check.effect, "Skip Code: 5.0 (mixed targets)");
            }
            return Vec::new();
        }

        let dead: Vec<PlayerId> = check
            .targets
            .iter()
            .filter(|t| !t.is_actor)
            .filter(|t| world.player(t.player).is_some_and(|p| !p.alive))
            .map(|t| t.player)
            .collect();
        if dead.len() <= self.config.mass_kill_threshold {
            if self.config.verbose {
                tracing::debug!(effect = %check.effect, dead = dead.len(), "Skip Code: 5.0");
            }
            return Vec::new();
        }

        tracing::warn!(
            effect = %check.effect,
            actor = %check.actor,
            dead = dead.len(),
            "Detected mass team kill, respawning"
        );
        let mut requests = Vec::with_capacity(dead.len() + 1);
        requests.extend(notify::mass_broadcast(
            &self.translations,
            &self.config.issuer,
            dead.len(),
        ));
        for player in &dead {
            match round.deceased.get(*player, now) {
                Some(record) => requests.push(GuardRequest::SetRole {
                    player: *player,
                    role: record.role.clone(),
                }),
                None => {
                    report_violation_to!(
                        self.observer.as_ref(),
                        Some(round.id),
                        ViolationSeverity::Warning,
                        ViolationKind::StateInconsistency,
                        "Error Code: 5.1 no role before death for player {} (effect {})",
                        player,
                        check.effect
                    );
                    requests.extend(notify::missing_role_notice(&self.translations, *player));
                },
            }
        }
        self.push_event(GuardEvent::MassTeamKill {
            effect: check.effect,
            responsible: check.actor.clone(),
            dead: dead.len(),
        });
        requests
    }
}
