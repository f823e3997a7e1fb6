//! The session object the host feeds events into.

use std::collections::VecDeque;
use std::sync::Arc;

use web_time::Instant;

use crate::affinity::AffinityMatrix;
use crate::classifier::{classify, Hit, HostileFire, Verdict};
use crate::config::{GuardConfig, HostActorPolicy};
use crate::event_drain::EventDrain;
use crate::incident::{AttributionPath, IncidentKind};
use crate::ledger::IncidentLedger;
use crate::player::{
    AreaEffectEvent, Attacker, DamageEvent, DamageTool, DeathEvent, PlayerSnapshot,
    TrapTriggerEvent,
};
use crate::punishment::PunishmentTiers;
use crate::round::RoundState;
use crate::scheduler::{Task, TaskQueue};
use crate::telemetry::{ViolationKind, ViolationObserver, ViolationSeverity};
use crate::translation::Translations;
use crate::{
    debug_check_invariants, notify, reports, report_violation_to, Config, GameWorld, GuardEvent,
    GuardRequest, RoundId, UserId,
};

/// Maximum number of events to queue before the oldest are dropped.
///
/// Keeps memory bounded when the host never drains [`TeamKillGuard::events`].
pub const MAX_EVENT_QUEUE_SIZE: usize = 100;

/// Detects team attacks and team kills, attributes indirect damage, rolls back mass team
/// kills and escalates punishment.
///
/// A guard is built with a [`GuardBuilder`](crate::GuardBuilder). Every handler returns the
/// [`GuardRequest`]s the host has to fulfil, in order. Handlers never fail: problems are
/// reported to the violation observer and the event is dropped.
///
/// Call [`poll`](Self::poll) regularly (once per server tick is plenty). It runs delayed
/// work whose time has come: cache expiry, mass team-kill checks and punishment.
pub struct TeamKillGuard<T>
where
    T: Config,
{
    pub(crate) config: GuardConfig,
    pub(crate) affinity: AffinityMatrix<T::Team>,
    pub(crate) tiers: PunishmentTiers,
    pub(crate) translations: Translations,
    pub(crate) observer: Option<Arc<dyn ViolationObserver>>,
    /// `None` until the first [`start_round`](Self::start_round).
    pub(crate) round: Option<RoundState<T>>,
    pub(crate) ledger: IncidentLedger<T>,
    pub(crate) tasks: TaskQueue<T>,
    pub(crate) events: VecDeque<GuardEvent<T>>,
}

impl<T: Config> std::fmt::Debug for TeamKillGuard<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            config,
            affinity,
            tiers,
            translations: _,
            observer,
            round,
            ledger,
            tasks,
            events,
        } = self;

        f.debug_struct("TeamKillGuard")
            .field("config", config)
            .field("affinity_rules", &affinity.len())
            .field("tiers", &tiers.len())
            .field("has_observer", &observer.is_some())
            .field("round", &round.as_ref().map(|r| r.id))
            .field("incidents", &ledger.len())
            .field("pending_tasks", &tasks.len())
            .field("queued_events", &events.len())
            .finish_non_exhaustive()
    }
}

impl<T: Config> TeamKillGuard<T> {
    pub(crate) fn new(
        config: GuardConfig,
        affinity: AffinityMatrix<T::Team>,
        tiers: PunishmentTiers,
        translations: Translations,
        observer: Option<Arc<dyn ViolationObserver>>,
    ) -> Self {
        let ledger = IncidentLedger::new(config.retained_rounds);
        Self {
            config,
            affinity,
            tiers,
            translations,
            observer,
            round: None,
            ledger,
            tasks: TaskQueue::new(),
            events: VecDeque::new(),
        }
    }

    /// Starts a new round.
    ///
    /// Everything round-scoped is dropped: the deceased cache, area-effect and trap
    /// attribution, the departed directory and pending punishment markers. Tasks queued in
    /// the old round stay in the queue but no-op when they fire. Offense counting restarts
    /// from zero; older rounds stay in the ledger for operator reports.
    pub fn start_round(&mut self, now: Instant) -> RoundId {
        let id = self.ledger.current_round().next();
        self.round = Some(RoundState::new(id, now));
        self.ledger.begin_round(id);
        tracing::info!(round = %id, "Round started");
        id
    }

    /// Remembers a player leaving so effects they threw can still be charged to them and so
    /// an offline ban can also cover their address.
    pub fn on_player_left<W: GameWorld<T>>(
        &mut self,
        world: &W,
        player: &PlayerSnapshot<T>,
        now: Instant,
    ) {
        if !self.in_round(world) {
            return;
        }
        if let Some(round) = self.round.as_mut() {
            tracing::debug!(player = %player.describe(), ip = ?player.ip, "Player left");
            round.departed.record(player.clone(), now);
        }
    }

    /// Handles a player about to take damage. Friendly fire becomes a team attack.
    pub fn on_damage<W: GameWorld<T>>(
        &mut self,
        world: &W,
        event: &DamageEvent<T>,
        now: Instant,
    ) -> Vec<GuardRequest<T>> {
        if !event.allowed {
            self.skip("2.4");
            return Vec::new();
        }
        if !event.victim.connected {
            self.skip("2.0");
            return Vec::new();
        }
        if event.victim.god_mode {
            self.skip("2.6");
            return Vec::new();
        }
        if !self.in_round(world) {
            return Vec::new();
        }
        let Some(attacker) = &event.attacker else {
            self.skip("2.8");
            return Vec::new();
        };
        if matches!(attacker, Attacker::Host) && self.config.host_actor == HostActorPolicy::Ignore {
            self.skip("2.7");
            return Vec::new();
        }

        let hit = Hit {
            victim: event.victim.clone(),
            tool: event.tool.clone(),
            amount: event.amount,
        };
        self.resolve_hit(world, IncidentKind::TeamAttack, attacker, hit, now)
    }

    /// Handles a player about to die. Friendly fire becomes a team kill and may lead to
    /// punishment.
    ///
    /// The victim's team and role are remembered for a short while first, so damage they
    /// dealt before dying is still judged by the team they were on and a mass team kill can
    /// restore their role.
    pub fn on_death<W: GameWorld<T>>(
        &mut self,
        world: &W,
        event: &DeathEvent<T>,
        now: Instant,
    ) -> Vec<GuardRequest<T>> {
        if !event.allowed {
            self.skip("1.4");
            return Vec::new();
        }
        if !event.victim.connected {
            self.skip("1.0");
            return Vec::new();
        }
        if !self.in_round(world) {
            return Vec::new();
        }
        self.remember_death(&event.victim, now);

        let Some(killer) = &event.killer else {
            self.skip("1.8");
            return Vec::new();
        };
        if matches!(killer, Attacker::Host) && self.config.host_actor == HostActorPolicy::Ignore {
            self.skip("1.7");
            return Vec::new();
        }

        let hit = Hit {
            victim: event.victim.clone(),
            tool: event.tool.clone(),
            amount: event.amount,
        };
        self.resolve_hit(world, IncidentKind::TeamKill, killer, hit, now)
    }

    /// Handles an area effect about to apply.
    ///
    /// A fragmentation effect is attributed to its owner on every potential target and
    /// checked for a mass team kill once its damage has landed. A flash notifies the
    /// teammates it blinded and the thrower.
    pub fn on_area_effect<W: GameWorld<T>>(
        &mut self,
        world: &W,
        event: &AreaEffectEvent<T>,
        now: Instant,
    ) -> Vec<GuardRequest<T>> {
        if !self.in_round(world) {
            return Vec::new();
        }
        self.handle_area_effect(world, event, now)
    }

    /// Remembers who triggered a trap. Its damage is charged to them for
    /// [`GuardConfig::trap_window`].
    pub fn on_trap_triggered(&mut self, event: &TrapTriggerEvent<T>, now: Instant) {
        if !event.allowed {
            return;
        }
        let Some(round) = self.round.as_mut() else {
            return;
        };
        let window = self.config.trap_window;
        let triggered_at = round
            .attributions
            .trigger_trap(event.trap, event.player.clone(), now, window);
        self.tasks.schedule(
            triggered_at + window,
            Task::ExpireTrap {
                round: round.id,
                trap: event.trap,
                triggered_at,
            },
        );
    }

    /// Runs every queued task that is due at `now`.
    ///
    /// Tasks scheduled in an earlier round are dropped without running.
    pub fn poll<W: GameWorld<T>>(&mut self, world: &W, now: Instant) -> Vec<GuardRequest<T>> {
        let mut requests = Vec::new();
        while let Some(task) = self.tasks.pop_due(now) {
            let current = self.round.as_ref().map(|r| r.id);
            if current != Some(task.round()) {
                if self.config.verbose {
                    tracing::debug!(task_round = %task.round(), ?current, "Dropping stale task");
                }
                continue;
            }
            match task {
                Task::ExpireDeceased {
                    player, created_at, ..
                } => {
                    if let Some(round) = self.round.as_mut() {
                        round.deceased.expire(player, created_at);
                    }
                },
                Task::ExpireTrap {
                    trap, triggered_at, ..
                } => {
                    if let Some(round) = self.round.as_mut() {
                        round.attributions.expire_trap(trap, triggered_at);
                    }
                },
                Task::SettleAreaEffect { check, .. } => {
                    requests.extend(self.settle_area_effect(world, &check, now));
                },
                Task::EvaluatePunishment { offender, .. } => {
                    requests.extend(self.evaluate_punishment(world, &offender, now));
                },
            }
        }
        requests
    }

    /// Drains the notifications queued since the last call.
    ///
    /// At most [`MAX_EVENT_QUEUE_SIZE`] events are kept between drains; older ones are
    /// discarded first.
    ///
    /// # Example
    ///
    /// ```ignore
    /// for event in guard.events() {
    ///     if let GuardEvent::TeamKill(incident) = event {
    ///         discord.post(incident.attacker().describe());
    ///     }
    /// }
    /// ```
    pub fn events(&mut self) -> EventDrain<'_, T> {
        EventDrain::from_drain(self.events.drain(..))
    }

    /// Incidents of the current and retained previous rounds.
    #[must_use]
    pub const fn ledger(&self) -> &IncidentLedger<T> {
        &self.ledger
    }

    /// The running round, `None` before the first [`start_round`](Self::start_round).
    #[must_use]
    pub fn current_round(&self) -> Option<RoundId> {
        self.round.as_ref().map(|r| r.id)
    }

    /// Round-scoped caches of the running round.
    #[must_use]
    pub const fn round_state(&self) -> Option<&RoundState<T>> {
        self.round.as_ref()
    }

    /// Configuration the guard was built with.
    #[must_use]
    pub const fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Team pairs treated as friendly fire.
    #[must_use]
    pub const fn affinity(&self) -> &AffinityMatrix<T::Team> {
        &self.affinity
    }

    /// Punishment tiers.
    #[must_use]
    pub const fn tiers(&self) -> &PunishmentTiers {
        &self.tiers
    }

    /// Returns the violation observer, if one was configured.
    #[must_use]
    pub fn violation_observer(&self) -> Option<&Arc<dyn ViolationObserver>> {
        self.observer.as_ref()
    }

    /// Number of queued tasks, including stale ones not yet dropped.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// When the earliest queued task becomes due.
    #[must_use]
    pub fn next_due(&self) -> Option<Instant> {
        self.tasks.next_due()
    }

    /// Every incident in which `user` was the victim, rendered for an operator.
    #[must_use]
    pub fn victim_report(&self, user: &UserId) -> Vec<String> {
        reports::victim_report(&self.ledger, user)
    }

    /// Every incident in which `user` was the attacker, rendered for an operator.
    #[must_use]
    pub fn attacker_report(&self, user: &UserId) -> Vec<String> {
        reports::attacker_report(&self.ledger, user)
    }

    pub(crate) fn push_event(&mut self, event: GuardEvent<T>) {
        self.events.push_back(event);
        // discard oldest events if the host is not draining
        while self.events.len() > MAX_EVENT_QUEUE_SIZE {
            self.events.pop_front();
        }
    }

    pub(crate) fn skip(&self, code: &str) {
        if self.config.verbose {
            tracing::debug!("Skip Code: {}", code);
        }
    }

    /// Whether a round is running. A failing round query counts as "no".
    fn in_round<W: GameWorld<T>>(&self, world: &W) -> bool {
        if self.round.is_none() {
            return false;
        }
        match world.round_in_progress() {
            Ok(running) => running,
            Err(err) => {
                report_violation_to!(
                    self.observer.as_ref(),
                    self.current_round(),
                    ViolationSeverity::Warning,
                    ViolationKind::RoundState,
                    "{}",
                    err
                );
                false
            },
        }
    }

    fn remember_death(&mut self, victim: &PlayerSnapshot<T>, now: Instant) {
        let Some(round) = self.round.as_mut() else {
            return;
        };
        let grace = self.config.deceased_grace;
        if let Some(created_at) =
            round
                .deceased
                .record_death(victim.id, victim.team, victim.role.clone(), now, grace)
        {
            self.tasks.schedule(
                created_at + grace,
                Task::ExpireDeceased {
                    round: round.id,
                    player: victim.id,
                    created_at,
                },
            );
        }
    }

    fn resolve_hit<W: GameWorld<T>>(
        &mut self,
        world: &W,
        kind: IncidentKind,
        attacker: &Attacker<T>,
        hit: Hit<T>,
        now: Instant,
    ) -> Vec<GuardRequest<T>> {
        let Some(round) = self.round.as_ref() else {
            return Vec::new();
        };
        match classify(&self.affinity, round, attacker, &hit, now) {
            Verdict::Hostile(fire) => self.record_incident(world, kind, fire, hit, now),
            Verdict::Suppressed(path) => {
                log_suppressed(kind, path, &hit.tool, &hit.victim);
                Vec::new()
            },
            Verdict::NotHostile => {
                let code = match kind {
                    IncidentKind::TeamKill => "1.1",
                    IncidentKind::TeamAttack => "2.1",
                };
                tracing::debug!(
                    victim = %hit.victim.describe(),
                    tool = %hit.tool.name,
                    "{} was not detected. Skip Code: {}",
                    kind,
                    code
                );
                Vec::new()
            },
        }
    }

    fn record_incident<W: GameWorld<T>>(
        &mut self,
        world: &W,
        kind: IncidentKind,
        fire: HostileFire<T>,
        hit: Hit<T>,
        now: Instant,
    ) -> Vec<GuardRequest<T>> {
        let explosive = hit.tool.is_explosive();
        let incident = self.ledger.record(now, kind, fire, hit).clone();
        tracing::info!(
            round = %incident.round(),
            attacker = %incident.attacker().describe(),
            attacker_team = ?incident.attacker_team(),
            victim = %incident.victim().describe(),
            victim_team = ?incident.victim_team(),
            tool = %incident.tool().name,
            code = %incident.code(),
            "{} detected",
            kind
        );

        let attacker_connected = world
            .player_by_user_id(&incident.attacker().user_id)
            .is_some();
        let requests = notify::incident_notices(&self.translations, &incident, attacker_connected);
        let offender = incident.attacker().clone();
        self.push_event(match kind {
            IncidentKind::TeamKill => GuardEvent::TeamKill(incident),
            IncidentKind::TeamAttack => GuardEvent::TeamAttack(incident),
        });

        if kind == IncidentKind::TeamKill {
            self.request_punishment(world, &offender, explosive, now);
        }

        if let Some(round) = &self.round {
            debug_check_invariants!(round, "after recording an incident");
        }
        debug_check_invariants!(self.ledger, "after recording an incident");
        requests
    }
}

fn log_suppressed<T: Config>(
    kind: IncidentKind,
    path: AttributionPath,
    tool: &DamageTool,
    victim: &PlayerSnapshot<T>,
) {
    let code = match (kind, path) {
        (IncidentKind::TeamKill, AttributionPath::Trap) => "1.10",
        (IncidentKind::TeamKill, _) => "1.4",
        (IncidentKind::TeamAttack, AttributionPath::Trap) => "2.10",
        (IncidentKind::TeamAttack, _) => "2.4",
    };
    tracing::info!(
        victim = %victim.describe(),
        tool = %tool.name,
        "{} by {:?} attribution was not hostile. Skip Code: {}",
        kind,
        path,
        code
    );
}
