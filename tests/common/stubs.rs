//! A minimal team game for driving a guard from integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::Arc;

use teamkill_guard::{
    AffinityRule, AreaEffectEvent, AreaEffectKind, Attacker, Config, DamageEvent, DamageKind,
    DamageTool, DeathEvent, EffectId, GameWorld, GuardBuilder, GuardConfig, GuardError,
    PlayerId, PlayerSnapshot, TeamKillGuard, UserId,
};
use teamkill_guard::telemetry::CollectingObserver;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Team {
    ClassD,
    Scientist,
    Guard,
    Chaos,
    Scp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    ClassD,
    Scientist,
    Guard,
    Chaos,
    Scp,
    Spectator,
}

impl Role {
    pub const fn of(team: Team) -> Self {
        match team {
            Team::ClassD => Self::ClassD,
            Team::Scientist => Self::Scientist,
            Team::Guard => Self::Guard,
            Team::Chaos => Self::Chaos,
            Team::Scp => Self::Scp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StubConfig;

impl Config for StubConfig {
    type Team = Team;
    type Role = Role;
}

/// Foundation and Chaos sides. SCPs never count as friendly fire.
pub fn rules() -> Vec<AffinityRule<Team>> {
    let mut rules = vec![
        AffinityRule::same_team(Team::ClassD),
        AffinityRule::same_team(Team::Scientist),
        AffinityRule::same_team(Team::Guard),
        AffinityRule::same_team(Team::Chaos),
    ];
    rules.extend(AffinityRule::both_ways(Team::Scientist, Team::Guard));
    rules.extend(AffinityRule::both_ways(Team::ClassD, Team::Chaos));
    rules
}

pub fn player(id: u32, team: Team) -> PlayerSnapshot<StubConfig> {
    PlayerSnapshot::new(
        PlayerId::new(id),
        format!("7656119{id:010}@steam"),
        format!("Player{id}"),
        team,
        Role::of(team),
    )
}

/// Host view of the game. Tests mutate it between guard calls.
#[derive(Debug, Default)]
pub struct StubWorld {
    players: BTreeMap<PlayerId, PlayerSnapshot<StubConfig>>,
    exempt: BTreeSet<UserId>,
    ended: bool,
    broken: bool,
}

impl StubWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(players: &[&PlayerSnapshot<StubConfig>]) -> Self {
        let mut world = Self::new();
        for p in players {
            world.join((*p).clone());
        }
        world
    }

    pub fn join(&mut self, player: PlayerSnapshot<StubConfig>) {
        self.players.insert(player.id, player);
    }

    /// Removes the player and returns their snapshot as the host would report it on leave.
    pub fn leave(&mut self, id: PlayerId, ip: Option<IpAddr>) -> PlayerSnapshot<StubConfig> {
        let mut snapshot = self
            .players
            .remove(&id)
            .unwrap_or_else(|| panic!("player {id} not connected"));
        snapshot.ip = ip;
        snapshot
    }

    /// Marks the player dead the way the engine does: spectator role, not alive.
    pub fn kill(&mut self, id: PlayerId) {
        if let Some(p) = self.players.get_mut(&id) {
            p.alive = false;
            p.role = Role::Spectator;
        }
    }

    pub fn set_team(&mut self, id: PlayerId, team: Team) {
        if let Some(p) = self.players.get_mut(&id) {
            p.team = team;
            p.role = Role::of(team);
            p.alive = true;
        }
    }

    pub fn exempt(&mut self, user: &UserId) {
        self.exempt.insert(user.clone());
    }

    pub fn end_round(&mut self) {
        self.ended = true;
    }

    pub fn break_round_query(&mut self) {
        self.broken = true;
    }

    pub fn get(&self, id: PlayerId) -> &PlayerSnapshot<StubConfig> {
        &self.players[&id]
    }
}

impl GameWorld<StubConfig> for StubWorld {
    fn round_in_progress(&self) -> Result<bool, GuardError> {
        if self.broken {
            return Err(GuardError::RoundStateUnavailable {
                context: "server is restarting".to_owned(),
            });
        }
        Ok(!self.ended)
    }

    fn player(&self, id: PlayerId) -> Option<PlayerSnapshot<StubConfig>> {
        self.players.get(&id).cloned()
    }

    fn player_by_user_id(&self, user_id: &UserId) -> Option<PlayerSnapshot<StubConfig>> {
        self.players.values().find(|p| p.user_id == *user_id).cloned()
    }

    fn has_permission(&self, player: &PlayerSnapshot<StubConfig>, permission: &str) -> bool {
        permission == teamkill_guard::config::DEFAULT_EXEMPTION_PERMISSION
            && self.exempt.contains(&player.user_id)
    }
}

pub fn guard() -> TeamKillGuard<StubConfig> {
    guard_with(GuardConfig::default())
}

pub fn guard_with(config: GuardConfig) -> TeamKillGuard<StubConfig> {
    GuardBuilder::new()
        .with_rules(rules())
        .with_config(config)
        .build()
        .expect("valid test configuration")
}

/// A guard whose violations end up in the returned observer instead of the log.
pub fn observed(config: GuardConfig) -> (TeamKillGuard<StubConfig>, Arc<CollectingObserver>) {
    let observer = Arc::new(CollectingObserver::new());
    let guard = GuardBuilder::new()
        .with_rules(rules())
        .with_config(config)
        .with_violation_observer(observer.clone())
        .build()
        .expect("valid test configuration");
    (guard, observer)
}

pub fn shot(
    attacker: &PlayerSnapshot<StubConfig>,
    victim: &PlayerSnapshot<StubConfig>,
    kind: DamageKind,
) -> DamageEvent<StubConfig> {
    DamageEvent {
        attacker: Some(Attacker::Player(attacker.clone())),
        victim: victim.clone(),
        tool: DamageTool::new(kind, tool_name(kind)),
        amount: 30.0,
        allowed: true,
    }
}

pub fn death(
    killer: Option<Attacker<StubConfig>>,
    victim: &PlayerSnapshot<StubConfig>,
    kind: DamageKind,
) -> DeathEvent<StubConfig> {
    DeathEvent {
        killer,
        victim: victim.clone(),
        tool: DamageTool::new(kind, tool_name(kind)),
        amount: 100.0,
        allowed: true,
    }
}

pub fn grenade(
    effect: u64,
    thrower: &PlayerSnapshot<StubConfig>,
    targets: &[&PlayerSnapshot<StubConfig>],
) -> AreaEffectEvent<StubConfig> {
    AreaEffectEvent {
        effect: EffectId::new(effect),
        kind: AreaEffectKind::Fragmentation,
        allowed: true,
        thrower: Some(Attacker::Player(thrower.clone())),
        previous_owner: None,
        targets: targets.iter().map(|t| (*t).clone()).collect(),
    }
}

const fn tool_name(kind: DamageKind) -> &'static str {
    match kind {
        DamageKind::Firearm => "E-11-SR",
        DamageKind::Melee => "Jailbird",
        DamageKind::Explosion => "Grenade",
        DamageKind::Trap(_) => "Tesla",
        DamageKind::Other => "Unknown",
    }
}

/// Debug-level log output for the calling test, shown with `--nocapture`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
