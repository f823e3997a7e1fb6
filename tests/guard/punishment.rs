use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use web_time::{Duration, Instant};

use teamkill_guard::telemetry::{CollectingObserver, ViolationKind};
use teamkill_guard::{
    assert_violation, Attacker, BanKind, DamageKind, GuardBuilder, GuardConfig, GuardRequest,
    PunishmentTiers, RawTier, TeamKillGuard, TierValue,
};

use crate::common::stubs::rules;
use crate::common::{death, player, StubConfig, StubWorld, Team};

const PUNISH_DELAY: Duration = Duration::from_secs(8);

fn tiered(levels: &[(u32, &str, u32)]) -> TeamKillGuard<StubConfig> {
    tiered_with(GuardConfig::default(), levels)
}

fn tiered_with(config: GuardConfig, levels: &[(u32, &str, u32)]) -> TeamKillGuard<StubConfig> {
    let levels: BTreeMap<u32, RawTier> = levels
        .iter()
        .map(|(threshold, message, minutes)| (*threshold, RawTier::new(*message, *minutes)))
        .collect();
    GuardBuilder::new()
        .with_rules(rules())
        .with_config(config)
        .with_tiers(PunishmentTiers::new(levels))
        .build()
        .expect("valid test configuration")
}

fn team_kill(
    guard: &mut TeamKillGuard<StubConfig>,
    world: &StubWorld,
    attacker: u32,
    victim: u32,
    kind: DamageKind,
    at: Instant,
) {
    let a = player(attacker, Team::Guard);
    let v = player(victim, Team::Scientist);
    guard.on_death(world, &death(Some(Attacker::Player(a)), &v, kind), at);
}

fn bans(requests: &[GuardRequest<StubConfig>]) -> Vec<&GuardRequest<StubConfig>> {
    requests
        .iter()
        .filter(|r| matches!(r, GuardRequest::BanPlayer { .. } | GuardRequest::PersistBan { .. }))
        .collect()
}

#[test]
fn four_kills_fall_back_to_the_kick_tier() {
    let a = player(1, Team::Guard);
    let world = StubWorld::with(&[&a]);
    let mut guard = tiered(&[(3, "kick", 0), (5, "ban", 600)]);
    let now = Instant::now();
    guard.start_round(now);

    for victim in 2..=5 {
        team_kill(&mut guard, &world, 1, victim, DamageKind::Firearm, now);
    }
    assert_eq!(guard.round_state().unwrap().pending_punishments.len(), 1);

    let requests = guard.poll(&world, now + PUNISH_DELAY);
    let bans = bans(&requests);
    assert_eq!(bans.len(), 1);
    match bans[0] {
        GuardRequest::BanPlayer {
            player,
            duration,
            reason,
            issuer,
        } => {
            assert_eq!(*player, a.id);
            assert_eq!(*duration, Duration::ZERO);
            assert_eq!(reason, "kick");
            assert_eq!(issuer, "Anti TeamKill System");
        },
        other => panic!("unexpected {other:?}"),
    }
    assert!(guard.round_state().unwrap().pending_punishments.is_empty());
}

#[test]
fn below_the_lowest_tier_nothing_happens() {
    let a = player(1, Team::Guard);
    let world = StubWorld::with(&[&a]);
    let mut guard = tiered(&[(3, "kick", 0)]);
    let now = Instant::now();
    guard.start_round(now);

    team_kill(&mut guard, &world, 1, 2, DamageKind::Firearm, now);
    assert!(bans(&guard.poll(&world, now + PUNISH_DELAY)).is_empty());
}

#[test]
fn explosive_kills_are_evaluated_sooner() {
    let a = player(1, Team::Guard);
    let world = StubWorld::with(&[&a]);
    let mut guard = tiered(&[(1, "ban", 60)]);
    let now = Instant::now();
    guard.start_round(now);

    team_kill(&mut guard, &world, 1, 2, DamageKind::Explosion, now);
    let requests = guard.poll(&world, now + Duration::from_secs(2));
    assert_eq!(bans(&requests).len(), 1);
}

#[test]
fn exempt_players_are_never_scheduled() {
    let a = player(1, Team::Guard);
    let mut world = StubWorld::with(&[&a]);
    world.exempt(&a.user_id);
    let mut guard = tiered(&[(1, "ban", 60)]);
    let now = Instant::now();
    guard.start_round(now);

    team_kill(&mut guard, &world, 1, 2, DamageKind::Firearm, now);
    assert!(guard.round_state().unwrap().pending_punishments.is_empty());
    assert!(bans(&guard.poll(&world, now + PUNISH_DELAY)).is_empty());
}

#[test]
fn offline_ban_covers_user_id_and_captured_ip() {
    let a = player(1, Team::Guard);
    let mut world = StubWorld::with(&[&a]);
    let mut guard = tiered(&[(1, "Banned for team killing", 60)]);
    let now = Instant::now();
    guard.start_round(now);

    team_kill(&mut guard, &world, 1, 2, DamageKind::Firearm, now);
    let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
    let left = world.leave(a.id, Some(ip));
    guard.on_player_left(&world, &left, now + Duration::from_secs(1));

    let requests = guard.poll(&world, now + PUNISH_DELAY);
    let records: Vec<_> = requests
        .iter()
        .filter_map(|r| match r {
            GuardRequest::PersistBan { record, kind } => Some((record, *kind)),
            _ => None,
        })
        .collect();
    assert_eq!(records.len(), 2);
    let (by_id, id_kind) = records[0];
    let (by_ip, ip_kind) = records[1];
    assert_eq!(id_kind, BanKind::UserId);
    assert_eq!(ip_kind, BanKind::Ip);
    assert_eq!(by_id.id, a.user_id.as_str());
    assert_eq!(by_ip.id, ip.to_string());
    assert_eq!(by_id.reason, by_ip.reason);
    assert_eq!(by_id.expires_at, by_ip.expires_at);
    assert_eq!(by_id.expires_at - by_id.issued_at, 3600);
    assert_eq!(by_id.original_name, "Player1");
}

#[test]
fn offline_ban_without_ip_persists_only_the_user_id() {
    let a = player(1, Team::Guard);
    let mut world = StubWorld::with(&[&a]);
    let mut guard = tiered(&[(1, "ban", 60)]);
    let now = Instant::now();
    guard.start_round(now);

    team_kill(&mut guard, &world, 1, 2, DamageKind::Firearm, now);
    let left = world.leave(a.id, None);
    guard.on_player_left(&world, &left, now);

    let requests = guard.poll(&world, now + PUNISH_DELAY);
    let bans = bans(&requests);
    assert_eq!(bans.len(), 1);
    assert!(matches!(
        bans[0],
        GuardRequest::PersistBan {
            kind: BanKind::UserId,
            ..
        }
    ));
}

#[test]
fn offline_kick_persists_nothing() {
    let a = player(1, Team::Guard);
    let mut world = StubWorld::with(&[&a]);
    let mut guard = tiered(&[(1, "kick", 0)]);
    let now = Instant::now();
    guard.start_round(now);

    team_kill(&mut guard, &world, 1, 2, DamageKind::Firearm, now);
    world.leave(a.id, None);
    assert!(bans(&guard.poll(&world, now + PUNISH_DELAY)).is_empty());
}

#[test]
fn malformed_tier_clears_the_marker_and_is_reported() {
    let a = player(1, Team::Guard);
    let world = StubWorld::with(&[&a]);
    let observer = Arc::new(CollectingObserver::new());
    let mut levels = BTreeMap::new();
    levels.insert(
        1,
        RawTier(vec![TierValue::Text("ban".to_owned()), TierValue::Text("soon".to_owned())]),
    );
    levels.insert(2, RawTier::new("kick", 0));
    let mut guard: TeamKillGuard<StubConfig> = GuardBuilder::new()
        .with_rules(rules())
        .with_tiers(PunishmentTiers::new(levels))
        .with_violation_observer(observer.clone())
        .build()
        .unwrap();
    let now = Instant::now();
    guard.start_round(now);

    team_kill(&mut guard, &world, 1, 2, DamageKind::Firearm, now);
    assert!(bans(&guard.poll(&world, now + PUNISH_DELAY)).is_empty());
    assert_violation!(observer, ViolationKind::MalformedConfiguration);
    assert!(guard.round_state().unwrap().pending_punishments.is_empty());

    // the next kill schedules again and reaches the healthy tier
    let later = now + Duration::from_secs(20);
    team_kill(&mut guard, &world, 1, 3, DamageKind::Firearm, later);
    assert_eq!(bans(&guard.poll(&world, later + PUNISH_DELAY)).len(), 1);
}

#[test]
fn kills_older_than_the_offense_window_are_not_counted() {
    let a = player(1, Team::Guard);
    let world = StubWorld::with(&[&a]);
    let config = GuardConfig {
        offense_window: Some(Duration::from_secs(10)),
        ..GuardConfig::default()
    };
    let mut guard = tiered_with(config, &[(2, "kick", 0)]);
    let now = Instant::now();
    guard.start_round(now);

    team_kill(&mut guard, &world, 1, 2, DamageKind::Firearm, now);
    assert!(bans(&guard.poll(&world, now + PUNISH_DELAY)).is_empty());

    let later = now + Duration::from_secs(30);
    team_kill(&mut guard, &world, 1, 3, DamageKind::Firearm, later);
    assert!(bans(&guard.poll(&world, later + PUNISH_DELAY)).is_empty());

    // without a window both kills count
    let mut unbounded = tiered_with(
        GuardConfig {
            offense_window: None,
            ..GuardConfig::default()
        },
        &[(2, "kick", 0)],
    );
    unbounded.start_round(now);
    team_kill(&mut unbounded, &world, 1, 2, DamageKind::Firearm, now);
    unbounded.poll(&world, now + PUNISH_DELAY);
    team_kill(&mut unbounded, &world, 1, 3, DamageKind::Firearm, later);
    assert_eq!(bans(&unbounded.poll(&world, later + PUNISH_DELAY)).len(), 1);
}
