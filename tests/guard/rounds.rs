use std::collections::BTreeMap;

use web_time::{Duration, Instant};

use teamkill_guard::{
    Attacker, DamageKind, GuardBuilder, GuardConfig, GuardRequest, PunishmentTiers, RawTier,
    RoundId, TeamKillGuard, UserId,
};

use crate::common::stubs::rules;
use crate::common::{death, grenade, guard, player, shot, StubConfig, StubWorld, Team};

fn kick_at_two() -> TeamKillGuard<StubConfig> {
    let mut levels = BTreeMap::new();
    levels.insert(2, RawTier::new("kick", 0));
    GuardBuilder::new()
        .with_rules(rules())
        .with_tiers(PunishmentTiers::new(levels))
        .build()
        .expect("valid test configuration")
}

#[test]
fn restart_drops_every_round_scoped_cache() {
    let (t, v) = (player(1, Team::ClassD), player(2, Team::ClassD));
    let mut world = StubWorld::with(&[&t, &v]);
    let mut guard = guard();
    let now = Instant::now();
    guard.start_round(now);

    guard.on_death(&world, &death(None, &t, DamageKind::Other), now);
    guard.on_area_effect(&world, &grenade(1, &t, &[&v]), now);
    let round = guard.round_state().unwrap();
    assert_eq!(round.deceased.len(), 1);
    assert_eq!(round.attributions.len(), 1);

    let restart = now + Duration::from_millis(10);
    assert_eq!(guard.start_round(restart), RoundId::new(2));
    let round = guard.round_state().unwrap();
    assert!(round.deceased.is_empty());
    assert!(round.attributions.is_empty());
    assert!(round.departed.is_empty());

    // t's pre-restart ClassD record must not make a Guard's shot hostile
    world.set_team(t.id, Team::Guard);
    let respawned = world.get(t.id).clone();
    guard.on_damage(&world, &shot(&respawned, &v, DamageKind::Firearm), restart);
    // and the grenade's attribution is gone as well
    let mut blast = shot(&t, &v, DamageKind::Explosion);
    blast.attacker = Some(Attacker::Host);
    guard.on_damage(&world, &blast, restart);
    assert!(guard.ledger().current().is_empty());

    // stale tasks are dropped without touching the new round
    assert!(guard.poll(&world, restart + Duration::from_secs(30)).is_empty());
    assert_eq!(guard.pending_tasks(), 0);
}

#[test]
fn offense_count_restarts_with_the_round() {
    let a = player(1, Team::Guard);
    let world = StubWorld::with(&[&a]);
    let mut guard = kick_at_two();
    let now = Instant::now();
    guard.start_round(now);

    let kill = |victim: u32| {
        let v = player(victim, Team::Guard);
        death(Some(Attacker::Player(a.clone())), &v, DamageKind::Melee)
    };
    guard.on_death(&world, &kill(2), now);
    guard.start_round(now + Duration::from_secs(1));
    guard.on_death(&world, &kill(3), now + Duration::from_secs(2));

    assert_eq!(guard.ledger().team_kills_by(&a.user_id, None), 1);
    let requests = guard.poll(&world, now + Duration::from_secs(20));
    assert!(!requests
        .iter()
        .any(|r| matches!(r, GuardRequest::BanPlayer { .. })));

    // a second kill in the same round does reach the tier
    guard.on_death(&world, &kill(4), now + Duration::from_secs(21));
    let requests = guard.poll(&world, now + Duration::from_secs(40));
    assert!(requests
        .iter()
        .any(|r| matches!(r, GuardRequest::BanPlayer { .. })));
}

#[test]
fn events_outside_a_round_are_ignored() {
    let (a, v) = (player(1, Team::Guard), player(2, Team::Guard));
    let mut world = StubWorld::with(&[&a, &v]);
    let mut guard = guard();
    let now = Instant::now();

    // before the first round
    assert!(guard.on_damage(&world, &shot(&a, &v, DamageKind::Firearm), now).is_empty());
    assert!(guard.current_round().is_none());

    guard.start_round(now);
    world.end_round();
    assert!(guard.on_damage(&world, &shot(&a, &v, DamageKind::Firearm), now).is_empty());
    assert!(guard.ledger().is_empty());
}

#[test]
fn reports_cover_retained_rounds_newest_first() {
    let (a, v) = (player(1, Team::Guard), player(2, Team::Scientist));
    let world = StubWorld::with(&[&a, &v]);
    let mut guard = guard();
    let now = Instant::now();

    guard.start_round(now);
    guard.on_damage(&world, &shot(&a, &v, DamageKind::Firearm), now);
    guard.start_round(now + Duration::from_secs(1));
    guard.start_round(now + Duration::from_secs(2));
    guard.on_death(
        &world,
        &death(Some(Attacker::Player(a.clone())), &v, DamageKind::Firearm),
        now + Duration::from_secs(3),
    );

    let report = guard.victim_report(&v.user_id);
    let blocks: Vec<&[String]> = report
        .split(|line| line.starts_with("====="))
        .filter(|b| !b.is_empty())
        .collect();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0][0], "TeamKill");
    assert!(blocks[0].contains(&"RoundsAgo: 0".to_owned()));
    assert_eq!(blocks[1][0], "TeamAttack");
    assert!(blocks[1].contains(&"RoundsAgo: 2".to_owned()));
    assert!(blocks[1].contains(&"Code: 2.2".to_owned()));

    let by_attacker = guard.attacker_report(&a.user_id);
    assert_eq!(by_attacker.iter().filter(|l| l.starts_with("=====")).count(), 2);
    assert!(guard.attacker_report(&UserId::new("nobody@steam")).is_empty());
}

#[test]
fn ledger_keeps_only_the_configured_history() {
    let (a, v) = (player(1, Team::Guard), player(2, Team::Scientist));
    let world = StubWorld::with(&[&a, &v]);
    let mut guard = crate::common::guard_with(GuardConfig {
        retained_rounds: 1,
        ..GuardConfig::default()
    });
    let now = Instant::now();

    for round in 0..4 {
        let at = now + Duration::from_secs(round);
        guard.start_round(at);
        guard.on_damage(&world, &shot(&a, &v, DamageKind::Firearm), at);
    }
    assert_eq!(guard.ledger().rounds().collect::<Vec<_>>(), vec![RoundId::new(3), RoundId::new(4)]);
    assert_eq!(guard.ledger().len(), 2);
}
