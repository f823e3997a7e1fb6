use web_time::{Duration, Instant};

use teamkill_guard::telemetry::ViolationKind;
use teamkill_guard::{
    assert_violation, AreaEffectEvent, AreaEffectKind, Attacker, AttributionPath, DamageEvent,
    DamageKind, DamageTool, EffectId, GuardConfig, GuardEvent, GuardRequest, IncidentKind,
    MessageColor, PreviousOwner, SelfHarmPolicy, TrapId, TrapTriggerEvent,
};

use crate::common::{death, grenade, guard, guard_with, observed, player, shot, StubWorld, Team};

#[test]
fn direct_team_kill_is_recorded_notified_and_punished() {
    let (a, v) = (player(1, Team::Guard), player(2, Team::Scientist));
    let world = StubWorld::with(&[&a, &v]);
    let mut guard = guard();
    let now = Instant::now();
    guard.start_round(now);

    let kill = death(Some(Attacker::Player(a.clone())), &v, DamageKind::Firearm);
    let requests = guard.on_death(&world, &kill, now);

    assert_eq!(requests.len(), 4);
    assert!(requests.iter().any(|r| matches!(
        r,
        GuardRequest::SendConsoleMessage { player, color: MessageColor::Red, .. } if *player == a.id
    )));
    assert!(requests.iter().any(|r| matches!(
        r,
        GuardRequest::SendConsoleMessage { player, color: MessageColor::Yellow, .. }
            if *player == v.id
    )));
    let incidents = guard.ledger().current();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].kind(), IncidentKind::TeamKill);
    assert_eq!(incidents[0].code().to_string(), "1.2");
    assert_eq!(incidents[0].attacker_team(), Team::Guard);

    let events: Vec<_> = guard.events().collect();
    assert!(matches!(events.as_slice(), [GuardEvent::TeamKill(i)] if i.victim().id == v.id));
    assert_eq!(guard.events().len(), 0);

    // victim's deceased record expiry and the punishment evaluation
    assert_eq!(guard.pending_tasks(), 2);
}

#[test]
fn non_hostile_kill_yields_no_incident() {
    let (a, v) = (player(1, Team::Chaos), player(2, Team::Guard));
    let world = StubWorld::with(&[&a, &v]);
    let mut guard = guard();
    let now = Instant::now();
    guard.start_round(now);

    let kill = death(Some(Attacker::Player(a)), &v, DamageKind::Firearm);
    let requests = guard.on_death(&world, &kill, now);

    assert!(requests.is_empty());
    assert!(guard.ledger().is_empty());
    assert_eq!(guard.events().len(), 0);
    // only the victim's expiry task
    assert_eq!(guard.pending_tasks(), 1);
}

#[test]
fn killer_who_died_first_is_charged_under_recorded_team() {
    let (k, v) = (player(1, Team::ClassD), player(2, Team::ClassD));
    let mut world = StubWorld::with(&[&k, &v]);
    let mut guard = guard();
    let now = Instant::now();
    guard.start_round(now);

    // k dies while their bullet is still in flight
    guard.on_death(&world, &death(None, &k, DamageKind::Other), now);
    world.set_team(k.id, Team::Guard);
    let respawned = world.get(k.id).clone();
    assert_eq!(respawned.team, Team::Guard);

    let later = now + Duration::from_secs(2);
    let kill = death(Some(Attacker::Player(respawned)), &v, DamageKind::Firearm);
    guard.on_death(&world, &kill, later);

    let incidents = guard.ledger().current();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].attacker_team(), Team::ClassD);
    assert_eq!(incidents[0].code().path, AttributionPath::Retroactive);
    assert_eq!(incidents[0].code().to_string(), "1.3");
}

#[test]
fn expired_deceased_record_no_longer_attributes() {
    let (k, v) = (player(1, Team::ClassD), player(2, Team::ClassD));
    let mut world = StubWorld::with(&[&k, &v]);
    let mut guard = guard();
    let now = Instant::now();
    guard.start_round(now);

    guard.on_death(&world, &death(None, &k, DamageKind::Other), now);
    world.set_team(k.id, Team::Guard);
    let late = now + Duration::from_secs(11);
    guard.poll(&world, late);
    assert!(guard.round_state().unwrap().deceased.is_empty());

    let respawned = world.get(k.id).clone();
    let kill = death(Some(Attacker::Player(respawned)), &v, DamageKind::Firearm);
    guard.on_death(&world, &kill, late);
    assert!(guard.ledger().is_empty());
}

#[test]
fn delayed_detonation_is_charged_to_thrower_who_left() {
    let (t, v) = (player(1, Team::Guard), player(2, Team::Scientist));
    let mut world = StubWorld::with(&[&t, &v]);
    let mut guard = guard();
    let now = Instant::now();
    guard.start_round(now);

    assert!(guard.on_area_effect(&world, &grenade(9, &t, &[&v]), now).is_empty());
    let left = world.leave(t.id, None);
    guard.on_player_left(&world, &left, now);

    let mut blast = shot(&t, &v, DamageKind::Explosion);
    blast.attacker = Some(Attacker::Host);
    let requests = guard.on_damage(&world, &blast, now + Duration::from_millis(30));

    // attacker is gone, only the victim hears about it
    assert_eq!(requests.len(), 2);
    let incident = &guard.ledger().current()[0];
    assert_eq!(incident.kind(), IncidentKind::TeamAttack);
    assert_eq!(incident.attacker().user_id, t.user_id);
    assert_eq!(incident.code().to_string(), "2.5");
}

#[test]
fn previous_owner_resolves_through_departed_directory() {
    let (t, v) = (player(1, Team::Guard), player(2, Team::Scientist));
    let mut world = StubWorld::with(&[&t, &v]);
    let mut guard = guard();
    let now = Instant::now();
    guard.start_round(now);

    let left = world.leave(t.id, None);
    guard.on_player_left(&world, &left, now);

    let event = AreaEffectEvent {
        effect: EffectId::new(4),
        kind: AreaEffectKind::Fragmentation,
        allowed: true,
        thrower: Some(Attacker::Host),
        previous_owner: Some(PreviousOwner {
            user_id: Some(t.user_id.clone()),
            team: Team::Guard,
        }),
        targets: vec![v.clone()],
    };
    guard.on_area_effect(&world, &event, now);

    let entry = guard.round_state().unwrap().attributions.get(v.id).unwrap();
    assert_eq!(entry.actor.user_id, t.user_id);
    assert!(!entry.actor.connected);
}

#[test]
fn unlogged_thrower_is_an_attribution_miss() {
    let v = player(2, Team::Scientist);
    let world = StubWorld::with(&[&v]);
    let (mut guard, observer) = observed(GuardConfig::default());
    let now = Instant::now();
    guard.start_round(now);

    let event = AreaEffectEvent {
        effect: EffectId::new(4),
        kind: AreaEffectKind::Fragmentation,
        allowed: true,
        thrower: None,
        previous_owner: Some(PreviousOwner {
            user_id: Some("404@steam".into()),
            team: Team::Guard,
        }),
        targets: vec![v.clone()],
    };
    guard.on_area_effect(&world, &event, now);

    assert!(guard.round_state().unwrap().attributions.is_empty());
    assert_eq!(guard.pending_tasks(), 0);
    assert_violation!(observer, ViolationKind::AttributionMiss);
    assert!(observer.violations()[0].message.contains("3.8"));
}

#[test]
fn non_hostile_area_owner_suppresses_instead_of_falling_through() {
    let (t, v) = (player(1, Team::Chaos), player(2, Team::Scientist));
    let world = StubWorld::with(&[&t, &v]);
    let mut guard = guard();
    let now = Instant::now();
    guard.start_round(now);

    guard.on_area_effect(&world, &grenade(1, &t, &[&v]), now);
    let mut blast = shot(&t, &v, DamageKind::Explosion);
    blast.attacker = Some(Attacker::Host);
    assert!(guard.on_damage(&world, &blast, now).is_empty());
    assert!(guard.ledger().is_empty());
}

#[test]
fn trap_damage_is_charged_to_the_triggering_player_within_window() {
    let (a, v) = (player(1, Team::Guard), player(2, Team::Scientist));
    let world = StubWorld::with(&[&a, &v]);
    let mut guard = guard();
    let now = Instant::now();
    guard.start_round(now);

    let trap = TrapId::new(3);
    guard.on_trap_triggered(
        &TrapTriggerEvent {
            trap,
            player: a.clone(),
            allowed: true,
        },
        now,
    );
    let zap = DamageEvent {
        attacker: Some(Attacker::Host),
        victim: v.clone(),
        tool: DamageTool::new(DamageKind::Trap(trap), "Tesla"),
        amount: 150.0,
        allowed: true,
    };
    guard.on_damage(&world, &zap, now + Duration::from_millis(200));
    assert_eq!(guard.ledger().current()[0].code().to_string(), "2.9");

    guard.poll(&world, now + Duration::from_secs(1));
    guard.on_damage(&world, &zap, now + Duration::from_secs(1));
    assert_eq!(guard.ledger().current().len(), 1);
}

#[test]
fn flash_notifies_friendly_victims_and_thrower_only() {
    let (t, friend, enemy) = (
        player(1, Team::Guard),
        player(2, Team::Scientist),
        player(3, Team::Chaos),
    );
    let world = StubWorld::with(&[&t, &friend, &enemy]);
    let mut guard = guard();
    let now = Instant::now();
    guard.start_round(now);

    let mut flash = grenade(5, &t, &[&friend, &enemy]);
    flash.kind = AreaEffectKind::Flash;
    let requests = guard.on_area_effect(&world, &flash, now);

    assert_eq!(requests.len(), 4);
    assert!(requests.iter().all(|r| match r {
        GuardRequest::Broadcast { player, .. } | GuardRequest::SendConsoleMessage { player, .. } =>
            *player == t.id || *player == friend.id,
        _ => false,
    }));
    assert!(guard.ledger().is_empty());
    assert_eq!(guard.pending_tasks(), 0);
}

#[test]
fn self_damage_counts_only_under_count_policy() {
    let t = player(1, Team::Guard);
    let world = StubWorld::with(&[&t]);
    let now = Instant::now();

    let mut ignoring = guard();
    ignoring.start_round(now);
    ignoring.on_damage(&world, &shot(&t, &t, DamageKind::Explosion), now);
    assert!(ignoring.ledger().is_empty());

    let mut counting = guard_with(GuardConfig {
        self_harm: SelfHarmPolicy::Count,
        ..GuardConfig::default()
    });
    counting.start_round(now);
    counting.on_damage(&world, &shot(&t, &t, DamageKind::Explosion), now);
    assert_eq!(counting.ledger().current().len(), 1);
}

#[test]
fn failing_round_query_is_contained_and_reported() {
    let (a, v) = (player(1, Team::Guard), player(2, Team::Scientist));
    let mut world = StubWorld::with(&[&a, &v]);
    let (mut guard, observer) = observed(GuardConfig::default());
    let now = Instant::now();
    guard.start_round(now);
    world.break_round_query();

    assert!(guard.on_damage(&world, &shot(&a, &v, DamageKind::Firearm), now).is_empty());
    assert!(guard.ledger().is_empty());
    assert_violation!(observer, ViolationKind::RoundState);
}

#[test]
fn disconnected_victims_and_denied_events_are_skipped() {
    let (a, v) = (player(1, Team::Guard), player(2, Team::Scientist));
    let world = StubWorld::with(&[&a, &v]);
    let mut guard = guard();
    let now = Instant::now();
    guard.start_round(now);

    let mut denied = death(Some(Attacker::Player(a.clone())), &v, DamageKind::Firearm);
    denied.allowed = false;
    guard.on_death(&world, &denied, now);
    let gone = death(Some(Attacker::Player(a)), &v.clone().disconnected(), DamageKind::Firearm);
    guard.on_death(&world, &gone, now);

    assert!(guard.ledger().is_empty());
    // neither created a deceased record
    assert!(guard.round_state().unwrap().deceased.is_empty());
}
