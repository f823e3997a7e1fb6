//! Turns incidents and area effects into player-facing messages.

use web_time::Duration;

use crate::incident::{Incident, IncidentKind};
use crate::player::PlayerSnapshot;
use crate::translation::{render, Translations};
use crate::{Config, GuardRequest, MessageColor, PlayerId};

const TEAM_KILL_BROADCAST: Duration = Duration::from_secs(5);
const TEAM_ATTACK_BROADCAST: Duration = Duration::from_secs(1);
const FLASH_BROADCAST: Duration = Duration::from_secs(5);
const MASS_BROADCAST: Duration = Duration::from_secs(5);
/// Code shown in the mass team kill broadcast.
pub const MASS_TEAM_KILL_CODE: &str = "5.4";

/// The `{TeamKillInfo}` / `{TeamAttackInfo}` block of an incident.
pub(crate) fn info_block<T: Config>(
    translations: &Translations,
    incident: &Incident<T>,
    attacker_connected: bool,
) -> String {
    let lines = match incident.kind() {
        IncidentKind::TeamKill => &translations.team_kill_info,
        IncidentKind::TeamAttack => &translations.team_attack_info,
    };
    let mut attacker = incident.attacker().describe();
    if !attacker_connected {
        attacker = format!("{} ({})", attacker, translations.disconnected);
    }
    let attacker_team = format!("{:?}", incident.attacker_team());
    let victim = incident.victim().describe();
    let victim_team = format!("{:?}", incident.victim_team());
    let amount = incident.amount().to_string();
    let code = incident.code().to_string();
    let vars = [
        ("Attacker", attacker.as_str()),
        ("AttackerTeam", attacker_team.as_str()),
        ("Victim", victim.as_str()),
        ("VictimTeam", victim_team.as_str()),
        ("Tool", incident.tool().name.as_str()),
        ("Amount", amount.as_str()),
        ("DetectionCode", code.as_str()),
    ];
    lines
        .iter()
        .filter_map(|line| render(line, &vars))
        .collect::<Vec<_>>()
        .join("\n")
}

fn broadcast<T: Config>(player: PlayerId, text: String, duration: Duration) -> GuardRequest<T> {
    GuardRequest::Broadcast {
        player,
        text,
        duration,
        clear_previous: true,
    }
}

fn console<T: Config>(player: PlayerId, text: String, color: MessageColor) -> GuardRequest<T> {
    GuardRequest::SendConsoleMessage {
        player,
        text,
        color,
    }
}

/// Broadcast and console message for both sides of an incident. The attacker only gets
/// theirs while connected.
pub(crate) fn incident_notices<T: Config>(
    translations: &Translations,
    incident: &Incident<T>,
    attacker_connected: bool,
) -> Vec<GuardRequest<T>> {
    let info = info_block(translations, incident, attacker_connected);
    let attacker = incident.attacker();
    let victim = incident.victim();
    let (duration, attacker_color, info_key, templates) = match incident.kind() {
        IncidentKind::TeamKill => (
            TEAM_KILL_BROADCAST,
            MessageColor::Red,
            "TeamKillInfo",
            [
                &translations.team_kill_victim_broadcast,
                &translations.team_kill_victim_console,
                &translations.team_kill_attacker_broadcast,
                &translations.team_kill_attacker_console,
            ],
        ),
        IncidentKind::TeamAttack => (
            TEAM_ATTACK_BROADCAST,
            MessageColor::Yellow,
            "TeamAttackInfo",
            [
                &translations.team_attack_victim_broadcast,
                &translations.team_attack_victim_console,
                &translations.team_attack_attacker_broadcast,
                &translations.team_attack_attacker_console,
            ],
        ),
    };
    let vars = [
        ("AttackerName", attacker.nickname.as_str()),
        ("VictimName", victim.nickname.as_str()),
        (info_key, info.as_str()),
    ];
    let [victim_broadcast, victim_console, attacker_broadcast, attacker_console] = templates;

    let mut requests = Vec::with_capacity(4);
    if let Some(text) = render(victim_broadcast, &vars) {
        requests.push(broadcast(victim.id, text, duration));
    }
    if let Some(text) = render(victim_console, &vars) {
        requests.push(console(victim.id, text, MessageColor::Yellow));
    }
    if attacker_connected {
        if let Some(text) = render(attacker_broadcast, &vars) {
            requests.push(broadcast(attacker.id, text, duration));
        }
        if let Some(text) = render(attacker_console, &vars) {
            requests.push(console(attacker.id, text, attacker_color));
        }
    }
    requests
}

/// Notices for a flash that hit teammates. Nothing is sent if no victim is listed.
pub(crate) fn flash_notices<T: Config>(
    translations: &Translations,
    thrower: &PlayerSnapshot<T>,
    victims: &[&PlayerSnapshot<T>],
) -> Vec<GuardRequest<T>> {
    if victims.is_empty() {
        return Vec::new();
    }
    let mut requests = Vec::with_capacity(victims.len() * 2 + 2);
    let by = [("AttackerName", thrower.nickname.as_str())];
    for victim in victims {
        if let Some(text) = render(&translations.flashed_victim_broadcast, &by) {
            requests.push(broadcast(victim.id, text, FLASH_BROADCAST));
        }
        if let Some(text) = render(&translations.flashed_victim_console, &by) {
            requests.push(console(victim.id, text, MessageColor::Yellow));
        }
    }
    let names = victims
        .iter()
        .map(|v| v.nickname.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let listed = [("VictimName", names.as_str())];
    if let Some(text) = render(&translations.flashed_attacker_broadcast, &listed) {
        requests.push(broadcast(thrower.id, text, FLASH_BROADCAST));
    }
    if let Some(text) = render(&translations.flashed_attacker_console, &listed) {
        requests.push(console(thrower.id, text, MessageColor::Yellow));
    }
    requests
}

/// Global warning after a mass team kill, prefixed with the issuer tag.
pub(crate) fn mass_broadcast<T: Config>(
    translations: &Translations,
    issuer: &str,
    dead: usize,
) -> Option<GuardRequest<T>> {
    let count = dead.to_string();
    render(
        &translations.mass_team_kill_broadcast,
        &[("TKCount", count.as_str()), ("Code", MASS_TEAM_KILL_CODE)],
    )
    .map(|text| GuardRequest::BroadcastAll {
        text: format!("[{issuer}] {text}"),
        duration: MASS_BROADCAST,
    })
}

/// Tells a mass team kill victim that their role could not be restored.
pub(crate) fn missing_role_notice<T: Config>(
    translations: &Translations,
    player: PlayerId,
) -> Option<GuardRequest<T>> {
    render(&translations.missing_role_console, &[])
        .map(|text| console(player, text, MessageColor::Red))
}
