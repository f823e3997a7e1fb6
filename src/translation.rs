//! Player-facing message templates.
//!
//! Templates use `{Placeholder}` substitution and the two-character sequence `\n` for line
//! breaks, so they can be written on a single line in a settings file. An empty template
//! disables the one notification it belongs to.

use serde::{Deserialize, Serialize};

/// Every message template the guard sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Translations {
    /// Lines of the `{TeamKillInfo}` block.
    pub team_kill_info: Vec<String>,
    /// Lines of the `{TeamAttackInfo}` block.
    pub team_attack_info: Vec<String>,
    /// Appended to a disconnected attacker's name in info blocks.
    pub disconnected: String,

    /// Broadcast to a team attack victim.
    pub team_attack_victim_broadcast: String,
    /// Broadcast to a team attacker.
    pub team_attack_attacker_broadcast: String,
    /// Console message to a team attack victim.
    pub team_attack_victim_console: String,
    /// Console message to a team attacker.
    pub team_attack_attacker_console: String,

    /// Broadcast to a team kill victim.
    pub team_kill_victim_broadcast: String,
    /// Broadcast to a team killer.
    pub team_kill_attacker_broadcast: String,
    /// Console message to a team kill victim.
    pub team_kill_victim_console: String,
    /// Console message to a team killer.
    pub team_kill_attacker_console: String,

    /// Global broadcast on a mass team kill. `{TKCount}`, `{Code}`.
    pub mass_team_kill_broadcast: String,
    /// Console message to a mass team kill victim whose role could not be restored.
    pub missing_role_console: String,

    /// Broadcast to a player flashed by a teammate.
    pub flashed_victim_broadcast: String,
    /// Broadcast to a player who flashed teammates.
    pub flashed_attacker_broadcast: String,
    /// Console message to a player flashed by a teammate.
    pub flashed_victim_console: String,
    /// Console message to a player who flashed teammates. `{VictimName}` lists them all.
    pub flashed_attacker_console: String,
}

const PREFIX: &str = "[Anti TeamKill]";

impl Default for Translations {
    fn default() -> Self {
        let lines = |l: &[&str]| l.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>();
        Self {
            team_kill_info: lines(&[
                "Attacker: {Attacker}",
                "Attacker Team: {AttackerTeam}",
                "Victim: {Victim}",
                "Victim Team: {VictimTeam}",
                "Tool: {Tool}",
                "Detection Code: {DetectionCode}",
            ]),
            team_attack_info: lines(&[
                "Attacker: {Attacker}",
                "Attacker Team: {AttackerTeam}",
                "Victim: {Victim}",
                "Victim Team: {VictimTeam}",
                "Tool: {Tool}",
                "Damage: {Amount}",
                "Detection Code: {DetectionCode}",
            ]),
            disconnected: "DISCONNECTED".to_owned(),
            team_attack_victim_broadcast: "You were attacked by teammate {AttackerName}".to_owned(),
            team_attack_attacker_broadcast:
                "You attacked teammate {VictimName}\\nThis will not be tolerated".to_owned(),
            team_attack_victim_console: format!(
                "{PREFIX} You were attacked by teammate {{AttackerName}}\\n{{TeamAttackInfo}}"
            ),
            team_attack_attacker_console: format!(
                "{PREFIX} You attacked teammate {{VictimName}}\\n{{TeamAttackInfo}}"
            ),
            team_kill_victim_broadcast: "You were killed by teammate {AttackerName}".to_owned(),
            team_kill_attacker_broadcast:
                "You killed teammate {VictimName}\\nThis will not be tolerated".to_owned(),
            team_kill_victim_console: format!(
                "{PREFIX} You were killed by teammate {{AttackerName}}\\n{{TeamKillInfo}}"
            ),
            team_kill_attacker_console: format!(
                "{PREFIX} You killed teammate {{VictimName}}\\n{{TeamKillInfo}}"
            ),
            mass_team_kill_broadcast: "Mass team kill detected, respawning {TKCount} players"
                .to_owned(),
            missing_role_console: format!(
                "{PREFIX} Could not determine your role before death (Error Code: 5.1)"
            ),
            flashed_victim_broadcast: "You were flashed by teammate {AttackerName}".to_owned(),
            flashed_attacker_broadcast: "You flashed a teammate".to_owned(),
            flashed_victim_console: format!(
                "{PREFIX} You were flashed by teammate {{AttackerName}}"
            ),
            flashed_attacker_console: format!("{PREFIX} You flashed teammates:\\n{{VictimName}}"),
        }
    }
}

/// Substitutes `vars` into `template` and expands `\n`. `None` when the template is empty.
///
/// The template is scanned once, so substituted values are inserted verbatim even when
/// they look like placeholders themselves.
#[must_use]
pub fn render(template: &str, vars: &[(&str, &str)]) -> Option<String> {
    if template.trim().is_empty() {
        return None;
    }
    let mut text = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(at) = rest.find(['{', '\\']) {
        text.push_str(&rest[..at]);
        rest = &rest[at..];
        if let Some(after) = rest.strip_prefix("\\n") {
            text.push('\n');
            rest = after;
            continue;
        }
        let value = rest
            .strip_prefix('{')
            .and_then(|inner| inner.split_once('}'))
            .and_then(|(name, after)| {
                let (_, value) = vars.iter().find(|(var, _)| *var == name)?;
                Some((*value, after))
            });
        match value {
            Some((value, after)) => {
                text.push_str(value);
                rest = after;
            },
            None => {
                // not a known placeholder: keep the opening character and move on
                text.push_str(&rest[..1]);
                rest = &rest[1..];
            },
        }
    }
    text.push_str(rest);
    Some(text)
}
