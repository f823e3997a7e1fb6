//! Operator-facing incident history.
//!
//! Both reports cover every round the ledger retains, newest incident first, one block of
//! lines per incident. Structured access is available through
//! [`IncidentLedger::against`] and [`IncidentLedger::by`].

use crate::incident::{Incident, IncidentKind};
use crate::ledger::IncidentLedger;
use crate::{Config, UserId};

const SEPARATOR: &str = "=============================================================";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Side {
    Victim,
    Attacker,
}

fn block<T: Config>(incident: &Incident<T>, side: Side, current: crate::RoundId) -> Vec<String> {
    let mut lines = Vec::with_capacity(8);
    lines.push(SEPARATOR.to_owned());
    lines.push(incident.kind().to_string());
    match side {
        Side::Victim => {
            let attacker = incident.attacker();
            lines.push(format!(
                "Attacker: ({}) {} ({:?})",
                attacker.id,
                attacker.nickname,
                incident.attacker_team()
            ));
            lines.push(format!("Attacker UserId: {}", attacker.user_id));
            lines.push(format!("Victim Team: {:?}", incident.victim_team()));
        },
        Side::Attacker => {
            let victim = incident.victim();
            lines.push(format!(
                "Victim: ({}) {} ({:?})",
                victim.id,
                victim.nickname,
                incident.victim_team()
            ));
            lines.push(format!("Attacker Team: {:?}", incident.attacker_team()));
        },
    }
    if incident.kind() == IncidentKind::TeamAttack {
        lines.push(format!("Damage: {}", incident.amount()));
    }
    lines.push(format!("Tool: {}", incident.tool().name));
    lines.push(format!("Code: {}", incident.code()));
    lines.push(format!(
        "RoundsAgo: {}",
        incident.round().rounds_before(current)
    ));
    lines
}

/// Every incident in which `victim` was the victim.
#[must_use]
pub fn victim_report<T: Config>(ledger: &IncidentLedger<T>, victim: &UserId) -> Vec<String> {
    let current = ledger.current_round();
    ledger
        .against(victim)
        .into_iter()
        .flat_map(|incident| block(incident, Side::Victim, current))
        .collect()
}

/// Every incident in which `attacker` was the attacker.
#[must_use]
pub fn attacker_report<T: Config>(ledger: &IncidentLedger<T>, attacker: &UserId) -> Vec<String> {
    let current = ledger.current_round();
    ledger
        .by(attacker)
        .into_iter()
        .flat_map(|incident| block(incident, Side::Attacker, current))
        .collect()
}
