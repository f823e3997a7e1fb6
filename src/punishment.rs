//! Escalating punishment per offender.
//!
//! Every team kill asks for a punishment evaluation. One evaluation per offender can be
//! pending at a time; it runs after a grace delay, counts the offender's team kills in the
//! current round and applies the highest tier not above that count.

use std::collections::BTreeMap;

use web_time::Instant;

use crate::player::PlayerSnapshot;
use crate::scheduler::Task;
use crate::telemetry::{ViolationKind, ViolationSeverity};
use crate::{report_violation_to, Config, GameWorld, GuardError, GuardRequest, TeamKillGuard};

/// One value of a raw tier entry as written in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum TierValue {
    /// A number.
    Number(i64),
    /// A string.
    Text(String),
    /// Anything else (null, float, bool, nested list or map), rendered as written.
    Other(String),
}

impl<'de> serde::Deserialize<'de> for TierValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(TierValueVisitor)
    }
}

struct TierValueVisitor;

impl<'de> serde::de::Visitor<'de> for TierValueVisitor {
    type Value = TierValue;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a tier value")
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<TierValue, E> {
        Ok(TierValue::Number(v))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<TierValue, E> {
        Ok(i64::try_from(v).map_or_else(|_| TierValue::Other(v.to_string()), TierValue::Number))
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<TierValue, E> {
        Ok(TierValue::Other(v.to_string()))
    }

    fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<TierValue, E> {
        Ok(TierValue::Other(v.to_string()))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<TierValue, E> {
        Ok(TierValue::Text(v.to_owned()))
    }

    fn visit_string<E: serde::de::Error>(self, v: String) -> Result<TierValue, E> {
        Ok(TierValue::Text(v))
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<TierValue, E> {
        Ok(TierValue::Other("null".to_owned()))
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<TierValue, E> {
        self.visit_unit()
    }

    fn visit_some<D>(self, deserializer: D) -> Result<TierValue, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde::Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<TierValue, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<TierValue>()? {
            items.push(item);
        }
        Ok(TierValue::Other(format!("{items:?}")))
    }

    fn visit_map<A>(self, mut map: A) -> Result<TierValue, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut entries = Vec::new();
        while let Some((key, value)) = map.next_entry::<TierValue, TierValue>()? {
            entries.push(format!("{key:?}: {value:?}"));
        }
        Ok(TierValue::Other(format!("{{{}}}", entries.join(", "))))
    }
}

/// A tier entry exactly as configured: `[message, duration_minutes]`.
///
/// Entries are kept unparsed so a broken entry only fails the evaluation that reaches it.
/// Any JSON value is accepted; a value that is not a list is kept as a one-element entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct RawTier(pub Vec<TierValue>);

impl<'de> serde::Deserialize<'de> for RawTier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Helper {
            List(Vec<TierValue>),
            Single(TierValue),
        }
        Ok(match Helper::deserialize(deserializer)? {
            Helper::List(values) => Self(values),
            Helper::Single(value) => Self(vec![value]),
        })
    }
}

impl RawTier {
    /// A well-formed entry.
    pub fn new(message: impl Into<String>, duration_minutes: u32) -> Self {
        Self(vec![
            TierValue::Text(message.into()),
            TierValue::Number(i64::from(duration_minutes)),
        ])
    }

    /// Parses the entry configured for `threshold` offenses.
    ///
    /// The duration may be a non-negative number or a string holding one.
    pub fn parse(&self, threshold: u32) -> Result<PunishmentTier, GuardError> {
        let duration = match self.0.as_slice() {
            [TierValue::Text(_), TierValue::Number(n)] => u64::try_from(*n).ok(),
            [TierValue::Text(_), TierValue::Text(s)] => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        match (self.0.first(), duration) {
            (Some(TierValue::Text(message)), Some(duration_minutes)) => Ok(PunishmentTier {
                message: message.clone(),
                duration_minutes,
            }),
            _ => Err(GuardError::MalformedTier {
                threshold,
                raw: format!("{:?}", self.0),
            }),
        }
    }
}

/// A parsed tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunishmentTier {
    /// Reason shown to the offender.
    pub message: String,
    /// Ban length in minutes. 0 kicks.
    pub duration_minutes: u64,
}

impl PunishmentTier {
    /// Whether this tier only kicks.
    #[must_use]
    pub const fn is_kick(&self) -> bool {
        self.duration_minutes == 0
    }
}

/// Offense count thresholds mapped to tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunishmentTiers {
    levels: BTreeMap<u32, RawTier>,
}

impl Default for PunishmentTiers {
    fn default() -> Self {
        Self::new(default_levels())
    }
}

impl PunishmentTiers {
    /// Wraps configured levels.
    #[must_use]
    pub const fn new(levels: BTreeMap<u32, RawTier>) -> Self {
        Self { levels }
    }

    /// The entry for `count` offenses: the exact threshold, else the nearest lower one.
    #[must_use]
    pub fn lookup(&self, count: u32) -> Option<(u32, &RawTier)> {
        if count == 0 {
            return None;
        }
        self.levels
            .range(1..=count)
            .next_back()
            .map(|(threshold, raw)| (*threshold, raw))
    }

    /// Looks up and parses the tier for `count` offenses.
    pub fn resolve(&self, count: u32) -> Option<Result<(u32, PunishmentTier), GuardError>> {
        self.lookup(count)
            .map(|(threshold, raw)| raw.parse(threshold).map(|tier| (threshold, tier)))
    }

    /// Number of configured thresholds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether nothing is configured, which disables punishment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Kick at 3 team kills, then bans of 1 hour, 10 hours, 1 day, 2 days and 30 days.
#[must_use]
pub fn default_levels() -> BTreeMap<u32, RawTier> {
    [
        (3, "TK: You have been kicked for team killing too many times", 0),
        (4, "TK: You have been banned for 1 hour for team killing too many times", 60),
        (5, "TK: You have been banned for 10 hours for team killing too many times", 600),
        (6, "TK: You have been banned for 1 day for team killing too many times", 1440),
        (7, "TK: You have been banned for 2 days for team killing too many times", 2880),
        (10, "TK: You have been banned for 1 month for team killing too many times", 43200),
    ]
    .into_iter()
    .map(|(threshold, message, minutes)| (threshold, RawTier::new(message, minutes)))
    .collect()
}

impl<T: Config> TeamKillGuard<T> {
    /// Queues an evaluation for `offender` unless they are exempt or one is already queued.
    pub(crate) fn request_punishment<W: GameWorld<T>>(
        &mut self,
        world: &W,
        offender: &PlayerSnapshot<T>,
        explosive: bool,
        now: Instant,
    ) {
        let verbose = self.config.verbose;
        let Some(round) = self.round.as_mut() else {
            return;
        };
        if world.has_permission(offender, &self.config.exemption_permission) {
            if verbose {
                tracing::debug!(offender = %offender.user_id, "Skip Code: 4.4");
            }
            return;
        }
        if !round.pending_punishments.insert(offender.user_id.clone()) {
            if verbose {
                tracing::debug!(offender = %offender.user_id, "Skip Code: 4.0");
            }
            return;
        }
        let delay = if explosive {
            self.config.explosive_punish_delay
        } else {
            self.config.punish_delay
        };
        self.tasks.schedule(
            now + delay,
            Task::EvaluatePunishment {
                round: round.id,
                offender: offender.clone(),
            },
        );
    }

    /// Counts the offender's team kills and applies the matching tier.
    pub(crate) fn evaluate_punishment<W: GameWorld<T>>(
        &mut self,
        world: &W,
        offender: &PlayerSnapshot<T>,
        now: Instant,
    ) -> Vec<GuardRequest<T>> {
        let Some(round) = self.round.as_mut() else {
            return Vec::new();
        };
        // cleared before anything can fail so a broken tier never blocks later checks
        round.pending_punishments.remove(&offender.user_id);
        let round_id = round.id;

        let since = self.config.offense_window.and_then(|w| now.checked_sub(w));
        let count = self.ledger.team_kills_by(&offender.user_id, since);
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        tracing::info!(
            offender = %offender.describe(),
            team_kills = count,
            "Evaluating punishment"
        );

        match self.tiers.resolve(count) {
            None => {
                if self.config.verbose {
                    tracing::debug!(team_kills = count, "No punishment tier configured");
                }
                Vec::new()
            },
            Some(Err(err)) => {
                report_violation_to!(
                    self.observer.as_ref(),
                    Some(round_id),
                    ViolationSeverity::Error,
                    ViolationKind::MalformedConfiguration,
                    "Error Code: 4.3 {} (offender {})",
                    err,
                    offender.user_id
                );
                Vec::new()
            },
            Some(Ok((threshold, tier))) => {
                tracing::info!(
                    offender = %offender.describe(),
                    threshold,
                    "Player has been {} for team killing {} players",
                    if tier.is_kick() { "kicked" } else { "banned" },
                    count
                );
                self.ban(world, offender, &tier)
            },
        }
    }
}
