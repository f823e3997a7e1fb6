//! Operator-editable settings, usually loaded from the server's config file.
//!
//! ```
//! use teamkill_guard::Settings;
//!
//! let settings: Settings = serde_json::from_str(r#"{
//!     "ban_levels": { "3": ["Kicked for team killing", 0], "5": ["Banned", "600"] },
//!     "punishment_invalidate_secs": 0
//! }"#).unwrap();
//!
//! assert_eq!(settings.ban_levels.len(), 2);
//! assert!(settings.offense_window().is_none());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::punishment::{default_levels, PunishmentTiers, RawTier};

/// Punishment tiers, the offense window and verbosity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Team kill count mapped to `[message, duration_minutes]`. A duration of 0 kicks.
    pub ban_levels: BTreeMap<u32, RawTier>,
    /// Team kills older than this many seconds are not counted. 0 counts the whole round.
    pub punishment_invalidate_secs: u64,
    /// Log every skipped event with its code.
    pub verbose_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ban_levels: default_levels(),
            punishment_invalidate_secs: 180,
            verbose_output: false,
        }
    }
}

impl Settings {
    /// The configured offense window, `None` when disabled.
    #[must_use]
    pub fn offense_window(&self) -> Option<Duration> {
        (self.punishment_invalidate_secs > 0)
            .then(|| Duration::from_secs(self.punishment_invalidate_secs))
    }

    /// The tier table.
    #[must_use]
    pub fn tiers(&self) -> PunishmentTiers {
        PunishmentTiers::new(self.ban_levels.clone())
    }
}
