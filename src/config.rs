//! Tuning knobs for a guard.
//!
//! | Preset | Use case |
//! |--------|----------|
//! | [`GuardConfig::default()`] | Public servers, matches the classic plugin behavior |
//! | [`GuardConfig::strict()`] | Competitive servers, every kill in the round counts |
//! | [`GuardConfig::lenient()`] | Casual servers with chaotic fights |
//!
//! ```
//! use teamkill_guard::GuardConfig;
//! use web_time::Duration;
//!
//! let config = GuardConfig {
//!     mass_kill_threshold: 5,
//!     ..GuardConfig::default()
//! };
//! assert!(config.validate().is_ok());
//! assert_eq!(config.settle_delay, Duration::from_millis(100));
//! ```

use web_time::Duration;

use crate::affinity::SelfHarmPolicy;
use crate::GuardError;

/// Default issuer tag on broadcasts and bans.
pub const DEFAULT_ISSUER: &str = "Anti TeamKill System";
/// Default permission that exempts a player from punishment.
pub const DEFAULT_EXEMPTION_PERMISSION: &str = "atks.punish_block";

/// How events whose proximate attacker is the host are treated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum HostActorPolicy {
    /// Host-attributed events go through area-effect and trap attribution, which is how
    /// delayed detonations are charged to the player who threw them.
    #[default]
    Attribute,
    /// Host-attributed events are skipped for damage and deaths alike.
    Ignore,
}

/// Timing and policy configuration of a [`TeamKillGuard`](crate::TeamKillGuard).
///
/// # Forward Compatibility
///
/// New fields may be added in future versions. Construct instances with
/// `..GuardConfig::default()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// How long a player's pre-death team and role stay available.
    ///
    /// Default: 10 s
    pub deceased_grace: Duration,

    /// Delay between an area effect and its mass team-kill check.
    ///
    /// Must be shorter than `deceased_grace`, otherwise rollback finds no roles to restore.
    ///
    /// Default: 100 ms
    pub settle_delay: Duration,

    /// Rollback happens when strictly more than this many friendly targets died.
    ///
    /// Default: 3
    pub mass_kill_threshold: usize,

    /// Punishment delay after a team kill with an explosive.
    ///
    /// Default: 2 s
    pub explosive_punish_delay: Duration,

    /// Punishment delay after any other team kill.
    ///
    /// Default: 8 s
    pub punish_delay: Duration,

    /// How long a trap's damage is charged to the player who triggered it.
    ///
    /// Default: 1 s
    pub trap_window: Duration,

    /// Team kills older than this are not counted when punishing. `None` counts the whole
    /// round.
    ///
    /// Default: 180 s
    pub offense_window: Option<Duration>,

    /// Log every skipped event with its code.
    ///
    /// Default: `false`
    pub verbose: bool,

    /// Whether hurting yourself can be friendly fire.
    ///
    /// Default: [`SelfHarmPolicy::Ignore`]
    pub self_harm: SelfHarmPolicy,

    /// What to do with events attributed to the host.
    ///
    /// Default: [`HostActorPolicy::Attribute`]
    pub host_actor: HostActorPolicy,

    /// Previous rounds kept for operator reports.
    ///
    /// Default: 10
    pub retained_rounds: usize,

    /// Maximum length of the display name stored in an offline ban.
    ///
    /// Default: 30
    pub ban_name_max_len: usize,

    /// Strip non-ASCII characters from the display name stored in an offline ban.
    ///
    /// Default: `true`
    pub ban_strip_unicode: bool,

    /// Issuer tag on bans and global broadcasts.
    pub issuer: String,

    /// Permission that exempts a player from punishment.
    pub exemption_permission: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            deceased_grace: Duration::from_secs(10),
            settle_delay: Duration::from_millis(100),
            mass_kill_threshold: 3,
            explosive_punish_delay: Duration::from_secs(2),
            punish_delay: Duration::from_secs(8),
            trap_window: Duration::from_secs(1),
            offense_window: Some(Duration::from_secs(180)),
            verbose: false,
            self_harm: SelfHarmPolicy::Ignore,
            host_actor: HostActorPolicy::Attribute,
            retained_rounds: 10,
            ban_name_max_len: 30,
            ban_strip_unicode: true,
            issuer: DEFAULT_ISSUER.to_owned(),
            exemption_permission: DEFAULT_EXEMPTION_PERMISSION.to_owned(),
        }
    }
}

impl GuardConfig {
    /// Same as [`Default::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every team kill in the round counts, rollback kicks in earlier and punishment lands
    /// sooner.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            mass_kill_threshold: 2,
            explosive_punish_delay: Duration::from_secs(1),
            punish_delay: Duration::from_secs(4),
            offense_window: None,
            self_harm: SelfHarmPolicy::Count,
            ..Self::default()
        }
    }

    /// Tolerates more chaos: a shorter offense window and a higher rollback threshold.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            mass_kill_threshold: 5,
            punish_delay: Duration::from_secs(15),
            offense_window: Some(Duration::from_secs(60)),
            ..Self::default()
        }
    }

    /// Checks value ranges and relations between values.
    pub fn validate(&self) -> Result<(), GuardError> {
        if self.deceased_grace.is_zero() {
            return Err(invalid("deceased_grace", "must be positive"));
        }
        if self.settle_delay.is_zero() {
            return Err(invalid("settle_delay", "must be positive"));
        }
        if self.settle_delay >= self.deceased_grace {
            return Err(invalid(
                "settle_delay",
                format!(
                    "must be shorter than deceased_grace ({:?} >= {:?})",
                    self.settle_delay, self.deceased_grace
                ),
            ));
        }
        if self.mass_kill_threshold == 0 {
            return Err(invalid("mass_kill_threshold", "must be at least 1"));
        }
        if self.explosive_punish_delay < self.settle_delay {
            return Err(invalid(
                "explosive_punish_delay",
                "must not be shorter than settle_delay",
            ));
        }
        if self.punish_delay.is_zero() {
            return Err(invalid("punish_delay", "must be positive"));
        }
        if self.trap_window.is_zero() {
            return Err(invalid("trap_window", "must be positive"));
        }
        if self.offense_window.is_some_and(|w| w.is_zero()) {
            return Err(invalid(
                "offense_window",
                "use None instead of a zero window",
            ));
        }
        if self.ban_name_max_len == 0 {
            return Err(invalid("ban_name_max_len", "must be at least 1"));
        }
        if self.issuer.trim().is_empty() {
            return Err(invalid("issuer", "must not be blank"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> GuardError {
    GuardError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}
