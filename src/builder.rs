use std::sync::Arc;

use crate::affinity::{AffinityMatrix, AffinityRule};
use crate::config::GuardConfig;
use crate::punishment::PunishmentTiers;
use crate::settings::Settings;
use crate::telemetry::ViolationObserver;
use crate::translation::Translations;
use crate::{Config, GuardError, TeamKillGuard};

/// The [`GuardBuilder`] builds a [`TeamKillGuard`].
///
/// Without any rules nothing is ever friendly fire, so at least one call to
/// [`with_rules`](Self::with_rules) is expected.
///
/// ```
/// use teamkill_guard::{AffinityRule, Config, GuardBuilder, GuardConfig, Settings};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// enum Team { Guards, Prisoners }
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Game;
///
/// impl Config for Game {
///     type Team = Team;
///     type Role = u8;
/// }
///
/// let guard = GuardBuilder::<Game>::new()
///     .with_rules([
///         AffinityRule::same_team(Team::Guards),
///         AffinityRule::same_team(Team::Prisoners),
///     ])
///     .with_config(GuardConfig::strict())
///     .with_settings(&Settings::default())
///     .build()
///     .unwrap();
/// assert!(guard.current_round().is_none());
/// ```
#[must_use = "GuardBuilder must be consumed by calling build()"]
pub struct GuardBuilder<T>
where
    T: Config,
{
    config: GuardConfig,
    rules: Vec<AffinityRule<T::Team>>,
    tiers: PunishmentTiers,
    translations: Translations,
    /// Optional observer for violations. Defaults to logging through `tracing`.
    violation_observer: Option<Arc<dyn ViolationObserver>>,
}

impl<T: Config> std::fmt::Debug for GuardBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Destructure so a new field cannot be forgotten here.
        let Self {
            config,
            rules,
            tiers,
            translations,
            violation_observer,
        } = self;

        f.debug_struct("GuardBuilder")
            .field("config", config)
            .field("rules", rules)
            .field("tiers", tiers)
            .field("translations", translations)
            .field("has_violation_observer", &violation_observer.is_some())
            .finish()
    }
}

impl<T: Config> Default for GuardBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Config> GuardBuilder<T> {
    /// Construct a new builder with default configuration, the default tier table and
    /// default translations.
    pub fn new() -> Self {
        Self {
            config: GuardConfig::default(),
            rules: Vec::new(),
            tiers: PunishmentTiers::default(),
            translations: Translations::default(),
            violation_observer: None,
        }
    }

    /// Replaces the timing and policy configuration.
    ///
    /// Call this before [`with_settings`](Self::with_settings), which overrides the offense
    /// window and the verbose toggle.
    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds team pairs that count as friendly fire.
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = AffinityRule<T::Team>>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Applies operator settings: the tier table, the offense window and verbosity.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.tiers = settings.tiers();
        self.config.offense_window = settings.offense_window();
        self.config.verbose = settings.verbose_output;
        self
    }

    /// Replaces the punishment tier table.
    pub fn with_tiers(mut self, tiers: PunishmentTiers) -> Self {
        self.tiers = tiers;
        self
    }

    /// Replaces the message templates.
    pub fn with_translations(mut self, translations: Translations) -> Self {
        self.translations = translations;
        self
    }

    /// Sets an observer for violations. Without one they are logged through `tracing`.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use teamkill_guard::telemetry::CollectingObserver;
    /// use teamkill_guard::{Config, GuardBuilder};
    ///
    /// #[derive(Debug, Clone, PartialEq)]
    /// struct Game;
    /// impl Config for Game {
    ///     type Team = u8;
    ///     type Role = u8;
    /// }
    ///
    /// let observer = Arc::new(CollectingObserver::new());
    /// let guard = GuardBuilder::<Game>::new()
    ///     .with_violation_observer(observer.clone())
    ///     .build()
    ///     .unwrap();
    /// assert!(guard.violation_observer().is_some());
    /// ```
    pub fn with_violation_observer(mut self, observer: Arc<dyn ViolationObserver>) -> Self {
        self.violation_observer = Some(observer);
        self
    }

    /// Validates the configuration and creates the guard.
    pub fn build(self) -> Result<TeamKillGuard<T>, GuardError> {
        self.config.validate()?;
        if self.rules.is_empty() {
            tracing::warn!("Guard built without affinity rules, nothing will be detected");
        }
        let affinity = AffinityMatrix::new(self.rules).with_self_harm(self.config.self_harm);
        Ok(TeamKillGuard::new(
            self.config,
            affinity,
            self.tiers,
            self.translations,
            self.violation_observer,
        ))
    }
}
