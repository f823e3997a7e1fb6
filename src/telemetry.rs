//! Structured telemetry for contained failures.
//!
//! Nothing inside the guard is allowed to propagate a failure back into the host's event
//! dispatcher. Attribution misses, state inconsistencies found during a mass-incident
//! rollback and malformed punishment tiers are instead reported as [`SpecViolation`]s to a
//! [`ViolationObserver`]. By default they are logged through `tracing`; tests use
//! [`CollectingObserver`] to assert on them.
//!
//! ```
//! use teamkill_guard::telemetry::{CollectingObserver, ViolationKind};
//! use std::sync::Arc;
//!
//! let observer = Arc::new(CollectingObserver::new());
//! assert!(observer.violations().is_empty());
//! assert!(!observer.has_violation(ViolationKind::AttributionMiss));
//! ```

use crate::RoundId;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Severity of a violation.
///
/// Severities are ordered from least to most severe, allowing filtering
/// and comparison operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Unexpected but recoverable, the operation continued without the missing data.
    Warning,
    /// An operation was aborted.
    Error,
    /// Round state is known to be corrupted.
    Critical,
}

impl ViolationSeverity {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories of contained failures.
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]` because new categories
/// may be added in future versions. Always include a wildcard arm when matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ViolationKind {
    /// An area effect could not be attributed to a responsible player.
    ///
    /// Examples:
    /// - The effect's previous owner was never set
    /// - The owner's user id could not be extracted
    /// - The owner left the server before the round logged them
    AttributionMiss,
    /// Round caches disagree with the world.
    ///
    /// Example: a dead mass team-kill victim has no recorded pre-death role.
    StateInconsistency,
    /// A configured punishment tier could not be parsed.
    MalformedConfiguration,
    /// The host could not report whether a round is running.
    RoundState,
    /// Configuration constraint violated at runtime.
    Configuration,
    /// Runtime invariant check failed.
    ///
    /// Only checked in debug builds or when the `paranoid` feature is enabled.
    Invariant,
    /// Internal logic error (should never happen).
    InternalError,
}

impl ViolationKind {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AttributionMiss => "attribution_miss",
            Self::StateInconsistency => "state_inconsistency",
            Self::MalformedConfiguration => "malformed_configuration",
            Self::RoundState => "round_state",
            Self::Configuration => "configuration",
            Self::Invariant => "invariant",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded violation.
///
/// ```
/// use teamkill_guard::telemetry::{SpecViolation, ViolationSeverity, ViolationKind};
/// use teamkill_guard::RoundId;
///
/// let violation = SpecViolation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::AttributionMiss,
///     "thrower left before the round logged them",
///     "mass_incident.rs:42",
/// )
/// .with_round(RoundId::new(3))
/// .with_context("user_id", "1234@steam");
///
/// assert_eq!(violation.round, Some(RoundId::new(3)));
/// assert_eq!(violation.context.get("user_id").map(String::as_str), Some("1234@steam"));
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct SpecViolation {
    /// The severity level of this violation.
    pub severity: ViolationSeverity,
    /// The category of this violation.
    pub kind: ViolationKind,
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Source location where the violation was detected (file:line).
    pub location: &'static str,
    /// The round during which the violation occurred, if one was running.
    pub round: Option<RoundId>,
    /// Additional structured context as key-value pairs.
    pub context: BTreeMap<String, String>,
}

impl SpecViolation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(
        severity: ViolationSeverity,
        kind: ViolationKind,
        message: impl Into<String>,
        location: &'static str,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location,
            round: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the round during which this violation occurred.
    #[must_use]
    pub fn with_round(mut self, round: RoundId) -> Self {
        self.round = Some(round);
        self
    }

    /// Adds a context key-value pair.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Serializes this violation to a JSON string.
    ///
    /// Returns `None` if serialization fails (which should not happen for
    /// well-formed violations).
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Serializes this violation to a pretty-printed JSON string.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json_pretty(&self) -> Option<String> {
        serde_json::to_string_pretty(self).ok()
    }
}

impl std::fmt::Display for SpecViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} (at {}",
            self.severity, self.kind, self.message, self.location
        )?;
        if let Some(round) = self.round {
            write!(f, ", round={round}")?;
        }
        if !self.context.is_empty() {
            write!(f, ", context={:?}", self.context)?;
        }
        write!(f, ")")
    }
}

/// Trait for observing violations.
///
/// Implement this trait to forward violations to metrics, alerting or an admin channel.
#[cfg(feature = "sync-send")]
pub trait ViolationObserver: Send + Sync {
    /// Called when a violation is detected. Runs on the event timeline, keep it quick.
    fn on_violation(&self, violation: &SpecViolation);
}

#[cfg(not(feature = "sync-send"))]
/// Trait for observing violations.
///
/// Implement this trait to forward violations to metrics, alerting or an admin channel.
pub trait ViolationObserver {
    /// Called when a violation is detected. Runs on the event timeline, keep it quick.
    fn on_violation(&self, violation: &SpecViolation);
}

/// Built-in observer that logs violations via the `tracing` crate.
///
/// - `Warning` severity → `tracing::warn!`
/// - `Error` and `Critical` severity → `tracing::error!`
///
/// All fields are emitted as structured tracing fields.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates a new tracing observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn format_round(round: Option<RoundId>) -> String {
        round.map_or_else(|| "null".to_owned(), |r| r.to_string())
    }
}

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, violation: &SpecViolation) {
        let severity = violation.severity.as_str();
        let kind = violation.kind.as_str();
        let location = violation.location;
        let round = Self::format_round(violation.round);

        let context_str = if violation.context.is_empty() {
            "{}".to_owned()
        } else {
            let pairs: Vec<String> = violation
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        };

        match violation.severity {
            ViolationSeverity::Warning => {
                tracing::warn!(
                    severity,
                    kind,
                    location,
                    round = %round,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
            ViolationSeverity::Error | ViolationSeverity::Critical => {
                tracing::error!(
                    severity,
                    kind,
                    location,
                    round = %round,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
        }
    }
}

/// Built-in observer that collects violations for testing.
///
/// ```
/// use teamkill_guard::telemetry::{
///     CollectingObserver, SpecViolation, ViolationKind, ViolationObserver, ViolationSeverity,
/// };
///
/// let observer = CollectingObserver::new();
/// observer.on_violation(&SpecViolation::new(
///     ViolationSeverity::Error,
///     ViolationKind::MalformedConfiguration,
///     "tier 4 is missing its duration",
///     "punishment.rs:1",
/// ));
///
/// assert_eq!(observer.len(), 1);
/// assert!(observer.has_violation(ViolationKind::MalformedConfiguration));
/// ```
#[derive(Debug, Default)]
pub struct CollectingObserver {
    violations: Mutex<Vec<SpecViolation>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer with an empty violation list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            violations: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of all collected violations.
    #[must_use]
    pub fn violations(&self) -> Vec<SpecViolation> {
        self.violations.lock().clone()
    }

    /// Returns the number of collected violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.lock().len()
    }

    /// Returns true if no violations have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.lock().is_empty()
    }

    /// Checks if any violation of the specified kind has been collected.
    #[must_use]
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.lock().iter().any(|v| v.kind == kind)
    }

    /// Returns all violations matching the specified kind.
    #[must_use]
    pub fn violations_of_kind(&self, kind: ViolationKind) -> Vec<SpecViolation> {
        self.violations
            .lock()
            .iter()
            .filter(|v| v.kind == kind)
            .cloned()
            .collect()
    }

    /// Clears all collected violations.
    pub fn clear(&self) {
        self.violations.lock().clear();
    }
}

impl ViolationObserver for CollectingObserver {
    fn on_violation(&self, violation: &SpecViolation) {
        self.violations.lock().push(violation.clone());
    }
}

/// A composite observer that forwards violations to multiple observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ViolationObserver>>,
}

impl CompositeObserver {
    /// Creates a new composite observer with no child observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Adds an observer to the composite.
    pub fn add(&mut self, observer: Arc<dyn ViolationObserver>) {
        self.observers.push(observer);
    }
}

impl ViolationObserver for CompositeObserver {
    fn on_violation(&self, violation: &SpecViolation) {
        for observer in &self.observers {
            observer.on_violation(violation);
        }
    }
}

impl std::fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("num_observers", &self.observers.len())
            .finish()
    }
}

/// Reports a violation to an optional observer, falling back to [`TracingObserver`] if `None`.
pub fn report_to_observer<O: ViolationObserver + ?Sized>(
    observer: Option<&Arc<O>>,
    violation: &SpecViolation,
) {
    match observer {
        Some(obs) => obs.on_violation(violation),
        None => TracingObserver.on_violation(violation),
    }
}

/// Macro for reporting violations with location tracking through the default
/// [`TracingObserver`].
///
/// ```
/// use teamkill_guard::{report_violation, telemetry::{ViolationSeverity, ViolationKind}};
///
/// report_violation!(ViolationSeverity::Warning, ViolationKind::InternalError,
///     "unexpected queue length {}", 3);
/// ```
#[macro_export]
macro_rules! report_violation {
    ($severity:expr, $kind:expr, $msg:literal) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};

    ($severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};
}

/// Reports a violation to an optional observer, tagged with the round it happened in.
///
/// `$observer` is an `Option<&Arc<O>>`; `None` falls back to [`TracingObserver`].
///
/// ```
/// use std::sync::Arc;
/// use teamkill_guard::telemetry::{CollectingObserver, ViolationKind, ViolationSeverity};
/// use teamkill_guard::{report_violation_to, RoundId};
///
/// let observer = Arc::new(CollectingObserver::new());
/// report_violation_to!(
///     Some(&observer),
///     Some(RoundId::new(2)),
///     ViolationSeverity::Warning,
///     ViolationKind::AttributionMiss,
///     "thrower {} left unlogged",
///     "1234@steam"
/// );
/// assert_eq!(observer.violations()[0].round, Some(RoundId::new(2)));
/// ```
#[macro_export]
macro_rules! report_violation_to {
    ($observer:expr, $round:expr, $severity:expr, $kind:expr, $($fmt:tt)+) => {{
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            format!($($fmt)+),
            concat!(file!(), ":", line!()),
        );
        let round: Option<$crate::RoundId> = $round;
        let violation = match round {
            Some(round) => violation.with_round(round),
            None => violation,
        };
        $crate::telemetry::report_to_observer($observer, &violation);
    }};
}

/// Asserts that no violations have been collected.
///
/// # Panics
///
/// Panics if the observer contains any violations, printing them for debugging.
#[macro_export]
macro_rules! assert_no_violations {
    ($observer:expr) => {{
        let violations = $observer.violations();
        assert!(
            violations.is_empty(),
            "Expected no violations, but found {}:\n{:#?}",
            violations.len(),
            violations
        );
    }};
}

/// Asserts that a violation of the specified kind was collected.
///
/// # Panics
///
/// Panics if no violation of the specified kind was found.
#[macro_export]
macro_rules! assert_violation {
    ($observer:expr, $kind:expr) => {{
        assert!(
            $observer.has_violation($kind),
            "Expected violation of kind {:?}, but found: {:#?}",
            $kind,
            $observer.violations()
        );
    }};
}

// ==========================================
// Runtime Invariant Checking
// ==========================================

/// Result of an invariant check.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InvariantViolation {
    /// Name of the type whose invariant was violated.
    pub type_name: &'static str,
    /// Description of the violated invariant.
    pub invariant: String,
    /// Additional diagnostic context.
    pub details: Option<String>,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    #[must_use]
    pub fn new(type_name: &'static str, invariant: impl Into<String>) -> Self {
        Self {
            type_name,
            invariant: invariant.into(),
            details: None,
        }
    }

    /// Adds additional details to the violation.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.type_name, self.invariant)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

/// Trait for types that maintain internal invariants.
///
/// Checked by [`debug_check_invariants!`](crate::debug_check_invariants) in debug builds or
/// when the `paranoid` feature is enabled.
pub trait InvariantChecker {
    /// Returns `Ok(())` if all invariants hold, or the first broken one.
    fn check_invariants(&self) -> Result<(), InvariantViolation>;
}

/// Checks invariants in debug builds (or with the `paranoid` feature) and reports a
/// [`ViolationKind::Invariant`] violation on failure. Compiles to nothing otherwise.
#[macro_export]
#[cfg(any(debug_assertions, feature = "paranoid"))]
macro_rules! debug_check_invariants {
    ($expr:expr, $context:expr) => {{
        use $crate::telemetry::InvariantChecker as _;
        if let Err(violation) = $expr.check_invariants() {
            $crate::report_violation!(
                $crate::telemetry::ViolationSeverity::Critical,
                $crate::telemetry::ViolationKind::Invariant,
                "{} [context: {}]",
                violation,
                $context
            );
        }
    }};
}

/// Checks invariants in debug builds (or with the `paranoid` feature) and reports a
/// [`ViolationKind::Invariant`] violation on failure. Compiles to nothing otherwise.
#[macro_export]
#[cfg(not(any(debug_assertions, feature = "paranoid")))]
macro_rules! debug_check_invariants {
    ($expr:expr, $context:expr) => {{}};
}
