use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// This enum contains all error messages this library can return.
///
/// Event handlers on [`TeamKillGuard`] never return errors: failures inside
/// classification, attribution and punishment are contained and reported through
/// [`telemetry`] instead. `GuardError` is returned by configuration validation and by the
/// [`GameWorld`] seam.
///
/// [`TeamKillGuard`]: crate::TeamKillGuard
/// [`telemetry`]: crate::telemetry
/// [`GameWorld`]: crate::GameWorld
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GuardError {
    /// A configuration value is out of range or inconsistent with another value.
    InvalidConfig {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// A punishment tier entry could not be parsed into a message and a duration.
    MalformedTier {
        /// Offense count the tier is configured for.
        threshold: u32,
        /// Debug rendering of the raw configured values.
        raw: String,
    },
    /// The host could not tell whether a round is running (typically during shutdown or a
    /// scene transition).
    RoundStateUnavailable {
        /// What the host was doing when the query failed.
        context: String,
    },
}

impl Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::InvalidConfig { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            GuardError::MalformedTier { threshold, raw } => {
                write!(
                    f,
                    "Punishment tier for {} offenses is malformed: {}",
                    threshold, raw
                )
            }
            GuardError::RoundStateUnavailable { context } => {
                write!(f, "Round state unavailable: {}", context)
            }
        }
    }
}

impl Error for GuardError {}
