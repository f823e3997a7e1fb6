//! # Teamkill Guard
//!
//! Teamkill Guard detects friendly-fire violations ("team attacks" and "team kills") in
//! round-based multiplayer games, attributes delayed and indirect damage to the player
//! actually responsible for it, reverses mass team-kills caused by a single explosive and
//! escalates punishment per offender based on how many team kills they caused this round.
//!
//! The library does not register callbacks with your engine. Instead you forward engine
//! events to a [`TeamKillGuard`] and it returns a list of [`GuardRequest`]s for you to
//! fulfil (send a message, change a role, ban a player, persist a ban record). Delayed work
//! such as punishment evaluation is queued internally and released by [`TeamKillGuard::poll`].
//!
//! ```ignore
//! let mut guard = GuardBuilder::<MyConfig>::new()
//!     .with_rules(MY_RULES)
//!     .with_settings(settings)
//!     .build()?;
//!
//! guard.start_round(Instant::now());
//! // every tick:
//! for request in guard.poll(&world, Instant::now()) {
//!     host.fulfil(request);
//! }
//! for event in guard.events() {
//!     // GuardEvent::TeamKill, GuardEvent::TeamAttack, ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
use std::fmt::Debug;
use std::hash::Hash;

pub use affinity::{AffinityMatrix, AffinityRule, SelfHarmPolicy};
pub use ban::{BanKind, BanRecord};
pub use builder::GuardBuilder;
pub use config::{GuardConfig, HostActorPolicy};
pub use error::GuardError;
pub use event_drain::EventDrain;
pub use guard::{TeamKillGuard, MAX_EVENT_QUEUE_SIZE};
pub use incident::{AttributionPath, DetectionCode, Incident, IncidentKind};
pub use ledger::IncidentLedger;
pub use player::{
    AreaEffectEvent, AreaEffectKind, Attacker, DamageEvent, DamageKind, DamageTool, DeathEvent,
    PlayerSnapshot, PreviousOwner, TrapTriggerEvent,
};
pub use punishment::{PunishmentTier, PunishmentTiers, RawTier, TierValue};
pub use settings::Settings;
pub use telemetry::{
    CollectingObserver, CompositeObserver, SpecViolation, TracingObserver, ViolationKind,
    ViolationObserver, ViolationSeverity,
};
pub use translation::Translations;

pub mod affinity;
#[doc(hidden)]
pub mod ban;
#[doc(hidden)]
pub mod builder;
#[doc(hidden)]
pub mod classifier;
pub mod config;
#[doc(hidden)]
pub mod error;
#[doc(hidden)]
pub mod event_drain;
#[doc(hidden)]
pub mod guard;
pub mod incident;
pub mod ledger;
#[doc(hidden)]
pub mod mass_incident;
#[doc(hidden)]
pub mod notify;
pub mod player;
pub mod punishment;
pub mod reports;
pub mod round;
#[doc(hidden)]
pub mod scheduler;
pub mod settings;
pub mod telemetry;
pub mod translation;

/// Internal module exposing implementation details for testing.
///
/// **This module is NOT part of the public API.** Everything here may change without
/// notice and is only re-exported so integration and property tests can drive the round
/// caches and the task queue directly.
#[doc(hidden)]
pub mod __internal {
    pub use crate::classifier::{classify, Hit, HostileFire, Verdict};
    pub use crate::mass_incident::{resolve_owner, AttributionMiss};
    pub use crate::round::attribution::{Attribution, AttributionStore, TrapTrigger};
    pub use crate::round::deceased::{DeceasedCache, DeceasedRecord};
    pub use crate::round::departed::{DepartedDirectory, DepartedRecord};
    pub use crate::round::RoundState;
    pub use crate::scheduler::{MassCheck, MassTarget, Task, TaskQueue};
}

// #############
// #    IDS    #
// #############

/// Engine-side identifier of a connected player.
///
/// Player ids are only meaningful while the player is connected; once a player leaves,
/// attribution falls back to their [`UserId`].
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new `PlayerId` from the engine's raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PlayerId {
    #[inline]
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Stable account identifier of a player (for example `76561198000000000@steam`).
///
/// Unlike [`PlayerId`], a user id survives disconnects and is what bans are keyed by.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct UserId(String);

impl UserId {
    /// Creates a new `UserId`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id is empty or whitespace only, which the engine uses for
    /// "could not be determined".
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Sequential identifier of a round. Increments on every [`TeamKillGuard::start_round`].
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct RoundId(u32);

impl RoundId {
    /// Creates a new `RoundId`.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the id of the round following this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// How many rounds ago `self` was, seen from `current`.
    #[inline]
    #[must_use]
    pub const fn rounds_before(self, current: Self) -> u32 {
        current.0.saturating_sub(self.0)
    }
}

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single area-effect instance (one grenade detonation).
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct EffectId(u64);

impl EffectId {
    /// Creates a new `EffectId`.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EffectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a trap that players can trigger (e.g. a tesla gate).
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct TrapId(u32);

impl TrapId {
    /// Creates a new `TrapId`.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TrapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ##############
// #  REQUESTS  #
// ##############

/// Text color hint for console messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MessageColor {
    /// Used for messages about kills and failures.
    Red,
    /// Used for messages about attacks and flashes.
    Yellow,
}

impl MessageColor {
    /// Returns the color name as understood by most game consoles.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
        }
    }
}

/// Requests that the guard hands back to the host. Handling them is mandatory.
///
/// Requests should be fulfilled in the order they are returned: a mass-incident rollback
/// for example broadcasts the warning before it restores roles.
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]` because new request types may be
/// added in future versions. Always include a wildcard arm when matching.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum GuardRequest<T>
where
    T: Config,
{
    /// Print a message in the player's client console.
    SendConsoleMessage {
        /// Receiving player.
        player: PlayerId,
        /// Message text, newlines already expanded.
        text: String,
        /// Color hint.
        color: MessageColor,
    },
    /// Show an on-screen broadcast to a single player.
    Broadcast {
        /// Receiving player.
        player: PlayerId,
        /// Broadcast text.
        text: String,
        /// How long the broadcast stays on screen.
        duration: web_time::Duration,
        /// Whether broadcasts currently on screen should be cleared first.
        clear_previous: bool,
    },
    /// Show an on-screen broadcast to every player.
    BroadcastAll {
        /// Broadcast text, already prefixed with the issuer tag.
        text: String,
        /// How long the broadcast stays on screen.
        duration: web_time::Duration,
    },
    /// Change a player's role. Used to revive mass team-kill victims.
    SetRole {
        /// Player to change.
        player: PlayerId,
        /// Role to apply.
        role: T::Role,
    },
    /// Ban a connected player. A zero `duration` means kick.
    BanPlayer {
        /// Player to ban.
        player: PlayerId,
        /// Ban length.
        duration: web_time::Duration,
        /// Reason shown to the player.
        reason: String,
        /// Issuer tag.
        issuer: String,
    },
    /// Persist a ban record for a player that is no longer connected.
    PersistBan {
        /// The record to store.
        record: BanRecord,
        /// Whether the record is keyed by user id or by IP address.
        kind: BanKind,
    },
}

/// Notifications that external modules may subscribe to. Handling them is up to the user.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum GuardEvent<T>
where
    T: Config,
{
    /// A victim died from hostile fire.
    TeamKill(Incident<T>),
    /// A victim was damaged by hostile fire.
    TeamAttack(Incident<T>),
    /// A single area effect killed more friendly targets than the configured threshold and
    /// their deaths were rolled back.
    MassTeamKill {
        /// The effect instance.
        effect: EffectId,
        /// The player the effect was attributed to.
        responsible: UserId,
        /// Number of dead friendly targets.
        dead: usize,
    },
}

// #############
// #  TRAITS   #
// #############

/// Compile time parameterization for a guard.
///
/// Implement this on a marker struct to plug in your game's team and role types.
///
/// ```
/// use teamkill_guard::Config;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// enum Team { Guards, Prisoners, Monsters }
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum Role { Officer, Inmate, Beast, Spectator }
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct GameConfig;
///
/// impl Config for GameConfig {
///     type Team = Team;
///     type Role = Role;
/// }
/// ```
#[cfg(feature = "sync-send")]
pub trait Config: 'static + Clone + Debug + PartialEq + Send + Sync {
    /// Team (faction) a player belongs to.
    type Team: Copy + Eq + Ord + Hash + Debug + Send + Sync;

    /// Role (class) a player plays. Restored on mass team-kill rollback.
    type Role: Clone + PartialEq + Debug + Send + Sync;
}

/// Compile time parameterization for a guard.
#[cfg(not(feature = "sync-send"))]
pub trait Config: 'static + Clone + Debug + PartialEq {
    /// Team (faction) a player belongs to.
    type Team: Copy + Eq + Ord + Hash + Debug;

    /// Role (class) a player plays. Restored on mass team-kill rollback.
    type Role: Clone + PartialEq + Debug;
}

/// Read access to the host game that the guard needs while resolving delayed work.
///
/// Event payloads carry snapshots captured when the event fired; this trait answers the
/// "what does the world look like now" questions (is the victim still dead, is the offender
/// still connected, does the offender hold an exemption permission).
pub trait GameWorld<T: Config> {
    /// Whether a round is currently running.
    ///
    /// Engines commonly throw while shutting down or switching scenes; report that as
    /// [`GuardError::RoundStateUnavailable`] and the guard treats it as "not in a round".
    fn round_in_progress(&self) -> Result<bool, GuardError>;

    /// Current snapshot of a connected player.
    fn player(&self, id: PlayerId) -> Option<PlayerSnapshot<T>>;

    /// Current snapshot of a connected player, looked up by account id.
    fn player_by_user_id(&self, user_id: &UserId) -> Option<PlayerSnapshot<T>>;

    /// Whether a player holds the given permission.
    fn has_permission(&self, player: &PlayerSnapshot<T>, permission: &str) -> bool;
}

// ###################
// # UNIT TESTS      #
// ###################
