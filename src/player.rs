//! Event payloads the host forwards to the guard.
//!
//! Every payload carries [`PlayerSnapshot`]s captured when the engine raised the event.
//! The guard never holds live references into the engine; when it needs the current state
//! of a player after a delay it asks the [`GameWorld`](crate::GameWorld) again.

use std::net::IpAddr;

use crate::{Config, EffectId, PlayerId, TrapId, UserId};

/// A player's state at the moment an event fired.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot<T: Config> {
    /// Engine id, valid while connected.
    pub id: PlayerId,
    /// Stable account id.
    pub user_id: UserId,
    /// Display name.
    pub nickname: String,
    /// Team at event time.
    pub team: T::Team,
    /// Role at event time.
    pub role: T::Role,
    /// Address the player connected from, if the host exposes it.
    pub ip: Option<IpAddr>,
    /// Whether the player is still connected.
    pub connected: bool,
    /// Whether the player is alive.
    pub alive: bool,
    /// Whether the player is currently immune to damage.
    pub god_mode: bool,
}

impl<T: Config> PlayerSnapshot<T> {
    /// A connected, alive player without god mode and without a known address.
    pub fn new(
        id: PlayerId,
        user_id: impl Into<UserId>,
        nickname: impl Into<String>,
        team: T::Team,
        role: T::Role,
    ) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            nickname: nickname.into(),
            team,
            role,
            ip: None,
            connected: true,
            alive: true,
            god_mode: false,
        }
    }

    /// Sets the address the player connected from.
    #[must_use]
    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Marks the player as dead.
    #[must_use]
    pub fn dead(mut self) -> Self {
        self.alive = false;
        self
    }

    /// Marks the player as disconnected.
    #[must_use]
    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    /// Enables god mode.
    #[must_use]
    pub fn with_god_mode(mut self) -> Self {
        self.god_mode = true;
        self
    }

    /// `nickname (user_id)`, used in logs and reports.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("({}) {} [{}]", self.id, self.nickname, self.user_id)
    }

    /// Whether both snapshots describe the same person.
    #[must_use]
    pub fn is_same_player(&self, other: &Self) -> bool {
        self.id == other.id || (!self.user_id.is_blank() && self.user_id == other.user_id)
    }
}

/// The proximate source of damage as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Attacker<T: Config> {
    /// A player.
    Player(PlayerSnapshot<T>),
    /// The world or server itself. Delayed detonations are often reported this way.
    Host,
}

impl<T: Config> Attacker<T> {
    /// The player snapshot, unless this is the host.
    #[must_use]
    pub const fn as_player(&self) -> Option<&PlayerSnapshot<T>> {
        match self {
            Self::Player(player) => Some(player),
            Self::Host => None,
        }
    }
}

/// Category of a damage source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DamageKind {
    /// Guns.
    Firearm,
    /// Melee weapons.
    Melee,
    /// Explosives. Eligible for area-effect attribution.
    Explosion,
    /// A trap that some player triggered.
    Trap(TrapId),
    /// Everything else (falling, environment, ...).
    Other,
}

/// Describes what dealt the damage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageTool {
    /// Category.
    pub kind: DamageKind,
    /// Name shown in notifications and reports.
    pub name: String,
}

impl DamageTool {
    /// Creates a tool descriptor.
    pub fn new(kind: DamageKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Whether this is an area-effect tool.
    #[must_use]
    pub const fn is_explosive(&self) -> bool {
        matches!(self.kind, DamageKind::Explosion)
    }

    /// The trap this tool belongs to, if any.
    #[must_use]
    pub const fn trap(&self) -> Option<TrapId> {
        match self.kind {
            DamageKind::Trap(trap) => Some(trap),
            _ => None,
        }
    }
}

/// A player is about to take damage.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageEvent<T: Config> {
    /// Who dealt the damage, if known.
    pub attacker: Option<Attacker<T>>,
    /// Who receives it.
    pub victim: PlayerSnapshot<T>,
    /// What dealt it.
    pub tool: DamageTool,
    /// Hit points.
    pub amount: f32,
    /// `false` if another handler already cancelled the event.
    pub allowed: bool,
}

/// A player is about to die. `victim` carries the team and role held right before death.
#[derive(Debug, Clone, PartialEq)]
pub struct DeathEvent<T: Config> {
    /// Who dealt the killing blow, if known.
    pub killer: Option<Attacker<T>>,
    /// Who dies.
    pub victim: PlayerSnapshot<T>,
    /// What dealt the killing blow.
    pub tool: DamageTool,
    /// Hit points of the killing blow.
    pub amount: f32,
    /// `false` if another handler already cancelled the event.
    pub allowed: bool,
}

/// Kind of area effect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AreaEffectKind {
    /// Lethal explosive with a blast radius.
    Fragmentation,
    /// Blinding, non-lethal.
    Flash,
    /// Anything else the engine reports. Ignored.
    Other,
}

/// Identity recorded on a thrown effect by the engine, kept even after the owner leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousOwner<T: Config> {
    /// Account id if the engine could extract one.
    pub user_id: Option<UserId>,
    /// Team the owner held when throwing.
    pub team: T::Team,
}

/// An area effect is about to apply to a set of targets.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaEffectEvent<T: Config> {
    /// Effect instance.
    pub effect: EffectId,
    /// Effect kind.
    pub kind: AreaEffectKind,
    /// `false` if another handler already cancelled the event.
    pub allowed: bool,
    /// Proximate actor reported by the engine.
    pub thrower: Option<Attacker<T>>,
    /// Owner recorded on the projectile.
    pub previous_owner: Option<PreviousOwner<T>>,
    /// Every player the effect can reach.
    pub targets: Vec<PlayerSnapshot<T>>,
}

/// A player triggered a trap.
#[derive(Debug, Clone, PartialEq)]
pub struct TrapTriggerEvent<T: Config> {
    /// The trap.
    pub trap: TrapId,
    /// The triggering player.
    pub player: PlayerSnapshot<T>,
    /// `false` if another handler already cancelled the event.
    pub allowed: bool,
}
