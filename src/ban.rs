//! Kicks, live bans and offline ban records.

use std::net::IpAddr;

use web_time::{Duration, SystemTime, UNIX_EPOCH};

use crate::player::PlayerSnapshot;
use crate::punishment::PunishmentTier;
use crate::{Config, GameWorld, GuardRequest, TeamKillGuard};

/// Display name stored for players without one.
pub const NO_NICKNAME: &str = "(no nick)";

/// What an offline ban record is keyed by.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BanKind {
    /// Keyed by account id.
    UserId,
    /// Keyed by address.
    Ip,
}

/// A ban to persist for a player who is no longer connected.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BanRecord {
    /// Account id or address, depending on [`BanKind`].
    pub id: String,
    /// Issuer tag.
    pub issuer: String,
    /// Sanitized display name.
    pub original_name: String,
    /// Reason shown to the player.
    pub reason: String,
    /// Issuance, unix seconds.
    pub issued_at: u64,
    /// Expiry, unix seconds.
    pub expires_at: u64,
}

/// Makes a display name safe for ban storage: blank names get a placeholder, non-ASCII and
/// control characters are dropped when `strip_unicode` is set, and the result is capped at
/// `max_len` characters.
#[must_use]
pub fn sanitize_name(name: &str, max_len: usize, strip_unicode: bool) -> String {
    let name = if name.is_empty() { NO_NICKNAME } else { name };
    let cleaned: String = if strip_unicode {
        name.chars()
            .filter(|c| c.is_ascii() && !c.is_ascii_control())
            .collect()
    } else {
        name.to_owned()
    };
    let cleaned = if cleaned.trim().is_empty() {
        NO_NICKNAME.to_owned()
    } else {
        cleaned
    };
    cleaned.chars().take(max_len).collect()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Identical records for the account id and, when known, the address.
#[must_use]
pub fn offline_records(
    user_id: &str,
    ip: Option<IpAddr>,
    name: String,
    reason: &str,
    issuer: &str,
    issued_at: u64,
    duration: Duration,
) -> Vec<(BanRecord, BanKind)> {
    let record = BanRecord {
        id: user_id.to_owned(),
        issuer: issuer.to_owned(),
        original_name: name,
        reason: reason.to_owned(),
        issued_at,
        expires_at: issued_at.saturating_add(duration.as_secs()),
    };
    let mut records = Vec::with_capacity(2);
    if let Some(ip) = ip {
        records.push((
            BanRecord {
                id: ip.to_string(),
                ..record.clone()
            },
            BanKind::Ip,
        ));
    }
    records.insert(0, (record, BanKind::UserId));
    records
}

impl<T: Config> TeamKillGuard<T> {
    /// Applies `tier` to `offender`, live if they are connected and offline otherwise.
    pub(crate) fn ban<W: GameWorld<T>>(
        &self,
        world: &W,
        offender: &PlayerSnapshot<T>,
        tier: &PunishmentTier,
    ) -> Vec<GuardRequest<T>> {
        let duration = Duration::from_secs(tier.duration_minutes.saturating_mul(60));

        if let Some(live) = world.player_by_user_id(&offender.user_id) {
            return vec![GuardRequest::BanPlayer {
                player: live.id,
                duration,
                reason: tier.message.clone(),
                issuer: self.config.issuer.clone(),
            }];
        }

        let name = sanitize_name(
            &offender.nickname,
            self.config.ban_name_max_len,
            self.config.ban_strip_unicode,
        );
        if self.config.verbose {
            tracing::debug!(offender = %offender.user_id, "Status Code: 4.2");
        }
        if tier.is_kick() {
            tracing::info!(
                offender = %offender.user_id,
                name = %name,
                "Player left before being kicked, nothing to persist"
            );
            return Vec::new();
        }
        tracing::info!(name = %name, "Player left before ban, banning offline");

        let ip = self
            .round
            .as_ref()
            .and_then(|round| round.departed.ip_of(&offender.user_id));
        offline_records(
            offender.user_id.as_str(),
            ip,
            name,
            &tier.message,
            &self.config.issuer,
            unix_now(),
            duration,
        )
        .into_iter()
        .map(|(record, kind)| {
            tracing::info!(id = %record.id, ?kind, "Offline banned");
            GuardRequest::PersistBan { record, kind }
        })
        .collect()
    }
}
