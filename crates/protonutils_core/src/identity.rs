//! Conversions between the three forms of a Steam account identifier.
//!
//! Steam files disagree on how they name a user: `loginusers.vdf` keys users by
//! their 64-bit id, `userdata/` directories use the 32-bit account number, and
//! the classic textual form `STEAM_0:Y:Z` sits between the two. The 32-bit
//! account number is the low word of the 64-bit id; the textual form splits it
//! into its lowest bit `Y` and the remaining bits `Z`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core_api::CoreError;
use crate::login_users::KnownUsers;

/// 64-bit id of account number zero in the public universe.
pub const ID64_BASE: u64 = 76_561_197_960_265_728;

const STEAM_ID_PREFIX: &str = "STEAM_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdentity {
    id64: String,
    id32: u32,
    display_id32: String,
}

impl UserIdentity {
    pub fn from_id64(id64: u64) -> Option<Self> {
        let text = encode32(id64)?;
        let id32 = decode32(&text)?;
        Self::from_account_id(id32)
    }

    pub fn from_account_id(id32: u32) -> Option<Self> {
        // Account zero is the anonymous user and never owns a userdata directory.
        account_to_text(id32)?;
        Some(Self {
            id64: encode64(id32).to_string(),
            id32,
            display_id32: id32.to_string(),
        })
    }

    pub fn id64(&self) -> &str {
        &self.id64
    }

    pub fn id32(&self) -> u32 {
        self.id32
    }

    /// Directory name under `userdata/`.
    pub fn display_id32(&self) -> &str {
        &self.display_id32
    }

    /// Textual `STEAM_0:Y:Z` form.
    pub fn steam_id(&self) -> String {
        account_to_text(self.id32).unwrap_or_default()
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_id32, self.id64)
    }
}

/// Resolves a user name or numeric id to an identity.
///
/// Known names win, then a 32-bit account number, then a 64-bit id. A numeric
/// input that would be valid in both widths is read as 32-bit.
pub fn resolve(input: &str, known_users: &KnownUsers) -> Result<UserIdentity, CoreError> {
    if let Some(id64) = known_users.id64(input) {
        debug!(input, id64, "resolved known user name");
        return id64
            .parse::<u64>()
            .ok()
            .and_then(UserIdentity::from_id64)
            .ok_or_else(|| CoreError::identity(input));
    }

    if let Ok(id32) = input.parse::<u32>() {
        return UserIdentity::from_account_id(id32).ok_or_else(|| CoreError::identity(input));
    }

    decode64(input)
        .and_then(UserIdentity::from_id64)
        .ok_or_else(|| CoreError::identity(input))
}

pub fn decode64(text: &str) -> Option<u64> {
    text.parse::<u64>().ok()
}

pub fn encode64(id32: u32) -> u64 {
    ID64_BASE + u64::from(id32)
}

/// Converts a 64-bit id to `STEAM_0:Y:Z`.
pub fn encode32(id64: u64) -> Option<String> {
    let account = id64.checked_sub(ID64_BASE)?;
    let account = u32::try_from(account).ok()?;
    account_to_text(account)
}

/// Converts `STEAM_X:Y:Z` back to the 32-bit account number.
pub fn decode32(text: &str) -> Option<u32> {
    let rest = text.strip_prefix(STEAM_ID_PREFIX)?;
    let mut parts = rest.split(':');
    let universe = parts.next()?;
    let low_bit = parts.next()?.parse::<u32>().ok()?;
    let high_bits = parts.next()?.parse::<u32>().ok()?;
    if parts.next().is_some() || universe.len() != 1 || universe.parse::<u8>().is_err() {
        return None;
    }
    if low_bit > 1 {
        return None;
    }
    high_bits.checked_mul(2)?.checked_add(low_bit)
}

fn account_to_text(id32: u32) -> Option<String> {
    if id32 == 0 {
        return None;
    }
    Some(format!("{STEAM_ID_PREFIX}0:{}:{}", id32 & 1, id32 >> 1))
}
