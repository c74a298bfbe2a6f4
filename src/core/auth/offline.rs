//! Offline authentication
//!
//! For playing without a Microsoft account.

use super::{AccountType, AuthAccount};
use md5::{Digest, Md5};

/// Offline-mode UUID, as the vanilla server derives it
///
/// Version 3 (name based) UUID of `OfflinePlayer:<name>`, without dashes.
pub fn offline_uuid(username: &str) -> String {
    let mut bytes = Md5::digest(format!("OfflinePlayer:{}", username).as_bytes()).to_vec();
    bytes[6] = (bytes[6] & 0x0f) | 0x30;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    hex::encode(bytes)
}

/// Build an offline account (no real authentication)
pub fn offline_account(username: &str) -> AuthAccount {
    AuthAccount {
        uuid: offline_uuid(username),
        access_token: String::new(),
        username: username.to_string(),
        display_name: username.to_string(),
        account_type: AccountType::Offline,
        expires_at: None,
    }
}

/// Insert dashes into a 32 character UUID
pub fn hyphenate_uuid(uuid: &str) -> Option<String> {
    if uuid.len() != 32 || !uuid.is_ascii() {
        return None;
    }
    Some(format!(
        "{}-{}-{}-{}-{}",
        &uuid[0..8],
        &uuid[8..12],
        &uuid[12..16],
        &uuid[16..20],
        &uuid[20..32]
    ))
}
