//! Authentication module
//!
//! Stored accounts, account selection and token validation.

mod manager;
mod offline;
mod validate;

pub use manager::{
    account_label, add_account, avatar_url, remove_account, selected_account, set_selected,
};
pub use offline::{hyphenate_uuid, offline_account, offline_uuid};
pub use validate::{
    HttpValidator, TokenStatus, TokenValidator, ValidationOutcome, validate_selected,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A logged-in (or offline) player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthAccount {
    /// Profile UUID without dashes
    pub uuid: String,
    #[serde(default)]
    pub access_token: String,
    /// Login name (email for legacy Mojang accounts)
    pub username: String,
    /// In-game name
    pub display_name: String,
    #[serde(default)]
    pub account_type: AccountType,
    /// Token expiry, when known
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Microsoft,
    Mojang,
    Offline,
}

impl AccountType {
    /// Value of the `${user_type}` launch placeholder
    pub fn user_type(self) -> &'static str {
        match self {
            AccountType::Microsoft => "msa",
            AccountType::Mojang => "mojang",
            AccountType::Offline => "legacy",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AccountType::Microsoft => "Microsoft",
            AccountType::Mojang => "Mojang",
            AccountType::Offline => "Offline",
        };
        f.write_str(name)
    }
}
