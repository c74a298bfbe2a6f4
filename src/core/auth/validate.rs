//! Access token validation
//!
//! Run before every launch so an expired session is caught in the launcher
//! instead of failing with "Failed to verify username" in game.

use super::manager::{remove_account, selected_account};
use super::{AccountType, AuthAccount};
use crate::config::AccountsConfig;
use chrono::Utc;
use std::future::Future;

const MOJANG_VALIDATE_URL: &str = "https://authserver.mojang.com/validate";
const MC_PROFILE_URL: &str = "https://api.minecraftservices.com/minecraft/profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    Invalid,
    /// The auth service could not be reached
    Unknown,
}

/// Checks whether an account's access token is still accepted
pub trait TokenValidator {
    fn validate(&self, account: &AuthAccount) -> impl Future<Output = TokenStatus> + Send;
}

/// Validator talking to the Mojang and Minecraft services
pub struct HttpValidator {
    client: reqwest::Client,
}

impl HttpValidator {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn validate_mojang(&self, account: &AuthAccount) -> TokenStatus {
        let body = serde_json::json!({ "accessToken": account.access_token });
        match self.client.post(MOJANG_VALIDATE_URL).json(&body).send().await {
            Ok(response) if response.status().as_u16() == 204 => TokenStatus::Valid,
            Ok(response) if response.status().as_u16() == 403 => TokenStatus::Invalid,
            Ok(response) => {
                tracing::warn!("Unexpected validate response: {}", response.status());
                TokenStatus::Unknown
            }
            Err(e) => {
                tracing::warn!("Failed to reach the Mojang auth server: {}", e);
                TokenStatus::Unknown
            }
        }
    }

    async fn validate_microsoft(&self, account: &AuthAccount) -> TokenStatus {
        if account.expires_at.is_some_and(|exp| exp <= Utc::now()) {
            return TokenStatus::Invalid;
        }

        match self
            .client
            .get(MC_PROFILE_URL)
            .bearer_auth(&account.access_token)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => TokenStatus::Valid,
            Ok(response) if matches!(response.status().as_u16(), 401 | 403) => {
                TokenStatus::Invalid
            }
            Ok(response) => {
                tracing::warn!("Unexpected profile response: {}", response.status());
                TokenStatus::Unknown
            }
            Err(e) => {
                tracing::warn!("Failed to reach Minecraft services: {}", e);
                TokenStatus::Unknown
            }
        }
    }
}

impl TokenValidator for HttpValidator {
    async fn validate(&self, account: &AuthAccount) -> TokenStatus {
        match account.account_type {
            AccountType::Offline => TokenStatus::Valid,
            AccountType::Mojang => self.validate_mojang(account).await,
            AccountType::Microsoft => self.validate_microsoft(account).await,
        }
    }
}

/// Result of checking the selected account before a launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    NoAccount,
    Valid,
    /// Validity unknown; the account is kept
    Unverified,
    /// The account was removed
    Invalid {
        display_name: String,
        /// Accounts left after the removal
        remaining: usize,
    },
}

/// Validate the selected account, dropping it when its token was rejected
///
/// The caller is responsible for saving the config afterwards.
pub async fn validate_selected<V: TokenValidator>(
    accounts: &mut AccountsConfig,
    validator: &V,
) -> ValidationOutcome {
    let Some(account) = selected_account(accounts).cloned() else {
        return ValidationOutcome::NoAccount;
    };

    match validator.validate(&account).await {
        TokenStatus::Valid => ValidationOutcome::Valid,
        TokenStatus::Unknown => ValidationOutcome::Unverified,
        TokenStatus::Invalid => {
            tracing::warn!("Login for {} is no longer valid", account.display_name);
            let _ = remove_account(accounts, &account.uuid);
            ValidationOutcome::Invalid {
                display_name: account.display_name,
                remaining: accounts.entries.len(),
            }
        }
    }
}
