//! Account manager
//!
//! Account selection over the accounts stored in the launcher config.

use super::AuthAccount;
use crate::config::AccountsConfig;
use anyhow::Result;

/// Label shown when nobody is logged in
pub const NO_ACCOUNT_LABEL: &str = "No Account Selected";

/// Get the selected account
pub fn selected_account(accounts: &AccountsConfig) -> Option<&AuthAccount> {
    accounts
        .selected
        .as_ref()
        .and_then(|uuid| accounts.entries.get(uuid))
}

/// Set the selected account by UUID
pub fn set_selected<'a>(accounts: &'a mut AccountsConfig, uuid: &str) -> Result<&'a AuthAccount> {
    if !accounts.entries.contains_key(uuid) {
        anyhow::bail!("Account not found: {}", uuid);
    }
    accounts.selected = Some(uuid.to_string());
    Ok(&accounts.entries[uuid])
}

/// Add or replace an account; the first account becomes the selected one
pub fn add_account(accounts: &mut AccountsConfig, account: AuthAccount) {
    let uuid = account.uuid.clone();
    accounts.entries.insert(uuid.clone(), account);

    if selected_account(accounts).is_none() {
        accounts.selected = Some(uuid);
    }
}

/// Remove an account, moving the selection to the first remaining one
pub fn remove_account(accounts: &mut AccountsConfig, uuid: &str) -> Result<AuthAccount> {
    let Some(removed) = accounts.entries.remove(uuid) else {
        anyhow::bail!("Account not found: {}", uuid);
    };

    if accounts.selected.as_deref() == Some(uuid) {
        accounts.selected = accounts.entries.keys().next().cloned();
    }

    Ok(removed)
}

/// Name displayed next to the avatar on the landing screen
pub fn account_label(account: Option<&AuthAccount>) -> &str {
    match account {
        Some(account) if !account.display_name.is_empty() => &account.display_name,
        _ => NO_ACCOUNT_LABEL,
    }
}

/// Rendered skin of a player
pub fn avatar_url(uuid: &str) -> String {
    format!("https://crafatar.com/renders/body/{}?overlay", uuid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::offline_account;

    #[test]
    fn test_first_account_is_selected() {
        let mut accounts = AccountsConfig::default();
        assert!(selected_account(&accounts).is_none());

        let alex = offline_account("Alex");
        add_account(&mut accounts, alex.clone());
        add_account(&mut accounts, offline_account("Steve"));

        assert_eq!(selected_account(&accounts), Some(&alex));
    }

    #[test]
    fn test_set_selected_unknown_fails() {
        let mut accounts = AccountsConfig::default();
        add_account(&mut accounts, offline_account("Alex"));

        assert!(set_selected(&mut accounts, "nope").is_err());
        let steve = offline_account("Steve");
        add_account(&mut accounts, steve.clone());
        assert_eq!(set_selected(&mut accounts, &steve.uuid).unwrap(), &steve);
        assert_eq!(accounts.selected.as_deref(), Some(steve.uuid.as_str()));
    }

    #[test]
    fn test_set_selected_switches_account() {
        let mut accounts = AccountsConfig::default();
        let alex = offline_account("Alex");
        let steve = offline_account("Steve");
        add_account(&mut accounts, alex.clone());
        add_account(&mut accounts, steve.clone());

        let selected = set_selected(&mut accounts, &steve.uuid).unwrap();
        assert_eq!(selected.display_name, "Steve");
        assert_eq!(selected_account(&accounts), Some(&steve));

        set_selected(&mut accounts, &alex.uuid).unwrap();
        assert_eq!(account_label(selected_account(&accounts)), "Alex");
    }

    #[test]
    fn test_remove_selected_moves_selection() {
        let mut accounts = AccountsConfig::default();
        let alex = offline_account("Alex");
        let steve = offline_account("Steve");
        add_account(&mut accounts, alex.clone());
        add_account(&mut accounts, steve.clone());

        remove_account(&mut accounts, &alex.uuid).unwrap();
        assert_eq!(selected_account(&accounts), Some(&steve));

        remove_account(&mut accounts, &steve.uuid).unwrap();
        assert!(accounts.selected.is_none());
        assert!(remove_account(&mut accounts, &steve.uuid).is_err());
    }

    #[test]
    fn test_account_label() {
        assert_eq!(account_label(None), NO_ACCOUNT_LABEL);
        let alex = offline_account("Alex");
        assert_eq!(account_label(Some(&alex)), "Alex");
        assert_eq!(
            avatar_url("abc"),
            "https://crafatar.com/renders/body/abc?overlay"
        );
    }
}
