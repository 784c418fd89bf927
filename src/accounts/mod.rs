//! Account store: standard and trial account lists over the key-value store.
//!
//! Standard accounts live under `accounts`, trial accounts under
//! `trialAccounts`. Both are JSON arrays in insertion order. Email addresses
//! are unique across the two lists.

use std::sync::Arc;
use tracing::{debug, info};

use crate::crypto::secret_eq;
use crate::db::{keys, read_json, write_json, Account, AccountKind, KeyValueStore};
use crate::error::StoreError;

#[derive(Clone)]
pub struct AccountStore {
    store: Arc<dyn KeyValueStore>,
}

impl AccountStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Standard accounts in insertion order
    pub async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.load(keys::ACCOUNTS).await
    }

    /// Trial accounts in insertion order
    pub async fn list_trial_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.load(keys::TRIAL_ACCOUNTS).await
    }

    /// Standard accounts followed by trial accounts
    pub async fn list_all(&self) -> Result<Vec<Account>, StoreError> {
        let mut all = self.list_accounts().await?;
        all.extend(self.list_trial_accounts().await?);
        Ok(all)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.list_all().await?.iter().any(|a| a.email == email))
    }

    /// Persist a new account in the list matching its kind.
    ///
    /// Fails with [`StoreError::EmailTaken`] if any account of either kind
    /// already uses the email.
    pub async fn append_account(&self, account: Account) -> Result<(), StoreError> {
        if self.email_exists(&account.email).await? {
            debug!(email = %account.email, "Rejected account with duplicate email");
            return Err(StoreError::EmailTaken {
                email: account.email,
            });
        }

        let key = key_for(account.kind());
        let mut accounts = self.load(key).await?;
        info!(id = %account.id, kind = %account.kind(), "Account created");
        accounts.push(account);
        write_json(self.store.as_ref(), key, &accounts).await
    }

    /// Remove the standard account with `id`.
    ///
    /// Returns false and leaves the store untouched when no standard account
    /// has that id.
    pub async fn delete_account(&self, id: &str) -> Result<bool, StoreError> {
        let mut accounts = self.list_accounts().await?;
        let before = accounts.len();
        accounts.retain(|a| a.id != id);
        if accounts.len() == before {
            debug!(id, "Delete requested for unknown account");
            return Ok(false);
        }

        write_json(self.store.as_ref(), keys::ACCOUNTS, &accounts).await?;
        info!(id, "Account deleted");
        Ok(true)
    }

    /// Pretty-printed JSON snapshot of the standard accounts, for backup.
    pub async fn export_all(&self) -> Result<String, StoreError> {
        let accounts = self.list_accounts().await?;
        serde_json::to_string_pretty(&accounts).map_err(|source| StoreError::Encode {
            key: keys::ACCOUNTS,
            source,
        })
    }

    /// First account whose email and password both match exactly.
    /// Standard accounts are searched before trial accounts.
    pub async fn find_by_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|a| a.email == email && secret_eq(password, &a.password)))
    }

    async fn load(&self, key: &'static str) -> Result<Vec<Account>, StoreError> {
        Ok(read_json(self.store.as_ref(), key).await?.unwrap_or_default())
    }
}

fn key_for(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::Standard => keys::ACCOUNTS,
        AccountKind::Trial => keys::TRIAL_ACCOUNTS,
    }
}
