//! Admin console: account management, registration codes and site settings.
//!
//! An [`AdminConsole`] can only be obtained from a session that currently
//! holds admin privilege.

use std::sync::Arc;
use tracing::info;

use crate::accounts::AccountStore;
use crate::clock::Clock;
use crate::crypto::generate_registration_code;
use crate::db::{Account, SiteConfig, SiteConfigPatch, SiteConfigRepository};
use crate::error::AdminError;
use crate::session::SessionManager;

/// Asks the operator to confirm a destructive action.
pub trait Confirmation {
    fn confirm(&self, prompt: &str) -> bool;
}

/// A confirmation decided up front (e.g. `--yes`)
#[derive(Debug, Clone, Copy)]
pub struct Preconfirmed(pub bool);

impl Confirmation for Preconfirmed {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// No standard account had the id; nothing changed
    NotFound,
    Cancelled,
}

pub struct AdminConsole {
    accounts: AccountStore,
    site: SiteConfigRepository,
    clock: Arc<dyn Clock>,
    code_prefix: String,
}

impl AdminConsole {
    pub fn open(
        session: &SessionManager,
        accounts: AccountStore,
        site: SiteConfigRepository,
        clock: Arc<dyn Clock>,
        code_prefix: impl Into<String>,
    ) -> Result<Self, AdminError> {
        if !session.is_admin() {
            return Err(AdminError::NotAuthorized);
        }
        Ok(Self {
            accounts,
            site,
            clock,
            code_prefix: code_prefix.into(),
        })
    }

    /// Standard accounts followed by trial accounts
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AdminError> {
        Ok(self.accounts.list_all().await?)
    }

    /// Delete a standard account once the operator confirms.
    pub async fn delete_account(
        &self,
        id: &str,
        confirmation: &dyn Confirmation,
    ) -> Result<DeleteOutcome, AdminError> {
        let target = self
            .accounts
            .list_accounts()
            .await?
            .into_iter()
            .find(|a| a.id == id);
        let prompt = match &target {
            Some(account) => format!("Delete account {} ({})?", account.email, account.id),
            None => format!("Delete account {}?", id),
        };
        if !confirmation.confirm(&prompt) {
            return Ok(DeleteOutcome::Cancelled);
        }

        if self.accounts.delete_account(id).await? {
            info!(id, "Admin deleted account");
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }

    /// JSON snapshot of all standard accounts
    pub async fn export_all(&self) -> Result<String, AdminError> {
        Ok(self.accounts.export_all().await?)
    }

    /// A fresh code for out-of-band distribution. Nothing records it.
    pub fn generate_registration_code(&self) -> String {
        let code = generate_registration_code(&self.code_prefix, self.clock.now());
        info!("Admin generated a registration code");
        code
    }

    pub async fn site_config(&self) -> Result<SiteConfig, AdminError> {
        Ok(self.site.load().await?)
    }

    /// Merge `patch` into the site settings and persist it immediately.
    pub async fn set_site_config(&self, patch: &SiteConfigPatch) -> Result<SiteConfig, AdminError> {
        let config = self.site.update(patch).await?;
        info!(
            community_enabled = config.community_enabled,
            maintenance_mode = config.maintenance_mode,
            "Admin updated site configuration"
        );
        Ok(config)
    }
}
