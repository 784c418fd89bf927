pub mod accounts;
pub mod admin;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod session;

use std::sync::Arc;

use crate::accounts::AccountStore;
use crate::admin::AdminConsole;
use crate::catalog::{Catalog, CatalogAccess, CatalogView};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::{KeyValueStore, SiteConfigRepository};
use crate::error::{AdminError, StoreError};
use crate::session::{AdminSignals, SessionManager, SessionPolicy, StaticCodeAuthority};

/// Every component of the portal over one shared store.
pub struct Portal {
    pub config: Config,
    pub accounts: AccountStore,
    pub site: SiteConfigRepository,
    pub catalog: CatalogAccess,
    pub clock: Arc<dyn Clock>,
    pub session: SessionManager,
}

impl Portal {
    pub async fn open(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        signals: AdminSignals,
    ) -> Result<Self, StoreError> {
        Self::open_with_clock(config, store, signals, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        signals: AdminSignals,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let accounts = AccountStore::new(store.clone());
        let site = SiteConfigRepository::new(store.clone());
        let session = SessionManager::open(
            accounts.clone(),
            store,
            Arc::new(StaticCodeAuthority::from_config(&config.auth)),
            clock.clone(),
            signals,
            SessionPolicy::from_config(&config),
        )
        .await?;

        Ok(Self {
            config,
            accounts,
            site,
            catalog: CatalogAccess::new(Catalog::builtin()),
            clock,
            session,
        })
    }

    /// Catalog view for the current session and site settings.
    pub async fn view(&self) -> Result<CatalogView, StoreError> {
        let site = self.site.load().await?;
        Ok(self.catalog.evaluate(&self.session.principal(), &site))
    }

    /// Admin console, if the session holds admin privilege.
    pub fn admin(&self) -> Result<AdminConsole, AdminError> {
        AdminConsole::open(
            &self.session,
            self.accounts.clone(),
            self.site.clone(),
            self.clock.clone(),
            self.config.auth.code_prefix.clone(),
        )
    }
}
