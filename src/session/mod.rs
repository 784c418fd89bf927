//! Session manager: turns an anonymous visitor into an authenticated
//! member, trial member or administrator.
//!
//! A session lives for the lifetime of the process and is never persisted.
//! Admin privilege is re-derived on every session change from three
//! independent signals:
//! - the account's registration code is the admin code
//! - the launch query carried `admin=true`
//! - the persisted `adminFlag` is set
//!
//! The last two are controlled by whoever runs the client and can be
//! switched off with `auth.trust_client_admin_signals = false`.
//!
//! Trial expiry is checked at login only. A session that was opened before
//! its trial window closed stays open.

mod authority;
mod signals;

pub use authority::{CodeAuthority, CodeGrant, StaticCodeAuthority};
pub use signals::AdminSignals;

use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::accounts::AccountStore;
use crate::clock::Clock;
use crate::config::Config;
use crate::crypto::generate_password;
use crate::db::{keys, read_json, write_json, Account, KeyValueStore, TrialStatus};
use crate::error::{LoginError, RegistrationError, StoreError, TrialError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// A login, registration or trial signup is in progress
    Authenticating,
    Authenticated(Account),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub registration_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrialForm {
    pub name: String,
    pub email: String,
    pub experience_level: String,
}

/// Result of a trial signup. `password` is the only copy the user will
/// ever see; there is no recovery path.
#[derive(Debug, Clone)]
pub struct TrialSignup {
    pub account: Account,
    pub password: String,
}

/// What the catalog needs to know about the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    /// `allowed` is false once the window has closed
    Trial { remaining_days: i64, allowed: bool },
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub viewer: Viewer,
    pub is_admin: bool,
}

/// Tunables taken from [`Config`]
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub trust_client_admin_signals: bool,
    pub trial_length: Duration,
    pub trial_download_limit: u32,
}

impl SessionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            trust_client_admin_signals: config.auth.trust_client_admin_signals,
            trial_length: Duration::try_days(config.trial.duration_days)
                .unwrap_or(Duration::MAX),
            trial_download_limit: config.trial.download_limit,
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct SessionManager {
    accounts: AccountStore,
    store: Arc<dyn KeyValueStore>,
    authority: Arc<dyn CodeAuthority>,
    clock: Arc<dyn Clock>,
    signals: AdminSignals,
    policy: SessionPolicy,
    state: SessionState,
    is_admin: bool,
}

impl SessionManager {
    /// Start an anonymous session and derive admin privilege from the
    /// launch signals and persisted flag.
    pub async fn open(
        accounts: AccountStore,
        store: Arc<dyn KeyValueStore>,
        authority: Arc<dyn CodeAuthority>,
        clock: Arc<dyn Clock>,
        signals: AdminSignals,
        policy: SessionPolicy,
    ) -> Result<Self, StoreError> {
        let mut session = Self {
            accounts,
            store,
            authority,
            clock,
            signals,
            policy,
            state: SessionState::Anonymous,
            is_admin: false,
        };
        session.refresh_admin().await?;
        Ok(session)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_account(&self) -> Option<&Account> {
        match &self.state {
            SessionState::Authenticated(account) => Some(account),
            _ => None,
        }
    }

    /// Cached admin privilege as of the last session change
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Create a standard account from a registration code and sign in.
    pub async fn register(
        &mut self,
        form: &RegistrationForm,
    ) -> Result<Account, RegistrationError> {
        let previous = self.begin();
        match self.try_register(form).await {
            Ok(account) => {
                self.authenticate(account.clone(), previous).await?;
                Ok(account)
            }
            Err(err) => {
                self.state = previous;
                debug!(code = %err.code(), "Registration refused");
                Err(err)
            }
        }
    }

    async fn try_register(&self, form: &RegistrationForm) -> Result<Account, RegistrationError> {
        if form.password != form.confirm_password {
            return Err(RegistrationError::PasswordMismatch);
        }
        if self.authority.verify(&form.registration_code).is_none() {
            return Err(RegistrationError::InvalidCode);
        }
        if self.accounts.email_exists(&form.email).await? {
            return Err(RegistrationError::EmailTaken);
        }

        let account = Account::standard(
            form.name.clone(),
            form.email.clone(),
            form.password.clone(),
            form.registration_code.clone(),
            self.clock.now(),
        );
        self.accounts.append_account(account.clone()).await?;
        Ok(account)
    }

    /// Sign in with an exact email and password match.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Account, LoginError> {
        let previous = self.begin();
        match self.try_login(email, password).await {
            Ok(account) => {
                self.authenticate(account.clone(), previous).await?;
                Ok(account)
            }
            Err(err) => {
                self.state = previous;
                debug!(code = %err.code(), "Login refused");
                Err(err)
            }
        }
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<Account, LoginError> {
        let account = self
            .accounts
            .find_by_credentials(email, password)
            .await?
            .ok_or(LoginError::InvalidCredentials)?;

        if let Some(status) = self.trial_status(&account) {
            if !status.allowed {
                return Err(LoginError::TrialExpired);
            }
        }
        Ok(account)
    }

    /// Open a trial account with a generated password and sign in.
    pub async fn start_trial(&mut self, form: &TrialForm) -> Result<TrialSignup, TrialError> {
        let previous = self.begin();
        match self.try_start_trial(form).await {
            Ok(signup) => {
                self.authenticate(signup.account.clone(), previous).await?;
                Ok(signup)
            }
            Err(err) => {
                self.state = previous;
                debug!(code = %err.code(), "Trial signup refused");
                Err(err)
            }
        }
    }

    async fn try_start_trial(&self, form: &TrialForm) -> Result<TrialSignup, TrialError> {
        let incomplete = [&form.name, &form.email, &form.experience_level]
            .iter()
            .any(|field| field.trim().is_empty());
        if incomplete {
            return Err(TrialError::IncompleteForm);
        }
        if self.accounts.email_exists(&form.email).await? {
            return Err(TrialError::EmailTaken);
        }

        let password = generate_password();
        let account = Account::trial(
            form.name.clone(),
            form.email.clone(),
            password.clone(),
            form.experience_level.clone(),
            self.clock.now(),
            self.policy.trial_length,
            self.policy.trial_download_limit,
        );
        self.accounts.append_account(account.clone()).await?;
        Ok(TrialSignup { account, password })
    }

    /// Return to anonymous and clear the persisted admin flag.
    pub async fn logout(&mut self) -> Result<(), StoreError> {
        if let Some(account) = self.current_account() {
            info!(id = %account.id, "Signed out");
        }
        self.state = SessionState::Anonymous;
        self.store.remove(keys::ADMIN_FLAG).await?;
        self.refresh_admin().await?;
        Ok(())
    }

    /// Trial window status at the current time; `None` for standard accounts.
    pub fn trial_status(&self, account: &Account) -> Option<TrialStatus> {
        account
            .trial_window()
            .map(|window| window.status_at(self.clock.now()))
    }

    /// Snapshot of the session for catalog evaluation.
    pub fn principal(&self) -> Principal {
        let viewer = match self.current_account() {
            None => Viewer::Anonymous,
            Some(account) => match self.trial_status(account) {
                Some(status) => Viewer::Trial {
                    remaining_days: status.remaining_days,
                    allowed: status.allowed,
                },
                None => Viewer::Member,
            },
        };
        Principal {
            viewer,
            is_admin: self.is_admin,
        }
    }

    /// Re-derive and cache admin privilege.
    pub async fn refresh_admin(&mut self) -> Result<bool, StoreError> {
        let flag: bool = read_json(self.store.as_ref(), keys::ADMIN_FLAG)
            .await?
            .unwrap_or(false);
        self.is_admin = self.derive_admin(flag);
        Ok(self.is_admin)
    }

    fn derive_admin(&self, persisted_flag: bool) -> bool {
        if let Some(account) = self.current_account() {
            if self.holds_admin_code(account) {
                return true;
            }
        }
        if !self.policy.trust_client_admin_signals {
            return false;
        }
        if self.signals.query_admin {
            warn!("Admin privilege granted by launch query parameter");
            return true;
        }
        if persisted_flag {
            warn!("Admin privilege granted by persisted admin flag");
            return true;
        }
        false
    }

    fn holds_admin_code(&self, account: &Account) -> bool {
        account
            .registration_code()
            .and_then(|code| self.authority.verify(code))
            == Some(CodeGrant::Admin)
    }

    fn begin(&mut self) -> SessionState {
        std::mem::replace(&mut self.state, SessionState::Authenticating)
    }

    /// Sign `account` in once the admin flag is settled. On a store failure
    /// the session goes back to `previous` with its admin privilege intact.
    async fn authenticate(
        &mut self,
        account: Account,
        previous: SessionState,
    ) -> Result<(), StoreError> {
        let admin_account = self.holds_admin_code(&account);
        let flag = match self.settle_admin_flag(admin_account).await {
            Ok(flag) => flag,
            Err(err) => {
                self.state = previous;
                warn!(id = %account.id, error = %err, "Sign-in aborted by a store failure");
                return Err(err);
            }
        };
        info!(id = %account.id, kind = %account.kind(), admin = admin_account, "Signed in");
        self.state = SessionState::Authenticated(account);
        self.is_admin = self.derive_admin(flag);
        Ok(())
    }

    /// Persist the flag for admin-code accounts, otherwise read it back.
    async fn settle_admin_flag(&self, admin_account: bool) -> Result<bool, StoreError> {
        if admin_account {
            write_json(self.store.as_ref(), keys::ADMIN_FLAG, &true).await?;
            return Ok(true);
        }
        Ok(read_json(self.store.as_ref(), keys::ADMIN_FLAG)
            .await?
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::{AccountKind, MemoryStore};
    use chrono::{TimeZone, Utc};
    use tokio_test::{assert_err, assert_ok};

    const MEMBER: &str = "DIFY2024MASTER";
    const ADMIN: &str = "DIFY2024ADMIN";

    struct Harness {
        store: MemoryStore,
        clock: Arc<FixedClock>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                clock: Arc::new(FixedClock::new(
                    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
                )),
            }
        }

        async fn session(&self) -> SessionManager {
            self.session_with(AdminSignals::default(), SessionPolicy::default())
                .await
        }

        async fn session_with(
            &self,
            signals: AdminSignals,
            policy: SessionPolicy,
        ) -> SessionManager {
            let store: Arc<dyn KeyValueStore> = Arc::new(self.store.clone());
            SessionManager::open(
                AccountStore::new(store.clone()),
                store,
                Arc::new(StaticCodeAuthority::new(MEMBER, ADMIN)),
                self.clock.clone(),
                signals,
                policy,
            )
            .await
            .unwrap()
        }
    }

    fn form(email: &str, password: &str, code: &str) -> RegistrationForm {
        RegistrationForm {
            name: "Member".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: password.to_string(),
            registration_code: code.to_string(),
        }
    }

    fn trial_form(email: &str) -> TrialForm {
        TrialForm {
            name: "Trial".to_string(),
            email: email.to_string(),
            experience_level: "beginner".to_string(),
        }
    }

    #[tokio::test]
    async fn test_starts_anonymous() {
        let h = Harness::new();
        let session = h.session().await;
        assert_eq!(session.state(), &SessionState::Anonymous);
        assert!(!session.is_admin());
        assert_eq!(session.principal().viewer, Viewer::Anonymous);
    }

    #[tokio::test]
    async fn test_register_member_signs_in() {
        let h = Harness::new();
        let mut session = h.session().await;

        let account = assert_ok!(session.register(&form("a@x.com", "p", MEMBER)).await);
        assert_eq!(account.kind(), AccountKind::Standard);
        assert_eq!(session.current_account(), Some(&account));
        assert!(!session.is_admin());
        assert_eq!(session.principal().viewer, Viewer::Member);
    }

    #[tokio::test]
    async fn test_register_twice_with_same_email() {
        let h = Harness::new();
        let mut session = h.session().await;
        assert_ok!(session.register(&form("a@x.com", "p", MEMBER)).await);

        let err = assert_err!(session.register(&form("a@x.com", "other", MEMBER)).await);
        assert!(matches!(err, RegistrationError::EmailTaken));
    }

    #[tokio::test]
    async fn test_register_validation_order() {
        let h = Harness::new();
        let mut session = h.session().await;
        assert_ok!(session.register(&form("a@x.com", "p", MEMBER)).await);
        session.logout().await.unwrap();

        // mismatch is reported before a bad code or a taken email
        let mut bad = form("a@x.com", "p", "WRONG");
        bad.confirm_password = "q".to_string();
        let err = assert_err!(session.register(&bad).await);
        assert!(matches!(err, RegistrationError::PasswordMismatch));

        // bad code is reported before a taken email
        let err = assert_err!(session.register(&form("a@x.com", "p", "WRONG")).await);
        assert!(matches!(err, RegistrationError::InvalidCode));

        assert_eq!(session.state(), &SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_register_with_admin_code_grants_admin() {
        let h = Harness::new();
        let mut session = h.session().await;

        let account = assert_ok!(session.register(&form("boss@x.com", "p", ADMIN)).await);
        assert_eq!(account.kind(), AccountKind::Standard);
        assert!(session.is_admin());
        assert_eq!(
            h.store.get(keys::ADMIN_FLAG).await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_login_after_register_returns_same_account() {
        let h = Harness::new();
        let mut session = h.session().await;
        let registered = session
            .register(&form("a@x.com", "p", MEMBER))
            .await
            .unwrap();
        session.logout().await.unwrap();

        let logged_in = assert_ok!(session.login("a@x.com", "p").await);
        assert_eq!(logged_in.id, registered.id);
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let h = Harness::new();
        let mut session = h.session().await;
        session
            .register(&form("a@x.com", "p", MEMBER))
            .await
            .unwrap();
        session.logout().await.unwrap();

        let err = assert_err!(session.login("a@x.com", "nope").await);
        assert!(matches!(err, LoginError::InvalidCredentials));
        assert_eq!(session.state(), &SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_failed_login_keeps_existing_session() {
        let h = Harness::new();
        let mut session = h.session().await;
        let account = session
            .register(&form("a@x.com", "p", MEMBER))
            .await
            .unwrap();

        assert_err!(session.login("ghost@x.com", "p").await);
        assert_eq!(session.current_account(), Some(&account));
    }

    #[tokio::test]
    async fn test_start_trial() {
        let h = Harness::new();
        let mut session = h.session().await;
        let now = h.clock.now();

        let signup = assert_ok!(session.start_trial(&trial_form("t@x.com")).await);
        let window = signup.account.trial_window().unwrap();
        assert_eq!(window.start, now);
        assert_eq!(window.end, now + Duration::days(3));
        assert_eq!(signup.password, signup.account.password);
        assert!(!signup.password.is_empty());
        assert_eq!(
            session.principal().viewer,
            Viewer::Trial {
                remaining_days: 3,
                allowed: true
            }
        );
    }

    #[tokio::test]
    async fn test_start_trial_requires_every_field() {
        let h = Harness::new();
        let mut session = h.session().await;

        let mut incomplete = trial_form("t@x.com");
        incomplete.experience_level = String::new();
        let err = assert_err!(session.start_trial(&incomplete).await);
        assert!(matches!(err, TrialError::IncompleteForm));

        let mut blank = trial_form("t@x.com");
        blank.name = "   ".to_string();
        let err = assert_err!(session.start_trial(&blank).await);
        assert!(matches!(err, TrialError::IncompleteForm));

        assert_eq!(session.state(), &SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_start_trial_rejects_member_email() {
        let h = Harness::new();
        let mut session = h.session().await;
        session
            .register(&form("a@x.com", "p", MEMBER))
            .await
            .unwrap();
        session.logout().await.unwrap();

        let err = assert_err!(session.start_trial(&trial_form("a@x.com")).await);
        assert!(matches!(err, TrialError::EmailTaken));
    }

    #[tokio::test]
    async fn test_trial_status_just_after_window() {
        let h = Harness::new();
        let mut session = h.session().await;
        let signup = session.start_trial(&trial_form("t@x.com")).await.unwrap();

        h.clock.advance(Duration::days(3) + Duration::seconds(1));
        let status = session.trial_status(&signup.account).unwrap();
        assert!(!status.allowed);
    }

    #[tokio::test]
    async fn test_expired_trial_cannot_log_in() {
        let h = Harness::new();
        let mut session = h.session().await;
        let signup = session.start_trial(&trial_form("t@x.com")).await.unwrap();
        session.logout().await.unwrap();

        h.clock.advance(Duration::days(4));
        let err = assert_err!(session.login("t@x.com", &signup.password).await);
        assert!(matches!(err, LoginError::TrialExpired));
        assert_eq!(session.state(), &SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_active_trial_can_log_in() {
        let h = Harness::new();
        let mut session = h.session().await;
        let signup = session.start_trial(&trial_form("t@x.com")).await.unwrap();
        session.logout().await.unwrap();

        h.clock.advance(Duration::days(2));
        let account = assert_ok!(session.login("t@x.com", &signup.password).await);
        assert_eq!(account.id, signup.account.id);
        assert_eq!(
            session.principal().viewer,
            Viewer::Trial {
                remaining_days: 1,
                allowed: true
            }
        );
    }

    #[tokio::test]
    async fn test_open_trial_session_survives_expiry() {
        let h = Harness::new();
        let mut session = h.session().await;
        session.start_trial(&trial_form("t@x.com")).await.unwrap();

        h.clock.advance(Duration::days(5));
        assert!(session.current_account().is_some());
        assert!(matches!(
            session.principal().viewer,
            Viewer::Trial { remaining_days, allowed: false } if remaining_days < 0
        ));
    }

    #[tokio::test]
    async fn test_logout_is_unconditional() {
        let h = Harness::new();
        let mut session = h.session().await;
        assert_ok!(session.logout().await);
        assert_eq!(session.state(), &SessionState::Anonymous);

        session
            .register(&form("boss@x.com", "p", ADMIN))
            .await
            .unwrap();
        assert_ok!(session.logout().await);
        assert_eq!(session.state(), &SessionState::Anonymous);
        assert!(!session.is_admin());
        assert_eq!(h.store.get(keys::ADMIN_FLAG).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_signal_grants_admin() {
        let h = Harness::new();
        let session = h
            .session_with(AdminSignals::from_query("admin=true"), SessionPolicy::default())
            .await;
        assert!(session.is_admin());
        assert_eq!(session.principal().viewer, Viewer::Anonymous);
    }

    #[tokio::test]
    async fn test_persisted_flag_grants_admin_on_startup() {
        let h = Harness::new();
        write_json(&h.store, keys::ADMIN_FLAG, &true).await.unwrap();
        let session = h.session().await;
        assert!(session.is_admin());
    }

    #[tokio::test]
    async fn test_client_signals_ignored_when_untrusted() {
        let h = Harness::new();
        write_json(&h.store, keys::ADMIN_FLAG, &true).await.unwrap();
        let policy = SessionPolicy {
            trust_client_admin_signals: false,
            ..SessionPolicy::default()
        };
        let mut session = h
            .session_with(AdminSignals::from_query("admin=true"), policy)
            .await;
        assert!(!session.is_admin());

        // the admin code still works
        session
            .register(&form("boss@x.com", "p", ADMIN))
            .await
            .unwrap();
        assert!(session.is_admin());
    }

    #[tokio::test]
    async fn test_custom_trial_length() {
        let h = Harness::new();
        let policy = SessionPolicy {
            trial_length: Duration::days(7),
            trial_download_limit: 2,
            ..SessionPolicy::default()
        };
        let mut session = h.session_with(AdminSignals::default(), policy).await;
        let signup = session.start_trial(&trial_form("t@x.com")).await.unwrap();
        let window = signup.account.trial_window().unwrap();
        assert_eq!(window.end - window.start, Duration::days(7));
    }

    /// Memory store whose admin flag writes always fail
    struct FlagWriteFails(MemoryStore);

    #[async_trait::async_trait]
    impl KeyValueStore for FlagWriteFails {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if key == keys::ADMIN_FLAG {
                return Err(StoreError::Malformed {
                    key: keys::ADMIN_FLAG,
                    source: serde_json::from_str::<bool>("x").unwrap_err(),
                });
            }
            self.0.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.0.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_admin_flag_write_leaves_session_signed_out() {
        let h = Harness::new();
        let store: Arc<dyn KeyValueStore> = Arc::new(FlagWriteFails(h.store.clone()));
        let mut session = SessionManager::open(
            AccountStore::new(store.clone()),
            store,
            Arc::new(StaticCodeAuthority::new(MEMBER, ADMIN)),
            h.clock.clone(),
            AdminSignals::default(),
            SessionPolicy::default(),
        )
        .await
        .unwrap();

        let err = assert_err!(session.register(&form("boss@x.com", "p", ADMIN)).await);
        assert!(matches!(err, RegistrationError::Store(_)));
        assert_eq!(session.state(), &SessionState::Anonymous);
        assert!(!session.is_admin());

        // members never write the flag
        assert_ok!(session.register(&form("a@x.com", "p", MEMBER)).await);
        assert!(session.current_account().is_some());
        assert!(!session.is_admin());
    }

    #[test]
    fn test_policy_saturates_oversized_trial_length() {
        let mut config = Config::default();
        config.trial.duration_days = i64::MAX;
        let policy = SessionPolicy::from_config(&config);
        assert_eq!(policy.trial_length, Duration::MAX);
    }
}
