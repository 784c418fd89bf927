//! Member and trial account records.
//!
//! Accounts are immutable once persisted; the only later change is deletion.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Storage kind of an account. Admin is not a kind; it is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Standard,
    Trial,
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountKind::Standard => write!(f, "standard"),
            AccountKind::Trial => write!(f, "trial"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    /// Unique across standard and trial accounts, compared as entered
    pub email: String,
    pub password: String,
    pub registered_at: DateTime<Utc>,
    #[serde(flatten)]
    pub membership: Membership,
}

/// Kind-specific fields, tagged by `kind` in the stored JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Membership {
    Standard {
        /// The code presented at signup
        registration_code: String,
    },
    Trial {
        trial_window: TrialWindow,
        download_quota: DownloadQuota,
        #[serde(default)]
        experience_level: String,
    },
}

/// The `[start, end]` interval during which a trial account may log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Download allowance recorded on trial accounts. Nothing enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadQuota {
    pub used: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialStatus {
    pub allowed: bool,
    pub remaining_days: i64,
}

impl TrialWindow {
    /// The end saturates at the latest representable instant.
    pub fn starting_at(start: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start,
            end: start
                .checked_add_signed(length)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Evaluate the window at `now`. Remaining days round up and go
    /// negative once the window has closed.
    pub fn status_at(&self, now: DateTime<Utc>) -> TrialStatus {
        let left = (self.end - now).num_milliseconds();
        let mut remaining_days = left / MILLIS_PER_DAY;
        if left % MILLIS_PER_DAY > 0 {
            remaining_days += 1;
        }
        TrialStatus {
            allowed: now <= self.end,
            remaining_days,
        }
    }
}

impl Account {
    /// A member account created from a registration code.
    pub fn standard(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        registration_code: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_account_id(),
            name: name.into(),
            email: email.into(),
            password: password.into(),
            registered_at: now,
            membership: Membership::Standard {
                registration_code: registration_code.into(),
            },
        }
    }

    /// A trial account whose window opens at `now`.
    pub fn trial(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        experience_level: impl Into<String>,
        now: DateTime<Utc>,
        length: Duration,
        download_limit: u32,
    ) -> Self {
        Self {
            id: new_account_id(),
            name: name.into(),
            email: email.into(),
            password: password.into(),
            registered_at: now,
            membership: Membership::Trial {
                trial_window: TrialWindow::starting_at(now, length),
                download_quota: DownloadQuota {
                    used: 0,
                    max: download_limit,
                },
                experience_level: experience_level.into(),
            },
        }
    }

    pub fn kind(&self) -> AccountKind {
        match self.membership {
            Membership::Standard { .. } => AccountKind::Standard,
            Membership::Trial { .. } => AccountKind::Trial,
        }
    }

    pub fn is_trial(&self) -> bool {
        self.kind() == AccountKind::Trial
    }

    pub fn registration_code(&self) -> Option<&str> {
        match &self.membership {
            Membership::Standard { registration_code } => Some(registration_code),
            Membership::Trial { .. } => None,
        }
    }

    pub fn trial_window(&self) -> Option<&TrialWindow> {
        match &self.membership {
            Membership::Trial { trial_window, .. } => Some(trial_window),
            Membership::Standard { .. } => None,
        }
    }
}

fn new_account_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Account as shown to administrators: no password.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub kind: AccountKind,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            kind: account.kind(),
            registered_at: account.registered_at,
            trial_ends_at: account.trial_window().map(|w| w.end),
        }
    }
}
