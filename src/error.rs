//! Error taxonomy for the portal.
//!
//! Every failure a user can hit is a validation failure surfaced straight
//! back to them; none are retried. Each component has its own error enum and
//! all of them map onto a shared [`ErrorCode`] so front ends can render a
//! consistent message.

use thiserror::Error;

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Input validation
    PasswordMismatch,
    InvalidCode,
    EmailTaken,
    InvalidCredentials,
    TrialExpired,
    IncompleteForm,

    // Access
    NotAuthorized,
    UnknownEntry,
    NotPermitted,
    NoManual,

    // Backing store
    Storage,
}

impl ErrorCode {
    /// Get the string representation of the error code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PasswordMismatch => "password_mismatch",
            ErrorCode::InvalidCode => "invalid_code",
            ErrorCode::EmailTaken => "email_taken",
            ErrorCode::InvalidCredentials => "invalid_credentials",
            ErrorCode::TrialExpired => "trial_expired",
            ErrorCode::IncompleteForm => "incomplete_form",
            ErrorCode::NotAuthorized => "not_authorized",
            ErrorCode::UnknownEntry => "unknown_entry",
            ErrorCode::NotPermitted => "not_permitted",
            ErrorCode::NoManual => "no_manual",
            ErrorCode::Storage => "storage",
        }
    }

    /// Message shown to the person who triggered the error
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCode::PasswordMismatch => "Passwords do not match.",
            ErrorCode::InvalidCode => "The registration code is not valid.",
            ErrorCode::EmailTaken => "This email address is already registered.",
            ErrorCode::InvalidCredentials => "Email address or password is incorrect.",
            ErrorCode::TrialExpired => {
                "Your trial period has ended. Register with a purchase code to keep access."
            }
            ErrorCode::IncompleteForm => "Please fill in every field.",
            ErrorCode::NotAuthorized => "Administrator access is required.",
            ErrorCode::UnknownEntry => "No catalog entry with that id.",
            ErrorCode::NotPermitted => "Your plan does not include this item. Upgrade to unlock it.",
            ErrorCode::NoManual => "This item has no companion manual.",
            ErrorCode::Storage => "Local storage could not be read or written.",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of the persisted key-value state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed value under key '{key}': {source}")]
    Malformed {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for key '{key}': {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("email already registered: {email}")]
    EmailTaken { email: String },
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::EmailTaken { .. } => ErrorCode::EmailTaken,
            _ => ErrorCode::Storage,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("password and confirmation differ")]
    PasswordMismatch,

    #[error("registration code not recognized")]
    InvalidCode,

    #[error("email already registered")]
    EmailTaken,

    #[error(transparent)]
    Store(StoreError),
}

impl RegistrationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistrationError::PasswordMismatch => ErrorCode::PasswordMismatch,
            RegistrationError::InvalidCode => ErrorCode::InvalidCode,
            RegistrationError::EmailTaken => ErrorCode::EmailTaken,
            RegistrationError::Store(e) => e.code(),
        }
    }
}

impl From<StoreError> for RegistrationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken { .. } => RegistrationError::EmailTaken,
            other => RegistrationError::Store(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("no account matches these credentials")]
    InvalidCredentials,

    #[error("trial period ended")]
    TrialExpired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LoginError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LoginError::InvalidCredentials => ErrorCode::InvalidCredentials,
            LoginError::TrialExpired => ErrorCode::TrialExpired,
            LoginError::Store(e) => e.code(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TrialError {
    #[error("name, email and experience level are all required")]
    IncompleteForm,

    #[error("email already registered")]
    EmailTaken,

    #[error(transparent)]
    Store(StoreError),
}

impl TrialError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TrialError::IncompleteForm => ErrorCode::IncompleteForm,
            TrialError::EmailTaken => ErrorCode::EmailTaken,
            TrialError::Store(e) => e.code(),
        }
    }
}

impl From<StoreError> for TrialError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken { .. } => TrialError::EmailTaken,
            other => TrialError::Store(other),
        }
    }
}

/// Refusals from the catalog download/view actions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("no catalog entry '{0}'")]
    UnknownEntry(String),

    #[error("entry '{0}' is not downloadable for this session")]
    NotPermitted(String),

    #[error("entry '{0}' has no companion manual")]
    NoManual(String),
}

impl AccessError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AccessError::UnknownEntry(_) => ErrorCode::UnknownEntry,
            AccessError::NotPermitted(_) => ErrorCode::NotPermitted,
            AccessError::NoManual(_) => ErrorCode::NoManual,
        }
    }
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("session does not hold admin privilege")]
    NotAuthorized,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdminError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AdminError::NotAuthorized => ErrorCode::NotAuthorized,
            AdminError::Store(e) => e.code(),
        }
    }
}
