//! Verification of registration codes.
//!
//! The session manager never compares codes itself; it asks a
//! [`CodeAuthority`] what a presented code grants. The bundled
//! [`StaticCodeAuthority`] checks against the two configured secrets.

use crate::config::AuthConfig;
use crate::crypto::secret_eq;

/// What a recognized registration code entitles its holder to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeGrant {
    Member,
    Admin,
}

pub trait CodeAuthority: Send + Sync {
    /// `None` for codes the authority does not recognize
    fn verify(&self, code: &str) -> Option<CodeGrant>;
}

#[derive(Debug, Clone)]
pub struct StaticCodeAuthority {
    member_code: String,
    admin_code: String,
}

impl StaticCodeAuthority {
    pub fn new(member_code: impl Into<String>, admin_code: impl Into<String>) -> Self {
        Self {
            member_code: member_code.into(),
            admin_code: admin_code.into(),
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(auth.member_code.clone(), auth.admin_code.clone())
    }
}

impl CodeAuthority for StaticCodeAuthority {
    fn verify(&self, code: &str) -> Option<CodeGrant> {
        // both comparisons always run
        let is_admin = secret_eq(code, &self.admin_code);
        let is_member = secret_eq(code, &self.member_code);
        if is_admin {
            Some(CodeGrant::Admin)
        } else if is_member {
            Some(CodeGrant::Member)
        } else {
            None
        }
    }
}
