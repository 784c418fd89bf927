//! Launch-time admin signal.
//!
//! The portal can be started with a query string (e.g. `admin=true`), the
//! same way the web build reads its page URL.

/// Admin hints supplied when the portal is launched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminSignals {
    /// `admin=true` was present in the launch query
    pub query_admin: bool,
}

impl AdminSignals {
    /// Parse a URL query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let query_admin = query.split('&').any(|pair| {
            let mut parts = pair.splitn(2, '=');
            matches!(
                (parts.next(), parts.next()),
                (Some("admin"), Some("true"))
            )
        });
        Self { query_admin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query() {
        assert!(AdminSignals::from_query("admin=true").query_admin);
        assert!(AdminSignals::from_query("?admin=true").query_admin);
        assert!(AdminSignals::from_query("tab=apps&admin=true").query_admin);
        assert!(!AdminSignals::from_query("admin=false").query_admin);
        assert!(!AdminSignals::from_query("admin").query_admin);
        assert!(!AdminSignals::from_query("administrator=true").query_admin);
        assert!(!AdminSignals::from_query("").query_admin);
    }
}
