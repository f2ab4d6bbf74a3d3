//! Publisher account credentials.

use std::fmt;

use crate::Region;

/// Access token and account id for one publishing account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    access_token: String,
}

impl Credentials {
    /// Build credentials, returning `None` unless both parts are non-empty.
    pub fn new(account_id: impl Into<String>, access_token: impl Into<String>) -> Option<Self> {
        let account_id = account_id.into().trim().to_string();
        let access_token = access_token.into().trim().to_string();
        if account_id.is_empty() || access_token.is_empty() {
            return None;
        }
        Some(Self {
            account_id,
            access_token,
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("access_token", &"***")
            .finish()
    }
}

/// Credentials for every region the service can publish to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    br: Option<Credentials>,
    global: Option<Credentials>,
}

impl CredentialSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, region: Region, credentials: Option<Credentials>) -> Self {
        self.set(region, credentials);
        self
    }

    pub fn set(&mut self, region: Region, credentials: Option<Credentials>) {
        match region {
            Region::Br => self.br = credentials,
            Region::Global => self.global = credentials,
        }
    }

    pub fn for_region(&self, region: Region) -> Option<&Credentials> {
        match region {
            Region::Br => self.br.as_ref(),
            Region::Global => self.global.as_ref(),
        }
    }

    /// Whether at least one region can publish.
    pub fn any(&self) -> bool {
        self.br.is_some() || self.global.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_credentials_are_rejected() {
        assert!(Credentials::new("", "token").is_none());
        assert!(Credentials::new("acct", "  ").is_none());
        assert!(Credentials::new("acct", "token").is_some());
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials::new("acct", "super-secret").unwrap();
        let debug = format!("{:?}", creds);
        assert!(debug.contains("acct"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_credential_set_debug_redacts_tokens() {
        let set = CredentialSet::new()
            .with(Region::Br, Credentials::new("acct-br", "br-secret"))
            .with(Region::Global, Credentials::new("acct-global", "global-secret"));
        let debug = format!("{:?}", set);
        assert!(debug.contains("acct-br"));
        assert!(!debug.contains("br-secret"));
        assert!(!debug.contains("global-secret"));
    }

    #[test]
    fn test_lookup_by_region() {
        let set = CredentialSet::new().with(Region::Global, Credentials::new("g", "t"));
        assert!(set.any());
        assert!(set.for_region(Region::Br).is_none());
        assert_eq!(set.for_region(Region::Global).unwrap().account_id, "g");
    }
}
