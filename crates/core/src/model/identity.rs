use serde::{Deserialize, Serialize};

use crate::model::ids::OwnerId;

/// Who is playing. Only signed-in identities own remote history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    #[default]
    Anonymous,
    SignedIn(OwnerId),
}

impl Identity {
    #[must_use]
    pub fn signed_in(owner: OwnerId) -> Self {
        Identity::SignedIn(owner)
    }

    #[must_use]
    pub fn owner_id(&self) -> Option<&OwnerId> {
        match self {
            Identity::Anonymous => None,
            Identity::SignedIn(owner) => Some(owner),
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    /// Label used when tagging feedback and log lines.
    #[must_use]
    pub fn label(&self) -> &str {
        self.owner_id().map_or("anon", OwnerId::as_str)
    }
}

impl From<Option<OwnerId>> for Identity {
    fn from(value: Option<OwnerId>) -> Self {
        value.map_or(Identity::Anonymous, Identity::SignedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_no_owner() {
        let identity = Identity::default();
        assert!(identity.is_anonymous());
        assert_eq!(identity.owner_id(), None);
        assert_eq!(identity.label(), "anon");
    }

    #[test]
    fn signed_in_exposes_owner() {
        let owner = OwnerId::new("uid-7").unwrap();
        let identity = Identity::from(Some(owner.clone()));
        assert!(!identity.is_anonymous());
        assert_eq!(identity.owner_id(), Some(&owner));
        assert_eq!(identity.label(), "uid-7");
    }
}
