//! User-registered GW2 API keys.

use crate::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission scopes a GW2 API key may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Account,
    Characters,
    Guilds,
    Progression,
    Pvp,
    Wallet,
}

impl Permission {
    /// The scope name as the GW2 API spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Account => "account",
            Permission::Characters => "characters",
            Permission::Guilds => "guilds",
            Permission::Progression => "progression",
            Permission::Pvp => "pvp",
            Permission::Wallet => "wallet",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's registered API key, exactly one per user.
///
/// `permissions` is kept sorted ascending so storage and comparisons
/// are deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserKey {
    /// Chat-platform user this key belongs to.
    pub user_id: UserId,
    /// The API token itself.
    pub token: String,
    /// Key name as set on the GW2 account page.
    pub name: String,
    /// GW2 account name the key resolves to.
    pub account_name: String,
    /// Home world/server name.
    pub world: String,
    /// Sorted permission scopes granted to the token.
    pub permissions: Vec<String>,
}

impl UserKey {
    /// Whether the key carries the given permission scope.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.iter().any(|p| p == permission.as_str())
    }

    /// Scopes from `required` the key does not carry.
    pub fn missing_permissions(&self, required: &[Permission]) -> Vec<Permission> {
        required
            .iter()
            .copied()
            .filter(|p| !self.has_permission(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(perms: &[&str]) -> UserKey {
        UserKey {
            user_id: "u1".into(),
            token: "XXXX".into(),
            name: "bot key".into(),
            account_name: "Ruler.1234".into(),
            world: "Gandara".into(),
            permissions: perms.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn missing_permissions_reports_gaps() {
        let k = key(&["account", "wallet"]);
        assert!(k.has_permission(Permission::Account));
        assert!(!k.has_permission(Permission::Characters));
        let missing = k.missing_permissions(&[
            Permission::Account,
            Permission::Characters,
            Permission::Progression,
        ]);
        assert_eq!(missing, vec![Permission::Characters, Permission::Progression]);
    }

    #[test]
    fn permission_spelling_matches_api() {
        assert_eq!(Permission::Progression.as_str(), "progression");
        assert_eq!(Permission::Pvp.to_string(), "pvp");
    }
}
