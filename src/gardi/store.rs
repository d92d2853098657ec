//! User-store seam and roles.
//!
//! Credential persistence belongs to the surrounding system; this crate only
//! consumes the stored hash and the role claim. `InMemoryUserStore` is the
//! implementation wired by the binary and by tests.

use crate::gardi::errors::AuthError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Superadmin,
    Admin,
    Manager,
    Seller,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Superadmin => "superadmin",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Seller => "seller",
        }
    }
}

/// Check a role claim against an allow-list. `action` names what was being
/// attempted and ends up in the 403 message.
///
/// # Errors
/// `InsufficientRole` when the role is missing or not in the list.
pub fn check_role(
    role: Option<UserRole>,
    allowed: &[UserRole],
    action: &str,
) -> Result<(), AuthError> {
    match role {
        Some(role) if allowed.contains(&role) => Ok(()),
        _ => Err(AuthError::InsufficientRole(action.to_string())),
    }
}

/// Record the external user store hands back for a subject. Only the derived
/// hash is ever held; the plaintext secret is never stored.
#[derive(Clone, Debug)]
pub struct StoredUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Option<UserRole>,
}

pub trait UserStore: Send + Sync {
    /// Lookup by email; implementations normalize before matching.
    fn find_by_email(&self, email: &str) -> Option<StoredUser>;
}

/// Lowercase and trim an email for lookup and uniqueness.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, StoredUser>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: StoredUser) {
        let key = normalize_email(&user.email);
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, user);
    }
}

impl UserStore for InMemoryUserStore {
    fn find_by_email(&self, email: &str) -> Option<StoredUser> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_email(email))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str, role: Option<UserRole>) -> StoredUser {
        StoredUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            role,
        }
    }

    #[test]
    fn lookup_normalizes_email() {
        let store = InMemoryUserStore::new();
        store.insert(user("  Alice@Example.COM ", Some(UserRole::Admin)));

        let found = store.find_by_email("alice@example.com").expect("user");
        assert_eq!(found.role, Some(UserRole::Admin));
        assert!(store.find_by_email("bob@example.com").is_none());
    }

    #[test]
    fn insert_overwrites_existing_record() {
        let store = InMemoryUserStore::new();
        store.insert(user("alice@example.com", Some(UserRole::Seller)));
        store.insert(user("ALICE@example.com", Some(UserRole::Manager)));

        let found = store.find_by_email("alice@example.com").expect("user");
        assert_eq!(found.role, Some(UserRole::Manager));
    }

    #[test]
    fn role_allow_list_checks() {
        let allowed = [UserRole::Admin, UserRole::Manager];

        assert!(check_role(Some(UserRole::Admin), &allowed, "view managers").is_ok());
        assert!(matches!(
            check_role(Some(UserRole::Seller), &allowed, "view managers"),
            Err(AuthError::InsufficientRole(_))
        ));
        assert!(matches!(
            check_role(None, &allowed, "view managers"),
            Err(AuthError::InsufficientRole(_))
        ));
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(
            serde_json::to_value(UserRole::Superadmin).expect("json"),
            serde_json::json!("superadmin")
        );
        assert_eq!(UserRole::Seller.as_str(), "seller");
    }
}
