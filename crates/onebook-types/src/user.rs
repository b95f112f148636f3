//! User accounts and roles.
//!
//! Authentication lives in the API layer; the core only stores the account
//! record and the role the API layer resolved. Admin capability is passed
//! explicitly into admin operations rather than inspected from ambient
//! identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UserId;

/// Account role, resolved by the API layer before commands reach the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "USER"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    /// Opaque API credential; the core never parses it.
    pub api_key: String,
}

impl User {
    /// Register a new account with a freshly generated API credential.
    #[must_use]
    pub fn register(name: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            role,
            api_key: format!("key-{}", Uuid::now_v7()),
        }
    }
}
