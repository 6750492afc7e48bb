use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Requester roles recognized by the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Officer,
    Admin,
}

impl Role {
    /// Officers and admins may review claims, verify documents, and read
    /// aggregate analytics.
    pub fn is_reviewer(self) -> bool {
        matches!(self, Role::Officer | Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Officer => "officer",
            Role::Admin => "admin",
        }
    }
}

/// JWT claims issued by the identity collaborator. This service only
/// validates tokens; it never issues them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub state: Option<String>,
    pub district: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviewer_roles() {
        assert!(!Role::Citizen.is_reviewer());
        assert!(Role::Officer.is_reviewer());
        assert!(Role::Admin.is_reviewer());
    }

    #[test]
    fn role_deserializes_from_lowercase() {
        let role: Role = serde_json::from_str("\"officer\"").unwrap();
        assert_eq!(role, Role::Officer);
    }
}
