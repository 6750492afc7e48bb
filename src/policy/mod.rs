//! Access policy evaluator: pure role/ownership predicates that gate every
//! read and write before it reaches a service. Denials are generic on
//! purpose; they must not reveal whether a record exists or who owns it.

use thiserror::Error;
use uuid::Uuid;

use crate::middleware::AuthUser;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Access denied")]
    AccessDenied,
}

/// A citizen may view only records they own; officers and admins may view
/// any record.
pub fn can_view_record(requester: &AuthUser, owner_id: Uuid) -> bool {
    requester.role.is_reviewer() || requester.id == owner_id
}

/// Mutation follows the same ownership rule as viewing. Status-transition
/// actions are additionally gated by `require_reviewer`.
pub fn can_mutate_record(requester: &AuthUser, owner_id: Uuid) -> bool {
    can_view_record(requester, owner_id)
}

/// Err unless the requester owns the record or holds a reviewer role.
pub fn ensure_record_access(requester: &AuthUser, owner_id: Uuid) -> Result<(), PolicyError> {
    if can_view_record(requester, owner_id) {
        Ok(())
    } else {
        Err(PolicyError::AccessDenied)
    }
}

/// Approve, reject, reassign, verify-document, resolve-alert and
/// resolve-feedback all require an officer or admin.
pub fn require_reviewer(requester: &AuthUser) -> Result<(), PolicyError> {
    if requester.role.is_reviewer() {
        Ok(())
    } else {
        Err(PolicyError::AccessDenied)
    }
}

/// Alert creation is stricter than mutation of existing alerts: admin only.
pub fn require_admin(requester: &AuthUser) -> Result<(), PolicyError> {
    if requester.role == crate::auth::Role::Admin {
        Ok(())
    } else {
        Err(PolicyError::AccessDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
            state: None,
            district: None,
        }
    }

    #[test]
    fn citizen_sees_only_own_records() {
        let citizen = user(Role::Citizen);
        assert!(can_view_record(&citizen, citizen.id));
        assert!(!can_view_record(&citizen, Uuid::new_v4()));
    }

    #[test]
    fn officer_sees_any_record() {
        let officer = user(Role::Officer);
        assert!(can_view_record(&officer, Uuid::new_v4()));
        assert!(can_mutate_record(&officer, Uuid::new_v4()));
    }

    #[test]
    fn citizen_requesting_foreign_record_is_denied() {
        let citizen = user(Role::Citizen);
        let other = Uuid::new_v4();
        assert!(matches!(
            ensure_record_access(&citizen, other),
            Err(PolicyError::AccessDenied)
        ));
        // Same record, requested by an officer, succeeds.
        let officer = user(Role::Officer);
        assert!(ensure_record_access(&officer, other).is_ok());
    }

    #[test]
    fn status_transitions_require_reviewer() {
        assert!(require_reviewer(&user(Role::Citizen)).is_err());
        assert!(require_reviewer(&user(Role::Officer)).is_ok());
        assert!(require_reviewer(&user(Role::Admin)).is_ok());
    }

    #[test]
    fn alert_creation_requires_admin() {
        assert!(require_admin(&user(Role::Citizen)).is_err());
        assert!(require_admin(&user(Role::Officer)).is_err());
        assert!(require_admin(&user(Role::Admin)).is_ok());
    }
}
