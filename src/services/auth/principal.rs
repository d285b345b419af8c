/*
 * Responsibility
 * - The resolved identity of one request (published by the security context middleware)
 * - Role helpers used by the access evaluator
 *
 * Notes
 * - Immutable once established; lives in request extensions for the request's lifetime
 */

const ADMIN_ROLES: [&str; 2] = ["ADMIN", "ROLE_ADMIN"];

/// Display name used in logs for the internal-service principal.
pub const INTERNAL_SERVICE_NAME: &str = "internal-service";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    InternalService,
    EndUser(EndUser),
}

/// A caller authenticated by a verified bearer token.
///
/// - `email` comes from the `sub` claim
/// - `roles` are coarse-grained; ownership is checked separately by the evaluator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndUser {
    pub email: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn end_user(email: impl Into<String>, roles: Vec<String>) -> Self {
        Self::EndUser(EndUser {
            email: email.into(),
            roles,
        })
    }

    pub fn is_admin(&self) -> bool {
        match self {
            Principal::EndUser(user) => user
                .roles
                .iter()
                .any(|role| ADMIN_ROLES.contains(&role.as_str())),
            _ => false,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Principal::EndUser(user) => Some(&user.email),
            _ => None,
        }
    }

    /// Name for logs. Never contains credential material.
    pub fn name(&self) -> &str {
        match self {
            Principal::Anonymous => "anonymous",
            Principal::InternalService => INTERNAL_SERVICE_NAME,
            Principal::EndUser(user) => &user.email,
        }
    }
}
