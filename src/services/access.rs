//! Authorization evaluator.
//!
//! Each protected operation declares one [`AccessRule`] and names the
//! [`Resource`] it touches; handlers call [`AccessEvaluator::authorize`] before
//! doing anything else, so a denied request never reaches a write.
//!
//! Decision table (first match wins):
//!
//! | rule                     | admin | internal | end user                          | anonymous |
//! |--------------------------|-------|----------|-----------------------------------|-----------|
//! | `Public`                 | allow | allow    | allow                             | allow     |
//! | `AuthenticatedOnly`      | allow | allow    | allow                             | 401       |
//! | `AdminOnly`              | allow | 403      | 403                               | 401       |
//! | `AdminOrInternalService` | allow | allow    | 403                               | 401       |
//! | `AdminOrSelfByEmail`     | allow | 403      | allow iff target email == own     | 401       |
//! | `AdminOrSelfByOwner`     | allow | 403      | allow iff owner id == own user id | 401       |
//!
//! Ownership lookups read the requester's user record through the identity cache.
//! A target that does not exist is a denial for non-admins, so only admins can
//! learn whether an id exists (they get the handler's 404).
use std::sync::Arc;

use crate::error::AppError;
use crate::repos::card_repo::CardRepo;
use crate::services::auth::Principal;
use crate::services::identity_cache::IdentityCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRule {
    AdminOnly,
    AdminOrSelfByEmail,
    AdminOrSelfByOwner,
    AdminOrInternalService,
    AuthenticatedOnly,
    Public,
}

/// What an operation targets, as far as access decisions are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    None,
    UserById(i64),
    UserByEmail(String),
    // A resource whose owning user id is known up front (e.g. `/cards/.../{userId}`).
    OwnedByUser(i64),
    Card(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Clone)]
pub struct AccessEvaluator {
    identities: IdentityCache,
    cards: Arc<dyn CardRepo>,
}

impl AccessEvaluator {
    pub fn new(identities: IdentityCache, cards: Arc<dyn CardRepo>) -> Self {
        Self { identities, cards }
    }

    /// `Ok(())` to proceed; `Unauthenticated` for anonymous callers, `Forbidden` otherwise.
    pub async fn authorize(
        &self,
        principal: &Principal,
        rule: AccessRule,
        resource: Resource,
    ) -> Result<(), AppError> {
        if rule != AccessRule::Public && principal.is_anonymous() {
            tracing::debug!(?rule, "anonymous request to protected operation");
            return Err(AppError::Unauthenticated);
        }

        match self.decide(principal, rule, &resource).await? {
            Decision::Allow => Ok(()),
            Decision::Deny => {
                tracing::info!(
                    principal = %principal.name(),
                    ?rule,
                    ?resource,
                    "access denied"
                );
                Err(AppError::Forbidden)
            }
        }
    }

    pub async fn decide(
        &self,
        principal: &Principal,
        rule: AccessRule,
        resource: &Resource,
    ) -> Result<Decision, AppError> {
        if rule == AccessRule::Public || principal.is_admin() {
            return Ok(Decision::Allow);
        }

        let allowed = match rule {
            AccessRule::Public => true,
            AccessRule::AdminOnly => false,
            AccessRule::AuthenticatedOnly => !principal.is_anonymous(),
            AccessRule::AdminOrInternalService => {
                matches!(principal, Principal::InternalService)
            }
            AccessRule::AdminOrSelfByEmail => match principal.email() {
                Some(email) => self.target_email(resource).await?.as_deref() == Some(email),
                None => false,
            },
            AccessRule::AdminOrSelfByOwner => match principal.email() {
                Some(email) => self.owns(email, resource).await?,
                None => false,
            },
        };

        Ok(if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        })
    }

    async fn target_email(&self, resource: &Resource) -> Result<Option<String>, AppError> {
        match resource {
            Resource::UserByEmail(email) => Ok(Some(email.clone())),
            Resource::UserById(id) => Ok(self.identities.get(*id).await?.map(|u| u.email)),
            _ => Ok(None),
        }
    }

    async fn owns(&self, email: &str, resource: &Resource) -> Result<bool, AppError> {
        let owner_id = match resource {
            Resource::OwnedByUser(user_id) | Resource::UserById(user_id) => Some(*user_id),
            Resource::Card(card_id) => self.cards.find_by_id(*card_id).await?.map(|c| c.user_id),
            _ => None,
        };
        let Some(owner_id) = owner_id else {
            return Ok(false);
        };

        let requester = self.identities.get_by_email(email).await?;
        Ok(requester.is_some_and(|u| u.id == owner_id))
    }
}
