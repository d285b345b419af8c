/*
 * Responsibility
 * - Security context establishment: internal key first, then bearer token
 * - Every credential failure collapses into AppError::Unauthenticated (fail-closed)
 */
pub mod internal_key;
pub mod principal;
pub mod token;

use axum::http::{HeaderMap, header};

use crate::error::AppError;

pub use internal_key::InternalKey;
pub use principal::Principal;
pub use token::TokenVerifier;

pub const INTERNAL_API_KEY_HEADER: &str = "x-internal-api-key";

/// Resolves the principal of a request from its headers.
#[derive(Clone, Debug)]
pub struct Authenticator {
    verifier: TokenVerifier,
    internal_key: InternalKey,
}

impl Authenticator {
    pub fn new(verifier: TokenVerifier, internal_key: InternalKey) -> Self {
        Self {
            verifier,
            internal_key,
        }
    }

    /// 1. matching internal key => InternalService (token is not looked at)
    /// 2. no Authorization header => Anonymous
    /// 3. Bearer token that verifies => EndUser, anything else => Unauthenticated
    pub fn establish(&self, headers: &HeaderMap) -> Result<Principal, AppError> {
        if let Some(presented) = headers.get(INTERNAL_API_KEY_HEADER) {
            let matched = presented
                .to_str()
                .map(|v| self.internal_key.matches(v))
                .unwrap_or(false);

            if matched {
                return Ok(Principal::InternalService);
            }
            tracing::debug!("internal api key did not match, checking bearer token");
        }

        let Some(auth) = headers.get(header::AUTHORIZATION) else {
            return Ok(Principal::Anonymous);
        };

        let token = auth
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                tracing::warn!("malformed authorization header");
                AppError::Unauthenticated
            })?;

        let claims = match self.verifier.verify(token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::warn!(error = %err, "bearer token verification failed");
                return Err(AppError::Unauthenticated);
            }
        };

        tracing::debug!(sub = %claims.sub, iat = ?claims.iat, "bearer token verified");
        Ok(Principal::end_user(claims.sub, claims.roles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{INTERNAL_KEY, authenticator, expired_token, token_for};
    use axum::http::{HeaderName, HeaderValue};

    const AUTHORIZATION: &str = "authorization";

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[test]
    fn no_credentials_is_anonymous() {
        let principal = authenticator().establish(&HeaderMap::new()).unwrap();
        assert_eq!(principal, Principal::Anonymous);
    }

    #[test]
    fn valid_token_is_end_user() {
        let h = headers(&[(AUTHORIZATION, bearer(&token_for("a@x.com", &[])).as_str())]);
        let principal = authenticator().establish(&h).unwrap();
        assert_eq!(principal, Principal::end_user("a@x.com", vec![]));
    }

    #[test]
    fn internal_key_wins_over_a_valid_token() {
        let h = headers(&[
            (INTERNAL_API_KEY_HEADER, INTERNAL_KEY),
            (AUTHORIZATION, bearer(&token_for("a@x.com", &["ROLE_ADMIN"])).as_str()),
        ]);
        assert_eq!(
            authenticator().establish(&h).unwrap(),
            Principal::InternalService
        );
    }

    #[test]
    fn internal_key_skips_token_verification() {
        let h = headers(&[
            (INTERNAL_API_KEY_HEADER, INTERNAL_KEY),
            (AUTHORIZATION, "Bearer garbage"),
        ]);
        assert_eq!(
            authenticator().establish(&h).unwrap(),
            Principal::InternalService
        );
    }

    #[test]
    fn wrong_internal_key_falls_through() {
        let anonymous = headers(&[(INTERNAL_API_KEY_HEADER, "nope")]);
        assert_eq!(
            authenticator().establish(&anonymous).unwrap(),
            Principal::Anonymous
        );

        let with_token = headers(&[
            (INTERNAL_API_KEY_HEADER, "nope"),
            (AUTHORIZATION, bearer(&token_for("a@x.com", &[])).as_str()),
        ]);
        assert_eq!(
            authenticator().establish(&with_token).unwrap(),
            Principal::end_user("a@x.com", vec![])
        );
    }

    #[test]
    fn bad_credentials_fail_closed() {
        let cases = [
            bearer(&expired_token("a@x.com")),
            bearer("not-a-jwt"),
            "Bearer ".to_string(),
            "Basic dXNlcjpwYXNz".to_string(),
            token_for("a@x.com", &[]),
        ];

        for value in cases {
            let h = headers(&[(AUTHORIZATION, value.as_str())]);
            assert!(
                matches!(authenticator().establish(&h), Err(AppError::Unauthenticated)),
                "expected rejection for {value:?}"
            );
        }
    }
}
