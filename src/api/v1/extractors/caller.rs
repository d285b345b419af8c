//! Hands the request's `Principal` to handlers.
//!
//! `middleware::auth::context` inserts the principal into request extensions
//! before routing. A route mounted without that middleware sees `Anonymous`,
//! which the access evaluator turns into 401 on anything but `Public`.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::services::auth::Principal;

pub struct Caller(pub Principal);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .unwrap_or(Principal::Anonymous);
        Ok(Caller(principal))
    }
}
