//! Security context: resolve the request's `Principal` → put it in extensions.
//!
//! - `X-Internal-API-Key` that matches → `InternalService` (bearer token not checked)
//! - no `Authorization` header → `Anonymous`
//! - `Authorization: Bearer <jwt>` that verifies → `EndUser`
//! - anything else → 401 here, before routing reaches a handler
//!
//! Whether a principal may do something is decided later by the access evaluator.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Apply the security context middleware to every route of `router`.
///
/// ```ignore
/// let v1 = api::v1::routes();
/// let v1 = middleware::auth::context::apply(v1, state.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8: `from_fn` cannot take a State extractor, so pass state explicitly
    router.layer(middleware::from_fn_with_state(state, security_context_middleware))
}

async fn security_context_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let principal = state.auth.establish(req.headers())?;

    tracing::debug!(principal = %principal.name(), "security context established");

    // middleware → extractor
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
