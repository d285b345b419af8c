//! Fills the request path into error envelopes.
//!
//! `AppError` renders without knowing which request failed; it leaves a
//! `FailureReport` in the response extensions. This layer sits outermost, sees
//! the original URI and re-renders the envelope with `path` set.
//!
//! Error statuses produced outside our handlers (405 from routing, 413 from the
//! body limit) carry no report; they get one built from the status line.

use axum::{
    Router,
    body::Body,
    extract::OriginalUri,
    http::{HeaderValue, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::FailureReport;

pub fn apply(router: Router) -> Router {
    router.layer(middleware::from_fn(attach_path))
}

async fn attach_path(OriginalUri(uri): OriginalUri, req: Request<Body>, next: Next) -> Response {
    let mut res = next.run(req).await;

    let report = match res.extensions().get::<FailureReport>() {
        Some(report) => report.clone(),
        None if res.status().is_client_error() || res.status().is_server_error() => {
            FailureReport {
                status: res.status(),
                message: res
                    .status()
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
                errors: None,
            }
        }
        None => return res,
    };

    // Only the body changes; status and headers set further in (request id, CORS, Allow) stay.
    match serde_json::to_vec(&report.envelope(uri.path())) {
        Ok(bytes) => {
            let headers = res.headers_mut();
            headers.remove(header::CONTENT_LENGTH);
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            *res.body_mut() = Body::from(bytes);
        }
        Err(err) => tracing::error!(error = %err, "failed to render error envelope"),
    }

    res
}
