/*
 * Responsibility
 *  - Path segment → typed numeric id
 *  - FromRequestParts 実装 (state を必要としない)
 *  - 変換失敗は 400 + errors.<field> (the field name comes from the tag type)
 */
use std::marker::PhantomData;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use crate::error::AppError;

/// Tag types name the path segment they decode, for error reporting.
pub trait IdKind {
    const FIELD: &'static str;
}

#[derive(Clone, Copy)]
pub struct PathId<T> {
    pub id: i64,
    _marker: PhantomData<T>,
}

impl<T> PathId<T> {
    fn new(id: i64) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }
}

impl<T, S> FromRequestParts<S> for PathId<T>
where
    T: IdKind + Send + Sync,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::field(T::FIELD, "Path id is missing"))?;

        raw.parse::<i64>()
            .map(Self::new)
            .map_err(|_| AppError::field(T::FIELD, format!("'{raw}' is not a valid id")))
    }
}

impl<T> std::fmt::Debug for PathId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathId").field("id", &self.id).finish()
    }
}
