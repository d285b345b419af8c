//! `?ids=1&ids=2` or `?ids=1,2` (or a mix) → `Vec<i64>`, order kept, duplicates dropped.

use axum::extract::{FromRequestParts, RawQuery};
use axum::http::request::Parts;

use crate::error::AppError;

const PARAM: &str = "ids";

#[derive(Debug)]
pub struct IdList(pub Vec<i64>);

impl<S> FromRequestParts<S> for IdList
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RawQuery(query) = RawQuery::from_request_parts(parts, state)
            .await
            .map_err(AppError::unclassified)?;
        parse(query.as_deref().unwrap_or_default()).map(IdList)
    }
}

fn parse(query: &str) -> Result<Vec<i64>, AppError> {
    let mut ids: Vec<i64> = Vec::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key != PARAM {
            continue;
        }
        for raw in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let id = raw
                .parse::<i64>()
                .map_err(|_| AppError::field(PARAM, format!("'{raw}' is not a valid id")))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    if ids.is_empty() {
        return Err(AppError::field(PARAM, "At least one id is required"));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_and_comma_separated_mix() {
        assert_eq!(parse("ids=1&ids=2,3&ids=%204").unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(parse("ids=5,5&x=9&ids=5").unwrap(), vec![5]);
    }

    #[test]
    fn empty_or_garbage_is_a_field_error() {
        for query in ["", "ids=", "other=1"] {
            assert!(matches!(parse(query), Err(AppError::Validation(e)) if e.contains_key("ids")));
        }
        assert!(matches!(parse("ids=1,abc"), Err(AppError::Validation(_))));
    }
}
