/*
 * Responsibility
 * - Cards の request/response DTO (camelCase on the wire)
 * - The card number never leaves the service unmasked
 */
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::v1::dto::users::required_text;
use crate::error::{AppError, FieldErrors};
use crate::repos::card_repo::{CardFields, CardRow};

const HOLDER_MAX: usize = 100;
const NUMBER_LEN: usize = 16;

/// Body of `POST /cards/addCardInfoToUser/{userId}`; the owner comes from the path.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    pub number: Option<String>,
    pub holder: Option<String>,
    pub expiration_date: Option<NaiveDate>,
}

impl CardRequest {
    pub fn validate(self) -> Result<CardFields, AppError> {
        let mut errors = FieldErrors::new();
        let fields = card_fields(&mut errors, self);
        match fields {
            Some(fields) if errors.is_empty() => Ok(fields),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

/// Body of `POST /cards` and `PUT /cards/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardWithUserIdRequest {
    pub user_id: Option<i64>,
    pub number: Option<String>,
    pub holder: Option<String>,
    pub expiration_date: Option<NaiveDate>,
}

impl CardWithUserIdRequest {
    pub fn validate(self) -> Result<(i64, CardFields), AppError> {
        let mut errors = FieldErrors::new();

        if self.user_id.is_none() {
            errors.insert("userId".into(), "User id is required".into());
        }
        let fields = card_fields(
            &mut errors,
            CardRequest {
                number: self.number,
                holder: self.holder,
                expiration_date: self.expiration_date,
            },
        );

        match (self.user_id, fields) {
            (Some(user_id), Some(fields)) if errors.is_empty() => Ok((user_id, fields)),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

fn card_fields(errors: &mut FieldErrors, req: CardRequest) -> Option<CardFields> {
    let number = match req.number.map(|n| n.trim().to_string()) {
        Some(n) if n.is_empty() => {
            errors.insert("number".into(), "Card number is required".into());
            None
        }
        None => {
            errors.insert("number".into(), "Card number is required".into());
            None
        }
        Some(n) if n.len() != NUMBER_LEN || !n.bytes().all(|b| b.is_ascii_digit()) => {
            errors.insert("number".into(), "Card number must be 16 digits".into());
            None
        }
        Some(n) => Some(n),
    };

    let holder = required_text(errors, "holder", "Card holder", req.holder, HOLDER_MAX);

    let expiration_date = match req.expiration_date {
        None => {
            errors.insert("expirationDate".into(), "Expiration date is required".into());
            None
        }
        Some(d) if d <= Utc::now().date_naive() => {
            errors.insert(
                "expirationDate".into(),
                "Expiration date must be in the future".into(),
            );
            None
        }
        Some(d) => Some(d),
    };

    Some(CardFields {
        number: number?,
        holder: holder?,
        expiration_date: expiration_date?,
    })
}

/// `************1234`; anything too short to mask is hidden entirely.
pub fn mask_number(number: &str) -> String {
    let len = number.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let visible: String = number.chars().skip(len - 4).collect();
    format!("{}{visible}", "*".repeat(len - 4))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    pub id: i64,
    pub user_id: i64,
    pub number: String,
    pub holder: String,
    pub expiration_date: NaiveDate,
}

impl From<CardRow> for CardResponse {
    fn from(c: CardRow) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            number: mask_number(&c.number),
            holder: c.holder,
            expiration_date: c.expiration_date,
        }
    }
}
