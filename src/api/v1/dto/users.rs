/*
 * Responsibility
 * - Users の request/response DTO (camelCase on the wire)
 * - validate(): every broken field is reported at once, keyed by field name
 */
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::v1::dto::cards::CardResponse;
use crate::error::{AppError, FieldErrors};
use crate::repos::user_repo::{UserFields, UserRow};

const NAME_MAX: usize = 50;
const EMAIL_MAX: usize = 100;

// Used for both create and update (full replacement).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub email: Option<String>,
}

impl UserRequest {
    pub fn validate(self) -> Result<UserFields, AppError> {
        let mut errors = FieldErrors::new();

        let name = required_text(&mut errors, "name", "Name", self.name, NAME_MAX);
        let surname = required_text(&mut errors, "surname", "Surname", self.surname, NAME_MAX);

        let birth_date = match self.birth_date {
            None => {
                errors.insert("birthDate".into(), "Birth date is required".into());
                None
            }
            Some(d) if d >= Utc::now().date_naive() => {
                errors.insert("birthDate".into(), "Birth date must be in the past".into());
                None
            }
            Some(d) => Some(d),
        };

        let email = match self.email.map(|e| e.trim().to_string()) {
            None => {
                errors.insert("email".into(), "Email is required".into());
                None
            }
            Some(e) if e.is_empty() => {
                errors.insert("email".into(), "Email is required".into());
                None
            }
            Some(e) if !is_email(&e) => {
                errors.insert("email".into(), "Invalid email format".into());
                None
            }
            Some(e) if e.chars().count() > EMAIL_MAX => {
                errors.insert(
                    "email".into(),
                    format!("Email must not exceed {EMAIL_MAX} characters"),
                );
                None
            }
            Some(e) => Some(e),
        };

        match (name, surname, birth_date, email) {
            (Some(name), Some(surname), Some(birth_date), Some(email)) if errors.is_empty() => {
                Ok(UserFields {
                    name,
                    surname,
                    birth_date,
                    email,
                })
            }
            _ => Err(AppError::Validation(errors)),
        }
    }
}

pub(crate) fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    label: &str,
    value: Option<String>,
    max: usize,
) -> Option<String> {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        errors.insert(field.into(), format!("{label} is required"));
        return None;
    }
    if value.chars().count() > max {
        errors.insert(field.into(), format!("{label} must not exceed {max} characters"));
        return None;
    }
    Some(value)
}

// local@domain with no whitespace; deliverability is not our concern.
fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub birth_date: NaiveDate,
    pub email: String,
    pub cards: Vec<CardResponse>,
}

impl From<UserRow> for UserResponse {
    fn from(u: UserRow) -> Self {
        Self {
            id: u.id,
            name: u.name,
            surname: u.surname,
            birth_date: u.birth_date,
            email: u.email,
            cards: u.cards.into_iter().map(CardResponse::from).collect(),
        }
    }
}
