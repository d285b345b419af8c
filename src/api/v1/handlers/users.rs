/*
 * Responsibility
 * - /users 系 handler
 * - 最初に access rule を評価 → body validation → service 呼び出し
 * - The body is extracted as a Result so an unauthorized caller learns nothing
 *   from body parsing.
 */
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    api::v1::{
        dto::users::{UserRequest, UserResponse},
        extractors::{caller::Caller, id_list::IdList, json::ValidJson, path_id::UserId},
    },
    error::AppError,
    repos::user_repo::UserRow,
    services::access::{AccessRule, Resource},
    state::AppState,
};

type Body = Result<ValidJson<UserRequest>, AppError>;

fn respond(rows: Vec<UserRow>) -> Json<Vec<UserResponse>> {
    Json(rows.into_iter().map(UserResponse::from).collect())
}

pub async fn list_users(
    State(state): State<AppState>,
    Caller(principal): Caller,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOnly, Resource::None)
        .await?;

    Ok(respond(state.users.list().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Caller(principal): Caller,
    user_id: UserId,
) -> Result<Json<UserResponse>, AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOrSelfByEmail, Resource::UserById(user_id.id))
        .await?;

    let row = state.users.get_by_id(user_id.id).await?;
    Ok(Json(row.into()))
}

pub async fn get_users_by_ids(
    State(state): State<AppState>,
    Caller(principal): Caller,
    ids: Result<IdList, AppError>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOrInternalService, Resource::None)
        .await?;

    let IdList(ids) = ids?;
    Ok(respond(state.users.get_by_ids(&ids).await?))
}

pub async fn get_user_by_email(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(email): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    state
        .access
        .authorize(
            &principal,
            AccessRule::AdminOrSelfByEmail,
            Resource::UserByEmail(email.clone()),
        )
        .await?;

    let row = state.users.get_by_email(&email).await?;
    Ok(Json(row.into()))
}

pub async fn create_user(
    State(state): State<AppState>,
    Caller(principal): Caller,
    body: Body,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AuthenticatedOnly, Resource::None)
        .await?;

    let ValidJson(req) = body?;
    let row = state.users.create(&req.validate()?).await?;

    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn update_user(
    State(state): State<AppState>,
    Caller(principal): Caller,
    user_id: UserId,
    body: Body,
) -> Result<Json<UserResponse>, AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOrSelfByEmail, Resource::UserById(user_id.id))
        .await?;

    let ValidJson(req) = body?;
    let row = state.users.update(user_id.id, &req.validate()?).await?;

    Ok(Json(row.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Caller(principal): Caller,
    user_id: UserId,
) -> Result<StatusCode, AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOnly, Resource::UserById(user_id.id))
        .await?;

    state.users.delete(user_id.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
