/*
 * Responsibility
 * - /cards 系 handler
 * - 最初に access rule を評価 → body validation → service 呼び出し
 */
use axum::{Json, extract::State, http::StatusCode};

use crate::{
    api::v1::{
        dto::cards::{CardRequest, CardResponse, CardWithUserIdRequest},
        extractors::{
            caller::Caller,
            id_list::IdList,
            json::ValidJson,
            path_id::{CardId, OwnerId},
        },
    },
    error::AppError,
    repos::card_repo::CardRow,
    services::access::{AccessRule, Resource},
    state::AppState,
};

fn respond(rows: Vec<CardRow>) -> Json<Vec<CardResponse>> {
    Json(rows.into_iter().map(CardResponse::from).collect())
}

pub async fn list_cards(
    State(state): State<AppState>,
    Caller(principal): Caller,
) -> Result<Json<Vec<CardResponse>>, AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOnly, Resource::None)
        .await?;

    Ok(respond(state.cards.list().await?))
}

pub async fn get_card(
    State(state): State<AppState>,
    Caller(principal): Caller,
    card_id: CardId,
) -> Result<Json<CardResponse>, AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOrSelfByOwner, Resource::Card(card_id.id))
        .await?;

    let row = state.cards.get_by_id(card_id.id).await?;
    Ok(Json(row.into()))
}

pub async fn get_cards_by_ids(
    State(state): State<AppState>,
    Caller(principal): Caller,
    ids: Result<IdList, AppError>,
) -> Result<Json<Vec<CardResponse>>, AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOnly, Resource::None)
        .await?;

    let IdList(ids) = ids?;
    Ok(respond(state.cards.get_by_ids(&ids).await?))
}

pub async fn create_card(
    State(state): State<AppState>,
    Caller(principal): Caller,
    body: Result<ValidJson<CardWithUserIdRequest>, AppError>,
) -> Result<(StatusCode, Json<CardResponse>), AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOnly, Resource::None)
        .await?;

    let ValidJson(req) = body?;
    let (user_id, fields) = req.validate()?;
    let row = state.cards.add_to_user(user_id, &fields).await?;

    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn update_card(
    State(state): State<AppState>,
    Caller(principal): Caller,
    card_id: CardId,
    body: Result<ValidJson<CardWithUserIdRequest>, AppError>,
) -> Result<Json<CardResponse>, AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOrSelfByOwner, Resource::Card(card_id.id))
        .await?;

    let ValidJson(req) = body?;
    let (user_id, fields) = req.validate()?;

    // Owning the card is not enough to hand it to someone else.
    state
        .access
        .authorize(&principal, AccessRule::AdminOrSelfByOwner, Resource::OwnedByUser(user_id))
        .await?;

    let row = state.cards.update(card_id.id, user_id, &fields).await?;
    Ok(Json(row.into()))
}

pub async fn delete_card(
    State(state): State<AppState>,
    Caller(principal): Caller,
    card_id: CardId,
) -> Result<StatusCode, AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOrSelfByOwner, Resource::Card(card_id.id))
        .await?;

    state.cards.delete(card_id.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_card_to_user(
    State(state): State<AppState>,
    Caller(principal): Caller,
    owner: OwnerId,
    body: Result<ValidJson<CardRequest>, AppError>,
) -> Result<(StatusCode, Json<CardResponse>), AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOrSelfByOwner, Resource::OwnedByUser(owner.id))
        .await?;

    let ValidJson(req) = body?;
    let row = state.cards.add_to_user(owner.id, &req.validate()?).await?;

    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn list_cards_by_user(
    State(state): State<AppState>,
    Caller(principal): Caller,
    owner: OwnerId,
) -> Result<Json<Vec<CardResponse>>, AppError> {
    state
        .access
        .authorize(&principal, AccessRule::AdminOrSelfByOwner, Resource::OwnedByUser(owner.id))
        .await?;

    Ok(respond(state.cards.list_by_user(owner.id).await?))
}
