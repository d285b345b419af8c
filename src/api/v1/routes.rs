/*
 * Responsibility
 * - v1 の URL 構造を定義 (/users, /cards)
 * - Every route here runs behind the security context middleware; per-route
 *   access rules are evaluated inside the handlers
 */
use axum::{
    Router,
    routing::{get, post, put},
};

use crate::api::v1::handlers::{
    cards::{
        add_card_to_user, create_card, delete_card, get_card, get_cards_by_ids, list_cards,
        list_cards_by_user, update_card,
    },
    users::{
        create_user, delete_user, get_user, get_user_by_email, get_users_by_ids, list_users,
        update_user,
    },
};
use crate::middleware::auth::context;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let users = Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/getById/{id}", get(get_user))
        .route("/getByIds", get(get_users_by_ids))
        .route("/getByEmail/{email}", get(get_user_by_email))
        .route("/{id}", put(update_user).delete(delete_user));

    let cards = Router::new()
        .route("/", get(list_cards).post(create_card))
        .route("/getById/{id}", get(get_card))
        .route("/getByIds", get(get_cards_by_ids))
        .route("/addCardInfoToUser/{user_id}", post(add_card_to_user))
        .route("/getCardInfoByUserId/{user_id}", get(list_cards_by_user))
        .route("/{id}", put(update_card).delete(delete_card));

    let v1 = Router::new().nest("/users", users).nest("/cards", cards);

    context::apply(v1, state)
}
