/*
 * Responsibility
 *  - リソースごとの「意味付きID型」を宣言する
 *  - decode ロジック / extractor 実装はここに置かない (core.rs)
 */
use super::core::{IdKind, PathId};

// users/{id}
pub enum UserTag {}
impl IdKind for UserTag {
    const FIELD: &'static str = "id";
}
pub type UserId = PathId<UserTag>;

// cards/{id}
pub enum CardTag {}
impl IdKind for CardTag {
    const FIELD: &'static str = "id";
}
pub type CardId = PathId<CardTag>;

// cards/.../{userId}
pub enum OwnerTag {}
impl IdKind for OwnerTag {
    const FIELD: &'static str = "userId";
}
pub type OwnerId = PathId<OwnerTag>;
