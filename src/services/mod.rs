pub mod access;
pub mod auth;
pub mod cache;
pub mod cards;
pub mod identity_cache;
pub mod users;
