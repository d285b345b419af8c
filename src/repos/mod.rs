/*
 * Responsibility
 * - Persistence collaborators (traits) and their Postgres implementations
 * - In-memory doubles for tests live in `memory`
 */
pub mod card_repo;
pub mod error;
#[cfg(test)]
pub mod memory;
pub mod user_repo;
