/*
 * Responsibility
 * - API バージョンの束ね
 */
pub mod v1;
