/*
 * Responsibility
 * - Router-level middleware entry points (each module exposes `apply`)
 */
pub mod auth;
pub mod cors;
pub mod error_envelope;
pub mod http;
