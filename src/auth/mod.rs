//! # Auth Module
//!
//! Identity handling for the blog:
//! - Google and Facebook OAuth logins
//! - User reconciliation keyed by email
//! - JWT credential issuance and validation
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod routes;
pub mod service;
pub mod token;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use routes::auth_routes;
pub use service::IdentityService;
