//! # Blogs Module
//!
//! Blog post CRUD. Anyone can read; only the author of a post may
//! change or delete it, checked against the stored owner on every call.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use routes::blogs_routes;
