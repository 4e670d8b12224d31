//! Database layer: error classification, repositories and their models.

pub mod errors;
pub mod handlers;
pub mod models;
