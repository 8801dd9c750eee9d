//! Shared domain layer for Snippetbox
//!
//! Models, repositories and validation used by the web service, plus the
//! PostgreSQL and Redis plumbing they sit on.

pub mod cache;
pub mod database;
pub mod error;
pub mod models;
pub mod repositories;
pub mod validator;
