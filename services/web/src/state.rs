//! Shared application state

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use common::repositories::Repositories;
use std::sync::Arc;

use crate::{
    error::AppResult,
    session::SessionManager,
    templates::{TemplateCache, TemplateData},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repositories: Repositories,
    pub templates: Arc<TemplateCache>,
    pub sessions: SessionManager,
}

impl AppState {
    /// Render `page` into a response with `status`
    pub fn render(&self, status: StatusCode, page: &str, data: TemplateData) -> AppResult<Response> {
        let body = self.templates.render(page, &data)?;
        Ok((status, Html(body)).into_response())
    }
}

