//! Per-request values shared between middleware and handlers

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Datelike, Utc};
use std::convert::Infallible;

use crate::{csrf::CsrfToken, error::AppError, session::Session, templates::TemplateData};

/// Session key holding the logged-in user's id
pub const AUTHENTICATED_USER_KEY: &str = "authenticatedUserID";

/// Session key holding the one-shot flash message
pub const FLASH_KEY: &str = "flash";

/// Set by the authenticate middleware once the session user is confirmed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsAuthenticated(pub bool);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for IsAuthenticated {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<IsAuthenticated>()
            .copied()
            .unwrap_or_default())
    }
}

/// What every rendered page needs from the request
pub struct PageContext {
    pub session: Session,
    pub is_authenticated: bool,
    pub csrf_token: String,
}

impl PageContext {
    /// Template data with the common fields filled in; consumes the flash
    pub async fn template_data(&self) -> TemplateData {
        TemplateData {
            current_year: Utc::now().year(),
            flash: self.session.pop::<String>(FLASH_KEY).await,
            is_authenticated: self.is_authenticated,
            csrf_token: self.csrf_token.clone(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PageContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        let IsAuthenticated(is_authenticated) = IsAuthenticated::from_request_parts(parts, state)
            .await
            .unwrap_or_default();
        let csrf_token = parts
            .extensions
            .get::<CsrfToken>()
            .map(|token| token.0.clone())
            .unwrap_or_default();

        Ok(Self {
            session,
            is_authenticated,
            csrf_token,
        })
    }
}
