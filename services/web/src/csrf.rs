//! Double-submit cookie CSRF protection
//!
//! Every visitor gets a random token in the `csrf_token` cookie. Unsafe
//! requests must echo it back in the `csrf_token` form field or the
//! `X-CSRF-Token` header, otherwise they are rejected with 400.

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::{
        HeaderValue, Method, StatusCode,
        header::{CONTENT_TYPE, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;

use crate::{
    error::AppError,
    session::{TOKEN_LEN, generate_token},
};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_FIELD: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Largest form body buffered for the token check
const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

/// Token for the current request, available to handlers as an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(pub String);

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Constant-time comparison
fn tokens_match(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"))
}

fn form_token(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned())
}

fn token_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(365))
        .build()
}

/// Check the submitted token on unsafe requests and issue one when missing
pub async fn prevent_csrf(req: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let existing = jar
        .get(CSRF_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| token.len() == TOKEN_LEN);
    let issued = existing.is_none();
    let token = existing.unwrap_or_else(generate_token);

    let mut response = match verify(req, &token, issued).await {
        Ok(mut req) => {
            req.extensions_mut().insert(CsrfToken(token.clone()));
            next.run(req).await
        }
        Err(response) => response,
    };

    if issued {
        if let Ok(value) = HeaderValue::from_str(&token_cookie(&token).to_string()) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

async fn verify(req: Request, token: &str, issued: bool) -> Result<Request, Response> {
    if is_safe(req.method()) {
        return Ok(req);
    }

    let header = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (req, submitted) = match header {
        Some(submitted) => (req, Some(submitted)),
        None if is_form(&req) => {
            let (parts, body) = req.into_parts();
            let bytes = to_bytes(body, MAX_FORM_BYTES)
                .await
                .map_err(|_| AppError::Client(StatusCode::BAD_REQUEST).into_response())?;
            let submitted = form_token(&bytes);
            (Request::from_parts(parts, Body::from(bytes)), submitted)
        }
        None => (req, None),
    };

    // a freshly issued token cannot have been submitted yet
    let valid = !issued
        && submitted.is_some_and(|submitted| tokens_match(submitted.as_bytes(), token.as_bytes()));
    if !valid {
        warn!(method = %req.method(), uri = %req.uri(), "CSRF token check failed");
        return Err(AppError::Client(StatusCode::BAD_REQUEST).into_response());
    }
    Ok(req)
}
