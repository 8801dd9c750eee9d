//! Request middleware: panic recovery, logging, security headers and
//! authentication

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONNECTION},
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::{any::Any, net::SocketAddr};
use tracing::{Instrument, debug, error, info, info_span};

use crate::{
    context::{AUTHENTICATED_USER_KEY, IsAuthenticated},
    error::AppResult,
    session::Session,
    state::AppState,
};

const SECURITY_HEADERS: &[(&str, &str)] = &[
    (
        "content-security-policy",
        "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
    ),
    ("referrer-policy", "origin-when-cross-origin"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "deny"),
    ("x-xss-protection", "0"),
    ("server", "snippetbox"),
];

fn insert_security_headers(headers: &mut HeaderMap) {
    for &(name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}

/// Turn a handler panic into a plain 500 and close the connection
pub fn recover_panic(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!(panic = %message, "recovered from panic");

    // The unwind skips common_headers, so the 500 carries its own copy
    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    let headers = response.headers_mut();
    insert_security_headers(headers);
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    response
}

/// Log the request line and run the rest of the stack in a request span
pub async fn log_request(req: Request, next: Next) -> Response {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());
    let proto = format!("{:?}", req.version());
    let method = req.method().clone();
    let uri = req.uri().clone();

    info!(%ip, %proto, %method, %uri, "received request");

    let span = info_span!("request", %method, %uri);
    next.run(req).instrument(span).await
}

/// Security headers on every response
pub async fn common_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    insert_security_headers(response.headers_mut());
    response
}

/// Mark the request authenticated when the session user still exists
pub async fn authenticate(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    if let Some(user_id) = session.get::<i64>(AUTHENTICATED_USER_KEY).await {
        if state.repositories.user.exists(user_id).await? {
            req.extensions_mut().insert(IsAuthenticated(true));
        } else {
            debug!(user_id, "session refers to a missing user");
        }
    }
    Ok(next.run(req).await)
}

/// Send anonymous visitors to the login page
pub async fn require_authentication(
    IsAuthenticated(authenticated): IsAuthenticated,
    req: Request,
    next: Next,
) -> Response {
    if !authenticated {
        return Redirect::to("/user/login").into_response();
    }

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
