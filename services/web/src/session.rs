//! Server-side sessions
//!
//! The browser only holds a random token in the `session` cookie; the data
//! itself lives in a [`SessionStore`]. [`load_and_save`] loads the session
//! before the handler runs and writes it back (or deletes it) afterwards,
//! and handlers reach it through the [`Session`] extractor.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{CACHE_CONTROL, SET_COOKIE, VARY},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use common::cache::RedisPool;
use rand::{Rng, distributions::Alphanumeric};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::AppError;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Length of session and CSRF tokens
pub const TOKEN_LEN: usize = 32;

/// Values stored in one session
pub type SessionData = HashMap<String, Value>;

/// Random alphanumeric token
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Backend holding session data by token
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Data for `token`, or `None` if it is unknown or expired
    async fn load(&self, token: &str) -> Result<Option<SessionData>>;

    /// Store `data` under `token` for `ttl`
    async fn save(&self, token: &str, data: &SessionData, ttl: Duration) -> Result<()>;

    async fn delete(&self, token: &str) -> Result<()>;
}

/// In-process store, lost on restart
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<StdMutex<HashMap<String, (SessionData, Instant)>>>,
}

impl MemoryStore {
    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (SessionData, Instant)>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        let expired = match entries.get(token) {
            Some((data, deadline)) if *deadline > now => return Ok(Some(data.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(token);
        }
        Ok(None)
    }

    async fn save(&self, token: &str, data: &SessionData, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        entries.retain(|_, (_, deadline)| *deadline > now);
        entries.insert(token.to_string(), (data.clone(), now + ttl));
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.entries()?.remove(token);
        Ok(())
    }
}

/// Redis-backed store; entries expire through the key TTL
#[derive(Clone)]
pub struct RedisStore {
    redis: RedisPool,
}

impl RedisStore {
    pub fn new(redis: RedisPool) -> Self {
        Self { redis }
    }

    fn key(token: &str) -> String {
        format!("session:{}", token)
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>> {
        match self.redis.get(&Self::key(token)).await? {
            Some(raw) => Ok(Some(
                serde_json::from_str(&raw).context("decode session data")?,
            )),
            None => Ok(None),
        }
    }

    async fn save(&self, token: &str, data: &SessionData, ttl: Duration) -> Result<()> {
        let raw = serde_json::to_string(data)?;
        self.redis
            .set_ex(&Self::key(token), &raw, ttl.as_secs().max(1))
            .await
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.redis.delete(&Self::key(token)).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Unmodified,
    Modified,
    Destroyed,
}

#[derive(Debug)]
struct SessionState {
    /// `None` until the session is first saved
    token: Option<String>,
    /// Token replaced by `renew_token`, deleted on commit
    stale_token: Option<String>,
    data: SessionData,
    status: Status,
}

/// Handle to the current request's session
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    fn new(token: Option<String>, data: SessionData) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                token,
                stale_token: None,
                data,
                status: Status::Unmodified,
            })),
        }
    }

    /// Typed value for `key`; `None` if absent or of another type
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let state = self.state.lock().await;
        state
            .data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub async fn put(&self, key: &str, value: impl Into<Value>) {
        let mut state = self.state.lock().await;
        state.data.insert(key.to_string(), value.into());
        state.status = Status::Modified;
    }

    pub async fn remove(&self, key: &str) {
        let mut state = self.state.lock().await;
        if state.data.remove(key).is_some() {
            state.status = Status::Modified;
        }
    }

    /// Read and remove `key` in one step (flash messages)
    pub async fn pop<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut state = self.state.lock().await;
        let value = state.data.remove(key)?;
        state.status = Status::Modified;
        serde_json::from_value(value).ok()
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.state.lock().await.data.contains_key(key)
    }

    /// Move the data to a fresh token; the old one stops working
    pub async fn renew_token(&self) {
        let mut state = self.state.lock().await;
        if let Some(old) = state.token.take() {
            state.stale_token.get_or_insert(old);
        }
        state.token = Some(generate_token());
        state.status = Status::Modified;
    }

    /// Drop all data and expire the cookie
    pub async fn destroy(&self) {
        let mut state = self.state.lock().await;
        state.data.clear();
        state.status = Status::Destroyed;
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Server(anyhow!("session middleware is not installed")))
    }
}

/// Loads and commits sessions against a store
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    lifetime: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, lifetime: Duration) -> Self {
        Self { store, lifetime }
    }

    /// Session for the cookie token; unknown tokens start a new session
    pub async fn load(&self, token: Option<&str>) -> Result<Session> {
        if let Some(token) = token {
            if let Some(data) = self.store.load(token).await? {
                return Ok(Session::new(Some(token.to_string()), data));
            }
            debug!("session token not found, starting a new session");
        }
        Ok(Session::new(None, SessionData::new()))
    }

    /// Persist changes and write the matching cookie headers
    pub async fn commit(&self, session: &Session, headers: &mut HeaderMap) -> Result<()> {
        let mut state = session.state.lock().await;

        let cookie = match state.status {
            Status::Unmodified => return Ok(()),
            Status::Modified => {
                if let Some(stale) = state.stale_token.take() {
                    self.store.delete(&stale).await?;
                }
                let token = state.token.get_or_insert_with(generate_token).clone();
                self.store.save(&token, &state.data, self.lifetime).await?;
                self.cookie(token)
            }
            Status::Destroyed => {
                for token in [state.stale_token.take(), state.token.take()].into_iter().flatten() {
                    self.store.delete(&token).await?;
                }
                let mut cookie = self.cookie(String::new());
                cookie.make_removal();
                cookie
            }
        };
        state.status = Status::Unmodified;

        headers.append(SET_COOKIE, HeaderValue::from_str(&cookie.to_string())?);
        headers.append(VARY, HeaderValue::from_static("Cookie"));
        headers.append(CACHE_CONTROL, HeaderValue::from_static(r#"no-cache="Set-Cookie""#));
        Ok(())
    }

    fn cookie(&self, token: String) -> Cookie<'static> {
        let max_age = time::Duration::seconds(self.lifetime.as_secs() as i64);
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build()
    }
}

/// Middleware loading the session before and saving it after the handler
pub async fn load_and_save(
    State(manager): State<SessionManager>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(req.headers());
    let session = manager
        .load(jar.get(SESSION_COOKIE).map(|cookie| cookie.value()))
        .await?;
    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;
    manager.commit(&session, response.headers_mut()).await?;
    Ok(response)
}
