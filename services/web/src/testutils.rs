//! In-memory repositories and a cookie-keeping client for router tests

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        HeaderMap, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use axum_extra::extract::cookie::Cookie;
use chrono::{Duration as ChronoDuration, Utc};
use common::{
    error::{ModelError, ModelResult},
    models::Snippet,
    repositories::{Repositories, SnippetRepository, UserRepository},
};
use regex::Regex;
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tower::ServiceExt;

use crate::{
    csrf::{CSRF_COOKIE, CSRF_FIELD},
    routes::create_router,
    session::{MemoryStore, SessionManager},
    state::AppState,
    templates::TemplateCache,
};

pub fn mock_snippet() -> Snippet {
    let now = Utc::now();
    Snippet {
        id: 1,
        title: "An old silent pond".to_string(),
        content: "An old silent pond...".to_string(),
        created: now,
        expires: now + ChronoDuration::days(365),
    }
}

/// Snippet 1 is live, snippet 3 has expired; inserts return id 2
pub struct MockSnippetRepository {
    snippets: Vec<Snippet>,
}

impl Default for MockSnippetRepository {
    fn default() -> Self {
        let now = Utc::now();
        let expired = Snippet {
            id: 3,
            title: "Gone".to_string(),
            content: "Expired yesterday".to_string(),
            created: now - ChronoDuration::days(8),
            expires: now - ChronoDuration::days(1),
        };
        Self {
            snippets: vec![mock_snippet(), expired],
        }
    }
}

#[async_trait]
impl SnippetRepository for MockSnippetRepository {
    async fn insert(&self, _title: &str, _content: &str, _expires_days: i32) -> ModelResult<i64> {
        Ok(2)
    }

    async fn get(&self, id: i64) -> ModelResult<Snippet> {
        let now = Utc::now();
        self.snippets
            .iter()
            .find(|s| s.id == id && !s.is_expired_at(now))
            .cloned()
            .ok_or(ModelError::NoRecord)
    }

    async fn latest(&self) -> ModelResult<Vec<Snippet>> {
        let now = Utc::now();
        Ok(self
            .snippets
            .iter()
            .filter(|s| !s.is_expired_at(now))
            .cloned()
            .collect())
    }
}

/// alice@example.com / pa$$word is user 1; dupe@example.com is taken
#[derive(Default)]
pub struct MockUserRepository {
    exists_calls: AtomicUsize,
    deleted: AtomicBool,
}

impl MockUserRepository {
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn delete_all(&self) {
        self.deleted.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn insert(&self, _name: &str, email: &str, _password: &str) -> ModelResult<()> {
        match email {
            "dupe@example.com" => Err(ModelError::DuplicateEmail),
            _ => Ok(()),
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> ModelResult<i64> {
        if email == "alice@example.com" && password == "pa$$word" {
            Ok(1)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i64) -> ModelResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(id == 1 && !self.deleted.load(Ordering::SeqCst))
    }
}

/// State wired to the mock repositories and an in-memory session store
pub fn test_state() -> (AppState, Arc<MockUserRepository>) {
    let users = Arc::new(MockUserRepository::default());
    let state = AppState {
        repositories: Repositories {
            snippet: Arc::new(MockSnippetRepository::default()),
            user: users.clone(),
        },
        templates: Arc::new(TemplateCache::new().expect("templates parse")),
        sessions: SessionManager::new(
            Arc::new(MemoryStore::default()),
            Duration::from_secs(12 * 60 * 60),
        ),
    };
    (state, users)
}

pub struct TestApp {
    pub router: Router,
    pub users: Arc<MockUserRepository>,
}

pub fn test_app() -> TestApp {
    let (state, users) = test_state();
    let static_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("ui/static");
    TestApp {
        router: create_router(state, &static_dir),
        users,
    }
}

/// Hidden CSRF field value embedded in a rendered page
pub fn extract_csrf_token(body: &str) -> String {
    let re = Regex::new(r#"name="csrf_token" value="([A-Za-z0-9]+)""#).unwrap();
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .expect("no CSRF token in page")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Drives the router like a browser: keeps cookies and submits CSRF tokens
pub struct TestClient {
    router: Router,
    cookies: HashMap<String, String>,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            cookies: HashMap::new(),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        self.send(req).await
    }

    /// POST a form, adding the CSRF token from a prior page visit
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        if !self.cookies.contains_key(CSRF_COOKIE) {
            self.get("/user/login").await;
        }
        let token = self.cookie(CSRF_COOKIE).expect("CSRF cookie issued");

        let mut fields = fields.to_vec();
        fields.push((CSRF_FIELD, &token));
        self.post_form_without_token(uri, &fields).await
    }

    pub async fn post_form_without_token(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let req = Request::post(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    /// Log in as alice (user 1)
    pub async fn log_in(&mut self) {
        let response = self
            .post_form("/user/login", &[("email", "alice@example.com"), ("password", "pa$$word")])
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "login failed");
    }

    async fn send(&mut self, mut req: Request<Body>) -> TestResponse {
        if !self.cookies.is_empty() {
            let header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            req.headers_mut().insert(COOKIE, header.parse().unwrap());
        }

        let response = self.router.clone().oneshot(req).await.unwrap();

        for value in response.headers().get_all(SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().unwrap().to_string()).unwrap();
            if cookie.max_age() == Some(time::Duration::ZERO) {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }
}
