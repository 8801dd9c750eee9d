//! HTML rendering
//!
//! Pages, the base layout and partials are compiled into the binary and
//! parsed once at startup into a [`TemplateCache`]. Output is HTML-escaped.

use chrono::{DateTime, Utc};
use common::models::Snippet;
use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Serialize;
use thiserror::Error;

pub const HOME_PAGE: &str = "home.html";
pub const VIEW_PAGE: &str = "view.html";
pub const CREATE_PAGE: &str = "create.html";
pub const SIGNUP_PAGE: &str = "signup.html";
pub const LOGIN_PAGE: &str = "login.html";

const LAYOUTS: &[(&str, &str)] = &[
    ("base.html", include_str!("../ui/html/base.html")),
    ("partials/nav.html", include_str!("../ui/html/partials/nav.html")),
];

const PAGES: &[(&str, &str)] = &[
    (HOME_PAGE, include_str!("../ui/html/pages/home.html")),
    (VIEW_PAGE, include_str!("../ui/html/pages/view.html")),
    (CREATE_PAGE, include_str!("../ui/html/pages/create.html")),
    (SIGNUP_PAGE, include_str!("../ui/html/pages/signup.html")),
    (LOGIN_PAGE, include_str!("../ui/html/pages/login.html")),
];

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("the template {0} does not exist")]
    NotFound(String),

    #[error("template error: {0}")]
    Render(#[from] minijinja::Error),
}

/// Render `t` as e.g. "17 Mar 2024 at 10:15" (UTC)
pub fn human_date(t: DateTime<Utc>) -> String {
    t.format("%d %b %Y at %H:%M").to_string()
}

/// `human_date` for serialized timestamps; blank for anything else
fn human_date_filter(value: Option<String>) -> String {
    value
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|t| human_date(t.with_timezone(&Utc)))
        .unwrap_or_default()
}

/// Everything a page template may reference
#[derive(Debug, Default, Serialize)]
pub struct TemplateData {
    pub current_year: i32,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub csrf_token: String,
    pub snippet: Option<Snippet>,
    pub snippets: Vec<Snippet>,
    pub form: Option<Value>,
}

impl TemplateData {
    /// Attach a submitted form (values plus validation errors)
    pub fn with_form<F: Serialize>(mut self, form: &F) -> Self {
        self.form = Some(Value::from_serialize(form));
        self
    }
}

/// Parsed templates, shared by all requests
pub struct TemplateCache {
    env: Environment<'static>,
}

impl TemplateCache {
    pub fn new() -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        // pages render before any form has been submitted
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.add_filter("human_date", human_date_filter);

        for &(name, source) in LAYOUTS.iter().chain(PAGES) {
            env.add_template(name, source)?;
        }

        Ok(Self { env })
    }

    /// Render the page `name`
    pub fn render(&self, name: &str, data: &TemplateData) -> Result<String, TemplateError> {
        if !PAGES.iter().any(|(page, _)| *page == name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        let template = self.env.get_template(name)?;
        Ok(template.render(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snippet() -> Snippet {
        let created = Utc.with_ymd_and_hms(2024, 3, 17, 10, 15, 0).unwrap();
        Snippet {
            id: 1,
            title: "An old silent pond".to_string(),
            content: "An old silent pond...".to_string(),
            created,
            expires: created + chrono::Duration::days(365),
        }
    }

    #[test]
    fn test_human_date() {
        let t = Utc.with_ymd_and_hms(2024, 3, 17, 10, 15, 0).unwrap();
        assert_eq!(human_date(t), "17 Mar 2024 at 10:15");
    }

    #[test]
    fn test_human_date_filter_on_bad_input() {
        assert_eq!(human_date_filter(None), "");
        assert_eq!(human_date_filter(Some("yesterday".to_string())), "");
        assert_eq!(
            human_date_filter(Some("2024-03-17T10:15:00Z".to_string())),
            "17 Mar 2024 at 10:15"
        );
    }

    #[test]
    fn test_every_page_renders() {
        let cache = TemplateCache::new().unwrap();
        for (page, _) in PAGES {
            let html = cache.render(page, &TemplateData::default()).unwrap();
            assert!(html.contains("<html"), "{page} did not render the layout");
        }
    }

    #[test]
    fn test_unknown_page() {
        let cache = TemplateCache::new().unwrap();
        let err = cache.render("missing.html", &TemplateData::default()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(name) if name == "missing.html"));
    }

    #[test]
    fn test_view_page_escapes_and_formats() {
        let cache = TemplateCache::new().unwrap();
        let mut s = snippet();
        s.title = "<script>alert(1)</script>".to_string();
        let data = TemplateData {
            snippet: Some(s),
            ..Default::default()
        };

        let html = cache.render(VIEW_PAGE, &data).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("17 Mar 2024 at 10:15"));
    }

    #[test]
    fn test_nav_depends_on_authentication() {
        let cache = TemplateCache::new().unwrap();

        let html = cache.render(HOME_PAGE, &TemplateData::default()).unwrap();
        assert!(html.contains("/user/signup"));
        assert!(!html.contains("/user/logout"));

        let data = TemplateData {
            is_authenticated: true,
            csrf_token: "tok".to_string(),
            ..Default::default()
        };
        let html = cache.render(HOME_PAGE, &data).unwrap();
        assert!(html.contains("/user/logout"));
        assert!(html.contains("/snippet/create"));
        assert!(!html.contains("/user/signup"));
    }

    #[test]
    fn test_flash_is_shown() {
        let cache = TemplateCache::new().unwrap();
        let data = TemplateData {
            flash: Some("Snippet successfully created!".to_string()),
            ..Default::default()
        };
        let html = cache.render(HOME_PAGE, &data).unwrap();
        assert!(html.contains("Snippet successfully created!"));
    }
}
