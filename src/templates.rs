use chrono::{DateTime, Datelike, Utc};
use minijinja::{Environment, ErrorKind, UndefinedBehavior, Value};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{Snippet, User};
use crate::security::csrf;
use crate::session::{FLASH, Session, SessionError};

const BASE: (&str, &str) = ("base.html", include_str!("../ui/html/base.html"));
const PARTIALS: &[(&str, &str)] = &[
    ("partials/nav.html", include_str!("../ui/html/partials/nav.html")),
    (
        "partials/csrf_input.html",
        include_str!("../ui/html/partials/csrf_input.html"),
    ),
];
const PAGES: &[(&str, &str)] = &[
    ("home.html", include_str!("../ui/html/pages/home.html")),
    ("view.html", include_str!("../ui/html/pages/view.html")),
    ("create.html", include_str!("../ui/html/pages/create.html")),
    ("signup.html", include_str!("../ui/html/pages/signup.html")),
    ("login.html", include_str!("../ui/html/pages/login.html")),
    ("account.html", include_str!("../ui/html/pages/account.html")),
    ("password.html", include_str!("../ui/html/pages/password.html")),
    ("about.html", include_str!("../ui/html/pages/about.html")),
];

/// Dynamic data handed to every page.
#[derive(Debug, Default, Serialize)]
pub struct TemplateData {
    pub current_year: i32,
    pub csrf_token: String,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub snippet: Option<Snippet>,
    pub snippets: Vec<Snippet>,
    pub user: Option<User>,
    pub form: Option<Value>,
}

impl TemplateData {
    /// Consumes any pending flash message from the session.
    pub async fn new(session: &Session, is_authenticated: bool) -> Result<Self, SessionError> {
        Ok(Self {
            current_year: Utc::now().year(),
            csrf_token: csrf::session_token(session).await?,
            flash: session.pop_string(FLASH).await?,
            is_authenticated,
            ..Self::default()
        })
    }

    pub fn with_form<F: Serialize>(mut self, form: &F) -> Self {
        self.form = Some(Value::from_serialize(form));
        self
    }
}

/// Formats an RFC 3339 timestamp as `17 Mar 2025 at 10:15:21` in UTC.
/// Anything unparsable renders as an empty string.
pub fn human_date(value: &str) -> String {
    DateTime::parse_from_rfc3339(value)
        .map(|t| {
            t.with_timezone(&Utc)
                .format("%d %b %Y at %H:%M:%S")
                .to_string()
        })
        .unwrap_or_default()
}

/// Undefined values are errors; templates test optional keys with
/// `is defined`.
fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_filter("human_date", |value: String| human_date(&value));
    env
}

/// Every page template, parsed once at start-up.
#[derive(Debug)]
pub struct TemplateCache {
    env: Environment<'static>,
}

impl TemplateCache {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = environment();

        env.add_template(BASE.0, BASE.1)?;
        for &(name, source) in PARTIALS.iter().chain(PAGES) {
            env.add_template(name, source)?;
        }

        tracing::debug!(pages = PAGES.len(), "Template cache built");
        Ok(Self { env })
    }

    /// Renders `page` completely into memory; nothing is written to the
    /// response until this succeeds.
    pub fn render<S: Serialize>(&self, page: &str, data: &S) -> Result<String, AppError> {
        let template = self.env.get_template(page).map_err(|err| match err.kind() {
            ErrorKind::TemplateNotFound => AppError::TemplateNotFound(page.to_string()),
            _ => AppError::Template {
                page: page.to_string(),
                source: err,
            },
        })?;

        template.render(data).map_err(|source| AppError::Template {
            page: page.to_string(),
            source,
        })
    }
}
