//! Contact relay: turns contact-form submissions into a notification email.
//!
//! Stateless; every request is validated and forwarded independently.

mod mailer;

pub use mailer::{MailError, Mailer, Notification, ResendMailer};

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE,
};
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};

const ALLOW_METHODS: &str = "POST, OPTIONS";
const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub bind: String,
    pub api_key: String,
    pub api_url: String,
    pub from: String,
    pub to: String,
    pub allowed_origin: HeaderValue,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, RelayConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; `from_env` reads the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RelayConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(RelayConfigError::MissingEnv(key))
        };

        let api_key = required("RESEND_API_KEY")?;
        let to = required("CONTACT_RELAY_TO")?;
        let bind = lookup("CONTACT_RELAY_BIND").unwrap_or_else(|| "127.0.0.1:8787".into());
        let from = lookup("CONTACT_RELAY_FROM")
            .unwrap_or_else(|| "Portfolio Contact <onboarding@resend.dev>".into());
        let api_url =
            lookup("RESEND_API_URL").unwrap_or_else(|| "https://api.resend.com/emails".into());
        let allowed_origin = lookup("CONTACT_RELAY_ALLOWED_ORIGIN").unwrap_or_else(|| "*".into());
        let allowed_origin = HeaderValue::from_str(allowed_origin.trim())
            .map_err(|_| RelayConfigError::InvalidEnv("CONTACT_RELAY_ALLOWED_ORIGIN"))?;

        Ok(Self {
            bind,
            api_key,
            api_url,
            from,
            to,
            allowed_origin,
        })
    }
}

#[derive(Debug, PartialEq)]
pub enum RelayConfigError {
    MissingEnv(&'static str),
    InvalidEnv(&'static str),
}

impl std::fmt::Display for RelayConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnv(var) => write!(f, "missing required env var {var}"),
            Self::InvalidEnv(var) => write!(f, "invalid value for env var {var}"),
        }
    }
}

impl std::error::Error for RelayConfigError {}

/// A contact-form submission. Missing fields deserialize as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactRequest {
    fn is_complete(&self) -> bool {
        [&self.name, &self.email, &self.message]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    /// The email sent to the site owner.
    pub fn notification(&self, cfg: &RelayConfig) -> Notification {
        let name = escape_html(self.name.trim());
        let email = escape_html(self.email.trim());
        let message = escape_html(self.message.trim()).replace('\n', "<br>");
        let html = format!(
            "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
             <h1>New Contact Form Submission</h1>\
             <p><strong>Name:</strong> {name}</p>\
             <p><strong>Email:</strong> <a href=\"mailto:{email}\">{email}</a></p>\
             <p><strong>Message:</strong></p>\
             <p style=\"line-height: 1.6;\">{message}</p>\
             </div>"
        );
        let subject_name: String = self
            .name
            .trim()
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();

        Notification {
            from: cfg.from.clone(),
            to: vec![cfg.to.clone()],
            subject: format!("New Message from {subject_name}"),
            html,
        }
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
    message: &'static str,
}

#[derive(Debug)]
enum RelayError {
    BadRequest(&'static str),
    NotFound,
    Delivery(MailError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            Self::Delivery(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to send email: {err}"),
            ),
        };

        let body = serde_json::json!({ "error": msg });
        (status, axum::Json(body)).into_response()
    }
}

struct AppState<M> {
    cfg: RelayConfig,
    mailer: M,
}

pub fn app<M: Mailer + 'static>(cfg: RelayConfig, mailer: M) -> Router {
    let state = Arc::new(AppState { cfg, mailer });

    Router::new()
        .route("/", post(submit::<M>).options(preflight::<M>))
        .route("/send-contact-email", post(submit::<M>).options(preflight::<M>))
        .fallback(fallback::<M>)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            cors_middleware::<M>,
        ))
        .with_state(state)
}

async fn cors_middleware<M: Mailer>(
    State(state): State<Arc<AppState<M>>>,
    req: Request<Body>,
    next: axum::middleware::Next,
) -> Response {
    let mut resp = next.run(req).await;
    resp.headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, state.cfg.allowed_origin.clone());
    resp
}

async fn preflight<M: Mailer>(State(state): State<Arc<AppState<M>>>) -> Response {
    let mut resp = StatusCode::NO_CONTENT.into_response();
    let headers = resp.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, state.cfg.allowed_origin.clone());
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    resp
}

/// Preflight succeeds on any path; everything else unrouted is a 404.
async fn fallback<M: Mailer>(state: State<Arc<AppState<M>>>, method: Method) -> Response {
    if method == Method::OPTIONS {
        preflight(state).await
    } else {
        RelayError::NotFound.into_response()
    }
}

async fn submit<M: Mailer>(
    State(state): State<Arc<AppState<M>>>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let req: ContactRequest = serde_json::from_slice(&body).map_err(|err| {
        tracing::warn!(%err, "contact submission is not valid JSON");
        RelayError::BadRequest("Invalid JSON body")
    })?;

    if !req.is_complete() {
        tracing::warn!("contact submission missing required fields");
        return Err(RelayError::BadRequest("All fields are required"));
    }

    let preview: String = req.message.chars().take(50).collect();
    tracing::info!(name = %req.name, email = %req.email, %preview, "contact submission received");

    let notification = req.notification(&state.cfg);
    if let Err(err) = state.mailer.send(&notification).await {
        tracing::error!(%err, "failed to send notification email");
        return Err(RelayError::Delivery(err));
    }

    tracing::info!(to = %state.cfg.to, "notification email sent");
    Ok(axum::Json(SuccessResponse {
        success: true,
        message: "Message sent successfully!",
    })
    .into_response())
}
