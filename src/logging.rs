use std::fmt;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use crate::errors::ServerFault;
use crate::state::AppState;

/// Sanitized wrapper for email addresses that masks the local part
#[derive(Debug, Clone)]
pub struct SanitizedEmail(String);

impl SanitizedEmail {
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        Self(Self::sanitize(&email))
    }

    fn sanitize(email: &str) -> String {
        if let Some((local, domain)) = email.split_once('@') {
            let mut chars = local.chars();
            let masked_local = match (chars.next(), local.chars().count()) {
                (Some(first), len) if len > 2 => format!("{first}***"),
                (_, len) => "*".repeat(len),
            };
            format!("{}@{}", masked_local, domain)
        } else {
            // Invalid email format, mask entirely
            "***@***".to_string()
        }
    }
}

impl fmt::Display for SanitizedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sanitized wrapper for IP addresses that masks the last octet
#[derive(Debug, Clone)]
pub struct SanitizedIpAddr(String);

impl SanitizedIpAddr {
    pub fn new(ip: impl fmt::Display) -> Self {
        Self(Self::sanitize(&ip.to_string()))
    }

    fn sanitize(ip: &str) -> String {
        if ip.contains(':') {
            // IPv6: mask the last segment
            match ip.rfind(':') {
                Some(last_colon) => format!("{}:****", &ip[..last_colon]),
                None => "***".to_string(),
            }
        } else if let Some(last_dot) = ip.rfind('.') {
            format!("{}.***", &ip[..last_dot])
        } else {
            "***".to_string()
        }
    }
}

impl fmt::Display for SanitizedIpAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Security event types for structured logging
#[derive(Debug, Clone, Copy)]
pub enum SecurityEvent {
    LoginSuccess,
    LoginFailure,
    SignupSuccess,
    SignupFailure,
    Logout,
    PasswordChanged,
    PasswordChangeFailure,
    UnauthenticatedAccess,
    CsrfRejected,
}

impl SecurityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEvent::LoginSuccess => "login_success",
            SecurityEvent::LoginFailure => "login_failure",
            SecurityEvent::SignupSuccess => "signup_success",
            SecurityEvent::SignupFailure => "signup_failure",
            SecurityEvent::Logout => "logout",
            SecurityEvent::PasswordChanged => "password_changed",
            SecurityEvent::PasswordChangeFailure => "password_change_failure",
            SecurityEvent::UnauthenticatedAccess => "unauthenticated_access",
            SecurityEvent::CsrfRejected => "csrf_rejected",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            SecurityEvent::LoginFailure
                | SecurityEvent::SignupFailure
                | SecurityEvent::PasswordChangeFailure
                | SecurityEvent::CsrfRejected
        )
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Log a security event with sanitized context
#[macro_export]
macro_rules! log_security_event {
    ($event:expr, $($field:tt)*) => {
        if $event.is_critical() {
            tracing::warn!(
                security_event = %$event,
                event_type = "security",
                $($field)*
            );
        } else {
            tracing::info!(
                security_event = %$event,
                event_type = "security",
                $($field)*
            );
        }
    };
}

/// Opens a span per request and records server faults with their request
/// context. In debug mode the fault replaces the generic 500 body.
pub async fn log_request(
    State(app): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let span = tracing::info_span!("request", method = %method, uri = %uri);

    async move {
        let ip = connect_info
            .map(|ConnectInfo(addr)| SanitizedIpAddr::new(addr.ip()).to_string())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::info!(ip = %ip, proto = ?request.version(), "Received request");

        let mut response = next.run(request).await;

        if let Some(fault) = response.extensions_mut().remove::<ServerFault>() {
            tracing::error!(
                method = %method,
                uri = %uri,
                error = %fault.message,
                trace = %fault.trace,
                "Server error"
            );

            if app.debug {
                response.headers_mut().remove(CONTENT_LENGTH);
                *response.body_mut() = Body::from(format!("{}\n\n{}", fault.message, fault.trace));
            }
        }

        response
    }
    .instrument(span)
    .await
}
