//! Classified downstream failures.

use std::fmt;

use axum::http::StatusCode;
use serde::Serialize;

use crate::routing::RouteDefinition;

/// Kind of downstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    NotFound,
    InvalidArgument,
    Unavailable,
    Timeout,
    Internal,
}

impl FaultKind {
    /// Client-facing status for this kind.
    pub fn status(&self) -> StatusCode {
        match self {
            FaultKind::NotFound => StatusCode::NOT_FOUND,
            FaultKind::InvalidArgument => StatusCode::BAD_REQUEST,
            FaultKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            FaultKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            FaultKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code used in client bodies.
    pub fn code(&self) -> &'static str {
        match self {
            FaultKind::NotFound => "NOT_FOUND",
            FaultKind::InvalidArgument => "BAD_REQUEST",
            FaultKind::Unavailable => "SERVICE_UNAVAILABLE",
            FaultKind::Timeout => "GATEWAY_TIMEOUT",
            FaultKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// Generic client message. Downstream detail is never sent to clients.
    pub fn client_message(&self) -> &'static str {
        match self {
            FaultKind::NotFound => "The requested resource was not found",
            FaultKind::InvalidArgument => "The request was rejected as invalid",
            FaultKind::Unavailable => "The downstream service is unavailable",
            FaultKind::Timeout => "The downstream service did not respond in time",
            FaultKind::Internal => "Internal error",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::NotFound => "not_found",
            FaultKind::InvalidArgument => "invalid_argument",
            FaultKind::Unavailable => "unavailable",
            FaultKind::Timeout => "timeout",
            FaultKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A downstream failure with operator-facing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: Option<String>,
    /// Route that produced the fault. Filled in by the dispatcher.
    pub route: String,
    /// Downstream target of that route. Filled in by the dispatcher.
    pub target: String,
}

impl Fault {
    pub fn new(kind: FaultKind) -> Self {
        Self {
            kind,
            message: None,
            route: String::new(),
            target: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FaultKind::NotFound).with_message(message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(FaultKind::InvalidArgument).with_message(message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Unavailable).with_message(message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Timeout).with_message(message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Internal).with_message(message)
    }

    /// Attach the route name and downstream target.
    pub fn with_route(mut self, route: &RouteDefinition) -> Self {
        self.route = route.name.clone();
        self.target = route.target.to_string();
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fault", self.kind)?;
        if !self.route.is_empty() {
            write!(f, " on route '{}' ({})", self.route, self.target)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {}
