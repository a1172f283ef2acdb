//! Trusted-identity check for the control surface.
//!
//! The policy only answers "is this credential the administrative principal";
//! extracting the credential from a request lives here too so the HTTP layers
//! share one definition of "missing" (401) versus "untrusted" (403).

use axum::http::{header, HeaderMap};
use std::sync::Arc;

/// Decides whether a presented credential belongs to the administrative principal.
pub trait PrivilegePolicy: Send + Sync {
    fn is_privileged(&self, credential: &str) -> bool;
}

impl<F> PrivilegePolicy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_privileged(&self, credential: &str) -> bool {
        self(credential)
    }
}

/// Shared, swappable policy handle.
pub type SharedPolicy = Arc<dyn PrivilegePolicy>;

/// Accepts exactly one configured bearer token.
#[derive(Debug, Clone)]
pub struct StaticTokenPolicy {
    token: String,
}

impl StaticTokenPolicy {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl PrivilegePolicy for StaticTokenPolicy {
    fn is_privileged(&self, credential: &str) -> bool {
        !self.token.is_empty() && credential == self.token
    }
}

/// What a caller presented in its `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    /// No `Authorization` header.
    Missing,
    Bearer(&'a str),
    /// A header is present but carries no usable bearer token.
    Unusable,
}

impl<'a> Credential<'a> {
    pub fn from_headers(headers: &'a HeaderMap) -> Self {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return Credential::Missing;
        };
        value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map_or(Credential::Unusable, Credential::Bearer)
    }
}
