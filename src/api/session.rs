//! Session credentials and rotated-token extraction

use std::fmt;

use crate::constants::api::{REFRESH_COOKIE, TOKEN_COOKIE};

/// Access/refresh token pair, owned by the API client
///
/// `rotate` is the only way to change the tokens after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    access: String,
    refresh: String,
}

impl Session {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    pub fn access(&self) -> &str {
        &self.access
    }

    pub fn refresh(&self) -> &str {
        &self.refresh
    }

    pub(crate) fn rotate(&mut self, tokens: &RotatedTokens) {
        self.access = tokens.access.clone();
        if let Some(refresh) = &tokens.refresh {
            self.refresh = refresh.clone();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access", &redact(&self.access))
            .field("refresh", &redact(&self.refresh))
            .finish()
    }
}

fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}…({} chars)", token.chars().count())
}

/// Tokens delivered with a token-expired response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedTokens {
    pub access: String,
    /// Absent when the server only rotated the access token
    pub refresh: Option<String>,
}

/// Find rotated tokens among response cookies; the access token is required
pub fn extract_rotated_tokens(cookies: &[(String, String)]) -> Option<RotatedTokens> {
    let mut access = None;
    let mut refresh = None;
    for (name, value) in cookies {
        if value.is_empty() {
            continue;
        }
        match name.as_str() {
            TOKEN_COOKIE => access = Some(value.clone()),
            REFRESH_COOKIE => refresh = Some(value.clone()),
            _ => {}
        }
    }
    access.map(|access| RotatedTokens { access, refresh })
}
