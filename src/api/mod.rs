//! Authenticated client for the board service
//!
//! Owns the session credentials and the transport. Token-expired responses are
//! handled here: rotated tokens are read from `Set-Cookie`, applied to both the
//! session and the transport's cookie jar, and the original request is replayed.

pub mod models;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod fake;

use chrono::{DateTime, Utc};
use tracing::{Span, debug, error, info, warn};

use crate::constants::api::{
    BOARD, MAX_TOKEN_ROTATIONS, PROFILE, REFRESH_COOKIE, SET_PIXEL, TOKEN_COOKIE,
};
use crate::constants::status;
use crate::error::{KeeperError, KeeperResult, RequestError};
use crate::types::ColorId;

pub use models::{BoardSnapshot, Profile, parse_timers};
pub use session::Session;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, RetryPolicy, Transport};

use models::{BoardResponse, ProfileResponse, TooEarlyBody};
use session::extract_rotated_tokens;

/// Result of a single placement request
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    Placed,
    /// Placed after the token was rotated and the request replayed
    Rotated { rotations: u32 },
    /// Cooldown still running; timers come from the response body when present
    TooEarly { timers: Vec<DateTime<Utc>> },
    Failed(RequestError),
}

pub struct ApiClient<T> {
    transport: T,
    session: Session,
    base_url: String,
    span: Span,
}

impl<T: Transport> ApiClient<T> {
    /// Attach the session's tokens to the transport as cookies
    pub fn new(mut transport: T, session: Session, base_url: &str, span: Span) -> Self {
        transport.set_cookie(TOKEN_COOKIE, session.access());
        transport.set_cookie(REFRESH_COOKIE, session.refresh());
        Self {
            transport,
            session,
            base_url: base_url.trim_end_matches('/').to_string(),
            span,
        }
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, rotating tokens and replaying on token expiry
    ///
    /// Returns the final response and how many rotations it took. Transport
    /// failures surface as `KeeperError::Request`; rotation failures as
    /// `KeeperError::Authentication`.
    fn execute(&mut self, request: &HttpRequest) -> KeeperResult<(HttpResponse, u32)> {
        let mut rotations = 0;
        loop {
            let response = self.transport.send(request)?;
            if response.status != status::TOKEN_EXPIRED {
                return Ok((response, rotations));
            }
            if rotations >= MAX_TOKEN_ROTATIONS {
                return Err(KeeperError::authentication(format!(
                    "token still expired after {rotations} rotations"
                )));
            }
            self.rotate_from(&response)?;
            rotations += 1;
            info!(url = %request.url, rotation = rotations, "Access token rotated, replaying request");
        }
    }

    fn rotate_from(&mut self, response: &HttpResponse) -> KeeperResult<()> {
        let tokens = extract_rotated_tokens(&response.cookies).ok_or_else(|| {
            KeeperError::authentication("token expired and no new token in response cookies")
        })?;
        self.session.rotate(&tokens);
        self.transport.set_cookie(TOKEN_COOKIE, self.session.access());
        self.transport.set_cookie(REFRESH_COOKIE, self.session.refresh());
        Ok(())
    }

    /// Soft-fails to `None` on anything but an authentication failure
    fn fetch_json<R: serde::de::DeserializeOwned>(
        &mut self,
        request: &HttpRequest,
        what: &str,
    ) -> KeeperResult<Option<R>> {
        let response = match self.execute(request) {
            Ok((response, _)) => response,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(error = %e, "Failed to get {what}");
                return Ok(None);
            }
        };
        if !response.is_success() {
            error!(error = %response.status_error(), "Failed to get {what}");
            return Ok(None);
        }
        match response.json() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                error!(error = %e, "Failed to parse {what}");
                Ok(None)
            }
        }
    }

    pub fn get_profile(&mut self) -> KeeperResult<Option<Profile>> {
        let _guard = self.span.clone().entered();
        let request = HttpRequest::get(self.url(PROFILE), &[]);
        let profile = self
            .fetch_json::<ProfileResponse>(&request, "profile")?
            .map(|response| response.user_infos);
        if let Some(profile) = &profile {
            debug!(username = %profile.username, pixel_buffer = profile.pixel_buffer, timers = profile.timers.len(), "Fetched profile");
        }
        Ok(profile)
    }

    pub fn get_board(&mut self) -> KeeperResult<Option<BoardSnapshot>> {
        let _guard = self.span.clone().entered();
        let request = HttpRequest::get(self.url(BOARD), &[("type", "board")]);
        let Some(response) = self.fetch_json::<BoardResponse>(&request, "board")? else {
            return Ok(None);
        };
        match BoardSnapshot::try_from(response) {
            Ok(snapshot) => {
                debug!(width = snapshot.grid.width(), height = snapshot.grid.height(), "Fetched board");
                Ok(Some(snapshot))
            }
            Err(e) => {
                error!(error = %e, "Board response has unexpected shape");
                Ok(None)
            }
        }
    }

    pub fn place_pixel(&mut self, x: u32, y: u32, color: ColorId) -> KeeperResult<PlacementOutcome> {
        let _guard = self.span.clone().entered();
        let request = HttpRequest::post(
            self.url(SET_PIXEL),
            serde_json::json!({ "x": x, "y": y, "color": color }),
        );
        let (response, rotations) = match self.execute(&request) {
            Ok(result) => result,
            Err(KeeperError::Request(e)) => {
                warn!(x, y, color, error = %e, "Placement request failed");
                return Ok(PlacementOutcome::Failed(e));
            }
            Err(e) => return Err(e),
        };

        if response.status == status::TOO_EARLY {
            let body: TooEarlyBody = response.json().unwrap_or_default();
            return Ok(PlacementOutcome::TooEarly {
                timers: parse_timers(&body.timers),
            });
        }
        if !response.is_success() {
            return Ok(PlacementOutcome::Failed(response.status_error()));
        }
        if rotations > 0 {
            Ok(PlacementOutcome::Rotated { rotations })
        } else {
            Ok(PlacementOutcome::Placed)
        }
    }
}
