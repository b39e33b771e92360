//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Remote board API constants
pub mod api {
    /// Default board service
    pub const DEFAULT_BASE_URL: &str = "https://ftplace.42lwatch.ch";

    /// Profile endpoint (cooldown timers, pixel buffer, identity)
    pub const PROFILE: &str = "/api/profile";

    /// Board endpoint, queried with `type=board`
    pub const BOARD: &str = "/api/get";

    /// Single pixel placement endpoint
    pub const SET_PIXEL: &str = "/api/set";

    /// Access token cookie name
    pub const TOKEN_COOKIE: &str = "token";

    /// Refresh token cookie name
    pub const REFRESH_COOKIE: &str = "refresh";

    /// Upper bound on token rotations for one logical call
    pub const MAX_TOKEN_ROTATIONS: u32 = 3;
}

/// HTTP status codes with special meaning for the board service
pub mod status {
    /// Cooldown has not elapsed yet
    pub const TOO_EARLY: u16 = 425;

    /// Access token expired; rotated tokens arrive via Set-Cookie
    pub const TOKEN_EXPIRED: u16 = 426;

    /// Statuses accepted as a successful request
    pub const SUCCESS: [u16; 3] = [200, 201, 204];

    /// Server-side statuses retried by the transport
    pub const RETRYABLE: [u16; 4] = [500, 502, 503, 504];

    pub fn is_success(status: u16) -> bool {
        SUCCESS.contains(&status)
    }
}

/// Reconciliation loop timing (seconds)
pub mod timing {
    /// Sleep when the image is fully correct
    pub const IDLE_SECS: u64 = 5;

    /// Added on top of the cooldown before retrying a placement
    pub const TOO_EARLY_MARGIN_SECS: u64 = 1;

    /// Sleep when no usable cooldown timer is known
    pub const TOO_EARLY_FALLBACK_SECS: u64 = 5;

    /// Sleep after an isolated placement failure
    pub const PLACEMENT_BACKOFF_SECS: u64 = 5;

    /// Base delay for transport retries, doubled per attempt
    pub const RETRY_BACKOFF_FACTOR_SECS: f64 = 0.5;

    /// Granularity of interruptible sleeps
    pub const SLEEP_SLICE_MILLIS: u64 = 200;
}

/// Reconciliation policy constants
pub mod engine {
    /// Priority assigned to colors without a configured tier
    pub const DEFAULT_PRIORITY: u32 = 999;

    /// Consecutive board fetch failures tolerated before giving up
    pub const MAX_BOARD_RETRIES: u32 = 3;
}

/// Configuration file constants
pub mod config {
    /// Directory under the user's config dir
    pub const APP_DIR: &str = "place-keeper";

    /// Config filename
    pub const FILENAME: &str = "config.toml";
}

/// Configuration value validation ranges
pub mod validation {
    /// Maximum transport retry attempts
    pub const MAX_RETRY_ATTEMPTS: u32 = 10;

    /// Minimum check interval in seconds
    pub const MIN_CHECK_INTERVAL: f64 = 0.1;

    /// Maximum check interval in seconds
    pub const MAX_CHECK_INTERVAL: f64 = 3600.0;

    /// Minimum request timeout in seconds
    pub const MIN_REQUEST_TIMEOUT: u64 = 1;

    /// Maximum request timeout in seconds
    pub const MAX_REQUEST_TIMEOUT: u64 = 300;
}
