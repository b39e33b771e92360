//! Wire models for the board service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::error::{KeeperError, KeeperResult};
use crate::types::{ColorGrid, ColorId, Grid, PaletteEntry};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// ISO-8601 UTC timestamps at which placement slots free up
    pub timers: Vec<String>,
    pub pixel_buffer: u32,
    pub pixel_timer: u32,
    pub id: u64,
    pub username: String,
    #[serde(rename = "soft_is_admin")]
    pub is_admin: bool,
    #[serde(rename = "soft_is_banned")]
    pub is_banned: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Profile {
    /// Earliest parseable cooldown timer
    pub fn next_timer(&self) -> Option<DateTime<Utc>> {
        parse_timers(&self.timers).into_iter().min()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileResponse {
    #[serde(rename = "userInfos", default)]
    pub user_infos: Profile,
}

/// Body of a too-early response; the timers are optional
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TooEarlyBody {
    #[serde(default)]
    pub timers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BoardCell {
    color_id: ColorId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BoardResponse {
    board: Option<Vec<Vec<BoardCell>>>,
    #[serde(default)]
    colors: Vec<PaletteEntry>,
}

/// Live board colors plus the palette they refer to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    /// Outer array of the wire format is x, inner is y
    pub grid: ColorGrid,
    pub palette: Vec<PaletteEntry>,
}

impl TryFrom<BoardResponse> for BoardSnapshot {
    type Error = KeeperError;

    fn try_from(response: BoardResponse) -> KeeperResult<Self> {
        let columns = response
            .board
            .ok_or_else(|| KeeperError::board_shape("missing 'board' field"))?;
        let columns = columns
            .into_iter()
            .map(|column| column.into_iter().map(|cell| cell.color_id).collect())
            .collect();
        let grid = Grid::from_columns(columns)
            .ok_or_else(|| KeeperError::board_shape("board rows have differing lengths"))?;
        if grid.width() == 0 || grid.height() == 0 {
            return Err(KeeperError::board_shape("board is empty"));
        }
        Ok(Self {
            grid,
            palette: response.colors,
        })
    }
}

/// Parse RFC 3339 timers, skipping (and logging) malformed entries
pub fn parse_timers<S: AsRef<str>>(timers: &[S]) -> Vec<DateTime<Utc>> {
    timers
        .iter()
        .filter_map(|raw| {
            DateTime::parse_from_rfc3339(raw.as_ref())
                .map(|t| t.with_timezone(&Utc))
                .inspect_err(|e| warn!(timer = %raw.as_ref(), error = %e, "Ignoring malformed timer"))
                .ok()
        })
        .collect()
}
