//! Reconciliation loop
//!
//! Each cycle re-reads the whole board, diffs it against the target image and
//! places at most one pixel. The account's cooldown is the only throttle: a
//! too-early answer turns into a sleep until the next timer fires.

pub mod clock;
pub mod diff;

use chrono::{DateTime, Local, Utc};
use rand::Rng;
use std::time::Duration;
use tracing::{Span, error, info, warn};

use crate::api::{ApiClient, PlacementOutcome, Transport};
use crate::color_policy::ColorPolicy;
use crate::constants::engine::MAX_BOARD_RETRIES;
use crate::constants::timing;
use crate::error::{KeeperError, KeeperResult};
use crate::shutdown::Shutdown;
use crate::types::ColorGrid;

pub use clock::{Clock, SystemClock};
pub use diff::{Correction, Origin, TieBreak};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub origin: Origin,
    /// Sleep after a soft error or a missing board
    pub check_interval: Duration,
    pub tie_break: TieBreak,
}

/// What a single cycle ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    BoardMissing { failures: u32 },
    Complete,
    Placed(Correction),
    TooEarly { waited: Duration },
    PlacementFailed,
}

pub struct Monitor<T, C, R> {
    api: ApiClient<T>,
    policy: ColorPolicy,
    target: ColorGrid,
    settings: MonitorSettings,
    clock: C,
    rng: R,
    shutdown: Shutdown,
    board_failures: u32,
    span: Span,
}

impl<T: Transport, C: Clock, R: Rng> Monitor<T, C, R> {
    pub fn new(
        api: ApiClient<T>,
        policy: ColorPolicy,
        target: ColorGrid,
        settings: MonitorSettings,
        clock: C,
        rng: R,
        shutdown: Shutdown,
        span: Span,
    ) -> Self {
        Self {
            api,
            policy,
            target,
            settings,
            clock,
            rng,
            shutdown,
            board_failures: 0,
            span,
        }
    }

    /// Loop until shutdown is requested or a fatal error occurs
    pub fn run(&mut self) -> KeeperResult<()> {
        let _guard = self.span.clone().entered();
        info!(
            origin_x = self.settings.origin.x,
            origin_y = self.settings.origin.y,
            width = self.target.width(),
            height = self.target.height(),
            "Starting maintenance"
        );

        while !self.shutdown.is_requested() {
            match self.run_cycle() {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Fatal error in monitor loop");
                    return Err(e);
                }
                Err(e) => {
                    error!(error = %e, "Error in monitor loop");
                    self.clock.sleep(self.settings.check_interval);
                }
            }
        }

        info!("Stop requested, leaving monitor loop");
        Ok(())
    }

    /// Fetch, diff and place at most one pixel
    pub fn run_cycle(&mut self) -> KeeperResult<CycleOutcome> {
        let Some(board) = self.api.get_board()? else {
            return self.board_fetch_failed();
        };
        self.board_failures = 0;

        let origin = self.settings.origin;
        let stats = diff::image_stats(&board.grid, &self.target, origin, &self.policy);
        info!(
            correct = stats.correct,
            total = stats.total,
            completion = stats.completion,
            to_fix = stats.incorrect,
            "Image stats: {}/{} correct pixels ({:.2}% completed), {} pixels to fix",
            stats.correct,
            stats.total,
            stats.completion,
            stats.incorrect
        );

        let mut corrections = diff::find_corrections(&board.grid, &self.target, origin, &self.policy);
        diff::order_corrections(&mut corrections, self.settings.tie_break, &mut self.rng);

        let Some(&next) = corrections.first() else {
            info!(idle_secs = timing::IDLE_SECS, "Image correct, checking again later");
            self.clock.sleep(Duration::from_secs(timing::IDLE_SECS));
            return Ok(CycleOutcome::Complete);
        };
        self.place(next)
    }

    fn board_fetch_failed(&mut self) -> KeeperResult<CycleOutcome> {
        self.board_failures += 1;
        if self.board_failures > MAX_BOARD_RETRIES {
            return Err(KeeperError::BoardUnavailable {
                attempts: self.board_failures,
            });
        }
        warn!(failures = self.board_failures, max = MAX_BOARD_RETRIES, "Board unavailable, retrying");
        self.clock.sleep(self.settings.check_interval);
        Ok(CycleOutcome::BoardMissing {
            failures: self.board_failures,
        })
    }

    fn place(&mut self, correction: Correction) -> KeeperResult<CycleOutcome> {
        let Correction { x, y, current, target, priority } = correction;
        match self.api.place_pixel(x, y, target)? {
            PlacementOutcome::Placed => {
                info!(x, y, current, color = target, priority, "Pixel successfully placed at ({x}, {y})");
                Ok(CycleOutcome::Placed(correction))
            }
            PlacementOutcome::Rotated { rotations } => {
                info!(x, y, current, color = target, priority, rotations, "Pixel placed at ({x}, {y}) after token rotation");
                Ok(CycleOutcome::Placed(correction))
            }
            PlacementOutcome::TooEarly { timers } => {
                let waited = self.cooldown_wait(&timers)?;
                self.clock.sleep(waited);
                Ok(CycleOutcome::TooEarly { waited })
            }
            PlacementOutcome::Failed(e) => {
                error!(x, y, color = target, error = %e, "Error placing pixel");
                self.clock.sleep(Duration::from_secs(timing::PLACEMENT_BACKOFF_SECS));
                Ok(CycleOutcome::PlacementFailed)
            }
        }
    }

    /// Time until the nearest cooldown timer plus margin, or the fallback
    ///
    /// Timers from the too-early body win; otherwise the profile is consulted.
    fn cooldown_wait(&mut self, timers: &[DateTime<Utc>]) -> KeeperResult<Duration> {
        let next = match timers.iter().min() {
            Some(&next) => Some(next),
            None => self.api.get_profile()?.and_then(|profile| profile.next_timer()),
        };

        let now = self.clock.now();
        match next.and_then(|next| (next - now).to_std().ok().map(|wait| (next, wait))) {
            Some((next, wait)) if !wait.is_zero() => {
                info!(
                    wait_secs = wait.as_secs_f64(),
                    "Next pixel available in {:.1} seconds | {}",
                    wait.as_secs_f64(),
                    next.with_timezone(&Local).format("%H:%M:%S")
                );
                Ok(wait + Duration::from_secs(timing::TOO_EARLY_MARGIN_SECS))
            }
            _ => {
                warn!(fallback_secs = timing::TOO_EARLY_FALLBACK_SECS, "No pending cooldown timer, using fallback wait");
                Ok(Duration::from_secs(timing::TOO_EARLY_FALLBACK_SECS))
            }
        }
    }
}
