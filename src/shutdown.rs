//! Cooperative shutdown flag raised by SIGINT/SIGTERM

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::constants::timing::SLEEP_SLICE_MILLIS;

#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag when the process receives SIGINT or SIGTERM
    #[cfg(unix)]
    pub fn install_signal_handlers(&self) -> Result<()> {
        use anyhow::Context;
        use signal_hook::consts::{SIGINT, SIGTERM};

        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&self.flag))
                .with_context(|| format!("Failed to register handler for signal {signal}"))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn install_signal_handlers(&self) -> Result<()> {
        tracing::warn!("Signal handling unavailable on this platform; Ctrl-C terminates immediately");
        Ok(())
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep in short slices, returning early once the flag is raised
    pub fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        let slice = Duration::from_millis(SLEEP_SLICE_MILLIS);
        while !self.is_requested() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(remaining.min(slice));
        }
    }
}
