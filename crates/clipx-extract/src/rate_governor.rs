//! Per-post request quota for the authenticated upstream.
//!
//! Each subject gets a window that opens on its first call and closes
//! `window` later. Inside a window at most `max_per_window` calls are allowed;
//! the first call after the deadline opens a fresh window.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct RateWindow {
    count: u32,
    reset_at: Instant,
}

/// Window counter keyed by subject (post id).
pub struct RateGovernor {
    windows: Mutex<HashMap<String, RateWindow>>,
    window: Duration,
    max_per_window: u32,
}

impl RateGovernor {
    pub fn new(window: Duration, max_per_window: u32) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
            max_per_window,
        }
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count a call for `subject` and report whether it may proceed.
    pub async fn allow(&self, subject: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if let Some(window) = windows.get_mut(subject) {
            if now <= window.reset_at {
                if window.count < self.max_per_window {
                    window.count += 1;
                    return true;
                }
                debug!(subject = %subject, count = window.count, "Rate window exhausted");
                return false;
            }
        }

        windows.insert(
            subject.to_string(),
            RateWindow {
                count: 1,
                reset_at: now + self.window,
            },
        );
        true
    }
}
