//! Connectivity and visibility signal translation.
//!
//! Collapses platform online/offline and foreground/background transitions
//! into a single "attempt a drain now" signal. The monitor never polls
//! reachability itself: a stale online flag is tolerated and corrected by
//! the next failed attempt's retry cycle.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tracing::debug;

/// Observes connectivity transitions and raises the drain signal.
pub struct ConnectivityMonitor {
    online: AtomicBool,
    signal: Notify,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial connectivity state.
    pub fn new(initially_online: bool) -> Self {
        Self { online: AtomicBool::new(initially_online), signal: Notify::new() }
    }

    /// Current connectivity flag.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Record a platform online/offline transition. A transition to online
    /// raises the drain signal immediately. Returns true when the flag
    /// actually changed.
    pub fn set_online(&self, online: bool) -> bool {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if online == was_online {
            return false;
        }

        if online {
            debug!("Connectivity restored; requesting drain");
            self.signal.notify_one();
        } else {
            debug!("Connectivity lost");
        }
        true
    }

    /// Record a foreground-resume (visibility) transition. Raises the drain
    /// signal only while online, covering timers suspended in background.
    pub fn foreground_resumed(&self) {
        if self.is_online() {
            debug!("Foreground resume while online; requesting drain");
            self.signal.notify_one();
        }
    }

    /// Manually raise the drain signal.
    pub fn request_drain(&self) {
        self.signal.notify_one();
    }

    /// Wait for the next drain signal. Signals raised while nobody is
    /// waiting are coalesced into a single stored permit.
    pub(crate) async fn drain_signal(&self) {
        self.signal.notified().await;
    }
}
