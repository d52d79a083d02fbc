//! Navigation back to the login entry point.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Sends the user back to the unauthenticated entry point.
///
/// Invoked after logout and whenever the server rejects the session with 401.
pub trait Navigator: Send + Sync {
    /// Go to the login view.
    fn to_login(&self);
}

/// A navigator that only counts how often it was asked to show the login view.
///
/// Useful for embedders that poll for "login required" instead of reacting
/// immediately.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: AtomicUsize,
}

impl RecordingNavigator {
    /// Create a navigator with no recorded visits.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `to_login` has been called.
    pub fn visits(&self) -> usize {
        self.visits.load(Ordering::SeqCst)
    }

    /// Whether `to_login` has been called at least once.
    pub fn login_requested(&self) -> bool {
        self.visits() > 0
    }
}

impl Navigator for RecordingNavigator {
    fn to_login(&self) {
        self.visits.fetch_add(1, Ordering::SeqCst);
    }
}
