use crate::handlers::session::{SessionManager, SessionState};
use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Background check that ends sessions whose token has expired and warns
/// shortly before that happens.
pub struct SessionExpiryWatcher {
    /// How often the held token is re-checked
    check_interval: Duration,
    /// Warn once when the session expires within this many seconds
    warning_threshold: i64,
}

impl SessionExpiryWatcher {
    pub fn new(check_interval: Duration, warning_threshold_seconds: u64) -> Self {
        SessionExpiryWatcher {
            check_interval,
            warning_threshold: warning_threshold_seconds as i64,
        }
    }

    /// Runs until the returned handle is aborted.
    pub fn spawn(self, session: Arc<SessionManager>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.check_interval);
            let mut warned_for = None;

            loop {
                ticker.tick().await;

                let expires_at = match session.current() {
                    SessionState::Authenticated(current) => current.expires_at(),
                    _ => continue,
                };

                if !session.revalidate() {
                    info!("Session expired; signed out");
                    warned_for = None;
                    continue;
                }

                if let Some(expires_at) = expires_at {
                    let remaining = (expires_at - Utc::now()).num_seconds();
                    if remaining < self.warning_threshold && warned_for != Some(expires_at) {
                        warn!("Session expires in {} seconds; sign in again soon", remaining);
                        warned_for = Some(expires_at);
                    }
                }
            }
        })
    }
}
