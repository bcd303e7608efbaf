//! Healthcheck ping client
//!
//! Reports job progress to a healthchecks.io style endpoint:
//! `{url}/start` when a backup begins, `{url}` on success, `{url}/fail` on
//! failure. Delivery problems are logged and swallowed; a monitoring outage
//! never fails a backup.

use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed pinging {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Ping to {url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// Which outcome a ping reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingKind {
    Start,
    Success,
    Failure,
}

impl PingKind {
    /// Path appended to the base URL
    fn suffix(&self) -> &'static str {
        match self {
            PingKind::Start => "/start",
            PingKind::Success => "",
            PingKind::Failure => "/fail",
        }
    }
}

/// Abstraction for outcome reporting, enabling mocking in tests
///
/// Each method returns whether a ping was delivered. No endpoint counts as
/// delivered.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: PingKind) -> bool;

    fn notify_start(&self) -> bool {
        self.notify(PingKind::Start)
    }

    fn notify_success(&self) -> bool {
        self.notify(PingKind::Success)
    }

    fn notify_failure(&self) -> bool {
        self.notify(PingKind::Failure)
    }
}

/// Sends pings over HTTP, or nothing at all when no URL is configured
pub struct NotificationManager {
    base_url: Option<String>,
    client: Option<reqwest::blocking::Client>,
}

impl NotificationManager {
    /// The HTTP client is only built when there is an endpoint to ping
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, NotificationError> {
        let client = match base_url {
            Some(_) => Some(
                reqwest::blocking::Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(NotificationError::Client)?,
            ),
            None => None,
        };

        Ok(Self { base_url, client })
    }

    /// A manager that never sends anything
    pub fn disabled() -> Self {
        Self {
            base_url: None,
            client: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    /// Full URL for a ping kind, if an endpoint is configured
    pub fn ping_url(&self, kind: PingKind) -> Option<String> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}{}", base, kind.suffix()))
    }

    fn ping(&self, client: &reqwest::blocking::Client, url: &str) -> Result<(), NotificationError> {
        let response = client
            .get(url)
            .send()
            .map_err(|source| NotificationError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

impl Notifier for NotificationManager {
    fn notify(&self, kind: PingKind) -> bool {
        let (Some(client), Some(url)) = (self.client.as_ref(), self.ping_url(kind)) else {
            return true;
        };

        info!("Pinging {}", url);
        match self.ping(client, &url) {
            Ok(()) => true,
            Err(e) => {
                warn!("** {}", e);
                false
            }
        }
    }
}

/// A recording notifier for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct RecordingNotifier {
        pub pings: Arc<Mutex<Vec<PingKind>>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_pings(&self) -> Vec<PingKind> {
            self.pings.lock().unwrap().clone()
        }

        pub fn count(&self, kind: PingKind) -> usize {
            self.pings
                .lock()
                .unwrap()
                .iter()
                .filter(|k| **k == kind)
                .count()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, kind: PingKind) -> bool {
            self.pings.lock().unwrap().push(kind);
            true
        }
    }
}
