//! Best-effort check for a newer release.
//!
//! The check runs on its own thread and never reports failures: a network
//! error, a timeout or a malformed feed just means no notice is shown.

use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Version of this build.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Release announced by the update feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseInfo {
    pub version: String,
    pub url: String,
}

/// A `major.minor.patch` version, compared numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl FromStr for Version {
    type Err = String;

    /// Accepts an optional `v` prefix and missing trailing components
    /// (`v1.2` is `1.2.0`). Pre-release and build suffixes are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let core = s
            .trim()
            .trim_start_matches(['v', 'V'])
            .split(['-', '+'])
            .next()
            .unwrap_or("");

        let mut parts = [0u64; 3];
        let mut count = 0;
        for (slot, piece) in parts.iter_mut().zip(core.split('.')) {
            *slot = piece.parse().map_err(|_| format!("invalid version: {}", s))?;
            count += 1;
        }
        if count == 0 || core.split('.').count() > 3 {
            return Err(format!("invalid version: {}", s));
        }

        Ok(Version {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Return the release if it is newer than `local`. Unparseable versions
/// never count as newer.
pub fn newer_release(local: &str, release: ReleaseInfo) -> Option<ReleaseInfo> {
    let local = local.parse::<Version>().ok()?;
    let remote = release.version.parse::<Version>().ok()?;
    match remote.cmp(&local) {
        Ordering::Greater => Some(release),
        _ => None,
    }
}

/// Fetch the feed at `url` and call `on_newer` if it announces a newer
/// release than [`CURRENT_VERSION`]. Returns immediately.
pub fn spawn_check<F>(url: String, on_newer: F) -> JoinHandle<()>
where
    F: FnOnce(ReleaseInfo) + Send + 'static,
{
    thread::spawn(move || match fetch_release(&url) {
        Ok(release) => {
            if let Some(release) = newer_release(CURRENT_VERSION, release) {
                on_newer(release);
            }
        }
        Err(e) => tracing::debug!(error = %e, "update check failed"),
    })
}

/// Give a running check at most `limit` to finish. Returns whether it did;
/// an unfinished check is left detached.
pub fn wait_briefly(handle: JoinHandle<()>, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            tracing::debug!("update check still running, not waiting for it");
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
    if handle.join().is_err() {
        tracing::debug!("update check thread panicked");
    }
    true
}

fn fetch_release(url: &str) -> reqwest::Result<ReleaseInfo> {
    reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?
        .get(url)
        .send()?
        .error_for_status()?
        .json()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(version: &str) -> ReleaseInfo {
        ReleaseInfo {
            version: version.to_string(),
            url: "https://example.com/download".to_string(),
        }
    }

    #[test]
    fn test_parse_version() {
        let version: Version = "v1.10.2".parse().unwrap();
        assert_eq!(version, Version { major: 1, minor: 10, patch: 2 });
        assert_eq!("2.1".parse::<Version>().unwrap().to_string(), "2.1.0");
        assert_eq!("1.0.0-beta.1".parse::<Version>().unwrap().to_string(), "1.0.0");
        assert!("".parse::<Version>().is_err());
        assert!("1.x".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(newer_release("1.9.0", release("1.10.0")).is_some());
        assert!(newer_release("1.10.0", release("1.9.0")).is_none());
        assert!(newer_release("1.0.0", release("1.0.0")).is_none());
        assert!(newer_release("1.0.0", release("garbage")).is_none());
    }

    #[test]
    fn test_release_feed_shape() {
        let info: ReleaseInfo =
            serde_json::from_str(r#"{"version": "2.0.0", "url": "https://example.com/d"}"#).unwrap();
        assert_eq!(info.version, "2.0.0");
    }

    #[test]
    fn test_wait_briefly_does_not_block_on_slow_checks() {
        let slow = thread::spawn(|| thread::sleep(Duration::from_secs(3)));
        let started = Instant::now();
        assert!(!wait_briefly(slow, Duration::from_millis(100)));
        assert!(started.elapsed() < Duration::from_secs(2));

        let quick = thread::spawn(|| {});
        assert!(wait_briefly(quick, Duration::from_secs(2)));
    }

    #[test]
    fn test_unreachable_feed_is_silent() {
        let called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = called.clone();
        let handle = spawn_check("http://127.0.0.1:9/feed.json".to_string(), move |_| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        });
        handle.join().unwrap();
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }
}
