//! Shared HTTP plumbing for forge and registry clients
//!
//! Provides:
//! - `agent()` - a ureq agent that reports HTTP error statuses as responses
//! - `next_link()` - `Link: <...>; rel="next"` pagination
//! - `Clock` - injectable time source so backoff sleeps can be observed
//! - `with_backoff()` - bounded retry loop for rate-limited calls

use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::warn;
use ureq::Agent;
use ureq::http::HeaderMap;

pub type Response = ureq::http::Response<ureq::Body>;

pub const USER_AGENT: &str = concat!("depscout/", env!("CARGO_PKG_VERSION"));

/// Build an agent with a global timeout.
///
/// Error statuses (4xx/5xx) come back as ordinary responses, callers decide
/// what a 404 or a 429 means for them.
pub fn agent(timeout: Duration) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    config.into()
}

/// Read a header as a trimmed string
pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// Extract the `rel="next"` target from a `Link` header
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = header(headers, "link")?;
    link.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim().replace(' ', "");
            p == "rel=\"next\"" || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// Read the whole response body as text
pub fn read_body(response: Response) -> Result<String, ureq::Error> {
    response.into_body().read_to_string()
}

/// Time source used for rate-limit arithmetic and sleeping
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
    fn sleep(&self, duration: Duration);
}

/// Wall clock, sleeps the calling thread
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that records sleeps instead of blocking; time advances by each sleep
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(now: SystemTime) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        self.now.lock().map(|n| *n).unwrap_or(SystemTime::UNIX_EPOCH)
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        if let Ok(mut now) = self.now.lock() {
            *now += duration;
        }
    }
}

/// Upper bounds on rate-limit waiting for a single logical call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_retries: u32,
    pub max_total_wait: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            max_total_wait: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("rate limit still in effect after {retries} retries ({waited:?} spent waiting)")]
pub struct RateLimitExhausted {
    pub retries: u32,
    pub waited: Duration,
}

/// Outcome of one attempt inside `with_backoff`
pub enum Attempt<T> {
    Done(T),
    Throttled(Duration),
}

/// Run `attempt` until it stops reporting throttling.
///
/// Each throttle sleeps for the requested duration through `clock`. Gives up
/// once another sleep would exceed `policy.max_retries` or
/// `policy.max_total_wait`.
pub fn with_backoff<T, E>(
    clock: &dyn Clock,
    policy: RateLimitPolicy,
    what: &str,
    mut attempt: impl FnMut() -> Result<Attempt<T>, E>,
) -> Result<T, E>
where
    E: From<RateLimitExhausted>,
{
    let mut retries = 0;
    let mut waited = Duration::ZERO;

    loop {
        match attempt()? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Throttled(wait) => {
                if retries >= policy.max_retries || waited + wait > policy.max_total_wait {
                    return Err(RateLimitExhausted { retries, waited }.into());
                }
                warn!(
                    "Rate limit exceeded for {}. Sleeping for {} seconds.",
                    what,
                    wait.as_secs()
                );
                clock.sleep(wait);
                retries += 1;
                waited += wait;
            }
        }
    }
}
