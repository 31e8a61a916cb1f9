//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};

/// Source of the current time. Injected so TTL expiry can be tested.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
  now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      now: std::sync::Mutex::new(start),
    }
  }

  pub fn advance(&self, by: chrono::Duration) {
    if let Ok(mut now) = self.now.lock() {
      *now += by;
    }
  }
}

#[cfg(test)]
impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    self.now.lock().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
  }
}

/// Data returned by the data service, with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: Source,
}

impl<T> Fetched<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: Source::Network,
    }
  }

  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: Source::Cache,
    }
  }

  pub fn from_fallback(data: T) -> Self {
    Self {
      data,
      source: Source::Fallback,
    }
  }

  pub fn unavailable(data: T) -> Self {
    Self {
      data,
      source: Source::Unavailable,
    }
  }

  /// True when the backend could not be used.
  pub fn is_degraded(&self) -> bool {
    matches!(self.source, Source::Fallback | Source::Unavailable)
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
  /// Fresh data from the backend
  Network,
  /// Cached data, still within the TTL
  Cache,
  /// Backend failed, serving the local mirror
  Fallback,
  /// Backend failed and nothing was stored locally
  Unavailable,
}
