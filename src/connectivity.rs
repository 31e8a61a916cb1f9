//! Backend reachability probe with exponential backoff.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

/// How often and how patiently to probe the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Retries after the first attempt.
  pub max_retries: u32,
  /// Delay before the first retry. Doubles on each following retry.
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_retries: 3,
      base_delay: Duration::from_secs(1),
    }
  }
}

impl RetryPolicy {
  /// A single attempt, no retries.
  pub fn once() -> Self {
    Self {
      max_retries: 0,
      ..Self::default()
    }
  }

  /// Delay before retry number `retry` (zero-based).
  pub fn delay(&self, retry: u32) -> Duration {
    self.base_delay.saturating_mul(1u32 << retry.min(16))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
  Connected { attempts: u32 },
  Unreachable { attempts: u32, last_error: ClientError },
}

impl ConnectionStatus {
  #[cfg(test)]
  pub fn is_connected(&self) -> bool {
    matches!(self, Self::Connected { .. })
  }

  pub fn attempts(&self) -> u32 {
    match self {
      Self::Connected { attempts } | Self::Unreachable { attempts, .. } => *attempts,
    }
  }
}

/// Run `probe` until it succeeds or the policy is exhausted.
///
/// Authentication failures stop the loop early; the backend is up in that case.
pub async fn wait_for_backend<F, Fut>(policy: RetryPolicy, mut probe: F) -> ConnectionStatus
where
  F: FnMut() -> Fut,
  Fut: Future<Output = ClientResult<()>>,
{
  let mut attempts = 0;
  loop {
    attempts += 1;
    let err = match probe().await {
      Ok(()) => {
        info!(attempts, "backend reachable");
        return ConnectionStatus::Connected { attempts };
      }
      Err(err) if err.is_auth() => {
        debug!(attempts, "backend answered with an auth error");
        return ConnectionStatus::Connected { attempts };
      }
      Err(err) => err,
    };

    let retry = attempts - 1;
    if retry >= policy.max_retries {
      warn!(attempts, error = %err, "backend unreachable, giving up");
      return ConnectionStatus::Unreachable {
        attempts,
        last_error: err,
      };
    }

    let delay = policy.delay(retry);
    debug!(attempts, delay_ms = delay.as_millis() as u64, error = %err, "retrying backend probe");
    tokio::time::sleep(delay).await;
  }
}
