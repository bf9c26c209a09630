//! The retry policy: a pure function from (attempts, config) to an outcome.
//! No IO, no clock reads — callers supply `now` so the decision stays
//! deterministic and trivially testable.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// What the worker loop should do after a failed or timed-out attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Schedule another attempt after `delay`.
    Retry { delay: Duration },
    /// Retries are exhausted; move the job to the dead-letter queue.
    GiveUp,
}

/// Decides the outcome for a job that has just recorded `attempts` completed
/// tries (post-increment, i.e. including the one that just failed).
///
/// `delay = backoff_base ^ attempts` seconds: using the post-increment count
/// means the first retry is delayed by `backoff_base` seconds, not one.
pub fn decide(attempts: u32, max_retries: u32, backoff_base: u32) -> Outcome {
    if attempts >= max_retries {
        return Outcome::GiveUp;
    }
    let delay_secs = (backoff_base as u64).saturating_pow(attempts);
    Outcome::Retry {
        delay: Duration::from_secs(delay_secs),
    }
}

/// Convenience wrapper around `decide` that also computes the absolute
/// `run_at` for a retry outcome.
pub fn next_run_at(attempts: u32, max_retries: u32, backoff_base: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match decide(attempts, max_retries, backoff_base) {
        Outcome::Retry { delay } => {
            chrono::Duration::from_std(delay).ok().map(|d| now + d)
        }
        Outcome::GiveUp => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_retry_delays_by_base_not_one() {
        assert_eq!(
            decide(1, 3, 2),
            Outcome::Retry {
                delay: Duration::from_secs(2)
            }
        );
    }

    #[test]
    fn delay_grows_exponentially_with_attempts() {
        assert_eq!(
            decide(2, 5, 2),
            Outcome::Retry {
                delay: Duration::from_secs(4)
            }
        );
        assert_eq!(
            decide(3, 5, 2),
            Outcome::Retry {
                delay: Duration::from_secs(8)
            }
        );
    }

    #[test]
    fn gives_up_at_threshold() {
        assert_eq!(decide(3, 3, 2), Outcome::GiveUp);
        assert_eq!(decide(4, 3, 2), Outcome::GiveUp);
    }

    #[test]
    fn base_one_never_grows() {
        for attempts in 0..5 {
            assert_eq!(
                decide(attempts, 10, 1),
                Outcome::Retry {
                    delay: Duration::from_secs(1)
                }
            );
        }
    }

    #[test]
    fn next_run_at_advances_now_by_delay() {
        let now = Utc::now();
        let at = next_run_at(1, 3, 2, now).expect("should retry");
        assert_eq!(at, now + chrono::Duration::seconds(2));
        assert_eq!(next_run_at(3, 3, 2, now), None);
    }
}
