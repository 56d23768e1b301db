//! Ordered fallback across providers.
//!
//! [`resolve_with_fallback`] tries a primary query, then each fallback, one
//! at a time and in order. The first success ends the chain. One deadline
//! covers the whole chain; when it passes, the chain is abandoned and reported
//! as [`Error::AllProvidersFailed`].

use std::future::Future;
use std::time::Duration;

use aniweave_common::{Error, Result, SeriesQuery};
use serde::Serialize;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

/// A successful chain result.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackOutcome<T> {
    pub value: T,
    /// The query that produced `value`.
    pub served_by: SeriesQuery,
    /// True when `served_by` is not the primary.
    pub fallback: bool,
    /// Attempts made, including the successful one.
    pub attempts: usize,
}

/// Run `attempt` over `primary` then `fallbacks` until one succeeds.
pub async fn resolve_with_fallback<T, F, Fut>(
    primary: SeriesQuery,
    fallbacks: Vec<SeriesQuery>,
    deadline: Duration,
    mut attempt: F,
) -> Result<FallbackOutcome<T>>
where
    F: FnMut(SeriesQuery) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let deadline_at = Instant::now() + deadline;
    let chain = std::iter::once(primary).chain(fallbacks);

    let mut attempts = 0;
    let mut last_error = None;
    for (position, query) in chain.enumerate() {
        attempts += 1;
        match timeout_at(deadline_at, attempt(query.clone())).await {
            Ok(Ok(value)) => {
                if position > 0 {
                    info!(provider = %query.provider, attempts, "Served by fallback");
                }
                return Ok(FallbackOutcome {
                    value,
                    served_by: query,
                    fallback: position > 0,
                    attempts,
                });
            }
            Ok(Err(e)) => {
                warn!(
                    provider = %query.provider,
                    id = %query.id,
                    kind = e.kind(),
                    error = %e,
                    "Provider failed, moving to next in chain"
                );
                last_error = Some(e);
            }
            Err(_) => {
                warn!(
                    provider = %query.provider,
                    deadline_secs = deadline.as_secs(),
                    "Fallback deadline reached"
                );
                last_error = Some(Error::timeout("fallback chain", deadline));
                break;
            }
        }
    }

    Err(Error::AllProvidersFailed {
        attempts,
        last: Box::new(
            last_error.unwrap_or_else(|| Error::Internal("empty fallback chain".into())),
        ),
    })
}
