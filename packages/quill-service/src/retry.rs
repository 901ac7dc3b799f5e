use std::{future::Future, time::Duration};

use quill_config::Retry;

/// Runs `call` until it succeeds, fails with a non-retryable error, or runs out of attempts.
///
/// Only rate-limit responses are retried. A provider `Retry-After` hint lengthens the wait but
/// never past `max_backoff_ms`.
pub(crate) async fn with_retry<T, F, Fut>(
	policy: &Retry,
	operation: &'static str,
	mut call: F,
) -> quill_providers::Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = quill_providers::Result<T>>,
{
	let max_attempts = policy.max_attempts.max(1);
	let mut attempt = 1;

	loop {
		match call().await {
			Ok(value) => return Ok(value),
			Err(err) if err.is_retryable() && attempt < max_attempts => {
				let hint = match &err {
					quill_providers::Error::RateLimited { retry_after_ms, .. } => *retry_after_ms,
					_ => None,
				};
				let delay = backoff_for_attempt(policy, attempt, hint);

				tracing::warn!(
					operation,
					attempt,
					delay_ms = delay.as_millis() as u64,
					"Provider rate limited the request. Retrying."
				);
				tokio::time::sleep(delay).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}

pub(crate) fn backoff_for_attempt(policy: &Retry, attempt: u32, hint_ms: Option<u64>) -> Duration {
	let exp = attempt.max(1).saturating_sub(1).min(6);
	let base = policy.base_backoff_ms.saturating_mul(1 << exp);
	let wanted = hint_ms.map_or(base, |hint| hint.max(base));

	Duration::from_millis(wanted.min(policy.max_backoff_ms))
}
