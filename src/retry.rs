/// Re-runs a fetch while it fails with a transient [`crate::market_data::FetchError`].
///
/// `$operation` is re-evaluated on every attempt, so it should build a fresh
/// future each time.
macro_rules! retry_fetch {
    ($context:expr, $max_attempts:expr, $delay:expr, $operation:expr) => {{
        let max_attempts: u32 = ($max_attempts).max(1);
        let delay: std::time::Duration = $delay;
        let mut attempt = 1;

        loop {
            match ($operation).await {
                Ok(value) => break Ok(value),
                Err(err) if attempt >= max_attempts || !err.is_transient() => break Err(err),
                Err(err) => {
                    log::warn!(
                        "Attempt {}/{} for {} failed: {}. Retrying in {:?}.",
                        attempt,
                        max_attempts,
                        $context,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }};
}

pub(crate) use retry_fetch;
