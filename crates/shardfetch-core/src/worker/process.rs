//! One address: skip checks, fetch with retry, persist with retry.

use crate::retry::{classify, run_with_retry, ErrorKind, FetchError, RetryDecision};

use super::WorkerContext;

/// What happened to one address.
#[derive(Debug)]
pub enum AddressOutcome {
    /// Fetched and persisted after `retries` extra attempts.
    Fetched { retries: u32 },
    /// Permanent error, or transient errors until attempts ran out.
    Failed { retries: u32, error: FetchError },
    /// Listed in the known-invalid ledger; not requested.
    KnownInvalid,
    /// A record already exists and the run skips existing records.
    AlreadyPresent,
    /// The stop signal ended a backoff or rate-limit wait before the request
    /// was sent; the address is not done.
    Interrupted { retries: u32 },
}

impl AddressOutcome {
    /// The address is finished and the cursor may move past it.
    pub fn is_done(&self) -> bool {
        !matches!(self, AddressOutcome::Interrupted { .. })
    }
}

pub(super) fn process_address(ctx: &WorkerContext, address: &str) -> AddressOutcome {
    let _span = tracing::debug_span!("address", address).entered();
    if ctx.known_invalid.contains(address) {
        tracing::debug!(address, "skipping known-invalid address");
        return AddressOutcome::KnownInvalid;
    }
    if ctx.skip_existing && ctx.persister.exists(address) {
        tracing::debug!(address, "record already present");
        return AddressOutcome::AlreadyPresent;
    }

    let fetched = run_with_retry(&ctx.retry, &ctx.stop, |attempt| {
        fetch_once(ctx, address, attempt)
    });
    let mut retries = fetched.retries();
    let data = match fetched.result {
        Ok(data) => data,
        Err(_) if fetched.interrupted => return AddressOutcome::Interrupted { retries },
        Err(error) => return AddressOutcome::Failed { retries, error },
    };

    let stored = run_with_retry(&ctx.retry, &ctx.stop, |_| {
        ctx.persister
            .persist(address, &data)
            .map_err(FetchError::Storage)
    });
    retries += stored.retries();
    match stored.result {
        Ok(()) => {
            tracing::debug!(address, retries, contract = %data.contract_name, "stored");
            AddressOutcome::Fetched { retries }
        }
        Err(_) if stored.interrupted => AddressOutcome::Interrupted { retries },
        Err(error) => AddressOutcome::Failed { retries, error },
    }
}

/// One attempt: lease a token, wait out its spacing, issue the request.
/// The slot is dropped before any backoff sleep. A stop raised before the
/// request goes out yields [`FetchError::Stopped`] and nothing is sent.
fn fetch_once(
    ctx: &WorkerContext,
    address: &str,
    attempt: u32,
) -> Result<crate::fetch::ContractData, FetchError> {
    let slot = ctx
        .pool
        .acquire()
        .map_err(|e| FetchError::Permanent(e.to_string()))?;
    let Some(waited) = ctx.limiter.throttle(slot.index(), &ctx.stop) else {
        tracing::debug!(address, attempt, "stopped while waiting for token");
        return Err(FetchError::Stopped);
    };
    tracing::trace!(
        address,
        attempt,
        token = %slot.token().redacted(),
        waited_ms = waited.as_millis() as u64,
        "fetching"
    );
    let result = ctx.fetcher.fetch(address, slot.token());
    if let Err(e) = &result {
        if classify(e) == ErrorKind::Throttled {
            if let RetryDecision::RetryAfter(delay) = ctx.retry.decide(attempt, ErrorKind::Throttled) {
                ctx.limiter.penalize(slot.index(), delay);
            }
        }
    }
    result
}
