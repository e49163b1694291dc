//! Bulk operations with per-item failure isolation.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use safebox_common::{EntryId, Error, Result};

/// Options for a bulk operation.
#[derive(Debug, Clone)]
pub struct BulkOptions {
    /// Items processed at once; 1 is strictly sequential.
    pub concurrency: usize,
    /// Items not yet finished when this fires are reported as cancelled.
    pub cancel: CancellationToken,
}

impl BulkOptions {
    pub fn sequential() -> Self {
        Self {
            concurrency: 1,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self::sequential()
    }
}

/// Result for one item.
#[derive(Debug)]
pub struct ItemOutcome {
    pub id: EntryId,
    pub result: Result<()>,
}

impl ItemOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-item results in input order plus the failure count.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub outcomes: Vec<ItemOutcome>,
    pub failures: usize,
}

impl BulkReport {
    pub(crate) fn from_outcomes(outcomes: Vec<ItemOutcome>) -> Self {
        let failures = outcomes.iter().filter(|o| !o.is_ok()).count();
        Self { outcomes, failures }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failures
    }

    pub fn is_success(&self) -> bool {
        self.failures == 0
    }

    /// Ids whose operation failed.
    pub fn failed_ids(&self) -> Vec<EntryId> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_ok())
            .map(|o| o.id)
            .collect()
    }
}

/// Run `op` for every id, `options.concurrency` at a time.
///
/// A failing item never stops the batch.
pub async fn run_bulk<F, Fut>(ids: &[EntryId], options: &BulkOptions, op: F) -> BulkReport
where
    F: Fn(EntryId) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let concurrency = options.concurrency.max(1);
    debug!(items = ids.len(), concurrency, "Starting bulk operation");

    let outcomes: Vec<ItemOutcome> = stream::iter(ids.iter().copied())
        .map(|id| {
            let cancel = options.cancel.clone();
            let fut = op(id);
            async move {
                if cancel.is_cancelled() {
                    return ItemOutcome {
                        id,
                        result: Err(Error::Cancelled),
                    };
                }
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(Error::Cancelled),
                    result = fut => result,
                };
                if let Err(e) = &result {
                    warn!(entry = %id, error = %e, "Bulk item failed");
                }
                ItemOutcome { id, result }
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    let report = BulkReport::from_outcomes(outcomes);
    debug!(
        succeeded = report.succeeded(),
        failed = report.failures,
        "Bulk operation finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn ids(n: u64) -> Vec<EntryId> {
        (0..n).map(EntryId).collect()
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let report = run_bulk(&ids(5), &BulkOptions::sequential(), |id| async move {
            if id.0 % 2 == 1 {
                Err(Error::NotFound(format!("{}", id)))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(report.outcomes.len(), 5);
        assert_eq!(report.failures, 2);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed_ids(), vec![EntryId(1), EntryId(3)]);
    }

    #[tokio::test]
    async fn test_order_preserved_with_concurrency() {
        let options = BulkOptions::sequential().with_concurrency(4);
        let report = run_bulk(&ids(8), &options, |id| async move {
            tokio::time::sleep(Duration::from_millis(8 - id.0)).await;
            Ok(())
        })
        .await;

        let order: Vec<_> = report.outcomes.iter().map(|o| o.id).collect();
        assert_eq!(order, ids(8));
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let options = BulkOptions::sequential().with_concurrency(3);

        run_bulk(&ids(10), &options, |_| {
            let active = active.clone();
            let peak = peak.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_cancelled_items_reported() {
        let cancel = CancellationToken::new();
        let options = BulkOptions::sequential().with_cancel(cancel.clone());

        let report = run_bulk(&ids(4), &options, |id| {
            let cancel = cancel.clone();
            async move {
                if id.0 == 1 {
                    cancel.cancel();
                }
                Ok(())
            }
        })
        .await;

        // Item 1 finishes before its own cancellation is observed by later items.
        assert!(report.outcomes[0].is_ok());
        assert!(matches!(report.outcomes[2].result, Err(Error::Cancelled)));
        assert!(matches!(report.outcomes[3].result, Err(Error::Cancelled)));
    }
}
