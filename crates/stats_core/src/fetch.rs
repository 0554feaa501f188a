//! Tagged fetch outcomes and the fixed-size batch driver.
//!
//! Batches run one after another, requests inside a batch concurrently.
//! A failed request becomes `FetchOutcome::Failed` and never aborts the
//! batch.

use futures_util::future::join_all;
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

/// Requests per batch against the upstream source.
pub const DEFAULT_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Success(T),
    Failed(String),
}

impl<T> FetchOutcome<T> {
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => FetchOutcome::Success(v),
            // {:#} keeps the anyhow context chain on one line
            Err(e) => FetchOutcome::Failed(format!("{e:#}")),
        }
    }

    pub fn as_success(&self) -> Option<&T> {
        match self {
            FetchOutcome::Success(v) => Some(v),
            FetchOutcome::Failed(_) => None,
        }
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            FetchOutcome::Success(v) => Some(v),
            FetchOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }
}

/// Fetches every key in batches of `batch_size`, preserving key order.
pub async fn fetch_in_batches<K, T, E, F, Fut>(
    keys: &[K],
    batch_size: usize,
    fetch: F,
) -> Vec<(K, FetchOutcome<T>)>
where
    K: Clone + Display,
    E: Display,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let batch_size = batch_size.max(1);
    let mut out = Vec::with_capacity(keys.len());

    for (batch_no, chunk) in keys.chunks(batch_size).enumerate() {
        debug!(batch = batch_no, size = chunk.len(), "fetching batch");
        let results = join_all(chunk.iter().cloned().map(|key| {
            let pending = fetch(key.clone());
            async move { (key, FetchOutcome::from_result(pending.await)) }
        }))
        .await;

        for (key, outcome) in &results {
            if let FetchOutcome::Failed(reason) = outcome {
                warn!(%key, %reason, "fetch failed, treating as no data");
            }
        }
        out.extend(results);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn failures_stay_local_and_order_is_kept() {
        let ids: Vec<u32> = (1..=7).collect();
        let out = fetch_in_batches(&ids, 5, |id| async move {
            if id == 3 {
                Err(format!("match {id} timed out"))
            } else {
                Ok(id * 10)
            }
        })
        .await;

        assert_eq!(out.len(), 7);
        assert_eq!(out.iter().map(|(k, _)| *k).collect::<Vec<_>>(), ids);
        assert_eq!(out[2].1, FetchOutcome::Failed("match 3 timed out".into()));
        assert_eq!(out[6].1, FetchOutcome::Success(70));
        assert_eq!(out.iter().filter(|(_, o)| o.is_failed()).count(), 1);
    }

    #[tokio::test]
    async fn never_more_than_one_batch_in_flight() {
        let in_flight = AtomicUsize::new(0);
        let peak = Mutex::new(0usize);
        let ids: Vec<u32> = (0..12).collect();
        let (in_flight_ref, peak_ref) = (&in_flight, &peak);

        fetch_in_batches(&ids, 5, move |_| async move {
            let (in_flight, peak) = (in_flight_ref, peak_ref);
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            {
                let mut p = peak.lock().unwrap();
                *p = (*p).max(now);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, String>(())
        })
        .await;

        let peak = *peak.lock().unwrap();
        assert!(peak <= 5, "peak concurrency {peak}");
        assert!(peak > 1, "requests inside a batch should overlap");
    }

    #[tokio::test]
    async fn zero_batch_size_is_treated_as_one() {
        let out = fetch_in_batches(&["a", "b"], 0, |k| async move { Ok::<_, String>(k.len()) }).await;
        assert_eq!(out.len(), 2);
    }
}
