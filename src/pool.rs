//! Bounded-concurrency fan-out/fan-in over an ordered list of items.
//!
//! [`run_bounded`] is the one combinator both pipeline stages use. Up to
//! `limit` operations run at once; they may finish in any order, and every
//! result is slotted back into the position of the item it came from.
//!
//! Failure isolation is by construction: `op` returns a value (typically a
//! `Result` or a result record), so one item failing never cancels or hides
//! its siblings.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{debug, warn};

/// Run `op` over `items` with at most `limit` operations in flight.
///
/// Output index `i` always holds the result for input index `i`. A `limit` of
/// zero is treated as one. An empty input returns immediately without
/// calling `op`.
pub async fn run_bounded<I, T, F, Fut>(items: I, limit: usize, mut op: F) -> Vec<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    let items: Vec<I::Item> = items.into_iter().collect();
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let limit = if limit == 0 {
        warn!("concurrency limit of 0 requested; using 1");
        1
    } else {
        limit
    };
    debug!(total, limit, "Starting bounded fan-out");

    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    let mut completions = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| {
            let fut = op(item);
            async move { (index, fut.await) }
        })
        .buffer_unordered(limit);

    while let Some((index, output)) = completions.next().await {
        debug!(index, "Item completed");
        slots[index] = Some(output);
    }

    // Every index is yielded exactly once by the stream above.
    slots.into_iter().flatten().collect()
}
