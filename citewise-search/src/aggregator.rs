//! Concurrent fan-out of candidate sources to the fetcher.
//!
//! Every candidate is fetched at once (the candidate list is small and
//! bounded by the provider page size), all outcomes are awaited, and the
//! successful sources are returned in the provider's original order.

use crate::fetcher::SourceFetcher;
use crate::types::{FetchOutcome, Source, SourceSet};

/// Fetch every candidate concurrently and keep the successes.
///
/// # Pipeline
///
/// 1. Tag each candidate with its provider rank
/// 2. Fan out fetches concurrently with [`futures::future::join_all`]
/// 3. Log per-source failures at debug level
/// 4. Reassemble successes by original rank, not completion order
///
/// Zero successes is not an error: the returned set is simply empty.
pub async fn gather_sources(fetcher: &SourceFetcher, candidates: Vec<Source>) -> SourceSet {
    let total = candidates.len();

    let futures: Vec<_> = candidates
        .into_iter()
        .enumerate()
        .map(|(rank, source)| async move { (rank, fetcher.fetch(source).await) })
        .collect();

    let outcomes = futures::future::join_all(futures).await;

    let set = collect_successes(outcomes);
    tracing::debug!(candidates = total, succeeded = set.len(), "sources gathered");
    set
}

/// Keep successful outcomes, ordered by their original rank.
pub(crate) fn collect_successes(mut outcomes: Vec<(usize, FetchOutcome)>) -> SourceSet {
    outcomes.sort_by_key(|(rank, _)| *rank);

    let sources = outcomes
        .into_iter()
        .filter_map(|(rank, outcome)| match outcome {
            FetchOutcome::Success(source) => Some(source),
            FetchOutcome::Failure(reason) => {
                tracing::debug!(rank, %reason, "source dropped");
                None
            }
        })
        .collect();

    SourceSet::new(sources)
}
