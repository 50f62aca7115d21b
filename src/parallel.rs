//! Parallel Index Builds
//!
//! Uses Rayon to build independent indexes for many cursors at once. Each
//! build owns its arena and frame stack; only the configuration is shared.

use rayon::prelude::*;

use crate::config::BuildConfig;
use crate::cursor::DocumentCursor;
use crate::error::Result;
use crate::index::{IndexBuilder, PathIndex};

/// Build one index per cursor in parallel
///
/// Results are in input order. A failed build does not affect the others.
/// Every build sees the same cancellation flag, if one is configured.
pub fn build_parallel<C>(cursors: Vec<C>, config: &BuildConfig) -> Vec<Result<PathIndex>>
where
    C: DocumentCursor + Send,
{
    cursors
        .into_par_iter()
        .map(|mut cursor| IndexBuilder::new(config.clone()).build(&mut cursor))
        .collect()
}

/// Build indexes for cursors produced on the worker threads
///
/// For cursors that borrow thread-local decoder state: `make_cursor` is
/// called once per document, on the thread that builds it.
pub fn build_parallel_with<'d, D, C, F>(
    documents: &'d [D],
    config: &BuildConfig,
    make_cursor: F,
) -> Vec<Result<PathIndex>>
where
    D: Sync,
    C: DocumentCursor,
    F: Fn(&'d D) -> C + Sync,
{
    documents
        .par_iter()
        .map(|document| {
            let mut cursor = make_cursor(document);
            IndexBuilder::new(config.clone()).build(&mut cursor)
        })
        .collect()
}
