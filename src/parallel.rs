//! Parallel split processing
//!
//! Each split gets its own source handle and its own [`SplitReader`]; nothing
//! is shared between workers, so no locking is needed. Aligned ranges are
//! disjoint by construction.

use std::io::{self, Read, Seek};

use crate::config::Config;
use crate::error::{GzIndexError, Result};
use crate::source::ByteWindow;
use crate::split::SplitReader;

/// Requested byte range for one split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitRange {
    pub start: u64,
    pub end: u64,
}

/// Cut `[0, len)` into consecutive ranges of at most `max_split_size` bytes.
///
/// The ranges are unaligned; each split reader aligns its own boundaries.
pub fn plan_splits(len: u64, max_split_size: u64) -> Vec<SplitRange> {
    let size = max_split_size.max(1);
    let mut splits = Vec::new();
    let mut start = 0;
    while start < len {
        let end = start.saturating_add(size).min(len);
        splits.push(SplitRange { start, end });
        start = end;
    }
    splits
}

/// Run `work` on every split, one scoped thread per split.
///
/// `open` is called once per split to get an independent handle on the
/// stream. Results come back in split order; the first error wins.
pub fn process_splits<R, O, F, T>(
    open: O,
    splits: &[SplitRange],
    config: &Config,
    work: F,
) -> Result<Vec<T>>
where
    R: Read + Seek,
    O: Fn() -> io::Result<R> + Sync,
    F: Fn(&mut SplitReader<R>) -> Result<T> + Sync,
    T: Send,
{
    let (open, work) = (&open, &work);

    let outcome = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = splits
            .iter()
            .enumerate()
            .map(|(id, split)| {
                scope.spawn(move |_| -> Result<T> {
                    let source = ByteWindow::new(open()?)?;
                    let mut reader = SplitReader::new(source, split.start, split.end, config);
                    let range = reader.locate()?;
                    tracing::debug!(split = id, start = range.start, end = range.end, "split worker started");
                    work(&mut reader)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(Err(GzIndexError::WorkerPanicked)))
            .collect::<Result<Vec<T>>>()
    });

    outcome.unwrap_or(Err(GzIndexError::WorkerPanicked))
}
