//! Revision history: the newest-first index of published revisions and the
//! point-in-time lookup over it.

use std::path::Path;

use crate::error::Error;
use crate::types::Revision;

/// Snapshot of the upstream history, `<id> <timestamp>` per line, newest first.
const EMBEDDED_HISTORY: &str = include_str!("../data/dt_history.txt");

/// First probe of the search. Lookups are mostly for recently published
/// packages, which sit near the front of the index.
const RECENT_BIAS_PROBE: usize = 4096;

/// Result of a lookup checked against how densely the snapshot covers the
/// requested moment.
#[derive(Debug, PartialEq, Eq)]
pub enum Coverage<'a> {
    /// A revision published within the allowed gap of the timestamp.
    Covered(&'a Revision),
    /// The timestamp is newer than every revision in the snapshot.
    TooNew,
    /// The nearest revision at or before the timestamp is older than the
    /// allowed gap, so the snapshot is missing the history in between.
    Gap(&'a Revision),
}

/// Immutable, newest-first list of revisions.
/// Constructed only via `parse()`, `read()` or `embedded()`, all of which
/// enforce non-increasing timestamps and at least one entry.
#[derive(Debug)]
pub struct RevisionIndex {
    /// Revisions ordered by `published_at`, newest at index 0.
    entries: Vec<Revision>,
}

impl RevisionIndex {
    /// Parse the snapshot compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns `Error::HistoryCorrupt` if the embedded resource is malformed.
    pub fn embedded() -> Result<Self, Error> {
        return Self::parse(EMBEDDED_HISTORY);
    }

    /// Read an external snapshot, e.g. one regenerated from the upstream
    /// repository with `git log --first-parent --format='%H %ct'`.
    ///
    /// # Errors
    ///
    /// Returns `Error::HistoryNotFound` if the file doesn't exist,
    /// `Error::Io` if it can't be read, or `Error::HistoryCorrupt` if it is
    /// malformed.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::HistoryNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Parse a history resource. Blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::HistoryCorrupt` for a line that isn't `<id> <timestamp>`,
    /// for timestamps that increase from one line to the next, or when the
    /// resource holds no revisions at all.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let mut entries: Vec<Revision> = Vec::new();

        for (index, line) in content.lines().enumerate() {
            let line_number = index.saturating_add(1);
            if line.trim().is_empty() {
                continue;
            }

            let revision = parse_history_line(line, line_number)?;
            if let Some(previous) = entries.last()
                && revision.published_at > previous.published_at
            {
                return Err(Error::HistoryCorrupt {
                    line: line_number,
                    reason: format!(
                        "timestamp {} is newer than the preceding {}",
                        revision.published_at, previous.published_at
                    ),
                });
            }
            entries.push(revision);
        }

        if entries.is_empty() {
            return Err(Error::HistoryCorrupt {
                line: 0,
                reason: "no revisions".to_string(),
            });
        }

        return Ok(Self { entries });
    }

    /// Number of revisions in the index.
    pub fn revision_count(&self) -> usize {
        return self.entries.len();
    }

    /// The most recently published revision.
    pub fn newest(&self) -> Option<&Revision> {
        return self.entries.first();
    }

    /// The earliest known revision.
    pub fn oldest(&self) -> Option<&Revision> {
        return self.entries.last();
    }

    /// Find the revision that was current at `timestamp` (seconds since epoch).
    ///
    /// Returns `None` when the timestamp is newer than every known revision;
    /// callers should fall back to the unversioned default branch. Timestamps
    /// older than the whole history resolve to the oldest revision. Among
    /// revisions sharing the exact timestamp, the front-most one wins.
    pub fn resolve(&self, timestamp: f64) -> Option<&Revision> {
        let newest = self.newest()?;
        if timestamp > f64::from(newest.published_at) {
            return None;
        }

        let first_at_or_before = self.partition_point_biased(timestamp);
        return self.entries.get(first_at_or_before).or_else(|| return self.oldest());
    }

    /// `resolve`, but a revision published more than `max_gap` seconds before
    /// `timestamp` is reported as a `Gap` instead of a match. `None` accepts
    /// any gap. Timestamps older than the whole snapshot are always covered.
    pub fn resolve_covered(&self, timestamp: f64, max_gap: Option<f64>) -> Coverage<'_> {
        let Some(revision) = self.resolve(timestamp) else {
            return Coverage::TooNew;
        };
        let behind = timestamp - f64::from(revision.published_at);
        if max_gap.is_some_and(|gap| return behind > gap) {
            return Coverage::Gap(revision);
        }
        return Coverage::Covered(revision);
    }

    /// Index of the first entry with `published_at <= timestamp`, or `revision_count()`
    /// when there is none. Timestamps are non-increasing, so the predicate
    /// flips from false to true exactly once.
    fn partition_point_biased(&self, timestamp: f64) -> usize {
        let at_or_before = |revision: &Revision| return f64::from(revision.published_at) <= timestamp;

        let mut low = 0_usize;
        let mut high = self.entries.len();
        let mut probe = RECENT_BIAS_PROBE.min(high.saturating_sub(1));

        while low < high {
            let Some(revision) = self.entries.get(probe) else {
                break;
            };
            if at_or_before(revision) {
                high = probe;
            } else {
                low = probe.saturating_add(1);
            }
            probe = low.saturating_add(high.saturating_sub(low) / 2);
        }

        return low;
    }
}

/// Parse one `<id> <timestamp>` line.
///
/// # Errors
///
/// Returns `Error::HistoryCorrupt` if either field is missing or the timestamp
/// isn't an unsigned integer.
fn parse_history_line(line: &str, line_number: usize) -> Result<Revision, Error> {
    let mut fields = line.split_whitespace();
    let (Some(id), Some(raw_timestamp), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(Error::HistoryCorrupt {
            line: line_number,
            reason: format!("expected `<id> <timestamp>`, got `{line}`"),
        });
    };

    let published_at = raw_timestamp.parse::<u32>().map_err(|e| {
        return Error::HistoryCorrupt {
            line: line_number,
            reason: format!("bad timestamp `{raw_timestamp}`: {e}"),
        };
    })?;

    return Ok(Revision {
        id: id.to_string(),
        published_at,
    });
}
