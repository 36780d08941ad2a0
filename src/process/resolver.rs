//! Resolution of one canonical process per executable name. When several live
//! processes share an image name (a browser and its helper processes, for example)
//! the OS process list alone cannot say which one is "the" application, so the
//! resolvers here apply documented tie-breaks over process metadata.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::TrackerError;

use super::{ProcessHandle, ProcessQuery};

/// Resolves the main process for `name`, disambiguating duplicates by launch order
/// and path validity:
///
/// 1. A single live match is returned directly, with no further metadata queries.
/// 2. Among duplicates, candidates without an executable path are discarded; helper
///    processes typically report none.
/// 3. Of the remainder, the one with the earliest creation timestamp wins. Ties keep
///    the first candidate in enumeration order.
pub fn resolve_main(query: &dyn ProcessQuery, name: &str) -> Result<ProcessHandle, TrackerError> {
    let mut candidates = query.list_by_name(name);
    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }

    let mut best: Option<(NaiveDateTime, ProcessHandle)> = None;
    for candidate in candidates {
        let has_path = query
            .executable_path(&candidate)
            .is_some_and(|p| !p.as_os_str().is_empty());
        if !has_path {
            debug!("Discarding pid {} for '{name}': no executable path", candidate.pid);
            continue;
        }
        let Some(created) = query
            .creation_timestamp(&candidate)
            .as_deref()
            .and_then(parse_creation_timestamp)
        else {
            continue;
        };
        if best.as_ref().map_or(true, |(earliest, _)| created < *earliest) {
            best = Some((created, candidate));
        }
    }

    best.map(|(_, handle)| handle)
        .ok_or_else(|| TrackerError::ProcessNotFound(name.to_owned()))
}

/// Resolves the parent among same-named processes, for the case where one instance
/// is known to have spawned the other. With exactly two candidates this handles both
/// shapes: siblings (shared parent id, where the shared ancestor is returned) and a
/// direct parent/child pair (the parent is returned).
///
/// More than two same-named candidates is a known limitation of this algorithm: only
/// the first two take part in the ancestry check, which keeps the result
/// deterministic without claiming to untangle arbitrary process trees.
pub fn resolve_parent(query: &dyn ProcessQuery, name: &str) -> Result<ProcessHandle, TrackerError> {
    let mut candidates = query.list_by_name(name);
    match candidates.len() {
        0 => Err(TrackerError::ProcessNotFound(name.to_owned())),
        1 => Ok(candidates.remove(0)),
        count => {
            if count > 2 {
                debug!("'{name}' has {count} live instances, ancestry check uses the first two");
            }
            let second = candidates.swap_remove(1);
            let first = candidates.swap_remove(0);

            let first_parent = query.parent_id(&first);
            let second_parent = query.parent_id(&second);

            if let (Some(a), Some(b)) = (first_parent, second_parent) {
                if a == b {
                    // Siblings: their common ancestor is the process to track.
                    if let Some(ancestor) = query.find_by_pid(a) {
                        return Ok(ancestor);
                    }
                }
            }
            if first_parent == Some(second.pid) {
                return Ok(second);
            }
            if second_parent == Some(first.pid) {
                return Ok(first);
            }
            // Unrelated pair: fall back to enumeration order.
            Ok(first)
        }
    }
}

/// Parses the fixed-width encoded process creation moment, e.g.
/// `20240331142353.658251`: 4-digit year, 2-digit month/day/hour/minute/second,
/// then optional fractional seconds of accumulated precision down to microseconds.
/// Trailing non-digit content (such as a UTC offset suffix) is ignored.
pub(crate) fn parse_creation_timestamp(raw: &str) -> Option<NaiveDateTime> {
    // The fixed-width head must be 14 ASCII digits before any slicing happens;
    // malformed input reports as None, never as a panic.
    let head = raw.as_bytes().get(..14)?;
    if !head.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let field = |from: usize, width: usize| raw[from..from + width].parse::<u32>().ok();

    let year = raw[0..4].parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(4, 2)?, field(6, 2)?)?;

    let micros = match raw.as_bytes().get(14) {
        Some(b'.') => {
            let fraction: String = raw[15..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .take(6)
                .collect();
            if fraction.is_empty() {
                return None;
            }
            // Right-pad so '.658' means 658 milliseconds, not 658 microseconds.
            format!("{fraction:0<6}").parse::<u32>().ok()?
        }
        _ => 0,
    };

    date.and_hms_micro_opt(field(8, 2)?, field(10, 2)?, field(12, 2)?, micros)
}
