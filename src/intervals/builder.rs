// Interval construction from per-rank call records
//
// Each rank is processed independently into a rank-local partial result.
// Partials are collected in rank order and merged by a single owner, so the
// merged lists are in (rank, record) order no matter how ranks were
// scheduled across workers.

use super::sessions::{stamp_segments, SessionSpan};
use super::{BuildDiagnostics, FileIntervals, IoInterval, SegmentId};
use crate::catalog::{ArgLayout, FunctionCatalog, FunctionClass, IoDirection, MetaOp};
use crate::filter::FileFilter;
use crate::trace::{CallRecord, RecordStream};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Linux `O_APPEND`
const O_APPEND: u64 = 0o2000;

/// Result of interval construction
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub intervals: FileIntervals,
    pub diagnostics: BuildDiagnostics,
}

/// Builds [`FileIntervals`] from a record stream
pub struct IntervalBuilder<'a, F: FileFilter + ?Sized> {
    catalog: &'a FunctionCatalog,
    filter: &'a F,
}

/// Rank-local cursor state for one file
#[derive(Debug, Default)]
struct Cursor {
    position: u64,
    /// Largest byte offset this rank has touched; stands in for file size
    extent: u64,
    open_depth: u32,
    /// Index of the active session in the rank's span list for this file
    active: Option<usize>,
}

#[derive(Debug, Default)]
struct RankPartial {
    intervals: BTreeMap<String, Vec<IoInterval>>,
    sessions: BTreeMap<String, Vec<SessionSpan>>,
    diagnostics: BuildDiagnostics,
}

struct RankState {
    rank: u32,
    next_seq: u32,
    cursors: HashMap<String, Cursor>,
    partial: RankPartial,
}

impl RankState {
    fn new(rank: u32) -> Self {
        Self {
            rank,
            next_seq: 0,
            cursors: HashMap::new(),
            partial: RankPartial::default(),
        }
    }

    fn start_session(&mut self, file: &str, start: f64) -> usize {
        let id = SegmentId::new(self.rank, self.next_seq);
        self.next_seq += 1;
        let spans = self.partial.sessions.entry(file.to_string()).or_default();
        spans.push(SessionSpan::open(id, start));
        spans.len() - 1
    }

    fn end_session(&mut self, file: &str, index: usize, end: f64) {
        if let Some(span) = self
            .partial
            .sessions
            .get_mut(file)
            .and_then(|spans| spans.get_mut(index))
        {
            span.end = end;
        }
    }

    fn active_segment(&self, file: &str, cursor_active: Option<usize>) -> BTreeSet<SegmentId> {
        cursor_active
            .and_then(|i| self.partial.sessions.get(file).and_then(|s| s.get(i)))
            .map(|span| span.id)
            .into_iter()
            .collect()
    }
}

impl<'a, F: FileFilter + ?Sized> IntervalBuilder<'a, F> {
    pub fn new(catalog: &'a FunctionCatalog, filter: &'a F) -> Self {
        Self { catalog, filter }
    }

    /// Build per-file intervals for every rank
    pub fn build<S: RecordStream + ?Sized>(&self, stream: &S) -> BuildOutput {
        let partials: Vec<RankPartial> = (0..stream.total_ranks())
            .into_par_iter()
            .map(|rank| self.build_rank(stream, rank))
            .collect();

        let mut intervals = FileIntervals::new();
        let mut sessions: BTreeMap<String, Vec<SessionSpan>> = BTreeMap::new();
        let mut diagnostics = BuildDiagnostics::default();

        for partial in partials {
            for (file, list) in partial.intervals {
                intervals.extend(file, list);
            }
            for (file, spans) in partial.sessions {
                sessions.entry(file).or_default().extend(spans);
            }
            diagnostics += partial.diagnostics;
        }

        intervals
            .files_mut()
            .par_iter_mut()
            .for_each(|(file, list)| {
                if let Some(spans) = sessions.get(file) {
                    stamp_segments(list, spans);
                }
            });

        tracing::debug!(
            files = intervals.len(),
            intervals = diagnostics.intervals,
            out_of_range = diagnostics.out_of_range,
            malformed = diagnostics.malformed_args,
            "built I/O intervals"
        );

        BuildOutput {
            intervals,
            diagnostics,
        }
    }

    fn build_rank<S: RecordStream + ?Sized>(&self, stream: &S, rank: usize) -> RankPartial {
        let mut state = RankState::new(rank as u32);

        for record in stream.records(rank) {
            state.partial.diagnostics.records_seen += 1;

            let Some(class) = self.catalog.class(record.func_id) else {
                state.partial.diagnostics.out_of_range += 1;
                continue;
            };
            if matches!(class, FunctionClass::Excluded | FunctionClass::Other) {
                continue;
            }

            if record.tend < record.tstart {
                tracing::trace!(rank, func = record.func_id, "skipping record with tend < tstart");
                state.partial.diagnostics.negative_duration += 1;
                continue;
            }

            let Some(file) = stream.target_file(rank, record) else {
                state.partial.diagnostics.unresolved_file += 1;
                continue;
            };
            if self.filter.is_ignorable(file) {
                state.partial.diagnostics.ignored_file += 1;
                continue;
            }

            let applied = match class {
                FunctionClass::Io(direction, layout) => {
                    apply_io(&mut state, file, record, direction, layout)
                }
                FunctionClass::Metadata(op) => apply_metadata(&mut state, file, record, op),
                FunctionClass::Excluded | FunctionClass::Other => true,
            };
            if !applied {
                tracing::trace!(rank, func = record.func_id, file, "malformed arguments");
                state.partial.diagnostics.malformed_args += 1;
            }
        }

        state.partial
    }
}

/// Record one transfer; `false` when the size/offset arguments are unusable
fn apply_io(
    state: &mut RankState,
    file: &str,
    record: &CallRecord,
    direction: IoDirection,
    layout: ArgLayout,
) -> bool {
    let count = match layout {
        ArgLayout::Sequential | ArgLayout::Positional => arg_u64(record, 2),
        ArgLayout::Stream => arg_u64(record, 1)
            .zip(arg_u64(record, 2))
            .and_then(|(size, nmemb)| size.checked_mul(nmemb)),
        ArgLayout::Formatted => arg_u64(record, 1),
    };
    let Some(count) = count else {
        return false;
    };

    let explicit_offset = match layout {
        ArgLayout::Positional => match arg_u64(record, 3) {
            Some(offset) => Some(offset),
            None => return false,
        },
        _ => None,
    };

    let cursor = state.cursors.entry(file.to_string()).or_default();
    let offset = explicit_offset.unwrap_or(cursor.position);
    let end = offset.saturating_add(count);
    if explicit_offset.is_none() {
        cursor.position = end;
    }
    cursor.extent = cursor.extent.max(end);
    let active = cursor.active;

    let interval = IoInterval {
        rank: state.rank,
        tstart: record.tstart,
        tend: record.tend,
        offset,
        count,
        is_read: direction == IoDirection::Read,
        segments: state.active_segment(file, active),
    };
    state
        .partial
        .intervals
        .entry(file.to_string())
        .or_default()
        .push(interval);
    state.partial.diagnostics.intervals += 1;
    true
}

/// Update cursor and session state; `false` when seek arguments are unusable
fn apply_metadata(state: &mut RankState, file: &str, record: &CallRecord, op: MetaOp) -> bool {
    match op {
        MetaOp::Open => {
            let depth = {
                let cursor = state.cursors.entry(file.to_string()).or_default();
                cursor.open_depth += 1;
                cursor.position = if opens_for_append(record) {
                    cursor.extent
                } else {
                    0
                };
                cursor.open_depth
            };
            if depth == 1 {
                let index = state.start_session(file, record.tstart);
                if let Some(cursor) = state.cursors.get_mut(file) {
                    cursor.active = Some(index);
                }
            }
            true
        }
        MetaOp::Close => {
            let Some(cursor) = state.cursors.get_mut(file) else {
                return true;
            };
            cursor.open_depth = cursor.open_depth.saturating_sub(1);
            if cursor.open_depth > 0 {
                return true;
            }
            cursor.position = 0;
            if let Some(index) = cursor.active.take() {
                state.end_session(file, index, record.tend);
            }
            true
        }
        MetaOp::Sync => {
            let active = state.cursors.get(file).and_then(|c| c.active);
            if let Some(index) = active {
                state.end_session(file, index, record.tend);
                let next = state.start_session(file, record.tend);
                if let Some(cursor) = state.cursors.get_mut(file) {
                    cursor.active = Some(next);
                }
            }
            true
        }
        MetaOp::Seek => {
            let (Some(delta), Some(whence)) = (arg_i64(record, 1), arg_whence(record, 2)) else {
                return false;
            };
            let cursor = state.cursors.entry(file.to_string()).or_default();
            let base = match whence {
                Whence::Set => 0,
                Whence::Cur => cursor.position,
                Whence::End => cursor.extent,
            };
            cursor.position = base.saturating_add_signed(delta);
            true
        }
        MetaOp::Other => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Whence {
    Set,
    Cur,
    End,
}

fn arg(record: &CallRecord, index: usize) -> Option<&str> {
    record.args.get(index).map(|a| a.trim())
}

fn arg_u64(record: &CallRecord, index: usize) -> Option<u64> {
    arg(record, index)?.parse().ok()
}

fn arg_i64(record: &CallRecord, index: usize) -> Option<i64> {
    arg(record, index)?.parse().ok()
}

fn arg_whence(record: &CallRecord, index: usize) -> Option<Whence> {
    match arg(record, index)? {
        "0" | "SEEK_SET" => Some(Whence::Set),
        "1" | "SEEK_CUR" => Some(Whence::Cur),
        "2" | "SEEK_END" => Some(Whence::End),
        _ => None,
    }
}

/// `fopen` modes starting with `a`, or `open` flags carrying `O_APPEND`
fn opens_for_append(record: &CallRecord) -> bool {
    let Some(flags) = arg(record, 1) else {
        return false;
    };
    if flags.contains("O_APPEND") {
        return true;
    }
    if let Ok(bits) = flags.parse::<u64>() {
        return bits & O_APPEND != 0;
    }
    flags.starts_with('a') && flags.chars().all(|c| matches!(c, 'a' | 'b' | '+'))
}
