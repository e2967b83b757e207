// Session segments
//
// A session is one rank's open→close span on a file. A sync ends the current
// session and starts the next one, so writes before and after a sync never
// share an epoch. Sessions that are never closed run to +inf.

use super::{IoInterval, SegmentId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSpan {
    pub id: SegmentId,
    pub start: f64,
    pub end: f64,
}

impl SessionSpan {
    pub fn open(id: SegmentId, start: f64) -> Self {
        Self {
            id,
            start,
            end: f64::INFINITY,
        }
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Add other ranks' concurrent sessions to each interval's segment set
///
/// An interval issued outside any session of its own rank keeps an empty
/// set: without a local epoch there is nothing to compare against.
pub fn stamp_segments(intervals: &mut [IoInterval], spans: &[SessionSpan]) {
    if spans.is_empty() {
        return;
    }

    for interval in intervals.iter_mut() {
        if interval.segments.is_empty() {
            continue;
        }
        for span in spans {
            if span.id.rank != interval.rank && span.contains(interval.tstart) {
                interval.segments.insert(span.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn interval(rank: u32, tstart: f64, local: Option<SegmentId>) -> IoInterval {
        IoInterval {
            rank,
            tstart,
            tend: tstart + 0.1,
            offset: 0,
            count: 10,
            is_read: false,
            segments: local.into_iter().collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_concurrent_foreign_session_added() {
        let s0 = SegmentId::new(0, 0);
        let s1 = SegmentId::new(1, 0);
        let spans = [
            SessionSpan::open(s0, 0.0),
            SessionSpan {
                id: s1,
                start: 0.5,
                end: 2.0,
            },
        ];

        let mut list = vec![interval(0, 1.0, Some(s0)), interval(1, 0.7, Some(s1))];
        stamp_segments(&mut list, &spans);

        assert_eq!(list[0].segments, [s0, s1].into_iter().collect());
        assert_eq!(list[1].segments, [s0, s1].into_iter().collect());
    }

    #[test]
    fn test_foreign_session_outside_window_not_added() {
        let s0 = SegmentId::new(0, 0);
        let s1 = SegmentId::new(1, 0);
        let spans = [
            SessionSpan {
                id: s0,
                start: 0.0,
                end: 1.0,
            },
            SessionSpan {
                id: s1,
                start: 2.0,
                end: 3.0,
            },
        ];

        let mut list = vec![interval(0, 0.5, Some(s0))];
        stamp_segments(&mut list, &spans);
        assert_eq!(list[0].segments.len(), 1);
    }

    #[test]
    fn test_sessionless_interval_stays_empty() {
        let s1 = SegmentId::new(1, 0);
        let spans = [SessionSpan::open(s1, 0.0)];

        let mut list = vec![interval(0, 0.5, None)];
        stamp_segments(&mut list, &spans);
        assert!(list[0].segments.is_empty());
    }

    #[test]
    fn test_own_rank_sessions_not_added() {
        let a = SegmentId::new(0, 0);
        let b = SegmentId::new(0, 1);
        let spans = [SessionSpan::open(a, 0.0), SessionSpan::open(b, 0.0)];

        let mut list = vec![interval(0, 0.5, Some(a))];
        stamp_segments(&mut list, &spans);
        assert_eq!(list[0].segments, [a].into_iter().collect());
    }
}
