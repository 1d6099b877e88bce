//! Interval-overlap conflict detection.
//!
//! # Responsibility
//! - Decide whether a candidate slot collides with a participant's
//!   committed intervals.
//! - Derive committed interval sets from already-loaded meetings.
//!
//! # Invariants
//! - Pure: no storage or clock access.
//! - Half-open rule everywhere: `[s1,e1)` and `[s2,e2)` overlap iff
//!   `s1 < e2 && s2 < e1`. Back-to-back meetings never conflict.

use crate::model::interval::Interval;
use crate::model::meeting::{Meeting, MeetingId};
use crate::model::user::UserId;

/// Returns the first interval in `existing` overlapping `candidate`.
pub fn first_conflict(candidate: Interval, existing: &[Interval]) -> Option<Interval> {
    existing
        .iter()
        .copied()
        .find(|interval| candidate.overlaps(interval))
}

/// Returns whether `candidate` overlaps any interval in `existing`.
pub fn conflicts(candidate: Interval, existing: &[Interval]) -> bool {
    first_conflict(candidate, existing).is_some()
}

/// Collects the committed interval set of `participant` from `meetings`.
///
/// A meeting is committed when the participant organizes it or has accepted
/// it. `exclude` drops the meeting currently under evaluation so it never
/// conflicts with itself. Meetings violating `end > start` are skipped;
/// storage rejects them on read, so this only matters for hand-built input.
pub fn committed_intervals<'a, I>(
    participant: UserId,
    meetings: I,
    exclude: Option<MeetingId>,
) -> Vec<Interval>
where
    I: IntoIterator<Item = &'a Meeting>,
{
    meetings
        .into_iter()
        .filter(|meeting| Some(meeting.id) != exclude)
        .filter(|meeting| meeting.commits(participant))
        .filter_map(|meeting| meeting.interval().ok())
        .collect()
}
