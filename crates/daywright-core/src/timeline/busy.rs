//! Per-date busy intervals.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use super::gap::{find_free_slots, BusyInterval, FreeSlot};
use crate::schedule::clock::{minutes_of_day, MINUTES_PER_DAY};
use crate::schedule::{FixedEvent, Task, TaskSegment};

/// Busy time keyed by date.
#[derive(Debug, Clone, Default)]
pub struct BusyMap {
    by_date: HashMap<NaiveDate, Vec<BusyInterval>>,
    not_before: Option<NaiveDateTime>,
}

impl BusyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, date: NaiveDate, interval: BusyInterval) {
        self.by_date.entry(date).or_default().push(interval);
    }

    /// Record a time-boxed task. Untimed tasks occupy nothing.
    pub fn add_task(&mut self, task: &Task) {
        if let Some(range) = task.time_range() {
            self.add(task.date, range.into());
        }
    }

    pub fn add_segment(&mut self, segment: &TaskSegment) {
        self.add(segment.date, segment.time_range().into());
    }

    /// Record a fixed event together with its trailing break.
    pub fn add_event(&mut self, event: &FixedEvent, break_minutes: i64) {
        self.add(event.date, event.occupied_range(break_minutes).into());
    }

    /// Treat everything before `instant` as busy.
    pub fn block_before(&mut self, instant: NaiveDateTime) {
        self.not_before = Some(instant);
    }

    /// Busy intervals of one date, including the `block_before` cut-off.
    pub fn intervals(&self, date: NaiveDate) -> Vec<BusyInterval> {
        let mut intervals = self.by_date.get(&date).cloned().unwrap_or_default();
        if let Some(cutoff) = self.not_before {
            if date < cutoff.date() {
                intervals.push(BusyInterval::new(0, MINUTES_PER_DAY));
            } else if date == cutoff.date() {
                intervals.push(BusyInterval::new(0, minutes_of_day(cutoff.time())));
            }
        }
        intervals
    }

    pub fn free_slots(&self, date: NaiveDate, work_start: i64, work_end: i64) -> Vec<FreeSlot> {
        find_free_slots(&self.intervals(date), work_start, work_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::clock::{parse_date, parse_time_of_day};

    fn day() -> NaiveDate {
        parse_date("2026-10-19").unwrap()
    }

    #[test]
    fn untimed_tasks_are_not_busy() {
        let mut map = BusyMap::new();
        map.add_task(&Task::new("u", "floating", day()));
        assert!(map.intervals(day()).is_empty());
    }

    #[test]
    fn events_include_break() {
        let mut map = BusyMap::new();
        let event = FixedEvent::new(
            "u",
            "Sync",
            day(),
            parse_time_of_day("10:00").unwrap(),
            parse_time_of_day("11:00").unwrap(),
        );
        map.add_event(&event, 15);
        let slots = map.free_slots(day(), 540, 1020);
        assert_eq!(slots[0].end, 600);
        assert_eq!(slots[1].start, 675);
    }

    #[test]
    fn cutoff_blocks_earlier_time() {
        let mut map = BusyMap::new();
        map.block_before(day().and_time(parse_time_of_day("13:30").unwrap()));
        let slots = map.free_slots(day(), 540, 1020);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, 810);

        let earlier = parse_date("2026-10-16").unwrap();
        assert!(map.free_slots(earlier, 540, 1020).is_empty());

        let later = parse_date("2026-10-20").unwrap();
        assert_eq!(map.free_slots(later, 540, 1020)[0].start, 540);
    }
}
