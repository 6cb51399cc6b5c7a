//! Per-day occupancy cache over a [`Schedule`].

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::interner::WorkerIdx;
use crate::models::ShiftType;

use super::schedule::{Schedule, SlotRoster};

/// Snapshot of one day's slots.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DaySnapshot {
    pub slots: [SlotRoster; 3],
    /// Everyone holding any shift that day
    pub working: FxHashSet<WorkerIdx>,
}

/// Date-keyed view of slot occupants.
///
/// The [`Schedule`] stays authoritative; call [`DateIndex::refresh`] for every
/// date a mutation touches.
#[derive(Clone, Debug, Default)]
pub struct DateIndex {
    days: FxHashMap<NaiveDate, DaySnapshot>,
}

impl DateIndex {
    pub fn build(schedule: &Schedule) -> Self {
        let mut index = Self {
            days: FxHashMap::with_capacity_and_hasher(schedule.num_days(), Default::default()),
        };
        for date in schedule.dates() {
            index.refresh(schedule, date);
        }
        index
    }

    /// Re-read one date from the schedule.
    pub fn refresh(&mut self, schedule: &Schedule, date: NaiveDate) {
        if !schedule.contains_date(date) {
            self.days.remove(&date);
            return;
        }
        let mut snapshot = DaySnapshot::default();
        for shift in ShiftType::ALL {
            if let Some(slot) = schedule.slot(date, shift) {
                snapshot.working.extend(slot.occupants());
                snapshot.slots[shift.index()] = slot.clone();
            }
        }
        self.days.insert(date, snapshot);
    }

    #[inline]
    pub fn day(&self, date: NaiveDate) -> Option<&DaySnapshot> {
        self.days.get(&date)
    }

    pub fn occupants(&self, date: NaiveDate, shift: ShiftType) -> Option<&SlotRoster> {
        self.day(date).map(|day| &day.slots[shift.index()])
    }

    pub fn technologist_count(&self, date: NaiveDate, shift: ShiftType) -> usize {
        self.occupants(date, shift).map_or(0, |s| s.technologists.len())
    }

    pub fn has_engineer(&self, date: NaiveDate, shift: ShiftType) -> bool {
        self.occupants(date, shift).is_some_and(|s| s.engineer.is_some())
    }

    #[inline]
    pub fn is_working(&self, date: NaiveDate, idx: WorkerIdx) -> bool {
        self.day(date).is_some_and(|day| day.working.contains(&idx))
    }

    pub fn working_count(&self, date: NaiveDate) -> usize {
        self.day(date).map_or(0, |day| day.working.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShiftPolicy;
    use crate::models::Worker;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_refresh_tracks_schedule_mutations() {
        let mut schedule = Schedule::new(
            d(2025, 1, 1),
            d(2025, 1, 3),
            vec![Worker::technologist(1), Worker::technologist(2)],
            vec![Worker::engineer(1)],
            ShiftPolicy::default(),
        )
        .unwrap();
        let mut index = DateIndex::build(&schedule);
        let t1 = schedule.find_worker("T1").unwrap();
        let date = d(2025, 1, 2);

        schedule.assign(t1, date, ShiftType::Night).unwrap();
        assert!(!index.is_working(date, t1));
        index.refresh(&schedule, date);
        assert!(index.is_working(date, t1));
        assert_eq!(index.technologist_count(date, ShiftType::Night), 1);
        assert_eq!(index.working_count(date), 1);

        schedule.remove(t1, date, ShiftType::Night).unwrap();
        index.refresh(&schedule, date);
        assert!(!index.is_working(date, t1));
        assert_eq!(index.technologist_count(date, ShiftType::Night), 0);
    }

    #[test]
    fn test_out_of_range_dates_have_no_snapshot() {
        let schedule = Schedule::new(
            d(2025, 1, 1),
            d(2025, 1, 1),
            vec![Worker::technologist(1)],
            vec![Worker::engineer(1)],
            ShiftPolicy::default(),
        )
        .unwrap();
        let index = DateIndex::build(&schedule);
        assert!(index.day(d(2025, 1, 1)).is_some());
        assert!(index.day(d(2025, 1, 2)).is_none());
        assert!(!index.has_engineer(d(2025, 1, 2), ShiftType::Morning));
    }
}
