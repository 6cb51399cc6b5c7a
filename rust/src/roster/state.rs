//! Mutable generation state shared by every phase and post-processor.

use chrono::NaiveDate;

use crate::interner::WorkerIdx;
use crate::models::{ShiftType, Violation, ViolationKind};
use crate::{log_changes, log_checks};

use super::date_index::DateIndex;
use super::schedule::{AssignError, Schedule};

/// Schedule, its date index, and the degradations logged along the way.
///
/// All mutations go through this type so the index is refreshed for every
/// touched date.
#[derive(Clone, Debug)]
pub struct RosterState {
    schedule: Schedule,
    index: DateIndex,
    events: Vec<Violation>,
    verbosity: u8,
}

impl RosterState {
    pub fn new(schedule: Schedule, verbosity: u8) -> Self {
        let index = DateIndex::build(&schedule);
        Self {
            schedule,
            index,
            events: Vec::new(),
            verbosity,
        }
    }

    #[inline]
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    #[inline]
    pub fn index(&self) -> &DateIndex {
        &self.index
    }

    #[inline]
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn events(&self) -> &[Violation] {
        &self.events
    }

    pub fn assign(
        &mut self,
        idx: WorkerIdx,
        date: NaiveDate,
        shift: ShiftType,
    ) -> Result<(), AssignError> {
        self.schedule.assign(idx, date, shift)?;
        self.index.refresh(&self.schedule, date);
        log_changes!(
            self.verbosity,
            "  Assigned {} to {} {}",
            self.schedule.display_id(idx),
            date,
            shift
        );
        Ok(())
    }

    pub fn release(
        &mut self,
        idx: WorkerIdx,
        date: NaiveDate,
        shift: ShiftType,
    ) -> Result<(), AssignError> {
        self.schedule.remove(idx, date, shift)?;
        self.index.refresh(&self.schedule, date);
        log_changes!(
            self.verbosity,
            "  Released {} from {} {}",
            self.schedule.display_id(idx),
            date,
            shift
        );
        Ok(())
    }

    /// Assign, logging a rejected mutation at checks level instead of failing.
    pub fn try_assign(&mut self, idx: WorkerIdx, date: NaiveDate, shift: ShiftType) -> bool {
        match self.assign(idx, date, shift) {
            Ok(()) => true,
            Err(e) => {
                log_checks!(self.verbosity, "  Assignment rejected: {}", e);
                false
            }
        }
    }

    /// Mark a designated day off.
    pub fn grant_day_off(&mut self, idx: WorkerIdx, date: NaiveDate) -> bool {
        let added = self.schedule.add_day_off(idx, date);
        if added {
            log_changes!(
                self.verbosity,
                "  Day off {} granted to {}",
                date,
                self.schedule.display_id(idx)
            );
        }
        added
    }

    /// Consume a designated day off to cover a slot, logging the loss.
    pub fn consume_day_off(&mut self, idx: WorkerIdx, date: NaiveDate, shift: ShiftType) -> bool {
        if !self.schedule.remove_day_off(idx, date) {
            return false;
        }
        let worker = self.schedule.display_id(idx);
        log_changes!(self.verbosity, "  Day off {} lost by {} for {}", date, worker, shift);
        self.events.push(Violation::new(
            ViolationKind::DayOffLoss,
            date,
            Some(shift),
            vec![worker],
            format!("designated day off consumed to cover {} shift", shift),
        ));
        true
    }

    pub fn record(&mut self, event: Violation) {
        self.events.push(event);
    }

    /// Hand back the schedule and the accumulated events.
    pub fn into_parts(self) -> (Schedule, Vec<Violation>) {
        (self.schedule, self.events)
    }
}
