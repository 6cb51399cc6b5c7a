//! Authoritative roster: per-slot occupants kept in lockstep with worker history.

use chrono::NaiveDate;
use thiserror::Error;

use crate::calendar::date_range;
use crate::config::ShiftPolicy;
use crate::generator::RosterError;
use crate::interner::{WorkerIdx, WorkerInterner};
use crate::models::{ShiftType, Worker, WorkerRole};

/// Errors returned by rejected schedule mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssignError {
    #[error("Date {0} is outside the schedule range")]
    OutOfRange(NaiveDate),
    #[error("Shift {0} is not staffed by the policy")]
    InactiveShift(ShiftType),
    #[error("Technologist slot {0} {1} is full")]
    SlotFull(NaiveDate, ShiftType),
    #[error("Engineer slot {0} {1} is already taken")]
    EngineerSlotTaken(NaiveDate, ShiftType),
    #[error("Worker {0} already works on {1}")]
    AlreadyWorking(String, NaiveDate),
    #[error("Worker {0} is not assigned to {1} {2}")]
    NotAssigned(String, NaiveDate, ShiftType),
    #[error("Unknown worker handle {0}")]
    UnknownWorker(WorkerIdx),
}

/// Occupants of one (date, shift) slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotRoster {
    pub technologists: Vec<WorkerIdx>,
    pub engineer: Option<WorkerIdx>,
}

impl SlotRoster {
    pub fn contains(&self, idx: WorkerIdx) -> bool {
        self.engineer == Some(idx) || self.technologists.contains(&idx)
    }

    pub fn occupants(&self) -> impl Iterator<Item = WorkerIdx> + '_ {
        self.technologists.iter().copied().chain(self.engineer)
    }
}

/// The full date range's shift rosters plus the workers that fill them.
///
/// Mutated only through [`Schedule::assign`] and [`Schedule::remove`], which
/// update the worker's shift history at the same time.
#[derive(Clone, Debug)]
pub struct Schedule {
    start: NaiveDate,
    end: NaiveDate,
    policy: ShiftPolicy,
    /// One entry per date, indexed by [`ShiftType::index`]
    days: Vec<[SlotRoster; 3]>,
    workers: Vec<Worker>,
    interner: WorkerInterner,
}

impl Schedule {
    /// Create an empty schedule, rejecting structurally invalid input.
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        technologists: Vec<Worker>,
        engineers: Vec<Worker>,
        policy: ShiftPolicy,
    ) -> Result<Self, RosterError> {
        if end < start {
            return Err(RosterError::InvalidDateRange { start, end });
        }
        if technologists.is_empty() {
            return Err(RosterError::EmptyWorkerPool(WorkerRole::Technologist));
        }
        if engineers.is_empty() {
            return Err(RosterError::EmptyWorkerPool(WorkerRole::Engineer));
        }

        let total = technologists.len() + engineers.len();
        let mut interner = WorkerInterner::with_capacity(total);
        let mut workers = Vec::with_capacity(total);
        let pools = [
            (WorkerRole::Technologist, technologists),
            (WorkerRole::Engineer, engineers),
        ];
        for (role, pool) in pools {
            for worker in pool {
                if worker.role != role {
                    return Err(RosterError::RoleMismatch(worker.display_id()));
                }
                if !worker.shifts().is_empty() {
                    return Err(RosterError::PreassignedWorker(worker.display_id()));
                }
                if interner.intern_new(&worker.display_id()).is_none() {
                    return Err(RosterError::DuplicateWorker(worker.display_id()));
                }
                workers.push(worker);
            }
        }

        let num_days = (end - start).num_days() as usize + 1;
        Ok(Self {
            start,
            end,
            policy,
            days: vec![Default::default(); num_days],
            workers,
            interner,
        })
    }

    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[inline]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    #[inline]
    pub fn policy(&self) -> &ShiftPolicy {
        &self.policy
    }

    pub fn num_days(&self) -> usize {
        self.days.len()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        date_range(self.start, self.end)
    }

    #[inline]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    fn day_offset(&self, date: NaiveDate) -> Option<usize> {
        if self.contains_date(date) {
            Some((date - self.start).num_days() as usize)
        } else {
            None
        }
    }

    pub fn slot(&self, date: NaiveDate, shift: ShiftType) -> Option<&SlotRoster> {
        self.day_offset(date).map(|i| &self.days[i][shift.index()])
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Worker behind a handle issued by this schedule.
    #[inline]
    pub fn worker(&self, idx: WorkerIdx) -> &Worker {
        &self.workers[idx as usize]
    }

    /// Handles of every worker with `role`, in roster order.
    pub fn worker_indices(&self, role: WorkerRole) -> Vec<WorkerIdx> {
        self.workers
            .iter()
            .enumerate()
            .filter(|(_, w)| w.role == role)
            .map(|(i, _)| i as WorkerIdx)
            .collect()
    }

    pub fn find_worker(&self, display_id: &str) -> Option<WorkerIdx> {
        self.interner.get(display_id)
    }

    pub fn display_id(&self, idx: WorkerIdx) -> String {
        self.interner
            .resolve(idx)
            .map_or_else(|| format!("#{}", idx), str::to_string)
    }

    pub fn technologist_count(&self, date: NaiveDate, shift: ShiftType) -> usize {
        self.slot(date, shift).map_or(0, |s| s.technologists.len())
    }

    pub fn has_engineer(&self, date: NaiveDate, shift: ShiftType) -> bool {
        self.slot(date, shift).is_some_and(|s| s.engineer.is_some())
    }

    /// Open positions for `role` in the slot.
    pub fn open_positions(&self, date: NaiveDate, shift: ShiftType, role: WorkerRole) -> usize {
        match role {
            WorkerRole::Technologist => self
                .policy
                .required_technologists(shift)
                .saturating_sub(self.technologist_count(date, shift)),
            WorkerRole::Engineer => {
                usize::from(self.policy.needs_engineer(shift) && !self.has_engineer(date, shift))
            }
        }
    }

    /// Every (date, shift, worker) assignment in date and shift order.
    pub fn assignments(&self) -> impl Iterator<Item = (NaiveDate, ShiftType, WorkerIdx)> + '_ {
        self.dates().zip(self.days.iter()).flat_map(|(date, slots)| {
            ShiftType::ALL.into_iter().flat_map(move |shift| {
                slots[shift.index()]
                    .occupants()
                    .map(move |idx| (date, shift, idx))
            })
        })
    }

    /// Add a designated day off. Returns false if it was already present.
    pub fn add_day_off(&mut self, idx: WorkerIdx, date: NaiveDate) -> bool {
        self.workers[idx as usize].days_off.insert(date)
    }

    /// Remove a designated day off. Returns false if it was not present.
    pub fn remove_day_off(&mut self, idx: WorkerIdx, date: NaiveDate) -> bool {
        self.workers[idx as usize].days_off.remove(&date)
    }

    /// Assign a worker to a slot according to their role.
    ///
    /// Day-off and labor rules are the caller's concern; this only guards the
    /// structural invariants (capacity, one engineer, one shift per day).
    pub fn assign(
        &mut self,
        idx: WorkerIdx,
        date: NaiveDate,
        shift: ShiftType,
    ) -> Result<(), AssignError> {
        let offset = self.day_offset(date).ok_or(AssignError::OutOfRange(date))?;
        if !self.policy.is_active(shift) {
            return Err(AssignError::InactiveShift(shift));
        }
        let worker = self
            .workers
            .get(idx as usize)
            .ok_or(AssignError::UnknownWorker(idx))?;
        if worker.works_on(date) {
            return Err(AssignError::AlreadyWorking(worker.display_id(), date));
        }

        let slot = &mut self.days[offset][shift.index()];
        match worker.role {
            WorkerRole::Technologist => {
                if slot.technologists.len() >= self.policy.required_technologists(shift) {
                    return Err(AssignError::SlotFull(date, shift));
                }
                slot.technologists.push(idx);
            }
            WorkerRole::Engineer => {
                if slot.engineer.is_some() || !self.policy.needs_engineer(shift) {
                    return Err(AssignError::EngineerSlotTaken(date, shift));
                }
                slot.engineer = Some(idx);
            }
        }
        self.workers[idx as usize].record_shift(date, shift);
        Ok(())
    }

    /// Release a worker from a slot.
    pub fn remove(
        &mut self,
        idx: WorkerIdx,
        date: NaiveDate,
        shift: ShiftType,
    ) -> Result<(), AssignError> {
        let offset = self.day_offset(date).ok_or(AssignError::OutOfRange(date))?;
        let worker = self
            .workers
            .get(idx as usize)
            .ok_or(AssignError::UnknownWorker(idx))?;
        let not_assigned = || AssignError::NotAssigned(worker.display_id(), date, shift);

        let slot = &mut self.days[offset][shift.index()];
        match worker.role {
            WorkerRole::Technologist => {
                let pos = slot
                    .technologists
                    .iter()
                    .position(|&w| w == idx)
                    .ok_or_else(not_assigned)?;
                slot.technologists.remove(pos);
            }
            WorkerRole::Engineer => {
                if slot.engineer != Some(idx) {
                    return Err(not_assigned());
                }
                slot.engineer = None;
            }
        }
        self.workers[idx as usize].forget_shift(date, shift);
        Ok(())
    }
}
