//! Three-phase roster generation with optional post-processing.

use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::calendar::{CriticalDays, HolidayCalendar};
use crate::config::{RosterConfig, ShiftPolicy};
use crate::models::{ShiftType, Violation, ViolationKind, Worker, WorkerRole};
use crate::postprocess::{
    balance_workload, ensure_weekly_days_off, fix_schedule_issues, optimize_fairness,
    resolve_constraint_violations, validate_schedule, verify_weekly_days_off,
};
use crate::roster::{RosterState, Schedule};
use crate::{log_changes, log_checks};

use super::filler::SlotFiller;

/// Errors that reject a generation request before any assignment is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("No {0}s supplied")]
    EmptyWorkerPool(WorkerRole),
    #[error("Duplicate worker: {0}")]
    DuplicateWorker(String),
    #[error("Worker {0} supplied in the wrong role pool")]
    RoleMismatch(String),
    #[error("Worker {0} already has assigned shifts")]
    PreassignedWorker(String),
    #[error("Unknown shift type: {0}")]
    UnknownShiftType(String),
    #[error("Shift policy staffs no shift types")]
    EmptyPolicy,
    #[error("Shift {0} appears more than once in the policy")]
    DuplicateShift(String),
}

/// Fill state of a slot at the end of generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Unfilled,
    PartiallyFilled,
    Filled,
    /// Filled, but only through forced assignment
    ForcedFilled,
}

impl SlotState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unfilled => "unfilled",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::ForcedFilled => "forced_filled",
        }
    }
}

/// Everything learned while generating, alongside the schedule itself.
#[derive(Clone, Debug, Default)]
pub struct RosterReport {
    /// Final validation findings, including missing weekly days off
    pub violations: Vec<Violation>,
    /// Degradations logged during generation
    pub events: Vec<Violation>,
    pub slot_states: Vec<(NaiveDate, ShiftType, SlotState)>,
    pub days_off_granted: usize,
    pub balance_moves: usize,
    pub fairness_moves: usize,
    pub repaired_slots: usize,
    pub resolved_violations: usize,
}

impl RosterReport {
    pub fn weekly_days_off_ok(&self) -> bool {
        !self
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::MissingWeeklyDayOff)
    }

    pub fn coverage_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.kind.is_coverage())
    }

    pub fn day_off_losses(&self) -> impl Iterator<Item = &Violation> {
        self.events
            .iter()
            .filter(|e| e.kind == ViolationKind::DayOffLoss)
    }

    pub fn slot_state(&self, date: NaiveDate, shift: ShiftType) -> Option<SlotState> {
        self.slot_states
            .iter()
            .find(|(d, s, _)| *d == date && *s == shift)
            .map(|(_, _, state)| *state)
    }
}

/// Result of a generation run.
#[derive(Clone, Debug)]
pub struct RosterOutcome {
    pub schedule: Schedule,
    pub report: RosterReport,
}

/// Builds a roster for a date range.
///
/// Phases, all walking dates critical-first:
/// 1. engineers, ranked by load
/// 2. night technologists, ranked by load
/// 3. every remaining slot through the proactive filling chain
///
/// Post-processing (weekly days off, balancing, fairness, repair, breach
/// resolution) follows when enabled, and final validation always runs.
pub struct ScheduleGenerator {
    state: RosterState,
    config: RosterConfig,
    critical: CriticalDays,
    order: Vec<NaiveDate>,
}

impl ScheduleGenerator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        technologists: Vec<Worker>,
        engineers: Vec<Worker>,
        config: RosterConfig,
        policy: ShiftPolicy,
        holidays: &dyn HolidayCalendar,
    ) -> Result<Self, RosterError> {
        let schedule = Schedule::new(start, end, technologists, engineers, policy)?;
        let critical = CriticalDays::identify(start, end, holidays);
        let order = critical.processing_order(start, end);
        let state = RosterState::new(schedule, config.verbosity);
        Ok(Self {
            state,
            config,
            critical,
            order,
        })
    }

    pub fn critical_days(&self) -> &CriticalDays {
        &self.critical
    }

    pub fn processing_order(&self) -> &[NaiveDate] {
        &self.order
    }

    pub fn generate(self) -> RosterOutcome {
        let Self {
            mut state,
            config,
            critical,
            order,
        } = self;
        let filler = SlotFiller::new(&config, &critical);
        let verbosity = config.verbosity;
        let mut report = RosterReport::default();

        log_checks!(
            verbosity,
            "Generating roster {} to {} ({} critical days, {} logging)",
            state.schedule().start(),
            state.schedule().end(),
            critical.len(),
            crate::logging::level_name(verbosity)
        );

        log_checks!(verbosity, "Phase 1: engineers");
        assign_engineers(&mut state, &filler, &order);
        log_checks!(verbosity, "Phase 2: night technologists");
        assign_night_technologists(&mut state, &filler, &order);
        log_checks!(verbosity, "Phase 3: remaining slots");
        let forced = fill_remaining(&mut state, &filler, &order);

        if config.post_process {
            log_checks!(verbosity, "Post-processing");
            report.days_off_granted = ensure_weekly_days_off(&mut state, &filler);
            report.balance_moves = balance_workload(&mut state, &filler);
            report.fairness_moves = optimize_fairness(&mut state, &filler);
            report.repaired_slots = fix_schedule_issues(&mut state, &filler, &order);
            report.resolved_violations = resolve_constraint_violations(&mut state, filler.checker());
        }

        let mut violations = validate_schedule(state.schedule(), filler.checker());
        violations.extend(verify_weekly_days_off(
            state.schedule(),
            config.days_off_per_week,
        ));
        report.violations = violations;
        report.slot_states = slot_states(state.schedule(), &forced);

        log_changes!(
            verbosity,
            "Roster done: {} violations, {} degradations logged",
            report.violations.len(),
            state.events().len()
        );

        let (schedule, events) = state.into_parts();
        report.events = events;
        RosterOutcome { schedule, report }
    }
}

fn assign_engineers(state: &mut RosterState, filler: &SlotFiller, order: &[NaiveDate]) {
    let shifts: Vec<ShiftType> = state
        .schedule()
        .policy()
        .shift_types()
        .filter(|&s| state.schedule().policy().needs_engineer(s))
        .collect();
    for &date in order {
        for &shift in &shifts {
            filler.fill_by_load(state, date, shift, WorkerRole::Engineer);
        }
    }
}

fn assign_night_technologists(state: &mut RosterState, filler: &SlotFiller, order: &[NaiveDate]) {
    if !state.schedule().policy().is_active(ShiftType::Night) {
        return;
    }
    for &date in order {
        filler.fill_by_load(state, date, ShiftType::Night, WorkerRole::Technologist);
    }
}

/// Run the full filling chain on every slot, engineer first. Returns the slots
/// that needed forced assignment.
fn fill_remaining(
    state: &mut RosterState,
    filler: &SlotFiller,
    order: &[NaiveDate],
) -> FxHashSet<(NaiveDate, ShiftType)> {
    let shifts: Vec<ShiftType> = state.schedule().policy().shift_types().collect();
    let mut forced = FxHashSet::default();
    for &date in order {
        for &shift in &shifts {
            let engineer = filler.fill(state, date, shift, WorkerRole::Engineer);
            let technologists = filler.fill(state, date, shift, WorkerRole::Technologist);
            if engineer.forced + technologists.forced > 0 {
                forced.insert((date, shift));
            }
        }
    }
    forced
}

fn slot_states(
    schedule: &Schedule,
    forced: &FxHashSet<(NaiveDate, ShiftType)>,
) -> Vec<(NaiveDate, ShiftType, SlotState)> {
    let policy = schedule.policy();
    let mut states = Vec::with_capacity(schedule.num_days() * 3);
    for date in schedule.dates() {
        for shift in policy.shift_types() {
            let count = schedule.technologist_count(date, shift);
            let engineer = schedule.has_engineer(date, shift);
            let tech_open = schedule.open_positions(date, shift, WorkerRole::Technologist);
            let eng_open = schedule.open_positions(date, shift, WorkerRole::Engineer);
            let state = if tech_open == 0 && eng_open == 0 {
                if forced.contains(&(date, shift)) {
                    SlotState::ForcedFilled
                } else {
                    SlotState::Filled
                }
            } else if count == 0 && !engineer {
                SlotState::Unfilled
            } else {
                SlotState::PartiallyFilled
            };
            states.push((date, shift, state));
        }
    }
    states
}
