//! Rust implementation of the shift roster generator.
//!
//! This module provides the generation engine and a thin Python binding that
//! converts inputs and outputs around it.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::prelude::*;
use std::collections::HashMap;

pub mod calendar;
mod config;
pub mod generator;
pub mod interner;
pub mod logging;
mod models;
pub mod postprocess;
pub mod roster;

pub use calendar::{CriticalDays, HolidayCalendar, HolidaySet, NoHolidays, RecurringHolidays};
pub use config::{ImpactWeights, RosterConfig, ShiftPolicy, ShiftRequirement};
pub use generator::{RosterError, RosterOutcome, RosterReport, ScheduleGenerator, SlotState};
pub use models::{
    timeline_position, Assignment, ShiftType, Violation, ViolationKind, Worker, WorkerRole,
};

/// Worker input (PyO3 wrapper). The role is given by the pool it is passed in.
#[pyclass(name = "Worker")]
#[derive(Clone, Debug)]
pub struct PyWorker {
    #[pyo3(get, set)]
    pub id: u32,
    #[pyo3(get, set)]
    pub days_off: Vec<NaiveDate>,
}

#[pymethods]
impl PyWorker {
    #[new]
    #[pyo3(signature = (id, days_off=Vec::new()))]
    fn new(id: u32, days_off: Vec<NaiveDate>) -> Self {
        Self { id, days_off }
    }

    fn __repr__(&self) -> String {
        format!("Worker(id={}, days_off={:?})", self.id, self.days_off)
    }
}

impl PyWorker {
    fn into_worker(self, role: WorkerRole) -> Worker {
        Worker::new(self.id, role).with_days_off(self.days_off)
    }
}

/// Finished roster and its report, flattened for Python.
#[pyclass]
#[derive(Clone, Debug)]
pub struct RosterResult {
    #[pyo3(get)]
    pub assignments: Vec<Assignment>,
    #[pyo3(get)]
    pub violations: Vec<Violation>,
    /// Degradations logged during generation (day-off losses, forced moves)
    #[pyo3(get)]
    pub events: Vec<Violation>,
    /// Final designated days off per worker display ID
    #[pyo3(get)]
    pub days_off: HashMap<String, Vec<NaiveDate>>,
    /// (date, shift, state) for every staffed slot
    #[pyo3(get)]
    pub slot_states: Vec<(NaiveDate, String, String)>,
    #[pyo3(get)]
    pub weekly_days_off_ok: bool,
    #[pyo3(get)]
    pub metadata: HashMap<String, String>,
}

impl RosterResult {
    fn from_outcome(outcome: RosterOutcome) -> Self {
        let RosterOutcome { schedule, report } = outcome;

        let assignments = schedule
            .assignments()
            .map(|(date, shift, idx)| Assignment {
                date,
                shift: shift.name().to_string(),
                worker_id: schedule.display_id(idx),
                role: schedule.worker(idx).role.name().to_string(),
            })
            .collect();
        let days_off = schedule
            .workers()
            .iter()
            .map(|w| (w.display_id(), w.days_off.iter().copied().collect()))
            .collect();
        let slot_states = report
            .slot_states
            .iter()
            .map(|(date, shift, state)| (*date, shift.name().to_string(), state.as_str().to_string()))
            .collect();

        let mut metadata = HashMap::new();
        metadata.insert("start".to_string(), schedule.start().to_string());
        metadata.insert("end".to_string(), schedule.end().to_string());
        metadata.insert("days_off_granted".to_string(), report.days_off_granted.to_string());
        metadata.insert("balance_moves".to_string(), report.balance_moves.to_string());
        metadata.insert("fairness_moves".to_string(), report.fairness_moves.to_string());
        metadata.insert("repaired_slots".to_string(), report.repaired_slots.to_string());
        metadata.insert(
            "resolved_violations".to_string(),
            report.resolved_violations.to_string(),
        );

        Self {
            assignments,
            weekly_days_off_ok: report.weekly_days_off_ok(),
            violations: report.violations,
            events: report.events,
            days_off,
            slot_states,
            metadata,
        }
    }
}

#[pymethods]
impl RosterResult {
    fn __repr__(&self) -> String {
        format!(
            "RosterResult(assignments={}, violations={}, events={}, weekly_days_off_ok={})",
            self.assignments.len(),
            self.violations.len(),
            self.events.len(),
            self.weekly_days_off_ok
        )
    }
}

/// Generate a roster for `start..=end`.
///
/// # Arguments
/// * `technologists` / `engineers` - Worker pools; IDs must be unique per role
/// * `config` - Generation settings, defaults when omitted
/// * `policy` - Staffed shift types; Morning 5, Afternoon 5, Night 2 when omitted
/// * `holidays` - Explicit holiday dates, treated as critical days
/// * `colombian_holidays` - Also use the built-in recurring Colombian calendar
///
/// # Raises
/// * ValueError on an invalid date range, empty pools, duplicate workers or a bad policy
#[pyfunction]
#[pyo3(signature = (start, end, technologists, engineers, config=None, policy=None, holidays=Vec::new(), colombian_holidays=false))]
#[allow(clippy::too_many_arguments)]
fn generate_roster(
    start: NaiveDate,
    end: NaiveDate,
    technologists: Vec<PyWorker>,
    engineers: Vec<PyWorker>,
    config: Option<RosterConfig>,
    policy: Option<Vec<ShiftRequirement>>,
    holidays: Vec<NaiveDate>,
    colombian_holidays: bool,
) -> PyResult<RosterResult> {
    let to_py = |e: RosterError| pyo3::exceptions::PyValueError::new_err(e.to_string());

    let policy = match policy {
        Some(requirements) => ShiftPolicy::new(requirements).map_err(to_py)?,
        None => ShiftPolicy::default(),
    };
    let technologists = technologists
        .into_iter()
        .map(|w| w.into_worker(WorkerRole::Technologist))
        .collect();
    let engineers = engineers
        .into_iter()
        .map(|w| w.into_worker(WorkerRole::Engineer))
        .collect();

    let explicit = HolidaySet::new(holidays);
    let recurring = RecurringHolidays::colombia_2025();
    let calendar = CombinedCalendar {
        explicit: &explicit,
        recurring: colombian_holidays.then_some(&recurring),
    };

    let generator = ScheduleGenerator::new(
        start,
        end,
        technologists,
        engineers,
        config.unwrap_or_default(),
        policy,
        &calendar,
    )
    .map_err(to_py)?;
    Ok(RosterResult::from_outcome(generator.generate()))
}

struct CombinedCalendar<'a> {
    explicit: &'a HolidaySet,
    recurring: Option<&'a RecurringHolidays>,
}

impl HolidayCalendar for CombinedCalendar<'_> {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.explicit.is_holiday(date) || self.recurring.is_some_and(|r| r.is_holiday(date))
    }
}

/// The roster.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Data types
    m.add_class::<PyWorker>()?;
    m.add_class::<Assignment>()?;
    m.add_class::<Violation>()?;
    m.add_class::<RosterResult>()?;

    // Config types
    m.add_class::<RosterConfig>()?;
    m.add_class::<ImpactWeights>()?;
    m.add_class::<ShiftRequirement>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(generate_roster, m)?)?;

    Ok(())
}
