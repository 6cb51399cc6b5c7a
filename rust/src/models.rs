//! Core data types for the rostering system.

use chrono::{Datelike, NaiveDate};
use pyo3::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::generator::RosterError;

/// Daily shift types, in timeline order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShiftType {
    Morning,
    Afternoon,
    Night,
}

impl ShiftType {
    pub const ALL: [ShiftType; 3] = [ShiftType::Morning, ShiftType::Afternoon, ShiftType::Night];

    /// Position of the shift within its day (0..3).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Morning => 0,
            Self::Afternoon => 1,
            Self::Night => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Night => "night",
        }
    }

    /// Displacement priority, higher is more critical.
    pub fn priority(self) -> u8 {
        match self {
            Self::Night => 3,
            Self::Morning | Self::Afternoon => 2,
        }
    }

    /// How hard the shift is to staff.
    pub fn criticality(self) -> u32 {
        match self {
            Self::Morning => 1,
            Self::Afternoon => 2,
            Self::Night => 3,
        }
    }

    /// Start and end hour of the shift (Night wraps past midnight).
    pub fn hours(self) -> (u32, u32) {
        match self {
            Self::Morning => (6, 14),
            Self::Afternoon => (14, 22),
            Self::Night => (22, 6),
        }
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShiftType {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" | "mañana" | "manana" => Ok(Self::Morning),
            "afternoon" | "tarde" => Ok(Self::Afternoon),
            "night" | "noche" => Ok(Self::Night),
            _ => Err(RosterError::UnknownShiftType(s.to_string())),
        }
    }
}

/// Position of a shift on a global three-slots-per-day timeline.
///
/// The rest gap between two shifts is the absolute difference of their positions.
#[inline]
pub fn timeline_position(date: NaiveDate, shift: ShiftType) -> i64 {
    date.num_days_from_ce() as i64 * 3 + shift.index() as i64
}

/// Worker role. Technologists fill headcount, engineers supervise a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerRole {
    Technologist,
    Engineer,
}

impl WorkerRole {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Technologist => "T",
            Self::Engineer => "I",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Technologist => "technologist",
            Self::Engineer => "engineer",
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A rostered worker with their assignment history and designated days off.
///
/// The shift history is sorted by (date, shift) and holds at most one shift per
/// date. Only [`crate::roster::Schedule`] mutates it, so the per-slot and
/// per-worker views never diverge.
#[derive(Clone, Debug, PartialEq)]
pub struct Worker {
    pub id: u32,
    pub role: WorkerRole,
    pub days_off: BTreeSet<NaiveDate>,
    shifts: Vec<(NaiveDate, ShiftType)>,
}

impl Worker {
    pub fn new(id: u32, role: WorkerRole) -> Self {
        Self {
            id,
            role,
            days_off: BTreeSet::new(),
            shifts: Vec::new(),
        }
    }

    pub fn technologist(id: u32) -> Self {
        Self::new(id, WorkerRole::Technologist)
    }

    pub fn engineer(id: u32) -> Self {
        Self::new(id, WorkerRole::Engineer)
    }

    pub fn with_days_off(mut self, days: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.days_off.extend(days);
        self
    }

    /// Formatted ID, e.g. `T3` or `I1`.
    pub fn display_id(&self) -> String {
        format!("{}{}", self.role.prefix(), self.id)
    }

    pub fn shifts(&self) -> &[(NaiveDate, ShiftType)] {
        &self.shifts
    }

    /// Shifts dated within `from..=to`, using binary search on the sorted history.
    pub fn shifts_between(&self, from: NaiveDate, to: NaiveDate) -> &[(NaiveDate, ShiftType)] {
        let lo = self.shifts.partition_point(|(d, _)| *d < from);
        let hi = self.shifts.partition_point(|(d, _)| *d <= to);
        if lo >= hi {
            return &[];
        }
        &self.shifts[lo..hi]
    }

    #[inline]
    pub fn total_shifts(&self) -> usize {
        self.shifts.len()
    }

    pub fn shift_type_count(&self, shift: ShiftType) -> usize {
        self.shifts.iter().filter(|(_, s)| *s == shift).count()
    }

    /// Counts indexed by [`ShiftType::index`].
    pub fn shift_type_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for (_, shift) in &self.shifts {
            counts[shift.index()] += 1;
        }
        counts
    }

    pub fn shift_on(&self, date: NaiveDate) -> Option<ShiftType> {
        self.shifts
            .binary_search_by(|(d, _)| d.cmp(&date))
            .ok()
            .map(|i| self.shifts[i].1)
    }

    #[inline]
    pub fn works_on(&self, date: NaiveDate) -> bool {
        self.shift_on(date).is_some()
    }

    #[inline]
    pub fn is_day_off(&self, date: NaiveDate) -> bool {
        self.days_off.contains(&date)
    }

    pub fn days_off_between(&self, from: NaiveDate, to: NaiveDate) -> usize {
        self.days_off.range(from..=to).count()
    }

    /// Copy of this worker as if it also held `(date, shift)`.
    pub fn with_hypothetical_shift(&self, date: NaiveDate, shift: ShiftType) -> Self {
        let mut copy = self.clone();
        copy.record_shift(date, shift);
        copy
    }

    /// Copy of this worker with `(date, shift)` released.
    pub fn without_shift(&self, date: NaiveDate, shift: ShiftType) -> Self {
        let mut copy = self.clone();
        copy.forget_shift(date, shift);
        copy
    }

    pub(crate) fn record_shift(&mut self, date: NaiveDate, shift: ShiftType) {
        let idx = self.shifts.partition_point(|entry| *entry < (date, shift));
        self.shifts.insert(idx, (date, shift));
    }

    pub(crate) fn forget_shift(&mut self, date: NaiveDate, shift: ShiftType) -> bool {
        match self.shifts.binary_search(&(date, shift)) {
            Ok(idx) => {
                self.shifts.remove(idx);
                true
            }
            Err(_) => false,
        }
    }
}

/// Category of a reported violation or logged degradation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    TechnologistShortfall,
    MissingEngineer,
    Overstaffed,
    DoubleBooking,
    NightToDay,
    InadequateRest,
    ConsecutiveDays,
    DayOffWorked,
    DayOffLoss,
    Displacement,
    RelaxedAssignment,
    ForcedAssignment,
    MissingWeeklyDayOff,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TechnologistShortfall => "technologist_shortfall",
            Self::MissingEngineer => "missing_engineer",
            Self::Overstaffed => "overstaffed",
            Self::DoubleBooking => "double_booking",
            Self::NightToDay => "night_to_day",
            Self::InadequateRest => "inadequate_rest",
            Self::ConsecutiveDays => "consecutive_days",
            Self::DayOffWorked => "day_off_worked",
            Self::DayOffLoss => "day_off_loss",
            Self::Displacement => "displacement",
            Self::RelaxedAssignment => "relaxed_assignment",
            Self::ForcedAssignment => "forced_assignment",
            Self::MissingWeeklyDayOff => "missing_weekly_day_off",
        }
    }

    /// Understaffed slot.
    pub fn is_coverage(self) -> bool {
        matches!(self, Self::TechnologistShortfall | Self::MissingEngineer)
    }

    /// Labor rule breached by an existing assignment.
    pub fn is_constraint(self) -> bool {
        matches!(
            self,
            Self::NightToDay | Self::InadequateRest | Self::ConsecutiveDays | Self::DayOffWorked
        )
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reported violation: never stored as schedule state.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    pub kind: ViolationKind,
    #[pyo3(get)]
    pub date: NaiveDate,
    pub shift: Option<ShiftType>,
    /// Display IDs of the workers involved
    #[pyo3(get)]
    pub workers: Vec<String>,
    #[pyo3(get)]
    pub explanation: String,
}

impl Violation {
    pub fn new(
        kind: ViolationKind,
        date: NaiveDate,
        shift: Option<ShiftType>,
        workers: Vec<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            date,
            shift,
            workers,
            explanation: explanation.into(),
        }
    }

    pub fn involves(&self, display_id: &str) -> bool {
        self.workers.iter().any(|w| w == display_id)
    }
}

#[pymethods]
impl Violation {
    #[getter(kind)]
    fn py_kind(&self) -> &'static str {
        self.kind.as_str()
    }

    #[getter(shift)]
    fn py_shift(&self) -> Option<&'static str> {
        self.shift.map(ShiftType::name)
    }

    fn __repr__(&self) -> String {
        format!(
            "Violation(kind={}, date={}, shift={:?}, workers={:?})",
            self.kind,
            self.date,
            self.shift.map(ShiftType::name),
            self.workers
        )
    }
}

/// A single (date, shift, worker) assignment in the finished roster.
#[pyclass]
#[derive(Clone, Debug)]
pub struct Assignment {
    #[pyo3(get)]
    pub date: NaiveDate,
    #[pyo3(get)]
    pub shift: String,
    #[pyo3(get)]
    pub worker_id: String,
    #[pyo3(get)]
    pub role: String,
}

#[pymethods]
impl Assignment {
    fn __repr__(&self) -> String {
        format!(
            "Assignment(date={}, shift={}, worker_id={:?})",
            self.date, self.shift, self.worker_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_display_id_uses_role_prefix() {
        assert_eq!(Worker::technologist(3).display_id(), "T3");
        assert_eq!(Worker::engineer(1).display_id(), "I1");
    }

    #[test]
    fn test_shift_history_stays_sorted() {
        let mut w = Worker::technologist(1);
        w.record_shift(d(2025, 1, 5), ShiftType::Night);
        w.record_shift(d(2025, 1, 2), ShiftType::Morning);
        w.record_shift(d(2025, 1, 3), ShiftType::Afternoon);

        let dates: Vec<NaiveDate> = w.shifts().iter().map(|(d, _)| *d).collect();
        assert_eq!(dates, vec![d(2025, 1, 2), d(2025, 1, 3), d(2025, 1, 5)]);
        assert_eq!(w.shift_on(d(2025, 1, 5)), Some(ShiftType::Night));
        assert_eq!(w.shift_on(d(2025, 1, 4)), None);
        assert_eq!(w.shift_type_counts(), [1, 1, 1]);

        assert!(w.forget_shift(d(2025, 1, 3), ShiftType::Afternoon));
        assert!(!w.forget_shift(d(2025, 1, 3), ShiftType::Afternoon));
        assert_eq!(w.total_shifts(), 2);
    }

    #[test]
    fn test_shifts_between_is_inclusive() {
        let mut w = Worker::engineer(1);
        for day in 1..=6 {
            w.record_shift(d(2025, 1, day), ShiftType::Morning);
        }
        assert_eq!(w.shifts_between(d(2025, 1, 2), d(2025, 1, 4)).len(), 3);
        assert!(w.shifts_between(d(2025, 2, 1), d(2025, 2, 3)).is_empty());
    }

    #[test]
    fn test_hypothetical_shift_leaves_original_untouched() {
        let w = Worker::technologist(1);
        let hypo = w.with_hypothetical_shift(d(2025, 1, 1), ShiftType::Night);
        assert_eq!(w.total_shifts(), 0);
        assert_eq!(hypo.total_shifts(), 1);
        assert_eq!(hypo.without_shift(d(2025, 1, 1), ShiftType::Night).total_shifts(), 0);
    }

    #[test]
    fn test_shift_type_parsing() {
        assert_eq!("Night".parse::<ShiftType>().unwrap(), ShiftType::Night);
        assert_eq!("mañana".parse::<ShiftType>().unwrap(), ShiftType::Morning);
        assert!("evening".parse::<ShiftType>().is_err());
    }

    #[test]
    fn test_timeline_positions_are_three_per_day() {
        let night = timeline_position(d(2025, 1, 1), ShiftType::Night);
        let morning = timeline_position(d(2025, 1, 2), ShiftType::Morning);
        assert_eq!(morning - night, 1);
    }
}
