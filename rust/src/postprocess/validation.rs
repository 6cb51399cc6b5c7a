//! Read-only audit of a finished schedule.

use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use crate::generator::{EligibilityChecker, Strictness};
use crate::interner::WorkerIdx;
use crate::models::{timeline_position, ShiftType, Violation, ViolationKind};
use crate::roster::Schedule;

/// Every coverage and labor-rule violation in the schedule, never mutating it.
///
/// Coverage findings come first in date and shift order, followed by each
/// worker's rule breaches in roster order.
pub fn validate_schedule(schedule: &Schedule, checker: &EligibilityChecker) -> Vec<Violation> {
    let mut violations = coverage_violations(schedule);
    for idx in 0..schedule.workers().len() as WorkerIdx {
        violations.extend(worker_violations(schedule, checker, idx));
    }
    violations
}

fn coverage_violations(schedule: &Schedule) -> Vec<Violation> {
    let policy = schedule.policy();
    let mut violations = Vec::new();

    for date in schedule.dates() {
        let mut seen: FxHashSet<WorkerIdx> = FxHashSet::default();
        for shift in policy.shift_types() {
            let slot = match schedule.slot(date, shift) {
                Some(slot) => slot,
                None => continue,
            };
            let required = policy.required_technologists(shift);
            let count = slot.technologists.len();
            if count < required {
                violations.push(Violation::new(
                    ViolationKind::TechnologistShortfall,
                    date,
                    Some(shift),
                    Vec::new(),
                    format!("{} of {} technologists assigned", count, required),
                ));
            } else if count > required {
                violations.push(Violation::new(
                    ViolationKind::Overstaffed,
                    date,
                    Some(shift),
                    Vec::new(),
                    format!("{} technologists assigned, {} required", count, required),
                ));
            }
            if policy.needs_engineer(shift) && slot.engineer.is_none() {
                violations.push(Violation::new(
                    ViolationKind::MissingEngineer,
                    date,
                    Some(shift),
                    Vec::new(),
                    "no engineer assigned",
                ));
            }
            for idx in slot.occupants() {
                if !seen.insert(idx) {
                    violations.push(Violation::new(
                        ViolationKind::DoubleBooking,
                        date,
                        Some(shift),
                        vec![schedule.display_id(idx)],
                        "assigned to more than one shift that day",
                    ));
                }
            }
        }
    }
    violations
}

fn worker_violations(
    schedule: &Schedule,
    checker: &EligibilityChecker,
    idx: WorkerIdx,
) -> Vec<Violation> {
    let policy = schedule.policy();
    let worker = schedule.worker(idx);
    let id = worker.display_id();
    let strict_gap = checker.rest_gap(Strictness::Strict) as i64;
    let mut violations = Vec::new();

    for &(date, shift) in worker.shifts() {
        if worker.is_day_off(date) {
            violations.push(Violation::new(
                ViolationKind::DayOffWorked,
                date,
                Some(shift),
                vec![id.clone()],
                "works on a designated day off",
            ));
        }
    }

    for pair in worker.shifts().windows(2) {
        let (prev_date, prev_shift) = pair[0];
        let (date, shift) = pair[1];
        let next_day = prev_date.succ_opt() == Some(date);
        if prev_shift == ShiftType::Night && next_day && policy.is_daytime(shift) {
            violations.push(Violation::new(
                ViolationKind::NightToDay,
                date,
                Some(shift),
                vec![id.clone()],
                format!("{} shift right after a night shift", shift),
            ));
            continue;
        }
        let gap = timeline_position(date, shift) - timeline_position(prev_date, prev_shift);
        if gap > 0 && gap <= strict_gap {
            violations.push(Violation::new(
                ViolationKind::InadequateRest,
                date,
                Some(shift),
                vec![id.clone()],
                format!("only {} shift slots after {} {}", gap, prev_date, prev_shift),
            ));
        }
    }

    let max_run = checker.max_consecutive_days();
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for &(date, shift) in worker.shifts() {
        run = match previous {
            Some(p) if p == date => run,
            Some(p) if p.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        previous = Some(date);
        if run > max_run {
            violations.push(Violation::new(
                ViolationKind::ConsecutiveDays,
                date,
                Some(shift),
                vec![id.clone()],
                format!("day {} of a consecutive run (max {})", run, max_run),
            ));
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RosterConfig, ShiftPolicy, ShiftRequirement};
    use crate::models::{Worker, WorkerRole};

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn schedule() -> Schedule {
        let policy = ShiftPolicy::new(vec![
            ShiftRequirement::of(ShiftType::Morning, 1, true),
            ShiftRequirement::of(ShiftType::Night, 1, false),
        ])
        .unwrap();
        Schedule::new(
            d(2025, 1, 6),
            d(2025, 1, 15),
            vec![
                Worker::technologist(1).with_days_off([d(2025, 1, 9)]),
                Worker::technologist(2),
            ],
            vec![Worker::engineer(1)],
            policy,
        )
        .unwrap()
    }

    fn kinds(violations: &[Violation]) -> Vec<ViolationKind> {
        violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn test_empty_schedule_reports_every_slot() {
        let schedule = schedule();
        let checker = EligibilityChecker::from_config(&RosterConfig::default());
        let violations = validate_schedule(&schedule, &checker);

        let shortfalls = violations
            .iter()
            .filter(|v| v.kind == ViolationKind::TechnologistShortfall)
            .count();
        let engineers = violations
            .iter()
            .filter(|v| v.kind == ViolationKind::MissingEngineer)
            .count();
        // Ten days, two staffed shifts, engineer only in the mornings
        assert_eq!(shortfalls, 20);
        assert_eq!(engineers, 10);
        assert!(violations.iter().all(|v| v.kind.is_coverage()));
    }

    #[test]
    fn test_labor_rule_breaches_are_reported() {
        let mut schedule = schedule();
        let t1 = schedule.find_worker("T1").unwrap();
        // Night then Morning: night-to-day
        schedule.assign(t1, d(2025, 1, 6), ShiftType::Night).unwrap();
        schedule.assign(t1, d(2025, 1, 7), ShiftType::Morning).unwrap();
        // Worked day off
        schedule.assign(t1, d(2025, 1, 9), ShiftType::Morning).unwrap();

        let checker = EligibilityChecker::from_config(&RosterConfig::default());
        let found: Vec<Violation> = validate_schedule(&schedule, &checker)
            .into_iter()
            .filter(|v| v.involves("T1"))
            .collect();
        assert_eq!(
            kinds(&found),
            vec![ViolationKind::DayOffWorked, ViolationKind::NightToDay]
        );
        assert_eq!(found[1].date, d(2025, 1, 7));
    }

    #[test]
    fn test_consecutive_run_flags_each_extra_day() {
        let mut schedule = schedule();
        let t2 = schedule.find_worker("T2").unwrap();
        for day in 6..=12 {
            schedule.assign(t2, d(2025, 1, day), ShiftType::Morning).unwrap();
        }

        let checker = EligibilityChecker::from_config(&RosterConfig::default());
        let runs: Vec<NaiveDate> = validate_schedule(&schedule, &checker)
            .into_iter()
            .filter(|v| v.kind == ViolationKind::ConsecutiveDays)
            .map(|v| v.date)
            .collect();
        assert_eq!(runs, vec![d(2025, 1, 11), d(2025, 1, 12)]);
    }

    #[test]
    fn test_fully_staffed_clean_schedule_has_no_findings() {
        let policy = ShiftPolicy::new(vec![ShiftRequirement::of(ShiftType::Morning, 1, true)]).unwrap();
        let mut schedule = Schedule::new(
            d(2025, 1, 6),
            d(2025, 1, 7),
            vec![Worker::technologist(1), Worker::technologist(2)],
            vec![Worker::engineer(1)],
            policy,
        )
        .unwrap();
        let techs = schedule.worker_indices(WorkerRole::Technologist);
        let eng = schedule.find_worker("I1").unwrap();
        for (i, day) in [6, 7].into_iter().enumerate() {
            schedule.assign(techs[i], d(2025, 1, day), ShiftType::Morning).unwrap();
            schedule.assign(eng, d(2025, 1, day), ShiftType::Morning).unwrap();
        }

        let checker = EligibilityChecker::from_config(&RosterConfig::default());
        assert!(validate_schedule(&schedule, &checker).is_empty());
    }
}
