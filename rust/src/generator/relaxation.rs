//! Additional-worker search when the strict pool cannot fill a slot.

use chrono::NaiveDate;

use crate::calendar::CriticalDays;
use crate::interner::WorkerIdx;
use crate::log_checks;
use crate::models::{ShiftType, Violation, ViolationKind, WorkerRole};
use crate::roster::RosterState;

use super::eligibility::{EligibilityChecker, Ineligibility, Strictness};

/// Tier a candidate was admitted through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// Already strict-eligible
    Eligible,
    /// No day-off conflict, passes consecutive and relaxed rest
    Medium,
    /// No day-off conflict, passes relaxed rest
    Low,
    /// Critical Night only: anyone without a same-day or night-to-day conflict
    LastResort,
}

/// Candidates for a slot in fill order, each tagged with its tier.
///
/// `eligible` comes first untouched; the rest of the role's pool is re-scanned,
/// skipping anyone working that day.
#[allow(clippy::too_many_arguments)]
pub fn expand_candidates(
    state: &RosterState,
    checker: &EligibilityChecker,
    critical: &CriticalDays,
    date: NaiveDate,
    shift: ShiftType,
    role: WorkerRole,
    eligible: &[WorkerIdx],
    needed: usize,
) -> Vec<(WorkerIdx, Tier)> {
    let schedule = state.schedule();
    let policy = schedule.policy();
    let relaxed_gap = checker.rest_gap(Strictness::Relaxed);

    let mut medium = Vec::new();
    let mut low = Vec::new();
    let mut remaining = Vec::new();

    for idx in schedule.worker_indices(role) {
        if eligible.contains(&idx) || state.index().is_working(date, idx) {
            continue;
        }
        let worker = schedule.worker(idx);
        if checker.violates_night_to_day(worker, date, shift, policy) {
            continue;
        }
        if worker.is_day_off(date) {
            remaining.push(idx);
            continue;
        }
        if checker.violates_rest(worker, date, shift, relaxed_gap) {
            remaining.push(idx);
            continue;
        }
        if checker.violates_consecutive(worker, date) {
            low.push(idx);
        } else {
            medium.push(idx);
        }
    }

    let mut tiers: Vec<(WorkerIdx, Tier)> = eligible
        .iter()
        .map(|&idx| (idx, Tier::Eligible))
        .chain(medium.into_iter().map(|idx| (idx, Tier::Medium)))
        .chain(low.into_iter().map(|idx| (idx, Tier::Low)))
        .collect();

    let critical_night = shift == ShiftType::Night && critical.is_critical(date);
    if critical_night && tiers.len() < needed {
        remaining.sort_by_key(|&idx| {
            let w = schedule.worker(idx);
            (w.days_off.len(), w.total_shifts())
        });
        log_checks!(
            state.verbosity(),
            "    Last-resort tier for {} {}: {} candidates",
            date,
            shift,
            remaining.len()
        );
        tiers.extend(remaining.into_iter().map(|idx| (idx, Tier::LastResort)));
    }

    tiers
}

/// Fill a slot from tiered candidates, consuming a day off where a last-resort
/// candidate needs it. Returns how many workers were assigned.
pub fn fill_from_tiers(
    state: &mut RosterState,
    checker: &EligibilityChecker,
    candidates: &[(WorkerIdx, Tier)],
    date: NaiveDate,
    shift: ShiftType,
    role: WorkerRole,
) -> usize {
    let mut filled = 0;
    for &(idx, tier) in candidates {
        if state.schedule().open_positions(date, shift, role) == 0 {
            break;
        }
        if state.index().is_working(date, idx) {
            continue;
        }

        let worker = state.schedule().worker(idx);
        let mut breaches: Vec<Ineligibility> = Vec::new();
        if tier >= Tier::Low && checker.violates_consecutive(worker, date) {
            breaches.push(Ineligibility::ConsecutiveDays);
        }
        if tier == Tier::LastResort
            && checker.violates_rest(worker, date, shift, checker.rest_gap(Strictness::Relaxed))
        {
            breaches.push(Ineligibility::InadequateRest);
        }
        let on_day_off = worker.is_day_off(date);
        let display_id = worker.display_id();

        if !state.try_assign(idx, date, shift) {
            continue;
        }
        filled += 1;
        if on_day_off {
            state.consume_day_off(idx, date, shift);
        }
        if !breaches.is_empty() {
            let rules: Vec<&str> = breaches.iter().map(|b| b.describe()).collect();
            state.record(Violation::new(
                ViolationKind::RelaxedAssignment,
                date,
                Some(shift),
                vec![display_id],
                format!("relaxed {:?} tier assignment: {}", tier, rules.join(", ")),
            ));
        }
    }
    filled
}
