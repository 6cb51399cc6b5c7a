//! Coverage repair and labor-rule breach resolution after the main passes.

use chrono::NaiveDate;

use crate::generator::{rank_by_load, EligibilityChecker, SlotFiller, Strictness};
use crate::interner::WorkerIdx;
use crate::models::{ShiftType, Violation, ViolationKind, WorkerRole};
use crate::roster::RosterState;
use crate::{log_changes, log_checks};

use super::validation::validate_schedule;

/// Re-run the slot-filling chain on every under-staffed slot: engineers first,
/// then technologist slots from the emptiest up. Returns how many slots ended
/// fully staffed.
pub fn fix_schedule_issues(
    state: &mut RosterState,
    filler: &SlotFiller,
    order: &[NaiveDate],
) -> usize {
    let shift_types: Vec<ShiftType> = state.schedule().policy().shift_types().collect();
    let mut repaired = 0;

    for &date in order {
        for &shift in &shift_types {
            if state.schedule().open_positions(date, shift, WorkerRole::Engineer) == 0 {
                continue;
            }
            filler.fill(state, date, shift, WorkerRole::Engineer);
            if state.schedule().open_positions(date, shift, WorkerRole::Engineer) == 0 {
                repaired += 1;
            }
        }
    }

    let mut short: Vec<(usize, NaiveDate, ShiftType)> = order
        .iter()
        .flat_map(|&date| shift_types.iter().map(move |&shift| (date, shift)))
        .filter(|&(date, shift)| {
            state
                .schedule()
                .open_positions(date, shift, WorkerRole::Technologist)
                > 0
        })
        .map(|(date, shift)| (state.schedule().technologist_count(date, shift), date, shift))
        .collect();
    short.sort_by_key(|&(count, _, _)| count);

    for (_, date, shift) in short {
        filler.fill(state, date, shift, WorkerRole::Technologist);
        if state
            .schedule()
            .open_positions(date, shift, WorkerRole::Technologist)
            == 0
        {
            repaired += 1;
        }
    }
    log_checks!(state.verbosity(), "  Repair filled {} slots", repaired);
    repaired
}

/// For each worker involved in a labor-rule breach, try to hand the offending
/// shift to a strictly compliant replacement. The original assignment is kept
/// when nobody qualifies. Returns how many breaches were resolved.
pub fn resolve_constraint_violations(
    state: &mut RosterState,
    checker: &EligibilityChecker,
) -> usize {
    let breaches: Vec<Violation> = validate_schedule(state.schedule(), checker)
        .into_iter()
        .filter(|v| v.kind.is_constraint() && v.kind != ViolationKind::DayOffWorked)
        .collect();
    let mut resolved = 0;

    for breach in breaches {
        let (shift, worker_id) = match (breach.shift, breach.workers.first()) {
            (Some(shift), Some(id)) => (shift, id),
            _ => continue,
        };
        let idx = match state.schedule().find_worker(worker_id) {
            Some(idx) => idx,
            None => continue,
        };
        if state.schedule().worker(idx).shift_on(breach.date) != Some(shift) {
            // Already moved by an earlier resolution
            continue;
        }
        if replace(state, checker, idx, breach.date, shift) {
            resolved += 1;
        }
    }
    resolved
}

fn replace(
    state: &mut RosterState,
    checker: &EligibilityChecker,
    idx: WorkerIdx,
    date: NaiveDate,
    shift: ShiftType,
) -> bool {
    let schedule = state.schedule();
    let role = schedule.worker(idx).role;
    let mut candidates: Vec<WorkerIdx> = schedule
        .worker_indices(role)
        .into_iter()
        .filter(|&c| c != idx && !state.index().is_working(date, c))
        .filter(|&c| {
            checker
                .check_labor_rules(schedule.worker(c), date, shift, schedule.policy(), Strictness::Strict)
                .is_ok()
        })
        .collect();
    if candidates.is_empty() {
        log_checks!(
            state.verbosity(),
            "  No compliant replacement for {} on {} {}",
            schedule.display_id(idx),
            date,
            shift
        );
        return false;
    }
    rank_by_load(&mut candidates, shift, schedule);

    if state.release(idx, date, shift).is_err() {
        return false;
    }
    for candidate in candidates {
        if state.try_assign(candidate, date, shift) {
            log_changes!(
                state.verbosity(),
                "  Replaced {} with {} on {} {}",
                state.schedule().display_id(idx),
                state.schedule().display_id(candidate),
                date,
                shift
            );
            return true;
        }
    }
    state.try_assign(idx, date, shift);
    false
}
