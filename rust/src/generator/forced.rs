//! Last-resort forced assignment with impact minimization and displacement.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::config::ImpactWeights;
use crate::interner::WorkerIdx;
use crate::models::{ShiftType, Violation, ViolationKind, WorkerRole};
use crate::roster::RosterState;
use crate::{log_changes, log_checks, log_debug};

use super::eligibility::{EligibilityChecker, Ineligibility, Strictness};
use super::selector::rank_by_load;

/// A scored forced-assignment candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct ForcedCandidate {
    pub worker: WorkerIdx,
    /// Rule breaches the assignment would cause
    pub breaches: Vec<Ineligibility>,
    /// Lower-priority shift the worker would be released from that day
    pub displaced_from: Option<ShiftType>,
    pub adjusted_score: f64,
}

/// Score every worker of `role` who could be forced into the slot, best first.
///
/// Workers holding a shift of equal or higher priority that day are excluded.
/// Holders of a lower-priority shift are scored as if already released.
pub fn score_candidates(
    state: &RosterState,
    checker: &EligibilityChecker,
    weights: &ImpactWeights,
    date: NaiveDate,
    shift: ShiftType,
    role: WorkerRole,
) -> Vec<ForcedCandidate> {
    let schedule = state.schedule();
    let policy = schedule.policy();
    let mut candidates = Vec::new();

    for idx in schedule.worker_indices(role) {
        let worker = schedule.worker(idx);
        let (view, displaced_from) = match worker.shift_on(date) {
            None => (None, None),
            Some(current) if current.priority() < shift.priority() => {
                (Some(worker.without_shift(date, current)), Some(current))
            }
            Some(_) => continue,
        };
        let view = view.as_ref().unwrap_or(worker);

        let mut breaches = Vec::new();
        let mut score = 0.0;
        if view.is_day_off(date) {
            breaches.push(Ineligibility::DayOff);
            score += weights.day_off;
        }
        if checker.violates_night_to_day(view, date, shift, policy) {
            breaches.push(Ineligibility::NightToDay);
            score += weights.night_to_day;
        }
        if checker.violates_consecutive(view, date) {
            breaches.push(Ineligibility::ConsecutiveDays);
            score += weights.consecutive;
        }
        if checker.violates_rest(view, date, shift, checker.rest_gap(Strictness::Strict)) {
            breaches.push(Ineligibility::InadequateRest);
            score += weights.rest;
        }
        if displaced_from.is_some() {
            score -= weights.displacement_bonus;
        }

        let adjusted_score = score + view.total_shifts() as f64 * weights.forced_workload
            - view.shift_type_count(shift) as f64 * weights.forced_experience;
        log_debug!(
            state.verbosity(),
            "    forced candidate {} score={:.1} adjusted={:.2} displaced_from={:?}",
            worker.display_id(),
            score,
            adjusted_score,
            displaced_from
        );

        candidates.push(ForcedCandidate {
            worker: idx,
            breaches,
            displaced_from,
            adjusted_score,
        });
    }

    candidates.sort_by(|a, b| {
        a.adjusted_score
            .partial_cmp(&b.adjusted_score)
            .unwrap_or(Ordering::Equal)
    });
    candidates
}

/// Force workers into the slot until it is filled or the pool is exhausted.
///
/// Every degradation is recorded on the state: displacements, consumed days
/// off, and rule breaches. A slot vacated by displacement is backfilled from
/// strictly eligible workers when possible. Returns how many workers were
/// assigned.
pub fn force_fill(
    state: &mut RosterState,
    checker: &EligibilityChecker,
    weights: &ImpactWeights,
    date: NaiveDate,
    shift: ShiftType,
    role: WorkerRole,
) -> usize {
    let candidates = score_candidates(state, checker, weights, date, shift, role);
    let mut filled = 0;

    for candidate in candidates {
        if state.schedule().open_positions(date, shift, role) == 0 {
            break;
        }
        let idx = candidate.worker;
        let display_id = state.schedule().display_id(idx);

        if let Some(lower) = candidate.displaced_from {
            if let Err(e) = state.release(idx, date, lower) {
                log_checks!(state.verbosity(), "    Cannot displace {}: {}", display_id, e);
                continue;
            }
            log_changes!(
                state.verbosity(),
                "  Displaced {} from {} to {} on {}",
                display_id,
                lower,
                shift,
                date
            );
        }

        if !state.try_assign(idx, date, shift) {
            if let Some(lower) = candidate.displaced_from {
                state.try_assign(idx, date, lower);
            }
            continue;
        }
        filled += 1;
        if candidate.breaches.contains(&Ineligibility::DayOff) {
            state.consume_day_off(idx, date, shift);
        }

        if let Some(lower) = candidate.displaced_from {
            let backfill = backfill_vacated(state, checker, date, lower, role);
            let explanation = match backfill {
                Some(other) => format!(
                    "released from {} to cover {}, {} backfilled by {}",
                    lower,
                    shift,
                    lower,
                    state.schedule().display_id(other)
                ),
                None => format!("released from {} to cover {}", lower, shift),
            };
            state.record(Violation::new(
                ViolationKind::Displacement,
                date,
                Some(lower),
                vec![display_id.clone()],
                explanation,
            ));
        }
        let rules: Vec<&str> = candidate
            .breaches
            .iter()
            .filter(|b| **b != Ineligibility::DayOff)
            .map(|b| b.describe())
            .collect();
        if !rules.is_empty() {
            state.record(Violation::new(
                ViolationKind::ForcedAssignment,
                date,
                Some(shift),
                vec![display_id],
                format!("forced assignment despite {}", rules.join(", ")),
            ));
        }
    }
    filled
}

/// Hand the slot a displaced worker left behind to the least-loaded worker who
/// passes every rule for it. Returns who took it, if anyone.
fn backfill_vacated(
    state: &mut RosterState,
    checker: &EligibilityChecker,
    date: NaiveDate,
    shift: ShiftType,
    role: WorkerRole,
) -> Option<WorkerIdx> {
    if state.schedule().open_positions(date, shift, role) == 0 {
        return None;
    }
    let schedule = state.schedule();
    let mut candidates: Vec<WorkerIdx> = schedule
        .worker_indices(role)
        .into_iter()
        .filter(|&idx| !state.index().is_working(date, idx))
        .filter(|&idx| checker.can_work(schedule.worker(idx), date, shift, schedule))
        .collect();
    rank_by_load(&mut candidates, shift, schedule);

    let taken = candidates
        .into_iter()
        .find(|&idx| state.try_assign(idx, date, shift));
    if taken.is_none() {
        log_checks!(state.verbosity(), "    Nobody to backfill {} {}", date, shift);
    }
    taken
}
