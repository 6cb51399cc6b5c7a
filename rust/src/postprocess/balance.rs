//! Workload balancing and premium-load fairness.
//!
//! Every move re-checks the labor rules on the receiving worker and rolls back
//! if any mutation is rejected, so balancing never trades coverage or rule
//! compliance for evenness.

use chrono::NaiveDate;

use crate::calendar::CriticalDays;
use crate::generator::{EligibilityChecker, SlotFiller, Strictness};
use crate::interner::WorkerIdx;
use crate::models::{ShiftType, WorkerRole};
use crate::roster::{AssignError, RosterState};
use crate::{log_changes, log_checks};

const ROLES: [WorkerRole; 2] = [WorkerRole::Technologist, WorkerRole::Engineer];

/// Even out total shifts and per-type mixes. Returns the number of moves made.
pub fn balance_workload(state: &mut RosterState, filler: &SlotFiller) -> usize {
    let config = filler.config();
    let checker = filler.checker();
    let mut moves = 0;
    for pass in 0..config.balance_passes {
        let before = moves;
        for role in ROLES {
            moves += balance_worker_group(state, checker, role, config.max_transfers);
            moves += exchange_shifts_by_type(state, checker, role);
        }
        log_checks!(
            state.verbosity(),
            "  Balance pass {}: {} moves",
            pass + 1,
            moves - before
        );
        if moves == before {
            break;
        }
    }
    moves
}

/// Move shifts from the most to the least loaded workers of `role` while the
/// gap exceeds one shift.
fn balance_worker_group(
    state: &mut RosterState,
    checker: &EligibilityChecker,
    role: WorkerRole,
    max_transfers: u32,
) -> usize {
    let mut transfers = 0;
    while transfers < max_transfers as usize {
        let schedule = state.schedule();
        let mut pool = schedule.worker_indices(role);
        pool.sort_by_key(|&idx| std::cmp::Reverse(schedule.worker(idx).total_shifts()));
        let donor = match pool.first() {
            Some(&d) => d,
            None => break,
        };
        let donor_load = schedule.worker(donor).total_shifts();
        let mut receivers: Vec<WorkerIdx> = pool
            .iter()
            .copied()
            .filter(|&r| donor_load > schedule.worker(r).total_shifts() + 1)
            .collect();
        receivers.sort_by_key(|&r| schedule.worker(r).total_shifts());
        if receivers.is_empty() {
            break;
        }

        let moved = receivers
            .into_iter()
            .any(|r| transfer_shift(state, checker, donor, r, |_, _| true));
        if !moved {
            break;
        }
        transfers += 1;
    }
    transfers
}

/// Hand one of `from`'s shifts (latest first) that passes `filter` to `to`.
fn transfer_shift(
    state: &mut RosterState,
    checker: &EligibilityChecker,
    from: WorkerIdx,
    to: WorkerIdx,
    filter: impl Fn(NaiveDate, ShiftType) -> bool,
) -> bool {
    let shifts: Vec<(NaiveDate, ShiftType)> = state
        .schedule()
        .worker(from)
        .shifts()
        .iter()
        .rev()
        .copied()
        .filter(|&(d, s)| filter(d, s))
        .collect();

    for (date, shift) in shifts {
        let schedule = state.schedule();
        if checker
            .check_labor_rules(schedule.worker(to), date, shift, schedule.policy(), Strictness::Strict)
            .is_err()
        {
            continue;
        }
        if state.release(from, date, shift).is_err() {
            continue;
        }
        if state.try_assign(to, date, shift) {
            log_changes!(
                state.verbosity(),
                "  Moved {} {} from {} to {}",
                date,
                shift,
                state.schedule().display_id(from),
                state.schedule().display_id(to)
            );
            return true;
        }
        state.try_assign(from, date, shift);
    }
    false
}

/// Exchange-trigger threshold for a worker's spread between shift types.
fn imbalance_threshold(num_days: usize, avg_per_type: f64) -> f64 {
    let by_length = 1.5 + 0.5 * num_days as f64 / 30.0;
    by_length.max((avg_per_type * 0.25).max(1.0))
}

/// Swap shifts between workers whose shift-type mixes are lopsided.
fn exchange_shifts_by_type(
    state: &mut RosterState,
    checker: &EligibilityChecker,
    role: WorkerRole,
) -> usize {
    let types: Vec<ShiftType> = state.schedule().policy().shift_types().collect();
    if types.len() < 2 {
        return 0;
    }
    let num_days = state.schedule().num_days();
    let mut exchanges = 0;

    for idx in state.schedule().worker_indices(role) {
        let counts = state.schedule().worker(idx).shift_type_counts();
        let total: usize = types.iter().map(|s| counts[s.index()]).sum();
        let avg = total as f64 / types.len() as f64;

        let (mut over, mut under) = (types[0], types[0]);
        for &s in &types {
            if counts[s.index()] > counts[over.index()] {
                over = s;
            }
            if counts[s.index()] < counts[under.index()] {
                under = s;
            }
        }
        let spread = (counts[over.index()] - counts[under.index()]) as f64;
        if spread <= imbalance_threshold(num_days, avg) {
            continue;
        }
        if try_exchange(state, checker, idx, over, under) {
            exchanges += 1;
        }
    }
    exchanges
}

/// Find a partner holding an `under` shift that can trade for one of
/// `worker`'s `over` shifts, and swap them.
fn try_exchange(
    state: &mut RosterState,
    checker: &EligibilityChecker,
    worker: WorkerIdx,
    over: ShiftType,
    under: ShiftType,
) -> bool {
    let schedule = state.schedule();
    let policy = schedule.policy();
    let role = schedule.worker(worker).role;
    let own: Vec<NaiveDate> = dates_of(schedule.worker(worker).shifts(), over);

    let mut partners: Vec<WorkerIdx> = schedule
        .worker_indices(role)
        .into_iter()
        .filter(|&p| p != worker)
        .collect();
    partners.sort_by_key(|&p| schedule.worker(p).shift_type_count(over));

    let mut swap = None;
    'search: for partner in partners {
        let theirs = dates_of(schedule.worker(partner).shifts(), under);
        for &d2 in &theirs {
            for &d1 in &own {
                let a = schedule.worker(worker).without_shift(d1, over);
                let b = schedule.worker(partner).without_shift(d2, under);
                let a_ok = checker
                    .check_labor_rules(&a, d2, under, policy, Strictness::Strict)
                    .is_ok();
                let b_ok = a_ok
                    && checker
                        .check_labor_rules(&b, d1, over, policy, Strictness::Strict)
                        .is_ok();
                if b_ok {
                    swap = Some((partner, d1, d2));
                    break 'search;
                }
            }
        }
    }

    let (partner, d1, d2) = match swap {
        Some(s) => s,
        None => return false,
    };
    apply_swap(state, worker, d1, over, partner, d2, under).unwrap_or_else(|e| {
        log_checks!(state.verbosity(), "  Exchange abandoned: {}", e);
        false
    })
}

fn dates_of(shifts: &[(NaiveDate, ShiftType)], shift: ShiftType) -> Vec<NaiveDate> {
    shifts
        .iter()
        .rev()
        .filter(|(_, s)| *s == shift)
        .map(|(d, _)| *d)
        .collect()
}

/// Execute a checked swap, restoring both original shifts if either
/// assignment is refused. Errors only when undoing a half-made swap fails.
#[allow(clippy::too_many_arguments)]
fn apply_swap(
    state: &mut RosterState,
    a: WorkerIdx,
    d1: NaiveDate,
    s1: ShiftType,
    b: WorkerIdx,
    d2: NaiveDate,
    s2: ShiftType,
) -> Result<bool, AssignError> {
    state.release(a, d1, s1)?;
    if let Err(e) = state.release(b, d2, s2) {
        state.assign(a, d1, s1)?;
        return Err(e);
    }
    if state.try_assign(a, d2, s2) {
        if state.try_assign(b, d1, s1) {
            log_changes!(
                state.verbosity(),
                "  Exchanged {} {} ({}) with {} {} ({})",
                d1,
                s1,
                state.schedule().display_id(a),
                d2,
                s2,
                state.schedule().display_id(b)
            );
            return Ok(true);
        }
        state.release(a, d2, s2)?;
    }
    state.assign(a, d1, s1)?;
    state.assign(b, d2, s2)?;
    Ok(false)
}

/// Night shifts and shifts on critical days.
pub fn is_premium(critical: &CriticalDays, date: NaiveDate, shift: ShiftType) -> bool {
    shift == ShiftType::Night || critical.is_critical(date)
}

fn premium_load(state: &RosterState, critical: &CriticalDays, idx: WorkerIdx) -> usize {
    state
        .schedule()
        .worker(idx)
        .shifts()
        .iter()
        .filter(|(d, s)| is_premium(critical, *d, *s))
        .count()
}

/// Even out premium shifts within each role. Returns the number of transfers.
pub fn optimize_fairness(state: &mut RosterState, filler: &SlotFiller) -> usize {
    let config = filler.config();
    let critical = filler.critical();
    let mut moves = 0;

    for role in ROLES {
        for _ in 0..config.fairness_passes {
            let pool = state.schedule().worker_indices(role);
            let loads: Vec<(WorkerIdx, usize)> = pool
                .iter()
                .map(|&idx| (idx, premium_load(state, critical, idx)))
                .collect();
            let (donor, max) = match loads.iter().copied().max_by_key(|&(_, l)| l) {
                Some(top) => top,
                None => break,
            };
            let sum: usize = loads.iter().map(|(_, l)| l).sum();
            let avg = sum as f64 / loads.len() as f64;
            let tolerance = ((avg * config.fairness_tolerance).ceil() as usize).max(1);

            let mut receivers: Vec<(WorkerIdx, usize)> = loads
                .into_iter()
                .filter(|&(_, l)| max > l + tolerance)
                .collect();
            if receivers.is_empty() {
                break;
            }
            receivers.sort_by_key(|&(_, l)| l);

            let moved = receivers.into_iter().any(|(r, _)| {
                transfer_shift(state, filler.checker(), donor, r, |d, s| {
                    is_premium(critical, d, s)
                })
            });
            if !moved {
                break;
            }
            moves += 1;
        }
    }
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::NoHolidays;
    use crate::config::{RosterConfig, ShiftPolicy, ShiftRequirement};
    use crate::models::Worker;
    use crate::roster::Schedule;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    // Mon 2025-01-06 .. Sun 2025-01-19
    fn state(policy: ShiftPolicy) -> RosterState {
        let schedule = Schedule::new(
            d(2025, 1, 6),
            d(2025, 1, 19),
            vec![Worker::technologist(1), Worker::technologist(2)],
            vec![Worker::engineer(1)],
            policy,
        )
        .unwrap();
        RosterState::new(schedule, 0)
    }

    fn mornings() -> ShiftPolicy {
        ShiftPolicy::new(vec![ShiftRequirement::of(ShiftType::Morning, 1, false)]).unwrap()
    }

    #[test]
    fn test_transfers_until_gap_is_one() {
        let mut state = state(mornings());
        let t1 = state.schedule().find_worker("T1").unwrap();
        let t2 = state.schedule().find_worker("T2").unwrap();
        for day in [6, 8, 10, 13, 15, 17] {
            state.assign(t1, d(2025, 1, day), ShiftType::Morning).unwrap();
        }

        let config = RosterConfig::default();
        let critical = CriticalDays::identify(d(2025, 1, 6), d(2025, 1, 19), &NoHolidays);
        let filler = SlotFiller::new(&config, &critical);
        let moves = balance_workload(&mut state, &filler);

        assert_eq!(moves, 3);
        assert_eq!(state.schedule().worker(t1).total_shifts(), 3);
        assert_eq!(state.schedule().worker(t2).total_shifts(), 3);
        // Latest shifts move first
        assert!(state.schedule().worker(t2).works_on(d(2025, 1, 17)));
    }

    #[test]
    fn test_transfer_respects_receiver_rules() {
        let mut state = state(mornings());
        let t1 = state.schedule().find_worker("T1").unwrap();
        let t2 = state.schedule().find_worker("T2").unwrap();
        for day in [6, 8, 10] {
            state.assign(t1, d(2025, 1, day), ShiftType::Morning).unwrap();
        }
        for day in [6, 8, 10] {
            state.grant_day_off(t2, d(2025, 1, day));
        }

        let checker = EligibilityChecker::from_config(&RosterConfig::default());
        let moves = balance_worker_group(&mut state, &checker, WorkerRole::Technologist, 8);
        assert_eq!(moves, 0);
        assert_eq!(state.schedule().worker(t1).total_shifts(), 3);
    }

    #[test]
    fn test_exchange_swaps_lopsided_types() {
        let policy = ShiftPolicy::new(vec![
            ShiftRequirement::of(ShiftType::Morning, 1, false),
            ShiftRequirement::of(ShiftType::Afternoon, 1, false),
        ])
        .unwrap();
        let mut state = state(policy);
        let t1 = state.schedule().find_worker("T1").unwrap();
        let t2 = state.schedule().find_worker("T2").unwrap();
        // T1 holds only mornings, T2 only afternoons, on alternating days
        for day in [6, 8, 10, 13] {
            state.assign(t1, d(2025, 1, day), ShiftType::Morning).unwrap();
            state.assign(t2, d(2025, 1, day + 1), ShiftType::Afternoon).unwrap();
        }

        let checker = EligibilityChecker::from_config(&RosterConfig::default());
        let exchanges = exchange_shifts_by_type(&mut state, &checker, WorkerRole::Technologist);
        // T1 trades first, then T2 is still lopsided enough to trade back a pair
        assert_eq!(exchanges, 2);

        for idx in [t1, t2] {
            let counts = state.schedule().worker(idx).shift_type_counts();
            assert_eq!(counts[ShiftType::Morning.index()], 2);
            assert_eq!(counts[ShiftType::Afternoon.index()], 2);
        }
    }

    #[test]
    fn test_fairness_moves_premium_shifts() {
        let policy = ShiftPolicy::new(vec![
            ShiftRequirement::of(ShiftType::Morning, 1, false),
            ShiftRequirement::of(ShiftType::Night, 1, false),
        ])
        .unwrap();
        let mut state = state(policy);
        let t1 = state.schedule().find_worker("T1").unwrap();
        let t2 = state.schedule().find_worker("T2").unwrap();
        // T1 carries every premium shift; T2 only weekday mornings
        for day in [6, 9, 12, 15] {
            state.assign(t1, d(2025, 1, day), ShiftType::Night).unwrap();
        }
        for day in [7, 10, 14, 16] {
            state.assign(t2, d(2025, 1, day), ShiftType::Morning).unwrap();
        }

        let config = RosterConfig::default();
        let critical = CriticalDays::identify(d(2025, 1, 6), d(2025, 1, 19), &NoHolidays);
        let filler = SlotFiller::new(&config, &critical);
        let moves = optimize_fairness(&mut state, &filler);

        assert!(moves >= 1);
        let premium = |idx| premium_load(&state, &critical, idx);
        assert!(premium(t1) < 4);
        assert!(premium(t2) >= 1);
        assert_eq!(premium(t1) + premium(t2), 4);
    }

    #[test]
    fn test_refused_exchange_restores_both_workers() {
        let policy = ShiftPolicy::new(vec![
            ShiftRequirement::of(ShiftType::Morning, 1, false),
            ShiftRequirement::of(ShiftType::Afternoon, 1, false),
            ShiftRequirement::of(ShiftType::Night, 1, false),
        ])
        .unwrap();
        let mut state = state(policy);
        let t1 = state.schedule().find_worker("T1").unwrap();
        let t2 = state.schedule().find_worker("T2").unwrap();
        let (mon, thu) = (d(2025, 1, 6), d(2025, 1, 9));
        state.assign(t1, mon, ShiftType::Morning).unwrap();
        state.assign(t2, thu, ShiftType::Night).unwrap();
        // T2 already works Monday, so taking T1's morning is refused
        state.assign(t2, mon, ShiftType::Afternoon).unwrap();

        let swapped = apply_swap(&mut state, t1, mon, ShiftType::Morning, t2, thu, ShiftType::Night);
        assert_eq!(swapped, Ok(false));
        assert_eq!(state.schedule().worker(t1).shifts(), &[(mon, ShiftType::Morning)]);
        assert_eq!(
            state.schedule().worker(t2).shifts(),
            &[(mon, ShiftType::Afternoon), (thu, ShiftType::Night)]
        );
        assert!(state.index().is_working(thu, t2));
        assert!(!state.index().is_working(thu, t1));
    }
}
