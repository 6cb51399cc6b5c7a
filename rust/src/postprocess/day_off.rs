//! Weekly day-off guarantee.
//!
//! Every worker gets `days_off_per_week` designated days off in each calendar
//! week of the range, clipped to the week's length. Edge weeks of one or two
//! days are exempt. Free days are taken first,
//! the day after a night shift before any other; when a worker has none, the
//! cheapest shift is released and backfilled.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::calendar::{date_range, is_weekend, weeks_in_range, CriticalDays};
use crate::generator::{rank_by_load, SlotFiller, Strictness};
use crate::interner::WorkerIdx;
use crate::models::{ShiftType, Violation, ViolationKind, WorkerRole};
use crate::roster::{RosterState, Schedule};
use crate::{log_changes, log_checks};

/// Weeks clipped shorter than this carry no day-off quota.
const MIN_QUOTA_WEEK_DAYS: usize = 3;

/// Required day-off count for a week of `week_len` days.
fn weekly_quota(days_off_per_week: u32, week_len: usize) -> usize {
    if week_len < MIN_QUOTA_WEEK_DAYS {
        return 0;
    }
    (days_off_per_week as usize).min(week_len)
}

fn week_len(start: NaiveDate, end: NaiveDate) -> usize {
    (end - start).num_days() as usize + 1
}

/// Grant missing weekly days off. Returns how many were granted.
///
/// Running it twice grants nothing the second time.
pub fn ensure_weekly_days_off(state: &mut RosterState, filler: &SlotFiller) -> usize {
    let schedule = state.schedule();
    let weeks = weeks_in_range(schedule.start(), schedule.end());
    let worker_count = schedule.workers().len() as WorkerIdx;
    let per_week = filler.config().days_off_per_week;
    let mut granted = 0;

    for (week_start, week_end) in weeks {
        let quota = weekly_quota(per_week, week_len(week_start, week_end));
        for idx in 0..worker_count {
            let mut have = state
                .schedule()
                .worker(idx)
                .days_off_between(week_start, week_end);
            while have < quota {
                if !grant_one(state, filler, idx, (week_start, week_end), quota) {
                    log_checks!(
                        state.verbosity(),
                        "  No day off available for {} in week of {}",
                        state.schedule().display_id(idx),
                        week_start
                    );
                    break;
                }
                have += 1;
                granted += 1;
            }
        }
    }
    granted
}

fn grant_one(
    state: &mut RosterState,
    filler: &SlotFiller,
    idx: WorkerIdx,
    week: (NaiveDate, NaiveDate),
    quota: usize,
) -> bool {
    let (week_start, week_end) = week;
    let schedule = state.schedule();
    let day = day_after_night(schedule, idx, week_start, week_end)
        .or_else(|| cheapest_free_day(state, idx, week_start, week_end, filler.critical()));
    if let Some(day) = day {
        return state.grant_day_off(idx, day);
    }

    let shift = cheapest_shift_to_release(state.schedule(), idx, week_start, week_end, filler.critical());
    match shift {
        Some((date, shift)) => liberate(state, filler, idx, (date, shift), week, quota),
        None => false,
    }
}

/// A free day right after a night shift, inside the week.
fn day_after_night(
    schedule: &Schedule,
    idx: WorkerIdx,
    week_start: NaiveDate,
    week_end: NaiveDate,
) -> Option<NaiveDate> {
    let worker = schedule.worker(idx);
    let from = week_start.pred_opt().unwrap_or(week_start);
    worker
        .shifts_between(from, week_end)
        .iter()
        .filter(|(_, s)| *s == ShiftType::Night)
        .filter_map(|(d, _)| d.succ_opt())
        .find(|next| {
            *next >= week_start
                && *next <= week_end
                && schedule.contains_date(*next)
                && !worker.works_on(*next)
                && !worker.is_day_off(*next)
        })
}

/// Lowest-cost free day in the week: few days off already, weekdays other than
/// Monday and Friday, and lightly staffed dates are preferred.
fn cheapest_free_day(
    state: &RosterState,
    idx: WorkerIdx,
    week_start: NaiveDate,
    week_end: NaiveDate,
    critical: &CriticalDays,
) -> Option<NaiveDate> {
    let schedule = state.schedule();
    let worker = schedule.worker(idx);
    let mut best: Option<(f64, NaiveDate)> = None;

    for date in date_range(week_start, week_end) {
        if worker.works_on(date) || worker.is_day_off(date) {
            continue;
        }
        let off = schedule.workers().iter().filter(|w| w.is_day_off(date)).count();
        let mut cost = off as f64 * 5.0;
        if is_weekend(date) || critical.is_holiday(date) {
            cost += 10.0;
        } else if matches!(date.weekday(), Weekday::Mon | Weekday::Fri) {
            cost += 5.0;
        }
        cost += state.index().working_count(date) as f64 * 0.2;

        if best.map_or(true, |(c, _)| cost < c) {
            best = Some((cost, date));
        }
    }
    best.map(|(_, date)| date)
}

/// Cost of releasing one of the worker's shifts, higher for scarce coverage.
pub fn liberation_cost(
    schedule: &Schedule,
    idx: WorkerIdx,
    date: NaiveDate,
    shift: ShiftType,
    critical: &CriticalDays,
) -> f64 {
    let worker = schedule.worker(idx);
    let policy = schedule.policy();
    let weekend = if is_weekend(date) { 3.0 } else { 1.0 };
    let shift_factor = shift.criticality() as f64;
    let (coverage, expertise) = match worker.role {
        WorkerRole::Technologist => {
            let remaining = schedule.technologist_count(date, shift).saturating_sub(1);
            let required = policy.required_technologists(shift);
            let coverage = if remaining < required {
                5.0
            } else if remaining == required {
                3.0
            } else {
                1.0
            };
            (coverage, 1.0)
        }
        WorkerRole::Engineer => {
            let coverage = if policy.needs_engineer(shift) { 5.0 } else { 1.0 };
            (coverage, 3.0)
        }
    };
    let holiday = if critical.is_holiday(date) { 2.0 } else { 1.0 };
    let adjacent = [date.pred_opt(), date.succ_opt()]
        .into_iter()
        .flatten()
        .filter(|d| worker.works_on(*d))
        .count() as f64;

    weekend * shift_factor * coverage * expertise * holiday + adjacent * 2.0
}

fn cheapest_shift_to_release(
    schedule: &Schedule,
    idx: WorkerIdx,
    week_start: NaiveDate,
    week_end: NaiveDate,
    critical: &CriticalDays,
) -> Option<(NaiveDate, ShiftType)> {
    let mut best: Option<(f64, NaiveDate, ShiftType)> = None;
    for &(date, shift) in schedule.worker(idx).shifts_between(week_start, week_end) {
        let cost = liberation_cost(schedule, idx, date, shift, critical);
        if best.map_or(true, |(c, _, _)| cost < c) {
            best = Some((cost, date, shift));
        }
    }
    best.map(|(_, date, shift)| (date, shift))
}

/// Release a shift, backfill it from the same role if anyone passes the labor
/// rules, and mark the freed date as a day off.
///
/// A backfill worker must still be able to reach their own quota for the week
/// without `date`, so one liberation never forces another.
fn liberate(
    state: &mut RosterState,
    filler: &SlotFiller,
    idx: WorkerIdx,
    (date, shift): (NaiveDate, ShiftType),
    (week_start, week_end): (NaiveDate, NaiveDate),
    quota: usize,
) -> bool {
    if state.release(idx, date, shift).is_err() {
        return false;
    }
    let role = state.schedule().worker(idx).role;
    let schedule = state.schedule();
    let mut candidates: Vec<WorkerIdx> = Vec::new();
    if schedule.open_positions(date, shift, role) > 0 {
        candidates = schedule
            .worker_indices(role)
            .into_iter()
            .filter(|&c| c != idx && !state.index().is_working(date, c))
            .filter(|&c| keeps_quota_reachable(schedule, c, date, (week_start, week_end), quota))
            .filter(|&c| {
                filler
                    .checker()
                    .check_labor_rules(schedule.worker(c), date, shift, schedule.policy(), Strictness::Strict)
                    .is_ok()
            })
            .collect();
        rank_by_load(&mut candidates, shift, schedule);
    }

    let replacement = candidates
        .into_iter()
        .find(|&c| state.try_assign(c, date, shift));
    log_changes!(
        state.verbosity(),
        "  Liberated {} {} for {}, backfill: {}",
        date,
        shift,
        state.schedule().display_id(idx),
        replacement.map_or_else(|| "none".to_string(), |c| state.schedule().display_id(c))
    );
    state.grant_day_off(idx, date)
}

fn keeps_quota_reachable(
    schedule: &Schedule,
    idx: WorkerIdx,
    date: NaiveDate,
    (week_start, week_end): (NaiveDate, NaiveDate),
    quota: usize,
) -> bool {
    let worker = schedule.worker(idx);
    let missing = quota.saturating_sub(worker.days_off_between(week_start, week_end));
    missing == 0
        || date_range(week_start, week_end)
            .filter(|&d| d != date && !worker.works_on(d) && !worker.is_day_off(d))
            .count()
            >= missing
}

/// One violation per worker and week short of the weekly quota.
pub fn verify_weekly_days_off(schedule: &Schedule, days_off_per_week: u32) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (week_start, week_end) in weeks_in_range(schedule.start(), schedule.end()) {
        let quota = weekly_quota(days_off_per_week, week_len(week_start, week_end));
        for worker in schedule.workers() {
            let have = worker.days_off_between(week_start, week_end);
            if have < quota {
                violations.push(Violation::new(
                    ViolationKind::MissingWeeklyDayOff,
                    week_start,
                    None,
                    vec![worker.display_id()],
                    format!(
                        "{} of {} days off in week {} to {}",
                        have, quota, week_start, week_end
                    ),
                ));
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::NoHolidays;
    use crate::config::{RosterConfig, ShiftPolicy, ShiftRequirement};
    use crate::models::Worker;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    // Mon 2025-01-06 .. Sun 2025-01-12, one full week
    fn state(techs: Vec<Worker>) -> RosterState {
        let policy = ShiftPolicy::new(vec![
            ShiftRequirement::of(ShiftType::Morning, 1, false),
            ShiftRequirement::of(ShiftType::Night, 1, false),
        ])
        .unwrap();
        let schedule =
            Schedule::new(d(2025, 1, 6), d(2025, 1, 12), techs, vec![Worker::engineer(1)], policy)
                .unwrap();
        RosterState::new(schedule, 0)
    }

    fn critical() -> CriticalDays {
        CriticalDays::identify(d(2025, 1, 6), d(2025, 1, 12), &NoHolidays)
    }

    #[test]
    fn test_day_after_night_preferred() {
        let mut state = state(vec![Worker::technologist(1), Worker::technologist(2)]);
        let t1 = state.schedule().find_worker("T1").unwrap();
        state.assign(t1, d(2025, 1, 8), ShiftType::Night).unwrap();

        let config = RosterConfig::default();
        let critical = critical();
        let filler = SlotFiller::new(&config, &critical);
        ensure_weekly_days_off(&mut state, &filler);

        assert!(state.schedule().worker(t1).is_day_off(d(2025, 1, 9)));
    }

    #[test]
    fn test_free_day_avoids_weekends_and_edges() {
        let mut state = state(vec![Worker::technologist(1)]);
        let config = RosterConfig::default();
        let critical = critical();
        let filler = SlotFiller::new(&config, &critical);

        let granted = ensure_weekly_days_off(&mut state, &filler);
        // T1 and I1 both idle: Tuesday is the cheapest day for the first,
        // then Wednesday since Tuesday already has a day off
        assert_eq!(granted, 2);
        let t1 = state.schedule().find_worker("T1").unwrap();
        let i1 = state.schedule().find_worker("I1").unwrap();
        assert!(state.schedule().worker(t1).is_day_off(d(2025, 1, 7)));
        assert!(state.schedule().worker(i1).is_day_off(d(2025, 1, 8)));
    }

    #[test]
    fn test_idempotent() {
        let mut state = state(vec![Worker::technologist(1), Worker::technologist(2)]);
        let config = RosterConfig::default();
        let critical = critical();
        let filler = SlotFiller::new(&config, &critical);

        assert_eq!(ensure_weekly_days_off(&mut state, &filler), 3);
        assert_eq!(ensure_weekly_days_off(&mut state, &filler), 0);
        assert!(verify_weekly_days_off(state.schedule(), 1).is_empty());
    }

    #[test]
    fn test_fully_booked_worker_is_liberated_and_backfilled() {
        let mut state = state(vec![Worker::technologist(1), Worker::technologist(2)]);
        let t1 = state.schedule().find_worker("T1").unwrap();
        let t2 = state.schedule().find_worker("T2").unwrap();
        for day in 6..=12 {
            state.assign(t1, d(2025, 1, day), ShiftType::Morning).unwrap();
        }

        let config = RosterConfig::default();
        let critical = critical();
        let filler = SlotFiller::new(&config, &critical);
        ensure_weekly_days_off(&mut state, &filler);

        let worker = state.schedule().worker(t1);
        assert_eq!(worker.days_off_between(d(2025, 1, 6), d(2025, 1, 12)), 1);
        let freed = *worker.days_off.iter().next().unwrap();
        assert!(!worker.works_on(freed));
        // The slot went to T2 instead of staying open
        assert_eq!(state.schedule().worker(t2).shift_on(freed), Some(ShiftType::Morning));
    }

    #[test]
    fn test_edge_weeks_shorter_than_three_days_are_exempt() {
        assert_eq!(weekly_quota(1, 1), 0);
        assert_eq!(weekly_quota(1, 2), 0);
        assert_eq!(weekly_quota(1, 3), 1);
        assert_eq!(weekly_quota(2, 7), 2);
    }

    #[test]
    fn test_range_starting_on_sunday_keeps_its_days_off() {
        // Sun 2025-03-02 .. Sat 2025-03-15: a lone Sunday, one full week,
        // then six days
        let policy = ShiftPolicy::new(vec![ShiftRequirement::of(ShiftType::Morning, 2, false)]).unwrap();
        let schedule = Schedule::new(
            d(2025, 3, 2),
            d(2025, 3, 15),
            (1..=4).map(Worker::technologist).collect(),
            vec![Worker::engineer(1)],
            policy,
        )
        .unwrap();
        let mut state = RosterState::new(schedule, 0);
        let t1 = state.schedule().find_worker("T1").unwrap();
        let t2 = state.schedule().find_worker("T2").unwrap();
        for day in 2..=15 {
            state.assign(t1, d(2025, 3, day), ShiftType::Morning).unwrap();
            state.assign(t2, d(2025, 3, day), ShiftType::Morning).unwrap();
        }

        let config = RosterConfig::default();
        let critical = CriticalDays::identify(d(2025, 3, 2), d(2025, 3, 15), &NoHolidays);
        let filler = SlotFiller::new(&config, &critical);
        ensure_weekly_days_off(&mut state, &filler);

        assert!(verify_weekly_days_off(state.schedule(), 1).is_empty());
        // Nobody is sent home on the lone Sunday
        assert!(state.schedule().workers().iter().all(|w| !w.is_day_off(d(2025, 3, 2))));
        // Every liberated Morning was backfilled without costing a day off
        for day in 3..=15 {
            assert_eq!(state.schedule().technologist_count(d(2025, 3, day), ShiftType::Morning), 2);
        }
        for w in state.schedule().workers() {
            assert!(w.shifts().iter().all(|(date, _)| !w.is_day_off(*date)));
        }
    }

    #[test]
    fn test_verify_reports_missing_weeks() {
        let state = state(vec![Worker::technologist(1).with_days_off([d(2025, 1, 7)])]);
        let violations = verify_weekly_days_off(state.schedule(), 1);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::MissingWeeklyDayOff);
        assert!(violations[0].involves("I1"));
    }
}
