//! Eligibility predicates: may a worker take a given slot?

use chrono::{Days, NaiveDate};
use std::fmt;

use crate::config::{RosterConfig, ShiftPolicy};
use crate::models::{timeline_position, ShiftType, Worker};
use crate::roster::Schedule;

/// Which rest threshold applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strictness {
    Strict,
    /// Shorter rest gap, used only when the strict pool runs dry
    Relaxed,
}

/// First rule a candidate failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ineligibility {
    DayOff,
    TypeDrift,
    NightToDay,
    AlreadyWorking,
    ConsecutiveDays,
    InadequateRest,
}

impl Ineligibility {
    pub fn describe(self) -> &'static str {
        match self {
            Self::DayOff => "designated day off",
            Self::TypeDrift => "shift-type drift above peers",
            Self::NightToDay => "night shift adjacent to a daytime shift",
            Self::AlreadyWorking => "already working that day",
            Self::ConsecutiveDays => "too many consecutive working days",
            Self::InadequateRest => "inadequate rest between shifts",
        }
    }
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Pure predicate layer over worker history and pool statistics.
#[derive(Clone, Copy, Debug)]
pub struct EligibilityChecker {
    max_consecutive_days: u32,
    strict_rest_gap: u32,
    relaxed_rest_gap: u32,
    drift_spread_threshold: u32,
    drift_tolerance: u32,
}

impl EligibilityChecker {
    pub fn from_config(config: &RosterConfig) -> Self {
        Self {
            max_consecutive_days: config.max_consecutive_days,
            strict_rest_gap: config.strict_rest_gap,
            relaxed_rest_gap: config.relaxed_rest_gap,
            drift_spread_threshold: config.drift_spread_threshold,
            drift_tolerance: config.drift_tolerance,
        }
    }

    pub fn max_consecutive_days(&self) -> u32 {
        self.max_consecutive_days
    }

    pub fn rest_gap(&self, strictness: Strictness) -> u32 {
        match strictness {
            Strictness::Strict => self.strict_rest_gap,
            Strictness::Relaxed => self.relaxed_rest_gap,
        }
    }

    /// Full rule set, in order: day off, type drift, night-to-day, same day,
    /// consecutive days, rest.
    pub fn check(
        &self,
        worker: &Worker,
        date: NaiveDate,
        shift: ShiftType,
        schedule: &Schedule,
        strictness: Strictness,
    ) -> Result<(), Ineligibility> {
        if worker.is_day_off(date) {
            return Err(Ineligibility::DayOff);
        }
        if self.drifts_above_peers(worker, shift, schedule) {
            return Err(Ineligibility::TypeDrift);
        }
        self.check_transitions(worker, date, shift, schedule.policy(), strictness)
    }

    /// Every rule except type drift. Used when moving existing shifts around,
    /// which does not grow anyone's type counts beyond what the pool already has.
    pub fn check_labor_rules(
        &self,
        worker: &Worker,
        date: NaiveDate,
        shift: ShiftType,
        policy: &ShiftPolicy,
        strictness: Strictness,
    ) -> Result<(), Ineligibility> {
        if worker.is_day_off(date) {
            return Err(Ineligibility::DayOff);
        }
        self.check_transitions(worker, date, shift, policy, strictness)
    }

    fn check_transitions(
        &self,
        worker: &Worker,
        date: NaiveDate,
        shift: ShiftType,
        policy: &ShiftPolicy,
        strictness: Strictness,
    ) -> Result<(), Ineligibility> {
        if self.violates_night_to_day(worker, date, shift, policy) {
            return Err(Ineligibility::NightToDay);
        }
        if worker.works_on(date) {
            return Err(Ineligibility::AlreadyWorking);
        }
        if self.violates_consecutive(worker, date) {
            return Err(Ineligibility::ConsecutiveDays);
        }
        if self.violates_rest(worker, date, shift, self.rest_gap(strictness)) {
            return Err(Ineligibility::InadequateRest);
        }
        Ok(())
    }

    pub fn can_work(
        &self,
        worker: &Worker,
        date: NaiveDate,
        shift: ShiftType,
        schedule: &Schedule,
    ) -> bool {
        self.check(worker, date, shift, schedule, Strictness::Strict)
            .is_ok()
    }

    pub fn can_work_relaxed(
        &self,
        worker: &Worker,
        date: NaiveDate,
        shift: ShiftType,
        schedule: &Schedule,
    ) -> bool {
        self.check(worker, date, shift, schedule, Strictness::Relaxed)
            .is_ok()
    }

    /// The literal drift rule: reject when the pool's spread for this shift type
    /// exceeds the threshold, the worker is not at the pool minimum, and the
    /// worker already sits at the pool maximum (minus tolerance).
    pub fn drifts_above_peers(&self, worker: &Worker, shift: ShiftType, schedule: &Schedule) -> bool {
        let mut counts = schedule
            .workers()
            .iter()
            .filter(|w| w.role == worker.role)
            .map(|w| w.shift_type_count(shift));
        let first = match counts.next() {
            Some(c) => c,
            None => return false,
        };
        let (min, max) = counts.fold((first, first), |(lo, hi), c| (lo.min(c), hi.max(c)));
        if max - min <= self.drift_spread_threshold as usize {
            return false;
        }
        let own = worker.shift_type_count(shift);
        own != min && own >= max.saturating_sub(self.drift_tolerance as usize)
    }

    /// Night followed by a daytime shift on the next calendar day, checked from
    /// either end of the pair.
    pub fn violates_night_to_day(
        &self,
        worker: &Worker,
        date: NaiveDate,
        shift: ShiftType,
        policy: &ShiftPolicy,
    ) -> bool {
        if policy.is_daytime(shift) {
            let previous = date.pred_opt().and_then(|p| worker.shift_on(p));
            if previous == Some(ShiftType::Night) {
                return true;
            }
        }
        if shift == ShiftType::Night {
            let next = date.succ_opt().and_then(|n| worker.shift_on(n));
            if next.is_some_and(|s| policy.is_daytime(s)) {
                return true;
            }
        }
        false
    }

    pub fn violates_consecutive(&self, worker: &Worker, date: NaiveDate) -> bool {
        consecutive_run_through(worker, date) > self.max_consecutive_days
    }

    /// Any existing shift within `gap` timeline slots of the candidate.
    pub fn violates_rest(&self, worker: &Worker, date: NaiveDate, shift: ShiftType, gap: u32) -> bool {
        if gap == 0 {
            return false;
        }
        let position = timeline_position(date, shift);
        let span = Days::new(gap as u64 / 3 + 1);
        let from = date.checked_sub_days(span).unwrap_or(date);
        let to = date.checked_add_days(span).unwrap_or(date);
        worker.shifts_between(from, to).iter().any(|(d, s)| {
            let delta = (position - timeline_position(*d, *s)).abs();
            delta > 0 && delta <= gap as i64
        })
    }
}

/// Length of the working run that `date` would belong to, counting `date` itself.
pub fn consecutive_run_through(worker: &Worker, date: NaiveDate) -> u32 {
    let mut run = 1;
    let mut cursor = date;
    while let Some(prev) = cursor.pred_opt() {
        if !worker.works_on(prev) {
            break;
        }
        run += 1;
        cursor = prev;
    }
    cursor = date;
    while let Some(next) = cursor.succ_opt() {
        if !worker.works_on(next) {
            break;
        }
        run += 1;
        cursor = next;
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ShiftPolicy, ShiftRequirement};
    use crate::roster::Schedule;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn schedule(techs: usize) -> Schedule {
        Schedule::new(
            d(2025, 1, 1),
            d(2025, 1, 31),
            (1..=techs as u32).map(Worker::technologist).collect(),
            vec![Worker::engineer(1)],
            ShiftPolicy::default(),
        )
        .unwrap()
    }

    fn checker() -> EligibilityChecker {
        EligibilityChecker::from_config(&RosterConfig::default())
    }

    #[test]
    fn test_day_off_blocks_first() {
        let schedule = schedule(1);
        let w = Worker::technologist(9).with_days_off([d(2025, 1, 5)]);
        assert_eq!(
            checker().check(&w, d(2025, 1, 5), ShiftType::Morning, &schedule, Strictness::Strict),
            Err(Ineligibility::DayOff)
        );
        assert!(checker().can_work(&w, d(2025, 1, 6), ShiftType::Morning, &schedule));
    }

    #[test]
    fn test_night_to_day_checked_in_both_directions() {
        let schedule = schedule(1);
        let mut w = Worker::technologist(9);
        w.record_shift(d(2025, 1, 10), ShiftType::Night);

        let c = checker();
        assert_eq!(
            c.check(&w, d(2025, 1, 11), ShiftType::Morning, &schedule, Strictness::Relaxed),
            Err(Ineligibility::NightToDay)
        );
        assert_eq!(
            c.check(&w, d(2025, 1, 11), ShiftType::Afternoon, &schedule, Strictness::Relaxed),
            Err(Ineligibility::NightToDay)
        );

        let mut day = Worker::technologist(8);
        day.record_shift(d(2025, 1, 11), ShiftType::Afternoon);
        assert!(c.violates_night_to_day(&day, d(2025, 1, 10), ShiftType::Night, schedule.policy()));
        assert!(!c.violates_night_to_day(&day, d(2025, 1, 12), ShiftType::Night, schedule.policy()));
    }

    #[test]
    fn test_night_to_day_respects_policy_daytime_flag() {
        let policy = ShiftPolicy::new(vec![
            ShiftRequirement {
                daytime: false,
                ..ShiftRequirement::of(ShiftType::Afternoon, 1, false)
            },
            ShiftRequirement::of(ShiftType::Night, 1, false),
        ])
        .unwrap();
        let mut w = Worker::technologist(1);
        w.record_shift(d(2025, 1, 10), ShiftType::Night);
        assert!(!checker().violates_night_to_day(&w, d(2025, 1, 11), ShiftType::Afternoon, &policy));
    }

    #[test]
    fn test_same_day_rejected() {
        let schedule = schedule(1);
        let mut w = Worker::technologist(9);
        w.record_shift(d(2025, 1, 10), ShiftType::Morning);
        assert_eq!(
            checker().check(&w, d(2025, 1, 10), ShiftType::Night, &schedule, Strictness::Strict),
            Err(Ineligibility::AlreadyWorking)
        );
    }

    #[test]
    fn test_consecutive_run_counts_both_sides() {
        let mut w = Worker::technologist(1);
        for day in [1, 2, 4, 5, 6] {
            w.record_shift(d(2025, 1, day), ShiftType::Morning);
        }
        // Filling the 3rd joins both runs
        assert_eq!(consecutive_run_through(&w, d(2025, 1, 3)), 6);
        assert_eq!(consecutive_run_through(&w, d(2025, 1, 8)), 1);
        assert!(checker().violates_consecutive(&w, d(2025, 1, 3)));
        assert!(!checker().violates_consecutive(&w, d(2025, 1, 7)));
    }

    #[test]
    fn test_rest_gap_strict_versus_relaxed() {
        let schedule = schedule(1);
        let mut w = Worker::technologist(9);
        w.record_shift(d(2025, 1, 10), ShiftType::Afternoon);

        let c = checker();
        // Afternoon -> next Morning is two slots apart
        assert_eq!(
            c.check(&w, d(2025, 1, 11), ShiftType::Morning, &schedule, Strictness::Strict),
            Err(Ineligibility::InadequateRest)
        );
        assert!(c.can_work_relaxed(&w, d(2025, 1, 11), ShiftType::Morning, &schedule));
        // Afternoon -> next Afternoon is three slots apart
        assert!(c.can_work(&w, d(2025, 1, 11), ShiftType::Afternoon, &schedule));
        // Night before the Afternoon is two slots back
        assert!(c.violates_rest(&w, d(2025, 1, 9), ShiftType::Night, 2));
        assert!(!c.violates_rest(&w, d(2025, 1, 9), ShiftType::Night, 1));
    }

    #[test]
    fn test_drift_rule_is_literal() {
        let mut schedule = schedule(3);
        let [t1, t2] = [1, 2].map(|n| schedule.find_worker(&format!("T{}", n)).unwrap());
        // T1 holds 3 nights, T2 one, T3 none: spread 3 > 2
        for day in [1, 5, 9] {
            schedule.assign(t1, d(2025, 1, day), ShiftType::Night).unwrap();
        }
        schedule.assign(t2, d(2025, 1, 13), ShiftType::Night).unwrap();

        let c = checker();
        assert!(c.drifts_above_peers(schedule.worker(t1), ShiftType::Night, &schedule));
        // Not at the maximum
        assert!(!c.drifts_above_peers(schedule.worker(t2), ShiftType::Night, &schedule));
        // Other shift types are unaffected
        assert!(!c.drifts_above_peers(schedule.worker(t1), ShiftType::Morning, &schedule));
        assert_eq!(
            c.check(schedule.worker(t1), d(2025, 1, 20), ShiftType::Night, &schedule, Strictness::Strict),
            Err(Ineligibility::TypeDrift)
        );
        // Moving shifts around skips the drift rule
        assert!(c
            .check_labor_rules(
                schedule.worker(t1),
                d(2025, 1, 20),
                ShiftType::Night,
                schedule.policy(),
                Strictness::Strict
            )
            .is_ok());
    }
}
