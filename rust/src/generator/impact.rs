//! Forward-looking impact scoring of candidate assignments.

use chrono::{Days, NaiveDate};

use crate::calendar::CriticalDays;
use crate::config::{ImpactWeights, RosterConfig};
use crate::models::{ShiftType, Worker};
use crate::roster::Schedule;

use super::eligibility::{EligibilityChecker, Strictness};

/// Outcome of predicting a single assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct ImpactAssessment {
    pub eligible: bool,
    /// Human-readable reasons the assignment would cost something
    pub violations: Vec<String>,
    /// Heuristic cost, lower is better
    pub score: f64,
}

/// Estimates how much an assignment constrains the rest of the roster.
///
/// Pure: reads the schedule and the worker's history, never mutates.
pub struct ImpactPredictor<'a> {
    checker: EligibilityChecker,
    weights: &'a ImpactWeights,
    critical: &'a CriticalDays,
}

impl<'a> ImpactPredictor<'a> {
    pub fn new(config: &'a RosterConfig, critical: &'a CriticalDays) -> Self {
        Self {
            checker: EligibilityChecker::from_config(config),
            weights: &config.weights,
            critical,
        }
    }

    pub fn predict(
        &self,
        worker: &Worker,
        date: NaiveDate,
        shift: ShiftType,
        schedule: &Schedule,
    ) -> ImpactAssessment {
        let mut violations = Vec::new();

        if worker.works_on(date) {
            violations.push("already assigned that day".to_string());
            return ImpactAssessment {
                eligible: false,
                violations,
                score: f64::INFINITY,
            };
        }

        let w = self.weights;
        let policy = schedule.policy();
        let mut score = 0.0;

        if worker.is_day_off(date) {
            score += w.day_off;
            violations.push("loses a designated day off".to_string());
        }
        if self.checker.violates_night_to_day(worker, date, shift, policy) {
            score += w.night_to_day;
            violations.push("night shift next to a daytime shift".to_string());
        }
        if self.checker.violates_consecutive(worker, date) {
            score += w.consecutive;
            violations.push("exceeds consecutive working days".to_string());
        }
        let relaxed_gap = self.checker.rest_gap(Strictness::Relaxed);
        if self.checker.violates_rest(worker, date, shift, relaxed_gap) {
            score += w.rest;
            violations.push("breaches the relaxed rest gap".to_string());
        }

        let blocking = self.future_blocking(worker, date, shift, schedule);
        if blocking > 0.0 {
            violations.push(format!("blocks upcoming slots (cost {:.1})", blocking));
        }
        score += blocking;
        score += self.fatigue(worker, date);
        score += self.type_imbalance(worker, shift, schedule);

        let eligible = score < w.impact_limit
            || (shift == ShiftType::Night && score < w.night_impact_limit);

        ImpactAssessment {
            eligible,
            violations,
            score,
        }
    }

    /// Cost of the upcoming slots this assignment would make the worker
    /// ineligible for, weighted by proximity, shift criticality and critical days.
    fn future_blocking(
        &self,
        worker: &Worker,
        date: NaiveDate,
        shift: ShiftType,
        schedule: &Schedule,
    ) -> f64 {
        let horizon = self.weights.lookahead_days;
        let hypothetical = worker.with_hypothetical_shift(date, shift);
        let mut cost = 0.0;

        for k in 1..=horizon {
            let future = match date.checked_add_days(Days::new(k as u64)) {
                Some(f) if schedule.contains_date(f) => f,
                _ => break,
            };
            let proximity = (horizon + 1 - k) as f64;
            let day_factor = if self.critical.is_critical(future) { 2.0 } else { 1.0 };
            for future_shift in schedule.policy().shift_types() {
                let open_now = self.checker.can_work(worker, future, future_shift, schedule);
                if open_now && !self.checker.can_work(&hypothetical, future, future_shift, schedule)
                {
                    cost += proximity * future_shift.criticality() as f64 * day_factor;
                }
            }
        }
        cost
    }

    /// Penalty for long runs in the `history_window_days` ending on `date`.
    fn fatigue(&self, worker: &Worker, date: NaiveDate) -> f64 {
        let window = self.weights.history_window_days.saturating_sub(1) as u64;
        let from = date.checked_sub_days(Days::new(window)).unwrap_or(date);

        let mut longest = 0u32;
        let mut run = 0u32;
        let mut cursor = from;
        while cursor <= date {
            if cursor == date || worker.works_on(cursor) {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 0;
            }
            match cursor.succ_opt() {
                Some(next) => cursor = next,
                None => break,
            }
        }

        let threshold = self.weights.fatigue_run_threshold;
        if longest > threshold {
            (longest - threshold) as f64 * self.weights.fatigue
        } else {
            0.0
        }
    }

    /// Penalty when the worker's own mix of staffed shift types gets lopsided.
    fn type_imbalance(&self, worker: &Worker, shift: ShiftType, schedule: &Schedule) -> f64 {
        let mut counts = worker.shift_type_counts();
        counts[shift.index()] += 1;

        let staffed: Vec<usize> = schedule
            .policy()
            .shift_types()
            .map(|s| counts[s.index()])
            .collect();
        if staffed.len() < 2 {
            return 0.0;
        }
        let max = staffed.iter().copied().max().unwrap_or(0);
        let min = staffed.iter().copied().min().unwrap_or(0);
        let diff = max - min;
        if diff >= self.weights.type_imbalance_threshold as usize {
            diff as f64 * self.weights.type_imbalance
        } else {
            0.0
        }
    }
}
