//! Slot filling: strict load-ranked fill, and the proactive chain of
//! selector, relaxation and forced assignment.

use chrono::NaiveDate;

use crate::calendar::CriticalDays;
use crate::config::RosterConfig;
use crate::interner::WorkerIdx;
use crate::models::{ShiftType, WorkerRole};
use crate::roster::RosterState;
use crate::{log_checks, log_debug};

use super::eligibility::EligibilityChecker;
use super::forced::force_fill;
use super::impact::ImpactPredictor;
use super::relaxation::{expand_candidates, fill_from_tiers};
use super::selector::{rank_by_load, WorkerSelector};

/// How a slot was filled by [`SlotFiller::fill`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillOutcome {
    pub selected: usize,
    pub relaxed: usize,
    pub forced: usize,
}

impl FillOutcome {
    pub fn assigned(&self) -> usize {
        self.selected + self.relaxed + self.forced
    }
}

/// Shared machinery for filling one slot, reused by the generation phases
/// and the repair pass.
pub struct SlotFiller<'a> {
    config: &'a RosterConfig,
    critical: &'a CriticalDays,
    checker: EligibilityChecker,
    predictor: ImpactPredictor<'a>,
}

impl<'a> SlotFiller<'a> {
    pub fn new(config: &'a RosterConfig, critical: &'a CriticalDays) -> Self {
        Self {
            config,
            critical,
            checker: EligibilityChecker::from_config(config),
            predictor: ImpactPredictor::new(config, critical),
        }
    }

    pub fn config(&self) -> &RosterConfig {
        self.config
    }

    pub fn critical(&self) -> &CriticalDays {
        self.critical
    }

    pub fn checker(&self) -> &EligibilityChecker {
        &self.checker
    }

    /// Workers of `role` not working that day who pass the strict rules.
    pub fn strict_candidates(
        &self,
        state: &RosterState,
        date: NaiveDate,
        shift: ShiftType,
        role: WorkerRole,
    ) -> Vec<WorkerIdx> {
        let schedule = state.schedule();
        schedule
            .worker_indices(role)
            .into_iter()
            .filter(|&idx| !state.index().is_working(date, idx))
            .filter(|&idx| {
                self.checker
                    .can_work(schedule.worker(idx), date, shift, schedule)
            })
            .collect()
    }

    /// Fill open positions with strictly eligible workers ranked by load only.
    pub fn fill_by_load(
        &self,
        state: &mut RosterState,
        date: NaiveDate,
        shift: ShiftType,
        role: WorkerRole,
    ) -> usize {
        let mut candidates = self.strict_candidates(state, date, shift, role);
        rank_by_load(&mut candidates, shift, state.schedule());

        let mut filled = 0;
        for idx in candidates {
            if state.schedule().open_positions(date, shift, role) == 0 {
                break;
            }
            // Earlier picks move the pool statistics the drift rule reads
            let schedule = state.schedule();
            if !self.checker.can_work(schedule.worker(idx), date, shift, schedule) {
                continue;
            }
            if state.try_assign(idx, date, shift) {
                filled += 1;
            }
        }
        filled
    }

    /// Fill a slot proactively: impact-ranked strict candidates, then the
    /// relaxation tiers, then forced assignment.
    pub fn fill(
        &self,
        state: &mut RosterState,
        date: NaiveDate,
        shift: ShiftType,
        role: WorkerRole,
    ) -> FillOutcome {
        let mut outcome = FillOutcome::default();
        let needed = state.schedule().open_positions(date, shift, role);
        if needed == 0 {
            return outcome;
        }
        let verbosity = state.verbosity();

        let strict = self.strict_candidates(state, date, shift, role);
        log_debug!(
            verbosity,
            "  {} {} {}: need {}, {} strict candidates",
            date,
            shift,
            role,
            needed,
            strict.len()
        );
        let selector = WorkerSelector::new(&self.predictor, &self.config.weights, verbosity);
        for idx in selector.select(&strict, needed, date, shift, state.schedule()) {
            if state.try_assign(idx, date, shift) {
                outcome.selected += 1;
            }
        }

        let needed = state.schedule().open_positions(date, shift, role);
        if needed == 0 {
            return outcome;
        }
        log_checks!(
            verbosity,
            "  {} {} {} still short by {}, relaxing",
            date,
            shift,
            role,
            needed
        );
        let tiers = expand_candidates(
            state,
            &self.checker,
            self.critical,
            date,
            shift,
            role,
            &strict,
            needed,
        );
        outcome.relaxed = fill_from_tiers(state, &self.checker, &tiers, date, shift, role);

        let needed = state.schedule().open_positions(date, shift, role);
        if needed == 0 {
            return outcome;
        }
        log_checks!(
            verbosity,
            "  {} {} {} still short by {}, forcing",
            date,
            shift,
            role,
            needed
        );
        outcome.forced = force_fill(
            state,
            &self.checker,
            &self.config.weights,
            date,
            shift,
            role,
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::NoHolidays;
    use crate::config::{ShiftPolicy, ShiftRequirement};
    use crate::models::{ViolationKind, Worker};
    use crate::roster::Schedule;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    // Monday 2025-01-06 only, a normal day
    fn state(techs: Vec<Worker>) -> RosterState {
        let policy =
            ShiftPolicy::new(vec![ShiftRequirement::of(ShiftType::Night, 2, false)]).unwrap();
        let schedule =
            Schedule::new(d(2025, 1, 6), d(2025, 1, 6), techs, vec![Worker::engineer(1)], policy)
                .unwrap();
        RosterState::new(schedule, 0)
    }

    #[test]
    fn test_fill_by_load_stops_at_requirement() {
        let mut state = state((1..=4).map(Worker::technologist).collect());
        let config = RosterConfig::default();
        let critical = CriticalDays::default();
        let filler = SlotFiller::new(&config, &critical);

        let filled = filler.fill_by_load(&mut state, d(2025, 1, 6), ShiftType::Night, WorkerRole::Technologist);
        assert_eq!(filled, 2);
        assert_eq!(state.schedule().technologist_count(d(2025, 1, 6), ShiftType::Night), 2);
    }

    #[test]
    fn test_fill_escalates_to_forced_on_normal_night() {
        let mon = d(2025, 1, 6);
        let mut state = state(vec![
            Worker::technologist(1),
            Worker::technologist(2).with_days_off([mon]),
        ]);
        let config = RosterConfig::default();
        let critical = CriticalDays::identify(mon, mon, &NoHolidays);
        let filler = SlotFiller::new(&config, &critical);

        let outcome = filler.fill(&mut state, mon, ShiftType::Night, WorkerRole::Technologist);
        assert_eq!(outcome.selected, 1);
        assert_eq!(outcome.relaxed, 0);
        assert_eq!(outcome.forced, 1);
        assert_eq!(state.schedule().technologist_count(mon, ShiftType::Night), 2);
        assert!(state
            .events()
            .iter()
            .any(|e| e.kind == ViolationKind::DayOffLoss && e.involves("T2")));
    }

    #[test]
    fn test_fill_leaves_reportable_shortfall_when_pool_exhausted() {
        let mon = d(2025, 1, 6);
        let mut state = state(vec![Worker::technologist(1)]);
        let config = RosterConfig::default();
        let critical = CriticalDays::default();
        let filler = SlotFiller::new(&config, &critical);

        let outcome = filler.fill(&mut state, mon, ShiftType::Night, WorkerRole::Technologist);
        assert_eq!(outcome.assigned(), 1);
        assert_eq!(
            state.schedule().open_positions(mon, ShiftType::Night, WorkerRole::Technologist),
            1
        );
    }
}
