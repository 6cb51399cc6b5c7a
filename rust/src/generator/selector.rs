//! Candidate ranking.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::config::ImpactWeights;
use crate::interner::WorkerIdx;
use crate::log_debug;
use crate::models::{ShiftType, Worker};
use crate::roster::Schedule;

use super::impact::ImpactPredictor;

/// Sort candidates by (total shifts, shifts of this type), ascending.
///
/// Stable, so equal loads keep roster order.
pub fn rank_by_load(candidates: &mut [WorkerIdx], shift: ShiftType, schedule: &Schedule) {
    candidates.sort_by_key(|&idx| {
        let w = schedule.worker(idx);
        (w.total_shifts(), w.shift_type_count(shift))
    });
}

/// Picks the best subset of candidates for a slot.
pub struct WorkerSelector<'a> {
    predictor: &'a ImpactPredictor<'a>,
    weights: &'a ImpactWeights,
    verbosity: u8,
}

impl<'a> WorkerSelector<'a> {
    pub fn new(predictor: &'a ImpactPredictor<'a>, weights: &'a ImpactWeights, verbosity: u8) -> Self {
        Self {
            predictor,
            weights,
            verbosity,
        }
    }

    /// Combined ranking key; impact dominates, workload and experience break ties.
    pub fn combined_score(&self, worker: &Worker, shift: ShiftType, impact: f64) -> f64 {
        let w = self.weights;
        let normalized_impact = impact.min(w.impact_norm) / w.impact_norm;
        let workload = worker.total_shifts() as f64 / w.workload_norm;
        let experience = worker.shift_type_count(shift) as f64 / w.experience_norm;
        normalized_impact * w.selector_impact + workload * w.selector_workload
            - experience * w.selector_experience
    }

    /// Up to `num_needed` candidates, best first. Ineligible candidates are
    /// dropped; fewer than requested are returned when the pool is short.
    pub fn select(
        &self,
        candidates: &[WorkerIdx],
        num_needed: usize,
        date: NaiveDate,
        shift: ShiftType,
        schedule: &Schedule,
    ) -> Vec<WorkerIdx> {
        let mut scored: Vec<(WorkerIdx, f64)> = Vec::with_capacity(candidates.len());
        for &idx in candidates {
            let worker = schedule.worker(idx);
            let impact = self.predictor.predict(worker, date, shift, schedule);
            if !impact.eligible {
                log_debug!(
                    self.verbosity,
                    "    {} dropped (impact {:.1}: {})",
                    worker.display_id(),
                    impact.score,
                    impact.violations.join(", ")
                );
                continue;
            }
            let combined = self.combined_score(worker, shift, impact.score);
            log_debug!(
                self.verbosity,
                "    {} impact={:.1} combined={:.3}",
                worker.display_id(),
                impact.score,
                combined
            );
            scored.push((idx, combined));
        }

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.into_iter().take(num_needed).map(|(idx, _)| idx).collect()
    }
}
