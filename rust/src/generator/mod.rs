//! Roster generation: eligibility rules, impact-aware selection, relaxation
//! and forced assignment, orchestrated by [`ScheduleGenerator`].

mod core;
mod eligibility;
mod filler;
mod forced;
mod impact;
mod relaxation;
mod selector;

pub use core::{RosterError, RosterOutcome, RosterReport, ScheduleGenerator, SlotState};
pub use eligibility::{consecutive_run_through, EligibilityChecker, Ineligibility, Strictness};
pub use filler::{FillOutcome, SlotFiller};
pub use forced::{force_fill, score_candidates, ForcedCandidate};
pub use impact::{ImpactAssessment, ImpactPredictor};
pub use relaxation::{expand_candidates, fill_from_tiers, Tier};
pub use selector::{rank_by_load, WorkerSelector};
