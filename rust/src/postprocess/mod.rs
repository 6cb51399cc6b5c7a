//! Post-processing passes run after the three generation phases, plus the
//! final read-only validation.
//!
//! Each pass takes the generation state explicitly and returns how much it
//! changed, so the generator can report it.

mod balance;
mod day_off;
mod repair;
mod validation;

pub use balance::{balance_workload, is_premium, optimize_fairness};
pub use day_off::{ensure_weekly_days_off, liberation_cost, verify_weekly_days_off};
pub use repair::{fix_schedule_issues, resolve_constraint_violations};
pub use validation::validate_schedule;
