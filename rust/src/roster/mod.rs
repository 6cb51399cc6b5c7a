//! Roster storage: the authoritative schedule, its date index, and the
//! mutation path that keeps the two in sync.

mod date_index;
mod schedule;
mod state;

pub use date_index::{DateIndex, DaySnapshot};
pub use schedule::{AssignError, Schedule, SlotRoster};
pub use state::RosterState;
