//! Configuration types for roster generation.

use pyo3::prelude::*;

use crate::generator::RosterError;
use crate::models::ShiftType;

/// Heuristic weights for impact prediction and candidate ranking.
///
/// These are tuning constants, not derived optima.
#[pyclass]
#[derive(Clone, Debug)]
pub struct ImpactWeights {
    /// Penalty for consuming a designated day off
    #[pyo3(get, set)]
    pub day_off: f64,
    /// Penalty for a Night shift followed by a daytime shift
    #[pyo3(get, set)]
    pub night_to_day: f64,
    /// Penalty for exceeding the consecutive working day cap
    #[pyo3(get, set)]
    pub consecutive: f64,
    /// Penalty for breaching the rest gap
    #[pyo3(get, set)]
    pub rest: f64,
    /// Days ahead inspected for slots the assignment would block
    #[pyo3(get, set)]
    pub lookahead_days: u32,
    /// Trailing days inspected for fatigue
    #[pyo3(get, set)]
    pub history_window_days: u32,
    /// Consecutive run length above which fatigue is penalized
    #[pyo3(get, set)]
    pub fatigue_run_threshold: u32,
    #[pyo3(get, set)]
    pub fatigue: f64,
    /// Spread in a worker's own shift-type counts that starts costing
    #[pyo3(get, set)]
    pub type_imbalance_threshold: u32,
    #[pyo3(get, set)]
    pub type_imbalance: f64,
    /// Impact below which a candidate stays eligible
    #[pyo3(get, set)]
    pub impact_limit: f64,
    /// Impact limit for Night slots, which are harder to fill
    #[pyo3(get, set)]
    pub night_impact_limit: f64,
    /// Selector: share of the normalized impact in the combined score
    #[pyo3(get, set)]
    pub selector_impact: f64,
    #[pyo3(get, set)]
    pub selector_workload: f64,
    #[pyo3(get, set)]
    pub selector_experience: f64,
    #[pyo3(get, set)]
    pub impact_norm: f64,
    #[pyo3(get, set)]
    pub workload_norm: f64,
    #[pyo3(get, set)]
    pub experience_norm: f64,
    /// Forced assignment: raw workload multiplier
    #[pyo3(get, set)]
    pub forced_workload: f64,
    /// Forced assignment: raw shift-type experience multiplier
    #[pyo3(get, set)]
    pub forced_experience: f64,
    /// Bonus for candidates that can be released from a lower-priority shift
    #[pyo3(get, set)]
    pub displacement_bonus: f64,
}

impl Default for ImpactWeights {
    fn default() -> Self {
        Self {
            day_off: 40.0,
            night_to_day: 30.0,
            consecutive: 20.0,
            rest: 15.0,
            lookahead_days: 3,
            history_window_days: 5,
            fatigue_run_threshold: 3,
            fatigue: 5.0,
            type_imbalance_threshold: 3,
            type_imbalance: 2.0,
            impact_limit: 20.0,
            night_impact_limit: 40.0,
            selector_impact: 0.6,
            selector_workload: 0.3,
            selector_experience: 0.1,
            impact_norm: 20.0,
            workload_norm: 30.0,
            experience_norm: 10.0,
            forced_workload: 0.3,
            forced_experience: 0.1,
            displacement_bonus: 5.0,
        }
    }
}

#[pymethods]
impl ImpactWeights {
    #[new]
    #[pyo3(signature = (
        day_off=None,
        night_to_day=None,
        consecutive=None,
        rest=None,
        lookahead_days=None,
        impact_limit=None,
        night_impact_limit=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        day_off: Option<f64>,
        night_to_day: Option<f64>,
        consecutive: Option<f64>,
        rest: Option<f64>,
        lookahead_days: Option<u32>,
        impact_limit: Option<f64>,
        night_impact_limit: Option<f64>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            day_off: day_off.unwrap_or(defaults.day_off),
            night_to_day: night_to_day.unwrap_or(defaults.night_to_day),
            consecutive: consecutive.unwrap_or(defaults.consecutive),
            rest: rest.unwrap_or(defaults.rest),
            lookahead_days: lookahead_days.unwrap_or(defaults.lookahead_days),
            impact_limit: impact_limit.unwrap_or(defaults.impact_limit),
            night_impact_limit: night_impact_limit.unwrap_or(defaults.night_impact_limit),
            ..defaults
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "ImpactWeights(day_off={}, night_to_day={}, consecutive={}, rest={})",
            self.day_off, self.night_to_day, self.consecutive, self.rest
        )
    }
}

/// Labor rules, post-processing switches and logging for a generation run.
#[pyclass]
#[derive(Clone, Debug)]
pub struct RosterConfig {
    /// Logging verbosity (0-3), see [`crate::logging`]
    #[pyo3(get, set)]
    pub verbosity: u8,
    /// Run day-off, balance and repair passes after the three phases
    #[pyo3(get, set)]
    pub post_process: bool,
    #[pyo3(get, set)]
    pub max_consecutive_days: u32,
    /// Minimum timeline gap (in shift slots) between two assignments, exclusive
    #[pyo3(get, set)]
    pub strict_rest_gap: u32,
    /// Rest gap used when the strict pool runs dry
    #[pyo3(get, set)]
    pub relaxed_rest_gap: u32,
    /// Pool-wide spread of a shift type's counts that enables the drift rule
    #[pyo3(get, set)]
    pub drift_spread_threshold: u32,
    #[pyo3(get, set)]
    pub drift_tolerance: u32,
    #[pyo3(get, set)]
    pub days_off_per_week: u32,
    #[pyo3(get, set)]
    pub balance_passes: u32,
    /// Cap on shift transfers per role group and pass
    #[pyo3(get, set)]
    pub max_transfers: u32,
    #[pyo3(get, set)]
    pub fairness_passes: u32,
    /// Relative premium-load gap tolerated by the fairness pass
    #[pyo3(get, set)]
    pub fairness_tolerance: f64,
    #[pyo3(get, set)]
    pub weights: ImpactWeights,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            post_process: true,
            max_consecutive_days: 5,
            strict_rest_gap: 2,
            relaxed_rest_gap: 1,
            drift_spread_threshold: 2,
            drift_tolerance: 0,
            days_off_per_week: 1,
            balance_passes: 2,
            max_transfers: 8,
            fairness_passes: 3,
            fairness_tolerance: 0.03,
            weights: ImpactWeights::default(),
        }
    }
}

#[pymethods]
impl RosterConfig {
    #[new]
    #[pyo3(signature = (
        verbosity=None,
        post_process=None,
        max_consecutive_days=None,
        strict_rest_gap=None,
        relaxed_rest_gap=None,
        days_off_per_week=None,
        weights=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        verbosity: Option<u8>,
        post_process: Option<bool>,
        max_consecutive_days: Option<u32>,
        strict_rest_gap: Option<u32>,
        relaxed_rest_gap: Option<u32>,
        days_off_per_week: Option<u32>,
        weights: Option<ImpactWeights>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            verbosity: verbosity.unwrap_or(defaults.verbosity),
            post_process: post_process.unwrap_or(defaults.post_process),
            max_consecutive_days: max_consecutive_days.unwrap_or(defaults.max_consecutive_days),
            strict_rest_gap: strict_rest_gap.unwrap_or(defaults.strict_rest_gap),
            relaxed_rest_gap: relaxed_rest_gap.unwrap_or(defaults.relaxed_rest_gap),
            days_off_per_week: days_off_per_week.unwrap_or(defaults.days_off_per_week),
            weights: weights.unwrap_or(defaults.weights),
            ..Self::default()
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "RosterConfig(max_consecutive_days={}, strict_rest_gap={}, relaxed_rest_gap={}, post_process={})",
            self.max_consecutive_days, self.strict_rest_gap, self.relaxed_rest_gap, self.post_process
        )
    }
}

/// Staffing requirement of one shift type.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct ShiftRequirement {
    pub shift: ShiftType,
    #[pyo3(get, set)]
    pub technologists: usize,
    #[pyo3(get, set)]
    pub needs_engineer: bool,
    /// Daytime shifts may not follow a Night shift
    #[pyo3(get, set)]
    pub daytime: bool,
}

impl ShiftRequirement {
    pub fn of(shift: ShiftType, technologists: usize, needs_engineer: bool) -> Self {
        Self {
            shift,
            technologists,
            needs_engineer,
            daytime: shift != ShiftType::Night,
        }
    }
}

#[pymethods]
impl ShiftRequirement {
    #[new]
    #[pyo3(signature = (shift, technologists, needs_engineer=true, daytime=None))]
    fn new(
        shift: &str,
        technologists: usize,
        needs_engineer: bool,
        daytime: Option<bool>,
    ) -> PyResult<Self> {
        let shift: ShiftType = shift
            .parse()
            .map_err(|e: RosterError| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
        let mut requirement = Self::of(shift, technologists, needs_engineer);
        if let Some(daytime) = daytime {
            requirement.daytime = daytime;
        }
        Ok(requirement)
    }

    #[getter(shift)]
    fn py_shift(&self) -> &'static str {
        self.shift.name()
    }

    fn __repr__(&self) -> String {
        format!(
            "ShiftRequirement(shift={}, technologists={}, needs_engineer={})",
            self.shift, self.technologists, self.needs_engineer
        )
    }
}

/// Shift-type policy table: which shift types are staffed and how.
#[derive(Clone, Debug, PartialEq)]
pub struct ShiftPolicy {
    requirements: Vec<ShiftRequirement>,
}

impl ShiftPolicy {
    /// Build a policy. Shift types keep the order given, duplicates are rejected.
    pub fn new(requirements: Vec<ShiftRequirement>) -> Result<Self, RosterError> {
        if requirements.is_empty() {
            return Err(RosterError::EmptyPolicy);
        }
        for (i, req) in requirements.iter().enumerate() {
            if requirements[..i].iter().any(|r| r.shift == req.shift) {
                return Err(RosterError::DuplicateShift(req.shift.to_string()));
            }
        }
        Ok(Self { requirements })
    }

    /// Shift types staffed by this policy, in policy order.
    pub fn shift_types(&self) -> impl Iterator<Item = ShiftType> + '_ {
        self.requirements.iter().map(|r| r.shift)
    }

    pub fn requirement(&self, shift: ShiftType) -> Option<&ShiftRequirement> {
        self.requirements.iter().find(|r| r.shift == shift)
    }

    #[inline]
    pub fn is_active(&self, shift: ShiftType) -> bool {
        self.requirement(shift).is_some()
    }

    pub fn required_technologists(&self, shift: ShiftType) -> usize {
        self.requirement(shift).map_or(0, |r| r.technologists)
    }

    pub fn needs_engineer(&self, shift: ShiftType) -> bool {
        self.requirement(shift).is_some_and(|r| r.needs_engineer)
    }

    /// Whether `shift` counts as daytime for the night-to-day ban.
    pub fn is_daytime(&self, shift: ShiftType) -> bool {
        match self.requirement(shift) {
            Some(r) => r.daytime,
            None => shift != ShiftType::Night,
        }
    }
}

impl Default for ShiftPolicy {
    fn default() -> Self {
        Self {
            requirements: vec![
                ShiftRequirement::of(ShiftType::Morning, 5, true),
                ShiftRequirement::of(ShiftType::Afternoon, 5, true),
                ShiftRequirement::of(ShiftType::Night, 2, true),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_table() {
        let policy = ShiftPolicy::default();
        assert_eq!(policy.required_technologists(ShiftType::Morning), 5);
        assert_eq!(policy.required_technologists(ShiftType::Night), 2);
        assert!(policy.needs_engineer(ShiftType::Afternoon));
        assert!(policy.is_daytime(ShiftType::Afternoon));
        assert!(!policy.is_daytime(ShiftType::Night));
    }

    #[test]
    fn test_policy_subset_and_validation() {
        let policy =
            ShiftPolicy::new(vec![ShiftRequirement::of(ShiftType::Morning, 2, true)]).unwrap();
        assert_eq!(policy.shift_types().count(), 1);
        assert!(!policy.is_active(ShiftType::Night));
        assert_eq!(policy.required_technologists(ShiftType::Night), 0);

        assert!(matches!(ShiftPolicy::new(vec![]), Err(RosterError::EmptyPolicy)));
        let dup = ShiftPolicy::new(vec![
            ShiftRequirement::of(ShiftType::Night, 2, true),
            ShiftRequirement::of(ShiftType::Night, 1, false),
        ]);
        assert!(matches!(dup, Err(RosterError::DuplicateShift(_))));
    }

    #[test]
    fn test_config_defaults() {
        let config = RosterConfig::default();
        assert_eq!(config.max_consecutive_days, 5);
        assert!(config.strict_rest_gap > config.relaxed_rest_gap);
        assert!(config.weights.day_off > config.weights.rest);
    }
}
