use crate::types::IncidentCategory;

/// Re-triggering rules that keep a breach from paging more than once.
///
/// Once an incident was raised for some value, only a materially worse value
/// raises another one. The ratios were tuned by hand and can be overridden.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hysteresis {
    /// A reputation incident re-triggers at or below `previous * ratio`.
    pub reputation_drop_ratio: f64,

    /// A penalty incident re-triggers at or above `previous * ratio`.
    pub penalty_growth_ratio: f64,
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self {
            reputation_drop_ratio: 0.75,
            penalty_growth_ratio: 1.5,
        }
    }
}

impl Hysteresis {
    /// Decides whether `value` warrants a new incident given the value that
    /// triggered the previous one, if any.
    #[must_use]
    pub fn should_trigger(
        &self,
        category: IncidentCategory,
        value: f64,
        previous: Option<f64>,
    ) -> bool {
        match category {
            IncidentCategory::Restart => value > previous.unwrap_or(0.0),
            IncidentCategory::Reputation => {
                previous.is_none_or(|previous| value <= previous * self.reputation_drop_ratio)
            }
            IncidentCategory::Penalty => {
                value > 0.0
                    && previous.is_none_or(|previous| value >= previous * self.penalty_growth_ratio)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_requires_strictly_more_restarts() {
        let hysteresis = Hysteresis::default();

        assert!(!hysteresis.should_trigger(IncidentCategory::Restart, 0.0, None));
        assert!(hysteresis.should_trigger(IncidentCategory::Restart, 1.0, None));
        assert!(!hysteresis.should_trigger(IncidentCategory::Restart, 3.0, Some(3.0)));
        assert!(hysteresis.should_trigger(IncidentCategory::Restart, 4.0, Some(3.0)));
    }

    #[test]
    fn test_reputation_requires_quarter_drop() {
        let hysteresis = Hysteresis::default();

        assert!(hysteresis.should_trigger(IncidentCategory::Reputation, 1999.0, None));
        assert!(!hysteresis.should_trigger(IncidentCategory::Reputation, 1999.0, Some(1999.0)));
        assert!(!hysteresis.should_trigger(IncidentCategory::Reputation, 900.0, Some(1000.0)));
        assert!(hysteresis.should_trigger(IncidentCategory::Reputation, 750.0, Some(1000.0)));
        assert!(hysteresis.should_trigger(IncidentCategory::Reputation, 700.0, Some(1000.0)));
    }

    #[test]
    fn test_penalty_requires_half_increase() {
        let hysteresis = Hysteresis::default();

        assert!(!hysteresis.should_trigger(IncidentCategory::Penalty, 0.0, None));
        assert!(hysteresis.should_trigger(IncidentCategory::Penalty, 10.0, None));
        assert!(!hysteresis.should_trigger(IncidentCategory::Penalty, 14.0, Some(10.0)));
        assert!(hysteresis.should_trigger(IncidentCategory::Penalty, 15.0, Some(10.0)));
    }

    #[test]
    fn test_custom_ratios() {
        let hysteresis = Hysteresis {
            reputation_drop_ratio: 0.9,
            penalty_growth_ratio: 1.1,
        };

        assert!(hysteresis.should_trigger(IncidentCategory::Reputation, 850.0, Some(1000.0)));
        assert!(hysteresis.should_trigger(IncidentCategory::Penalty, 12.0, Some(10.0)));
    }
}
