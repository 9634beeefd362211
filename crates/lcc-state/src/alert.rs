//! # Alert Aggregator
//!
//! Two alert lines leave the controller:
//!
//! | Line              | Raised by                                        |
//! |-------------------|--------------------------------------------------|
//! | `programming`     | latched programming error                        |
//! | `state_integrity` | latched state error or store error               |
//!
//! Both lines are levels derived from the sticky status latch, so they
//! stay up until a hard reset. Either port can additionally inject a
//! one-step test pulse on each line; the mutex does not gate alert tests.

use lcc_core::OutcomeFlags;
use serde::{Deserialize, Serialize};

/// Test pulse request, one bit per alert line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AlertTest {
    /// Pulse the programming-error line.
    #[serde(default)]
    pub programming: bool,
    /// Pulse the state-integrity line.
    #[serde(default)]
    pub state_integrity: bool,
}

impl std::ops::BitOr for AlertTest {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            programming: self.programming | rhs.programming,
            state_integrity: self.state_integrity | rhs.state_integrity,
        }
    }
}

/// Registered alert outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AlertOutputs {
    /// Programming-error alert.
    pub programming: bool,
    /// State-integrity alert.
    pub state_integrity: bool,
}

/// Alert output register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlertAggregator {
    outputs: AlertOutputs,
}

impl AlertAggregator {
    /// Derive the next outputs from the latched status and this step's
    /// test pulses.
    pub fn next(&self, latched: &OutcomeFlags, test: AlertTest) -> Self {
        let outputs = AlertOutputs {
            programming: latched.programming_error || test.programming,
            state_integrity: latched.state_error || latched.store_error || test.state_integrity,
        };
        if outputs.programming && !self.outputs.programming && !test.programming {
            tracing::error!("programming alert raised");
        }
        if outputs.state_integrity && !self.outputs.state_integrity && !test.state_integrity {
            tracing::error!("state integrity alert raised");
        }
        Self { outputs }
    }

    /// Current outputs.
    pub fn outputs(&self) -> AlertOutputs {
        self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_without_errors() {
        let a = AlertAggregator::default().next(&OutcomeFlags::success(), AlertTest::default());
        assert_eq!(a.outputs(), AlertOutputs::default());
    }

    #[test]
    fn maps_latched_errors_to_lines() {
        let mut flags = OutcomeFlags::NONE;
        flags.programming_error = true;
        let a = AlertAggregator::default().next(&flags, AlertTest::default());
        assert!(a.outputs().programming);
        assert!(!a.outputs().state_integrity);

        let setters: [fn(&mut OutcomeFlags); 2] =
            [|f| f.state_error = true, |f| f.store_error = true];
        for set in setters {
            let mut flags = OutcomeFlags::NONE;
            set(&mut flags);
            let a = AlertAggregator::default().next(&flags, AlertTest::default());
            assert!(a.outputs().state_integrity);
            assert!(!a.outputs().programming);
        }
    }

    #[test]
    fn token_and_transition_errors_do_not_alert() {
        let mut flags = OutcomeFlags::NONE;
        flags.token_error = true;
        flags.transition_error = true;
        flags.count_error = true;
        let a = AlertAggregator::default().next(&flags, AlertTest::default());
        assert_eq!(a.outputs(), AlertOutputs::default());
    }

    #[test]
    fn test_pulse_lasts_one_step() {
        let test = AlertTest {
            programming: false,
            state_integrity: true,
        };
        let a = AlertAggregator::default().next(&OutcomeFlags::NONE, test);
        assert!(a.outputs().state_integrity);
        let a = a.next(&OutcomeFlags::NONE, AlertTest::default());
        assert_eq!(a.outputs(), AlertOutputs::default());
    }

    #[test]
    fn alert_test_merges() {
        let a = AlertTest {
            programming: true,
            state_integrity: false,
        };
        let b = AlertTest {
            programming: false,
            state_integrity: true,
        };
        assert_eq!(
            a | b,
            AlertTest {
                programming: true,
                state_integrity: true
            }
        );
    }
}
