//! # Lifecycle and Identity States
//!
//! The lifecycle state is a totally ordered enumeration: a device only ever
//! moves forward through it. The declaration order of [`LifecycleState`] is
//! the lifecycle order, and `Ord` follows it.
//!
//! ```text
//! RAW ─▶ TEST_UNLOCKED0 ─▶ TEST_LOCKED0 ─▶ … ─▶ TEST_UNLOCKED7
//!     ─▶ DEV ─▶ PROD ─▶ PROD_END ─▶ RMA ─▶ SCRAP
//! ```
//!
//! Which forward edges are actually allowed is not encoded here; that is
//! the job of the configurable [`TransitionTable`](crate::TransitionTable).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EncodingError;

/// Persisted lifecycle state of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Unprogrammed silicon.
    Raw,
    TestUnlocked0,
    TestLocked0,
    TestUnlocked1,
    TestLocked1,
    TestUnlocked2,
    TestLocked2,
    TestUnlocked3,
    TestLocked3,
    TestUnlocked4,
    TestLocked4,
    TestUnlocked5,
    TestLocked5,
    TestUnlocked6,
    TestLocked6,
    TestUnlocked7,
    /// Development part: hardware debug available, secrets provisionable.
    Dev,
    /// Production part.
    Prod,
    /// Production part that can no longer enter RMA.
    ProdEnd,
    /// Returned for failure analysis; secrets wiped on entry.
    Rma,
    /// Permanently disabled. Terminal.
    Scrap,
}

impl LifecycleState {
    /// Number of lifecycle states.
    pub const COUNT: usize = 21;

    /// Every state, in lifecycle order.
    pub const ALL: [LifecycleState; Self::COUNT] = [
        Self::Raw,
        Self::TestUnlocked0,
        Self::TestLocked0,
        Self::TestUnlocked1,
        Self::TestLocked1,
        Self::TestUnlocked2,
        Self::TestLocked2,
        Self::TestUnlocked3,
        Self::TestLocked3,
        Self::TestUnlocked4,
        Self::TestLocked4,
        Self::TestUnlocked5,
        Self::TestLocked5,
        Self::TestUnlocked6,
        Self::TestLocked6,
        Self::TestUnlocked7,
        Self::Dev,
        Self::Prod,
        Self::ProdEnd,
        Self::Rma,
        Self::Scrap,
    ];

    /// Position in the lifecycle order (`RAW` = 0, `SCRAP` = 20).
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Inverse of [`index`](Self::index). Used to decode the target
    /// register written by a command port.
    pub fn from_index(index: u32) -> Result<Self, EncodingError> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(EncodingError::StateIndex(index))
    }

    /// Canonical name (e.g. `"TEST_UNLOCKED3"`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::TestUnlocked0 => "TEST_UNLOCKED0",
            Self::TestLocked0 => "TEST_LOCKED0",
            Self::TestUnlocked1 => "TEST_UNLOCKED1",
            Self::TestLocked1 => "TEST_LOCKED1",
            Self::TestUnlocked2 => "TEST_UNLOCKED2",
            Self::TestLocked2 => "TEST_LOCKED2",
            Self::TestUnlocked3 => "TEST_UNLOCKED3",
            Self::TestLocked3 => "TEST_LOCKED3",
            Self::TestUnlocked4 => "TEST_UNLOCKED4",
            Self::TestLocked4 => "TEST_LOCKED4",
            Self::TestUnlocked5 => "TEST_UNLOCKED5",
            Self::TestLocked5 => "TEST_LOCKED5",
            Self::TestUnlocked6 => "TEST_UNLOCKED6",
            Self::TestLocked6 => "TEST_LOCKED6",
            Self::TestUnlocked7 => "TEST_UNLOCKED7",
            Self::Dev => "DEV",
            Self::Prod => "PROD",
            Self::ProdEnd => "PROD_END",
            Self::Rma => "RMA",
            Self::Scrap => "SCRAP",
        }
    }

    /// Whether this is one of the `TEST_UNLOCKEDn` states.
    pub fn is_test_unlocked(self) -> bool {
        matches!(
            self,
            Self::TestUnlocked0
                | Self::TestUnlocked1
                | Self::TestUnlocked2
                | Self::TestUnlocked3
                | Self::TestUnlocked4
                | Self::TestUnlocked5
                | Self::TestUnlocked6
                | Self::TestUnlocked7
        )
    }

    /// Whether this is one of the `TEST_LOCKEDn` states.
    pub fn is_test_locked(self) -> bool {
        matches!(
            self,
            Self::TestLocked0
                | Self::TestLocked1
                | Self::TestLocked2
                | Self::TestLocked3
                | Self::TestLocked4
                | Self::TestLocked5
                | Self::TestLocked6
        )
    }

    /// Whether this is any test state, locked or unlocked.
    pub fn is_test(self) -> bool {
        self.is_test_unlocked() || self.is_test_locked()
    }

    /// The `n` of `TEST_UNLOCKEDn` / `TEST_LOCKEDn`.
    pub fn test_level(self) -> Option<u32> {
        if self.is_test_unlocked() {
            Some((self.index() - 1) / 2)
        } else if self.is_test_locked() {
            Some((self.index() - 2) / 2)
        } else {
            None
        }
    }

    /// Whether the state is SCRAP.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Scrap)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LifecycleState {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.name() == upper)
            .ok_or_else(|| EncodingError::StateName(s.to_string()))
    }
}

// ─── Transition count ───────────────────────────────────────────────

/// Number of committed lifecycle transitions.
///
/// Persisted next to the state. Bounded by [`TransitionCount::MAX`]; once
/// the bound is reached no further transition can be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TransitionCount(u8);

impl TransitionCount {
    /// Maximum number of transitions over the device lifetime.
    pub const MAX: u32 = 24;

    /// Zero transitions.
    pub const ZERO: Self = Self(0);

    /// Construct a count, rejecting values above [`MAX`](Self::MAX).
    pub fn new(value: u32) -> Result<Self, EncodingError> {
        if value > Self::MAX {
            return Err(EncodingError::Count(value));
        }
        Ok(Self(value as u8))
    }

    /// The numeric count.
    pub fn value(self) -> u32 {
        u32::from(self.0)
    }

    /// The count after one more committed transition, or `None` when the
    /// counter is exhausted.
    pub fn incremented(self) -> Option<Self> {
        Self::new(self.value() + 1).ok()
    }
}

impl TryFrom<u32> for TransitionCount {
    type Error = EncodingError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TransitionCount> for u32 {
    fn from(count: TransitionCount) -> Self {
        count.value()
    }
}

impl fmt::Display for TransitionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Identity state ─────────────────────────────────────────────────

/// Device identity provisioning state, tracked independently of the
/// lifecycle state but persisted in the same store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityState {
    /// No device secrets provisioned yet.
    Blank,
    /// Device secrets provisioned and locked.
    Personalized,
    /// Undecodable, or forced by escalation.
    Invalid,
}

impl IdentityState {
    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Blank => "BLANK",
            Self::Personalized => "PERSONALIZED",
            Self::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for IdentityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IdentityState {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BLANK" => Ok(Self::Blank),
            "PERSONALIZED" => Ok(Self::Personalized),
            "INVALID" => Ok(Self::Invalid),
            _ => Err(EncodingError::IdentityName(s.to_string())),
        }
    }
}

// ─── Decoded state (register view) ──────────────────────────────────

/// Lifecycle state as seen through the decoded-state register.
///
/// Either a valid member of [`LifecycleState`] or one of the explicit
/// non-state values the controller can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind", content = "state")]
pub enum DecodedState {
    /// The controller has not completed its power-up handshake.
    Initializing,
    /// A validated lifecycle state.
    Valid(LifecycleState),
    /// An escalation forced the controller into its terminal safe state.
    Escalate,
    /// The persisted state could not be decoded.
    Invalid,
}

impl DecodedState {
    /// The lifecycle state, if the decoded value is valid.
    pub fn state(self) -> Option<LifecycleState> {
        match self {
            Self::Valid(state) => Some(state),
            _ => None,
        }
    }

    /// Whether the value is a valid lifecycle state.
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

impl Default for DecodedState {
    fn default() -> Self {
        Self::Initializing
    }
}

impl fmt::Display for DecodedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => f.write_str("INITIALIZING"),
            Self::Valid(state) => f.write_str(state.name()),
            Self::Escalate => f.write_str("ESCALATE"),
            Self::Invalid => f.write_str("INVALID"),
        }
    }
}

impl FromStr for DecodedState {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INITIALIZING" => Ok(Self::Initializing),
            "ESCALATE" => Ok(Self::Escalate),
            "INVALID" => Ok(Self::Invalid),
            _ => s.parse().map(Self::Valid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_in_declaration_order() {
        for (i, state) in LifecycleState::ALL.iter().enumerate() {
            assert_eq!(state.index() as usize, i);
        }
    }

    #[test]
    fn order_follows_lifecycle() {
        assert!(LifecycleState::Raw < LifecycleState::TestUnlocked0);
        assert!(LifecycleState::TestUnlocked7 < LifecycleState::Dev);
        assert!(LifecycleState::ProdEnd < LifecycleState::Rma);
        assert!(LifecycleState::Rma < LifecycleState::Scrap);
    }

    #[test]
    fn from_index_rejects_out_of_range() {
        assert_eq!(LifecycleState::from_index(16), Ok(LifecycleState::Dev));
        assert_eq!(
            LifecycleState::from_index(21),
            Err(EncodingError::StateIndex(21))
        );
    }

    #[test]
    fn name_round_trips_through_from_str() {
        for state in LifecycleState::ALL {
            assert_eq!(state.name().parse::<LifecycleState>(), Ok(state));
        }
        assert_eq!("prod-end".parse::<LifecycleState>(), Ok(LifecycleState::ProdEnd));
        assert!("OPERATIONAL".parse::<LifecycleState>().is_err());
    }

    #[test]
    fn serde_name_matches_canonical_name() {
        for state in LifecycleState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.name()));
        }
    }

    #[test]
    fn identity_parses_case_insensitively() {
        assert_eq!("personalized".parse(), Ok(IdentityState::Personalized));
        assert_eq!(" BLANK ".parse(), Ok(IdentityState::Blank));
        assert_eq!(
            "locked".parse::<IdentityState>(),
            Err(EncodingError::IdentityName("locked".to_string()))
        );
    }

    #[test]
    fn test_state_predicates() {
        assert!(LifecycleState::TestUnlocked3.is_test_unlocked());
        assert!(!LifecycleState::TestUnlocked3.is_test_locked());
        assert!(LifecycleState::TestLocked6.is_test());
        assert!(!LifecycleState::Dev.is_test());
        assert!(!LifecycleState::Raw.is_test());
        assert!(LifecycleState::Scrap.is_terminal());
    }

    #[test]
    fn test_levels() {
        assert_eq!(LifecycleState::TestUnlocked0.test_level(), Some(0));
        assert_eq!(LifecycleState::TestLocked0.test_level(), Some(0));
        assert_eq!(LifecycleState::TestLocked6.test_level(), Some(6));
        assert_eq!(LifecycleState::TestUnlocked7.test_level(), Some(7));
        assert_eq!(LifecycleState::Dev.test_level(), None);
    }

    #[test]
    fn count_headroom_and_increment() {
        let count = TransitionCount::new(5).unwrap();
        assert_eq!(count.incremented().map(TransitionCount::value), Some(6));

        let max = TransitionCount::new(TransitionCount::MAX).unwrap();
        assert_eq!(max.incremented(), None);
        assert!(TransitionCount::new(25).is_err());
    }

    #[test]
    fn count_deserialize_rejects_overflow() {
        assert!(serde_json::from_str::<TransitionCount>("24").is_ok());
        assert!(serde_json::from_str::<TransitionCount>("25").is_err());
    }

    #[test]
    fn decoded_state_display() {
        assert_eq!(DecodedState::Valid(LifecycleState::Dev).to_string(), "DEV");
        assert_eq!(DecodedState::Escalate.to_string(), "ESCALATE");
        assert_eq!(DecodedState::default(), DecodedState::Initializing);
        assert_eq!(DecodedState::Invalid.state(), None);
    }

    #[test]
    fn decoded_state_parses_display_form() {
        for value in [
            DecodedState::Initializing,
            DecodedState::Escalate,
            DecodedState::Invalid,
            DecodedState::Valid(LifecycleState::ProdEnd),
        ] {
            assert_eq!(value.to_string().parse::<DecodedState>(), Ok(value));
        }
        assert_eq!("test-unlocked3".parse::<DecodedState>(), Ok(DecodedState::Valid(LifecycleState::TestUnlocked3)));
        assert!("bogus".parse::<DecodedState>().is_err());
    }
}
