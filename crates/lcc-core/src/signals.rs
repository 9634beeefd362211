//! # Signal Sets
//!
//! Plain value types for the controller's externally visible signal
//! groups: which command port is which, who holds the transition mutex,
//! the one-shot outcome pulses of a transition attempt, and the broadcast
//! capability enables.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// One of the two command sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Port {
    /// Register interface reachable from software.
    Software,
    /// Privileged external test-access port.
    TestPort,
}

impl Port {
    /// Both ports, in arbitration priority order.
    pub const BY_PRIORITY: [Port; 2] = [Port::TestPort, Port::Software];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Software => "SOFTWARE",
            Self::TestPort => "TEST_PORT",
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Holder of the transition-register mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutexOwner {
    /// Nobody holds the mutex.
    #[default]
    Unclaimed,
    /// The software port holds the mutex.
    Software,
    /// The test-access port holds the mutex.
    TestPort,
}

impl MutexOwner {
    /// The owning port, if any.
    pub fn port(self) -> Option<Port> {
        match self {
            Self::Unclaimed => None,
            Self::Software => Some(Port::Software),
            Self::TestPort => Some(Port::TestPort),
        }
    }

    /// Whether `port` holds the mutex.
    pub fn is_held_by(self, port: Port) -> bool {
        self.port() == Some(port)
    }
}

impl From<Port> for MutexOwner {
    fn from(port: Port) -> Self {
        match port {
            Port::Software => Self::Software,
            Port::TestPort => Self::TestPort,
        }
    }
}

impl fmt::Display for MutexOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port() {
            Some(port) => f.write_str(port.name()),
            None => f.write_str("UNCLAIMED"),
        }
    }
}

// ─── Outcome flags ──────────────────────────────────────────────────

/// Outcome of a transition attempt.
///
/// Produced by the transition state machine as one-shot pulses and
/// OR-accumulated by the status latch bank, where each bit becomes sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OutcomeFlags {
    /// The requested state and incremented count were committed.
    pub success: bool,
    /// The transition counter has no headroom left.
    pub count_error: bool,
    /// Target not decodable or not reachable from the current state.
    pub transition_error: bool,
    /// Hashed token did not match the reference.
    pub token_error: bool,
    /// The store answered a program request with an error.
    pub programming_error: bool,
    /// The persisted state did not decode.
    pub state_error: bool,
    /// The store's read side reported a write/partition error.
    pub store_error: bool,
}

impl OutcomeFlags {
    /// No flags set.
    pub const NONE: Self = Self {
        success: false,
        count_error: false,
        transition_error: false,
        token_error: false,
        programming_error: false,
        state_error: false,
        store_error: false,
    };

    /// Only `success`.
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::NONE
        }
    }

    /// Whether no flag is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Whether any error flag is set.
    pub fn any_error(&self) -> bool {
        self.count_error
            || self.transition_error
            || self.token_error
            || self.programming_error
            || self.state_error
            || self.store_error
    }

    /// Errors that indicate the store itself may be compromised.
    pub fn any_store_level_error(&self) -> bool {
        self.programming_error || self.state_error || self.store_error
    }

    /// Names of the set flags, in a fixed order.
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.success, "SUCCESS"),
            (self.count_error, "COUNT_ERROR"),
            (self.transition_error, "TRANSITION_ERROR"),
            (self.token_error, "TOKEN_ERROR"),
            (self.programming_error, "PROGRAMMING_ERROR"),
            (self.state_error, "STATE_ERROR"),
            (self.store_error, "STORE_ERROR"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }

    /// Set a flag by its canonical name. Returns `false` for unknown names.
    pub fn set_by_name(&mut self, name: &str) -> bool {
        let flag = match name.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => &mut self.success,
            "COUNT_ERROR" => &mut self.count_error,
            "TRANSITION_ERROR" => &mut self.transition_error,
            "TOKEN_ERROR" => &mut self.token_error,
            "PROGRAMMING_ERROR" => &mut self.programming_error,
            "STATE_ERROR" => &mut self.state_error,
            "STORE_ERROR" => &mut self.store_error,
            _ => return false,
        };
        *flag = true;
        true
    }

    /// Whether every flag set in `other` is also set in `self`.
    pub fn contains(&self, other: &Self) -> bool {
        (*self | *other) == *self
    }
}

impl BitOr for OutcomeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            success: self.success | rhs.success,
            count_error: self.count_error | rhs.count_error,
            transition_error: self.transition_error | rhs.transition_error,
            token_error: self.token_error | rhs.token_error,
            programming_error: self.programming_error | rhs.programming_error,
            state_error: self.state_error | rhs.state_error,
            store_error: self.store_error | rhs.store_error,
        }
    }
}

impl fmt::Display for OutcomeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            f.write_str("-")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

// ─── Broadcast enables ──────────────────────────────────────────────

/// Capability enables broadcast to the rest of the device.
///
/// `escalate` is the one signal whose safe value is asserted: it tells
/// other blocks to wipe or lock their secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BroadcastEnables {
    /// Design-for-test / test-mode debug.
    pub debug: bool,
    /// Non-volatile memory debug access.
    pub nvm_debug: bool,
    /// Hardware debug (JTAG into the processor).
    pub hw_debug: bool,
    /// Processor execution.
    pub cpu: bool,
    /// Software write access to provisioning partitions.
    pub provision_write: bool,
    /// Hardware read access to provisioned secrets.
    pub provision_read: bool,
    /// Key manager operation.
    pub key_manager: bool,
    /// Escalation broadcast.
    pub escalate: bool,
}

impl BroadcastEnables {
    /// Every capability off, escalation off. Reset value.
    pub const DISABLED: Self = Self {
        debug: false,
        nvm_debug: false,
        hw_debug: false,
        cpu: false,
        provision_write: false,
        provision_read: false,
        key_manager: false,
        escalate: false,
    };

    /// Every capability off, escalation asserted.
    pub const SAFE: Self = Self {
        escalate: true,
        ..Self::DISABLED
    };

    /// Whether any capability (everything except `escalate`) is granted.
    pub fn any_capability(&self) -> bool {
        self.debug
            || self.nvm_debug
            || self.hw_debug
            || self.cpu
            || self.provision_write
            || self.provision_read
            || self.key_manager
    }

    /// `(name, value)` pairs in a fixed order.
    pub fn entries(&self) -> [(&'static str, bool); 8] {
        [
            ("debug", self.debug),
            ("nvm_debug", self.nvm_debug),
            ("hw_debug", self.hw_debug),
            ("cpu", self.cpu),
            ("provision_write", self.provision_write),
            ("provision_read", self.provision_read),
            ("key_manager", self.key_manager),
            ("escalate", self.escalate),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_port_mapping() {
        assert_eq!(MutexOwner::Unclaimed.port(), None);
        assert!(MutexOwner::TestPort.is_held_by(Port::TestPort));
        assert!(!MutexOwner::TestPort.is_held_by(Port::Software));
        assert_eq!(MutexOwner::from(Port::Software), MutexOwner::Software);
        assert_eq!(MutexOwner::default(), MutexOwner::Unclaimed);
    }

    #[test]
    fn test_port_has_priority_order() {
        assert_eq!(Port::BY_PRIORITY[0], Port::TestPort);
    }

    #[test]
    fn outcome_union_is_bitwise_or() {
        let a = OutcomeFlags {
            token_error: true,
            ..OutcomeFlags::NONE
        };
        let merged = a | OutcomeFlags::success();
        assert!(merged.success && merged.token_error);
        assert!(merged.contains(&a));
        assert!(!a.contains(&merged));
    }

    #[test]
    fn outcome_names_and_set_by_name() {
        let mut flags = OutcomeFlags::NONE;
        assert!(flags.set_by_name("token_error"));
        assert!(flags.set_by_name("STATE_ERROR"));
        assert!(!flags.set_by_name("bogus"));
        assert_eq!(flags.names(), vec!["TOKEN_ERROR", "STATE_ERROR"]);
        assert_eq!(flags.to_string(), "TOKEN_ERROR|STATE_ERROR");
        assert!(flags.any_error());
        assert!(flags.any_store_level_error());
        assert_eq!(OutcomeFlags::NONE.to_string(), "-");
    }

    #[test]
    fn safe_enables_grant_nothing() {
        assert!(!BroadcastEnables::SAFE.any_capability());
        assert!(BroadcastEnables::SAFE.escalate);
        assert_eq!(BroadcastEnables::default(), BroadcastEnables::DISABLED);
    }
}
