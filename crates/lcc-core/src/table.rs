//! # Transition Table
//!
//! The lifecycle transition graph: which target states are reachable from
//! which source states, which reference token authenticates each edge, and
//! whether entering the target requires a destructive wipe first.
//!
//! The graph is configuration supplied alongside the state store, not
//! something the controller infers. [`TransitionTable::standard()`] is the
//! shipped default; deployments can load their own from YAML:
//!
//! ```yaml
//! rules:
//!   - { from: DEV, to: RMA, token: RMA, wipe: true }
//!   - { from: DEV, to: SCRAP }
//! ```
//!
//! ## Validation
//!
//! Every rule must move strictly forward in the lifecycle order (the store
//! encoding cannot move backwards), SCRAP has no outgoing edges, and an
//! edge may be listed once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TableError;
use crate::state::LifecycleState;
use crate::token::TokenKind;

/// One allowed edge of the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionRule {
    /// Source state.
    pub from: LifecycleState,
    /// Target state.
    pub to: LifecycleState,
    /// Reference token required, or `None` for an unauthenticated edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenKind>,
    /// Whether the destructive-wipe handshake must complete before commit.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wipe: bool,
}

impl TransitionRule {
    /// Unauthenticated edge without wipe.
    pub fn open(from: LifecycleState, to: LifecycleState) -> Self {
        Self {
            from,
            to,
            token: None,
            wipe: false,
        }
    }

    /// Edge authenticated by `kind`.
    pub fn with_token(from: LifecycleState, to: LifecycleState, kind: TokenKind) -> Self {
        Self {
            token: Some(kind),
            ..Self::open(from, to)
        }
    }

    /// Require the destructive-wipe handshake.
    pub fn wiping(mut self) -> Self {
        self.wipe = true;
        self
    }
}

#[derive(Serialize, Deserialize)]
struct TableDocument {
    rules: Vec<TransitionRule>,
}

/// Validated lifecycle transition graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    rules: BTreeMap<(LifecycleState, LifecycleState), TransitionRule>,
}

impl TransitionTable {
    /// Build and validate a table.
    pub fn new(rules: impl IntoIterator<Item = TransitionRule>) -> Result<Self, TableError> {
        let mut map = BTreeMap::new();
        for rule in rules {
            if rule.from.is_terminal() {
                return Err(TableError::LeavesScrap(rule.to));
            }
            if rule.to <= rule.from {
                return Err(TableError::NonMonotonic {
                    from: rule.from,
                    to: rule.to,
                });
            }
            if map.insert((rule.from, rule.to), rule).is_some() {
                return Err(TableError::Duplicate {
                    from: rule.from,
                    to: rule.to,
                });
            }
        }
        Ok(Self { rules: map })
    }

    /// Parse and validate a YAML table document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TableError> {
        let doc: TableDocument =
            serde_yaml::from_str(yaml).map_err(|e| TableError::Parse(e.to_string()))?;
        Self::new(doc.rules)
    }

    /// Render as a YAML table document.
    pub fn to_yaml_string(&self) -> Result<String, TableError> {
        let doc = TableDocument {
            rules: self.rules.values().copied().collect(),
        };
        serde_yaml::to_string(&doc).map_err(|e| TableError::Parse(e.to_string()))
    }

    /// The rule for `from → to`, if the edge exists.
    pub fn lookup(&self, from: LifecycleState, to: LifecycleState) -> Option<&TransitionRule> {
        self.rules.get(&(from, to))
    }

    /// Targets reachable from `from` in one transition, in lifecycle order.
    pub fn targets_from(&self, from: LifecycleState) -> Vec<LifecycleState> {
        self.rules
            .range((from, LifecycleState::Raw)..=(from, LifecycleState::Scrap))
            .map(|(_, rule)| rule.to)
            .collect()
    }

    /// All rules, ordered by `(from, to)`.
    pub fn rules(&self) -> impl Iterator<Item = &TransitionRule> {
        self.rules.values()
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no edges.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The shipped default graph.
    ///
    /// - RAW → any TEST_UNLOCKED (raw-unlock token)
    /// - TEST_UNLOCKEDn → TEST_LOCKEDm, m ≥ n (open)
    /// - TEST_LOCKEDn → TEST_UNLOCKEDm, m > n (test-unlock token)
    /// - any TEST state → DEV / PROD / PROD_END (test-exit token)
    /// - TEST_UNLOCKEDn → RMA (open, wipe)
    /// - DEV / PROD → RMA (rma token, wipe)
    /// - anything but SCRAP → SCRAP (open)
    pub fn standard() -> Self {
        use LifecycleState::*;

        let mut rules = Vec::new();
        for to in LifecycleState::ALL {
            if to.is_test_unlocked() {
                rules.push(TransitionRule::with_token(Raw, to, TokenKind::RawUnlock));
            }
        }
        for from in LifecycleState::ALL {
            let Some(from_level) = from.test_level() else {
                continue;
            };
            for to in LifecycleState::ALL {
                let Some(to_level) = to.test_level() else {
                    continue;
                };
                if from.is_test_unlocked() && to.is_test_locked() && to_level >= from_level {
                    rules.push(TransitionRule::open(from, to));
                }
                if from.is_test_locked() && to.is_test_unlocked() && to_level > from_level {
                    rules.push(TransitionRule::with_token(from, to, TokenKind::TestUnlock));
                }
            }
            for to in [Dev, Prod, ProdEnd] {
                rules.push(TransitionRule::with_token(from, to, TokenKind::TestExit));
            }
            if from.is_test_unlocked() {
                rules.push(TransitionRule::open(from, Rma).wiping());
            }
        }
        for from in [Dev, Prod] {
            rules.push(TransitionRule::with_token(from, Rma, TokenKind::Rma).wiping());
        }
        for from in LifecycleState::ALL {
            if !from.is_terminal() {
                rules.push(TransitionRule::open(from, Scrap));
            }
        }

        let mut table = BTreeMap::new();
        for rule in rules {
            table.insert((rule.from, rule.to), rule);
        }
        Self { rules: table }
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl Serialize for TransitionTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TableDocument {
            rules: self.rules.values().copied().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TransitionTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let doc = TableDocument::deserialize(deserializer)?;
        Self::new(doc.rules).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    #[test]
    fn standard_table_passes_validation() {
        let standard = TransitionTable::standard();
        let rebuilt = TransitionTable::new(standard.rules().copied()).unwrap();
        assert_eq!(rebuilt, standard);
    }

    #[test]
    fn standard_table_is_monotonic() {
        for rule in TransitionTable::standard().rules() {
            assert!(rule.to > rule.from, "{} -> {}", rule.from, rule.to);
        }
    }

    #[test]
    fn scrap_has_no_targets() {
        assert!(TransitionTable::standard().targets_from(Scrap).is_empty());
    }

    #[test]
    fn standard_edges() {
        let t = TransitionTable::standard();
        assert_eq!(
            t.lookup(Raw, TestUnlocked0).and_then(|r| r.token),
            Some(TokenKind::RawUnlock)
        );
        assert_eq!(t.lookup(TestUnlocked2, TestLocked2).map(|r| r.token), Some(None));
        assert!(t.lookup(TestUnlocked2, TestLocked1).is_none());
        assert_eq!(
            t.lookup(TestLocked1, TestUnlocked2).and_then(|r| r.token),
            Some(TokenKind::TestUnlock)
        );
        assert!(t.lookup(TestLocked1, TestUnlocked1).is_none());
        assert_eq!(
            t.lookup(TestLocked3, Prod).and_then(|r| r.token),
            Some(TokenKind::TestExit)
        );
        let rma = t.lookup(Prod, Rma).copied().unwrap();
        assert_eq!(rma.token, Some(TokenKind::Rma));
        assert!(rma.wipe);
        assert!(t.lookup(ProdEnd, Rma).is_none());
        assert!(t.lookup(Dev, Prod).is_none());
        assert!(t.lookup(Raw, Scrap).is_some());
        assert!(t.lookup(Raw, Dev).is_none());
    }

    #[test]
    fn rejects_backwards_rule() {
        let err = TransitionTable::new([TransitionRule::open(Prod, Dev)]).unwrap_err();
        assert_eq!(err, TableError::NonMonotonic { from: Prod, to: Dev });
        assert!(TransitionTable::new([TransitionRule::open(Dev, Dev)]).is_err());
    }

    #[test]
    fn rejects_leaving_scrap() {
        let err = TransitionTable::new([TransitionRule::open(Scrap, Dev)]).unwrap_err();
        assert_eq!(err, TableError::LeavesScrap(Dev));
    }

    #[test]
    fn rejects_duplicates() {
        let err = TransitionTable::new([
            TransitionRule::open(Dev, Scrap),
            TransitionRule::with_token(Dev, Scrap, TokenKind::Rma),
        ])
        .unwrap_err();
        assert_eq!(err, TableError::Duplicate { from: Dev, to: Scrap });
    }

    #[test]
    fn yaml_round_trip() {
        let yaml = "rules:\n  - { from: DEV, to: RMA, token: RMA, wipe: true }\n  - { from: DEV, to: SCRAP }\n";
        let table = TransitionTable::from_yaml_str(yaml).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.targets_from(Dev), vec![Rma, Scrap]);

        let rendered = table.to_yaml_string().unwrap();
        assert_eq!(TransitionTable::from_yaml_str(&rendered).unwrap(), table);
    }

    #[test]
    fn yaml_validation_applies() {
        let yaml = "rules:\n  - { from: PROD, to: DEV }\n";
        assert!(matches!(
            TransitionTable::from_yaml_str(yaml),
            Err(TableError::NonMonotonic { .. })
        ));
        assert!(matches!(
            TransitionTable::from_yaml_str("rules: [ { from: NOPE, to: DEV } ]"),
            Err(TableError::Parse(_))
        ));
    }
}
