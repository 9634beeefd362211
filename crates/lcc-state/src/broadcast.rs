//! # Broadcast Decode
//!
//! Translates the controller's view of the lifecycle state into the
//! capability enables consumed by the rest of the device. The decode is a
//! pure function recomputed every step; nothing here is stored.
//!
//! | State              | debug | nvm_dbg | hw_dbg | cpu | prov_w | prov_r | keymgr | escalate |
//! |--------------------|:-----:|:-------:|:------:|:---:|:------:|:------:|:------:|:--------:|
//! | RAW, TEST_LOCKEDn  |       |         |        |     |        |        |        |          |
//! | TEST_UNLOCKEDn     |   ✓   |    ✓    |   ✓    |  ✓  |        |        |        |          |
//! | DEV                |       |         |   ✓    |  ✓  |  blank | pers.  |   ✓    |          |
//! | PROD, PROD_END     |       |         |        |  ✓  |  blank | pers.  |   ✓    |          |
//! | RMA                |   ✓   |    ✓    |   ✓    |  ✓  |   ✓    |   ✓    |   ✓    |          |
//! | SCRAP              |       |         |        |     |        |        |        |    ✓     |
//! | escalated, invalid |       |         |        |     |        |        |        |    ✓     |
//! | initializing       |       |         |        |     |        |        |        |          |
//!
//! "blank" / "pers." mean the enable follows the identity word: writable
//! while blank, readable once personalized.

use lcc_core::{
    BroadcastEnables, DecodedState, IdentityState, LifecycleState, TransitionCount,
};
use serde::{Deserialize, Serialize};

use crate::fsm::FsmState;
use crate::store::StoreReadout;

/// What the controller reports through its decoded-state registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecodedView {
    /// Decoded lifecycle state.
    pub state: DecodedState,
    /// Decoded transition count, if the count word is readable.
    pub count: Option<TransitionCount>,
    /// Decoded identity state.
    pub identity: Option<IdentityState>,
}

impl DecodedView {
    /// Derive the view from the state machine and the store readout.
    pub fn derive(fsm: &FsmState, store: &StoreReadout) -> Self {
        let count = store.count.decode().ok().filter(|_| store.valid);
        match fsm {
            FsmState::Reset => Self::default(),
            FsmState::Escalated(_) => Self {
                state: DecodedState::Escalate,
                count,
                identity: Some(IdentityState::Invalid),
            },
            FsmState::Invalid => Self {
                state: DecodedState::Invalid,
                count,
                identity: Some(IdentityState::Invalid),
            },
            _ => match store.decode() {
                Ok(contents) if store.valid && !store.error => Self {
                    state: DecodedState::Valid(contents.state),
                    count: Some(contents.count),
                    identity: Some(contents.identity),
                },
                _ => Self {
                    state: DecodedState::Invalid,
                    count,
                    identity: Some(IdentityState::Invalid),
                },
            },
        }
    }
}

/// Capability enables for a decoded view.
pub fn enables(view: &DecodedView) -> BroadcastEnables {
    match view.state {
        DecodedState::Initializing => BroadcastEnables::DISABLED,
        DecodedState::Escalate | DecodedState::Invalid => BroadcastEnables::SAFE,
        DecodedState::Valid(state) => {
            enables_for(state, view.identity.unwrap_or(IdentityState::Invalid))
        }
    }
}

/// Capability enables for a valid lifecycle state.
pub fn enables_for(state: LifecycleState, identity: IdentityState) -> BroadcastEnables {
    let provision_write = identity == IdentityState::Blank;
    let provision_read = identity == IdentityState::Personalized;
    match state {
        s if s.is_test_unlocked() => BroadcastEnables {
            debug: true,
            nvm_debug: true,
            hw_debug: true,
            cpu: true,
            ..BroadcastEnables::DISABLED
        },
        LifecycleState::Dev => BroadcastEnables {
            hw_debug: true,
            cpu: true,
            key_manager: true,
            provision_write,
            provision_read,
            ..BroadcastEnables::DISABLED
        },
        LifecycleState::Prod | LifecycleState::ProdEnd => BroadcastEnables {
            cpu: true,
            key_manager: true,
            provision_write,
            provision_read,
            ..BroadcastEnables::DISABLED
        },
        LifecycleState::Rma => BroadcastEnables {
            debug: true,
            nvm_debug: true,
            hw_debug: true,
            cpu: true,
            provision_write: true,
            provision_read: true,
            key_manager: true,
            escalate: false,
        },
        LifecycleState::Scrap => BroadcastEnables::SAFE,
        _ => BroadcastEnables::DISABLED,
    }
}
