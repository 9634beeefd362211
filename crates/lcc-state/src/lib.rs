//! # lcc-state: Lifecycle Controller Core
//!
//! The synchronous heart of the device lifecycle controller. Everything in
//! this crate is a register or a pure function between registers; the
//! whole controller advances through [`controller::step`], which maps a
//! previous [`Snapshot`] and one step of inputs to the next snapshot.
//!
//! ## Components
//!
//! - **Interface arbiter** ([`arbiter`]): the hardware mutex between the
//!   software and test-access ports, and the mutex-protected transition
//!   registers.
//! - **Synchronizers** ([`sync`]): delay lines for signals arriving from
//!   other clock domains.
//! - **Escalation monitors** ([`escalation`]): differential-pair decoders
//!   for the two escalation lines.
//! - **Transition state machine** ([`fsm`]): validation, token hashing,
//!   clock bypass, destructive wipe, and store commit.
//! - **Broadcast decode** ([`broadcast`]): capability enables derived
//!   from the decoded state.
//! - **Status latch** ([`status`]) and **alert aggregator** ([`alert`]).
//!
//! ## Crate Policy
//!
//! - No I/O, no clocks, no threads. Collaborators (state store, hashing
//!   service, clock manager, NVM controller, power manager, alert handler)
//!   live outside this crate and talk to it only through
//!   [`ControllerInputs`] and [`ControllerOutputs`].
//! - No `unwrap()` outside tests; every fallible decode maps to an outcome
//!   flag or a terminal state.

pub mod alert;
pub mod arbiter;
pub mod broadcast;
pub mod controller;
pub mod escalation;
pub mod fsm;
pub mod status;
pub mod store;
pub mod sync;

pub use alert::{AlertOutputs, AlertTest};
pub use arbiter::{ArmedRequest, RegWrite};
pub use broadcast::DecodedView;
pub use controller::{
    step, ControllerInputs, ControllerOutputs, LifecycleController, PortView, Snapshot,
};
pub use escalation::{DiffPair, EscalationAcks, EscalationCause};
pub use fsm::FsmState;
pub use status::StatusRegister;
pub use store::{ProgramAck, ProgramRequest, ReferenceTokens, StoreContents, StoreReadout};
pub use sync::{CrossingInputs, Synchronizer};
