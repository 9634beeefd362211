//! # Escalation Properties
//!
//! An asserted escalation line must move the controller into its terminal
//! escalated state within a fixed number of steps, from any phase, and
//! nothing short of a hard reset may bring it back.

use lcc_core::{
    BroadcastEnables, DecodedState, IdentityState, LifecycleState, Port, Token, TokenKind,
    TransitionCount,
};
use lcc_crypto::{Sha256TokenHasher, TokenHasher};
use lcc_sim::{Device, OtpStore, SimConfig};
use lcc_state::{EscalationCause, FsmState, LifecycleController, RegWrite};
use proptest::prelude::*;

const UNLOCK_TOKEN: [u32; 4] = [0x0bad_f00d, 0x1234_5678, 0x9abc_def0, 0x0f0f_0f0f];

fn booted(state: LifecycleState) -> Device {
    let mut store = OtpStore::new(
        state,
        TransitionCount::new(2).expect("count in range"),
        IdentityState::Personalized,
    );
    store.provision_token(
        TokenKind::TestUnlock,
        Sha256TokenHasher::default().hash(&Token::from_words(UNLOCK_TOKEN)),
    );
    let mut device = Device::new(SimConfig::default(), store);
    device.boot().expect("device boots");
    device
}

/// Claim, load and strobe go without waiting for the outcome.
fn issue(d: &mut Device, target: LifecycleState, token: [u32; 4], external_clock: bool) {
    d.claim(Port::TestPort).expect("mutex free");
    d.write(Port::TestPort, RegWrite::Target(target.index()));
    for (index, value) in token.into_iter().enumerate() {
        d.write(Port::TestPort, RegWrite::TokenWord { index, value });
    }
    d.write(Port::TestPort, RegWrite::ExternalClock(external_clock));
    d.write(Port::TestPort, RegWrite::Go);
    d.tick();
}

/// A device parked in `phase` of an in-flight transition.
fn parked_in(phase: &str) -> Device {
    let mut d = match phase {
        "IDLE" => return booted(LifecycleState::Dev),
        "CLOCK_BYPASS" | "TOKEN_HASH" => {
            let mut d = booted(LifecycleState::TestLocked0);
            issue(&mut d, LifecycleState::TestUnlocked1, UNLOCK_TOKEN, true);
            d
        }
        _ => {
            let mut d = booted(LifecycleState::TestUnlocked0);
            issue(&mut d, LifecycleState::Rma, [0; 4], false);
            d
        }
    };
    d.run_until(|d| d.controller().snapshot().fsm().name() == phase)
        .expect("phase reached");
    d
}

fn assert_escalated(d: &Device, cause: EscalationCause) {
    assert_eq!(
        d.controller().snapshot().fsm(),
        &FsmState::Escalated(cause)
    );
    let view = d.read(Port::Software);
    assert_eq!(view.state, DecodedState::Escalate);
    assert_eq!(view.identity, Some(IdentityState::Invalid));
    let outputs = d.outputs();
    assert_eq!(outputs.enables, BroadcastEnables::SAFE);
    assert!(outputs.hash_req.is_none());
    assert!(outputs.program_req.is_none());
    assert!(!outputs.wipe_req && !outputs.clock_bypass_req);
}

#[test]
fn escalation_is_bounded_from_every_phase() {
    for phase in ["IDLE", "CLOCK_BYPASS", "TOKEN_HASH", "WIPE", "STORE_COMMIT"] {
        for cause in EscalationCause::ALL {
            let mut d = parked_in(phase);
            d.escalate(cause, true);
            d.run(LifecycleController::ESCALATION_LATENCY);
            assert_escalated(&d, cause);

            // The store is never left half-programmed.
            assert!(d.store().readout().decode().is_ok(), "{phase}/{cause}");
        }
    }
}

#[test]
fn escalation_is_irreversible_until_hard_reset() {
    let mut d = booted(LifecycleState::Prod);
    d.escalate(EscalationCause::WipeSecrets, true);
    d.run(LifecycleController::ESCALATION_LATENCY);
    assert_escalated(&d, EscalationCause::WipeSecrets);

    d.escalate(EscalationCause::WipeSecrets, false);
    d.run(100);
    assert_escalated(&d, EscalationCause::WipeSecrets);

    // Requests are not even accepted into the registers.
    d.write(Port::TestPort, RegWrite::Claim(true));
    d.tick();
    assert!(!d.read(Port::TestPort).write_enabled);

    d.hard_reset();
    d.boot().unwrap();
    let view = d.read(Port::Software);
    assert_eq!(view.state, DecodedState::Valid(LifecycleState::Prod));
    assert_eq!(view.identity, Some(IdentityState::Personalized));
    assert!(d.outputs().enables.provision_read);
}

#[test]
fn broken_pair_counts_as_asserted() {
    let mut d = booted(LifecycleState::Dev);
    d.break_escalation_pair(EscalationCause::WipeSecrets);
    d.run(LifecycleController::ESCALATION_LATENCY);
    assert_escalated(&d, EscalationCause::WipeSecrets);
}

#[test]
fn scrap_state_wins_when_both_assert() {
    let mut d = booted(LifecycleState::Dev);
    d.escalate(EscalationCause::WipeSecrets, true);
    d.escalate(EscalationCause::ScrapState, true);
    d.run(LifecycleController::ESCALATION_LATENCY);
    assert_escalated(&d, EscalationCause::ScrapState);
}

#[test]
fn first_cause_sticks() {
    let mut d = booted(LifecycleState::Dev);
    d.escalate(EscalationCause::WipeSecrets, true);
    d.run(LifecycleController::ESCALATION_LATENCY);
    d.escalate(EscalationCause::ScrapState, true);
    d.run(4);
    assert_escalated(&d, EscalationCause::WipeSecrets);
}

#[test]
fn acks_echo_the_lines() {
    let mut d = booted(LifecycleState::Dev);
    d.escalate(EscalationCause::ScrapState, true);
    d.tick();
    let acks = d.outputs().escalation_acks;
    assert!(acks.scrap_state);
    assert!(!acks.wipe_secrets);
}

#[test]
fn escalation_overrides_invalid() {
    let mut d = booted(LifecycleState::Dev);
    d.store_mut().corrupt_state_word(0xA5A5_A5A5);
    d.tick();
    assert_eq!(d.controller().snapshot().fsm(), &FsmState::Invalid);

    d.escalate(EscalationCause::ScrapState, true);
    d.run(LifecycleController::ESCALATION_LATENCY);
    assert_eq!(
        d.controller().snapshot().fsm(),
        &FsmState::Escalated(EscalationCause::ScrapState)
    );
    assert_eq!(d.read(Port::Software).state, DecodedState::Escalate);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn latency_is_exact_anywhere_in_a_transition(delay in 0u64..40, scrap in any::<bool>()) {
        let cause = if scrap {
            EscalationCause::ScrapState
        } else {
            EscalationCause::WipeSecrets
        };
        let mut d = booted(LifecycleState::TestUnlocked0);
        issue(&mut d, LifecycleState::Rma, [0; 4], true);
        d.run(delay);

        d.escalate(cause, true);
        d.tick();
        prop_assert!(!matches!(d.controller().snapshot().fsm(), FsmState::Escalated(_)));
        d.tick();
        prop_assert_eq!(d.controller().snapshot().fsm(), &FsmState::Escalated(cause));
        prop_assert_eq!(d.read(Port::Software).state, DecodedState::Escalate);
    }
}
