//! # End-to-End Transition Flows
//!
//! Complete transition attempts through the simulated device: token
//! authentication, owner-only register readback, rejected requests,
//! sticky status and recovery by hard reset.

use lcc_core::{
    BroadcastEnables, DecodedState, IdentityState, LifecycleState, MutexOwner, OutcomeFlags,
    Port, Token, TokenKind, TransitionCount, TransitionRule, TransitionTable, TOKEN_WORDS,
};
use lcc_crypto::{Sha256TokenHasher, TokenHasher};
use lcc_sim::{Device, OtpStore, SimConfig, SimError, TransitionRequest};
use lcc_state::RegWrite;

const EXIT_TOKEN: [u32; 4] = [0xdead_beef, 0x0123_4567, 0x89ab_cdef, 0x5555_aaaa];
const RMA_TOKEN: [u32; 4] = [0x1111_1111, 0x2222_2222, 0x3333_3333, 0x4444_4444];

fn count(value: u32) -> TransitionCount {
    TransitionCount::new(value).expect("count in range")
}

/// Standard table plus a board-specific DEV → PROD edge.
fn board_table() -> TransitionTable {
    let extra = TransitionRule::with_token(
        LifecycleState::Dev,
        LifecycleState::Prod,
        TokenKind::TestExit,
    );
    TransitionTable::new(
        TransitionTable::standard()
            .rules()
            .copied()
            .chain(std::iter::once(extra)),
    )
    .expect("board table validates")
}

fn provisioned_store(state: LifecycleState, value: u32) -> OtpStore {
    let hasher = Sha256TokenHasher::default();
    let mut store = OtpStore::new(state, count(value), IdentityState::Blank);
    store.provision_token(TokenKind::TestExit, hasher.hash(&Token::from_words(EXIT_TOKEN)));
    store.provision_token(TokenKind::Rma, hasher.hash(&Token::from_words(RMA_TOKEN)));
    store
}

fn booted(state: LifecycleState, value: u32) -> Device {
    let mut device = Device::with_parts(
        SimConfig::default(),
        board_table(),
        provisioned_store(state, value),
        Sha256TokenHasher::default(),
    );
    device.boot().expect("device boots");
    device
}

fn request(target: LifecycleState, token: [u32; 4]) -> TransitionRequest {
    TransitionRequest {
        target: target.index(),
        token: Token::from_words(token),
        external_clock: false,
    }
}

fn only(set: impl FnOnce(&mut OutcomeFlags)) -> OutcomeFlags {
    let mut flags = OutcomeFlags::NONE;
    set(&mut flags);
    flags
}

#[test]
fn dev_to_prod_commits_with_owner_only_readback() {
    let mut d = booted(LifecycleState::Dev, 5);
    d.claim(Port::Software).unwrap();

    d.write(Port::Software, RegWrite::Target(LifecycleState::Prod.index()));
    for (index, value) in EXIT_TOKEN.into_iter().enumerate() {
        d.write(Port::Software, RegWrite::TokenWord { index, value });
    }
    d.tick();

    let owner = d.read(Port::Software);
    assert!(owner.write_enabled);
    assert_eq!(owner.target, LifecycleState::Prod.index());
    assert_eq!(owner.token, EXIT_TOKEN);

    let other = d.read(Port::TestPort);
    assert_eq!(other.owner, MutexOwner::Software);
    assert!(!other.write_enabled);
    assert_eq!(other.target, 0);
    assert_eq!(other.token, [0; TOKEN_WORDS]);

    d.write(Port::Software, RegWrite::Go);
    d.tick();
    d.run_until(|d| !d.last_outcome().is_empty()).unwrap();
    assert_eq!(d.last_outcome(), OutcomeFlags::success());

    let view = d.read(Port::Software);
    assert_eq!(view.state, DecodedState::Valid(LifecycleState::Prod));
    assert_eq!(view.count, Some(count(6)));
    assert!(view.status.flags.success);
    assert!(view.status.ready);

    // Outcome pulses last one step.
    d.tick();
    assert!(d.last_outcome().is_empty());
    assert!(d.read(Port::Software).status.flags.success);
}

#[test]
fn wrong_token_leaves_store_untouched() {
    let mut d = booted(LifecycleState::Dev, 3);
    let outcome = d
        .transition(Port::Software, &request(LifecycleState::Rma, [9; 4]))
        .unwrap();
    assert_eq!(outcome, only(|f| f.token_error = true));

    let view = d.read(Port::Software);
    assert_eq!(view.state, DecodedState::Valid(LifecycleState::Dev));
    assert_eq!(view.count, Some(count(3)));
    assert!(view.status.flags.token_error);
    assert_eq!(d.store().readout().decode().unwrap().count, count(3));
}

#[test]
fn sticky_status_survives_until_hard_reset() {
    let mut d = booted(LifecycleState::Dev, 3);
    d.transition(Port::Software, &request(LifecycleState::Rma, [9; 4]))
        .unwrap();
    d.run(50);
    assert!(d.read(Port::Software).status.flags.token_error);

    // A later success adds to the latched set without clearing it.
    let outcome = d
        .transition(Port::Software, &request(LifecycleState::Rma, RMA_TOKEN))
        .unwrap();
    assert_eq!(outcome, OutcomeFlags::success());
    let flags = d.read(Port::Software).status.flags;
    assert!(flags.token_error && flags.success);

    d.hard_reset();
    d.boot().unwrap();
    let view = d.read(Port::Software);
    assert!(view.status.flags.is_empty());
    assert_eq!(view.state, DecodedState::Valid(LifecycleState::Rma));
    assert_eq!(view.count, Some(count(4)));
    assert_eq!(view.owner, MutexOwner::Unclaimed);
}

#[test]
fn scrap_to_dev_is_rejected() {
    let mut d = booted(LifecycleState::Scrap, 7);
    assert_eq!(d.outputs().enables, BroadcastEnables::SAFE);
    let outcome = d
        .transition(Port::TestPort, &request(LifecycleState::Dev, [0; 4]))
        .unwrap();
    assert_eq!(outcome, only(|f| f.transition_error = true));
    let view = d.read(Port::TestPort);
    assert_eq!(view.state, DecodedState::Valid(LifecycleState::Scrap));
    assert_eq!(view.count, Some(count(7)));
}

#[test]
fn undecodable_target_is_a_transition_error() {
    let mut d = booted(LifecycleState::Dev, 1);
    let outcome = d
        .transition(
            Port::Software,
            &TransitionRequest {
                target: 0xFFFF,
                ..TransitionRequest::default()
            },
        )
        .unwrap();
    assert_eq!(outcome, only(|f| f.transition_error = true));
}

#[test]
fn exhausted_counter_is_a_count_error() {
    let mut d = booted(LifecycleState::Dev, TransitionCount::MAX);
    let outcome = d
        .transition(Port::Software, &request(LifecycleState::Scrap, [0; 4]))
        .unwrap();
    assert_eq!(outcome, only(|f| f.count_error = true));
    assert_eq!(
        d.read(Port::Software).state,
        DecodedState::Valid(LifecycleState::Dev)
    );
}

#[test]
fn disallowed_edge_wins_over_exhausted_counter() {
    let mut d = booted(LifecycleState::Prod, TransitionCount::MAX);
    let outcome = d
        .transition(Port::Software, &request(LifecycleState::Dev, [0; 4]))
        .unwrap();
    assert_eq!(outcome, only(|f| f.transition_error = true));
}

#[test]
fn raw_unlock_with_external_clock() {
    let token = Token::from_words([0xface_cafe; 4]);
    let mut store = OtpStore::blank();
    store.provision_token(TokenKind::RawUnlock, Sha256TokenHasher::default().hash(&token));
    let mut d = Device::new(SimConfig::default(), store);
    d.boot().unwrap();

    let outcome = d
        .transition(
            Port::TestPort,
            &TransitionRequest {
                target: LifecycleState::TestUnlocked0.index(),
                token,
                external_clock: true,
            },
        )
        .unwrap();
    assert_eq!(outcome, OutcomeFlags::success());
    assert_eq!(
        d.read(Port::TestPort).state,
        DecodedState::Valid(LifecycleState::TestUnlocked0)
    );
    assert!(!d.outputs().clock_bypass_req);
}

#[test]
fn rma_from_test_unlocked_wipes_first() {
    let mut d = booted(LifecycleState::TestUnlocked3, 4);
    d.claim(Port::TestPort).unwrap();
    d.write(Port::TestPort, RegWrite::Target(LifecycleState::Rma.index()));
    d.write(Port::TestPort, RegWrite::Go);
    d.tick();

    let mut wiped_before_commit = false;
    d.run_until(|d| {
        let outputs = d.outputs();
        if outputs.wipe_req {
            wiped_before_commit = true;
        }
        if outputs.program_req.is_some() {
            assert!(wiped_before_commit, "store programmed before the wipe");
        }
        !d.last_outcome().is_empty()
    })
    .unwrap();
    assert!(wiped_before_commit);
    assert_eq!(d.last_outcome(), OutcomeFlags::success());

    let view = d.read(Port::TestPort);
    assert_eq!(view.state, DecodedState::Valid(LifecycleState::Rma));
    let enables = d.outputs().enables;
    assert!(enables.debug && enables.key_manager && !enables.escalate);
}

#[test]
fn programming_failure_returns_to_idle() {
    let mut d = booted(LifecycleState::Dev, 2);
    d.store_mut().fail_next_program();
    let outcome = d
        .transition(Port::Software, &request(LifecycleState::Prod, EXIT_TOKEN))
        .unwrap();
    assert_eq!(outcome, only(|f| f.programming_error = true));
    assert!(d.controller().snapshot().fsm().is_idle());
    assert!(d.outputs().alerts.programming);

    // The same request now succeeds; the alert stays up with the sticky bit.
    let outcome = d
        .transition(Port::Software, &request(LifecycleState::Prod, EXIT_TOKEN))
        .unwrap();
    assert_eq!(outcome, OutcomeFlags::success());
    assert!(d.outputs().alerts.programming);
}

#[test]
fn corrupted_store_is_invalid_and_safe() {
    let mut d = booted(LifecycleState::Prod, 2);
    d.store_mut().corrupt_state_word(0x1234_5678);
    d.tick();

    let view = d.read(Port::Software);
    assert_eq!(view.state, DecodedState::Invalid);
    assert_eq!(view.identity, Some(IdentityState::Invalid));
    assert!(view.status.flags.state_error);
    assert_eq!(d.outputs().enables, BroadcastEnables::SAFE);
    assert!(d.outputs().alerts.state_integrity);

    assert!(matches!(
        d.transition(Port::Software, &request(LifecycleState::Scrap, [0; 4])),
        Err(SimError::NotReady(_))
    ));
}

#[test]
fn store_read_error_raises_both_flags() {
    let mut d = booted(LifecycleState::Dev, 2);
    d.store_mut().set_read_error(true);
    d.tick();
    let flags = d.read(Port::Software).status.flags;
    assert!(flags.store_error && flags.state_error);
    assert!(d.outputs().alerts.state_integrity);
    assert!(!d.outputs().alerts.programming);
}
