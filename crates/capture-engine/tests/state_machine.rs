//! Random call sequences against a reference model of the lifecycle.

use obscap_capture_engine::{RecordingRequest, SessionManager, SessionState, StubEngine};
use obscap_common::error::{ObscapError, StateError};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Initialize,
    ListDisplays,
    Start { fps: u32 },
    Stop,
    Shutdown,
    QueryVersion,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Initialize),
        Just(Op::ListDisplays),
        (0u32..=2).prop_map(|fps| Op::Start { fps }),
        Just(Op::Stop),
        Just(Op::Shutdown),
        Just(Op::QueryVersion),
    ]
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Ok,
    State(StateError),
    InvalidConfig,
}

fn outcome<T>(result: Result<T, ObscapError>) -> Outcome {
    match result {
        Ok(_) => Outcome::Ok,
        Err(ObscapError::State(e)) => Outcome::State(e),
        Err(e) if e.is_invalid_config() => Outcome::InvalidConfig,
        Err(e) => panic!("stub engine should not fail: {e:?}"),
    }
}

/// Expected outcome and next state for `op` applied in `state`.
fn model(state: SessionState, op: Op) -> (Outcome, SessionState) {
    use SessionState::*;

    let shut = (Outcome::State(StateError::AlreadyShutdown), Shutdown);
    match (op, state) {
        (Op::QueryVersion, s) => (Outcome::Ok, s),

        (_, Shutdown) => shut,

        (Op::Initialize, Uninitialized) => (Outcome::Ok, Initialized),
        (Op::Initialize, s) => (Outcome::State(StateError::AlreadyInitialized), s),

        (Op::ListDisplays, Uninitialized) => {
            (Outcome::State(StateError::NotInitialized), Uninitialized)
        }
        (Op::ListDisplays, s) => (Outcome::Ok, s),

        (Op::Start { .. }, Uninitialized) => {
            (Outcome::State(StateError::NotInitialized), Uninitialized)
        }
        (Op::Start { .. }, Recording) => (Outcome::State(StateError::AlreadyRecording), Recording),
        (Op::Start { fps: 0 }, Initialized) => (Outcome::InvalidConfig, Initialized),
        (Op::Start { .. }, Initialized) => (Outcome::Ok, Recording),

        (Op::Stop, Recording) => (Outcome::Ok, Initialized),
        (Op::Stop, s) => (Outcome::State(StateError::NotRecording), s),

        (Op::Shutdown, _) => (Outcome::Ok, Shutdown),

        (_, ShuttingDown) => unreachable!("ShuttingDown is never observable between calls"),
    }
}

fn apply(session: &SessionManager, op: Op) -> Outcome {
    match op {
        Op::Initialize => outcome(session.initialize()),
        Op::ListDisplays => outcome(session.list_displays()),
        Op::Start { fps } => outcome(session.start_recording(
            RecordingRequest::new(std::env::temp_dir().join("obscap-prop.mp4")).with_fps(fps),
        )),
        Op::Stop => outcome(session.stop_recording()),
        Op::Shutdown => outcome(session.shutdown()),
        Op::QueryVersion => {
            assert!(!session.query_version().is_empty());
            Outcome::Ok
        }
    }
}

proptest! {
    #[test]
    fn every_call_sequence_follows_the_lifecycle(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let engine = StubEngine::new();
        let session = SessionManager::new(Box::new(engine.clone()));
        let mut expected_state = SessionState::Uninitialized;

        for op in ops {
            let (expected, next) = model(expected_state, op);
            let actual = apply(&session, op);
            prop_assert_eq!(actual, expected, "op {:?} from {:?}", op, expected_state);
            prop_assert_eq!(session.state(), next);

            expected_state = next;

            let recording = expected_state == SessionState::Recording;
            prop_assert_eq!(session.active_output_path().is_some(), recording);
            prop_assert_eq!(engine.capturing().is_some(), recording);
            let holds_handle = matches!(
                expected_state,
                SessionState::Initialized | SessionState::Recording
            );
            prop_assert_eq!(session.handle_id().is_some(), holds_handle);
            prop_assert_eq!(engine.is_running(), holds_handle);
        }
    }
}
