use facelock::camera::{Frame, FrameSource};
use facelock::core::{
    AccessController, ActuationCoordinator, ActuationTimings, CredentialVerifier, EncodedFace,
    FaceBox, FaceEncoder, FrameOutcome, FramePipeline, IdentityResolver, NullView, QuitSignal,
    SessionPhase, Verdict,
};
use facelock::hardware::{Actuator, Display, SecondaryInput};
use facelock::notify::{Notifier, UnlockEvent};
use facelock::{CredentialRecordSet, FaceLockError, Identity, RearmPolicy, Result};
use image::DynamicImage;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

const CODE: i64 = 4321;

type Log = Rc<RefCell<Vec<String>>>;

struct RecordingDisplay(Log);

impl Display for RecordingDisplay {
    fn clear(&mut self) {
        self.0.borrow_mut().push("display:clear".into());
    }

    fn write(&mut self, text: &str) {
        self.0.borrow_mut().push(format!("display:{}", text));
    }
}

struct RecordingActuator(Log);

impl Actuator for RecordingActuator {
    fn lock(&mut self) -> Result<()> {
        self.0.borrow_mut().push("lock".into());
        Ok(())
    }

    fn unlock(&mut self) -> Result<()> {
        self.0.borrow_mut().push("unlock".into());
        Ok(())
    }
}

struct RecordingNotifier {
    log: Log,
    fail: bool,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &UnlockEvent) -> Result<()> {
        self.log.borrow_mut().push(format!("notify:{}", event.identity));
        if self.fail {
            return Err(FaceLockError::Notification("gateway down".into()));
        }
        Ok(())
    }
}

struct ScriptedKeypad {
    log: Log,
    entries: Rc<RefCell<VecDeque<Result<String>>>>,
}

impl SecondaryInput for ScriptedKeypad {
    fn read_code(&mut self) -> Result<String> {
        self.log.borrow_mut().push("read_code".into());
        self.entries
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(FaceLockError::Input("no entry scripted".into())))
    }
}

struct BlankCamera;

impl FrameSource for BlankCamera {
    fn read_frame(&mut self) -> Result<Frame> {
        Ok(Frame::new(DynamicImage::new_luma8(4, 4)))
    }
}

/// Each frame yields the scripted encodings; an exhausted script yields no faces.
struct ScriptedEncoder(VecDeque<Vec<Vec<f32>>>);

impl FaceEncoder for ScriptedEncoder {
    fn encode(&mut self, _frame: &Frame) -> Result<Vec<EncodedFace>> {
        let encodings = self.0.pop_front().unwrap_or_default();
        Ok(encodings
            .into_iter()
            .enumerate()
            .map(|(i, encoding)| EncodedFace {
                bounds: FaceBox {
                    x1: i as f32 * 10.0,
                    y1: 0.0,
                    x2: i as f32 * 10.0 + 8.0,
                    y2: 8.0,
                    confidence: 0.9,
                },
                encoding,
            })
            .collect())
    }
}

struct QuitAfter(usize);

impl QuitSignal for QuitAfter {
    fn quit_requested(&mut self) -> Result<bool> {
        self.0 = self.0.saturating_sub(1);
        Ok(self.0 == 0)
    }
}

fn alice() -> Vec<f32> {
    vec![1.0, 0.0]
}

fn stranger() -> Vec<f32> {
    vec![0.0, 1.0]
}

fn known(label: &str) -> Identity {
    Identity::Known(label.into())
}

struct Harness {
    log: Log,
    entries: Rc<RefCell<VecDeque<Result<String>>>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            entries: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    fn enter(&self, code: &str) {
        self.entries.borrow_mut().push_back(Ok(code.to_string()));
    }

    fn controller(&self, rearm: RearmPolicy, failing_notifier: bool) -> AccessController {
        let coordinator = ActuationCoordinator::new(
            Box::new(RecordingActuator(self.log.clone())),
            Box::new(RecordingNotifier {
                log: self.log.clone(),
                fail: failing_notifier,
            }),
            ActuationTimings::ZERO,
        )
        .unwrap();

        AccessController::new(
            CODE,
            rearm,
            CredentialVerifier::shared(),
            Box::new(RecordingDisplay(self.log.clone())),
            Box::new(ScriptedKeypad {
                log: self.log.clone(),
                entries: self.entries.clone(),
            }),
            coordinator,
        )
    }

    fn events(&self, prefix: &str) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn reset_log(&self) {
        self.log.borrow_mut().clear();
    }
}

#[test]
fn frames_without_a_known_face_blank_the_display_and_stay_idle() {
    let harness = Harness::new();
    let mut controller = harness.controller(RearmPolicy::NextFrame, false);
    harness.reset_log();

    assert_eq!(controller.on_frame(&Identity::Unknown).unwrap(), FrameOutcome::Cleared);
    assert!(controller.state().is_idle());
    assert_eq!(*harness.log.borrow(), vec!["display:clear".to_string()]);
}

#[test]
fn correct_code_unlocks_notifies_then_relocks() {
    let harness = Harness::new();
    let mut controller = harness.controller(RearmPolicy::NextFrame, false);
    harness.reset_log();
    harness.enter("4321");

    let outcome = controller.on_frame(&known("Alice")).unwrap();
    assert_eq!(
        outcome,
        FrameOutcome::Attempted { identity: "Alice".into(), verdict: Verdict::Match }
    );

    let log = harness.log.borrow().clone();
    assert_eq!(
        log,
        vec![
            "display:clear",
            "display:Hi Alice\nPlease Scan ID",
            "read_code",
            "display:clear",
            "display:clear",
            "display:Safe Unlocked",
            "unlock",
            "notify:Alice",
            "display:clear",
            "display:Safe locking\nKeep Away",
            "lock",
            "display:clear",
        ]
    );

    let state = controller.state();
    assert_eq!(state.phase, SessionPhase::Cooldown);
    assert_eq!(state.current_identity, Identity::Unknown);
    assert!(!state.attempt_in_progress);
}

#[test]
fn failed_notification_still_relocks() {
    let harness = Harness::new();
    let mut controller = harness.controller(RearmPolicy::NextFrame, true);
    harness.reset_log();
    harness.enter("4321");

    let outcome = controller.on_frame(&known("Alice")).unwrap();
    assert!(matches!(outcome, FrameOutcome::Attempted { verdict: Verdict::Match, .. }));
    assert_eq!(harness.events("notify"), vec!["notify:Alice"]);
    assert_eq!(harness.events("unlock"), vec!["unlock"]);
    assert_eq!(harness.events("lock"), vec!["lock"]);
}

#[test]
fn wrong_or_malformed_codes_never_actuate() {
    for entry in ["1234", "43x1", "", "   "] {
        let harness = Harness::new();
        let mut controller = harness.controller(RearmPolicy::NextFrame, false);
        harness.reset_log();
        harness.enter(entry);

        let outcome = controller.on_frame(&known("Alice")).unwrap();
        assert_eq!(
            outcome,
            FrameOutcome::Attempted { identity: "Alice".into(), verdict: Verdict::NoMatch },
            "entry {:?}",
            entry
        );
        assert!(harness.events("unlock").is_empty());
        assert!(harness.events("notify").is_empty());
        assert!(harness.events("display:ID not valid").len() == 1);
        assert_eq!(controller.state().current_identity, Identity::Unknown);
    }
}

#[test]
fn keypad_failure_counts_as_rejection() {
    let harness = Harness::new();
    let mut controller = harness.controller(RearmPolicy::NextFrame, false);
    harness.reset_log();
    harness
        .entries
        .borrow_mut()
        .push_back(Err(FaceLockError::Input("timed out".into())));

    let outcome = controller.on_frame(&known("Alice")).unwrap();
    assert!(matches!(outcome, FrameOutcome::Attempted { verdict: Verdict::NoMatch, .. }));
    assert!(harness.events("unlock").is_empty());
}

#[test]
fn sustained_presence_reprompts_after_one_cooldown_frame() {
    let harness = Harness::new();
    let mut controller = harness.controller(RearmPolicy::NextFrame, false);
    harness.enter("1111");
    harness.enter("4321");

    // Wrong code, one cooldown frame, then the same face re-triggers.
    assert!(matches!(
        controller.on_frame(&known("Alice")).unwrap(),
        FrameOutcome::Attempted { verdict: Verdict::NoMatch, .. }
    ));
    assert_eq!(controller.on_frame(&known("Alice")).unwrap(), FrameOutcome::NoChange);
    assert!(controller.state().is_idle());
    assert!(matches!(
        controller.on_frame(&known("Alice")).unwrap(),
        FrameOutcome::Attempted { verdict: Verdict::Match, .. }
    ));

    assert_eq!(harness.events("read_code").len(), 2);
    assert_eq!(harness.events("unlock").len(), 1);
}

#[test]
fn rearm_after_absence_waits_for_the_face_to_leave() {
    let harness = Harness::new();
    let mut controller = harness.controller(RearmPolicy::AfterAbsence, false);
    harness.enter("1111");
    harness.enter("4321");

    controller.on_frame(&known("Alice")).unwrap();
    for _ in 0..3 {
        assert_eq!(controller.on_frame(&known("Alice")).unwrap(), FrameOutcome::NoChange);
        assert_eq!(controller.state().phase, SessionPhase::Cooldown);
    }
    assert_eq!(controller.on_frame(&Identity::Unknown).unwrap(), FrameOutcome::Cleared);
    assert!(matches!(
        controller.on_frame(&known("Alice")).unwrap(),
        FrameOutcome::Attempted { verdict: Verdict::Match, .. }
    ));
    assert_eq!(harness.events("read_code").len(), 2);
}

#[test]
fn pipeline_unlocks_once_for_a_single_sighting() {
    let harness = Harness::new();
    harness.enter("4321");

    let records = CredentialRecordSet::from_entries([("Alice", alice()), ("Alice", vec![0.98, 0.1])]);
    let encoder = ScriptedEncoder(VecDeque::from(vec![
        vec![alice()],
        vec![alice()],
        vec![stranger()],
    ]));

    let mut pipeline = FramePipeline::new(
        BlankCamera,
        encoder,
        IdentityResolver::new(records, 0.6),
        harness.controller(RearmPolicy::NextFrame, false),
        Box::new(NullView),
        Box::new(QuitAfter(3)),
    );
    harness.reset_log();

    let summary = pipeline.run().unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.attempts, 1);
    assert_eq!(summary.unlocks, 1);
    assert_eq!(harness.events("notify"), vec!["notify:Alice"]);
    assert_eq!(harness.events("unlock"), vec!["unlock"]);
    assert_eq!(harness.events("lock"), vec!["lock"]);
    let log = harness.log.borrow().clone();
    let unlocked_at = log.iter().position(|e| e == "unlock").unwrap();
    let relocked_at = log.iter().position(|e| e == "lock").unwrap();
    assert!(unlocked_at < relocked_at, "{:?}", log);
    assert!(pipeline.controller().state().is_idle());
}

#[test]
fn last_known_face_in_the_frame_is_prompted() {
    let harness = Harness::new();
    harness.enter("4321");

    let records = CredentialRecordSet::from_entries([("Alice", alice()), ("Bob", vec![-1.0, 0.0])]);
    let encoder = ScriptedEncoder(VecDeque::from(vec![vec![alice(), vec![-1.0, 0.0], stranger()]]));

    let mut pipeline = FramePipeline::new(
        BlankCamera,
        encoder,
        IdentityResolver::new(records, 0.6),
        harness.controller(RearmPolicy::NextFrame, false),
        Box::new(NullView),
        Box::new(QuitAfter(1)),
    );

    assert_eq!(
        pipeline.step().unwrap(),
        FrameOutcome::Attempted { identity: "Bob".into(), verdict: Verdict::Match }
    );
}

#[test]
fn identity_specific_codes_override_the_shared_one() {
    let codes = BTreeMap::from([("Bob".to_string(), 9999)]);
    let verifier = CredentialVerifier::new(codes);
    assert_eq!(verifier.verify("Bob", "9999", CODE), Verdict::Match);
    assert_eq!(verifier.verify("Bob", "4321", CODE), Verdict::NoMatch);
    assert_eq!(verifier.verify("Alice", "4321", CODE), Verdict::Match);
}

#[test]
fn dropping_the_controller_engages_the_lock() {
    let harness = Harness::new();
    let controller = harness.controller(RearmPolicy::NextFrame, false);
    harness.reset_log();
    drop(controller);
    assert_eq!(harness.events("lock"), vec!["lock"]);
}
