//! Debounce state machine that turns per-frame identities into at most one
//! secondary-code prompt per sighting.
//!
//! The state is a plain value: each frame consumes the previous
//! [`SessionState`] and yields the next one plus the [`SessionAction`] the
//! caller must carry out. A prompt leaves the session in
//! [`SessionPhase::AwaitingCode`] until [`SessionState::complete_attempt`] is
//! called, so the caller decides how (and how long) to wait for the code.

use crate::common::RearmPolicy;
use crate::core::resolver::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Recognized,
    AwaitingCode,
    Cooldown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    None,
    /// No known face: blank the display.
    ClearDisplay,
    /// Ask the recognized identity for the secondary code.
    Prompt { identity: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub current_identity: Identity,
    /// True only while a prompt is outstanding.
    pub attempt_in_progress: bool,
    pub reference_credential_id: i64,
}

impl SessionState {
    pub fn new(reference_credential_id: i64) -> Self {
        Self {
            phase: SessionPhase::Idle,
            current_identity: Identity::Unknown,
            attempt_in_progress: false,
            reference_credential_id,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == SessionPhase::Idle
    }

    /// Evaluates one frame's resolved identity.
    pub fn on_frame(self, observed: &Identity, rearm: RearmPolicy) -> (Self, SessionAction) {
        if self.phase == SessionPhase::AwaitingCode {
            // The outstanding prompt is not interruptible by a new sighting.
            return (self, SessionAction::None);
        }

        let Identity::Known(label) = observed else {
            if self.phase != SessionPhase::Idle {
                tracing::debug!("{:?} -> Idle (no known face)", self.phase);
            }
            return (self.into_idle(), SessionAction::ClearDisplay);
        };

        match self.phase {
            SessionPhase::Cooldown => match rearm {
                RearmPolicy::NextFrame => {
                    tracing::debug!("Cooldown -> Idle");
                    (self.into_idle(), SessionAction::None)
                }
                RearmPolicy::AfterAbsence => (self, SessionAction::None),
            },
            SessionPhase::Idle | SessionPhase::Recognized => {
                if self.current_identity.label() != Some(label.as_str()) {
                    tracing::info!("Recognized {}", label);
                }
                let recognized = Self {
                    phase: SessionPhase::Recognized,
                    current_identity: observed.clone(),
                    ..self
                };
                tracing::debug!("Recognized -> AwaitingCode ({})", label);
                (
                    Self {
                        phase: SessionPhase::AwaitingCode,
                        attempt_in_progress: true,
                        ..recognized
                    },
                    SessionAction::Prompt { identity: label.clone() },
                )
            }
            SessionPhase::AwaitingCode => unreachable!("handled above"),
        }
    }

    /// Re-entry point once the outstanding prompt has been answered, whatever
    /// the verdict. The identity is forgotten so the same sighting cannot
    /// prompt again on the next frame.
    pub fn complete_attempt(self) -> Self {
        if self.phase != SessionPhase::AwaitingCode {
            tracing::warn!("complete_attempt called in {:?} with no prompt outstanding", self.phase);
            return self;
        }
        tracing::debug!("AwaitingCode -> Cooldown");
        Self {
            phase: SessionPhase::Cooldown,
            current_identity: Identity::Unknown,
            attempt_in_progress: false,
            ..self
        }
    }

    fn into_idle(self) -> Self {
        Self {
            phase: SessionPhase::Idle,
            current_identity: Identity::Unknown,
            attempt_in_progress: false,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::Known("alice".into())
    }

    fn prompt(label: &str) -> SessionAction {
        SessionAction::Prompt { identity: label.into() }
    }

    #[test]
    fn unknown_frames_keep_the_session_idle_and_blank() {
        let (state, action) = SessionState::new(7).on_frame(&Identity::Unknown, RearmPolicy::NextFrame);
        assert!(state.is_idle());
        assert_eq!(state.current_identity, Identity::Unknown);
        assert_eq!(action, SessionAction::ClearDisplay);
    }

    #[test]
    fn known_face_prompts_immediately() {
        let (state, action) = SessionState::new(7).on_frame(&alice(), RearmPolicy::NextFrame);
        assert_eq!(action, prompt("alice"));
        assert_eq!(state.phase, SessionPhase::AwaitingCode);
        assert_eq!(state.current_identity, alice());
        assert!(state.attempt_in_progress);
        assert_eq!(state.reference_credential_id, 7);
    }

    #[test]
    fn awaiting_code_ignores_new_frames() {
        let (state, _) = SessionState::new(7).on_frame(&alice(), RearmPolicy::NextFrame);
        let (state, action) = state.on_frame(&alice(), RearmPolicy::NextFrame);
        assert_eq!(action, SessionAction::None);
        let (state, action) = state.on_frame(&Identity::Unknown, RearmPolicy::NextFrame);
        assert_eq!(action, SessionAction::None);
        assert_eq!(state.phase, SessionPhase::AwaitingCode);
    }

    #[test]
    fn completed_attempt_forgets_identity_and_cools_down_one_frame() {
        let (state, _) = SessionState::new(7).on_frame(&alice(), RearmPolicy::NextFrame);
        let state = state.complete_attempt();
        assert_eq!(state.phase, SessionPhase::Cooldown);
        assert_eq!(state.current_identity, Identity::Unknown);
        assert!(!state.attempt_in_progress);

        // Same sighting on the next frame does not re-trigger.
        let (state, action) = state.on_frame(&alice(), RearmPolicy::NextFrame);
        assert_eq!(action, SessionAction::None);
        assert!(state.is_idle());

        // The frame after that re-arms.
        let (_, action) = state.on_frame(&alice(), RearmPolicy::NextFrame);
        assert_eq!(action, prompt("alice"));
    }

    #[test]
    fn after_absence_policy_waits_for_an_unknown_frame() {
        let (state, _) = SessionState::new(7).on_frame(&alice(), RearmPolicy::AfterAbsence);
        let mut state = state.complete_attempt();

        for _ in 0..3 {
            let (next, action) = state.on_frame(&alice(), RearmPolicy::AfterAbsence);
            assert_eq!(action, SessionAction::None);
            assert_eq!(next.phase, SessionPhase::Cooldown);
            state = next;
        }

        let (state, action) = state.on_frame(&Identity::Unknown, RearmPolicy::AfterAbsence);
        assert_eq!(action, SessionAction::ClearDisplay);
        let (_, action) = state.on_frame(&alice(), RearmPolicy::AfterAbsence);
        assert_eq!(action, prompt("alice"));
    }

    #[test]
    fn unknown_during_cooldown_goes_idle() {
        let (state, _) = SessionState::new(7).on_frame(&alice(), RearmPolicy::NextFrame);
        let (state, action) = state.complete_attempt().on_frame(&Identity::Unknown, RearmPolicy::NextFrame);
        assert!(state.is_idle());
        assert_eq!(action, SessionAction::ClearDisplay);
    }

    #[test]
    fn complete_attempt_without_prompt_is_a_no_op() {
        let state = SessionState::new(7);
        assert_eq!(state.clone().complete_attempt(), state);
    }
}
