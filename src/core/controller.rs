use crate::common::{RearmPolicy, Result};
use crate::core::actuation::ActuationCoordinator;
use crate::core::resolver::Identity;
use crate::core::session::{SessionAction, SessionState};
use crate::core::verifier::{CredentialVerifier, Verdict};
use crate::hardware::display::prompt_message;
use crate::hardware::{Display, SecondaryInput};

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Nothing changed on the enclosure.
    NoChange,
    /// No known face; display blanked.
    Cleared,
    /// A prompt was issued and answered.
    Attempted { identity: String, verdict: Verdict },
}

/// Applies the session decisions to the display, keypad and lock.
pub struct AccessController {
    state: SessionState,
    rearm: RearmPolicy,
    verifier: CredentialVerifier,
    display: Box<dyn Display>,
    keypad: Box<dyn SecondaryInput>,
    coordinator: ActuationCoordinator,
}

impl AccessController {
    pub fn new(
        reference_credential_id: i64,
        rearm: RearmPolicy,
        verifier: CredentialVerifier,
        display: Box<dyn Display>,
        keypad: Box<dyn SecondaryInput>,
        coordinator: ActuationCoordinator,
    ) -> Self {
        Self {
            state: SessionState::new(reference_credential_id),
            rearm,
            verifier,
            display,
            keypad,
            coordinator,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn on_frame(&mut self, observed: &Identity) -> Result<FrameOutcome> {
        let (next, action) = self.state.clone().on_frame(observed, self.rearm);
        self.state = next;

        match action {
            SessionAction::None => Ok(FrameOutcome::NoChange),
            SessionAction::ClearDisplay => {
                self.display.clear();
                Ok(FrameOutcome::Cleared)
            }
            SessionAction::Prompt { identity } => self.run_attempt(identity),
        }
    }

    fn run_attempt(&mut self, identity: String) -> Result<FrameOutcome> {
        self.display.clear();
        self.display.write(&prompt_message(&identity));
        tracing::info!("Prompting {} for secondary code", identity);

        let verdict = match self.keypad.read_code() {
            Ok(code) => self.verifier.verify(&identity, &code, self.state.reference_credential_id),
            Err(e) => {
                tracing::warn!("No code received for {}: {}", identity, e);
                Verdict::NoMatch
            }
        };
        tracing::info!("Secondary code for {}: {:?}", identity, verdict);

        self.state = self.state.clone().complete_attempt();
        self.display.clear();

        match verdict {
            Verdict::Match => self.coordinator.grant(&identity, self.display.as_mut())?,
            Verdict::NoMatch => self.coordinator.deny(self.display.as_mut()),
        }

        Ok(FrameOutcome::Attempted { identity, verdict })
    }
}
