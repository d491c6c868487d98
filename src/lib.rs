// Core modules
pub mod core;
pub mod camera;
pub mod storage;
pub mod hardware;
pub mod notify;
pub mod cli;
pub mod common;

// Re-export commonly used types
pub use common::{Config, FaceLockError, Paths, RearmPolicy, Result};
pub use core::{
    AccessController, ActuationCoordinator, ActuationTimings, CredentialVerifier, FaceEncoder,
    FramePipeline, FrameOutcome, Identity, IdentityResolver, SessionPhase, SessionState, Verdict,
};
pub use camera::{Camera, Frame, FrameSource};
pub use storage::{CredentialRecordSet, RecordStore};
pub use notify::{Notifier, UnlockEvent};
