pub mod actuation;
pub mod controller;
pub mod detector;
pub mod enrollment;
pub mod model;
pub mod pipeline;
pub mod recognizer;
pub mod resolver;
pub mod session;
pub mod verifier;

pub use actuation::{ActuationCoordinator, ActuationTimings};
pub use controller::{AccessController, FrameOutcome};
pub use detector::{FaceBox, FaceDetector};
pub use enrollment::capture_encodings;
pub use pipeline::{FramePipeline, FrameView, NullView, QuitSignal, RunSummary};
pub use recognizer::{cosine_similarity, Embedding, EncodedFace, FaceEncoder, FaceRecognizer, OnnxFaceEncoder};
pub use resolver::{frame_identity, Identity, IdentityResolver, ResolvedFace};
pub use session::{SessionAction, SessionPhase, SessionState};
pub use verifier::{CredentialVerifier, Verdict};
