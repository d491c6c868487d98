use crate::camera::{Frame, FrameSource};
use crate::common::Result;
use crate::core::controller::{AccessController, FrameOutcome};
use crate::core::recognizer::FaceEncoder;
use crate::core::resolver::{frame_identity, IdentityResolver, ResolvedFace};
use crate::core::verifier::Verdict;
use std::time::{Duration, Instant};

/// Operator-facing view of each processed frame.
pub trait FrameView {
    fn show(&mut self, frame: &Frame, faces: &[ResolvedFace]) -> Result<()>;
}

/// Headless runs.
pub struct NullView;

impl FrameView for NullView {
    fn show(&mut self, _frame: &Frame, _faces: &[ResolvedFace]) -> Result<()> {
        Ok(())
    }
}

pub trait QuitSignal {
    fn quit_requested(&mut self) -> Result<bool>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub elapsed: Duration,
    pub attempts: u32,
    pub unlocks: u32,
}

impl RunSummary {
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

/// Frame loop: capture, resolve, decide, render, check for quit.
pub struct FramePipeline<S, E> {
    source: S,
    encoder: E,
    resolver: IdentityResolver,
    controller: AccessController,
    view: Box<dyn FrameView>,
    quit: Box<dyn QuitSignal>,
}

impl<S: FrameSource, E: FaceEncoder> FramePipeline<S, E> {
    pub fn new(
        source: S,
        encoder: E,
        resolver: IdentityResolver,
        controller: AccessController,
        view: Box<dyn FrameView>,
        quit: Box<dyn QuitSignal>,
    ) -> Self {
        Self { source, encoder, resolver, controller, view, quit }
    }

    pub fn controller(&self) -> &AccessController {
        &self.controller
    }

    /// Processes one frame.
    pub fn step(&mut self) -> Result<FrameOutcome> {
        let frame = self.source.read_frame()?;

        let encoded = match self.encoder.encode(&frame) {
            Ok(faces) => faces,
            Err(e) => {
                tracing::warn!("Face encoding failed, treating frame as empty: {}", e);
                Vec::new()
            }
        };
        let faces = self.resolver.resolve_frame(&encoded);
        let identity = frame_identity(&faces);

        let outcome = self.controller.on_frame(&identity)?;

        // The annotated frame is stale after a blocking attempt.
        if !matches!(outcome, FrameOutcome::Attempted { .. }) {
            self.view.show(&frame, &faces)?;
        }

        Ok(outcome)
    }

    /// Runs until the operator quits. Resources are released by the caller's
    /// scopes whichever way this returns.
    pub fn run(&mut self) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        loop {
            let outcome = self.step()?;
            summary.frames += 1;
            if let FrameOutcome::Attempted { verdict, .. } = outcome {
                summary.attempts += 1;
                if verdict == Verdict::Match {
                    summary.unlocks += 1;
                }
            }

            if self.quit.quit_requested()? {
                tracing::info!("Quit requested");
                break;
            }
        }

        summary.elapsed = started.elapsed();
        tracing::info!("elapsed time: {:.2}", summary.elapsed.as_secs_f64());
        tracing::info!("approx. FPS: {:.2}", summary.fps());
        Ok(summary)
    }
}
