use crate::camera::FrameSource;
use crate::common::{FaceLockError, Result};
use crate::core::recognizer::{Embedding, FaceEncoder};
use std::time::Duration;

/// Captures frames until `captures` encodings were taken, using the largest
/// face in each frame. Frames without a face are skipped; gives up after
/// `max_frames`.
pub fn capture_encodings<S: FrameSource, E: FaceEncoder>(
    source: &mut S,
    encoder: &mut E,
    captures: usize,
    max_frames: usize,
    interval: Duration,
) -> Result<Vec<Embedding>> {
    let mut encodings = Vec::with_capacity(captures);

    for frame_number in 0..max_frames {
        if encodings.len() == captures {
            break;
        }

        let frame = source.read_frame()?;
        let faces = encoder.encode(&frame)?;
        let Some(largest) = faces
            .into_iter()
            .max_by(|a, b| a.bounds.area().total_cmp(&b.bounds.area()))
        else {
            tracing::debug!("Frame {}: no face", frame_number);
            continue;
        };

        encodings.push(largest.encoding);
        tracing::info!("Captured {}/{}", encodings.len(), captures);
        std::thread::sleep(interval);
    }

    if encodings.len() < captures {
        return Err(FaceLockError::Camera(format!(
            "Only captured {} of {} faces in {} frames", encodings.len(), captures, max_frames
        )));
    }

    Ok(encodings)
}
