pub mod v4l2;

pub use v4l2::{Camera, CameraSession};

use crate::common::Result;
use image::DynamicImage;

/// One captured image, discarded once the pipeline has processed it.
pub struct Frame {
    pub image: DynamicImage,
}

impl Frame {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }
}

pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame>;
}
