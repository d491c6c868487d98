use crate::common::config::DetectorConfig;
use crate::common::{FaceLockError, Result};
use crate::core::model::OnnxModel;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array4, CowArray};
use ort::Value;
use std::path::Path;

const NMS_IOU_THRESHOLD: f32 = 0.45;
const MIN_BOX_SIDE: f32 = 10.0;
const MAX_FACES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

impl FaceBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn iou(&self, other: &FaceBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// YOLOv8-style single-class face detector.
pub struct FaceDetector {
    model: OnnxModel,
    config: DetectorConfig,
}

impl FaceDetector {
    pub fn new(config: &DetectorConfig, model_path: &Path) -> Result<Self> {
        Ok(Self {
            model: OnnxModel::load("face_detector", model_path, config.optimization_level)?,
            config: config.clone(),
        })
    }

    /// Detected faces in original image coordinates, most confident first.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        let orig_width = image.width() as f32;
        let orig_height = image.height() as f32;

        let input = if image.width() == self.config.input_width
            && image.height() == self.config.input_height
        {
            image_to_array(image)
        } else {
            let resized = image.resize_exact(
                self.config.input_width,
                self.config.input_height,
                FilterType::Nearest,
            );
            image_to_array(&resized)
        };

        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.model.session.allocator(), &cow_array)?;
        let outputs = self.model.session.run(vec![input_tensor])?;

        let output = outputs
            .first()
            .ok_or_else(|| FaceLockError::Model("Detector produced no outputs".into()))?
            .try_extract::<f32>()?
            .view()
            .to_owned();
        let shape = output.shape().to_vec();
        let values: Vec<f32> = output.iter().copied().collect();

        let candidates = parse_predictions(
            &values,
            &shape,
            self.config.input_width as f32,
            self.config.input_height as f32,
        );

        let mut faces = non_max_suppression(candidates, NMS_IOU_THRESHOLD);
        faces.retain(|face| face.confidence >= self.config.confidence);
        faces.truncate(MAX_FACES);

        let scale_x = orig_width / self.config.input_width as f32;
        let scale_y = orig_height / self.config.input_height as f32;
        for face in &mut faces {
            face.x1 *= scale_x;
            face.x2 *= scale_x;
            face.y1 *= scale_y;
            face.y2 *= scale_y;
        }

        Ok(faces)
    }
}

fn image_to_array(img: &DynamicImage) -> Array4<f32> {
    let gray = img.to_luma8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    let mut array = Array4::<f32>::zeros((1, 3, height, width));

    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = pixel[0] as f32 / 255.0;
        for channel in 0..3 {
            array[[0, channel, y as usize, x as usize]] = value;
        }
    }

    array
}

/// Decodes raw predictions in either `[1, N, 5]` or transposed `[1, 5, N]` layout
/// into corner-form boxes in detector input space.
pub fn parse_predictions(values: &[f32], shape: &[usize], input_width: f32, input_height: f32) -> Vec<FaceBox> {
    let (num_predictions, prediction_length, transposed) = match shape {
        [_, a, b] if *a <= 10 && *b > 10 => (*b, *a, true),
        [_, a, b] => (*a, *b, false),
        [a, b] => (*a, *b, false),
        _ => {
            tracing::warn!("Unexpected detector output shape: {:?}", shape);
            return Vec::new();
        }
    };

    if prediction_length < 4 || values.len() < num_predictions * prediction_length {
        tracing::warn!("Detector output too short for shape {:?}", shape);
        return Vec::new();
    }

    let at = |i: usize, field: usize| -> f32 {
        if field >= prediction_length {
            return 0.0;
        }
        if transposed {
            values[field * num_predictions + i]
        } else {
            values[i * prediction_length + field]
        }
    };

    let mut faces = Vec::new();
    for i in 0..num_predictions {
        let confidence = at(i, 4);
        if confidence <= 0.001 {
            continue;
        }

        let (mut cx, mut cy, mut w, mut h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
        // Normalized output
        if cx <= 1.0 && cy <= 1.0 && w <= 1.0 && h <= 1.0 {
            cx *= input_width;
            w *= input_width;
            cy *= input_height;
            h *= input_height;
        }

        let x1 = (cx - w / 2.0).max(0.0);
        let y1 = (cy - h / 2.0).max(0.0);
        let x2 = (cx + w / 2.0).min(input_width);
        let y2 = (cy + h / 2.0).min(input_height);

        if x2 - x1 > MIN_BOX_SIDE && y2 - y1 > MIN_BOX_SIDE {
            faces.push(FaceBox { x1, y1, x2, y2, confidence });
        }
    }

    faces
}

pub fn non_max_suppression(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<FaceBox> = Vec::new();
    for candidate in boxes {
        if keep.iter().all(|kept| kept.iou(&candidate) < iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}
