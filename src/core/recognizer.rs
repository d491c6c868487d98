use crate::camera::Frame;
use crate::common::config::{Config, RecognizerConfig};
use crate::common::{FaceLockError, Result};
use crate::core::detector::{FaceBox, FaceDetector};
use crate::core::model::OnnxModel;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array4, CowArray};
use ort::Value;
use std::path::Path;

pub type Embedding = Vec<f32>;

/// A detected face and its feature encoding.
#[derive(Debug, Clone)]
pub struct EncodedFace {
    pub bounds: FaceBox,
    pub encoding: Embedding,
}

/// Turns a frame into zero or more encoded faces. Finding no face is not an error.
pub trait FaceEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<Vec<EncodedFace>>;
}

pub struct FaceRecognizer {
    model: OnnxModel,
    config: RecognizerConfig,
}

impl FaceRecognizer {
    pub fn new(config: &RecognizerConfig, model_path: &Path, optimization_level: u32) -> Result<Self> {
        Ok(Self {
            model: OnnxModel::load("face_recognizer", model_path, optimization_level)?,
            config: config.clone(),
        })
    }

    pub fn get_embedding(&self, image: &DynamicImage, face: &FaceBox) -> Result<Embedding> {
        let face_img = crop_face(image, face);
        let resized = face_img.resize_exact(
            self.config.input_size,
            self.config.input_size,
            FilterType::Triangle,
        );

        let input = self.preprocess_face(&resized);
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.model.session.allocator(), &cow_array)?;
        let outputs = self.model.session.run(vec![input_tensor])?;

        let embedding = outputs
            .first()
            .ok_or_else(|| FaceLockError::Model("Recognizer produced no outputs".into()))?
            .try_extract::<f32>()?
            .view()
            .iter()
            .copied()
            .collect();
        Ok(embedding)
    }

    fn preprocess_face(&self, img: &DynamicImage) -> Array4<f32> {
        let gray = img.to_luma8();
        let size = self.config.input_size as usize;
        let norm = self.config.normalization_value;
        let mut array = Array4::<f32>::zeros((1, 1, size, size));

        for (x, y, pixel) in gray.enumerate_pixels() {
            array[[0, 0, y as usize, x as usize]] = (pixel[0] as f32 - norm) / norm;
        }

        array
    }
}

fn crop_face(image: &DynamicImage, face: &FaceBox) -> DynamicImage {
    let x = face.x1.max(0.0) as u32;
    let y = face.y1.max(0.0) as u32;
    let width = face.width().max(1.0) as u32;
    let height = face.height().max(1.0) as u32;

    image.crop_imm(x, y, width, height)
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Detector + embedding model pair backed by ONNX Runtime.
pub struct OnnxFaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceEncoder {
    pub fn new(config: &Config, models_dir: &Path) -> Result<Self> {
        let detector_path = Config::resolve_model_path(&config.models.detector_path, models_dir);
        let recognizer_path = Config::resolve_model_path(&config.models.recognizer_path, models_dir);

        Ok(Self {
            detector: FaceDetector::new(&config.detector, &detector_path)?,
            recognizer: FaceRecognizer::new(
                &config.recognizer,
                &recognizer_path,
                config.detector.optimization_level,
            )?,
        })
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<Vec<EncodedFace>> {
        let faces = self.detector.detect(&frame.image)?;

        faces
            .into_iter()
            .map(|bounds| {
                let encoding = self.recognizer.get_embedding(&frame.image, &bounds)?;
                Ok(EncodedFace { bounds, encoding })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_parallel_and_orthogonal_vectors() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn zero_vectors_never_match() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn crop_clamps_negative_origin() {
        let image = DynamicImage::new_luma8(100, 100);
        let face = FaceBox { x1: -5.0, y1: 10.0, x2: 40.0, y2: 50.0, confidence: 0.9 };
        let cropped = crop_face(&image, &face);
        assert_eq!((cropped.width(), cropped.height()), (45, 40));
    }
}
