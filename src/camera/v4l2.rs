use crate::camera::{Frame, FrameSource};
use crate::common::config::CameraConfig;
use crate::common::{FaceLockError, Result};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use std::fs;
use std::time::Duration;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

/// Device index that asks for IR/grayscale camera auto-detection.
pub const AUTO_DETECT_INDEX: u32 = 999;

const STREAM_BUFFERS: u32 = 4;

pub struct Camera {
    device: Device,
    index: u32,
    config: CameraConfig,
}

/// An open capture stream. Dropping it stops streaming.
pub struct CameraSession<'a> {
    stream: v4l::io::mmap::Stream<'a>,
    format: Format,
    camera: &'a Camera,
}

/// A V4L2 device as reported by `list_all_cameras`.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
    pub features: Vec<String>,
    pub likely_ir: bool,
}

fn video_device_indices() -> Result<Vec<u32>> {
    let mut indices = Vec::new();
    for entry in fs::read_dir("/dev")? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(index) = name
            .to_str()
            .and_then(|n| n.strip_prefix("video"))
            .and_then(|n| n.parse::<u32>().ok())
        {
            indices.push(index);
        }
    }
    indices.sort_unstable();
    Ok(indices)
}

impl Camera {
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let index = if config.device_index == AUTO_DETECT_INDEX {
            Self::detect_ir_camera()?
        } else {
            config.device_index
        };
        Self::open_device(index, config.clone())
    }

    pub fn list_all_cameras() -> Result<Vec<CameraInfo>> {
        let mut cameras = Vec::new();

        for index in video_device_indices()? {
            let Ok(device) = Device::new(index as usize) else { continue };
            let Ok(caps) = device.query_caps() else { continue };

            let mut features = Vec::new();
            let mut likely_ir = false;

            if caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                features.push("VIDEO_CAPTURE".to_string());
            } else if caps.capabilities.contains(v4l::capability::Flags::META_CAPTURE) {
                features.push("METADATA_CAPTURE".to_string());
            }

            for fmt in device.enum_formats().unwrap_or_default() {
                match &fmt.fourcc.repr {
                    b"GREY" | b"Y8  " | b"Y16 " => {
                        features.push(format!("Grayscale ({})", fmt.fourcc));
                        likely_ir = true;
                    }
                    b"MJPG" | b"YUYV" => features.push(format!("Color ({})", fmt.fourcc)),
                    _ => {}
                }
            }

            if caps.card.contains("IR") || caps.card.contains("Infrared") {
                likely_ir = true;
            }

            cameras.push(CameraInfo {
                index,
                name: caps.card.clone(),
                features,
                likely_ir,
            });
        }

        Ok(cameras)
    }

    /// Prefers a capture device that offers a grayscale format, falling back to device 0.
    pub fn detect_ir_camera() -> Result<u32> {
        let cameras = Self::list_all_cameras()?;

        let selected = cameras
            .iter()
            .filter(|c| c.features.iter().any(|f| f == "VIDEO_CAPTURE"))
            .max_by_key(|c| {
                let grayscale = c.features.iter().any(|f| f.starts_with("Grayscale"));
                // Lowest index wins among equals.
                (grayscale as u8 * 2 + c.likely_ir as u8, std::cmp::Reverse(c.index))
            })
            .filter(|c| c.likely_ir);

        match selected {
            Some(camera) => {
                tracing::info!("Selected camera /dev/video{} ({})", camera.index, camera.name);
                Ok(camera.index)
            }
            None => {
                tracing::info!("No IR camera detected, falling back to /dev/video0");
                Ok(0)
            }
        }
    }

    fn open_device(index: u32, config: CameraConfig) -> Result<Self> {
        tracing::info!("Opening camera device {}", index);

        let device = Device::new(index as usize)
            .map_err(|e| FaceLockError::Camera(format!("Failed to open camera {}: {}", index, e)))?;

        let caps = device.query_caps()
            .map_err(|e| FaceLockError::Camera(format!("Failed to query capabilities: {}", e)))?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            tracing::warn!("Device {} may not support standard video capture", index);
        }

        let mut fmt = device.format()
            .map_err(|e| FaceLockError::Camera(format!("Failed to get format: {}", e)))?;
        fmt.width = config.width;
        fmt.height = config.height;
        if &fmt.fourcc.repr != b"GREY" {
            fmt.fourcc = FourCC::new(b"MJPG");
        }

        if let Err(e) = device.set_format(&fmt) {
            tracing::warn!("Could not set exact format: {}. Using device defaults.", e);
        }
        if let Err(e) = device.set_params(&Parameters::with_fps(config.framerate)) {
            tracing::warn!("Could not set framerate to {}: {}", config.framerate, e);
        }

        let actual = device.format()
            .map_err(|e| FaceLockError::Camera(format!("Failed to get final format: {}", e)))?;
        tracing::info!("Camera format: {}x{} {}", actual.width, actual.height, actual.fourcc);
        if actual.width != config.width || actual.height != config.height {
            tracing::warn!(
                "Camera resolution {}x{} differs from requested {}x{}",
                actual.width, actual.height, config.width, config.height
            );
        }

        Ok(Self { device, index, config })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn start_session(&self) -> Result<CameraSession<'_>> {
        let format = self.device.format()
            .map_err(|e| FaceLockError::Camera(format!("Failed to get format: {}", e)))?;

        let mut stream = v4l::io::mmap::Stream::with_buffers(&self.device, Type::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| FaceLockError::Camera(format!("Failed to create stream: {}", e)))?;

        for i in 0..self.config.warmup_frames {
            stream.next()
                .map_err(|e| FaceLockError::Camera(format!("Failed to capture warmup frame {}: {}", i, e)))?;
            std::thread::sleep(Duration::from_millis(self.config.warmup_delay_ms));
        }
        tracing::debug!("Camera /dev/video{} streaming", self.index);

        Ok(CameraSession {
            stream,
            format,
            camera: self,
        })
    }
}

impl FrameSource for CameraSession<'_> {
    fn read_frame(&mut self) -> Result<Frame> {
        let (buf, meta) = self.stream.next()
            .map_err(|e| FaceLockError::Camera(format!("Failed to capture: {}", e)))?;

        let used = (meta.bytesused as usize).min(buf.len());
        let data = if used == 0 { buf } else { &buf[..used] };
        let image = decode_frame(data, &self.format)?;
        Ok(Frame::new(image))
    }
}

impl Drop for CameraSession<'_> {
    fn drop(&mut self) {
        tracing::debug!("Stopping capture on /dev/video{}", self.camera.index);
    }
}

/// Converts a raw capture buffer into an image according to the negotiated pixel format.
pub fn decode_frame(data: &[u8], format: &Format) -> Result<DynamicImage> {
    let width = format.width;
    let height = format.height;
    let pixels = (width * height) as usize;

    match &format.fourcc.repr {
        b"GREY" => {
            if data.len() < pixels {
                return Err(FaceLockError::Camera(format!(
                    "Short GREY frame: {} bytes for {}x{}", data.len(), width, height
                )));
            }
            let buffer = ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data[..pixels].to_vec())
                .ok_or_else(|| FaceLockError::Camera("Failed to create grayscale image buffer".into()))?;
            Ok(DynamicImage::ImageLuma8(buffer))
        }
        b"YUYV" => {
            if data.len() < pixels * 2 {
                return Err(FaceLockError::Camera(format!(
                    "Short YUYV frame: {} bytes for {}x{}", data.len(), width, height
                )));
            }
            // Luma only: Y0 U Y1 V
            let luma: Vec<u8> = data[..pixels * 2].iter().step_by(2).copied().collect();
            let buffer = ImageBuffer::<Luma<u8>, _>::from_raw(width, height, luma)
                .ok_or_else(|| FaceLockError::Camera("Failed to create luma image buffer".into()))?;
            Ok(DynamicImage::ImageLuma8(buffer))
        }
        b"MJPG" => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?),
        _ => Err(FaceLockError::Camera(format!("Unsupported pixel format {}", format.fourcc))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_frames_decode_to_luma() {
        let format = Format::new(4, 2, FourCC::new(b"GREY"));
        let data: Vec<u8> = (0..8).collect();
        let image = decode_frame(&data, &format).unwrap();
        assert_eq!((image.width(), image.height()), (4, 2));
        assert_eq!(image.to_luma8().get_pixel(3, 1)[0], 7);
    }

    #[test]
    fn yuyv_frames_keep_the_y_plane() {
        let format = Format::new(2, 1, FourCC::new(b"YUYV"));
        let image = decode_frame(&[10, 128, 20, 128], &format).unwrap();
        let luma = image.to_luma8();
        assert_eq!(luma.get_pixel(0, 0)[0], 10);
        assert_eq!(luma.get_pixel(1, 0)[0], 20);
    }

    #[test]
    fn short_buffers_are_camera_errors() {
        let format = Format::new(4, 4, FourCC::new(b"GREY"));
        assert!(matches!(decode_frame(&[0; 3], &format), Err(FaceLockError::Camera(_))));
    }

    #[test]
    fn unknown_formats_are_rejected() {
        let format = Format::new(2, 2, FourCC::new(b"H264"));
        assert!(decode_frame(&[0; 16], &format).is_err());
    }
}
