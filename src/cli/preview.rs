use crate::camera::Frame;
use crate::common::Result;
use crate::core::pipeline::FrameView;
use crate::core::resolver::ResolvedFace;
use crossterm::{cursor, terminal};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::io::{self, Write};

const ASCII_RAMP: &[char] = &[' ', '.', '·', ':', ';', '+', '=', 'x', 'X', '#', '@'];
const DEFAULT_WIDTH: usize = 80;
const DEFAULT_HEIGHT: usize = 30;
const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 225]);

/// Draws each face's bounding box onto a copy of the frame.
pub fn annotate_frame(image: &DynamicImage, faces: &[ResolvedFace]) -> RgbImage {
    let mut annotated = image.to_rgb8();
    for face in faces {
        let width = face.bounds.width().max(1.0) as u32;
        let height = face.bounds.height().max(1.0) as u32;
        let rect = Rect::at(face.bounds.x1 as i32, face.bounds.y1 as i32).of_size(width, height);
        draw_hollow_rect_mut(&mut annotated, rect, BOX_COLOR);
        // Second pass one pixel in for a 2px stroke.
        if width > 2 && height > 2 {
            let inner = Rect::at(face.bounds.x1 as i32 + 1, face.bounds.y1 as i32 + 1).of_size(width - 2, height - 2);
            draw_hollow_rect_mut(&mut annotated, inner, BOX_COLOR);
        }
    }
    annotated
}

pub struct AsciiRenderer {
    width: usize,
    height: usize,
}

impl AsciiRenderer {
    pub fn new(width: Option<usize>, height: Option<usize>) -> Self {
        let (term_width, term_height) = terminal::size()
            .map(|(w, h)| (w as usize, h as usize))
            .unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT));

        // Leave room below for the LCD panel.
        Self {
            width: width.unwrap_or(term_width.min(DEFAULT_WIDTH)).max(1),
            height: height.unwrap_or(term_height.saturating_sub(8).min(DEFAULT_HEIGHT)).max(1),
        }
    }

    /// Annotated frame as terminal lines, with each face's name above its box.
    pub fn render(&self, image: &DynamicImage, faces: &[ResolvedFace]) -> Vec<String> {
        let annotated = DynamicImage::ImageRgb8(annotate_frame(image, faces));
        let mut grid = self.image_to_ascii(&annotated);

        let img_width = image.width().max(1) as f32;
        let img_height = image.height().max(1) as f32;
        for face in faces {
            let x = ((face.bounds.x1 / img_width) * self.width as f32) as usize;
            let top = ((face.bounds.y1 / img_height) * self.height as f32) as usize;
            // Label above the box unless it would fall off the top.
            let y = if top >= 1 { top - 1 } else { top + 1 };
            self.overlay_text(&mut grid, &face.identity.to_string(), x, y);
        }

        grid.into_iter().map(|row| row.into_iter().collect()).collect()
    }

    fn image_to_ascii(&self, image: &DynamicImage) -> Vec<Vec<char>> {
        let gray = image.to_luma8();
        let (img_width, img_height) = gray.dimensions();
        let mut grid = vec![vec![' '; self.width]; self.height];

        for (term_y, row) in grid.iter_mut().enumerate() {
            for (term_x, cell) in row.iter_mut().enumerate() {
                let img_x = (term_x as f32 / self.width as f32 * img_width as f32) as u32;
                let img_y = (term_y as f32 / self.height as f32 * img_height as f32) as u32;
                if img_x < img_width && img_y < img_height {
                    let brightness = gray.get_pixel(img_x, img_y)[0] as usize;
                    *cell = ASCII_RAMP[brightness * (ASCII_RAMP.len() - 1) / 255];
                }
            }
        }

        grid
    }

    fn overlay_text(&self, grid: &mut [Vec<char>], text: &str, x: usize, y: usize) {
        if y >= self.height {
            return;
        }
        for (i, ch) in text.chars().enumerate() {
            if x + i < self.width {
                grid[y][x + i] = ch;
            }
        }
    }
}

/// Live operator view drawn over the top of the terminal.
pub struct AsciiPreview {
    renderer: AsciiRenderer,
}

impl AsciiPreview {
    pub fn new(width: Option<usize>, height: Option<usize>) -> Self {
        Self {
            renderer: AsciiRenderer::new(width, height),
        }
    }
}

impl FrameView for AsciiPreview {
    fn show(&mut self, frame: &Frame, faces: &[ResolvedFace]) -> Result<()> {
        let lines = self.renderer.render(&frame.image, faces);
        let mut stdout = io::stdout();
        crossterm::queue!(stdout, cursor::MoveTo(0, 0))?;
        write!(stdout, "{}\r\n", lines.join("\r\n"))?;
        stdout.flush()?;
        Ok(())
    }
}
