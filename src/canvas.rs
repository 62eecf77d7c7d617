//! CPU fallback renderer.
//!
//! [`Canvas2d`] is a small immediate-mode 2D rasterizer with a
//! save/restore transform stack. [`CanvasRenderer`] draws the bottle into
//! one and presents the pixels to the window through softbuffer.

use std::num::NonZeroU32;
use std::sync::Arc;

use glam::{Affine2, Vec2};
use winit::window::Window;

use crate::bottle::Bottle;
use crate::error::RenderError;

/// An opaque 8-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pack as `0x00RRGGBB`, the layout softbuffer expects.
    pub fn to_pixel(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_pixel(pixel: u32) -> Self {
        Self::rgb((pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8)
    }
}

/// Software 2D canvas. Shapes are filled at pixel centres, no
/// antialiasing.
pub struct Canvas2d {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    transform: Affine2,
    stack: Vec<Affine2>,
    fill: Color,
}

impl Canvas2d {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            transform: Affine2::IDENTITY,
            stack: Vec::new(),
            fill: Color::BLACK,
        }
    }

    /// Resize the pixel buffer. Contents are undefined afterwards.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width as usize * height as usize];
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(Color::from_pixel(self.pixels[(y * self.width + x) as usize]))
    }

    /// Pixels as tightly packed RGBA8 rows.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| {
                let c = Color::from_pixel(*p);
                [c.r, c.g, c.b, 255]
            })
            .collect()
    }

    pub fn set_fill(&mut self, color: Color) {
        self.fill = color;
    }

    /// Push the current transform.
    pub fn save(&mut self) {
        self.stack.push(self.transform);
    }

    /// Pop the last saved transform. Unbalanced restores are ignored.
    pub fn restore(&mut self) {
        if let Some(transform) = self.stack.pop() {
            self.transform = transform;
        }
    }

    /// Number of saved transforms.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn transform(&self) -> Affine2 {
        self.transform
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.transform = self.transform * Affine2::from_translation(Vec2::new(x, y));
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.transform = self.transform * Affine2::from_scale(Vec2::new(sx, sy));
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.fill_polygon(&[
            Vec2::new(x, y),
            Vec2::new(x + w, y),
            Vec2::new(x + w, y + h),
            Vec2::new(x, y + h),
        ]);
    }

    pub fn fill_circle(&mut self, center: Vec2, radius: f32) {
        if self.transform.matrix2.determinant() == 0.0 {
            return;
        }
        let inverse = self.transform.inverse();
        let corners = [
            center + Vec2::new(-radius, -radius),
            center + Vec2::new(radius, -radius),
            center + Vec2::new(radius, radius),
            center + Vec2::new(-radius, radius),
        ]
        .map(|c| self.transform.transform_point2(c));
        let r2 = radius * radius;
        let fill = self.fill.to_pixel();
        self.scan(&corners, |p| {
            (inverse.transform_point2(p) - center).length_squared() <= r2
        }, fill);
    }

    /// Fill a closed path through `points` with the even-odd rule.
    pub fn fill_polygon(&mut self, points: &[Vec2]) {
        if points.len() < 3 {
            return;
        }
        let device: Vec<Vec2> = points
            .iter()
            .map(|p| self.transform.transform_point2(*p))
            .collect();
        let fill = self.fill.to_pixel();
        self.scan(&device, |p| contains(&device, p), fill);
    }

    /// Visit the pixel centres inside the bounds of `hull` and set the
    /// ones `inside` accepts.
    fn scan(&mut self, hull: &[Vec2], inside: impl Fn(Vec2) -> bool, pixel: u32) {
        let (lo, hi) = hull.iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(lo, hi), p| (lo.min(*p), hi.max(*p)),
        );
        if !lo.is_finite() || !hi.is_finite() {
            return;
        }
        let x0 = lo.x.floor().max(0.0) as u32;
        let y0 = lo.y.floor().max(0.0) as u32;
        let x1 = (hi.x.ceil().max(0.0) as u32).min(self.width);
        let y1 = (hi.y.ceil().max(0.0) as u32).min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                if inside(Vec2::new(x as f32 + 0.5, y as f32 + 0.5)) {
                    self.pixels[(y * self.width + x) as usize] = pixel;
                }
            }
        }
    }
}

/// Even-odd point in polygon test.
fn contains(polygon: &[Vec2], p: Vec2) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Draw one frame of `bottle`: black background, white balls, gray
/// static geometry, +y up with the bottle filling the canvas.
pub fn draw_bottle(canvas: &mut Canvas2d, bottle: &Bottle) {
    let w = canvas.width() as f32;
    let h = canvas.height() as f32;
    let config = bottle.config();

    canvas.set_fill(Color::BLACK);
    canvas.fill_rect(0.0, 0.0, w, h);

    canvas.save();
    canvas.translate(w / 2.0, h / 2.0);
    canvas.scale(w / config.width, -h / config.height);

    canvas.set_fill(Color::WHITE);
    for position in bottle.ball_positions() {
        canvas.fill_circle(position, config.ball_radius);
    }

    canvas.set_fill(Color::GRAY);
    for polygon in bottle.static_polygons() {
        canvas.fill_polygon(&polygon.vertices);
    }

    canvas.restore();
}

/// Presents [`draw_bottle`] frames through softbuffer.
pub struct CanvasRenderer {
    window: Arc<Window>,
    surface: softbuffer::Surface<Arc<Window>, Arc<Window>>,
    canvas: Canvas2d,
}

impl CanvasRenderer {
    pub fn new(window: Arc<Window>) -> Result<Self, softbuffer::SoftBufferError> {
        let context = softbuffer::Context::new(Arc::clone(&window))?;
        let surface = softbuffer::Surface::new(&context, Arc::clone(&window))?;
        let size = window.inner_size();
        log::info!("canvas renderer at {}x{}", size.width, size.height);
        Ok(Self {
            window,
            surface,
            canvas: Canvas2d::new(size.width, size.height),
        })
    }

    pub fn render(&mut self, bottle: &Bottle) -> Result<(), RenderError> {
        let size = self.window.inner_size();
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            // minimized
            return Ok(());
        };
        self.surface
            .resize(width, height)
            .map_err(|e| RenderError::Present(e.to_string()))?;
        self.canvas.resize(size.width, size.height);

        draw_bottle(&mut self.canvas, bottle);

        let mut buffer = self
            .surface
            .buffer_mut()
            .map_err(|e| RenderError::Present(e.to_string()))?;
        buffer.copy_from_slice(self.canvas.pixels());
        buffer
            .present()
            .map_err(|e| RenderError::Present(e.to_string()))
    }

    pub fn canvas(&self) -> &Canvas2d {
        &self.canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bottle::BottleConfig;

    #[test]
    fn test_save_restore_balanced() {
        let mut canvas = Canvas2d::new(4, 4);
        canvas.save();
        canvas.translate(1.0, 2.0);
        canvas.save();
        canvas.scale(2.0, 2.0);
        assert_eq!(canvas.depth(), 2);
        canvas.restore();
        assert_eq!(canvas.transform(), Affine2::from_translation(Vec2::new(1.0, 2.0)));
        canvas.restore();
        assert_eq!(canvas.transform(), Affine2::IDENTITY);
        canvas.restore();
        assert_eq!(canvas.depth(), 0);
    }

    #[test]
    fn test_fill_rect_under_transform() {
        let mut canvas = Canvas2d::new(8, 8);
        canvas.set_fill(Color::WHITE);
        canvas.translate(2.0, 2.0);
        canvas.scale(2.0, 2.0);
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0);
        assert_eq!(canvas.pixel(2, 2), Some(Color::WHITE));
        assert_eq!(canvas.pixel(3, 3), Some(Color::WHITE));
        assert_eq!(canvas.pixel(4, 4), Some(Color::BLACK));
        assert_eq!(canvas.pixel(1, 1), Some(Color::BLACK));
    }

    #[test]
    fn test_fill_circle() {
        let mut canvas = Canvas2d::new(20, 20);
        canvas.set_fill(Color::WHITE);
        canvas.fill_circle(Vec2::new(10.0, 10.0), 5.0);
        assert_eq!(canvas.pixel(10, 10), Some(Color::WHITE));
        assert_eq!(canvas.pixel(10, 6), Some(Color::WHITE));
        assert_eq!(canvas.pixel(1, 1), Some(Color::BLACK));
        assert_eq!(canvas.pixel(14, 14), Some(Color::BLACK));
    }

    #[test]
    fn test_polygon_even_odd() {
        let triangle = [Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0), Vec2::new(0.0, 4.0)];
        assert!(contains(&triangle, Vec2::new(1.0, 1.0)));
        assert!(!contains(&triangle, Vec2::new(3.0, 3.0)));
    }

    #[test]
    fn test_draw_bottle_colors() {
        let bottle = Bottle::new(BottleConfig::default().with_ball_count(10).with_seed(9)).unwrap();
        let mut canvas = Canvas2d::new(100, 140);
        draw_bottle(&mut canvas, &bottle);

        assert_eq!(canvas.depth(), 0);
        assert_eq!(canvas.transform(), Affine2::IDENTITY);

        for p in bottle.ball_positions() {
            let x = (50.0 + 2.0 * p.x) as u32;
            let y = (70.0 - 2.0 * p.y) as u32;
            assert_eq!(canvas.pixel(x, y), Some(Color::WHITE), "ball at {p}");
        }
        // inside the right spike, close to the wall
        assert_eq!(canvas.pixel(96, 70), Some(Color::GRAY));
        // a bottle with no balls is black between the spike tips
        let empty = Bottle::new(BottleConfig::default().with_ball_count(0)).unwrap();
        draw_bottle(&mut canvas, &empty);
        assert_eq!(canvas.pixel(50, 70), Some(Color::BLACK));
        assert_eq!(canvas.pixel(96, 70), Some(Color::GRAY));
    }

    #[test]
    fn test_to_rgba() {
        let mut canvas = Canvas2d::new(1, 1);
        canvas.set_fill(Color::rgb(10, 20, 30));
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0);
        assert_eq!(canvas.to_rgba(), vec![10, 20, 30, 255]);
    }
}
