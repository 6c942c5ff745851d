use std::collections::HashSet;
use std::fmt;

use image::RgbaImage;

use crate::ops::color::{Color, TRANSPARENT, over, to_premultiplied_bgra, with_alpha_capped};
use crate::ops::{fill, lines, shapes};
use crate::selection::{Selection, SelectionMode, SelectionRect};
use crate::settings::EngineSettings;
use crate::{log_info, log_warn};

// ============================================================================
// ERRORS
// ============================================================================

/// Failures surfaced by canvas allocation and image / project I/O.
///
/// Out-of-bounds coordinates are never errors; pixel ops treat them as no-ops.
#[derive(Debug)]
pub enum CanvasError {
    InvalidDimensions { width: u32, height: u32 },
    TooLarge { width: u32, height: u32, max_pixels: u64 },
    Decode(String),
    Encode(String),
    Io(std::io::Error),
    Project(String),
}

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasError::InvalidDimensions { width, height } => {
                write!(f, "Invalid canvas size {}x{}: both sides must be > 0", width, height)
            }
            CanvasError::TooLarge { width, height, max_pixels } => write!(
                f,
                "Canvas {}x{} exceeds the limit of {} pixels",
                width, height, max_pixels
            ),
            CanvasError::Decode(e) => write!(f, "Decode error: {}", e),
            CanvasError::Encode(e) => write!(f, "Encode error: {}", e),
            CanvasError::Io(e) => write!(f, "I/O error: {}", e),
            CanvasError::Project(e) => write!(f, "Invalid project file: {}", e),
        }
    }
}

impl std::error::Error for CanvasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CanvasError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CanvasError {
    fn from(e: std::io::Error) -> Self {
        CanvasError::Io(e)
    }
}

impl From<image::ImageError> for CanvasError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => CanvasError::Io(io),
            image::ImageError::Encoding(_) => CanvasError::Encode(e.to_string()),
            other => CanvasError::Decode(other.to_string()),
        }
    }
}

impl From<Box<bincode::ErrorKind>> for CanvasError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        CanvasError::Project(e.to_string())
    }
}

/// Reject empty or oversized canvases before anything is allocated.
pub fn check_dimensions(width: u32, height: u32, max_pixels: u64) -> Result<(), CanvasError> {
    if width == 0 || height == 0 {
        return Err(CanvasError::InvalidDimensions { width, height });
    }
    if width as u64 * height as u64 > max_pixels {
        return Err(CanvasError::TooLarge { width, height, max_pixels });
    }
    Ok(())
}

// ============================================================================
// PIXEL BUFFER
// ============================================================================

/// A straight-alpha RGBA grid with checked, signed-coordinate access.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    img: RgbaImage,
}

impl PixelBuffer {
    /// New buffer with every pixel set to `TRANSPARENT`.
    pub fn new(width: u32, height: u32) -> Self {
        Self { img: RgbaImage::from_pixel(width, height, TRANSPARENT) }
    }

    pub fn from_image(img: RgbaImage) -> Self {
        Self { img }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.img.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.img.height()
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.img.width() && (y as u32) < self.img.height()
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<Color> {
        if self.in_bounds(x, y) {
            Some(*self.img.get_pixel(x as u32, y as u32))
        } else {
            None
        }
    }

    /// Overwrite one pixel. Returns `false` (and does nothing) out of bounds.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, color: Color) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        self.img.put_pixel(x as u32, y as u32, color);
        true
    }

    /// Composite `color` onto the existing pixel with `Over`.
    #[inline]
    pub fn blend(&mut self, x: i32, y: i32, color: Color) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let px = self.img.get_pixel_mut(x as u32, y as u32);
        *px = over(color, *px);
        true
    }

    pub fn fill(&mut self, color: Color) {
        for p in self.img.pixels_mut() {
            *p = color;
        }
    }

    pub fn clear(&mut self) {
        self.fill(TRANSPARENT);
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.img
    }
}

// ============================================================================
// CANVAS STATE — base layer, preview layer, selection
// ============================================================================

/// The editing engine: a committed `base` grid, a transient `preview`
/// overlay of the same size, and the multi-region selection.
///
/// Every operation runs to completion on the calling thread. Pointer
/// coordinates may lie outside the canvas; such writes are ignored.
#[derive(Clone, Debug)]
pub struct CanvasState {
    base: PixelBuffer,
    preview: PixelBuffer,
    selection: Selection,
    preview_alpha: u8,
    max_pixels: u64,
}

impl CanvasState {
    /// Blank canvas with default settings.
    pub fn new(width: u32, height: u32) -> Result<Self, CanvasError> {
        Self::with_settings(width, height, &EngineSettings::default())
    }

    pub fn with_settings(
        width: u32,
        height: u32,
        settings: &EngineSettings,
    ) -> Result<Self, CanvasError> {
        if let Err(e) = check_dimensions(width, height, settings.max_pixels) {
            log_warn!("Refusing canvas allocation: {}", e);
            return Err(e);
        }
        log_info!("New canvas {}x{}", width, height);
        Ok(Self {
            base: PixelBuffer::new(width, height),
            preview: PixelBuffer::new(width, height),
            selection: Selection::new(width, height),
            preview_alpha: settings.preview_alpha,
            max_pixels: settings.max_pixels,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.base.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.base.height()
    }

    #[inline]
    pub fn is_within_bounds(&self, x: i32, y: i32) -> bool {
        self.base.in_bounds(x, y)
    }

    /// Overwrite a base pixel; `false` when `(x, y)` is off canvas.
    pub fn write_pixel(&mut self, x: i32, y: i32, color: Color) -> bool {
        self.base.set(x, y, color)
    }

    pub fn read_pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.base.get(x, y)
    }

    /// Colour under the picker. Same as `read_pixel`; the preview is ignored.
    pub fn pick_color(&self, x: i32, y: i32) -> Option<Color> {
        self.read_pixel(x, y)
    }

    pub fn base(&self) -> &PixelBuffer {
        &self.base
    }

    pub fn preview(&self) -> &PixelBuffer {
        &self.preview
    }

    pub fn max_pixels(&self) -> u64 {
        self.max_pixels
    }

    // ---- compositing ----------------------------------------------------------

    /// Straight-alpha composite of preview over base. Single source of truth
    /// for display and export.
    pub fn composite(&self) -> RgbaImage {
        let mut out = self.base.as_image().clone();
        for (dst, pv) in out.pixels_mut().zip(self.preview.as_image().pixels()) {
            if pv[3] > 0 {
                *dst = over(*pv, *dst);
            }
        }
        out
    }

    /// The composite as premultiplied BGRA bytes, row-major, 4 bytes per pixel.
    pub fn composite_bgra_premultiplied(&self) -> Vec<u8> {
        let img = self.composite();
        let mut out = Vec::with_capacity(img.as_raw().len());
        for p in img.pixels() {
            out.extend_from_slice(&to_premultiplied_bgra(*p));
        }
        out
    }

    /// Swap in a new base image, reallocating the preview and dropping the
    /// selection. Nothing changes if the image is rejected.
    pub fn replace_image(&mut self, img: RgbaImage) -> Result<(), CanvasError> {
        let (w, h) = img.dimensions();
        if let Err(e) = check_dimensions(w, h, self.max_pixels) {
            log_warn!("Rejected image: {}", e);
            return Err(e);
        }
        self.base = PixelBuffer::from_image(img);
        self.preview = PixelBuffer::new(w, h);
        self.selection = Selection::new(w, h);
        log_info!("Canvas replaced, now {}x{}", w, h);
        Ok(())
    }

    // ---- preview layer --------------------------------------------------------

    pub fn clear_preview(&mut self) {
        self.preview.clear();
    }

    pub fn preview_alpha(&self) -> u8 {
        self.preview_alpha
    }

    pub fn set_preview_alpha(&mut self, alpha: u8) {
        self.preview_alpha = alpha;
    }

    /// Brush-tip hover feedback: clear the preview and stamp the footprint.
    /// `brush_size <= 1` is a single pixel; larger sizes stamp every offset
    /// with `sqrt(i² + j²) <= brush_size / 2`.
    pub fn update_preview(&mut self, x: i32, y: i32, color: Color, brush_size: u32) {
        self.preview.clear();
        if brush_size <= 1 {
            self.preview.set(x, y, color);
            return;
        }
        let radius = brush_size as f64 / 2.0;
        let reach = radius.ceil() as i64;
        let (cx, cy) = (x as i64, y as i64);
        // only offsets that land on the canvas
        let (w, h) = (self.width() as i64, self.height() as i64);
        for py in (cy - reach).max(0)..=(cy + reach).min(h - 1) {
            let j = py - cy;
            for px in (cx - reach).max(0)..=(cx + reach).min(w - 1) {
                let i = px - cx;
                if ((i * i + j * j) as f64).sqrt() <= radius {
                    self.preview.set(px as i32, py as i32, color);
                }
            }
        }
    }

    #[inline]
    fn preview_color(&self, color: Color) -> Color {
        with_alpha_capped(color, self.preview_alpha)
    }

    // ---- region growing -------------------------------------------------------

    pub fn flood_fill(&mut self, x: i32, y: i32, color: Color) -> usize {
        fill::flood_fill(&mut self.base, x, y, color)
    }

    pub fn erase_similar(&mut self, x: i32, y: i32, tolerance: u32) -> usize {
        fill::erase_similar(&mut self.base, x, y, tolerance)
    }

    pub fn replace_similar(&mut self, x: i32, y: i32, color: Color, tolerance: u32) -> usize {
        fill::replace_similar(&mut self.base, x, y, color, tolerance)
    }

    pub fn magic_wand_points(&self, x: i32, y: i32, tolerance: u32) -> HashSet<(u32, u32)> {
        fill::magic_wand(&self.base, x, y, tolerance)
    }

    /// Grow a wand region from `(x, y)` and fold it into the selection.
    /// A seed off the canvas leaves the selection untouched.
    pub fn magic_wand_select(&mut self, x: i32, y: i32, tolerance: u32, mode: SelectionMode) {
        if !self.is_within_bounds(x, y) {
            return;
        }
        let points = self.magic_wand_points(x, y, tolerance);
        let mask = fill::points_to_mask(&points, self.width(), self.height());
        self.selection.apply_mask(&mask, mode);
    }

    // ---- primitives -----------------------------------------------------------

    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color, antialiased: bool) {
        if antialiased {
            lines::draw_line_aa(&mut self.base, x0, y0, x1, y1, color);
        } else {
            lines::draw_line(&mut self.base, x0, y0, x1, y1, color);
        }
    }

    /// Line into the preview. The antialiased variant still blends coverage;
    /// the plain variant writes flat capped samples.
    pub fn draw_line_preview(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: Color,
        antialiased: bool,
    ) {
        self.preview.clear();
        let color = self.preview_color(color);
        if antialiased {
            lines::draw_line_aa(&mut self.preview, x0, y0, x1, y1, color);
        } else {
            lines::draw_line(&mut self.preview, x0, y0, x1, y1, color);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_rectangle(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        border: Color,
        fill: Color,
        draw_border: bool,
        draw_fill: bool,
    ) {
        shapes::draw_rectangle(&mut self.base, x1, y1, x2, y2, border, fill, draw_border, draw_fill);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_rectangle_preview(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        border: Color,
        fill: Color,
        draw_border: bool,
        draw_fill: bool,
    ) {
        self.preview.clear();
        let (border, fill) = (self.preview_color(border), self.preview_color(fill));
        shapes::draw_rectangle(&mut self.preview, x1, y1, x2, y2, border, fill, draw_border, draw_fill);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_ellipse(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        border: Color,
        fill: Color,
        draw_border: bool,
        draw_fill: bool,
        antialiased: bool,
    ) {
        if antialiased {
            shapes::draw_ellipse_aa(&mut self.base, x1, y1, x2, y2, border, fill, draw_border, draw_fill);
        } else {
            shapes::draw_ellipse(&mut self.base, x1, y1, x2, y2, border, fill, draw_border, draw_fill);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_ellipse_preview(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        border: Color,
        fill: Color,
        draw_border: bool,
        draw_fill: bool,
        antialiased: bool,
    ) {
        self.preview.clear();
        let (border, fill) = (self.preview_color(border), self.preview_color(fill));
        let target = &mut self.preview;
        if antialiased {
            shapes::draw_ellipse_aa(target, x1, y1, x2, y2, border, fill, draw_border, draw_fill);
        } else {
            shapes::draw_ellipse(target, x1, y1, x2, y2, border, fill, draw_border, draw_fill);
        }
    }

    // ---- selection ------------------------------------------------------------

    pub fn selection_start(&mut self, x: i32, y: i32, mode: SelectionMode) {
        self.selection.start(x, y, mode);
    }

    pub fn selection_update(&mut self, x: i32, y: i32) {
        self.selection.update(x, y);
    }

    pub fn selection_end(&mut self, x: i32, y: i32) {
        self.selection.end(x, y);
    }

    /// Drop an unfinished drag without committing it.
    pub fn selection_cancel(&mut self) {
        self.selection.cancel_drag();
    }

    /// Fold a finished rectangle into the selection without a drag.
    pub fn select_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, mode: SelectionMode) {
        self.selection.apply_rect(SelectionRect::normalized(x0, y0, x1, y1), mode);
    }

    pub fn select_all(&mut self) {
        self.selection.select_all();
    }

    pub fn deselect(&mut self) {
        self.selection.clear();
    }

    /// Erase every selected base pixel to `TRANSPARENT`, then drop the selection.
    pub fn delete_selection(&mut self) {
        let w = self.width() as usize;
        let mask = self.selection.covered_mask();
        for (i, _) in mask.iter().enumerate().filter(|(_, m)| **m) {
            self.base.set((i % w) as i32, (i / w) as i32, TRANSPARENT);
        }
        self.selection.clear();
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_regions(&self) -> &[SelectionRect] {
        self.selection.regions()
    }

    /// Restore committed regions (project load).
    pub fn set_selection_regions(&mut self, regions: &[SelectionRect]) {
        self.selection.set_regions(regions);
    }

    pub fn has_selection(&self) -> bool {
        self.selection.has_selection()
    }

    pub fn is_selected(&self, x: i32, y: i32) -> bool {
        self.selection.is_selected(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::color::{BLACK, WHITE, rgb, rgba};

    #[test]
    fn new_canvas_is_transparent_white() {
        let c = CanvasState::new(4, 4).unwrap();
        assert_eq!(c.read_pixel(0, 0), Some(TRANSPARENT));
        assert_eq!(c.read_pixel(3, 3), Some(rgba(255, 255, 255, 0)));
        assert_eq!(c.preview().as_image().dimensions(), (4, 4));
    }

    #[test]
    fn allocation_guards() {
        assert!(matches!(
            CanvasState::new(0, 5),
            Err(CanvasError::InvalidDimensions { width: 0, height: 5 })
        ));
        let small = EngineSettings { max_pixels: 100, ..EngineSettings::default() };
        assert!(matches!(
            CanvasState::with_settings(11, 10, &small),
            Err(CanvasError::TooLarge { .. })
        ));
        assert!(CanvasState::with_settings(10, 10, &small).is_ok());
    }

    #[test]
    fn out_of_bounds_access_is_silent() {
        let mut c = CanvasState::new(3, 3).unwrap();
        let before = c.composite();
        for (x, y) in [(-1, 0), (0, -1), (3, 0), (0, 3), (i32::MIN, i32::MAX)] {
            assert!(!c.write_pixel(x, y, BLACK));
            assert_eq!(c.read_pixel(x, y), None);
        }
        assert_eq!(c.composite(), before);
    }

    #[test]
    fn composite_blends_preview_over_base() {
        let mut c = CanvasState::new(2, 1).unwrap();
        c.write_pixel(0, 0, WHITE);
        c.write_pixel(1, 0, WHITE);
        c.update_preview(0, 0, rgba(0, 0, 0, 128), 1);
        let img = c.composite();
        assert_eq!(img.get_pixel(1, 0), &WHITE);
        assert_eq!(img.get_pixel(0, 0)[0], 127);
        // base untouched
        assert_eq!(c.read_pixel(0, 0), Some(WHITE));
        c.clear_preview();
        assert_eq!(c.composite(), *c.base().as_image());
    }

    #[test]
    fn update_preview_stamps_round_brush() {
        let mut c = CanvasState::new(9, 9).unwrap();
        c.update_preview(4, 4, BLACK, 4);
        let p = c.preview();
        assert_eq!(p.get(4, 4), Some(BLACK));
        assert_eq!(p.get(6, 4), Some(BLACK));
        assert_eq!(p.get(4, 2), Some(BLACK));
        // sqrt(8) > 2
        assert_eq!(p.get(6, 6), Some(TRANSPARENT));
        // second call replaces the first stamp
        c.update_preview(0, 0, BLACK, 1);
        assert_eq!(c.preview().get(4, 4), Some(TRANSPARENT));
        assert_eq!(c.preview().get(0, 0), Some(BLACK));
    }

    #[test]
    fn oversized_brush_stamps_only_the_canvas() {
        let mut c = CanvasState::new(5, 4).unwrap();
        c.update_preview(2, 1, BLACK, u32::MAX);
        assert!(c.preview().as_image().pixels().all(|p| *p == BLACK));

        c.update_preview(i32::MAX, i32::MIN, BLACK, 6);
        assert!(c.preview().as_image().pixels().all(|p| *p == TRANSPARENT));
        c.update_preview(i32::MIN, 0, BLACK, u32::MAX);
        assert!(c.preview().as_image().pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn antialiased_line_preview_is_capped_and_clipped() {
        let mut c = CanvasState::new(6, 3).unwrap();
        c.draw_line_preview(i32::MIN, 1, i32::MAX, 1, BLACK, true);
        for x in 0..6 {
            assert_eq!(c.preview().get(x, 1), Some(rgba(0, 0, 0, 128)));
            assert_eq!(c.preview().get(x, 0), Some(TRANSPARENT));
        }
        assert_eq!(c.base(), &PixelBuffer::new(6, 3));
    }

    #[test]
    fn shape_previews_never_touch_base_and_are_capped() {
        let mut c = CanvasState::new(6, 6).unwrap();
        let base_before = c.base().clone();
        c.draw_line_preview(0, 0, 5, 5, BLACK, false);
        c.draw_rectangle_preview(0, 0, 3, 3, BLACK, WHITE, true, true);
        assert_eq!(c.base(), &base_before);
        // the rectangle cleared the line
        assert_eq!(c.preview().get(5, 5), Some(TRANSPARENT));
        assert_eq!(c.preview().get(0, 0), Some(rgba(0, 0, 0, 128)));
        assert_eq!(c.preview().get(1, 1), Some(rgba(255, 255, 255, 128)));

        c.set_preview_alpha(60);
        c.draw_ellipse_preview(0, 0, 4, 4, BLACK, WHITE, true, false, false);
        assert_eq!(c.preview().get(2, 0), Some(rgba(0, 0, 0, 60)));
        assert_eq!(c.base(), &base_before);
    }

    #[test]
    fn premultiplied_output_matches_composite() {
        let mut c = CanvasState::new(2, 1).unwrap();
        c.write_pixel(0, 0, rgb(255, 0, 0));
        let bytes = c.composite_bgra_premultiplied();
        assert_eq!(bytes, vec![0, 0, 255, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn replace_image_is_all_or_nothing() {
        let mut c = CanvasState::new(3, 3).unwrap();
        c.write_pixel(1, 1, BLACK);
        c.select_all();
        assert!(c.replace_image(RgbaImage::new(0, 4)).is_err());
        assert_eq!(c.width(), 3);
        assert_eq!(c.read_pixel(1, 1), Some(BLACK));
        assert!(c.has_selection());

        c.replace_image(RgbaImage::from_pixel(5, 2, WHITE)).unwrap();
        assert_eq!((c.width(), c.height()), (5, 2));
        assert_eq!(c.preview().as_image().dimensions(), (5, 2));
        assert!(!c.has_selection());
    }

    #[test]
    fn delete_selection_clears_covered_pixels() {
        let mut c = CanvasState::new(4, 4).unwrap();
        c.base.fill(BLACK);
        c.select_rect(0, 0, 1, 1, SelectionMode::Replace);
        c.select_rect(3, 3, 3, 3, SelectionMode::Add);
        c.delete_selection();
        assert_eq!(c.read_pixel(1, 1), Some(TRANSPARENT));
        assert_eq!(c.read_pixel(3, 3), Some(TRANSPARENT));
        assert_eq!(c.read_pixel(2, 2), Some(BLACK));
        assert!(c.selection_regions().is_empty());
    }

    #[test]
    fn magic_wand_select_modes() {
        let mut c = CanvasState::new(4, 4).unwrap();
        c.draw_rectangle(0, 0, 1, 3, BLACK, BLACK, true, true);
        c.magic_wand_select(0, 0, 0, SelectionMode::Replace);
        assert_eq!(c.selection().pixel_count(), 8);
        assert!(c.is_selected(1, 3));
        assert!(!c.is_selected(2, 0));

        c.magic_wand_select(3, 0, 0, SelectionMode::Add);
        assert_eq!(c.selection().pixel_count(), 16);

        c.write_pixel(2, 2, WHITE);
        c.magic_wand_select(2, 2, 0, SelectionMode::Subtract);
        assert_eq!(c.selection().pixel_count(), 15);
        assert!(!c.is_selected(2, 2));

        // off-canvas seed leaves the selection alone
        c.magic_wand_select(-1, 0, 0, SelectionMode::Replace);
        assert_eq!(c.selection().pixel_count(), 15);
    }

    #[test]
    fn error_display_is_readable() {
        let e = CanvasError::TooLarge { width: 5, height: 6, max_pixels: 10 };
        assert_eq!(e.to_string(), "Canvas 5x6 exceeds the limit of 10 pixels");
        let e: CanvasError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(e.to_string().contains("boom"));
    }
}
