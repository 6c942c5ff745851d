// ============================================================================
// SELECTION SYSTEM — rectangle-list regions with add / subtract / replace
// ============================================================================

use serde::{Deserialize, Serialize};

/// How a new selection shape interacts with the existing regions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Clear any existing selection, then set the new shape.
    #[default]
    Replace,
    /// Union – append to the existing regions (Ctrl+drag).
    Add,
    /// Difference – cut the shape out of the existing regions (Alt+drag).
    Subtract,
}

impl SelectionMode {
    /// Ctrl adds, Alt subtracts, no modifier replaces.
    pub fn from_modifiers(ctrl: bool, alt: bool) -> Self {
        if ctrl {
            SelectionMode::Add
        } else if alt {
            SelectionMode::Subtract
        } else {
            SelectionMode::Replace
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "replace" | "normal" => Some(SelectionMode::Replace),
            "add" | "union" => Some(SelectionMode::Add),
            "subtract" | "sub" => Some(SelectionMode::Subtract),
            _ => None,
        }
    }
}

/// Axis-aligned rectangle with *inclusive* edges: `(0,0,0,0)` covers one pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl SelectionRect {
    /// Build from two arbitrary corners.
    pub fn normalized(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            left: x0.min(x1),
            top: y0.min(y1),
            right: x0.max(x1),
            bottom: y0.max(y1),
        }
    }

    pub fn width(&self) -> u32 {
        (self.right as i64 - self.left as i64 + 1).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom as i64 - self.top as i64 + 1).max(0) as u32
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.right < self.left || self.bottom < self.top
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    pub fn intersect(&self, other: &SelectionRect) -> Option<SelectionRect> {
        let r = SelectionRect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        if r.is_empty() { None } else { Some(r) }
    }

    pub fn overlaps(&self, other: &SelectionRect) -> bool {
        self.intersect(other).is_some()
    }

    /// Clip to a `width × height` canvas; `None` when nothing remains.
    pub fn clipped(&self, width: u32, height: u32) -> Option<SelectionRect> {
        if width == 0 || height == 0 {
            return None;
        }
        let canvas = SelectionRect {
            left: 0,
            top: 0,
            right: (width - 1) as i32,
            bottom: (height - 1) as i32,
        };
        self.intersect(&canvas)
    }

    /// Remove `cut` from this rectangle.
    ///
    /// Returns up to four disjoint remainders: full-height left and right
    /// strips, then top and bottom strips restricted to the overlap columns.
    /// A rectangle that does not overlap `cut` comes back unchanged.
    pub fn subtract(&self, cut: &SelectionRect) -> Vec<SelectionRect> {
        let Some(o) = self.intersect(cut) else {
            return vec![*self];
        };
        let mut out = Vec::with_capacity(4);
        if o.left > self.left {
            out.push(SelectionRect { left: self.left, top: self.top, right: o.left - 1, bottom: self.bottom });
        }
        if o.right < self.right {
            out.push(SelectionRect { left: o.right + 1, top: self.top, right: self.right, bottom: self.bottom });
        }
        if o.top > self.top {
            out.push(SelectionRect { left: o.left, top: self.top, right: o.right, bottom: o.top - 1 });
        }
        if o.bottom < self.bottom {
            out.push(SelectionRect { left: o.left, top: o.bottom + 1, right: o.right, bottom: self.bottom });
        }
        out
    }
}

/// In-progress rectangle drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DragState {
    start: (i32, i32),
    end: (i32, i32),
    mode: SelectionMode,
}

/// Multi-region selection on a `width × height` canvas.
///
/// Regions may overlap after `Add`; every query works on the covered pixel
/// set, so overlaps never double-count.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    width: u32,
    height: u32,
    regions: Vec<SelectionRect>,
    drag: Option<DragState>,
}

impl Selection {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, regions: Vec::new(), drag: None }
    }

    pub fn regions(&self) -> &[SelectionRect] {
        &self.regions
    }

    /// Committed regions plus a live drag with non-empty on-canvas area.
    pub fn has_selection(&self) -> bool {
        !self.regions.is_empty() || self.drag_rect().is_some()
    }

    /// The live drag rectangle clipped to the canvas, if a drag is in progress.
    pub fn drag_rect(&self) -> Option<SelectionRect> {
        let d = self.drag?;
        SelectionRect::normalized(d.start.0, d.start.1, d.end.0, d.end.1).clipped(self.width, self.height)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn clear(&mut self) {
        self.regions.clear();
        self.drag = None;
    }

    pub fn select_all(&mut self) {
        self.drag = None;
        self.regions = SelectionRect::normalized(0, 0, self.width as i32 - 1, self.height as i32 - 1)
            .clipped(self.width, self.height)
            .into_iter()
            .collect();
    }

    /// Restore regions (project load). Off-canvas parts are dropped.
    pub fn set_regions(&mut self, regions: &[SelectionRect]) {
        self.drag = None;
        self.regions = regions
            .iter()
            .filter_map(|r| r.clipped(self.width, self.height))
            .collect();
    }

    // ---- drag gesture ---------------------------------------------------------

    pub fn start(&mut self, x: i32, y: i32, mode: SelectionMode) {
        if mode == SelectionMode::Replace {
            self.regions.clear();
        }
        self.drag = Some(DragState { start: (x, y), end: (x, y), mode });
    }

    pub fn update(&mut self, x: i32, y: i32) {
        if let Some(d) = self.drag.as_mut() {
            d.end = (x, y);
        }
    }

    /// Abandon a drag without folding it in. Regions a Replace drag already
    /// cleared at `start` stay cleared.
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Finish the drag at `(x, y)` and fold the rectangle into the regions.
    /// Without a preceding `start` this behaves as a one-shot selection
    /// from `(x, y)` to itself in `Replace` mode.
    pub fn end(&mut self, x: i32, y: i32) {
        let d = self.drag.take().unwrap_or(DragState {
            start: (x, y),
            end: (x, y),
            mode: SelectionMode::Replace,
        });
        let rect = SelectionRect::normalized(d.start.0, d.start.1, x, y);
        self.apply_rect(rect, d.mode);
    }

    /// Fold one rectangle into the regions using `mode`.
    pub fn apply_rect(&mut self, rect: SelectionRect, mode: SelectionMode) {
        let clipped = rect.clipped(self.width, self.height);
        match mode {
            SelectionMode::Replace => {
                self.regions = clipped.into_iter().collect();
            }
            SelectionMode::Add => {
                if let Some(r) = clipped {
                    self.regions.push(r);
                }
            }
            SelectionMode::Subtract => {
                let Some(cut) = clipped else { return };
                self.regions = self
                    .regions
                    .iter()
                    .flat_map(|r| r.subtract(&cut))
                    .collect();
            }
        }
    }

    /// Fold an arbitrary pixel mask (row-major, `width * height`) into the
    /// regions. Subtraction is done per pixel before re-decomposing, since
    /// rectangle-vs-rectangle cuts cannot express irregular shapes.
    pub fn apply_mask(&mut self, mask: &[bool], mode: SelectionMode) {
        debug_assert_eq!(mask.len(), self.width as usize * self.height as usize);
        self.drag = None;
        match mode {
            SelectionMode::Replace => {
                self.regions = decompose_mask(mask, self.width, self.height);
            }
            SelectionMode::Add => {
                let rects = decompose_mask(mask, self.width, self.height);
                self.regions.extend(rects);
            }
            SelectionMode::Subtract => {
                let mut covered = self.covered_mask();
                for (c, &m) in covered.iter_mut().zip(mask) {
                    if m {
                        *c = false;
                    }
                }
                self.regions = decompose_mask(&covered, self.width, self.height);
            }
        }
    }

    // ---- queries --------------------------------------------------------------

    pub fn is_selected(&self, x: i32, y: i32) -> bool {
        self.regions.iter().any(|r| r.contains(x, y))
    }

    /// Row-major boolean mask of every covered pixel.
    pub fn covered_mask(&self) -> Vec<bool> {
        let w = self.width as usize;
        let mut mask = vec![false; w * self.height as usize];
        for r in &self.regions {
            let Some(r) = r.clipped(self.width, self.height) else { continue };
            for y in r.top..=r.bottom {
                let row = y as usize * w;
                mask[row + r.left as usize..=row + r.right as usize].fill(true);
            }
        }
        mask
    }

    /// Number of distinct selected pixels.
    pub fn pixel_count(&self) -> usize {
        self.covered_mask().iter().filter(|&&m| m).count()
    }

    /// Sum of region areas (counts overlaps twice).
    pub fn total_area(&self) -> u64 {
        self.regions.iter().map(|r| r.area()).sum()
    }

    /// Bounding box of all regions.
    pub fn bounds(&self) -> Option<SelectionRect> {
        let first = *self.regions.first()?;
        Some(self.regions.iter().skip(1).fold(first, |acc, r| SelectionRect {
            left: acc.left.min(r.left),
            top: acc.top.min(r.top),
            right: acc.right.max(r.right),
            bottom: acc.bottom.max(r.bottom),
        }))
    }
}

/// Greedy row-major decomposition of a pixel mask into disjoint rectangles.
///
/// For each unconsumed set pixel, grow right along the row, then grow down
/// while the whole current span stays set. Consumed pixels are skipped by
/// later scans, so the output covers the mask exactly with no overlaps.
pub fn decompose_mask(mask: &[bool], width: u32, height: u32) -> Vec<SelectionRect> {
    let w = width as usize;
    let h = height as usize;
    debug_assert_eq!(mask.len(), w * h);

    let mut consumed = vec![false; w * h];
    let mut rects = Vec::new();
    let free = |consumed: &[bool], i: usize| mask[i] && !consumed[i];

    for y in 0..h {
        for x in 0..w {
            if !free(&consumed, y * w + x) {
                continue;
            }

            let mut x1 = x;
            while x1 + 1 < w && free(&consumed, y * w + x1 + 1) {
                x1 += 1;
            }

            let mut y1 = y;
            while y1 + 1 < h && (x..=x1).all(|cx| free(&consumed, (y1 + 1) * w + cx)) {
                y1 += 1;
            }

            for ry in y..=y1 {
                consumed[ry * w + x..=ry * w + x1].fill(true);
            }
            rects.push(SelectionRect {
                left: x as i32,
                top: y as i32,
                right: x1 as i32,
                bottom: y1 as i32,
            });
        }
    }
    rects
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> (Vec<bool>, u32, u32) {
        let h = rows.len() as u32;
        let w = rows[0].len() as u32;
        let mask = rows.iter().flat_map(|r| r.chars().map(|c| c == '#')).collect();
        (mask, w, h)
    }

    fn assert_exact_disjoint_cover(mask: &[bool], w: u32, h: u32, rects: &[SelectionRect]) {
        let mut hits = vec![0u32; mask.len()];
        for r in rects {
            for y in r.top..=r.bottom {
                for x in r.left..=r.right {
                    hits[(y as u32 * w + x as u32) as usize] += 1;
                }
            }
        }
        for i in 0..(w * h) as usize {
            assert_eq!(hits[i], mask[i] as u32, "pixel {} covered {} times", i, hits[i]);
        }
    }

    #[test]
    fn rect_normalizes_and_measures_inclusively() {
        let r = SelectionRect::normalized(3, 4, 1, 2);
        assert_eq!(r, SelectionRect { left: 1, top: 2, right: 3, bottom: 4 });
        assert_eq!(r.width(), 3);
        assert_eq!(r.height(), 3);
        assert_eq!(r.area(), 9);
        assert_eq!(SelectionRect::normalized(5, 5, 5, 5).area(), 1);
    }

    #[test]
    fn subtract_center_leaves_four_disjoint_strips() {
        let r = SelectionRect::normalized(0, 0, 4, 4);
        let parts = r.subtract(&SelectionRect::normalized(1, 1, 2, 3));
        assert_eq!(parts.len(), 4);
        let area: u64 = parts.iter().map(|p| p.area()).sum();
        assert_eq!(area, 25 - 6);
        for (i, a) in parts.iter().enumerate() {
            for b in &parts[i + 1..] {
                assert!(!a.overlaps(b));
            }
        }
    }

    #[test]
    fn subtract_without_overlap_is_identity() {
        let r = SelectionRect::normalized(0, 0, 2, 2);
        assert_eq!(r.subtract(&SelectionRect::normalized(5, 5, 6, 6)), vec![r]);
    }

    #[test]
    fn subtract_covering_everything_leaves_nothing() {
        let r = SelectionRect::normalized(1, 1, 2, 2);
        assert!(r.subtract(&SelectionRect::normalized(0, 0, 3, 3)).is_empty());
    }

    #[test]
    fn replace_add_subtract_scenario() {
        let mut sel = Selection::new(10, 10);
        sel.start(0, 0, SelectionMode::Replace);
        sel.update(1, 1);
        sel.end(2, 2);
        sel.start(5, 5, SelectionMode::Add);
        sel.end(6, 6);
        sel.start(1, 1, SelectionMode::Subtract);
        sel.end(1, 1);

        assert_eq!(sel.total_area(), 12);
        assert_eq!(sel.pixel_count(), 12);
        assert!(!sel.is_selected(1, 1));
        assert!(sel.is_selected(0, 0));
        assert!(sel.is_selected(6, 6));
    }

    #[test]
    fn replace_drag_clears_existing_regions_at_start() {
        let mut sel = Selection::new(8, 8);
        sel.apply_rect(SelectionRect::normalized(0, 0, 3, 3), SelectionMode::Replace);
        sel.start(5, 5, SelectionMode::Replace);
        assert!(sel.regions().is_empty());
        assert!(sel.has_selection(), "live drag counts as a selection");
        sel.end(6, 6);
        assert_eq!(sel.regions(), &[SelectionRect::normalized(5, 5, 6, 6)]);
    }

    #[test]
    fn cancelled_drag_leaves_no_selection() {
        let mut sel = Selection::new(8, 8);
        sel.start(1, 1, SelectionMode::Replace);
        sel.update(4, 4);
        assert!(sel.is_dragging() && sel.has_selection());
        sel.cancel_drag();
        assert!(!sel.is_dragging());
        assert!(!sel.has_selection());

        sel.apply_rect(SelectionRect::normalized(0, 0, 1, 1), SelectionMode::Replace);
        sel.start(5, 5, SelectionMode::Add);
        sel.update(7, 7);
        sel.cancel_drag();
        assert_eq!(sel.regions(), &[SelectionRect::normalized(0, 0, 1, 1)]);
    }

    #[test]
    fn off_canvas_replace_clears_selection() {
        let mut sel = Selection::new(4, 4);
        sel.select_all();
        sel.start(10, 10, SelectionMode::Replace);
        assert!(!sel.has_selection());
        sel.end(12, 12);
        assert!(!sel.has_selection());
    }

    #[test]
    fn regions_are_clipped_to_canvas() {
        let mut sel = Selection::new(4, 4);
        sel.start(-3, -3, SelectionMode::Replace);
        sel.end(1, 1);
        assert_eq!(sel.regions(), &[SelectionRect::normalized(0, 0, 1, 1)]);
    }

    #[test]
    fn subtract_never_grows_selection() {
        let mut sel = Selection::new(12, 12);
        sel.apply_rect(SelectionRect::normalized(0, 0, 5, 5), SelectionMode::Replace);
        sel.apply_rect(SelectionRect::normalized(3, 3, 9, 9), SelectionMode::Add);
        let cut = SelectionRect::normalized(2, 4, 7, 6);
        let before = sel.pixel_count();
        sel.apply_rect(cut, SelectionMode::Subtract);
        assert!(sel.pixel_count() <= before);
        for y in cut.top..=cut.bottom {
            for x in cut.left..=cut.right {
                assert!(!sel.is_selected(x, y));
            }
        }
    }

    #[test]
    fn decompose_covers_irregular_mask_exactly() {
        let (mask, w, h) = mask_from_rows(&[
            "##..#",
            "###.#",
            ".####",
            "....#",
            "#.#.#",
        ]);
        let rects = decompose_mask(&mask, w, h);
        assert_exact_disjoint_cover(&mask, w, h, &rects);
    }

    #[test]
    fn decompose_solid_block_is_one_rect() {
        let mask = vec![true; 12];
        assert_eq!(decompose_mask(&mask, 4, 3), vec![SelectionRect::normalized(0, 0, 3, 2)]);
    }

    #[test]
    fn decompose_empty_mask_is_empty() {
        assert!(decompose_mask(&[false; 9], 3, 3).is_empty());
    }

    #[test]
    fn decompose_checkerboard() {
        let (mask, w, h) = mask_from_rows(&["#.#.", ".#.#", "#.#.", ".#.#"]);
        let rects = decompose_mask(&mask, w, h);
        assert_eq!(rects.len(), 8);
        assert_exact_disjoint_cover(&mask, w, h, &rects);
    }

    #[test]
    fn mask_subtract_is_pixel_exact() {
        let mut sel = Selection::new(4, 4);
        sel.select_all();
        let (mask, _, _) = mask_from_rows(&["#...", ".#..", "..#.", "...#"]);
        sel.apply_mask(&mask, SelectionMode::Subtract);
        assert_eq!(sel.pixel_count(), 12);
        for i in 0..4 {
            assert!(!sel.is_selected(i, i));
        }
    }

    #[test]
    fn mode_from_modifiers() {
        assert_eq!(SelectionMode::from_modifiers(false, false), SelectionMode::Replace);
        assert_eq!(SelectionMode::from_modifiers(true, false), SelectionMode::Add);
        assert_eq!(SelectionMode::from_modifiers(false, true), SelectionMode::Subtract);
    }

    #[test]
    fn bounds_spans_all_regions() {
        let mut sel = Selection::new(10, 10);
        sel.apply_rect(SelectionRect::normalized(1, 2, 3, 3), SelectionMode::Replace);
        sel.apply_rect(SelectionRect::normalized(6, 0, 7, 8), SelectionMode::Add);
        assert_eq!(sel.bounds(), Some(SelectionRect::normalized(1, 0, 7, 8)));
    }
}
