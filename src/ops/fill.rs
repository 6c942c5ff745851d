// ============================================================================
// REGION GROWING — flood fill, similar-erase, similar-replace, magic wand
// ============================================================================
//
// Every routine here is 4-connected and walks an explicit stack, so a fill of
// the whole canvas costs heap memory instead of call-stack depth. Seeds outside
// the buffer are no-ops (or an empty result for the wand).

use std::collections::HashSet;

use crate::canvas::PixelBuffer;
use crate::ops::color::{Color, TRANSPARENT, is_similar};

/// Push the four N/S/E/W neighbours of `(x, y)`.
#[inline]
fn push_neighbours(stack: &mut Vec<(i32, i32)>, x: i32, y: i32) {
    stack.push((x + 1, y));
    stack.push((x - 1, y));
    stack.push((x, y + 1));
    stack.push((x, y - 1));
}

/// Exact-match flood fill from `(x, y)`. Returns the number of pixels written.
pub fn flood_fill(buf: &mut PixelBuffer, x: i32, y: i32, fill: Color) -> usize {
    let Some(target) = buf.get(x, y) else { return 0 };
    if target == fill {
        return 0;
    }

    let mut written = 0;
    let mut stack = vec![(x, y)];
    while let Some((cx, cy)) = stack.pop() {
        match buf.get(cx, cy) {
            Some(c) if c == target => {}
            _ => continue,
        }
        buf.set(cx, cy, fill);
        written += 1;
        push_neighbours(&mut stack, cx, cy);
    }
    written
}

/// Replace the connected region similar to the seed colour with `TRANSPARENT`.
///
/// Pixels that are already fully transparent are never matched, so a large
/// tolerance cannot make the walk revisit erased pixels.
pub fn erase_similar(buf: &mut PixelBuffer, x: i32, y: i32, tolerance: u32) -> usize {
    let Some(target) = buf.get(x, y) else { return 0 };

    let mut written = 0;
    let mut stack = vec![(x, y)];
    while let Some((cx, cy)) = stack.pop() {
        let Some(c) = buf.get(cx, cy) else { continue };
        if c[3] == 0 || !is_similar(c, target, tolerance) {
            continue;
        }
        buf.set(cx, cy, TRANSPARENT);
        written += 1;
        push_neighbours(&mut stack, cx, cy);
    }
    written
}

/// Replace the connected region similar to the seed colour with `replacement`.
pub fn replace_similar(
    buf: &mut PixelBuffer,
    x: i32,
    y: i32,
    replacement: Color,
    tolerance: u32,
) -> usize {
    let Some(target) = buf.get(x, y) else { return 0 };

    let mut written = 0;
    let mut stack = vec![(x, y)];
    while let Some((cx, cy)) = stack.pop() {
        let Some(c) = buf.get(cx, cy) else { continue };
        if c == replacement || !is_similar(c, target, tolerance) {
            continue;
        }
        buf.set(cx, cy, replacement);
        written += 1;
        push_neighbours(&mut stack, cx, cy);
    }
    written
}

/// Connected pixels similar to the seed colour. Read-only.
pub fn magic_wand(buf: &PixelBuffer, x: i32, y: i32, tolerance: u32) -> HashSet<(u32, u32)> {
    let mut selected = HashSet::new();
    let Some(target) = buf.get(x, y) else { return selected };

    let mut stack = vec![(x, y)];
    while let Some((cx, cy)) = stack.pop() {
        let Some(c) = buf.get(cx, cy) else { continue };
        // in bounds, so the casts are lossless
        let key = (cx as u32, cy as u32);
        if selected.contains(&key) || !is_similar(c, target, tolerance) {
            continue;
        }
        selected.insert(key);
        push_neighbours(&mut stack, cx, cy);
    }
    selected
}

/// Row-major boolean mask of a point set on a `width × height` grid.
pub fn points_to_mask(points: &HashSet<(u32, u32)>, width: u32, height: u32) -> Vec<bool> {
    let w = width as usize;
    let mut mask = vec![false; w * height as usize];
    for &(x, y) in points {
        if x < width && y < height {
            mask[y as usize * w + x as usize] = true;
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::color::{rgb, rgba};

    const A: Color = rgb(10, 10, 10);
    const B: Color = rgb(200, 200, 200);
    const C: Color = rgb(255, 0, 0);

    /// 5×5 with a one-pixel `A` frame around a `B` interior.
    fn framed() -> PixelBuffer {
        let mut buf = PixelBuffer::new(5, 5);
        buf.fill(A);
        for y in 1..4 {
            for x in 1..4 {
                buf.set(x, y, B);
            }
        }
        buf
    }

    #[test]
    fn flood_fill_stays_inside_frame() {
        let mut buf = framed();
        assert_eq!(flood_fill(&mut buf, 2, 2, C), 9);
        for y in 0..5 {
            for x in 0..5 {
                let inside = (1..4).contains(&x) && (1..4).contains(&y);
                assert_eq!(buf.get(x, y), Some(if inside { C } else { A }), "({x},{y})");
            }
        }
    }

    #[test]
    fn flood_fill_twice_is_noop() {
        let mut buf = framed();
        flood_fill(&mut buf, 2, 2, C);
        let before = buf.clone();
        assert_eq!(flood_fill(&mut buf, 2, 2, C), 0);
        assert_eq!(buf, before);
    }

    #[test]
    fn flood_fill_out_of_bounds_seed_is_noop() {
        let mut buf = framed();
        let before = buf.clone();
        assert_eq!(flood_fill(&mut buf, -1, 2, C), 0);
        assert_eq!(flood_fill(&mut buf, 2, 5, C), 0);
        assert_eq!(buf, before);
    }

    #[test]
    fn flood_fill_is_four_connected() {
        let mut buf = PixelBuffer::new(3, 3);
        // diagonal wall of A; corners on either side must not connect
        buf.set(1, 0, A);
        buf.set(0, 1, A);
        flood_fill(&mut buf, 0, 0, C);
        assert_eq!(buf.get(0, 0), Some(C));
        assert_eq!(buf.get(1, 1), Some(TRANSPARENT));
    }

    #[test]
    fn erase_similar_respects_tolerance() {
        let mut buf = PixelBuffer::new(3, 1);
        buf.set(0, 0, rgb(100, 100, 100));
        buf.set(1, 0, rgb(102, 100, 100));
        buf.set(2, 0, rgb(120, 100, 100));
        assert_eq!(erase_similar(&mut buf, 0, 0, 5), 2);
        assert_eq!(buf.get(1, 0), Some(TRANSPARENT));
        assert_eq!(buf.get(2, 0), Some(rgb(120, 100, 100)));
    }

    #[test]
    fn erase_similar_skips_transparent_pixels() {
        let mut buf = PixelBuffer::new(4, 4);
        // huge tolerance would otherwise match everything forever
        assert_eq!(erase_similar(&mut buf, 1, 1, 2000), 0);
    }

    #[test]
    fn replace_similar_writes_replacement_and_terminates() {
        let mut buf = PixelBuffer::new(4, 4);
        buf.fill(rgb(50, 50, 50));
        buf.set(3, 3, rgb(52, 50, 50));
        let n = replace_similar(&mut buf, 0, 0, rgb(51, 50, 50), 10);
        assert_eq!(n, 16);
        assert!(buf.as_image().pixels().all(|p| *p == rgb(51, 50, 50)));
    }

    #[test]
    fn magic_wand_collects_connected_similar_pixels() {
        let buf = framed();
        let pts = magic_wand(&buf, 2, 2, 0);
        assert_eq!(pts.len(), 9);
        assert!(pts.contains(&(1, 1)));
        assert!(!pts.contains(&(0, 0)));
        assert_eq!(magic_wand(&buf, 2, 2, 0), pts);
        assert!(magic_wand(&buf, 9, 9, 0).is_empty());
    }

    #[test]
    fn magic_wand_tolerance_includes_alpha_channel() {
        let mut buf = PixelBuffer::new(2, 1);
        buf.set(0, 0, rgba(0, 0, 0, 255));
        buf.set(1, 0, rgba(0, 0, 0, 250));
        assert_eq!(magic_wand(&buf, 0, 0, 4).len(), 1);
        assert_eq!(magic_wand(&buf, 0, 0, 5).len(), 2);
    }

    #[test]
    fn points_to_mask_ignores_out_of_range() {
        let pts: HashSet<_> = [(0, 0), (1, 1), (7, 7)].into_iter().collect();
        let mask = points_to_mask(&pts, 2, 2);
        assert_eq!(mask, vec![true, false, false, true]);
    }
}
