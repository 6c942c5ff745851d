// ============================================================================
// LINE RASTERIZATION — Bresenham (exact) and Wu (antialiased)
// ============================================================================

use std::collections::BTreeMap;

use crate::canvas::PixelBuffer;
use crate::ops::color::{Color, with_alpha_times};

/// Walk the Bresenham path from `(x0, y0)` to `(x1, y1)`, both ends included.
/// Error terms are `i64` so any pair of `i32` endpoints is safe.
fn bresenham_walk(x0: i64, y0: i64, x1: i64, y1: i64, mut plot: impl FnMut(i64, i64)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let (mut x, mut y) = (x0, y0);
    loop {
        plot(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Integer Bresenham walk from `(x0, y0)` to `(x1, y1)`, both endpoints
/// included. Unclipped: the result holds every pixel of the segment.
pub fn bresenham_points(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
    let mut points = Vec::new();
    bresenham_walk(x0 as i64, y0 as i64, x1 as i64, y1 as i64, |x, y| {
        points.push((x as i32, y as i32));
    });
    points
}

/// Liang–Barsky clip of a segment to `[min_x, max_x] × [min_y, max_y]`.
/// Returns the surviving part, or `None` when the segment misses the box.
/// An endpoint already inside the box comes back unchanged.
pub fn clip_segment(
    (x0, y0): (f64, f64),
    (x1, y1): (f64, f64),
    (min_x, min_y): (f64, f64),
    (max_x, max_y): (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;

    for (p, q) in [(-dx, x0 - min_x), (dx, max_x - x0), (-dy, y0 - min_y), (dy, max_y - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let start = if t0 > 0.0 { (x0 + t0 * dx, y0 + t0 * dy) } else { (x0, y0) };
    let end = if t1 < 1.0 { (x0 + t1 * dx, y0 + t1 * dy) } else { (x1, y1) };
    Some((start, end))
}

/// Clip to the buffer grown by `margin` pixels on every side.
fn clip_to_buffer(
    buf: &PixelBuffer,
    margin: f64,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
) -> Option<((f64, f64), (f64, f64))> {
    clip_segment(
        (x0 as f64, y0 as f64),
        (x1 as f64, y1 as f64),
        (-margin, -margin),
        (buf.width() as f64 - 1.0 + margin, buf.height() as f64 - 1.0 + margin),
    )
}

/// Exact line: every Bresenham pixel is overwritten with `color`.
///
/// The segment is clipped to a one-pixel ring around the buffer first, so
/// endpoints far off canvas cost nothing. Lines with both ends inside that
/// ring are walked unchanged.
pub fn draw_line(buf: &mut PixelBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
    let Some(((ax, ay), (bx, by))) = clip_to_buffer(buf, 1.0, x0, y0, x1, y1) else {
        return;
    };
    let (ax, ay, bx, by) = (ax.round() as i64, ay.round() as i64, bx.round() as i64, by.round() as i64);
    bresenham_walk(ax, ay, bx, by, |x, y| {
        buf.set(x as i32, y as i32, color);
    });
}

#[inline]
fn fpart(v: f64) -> f64 {
    v - v.floor()
}

#[inline]
fn rfpart(v: f64) -> f64 {
    1.0 - fpart(v)
}

/// Wu's antialiased line as per-pixel coverage in `0.0..=1.0`.
///
/// Unclipped; `draw_line_aa` clips before calling this. Pixel centres sit
/// on integer coordinates. Each sample column (or row, for
/// steep lines) touches two pixels; the endpoints get partial coverage from
/// their fractional position. A pixel hit twice keeps its larger coverage.
pub fn wu_coverage(x0: f64, y0: f64, x1: f64, y1: f64) -> BTreeMap<(i32, i32), f64> {
    let mut cov: BTreeMap<(i32, i32), f64> = BTreeMap::new();

    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    let (mut x0, mut y0, mut x1, mut y1) = if steep { (y0, x0, y1, x1) } else { (x0, y0, x1, y1) };
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    let mut plot = |a: i32, b: i32, c: f64| {
        if c <= 0.0 {
            return;
        }
        let key = if steep { (b, a) } else { (a, b) };
        let slot = cov.entry(key).or_insert(0.0);
        if c > *slot {
            *slot = c.min(1.0);
        }
    };

    let dx = x1 - x0;
    let dy = y1 - y0;
    let gradient = if dx == 0.0 { 1.0 } else { dy / dx };

    // first endpoint
    let xend = x0.round();
    let yend = y0 + gradient * (xend - x0);
    let xgap = rfpart(x0 + 0.5);
    let xpxl1 = xend as i32;
    let ypxl1 = yend.floor() as i32;
    plot(xpxl1, ypxl1, rfpart(yend) * xgap);
    plot(xpxl1, ypxl1.saturating_add(1), fpart(yend) * xgap);
    let mut intery = yend + gradient;

    // second endpoint
    let xend = x1.round();
    let yend = y1 + gradient * (xend - x1);
    let xgap = fpart(x1 + 0.5);
    let xpxl2 = xend as i32;
    let ypxl2 = yend.floor() as i32;
    plot(xpxl2, ypxl2, rfpart(yend) * xgap);
    plot(xpxl2, ypxl2.saturating_add(1), fpart(yend) * xgap);

    for x in xpxl1.saturating_add(1)..xpxl2 {
        let y = intery.floor() as i32;
        plot(x, y, rfpart(intery));
        plot(x, y.saturating_add(1), fpart(intery));
        intery += gradient;
    }

    cov
}

/// Antialiased line composited with `Over`. Each touched pixel is blended
/// once at its maximum coverage, so endpoint caps and the main loop never
/// stack opacity on the same pixel.
///
/// The segment is clipped to a two-pixel ring around the buffer; cut ends
/// keep their fractional position, so the partial end caps land off canvas.
pub fn draw_line_aa(buf: &mut PixelBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
    let Some(((ax, ay), (bx, by))) = clip_to_buffer(buf, 2.0, x0, y0, x1, y1) else {
        return;
    };
    let cov = wu_coverage(ax, ay, bx, by);
    for ((x, y), c) in cov {
        buf.blend(x, y, with_alpha_times(color, c));
    }
}
