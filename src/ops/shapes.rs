// ============================================================================
// SHAPE RASTERIZATION — rectangles and ellipses inside an inclusive box
// ============================================================================

use std::collections::{BTreeMap, BTreeSet};

use crate::canvas::PixelBuffer;
use crate::ops::color::{Color, with_alpha_times};

/// Normalise two corners into `(left, top, right, bottom)`.
#[inline]
pub fn normalize_box(x1: i32, y1: i32, x2: i32, y2: i32) -> (i32, i32, i32, i32) {
    (x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
}

/// Axis-aligned rectangle. Fill first, then the four edges on top so the
/// border is never hidden by the fill. All writes overwrite.
#[allow(clippy::too_many_arguments)]
pub fn draw_rectangle(
    buf: &mut PixelBuffer,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    border: Color,
    fill: Color,
    draw_border: bool,
    draw_fill: bool,
) {
    let (left, top, right, bottom) = normalize_box(x1, y1, x2, y2);
    let w = buf.width() as i32;
    let h = buf.height() as i32;

    // Clamp loop ranges to the canvas; huge off-canvas boxes stay cheap.
    let cx0 = left.max(0);
    let cx1 = right.min(w - 1);
    let cy0 = top.max(0);
    let cy1 = bottom.min(h - 1);
    if cx0 > cx1 || cy0 > cy1 {
        return;
    }

    if draw_fill {
        for y in cy0..=cy1 {
            for x in cx0..=cx1 {
                buf.set(x, y, fill);
            }
        }
    }

    if draw_border {
        for x in cx0..=cx1 {
            buf.set(x, top, border);
            buf.set(x, bottom, border);
        }
        for y in cy0..=cy1 {
            buf.set(left, y, border);
            buf.set(right, y, border);
        }
    }
}

/// Integer midpoint walk over the four quadrants of the ellipse inscribed in
/// the inclusive box `(l, t, r, b)`. Flat ellipses (width or height of one
/// step) get their tips finished by the trailing loop. Error terms are
/// `i128`; the cost is proportional to the box's width plus height.
fn midpoint_walk(l: i64, t: i64, r: i64, b: i64, mut put: impl FnMut(i64, i64)) {
    let (mut x0, mut x1) = (l as i128, r as i128);
    let (mut y0, mut y1) = (t as i128, b as i128);
    let mut a = x1 - x0;
    let b = y1 - y0;
    let mut b1 = b & 1;

    let mut dx = 4 * (1 - a) * b * b;
    let mut dy = 4 * (b1 + 1) * a * a;
    let mut err = dx + dy + b1 * a * a;

    y0 += (b + 1) / 2;
    y1 = y0 - b1;
    a *= 8 * a;
    b1 = 8 * b * b;

    let mut plot = |x: i128, y: i128| put(x as i64, y as i64);

    loop {
        plot(x1, y0);
        plot(x0, y0);
        plot(x0, y1);
        plot(x1, y1);
        let e2 = 2 * err;
        if e2 <= dy {
            y0 += 1;
            y1 -= 1;
            dy += a;
            err += dy;
        }
        if e2 >= dx || 2 * err > dy {
            x0 += 1;
            x1 -= 1;
            dx += b1;
            err += dx;
        }
        if x0 > x1 {
            break;
        }
    }

    while y0 - y1 <= b {
        plot(x0 - 1, y0);
        plot(x1 + 1, y0);
        y0 += 1;
        plot(x0 - 1, y1);
        plot(x1 + 1, y1);
        y1 -= 1;
    }
}

/// Border pixels of the ellipse inscribed in the inclusive box, unclipped.
pub fn ellipse_border_points(x1: i32, y1: i32, x2: i32, y2: i32) -> BTreeSet<(i32, i32)> {
    let (l, t, r, b) = normalize_box(x1, y1, x2, y2);
    let mut pts = BTreeSet::new();
    midpoint_walk(l as i64, t as i64, r as i64, b as i64, |x, y| {
        pts.insert((x as i32, y as i32));
    });
    pts
}

/// Boxes with a side longer than this are scanned row by row over the
/// visible rows instead of walked end to end.
const WALK_LIMIT: i64 = 1 << 14;

/// The part of an ellipse that lands on a `width × height` buffer.
#[derive(Debug, Default)]
struct EllipseRows {
    /// On-canvas border pixels.
    border: BTreeSet<(i32, i32)>,
    /// Per visible row, the outermost border x on each side, clamped to
    /// `-1..=width`.
    spans: BTreeMap<i32, (i32, i32)>,
}

impl EllipseRows {
    fn add_run(&mut self, y: i64, from: i64, to: i64, width: i64) {
        for x in from.max(0)..=to.min(width - 1) {
            self.border.insert((x as i32, y as i32));
        }
    }
}

fn ellipse_rows(l: i32, t: i32, r: i32, b: i32, width: u32, height: u32) -> EllipseRows {
    let mut rows = EllipseRows::default();
    let (w, h) = (width as i64, height as i64);
    let (l, t, r, b) = (l as i64, t as i64, r as i64, b as i64);
    if r < 0 || l >= w || b < 0 || t >= h {
        return rows;
    }

    if r - l <= WALK_LIMIT && b - t <= WALK_LIMIT {
        let mut raw: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
        midpoint_walk(l, t, r, b, |x, y| {
            if y < 0 || y >= h {
                return;
            }
            let span = raw.entry(y).or_insert((x, x));
            span.0 = span.0.min(x);
            span.1 = span.1.max(x);
            if x >= 0 && x < w {
                rows.border.insert((x as i32, y as i32));
            }
        });
        for (y, (lo, hi)) in raw {
            rows.spans.insert(y as i32, (lo.clamp(-1, w) as i32, hi.clamp(-1, w) as i32));
        }
        return rows;
    }

    // Row scan: each row's extent from the implicit equation, with the
    // border run reaching toward the narrower neighbour row so the outline
    // stays connected.
    let cx = (l + r) as f64 / 2.0;
    let cy = (t + b) as f64 / 2.0;
    let rx = (r - l) as f64 / 2.0;
    let ry = (b - t) as f64 / 2.0;
    let extent = |y: i64| -> (i64, i64) {
        let ny = if ry > 0.0 { (y as f64 - cy) / ry } else { 0.0 };
        let half = rx * (1.0 - ny * ny).max(0.0).sqrt();
        (((cx - half).round() as i64).max(l), ((cx + half).round() as i64).min(r))
    };

    for y in t.max(0)..=b.min(h - 1) {
        let (xl, xr) = extent(y);
        if y == t || y == b {
            rows.add_run(y, xl, xr, w);
        } else {
            let (ul, ur) = extent(y - 1);
            let (dl, dr) = extent(y + 1);
            rows.add_run(y, xl, xl.max(ul.max(dl) - 1), w);
            rows.add_run(y, xr.min(ur.min(dr) + 1), xr, w);
        }
        rows.spans.insert(y as i32, (xl.clamp(-1, w) as i32, xr.clamp(-1, w) as i32));
    }
    rows
}

/// Midpoint ellipse with scanline fill.
///
/// Per row, every pixel strictly between the leftmost and rightmost border
/// pixel that is not itself a border pixel is overwritten with `fill`. Border
/// pixels are composited with `Over`. With the border disabled the fill covers
/// the border pixels too, so the footprint is identical in every mode.
/// A box with zero width or height draws nothing; only rows on the buffer
/// are rasterized.
#[allow(clippy::too_many_arguments)]
pub fn draw_ellipse(
    buf: &mut PixelBuffer,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    border: Color,
    fill: Color,
    draw_border: bool,
    draw_fill: bool,
) {
    if x1 == x2 || y1 == y2 {
        return;
    }
    let (l, t, r, b) = normalize_box(x1, y1, x2, y2);
    let rows = ellipse_rows(l, t, r, b, buf.width(), buf.height());

    if draw_fill {
        let w = buf.width() as i32;
        for (&y, &(min_x, max_x)) in &rows.spans {
            for x in (min_x + 1).max(0)..max_x.min(w) {
                if !rows.border.contains(&(x, y)) {
                    buf.set(x, y, fill);
                }
            }
        }
        if !draw_border {
            for &(x, y) in &rows.border {
                buf.set(x, y, fill);
            }
        }
    }

    if draw_border {
        for &(x, y) in &rows.border {
            buf.blend(x, y, border);
        }
    }
}

// ============================================================================
// Antialiased ellipse — signed-distance coverage
// ============================================================================

/// Approximate signed distance to an axis-aligned ellipse centred at the
/// origin (negative = inside).
fn sdf_ellipse(px: f64, py: f64, rx: f64, ry: f64) -> f64 {
    let nx = px / rx;
    let ny = py / ry;
    let len = (nx * nx + ny * ny).sqrt();
    if len < 1e-12 {
        return -rx.min(ry);
    }
    let scale = (rx * rx * ny * ny + ry * ry * nx * nx).sqrt() / (rx * ry * len);
    (len - 1.0) / scale
}

fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Antialiased ellipse: an oval through the pixel centres of the box, filled
/// then stroked with a one-pixel pen, both composited with `Over`. Only the
/// part of the box on the buffer is visited.
#[allow(clippy::too_many_arguments)]
pub fn draw_ellipse_aa(
    buf: &mut PixelBuffer,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    border: Color,
    fill: Color,
    draw_border: bool,
    draw_fill: bool,
) {
    if x1 == x2 || y1 == y2 {
        return;
    }
    let (l, t, r, b) = normalize_box(x1, y1, x2, y2);
    let (l, t, r, b) = (l as i64, t as i64, r as i64, b as i64);
    let cx = (l + r) as f64 * 0.5 + 0.5;
    let cy = (t + b) as f64 * 0.5 + 0.5;
    let rx = (r - l) as f64 * 0.5;
    let ry = (b - t) as f64 * 0.5;

    // One pixel of padding for the stroke's outer half and the AA ramp.
    let x_start = (l - 1).max(0);
    let y_start = (t - 1).max(0);
    let x_end = (r + 1).min(buf.width() as i64 - 1);
    let y_end = (b + 1).min(buf.height() as i64 - 1);

    for y in y_start..=y_end {
        let py = y as f64 + 0.5 - cy;
        for x in x_start..=x_end {
            let px = x as f64 + 0.5 - cx;
            let d = sdf_ellipse(px, py, rx, ry);
            let (xi, yi) = (x as i32, y as i32);

            if draw_fill {
                let cov = smoothstep(0.5, -0.5, d);
                if cov > 0.0 {
                    buf.blend(xi, yi, with_alpha_times(fill, cov));
                }
            }
            if draw_border {
                let cov = smoothstep(0.5, -0.5, d.abs() - 0.5);
                if cov > 0.0 {
                    buf.blend(xi, yi, with_alpha_times(border, cov));
                }
            }
        }
    }
}
