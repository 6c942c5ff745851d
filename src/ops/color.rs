// ============================================================================
// COLOR MATH — straight-alpha compositing and similarity tests
// ============================================================================

use image::Rgba;

/// Straight-alpha RGBA pixel, 8 bits per channel.
pub type Color = Rgba<u8>;

/// The empty pixel. Stored as transparent *white* so that later blends
/// against it never pull dark fringes into the result.
pub const TRANSPARENT: Color = Rgba([255, 255, 255, 0]);

pub const BLACK: Color = Rgba([0, 0, 0, 255]);
pub const WHITE: Color = Rgba([255, 255, 255, 255]);

/// Build an opaque color.
#[inline]
pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Rgba([r, g, b, 255])
}

/// Build a color with explicit alpha.
#[inline]
pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
    Rgba([r, g, b, a])
}

/// Source-over compositing of `top` onto `bottom` (straight alpha).
///
/// `out_a = top_a + bottom_a * (1 - top_a)` and each channel is the
/// alpha-weighted mix divided by `out_a`, rounded to the nearest byte.
pub fn over(top: Color, bottom: Color) -> Color {
    if top[3] == 0 {
        return bottom;
    }
    if bottom[3] == 0 {
        return top;
    }

    let ta = top[3] as f64 / 255.0;
    let ba = bottom[3] as f64 / 255.0;
    let out_a = ta + ba * (1.0 - ta);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }

    let channel = |i: usize| -> u8 {
        let c = (top[i] as f64 * ta + bottom[i] as f64 * ba * (1.0 - ta)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Scale the alpha channel by `factor` (clamped to 0..=1), keeping RGB.
pub fn with_alpha_times(color: Color, factor: f64) -> Color {
    let factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
    let a = (color[3] as f64 * factor).round().clamp(0.0, 255.0) as u8;
    Rgba([color[0], color[1], color[2], a])
}

/// Replace the alpha channel.
#[inline]
pub fn with_alpha(color: Color, alpha: u8) -> Color {
    Rgba([color[0], color[1], color[2], alpha])
}

/// Clamp the alpha channel to at most `cap` (used for preview strokes).
#[inline]
pub fn with_alpha_capped(color: Color, cap: u8) -> Color {
    with_alpha(color, color[3].min(cap))
}

/// Manhattan distance over all four channels.
#[inline]
pub fn color_distance(a: Color, b: Color) -> u32 {
    (0..4).map(|i| (a[i] as i32 - b[i] as i32).unsigned_abs()).sum()
}

/// `true` when the Manhattan distance between `a` and `b` is within `tolerance`.
#[inline]
pub fn is_similar(a: Color, b: Color, tolerance: u32) -> bool {
    color_distance(a, b) <= tolerance
}

/// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
pub fn parse_hex(s: &str) -> Option<Color> {
    let hex = s.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

/// Format as `#RRGGBBAA`.
pub fn to_hex(c: Color) -> String {
    format!("#{:02X}{:02X}{:02X}{:02X}", c[0], c[1], c[2], c[3])
}

/// Convert a straight-alpha pixel to premultiplied BGRA bytes.
#[inline]
pub fn to_premultiplied_bgra(c: Color) -> [u8; 4] {
    let a = c[3] as u32;
    let pm = |v: u8| ((v as u32 * a + 127) / 255) as u8;
    [pm(c[2]), pm(c[1]), pm(c[0]), c[3]]
}
