use crate::ops::color::{Color, rgb, rgba};

// ============================================================================
// Palette — swatch list with the default pixel-art colours
// ============================================================================

/// Transparent, greys, the classic CGA/EGA basics and their dark halves,
/// then a few warm extras.
pub const DEFAULT_PALETTE: [Color; 21] = [
    rgba(0, 0, 0, 0),
    rgb(0, 0, 0),
    rgb(255, 255, 255),
    rgb(128, 128, 128),
    rgb(192, 192, 192),
    rgb(255, 0, 0),
    rgb(0, 255, 0),
    rgb(0, 0, 255),
    rgb(255, 255, 0),
    rgb(255, 0, 255),
    rgb(0, 255, 255),
    rgb(128, 0, 0),
    rgb(0, 128, 0),
    rgb(0, 0, 128),
    rgb(128, 128, 0),
    rgb(128, 0, 128),
    rgb(0, 128, 128),
    rgb(140, 80, 60),
    rgb(255, 128, 0),
    rgb(255, 192, 203),
    rgb(173, 216, 230),
];

#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Default for Palette {
    fn default() -> Self {
        let mut p = Self { colors: Vec::with_capacity(DEFAULT_PALETTE.len()) };
        p.reset_to_default();
        p
    }
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self { colors: Vec::new() }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    pub fn contains(&self, color: Color) -> bool {
        self.colors.contains(&color)
    }

    /// Append `color` unless an identical swatch already exists.
    /// Returns whether it was added.
    pub fn add(&mut self, color: Color) -> bool {
        if self.contains(color) {
            return false;
        }
        self.colors.push(color);
        true
    }

    /// Remove the first swatch equal to `color`.
    pub fn remove(&mut self, color: Color) -> bool {
        match self.colors.iter().position(|c| *c == color) {
            Some(i) => {
                self.colors.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.colors.clear();
    }

    pub fn reset_to_default(&mut self) {
        self.colors.clear();
        for c in DEFAULT_PALETTE {
            self.add(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_has_21_unique_swatches() {
        let p = Palette::new();
        assert_eq!(p.len(), 21);
        assert_eq!(p.get(0), Some(rgba(0, 0, 0, 0)));
        assert_eq!(p.get(1), Some(rgb(0, 0, 0)));
        assert_eq!(p.get(20), Some(rgb(173, 216, 230)));
        assert_eq!(p.get(21), None);
    }

    #[test]
    fn add_skips_duplicates_and_remove_works() {
        let mut p = Palette::new();
        assert!(!p.add(rgb(255, 0, 0)));
        assert!(p.add(rgb(1, 2, 3)));
        assert_eq!(p.len(), 22);
        assert!(p.remove(rgb(1, 2, 3)));
        assert!(!p.remove(rgb(1, 2, 3)));
        p.clear();
        assert!(p.is_empty());
        p.reset_to_default();
        assert_eq!(p, Palette::default());
    }
}
