//! Cyclic allocation of distinguishable item colors.

use std::collections::VecDeque;

use celexta_core::logging::targets;

use crate::items::Color;

/// Colors handed out to new items, in order.
pub const DEFAULT_PALETTE: [Color; 17] = [
    Color::rgb(0x4a, 0x9e, 0xbc), // light blue
    Color::rgb(0xec, 0xca, 0x54), // yellow
    Color::rgb(0xc7, 0x2a, 0x70), // pink
    Color::rgb(0xc9, 0x5d, 0x38), // orange
    Color::rgb(0x92, 0xd7, 0x54), // green
    Color::rgb(0x82, 0x18, 0xbb), // purple
    Color::rgb(0x66, 0xcb, 0xa0), // teal
    Color::rgb(0xb5, 0x2e, 0xb0), // fuchsia
    Color::rgb(0x2d, 0x67, 0xee), // blue
    Color::rgb(0x7e, 0x38, 0x17), // sangria
    Color::rgb(0xc0, 0xc0, 0xc0), // silver
    Color::rgb(0x80, 0x80, 0x00), // olive
    Color::rgb(0x49, 0x41, 0x3f), // charcoal
    Color::rgb(0xf9, 0xb7, 0xff), // blossom pink
    Color::rgb(0xff, 0xdf, 0x00), // golden yellow
    Color::rgb(0x64, 0xe9, 0x86), // algae
    Color::rgb(0x16, 0xe2, 0xf5), // turquoise
];

/// A finite palette handed out one color at a time.
///
/// Every palette color is either available or allocated, never both.
/// Allocation takes the first available color; once none is left the cycle
/// restarts from the top of the palette with a warning. Released colors go
/// to the back of the queue.
#[derive(Debug, Clone)]
pub struct ColorPool {
    palette: Vec<Color>,
    available: VecDeque<Color>,
    allocated: Vec<Color>,
}

impl Default for ColorPool {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.to_vec())
    }
}

impl ColorPool {
    /// Creates a pool over `palette`. Duplicates are dropped; an empty
    /// palette falls back to [`DEFAULT_PALETTE`].
    pub fn new(palette: Vec<Color>) -> Self {
        let mut unique: Vec<Color> = Vec::with_capacity(palette.len());
        for color in palette {
            if !unique.contains(&color) {
                unique.push(color);
            }
        }
        if unique.is_empty() {
            tracing::warn!(target: targets::COLORS, "empty palette, using the default one");
            unique = DEFAULT_PALETTE.to_vec();
        }
        Self {
            available: unique.iter().copied().collect(),
            palette: unique,
            allocated: Vec::new(),
        }
    }

    /// Allocates the next color.
    pub fn next_color(&mut self) -> Color {
        if self.available.is_empty() {
            tracing::warn!(
                target: targets::COLORS,
                palette_size = self.palette.len(),
                "exhausted all colors, restarting the cycle"
            );
            self.reset();
        }
        // The palette is never empty, so neither is the queue after a reset.
        let color = self.available.pop_front().unwrap_or(self.palette[0]);
        self.allocated.push(color);
        tracing::debug!(target: targets::COLORS, %color, unused = self.available.len(), "allocated color");
        color
    }

    /// Returns `color` to the pool. Colors that are not currently allocated
    /// are ignored. Returns true if the color became available.
    pub fn release(&mut self, color: Color) -> bool {
        let Some(position) = self.allocated.iter().position(|c| *c == color) else {
            tracing::debug!(target: targets::COLORS, %color, "color not allocated, ignoring release");
            return false;
        };
        self.allocated.swap_remove(position);
        self.available.push_back(color);
        tracing::debug!(target: targets::COLORS, %color, unused = self.available.len(), "released color");
        true
    }

    /// Marks `color` as in use without going through [`next_color`](Self::next_color),
    /// e.g. for items loaded with their own color. Returns true if the
    /// color was available.
    pub fn claim(&mut self, color: Color) -> bool {
        let Some(position) = self.available.iter().position(|c| *c == color) else {
            return false;
        };
        self.available.remove(position);
        self.allocated.push(color);
        true
    }

    /// Makes every palette color available again.
    pub fn reset(&mut self) {
        self.available = self.palette.iter().copied().collect();
        self.allocated.clear();
    }

    /// Colors not allocated, in allocation order.
    pub fn available(&self) -> Vec<Color> {
        self.available.iter().copied().collect()
    }

    /// Colors currently allocated.
    pub fn allocated(&self) -> &[Color] {
        &self.allocated
    }

    /// The full palette.
    pub fn palette(&self) -> &[Color] {
        &self.palette
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_follows_palette_order() {
        let mut pool = ColorPool::default();
        assert_eq!(pool.next_color(), DEFAULT_PALETTE[0]);
        assert_eq!(pool.next_color(), DEFAULT_PALETTE[1]);
        assert_eq!(pool.allocated(), &DEFAULT_PALETTE[..2]);
        assert_eq!(pool.available().len(), 15);
    }

    #[test]
    fn test_exhaustion_wraps_to_first_color() {
        let mut pool = ColorPool::default();
        for expected in DEFAULT_PALETTE {
            assert_eq!(pool.next_color(), expected);
        }
        assert!(pool.available().is_empty());
        assert_eq!(pool.next_color(), DEFAULT_PALETTE[0]);
        assert_eq!(pool.allocated(), &[DEFAULT_PALETTE[0]]);
    }

    #[test]
    fn test_release_makes_color_available_again() {
        let mut pool = ColorPool::new(DEFAULT_PALETTE[..2].to_vec());
        let a = pool.next_color();
        let b = pool.next_color();
        assert!(pool.release(a));
        assert!(!pool.release(a));
        assert_eq!(pool.next_color(), a);
        assert!(!pool.available().contains(&b));
    }

    #[test]
    fn test_color_is_never_both_available_and_allocated() {
        let mut pool = ColorPool::default();
        let foreign = Color::rgb(1, 2, 3);
        pool.next_color();
        pool.claim(DEFAULT_PALETTE[5]);
        pool.release(foreign);
        pool.release(DEFAULT_PALETTE[0]);
        for color in pool.palette() {
            let available = pool.available().contains(color);
            let allocated = pool.allocated().contains(color);
            assert!(available != allocated, "{color}");
        }
    }

    #[test]
    fn test_claim() {
        let mut pool = ColorPool::default();
        assert!(pool.claim(DEFAULT_PALETTE[3]));
        assert!(!pool.claim(DEFAULT_PALETTE[3]));
        assert!(!pool.claim(Color::rgb(1, 2, 3)));
        assert!(!pool.available().contains(&DEFAULT_PALETTE[3]));
    }

    #[test]
    fn test_empty_palette_uses_default() {
        let pool = ColorPool::new(Vec::new());
        assert_eq!(pool.palette(), DEFAULT_PALETTE);
        let pool = ColorPool::new(vec![Color::FALLBACK, Color::FALLBACK]);
        assert_eq!(pool.palette().len(), 1);
    }
}
