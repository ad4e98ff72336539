//! Stable category colors.
//!
//! Colors are handed out round-robin over the name-sorted category list,
//! never over a magnitude ordering, so a category keeps its color in every
//! view that re-sorts or truncates the same aggregate.

use std::fmt;

use serde::Serialize;

use crate::aggregate::CategoryAggregate;

pub const PALETTE: [Color; 8] = [
    Color("#3b82f6"),
    Color("#10b981"),
    Color("#f59e0b"),
    Color("#ef4444"),
    Color("#8b5cf6"),
    Color("#ec4899"),
    Color("#06b6d4"),
    Color("#84cc16"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(&'static str);

impl Color {
    pub fn hex(self) -> &'static str {
        self.0
    }

    pub fn for_position(index: usize) -> Self {
        PALETTE[index % PALETTE.len()]
    }
}

impl Default for Color {
    fn default() -> Self {
        PALETTE[0]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Assigns `PALETTE[i % 8]` to the i-th category. `categories` must already
/// be sorted by name.
pub fn assign_colors(categories: &mut [CategoryAggregate]) {
    debug_assert!(
        categories.windows(2).all(|pair| pair[0].name <= pair[1].name),
        "categories must be name-sorted before color assignment"
    );
    for (index, category) in categories.iter_mut().enumerate() {
        category.color = Color::for_position(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn palette_entries_are_distinct() {
        let distinct = PALETTE.iter().map(|c| c.hex()).collect::<HashSet<_>>();
        assert_eq!(distinct.len(), PALETTE.len());
    }

    #[test]
    fn colors_wrap_after_palette_is_exhausted() {
        let mut categories = (0..10)
            .map(|i| CategoryAggregate::named(format!("c{i:02}")))
            .collect::<Vec<_>>();
        assign_colors(&mut categories);
        assert_eq!(categories[0].color, PALETTE[0]);
        assert_eq!(categories[7].color, PALETTE[7]);
        assert_eq!(categories[8].color, PALETTE[0]);
        assert_eq!(categories[9].color, PALETTE[1]);
    }
}
