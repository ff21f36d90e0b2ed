//! Splits row height between bars that collide on the same resource.
//!
//! The layout is a function of the bars' horizontal spans only, so running
//! the pass again on an unchanged row changes nothing.

use super::bar::Geometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Full,
    Top,
    Bottom,
}

impl Slot {
    fn opposite(self) -> Slot {
        match self {
            Slot::Top => Slot::Bottom,
            _ => Slot::Top,
        }
    }
}

/// Lay out the bars of one resource row. Returns whether any bar moved.
pub fn resolve_row(row_y: f64, full_height: f64, bars: &mut [&mut Geometry]) -> bool {
    let spans: Vec<Geometry> = bars.iter().map(|b| **b).collect();
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by(|&a, &b| spans[a].x.total_cmp(&spans[b].x).then(a.cmp(&b)));

    let mut slots = vec![Slot::Full; spans.len()];
    for (rank, &i) in order.iter().enumerate() {
        let collides = order
            .iter()
            .any(|&j| j != i && spans[i].overlaps_x(&spans[j]));
        if !collides {
            continue;
        }

        let earlier: Vec<usize> = order[..rank]
            .iter()
            .copied()
            .filter(|&j| spans[i].overlaps_x(&spans[j]))
            .collect();
        let used = |slot| earlier.iter().any(|&j| slots[j] == slot);
        let slot = if !used(Slot::Top) {
            Slot::Top
        } else if !used(Slot::Bottom) {
            Slot::Bottom
        } else {
            // Both halves taken: alternate against the nearest neighbour.
            earlier
                .last()
                .map(|&j| slots[j].opposite())
                .unwrap_or(Slot::Top)
        };
        slots[i] = slot;
    }

    let half = full_height / 2.0;
    let mut changed = false;
    for (bar, slot) in bars.iter_mut().zip(slots) {
        let (y, height) = match slot {
            Slot::Full => (row_y, full_height),
            Slot::Top => (row_y, half),
            Slot::Bottom => (row_y + half, half),
        };
        if bar.y != y || bar.height != height {
            bar.y = y;
            bar.height = height;
            changed = true;
        }
    }
    changed
}
