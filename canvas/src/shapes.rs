//! Cell geometry for the drawing commands. Everything here returns points in row-major
//! order without duplicates, clipped to the cells of one region, so the work done is
//! bounded by the region size however large the shape.

use std::collections::BTreeSet;

use crate::{cache::REGION_SIZE, color::Color};

/// Largest radius [`circle`] draws. Tracing the outline is linear in the radius.
pub const MAX_RADIUS: i32 = 4096;

const LAST: i64 = REGION_SIZE as i64 - 1;

/// Every cell of the rectangle spanned by two opposite corners, edges included.
pub fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Vec<(i32, i32)> {
    let (Some((min_x, max_x)), Some((min_y, max_y))) = (
        clip(x1.min(x2).into(), x1.max(x2).into()),
        clip(y1.min(y2).into(), y1.max(y2).into()),
    ) else {
        return Vec::new();
    };
    (min_y..=max_y)
        .flat_map(|y| (min_x..=max_x).map(move |x| (x, y)))
        .collect()
}

/// The rectangle with alternating colors. Cells where `x + y` is even get `first`.
pub fn checker(x1: i32, y1: i32, x2: i32, y2: i32, first: Color, second: Color) -> Vec<(i32, i32, Color)> {
    rect(x1, y1, x2, y2)
        .into_iter()
        .map(|(x, y)| {
            let color = if (x + y) % 2 == 0 { first } else { second };
            (x, y, color)
        })
        .collect()
}

/// Midpoint (Bresenham) circle around (cx, cy). With `fill` the disk is filled in.
///
/// A radius outside `1..=MAX_RADIUS` draws nothing.
pub fn circle(cx: i32, cy: i32, radius: i32, fill: bool) -> Vec<(i32, i32)> {
    if !(1..=MAX_RADIUS).contains(&radius) {
        return Vec::new();
    }
    let radius = i64::from(radius);
    let (cx, cy) = (i64::from(cx), i64::from(cy));
    let offsets = octant_offsets(radius);

    // keyed (y, x) so the set iterates row-major
    let mut points = BTreeSet::new();
    if fill {
        // half-width of the disk at each row distance from the center
        let mut widths = vec![0i64; radius as usize + 1];
        for &(dx, dy) in &offsets {
            if let Some(width) = widths.get_mut(dy as usize) {
                *width = (*width).max(dx);
            }
        }
        for k in (0..radius as usize).rev() {
            widths[k] = widths[k].max(widths[k + 1]);
        }
        for (k, width) in widths.into_iter().enumerate() {
            let Some((min_x, max_x)) = clip(cx - width, cx + width) else { continue };
            for y in [cy - k as i64, cy + k as i64] {
                let Some((y, _)) = clip(y, y) else { continue };
                points.extend((min_x..=max_x).map(|x| (y, x)));
            }
        }
    } else {
        for (dx, dy) in offsets {
            for (x, y) in [(cx + dx, cy + dy), (cx - dx, cy + dy), (cx + dx, cy - dy), (cx - dx, cy - dy)] {
                if let (Some((x, _)), Some((y, _))) = (clip(x, x), clip(y, y)) {
                    points.insert((y, x));
                }
            }
        }
    }

    points.into_iter().map(|(y, x)| (x, y)).collect()
}

/// Non-negative (dx, dy) offsets of the outline, both octants of the first quadrant.
fn octant_offsets(radius: i64) -> Vec<(i64, i64)> {
    let mut offsets = Vec::new();
    let (mut x, mut y) = (0, radius);
    let mut d = 3 - 2 * radius;

    offsets.extend([(x, y), (y, x)]);
    while y >= x {
        x += 1;
        if d > 0 {
            y -= 1;
            d += 4 * (x - y) + 10;
        } else {
            d += 4 * x + 6;
        }
        offsets.extend([(x, y), (y, x)]);
    }
    offsets
}

/// The part of `lo..=hi` inside the region, if any.
fn clip(lo: i64, hi: i64) -> Option<(i32, i32)> {
    let (lo, hi) = (lo.max(0), hi.min(LAST));
    (lo <= hi).then_some((lo as i32, hi as i32))
}
