//! Mapping between grid coordinates and namespace paths.
//!
//! ```text
//! /canvas
//! /canvas/region_<rx>,<ry>
//! /canvas/region_<rx>,<ry>/cells
//! /canvas/region_<rx>,<ry>/cells/cell_<cx>,<cy>
//! ```
//!
//! Names only ever contain `_`, `,`, `-` and digits after their prefix, so they never
//! collide with the `/` separator. Decoding is forgiving: anything that does not have
//! the expected shape decodes to `None`.

pub const ROOT_PATH: &str = "/canvas";
pub const CELLS_NODE: &str = "cells";
const REGION_PREFIX: &str = "region";
const CELL_PREFIX: &str = "cell";

pub fn region_name(rx: i32, ry: i32) -> String {
    format!("{REGION_PREFIX}_{rx},{ry}")
}

pub fn cell_name(cx: i32, cy: i32) -> String {
    format!("{CELL_PREFIX}_{cx},{cy}")
}

pub fn region_path(rx: i32, ry: i32) -> String {
    format!("{ROOT_PATH}/{}", region_name(rx, ry))
}

/// Parent of every cell node of the region.
pub fn cells_path(rx: i32, ry: i32) -> String {
    format!("{}/{CELLS_NODE}", region_path(rx, ry))
}

pub fn cell_path(rx: i32, ry: i32, cx: i32, cy: i32) -> String {
    format!("{}/{}", cells_path(rx, ry), cell_name(cx, cy))
}

pub fn parse_region_name(name: &str) -> Option<(i32, i32)> {
    parse_coords(name, REGION_PREFIX)
}

pub fn parse_cell_name(name: &str) -> Option<(i32, i32)> {
    parse_coords(name, CELL_PREFIX)
}

/// Region coordinates of any path at or below a region node.
pub fn region_coords_from_path(path: &str) -> Option<(i32, i32)> {
    let rest = path.strip_prefix(ROOT_PATH)?.strip_prefix('/')?;
    let name = rest.split('/').next()?;
    parse_region_name(name)
}

/// Cell coordinates of a full cell path.
pub fn cell_coords_from_path(path: &str) -> Option<(i32, i32)> {
    parse_cell_name(cell_name_from_path(path)?)
}

pub fn cell_name_from_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(ROOT_PATH)?.strip_prefix('/')?;
    let mut parts = rest.split('/');
    let _region = parts.next()?;
    if parts.next()? != CELLS_NODE {
        return None;
    }
    let name = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some(name)
}

fn parse_coords(name: &str, prefix: &str) -> Option<(i32, i32)> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('_')?;
    let (x, y) = rest.split_once(',')?;
    Some((x.parse().ok()?, y.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        assert_eq!(region_path(0, 0), "/canvas/region_0,0");
        assert_eq!(cells_path(-1, 2), "/canvas/region_-1,2/cells");
        assert_eq!(cell_path(3, 4, 5, 6), "/canvas/region_3,4/cells/cell_5,6");
    }

    #[test]
    fn decode_inverts_encode() {
        let samples = [0, 1, -1, 49, 50, -50, 12345, i32::MAX, i32::MIN];
        for x in samples {
            for y in samples {
                assert_eq!(parse_region_name(&region_name(x, y)), Some((x, y)));
                assert_eq!(parse_cell_name(&cell_name(x, y)), Some((x, y)));
                assert_eq!(region_coords_from_path(&region_path(x, y)), Some((x, y)));
                assert_eq!(region_coords_from_path(&cell_path(x, y, 1, 2)), Some((x, y)));
                assert_eq!(cell_coords_from_path(&cell_path(1, 2, x, y)), Some((x, y)));
            }
        }
    }

    #[test]
    fn malformed_input_decodes_to_none() {
        for name in ["", "cell", "cell_", "cell_1", "cell_1,", "cell_a,b", "cell_1,2,3", "tile_1,2", "cell-1,2", "region_1,2"] {
            assert_eq!(parse_cell_name(name), None, "{name}");
        }
        for path in ["", "/", "/canvas", "/other/region_1,2", "/canvas/region_x,2/cells", "canvas/region_1,2"] {
            assert_eq!(region_coords_from_path(path), None, "{path}");
        }
        for path in ["/canvas/region_1,2/cells", "/canvas/region_1,2/other/cell_1,1", "/canvas/region_1,2/cells/cell_1,1/x"] {
            assert_eq!(cell_coords_from_path(path), None, "{path}");
        }
    }
}
