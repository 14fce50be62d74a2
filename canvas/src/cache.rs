use std::{collections::{HashMap, HashSet}, sync::Arc};

use parking_lot::Mutex;

use crate::{color::Color, path_codec};

/// Side length of a region, in cells.
pub const REGION_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    pub value: Color,
    /// Number of local updates applied to this cell.
    pub times_updated: u32,
}

pub fn in_region(cx: i32, cy: i32) -> bool {
    (0..REGION_SIZE as i32).contains(&cx) && (0..REGION_SIZE as i32).contains(&cy)
}

#[derive(Debug)]
struct RegionState {
    cells: Vec<Cell>,
    /// Cell node names seen on the previous child listing. `None` until the first listing.
    known_names: Option<HashSet<String>>,
}

/// A REGION_SIZE x REGION_SIZE block of cells. Created once per coordinate pair and never dropped.
#[derive(Debug)]
pub struct Region {
    coords: (i32, i32),
    path: String,
    state: Mutex<RegionState>,
}

impl Region {
    fn new(rx: i32, ry: i32) -> Region {
        Region {
            coords: (rx, ry),
            path: path_codec::region_path(rx, ry),
            state: Mutex::new(RegionState {
                cells: vec![Cell::default(); REGION_SIZE * REGION_SIZE],
                known_names: None,
            }),
        }
    }

    pub fn coords(&self) -> (i32, i32) {
        self.coords
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn cells_path(&self) -> String {
        path_codec::cells_path(self.coords.0, self.coords.1)
    }

    pub fn cell_path(&self, cx: i32, cy: i32) -> String {
        path_codec::cell_path(self.coords.0, self.coords.1, cx, cy)
    }

    pub fn cell(&self, cx: i32, cy: i32) -> Option<Cell> {
        if !in_region(cx, cy) {
            return None;
        }
        Some(self.state.lock().cells[index(cx, cy)])
    }

    /// Consistent copy of every cell, row-major.
    pub fn snapshot(&self) -> Vec<Cell> {
        self.state.lock().cells.clone()
    }

    /// True once a child listing has been recorded.
    pub fn is_discovered(&self) -> bool {
        self.state.lock().known_names.is_some()
    }

    pub fn was_previously_known(&self, name: &str) -> bool {
        self.state.lock().known_names.as_ref().is_some_and(|names| names.contains(name))
    }

    pub fn record_known_names<I>(&self, names: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.state.lock().known_names = Some(names.into_iter().map(Into::into).collect());
    }

    pub fn known_names(&self) -> HashSet<String> {
        self.state.lock().known_names.clone().unwrap_or_default()
    }

    /// Records `listing` as the new last-seen set and returns the entries that were not in
    /// the previous one, in their given order. Both steps happen under one lock so that two
    /// overlapping listings never hand out the same name twice.
    pub fn take_new_names<'a>(&self, listing: &'a [String]) -> Vec<&'a String> {
        let mut state = self.state.lock();
        let fresh = listing.iter()
            .filter(|name| !state.known_names.as_ref().is_some_and(|known| known.contains(name.as_str())))
            .collect();
        state.known_names = Some(listing.iter().cloned().collect());
        fresh
    }

    fn set_cell_value(&self, cx: i32, cy: i32, value: Color) -> bool {
        if !in_region(cx, cy) {
            return false;
        }
        let mut state = self.state.lock();
        let cell = &mut state.cells[index(cx, cy)];
        cell.value = value;
        cell.times_updated += 1;
        true
    }
}

fn index(cx: i32, cy: i32) -> usize {
    cy as usize * REGION_SIZE + cx as usize
}

#[derive(Default)]
struct CanvasInner {
    regions: HashMap<(i32, i32), Arc<Region>>,
    active: Option<Arc<Region>>,
}

/// Every region discovered this session plus the active-region pointer, under one lock.
#[derive(Default)]
pub struct Canvas {
    inner: Mutex<CanvasInner>,
}

impl Canvas {
    pub fn new() -> Canvas {
        Canvas::default()
    }

    pub fn get(&self, rx: i32, ry: i32) -> Option<Arc<Region>> {
        self.inner.lock().regions.get(&(rx, ry)).cloned()
    }

    pub fn get_or_create(&self, rx: i32, ry: i32) -> Arc<Region> {
        let mut inner = self.inner.lock();
        get_or_insert(&mut inner, rx, ry)
    }

    /// Makes the region at (rx, ry) active, creating it if needed.
    pub fn set_active(&self, rx: i32, ry: i32) -> Arc<Region> {
        let mut inner = self.inner.lock();
        let region = get_or_insert(&mut inner, rx, ry);
        inner.active = Some(region.clone());
        region
    }

    pub fn active(&self) -> Option<Arc<Region>> {
        self.inner.lock().active.clone()
    }

    pub fn is_active(&self, region: &Region) -> bool {
        self.inner.lock().active.as_deref().is_some_and(|active| std::ptr::eq(active, region))
    }

    /// Resolves a notification path to a cached region. `None` means the region was never
    /// opened here and the notification is not relevant to this client.
    pub fn lookup_by_path(&self, path: &str) -> Option<Arc<Region>> {
        let (rx, ry) = path_codec::region_coords_from_path(path)?;
        self.get(rx, ry)
    }

    /// The only writer of cell values.
    pub fn set_cell_value(&self, region: &Region, cx: i32, cy: i32, value: Color) -> bool {
        region.set_cell_value(cx, cy, value)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().regions.is_empty()
    }
}

fn get_or_insert(inner: &mut CanvasInner, rx: i32, ry: i32) -> Arc<Region> {
    inner.regions.entry((rx, ry))
        .or_insert_with(|| {
            tracing::debug!(rx, ry, "new region");
            Arc::new(Region::new(rx, ry))
        })
        .clone()
}
