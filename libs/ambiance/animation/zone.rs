use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// Name of the zone covering the whole strip
pub const GLOBAL_ZONE: &str = "global";

/// Half-open pixel range `[start, end)` on one strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub start: usize,
    pub end: usize,
}

impl Zone {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Pixel indexes from the far end back to `start`
    pub fn reversed(&self) -> impl Iterator<Item = usize> {
        self.range().rev()
    }
}

/// Configured zones plus the implicit global one
#[derive(Debug, Clone)]
pub struct ZoneMap {
    global: Zone,
    zones: BTreeMap<String, Zone>,
}

impl ZoneMap {
    pub fn new(pixel_count: usize, zones: BTreeMap<String, Zone>) -> Self {
        Self {
            global: Zone::new(0, pixel_count),
            zones,
        }
    }

    pub fn get(&self, name: &str) -> Option<Zone> {
        if name == GLOBAL_ZONE {
            return Some(self.zones.get(GLOBAL_ZONE).copied().unwrap_or(self.global));
        }
        self.zones.get(name).copied()
    }

    pub fn global(&self) -> Zone {
        self.global
    }
}
