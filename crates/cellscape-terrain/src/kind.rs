//! Region kinds: per-grouping flags that steer height synthesis and colouring.

use serde::{Deserialize, Serialize};

/// What a grouping looks like once it is turned into terrain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionKind {
    /// Display name, used in logs only.
    pub name: String,
    /// Points sink toward the interior instead of ramping between cells.
    pub lake: bool,
    /// Rocky terrain is coloured grey.
    pub rocky: bool,
    /// A water plane is built on top of the region.
    pub requires_water: bool,
}

/// Kind used for groupings when the table is empty.
static PLAIN: RegionKind = RegionKind {
    name: String::new(),
    lake: false,
    rocky: false,
    requires_water: false,
};

impl RegionKind {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Lookup from grouping to [`RegionKind`]. Groupings wrap around the table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionKindTable(pub Vec<RegionKind>);

impl Default for RegionKindTable {
    fn default() -> Self {
        Self(vec![
            RegionKind::named("meadow"),
            RegionKind {
                lake: true,
                requires_water: true,
                ..RegionKind::named("lake")
            },
            RegionKind {
                rocky: true,
                ..RegionKind::named("highland")
            },
            RegionKind::named("forest"),
        ])
    }
}

impl RegionKindTable {
    /// Kind of a grouping. An empty table maps everything to a plain kind.
    pub fn for_grouping(&self, grouping: i32) -> &RegionKind {
        if self.0.is_empty() {
            return &PLAIN;
        }
        let slot = grouping.rem_euclid(self.0.len() as i32) as usize;
        &self.0[slot]
    }
}
