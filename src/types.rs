use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct V3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}
#[allow(non_snake_case)]
pub const fn V3<T>(x: T, y: T, z: T) -> V3<T> {
    V3 { x, y, z }
}
impl V3<i32> {
    pub fn chunk(self) -> ChunkPos {
        ChunkPos { x: self.x.div_euclid(16), z: self.z.div_euclid(16) }
    }
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        V3(self.x + dx, self.y + dy, self.z + dz)
    }
    pub fn up(self) -> Self {
        self.offset(0, 1, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}
impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
    pub const fn min_block_x(self) -> i32 {
        self.x * 16
    }
    pub const fn min_block_z(self) -> i32 {
        self.z * 16
    }
}

/// Horizontal rectangle of block columns, `min` inclusive and `max` exclusive.
/// Territories own the full build height of every column inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}
impl Bounds {
    pub fn around(center: V3<i32>, range: i32) -> Self {
        Self {
            min_x: center.x - range,
            min_z: center.z - range,
            max_x: center.x + range,
            max_z: center.z + range,
        }
    }
    pub fn contains(&self, x: i32, z: i32) -> bool {
        (self.min_x..self.max_x).contains(&x) && (self.min_z..self.max_z).contains(&z)
    }
    pub fn contains_point(&self, x: f64, z: f64) -> bool {
        x >= self.min_x as f64 && x < self.max_x as f64 && z >= self.min_z as f64 && z < self.max_z as f64
    }
    pub fn is_empty(&self) -> bool {
        self.min_x >= self.max_x || self.min_z >= self.max_z
    }
    /// Every chunk touching the rectangle, row by row.
    pub fn chunks(&self) -> Vec<ChunkPos> {
        if self.is_empty() {
            return vec![];
        }
        let (x0, x1) = (self.min_x.div_euclid(16), (self.max_x - 1).div_euclid(16));
        let (z0, z1) = (self.min_z.div_euclid(16), (self.max_z - 1).div_euclid(16));
        (z0..=z1).flat_map(|z| (x0..=x1).map(move |x| ChunkPos::new(x, z))).collect()
    }
    /// Local x and z ranges of `chunk` that fall inside the rectangle.
    pub fn clip(&self, chunk: ChunkPos) -> (std::ops::Range<i32>, std::ops::Range<i32>) {
        let clip = |lo: i32, hi: i32, base: i32| (lo - base).clamp(0, 16)..(hi - base).clamp(0, 16);
        (
            clip(self.min_x, self.max_x, chunk.min_block_x()),
            clip(self.min_z, self.max_z, chunk.min_block_z()),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Overworld,
    Nether,
    End,
}

/// Worlds paired into one territory's play space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSet {
    pub overworld: String,
    pub nether: Option<String>,
    pub end: Option<String>,
}
impl DimensionSet {
    pub fn overworld(name: impl Into<String>) -> Self {
        Self { overworld: name.into(), nether: None, end: None }
    }
    pub fn with_nether(mut self, name: impl Into<String>) -> Self {
        self.nether = Some(name.into());
        self
    }
    pub fn with_end(mut self, name: impl Into<String>) -> Self {
        self.end = Some(name.into());
        self
    }
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &str)> {
        std::iter::once((Dimension::Overworld, self.overworld.as_str()))
            .chain(self.nether.as_deref().map(|n| (Dimension::Nether, n)))
            .chain(self.end.as_deref().map(|e| (Dimension::End, e)))
    }
    pub fn dimension_of(&self, world: &str) -> Option<Dimension> {
        self.iter().find(|(_, w)| *w == world).map(|(d, _)| d)
    }
    pub fn contains(&self, world: &str) -> bool {
        self.dimension_of(world).is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerritoryId(String);
impl TerritoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl std::fmt::Display for TerritoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generational handle of a live entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub index: u32,
    pub generation: u32,
}

/// Accepts `hopper`, `minecraft:hopper` and `HOPPER` alike.
pub(crate) fn normalize_name(name: &str) -> String {
    let name = name.trim();
    let name = name.strip_prefix("minecraft:").unwrap_or(name);
    name.to_ascii_uppercase().replace([' ', '-'], "_")
}
