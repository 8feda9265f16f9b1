use serde::{Deserialize, Serialize};

/// A point in world space. `y` is height; the arena lies on the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Integer block coordinate on the X axis.
    pub fn block_x(&self) -> i64 {
        self.x.floor() as i64
    }

    pub fn block_y(&self) -> i64 {
        self.y.floor() as i64
    }

    /// Integer block coordinate on the Z axis.
    pub fn block_z(&self) -> i64 {
        self.z.floor() as i64
    }

    /// Move the point to the centre of the block it lies in (X and Z only).
    pub fn centered_on_block(self) -> Self {
        Self {
            x: self.block_x() as f64 + 0.5,
            y: self.y,
            z: self.block_z() as f64 + 0.5,
        }
    }

    pub fn with_y(self, y: f64) -> Self {
        Self { y, ..self }
    }

    pub fn offset(self, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Horizontal (XZ) distance to another point.
    pub fn horizontal_distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Inclusive box of world regions (region coordinates, not blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBox {
    pub min_x: i64,
    pub max_x: i64,
    pub min_z: i64,
    pub max_z: i64,
}

impl RegionBox {
    /// Region box covering the block range `[min_x, max_x] x [min_z, max_z]`
    /// for regions `region_size` blocks wide.
    pub fn covering(min_x: i64, max_x: i64, min_z: i64, max_z: i64, region_size: i64) -> Self {
        let size = region_size.max(1);
        Self {
            min_x: min_x.div_euclid(size),
            max_x: max_x.div_euclid(size),
            min_z: min_z.div_euclid(size),
            max_z: max_z.div_euclid(size),
        }
    }

    /// Iterate every region coordinate in the box, row by row.
    pub fn regions(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        (self.min_x..=self.max_x).flat_map(move |x| (self.min_z..=self.max_z).map(move |z| (x, z)))
    }

    pub fn region_count(&self) -> usize {
        let w = (self.max_x - self.min_x + 1).max(0) as usize;
        let d = (self.max_z - self.min_z + 1).max(0) as usize;
        w * d
    }
}
