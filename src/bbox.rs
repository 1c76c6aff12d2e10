//! Geographic bounding box, consumed by the driver as an opaque value.

use serde::{Deserialize, Serialize};

/// Extent in degrees: north/south latitude, west/east longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(north: f64, west: f64, south: f64, east: f64) -> Self {
        BoundingBox {
            north,
            west,
            south,
            east,
        }
    }

    /// Union of two extents. Commutative and associative, so accumulated
    /// boxes are order-independent.
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            north: self.north.max(other.north),
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
        }
    }

    /// Grow every side by `margin` degrees, clamping latitudes to the poles.
    pub fn add_margins(&self, margin: f64) -> BoundingBox {
        BoundingBox {
            north: (self.north + margin).min(90.0),
            west: self.west - margin,
            south: (self.south - margin).max(-90.0),
            east: self.east + margin,
        }
    }
}
