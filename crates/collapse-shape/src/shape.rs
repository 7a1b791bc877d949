use std::fmt;
use std::str::FromStr;

use collapse_geom::{BlockBounds, BlockPos};
use serde::{Deserialize, Serialize};

/// Which voxels inside a scan volume get cleared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillShape {
    /// The whole volume.
    #[default]
    Matrix,
    /// A vertical shaft around the horizontal center.
    Column,
    /// A horizontal beam along the longer horizontal axis.
    Row,
    /// Column or row along whichever axis is longest.
    Vector,
    /// Hollow shell touching all six faces.
    Outline,
    /// Shell on the four vertical faces only; top and bottom stay.
    Walls,
}

impl FillShape {
    pub const ALL: [FillShape; 6] = [
        FillShape::Matrix,
        FillShape::Column,
        FillShape::Row,
        FillShape::Vector,
        FillShape::Outline,
        FillShape::Walls,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FillShape::Matrix => "matrix",
            FillShape::Column => "column",
            FillShape::Row => "row",
            FillShape::Vector => "vector",
            FillShape::Outline => "outline",
            FillShape::Walls => "walls",
        }
    }

    /// Shell shapes whose result depends on distance to a face.
    #[inline]
    pub fn is_shell(self) -> bool {
        matches!(self, FillShape::Outline | FillShape::Walls)
    }
}

impl fmt::Display for FillShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FillShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        FillShape::ALL
            .into_iter()
            .find(|shape| shape.name() == lower)
            .ok_or_else(|| format!("unknown fill shape '{s}'"))
    }
}

#[inline]
fn near_center(v: i32, min: i32, max: i32, half: f64) -> bool {
    let center = (f64::from(min) + f64::from(max)) * 0.5;
    (f64::from(v) - center).abs() <= half
}

#[inline]
fn near_face(v: i32, min: i32, max: i32, thickness: i32) -> bool {
    if thickness <= 0 {
        return v == min || v == max;
    }
    v - min < thickness || max - v < thickness
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

/// True when (x, y, z) sits on the beam running along `axis` through the
/// center of the box.
#[inline]
#[allow(clippy::too_many_arguments)]
fn on_beam(
    axis: Axis,
    x: i32,
    y: i32,
    z: i32,
    min: (i32, i32, i32),
    max: (i32, i32, i32),
    half: f64,
) -> bool {
    match axis {
        Axis::Y => near_center(x, min.0, max.0, half) && near_center(z, min.2, max.2, half),
        Axis::X => near_center(y, min.1, max.1, half) && near_center(z, min.2, max.2, half),
        Axis::Z => near_center(x, min.0, max.0, half) && near_center(y, min.1, max.1, half),
    }
}

/// Decides whether the voxel at (x, y, z) is cleared for a box spanning
/// `min..=max` on each axis.
#[inline]
#[allow(clippy::too_many_arguments)]
pub fn should_clear_xyz(
    x: i32,
    y: i32,
    z: i32,
    min_x: i32,
    min_y: i32,
    min_z: i32,
    max_x: i32,
    max_y: i32,
    max_z: i32,
    shape: FillShape,
    thickness: i32,
) -> bool {
    let min = (min_x, min_y, min_z);
    let max = (max_x, max_y, max_z);
    let half = f64::from(thickness.max(1)) * 0.5;
    match shape {
        FillShape::Matrix => true,
        FillShape::Column => on_beam(Axis::Y, x, y, z, min, max, half),
        FillShape::Row => {
            let axis = if max_x - min_x >= max_z - min_z {
                Axis::X
            } else {
                Axis::Z
            };
            on_beam(axis, x, y, z, min, max, half)
        }
        FillShape::Vector => {
            let sx = max_x - min_x + 1;
            let sy = max_y - min_y + 1;
            let sz = max_z - min_z + 1;
            if sx == 1 || sy == 1 || sz == 1 {
                return true;
            }
            let axis = if sy >= sx && sy >= sz {
                Axis::Y
            } else if sx >= sz {
                Axis::X
            } else {
                Axis::Z
            };
            on_beam(axis, x, y, z, min, max, half)
        }
        FillShape::Outline => {
            near_face(x, min_x, max_x, thickness)
                || near_face(y, min_y, max_y, thickness)
                || near_face(z, min_z, max_z, thickness)
        }
        FillShape::Walls => {
            near_face(x, min_x, max_x, thickness) || near_face(z, min_z, max_z, thickness)
        }
    }
}

#[inline]
pub fn should_clear(pos: BlockPos, bounds: &BlockBounds, shape: FillShape, thickness: i32) -> bool {
    should_clear_xyz(
        pos.x,
        pos.y,
        pos.z,
        bounds.min.x,
        bounds.min.y,
        bounds.min.z,
        bounds.max.x,
        bounds.max.y,
        bounds.max.z,
        shape,
        thickness,
    )
}
