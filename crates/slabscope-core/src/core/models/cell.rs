use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A Cartesian axis of the simulation cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit_vector(self) -> Vector3<f64> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}

impl FromStr for Axis {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(s)
    }
}

/// An orthorhombic periodic simulation cell.
///
/// A zero length along an axis disables periodicity along it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeriodicBox {
    lengths: Vector3<f64>,
}

impl PeriodicBox {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            lengths: Vector3::new(x, y, z),
        }
    }

    /// A cell without periodic images.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn lengths(&self) -> &Vector3<f64> {
        &self.lengths
    }

    pub fn length(&self, axis: Axis) -> f64 {
        self.lengths[axis.index()]
    }

    /// Applies the minimum-image convention to a displacement vector.
    pub fn minimum_image(&self, mut delta: Vector3<f64>) -> Vector3<f64> {
        for i in 0..3 {
            let length = self.lengths[i];
            if length > 0.0 {
                delta[i] -= length * (delta[i] / length).round();
            }
        }
        delta
    }

    /// The minimum-image vector pointing from `from` to `to`.
    pub fn displacement(&self, from: &Point3<f64>, to: &Point3<f64>) -> Vector3<f64> {
        self.minimum_image(to - from)
    }

    pub fn distance(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        self.displacement(a, b).norm()
    }
}

/// The reference axis together with the periodic unwrap rule along it.
///
/// Positions below `pbc_flip` are shifted up by one box length so that a slab
/// straddling the cell boundary maps onto one continuous coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisFrame {
    pub axis: Axis,
    pub pbc_flip: f64,
    pub box_length: f64,
}

impl AxisFrame {
    pub fn new(axis: Axis, pbc_flip: f64, box_length: f64) -> Self {
        Self {
            axis,
            pbc_flip,
            box_length,
        }
    }

    /// Signed, unwrapped position of a point along the reference axis.
    pub fn position(&self, point: &Point3<f64>) -> f64 {
        self.unwrap(point[self.axis.index()])
    }

    /// Unwraps a raw axis coordinate. Values at or above `pbc_flip` are returned
    /// unchanged, so applying this twice never double-shifts a value that
    /// already lies in `[pbc_flip - L, ∞)`.
    pub fn unwrap(&self, value: f64) -> f64 {
        if value < self.pbc_flip {
            value + self.box_length
        } else {
            value
        }
    }

    pub fn unit_vector(&self) -> Vector3<f64> {
        self.axis.unit_vector()
    }
}
