// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::math::Vec3;

/// Column-major 3×3 matrix used for rotations and inertia tensors.
///
/// Element `(row, col)` lives at `data[col * 3 + row]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat3 {
    data: [f64; 9],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat3 {
    /// Creates a matrix from column-major data.
    pub const fn new(data: [f64; 9]) -> Self {
        Self { data }
    }

    /// Identity matrix.
    pub const fn identity() -> Self {
        Self::from_diagonal_array([1.0, 1.0, 1.0])
    }

    /// All-zero matrix.
    pub const fn zero() -> Self {
        Self { data: [0.0; 9] }
    }

    const fn from_diagonal_array(d: [f64; 3]) -> Self {
        Self {
            data: [d[0], 0.0, 0.0, 0.0, d[1], 0.0, 0.0, 0.0, d[2]],
        }
    }

    /// Diagonal matrix with `diag` on the main diagonal.
    pub fn from_diagonal(diag: Vec3) -> Self {
        Self::from_diagonal_array(diag.to_array())
    }

    /// Returns the column-major data.
    pub fn to_array(self) -> [f64; 9] {
        self.data
    }

    /// Element at `(row, col)`.
    ///
    /// # Panics
    /// Panics if `row` or `col` is greater than 2.
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.data[col * 3 + row]
    }

    /// Column `col` as a vector.
    pub fn column(&self, col: usize) -> Vec3 {
        Vec3::new(self.at(0, col), self.at(1, col), self.at(2, col))
    }

    /// Row `row` as a vector.
    pub fn row(&self, row: usize) -> Vec3 {
        Vec3::new(self.at(row, 0), self.at(row, 1), self.at(row, 2))
    }

    /// Transpose.
    pub fn transpose(&self) -> Self {
        let mut out = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                out[row * 3 + col] = self.at(row, col);
            }
        }
        Self::new(out)
    }

    /// Matrix product `self * other`.
    pub fn multiply(&self, other: &Self) -> Self {
        let mut out = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                out[col * 3 + row] = self.row(row).dot(&other.column(col));
            }
        }
        Self::new(out)
    }

    /// Matrix-vector product `self * v`.
    pub fn mul_vec3(&self, v: &Vec3) -> Vec3 {
        Vec3::new(self.row(0).dot(v), self.row(1).dot(v), self.row(2).dot(v))
    }
}
