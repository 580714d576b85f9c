//! Core data types shared by the matrix builders and field operators.
//!
//! This module defines:
//! - The spatial dimensionality of a problem (2D or 3D)
//! - The Voigt ordering that links symmetric tensors to compact vectors

use crate::error::{Error, Result};
use std::fmt;

/// Voigt component order for 2D: [xx, yy, xy].
pub const VOIGT_ORDER_2D: [(usize, usize); 3] = [(0, 0), (1, 1), (0, 1)];

/// Voigt component order for 3D: [xx, yy, zz, yz, xz, xy].
pub const VOIGT_ORDER_3D: [(usize, usize); 6] = [(0, 0), (1, 1), (2, 2), (1, 2), (0, 2), (0, 1)];

/// Spatial dimensionality of an elastic problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dim {
    /// Two space dimensions (3x3 stiffness).
    Two,
    /// Three space dimensions (6x6 stiffness).
    Three,
}

impl Dim {
    /// Create from a number of space dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDimension`] for anything other than 2 or 3.
    pub fn new(n: usize) -> Result<Self> {
        match n {
            2 => Ok(Dim::Two),
            3 => Ok(Dim::Three),
            other => Err(Error::UnsupportedDimension(other)),
        }
    }

    /// Number of space dimensions.
    pub fn n(self) -> usize {
        match self {
            Dim::Two => 2,
            Dim::Three => 3,
        }
    }

    /// Length of a Voigt vector, which is also the stiffness matrix size (3n - 3).
    pub fn voigt_len(self) -> usize {
        3 * self.n() - 3
    }

    /// Index pairs selected by the Voigt ordering.
    pub fn voigt_order(self) -> &'static [(usize, usize)] {
        match self {
            Dim::Two => &VOIGT_ORDER_2D,
            Dim::Three => &VOIGT_ORDER_3D,
        }
    }
}

impl TryFrom<usize> for Dim {
    type Error = Error;

    fn try_from(n: usize) -> Result<Self> {
        Dim::new(n)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}D", self.n())
    }
}
