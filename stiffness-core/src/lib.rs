//! Stiffness Core - symbolic elastic stiffness for wave modelling
//!
//! Builds the anisotropic stiffness matrix that relates stress and strain in
//! elastic-wave simulations, together with:
//! - Analytic derivative matrices for each parameterization (for inversion)
//! - Analytic compliance matrices where they are defined
//! - Divergence / symmetric-gradient operators over symbolic wavefields
//! - Voigt conversions and parameter-vector gathering
//!
//! # Architecture
//!
//! - [`Expr`]: minimal symbolic scalar algebra
//! - [`matrix`]: the `C{i}{j}` skeleton and matrix helpers
//! - [`Parameterization`]: `lam-mu`, `vp-vs-rho`, `Ip-Is-rho`, `C-elements`
//! - [`StiffnessMatrix`]: populated matrix with named derivatives
//! - [`operators`]: `D`, `S`, `vec`, `tensor`, `gather`
//! - [`preset`]: demonstration models

pub mod types;
pub mod expr;
pub mod matrix;
pub mod parameterization;
pub mod model;
pub mod stiffness;
pub mod field;
pub mod operators;
pub mod preset;
pub mod error;

pub use types::Dim;
pub use expr::Expr;
pub use matrix::{symbolic_matrix, SymbolicMatrix};
pub use parameterization::Parameterization;
pub use model::{ElasticModel, ElasticParameters};
pub use stiffness::{build_stiffness, StiffnessMatrix};
pub use field::{Dimension, Field, TensorField, VectorField};
pub use operators::{apply, divergence, gather, symmetric_gradient, tensor, vec};
pub use preset::{demo_model, PresetConfig};
pub use error::{Error, Result};
