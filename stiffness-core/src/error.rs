//! Error types for stiffness and operator construction.

use thiserror::Error;

/// Result type alias using the crate Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building matrices or applying operators.
///
/// All of them signal misuse (bad names, wrong field kind, shape mismatch)
/// and are never retryable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Parameterization key outside the registry.
    #[error("unsupported parameterization '{0}' (expected one of: lam-mu, vp-vs-rho, Ip-Is-rho, C-elements)")]
    UnsupportedParameterization(String),

    /// Derivative name that is neither attached nor a legal raw element.
    #[error("'{kind}' object has no attribute '{name}'")]
    UnknownDerivative { name: String, kind: String },

    /// Model lacks a parameter required by the chosen parameterization.
    #[error("model does not provide parameter '{0}'")]
    MissingParameter(String),

    /// Spatial dimensionality outside {2, 3}.
    #[error("unsupported dimension {0} (expected 2 or 3)")]
    UnsupportedDimension(usize),

    /// Operator expected a tensor-valued field.
    #[error("the object must be a Tensor object")]
    NotTensorValued,

    /// Operator expected a vector-valued field.
    #[error("the object must be a Vector object")]
    NotVectorValued,

    /// `vec` called on a tensor already in Voigt form.
    #[error("this object is already represented by its vector form")]
    AlreadyVoigt,

    /// `tensor` called on a tensor already in square form.
    #[error("this object is already represented by its tensor form")]
    AlreadyTensor,

    /// `gather` operand of the wrong kind.
    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    /// Incompatible shapes between matrices and/or fields.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Symbol without a numeric binding during evaluation.
    #[error("no value bound to symbol '{0}'")]
    UnboundSymbol(String),

    /// Expression that has no numeric value (e.g. an unevaluated derivative).
    #[error("expression is not numeric: {0}")]
    NotNumeric(String),

    /// Preset model name outside the known set.
    #[error("unknown model preset name '{0}'")]
    UnknownPreset(String),

    /// Invalid preset configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
