//! Parameterization registry and substitution tables.
//!
//! Every isotropic stiffness-type matrix has the same structure: one
//! expression on the normal diagonal, one on the shear diagonal and one for
//! the normal-normal coupling. A [`SubstitutionTable`] therefore stores those
//! three formulas per dimensionality and expands them onto the skeleton's
//! element names.
//!
//! The formulas are fixed constitutive relations:
//!
//! | parameterization | normal        | shear     | coupling                  |
//! |------------------|---------------|-----------|---------------------------|
//! | `lam-mu`         | `lam + 2*mu`  | `mu`      | `lam`                     |
//! | `vp-vs-rho`      | `rho*vp*vp`   | `rho*vs*vs` | `rho*vp*vp - 2*rho*vs*vs` |
//! | `Ip-Is-rho`      | `Ip*vp`       | `Is*vs`   | `Ip*vp - 2*Is*vs`         |

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::matrix::element_name;
use crate::model::ElasticParameters;
use crate::types::Dim;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Choice of independent physical variables for the stiffness matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameterization {
    /// Lamé parameters λ and μ.
    LamMu,
    /// P/S wave speeds and density.
    VpVsRho,
    /// P/S impedances, with the wave speeds they are paired with.
    IpIsRho,
    /// Raw stiffness elements read off the model.
    CElements,
}

impl Parameterization {
    /// All registry entries.
    pub const ALL: [Parameterization; 4] = [
        Parameterization::LamMu,
        Parameterization::VpVsRho,
        Parameterization::IpIsRho,
        Parameterization::CElements,
    ];

    /// Registry key.
    pub fn as_str(self) -> &'static str {
        match self {
            Parameterization::LamMu => "lam-mu",
            Parameterization::VpVsRho => "vp-vs-rho",
            Parameterization::IpIsRho => "Ip-Is-rho",
            Parameterization::CElements => "C-elements",
        }
    }

    /// Names of the physical derivative matrices attached to the stiffness.
    pub fn derivative_names(self) -> &'static [&'static str] {
        match self {
            Parameterization::LamMu => &["dlam", "dmu"],
            Parameterization::VpVsRho => &["dvp", "dvs", "drho"],
            Parameterization::IpIsRho => &["dIp", "dIs"],
            Parameterization::CElements => &[],
        }
    }

    /// Raw-element matrices use the asymmetrical skeleton.
    pub fn asymmetrical(self) -> bool {
        self == Parameterization::CElements
    }

    /// Substitution table for one matrix kind, if this parameterization defines it.
    pub fn table(self, kind: MatrixKind) -> Option<&'static SubstitutionTable> {
        use MatrixKind::*;
        use Parameterization::*;

        match (self, kind) {
            (LamMu, Stiffness) => Some(&LAM_MU),
            (LamMu, Inverse) => Some(&LAM_MU_INVERSE),
            (LamMu, Derivative("dlam")) => Some(&D_LAM),
            (LamMu, Derivative("dmu")) => Some(&D_MU),
            (VpVsRho, Stiffness) => Some(&VP_VS_RHO),
            (VpVsRho, Inverse) => Some(&VP_VS_RHO_INVERSE),
            (VpVsRho, Derivative("dvp")) => Some(&D_VP),
            (VpVsRho, Derivative("dvs")) => Some(&D_VS),
            (VpVsRho, Derivative("drho")) => Some(&D_RHO),
            (IpIsRho, Stiffness) => Some(&IP_IS_RHO),
            (IpIsRho, Derivative("dIp")) => Some(&D_IP),
            (IpIsRho, Derivative("dIs")) => Some(&D_IS),
            _ => None,
        }
    }
}

impl FromStr for Parameterization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Parameterization::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnsupportedParameterization(s.to_string()))
    }
}

impl fmt::Display for Parameterization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which matrix of a parameterization a table populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    /// The stiffness matrix itself.
    Stiffness,
    /// The analytic compliance.
    Inverse,
    /// Partial derivative with respect to a named variable (`dlam`, `dvp`, ...).
    Derivative(&'static str),
}

/// Physical variables resolved from a model.
///
/// Only the fields a parameterization's tables use are read from the model;
/// the rest stay zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    pub lam: Expr,
    pub mu: Expr,
    pub vp: Expr,
    pub vs: Expr,
    pub rho: Expr,
    pub ip: Expr,
    pub is: Expr,
}

impl Variables {
    /// Read the variables a parameterization needs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] if the model lacks one of them.
    pub fn resolve<M: ElasticParameters + ?Sized>(
        model: &M,
        parameterization: Parameterization,
    ) -> Result<Self> {
        let get = |name: &str| {
            model
                .parameter(name)
                .ok_or_else(|| Error::MissingParameter(name.to_string()))
        };

        let vars = match parameterization {
            Parameterization::LamMu => Variables {
                lam: get("lam")?,
                mu: get("mu")?,
                ..Variables::default()
            },
            Parameterization::VpVsRho => Variables {
                vp: get("vp")?,
                vs: get("vs")?,
                rho: get("rho")?,
                ..Variables::default()
            },
            Parameterization::IpIsRho => Variables {
                vp: get("vp")?,
                vs: get("vs")?,
                ip: get("Ip")?,
                is: get("Is")?,
                ..Variables::default()
            },
            Parameterization::CElements => Variables::default(),
        };
        Ok(vars)
    }
}

/// Closed-form expression of one matrix entry.
pub type Formula = fn(&Variables) -> Expr;

/// The three isotropic entry classes for one dimensionality.
#[derive(Clone, Copy)]
pub struct Entries {
    /// Normal diagonal (C11, C22[, C33]).
    pub normal: Formula,
    /// Shear diagonal (C33 in 2D; C44, C55, C66 in 3D).
    pub shear: Formula,
    /// Normal-normal coupling (C12[, C13, C23]).
    pub coupling: Formula,
}

/// A 2D and a 3D substitution table.
#[derive(Clone, Copy)]
pub struct SubstitutionTable {
    pub two: Entries,
    pub three: Entries,
}

impl SubstitutionTable {
    /// Expand into a symbol-name table for the symmetric skeleton of `dim`.
    pub fn expand(&self, dim: Dim, vars: &Variables) -> BTreeMap<String, Expr> {
        let entries = match dim {
            Dim::Two => &self.two,
            Dim::Three => &self.three,
        };
        let d = dim.n();
        let n = dim.voigt_len();

        let mut table = BTreeMap::new();
        for i in 1..=n {
            let formula = if i <= d { entries.normal } else { entries.shear };
            table.insert(element_name(i, i), formula(vars));
        }
        for i in 1..=d {
            for j in (i + 1)..=d {
                table.insert(element_name(i, j), (entries.coupling)(vars));
            }
        }
        table
    }
}

/// Raw elements read by the `C-elements` parameterization.
pub fn raw_element_names(dim: Dim) -> &'static [&'static str] {
    match dim {
        Dim::Two => &["C11", "C22", "C33", "C12", "C21"],
        Dim::Three => &[
            "C11", "C22", "C33", "C12", "C21", "C44", "C55", "C66", "C13", "C23", "C31", "C32",
        ],
    }
}

static LAM_MU: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |v| &v.lam + 2.0 * &v.mu,
        shear: |v| v.mu.clone(),
        coupling: |v| v.lam.clone(),
    },
    three: Entries {
        normal: |v| &v.lam + 2.0 * &v.mu,
        shear: |v| v.mu.clone(),
        coupling: |v| v.lam.clone(),
    },
};

// Plane-strain compliance: inverse of [[l+2m, l], [l, l+2m]] is
// [[l+2m, -l], [-l, l+2m]] / (4m(l+m)).
static LAM_MU_INVERSE: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |v| (&v.lam + 2.0 * &v.mu) / (4.0 * &v.mu * (&v.lam + &v.mu)),
        shear: |v| 1.0 / &v.mu,
        coupling: |v| -&v.lam / (4.0 * &v.mu * (&v.lam + &v.mu)),
    },
    three: Entries {
        normal: |v| (&v.lam + &v.mu) / (3.0 * &v.lam * &v.mu + 2.0 * &v.mu * &v.mu),
        shear: |v| 1.0 / &v.mu,
        coupling: |v| -&v.lam / (6.0 * &v.lam * &v.mu + 4.0 * &v.mu * &v.mu),
    },
};

static D_LAM: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |_| Expr::one(),
        shear: |_| Expr::zero(),
        coupling: |_| Expr::one(),
    },
    three: Entries {
        normal: |_| Expr::one(),
        shear: |_| Expr::zero(),
        coupling: |_| Expr::one(),
    },
};

static D_MU: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |_| Expr::Num(2.0),
        shear: |_| Expr::one(),
        coupling: |_| Expr::zero(),
    },
    three: Entries {
        normal: |_| Expr::Num(2.0),
        shear: |_| Expr::one(),
        coupling: |_| Expr::zero(),
    },
};

static VP_VS_RHO: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |v| &v.rho * &v.vp * &v.vp,
        shear: |v| &v.rho * &v.vs * &v.vs,
        coupling: |v| &v.rho * &v.vp * &v.vp - 2.0 * &v.rho * &v.vs * &v.vs,
    },
    three: Entries {
        normal: |v| &v.rho * &v.vp * &v.vp,
        shear: |v| &v.rho * &v.vs * &v.vs,
        coupling: |v| &v.rho * &v.vp * &v.vp - 2.0 * &v.rho * &v.vs * &v.vs,
    },
};

// Same compliance as LAM_MU_INVERSE with lam = rho*(vp^2 - 2vs^2), mu = rho*vs^2.
static VP_VS_RHO_INVERSE: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |v| {
            &v.vp * &v.vp / (4.0 * &v.rho * &v.vs * &v.vs * (&v.vp * &v.vp - &v.vs * &v.vs))
        },
        shear: |v| 1.0 / (&v.rho * &v.vs * &v.vs),
        coupling: |v| {
            -(&v.vp * &v.vp - 2.0 * &v.vs * &v.vs)
                / (4.0 * &v.rho * &v.vs * &v.vs * (&v.vp * &v.vp - &v.vs * &v.vs))
        },
    },
    three: Entries {
        normal: |v| {
            (&v.vp * &v.vp - &v.vs * &v.vs)
                / ((&v.rho * &v.vs * &v.vs) * (3.0 * &v.vp * &v.vp - 4.0 * &v.vs * &v.vs))
        },
        shear: |v| 1.0 / (&v.rho * &v.vs * &v.vs),
        coupling: |v| {
            -(&v.vp * &v.vp - 2.0 * &v.vs * &v.vs)
                / ((&v.rho * &v.vs * &v.vs) * (6.0 * &v.vp * &v.vp - 8.0 * &v.vs * &v.vs))
        },
    },
};

static D_VP: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |v| 2.0 * &v.rho * &v.vp,
        shear: |_| Expr::zero(),
        coupling: |v| 2.0 * &v.rho * &v.vp,
    },
    three: Entries {
        normal: |v| 2.0 * &v.rho * &v.vp,
        shear: |_| Expr::zero(),
        coupling: |v| 2.0 * &v.rho * &v.vp,
    },
};

static D_VS: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |_| Expr::zero(),
        shear: |v| 2.0 * &v.rho * &v.vs,
        coupling: |v| -4.0 * &v.rho * &v.vs,
    },
    three: Entries {
        normal: |_| Expr::zero(),
        shear: |v| 2.0 * &v.rho * &v.vs,
        coupling: |v| -4.0 * &v.rho * &v.vs,
    },
};

static D_RHO: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |v| &v.vp * &v.vp,
        shear: |v| &v.vs * &v.vs,
        coupling: |v| &v.vp * &v.vp - 2.0 * &v.vs * &v.vs,
    },
    three: Entries {
        normal: |v| &v.vp * &v.vp,
        shear: |v| &v.vs * &v.vs,
        coupling: |v| &v.vp * &v.vp - 2.0 * &v.vs * &v.vs,
    },
};

static IP_IS_RHO: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |v| &v.ip * &v.vp,
        shear: |v| &v.is * &v.vs,
        coupling: |v| &v.ip * &v.vp - 2.0 * &v.is * &v.vs,
    },
    three: Entries {
        normal: |v| &v.ip * &v.vp,
        shear: |v| &v.is * &v.vs,
        coupling: |v| &v.ip * &v.vp - 2.0 * &v.is * &v.vs,
    },
};

static D_IP: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |v| v.vp.clone(),
        shear: |_| Expr::zero(),
        coupling: |v| v.vp.clone(),
    },
    three: Entries {
        normal: |v| v.vp.clone(),
        shear: |_| Expr::zero(),
        coupling: |v| v.vp.clone(),
    },
};

static D_IS: SubstitutionTable = SubstitutionTable {
    two: Entries {
        normal: |_| Expr::zero(),
        shear: |v| v.vs.clone(),
        coupling: |v| -2.0 * &v.vs,
    },
    three: Entries {
        normal: |_| Expr::zero(),
        shear: |v| v.vs.clone(),
        coupling: |v| -2.0 * &v.vs,
    },
};
