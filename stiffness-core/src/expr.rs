//! Minimal symbolic expressions.
//!
//! Stiffness entries, physical parameters and wavefield components are all
//! represented by [`Expr`]. The algebra is intentionally small: sums,
//! products, integer powers and first-order spatial derivatives, which is all
//! the constitutive tables and the Voigt operators need.
//!
//! Constructors keep expressions in a light canonical form:
//! - nested sums/products are flattened
//! - numeric constants are folded (one leading coefficient per product)
//! - like terms in a sum are collected, zero terms dropped
//!
//! There is no reordering of operands, so two expressions built the same way
//! compare equal structurally.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A symbolic scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Num(f64),
    /// Constant named symbol (e.g. the skeleton entry `C12`).
    Symbol(String),
    /// Spatially varying named quantity (e.g. `vp` or a wavefield component).
    Function(String),
    /// First derivative of a function (or of another derivative) along an axis.
    Derivative(Box<Expr>, String),
    /// Sum of at least two terms.
    Add(Vec<Expr>),
    /// Product of at least two factors; a numeric coefficient, if any, comes first.
    Mul(Vec<Expr>),
    /// Integer power.
    Pow(Box<Expr>, i32),
}

impl Expr {
    /// The literal zero.
    pub fn zero() -> Self {
        Expr::Num(0.0)
    }

    /// The literal one.
    pub fn one() -> Self {
        Expr::Num(1.0)
    }

    /// Named constant symbol.
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    /// Named spatially varying function.
    pub fn function(name: impl Into<String>) -> Self {
        Expr::Function(name.into())
    }

    /// Whether this is the literal zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Num(v) if *v == 0.0)
    }

    /// Numeric value if the expression is a literal.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Expr::Num(v) => Some(*v),
            _ => None,
        }
    }

    /// Name of a symbol or function, `None` for compound expressions.
    pub fn name(&self) -> Option<&str> {
        match self {
            Expr::Symbol(name) | Expr::Function(name) => Some(name),
            _ => None,
        }
    }

    /// Canonical sum.
    pub fn sum(terms: impl IntoIterator<Item = Expr>) -> Expr {
        let mut constant = 0.0;
        let mut collected: Vec<(f64, Expr)> = Vec::new();

        let mut push = |term: Expr, constant: &mut f64| match term {
            Expr::Num(v) => *constant += v,
            other => {
                let (coeff, rest) = other.split_coefficient();
                match collected.iter_mut().find(|(_, r)| *r == rest) {
                    Some((c, _)) => *c += coeff,
                    None => collected.push((coeff, rest)),
                }
            }
        };

        for term in terms {
            match term {
                Expr::Add(inner) => {
                    for t in inner {
                        push(t, &mut constant);
                    }
                }
                other => push(other, &mut constant),
            }
        }

        let mut out: Vec<Expr> = Vec::with_capacity(collected.len() + 1);
        if constant != 0.0 {
            out.push(Expr::Num(constant));
        }
        for (coeff, rest) in collected {
            if coeff == 0.0 {
                continue;
            }
            out.push(Expr::product([Expr::Num(coeff), rest]));
        }

        match out.len() {
            0 => Expr::zero(),
            1 => out.remove(0),
            _ => Expr::Add(out),
        }
    }

    /// Canonical product.
    pub fn product(factors: impl IntoIterator<Item = Expr>) -> Expr {
        let mut coeff = 1.0;
        let mut out = Vec::new();

        for factor in factors {
            match factor {
                Expr::Num(v) => coeff *= v,
                Expr::Mul(inner) => {
                    for f in inner {
                        match f {
                            Expr::Num(v) => coeff *= v,
                            other => out.push(other),
                        }
                    }
                }
                other => out.push(other),
            }
        }

        if coeff == 0.0 {
            return Expr::zero();
        }
        if out.is_empty() {
            return Expr::Num(coeff);
        }
        if coeff != 1.0 {
            out.insert(0, Expr::Num(coeff));
        }
        if out.len() == 1 {
            out.remove(0)
        } else {
            Expr::Mul(out)
        }
    }

    /// Canonical integer power.
    pub fn pow(self, exp: i32) -> Expr {
        match (self, exp) {
            (_, 0) => Expr::one(),
            (base, 1) => base,
            (Expr::Num(v), e) => Expr::Num(v.powi(e)),
            (Expr::Pow(base, inner), e) => (*base).pow(inner * e),
            (base, e) => Expr::Pow(Box::new(base), e),
        }
    }

    /// Multiplicative inverse.
    pub fn recip(self) -> Expr {
        self.pow(-1)
    }

    /// Split into (numeric coefficient, remaining factor).
    fn split_coefficient(self) -> (f64, Expr) {
        match self {
            Expr::Mul(mut factors) => {
                if let Some(c) = factors.first().and_then(Expr::as_num) {
                    factors.remove(0);
                    (c, Expr::product(factors))
                } else {
                    (1.0, Expr::Mul(factors))
                }
            }
            other => (1.0, other),
        }
    }

    /// First derivative along the named axis.
    ///
    /// Constants and symbols are independent of space. Functions produce
    /// [`Expr::Derivative`] nodes; sums, products and powers follow the usual
    /// rules.
    pub fn diff(&self, axis: &str) -> Expr {
        match self {
            Expr::Num(_) | Expr::Symbol(_) => Expr::zero(),
            Expr::Function(_) | Expr::Derivative(..) => {
                Expr::Derivative(Box::new(self.clone()), axis.to_string())
            }
            Expr::Add(terms) => Expr::sum(terms.iter().map(|t| t.diff(axis))),
            Expr::Mul(factors) => Expr::sum((0..factors.len()).map(|k| {
                Expr::product(factors.iter().enumerate().map(|(i, f)| {
                    if i == k {
                        f.diff(axis)
                    } else {
                        f.clone()
                    }
                }))
            })),
            Expr::Pow(base, n) => Expr::product([
                Expr::Num(f64::from(*n)),
                base.as_ref().clone().pow(n - 1),
                base.diff(axis),
            ]),
        }
    }

    /// Replace named symbols by expressions.
    ///
    /// Functions and derivatives are left untouched.
    pub fn subs(&self, table: &BTreeMap<String, Expr>) -> Expr {
        match self {
            Expr::Symbol(name) => table.get(name).cloned().unwrap_or_else(|| self.clone()),
            Expr::Num(_) | Expr::Function(_) | Expr::Derivative(..) => self.clone(),
            Expr::Add(terms) => Expr::sum(terms.iter().map(|t| t.subs(table))),
            Expr::Mul(factors) => Expr::product(factors.iter().map(|f| f.subs(table))),
            Expr::Pow(base, n) => base.subs(table).pow(*n),
        }
    }

    /// Names of all constant symbols in the expression.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Num(_) | Expr::Function(_) => {}
            Expr::Derivative(inner, _) => inner.collect_symbols(out),
            Expr::Add(items) | Expr::Mul(items) => {
                for item in items {
                    item.collect_symbols(out);
                }
            }
            Expr::Pow(base, _) => base.collect_symbols(out),
        }
    }

    /// Evaluate numerically, looking symbols and functions up by name.
    ///
    /// # Errors
    ///
    /// - [`Error::UnboundSymbol`] if a name has no value
    /// - [`Error::NotNumeric`] for derivative nodes
    pub fn eval(&self, values: &BTreeMap<String, f64>) -> Result<f64> {
        match self {
            Expr::Num(v) => Ok(*v),
            Expr::Symbol(name) | Expr::Function(name) => values
                .get(name)
                .copied()
                .ok_or_else(|| Error::UnboundSymbol(name.clone())),
            Expr::Derivative(..) => Err(Error::NotNumeric(self.to_string())),
            Expr::Add(terms) => terms.iter().try_fold(0.0, |acc, t| Ok(acc + t.eval(values)?)),
            Expr::Mul(factors) => factors
                .iter()
                .try_fold(1.0, |acc, f| Ok(acc * f.eval(values)?)),
            Expr::Pow(base, n) => Ok(base.eval(values)?.powi(*n)),
        }
    }

    /// Negated copy when this term carries a negative leading coefficient.
    fn negated_if_negative(&self) -> Option<Expr> {
        match self {
            Expr::Num(v) if *v < 0.0 => Some(Expr::Num(-v)),
            Expr::Mul(factors) => match factors.first() {
                Some(Expr::Num(c)) if *c < 0.0 => Some(Expr::product(
                    std::iter::once(Expr::Num(-c)).chain(factors[1..].iter().cloned()),
                )),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Default for Expr {
    fn default() -> Self {
        Expr::zero()
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::Num(v)
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Num(f64::from(v))
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::product([Expr::Num(-1.0), self])
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        -self.clone()
    }
}

impl std::iter::Sum for Expr {
    fn sum<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        Expr::sum(iter)
    }
}

fn add_exprs(a: Expr, b: Expr) -> Expr {
    Expr::sum([a, b])
}

fn sub_exprs(a: Expr, b: Expr) -> Expr {
    Expr::sum([a, -b])
}

fn mul_exprs(a: Expr, b: Expr) -> Expr {
    Expr::product([a, b])
}

fn div_exprs(a: Expr, b: Expr) -> Expr {
    Expr::product([a, b.recip()])
}

macro_rules! impl_binary_op {
    ($op:ident, $method:ident, $func:ident) => {
        impl $op<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $func(self, rhs)
            }
        }

        impl $op<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $func(self, rhs.clone())
            }
        }

        impl $op<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $func(self.clone(), rhs)
            }
        }

        impl $op<&Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $func(self.clone(), rhs.clone())
            }
        }

        impl $op<f64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                $func(self, Expr::Num(rhs))
            }
        }

        impl $op<f64> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                $func(self.clone(), Expr::Num(rhs))
            }
        }

        impl $op<Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $func(Expr::Num(self), rhs)
            }
        }

        impl $op<&Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $func(Expr::Num(self), rhs.clone())
            }
        }
    };
}

impl_binary_op!(Add, add, add_exprs);
impl_binary_op!(Sub, sub, sub_exprs);
impl_binary_op!(Mul, mul, mul_exprs);
impl_binary_op!(Div, div, div_exprs);

fn fmt_num(v: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        write!(f, "{}", v as i64)
    } else {
        write!(f, "{v}")
    }
}

/// Factor inside a product: sums need parentheses.
fn fmt_factor(e: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match e {
        Expr::Add(_) => write!(f, "({e})"),
        _ => write!(f, "{e}"),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) => fmt_num(*v, f),
            Expr::Symbol(name) | Expr::Function(name) => write!(f, "{name}"),
            Expr::Derivative(inner, axis) => write!(f, "Derivative({inner}, {axis})"),
            Expr::Add(terms) => {
                for (k, term) in terms.iter().enumerate() {
                    match (k, term.negated_if_negative()) {
                        (0, _) => write!(f, "{term}")?,
                        (_, Some(positive)) => write!(f, " - {positive}")?,
                        (_, None) => write!(f, " + {term}")?,
                    }
                }
                Ok(())
            }
            Expr::Mul(factors) => {
                let (den, num): (Vec<&Expr>, Vec<&Expr>) = factors
                    .iter()
                    .partition(|e| matches!(e, Expr::Pow(_, n) if *n < 0));

                let mut rest: &[&Expr] = &num;
                if let Some(Expr::Num(c)) = num.first() {
                    if *c == -1.0 && num.len() > 1 {
                        write!(f, "-")?;
                        rest = &num[1..];
                    }
                }
                if rest.is_empty() {
                    write!(f, "1")?;
                }
                for (k, factor) in rest.iter().enumerate() {
                    if k > 0 {
                        write!(f, "*")?;
                    }
                    fmt_factor(factor, f)?;
                }

                if !den.is_empty() {
                    let den = Expr::product(den.into_iter().map(|e| e.clone().recip()));
                    match den {
                        Expr::Symbol(_) | Expr::Function(_) | Expr::Num(_) => write!(f, "/{den}")?,
                        _ => write!(f, "/({den})")?,
                    }
                }
                Ok(())
            }
            Expr::Pow(base, n) if *n < 0 => {
                let positive = base.as_ref().clone().pow(-n);
                match positive {
                    Expr::Symbol(_) | Expr::Function(_) | Expr::Num(_) => write!(f, "1/{positive}"),
                    _ => write!(f, "1/({positive})"),
                }
            }
            Expr::Pow(base, n) => match base.as_ref() {
                Expr::Symbol(_) | Expr::Function(_) | Expr::Num(_) => write!(f, "{base}**{n}"),
                _ => write!(f, "({base})**{n}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn values(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_constant_folding() {
        let e = Expr::from(2.0) * 3.0 + 1.0;
        assert_eq!(e, Expr::Num(7.0));
    }

    #[test]
    fn test_like_terms_cancel() {
        let rho = Expr::function("rho");
        let vs = Expr::function("vs");
        let e = &rho * &vs * &vs - &rho * &vs * &vs;
        assert!(e.is_zero());

        let x = Expr::symbol("x");
        assert_eq!(&x + &x, Expr::Mul(vec![Expr::Num(2.0), x.clone()]));
    }

    #[test]
    fn test_zero_product() {
        let e = Expr::symbol("a") * 0.0;
        assert!(e.is_zero());
    }

    #[test]
    fn test_eval_compliance_expression() {
        let lam = Expr::function("lam");
        let mu = Expr::function("mu");
        let e = (&lam + &mu) / (3.0 * &lam * &mu + 2.0 * &mu * &mu);
        let v = e.eval(&values(&[("lam", 2.0), ("mu", 1.0)])).unwrap();
        assert_relative_eq!(v, 3.0 / 8.0, epsilon = 1e-14);
    }

    #[test]
    fn test_eval_unbound() {
        let e = Expr::symbol("C11") + 1.0;
        assert_eq!(
            e.eval(&BTreeMap::new()),
            Err(Error::UnboundSymbol("C11".into()))
        );
    }

    #[test]
    fn test_diff_rules() {
        let u = Expr::function("u");
        assert!(Expr::symbol("C11").diff("x").is_zero());
        assert!(Expr::Num(4.0).diff("x").is_zero());

        let du = u.diff("x");
        assert_eq!(du, Expr::Derivative(Box::new(u.clone()), "x".into()));

        assert_eq!((3.0 * &u).diff("x"), Expr::Mul(vec![Expr::Num(3.0), du.clone()]));
        assert_eq!((&u + Expr::symbol("C11")).diff("x"), du);

        // Product rule keeps one term per factor.
        let v = Expr::function("v");
        let d = (&u * &v).diff("x");
        assert_eq!(
            d,
            Expr::Add(vec![
                Expr::Mul(vec![du.clone(), v.clone()]),
                Expr::Mul(vec![u.clone(), v.diff("x")]),
            ])
        );
    }

    #[test]
    fn test_derivative_not_numeric() {
        let d = Expr::function("u").diff("y");
        assert!(matches!(d.eval(&BTreeMap::new()), Err(Error::NotNumeric(_))));
    }

    #[test]
    fn test_subs_and_free_symbols() {
        let e = Expr::symbol("C11") + Expr::symbol("C12") * 2.0;
        assert_eq!(
            e.free_symbols().into_iter().collect::<Vec<_>>(),
            vec!["C11".to_string(), "C12".to_string()]
        );

        let table: BTreeMap<String, Expr> =
            [("C11".to_string(), Expr::Num(1.0)), ("C12".to_string(), Expr::Num(3.0))]
                .into_iter()
                .collect();
        assert_eq!(e.subs(&table), Expr::Num(7.0));
    }

    #[test]
    fn test_display() {
        let vp = Expr::function("vp");
        let vs = Expr::function("vs");
        let rho = Expr::function("rho");
        let e = &rho * &vp * &vp - 2.0 * &rho * &vs * &vs;
        assert_eq!(e.to_string(), "rho*vp*vp - 2*rho*vs*vs");

        let inv = Expr::Num(1.0) / (&rho * &vs * &vs);
        assert_eq!(inv.to_string(), "1/(rho*vs*vs)");
    }
}
