//! Algebraic canonicalization
//!
//! Expressions are normalized into an expanded sum of monomials. A monomial is
//! a product of atoms raised to numeric exponents, where an atom is a variable,
//! a function application, an unexpandable sum or a symbolic power, each
//! identified by its canonical rendering. Every coefficient is either a number
//! or a free parameter.
//!
//! Free parameters absorb anything constant they are combined with, so
//! `C*C`, `C+C`, `sin(C)`, `C**2` and `2*C` all collapse to a single `C`, and
//! `C*X1 + 2*X1` collapses to `C*X1`. The output therefore carries one `C` per
//! independent parameter.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::EvaluationError;
use crate::evaluator::expr::{BinaryOp, Expr, Function};

/// Products with more terms than this are kept factored
const MAX_TERMS: usize = 64;

/// Largest integer power expanded by repeated multiplication
const MAX_EXPANDED_POWER: i32 = 4;

const ZERO_EPS: f64 = 1e-12;

/// Canonical string of `expr`, with a bare `C` per free parameter
pub fn canonicalize(expr: &Expr) -> Result<String, EvaluationError> {
    Ok(Poly::from_expr(expr)?.render())
}

/// Format a number the way canonical strings carry them
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:?}", v)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Coeff {
    Num(f64),
    Param,
}

impl Coeff {
    fn add(self, other: Self) -> Self {
        match (self, other) {
            (Self::Num(a), Self::Num(b)) => Self::Num(a + b),
            _ => Self::Param,
        }
    }

    fn mul(self, other: Self) -> Self {
        match (self, other) {
            (Self::Num(a), Self::Num(b)) => Self::Num(a * b),
            (Self::Num(a), Self::Param) | (Self::Param, Self::Num(a)) if a == 0.0 => Self::Num(0.0),
            _ => Self::Param,
        }
    }

    fn is_zero(self) -> bool {
        matches!(self, Self::Num(a) if a.abs() < ZERO_EPS)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Exponent(f64);

impl Exponent {
    fn snapped(v: f64) -> Self {
        if (v - v.round()).abs() < 1e-9 {
            Self(v.round())
        } else {
            Self(v)
        }
    }
}

impl Eq for Exponent {}

impl PartialOrd for Exponent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Exponent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

type Monomial = BTreeMap<String, Exponent>;

#[derive(Clone, Debug, PartialEq, Default)]
struct Poly {
    terms: BTreeMap<Monomial, Coeff>,
}

fn degenerate(message: impl Into<String>) -> EvaluationError {
    EvaluationError::Degenerate(message.into())
}

fn checked(v: f64, what: &str) -> Result<f64, EvaluationError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(degenerate(what.to_string()))
    }
}

impl Poly {
    fn constant(c: Coeff) -> Self {
        let mut poly = Self::default();
        if !c.is_zero() {
            poly.terms.insert(Monomial::new(), c);
        }
        poly
    }

    fn num(v: f64) -> Self {
        Self::constant(Coeff::Num(v))
    }

    fn param() -> Self {
        Self::constant(Coeff::Param)
    }

    fn atom(key: String, exponent: f64) -> Self {
        let mut mono = Monomial::new();
        mono.insert(key, Exponent(exponent));
        let mut poly = Self::default();
        poly.terms.insert(mono, Coeff::Num(1.0));
        poly
    }

    fn from_expr(expr: &Expr) -> Result<Self, EvaluationError> {
        match expr {
            Expr::Num(v) => Ok(Self::num(checked(*v, "non-finite literal")?)),
            Expr::Var(i) => Ok(Self::atom(format!("X{}", i + 1), 1.0)),
            Expr::Param(_) => Ok(Self::param()),
            Expr::Neg(a) => Ok(Self::from_expr(a)?.neg()),
            Expr::Binary(op, a, b) => {
                let a = Self::from_expr(a)?;
                let b = Self::from_expr(b)?;
                match op {
                    BinaryOp::Add => Ok(a.add(b)),
                    BinaryOp::Sub => Ok(a.add(b.neg())),
                    BinaryOp::Mul => Ok(a.mul(&b)),
                    BinaryOp::Div => Ok(a.mul(&b.recip()?)),
                    BinaryOp::Pow => a.pow(&b),
                }
            }
            Expr::Call(f, a) => Self::call(*f, Self::from_expr(a)?),
        }
    }

    /// The constant value if this polynomial has no non-constant term
    fn as_constant(&self) -> Option<Coeff> {
        match self.terms.len() {
            0 => Some(Coeff::Num(0.0)),
            1 => self
                .terms
                .iter()
                .next()
                .filter(|(mono, _)| mono.is_empty())
                .map(|(_, c)| *c),
            _ => None,
        }
    }

    fn single_term(&self) -> Option<(&Monomial, Coeff)> {
        if self.terms.len() == 1 {
            self.terms.iter().next().map(|(m, c)| (m, *c))
        } else {
            None
        }
    }

    fn insert_term(&mut self, mono: Monomial, coeff: Coeff) {
        let merged = match self.terms.remove(&mono) {
            Some(existing) => existing.add(coeff),
            None => coeff,
        };
        if !merged.is_zero() {
            self.terms.insert(mono, merged);
        }
    }

    fn add(mut self, other: Self) -> Self {
        for (mono, coeff) in other.terms {
            self.insert_term(mono, coeff);
        }
        self
    }

    fn neg(self) -> Self {
        let terms = self
            .terms
            .into_iter()
            .map(|(m, c)| match c {
                Coeff::Num(v) => (m, Coeff::Num(-v)),
                Coeff::Param => (m, Coeff::Param),
            })
            .collect();
        Self { terms }
    }

    /// Wrap as a single opaque atom
    fn factored(&self) -> Self {
        if self.terms.len() <= 1 {
            return self.clone();
        }
        Self::atom(format!("({})", self.render()), 1.0)
    }

    fn mul(&self, other: &Self) -> Self {
        if self.terms.len() * other.terms.len() > MAX_TERMS {
            return self.factored().mul(&other.factored());
        }
        let mut out = Self::default();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                let mut mono = ma.clone();
                for (key, e) in mb {
                    let sum = Exponent::snapped(mono.get(key).map_or(0.0, |x| x.0) + e.0);
                    if sum.0 == 0.0 {
                        mono.remove(key);
                    } else {
                        mono.insert(key.clone(), sum);
                    }
                }
                out.insert_term(mono, ca.mul(*cb));
            }
        }
        out
    }

    fn recip(&self) -> Result<Self, EvaluationError> {
        match self.as_constant() {
            Some(Coeff::Num(v)) if v.abs() < ZERO_EPS => Err(degenerate("division by zero")),
            Some(Coeff::Num(v)) => Ok(Self::num(checked(1.0 / v, "division overflow")?)),
            Some(Coeff::Param) => Ok(Self::param()),
            None => match self.single_term() {
                Some((mono, coeff)) => {
                    let coeff = match coeff {
                        Coeff::Num(c) => Coeff::Num(checked(1.0 / c, "division overflow")?),
                        Coeff::Param => Coeff::Param,
                    };
                    let mono = mono.iter().map(|(k, e)| (k.clone(), Exponent(-e.0))).collect();
                    let mut out = Self::default();
                    out.terms.insert(mono, coeff);
                    Ok(out)
                }
                None => Ok(Self::atom(format!("({})", self.render()), -1.0)),
            },
        }
    }

    /// Rendering usable as a power base or exponent without extra parentheses
    fn atomic(&self) -> String {
        if let Some((mono, Coeff::Num(c))) = self.single_term() {
            if c == 1.0 && mono.len() == 1 {
                if let Some((key, e)) = mono.iter().next() {
                    if e.0 == 1.0 {
                        return key.clone();
                    }
                }
            }
        }
        match self.as_constant() {
            Some(Coeff::Param) => "C".to_string(),
            Some(Coeff::Num(v)) if v >= 0.0 => format_number(v),
            _ => format!("({})", self.render()),
        }
    }

    fn pow(&self, exponent: &Self) -> Result<Self, EvaluationError> {
        let symbolic = || Self::atom(format!("({}**{})", self.atomic(), exponent.atomic()), 1.0);

        let n = match exponent.as_constant() {
            Some(Coeff::Num(n)) => n,
            Some(Coeff::Param) => {
                return Ok(match self.as_constant() {
                    Some(_) => Self::param(),
                    None => symbolic(),
                })
            }
            None => return Ok(symbolic()),
        };

        if n == 0.0 {
            return Ok(Self::num(1.0));
        }
        match self.as_constant() {
            Some(Coeff::Num(v)) => return Ok(Self::num(checked(v.powf(n), "undefined power")?)),
            Some(Coeff::Param) => return Ok(Self::param()),
            None => {}
        }

        if let Some((mono, coeff)) = self.single_term() {
            let coeff = match coeff {
                Coeff::Num(c) => Coeff::Num(c.powf(n)),
                Coeff::Param => Coeff::Param,
            };
            // A negative coefficient under a fractional power stays symbolic
            if let Coeff::Num(c) = coeff {
                if !c.is_finite() {
                    return Ok(symbolic());
                }
            }
            let mono = mono
                .iter()
                .map(|(k, e)| (k.clone(), Exponent::snapped(e.0 * n)))
                .collect();
            let mut out = Self::default();
            out.terms.insert(mono, coeff);
            return Ok(out);
        }

        if n.fract() == 0.0 && n > 0.0 && n <= f64::from(MAX_EXPANDED_POWER) {
            let mut out = self.clone();
            for _ in 1..(n as i32) {
                out = out.mul(self);
            }
            return Ok(out);
        }
        Ok(Self::atom(format!("({})", self.render()), n))
    }

    fn call(f: Function, arg: Self) -> Result<Self, EvaluationError> {
        match arg.as_constant() {
            Some(Coeff::Num(v)) => {
                return Ok(Self::num(checked(
                    f.apply(v),
                    &format!("{} undefined at {}", f.name(), v),
                )?))
            }
            Some(Coeff::Param) => return Ok(Self::param()),
            None => {}
        }
        if f == Function::Sqrt {
            return arg.pow(&Self::num(0.5));
        }
        Ok(Self::atom(format!("{}({})", f.name(), arg.render()), 1.0))
    }

    fn render(&self) -> String {
        // Highest total degree first, constant term last
        let mut ordered: Vec<(&Monomial, &Coeff)> = self.terms.iter().collect();
        ordered.sort_by(|(ma, _), (mb, _)| {
            let degree = |m: &Monomial| m.values().map(|e| e.0).sum::<f64>();
            ma.is_empty()
                .cmp(&mb.is_empty())
                .then_with(|| degree(mb).total_cmp(&degree(ma)))
                .then_with(|| ma.cmp(mb))
        });
        let parts: Vec<String> = ordered
            .into_iter()
            .map(|(mono, coeff)| render_term(mono, *coeff))
            .collect();

        let mut out = String::new();
        for (i, part) in parts.iter().enumerate() {
            if i == 0 {
                out.push_str(part);
            } else if let Some(rest) = part.strip_prefix('-') {
                out.push_str(" - ");
                out.push_str(rest);
            } else {
                out.push_str(" + ");
                out.push_str(part);
            }
        }
        if out.is_empty() {
            out.push('0');
        }
        out
    }
}

fn render_factor(key: &str, e: f64) -> String {
    if e == 1.0 {
        key.to_string()
    } else {
        format!("{}**{}", key, format_number(e))
    }
}

fn render_term(mono: &Monomial, coeff: Coeff) -> String {
    let (sign, magnitude) = match coeff {
        Coeff::Num(c) if c < 0.0 => ("-", Coeff::Num(-c)),
        c => ("", c),
    };

    let mut numerator: Vec<String> = Vec::new();
    match magnitude {
        Coeff::Num(c) if c == 1.0 => {}
        Coeff::Num(c) => numerator.push(format_number(c)),
        Coeff::Param => numerator.push("C".to_string()),
    }
    let mut denominator: Vec<String> = Vec::new();
    for (key, e) in mono {
        if e.0 > 0.0 {
            numerator.push(render_factor(key, e.0));
        } else {
            denominator.push(render_factor(key, -e.0));
        }
    }

    let num = if numerator.is_empty() {
        "1".to_string()
    } else {
        numerator.join("*")
    };
    let body = match denominator.len() {
        0 => num,
        1 => format!("{}/{}", num, denominator[0]),
        _ => format!("{}/({})", num, denominator.join("*")),
    };
    format!("{}{}", sign, body)
}

/// Replace each standalone `C` with the next value of `params`
pub fn substitute_params(canonical: &str, params: &[f64]) -> String {
    let mut out = String::with_capacity(canonical.len() + params.len() * 8);
    let mut values = params.iter();
    let mut chars = canonical.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start + c.len_utf8();
            while let Some(&(i, n)) = chars.peek() {
                if n.is_ascii_alphanumeric() || n == '_' {
                    end = i + n.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let ident = &canonical[start..end];
            let value = if ident == "C" { values.next() } else { None };
            match value {
                Some(&v) if v < 0.0 => out.push_str(&format!("({})", format_number(v))),
                Some(&v) => out.push_str(&format_number(v)),
                None => out.push_str(ident),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(s: &str) -> String {
        canonicalize(&Expr::parse(s).unwrap()).unwrap()
    }

    #[test]
    fn test_constant_pruning() {
        assert_eq!(canon("C*C"), "C");
        assert_eq!(canon("C+C"), "C");
        assert_eq!(canon("sin(C)"), "C");
        assert_eq!(canon("C**2"), "C");
        assert_eq!(canon("2*C"), "C");
        assert_eq!(canon("(C*X1)+(C*X1)"), "C*X1");
        assert_eq!(canon("C*X1 + 2*X1"), "C*X1");
    }

    #[test]
    fn test_expansion_and_collection() {
        assert_eq!(canon("(X1+X1)"), "2*X1");
        assert_eq!(canon("X1*(X1+1)"), "X1**2 + X1");
        assert_eq!(canon("(X1+1)**2"), "X1**2 + 2*X1 + 1");
        assert_eq!(canon("X1 - X1"), "0");
        assert_eq!(canon("X1/X1"), "1");
    }

    #[test]
    fn test_functions_and_signs() {
        assert_eq!(canon("(C+(C*X1))-sin(X1)"), "C*X1 - sin(X1) + C");
        assert_eq!(canon("sqrt(X1)"), "X1**0.5");
        assert_eq!(canon("exp(X1+C)"), "exp(X1 + C)");
        assert_eq!(canon("sin(0)"), "0");
    }

    #[test]
    fn test_division_rendering() {
        assert_eq!(canon("X1/X2"), "X1/X2");
        assert_eq!(canon("1/(X1*X2)"), "1/(X1*X2)");
        assert_eq!(canon("X1/(X1+1)"), "X1/(X1 + 1)");
    }

    #[test]
    fn test_degenerate_forms() {
        for s in ["X1/0", "log(0)", "log(-1)", "sqrt(-4)", "X1/(X2-X2)"] {
            let result = canonicalize(&Expr::parse(s).unwrap());
            assert!(
                matches!(result, Err(EvaluationError::Degenerate(_))),
                "{} should be degenerate, got {:?}",
                s,
                result
            );
        }
    }

    #[test]
    fn test_canonical_output_reparses() {
        for s in ["(X1+C)*(X2-C)/(X1+X2)", "exp(X1)**C", "X1**X2 + cos(X1*X2)"] {
            let c = canon(s);
            assert!(Expr::parse(&c).is_ok(), "{} -> {}", s, c);
        }
    }

    #[test]
    fn test_substitute_params() {
        assert_eq!(substitute_params("C*X1 + C", &[2.0, -0.5]), "2*X1 + (-0.5)");
        assert_eq!(substitute_params("cos(C*X1)", &[3.0]), "cos(3*X1)");
        assert_eq!(substitute_params("X1", &[]), "X1");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(1e-20), "1e-20");
    }
}
