//! Sparse linear (in)equalities
//!
//! A constraint stores `sum coeffs[v] * v  (op)  -free`, where `op` is `=`
//! for [`ConstraintKind::Eq`] and `>=` for [`ConstraintKind::Ge`]. A `<=`
//! form never reaches storage: the reader multiplies the whole constraint by
//! -1 on ingestion. The coefficient map never holds a zero entry.

use std::collections::BTreeMap;
use std::fmt;

use num_traits::Zero;

use crate::num::Rational;

/// Relation of the linear form to the right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// Equality.
    Eq,
    /// Greater-or-equal.
    Ge,
}

/// A linear constraint over named variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    kind: ConstraintKind,
    coeffs: BTreeMap<String, Rational>,
    free: Rational,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            coeffs: BTreeMap::new(),
            free: Rational::zero(),
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: ConstraintKind) {
        self.kind = kind;
    }

    /// Coefficient of `name`, zero when absent.
    pub fn coeff(&self, name: &str) -> Rational {
        self.coeffs.get(name).cloned().unwrap_or_else(Rational::zero)
    }

    /// Set the coefficient of `name`. Setting zero removes the entry.
    pub fn set_coeff(&mut self, name: &str, coeff: Rational) {
        if coeff.is_zero() {
            self.coeffs.remove(name);
        } else {
            self.coeffs.insert(name.to_string(), coeff);
        }
    }

    /// Add `delta` to the coefficient of `name`.
    pub fn add_coeff(&mut self, name: &str, delta: Rational) {
        let sum = self.coeff(name) + delta;
        self.set_coeff(name, sum);
    }

    /// The free term. The textual right-hand side is `-free`.
    pub fn free(&self) -> &Rational {
        &self.free
    }

    pub fn set_free(&mut self, free: Rational) {
        self.free = free;
    }

    /// Variables mentioned with a nonzero coefficient, in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.coeffs.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Multiply every coefficient and the free term by a nonzero rational.
    ///
    /// Multiplying a `Ge` constraint by a negative factor flips the
    /// direction of the underlying inequality; callers own that semantic
    /// shift (the reader relies on it to normalize `<=`).
    pub fn mult(&mut self, factor: &Rational) {
        assert!(!factor.is_zero(), "constraint multiplied by zero");
        for coeff in self.coeffs.values_mut() {
            *coeff *= factor;
        }
        self.free *= factor;
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, coeff)) in self.coeffs.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{coeff} {name}")?;
        }
        let op = match self.kind {
            ConstraintKind::Eq => "=",
            ConstraintKind::Ge => ">=",
        };
        write!(f, " {op} {}", -&self.free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::Int;

    fn rat(n: i64, d: i64) -> Rational {
        Rational::new(Int::from(n), Int::from(d))
    }

    #[test]
    fn absent_coefficient_is_zero() {
        let c = Constraint::new(ConstraintKind::Ge);
        assert!(c.coeff("x").is_zero());
    }

    #[test]
    fn setting_zero_removes_entry() {
        let mut c = Constraint::new(ConstraintKind::Ge);
        c.set_coeff("x", rat(3, 1));
        c.set_coeff("x", rat(0, 1));
        assert_eq!(c.names().count(), 0);
    }

    #[test]
    fn add_coeff_cancellation_keeps_sparsity() {
        let mut c = Constraint::new(ConstraintKind::Eq);
        c.add_coeff("x", rat(2, 3));
        c.add_coeff("x", rat(-2, 3));
        assert!(c.is_empty());
    }

    #[test]
    fn mult_scales_everything() {
        let mut c = Constraint::new(ConstraintKind::Ge);
        c.set_coeff("x", rat(1, 2));
        c.set_free(rat(-1, 4));
        c.mult(&rat(4, 1));
        assert_eq!(c.coeff("x"), rat(2, 1));
        assert_eq!(c.free(), &rat(-1, 1));
    }

    #[test]
    #[should_panic]
    fn mult_by_zero_panics() {
        let mut c = Constraint::new(ConstraintKind::Ge);
        c.set_coeff("x", rat(1, 1));
        c.mult(&rat(0, 1));
    }

    #[test]
    fn display_matches_grammar() {
        let mut c = Constraint::new(ConstraintKind::Ge);
        c.set_coeff("x", rat(1, 4));
        c.set_coeff("delta_x", rat(1, 1));
        c.set_free(rat(-1, 2));
        assert_eq!(c.to_string(), "1 delta_x + 1/4 x >= 1/2");
    }
}
