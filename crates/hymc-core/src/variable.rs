//! Typed variables with rational ranges

use std::fmt;

use crate::num::Rational;

/// Domain of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Integer,
    Real,
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKind::Integer => write!(f, "integer"),
            VarKind::Real => write!(f, "real"),
        }
    }
}

/// A ranged variable. The range is inclusive and `lower <= upper` is an
/// invariant the parser and every pipeline stage maintain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    kind: VarKind,
    lower: Rational,
    upper: Rational,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VarKind, lower: Rational, upper: Rational) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty());
        debug_assert!(lower <= upper);
        Self {
            name,
            kind,
            lower,
            upper,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }

    pub fn lower(&self) -> &Rational {
        &self.lower
    }

    pub fn upper(&self) -> &Rational {
        &self.upper
    }

    /// Width of the range, `upper - lower`.
    pub fn range(&self) -> Rational {
        &self.upper - &self.lower
    }

    /// Check if this is a next-state variable (name ends with ').
    pub fn is_primed(&self) -> bool {
        self.name.ends_with('\'')
    }

    /// The name without a trailing prime marker.
    pub fn base_name(&self) -> &str {
        if self.is_primed() {
            &self.name[..self.name.len() - 1]
        } else {
            &self.name
        }
    }

    /// The next-state image of this variable: same kind and range, primed
    /// name.
    pub fn primed(&self) -> Self {
        Self {
            name: format!("{}'", self.name),
            kind: self.kind,
            lower: self.lower.clone(),
            upper: self.upper.clone(),
        }
    }

    pub(crate) fn set_kind(&mut self, kind: VarKind) {
        self.kind = kind;
    }

    pub(crate) fn set_bounds(&mut self, lower: Rational, upper: Rational) {
        debug_assert!(lower <= upper);
        self.lower = lower;
        self.upper = upper;
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} .. {}",
            self.name, self.kind, self.lower, self.upper
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::Int;

    fn rat(n: i64) -> Rational {
        Rational::from_integer(Int::from(n))
    }

    #[test]
    fn primed_round_trip() {
        let x = Variable::new("x", VarKind::Real, rat(0), rat(1));
        let xp = x.primed();
        assert_eq!(xp.name(), "x'");
        assert!(xp.is_primed());
        assert_eq!(xp.base_name(), "x");
        assert_eq!(xp.kind(), VarKind::Real);
        assert_eq!(xp.lower(), x.lower());
        assert_eq!(xp.upper(), x.upper());
    }

    #[test]
    fn display_matches_grammar() {
        let v = Variable::new(
            "u",
            VarKind::Real,
            Rational::new(Int::from(-1), Int::from(2)),
            rat(2),
        );
        assert_eq!(v.to_string(), "u real -1/2 .. 2");
    }
}
