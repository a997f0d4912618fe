//! The heterogeneous problem container
//!
//! A [`Problem`] owns flat arenas of variables and constraints plus index
//! lists that carve them into groups: four variable groups (input, state,
//! next-state, output) and three constraint groups (init, trans, spec).
//! Each constraint group additionally carries a *scope*: the ordered list of
//! variable indices its constraints may mention.
//!
//! Scopes are maintained automatically:
//! - every variable joins the TRANS scope on insertion;
//! - state variables also join the INIT and SPEC scopes;
//! - adding a state variable adds its primed next-state twin as well.
//!
//! Scope lists are insertion-ordered, which is what the projection stages
//! rely on: output variables are parsed last and so form the trailing block
//! of the TRANS scope, and quantization residuals are appended after every
//! original variable and so form the trailing block of every scope.

use std::fmt;

use crate::constraint::Constraint;
use crate::error::{McError, McResult};
use crate::variable::Variable;

/// Variable group selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarGroup {
    Input,
    State,
    NextState,
    Output,
}

impl VarGroup {
    /// All groups, in container order.
    pub const ALL: [VarGroup; 4] = [
        VarGroup::Input,
        VarGroup::State,
        VarGroup::NextState,
        VarGroup::Output,
    ];

    /// Group for a numeric selector.
    pub fn from_index(idx: usize) -> McResult<Self> {
        Self::ALL
            .get(idx)
            .copied()
            .ok_or(McError::GroupOutOfRange(idx))
    }

    fn slot(self) -> usize {
        match self {
            VarGroup::Input => 0,
            VarGroup::State => 1,
            VarGroup::NextState => 2,
            VarGroup::Output => 3,
        }
    }
}

/// Constraint group selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstrGroup {
    Init,
    Trans,
    Spec,
}

impl ConstrGroup {
    /// All groups, in container order.
    pub const ALL: [ConstrGroup; 3] = [ConstrGroup::Init, ConstrGroup::Trans, ConstrGroup::Spec];

    /// Group for a numeric selector.
    pub fn from_index(idx: usize) -> McResult<Self> {
        Self::ALL
            .get(idx)
            .copied()
            .ok_or(McError::GroupOutOfRange(idx))
    }

    fn slot(self) -> usize {
        match self {
            ConstrGroup::Init => 0,
            ConstrGroup::Trans => 1,
            ConstrGroup::Spec => 2,
        }
    }
}

/// Input data representation: variables, constraints, groups, and scopes.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    vars: Vec<Variable>,
    var_groups: [Vec<usize>; 4],
    constrs: Vec<Constraint>,
    constr_groups: [Vec<usize>; 3],
    scopes: [Vec<usize>; 3],
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    // --- variables ---

    /// Total number of variables across all groups.
    pub fn var_count_total(&self) -> usize {
        self.vars.len()
    }

    /// Variable at a global index.
    pub fn var_global(&self, idx: usize) -> &Variable {
        &self.vars[idx]
    }

    /// Number of variables in a group.
    pub fn var_count(&self, group: VarGroup) -> usize {
        self.var_groups[group.slot()].len()
    }

    /// Variable at a position within a group.
    pub fn var_at(&self, group: VarGroup, idx: usize) -> &Variable {
        &self.vars[self.var_groups[group.slot()][idx]]
    }

    pub(crate) fn var_at_mut(&mut self, group: VarGroup, idx: usize) -> &mut Variable {
        let global = self.var_groups[group.slot()][idx];
        &mut self.vars[global]
    }

    /// Variables of a group, in insertion order.
    pub fn vars(&self, group: VarGroup) -> impl Iterator<Item = &Variable> {
        self.var_groups[group.slot()].iter().map(|&i| &self.vars[i])
    }

    /// Whether any group declares a variable with this name.
    pub fn has_var(&self, name: &str) -> bool {
        self.vars.iter().any(|v| v.name() == name)
    }

    /// Add a variable to a group.
    ///
    /// Adding a state variable also adds its primed twin to the next-state
    /// group. The caller is responsible for keeping names unique; the primed
    /// image of a state variable must not collide with a declared name.
    pub fn add_variable(&mut self, group: VarGroup, v: Variable) {
        debug_assert!(!self.has_var(v.name()), "duplicate variable {}", v.name());
        let primed = (group == VarGroup::State).then(|| v.primed());
        self.push_var(group, v);
        if let Some(primed) = primed {
            self.push_var(VarGroup::NextState, primed);
        }
    }

    fn push_var(&mut self, group: VarGroup, v: Variable) {
        self.vars.push(v);
        let idx = self.vars.len() - 1;
        self.var_groups[group.slot()].push(idx);
        self.scopes[ConstrGroup::Trans.slot()].push(idx);
        if group == VarGroup::State {
            self.scopes[ConstrGroup::Init.slot()].push(idx);
            self.scopes[ConstrGroup::Spec.slot()].push(idx);
        }
    }

    // --- constraints ---

    /// Total number of constraints across all groups.
    pub fn constr_count_total(&self) -> usize {
        self.constrs.len()
    }

    pub fn constr_global(&self, idx: usize) -> &Constraint {
        &self.constrs[idx]
    }

    pub(crate) fn constr_global_mut(&mut self, idx: usize) -> &mut Constraint {
        &mut self.constrs[idx]
    }

    /// Number of constraints in a group.
    pub fn constr_count(&self, group: ConstrGroup) -> usize {
        self.constr_groups[group.slot()].len()
    }

    /// Constraint at a position within a group.
    pub fn constr_at(&self, group: ConstrGroup, idx: usize) -> &Constraint {
        &self.constrs[self.constr_groups[group.slot()][idx]]
    }

    pub(crate) fn constr_at_mut(&mut self, group: ConstrGroup, idx: usize) -> &mut Constraint {
        let global = self.constr_groups[group.slot()][idx];
        &mut self.constrs[global]
    }

    /// Constraints of a group, in insertion order.
    pub fn constrs(&self, group: ConstrGroup) -> impl Iterator<Item = &Constraint> {
        self.constr_groups[group.slot()]
            .iter()
            .map(|&i| &self.constrs[i])
    }

    /// Add a constraint to a group.
    pub fn add_constraint(&mut self, group: ConstrGroup, c: Constraint) {
        self.constrs.push(c);
        self.constr_groups[group.slot()].push(self.constrs.len() - 1);
    }

    // --- scopes ---

    /// Number of variables a constraint group may mention.
    pub fn scope_len(&self, group: ConstrGroup) -> usize {
        self.scopes[group.slot()].len()
    }

    /// Scope variable at a position, in scope order.
    pub fn scope_var(&self, group: ConstrGroup, idx: usize) -> &Variable {
        &self.vars[self.scopes[group.slot()][idx]]
    }

    /// Scope variables of a constraint group, in scope order.
    pub fn scope_vars(&self, group: ConstrGroup) -> impl Iterator<Item = &Variable> {
        self.scopes[group.slot()].iter().map(|&i| &self.vars[i])
    }

    /// Whether a name is inside the scope of a constraint group.
    pub fn scope_contains(&self, group: ConstrGroup, name: &str) -> bool {
        self.scope_vars(group).any(|v| v.name() == name)
    }

    /// Drop all variables, constraints, groups, and scopes together.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "VARS_INPUT")?;
        for v in self.vars(VarGroup::Input) {
            writeln!(f, "  {v}")?;
        }
        writeln!(f, "VARS_STATE")?;
        for v in self.vars(VarGroup::State) {
            writeln!(f, "  {v}")?;
        }
        writeln!(f, "VARS_OUTPUT")?;
        for v in self.vars(VarGroup::Output) {
            writeln!(f, "  {v}")?;
        }
        writeln!(f, "CONSTRS_INIT")?;
        for c in self.constrs(ConstrGroup::Init) {
            writeln!(f, "  {c}")?;
        }
        writeln!(f, "CONSTRS_TRANS")?;
        for c in self.constrs(ConstrGroup::Trans) {
            writeln!(f, "  {c}")?;
        }
        writeln!(f, "CONSTRS_SPEC")?;
        for c in self.constrs(ConstrGroup::Spec) {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintKind;
    use crate::num::{Int, Rational};
    use crate::variable::VarKind;

    fn rat(n: i64) -> Rational {
        Rational::from_integer(Int::from(n))
    }

    fn var(name: &str, kind: VarKind, lo: i64, hi: i64) -> Variable {
        Variable::new(name, kind, rat(lo), rat(hi))
    }

    #[test]
    fn state_variable_is_auto_primed() {
        let mut p = Problem::new();
        p.add_variable(VarGroup::State, var("x", VarKind::Real, 0, 1));
        assert_eq!(p.var_count(VarGroup::State), 1);
        assert_eq!(p.var_count(VarGroup::NextState), 1);
        assert_eq!(p.var_at(VarGroup::NextState, 0).name(), "x'");
    }

    #[test]
    fn scopes_follow_groups() {
        let mut p = Problem::new();
        p.add_variable(VarGroup::Input, var("u", VarKind::Real, 0, 1));
        p.add_variable(VarGroup::State, var("x", VarKind::Real, 0, 1));
        p.add_variable(VarGroup::Output, var("y", VarKind::Real, 0, 2));

        let trans: Vec<_> = p
            .scope_vars(ConstrGroup::Trans)
            .map(|v| v.name().to_string())
            .collect();
        assert_eq!(trans, ["u", "x", "x'", "y"]);

        let init: Vec<_> = p
            .scope_vars(ConstrGroup::Init)
            .map(|v| v.name().to_string())
            .collect();
        assert_eq!(init, ["x"]);
        assert!(p.scope_contains(ConstrGroup::Spec, "x"));
        assert!(!p.scope_contains(ConstrGroup::Spec, "u"));
    }

    #[test]
    fn outputs_trail_the_trans_scope() {
        let mut p = Problem::new();
        p.add_variable(VarGroup::Input, var("u", VarKind::Real, 0, 1));
        p.add_variable(VarGroup::State, var("x", VarKind::Real, 0, 1));
        p.add_variable(VarGroup::Output, var("y", VarKind::Real, 0, 2));
        p.add_variable(VarGroup::Output, var("z", VarKind::Real, 0, 2));

        let n = p.scope_len(ConstrGroup::Trans);
        let outputs = p.var_count(VarGroup::Output);
        for i in 0..outputs {
            let v = p.scope_var(ConstrGroup::Trans, n - outputs + i);
            assert!(["y", "z"].contains(&v.name()));
        }
    }

    #[test]
    fn group_selector_bounds() {
        assert!(VarGroup::from_index(3).is_ok());
        assert!(matches!(
            VarGroup::from_index(4),
            Err(McError::GroupOutOfRange(4))
        ));
        assert!(ConstrGroup::from_index(2).is_ok());
        assert!(ConstrGroup::from_index(3).is_err());
    }

    #[test]
    fn clear_empties_everything() {
        let mut p = Problem::new();
        p.add_variable(VarGroup::State, var("x", VarKind::Integer, 0, 1));
        p.add_constraint(ConstrGroup::Init, Constraint::new(ConstraintKind::Eq));
        p.clear();
        assert_eq!(p.var_count_total(), 0);
        assert_eq!(p.constr_count_total(), 0);
        assert_eq!(p.scope_len(ConstrGroup::Trans), 0);
    }

    #[test]
    fn display_round_trips_sections() {
        let mut p = Problem::new();
        p.add_variable(VarGroup::State, var("x", VarKind::Integer, 0, 1));
        let mut c = Constraint::new(ConstraintKind::Eq);
        c.set_coeff("x", rat(1));
        p.add_constraint(ConstrGroup::Init, c);
        let text = p.to_string();
        assert!(text.contains("VARS_STATE\n  x integer 0 .. 1"));
        assert!(text.contains("CONSTRS_INIT\n  1 x = 0"));
    }
}
