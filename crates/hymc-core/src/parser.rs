//! Reader for the line-oriented problem format
//!
//! ```text
//! # comment
//! VARS_INPUT
//!   u real 0 .. 1
//! VARS_STATE
//!   x real 0 .. 1
//! VARS_OUTPUT
//!   y real 0 .. 2
//! CONSTRS_INIT
//!   1 x = 0
//! CONSTRS_TRANS
//!   1 x' + -1 x + -1 u = 0
//! CONSTRS_SPEC
//!   1 x >= 0
//! ```
//!
//! Section headers start in column zero and may only move forward through
//! the fixed order; variable and constraint lines are indented. `<=` is
//! accepted and normalized to `>=` by multiplying the constraint by -1, so
//! storage only ever sees `=` and `>=`.

use std::fs;
use std::path::Path;

use crate::constraint::{Constraint, ConstraintKind};
use crate::error::{McError, McResult};
use crate::num::{parse_rational, Rational};
use crate::problem::{ConstrGroup, Problem, VarGroup};
use crate::variable::{VarKind, Variable};

const SECTIONS: [&str; 6] = [
    "VARS_INPUT",
    "VARS_STATE",
    "VARS_OUTPUT",
    "CONSTRS_INIT",
    "CONSTRS_TRANS",
    "CONSTRS_SPEC",
];

/// Read and parse a problem file.
pub fn read_problem(path: &Path) -> McResult<Problem> {
    let text = fs::read_to_string(path).map_err(|e| McError::io(path, e))?;
    parse_problem(&text, &path.display().to_string())
}

/// Parse problem text; `file` is only used in error messages.
pub fn parse_problem(text: &str, file: &str) -> McResult<Problem> {
    let mut problem = Problem::new();
    // Index into SECTIONS of the section being filled.
    let mut section: Option<usize> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_num = idx + 1;
        let err = |msg: String| McError::Parse {
            file: file.to_string(),
            line: line_num,
            msg,
        };

        if raw.trim().is_empty() || raw.starts_with('#') {
            continue;
        }

        if !raw.starts_with(' ') && !raw.starts_with('\t') {
            let header = raw.trim_end();
            let found = SECTIONS.iter().position(|s| *s == header);
            let Some(found) = found else {
                return Err(err(format!("unknown keyword \"{header}\"")));
            };
            if section.is_some_and(|current| found <= current) {
                return Err(err(format!("unexpected keyword \"{header}\"")));
            }
            section = Some(found);
            continue;
        }

        let Some(section) = section else {
            return Err(err("content before the first section header".to_string()));
        };
        match section {
            0 => {
                let v = parse_variable(raw, &err)?;
                check_new_name(&problem, v.name(), &err)?;
                problem.add_variable(VarGroup::Input, v);
            }
            1 => {
                let v = parse_variable(raw, &err)?;
                check_new_name(&problem, v.name(), &err)?;
                check_new_name(&problem, &format!("{}'", v.name()), &err)?;
                problem.add_variable(VarGroup::State, v);
            }
            2 => {
                let v = parse_variable(raw, &err)?;
                check_new_name(&problem, v.name(), &err)?;
                problem.add_variable(VarGroup::Output, v);
            }
            _ => {
                let group = ConstrGroup::ALL[section - 3];
                let c = parse_constraint(raw, &err)?;
                for name in c.names() {
                    if !problem.scope_contains(group, name) {
                        return Err(err(format!(
                            "variable \"{name}\" is not in scope of {}",
                            SECTIONS[section]
                        )));
                    }
                }
                problem.add_constraint(group, c);
            }
        }
    }

    Ok(problem)
}

fn check_new_name(
    problem: &Problem,
    name: &str,
    err: &impl Fn(String) -> McError,
) -> McResult<()> {
    if problem.has_var(name) {
        return Err(err(format!("duplicate variable \"{name}\"")));
    }
    Ok(())
}

/// `name (integer|real) L .. U`
fn parse_variable(line: &str, err: &impl Fn(String) -> McError) -> McResult<Variable> {
    let mut tokens = line.split_whitespace();
    let mut next = |what: &str| {
        tokens
            .next()
            .ok_or_else(|| err(format!("expected {what}")))
    };

    let name = next("a variable name")?.to_string();
    let kind = match next("a variable type")? {
        "integer" => VarKind::Integer,
        "real" => VarKind::Real,
        other => return Err(err(format!("unknown variable type \"{other}\""))),
    };
    let lower = parse_scalar(next("a lower bound")?, err)?;
    let dots = next("\"..\"")?;
    if dots != ".." {
        return Err(err(format!("unexpected string \"{dots}\"")));
    }
    let upper = parse_scalar(next("an upper bound")?, err)?;
    if tokens.next().is_some() {
        return Err(err("trailing tokens after variable range".to_string()));
    }
    if upper < lower {
        return Err(err(format!("incorrect range for variable \"{name}\"")));
    }
    Ok(Variable::new(name, kind, lower, upper))
}

/// `c1 n1 + c2 n2 + ... (=|>=|<=) rhs`
fn parse_constraint(line: &str, err: &impl Fn(String) -> McError) -> McResult<Constraint> {
    let mut tokens = line.split_whitespace();
    let mut c = Constraint::new(ConstraintKind::Ge);
    let mut negate = false;

    loop {
        let coeff_tok = tokens
            .next()
            .ok_or_else(|| err("expected a coefficient".to_string()))?;
        let coeff = parse_scalar(coeff_tok, err)?;
        let name = tokens
            .next()
            .ok_or_else(|| err("expected a variable name".to_string()))?;
        c.add_coeff(name, coeff);

        match tokens.next() {
            Some("+") => continue,
            Some("=") => {
                c.set_kind(ConstraintKind::Eq);
                break;
            }
            Some(">=") => break,
            Some("<=") => {
                negate = true;
                break;
            }
            Some(other) => return Err(err(format!("unknown constraint operator \"{other}\""))),
            None => return Err(err("constraint has no operator".to_string())),
        }
    }

    let rhs = parse_scalar(
        tokens
            .next()
            .ok_or_else(|| err("expected a right-hand side".to_string()))?,
        err,
    )?;
    if tokens.next().is_some() {
        return Err(err("trailing tokens after right-hand side".to_string()));
    }
    c.set_free(-rhs);
    if negate {
        c.mult(&Rational::from_integer((-1).into()));
    }
    Ok(c)
}

fn parse_scalar(token: &str, err: &impl Fn(String) -> McError) -> McResult<Rational> {
    parse_rational(token).ok_or_else(|| err(format!("malformed number \"{token}\"")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::Int;

    fn rat(n: i64, d: i64) -> Rational {
        Rational::new(Int::from(n), Int::from(d))
    }

    const PLANT: &str = "\
# water tank
VARS_INPUT
  u real 0 .. 1
VARS_STATE
  x real 0 .. 1
VARS_OUTPUT
  y real 0 .. 2
CONSTRS_INIT
  1 x = 0
CONSTRS_TRANS
  1 x' + -1 x + -1 u = 0
  1 y + -1 x = 0
CONSTRS_SPEC
  1 x >= 0
";

    #[test]
    fn parses_full_model() {
        let p = parse_problem(PLANT, "plant.hy").unwrap();
        assert_eq!(p.var_count(VarGroup::Input), 1);
        assert_eq!(p.var_count(VarGroup::State), 1);
        assert_eq!(p.var_count(VarGroup::NextState), 1);
        assert_eq!(p.var_count(VarGroup::Output), 1);
        assert_eq!(p.constr_count(ConstrGroup::Trans), 2);
        assert_eq!(p.var_at(VarGroup::NextState, 0).name(), "x'");
    }

    #[test]
    fn round_trips_through_display() {
        let p = parse_problem(PLANT, "plant.hy").unwrap();
        let again = parse_problem(&p.to_string(), "echo.hy").unwrap();
        assert_eq!(p.to_string(), again.to_string());
    }

    #[test]
    fn le_is_normalized_by_negation() {
        let text = "VARS_STATE\n  x real 0 .. 1\nCONSTRS_INIT\n  2 x <= 1/2\n";
        let p = parse_problem(text, "t").unwrap();
        let c = p.constr_at(ConstrGroup::Init, 0);
        assert_eq!(c.kind(), ConstraintKind::Ge);
        assert_eq!(c.coeff("x"), rat(-2, 1));
        assert_eq!(c.free(), &rat(1, 2));
    }

    #[test]
    fn duplicate_terms_are_summed() {
        let text = "VARS_STATE\n  x real 0 .. 1\nCONSTRS_INIT\n  1 x + 2 x >= 0\n";
        let p = parse_problem(text, "t").unwrap();
        assert_eq!(p.constr_at(ConstrGroup::Init, 0).coeff("x"), rat(3, 1));
    }

    #[test]
    fn rejects_unknown_keyword() {
        let e = parse_problem("VARS_BOGUS\n", "t").unwrap_err();
        assert_eq!(e.to_string(), "t:1: unknown keyword \"VARS_BOGUS\"");
    }

    #[test]
    fn rejects_out_of_order_sections() {
        let text = "VARS_STATE\n  x real 0 .. 1\nVARS_INPUT\n";
        let e = parse_problem(text, "t").unwrap_err();
        assert!(e.to_string().contains("unexpected keyword"));
    }

    #[test]
    fn rejects_repeated_section() {
        let text = "VARS_INPUT\nVARS_INPUT\n";
        assert!(parse_problem(text, "t").is_err());
    }

    #[test]
    fn rejects_bad_range() {
        let text = "VARS_STATE\n  x real 1 .. 0\n";
        let e = parse_problem(text, "t").unwrap_err();
        assert!(e.to_string().contains("incorrect range"));
    }

    #[test]
    fn rejects_out_of_scope_reference() {
        let text = "VARS_INPUT\n  u real 0 .. 1\nVARS_STATE\n  x real 0 .. 1\nCONSTRS_INIT\n  1 u = 0\n";
        let e = parse_problem(text, "t").unwrap_err();
        assert!(e.to_string().contains("not in scope of CONSTRS_INIT"));
    }

    #[test]
    fn rejects_duplicate_variable() {
        let text = "VARS_INPUT\n  u real 0 .. 1\nVARS_STATE\n  u integer 0 .. 1\n";
        let e = parse_problem(text, "t").unwrap_err();
        assert!(e.to_string().contains("duplicate variable"));
    }

    #[test]
    fn allows_skipping_empty_sections() {
        let text = "VARS_STATE\n  x integer 0 .. 1\nCONSTRS_SPEC\n  1 x >= 0\n";
        let p = parse_problem(text, "t").unwrap();
        assert_eq!(p.constr_count(ConstrGroup::Spec), 1);
        assert_eq!(p.constr_count(ConstrGroup::Init), 0);
    }
}
