//! Fourier–Motzkin projection
//!
//! Eliminates a trailing block of a constraint group's scope, producing an
//! equivalent system over the retained variables. The working representation
//! is a list of rows `sum coeffs[j] * scope[j]  (=|>=)  rhs`: one row per
//! constraint of the group plus a lower-bound and an upper-bound row per
//! scope variable. Rows live on the call frame; nothing is retained between
//! calls.
//!
//! Per eliminated variable the classic alternative applies: if an equality
//! row mentions it, that row is solved for the variable and substituted
//! everywhere; otherwise every positive-coefficient row is combined with
//! every negative-coefficient row so the variable cancels. Rows that become
//! trivially true are dropped, rows that become trivially false abort with
//! [`McError::InfeasibleProjection`], and duplicate rows (equal after gcd
//! normalization) are kept once.

use num_traits::{One, Signed, Zero};
use rustc_hash::FxHashSet;

use crate::constraint::{Constraint, ConstraintKind};
use crate::error::{McError, McResult};
use crate::num::{lcm, Int, Rational};
use crate::problem::{ConstrGroup, Problem};

#[derive(Debug, Clone)]
struct Row {
    kind: ConstraintKind,
    coeffs: Vec<Rational>,
    rhs: Rational,
}

/// Project the last `count` scope variables out of `group`, emitting the
/// surviving constraints into the same group of `dst`.
///
/// With `count == 0` the group is copied verbatim and no system is built.
pub fn eliminate_variables(
    src: &Problem,
    group: ConstrGroup,
    count: usize,
    dst: &mut Problem,
) -> McResult<()> {
    if count == 0 {
        for c in src.constrs(group) {
            dst.add_constraint(group, c.clone());
        }
        return Ok(());
    }

    let n = src.scope_len(group);
    debug_assert!(count <= n);

    let mut rows = sweep(build_rows(src, group))?;
    for target in (n - count..n).rev() {
        rows = eliminate_one(rows, target)?;
        for row in &mut rows {
            debug_assert!(row.coeffs[target].is_zero());
            row.coeffs.truncate(target);
        }
        rows = sweep(rows)?;
    }

    for row in rows {
        let mut c = Constraint::new(row.kind);
        for (j, coeff) in row.coeffs.into_iter().enumerate() {
            if !coeff.is_zero() {
                c.set_coeff(src.scope_var(group, j).name(), coeff);
            }
        }
        c.set_free(-row.rhs);
        dst.add_constraint(group, c);
    }
    Ok(())
}

/// One row per constraint, then a lower-bound and an upper-bound row per
/// scope variable, in scope order.
fn build_rows(src: &Problem, group: ConstrGroup) -> Vec<Row> {
    let n = src.scope_len(group);
    let mut rows = Vec::with_capacity(src.constr_count(group) + 2 * n);

    for c in src.constrs(group) {
        let coeffs = (0..n)
            .map(|j| c.coeff(src.scope_var(group, j).name()))
            .collect();
        rows.push(Row {
            kind: c.kind(),
            coeffs,
            rhs: -c.free(),
        });
    }

    for j in 0..n {
        let v = src.scope_var(group, j);
        let mut lower = vec![Rational::zero(); n];
        lower[j] = Rational::one();
        rows.push(Row {
            kind: ConstraintKind::Ge,
            coeffs: lower,
            rhs: v.lower().clone(),
        });
        let mut upper = vec![Rational::zero(); n];
        upper[j] = -Rational::one();
        rows.push(Row {
            kind: ConstraintKind::Ge,
            coeffs: upper,
            rhs: -v.upper(),
        });
    }

    rows
}

/// Eliminate the variable at column `target`, leaving a zero coefficient in
/// that column of every returned row.
fn eliminate_one(rows: Vec<Row>, target: usize) -> McResult<Vec<Row>> {
    let mut kept = Vec::new();
    let mut eqs = Vec::new();
    let mut pos = Vec::new();
    let mut neg = Vec::new();

    for row in rows {
        if row.coeffs[target].is_zero() {
            kept.push(row);
        } else {
            match row.kind {
                ConstraintKind::Eq => eqs.push(row),
                ConstraintKind::Ge if row.coeffs[target].is_positive() => pos.push(row),
                ConstraintKind::Ge => neg.push(row),
            }
        }
    }

    if let Some(eq) = eqs.pop() {
        // The equality defines the variable; substituting it collapses the
        // column exactly in every remaining row.
        for mut row in eqs.into_iter().chain(pos).chain(neg) {
            let factor = &row.coeffs[target] / &eq.coeffs[target];
            for (c, e) in row.coeffs.iter_mut().zip(&eq.coeffs) {
                *c -= &factor * e;
            }
            row.rhs -= &factor * &eq.rhs;
            kept.push(row);
        }
    } else {
        for p in &pos {
            for q in &neg {
                let wp = -&q.coeffs[target];
                let wq = p.coeffs[target].clone();
                let coeffs = p
                    .coeffs
                    .iter()
                    .zip(&q.coeffs)
                    .map(|(a, b)| a * &wp + b * &wq)
                    .collect();
                kept.push(Row {
                    kind: ConstraintKind::Ge,
                    coeffs,
                    rhs: &p.rhs * &wp + &q.rhs * &wq,
                });
            }
        }
    }

    Ok(kept)
}

/// Drop trivially-true rows, fail on trivially-false ones, and deduplicate
/// the rest after gcd normalization.
fn sweep(rows: Vec<Row>) -> McResult<Vec<Row>> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for mut row in rows {
        if row.coeffs.iter().all(Zero::is_zero) {
            let holds = match row.kind {
                ConstraintKind::Eq => row.rhs.is_zero(),
                ConstraintKind::Ge => !row.rhs.is_positive(),
            };
            if holds {
                continue;
            }
            return Err(McError::InfeasibleProjection);
        }
        normalize(&mut row);
        if seen.insert(row_key(&row)) {
            out.push(row);
        }
    }
    Ok(out)
}

/// Scale a row so every entry is an integer and the gcd of all entries
/// (right-hand side included) is one. Only positive factors are applied;
/// the sign of a `Ge` row is meaningful and never normalized away.
fn normalize(row: &mut Row) {
    let mut dens: Vec<Int> = row
        .coeffs
        .iter()
        .filter(|c| !c.is_zero())
        .map(|c| c.denom().clone())
        .collect();
    if !row.rhs.is_zero() {
        dens.push(row.rhs.denom().clone());
    }
    let scale = Rational::from_integer(lcm(&dens));

    let mut gcd = Int::zero();
    for c in row.coeffs.iter_mut() {
        *c *= scale.clone();
        gcd = num_integer::Integer::gcd(&gcd, c.numer());
    }
    row.rhs *= scale;
    gcd = num_integer::Integer::gcd(&gcd, row.rhs.numer());

    if !gcd.is_zero() && !gcd.is_one() {
        let shrink = Rational::from_integer(gcd);
        for c in row.coeffs.iter_mut() {
            *c /= shrink.clone();
        }
        row.rhs /= shrink;
    }
}

fn row_key(row: &Row) -> (ConstraintKind, Vec<Int>, Int) {
    (
        row.kind,
        row.coeffs.iter().map(|c| c.numer().clone()).collect(),
        row.rhs.numer().clone(),
    )
}
