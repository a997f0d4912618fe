//! The pipeline driver
//!
//! Owns every intermediate representation and runs the transformation
//! chain:
//!
//! 1. parse the textual problem;
//! 2. project the output variables out of the transition relation;
//! 3. quantize every real variable into an integer index plus a bounded
//!    residual;
//! 4. project the residuals out and rescale to integer coefficients;
//! 5. expand every bounded integer into 0/1 bit variables;
//! 6. encode each constraint group to CNF and assemble the Boolean model;
//! 7. hand the model to the downstream checker.
//!
//! Each stage allocates a fresh [`Problem`]; earlier stages stay intact
//! until the next [`Solver::verify`] call. The refinement loop that would
//! consume a spurious counterexample is stubbed: its hooks report failure
//! and `verify` runs the chain once.

use std::path::Path;
use std::time::{Duration, Instant};

use num_traits::Zero;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::constraint::Constraint;
use crate::counterexample::Counterexample;
use crate::error::{McError, McResult};
use crate::fm;
use crate::model::{BoolModel, CheckOutcome, ModelChecker, NoopChecker};
use crate::num::{lcm, range_bits, Int, Rational};
use crate::parser;
use crate::pb::{MinisatPlusEncoder, PbEncoder};
use crate::problem::{ConstrGroup, Problem, VarGroup};
use crate::variable::{VarKind, Variable};

/// Default quantization parameter.
pub const DEFAULT_Q_PARAM: u32 = 4;

/// Pipeline driver and owner of all intermediate representations.
pub struct Solver {
    problem_original: Option<Problem>,
    problem_without_outputs: Option<Problem>,
    problem_quantized: Option<Problem>,
    problem_discrete: Option<Problem>,
    problem_pb: Option<Problem>,
    model: Option<BoolModel>,
    q_params: FxHashMap<String, u32>,
    counterexample_boolean: Option<Counterexample>,
    counterexample_mixed: Option<Counterexample>,
    encoder: Box<dyn PbEncoder>,
    checker: Box<dyn ModelChecker>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    /// A solver wired to the external tools: the PB encoder subprocess and
    /// the placeholder checker.
    pub fn new() -> Self {
        Self::with_tools(
            Box::new(MinisatPlusEncoder::new()),
            Box::new(NoopChecker::new()),
        )
    }

    /// A solver with explicit tool implementations.
    pub fn with_tools(encoder: Box<dyn PbEncoder>, checker: Box<dyn ModelChecker>) -> Self {
        Self {
            problem_original: None,
            problem_without_outputs: None,
            problem_quantized: None,
            problem_discrete: None,
            problem_pb: None,
            model: None,
            q_params: FxHashMap::default(),
            counterexample_boolean: None,
            counterexample_mixed: None,
            encoder,
            checker,
        }
    }

    /// Run the whole chain over a problem file and return the elapsed wall
    /// time.
    pub fn verify(&mut self, path: &Path, initial_q: u32) -> McResult<Duration> {
        let start = Instant::now();
        self.reset();

        info!(file = %path.display(), initial_q, "verifying");
        self.problem_original = Some(parser::read_problem(path)?);
        self.make_problem_without_outputs()?;

        if let Some(p) = &self.problem_without_outputs {
            for i in 0..p.var_count_total() {
                let v = p.var_global(i);
                if v.kind() == VarKind::Real {
                    self.q_params.insert(v.name().to_string(), initial_q.max(1));
                }
            }
        }

        self.make_problem_quantized()?;
        self.make_problem_discrete()?;
        self.make_problem_pb()?;
        self.make_model()?;
        self.check_model()?;

        let elapsed = start.elapsed();
        info!(ms = elapsed.as_millis() as u64, "verification finished");
        Ok(elapsed)
    }

    fn reset(&mut self) {
        self.problem_original = None;
        self.problem_without_outputs = None;
        self.problem_quantized = None;
        self.problem_discrete = None;
        self.problem_pb = None;
        self.model = None;
        self.q_params.clear();
        self.counterexample_boolean = None;
        self.counterexample_mixed = None;
    }

    /// Copy every group except the outputs and project the outputs out of
    /// the transition relation.
    fn make_problem_without_outputs(&mut self) -> McResult<()> {
        let src = self.problem_original.as_ref().ok_or(McError::StagePrecondition {
            stage: "drop-outputs",
            missing: "original",
        })?;

        let mut dst = Problem::new();
        for v in src.vars(VarGroup::Input) {
            dst.add_variable(VarGroup::Input, v.clone());
        }
        for v in src.vars(VarGroup::State) {
            dst.add_variable(VarGroup::State, v.clone());
        }

        for c in src.constrs(ConstrGroup::Init) {
            dst.add_constraint(ConstrGroup::Init, c.clone());
        }
        fm::eliminate_variables(
            src,
            ConstrGroup::Trans,
            src.var_count(VarGroup::Output),
            &mut dst,
        )?;
        for c in src.constrs(ConstrGroup::Spec) {
            dst.add_constraint(ConstrGroup::Spec, c.clone());
        }

        debug!(
            outputs = src.var_count(VarGroup::Output),
            trans = dst.constr_count(ConstrGroup::Trans),
            "dropped output variables"
        );
        self.problem_without_outputs = Some(dst);
        Ok(())
    }

    /// Replace every real variable `v` in `[L, U]` by an integer index in
    /// `[0, q-1]` plus a fresh real residual in `[0, (U-L)/q]`, rewriting
    /// every constraint that mentions `v`.
    fn make_problem_quantized(&mut self) -> McResult<()> {
        let src = self
            .problem_without_outputs
            .as_ref()
            .ok_or(McError::StagePrecondition {
                stage: "quantize",
                missing: "output-free",
            })?;

        let mut dst = src.clone();

        // Snapshot the variables to quantize; the loop appends residuals
        // which must not be revisited.
        let mut targets = Vec::new();
        for group in VarGroup::ALL {
            for j in 0..src.var_count(group) {
                if src.var_at(group, j).kind() == VarKind::Real {
                    targets.push((group, j));
                }
            }
        }

        for (group, j) in targets {
            let (name, lower, range) = {
                let v = dst.var_at(group, j);
                (v.name().to_string(), v.lower().clone(), v.range())
            };
            let q = self
                .q_params
                .get(&name)
                .copied()
                .unwrap_or(DEFAULT_Q_PARAM)
                .max(1);
            let delta = range / Rational::from_integer(Int::from(q));
            let delta_name = format!("delta_{name}");

            // A residual for a next-state variable already exists: it was
            // created when its state twin's residual was added.
            if group != VarGroup::NextState {
                dst.add_variable(
                    group,
                    Variable::new(
                        delta_name.clone(),
                        VarKind::Real,
                        Rational::zero(),
                        delta.clone(),
                    ),
                );
            }

            for i in 0..dst.constr_count_total() {
                let c = dst.constr_global_mut(i);
                let coeff = c.coeff(&name);
                if coeff.is_zero() {
                    continue;
                }
                c.set_free(c.free() + &coeff * &lower);
                c.add_coeff(&delta_name, coeff.clone());
                c.set_coeff(&name, &coeff * &delta);
            }

            let v = dst.var_at_mut(group, j);
            v.set_kind(VarKind::Integer);
            v.set_bounds(
                Rational::zero(),
                Rational::from_integer(Int::from(q - 1)),
            );
            debug!(var = %name, q, "quantized");
        }

        self.problem_quantized = Some(dst);
        Ok(())
    }

    /// Project the real residuals out of every constraint group and rescale
    /// each surviving constraint so every coefficient and the free term is
    /// an integer.
    fn make_problem_discrete(&mut self) -> McResult<()> {
        let src = self
            .problem_quantized
            .as_ref()
            .ok_or(McError::StagePrecondition {
                stage: "discretize",
                missing: "quantized",
            })?;

        let mut dst = Problem::new();
        for group in [VarGroup::Input, VarGroup::State, VarGroup::Output] {
            for v in src.vars(group) {
                if v.kind() == VarKind::Integer {
                    dst.add_variable(group, v.clone());
                }
            }
        }

        for group in ConstrGroup::ALL {
            let residuals = src
                .scope_vars(group)
                .filter(|v| v.kind() == VarKind::Real)
                .count();
            fm::eliminate_variables(src, group, residuals, &mut dst)?;

            for j in 0..dst.constr_count(group) {
                let denominators: Vec<Int> = {
                    let c = dst.constr_at(group, j);
                    let mut denominators: Vec<Int> = c
                        .names()
                        .map(|name| c.coeff(name).denom().clone())
                        .collect();
                    if !c.free().is_zero() {
                        denominators.push(c.free().denom().clone());
                    }
                    denominators
                };
                let scale = lcm(&denominators);
                if !num_traits::One::is_one(&scale) {
                    dst.constr_at_mut(group, j)
                        .mult(&Rational::from_integer(scale));
                }
            }
        }

        self.problem_discrete = Some(dst);
        Ok(())
    }

    /// Expand every bounded integer into 0/1 bit variables and rewrite each
    /// constraint over the bits.
    fn make_problem_pb(&mut self) -> McResult<()> {
        let src = self
            .problem_discrete
            .as_ref()
            .ok_or(McError::StagePrecondition {
                stage: "pseudo-boolean",
                missing: "discrete",
            })?;

        let mut dst = Problem::new();
        let mut bits_of: FxHashMap<String, Vec<String>> = FxHashMap::default();

        for group in VarGroup::ALL {
            for v in src.vars(group) {
                let bits = range_bits(&v.range());
                let names: Vec<String> = (0..bits)
                    .map(|k| {
                        if group == VarGroup::NextState {
                            // Keep the prime marker at the end: x' -> x_0'.
                            format!("{}_{k}'", v.base_name())
                        } else {
                            format!("{}_{k}", v.name())
                        }
                    })
                    .collect();
                // Next-state bits exist already: adding a state bit adds its
                // primed twin.
                if group != VarGroup::NextState {
                    for name in &names {
                        dst.add_variable(
                            group,
                            Variable::new(
                                name.clone(),
                                VarKind::Integer,
                                Rational::zero(),
                                Rational::from_integer(Int::from(1)),
                            ),
                        );
                    }
                }
                bits_of.insert(v.name().to_string(), names);
            }
        }

        for group in ConstrGroup::ALL {
            for c_d in src.constrs(group) {
                let mut c_b = Constraint::new(c_d.kind());
                let mut free = c_d.free().clone();
                for v_d in src.scope_vars(group) {
                    let coeff = c_d.coeff(v_d.name());
                    if coeff.is_zero() {
                        continue;
                    }
                    for (k, bit) in bits_of[v_d.name()].iter().enumerate() {
                        let weight = Rational::from_integer(Int::from(1) << k);
                        c_b.set_coeff(bit, &coeff * weight);
                    }
                    free += &coeff * v_d.lower();
                }
                c_b.set_free(free);
                dst.add_constraint(group, c_b);
            }
        }

        self.problem_pb = Some(dst);
        Ok(())
    }

    /// Encode the three constraint groups and assemble the Boolean model.
    fn make_model(&mut self) -> McResult<()> {
        let src = self.problem_pb.as_ref().ok_or(McError::StagePrecondition {
            stage: "boolean-model",
            missing: "pseudo-Boolean",
        })?;
        self.model = Some(BoolModel::from_problem(src, self.encoder.as_ref())?);
        Ok(())
    }

    /// Run the downstream checker; a violation stores the Boolean trace.
    fn check_model(&mut self) -> McResult<bool> {
        let model = self.model.as_ref().ok_or(McError::StagePrecondition {
            stage: "check",
            missing: "Boolean model",
        })?;
        match self.checker.check(&model.render())? {
            CheckOutcome::Verified => Ok(true),
            CheckOutcome::Violated { xml } => {
                let mut cex = Counterexample::for_model(model);
                cex.read_xml(&xml)?;
                info!(steps = cex.step_count(), "checker reported a violation");
                self.counterexample_boolean = Some(cex);
                Ok(false)
            }
        }
    }

    /// Decide whether the recorded Boolean counterexample is realizable in
    /// the original hybrid system.
    ///
    /// TODO(refinement): concretize the trace back through the pipeline;
    /// reports `false` until then.
    pub fn check_counterexample(&self) -> bool {
        false
    }

    /// Strengthen the Boolean model against a spurious counterexample.
    ///
    /// TODO(refinement): reports `false` until the refinement loop lands.
    pub fn refine_model(&mut self) -> bool {
        false
    }

    /// Adjust the quantization parameters after a failed refinement.
    ///
    /// TODO(refinement): no-op until the refinement loop lands.
    pub fn change_q_params(&mut self) {}

    // Read-only views of the intermediates, valid until the next `verify`.

    pub fn problem_original(&self) -> Option<&Problem> {
        self.problem_original.as_ref()
    }

    pub fn problem_without_outputs(&self) -> Option<&Problem> {
        self.problem_without_outputs.as_ref()
    }

    pub fn problem_quantized(&self) -> Option<&Problem> {
        self.problem_quantized.as_ref()
    }

    pub fn problem_discrete(&self) -> Option<&Problem> {
        self.problem_discrete.as_ref()
    }

    pub fn problem_pb(&self) -> Option<&Problem> {
        self.problem_pb.as_ref()
    }

    pub fn model(&self) -> Option<&BoolModel> {
        self.model.as_ref()
    }

    /// The concretized counterexample, once refinement can produce one.
    pub fn counterexample(&self) -> Option<&Counterexample> {
        self.counterexample_mixed.as_ref()
    }

    /// The Boolean-level counterexample recorded by the last check.
    pub fn counterexample_boolean(&self) -> Option<&Counterexample> {
        self.counterexample_boolean.as_ref()
    }
}
