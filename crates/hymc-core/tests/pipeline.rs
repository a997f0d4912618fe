//! End-to-end pipeline scenarios over the textual problem format, with
//! in-process stand-ins for the external PB encoder and model checker.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use hymc_core::{
    CheckOutcome, ConstrGroup, McError, McResult, ModelChecker, PbEncoder, Solver, VarGroup,
    VarKind,
};

/// Encoder fake: hands out canned replies and records the PB inputs it saw.
#[derive(Clone, Default)]
struct ScriptedEncoder {
    replies: Rc<RefCell<VecDeque<&'static str>>>,
    seen: Rc<RefCell<Vec<String>>>,
}

impl ScriptedEncoder {
    fn new(replies: &[&'static str]) -> Self {
        Self {
            replies: Rc::new(RefCell::new(replies.iter().copied().collect())),
            seen: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl PbEncoder for ScriptedEncoder {
    fn encode(&self, pb: &str) -> McResult<String> {
        self.seen.borrow_mut().push(pb.to_string());
        let reply = self
            .replies
            .borrow_mut()
            .pop_front()
            .expect("unexpected encoder invocation");
        Ok(reply.to_string())
    }
}

/// Checker fake: records the module it saw and returns a fixed outcome.
#[derive(Clone)]
struct ScriptedChecker {
    violation_xml: Option<&'static str>,
    seen: Rc<RefCell<Option<String>>>,
}

impl ScriptedChecker {
    fn verified() -> Self {
        Self {
            violation_xml: None,
            seen: Rc::new(RefCell::new(None)),
        }
    }

    fn violated(xml: &'static str) -> Self {
        Self {
            violation_xml: Some(xml),
            seen: Rc::new(RefCell::new(None)),
        }
    }
}

impl ModelChecker for ScriptedChecker {
    fn check(&self, module: &str) -> McResult<CheckOutcome> {
        *self.seen.borrow_mut() = Some(module.to_string());
        Ok(match self.violation_xml {
            Some(xml) => CheckOutcome::Violated {
                xml: xml.to_string(),
            },
            None => CheckOutcome::Verified,
        })
    }
}

fn write_problem(dir: &tempfile::TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("problem.hy");
    fs::write(&path, text).unwrap();
    path
}

const TRIVIAL_SAFE: &str = "\
VARS_STATE
  x integer 0 .. 1
CONSTRS_INIT
  1 x = 0
CONSTRS_TRANS
  1 x' + -1 x = 0
CONSTRS_SPEC
  1 x >= 0
";

#[test]
fn trivial_safe_system_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_problem(&dir, TRIVIAL_SAFE);

    let encoder = ScriptedEncoder::new(&[
        "1 1\nx_0\n-1 0\n",
        "2 2\nx_0' x_0\n1 -2 0\n2 -1 0\n",
        "1 1\nx_0\n1 -1 0\n",
    ]);
    let checker = ScriptedChecker::verified();
    let mut solver = Solver::with_tools(Box::new(encoder.clone()), Box::new(checker.clone()));

    solver.verify(&path, 4).unwrap();

    // The spec group is the tautology over the single state bit.
    let model = solver.model().unwrap();
    assert_eq!(model.spec(), "(x_0 | !x_0)");
    assert_eq!(model.init(), "(!x_0)");
    assert_eq!(
        model.trans(),
        "(next(x_0) | !x_0) & (x_0 | !next(x_0))"
    );
    assert!(solver.counterexample().is_none());
    assert!(solver.counterexample_boolean().is_none());

    // The encoder saw the three groups in order, serialized over the bit
    // variables.
    let seen = encoder.seen.borrow();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], "1*x_0 >= 0;\n");
    assert_eq!(seen[1], "-1*x_0 1*x_0' >= 0;\n");
    assert_eq!(seen[2], "1*x_0 >= 0;\n");

    // The checker received a well-formed module.
    let module = checker.seen.borrow();
    let module = module.as_deref().unwrap();
    assert!(module.starts_with("MODULE main\n"));
    assert!(module.contains("VAR\n  x_0 : 0 .. 1;\n"));
    assert!(module.contains("SPEC\n  AG ((x_0 | !x_0));\n"));
}

const TANK: &str = "\
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
fn outputs_are_projected_and_reals_quantized() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_problem(&dir, TANK);

    // Replies are structurally plausible but unchecked here; the assertions
    // target the intermediate problems.
    let encoder = ScriptedEncoder::new(&[
        "1 1\nx_0\n-1 0\n",
        "1 1\nx_0\n1 0\n",
        "1 1\nx_0\n1 -1 0\n",
    ]);
    let mut solver = Solver::with_tools(
        Box::new(encoder),
        Box::new(ScriptedChecker::verified()),
    );
    solver.verify(&path, 4).unwrap();

    // Stage A: no output group, no mention of y anywhere in TRANS.
    let no_outputs = solver.problem_without_outputs().unwrap();
    assert_eq!(no_outputs.var_count(VarGroup::Output), 0);
    for c in no_outputs.constrs(ConstrGroup::Trans) {
        assert!(c.names().all(|n| n != "y"));
    }

    // Stage B: x is an integer index with a real residual.
    let quantized = solver.problem_quantized().unwrap();
    let x = quantized
        .vars(VarGroup::State)
        .find(|v| v.name() == "x")
        .unwrap();
    assert_eq!(x.kind(), VarKind::Integer);
    assert_eq!(x.upper().to_string(), "3");
    assert!(quantized
        .vars(VarGroup::State)
        .any(|v| v.name() == "delta_x" && v.kind() == VarKind::Real));

    // Stage C: residuals are gone and everything is integral.
    let discrete = solver.problem_discrete().unwrap();
    for group in [VarGroup::Input, VarGroup::State, VarGroup::NextState] {
        for v in discrete.vars(group) {
            assert_eq!(v.kind(), VarKind::Integer);
        }
    }
    for group in ConstrGroup::ALL {
        for c in discrete.constrs(group) {
            assert!(c.free().is_integer());
            for name in c.names() {
                assert!(c.coeff(name).is_integer());
            }
        }
    }

    // Stage D: both index bits of x exist, primes trailing.
    let pb = solver.problem_pb().unwrap();
    let state_names: Vec<_> = pb.vars(VarGroup::State).map(|v| v.name()).collect();
    assert!(state_names.contains(&"x_0") && state_names.contains(&"x_1"));
    let next_names: Vec<_> = pb.vars(VarGroup::NextState).map(|v| v.name()).collect();
    assert!(next_names.contains(&"x_0'") && next_names.contains(&"x_1'"));
    for group in VarGroup::ALL {
        for v in pb.vars(group) {
            assert_eq!(v.lower().to_string(), "0");
            assert_eq!(v.upper().to_string(), "1");
        }
    }
}

#[test]
fn contradictory_output_equations_are_infeasible() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_problem(
        &dir,
        "\
VARS_STATE
  x integer 0 .. 10
VARS_OUTPUT
  y integer 0 .. 10
CONSTRS_INIT
  1 x = 0
CONSTRS_TRANS
  1 y >= 1
  -1 y >= 1
CONSTRS_SPEC
  1 x >= 0
",
    );

    let mut solver = Solver::with_tools(
        Box::new(ScriptedEncoder::new(&[])),
        Box::new(ScriptedChecker::verified()),
    );
    let err = solver.verify(&path, 4).unwrap_err();
    assert!(matches!(err, McError::InfeasibleProjection));
}

#[test]
fn empty_specification_cnf_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_problem(&dir, TRIVIAL_SAFE);

    let encoder = ScriptedEncoder::new(&[
        "1 1\nx_0\n-1 0\n",
        "2 1\nx_0' x_0\n1 -2 0\n",
        "1 0\n",
    ]);
    let mut solver = Solver::with_tools(
        Box::new(encoder),
        Box::new(ScriptedChecker::verified()),
    );
    let err = solver.verify(&path, 4).unwrap_err();
    assert!(matches!(err, McError::EmptySpec));
}

#[test]
fn violation_records_a_boolean_trace() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_problem(&dir, TRIVIAL_SAFE);

    let xml = "\
<counter-example>
  <node>
    <state><value variable=\"x_0\">0</value></state>
    <input></input>
  </node>
  <node>
    <state><value variable=\"x_0\">1</value></state>
    <input></input>
  </node>
</counter-example>
";
    let encoder = ScriptedEncoder::new(&[
        "1 1\nx_0\n-1 0\n",
        "2 2\nx_0' x_0\n1 -2 0\n2 -1 0\n",
        "1 1\nx_0\n1 -1 0\n",
    ]);
    let mut solver = Solver::with_tools(
        Box::new(encoder),
        Box::new(ScriptedChecker::violated(xml)),
    );
    solver.verify(&path, 4).unwrap();

    let trace = solver.counterexample_boolean().unwrap();
    assert_eq!(trace.step_count(), 2);
    assert_eq!(trace.var_value(0, "x_0").unwrap().to_string(), "0");
    assert_eq!(trace.var_value(1, "x_0").unwrap().to_string(), "1");
    // Refinement is stubbed: no concretized counterexample exists.
    assert!(solver.counterexample().is_none());
    assert!(!solver.check_counterexample());
}

#[test]
fn intermediates_are_reset_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_problem(&dir, TRIVIAL_SAFE);

    let replies = [
        "1 1\nx_0\n-1 0\n",
        "2 2\nx_0' x_0\n1 -2 0\n2 -1 0\n",
        "1 1\nx_0\n1 -1 0\n",
    ];
    let mut both = Vec::new();
    both.extend_from_slice(&replies);
    both.extend_from_slice(&replies);

    let encoder = ScriptedEncoder::new(&both);
    let mut solver = Solver::with_tools(
        Box::new(encoder),
        Box::new(ScriptedChecker::verified()),
    );
    solver.verify(&path, 4).unwrap();
    let first = solver.model().unwrap().render();
    solver.verify(&path, 4).unwrap();
    assert_eq!(solver.model().unwrap().render(), first);
}
