//! Boolean transition-system assembly
//!
//! Combines the three per-group CNF encodings of a pseudo-Boolean problem
//! with 0/1 variable declarations into a module for the downstream symbolic
//! checker:
//!
//! ```text
//! MODULE main
//! IVAR
//!   u_0 : 0 .. 1;
//! VAR
//!   x_0 : 0 .. 1;
//!   _aux0 : 0 .. 1;
//! INIT
//!   (!x_0);
//! TRANS
//!   (next(x_0) | !x_0) & (x_0 | !next(x_0));
//! SPEC
//!   AG ((x_0 | !x_0));
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::counterexample::Counterexample;
use crate::error::{McError, McResult};
use crate::pb::{encode_group, PbEncoder};
use crate::problem::{ConstrGroup, Problem, VarGroup};

/// Fixed name of the checker's input file inside the working directory.
pub const CHECKER_INPUT_FILE: &str = "nusmv_input";
/// Fixed name of the counterexample file the checker writes on violation.
pub const COUNTEREXAMPLE_FILE: &str = "counterexample.xml";

/// Outcome of a checker run
#[derive(Debug)]
pub enum CheckOutcome {
    /// Every reachable state satisfies the specification.
    Verified,
    /// The checker refuted the specification and produced a counterexample.
    Violated { xml: String },
}

/// Downstream symbolic model checker.
///
/// Implementations receive the rendered module text and classify the
/// outcome. Test suites substitute in-process fakes here.
pub trait ModelChecker {
    fn check(&self, module: &str) -> McResult<CheckOutcome>;
}

/// The assembled Boolean transition system.
#[derive(Debug, Clone)]
pub struct BoolModel {
    vars_input: Vec<String>,
    vars_state: Vec<String>,
    init: String,
    trans: String,
    spec: String,
}

impl BoolModel {
    /// Encode a pseudo-Boolean problem group by group.
    ///
    /// The auxiliary-name counter is threaded through the three encodings in
    /// the fixed order INIT, TRANS, SPEC, and every auxiliary becomes an
    /// additional state variable. An empty specification CNF is fatal.
    pub fn from_problem(problem: &Problem, encoder: &dyn PbEncoder) -> McResult<Self> {
        let vars_input: Vec<String> = problem
            .vars(VarGroup::Input)
            .map(|v| v.name().to_string())
            .collect();
        let mut vars_state: Vec<String> = problem
            .vars(VarGroup::State)
            .map(|v| v.name().to_string())
            .collect();

        let (init, aux) = encode_group(problem, ConstrGroup::Init, 0, encoder)?;
        let (trans, aux) = encode_group(problem, ConstrGroup::Trans, aux, encoder)?;
        let (spec, aux) = encode_group(problem, ConstrGroup::Spec, aux, encoder)?;
        if spec.is_empty() {
            return Err(McError::EmptySpec);
        }

        for i in 0..aux {
            vars_state.push(format!("_aux{i}"));
        }
        info!(
            inputs = vars_input.len(),
            states = vars_state.len(),
            auxiliaries = aux,
            "assembled boolean model"
        );

        Ok(Self {
            vars_input,
            vars_state,
            init,
            trans,
            spec,
        })
    }

    pub fn vars_input(&self) -> &[String] {
        &self.vars_input
    }

    /// State variable names, auxiliaries included.
    pub fn vars_state(&self) -> &[String] {
        &self.vars_state
    }

    pub fn init(&self) -> &str {
        &self.init
    }

    pub fn trans(&self) -> &str {
        &self.trans
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Render the checker module.
    pub fn render(&self) -> String {
        let mut out = String::from("MODULE main\n");
        out.push_str("IVAR\n");
        for name in &self.vars_input {
            out.push_str(&format!("  {name} : 0 .. 1;\n"));
        }
        out.push_str("VAR\n");
        for name in &self.vars_state {
            out.push_str(&format!("  {name} : 0 .. 1;\n"));
        }
        if !self.init.is_empty() {
            out.push_str(&format!("INIT\n  {};\n", self.init));
        }
        if !self.trans.is_empty() {
            out.push_str(&format!("TRANS\n  {};\n", self.trans));
        }
        out.push_str(&format!("SPEC\n  AG ({});\n", self.spec));
        out
    }

    /// Write the rendered module to a file.
    pub fn write(&self, path: &Path) -> McResult<()> {
        fs::write(path, self.render()).map_err(|e| McError::io(path, e))
    }

    /// Strengthen the model against a spurious counterexample.
    ///
    /// TODO(refinement): consume the abstract trace once the outer
    /// refinement loop exists; until then reports failure so the caller
    /// falls back to re-quantization.
    pub fn refine(&mut self, _counterexample: &Counterexample) -> bool {
        false
    }
}

/// Placeholder checker: writes the module to the fixed input path so it can
/// be inspected or checked by hand, and reports the model verified without
/// launching anything.
pub struct NoopChecker {
    workdir: PathBuf,
}

impl Default for NoopChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl NoopChecker {
    pub fn new() -> Self {
        Self {
            workdir: PathBuf::from("."),
        }
    }

    pub fn in_dir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }
}

impl ModelChecker for NoopChecker {
    fn check(&self, module: &str) -> McResult<CheckOutcome> {
        let path = self.workdir.join(CHECKER_INPUT_FILE);
        fs::write(&path, module).map_err(|e| McError::io(&path, e))?;
        Ok(CheckOutcome::Verified)
    }
}

/// Subprocess-backed checker: writes the module to the fixed input path,
/// launches the checker on it, and treats a counterexample file appearing in
/// the working directory as a violation. Both files are removed once
/// consumed.
pub struct NusmvChecker {
    exec: PathBuf,
    workdir: PathBuf,
}

impl Default for NusmvChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl NusmvChecker {
    pub fn new() -> Self {
        Self {
            exec: PathBuf::from("NuSMV"),
            workdir: PathBuf::from("."),
        }
    }

    pub fn with_exec(mut self, exec: impl Into<PathBuf>) -> Self {
        self.exec = exec.into();
        self
    }

    pub fn in_dir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }
}

impl ModelChecker for NusmvChecker {
    fn check(&self, module: &str) -> McResult<CheckOutcome> {
        let input = self.workdir.join(CHECKER_INPUT_FILE);
        let xml = self.workdir.join(COUNTEREXAMPLE_FILE);
        fs::write(&input, module).map_err(|e| McError::io(&input, e))?;

        debug!(exec = %self.exec.display(), "launching model checker");
        let status = std::process::Command::new(&self.exec)
            .arg(&input)
            .current_dir(&self.workdir)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
        let _ = fs::remove_file(&input);

        let status = status.map_err(|e| McError::External {
            tool: "model checker".to_string(),
            reason: e.to_string(),
        })?;
        if !status.success() {
            return Err(McError::External {
                tool: "model checker".to_string(),
                reason: format!("exit status {status}"),
            });
        }

        match fs::read_to_string(&xml) {
            Ok(text) => {
                let _ = fs::remove_file(&xml);
                Ok(CheckOutcome::Violated { xml: text })
            }
            Err(_) => Ok(CheckOutcome::Verified),
        }
    }
}
