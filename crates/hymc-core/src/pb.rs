//! Pseudo-Boolean serialization and the CNF bridge
//!
//! A constraint group is serialized in the external encoder's line format,
//! one constraint per line:
//!
//! ```text
//! 3*d_0 6*d_1 12*d_2 >= 5;
//! ```
//!
//! The encoder replies with a DIMACS-like document: a `num_vars num_clauses`
//! header, a line of variable names in index order, then one clause per line
//! of 1-based signed literals terminated by `0`. Variables beyond the named
//! set are Tseitin auxiliaries; they are given `_aux<i>` names from a
//! counter the caller threads across invocations so auxiliary names stay
//! globally unique. Primed names surface as `next(base)` in the rendered
//! CNF.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use itertools::Itertools;
use num_traits::Zero;
use tracing::debug;

use crate::error::{McError, McResult};
use crate::problem::{ConstrGroup, Problem};

/// Fixed name of the encoder's input file inside the working directory.
pub const PB_INPUT_FILE: &str = "minisat_input";
/// Fixed name of the encoder's output file inside the working directory.
pub const PB_OUTPUT_FILE: &str = "minisat_output";

/// External pseudo-Boolean to CNF encoder.
///
/// Implementations receive the serialized constraint set and return the raw
/// encoder reply. Test suites substitute in-process fakes here.
pub trait PbEncoder {
    fn encode(&self, pb: &str) -> McResult<String>;
}

/// Serialize one constraint group in the encoder's input format.
///
/// Terms follow the group's scope order, so the output is deterministic.
pub fn serialize_group(problem: &Problem, group: ConstrGroup) -> String {
    let mut out = String::new();
    for c in problem.constrs(group) {
        let terms = problem
            .scope_vars(group)
            .filter_map(|v| {
                let coeff = c.coeff(v.name());
                (!coeff.is_zero()).then(|| format!("{coeff}*{}", v.name()))
            })
            .join(" ");
        out.push_str(&terms);
        out.push_str(&format!(" >= {};\n", -c.free()));
    }
    out
}

/// Run the encoder over one group and render its reply as a symbolic CNF.
///
/// Returns the CNF string (empty when the encoder emitted zero clauses) and
/// the auxiliary-name counter to thread into the next invocation.
pub fn encode_group(
    problem: &Problem,
    group: ConstrGroup,
    aux_start: usize,
    encoder: &dyn PbEncoder,
) -> McResult<(String, usize)> {
    debug!(
        ?group,
        constraints = problem.constr_count(group),
        "encoding constraint group"
    );
    let reply = encoder.encode(&serialize_group(problem, group))?;
    parse_cnf(&reply, aux_start)
}

/// Parse an encoder reply into a `(a | !b) & (c | d)` string.
fn parse_cnf(reply: &str, aux_start: usize) -> McResult<(String, usize)> {
    let bad = |reason: String| McError::External {
        tool: "pb encoder".to_string(),
        reason,
    };

    let mut lines = reply.lines();
    let header = lines
        .next()
        .ok_or_else(|| bad("empty reply".to_string()))?;
    let mut counts = header.split_whitespace();
    let num_vars: usize = counts
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| bad(format!("malformed header \"{header}\"")))?;
    let num_clauses: usize = counts
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| bad(format!("malformed header \"{header}\"")))?;

    if num_clauses == 0 {
        return Ok((String::new(), aux_start));
    }

    let mut names: Vec<String> = lines
        .next()
        .ok_or_else(|| bad("missing variable names".to_string()))?
        .split_whitespace()
        .map(|name| match name.strip_suffix('\'') {
            Some(base) => format!("next({base})"),
            None => name.to_string(),
        })
        .collect();

    let mut aux_next = aux_start;
    for _ in names.len()..num_vars {
        names.push(format!("_aux{aux_next}"));
        aux_next += 1;
    }

    let mut clauses = Vec::with_capacity(num_clauses);
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut literals = Vec::new();
        for token in line.split_whitespace() {
            let lit: i64 = token
                .parse()
                .map_err(|_| bad(format!("malformed literal \"{token}\"")))?;
            if lit == 0 {
                break;
            }
            let index = lit.unsigned_abs() as usize - 1;
            let name = names
                .get(index)
                .ok_or_else(|| bad(format!("literal {lit} out of range")))?;
            if lit < 0 {
                literals.push(format!("!{name}"));
            } else {
                literals.push(name.clone());
            }
        }
        if !literals.is_empty() {
            clauses.push(format!("({})", literals.iter().join(" | ")));
        }
    }

    Ok((clauses.iter().join(" & "), aux_next))
}

/// Subprocess-backed encoder speaking the minisat+ command line:
/// `minisat+ <input> -cnf=<output>`.
///
/// Input and output use the fixed file names inside the configured working
/// directory and are removed once consumed.
pub struct MinisatPlusEncoder {
    exec: PathBuf,
    workdir: PathBuf,
}

impl Default for MinisatPlusEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MinisatPlusEncoder {
    pub fn new() -> Self {
        Self {
            exec: PathBuf::from("minisat+"),
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

impl PbEncoder for MinisatPlusEncoder {
    fn encode(&self, pb: &str) -> McResult<String> {
        let input = self.workdir.join(PB_INPUT_FILE);
        let output = self.workdir.join(PB_OUTPUT_FILE);
        fs::write(&input, pb).map_err(|e| McError::io(&input, e))?;

        debug!(exec = %self.exec.display(), "launching pb encoder");
        let status = Command::new(&self.exec)
            .arg(&input)
            .arg(format!("-cnf={}", output.display()))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        let _ = fs::remove_file(&input);

        let status = status.map_err(|e| McError::External {
            tool: "pb encoder".to_string(),
            reason: e.to_string(),
        })?;
        if !status.success() {
            let _ = fs::remove_file(&output);
            return Err(McError::External {
                tool: "pb encoder".to_string(),
                reason: format!("exit status {status}"),
            });
        }

        let reply = fs::read_to_string(&output).map_err(|_| McError::External {
            tool: "pb encoder".to_string(),
            reason: "produced no output file".to_string(),
        })?;
        let _ = fs::remove_file(&output);
        Ok(reply)
    }
}
