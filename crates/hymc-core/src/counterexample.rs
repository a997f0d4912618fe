//! Counterexample traces
//!
//! A counterexample is a per-step valuation of the input and state
//! variables, stored as two dense step-major matrices. Steps are ingested
//! from the checker's counterexample XML: one `<node>` element per step,
//! each with a `<state>` and an `<input>` child holding
//! `<value variable="name">literal</value>` entries.

use std::fs;
use std::path::Path;

use num_traits::Zero;
use rustc_hash::FxHashMap;

use crate::error::{McError, McResult};
use crate::model::BoolModel;
use crate::num::{parse_rational, Rational};
use crate::problem::{Problem, VarGroup};

/// A trace of input/state valuations.
#[derive(Debug, Clone)]
pub struct Counterexample {
    input_cols: FxHashMap<String, usize>,
    state_cols: FxHashMap<String, usize>,
    input_steps: Vec<Vec<Rational>>,
    state_steps: Vec<Vec<Rational>>,
}

impl Counterexample {
    /// An empty trace addressing a problem's input and state groups.
    pub fn for_problem(problem: &Problem) -> Self {
        Self::with_names(
            problem.vars(VarGroup::Input).map(|v| v.name().to_string()),
            problem.vars(VarGroup::State).map(|v| v.name().to_string()),
        )
    }

    /// An empty trace addressing a Boolean model's variables (auxiliaries
    /// included).
    pub fn for_model(model: &BoolModel) -> Self {
        Self::with_names(
            model.vars_input().iter().cloned(),
            model.vars_state().iter().cloned(),
        )
    }

    fn with_names(
        inputs: impl Iterator<Item = String>,
        states: impl Iterator<Item = String>,
    ) -> Self {
        Self {
            input_cols: inputs.enumerate().map(|(i, n)| (n, i)).collect(),
            state_cols: states.enumerate().map(|(i, n)| (n, i)).collect(),
            input_steps: Vec::new(),
            state_steps: Vec::new(),
        }
    }

    pub fn step_count(&self) -> usize {
        self.state_steps.len()
    }

    pub fn input_count(&self) -> usize {
        self.input_cols.len()
    }

    pub fn state_count(&self) -> usize {
        self.state_cols.len()
    }

    /// Append a step. The first step starts at zero; later steps start as a
    /// copy of their predecessor, so sparse counterexamples only need to
    /// record the variables that changed.
    pub fn add_step(&mut self) {
        match self.state_steps.last() {
            Some(last) => {
                let last = last.clone();
                self.state_steps.push(last);
                let last_inputs = self.input_steps.last().cloned().unwrap_or_default();
                self.input_steps.push(last_inputs);
            }
            None => {
                self.state_steps
                    .push(vec![Rational::zero(); self.state_cols.len()]);
                self.input_steps
                    .push(vec![Rational::zero(); self.input_cols.len()]);
            }
        }
    }

    pub fn var_value(&self, step: usize, name: &str) -> McResult<&Rational> {
        let col = self.state_col(name)?;
        Ok(&self.state_steps[step][col])
    }

    pub fn set_var_value(&mut self, step: usize, name: &str, value: Rational) -> McResult<()> {
        let col = self.state_col(name)?;
        self.state_steps[step][col] = value;
        Ok(())
    }

    pub fn ivar_value(&self, step: usize, name: &str) -> McResult<&Rational> {
        let col = self.input_col(name)?;
        Ok(&self.input_steps[step][col])
    }

    pub fn set_ivar_value(&mut self, step: usize, name: &str, value: Rational) -> McResult<()> {
        let col = self.input_col(name)?;
        self.input_steps[step][col] = value;
        Ok(())
    }

    fn state_col(&self, name: &str) -> McResult<usize> {
        self.state_cols
            .get(name)
            .copied()
            .ok_or_else(|| McError::UnknownVariable(name.to_string()))
    }

    fn input_col(&self, name: &str) -> McResult<usize> {
        self.input_cols
            .get(name)
            .copied()
            .ok_or_else(|| McError::UnknownVariable(name.to_string()))
    }

    /// Ingest a counterexample file.
    pub fn read(&mut self, path: &Path) -> McResult<()> {
        let text = fs::read_to_string(path).map_err(|e| McError::io(path, e))?;
        self.read_xml(&text)
    }

    /// Ingest counterexample XML text. Each `<node>` becomes one step.
    pub fn read_xml(&mut self, xml: &str) -> McResult<()> {
        for node in element_blocks(xml, "node") {
            self.add_step();
            let step = self.step_count() - 1;
            if let Some(state) = element_blocks(node, "state").first() {
                for (name, literal) in value_entries(state)? {
                    self.set_var_value(step, &name, parse_value(&literal)?)?;
                }
            }
            if let Some(input) = element_blocks(node, "input").first() {
                for (name, literal) in value_entries(input)? {
                    self.set_ivar_value(step, &name, parse_value(&literal)?)?;
                }
            }
        }
        Ok(())
    }
}

fn malformed(reason: impl Into<String>) -> McError {
    McError::External {
        tool: "model checker".to_string(),
        reason: format!("malformed counterexample: {}", reason.into()),
    }
}

fn parse_value(literal: &str) -> McResult<Rational> {
    parse_rational(literal).ok_or_else(|| malformed(format!("bad value \"{literal}\"")))
}

/// Inner content of every `<tag ...>...</tag>` element, in document order.
fn element_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut blocks = Vec::new();
    let mut pos = 0;
    while let Some(start) = xml[pos..].find(&open) {
        let after_open = pos + start + open.len();
        let Some(gt) = xml[after_open..].find('>') else {
            break;
        };
        let content_start = after_open + gt + 1;
        let Some(end) = xml[content_start..].find(&close) else {
            break;
        };
        blocks.push(&xml[content_start..content_start + end]);
        pos = content_start + end + close.len();
    }
    blocks
}

/// `(variable, text)` pairs of every `<value variable="...">text</value>`.
fn value_entries(block: &str) -> McResult<Vec<(String, String)>> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while let Some(start) = block[pos..].find("<value") {
        let tag_start = pos + start;
        let attr = block[tag_start..]
            .find("variable=\"")
            .ok_or_else(|| malformed("value without a variable attribute"))?;
        let name_start = tag_start + attr + "variable=\"".len();
        let name_end = block[name_start..]
            .find('"')
            .ok_or_else(|| malformed("unterminated variable attribute"))?;
        let name = &block[name_start..name_start + name_end];

        let gt = block[name_start + name_end..]
            .find('>')
            .ok_or_else(|| malformed("unterminated value tag"))?;
        let text_start = name_start + name_end + gt + 1;
        let text_end = block[text_start..]
            .find("</value>")
            .ok_or_else(|| malformed("unterminated value element"))?;
        let text = block[text_start..text_start + text_end].trim();

        entries.push((name.to_string(), text.to_string()));
        pos = text_start + text_end + "</value>".len();
    }
    Ok(entries)
}
