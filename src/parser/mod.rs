//! Workflow file parser.
//!
//! Turns the line-oriented workflow format into a [`ParseTree`]:
//!
//! ```text
//! ; variables shadow earlier definitions, steps snapshot them
//! DATA=input
//!
//! out.csv <- ${DATA}/raw.csv [shell]
//!     sort ${INPUT} > ${OUTPUT}
//!
//! cleanup() [-timecheck]
//!     rm -f scratch.*
//! ```
//!
//! - `;` starts a comment, blank lines separate blocks
//! - `NAME=value` binds a variable
//! - `outputs <- inputs [options]` opens a step; entries are comma-separated,
//!   a `%name` entry is a tag
//! - `name() [options]` opens a method
//! - indented lines are commands for the open step or method
//!
//! Path entries are substituted at parse time; command lines keep their
//! variable references as fragments for late binding.

pub mod fragments;

pub use fragments::{parse_fragments, resolve_refs};

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DrakeError, Result};
use crate::workflow::{step_dirname, Method, MethodMode, ParseTree, Step, StepOptions};

static RE_VAR_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)=(.*)$").unwrap());
static RE_METHOD_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_-]*)\(\)\s*(\[.*\])?$").unwrap());
static RE_STEP_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)<-(.*?)(\[.*\])?$").unwrap());

/// Parser state: variable scopes plus the block currently collecting commands.
pub struct Parser {
    /// Fallback bindings (environment and `--vars`), read-only.
    seed: HashMap<String, String>,
    /// Bindings defined in the workflow file so far.
    defined: HashMap<String, String>,
    /// Protocol names steps are allowed to reference.
    protocols: HashSet<String>,
    steps: Vec<Step>,
    methods: HashMap<String, Method>,
    open: Option<Block>,
}

enum Block {
    Step(Step),
    Method(String, Method),
}

impl Parser {
    /// Create a parser seeded with fallback variable bindings.
    pub fn new(seed: HashMap<String, String>, protocols: HashSet<String>) -> Self {
        Self {
            seed,
            defined: HashMap::new(),
            protocols,
            steps: Vec::new(),
            methods: HashMap::new(),
            open: None,
        }
    }

    /// Parse complete workflow text into a tree.
    pub fn parse(mut self, text: &str) -> Result<ParseTree> {
        for (line_idx, line) in text.lines().enumerate() {
            self.parse_line(line_idx + 1, line)?;
        }
        self.close_block();

        ParseTree::new(self.steps, self.methods)
    }

    fn parse_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with(';') {
            return Ok(());
        }

        // Indented lines are command text for the open block.
        if line.starts_with(' ') || line.starts_with('\t') {
            let cmds = match &mut self.open {
                Some(Block::Step(step)) => &mut step.cmds,
                Some(Block::Method(_, method)) => &mut method.cmds,
                None => {
                    return Err(syntax(line_no, line, "command line outside of a step or method"))
                }
            };
            cmds.push(parse_fragments(line));
            return Ok(());
        }

        self.close_block();

        if let Some(caps) = RE_VAR_DEF.captures(trimmed) {
            let name = caps[1].to_string();
            let value = self
                .resolve(&caps[2])
                .map_err(|e| syntax(line_no, line, &e.to_string()))?;
            self.defined.insert(name, value);
            return Ok(());
        }

        if let Some(caps) = RE_METHOD_DEF.captures(trimmed) {
            let name = caps[1].to_string();
            if self.methods.contains_key(&name) {
                return Err(syntax(line_no, line, &format!("duplicate method '{}'", name)));
            }
            let opts = self.parse_options(line_no, line, caps.get(2).map(|m| m.as_str()))?;
            self.open = Some(Block::Method(
                name,
                Method {
                    vars: self.defined.clone(),
                    cmds: Vec::new(),
                    opts,
                },
            ));
            return Ok(());
        }

        if let Some(caps) = RE_STEP_DEF.captures(trimmed) {
            let (outputs, output_tags) = self.parse_entries(line_no, line, &caps[1])?;
            let (inputs, input_tags) = self.parse_entries(line_no, line, &caps[2])?;
            let opts = self.parse_options(line_no, line, caps.get(3).map(|m| m.as_str()))?;

            self.open = Some(Block::Step(Step {
                inputs,
                outputs,
                input_tags,
                output_tags,
                vars: self.defined.clone(),
                cmds: Vec::new(),
                opts,
                dirname: String::new(),
            }));
            return Ok(());
        }

        Err(syntax(line_no, line, "unrecognized line"))
    }

    fn close_block(&mut self) {
        match self.open.take() {
            Some(Block::Step(mut step)) => {
                step.dirname = step_dirname(&step.outputs, &step.output_tags, self.steps.len());
                self.steps.push(step);
            }
            Some(Block::Method(name, method)) => {
                self.methods.insert(name, method);
            }
            None => {}
        }
    }

    /// Split a comma-separated entry list into (paths, tags), substituting
    /// variable references in each entry.
    fn parse_entries(
        &self,
        line_no: usize,
        line: &str,
        raw: &str,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let mut paths = Vec::new();
        let mut tags = Vec::new();

        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let resolved = self
                .resolve(entry)
                .map_err(|e| syntax(line_no, line, &e.to_string()))?;

            if let Some(tag) = resolved.strip_prefix('%') {
                tags.push(tag.to_string());
            } else {
                paths.push(resolved);
            }
        }

        Ok((paths, tags))
    }

    /// Parse a trailing `[...]` option group.
    fn parse_options(
        &self,
        line_no: usize,
        line: &str,
        raw: Option<&str>,
    ) -> Result<StepOptions> {
        let mut opts = StepOptions::default();

        let Some(raw) = raw else {
            return Ok(opts);
        };
        let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');

        for entry in inner.split_whitespace() {
            if let Some((key, value)) = entry.split_once(':') {
                match key {
                    "method" => opts.method = Some(value.to_string()),
                    "method-mode" => {
                        opts.method_mode = Some(MethodMode::parse(value).ok_or_else(|| {
                            syntax(line_no, line, &format!("invalid method-mode '{}'", value))
                        })?);
                    }
                    "protocol" => {
                        opts.protocol = Some(self.check_protocol(line_no, line, value)?)
                    }
                    other => {
                        return Err(syntax(line_no, line, &format!("unknown option '{}'", other)))
                    }
                }
            } else if let Some(flag) = entry.strip_prefix('+') {
                match flag {
                    "timecheck" => opts.timecheck = Some(true),
                    other => {
                        return Err(syntax(line_no, line, &format!("unknown flag '{}'", other)))
                    }
                }
            } else if let Some(flag) = entry.strip_prefix('-') {
                match flag {
                    "timecheck" => opts.timecheck = Some(false),
                    other => {
                        return Err(syntax(line_no, line, &format!("unknown flag '{}'", other)))
                    }
                }
            } else {
                opts.protocol = Some(self.check_protocol(line_no, line, entry)?);
            }
        }

        if opts.method_mode.is_some() && opts.method.is_none() {
            return Err(syntax(line_no, line, "method-mode requires method"));
        }

        Ok(opts)
    }

    fn check_protocol(&self, line_no: usize, line: &str, name: &str) -> Result<String> {
        if !self.protocols.contains(name) {
            return Err(syntax(
                line_no,
                line,
                &DrakeError::UnknownProtocol {
                    name: name.to_string(),
                }
                .to_string(),
            ));
        }
        Ok(name.to_string())
    }

    /// Resolve `${name}` references against in-file definitions, falling
    /// back to the seed environment.
    fn resolve(&self, text: &str) -> Result<String> {
        let mut scope = self.seed.clone();
        scope.extend(self.defined.iter().map(|(k, v)| (k.clone(), v.clone())));
        resolve_refs(text, &scope)
    }
}

fn syntax(line_no: usize, text: &str, msg: &str) -> DrakeError {
    DrakeError::Syntax {
        line_no,
        text: text.to_string(),
        msg: msg.to_string(),
    }
}

/// Parse workflow text with the given seed bindings and protocol names.
pub fn parse_workflow(
    text: &str,
    seed: HashMap<String, String>,
    protocols: HashSet<String>,
) -> Result<ParseTree> {
    Parser::new(seed, protocols).parse(text)
}
