//! Fragment parsing for command lines and path entries.
//!
//! Command text supports variable references using `${name}` syntax:
//!
//! - `${variable_name}` - a reference, resolved at materialization time
//! - `$$` - a literal `$`
//!
//! Everything else is literal text.

use std::collections::HashMap;

use crate::error::{DrakeError, Result};
use crate::workflow::{CommandLine, Fragment};

/// Parse a line of command text into fragments.
pub fn parse_fragments(input: &str) -> CommandLine {
    let mut fragments = Vec::new();
    let mut chars = input.chars().peekable();
    let mut literal = String::new();

    while let Some(c) = chars.next() {
        if c != '$' {
            literal.push(c);
            continue;
        }

        match chars.peek() {
            Some('$') => {
                chars.next();
                literal.push('$');
            }
            Some('{') => {
                chars.next();

                if !literal.is_empty() {
                    fragments.push(Fragment::Literal(std::mem::take(&mut literal)));
                }

                let mut name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    name.push(c);
                }

                fragments.push(Fragment::VarRef(name));
            }
            _ => literal.push('$'),
        }
    }

    if !literal.is_empty() {
        fragments.push(Fragment::Literal(literal));
    }

    fragments
}

/// Resolve every reference in `input` against `vars`, producing plain text.
///
/// Used for path entries in step headers, which are substituted at parse
/// time rather than carried as fragments.
pub fn resolve_refs(input: &str, vars: &HashMap<String, String>) -> Result<String> {
    let mut out = String::new();

    for fragment in parse_fragments(input) {
        match fragment {
            Fragment::Literal(text) => out.push_str(&text),
            Fragment::VarRef(name) => {
                let value = vars
                    .get(&name)
                    .ok_or(DrakeError::UndefinedVariable { name })?;
                out.push_str(value);
            }
        }
    }

    Ok(out)
}
