//! The staleness oracle: decides whether a step is out-of-date and why.

use crate::branch::adjust_step;
use crate::error::{DrakeError, Result};
use crate::fsys::FsFacade;
use crate::options::Options;
use crate::select::MatchType;
use crate::workflow::Step;

/// Why a step was chosen to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// Selected with the `!` marker.
    Forced { via: Option<MatchType> },
    /// Matched by tag or method; such steps always build.
    ViaMatch(MatchType),
    /// An output has no data yet.
    MissingOutput,
    /// The newest input is younger than the oldest output.
    Timestamped,
    /// A scheduled dependency will overwrite the inputs, so timestamps
    /// cannot be evaluated now.
    ProjectedTimestamped,
    /// Steps without inputs always build.
    NoInputStep,
}

impl std::fmt::Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cause::Forced { via: None } => write!(f, "forced"),
            Cause::Forced { via: Some(m) } => write!(f, "forced (via {})", m),
            Cause::ViaMatch(m) => write!(f, "via {}", m),
            Cause::MissingOutput => write!(f, "missing output"),
            Cause::Timestamped => write!(f, "timestamped"),
            Cause::ProjectedTimestamped => write!(f, "projected timestamped"),
            Cause::NoInputStep => write!(f, "no-input step"),
        }
    }
}

/// Decide whether a step is out-of-date.
///
/// Returns the cause when the step should build, `None` when it is
/// up-to-date. `triggered` marks steps whose inputs a scheduled predecessor
/// is about to produce; for those, missing inputs are tolerated unless
/// `fail_on_empty` demands the authoritative run-time check.
pub fn should_build(
    step: &Step,
    options: &Options,
    fs: &FsFacade,
    forced: bool,
    triggered: bool,
    match_type: MatchType,
    fail_on_empty: bool,
) -> Result<Option<Cause>> {
    let adjusted = adjust_step(step, options, fs, false)?;

    let mut empty_inputs = Vec::new();
    for input in &adjusted.inputs {
        if !fs.data_in(input)? {
            empty_inputs.push(input.clone());
        }
    }

    if !empty_inputs.is_empty() && (fail_on_empty || !triggered) {
        return Err(DrakeError::MissingInput {
            paths: empty_inputs,
        });
    }

    if forced {
        let via = (match_type != MatchType::Output).then_some(match_type);
        return Ok(Some(Cause::Forced { via }));
    }

    if match_type != MatchType::Output {
        return Ok(Some(Cause::ViaMatch(match_type)));
    }

    if adjusted.outputs.is_empty() {
        return Ok(None);
    }

    if !triggered {
        for output in &adjusted.outputs {
            if !fs.data_in(output)? {
                return Ok(Some(Cause::MissingOutput));
            }
        }
    }

    if !step.opts.timecheck() {
        return Ok(None);
    }

    if triggered {
        return Ok(Some(Cause::ProjectedTimestamped));
    }

    if adjusted.inputs.is_empty() {
        return Ok(Some(Cause::NoInputStep));
    }

    let mut newest_input = i64::MIN;
    for input in &adjusted.inputs {
        newest_input = newest_input.max(fs.newest_in(input)?.mod_time_ms);
    }

    let mut oldest_output = None;
    for output in &adjusted.outputs {
        if fs.data_in(output)? {
            let ms = fs.oldest_in(output)?.mod_time_ms;
            oldest_output = Some(oldest_output.map_or(ms, |cur: i64| cur.min(ms)));
        }
    }

    match oldest_output {
        Some(oldest) if newest_input > oldest => Ok(Some(Cause::Timestamped)),
        Some(_) => Ok(None),
        // All outputs present was established above; unreachable in practice.
        None => Ok(None),
    }
}
