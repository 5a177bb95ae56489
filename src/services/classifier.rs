//! Classifies retrieval-tool text output into a pass/fail decision.
//!
//! The retrieval tool embeds diagnostic codes in its output (three-letter
//! prefix, digits, severity letter). Exit code 8 means "completed with
//! warnings" and is acceptable as long as every embedded code is on the
//! operator-configured whitelist.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CODE_RE: Regex = Regex::new(r"[A-Z]{3}[0-9]+[EW]").unwrap();
}

/// Exit code the retrieval tool uses for "completed with warnings".
pub const WARNING_EXIT_CODE: i32 = 8;

/// Severity suffix of a diagnostic code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A `{pattern, severity}` pair extracted from retrieval output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct WarningCode {
    pub code: String,
    pub severity: Severity,
}

impl WarningCode {
    /// Parse a single diagnostic token, e.g. `ANS2250W`.
    pub fn parse(token: &str) -> Option<Self> {
        let m = CODE_RE.find(token)?;
        if m.start() != 0 || m.end() != token.len() {
            return None;
        }
        let severity = match token.chars().last() {
            Some('W') => Severity::Warning,
            Some('E') => Severity::Error,
            _ => return None,
        };
        Some(Self {
            code: token.to_string(),
            severity,
        })
    }
}

/// Outcome of classifying one retrieval-tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub accepted: bool,
    /// Every diagnostic code found in the output.
    pub codes: BTreeSet<String>,
    /// On rejection: the non-whitelisted codes, or the full output when
    /// the exit code leaves nothing to diagnose.
    pub debug: Option<String>,
}

/// Decide whether a retrieval invocation is acceptable.
///
/// Exit 0 always passes. Exit 8 passes iff every embedded code is
/// whitelisted (an exit 8 with no diagnosable code at all is treated as
/// a benign warning). Any other exit code is a hard failure regardless
/// of output content. Whitelist matching is exact, not pattern-based.
pub fn classify(exit_code: i32, output: &str, whitelist: &[String]) -> Classification {
    let mut codes = BTreeSet::new();
    for line in output.lines() {
        for m in CODE_RE.find_iter(line) {
            codes.insert(m.as_str().to_string());
        }
    }

    if exit_code == 0 {
        return Classification {
            accepted: true,
            codes,
            debug: None,
        };
    }

    if exit_code == WARNING_EXIT_CODE {
        let rejected: Vec<String> = codes
            .iter()
            .filter(|code| !whitelist.iter().any(|w| w == *code))
            .cloned()
            .collect();

        if rejected.is_empty() {
            if !codes.is_empty() {
                tracing::info!(
                    codes = %join(&codes),
                    "only whitelisted retrieval codes encountered"
                );
            }
            return Classification {
                accepted: true,
                codes,
                debug: None,
            };
        }

        tracing::error!(codes = %rejected.join(", "), "non-whitelisted retrieval codes encountered");
        return Classification {
            accepted: false,
            codes,
            debug: Some(format!("non-whitelisted codes: {}", rejected.join(", "))),
        };
    }

    tracing::error!(exit_code, "retrieval tool returned a hard failure");
    Classification {
        accepted: false,
        codes,
        debug: Some(output.to_string()),
    }
}

fn join(codes: &BTreeSet<String>) -> String {
    codes.iter().cloned().collect::<Vec<_>>().join(", ")
}
