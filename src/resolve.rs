//! Variable substitution and condition evaluation.
//!
//! Project files reference build variables as `$(Name)` inside property
//! values, item includes, item metadata and `Condition` attributes:
//!
//! - `$(SolutionDir)include;$(ProjectDir)src`
//! - `'$(Configuration)|$(Platform)'=='Debug|x64'`
//!
//! Only the single-comparison condition form is supported: the condition is
//! resolved first, then split on `==`, and the two sides are compared
//! verbatim (quotes and surrounding whitespace included).

use crate::environment::Environment;
use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
//  Reference splitting
// ═══════════════════════════════════════════════════════════════════════════════

/// A fragment of a raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment<'a> {
    /// Text copied through unchanged.
    Literal(&'a str),
    /// A `$(Name)` reference, holding `Name`.
    Variable(&'a str),
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split a raw value into literal text and `$(Name)` references.
///
/// A `$(` that is not followed by an identifier and a closing `)` stays part
/// of the surrounding literal.
pub fn split_references(s: &str) -> Vec<Fragment<'_>> {
    let mut parts = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = s[cursor..].find("$(") {
        let reference_start = cursor + offset;
        let name_start = reference_start + 2;
        let name_len = s[name_start..]
            .find(|c: char| !is_identifier_char(c))
            .unwrap_or(s.len() - name_start);
        let name_end = name_start + name_len;

        if name_len > 0 && s[name_end..].starts_with(')') {
            if literal_start < reference_start {
                parts.push(Fragment::Literal(&s[literal_start..reference_start]));
            }
            parts.push(Fragment::Variable(&s[name_start..name_end]));
            cursor = name_end + 1;
            literal_start = cursor;
        } else {
            cursor = name_start;
        }
    }

    if literal_start < s.len() {
        parts.push(Fragment::Literal(&s[literal_start..]));
    }

    parts
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Resolution
// ═══════════════════════════════════════════════════════════════════════════════

/// Expand `$(Var)` references using an arbitrary lookup.
/// Unknown variables expand to the empty string.
pub fn resolve_with<'v>(s: &str, lookup: impl Fn(&str) -> Option<&'v str>) -> String {
    let mut result = String::with_capacity(s.len());
    for part in split_references(s) {
        match part {
            Fragment::Literal(text) => result.push_str(text),
            Fragment::Variable(name) => {
                if let Some(value) = lookup(name) {
                    result.push_str(value);
                }
            }
        }
    }
    result
}

/// Expand `$(Var)` references in `s` using `env`.
pub fn resolve(s: &str, env: &Environment) -> String {
    if !s.contains("$(") {
        return s.to_string();
    }
    resolve_with(s, |name| env.get(name))
}

/// Resolve `condition` against `env` and compare both sides of its `==`.
///
/// Fails with [`Error::MalformedCondition`] unless the resolved text contains
/// exactly one `==`.
pub fn evaluate(condition: &str, env: &Environment) -> Result<bool> {
    let resolved = resolve(condition, env);
    let mut operands = resolved.split("==");
    match (operands.next(), operands.next(), operands.next()) {
        (Some(lhs), Some(rhs), None) => Ok(lhs == rhs),
        _ => Err(Error::MalformedCondition {
            condition: condition.to_string(),
        }),
    }
}
