//! Screening of raw SQL text accepted from criteria, sort columns and joins.

use crate::error::{Result, VellumError};
use regex::Regex;
use std::sync::LazyLock;

/// Substrings whose presence marks a string as a complete conditional clause.
/// Matched against the upper-cased clause.
pub const CONDITIONAL_OPERATORS: &[&str] = &[
    "=",
    "!=",
    "<",
    "<=",
    ">",
    ">=",
    "<=>",
    " LIKE ",
    " IS NULL",
    " IS NOT NULL",
    " BETWEEN ",
    " IN ",
    " IN(",
    " NOT(",
    " NOT (",
    " NOT IN ",
    " NOT IN(",
    " EXISTS (",
    " EXISTS(",
    " NOT EXISTS (",
    " NOT EXISTS(",
    " COALESCE(",
    " GREATEST(",
    " INTERVAL(",
    " LEAST(",
    "MATCH(",
    "MATCH (",
    "MAX(",
    "MIN(",
    "AVG(",
];

const MASK: &str = "{mask}";

struct Screens {
    /// Quoted literals, masked before any other check.
    literals: [Regex; 3],
    sleep: Regex,
    benchmark: Regex,
}

impl Screens {
    fn compile() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            literals: [
                Regex::new(r"\\'.*?\\'")?,
                Regex::new(r#"".*?""#)?,
                Regex::new(r"'.*?'")?,
            ],
            sleep: Regex::new(r"(?i)sleep\s*\(\s*\d+\s*\)")?,
            benchmark: Regex::new(r"(?i)benchmark\s*\(\s*.+,.+\s*\)")?,
        })
    }
}

static SCREENS: LazyLock<std::result::Result<Screens, regex::Error>> =
    LazyLock::new(Screens::compile);

/// Returns `false` when a clause looks like an injection attempt.
///
/// Trailing spaces and semicolons are ignored and quoted literals are masked;
/// what remains must not contain `;`, `union`, a `sleep(n)` call or a
/// `benchmark(...)` call.
pub fn is_valid_clause(clause: &str) -> bool {
    let Ok(screens) = &*SCREENS else {
        return false;
    };
    let mut output = clause.trim_end_matches([' ', ';']).to_string();
    for literal in &screens.literals {
        output = literal.replace_all(&output, MASK).into_owned();
    }
    if screens.sleep.is_match(&output) || screens.benchmark.is_match(&output) {
        return false;
    }
    !output.contains(';') && !output.to_lowercase().contains("union")
}

/// Screens `clause`, failing with [`VellumError::SecurityViolation`].
pub fn validate_clause(clause: &str) -> Result<()> {
    if is_valid_clause(clause) {
        Ok(())
    } else {
        Err(VellumError::SecurityViolation(clause.to_string()))
    }
}

/// Returns `true` if `clause` contains a conditional operator.
///
/// The clause is screened first; a suspect clause is an error, not `false`.
pub fn is_conditional_clause(clause: &str) -> Result<bool> {
    validate_clause(clause)?;
    let upper = clause.to_uppercase();
    Ok(CONDITIONAL_OPERATORS.iter().any(|op| upper.contains(op)))
}
