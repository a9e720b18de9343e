// src/grading/evaluator.rs

//! Static string checks over submitted lab code.

use regex::Regex;
use serde::Serialize;

use crate::{
    config::{LAB_PASSING_SCORE, PatternMatching},
    models::lab::Criterion,
};

use super::{GradingError, percentage};

/// Outcome of one criterion, in the same order as the lab defines them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionResult {
    pub header: String,
    pub passed: bool,
    pub description: String,
}

/// Result of grading one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub score: i64,
    pub passed: bool,
    pub results: Vec<CriterionResult>,
}

/// Grades `code` against `criteria`.
///
/// The code is opaque text. A criterion without a pattern always passes.
/// Every criterion weighs the same regardless of its `required` flag.
pub fn evaluate(
    code: &str,
    criteria: &[Criterion],
    mode: PatternMatching,
) -> Result<Evaluation, GradingError> {
    if criteria.is_empty() {
        return Err(GradingError::EmptyCriteria);
    }

    let results: Vec<CriterionResult> = criteria
        .iter()
        .map(|criterion| CriterionResult {
            header: criterion.header.clone(),
            passed: criterion_matches(code, criterion.expected_pattern.as_deref(), mode),
            description: criterion.description.clone(),
        })
        .collect();

    let passed_count = results.iter().filter(|r| r.passed).count();
    let score = percentage(passed_count, results.len());

    Ok(Evaluation {
        score,
        passed: score >= LAB_PASSING_SCORE,
        results,
    })
}

fn criterion_matches(code: &str, pattern: Option<&str>, mode: PatternMatching) -> bool {
    let pattern = match pattern {
        None | Some("") => return true,
        Some(p) => p,
    };

    match mode {
        PatternMatching::Substring => code.contains(pattern),
        PatternMatching::Regex => match Regex::new(pattern) {
            Ok(re) => re.is_match(code),
            Err(e) => {
                tracing::debug!("Pattern {:?} is not a valid regex ({}), matching literally", pattern, e);
                code.contains(pattern)
            }
        },
    }
}
