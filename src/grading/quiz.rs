// src/grading/quiz.rs

use std::collections::{BTreeSet, HashMap};

use crate::models::quiz::{QuestionResult, QuizQuestion};

use super::percentage;

/// Score of one quiz submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizGrade {
    pub score: i64,
    pub correct_count: i64,
    pub total_questions: i64,
    pub results: Vec<QuestionResult>,
}

/// Grades answers against the full question set of a topic.
///
/// A question is correct when the selected options equal the correct set,
/// ignoring order and duplicates. Unanswered questions count as wrong;
/// answers to unknown question ids are ignored.
pub fn grade_quiz(questions: &[QuizQuestion], answers: &HashMap<i64, Vec<String>>) -> QuizGrade {
    let results: Vec<QuestionResult> = questions
        .iter()
        .map(|q| {
            let expected: BTreeSet<&str> = q.correct_answers.iter().map(String::as_str).collect();
            let correct = answers.get(&q.id).is_some_and(|given| {
                let given: BTreeSet<&str> = given.iter().map(String::as_str).collect();
                given == expected
            });

            QuestionResult {
                question_id: q.id,
                correct,
                correct_answers: q.correct_answers.0.clone(),
                explanation: q.explanation.clone(),
            }
        })
        .collect();

    let correct_count = results.iter().filter(|r| r.correct).count();

    QuizGrade {
        score: percentage(correct_count, results.len()),
        correct_count: correct_count as i64,
        total_questions: results.len() as i64,
        results,
    }
}
