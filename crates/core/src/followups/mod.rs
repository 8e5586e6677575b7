use serde::Serialize;

use crate::prompt::RECOMMENDATIONS_MARKER;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitAnswer {
    pub main_text: String,
    pub recommendations: Vec<String>,
}

/// Splits an answer on the recommendations marker into prose and follow-up chips.
pub fn split_recommendations(answer: &str) -> SplitAnswer {
    let mut pieces = answer.split(RECOMMENDATIONS_MARKER);
    let main_text = pieces.next().unwrap_or_default().to_string();
    let recommendations = pieces
        .next()
        .unwrap_or_default()
        .split('|')
        .map(str::trim)
        .filter(|chip| !chip.is_empty())
        .map(str::to_string)
        .collect();
    SplitAnswer {
        main_text,
        recommendations,
    }
}

/// Answer text without the trailing recommendations block, as copied to the clipboard.
pub fn strip_recommendations(answer: &str) -> &str {
    answer
        .split(RECOMMENDATIONS_MARKER)
        .next()
        .unwrap_or_default()
        .trim()
}
