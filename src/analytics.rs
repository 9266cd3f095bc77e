use serde::Serialize;
use std::collections::BTreeMap;

use crate::database::{SurveyResponse, SurveyType};
use crate::pages::SURVEY_OPTIONS;
use crate::plant::LearningCurve;

#[derive(Serialize, Clone, Debug)]
pub struct QuestionBreakdown {
    pub question: String,
    pub counts: BTreeMap<String, usize>,
    pub total: usize,
    /// Share of "Yes" answers, 0.0 when nobody answered
    pub yes_rate: f64,
}

#[derive(Serialize, Clone, Debug)]
pub struct SurveySummary {
    pub respondents: usize,
    pub pre: Vec<QuestionBreakdown>,
    pub post: Vec<QuestionBreakdown>,
    pub average_pre_yes_rate: f64,
    pub average_post_yes_rate: f64,
}

// Chart data structures
#[derive(Serialize, Clone, Debug)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

pub struct SurveyAnalyzer;

impl SurveyAnalyzer {
    pub fn new() -> Self {
        SurveyAnalyzer
    }

    pub fn summarize(&self, responses: &[SurveyResponse]) -> SurveySummary {
        let mut respondents: Vec<i64> = responses.iter().map(|r| r.user_id).collect();
        respondents.sort_unstable();
        respondents.dedup();

        let pre = self.breakdown(responses, SurveyType::Pre);
        let post = self.breakdown(responses, SurveyType::Post);

        SurveySummary {
            respondents: respondents.len(),
            average_pre_yes_rate: self.average_yes_rate(&pre),
            average_post_yes_rate: self.average_yes_rate(&post),
            pre,
            post,
        }
    }

    fn breakdown(&self, responses: &[SurveyResponse], survey_type: SurveyType) -> Vec<QuestionBreakdown> {
        // Keep questions in the order they were first answered
        let mut order: Vec<String> = Vec::new();
        let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();

        for response in responses.iter().filter(|r| r.survey_type == survey_type) {
            if !counts.contains_key(&response.question) {
                order.push(response.question.clone());
                let empty = SURVEY_OPTIONS.iter().map(|o| (o.to_string(), 0)).collect();
                counts.insert(response.question.clone(), empty);
            }
            if let Some(per_question) = counts.get_mut(&response.question) {
                *per_question.entry(response.answer.clone()).or_insert(0) += 1;
            }
        }

        order
            .into_iter()
            .filter_map(|question| {
                let per_question = counts.remove(&question)?;
                let total: usize = per_question.values().sum();
                let yes = per_question.get("Yes").copied().unwrap_or(0);
                Some(QuestionBreakdown {
                    question,
                    yes_rate: if total > 0 { yes as f64 / total as f64 } else { 0.0 },
                    counts: per_question,
                    total,
                })
            })
            .collect()
    }

    fn average_yes_rate(&self, questions: &[QuestionBreakdown]) -> f64 {
        if questions.is_empty() {
            return 0.0;
        }
        questions.iter().map(|q| q.yes_rate).sum::<f64>() / questions.len() as f64
    }

    pub fn learning_curve_chart(&self, curve: &LearningCurve) -> ChartData {
        ChartData {
            labels: curve.data_points.iter().map(|n| format!("Point {}", n)).collect(),
            values: curve.predictions.clone(),
        }
    }
}

impl Default for SurveyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
