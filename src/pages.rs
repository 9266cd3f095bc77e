//! Page flow of the emotion detector.
//!
//! Pages are plain data: one descriptor list per [`AppVariant`], consumed by
//! a single [`PageNavigator`]. Rendering is left to the front-end.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::database::SurveyType;
use crate::error::{AppError, Result};

pub const SURVEY_OPTIONS: [&str; 3] = ["Yes", "No", "Maybe"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppVariant {
    /// Detector only
    Plain,
    /// Detector with points, badges, challenges and storyline
    #[default]
    Gamified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageId {
    Welcome,
    PreSurvey,
    Instructions,
    MainApp,
    PostSurvey,
}

impl PageId {
    pub const ALL: [PageId; 5] = [
        PageId::Welcome,
        PageId::PreSurvey,
        PageId::Instructions,
        PageId::MainApp,
        PageId::PostSurvey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageId::Welcome => "welcome",
            PageId::PreSurvey => "pre_survey",
            PageId::Instructions => "instructions",
            PageId::MainApp => "main_app",
            PageId::PostSurvey => "post_survey",
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        PageId::ALL
            .iter()
            .copied()
            .find(|page| page.as_str() == s)
            .ok_or_else(|| AppError::UnknownPage(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDescriptor {
    pub id: PageId,
    pub title: String,
    pub lines: Vec<String>,
    pub questions: Vec<String>,
    pub options: Vec<String>,
    pub action: String,
    pub next: Option<PageId>,
}

impl PageDescriptor {
    fn new(id: PageId, title: &str, action: &str, next: Option<PageId>) -> Self {
        Self {
            id,
            title: title.to_string(),
            lines: Vec::new(),
            questions: Vec::new(),
            options: Vec::new(),
            action: action.to_string(),
            next,
        }
    }

    fn lines(mut self, lines: &[&str]) -> Self {
        self.lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    fn survey(mut self, questions: &[&str]) -> Self {
        self.questions = questions.iter().map(|q| q.to_string()).collect();
        self.options = SURVEY_OPTIONS.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn survey_type(&self) -> Option<SurveyType> {
        match self.id {
            PageId::PreSurvey => Some(SurveyType::Pre),
            PageId::PostSurvey => Some(SurveyType::Post),
            _ => None,
        }
    }

    /// Pairs each question with its answer. Every question must be answered
    /// with one of the page's options.
    pub fn validate_answers(&self, answers: &[String]) -> Result<Vec<(String, String)>> {
        if self.questions.is_empty() {
            return Err(AppError::Validation(format!(
                "page '{}' has no survey",
                self.id
            )));
        }
        if answers.len() != self.questions.len() {
            return Err(AppError::Validation(format!(
                "expected {} answers, got {}",
                self.questions.len(),
                answers.len()
            )));
        }

        self.questions
            .iter()
            .zip(answers)
            .enumerate()
            .map(|(idx, (question, answer))| {
                let answer = answer.trim();
                if self.options.iter().any(|o| o == answer) {
                    Ok((question.clone(), answer.to_string()))
                } else {
                    Err(AppError::Validation(format!(
                        "question {} needs one of {}",
                        idx + 1,
                        self.options.join("/")
                    )))
                }
            })
            .collect()
    }
}

pub fn pages(variant: AppVariant) -> Vec<PageDescriptor> {
    let mut instructions = vec![
        "1. Enter a sentence or phrase in the text box.",
        "2. Click 'Detect Emotion' to see what the AI predicts.",
        "3. Add your own examples to help the AI learn!",
    ];
    if variant == AppVariant::Gamified {
        instructions.push("4. Earn points and badges as you progress!");
        instructions.push("5. Have fun and learn how AI works!");
    } else {
        instructions.push("4. Have fun and learn how AI works!");
    }

    vec![
        PageDescriptor::new(
            PageId::Welcome,
            "Welcome to the AI Emotion Detector! 🧠",
            "Next",
            Some(PageId::PreSurvey),
        ),
        PageDescriptor::new(
            PageId::PreSurvey,
            "Pre-Survey: What do you know about AI?",
            "Next",
            Some(PageId::Instructions),
        )
        .survey(&[
            "1. Have you heard about AI before?",
            "2. Do you know how AI learns from data?",
            "3. Can you name an example of AI in real life?",
            "4. Do you know what sentiment analysis is?",
            "5. Have you ever trained an AI model?",
        ]),
        PageDescriptor::new(
            PageId::Instructions,
            "How to Use the App",
            "Start",
            Some(PageId::MainApp),
        )
        .lines(&instructions),
        PageDescriptor::new(
            PageId::MainApp,
            "Make Your Own AI Emotion Detector 🧠",
            "Next",
            Some(PageId::PostSurvey),
        ),
        PageDescriptor::new(
            PageId::PostSurvey,
            "Post-Survey: What did you learn?",
            "Submit",
            None,
        )
        .survey(&[
            "1. Did you learn how AI detects emotions?",
            "2. Can you explain how the AI works?",
            "3. Would you like to learn more about AI?",
            "4. Did you enjoy training the AI?",
            "5. Do you think AI can understand human emotions?",
        ]),
    ]
}

/// Thank-you text listing what was answered.
pub fn survey_feedback(answers: &[(String, String)]) -> String {
    let mut feedback = String::from("Thank you for completing the survey!\n\nHere's what you shared:\n");
    for (idx, (_, answer)) in answers.iter().enumerate() {
        feedback.push_str(&format!("Q{}: {}\n", idx + 1, answer));
    }
    feedback
}

pub struct PageNavigator {
    pages: Vec<PageDescriptor>,
    current: PageId,
}

impl PageNavigator {
    pub fn new(variant: AppVariant) -> Self {
        Self {
            pages: pages(variant),
            current: PageId::Welcome,
        }
    }

    pub fn pages(&self) -> &[PageDescriptor] {
        &self.pages
    }

    pub fn page(&self, id: PageId) -> Result<&PageDescriptor> {
        self.pages
            .iter()
            .find(|page| page.id == id)
            .ok_or_else(|| AppError::UnknownPage(id.to_string()))
    }

    pub fn current(&self) -> Result<&PageDescriptor> {
        self.page(self.current)
    }

    pub fn show(&mut self, id: PageId) -> Result<&PageDescriptor> {
        self.page(id)?;
        self.current = id;
        self.page(id)
    }

    /// Moves to the next page; the last page stays put.
    pub fn advance(&mut self) -> Result<&PageDescriptor> {
        let next = self.current()?.next;
        if let Some(next) = next {
            self.current = next;
        }
        self.current()
    }
}
