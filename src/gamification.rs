use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::Emotion;

pub const DETECT_CHALLENGE: &str = "detect_5_in_a_row";
pub const TRAIN_CHALLENGE: &str = "train_10_examples";

const DETECT_POINTS: u32 = 10;
const TRAIN_POINTS: u32 = 20;
const CHALLENGE_BONUS: u32 = 50;
const PROGRESS_GOAL: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeState {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub description: String,
    pub goal: u32,
    pub progress: u32,
    pub completed: bool,
}

impl Challenge {
    fn new(id: &str, description: &str, goal: u32) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            goal,
            progress: 0,
            completed: false,
        }
    }

    pub fn state(&self) -> ChallengeState {
        if self.completed {
            ChallengeState::Completed
        } else if self.progress == 0 {
            ChallengeState::NotStarted
        } else {
            ChallengeState::InProgress
        }
    }

    /// Advances the counter; returns true only on the step that completes it.
    fn advance(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.progress += 1;
        if self.progress >= self.goal {
            self.completed = true;
            return true;
        }
        false
    }
}

#[derive(Clone)]
struct BadgeTemplate {
    name: String,
    description: String,
    min_points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GamificationEvent {
    PointsAwarded { amount: u32, total: u32 },
    ChallengeCompleted { challenge: String, bonus: u32 },
    BadgeUnlocked { badge: String, description: String },
    TrainingCompleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamificationState {
    pub points: u32,
    pub progress: u32,
    /// Progress as shown on the progress bar
    pub display_progress: u32,
    pub training_complete: bool,
    pub badges: Vec<String>,
    pub challenges: Vec<Challenge>,
    pub storyline: Vec<String>,
}

/// Values written to `user_progress` at the end of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressDraft {
    pub points: i64,
    pub progress: i64,
    pub badges: String,
}

pub struct GamificationTracker {
    points: u32,
    progress: u32,
    training_complete: bool,
    badges: Vec<String>,
    challenges: BTreeMap<String, Challenge>,
    storyline: Vec<String>,
    badge_templates: Vec<BadgeTemplate>,
}

impl Default for GamificationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl GamificationTracker {
    pub fn new() -> Self {
        let mut challenges = BTreeMap::new();
        challenges.insert(
            DETECT_CHALLENGE.to_string(),
            Challenge::new(DETECT_CHALLENGE, "Detect emotions 5 times", 5),
        );
        challenges.insert(
            TRAIN_CHALLENGE.to_string(),
            Challenge::new(TRAIN_CHALLENGE, "Teach the AI 10 new examples", 10),
        );

        let badge_templates = vec![
            BadgeTemplate {
                name: "AI Novice".to_string(),
                description: "Earned 50 points".to_string(),
                min_points: 50,
            },
            BadgeTemplate {
                name: "AI Expert".to_string(),
                description: "Earned 100 points".to_string(),
                min_points: 100,
            },
        ];

        let storyline = vec![
            "Welcome to the world of AI! 🌍".to_string(),
            "You are training an AI assistant named 'EmoBot' to understand human emotions."
                .to_string(),
            "Help EmoBot learn by detecting emotions and adding training data.".to_string(),
            "Complete challenges to unlock rewards and become an AI expert!".to_string(),
        ];

        Self {
            points: 0,
            progress: 0,
            training_complete: false,
            badges: Vec::new(),
            challenges,
            storyline,
            badge_templates,
        }
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn badges(&self) -> &[String] {
        &self.badges
    }

    pub fn challenge(&self, id: &str) -> Option<&Challenge> {
        self.challenges.get(id)
    }

    pub fn storyline(&self) -> &[String] {
        &self.storyline
    }

    pub fn record_detection(&mut self, emotion: Emotion) -> Vec<GamificationEvent> {
        let mut events = Vec::new();
        self.award_points(DETECT_POINTS, &mut events);
        self.advance_challenge(DETECT_CHALLENGE, &mut events);
        self.add_progress(DETECT_POINTS, &mut events);
        self.storyline.push(format!(
            "EmoBot detected: {} {}",
            emotion.capitalized(),
            emotion.emoji()
        ));
        events
    }

    pub fn record_training(&mut self, emotion: Emotion) -> Vec<GamificationEvent> {
        let mut events = Vec::new();
        self.award_points(TRAIN_POINTS, &mut events);
        self.advance_challenge(TRAIN_CHALLENGE, &mut events);
        self.add_progress(TRAIN_POINTS, &mut events);
        self.storyline.push(format!(
            "EmoBot learned: {} {}",
            emotion.capitalized(),
            emotion.emoji()
        ));
        events
    }

    fn award_points(&mut self, amount: u32, events: &mut Vec<GamificationEvent>) {
        self.points += amount;
        events.push(GamificationEvent::PointsAwarded {
            amount,
            total: self.points,
        });
        self.check_badges(events);
    }

    fn advance_challenge(&mut self, id: &str, events: &mut Vec<GamificationEvent>) {
        let completed = match self.challenges.get_mut(id) {
            Some(challenge) => challenge.advance(),
            None => false,
        };
        if completed {
            log::info!("challenge '{}' completed", id);
            events.push(GamificationEvent::ChallengeCompleted {
                challenge: id.to_string(),
                bonus: CHALLENGE_BONUS,
            });
            self.award_points(CHALLENGE_BONUS, events);
        }
    }

    fn check_badges(&mut self, events: &mut Vec<GamificationEvent>) {
        for template in &self.badge_templates {
            if self.points >= template.min_points && !self.badges.contains(&template.name) {
                log::info!("badge '{}' unlocked at {} points", template.name, self.points);
                self.badges.push(template.name.clone());
                events.push(GamificationEvent::BadgeUnlocked {
                    badge: template.name.clone(),
                    description: template.description.clone(),
                });
            }
        }
    }

    fn add_progress(&mut self, amount: u32, events: &mut Vec<GamificationEvent>) {
        self.progress += amount;
        if self.progress >= PROGRESS_GOAL && !self.training_complete {
            self.training_complete = true;
            events.push(GamificationEvent::TrainingCompleted);
        }
    }

    pub fn state(&self) -> GamificationState {
        GamificationState {
            points: self.points,
            progress: self.progress,
            display_progress: self.progress.min(PROGRESS_GOAL),
            training_complete: self.training_complete,
            badges: self.badges.clone(),
            challenges: self.challenges.values().cloned().collect(),
            storyline: self.storyline.clone(),
        }
    }

    pub fn snapshot(&self) -> ProgressDraft {
        ProgressDraft {
            points: i64::from(self.points),
            progress: i64::from(self.progress),
            badges: self.badges.join(", "),
        }
    }
}
