use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::data::{Emotion, TextCorpus, TrainingExample};
use crate::error::{AppError, Result};
use crate::gamification::{GamificationEvent, GamificationState, GamificationTracker, ProgressDraft};
use crate::model::{Classification, EmotionDetector, NaiveBayesParams};
use crate::pages::{AppVariant, PageNavigator};
use crate::plant::{GardenGame, GrowthRegressorParams};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectOutcome {
    pub result: Classification,
    pub message: String,
    pub explanation: String,
    pub events: Vec<GamificationEvent>,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub corpus_size: usize,
    pub labels: Vec<Emotion>,
    pub generation: u64,
    pub events: Vec<GamificationEvent>,
    pub points: u32,
}

/// Everything one window session used to keep in module globals.
pub struct EmotionLab {
    variant: AppVariant,
    detector: EmotionDetector,
    tracker: GamificationTracker,
    garden: GardenGame,
    navigator: PageNavigator,
}

impl EmotionLab {
    pub fn new(config: &Config) -> Result<Self> {
        let corpus = match &config.classifier.corpus_path {
            Some(path) => TextCorpus::from_csv_path(path)?,
            None => TextCorpus::seeded(),
        };
        let params = NaiveBayesParams::new().alpha(config.classifier.alpha);
        let variant = config.game.variant;

        Ok(Self {
            variant,
            detector: EmotionDetector::new(corpus, params)?,
            tracker: GamificationTracker::new(),
            garden: GardenGame::new(GrowthRegressorParams::from(&config.plant))?,
            navigator: PageNavigator::new(variant),
        })
    }

    pub fn variant(&self) -> AppVariant {
        self.variant
    }

    pub fn detector(&self) -> &EmotionDetector {
        &self.detector
    }

    pub fn navigator(&self) -> &PageNavigator {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut PageNavigator {
        &mut self.navigator
    }

    pub fn garden(&self) -> &GardenGame {
        &self.garden
    }

    pub fn garden_mut(&mut self) -> &mut GardenGame {
        &mut self.garden
    }

    pub fn tracker(&self) -> &GamificationTracker {
        &self.tracker
    }

    pub fn detect(&mut self, text: &str) -> Result<DetectOutcome> {
        let result = self.detector.classify(text)?;
        let explanation = self.detector.explain(&result);
        let message = format!("AI detects: {} {}", result.label.capitalized(), result.emoji);

        let events = match self.variant {
            AppVariant::Gamified => self.tracker.record_detection(result.label),
            AppVariant::Plain => Vec::new(),
        };

        Ok(DetectOutcome {
            result,
            message,
            explanation,
            events,
            points: self.tracker.points(),
        })
    }

    /// Validates, appends and retrains. `label` is the raw selection from the
    /// front-end so a missing choice is reported like an empty text.
    pub fn add_example(&mut self, text: &str, label: Option<&str>) -> Result<TrainOutcome> {
        if text.trim().is_empty() {
            return Err(AppError::EmptyInput);
        }
        let emotion: Emotion = label.ok_or(AppError::MissingLabel)?.parse()?;

        let corpus_size = self.detector.add_example(text, emotion)?;
        let events = match self.variant {
            AppVariant::Gamified => self.tracker.record_training(emotion),
            AppVariant::Plain => Vec::new(),
        };

        Ok(TrainOutcome {
            corpus_size,
            labels: self.detector.labels(),
            generation: self.detector.generation(),
            events,
            points: self.tracker.points(),
        })
    }

    pub fn corpus(&self) -> &[TrainingExample] {
        self.detector.corpus().examples()
    }

    pub fn progress(&self) -> GamificationState {
        self.tracker.state()
    }

    pub fn snapshot(&self) -> ProgressDraft {
        self.tracker.snapshot()
    }
}
