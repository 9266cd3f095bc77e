use csv::Reader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, Result};

/// Emotion labels, declared in alphabetical order so `Ord` matches the class
/// ordering the classifier reports probabilities in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Excited,
    Happy,
    Neutral,
    Sad,
    Scared,
    Surprised,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Excited,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Scared,
        Emotion::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Excited => "excited",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
            Emotion::Sad => "sad",
            Emotion::Scared => "scared",
            Emotion::Surprised => "surprised",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Emotion::Angry => "😡",
            Emotion::Excited => "🎉",
            Emotion::Happy => "😊",
            Emotion::Neutral => "😐",
            Emotion::Sad => "😢",
            Emotion::Scared => "😨",
            Emotion::Surprised => "😮",
        }
    }

    /// Position in [`Emotion::ALL`], used as the linfa target value.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Emotion> {
        Self::ALL.get(index).copied()
    }

    pub fn capitalized(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        if wanted.is_empty() {
            return Err(AppError::MissingLabel);
        }
        Emotion::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == wanted)
            .ok_or_else(|| AppError::UnknownEmotion(s.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub label: Emotion,
}

#[derive(Debug, Deserialize)]
struct CorpusRow {
    text: String,
    emotion: String,
}

/// Append-only store of labelled examples.
#[derive(Debug, Clone, Default)]
pub struct TextCorpus {
    examples: Vec<TrainingExample>,
}

impl TextCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// The 21 starter sentences, three per emotion.
    pub fn seeded() -> Self {
        let seed: [(&str, Emotion); 21] = [
            ("I am so happy today!", Emotion::Happy),
            ("This is the best day ever!", Emotion::Happy),
            ("I feel great!", Emotion::Happy),
            ("I am so sad right now.", Emotion::Sad),
            ("This is the worst day.", Emotion::Sad),
            ("I feel terrible.", Emotion::Sad),
            ("I am so angry about this!", Emotion::Angry),
            ("This makes me furious!", Emotion::Angry),
            ("I can't believe this happened.", Emotion::Angry),
            ("The weather is nice today.", Emotion::Neutral),
            ("I have no strong feelings about this.", Emotion::Neutral),
            ("This is just okay.", Emotion::Neutral),
            ("Wow, I didn't expect that!", Emotion::Surprised),
            ("This is such a surprise!", Emotion::Surprised),
            ("I am shocked!", Emotion::Surprised),
            ("I am scared of the dark.", Emotion::Scared),
            ("This is terrifying!", Emotion::Scared),
            ("I feel frightened.", Emotion::Scared),
            ("I am so excited for the trip!", Emotion::Excited),
            ("This is going to be amazing!", Emotion::Excited),
            ("I can't wait!", Emotion::Excited),
        ];

        let examples = seed
            .iter()
            .map(|(text, label)| TrainingExample {
                text: text.to_string(),
                label: *label,
            })
            .collect();

        Self { examples }
    }

    /// Loads a `text,emotion` CSV with a header row.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut rdr = Reader::from_path(path)?;
        let mut examples = Vec::new();

        for result in rdr.deserialize() {
            let row: CorpusRow = result?;
            if row.text.trim().is_empty() {
                continue;
            }
            examples.push(TrainingExample {
                text: row.text,
                label: row.emotion.parse()?,
            });
        }

        Ok(Self { examples })
    }

    pub fn push(&mut self, example: TrainingExample) {
        self.examples.push(example);
    }

    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Distinct labels present, in class order.
    pub fn labels(&self) -> Vec<Emotion> {
        let mut labels: Vec<Emotion> = self.examples.iter().map(|e| e.label).collect();
        labels.sort();
        labels.dedup();
        labels
    }
}
