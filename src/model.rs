use linfa::traits::{Fit, Predict, PredictInplace};
use linfa::DatasetBase;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::data::{Emotion, TextCorpus, TrainingExample};
use crate::error::{AppError, Result};
use crate::vectorizer::TfidfVectorizer;

/// Hyperparameters for the multinomial Naive Bayes classifier.
#[derive(Debug, Clone)]
pub struct NaiveBayesParams {
    alpha: f64,
}

impl Default for NaiveBayesParams {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

impl NaiveBayesParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Fitted multinomial Naive Bayes over TF-IDF features.
///
/// Targets are class indices; `classes` holds the distinct indices seen at
/// fit time in ascending order, and every per-class array follows it.
#[derive(Debug, Clone)]
pub struct FittedNaiveBayes {
    classes: Vec<usize>,
    class_log_prior: Array1<f64>,
    feature_log_prob: Array2<f64>,
}

impl Fit<Array2<f64>, Array1<usize>, AppError> for NaiveBayesParams {
    type Object = FittedNaiveBayes;

    fn fit(&self, dataset: &DatasetBase<Array2<f64>, Array1<usize>>) -> Result<Self::Object> {
        let records = &dataset.records;
        let targets = &dataset.targets;

        if records.nrows() == 0 {
            return Err(linfa::Error::NotEnoughSamples.into());
        }
        if self.alpha <= 0.0 {
            return Err(linfa::Error::Parameters(format!(
                "alpha must be positive, got {}",
                self.alpha
            ))
            .into());
        }

        let mut classes: Vec<usize> = targets.iter().copied().collect();
        classes.sort_unstable();
        classes.dedup();

        let n_samples = records.nrows() as f64;
        let n_features = records.ncols();
        let mut class_log_prior = Array1::zeros(classes.len());
        let mut feature_log_prob = Array2::zeros((classes.len(), n_features));

        for (ci, &class) in classes.iter().enumerate() {
            let mut feature_count = Array1::<f64>::zeros(n_features);
            let mut class_count = 0usize;

            for (row, &target) in records.rows().into_iter().zip(targets.iter()) {
                if target == class {
                    feature_count += &row;
                    class_count += 1;
                }
            }

            class_log_prior[ci] = (class_count as f64 / n_samples).ln();

            let smoothed = feature_count.mapv(|c| c + self.alpha);
            let total = smoothed.sum();
            feature_log_prob
                .row_mut(ci)
                .assign(&smoothed.mapv(|c| (c / total).ln()));
        }

        Ok(FittedNaiveBayes {
            classes,
            class_log_prior,
            feature_log_prob,
        })
    }
}

impl FittedNaiveBayes {
    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn joint_log_likelihood(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut jll = x.dot(&self.feature_log_prob.t());
        jll += &self.class_log_prior;
        jll
    }

    /// Per-class probabilities, one row per sample, columns in `classes` order.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut jll = self.joint_log_likelihood(x);
        for mut row in jll.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let total = row.sum();
            row.mapv_inplace(|v| v / total);
        }
        jll
    }
}

impl PredictInplace<Array2<f64>, Array1<usize>> for FittedNaiveBayes {
    fn predict_inplace(&self, x: &Array2<f64>, y: &mut Array1<usize>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let jll = self.joint_log_likelihood(x);
        for (row, target) in jll.axis_iter(Axis(0)).zip(y.iter_mut()) {
            let mut best = 0;
            for (idx, &value) in row.iter().enumerate() {
                if value > row[best] {
                    best = idx;
                }
            }
            *target = self.classes[best];
        }
    }

    fn default_target(&self, x: &Array2<f64>) -> Array1<usize> {
        Array1::zeros(x.nrows())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelProbability {
    pub label: Emotion,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordWeight {
    pub word: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub label: Emotion,
    pub emoji: String,
    pub probabilities: Vec<LabelProbability>,
    /// First few known words of the input that fed the decision
    pub contributing_terms: Vec<String>,
    /// Highest TF-IDF weights in the input
    pub word_importance: Vec<WordWeight>,
    pub generation: u64,
}

impl Classification {
    pub fn probability_of(&self, label: Emotion) -> Option<f64> {
        self.probabilities
            .iter()
            .find(|p| p.label == label)
            .map(|p| p.probability)
    }
}

/// Corpus, vectorizer and classifier kept in lock-step.
///
/// Every appended example triggers a full re-vectorize and re-fit. Vectors
/// produced before a retrain are stale afterwards; `generation` lets callers
/// notice that.
pub struct EmotionDetector {
    corpus: TextCorpus,
    params: NaiveBayesParams,
    vectorizer: TfidfVectorizer,
    model: Option<FittedNaiveBayes>,
    generation: u64,
}

impl EmotionDetector {
    pub fn new(corpus: TextCorpus, params: NaiveBayesParams) -> Result<Self> {
        let mut detector = Self {
            corpus,
            params,
            vectorizer: TfidfVectorizer::new(),
            model: None,
            generation: 0,
        };
        if !detector.corpus.is_empty() {
            detector.retrain()?;
        }
        Ok(detector)
    }

    pub fn seeded() -> Result<Self> {
        Self::new(TextCorpus::seeded(), NaiveBayesParams::default())
    }

    pub fn corpus(&self) -> &TextCorpus {
        &self.corpus
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.n_features()
    }

    /// Labels the fitted model can return, in probability order.
    pub fn labels(&self) -> Vec<Emotion> {
        match &self.model {
            Some(model) => model
                .classes()
                .iter()
                .filter_map(|&idx| Emotion::from_index(idx))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Appends the example and refits. The corpus only changes when the fit
    /// succeeds.
    pub fn add_example(&mut self, text: &str, label: Emotion) -> Result<usize> {
        if text.trim().is_empty() {
            return Err(AppError::EmptyInput);
        }

        let mut candidate = self.corpus.clone();
        candidate.push(TrainingExample {
            text: text.to_string(),
            label,
        });
        let (vectorizer, model) = self.fit_corpus(&candidate)?;

        self.corpus = candidate;
        self.commit(vectorizer, model);
        Ok(self.corpus.len())
    }

    fn retrain(&mut self) -> Result<()> {
        let (vectorizer, model) = self.fit_corpus(&self.corpus)?;
        self.commit(vectorizer, model);
        Ok(())
    }

    fn fit_corpus(&self, corpus: &TextCorpus) -> Result<(TfidfVectorizer, FittedNaiveBayes)> {
        let texts: Vec<&str> = corpus.examples().iter().map(|e| e.text.as_str()).collect();
        let targets: Array1<usize> = corpus.examples().iter().map(|e| e.label.index()).collect();

        let mut vectorizer = TfidfVectorizer::new();
        let features = vectorizer.fit_transform(&texts);
        let dataset = DatasetBase::new(features, targets);
        let model = self.params.fit(&dataset)?;
        Ok((vectorizer, model))
    }

    fn commit(&mut self, vectorizer: TfidfVectorizer, model: FittedNaiveBayes) {
        self.vectorizer = vectorizer;
        self.model = Some(model);
        self.generation += 1;

        log::info!(
            "retrained emotion model: {} examples, {} terms, {} labels (generation {})",
            self.corpus.len(),
            self.vectorizer.n_features(),
            self.labels().len(),
            self.generation
        );
    }

    pub fn classify(&self, text: &str) -> Result<Classification> {
        if text.trim().is_empty() {
            return Err(AppError::EmptyInput);
        }
        let model = self.model.as_ref().ok_or(AppError::ModelNotReady)?;

        let vector = self.vectorizer.transform_one(text);
        let features = vector.clone().insert_axis(Axis(0));
        let predicted: Array1<usize> = model.predict(&features);
        let probabilities = model.predict_proba(&features);

        let label = Emotion::from_index(predicted[0]).ok_or(AppError::ModelNotReady)?;
        let probabilities = model
            .classes()
            .iter()
            .zip(probabilities.row(0).iter())
            .filter_map(|(&idx, &probability)| {
                Emotion::from_index(idx).map(|label| LabelProbability { label, probability })
            })
            .collect();

        let contributing_terms = self
            .vectorizer
            .inverse_transform(&vector)
            .into_iter()
            .take(3)
            .collect();

        // stable sort over first-seen order, so ties keep corpus order
        let mut word_importance: Vec<WordWeight> = self
            .vectorizer
            .first_seen_order()
            .iter()
            .filter(|&&idx| vector[idx] > 0.0)
            .filter_map(|&idx| {
                self.vectorizer.term(idx).map(|word| WordWeight {
                    word: word.to_string(),
                    weight: vector[idx],
                })
            })
            .collect();
        word_importance.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        word_importance.truncate(5);

        Ok(Classification {
            label,
            emoji: label.emoji().to_string(),
            probabilities,
            contributing_terms,
            word_importance,
            generation: self.generation,
        })
    }

    /// Child-friendly walkthrough of a classification.
    pub fn explain(&self, result: &Classification) -> String {
        let mut explanation = String::from(
            "How the AI works:\n\
             1. The AI looks at the words in your text.\n\
             2. It compares them to words it has seen before.\n\
             3. Based on patterns, it predicts the emotion.\n",
        );
        explanation.push_str(&format!(
            "\nFor example, words like '{}' helped it decide this is '{}'.\n\nProbabilities:\n",
            result.contributing_terms.join(", "),
            result.label
        ));
        for p in &result.probabilities {
            explanation.push_str(&format!(
                "{}: {:.2}%\n",
                p.label.capitalized(),
                p.probability * 100.0
            ));
        }
        explanation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn naive_bayes_separates_obvious_classes() {
        let records = array![[3.0, 0.0], [2.0, 0.0], [0.0, 3.0], [0.0, 2.0]];
        let targets = array![0usize, 0, 4, 4];
        let dataset = DatasetBase::new(records, targets);

        let model = NaiveBayesParams::new().fit(&dataset).unwrap();
        assert_eq!(model.classes(), &[0, 4]);

        let prediction: Array1<usize> = model.predict(&array![[5.0, 0.0], [0.0, 5.0]]);
        assert_eq!(prediction.to_vec(), vec![0, 4]);

        let proba = model.predict_proba(&array![[1.0, 1.0]]);
        assert!((proba.row(0).sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_positive_alpha() {
        let dataset = DatasetBase::new(array![[1.0]], array![0usize]);
        let result = NaiveBayesParams::new().alpha(0.0).fit(&dataset);
        assert!(matches!(result, Err(AppError::Linfa(_))));
    }

    #[test]
    fn empty_corpus_is_not_ready() {
        let detector = EmotionDetector::new(TextCorpus::new(), NaiveBayesParams::default()).unwrap();
        assert!(matches!(
            detector.classify("hello there"),
            Err(AppError::ModelNotReady)
        ));
        assert!(detector.labels().is_empty());
    }

    #[test]
    fn whitespace_is_rejected_before_the_model() {
        let detector = EmotionDetector::new(TextCorpus::new(), NaiveBayesParams::default()).unwrap();
        assert!(matches!(detector.classify("   \n"), Err(AppError::EmptyInput)));
    }

    #[test]
    fn failed_fit_leaves_the_corpus_alone() {
        let params = NaiveBayesParams::new().alpha(0.0);
        let mut detector = EmotionDetector::new(TextCorpus::new(), params).unwrap();

        for _ in 0..3 {
            let result = detector.add_example("I love sunny days", Emotion::Happy);
            assert!(matches!(result, Err(AppError::Linfa(_))));
        }
        assert!(detector.corpus().is_empty());
        assert_eq!(detector.generation(), 0);
        assert!(detector.labels().is_empty());
    }

    #[test]
    fn equal_weights_keep_corpus_order() {
        let mut corpus = TextCorpus::new();
        corpus.push(TrainingExample {
            text: "zebra apple".to_string(),
            label: Emotion::Happy,
        });
        corpus.push(TrainingExample {
            text: "mango".to_string(),
            label: Emotion::Sad,
        });
        let detector = EmotionDetector::new(corpus, NaiveBayesParams::default()).unwrap();

        let result = detector.classify("apple zebra").unwrap();
        let words: Vec<&str> = result.word_importance.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["zebra", "apple"]);
        assert_eq!(result.contributing_terms, vec!["apple", "zebra"]);
    }

    #[test]
    fn labels_track_the_corpus() {
        let mut detector =
            EmotionDetector::new(TextCorpus::new(), NaiveBayesParams::default()).unwrap();
        detector.add_example("I love sunny days", Emotion::Happy).unwrap();
        assert_eq!(detector.labels(), vec![Emotion::Happy]);

        let result = detector.classify("rainy days").unwrap();
        assert_eq!(result.label, Emotion::Happy);
        assert!((result.probabilities[0].probability - 1.0).abs() < 1e-9);

        detector.add_example("I hate rainy days", Emotion::Angry).unwrap();
        assert_eq!(detector.labels(), vec![Emotion::Angry, Emotion::Happy]);
    }
}
