use ndarray::{Array1, Array2};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Lowercased runs of alphanumeric characters, at least two characters long.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() > 1)
        .map(|token| token.to_string())
        .collect()
}

/// TF-IDF vectorizer with smoothed idf and L2-normalised rows.
///
/// The vocabulary is rebuilt from scratch on every [`TfidfVectorizer::fit`],
/// so the feature dimension can change between fits.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    terms: Vec<String>,
    idf: Vec<f64>,
    /// Column indices in the order terms first appear in the fitted documents
    first_seen: Vec<usize>,
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) {
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        let mut appearance: Vec<String> = Vec::new();

        for doc in documents {
            let tokens = tokenize(doc.as_ref());
            for token in &tokens {
                if !appearance.contains(token) {
                    appearance.push(token.clone());
                }
            }
            let unique: BTreeSet<String> = tokens.into_iter().collect();
            for word in unique {
                *doc_freq.entry(word).or_insert(0) += 1;
            }
        }

        // BTreeMap iteration is sorted, so column order is alphabetical
        let n_docs = documents.len() as f64;
        self.terms = doc_freq.keys().cloned().collect();
        self.vocabulary = self
            .terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();
        self.idf = doc_freq
            .values()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0)
            .collect();
        self.first_seen = appearance
            .iter()
            .filter_map(|term| self.vocabulary.get(term).copied())
            .collect();
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Array2<f64> {
        self.fit(documents);
        self.transform(documents)
    }

    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Array2<f64> {
        let mut matrix = Array2::zeros((documents.len(), self.n_features()));
        for (row, doc) in documents.iter().enumerate() {
            matrix.row_mut(row).assign(&self.transform_one(doc.as_ref()));
        }
        matrix
    }

    pub fn transform_one(&self, document: &str) -> Array1<f64> {
        let mut tfidf = Array1::zeros(self.n_features());

        for word in tokenize(document) {
            if let Some(&idx) = self.vocabulary.get(&word) {
                tfidf[idx] += 1.0;
            }
        }

        for (value, idf) in tfidf.iter_mut().zip(self.idf.iter()) {
            *value *= idf;
        }

        let norm = tfidf.iter().map(|&x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            tfidf.mapv_inplace(|x| x / norm);
        }

        tfidf
    }

    /// Vocabulary terms with a non-zero weight in `row`, in column order.
    pub fn inverse_transform(&self, row: &Array1<f64>) -> Vec<String> {
        row.iter()
            .enumerate()
            .filter(|(_, &weight)| weight > 0.0)
            .filter_map(|(idx, _)| self.terms.get(idx).cloned())
            .collect()
    }

    pub fn first_seen_order(&self) -> &[usize] {
        &self.first_seen
    }

    pub fn term(&self, idx: usize) -> Option<&str> {
        self.terms.get(idx).map(String::as_str)
    }

    pub fn n_features(&self) -> usize {
        self.terms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_drops_single_characters() {
        assert_eq!(tokenize("I can't WAIT!"), vec!["can", "wait"]);
    }

    #[test]
    fn rows_are_unit_length() {
        let mut vectorizer = TfidfVectorizer::new();
        let matrix = vectorizer.fit_transform(&["happy happy day", "sad day"]);

        assert_eq!(vectorizer.n_features(), 3);
        for row in matrix.rows() {
            let norm: f64 = row.iter().map(|x| x * x).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn rarer_terms_weigh_more() {
        let mut vectorizer = TfidfVectorizer::new();
        vectorizer.fit(&["happy day", "sad day", "long day"]);
        let row = vectorizer.transform_one("happy day");

        let day = vectorizer.vocabulary["day"];
        let happy = vectorizer.vocabulary["happy"];
        assert!(row[happy] > row[day]);
        assert_eq!(vectorizer.inverse_transform(&row), vec!["day", "happy"]);
    }

    #[test]
    fn first_seen_order_follows_the_documents() {
        let mut vectorizer = TfidfVectorizer::new();
        vectorizer.fit(&["sunny day sunny", "bright day"]);

        let order: Vec<&str> = vectorizer
            .first_seen_order()
            .iter()
            .filter_map(|&idx| vectorizer.term(idx))
            .collect();
        assert_eq!(order, vec!["sunny", "day", "bright"]);
    }

    #[test]
    fn unknown_words_give_zero_vector() {
        let mut vectorizer = TfidfVectorizer::new();
        vectorizer.fit(&["happy day"]);
        let row = vectorizer.transform_one("zebra");
        assert!(row.iter().all(|&x| x == 0.0));
    }
}
