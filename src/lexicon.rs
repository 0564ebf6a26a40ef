//! Offline fallback model: a small restaurant-review lexicon.
//!
//! It only knows two classes, like most off-the-shelf sentiment models. The
//! confidence it reports grows with the amount of evidence found, so texts
//! without opinion words come out with a confidence near zero.

use std::collections::HashMap;

use crate::classifier::{BinaryPrediction, BinarySentimentModel, Polarity};

const NEGATION_WINDOW: usize = 3;

pub struct LexiconModel {
    words: HashMap<&'static str, f64>,
    negations: Vec<&'static str>,
    intensifiers: HashMap<&'static str, f64>,
}

impl Default for LexiconModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconModel {
    pub fn new() -> Self {
        let positive = [
            ("delicious", 0.9),
            ("tasty", 0.8),
            ("yummy", 0.8),
            ("amazing", 0.9),
            ("awesome", 0.8),
            ("excellent", 0.9),
            ("fantastic", 0.9),
            ("great", 0.7),
            ("good", 0.5),
            ("nice", 0.4),
            ("love", 0.8),
            ("loved", 0.8),
            ("best", 0.8),
            ("fresh", 0.5),
            ("friendly", 0.6),
            ("perfect", 0.9),
            ("recommend", 0.6),
            ("recommended", 0.6),
            ("enjoyed", 0.7),
            ("favorite", 0.7),
            ("favourite", 0.7),
            ("clean", 0.4),
            ("quick", 0.3),
            ("fast", 0.3),
            ("generous", 0.5),
            ("flavorful", 0.7),
            ("authentic", 0.5),
            ("cozy", 0.4),
            ("helpful", 0.5),
            ("attentive", 0.5),
            ("wonderful", 0.8),
            ("happy", 0.5),
            ("worth", 0.4),
        ];
        let negative = [
            ("bad", -0.6),
            ("terrible", -0.9),
            ("awful", -0.9),
            ("horrible", -0.9),
            ("worst", -0.9),
            ("disgusting", -0.9),
            ("bland", -0.6),
            ("cold", -0.5),
            ("stale", -0.6),
            ("soggy", -0.6),
            ("rude", -0.8),
            ("slow", -0.5),
            ("dirty", -0.7),
            ("overpriced", -0.6),
            ("expensive", -0.3),
            ("disappointing", -0.7),
            ("disappointed", -0.7),
            ("wait", -0.2),
            ("waited", -0.4),
            ("poor", -0.6),
            ("mediocre", -0.5),
            ("salty", -0.4),
            ("greasy", -0.4),
            ("sick", -0.8),
            ("never", -0.3),
            ("hate", -0.8),
            ("hated", -0.8),
            ("undercooked", -0.7),
            ("burnt", -0.6),
            ("ignored", -0.6),
            ("wrong", -0.5),
            ("refund", -0.5),
            ("complaint", -0.5),
        ];

        let words = positive.into_iter().chain(negative).collect();

        let negations = vec![
            "not", "no", "never", "none", "nothing", "cannot", "cant", "don't", "dont", "doesn't",
            "doesnt", "didn't", "didnt", "isn't", "isnt", "wasn't", "wasnt", "won't", "wont",
            "hardly", "barely",
        ];

        let intensifiers = [
            ("very", 1.5),
            ("really", 1.4),
            ("super", 1.5),
            ("so", 1.3),
            ("extremely", 1.8),
            ("incredibly", 1.8),
            ("absolutely", 1.7),
            ("quite", 1.2),
            ("slightly", 0.5),
            ("somewhat", 0.6),
        ]
        .into_iter()
        .collect();

        Self {
            words,
            negations,
            intensifiers,
        }
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
            .map(|t| t.trim_matches('\'').to_string())
            .collect()
    }

    /// Signed evidence: positive means favourable.
    pub fn raw_score(&self, text: &str) -> f64 {
        let tokens = Self::tokenize(text);
        let mut total = 0.0;

        for (i, token) in tokens.iter().enumerate() {
            let Some(&weight) = self.words.get(token.as_str()) else {
                continue;
            };
            let mut weight = weight;

            if i > 0 {
                if let Some(&boost) = self.intensifiers.get(tokens[i - 1].as_str()) {
                    weight *= boost;
                }
            }

            let window = i.saturating_sub(NEGATION_WINDOW)..i;
            let negated = tokens[window]
                .iter()
                .any(|t| self.negations.contains(&t.as_str()));
            if negated && token != "never" {
                weight = -weight * 0.8;
            }

            total += weight;
        }
        total
    }
}

impl BinarySentimentModel for LexiconModel {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn predict(&self, text: &str) -> BinaryPrediction {
        let score = self.raw_score(text);
        let label = if score < 0.0 {
            Polarity::Negative
        } else {
            Polarity::Positive
        };
        BinaryPrediction {
            label,
            confidence: score.abs().tanh(),
        }
    }
}
