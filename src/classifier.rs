use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use crate::config::{ClassifierConfig, Config};
use crate::lexicon::LexiconModel;
use crate::llm::{self, LLMProvider};
use crate::review::Sentiment;

/// Output class of a two-way model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

/// A binary prediction with the model's confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryPrediction {
    pub label: Polarity,
    pub confidence: f64,
}

/// Local model that can only tell positive from negative.
pub trait BinarySentimentModel: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, text: &str) -> BinaryPrediction;

    fn predict_batch(&self, texts: &[String]) -> Vec<BinaryPrediction> {
        texts.iter().map(|t| self.predict(t)).collect()
    }
}

/// Which backend answers classification requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierMode {
    Hosted,
    Local,
}

/// Sentiment classifier with a hosted model and a local fallback.
///
/// Starts in [`ClassifierMode::Hosted`] when a provider is available. The
/// first hosted failure switches it to [`ClassifierMode::Local`] for the rest
/// of its life; it never switches back.
pub struct SentimentClassifier {
    hosted: Option<Box<dyn LLMProvider>>,
    local: Box<dyn BinarySentimentModel>,
    mode: ClassifierMode,
    neutral_floor: f64,
    batch_size: usize,
    max_chars: usize,
    hosted_batches: bool,
    show_progress: bool,
}

impl SentimentClassifier {
    pub fn new(hosted: Option<Box<dyn LLMProvider>>, local: Box<dyn BinarySentimentModel>) -> Self {
        let mode = if hosted.is_some() {
            ClassifierMode::Hosted
        } else {
            ClassifierMode::Local
        };
        let defaults = ClassifierConfig::default();
        Self {
            hosted,
            local,
            mode,
            neutral_floor: defaults.neutral_floor,
            batch_size: defaults.batch_size,
            max_chars: defaults.max_chars,
            hosted_batches: defaults.hosted_batches,
            show_progress: false,
        }
    }

    /// Classifier wired up from configuration and the environment.
    pub fn from_config(config: &Config) -> Self {
        let hosted = llm::hosted_provider(&config.classifier, &config.brand);
        match &hosted {
            Some(provider) => info!(
                "Using hosted classifier {} ({})",
                provider.name(),
                provider.model_name()
            ),
            None => info!("No hosted classifier available; using local model"),
        }
        Self::new(hosted, Box::new(LexiconModel::new()))
            .with_settings(&config.classifier)
            .with_progress(config.ui.progress_bars)
    }

    pub fn with_settings(mut self, settings: &ClassifierConfig) -> Self {
        self.neutral_floor = settings.neutral_floor;
        self.batch_size = settings.batch_size.max(1);
        self.max_chars = settings.max_chars.max(1);
        self.hosted_batches = settings.hosted_batches;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn mode(&self) -> ClassifierMode {
        self.mode
    }

    fn active_provider(&self) -> Option<&dyn LLMProvider> {
        match self.mode {
            ClassifierMode::Hosted => self.hosted.as_deref(),
            ClassifierMode::Local => None,
        }
    }

    fn downgrade(&mut self, reason: &anyhow::Error) {
        if self.mode == ClassifierMode::Hosted {
            warn!(
                "Hosted classifier failed, falling back to local {} model: {:#}",
                self.local.name(),
                reason
            );
            self.mode = ClassifierMode::Local;
        }
    }

    /// Sends a free-form prompt to the hosted model.
    ///
    /// Returns `None` in local mode or when the call fails (which also
    /// downgrades the classifier).
    pub async fn complete(&mut self, prompt: &str) -> Option<String> {
        let provider = self.active_provider()?;
        let result = provider.send_prompt(prompt).await;
        match result {
            Ok(response) => Some(response.trim().to_string()),
            Err(e) => {
                self.downgrade(&e);
                None
            }
        }
    }

    /// Labels one text.
    pub async fn classify(&mut self, text: &str) -> Sentiment {
        let prompt = format!(
            "Classify the restaurant review strictly as one of: positive, negative, or neutral.\n\
             Review: {}\n\
             Answer with one word only.",
            text
        );
        if let Some(answer) = self.complete(&prompt).await {
            debug!("Hosted label: {}", answer);
            return Sentiment::from_label(&answer);
        }
        let truncated = self.truncate(text);
        self.apply_floor(self.local.predict(&truncated))
    }

    /// Labels many texts, `batch_size` at a time, in input order.
    ///
    /// Batches stay local unless `hosted_batches` is set, in which case each
    /// batch is a single hosted call.
    pub async fn classify_batch(&mut self, texts: &[String]) -> Vec<Sentiment> {
        let progress = self.progress_bar(texts.len());
        let mut out = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let chunk: Vec<String> = chunk.iter().map(|t| self.truncate(t)).collect();

            let hosted = if self.hosted_batches {
                self.classify_chunk_hosted(&chunk).await
            } else {
                None
            };
            let labels = match hosted {
                Some(labels) => labels,
                None => self
                    .local
                    .predict_batch(&chunk)
                    .into_iter()
                    .map(|p| self.apply_floor(p))
                    .collect(),
            };

            out.extend(labels);
            progress.inc(chunk.len() as u64);
        }

        progress.finish_and_clear();
        debug!("Classified {} texts in mode {:?}", out.len(), self.mode);
        out
    }

    async fn classify_chunk_hosted(&mut self, chunk: &[String]) -> Option<Vec<Sentiment>> {
        let mut prompt = String::from(
            "Classify each numbered restaurant review strictly as positive, negative, or neutral.\n\
             Reply with exactly one word per line, one line per review, in the same order.\n\n",
        );
        for (i, text) in chunk.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, text.replace('\n', " ")));
        }

        let answer = self.complete(&prompt).await?;
        let labels = parse_label_lines(&answer);
        if labels.len() != chunk.len() {
            self.downgrade(&anyhow::anyhow!(
                "expected {} labels from batch response, got {}",
                chunk.len(),
                labels.len()
            ));
            return None;
        }
        Some(labels)
    }

    fn apply_floor(&self, prediction: BinaryPrediction) -> Sentiment {
        if prediction.confidence < self.neutral_floor {
            return Sentiment::Neutral;
        }
        match prediction.label {
            Polarity::Positive => Sentiment::Positive,
            Polarity::Negative => Sentiment::Negative,
        }
    }

    fn truncate(&self, text: &str) -> String {
        text.chars().take(self.max_chars).collect()
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress || len == 0 {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} classifying {wide_bar:.cyan/blue} {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    }
}

/// One label per non-empty line, ignoring "1." / "2)" style numbering.
fn parse_label_lines(answer: &str) -> Vec<Sentiment> {
    answer
        .lines()
        .map(|line| line.trim().trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')'))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Sentiment::from_label)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        reply: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send_prompt(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().ok_or_else(|| anyhow!("429 Too Many Requests"))
        }
    }

    fn provider(reply: Option<&str>) -> (Box<dyn LLMProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ScriptedProvider {
            reply: reply.map(str::to_string),
            calls: calls.clone(),
        };
        (Box::new(provider), calls)
    }

    struct FixedModel(BinaryPrediction);

    impl BinarySentimentModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, _text: &str) -> BinaryPrediction {
            self.0
        }
    }

    struct CountingModel {
        batches: Arc<AtomicUsize>,
    }

    impl BinarySentimentModel for CountingModel {
        fn name(&self) -> &str {
            "counting"
        }

        fn predict(&self, _text: &str) -> BinaryPrediction {
            BinaryPrediction {
                label: Polarity::Positive,
                confidence: 0.9,
            }
        }

        fn predict_batch(&self, texts: &[String]) -> Vec<BinaryPrediction> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            texts.iter().map(|t| self.predict(t)).collect()
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("review {i}")).collect()
    }

    #[tokio::test]
    async fn test_hosted_label_is_used() {
        let (hosted, calls) = provider(Some("Positive"));
        let mut classifier = SentimentClassifier::new(Some(hosted), Box::new(LexiconModel::new()));
        assert_eq!(classifier.classify("meh").await, Sentiment::Positive);
        assert_eq!(classifier.mode(), ClassifierMode::Hosted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hosted_failure_downgrades_once() {
        let (hosted, calls) = provider(None);
        let mut classifier = SentimentClassifier::new(Some(hosted), Box::new(LexiconModel::new()));

        let first = classifier.classify("Terrible, rude and cold.").await;
        assert_eq!(first, Sentiment::Negative);
        assert_eq!(classifier.mode(), ClassifierMode::Local);

        classifier.classify("Delicious!").await;
        assert!(classifier.complete("anything").await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_neutral_floor_on_binary_model() {
        let weak = BinaryPrediction {
            label: Polarity::Positive,
            confidence: 0.3,
        };
        let mut classifier = SentimentClassifier::new(None, Box::new(FixedModel(weak)));
        assert_eq!(classifier.classify("fine").await, Sentiment::Neutral);

        let strong = BinaryPrediction {
            label: Polarity::Negative,
            confidence: 0.45,
        };
        let mut classifier = SentimentClassifier::new(None, Box::new(FixedModel(strong)));
        assert_eq!(classifier.classify("bad").await, Sentiment::Negative);
    }

    #[tokio::test]
    async fn test_batches_stay_local_by_default() {
        let (hosted, calls) = provider(Some("positive"));
        let batches = Arc::new(AtomicUsize::new(0));
        let local = CountingModel {
            batches: batches.clone(),
        };
        let mut classifier = SentimentClassifier::new(Some(hosted), Box::new(local));
        classifier.batch_size = 4;

        let labels = classifier.classify_batch(&texts(10)).await;
        assert_eq!(labels.len(), 10);
        assert_eq!(batches.load(Ordering::SeqCst), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(classifier.mode(), ClassifierMode::Hosted);
    }

    #[tokio::test]
    async fn test_hosted_batches_one_call_per_chunk() {
        let (hosted, calls) = provider(Some("1. positive\n2. Negative"));
        let mut classifier = SentimentClassifier::new(Some(hosted), Box::new(LexiconModel::new()));
        classifier.batch_size = 2;
        classifier.hosted_batches = true;

        let labels = classifier.classify_batch(&texts(4)).await;
        assert_eq!(
            labels,
            vec![
                Sentiment::Positive,
                Sentiment::Negative,
                Sentiment::Positive,
                Sentiment::Negative
            ]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_hosted_batch_count_mismatch_falls_back() {
        let (hosted, calls) = provider(Some("positive"));
        let mut classifier = SentimentClassifier::new(Some(hosted), Box::new(LexiconModel::new()));
        classifier.hosted_batches = true;

        let labels = classifier
            .classify_batch(&["Awful.".to_string(), "Loved it".to_string()])
            .await;
        assert_eq!(labels, vec![Sentiment::Negative, Sentiment::Positive]);
        assert_eq!(classifier.mode(), ClassifierMode::Local);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_label_lines() {
        let labels = parse_label_lines("1. Positive\n\n2) neutral\n3.negative\n");
        assert_eq!(
            labels,
            vec![Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative]
        );
    }
}
