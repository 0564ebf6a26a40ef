//! The reply agent: one review in, a sentiment and a short response out.

use log::{debug, info};

use crate::classifier::SentimentClassifier;
use crate::review::Sentiment;

const SNIPPET_LIMIT: usize = 160;
const SNIPPET_KEEP: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyOutcome {
    pub sentiment: Sentiment,
    pub reply: String,
}

pub struct ReplyAgent {
    classifier: SentimentClassifier,
    brand: String,
}

impl ReplyAgent {
    pub fn new(classifier: SentimentClassifier, brand: impl Into<String>) -> Self {
        Self {
            classifier,
            brand: brand.into(),
        }
    }

    /// Classifies `text`, then asks the hosted model for a reply. Falls back
    /// to a canned reply when no hosted model answers.
    pub async fn run(&mut self, text: &str) -> ReplyOutcome {
        let sentiment = self.classifier.classify(text).await;
        info!("Review classified as {}", sentiment);

        let prompt = reply_prompt(text, sentiment, &self.brand);
        let reply = match self.classifier.complete(&prompt).await {
            Some(reply) if !reply.is_empty() => reply,
            _ => {
                debug!("Using template reply");
                template_reply(text, sentiment, &self.brand)
            }
        };

        ReplyOutcome { sentiment, reply }
    }
}

fn reply_prompt(text: &str, sentiment: Sentiment, brand: &str) -> String {
    format!(
        "You are {brand}'s friendly support agent. The review sentiment is {sentiment}.\n\
         Write a short, polite, personalized reply (2-3 sentences). If negative, apologize and \
         offer to make it right; if neutral, thank and invite suggestions; if positive, \
         appreciate and invite them back. Keep brand voice warm and concise.\n\
         Review: \"{text}\""
    )
}

/// Echo of the review: the first 150 characters plus an ellipsis once the
/// text runs past 160.
pub fn snippet(text: &str) -> String {
    if text.chars().count() > SNIPPET_LIMIT {
        let head: String = text.chars().take(SNIPPET_KEEP).collect();
        format!("{}…", head)
    } else {
        text.to_string()
    }
}

pub fn template_reply(text: &str, sentiment: Sentiment, brand: &str) -> String {
    let echo = snippet(text);
    match sentiment {
        Sentiment::Positive => format!(
            "Thanks so much for the lovely feedback! We're thrilled you enjoyed your visit. \
             Hope to serve you again soon at {brand}. ({echo})"
        ),
        Sentiment::Negative => format!(
            "Sorry to hear about your experience, we take this seriously. \
             Please DM us so we can make it right on your next visit. ({echo})"
        ),
        Sentiment::Neutral => format!(
            "Thank you for sharing your thoughts. We're always improving, so \
             any suggestions are welcome, and we hope to see you again. ({echo})"
        ),
    }
}
