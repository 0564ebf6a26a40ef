use log::info;

use crate::classifier::SentimentClassifier;
use crate::review::{Review, Sentiment};

/// Star rating to sentiment: 2 or less is negative, 4 or more positive.
pub fn rating_to_sentiment(rating: f64) -> Option<Sentiment> {
    if rating.is_nan() {
        return None;
    }
    Some(if rating <= 2.0 {
        Sentiment::Negative
    } else if rating >= 4.0 {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    })
}

/// One label per row, in row order.
///
/// Rows with a usable rating are mapped directly. The rest go to the
/// classifier as one batched call, so a fully rated set never touches it.
pub async fn assign_sentiments(
    rows: &[&Review],
    classifier: &mut SentimentClassifier,
) -> Vec<Sentiment> {
    let mut labels: Vec<Option<Sentiment>> = rows
        .iter()
        .map(|r| r.rating.and_then(rating_to_sentiment))
        .collect();

    let pending: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, label)| label.is_none())
        .map(|(i, _)| i)
        .collect();

    if !pending.is_empty() {
        info!(
            "{} of {} rows have no usable rating; classifying text",
            pending.len(),
            rows.len()
        );
        let texts: Vec<String> = pending.iter().map(|&i| rows[i].text.clone()).collect();
        let classified = classifier.classify_batch(&texts).await;
        for (i, sentiment) in pending.into_iter().zip(classified) {
            labels[i] = Some(sentiment);
        }
    }

    labels
        .into_iter()
        .map(|label| label.unwrap_or(Sentiment::Neutral))
        .collect()
}
