use serde::{Deserialize, Serialize};

/// Result of the text sentiment analyzer endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentVerdict {
    pub sentiment: String,
    pub confidence: f64,
}

impl std::fmt::Display for SentimentVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.1}% confidence)", self.sentiment, self.confidence * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_display() {
        let verdict: SentimentVerdict =
            serde_json::from_str(r#"{"sentiment": "negative", "confidence": 0.731}"#).unwrap();
        assert_eq!(verdict.to_string(), "negative (73.1% confidence)");
    }
}
