//! Deterministic topic naming and condition building.

use crate::PushError;

/// Separator between the instrument symbol and the feed source id.
pub const TOPIC_SEPARATOR: &str = "_ns_";

/// The gateway evaluates at most this many topics per condition.
pub const MAX_CONDITION_TOPICS: usize = 5;

/// Topic key for an (instrument, feed source) pair: `{symbol}_ns_{feed_source_id}`.
///
/// The id part is numeric and symbols may not contain the separator, so a key
/// splits unambiguously at its last separator and distinct pairs never collide.
pub fn topic_for(symbol: &str, feed_source_id: i64) -> Result<String, PushError> {
    if symbol.is_empty() || symbol.contains(TOPIC_SEPARATOR) {
        return Err(PushError::InvalidTopic(format!(
            "symbol '{}' cannot be used in a topic",
            symbol
        )));
    }
    if !symbol.chars().all(is_topic_char) {
        return Err(PushError::InvalidTopic(format!(
            "symbol '{}' contains characters not allowed in topics",
            symbol
        )));
    }
    if feed_source_id < 0 {
        return Err(PushError::InvalidTopic(format!(
            "feed source id {} is negative",
            feed_source_id
        )));
    }

    Ok(format!("{}{}{}", symbol, TOPIC_SEPARATOR, feed_source_id))
}

/// Prepend the deployment prefix unless the topic already carries it.
pub fn with_prefix(topic: &str, prefix: &str) -> String {
    if prefix.is_empty() || topic.starts_with(prefix) {
        topic.to_string()
    } else {
        format!("{}{}", prefix, topic)
    }
}

/// OR-condition over a chunk of topics: `'a' in topics || 'b' in topics`.
pub fn condition_for(topics: &[String], prefix: &str) -> String {
    topics
        .iter()
        .map(|t| format!("'{}' in topics", with_prefix(t, prefix)))
        .collect::<Vec<_>>()
        .join(" || ")
}

fn is_topic_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_for() {
        assert_eq!(topic_for("AAPL", 7).unwrap(), "AAPL_ns_7");
        assert_eq!(topic_for("BRK.B", 12).unwrap(), "BRK.B_ns_12");
    }

    #[test]
    fn test_topic_for_rejects_separator_and_invalid_chars() {
        assert!(topic_for("X_ns_1", 2).is_err());
        assert!(topic_for("", 2).is_err());
        assert!(topic_for("BRK/B", 2).is_err());
        assert!(topic_for("AAPL", -1).is_err());
    }

    #[test]
    fn test_topics_do_not_collide() {
        // "A_1" + 23 vs "A" + 123 style ambiguities
        let a = topic_for("AB_1", 23).unwrap();
        let b = topic_for("AB", 123).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.rsplit_once(TOPIC_SEPARATOR), Some(("AB_1", "23")));
    }

    #[test]
    fn test_with_prefix() {
        assert_eq!(with_prefix("AAPL_ns_1", "prod_"), "prod_AAPL_ns_1");
        assert_eq!(with_prefix("prod_AAPL_ns_1", "prod_"), "prod_AAPL_ns_1");
        assert_eq!(with_prefix("AAPL_ns_1", ""), "AAPL_ns_1");
    }

    #[test]
    fn test_condition_for() {
        let topics = vec!["AAPL_ns_1".to_string(), "MSFT_ns_1".to_string()];
        assert_eq!(
            condition_for(&topics, "p_"),
            "'p_AAPL_ns_1' in topics || 'p_MSFT_ns_1' in topics"
        );
    }
}
