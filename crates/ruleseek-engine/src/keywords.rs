//! Question-to-keyword conversion for the lexical scorer.
//!
//! Precision over recall: every surviving keyword must appear in a chunk
//! for it to match, so the filter only drops words that carry no signal.
//! Question words (what/when/how/...) are deliberately kept; they rarely
//! occur in rulebook prose and act as implicit filters.

/// Articles, pronouns, auxiliaries and filler. Tokens of length <= 2 are
/// dropped before this list is consulted.
const STOP_WORDS: &[&str] = &[
    "and", "are", "because", "been", "but", "can", "could", "did", "does", "doing", "for", "from",
    "had", "has", "have", "having", "her", "here", "him", "his", "its", "just", "like",
    "may", "might", "must", "not", "our", "ours", "out", "please", "shall", "she", "should",
    "some", "tell", "than", "that", "the", "their", "them", "then", "there", "these", "they",
    "this", "those", "was", "were", "will", "with", "would", "you", "your",
];

/// Lowercase, strip non-alphanumerics, split on whitespace, drop short
/// tokens and stop words. An empty return means "no usable query".
pub fn extract_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|tok| tok.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|tok| tok.len() > 2)
        .filter(|tok| !STOP_WORDS.contains(&tok.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_content_and_question_words() {
        let kw = extract_keywords("When do the wolves attack?");
        assert_eq!(kw, vec!["when", "wolves", "attack"]);
    }

    #[test]
    fn drops_short_tokens_and_stop_words() {
        let kw = extract_keywords("can I trade with them at a settlement");
        assert_eq!(kw, vec!["trade", "settlement"]);
    }

    #[test]
    fn strips_punctuation_inside_tokens() {
        let kw = extract_keywords("what's a \"stamina\" check?!");
        assert_eq!(kw, vec!["whats", "stamina", "check"]);
    }

    #[test]
    fn pure_filler_yields_no_keywords() {
        assert!(extract_keywords("is it that they can").is_empty());
        assert!(extract_keywords("").is_empty());
        assert!(extract_keywords("?! ...").is_empty());
    }
}
