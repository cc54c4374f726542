/// Marker words that flag a message as a news request.
const REQUEST_MARKERS: &[&str] = &["news", "article", "articles", "headline", "headlines"];

/// Request phrasing and filler dropped before the remaining words become
/// the search keyword.
const STOPWORDS: &[&str] = &[
    "news", "article", "articles", "headline", "headlines", "summary", "summarize", "summarise",
    "search", "find", "show", "give", "get", "fetch", "tell", "latest", "recent", "today",
    "todays", "current", "about", "regarding", "related", "on", "of", "for", "to", "the", "a",
    "an", "me", "my", "some", "any", "please", "want", "would", "like", "can", "could", "you",
];

fn normalize(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

/// Whether a chat message is asking for news rather than conversation.
pub fn is_news_request(text: &str) -> bool {
    text.split_whitespace()
        .map(normalize)
        .any(|word| REQUEST_MARKERS.contains(&word.as_str()))
}

/// Strip request phrasing from a message, leaving the search keyword. The
/// surviving words keep their original form and order.
pub fn extract_keyword(text: &str) -> String {
    text.split_whitespace()
        .filter(|word| !STOPWORDS.contains(&normalize(word).as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}
