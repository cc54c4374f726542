use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub notion_api_key: Option<String>,
    pub notion_database_id: Option<String>,
    pub notion_public_domain: Option<String>,
    pub data_dir: PathBuf,
    pub feed_locale: FeedLocale,
}

/// Locale parameters for the news search feed (`hl`, `gl`, `ceid`).
#[derive(Debug, Clone)]
pub struct FeedLocale {
    pub lang: String,
    pub country: String,
    pub edition: String,
}

impl Default for FeedLocale {
    fn default() -> Self {
        Self {
            lang: "en-US".to_string(),
            country: "US".to_string(),
            edition: "US:en".to_string(),
        }
    }
}

/// Notion credentials plus the optional public-facing domain used to
/// rewrite page URLs.
#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub api_key: String,
    pub database_id: String,
    pub public_domain: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a Config from a key lookup function. Used directly in tests
    /// to avoid mutating process-global environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let data_dir = get("NEWSDESK_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".newsdesk")
        });

        let defaults = FeedLocale::default();
        let feed_locale = FeedLocale {
            lang: get("NEWS_LANG").unwrap_or(defaults.lang),
            country: get("NEWS_COUNTRY").unwrap_or(defaults.country),
            edition: get("NEWS_EDITION").unwrap_or(defaults.edition),
        };

        Config {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            notion_api_key: get("NOTION_API_KEY"),
            notion_database_id: get("NOTION_DATABASE_ID"),
            notion_public_domain: get("NOTION_PUBLIC_DOMAIN"),
            data_dir,
            feed_locale,
        }
    }

    /// Notion settings, present only when both credentials are set. A `None`
    /// here is how a missing credential is detected before any publish
    /// attempt.
    pub fn notion(&self) -> Option<NotionConfig> {
        match (&self.notion_api_key, &self.notion_database_id) {
            (Some(api_key), Some(database_id)) => Some(NotionConfig {
                api_key: api_key.clone(),
                database_id: database_id.clone(),
                public_domain: self.notion_public_domain.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.feed_locale.lang, "en-US");
        assert_eq!(config.feed_locale.edition, "US:en");
        assert!(config.notion().is_none());
    }

    #[test]
    fn test_empty_values_treated_as_absent() {
        let config = config_from(&[("OPENAI_API_KEY", ""), ("NOTION_API_KEY", "")]);
        assert!(config.openai_api_key.is_none());
        assert!(config.notion_api_key.is_none());
    }

    #[test]
    fn test_notion_requires_both_credentials() {
        let config = config_from(&[("NOTION_API_KEY", "secret")]);
        assert!(config.notion().is_none());

        let config = config_from(&[
            ("NOTION_API_KEY", "secret"),
            ("NOTION_DATABASE_ID", "db-123"),
        ]);
        let notion = config.notion().unwrap();
        assert_eq!(notion.api_key, "secret");
        assert_eq!(notion.database_id, "db-123");
        assert!(notion.public_domain.is_none());
    }

    #[test]
    fn test_notion_public_domain() {
        let config = config_from(&[
            ("NOTION_API_KEY", "secret"),
            ("NOTION_DATABASE_ID", "db-123"),
            ("NOTION_PUBLIC_DOMAIN", "https://example.notion.site"),
        ]);
        assert_eq!(
            config.notion().unwrap().public_domain.as_deref(),
            Some("https://example.notion.site")
        );
    }

    #[test]
    fn test_data_dir_override() {
        let config = config_from(&[("NEWSDESK_DATA_DIR", "/tmp/newsdesk-test")]);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/newsdesk-test"));
    }

    #[test]
    fn test_custom_locale() {
        let config = config_from(&[
            ("NEWS_LANG", "ko"),
            ("NEWS_COUNTRY", "KR"),
            ("NEWS_EDITION", "KR:ko"),
        ]);
        assert_eq!(config.feed_locale.lang, "ko");
        assert_eq!(config.feed_locale.country, "KR");
        assert_eq!(config.feed_locale.edition, "KR:ko");
    }
}
