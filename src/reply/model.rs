use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The parts of a scraped post the reply prompt needs.
///
/// The scraping API returns a large, loosely shaped document; only a few
/// nested fields are read and every one of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub text: Option<String>,
    pub author: Option<String>,
    pub likes: u64,
    pub reposts: u64,
}

impl ItemData {
    pub fn from_value(raw: &Value) -> Self {
        let legacy = &raw["legacy"];

        let text = legacy["full_text"]
            .as_str()
            .or_else(|| raw["full_text"].as_str())
            .map(str::to_string);

        let author = raw["core"]["user_results"]["result"]["legacy"]["screen_name"]
            .as_str()
            .map(str::to_string);

        Self {
            text,
            author,
            likes: legacy["favorite_count"].as_u64().unwrap_or(0),
            reposts: legacy["retweet_count"].as_u64().unwrap_or(0),
        }
    }

    pub fn text_or_placeholder(&self) -> &str {
        self.text.as_deref().unwrap_or("No text available")
    }

    pub fn author_or_placeholder(&self) -> &str {
        self.author.as_deref().unwrap_or("Unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_nested_fields() {
        let raw = json!({
            "legacy": {"full_text": "shipping today", "favorite_count": 12, "retweet_count": 3},
            "core": {"user_results": {"result": {"legacy": {"screen_name": "ferris"}}}}
        });
        let data = ItemData::from_value(&raw);
        assert_eq!(data.text.as_deref(), Some("shipping today"));
        assert_eq!(data.author.as_deref(), Some("ferris"));
        assert_eq!((data.likes, data.reposts), (12, 3));
    }

    #[test]
    fn falls_back_to_top_level_text_and_placeholders() {
        let data = ItemData::from_value(&json!({"full_text": "hi"}));
        assert_eq!(data.text_or_placeholder(), "hi");
        assert_eq!(data.author_or_placeholder(), "Unknown");
        assert_eq!(data.likes, 0);
    }
}
