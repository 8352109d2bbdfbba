use serde::{Deserialize, Serialize};

pub const MIN_TAGS: usize = 3;
pub const MAX_TAGS: usize = 5;

/// The validated output of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredPost {
    pub title: String,
    /// Markdown body.
    pub content: String,
    pub tags: Vec<String>,
    /// Two or three sentences of plain text.
    pub summary: String,
}

impl StructuredPost {
    /// Check the invariants serde cannot express. Nothing is coerced: a post
    /// with two tags is rejected, not padded.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is empty".to_string());
        }
        if self.content.trim().is_empty() {
            return Err("content is empty".to_string());
        }
        if self.summary.trim().is_empty() {
            return Err("summary is empty".to_string());
        }
        if !(MIN_TAGS..=MAX_TAGS).contains(&self.tags.len()) {
            return Err(format!(
                "expected {}-{} tags, got {}",
                MIN_TAGS,
                MAX_TAGS,
                self.tags.len()
            ));
        }
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err("blank tag".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(tags: &[&str]) -> StructuredPost {
        StructuredPost {
            title: "A".into(),
            content: "B".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            summary: "S".into(),
        }
    }

    #[test]
    fn tag_count_bounds() {
        assert!(post(&["a", "b"]).validate().is_err());
        assert!(post(&["a", "b", "c"]).validate().is_ok());
        assert!(post(&["a", "b", "c", "d", "e"]).validate().is_ok());
        let err = post(&["a", "b", "c", "d", "e", "f"]).validate().unwrap_err();
        assert!(err.contains("got 6"), "{err}");
    }

    #[test]
    fn blank_fields_rejected() {
        let mut p = post(&["a", "b", "c"]);
        p.title = "  ".into();
        assert_eq!(p.validate().unwrap_err(), "title is empty");

        let mut p = post(&["a", "b", "c"]);
        p.summary = String::new();
        assert_eq!(p.validate().unwrap_err(), "summary is empty");

        assert_eq!(post(&["a", " ", "c"]).validate().unwrap_err(), "blank tag");
    }

    #[test]
    fn unknown_fields_ignored() {
        let p: StructuredPost = serde_json::from_str(
            r#"{"title":"T","content":"C","tags":["x","y","z"],"summary":"S","mood":"upbeat"}"#,
        )
        .unwrap();
        assert_eq!(p.tags.len(), 3);
    }
}
