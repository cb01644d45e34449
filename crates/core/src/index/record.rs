use serde::{Deserialize, Serialize};

/// Pointer from a source URL to its document file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub url: String,
    /// File name of the document inside the metadata directory.
    #[serde(alias = "metadata_file")]
    pub document_filename: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub shortcode: Option<String>,
}

impl IndexRecord {
    pub fn new(url: impl Into<String>, document_filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            document_filename: document_filename.into(),
            id: None,
            shortcode: None,
        }
    }

    pub fn with_ids(mut self, id: Option<String>, shortcode: Option<String>) -> Self {
        self.id = id;
        self.shortcode = shortcode;
        self
    }
}

/// One line of the index file as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IndexLine {
    Record(IndexRecord),
    /// Kept verbatim so rewrites that are not compactions preserve it.
    Malformed(String),
}

impl IndexLine {
    pub(crate) fn parse(line: &str) -> Self {
        match serde_json::from_str::<IndexRecord>(line) {
            Ok(record) => IndexLine::Record(record),
            Err(_) => IndexLine::Malformed(line.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_field_name() {
        let line = r#"{"url":"https://x/1","metadata_file":"abc.json","id":"abc","shortcode":null}"#;
        match IndexLine::parse(line) {
            IndexLine::Record(record) => {
                assert_eq!(record.document_filename, "abc.json");
                assert_eq!(record.id.as_deref(), Some("abc"));
                assert!(record.shortcode.is_none());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_writes_current_field_name() {
        let record = IndexRecord::new("https://x/1", "abc.json");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"url":"https://x/1","document_filename":"abc.json","id":null,"shortcode":null}"#
        );
    }

    #[test]
    fn test_malformed_line() {
        assert!(matches!(
            IndexLine::parse("{\"url\": 3"),
            IndexLine::Malformed(_)
        ));
    }
}
