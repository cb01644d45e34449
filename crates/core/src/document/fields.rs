//! Allow-listed descriptive fields of an artifact.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Descriptive fields kept on a document. Advisory only.
///
/// Anything the extractor reports outside this list is dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactFields {
    /// Title with spaces replaced by underscores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    /// Upload date as reported (usually `YYYYMMDD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tbr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcodec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vbr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acodec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asr: Option<u64>,
}

impl ArtifactFields {
    /// Mask raw extractor metadata down to the allow-list.
    ///
    /// `title` becomes `video_title` (spaces underscored), `upload_date`
    /// becomes `video_date`, `display_id` stands in for a missing
    /// `shortcode`. Values of the wrong type are dropped.
    pub fn from_raw(raw: &Value) -> Self {
        let text = |key: &str| {
            raw.get(key).and_then(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        };
        let float = |key: &str| raw.get(key).and_then(Value::as_f64);
        let int = |key: &str| {
            raw.get(key).and_then(|v| {
                v.as_u64()
                    .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            })
        };

        Self {
            video_title: text("title").map(|t| t.replace(' ', "_")),
            video_date: text("upload_date"),
            uploader: text("uploader"),
            file_path: text("file_path"),
            duration: float("duration"),
            width: int("width"),
            height: int("height"),
            id: text("id"),
            shortcode: text("shortcode").or_else(|| text("display_id")),
            ext: text("ext"),
            resolution: text("resolution"),
            fps: float("fps"),
            channels: int("channels"),
            filesize: int("filesize").or_else(|| int("filesize_approx")),
            tbr: float("tbr"),
            protocol: text("protocol"),
            vcodec: text("vcodec"),
            vbr: float("vbr"),
            acodec: text("acodec"),
            abr: float("abr"),
            asr: int("asr"),
        }
    }

    /// Values usable as cleanup tokens, spaces underscored.
    pub fn identifying_values(&self) -> Vec<String> {
        [
            &self.id,
            &self.shortcode,
            &self.uploader,
            &self.video_title,
            &self.video_date,
        ]
        .into_iter()
        .flatten()
        .map(|v| v.replace(' ', "_"))
        .collect()
    }
}
