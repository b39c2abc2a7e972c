use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 分割接口返回的单个区域。
///
/// 同一标签可能出现多次，条目之间不做合并。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentationEntry {
    /// 缺失、为 null 或不是字符串时记为 `unknown`。
    #[serde(default = "unknown_label", deserialize_with = "label_or_unknown")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub mask: Mask,
}

impl SegmentationEntry {
    #[must_use]
    pub fn new(label: impl Into<String>, mask: Mask) -> Self {
        Self {
            label: label.into(),
            score: None,
            mask,
        }
    }
}

fn unknown_label() -> String {
    "unknown".to_string()
}

fn label_or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(label)) => label,
        _ => unknown_label(),
    })
}

/// 掩码的两种可识别编码；其他形态保留原始 JSON。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Mask {
    /// base64 编码的图片文件（PNG/JPEG）。
    Base64(String),
    /// 已解码的灰度像素网格。
    Decoded(DecodedMask),
    Unsupported(Value),
}

impl Default for Mask {
    fn default() -> Self {
        Self::Unsupported(Value::Null)
    }
}

impl Mask {
    /// 将图片文件字节编码为 base64 掩码。
    #[must_use]
    pub fn from_image_bytes(bytes: &[u8]) -> Self {
        Self::Base64(STANDARD.encode(bytes))
    }

    /// 掩码形态名称，用于诊断信息。
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Base64(_) => "base64",
            Self::Decoded(_) => "decoded",
            Self::Unsupported(Value::Null) => "null",
            Self::Unsupported(Value::Bool(_)) => "bool",
            Self::Unsupported(Value::Number(_)) => "number",
            Self::Unsupported(Value::String(_)) => "string",
            Self::Unsupported(Value::Array(_)) => "array",
            Self::Unsupported(Value::Object(_)) => "object",
        }
    }
}

/// 行优先的 8 位灰度网格。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecodedMask {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entries_parse_both_mask_encodings() {
        let entries: Vec<SegmentationEntry> = serde_json::from_value(json!([
            {"label": "road", "score": 0.9, "mask": "iVBORw0KGgo="},
            {"label": "sky", "mask": {"width": 1, "height": 1, "pixels": [255]}},
            {"label": "car", "mask": 42},
            {"mask": "AA=="}
        ]))
        .unwrap();

        assert_eq!(entries[0].mask, Mask::Base64("iVBORw0KGgo=".into()));
        assert_eq!(entries[0].score, Some(0.9));
        assert_eq!(
            entries[1].mask,
            Mask::Decoded(DecodedMask {
                width: 1,
                height: 1,
                pixels: vec![255],
            })
        );
        assert_eq!(entries[2].mask.kind(), "number");
        assert_eq!(entries[3].label, "unknown");
    }

    #[test]
    fn test_bad_label_falls_back_to_unknown() {
        let entries: Vec<SegmentationEntry> = serde_json::from_value(json!([
            {"label": null, "mask": "AA=="},
            {"label": 3, "mask": "AA=="},
            {"label": ["a"], "mask": "AA=="},
            {"label": "wall", "mask": "AA=="}
        ]))
        .unwrap();
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["unknown", "unknown", "unknown", "wall"]);
    }

    #[test]
    fn test_missing_mask_is_unsupported_null() {
        let entry: SegmentationEntry = serde_json::from_value(json!({"label": "x"})).unwrap();
        assert_eq!(entry.mask, Mask::Unsupported(Value::Null));
        assert_eq!(entry.mask.kind(), "null");
    }

    #[test]
    fn test_from_image_bytes_encodes_base64() {
        assert_eq!(Mask::from_image_bytes(b"hello"), Mask::Base64("aGVsbG8=".into()));
    }
}
