use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 单次调用的输入：文本提示和原始图片字节。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub prompt: String,
    pub image: Vec<u8>,
}

impl PromptRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>, image: Vec<u8>) -> Self {
        Self {
            prompt: prompt.into(),
            image,
        }
    }
}

/// Chat Completions 请求体。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// 对话消息。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    /// 创建用户消息。
    #[must_use]
    pub const fn user(content: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }
}

/// 消息角色。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 多模态消息片段。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    /// 文本片段。
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// 图片 URL 片段（可以是 data URL）。
    #[must_use]
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUrl {
    pub url: String,
}

/// Chat Completions 响应。
///
/// 只有缺少 `choices` 字段的响应体才保留为 `Malformed`；存在 `choices` 但结构
/// 不符时反序列化失败。
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ChatResponse {
    Completion(ChatCompletion),
    Malformed(Value),
}

impl<'de> Deserialize<'de> for ChatResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl ChatResponse {
    /// 按是否存在 `choices` 字段分支解析。
    ///
    /// # Errors
    /// 当 `choices` 存在但任一 choice 结构不符时返回错误。
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if value.get("choices").is_none() {
            return Ok(Self::Malformed(value));
        }
        serde_json::from_value(value).map(Self::Completion)
    }

    /// 返回 completion（若响应格式正确）。
    #[must_use]
    pub const fn completion(&self) -> Option<&ChatCompletion> {
        match self {
            Self::Completion(completion) => Some(completion),
            Self::Malformed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// 响应候选。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Choice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChoiceMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl Choice {
    /// 提取 `message.content`。
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|message| message.content.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceMessage {
    /// 原样保留，兼容 `tool`、`developer` 等新角色。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Token 用量。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
