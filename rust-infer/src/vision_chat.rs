//! Multimodal chat-completions API surface.

use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rust_infer_types::chat::{
    ChatCompletionRequest, ChatMessage, ChatResponse, ContentPart, PromptRequest,
};
use serde_json::Value;

use crate::client::{ClientInner, Service};
use crate::error::{Error, Result};

/// 单次回答的 token 上限。
pub const MAX_TOKENS: u32 = 2_000;
pub const TEMPERATURE: f32 = 0.7;

/// 图片统一声明为 JPEG，与实际格式无关。
const IMAGE_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Clone)]
pub struct VisionChat {
    pub(crate) inner: Arc<ClientInner>,
}

impl VisionChat {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// 构建请求体：一条用户消息，依次包含文本与图片。
    ///
    /// # Errors
    /// 当图片文件不存在或不可读时返回错误。
    pub fn build_request(
        &self,
        prompt: impl Into<String>,
        image_path: impl AsRef<Path>,
    ) -> Result<ChatCompletionRequest> {
        let image_path = image_path.as_ref();
        note_declared_mime(image_path);
        let encoded = encode_image(image_path)?;
        Ok(self.request_with_image(prompt.into(), &encoded))
    }

    /// 从内存中的 [`PromptRequest`] 构建请求体。
    #[must_use]
    pub fn build_request_from(&self, prompt: &PromptRequest) -> ChatCompletionRequest {
        self.request_with_image(prompt.prompt.clone(), &encode_bytes(&prompt.image))
    }

    fn request_with_image(&self, prompt: String, encoded_image: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.inner.config.chat_model.clone(),
            messages: vec![ChatMessage::user(vec![
                ContentPart::text(prompt),
                ContentPart::image_url(format!("{IMAGE_DATA_URL_PREFIX}{encoded_image}")),
            ])],
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
        }
    }

    /// 发送 Chat Completions 请求。
    ///
    /// 非 2xx 状态返回 [`Error::ApiError`]；缺少 `choices` 的成功响应返回
    /// [`ChatResponse::Malformed`]；`choices` 结构不符返回 [`Error::Parse`]。
    ///
    /// # Errors
    /// 当网络请求失败、状态码非 2xx、响应体不是 JSON 或 `choices` 无法解析时返回错误。
    pub async fn send(&self, request: &ChatCompletionRequest) -> Result<ChatResponse> {
        let url = format!("{}chat/completions", self.inner.config.chat_base_url);
        let request = self.inner.http.post(url).json(request);
        let response = self.inner.send(request, Service::Chat).await?;
        if !response.status().is_success() {
            return Err(Error::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let body = response.json::<Value>().await?;
        let response = ChatResponse::from_value(body).map_err(|err| Error::Parse {
            message: format!("invalid chat response: {err}"),
        })?;
        if let ChatResponse::Malformed(_) = &response {
            tracing::warn!("chat response has no choices");
        }
        Ok(response)
    }

    /// 读取图片、发送请求并提取所有回答文本。
    ///
    /// # Errors
    /// 见 [`VisionChat::build_request`]、[`VisionChat::send`] 与 [`extract_contents`]。
    pub async fn describe(
        &self,
        prompt: impl Into<String>,
        image_path: impl AsRef<Path>,
    ) -> Result<Vec<String>> {
        let image_path = image_path.as_ref();
        note_declared_mime(image_path);
        let image = tokio::fs::read(image_path).await?;
        let request = self.build_request_from(&PromptRequest::new(prompt, image));
        let response = self.send(&request).await?;
        extract_contents(&response)
    }
}

/// 读取整个文件并返回 base64 文本。
///
/// # Errors
/// 当文件不存在或不可读时返回 [`Error::Io`]。
pub fn encode_image(image_path: impl AsRef<Path>) -> Result<String> {
    let bytes = std::fs::read(image_path)?;
    Ok(encode_bytes(&bytes))
}

/// 标准字母表、带填充的 base64。
#[must_use]
pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn note_declared_mime(image_path: &Path) {
    if let Some(mime) = mime_guess::from_path(image_path).first() {
        if mime.essence_str() != "image/jpeg" {
            tracing::debug!(
                path = %image_path.display(),
                actual = %mime,
                "image is declared as image/jpeg"
            );
        }
    }
}

/// 按顺序提取每个 choice 的 `message.content`。
///
/// # Errors
/// 当某个 choice 缺少 `message.content` 时返回 [`Error::Parse`]。
pub fn extract_contents(response: &ChatResponse) -> Result<Vec<String>> {
    let Some(completion) = response.completion() else {
        return Ok(Vec::new());
    };
    completion
        .choices
        .iter()
        .enumerate()
        .map(|(position, choice)| {
            choice
                .content()
                .map(ToString::to_string)
                .ok_or_else(|| Error::Parse {
                    message: format!(
                        "choice {} is missing message.content",
                        choice.index.map_or(position, |index| index as usize)
                    ),
                })
        })
        .collect()
}
