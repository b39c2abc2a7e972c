//! Client configuration and transport layer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client as HttpClient, Proxy};

use crate::error::{Error, Result};

/// 推理服务客户端。
///
/// 配置在进程启动时构建一次，之后由 `VisionChat` 与 `Segmentation` 共享。
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub http: HttpClient,
    pub config: ClientConfig,
    chat_auth: Option<HeaderValue>,
    segmentation_auth: Option<HeaderValue>,
}

/// 客户端配置。
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// OpenAI 兼容接口的 API 密钥。
    pub openai_api_key: Option<String>,
    /// HuggingFace Inference API token。
    pub huggingface_token: Option<String>,
    /// Chat Completions 基础 URL（以 `/` 结尾）。
    pub chat_base_url: String,
    pub chat_model: String,
    /// Inference API 基础 URL（以 `/` 结尾）。
    pub segmentation_base_url: String,
    pub segmentation_model: String,
    /// HTTP 配置。
    pub http_options: HttpOptions,
}

impl ClientConfig {
    pub const DEFAULT_CHAT_BASE_URL: &'static str = "https://api.openai.com/v1/";
    pub const DEFAULT_CHAT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_SEGMENTATION_BASE_URL: &'static str = "https://api-inference.huggingface.co/";
    pub const DEFAULT_SEGMENTATION_MODEL: &'static str =
        "nvidia/segformer-b0-finetuned-ade-512-512";
}

/// HTTP 配置。
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub headers: HashMap<String, String>,
}

/// 请求所属的服务，决定注入哪一个凭据。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Service {
    Chat,
    Segmentation,
}

impl Client {
    /// 使用默认端点创建客户端。
    ///
    /// # Errors
    /// 当凭据包含非法字符或构建 HTTP 客户端失败时返回错误。
    pub fn new(
        openai_api_key: impl Into<String>,
        huggingface_token: impl Into<String>,
    ) -> Result<Self> {
        Self::builder()
            .openai_api_key(openai_api_key)
            .huggingface_token(huggingface_token)
            .build()
    }

    /// 从环境变量创建客户端。
    ///
    /// 缺失的凭据不会报错：请求将不带鉴权头发出，由远端拒绝。
    ///
    /// # Errors
    /// 当环境变量内容无效或构建客户端失败时返回错误。
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(key) = non_empty_env("OPENAI_API_KEY") {
            builder = builder.openai_api_key(key);
        }
        if let Some(token) = non_empty_env("HUGGINGFACE_API_TOKEN") {
            builder = builder.huggingface_token(token);
        }
        if let Some(base_url) = non_empty_env("OPENAI_BASE_URL") {
            builder = builder.chat_base_url(base_url);
        }
        if let Some(model) = non_empty_env("OPENAI_MODEL") {
            builder = builder.chat_model(model);
        }
        if let Some(base_url) = non_empty_env("HUGGINGFACE_BASE_URL") {
            builder = builder.segmentation_base_url(base_url);
        }
        if let Some(model) = non_empty_env("HUGGINGFACE_MODEL") {
            builder = builder.segmentation_model(model);
        }
        builder.build()
    }

    /// 创建 Builder。
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// 当前配置。
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// 访问多模态 Chat API。
    #[must_use]
    pub fn vision_chat(&self) -> crate::vision_chat::VisionChat {
        crate::vision_chat::VisionChat::new(self.inner.clone())
    }

    /// 访问图像分割 API。
    #[must_use]
    pub fn segmentation(&self) -> crate::segmentation::Segmentation {
        crate::segmentation::Segmentation::new(self.inner.clone())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// 客户端 Builder。
#[derive(Default)]
pub struct ClientBuilder {
    openai_api_key: Option<String>,
    huggingface_token: Option<String>,
    chat_base_url: Option<String>,
    chat_model: Option<String>,
    segmentation_base_url: Option<String>,
    segmentation_model: Option<String>,
    http_options: HttpOptions,
}

impl ClientBuilder {
    /// 设置 OpenAI API Key。
    #[must_use]
    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    /// 设置 HuggingFace token。
    #[must_use]
    pub fn huggingface_token(mut self, token: impl Into<String>) -> Self {
        self.huggingface_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn chat_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.chat_base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = Some(model.into());
        self
    }

    #[must_use]
    pub fn segmentation_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.segmentation_base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn segmentation_model(mut self, model: impl Into<String>) -> Self {
        self.segmentation_model = Some(model.into());
        self
    }

    /// 设置请求超时（秒）。未设置时沿用传输层默认值。
    #[must_use]
    pub const fn timeout(mut self, secs: u64) -> Self {
        self.http_options.timeout = Some(secs);
        self
    }

    /// 设置代理。
    #[must_use]
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.http_options.proxy = Some(url.into());
        self
    }

    /// 增加默认 HTTP 头。
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http_options.headers.insert(key.into(), value.into());
        self
    }

    /// 构建客户端。
    ///
    /// # Errors
    /// 当头部、凭据或代理无效，或构建 HTTP 客户端失败时返回错误。
    pub fn build(self) -> Result<Client> {
        let Self {
            openai_api_key,
            huggingface_token,
            chat_base_url,
            chat_model,
            segmentation_base_url,
            segmentation_model,
            http_options,
        } = self;

        let openai_api_key = openai_api_key.filter(|key| !key.is_empty());
        let huggingface_token = huggingface_token.filter(|token| !token.is_empty());
        let chat_auth = bearer_header(openai_api_key.as_deref(), "OpenAI API key")?;
        let segmentation_auth = bearer_header(huggingface_token.as_deref(), "HuggingFace token")?;

        let headers = Self::build_headers(&http_options)?;
        let http = Self::build_http_client(&http_options, headers)?;

        let config = ClientConfig {
            openai_api_key,
            huggingface_token,
            chat_base_url: chat_base_url.as_deref().map_or_else(
                || ClientConfig::DEFAULT_CHAT_BASE_URL.to_string(),
                normalize_base_url,
            ),
            chat_model: chat_model.unwrap_or_else(|| ClientConfig::DEFAULT_CHAT_MODEL.to_string()),
            segmentation_base_url: segmentation_base_url.as_deref().map_or_else(
                || ClientConfig::DEFAULT_SEGMENTATION_BASE_URL.to_string(),
                normalize_base_url,
            ),
            segmentation_model: segmentation_model
                .unwrap_or_else(|| ClientConfig::DEFAULT_SEGMENTATION_MODEL.to_string()),
            http_options,
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                http,
                config,
                chat_auth,
                segmentation_auth,
            }),
        })
    }

    fn build_headers(http_options: &HttpOptions) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in &http_options.headers {
            let name =
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| Error::InvalidConfig {
                    message: format!("Invalid header name: {key}"),
                })?;
            let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidConfig {
                message: format!("Invalid header value for {key}"),
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn build_http_client(http_options: &HttpOptions, headers: HeaderMap) -> Result<HttpClient> {
        let mut http_builder = HttpClient::builder();
        if let Some(timeout) = http_options.timeout {
            http_builder = http_builder.timeout(Duration::from_secs(timeout));
        }

        if let Some(proxy_url) = &http_options.proxy {
            let proxy = Proxy::all(proxy_url).map_err(|e| Error::InvalidConfig {
                message: format!("Invalid proxy: {e}"),
            })?;
            http_builder = http_builder.proxy(proxy);
        }

        if !headers.is_empty() {
            http_builder = http_builder.default_headers(headers);
        }

        Ok(http_builder.build()?)
    }
}

fn bearer_header(secret: Option<&str>, what: &str) -> Result<Option<HeaderValue>> {
    let Some(secret) = secret else {
        return Ok(None);
    };
    let mut value =
        HeaderValue::from_str(&format!("Bearer {secret}")).map_err(|_| Error::InvalidConfig {
            message: format!("Invalid {what} value"),
        })?;
    value.set_sensitive(true);
    Ok(Some(value))
}

impl ClientInner {
    /// 发送请求并注入对应服务的鉴权头。
    ///
    /// 调用方显式设置的 `Authorization` 头优先。
    ///
    /// # Errors
    /// 当请求构建或网络请求失败时返回错误。
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
        service: Service,
    ) -> Result<reqwest::Response> {
        let mut request = request.build()?;
        let auth = match service {
            Service::Chat => self.chat_auth.as_ref(),
            Service::Segmentation => self.segmentation_auth.as_ref(),
        };
        if let Some(value) = auth {
            if !request.headers().contains_key(AUTHORIZATION) {
                request.headers_mut().insert(AUTHORIZATION, value.clone());
            }
        } else {
            tracing::debug!(?service, "no credential configured, sending unauthenticated");
        }
        tracing::debug!(method = %request.method(), url = %request.url(), "sending request");
        Ok(self.http.execute(request).await?)
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let mut value = base_url.trim().to_string();
    if !value.ends_with('/') {
        value.push('/');
    }
    value
}
