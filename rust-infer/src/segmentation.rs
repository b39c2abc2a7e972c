//! Image segmentation inference API surface.

use std::path::Path;
use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use rust_infer_types::segmentation::SegmentationEntry;

use crate::client::{ClientInner, Service};
use crate::error::{Error, Result};

const WAIT_FOR_MODEL: HeaderName = HeaderName::from_static("x-wait-for-model");

#[derive(Clone)]
pub struct Segmentation {
    pub(crate) inner: Arc<ClientInner>,
}

impl Segmentation {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// 推理端点 URL。
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}models/{}",
            self.inner.config.segmentation_base_url, self.inner.config.segmentation_model
        )
    }

    /// 读取图片文件并提交分割请求。
    ///
    /// # Errors
    /// 当文件不可读、网络请求失败或状态码不是 200 时返回错误。
    pub async fn query(&self, image_path: impl AsRef<Path>) -> Result<Vec<SegmentationEntry>> {
        let bytes = tokio::fs::read(image_path).await?;
        self.query_bytes(bytes).await
    }

    /// 提交原始图片字节。
    ///
    /// # Errors
    /// 当网络请求失败、状态码不是 200 或响应体无法解析时返回错误。
    pub async fn query_bytes(&self, image: Vec<u8>) -> Result<Vec<SegmentationEntry>> {
        let request = self
            .inner
            .http
            .post(self.endpoint())
            .header(WAIT_FOR_MODEL, HeaderValue::from_static("true"))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))
            .body(image);
        let response = self.inner.send(request, Service::Segmentation).await?;
        if response.status() != StatusCode::OK {
            return Err(Error::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let entries = response.json::<Vec<SegmentationEntry>>().await?;
        tracing::debug!(count = entries.len(), "segmentation entries received");
        Ok(entries)
    }
}
