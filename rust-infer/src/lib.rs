//! Clients for a multimodal chat-completions API and an image-segmentation
//! inference API, plus the overlay rendering used to visualize segmentation
//! results.

pub mod client;
pub mod error;
pub mod overlay;
pub mod render;
pub mod segmentation;
pub mod vision_chat;

#[cfg(test)]
mod test_support;

pub use rust_infer_types as types;

pub use client::{Client, ClientBuilder, ClientConfig, HttpOptions};
pub use error::{Error, Result};
