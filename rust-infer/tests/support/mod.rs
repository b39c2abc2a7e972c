#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat, Luma};

use rust_infer::Client;

pub fn build_client(base_url: &str) -> Client {
    Client::builder()
        .openai_api_key("sk-test")
        .huggingface_token("hf-test")
        .chat_base_url(format!("{base_url}/v1"))
        .segmentation_base_url(base_url)
        .build()
        .unwrap()
}

pub fn gray_png(width: u32, height: u32, pixels: Vec<u8>) -> Vec<u8> {
    let image = GrayImage::from_raw(width, height, pixels).unwrap();
    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// 在目录中写入一张单色 PNG 原图。
pub fn write_uniform_png(dir: &Path, name: &str, width: u32, height: u32, value: u8) -> PathBuf {
    let path = dir.join(name);
    GrayImage::from_pixel(width, height, Luma([value]))
        .save(&path)
        .unwrap();
    path
}
