//! Segmentation mask decoding, label coloring and overlay blending.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use rust_infer_types::segmentation::{Mask, SegmentationEntry};

use crate::error::{Error, Result};

/// 标签配色表；超过 10 个标签时循环复用。
pub const PALETTE: [Rgb<u8>; 10] = [
    Rgb([230, 25, 75]),
    Rgb([60, 180, 75]),
    Rgb([255, 225, 25]),
    Rgb([0, 130, 200]),
    Rgb([245, 130, 48]),
    Rgb([145, 30, 180]),
    Rgb([70, 240, 240]),
    Rgb([240, 50, 230]),
    Rgb([210, 245, 60]),
    Rgb([250, 190, 190]),
];

/// 灰度值严格大于该阈值的像素视为前景。
pub const MASK_THRESHOLD: u8 = 128;

/// 原图在混合结果中的权重，叠加层权重为 `1 - ALPHA`。
pub const ALPHA: f32 = 0.5;

/// 二值掩码。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl BinaryMask {
    /// 按 [`MASK_THRESHOLD`] 对灰度图做阈值化。
    #[must_use]
    pub fn from_gray(gray: &GrayImage) -> Self {
        Self {
            width: gray.width(),
            height: gray.height(),
            bits: gray.pixels().map(|p| p.0[0] > MASK_THRESHOLD).collect(),
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// 坐标越界时返回 `false`。
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[(y as usize) * (self.width as usize) + x as usize]
    }

    /// 前景像素数量。
    #[must_use]
    pub fn foreground_count(&self) -> usize {
        self.bits.iter().filter(|bit| **bit).count()
    }
}

/// 将任一可识别编码的掩码解码为二值网格。
///
/// # Errors
/// 掩码形态不受支持、base64 或图片解码失败、像素数量与尺寸不符时返回错误。
pub fn decode_mask(mask: &Mask) -> Result<BinaryMask> {
    let gray = match mask {
        Mask::Base64(encoded) => {
            let bytes = STANDARD.decode(encoded.as_bytes())?;
            image::load_from_memory(&bytes)?.to_luma8()
        }
        Mask::Decoded(decoded) => {
            let expected = decoded.width as usize * decoded.height as usize;
            let actual = decoded.pixels.len();
            GrayImage::from_raw(decoded.width, decoded.height, decoded.pixels.clone()).ok_or_else(
                || Error::Parse {
                    message: format!(
                        "decoded mask has {actual} pixels, expected {expected} ({}x{})",
                        decoded.width, decoded.height
                    ),
                },
            )?
        }
        Mask::Unsupported(_) => return Err(Error::UnsupportedMask { kind: mask.kind() }),
    };
    Ok(BinaryMask::from_gray(&gray))
}

/// 图例条目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb<u8>,
}

/// 标签到颜色的映射，按首次出现顺序分配。
#[derive(Debug, Clone, Default)]
pub struct LabelColorMap {
    entries: Vec<LegendEntry>,
    index: HashMap<String, usize>,
}

impl LabelColorMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回标签的颜色；新标签取 `PALETTE[len % 10]` 并记录。
    pub fn assign(&mut self, label: &str) -> Rgb<u8> {
        if let Some(&position) = self.index.get(label) {
            return self.entries[position].color;
        }
        let color = PALETTE[self.entries.len() % PALETTE.len()];
        self.index.insert(label.to_string(), self.entries.len());
        self.entries.push(LegendEntry {
            label: label.to_string(),
            color,
        });
        color
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<Rgb<u8>> {
        self.index
            .get(label)
            .map(|&position| self.entries[position].color)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LegendEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn into_legend(self) -> Vec<LegendEntry> {
        self.entries
    }
}

/// 叠加结果：混合后的图像与图例。
#[derive(Debug, Clone)]
pub struct SegmentationMap {
    pub blended: RgbImage,
    pub legend: Vec<LegendEntry>,
    /// 因掩码无法解码或尺寸不符而跳过的条目数。
    pub skipped: usize,
}

/// 将所有掩码绘制到黑色叠加层上，再与原图按 [`ALPHA`] 混合。
///
/// 后出现的条目覆盖先前重叠的像素。无法解码的条目会被记录并跳过。
#[must_use]
pub fn compose_overlay(original: &DynamicImage, entries: &[SegmentationEntry]) -> SegmentationMap {
    let original = original.to_rgb8();
    let (width, height) = original.dimensions();
    let mut overlay = RgbImage::new(width, height);
    let mut colors = LabelColorMap::new();
    let mut skipped = 0;

    for entry in entries {
        let mask = match decode_mask(&entry.mask) {
            Ok(mask) => mask,
            Err(err) => {
                tracing::warn!(label = %entry.label, error = %err, "skipping segmentation entry");
                skipped += 1;
                continue;
            }
        };
        if mask.width() != width || mask.height() != height {
            let err = Error::MaskSizeMismatch {
                mask_width: mask.width(),
                mask_height: mask.height(),
                image_width: width,
                image_height: height,
            };
            tracing::warn!(label = %entry.label, error = %err, "skipping segmentation entry");
            skipped += 1;
            continue;
        }

        let color = colors.assign(&entry.label);
        for (x, y, pixel) in overlay.enumerate_pixels_mut() {
            if mask.get(x, y) {
                *pixel = color;
            }
        }
    }

    SegmentationMap {
        blended: blend(&original, &overlay),
        legend: colors.into_legend(),
        skipped,
    }
}

fn blend(original: &RgbImage, overlay: &RgbImage) -> RgbImage {
    let mut blended = original.clone();
    for (out, over) in blended.pixels_mut().zip(overlay.pixels()) {
        for (channel, &over) in out.0.iter_mut().zip(over.0.iter()) {
            let mixed = ALPHA.mul_add(f32::from(*channel), (1.0 - ALPHA) * f32::from(over));
            *channel = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }
    blended
}
