//! Rendering of a [`SegmentationMap`] into a single raster with a legend panel.

use std::path::Path;

use ab_glyph::{FontRef, PxScale};
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::error::Result;
use crate::overlay::SegmentationMap;

/// DejaVu Sans，许可见 `assets/DejaVuSans-LICENSE.txt`。
static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

pub const TITLE: &str = "Semantic Segmentation Map";

const TITLE_HEIGHT: u32 = 18;
const LABEL_HEIGHT: u32 = 14;
const TITLE_GAP: u32 = 10;
const SWATCH_SIZE: u32 = 20;
const SWATCH_GAP: u32 = 6;
const LABEL_GAP: u32 = 6;
const PANEL_MARGIN: u32 = 8;
const PANEL_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const SWATCH_BORDER: Rgb<u8> = Rgb([0, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// 将混合图与右侧图例面板拼接。
///
/// 面板顶部为标题，其下每个标签一行：色块加标签文字，按首次出现顺序自上而下排列。
///
/// # Errors
/// 内嵌字体无法解析时返回 [`Error::Font`](crate::Error::Font)。
pub fn render_segmentation_map(map: &SegmentationMap) -> Result<RgbImage> {
    let font = FontRef::try_from_slice(FONT_BYTES)?;
    let title_scale = PxScale::from(TITLE_HEIGHT as f32);
    let label_scale = PxScale::from(LABEL_HEIGHT as f32);

    let (width, height) = map.blended.dimensions();
    let (title_width, _) = text_size(title_scale, &font, TITLE);
    let label_width = map
        .legend
        .iter()
        .map(|entry| text_size(label_scale, &font, &entry.label).0)
        .max()
        .unwrap_or(0);
    let row_width = SWATCH_SIZE + LABEL_GAP + label_width;
    let panel_width = PANEL_MARGIN * 2 + title_width.max(row_width);

    let rows_top = PANEL_MARGIN + TITLE_HEIGHT + TITLE_GAP;
    let rows = u32::try_from(map.legend.len()).unwrap_or(u32::MAX);
    let panel_height = rows_top + rows.saturating_mul(SWATCH_SIZE + SWATCH_GAP) + PANEL_MARGIN;

    let mut canvas = RgbImage::from_pixel(
        width + panel_width,
        height.max(panel_height),
        PANEL_BACKGROUND,
    );
    imageops::replace(&mut canvas, &map.blended, 0, 0);

    let left = width + PANEL_MARGIN;
    draw_text_mut(
        &mut canvas,
        TEXT_COLOR,
        to_coord(left),
        to_coord(PANEL_MARGIN),
        title_scale,
        &font,
        TITLE,
    );
    for (row, entry) in (0u32..).zip(&map.legend) {
        let top = rows_top + row * (SWATCH_SIZE + SWATCH_GAP);
        draw_swatch(&mut canvas, left, top, entry.color);
        draw_text_mut(
            &mut canvas,
            TEXT_COLOR,
            to_coord(left + SWATCH_SIZE + LABEL_GAP),
            to_coord(top + (SWATCH_SIZE - LABEL_HEIGHT) / 2),
            label_scale,
            &font,
            &entry.label,
        );
    }
    Ok(canvas)
}

fn to_coord(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn draw_swatch(canvas: &mut RgbImage, left: u32, top: u32, color: Rgb<u8>) {
    for y in top..top + SWATCH_SIZE {
        for x in left..left + SWATCH_SIZE {
            if x >= canvas.width() || y >= canvas.height() {
                continue;
            }
            let edge = x == left
                || y == top
                || x == left + SWATCH_SIZE - 1
                || y == top + SWATCH_SIZE - 1;
            canvas.put_pixel(x, y, if edge { SWATCH_BORDER } else { color });
        }
    }
}

/// 渲染并写入文件，格式由扩展名决定。
///
/// # Errors
/// 当字体解析、编码或写入文件失败时返回错误。
pub fn save_segmentation_map(map: &SegmentationMap, output_path: impl AsRef<Path>) -> Result<()> {
    let output_path = output_path.as_ref();
    render_segmentation_map(map)?.save(output_path)?;
    tracing::info!(
        path = %output_path.display(),
        labels = map.legend.len(),
        "segmentation map saved"
    );
    Ok(())
}
