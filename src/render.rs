//! 二维码代码块渲染模块
//!
//! # 设计思路
//!
//! 笔记中的两种代码块会被渲染成二维码图片：
//! - `qrcode`：编码代码块中的任意文本
//! - `qrcodelocal`：编码指向当前笔记的深度链接
//!
//! 编码由 `qrcode` crate 完成，这里只负责把模块矩阵栅格化为固定尺寸的 PNG，
//! 并把所有失败转换为代码块内显示的错误文本，从不向宿主抛错。
//!
//! # 实现思路
//!
//! - 纠错等级 M，四周留 1 个模块的空白，输出 200×200 像素灰度 PNG。
//! - 每个像素按比例映射回模块坐标，尺寸不必是模块数的整数倍。
//! - PNG 编码使用 `image`，前端通过 base64 Data URL 直接显示。

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};
use serde::Serialize;

use crate::deep_link;
use crate::error::AppError;
use crate::navigation::NoteHandle;

/// 任意文本二维码的代码块语言标记
pub const QRCODE_BLOCK: &str = "qrcode";
/// 当前笔记深度链接二维码的代码块语言标记
pub const QRCODE_LOCAL_BLOCK: &str = "qrcodelocal";

/// 输出图片边长（像素）
pub const QR_IMAGE_SIZE: u32 = 200;
/// 静区宽度（模块数）
pub const QR_MARGIN: u32 = 1;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// 代码块渲染结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockOutput {
    /// 二维码图片与说明文字
    Qr {
        #[serde(rename = "dataUrl", serialize_with = "serialize_data_url")]
        png: Vec<u8>,
        caption: String,
    },
    /// 在代码块位置显示的错误文本
    Error { message: String },
}

impl BlockOutput {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// PNG 字节转 Data URL
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(png))
}

fn serialize_data_url<S>(png: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&png_data_url(png))
}

/// 将文本编码为二维码 PNG
pub fn encode_png(content: &str) -> Result<Vec<u8>, AppError> {
    let code = QrCode::with_error_correction_level(content.as_bytes(), EcLevel::M)
        .map_err(|e| AppError::Render(e.to_string()))?;

    let modules = code.width() as u32;
    let colors = code.to_colors();
    let total = modules + QR_MARGIN * 2;

    let image = GrayImage::from_fn(QR_IMAGE_SIZE, QR_IMAGE_SIZE, |x, y| {
        let mx = x * total / QR_IMAGE_SIZE;
        let my = y * total / QR_IMAGE_SIZE;
        let inside = (QR_MARGIN..QR_MARGIN + modules).contains(&mx)
            && (QR_MARGIN..QR_MARGIN + modules).contains(&my);
        if !inside {
            return LIGHT;
        }

        let index = ((my - QR_MARGIN) * modules + (mx - QR_MARGIN)) as usize;
        match colors.get(index) {
            Some(Color::Dark) => DARK,
            _ => LIGHT,
        }
    });

    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image)
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| AppError::Render(format!("PNG 编码失败: {}", e)))?;
    Ok(cursor.into_inner())
}

/// `qrcode` 代码块
pub fn render_qrcode_block(source: &str) -> BlockOutput {
    let content = source.trim();
    if content.is_empty() {
        return BlockOutput::error("Error: No content provided for QR code generation.");
    }

    match encode_png(content) {
        Ok(png) => BlockOutput::Qr {
            png,
            caption: content.to_string(),
        },
        Err(err) => {
            log::error!("生成二维码失败: {}", err);
            BlockOutput::error(format!("Error generating QR code: {}", render_reason(&err)))
        }
    }
}

/// `qrcodelocal` 代码块：编码 `obsidian://open?vault=..&file=..`
pub fn render_local_block(active: Option<&NoteHandle>, vault_name: &str) -> BlockOutput {
    let Some(note) = active else {
        return BlockOutput::error("Error: No active file found.");
    };

    let uri = deep_link::build_open_uri(vault_name, &note.path);
    match encode_png(&uri) {
        Ok(png) => BlockOutput::Qr { png, caption: uri },
        Err(err) => {
            log::error!("生成本地笔记二维码失败: {}", err);
            BlockOutput::error(format!(
                "Error generating local QR code: {}",
                render_reason(&err)
            ))
        }
    }
}

fn render_reason(err: &AppError) -> String {
    match err {
        AppError::Render(reason) => reason.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(png: &[u8]) -> GrayImage {
        image::load_from_memory(png).expect("valid png").to_luma8()
    }

    #[test]
    fn renders_fixed_size_png_with_quiet_zone() {
        let BlockOutput::Qr { png, caption } = render_qrcode_block("  hello world \n") else {
            panic!("expected qr output");
        };
        assert_eq!(caption, "hello world");

        let image = decode(&png);
        assert_eq!(image.dimensions(), (QR_IMAGE_SIZE, QR_IMAGE_SIZE));
        assert_eq!(image.get_pixel(0, 0), &LIGHT);

        // 左上角定位图案的第一个模块必然是深色
        let code = QrCode::with_error_correction_level("hello world", EcLevel::M).unwrap();
        let total = code.width() as u32 + QR_MARGIN * 2;
        let first_module_px = QR_IMAGE_SIZE.div_ceil(total);
        assert_eq!(image.get_pixel(first_module_px, first_module_px), &DARK);
    }

    #[test]
    fn empty_block_is_an_error() {
        assert_eq!(
            render_qrcode_block(" \n\t"),
            BlockOutput::error("Error: No content provided for QR code generation.")
        );
    }

    #[test]
    fn oversized_content_is_reported_inline() {
        let huge = "x".repeat(5_000);
        match render_qrcode_block(&huge) {
            BlockOutput::Error { message } => {
                assert!(message.starts_with("Error generating QR code: "), "{message}");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn local_block_requires_active_note() {
        assert_eq!(
            render_local_block(None, "Vault"),
            BlockOutput::error("Error: No active file found.")
        );
    }

    #[test]
    fn local_block_encodes_deep_link() {
        let note = NoteHandle::new("projects/q3 plan.md");
        let BlockOutput::Qr { caption, .. } = render_local_block(Some(&note), "Work Vault") else {
            panic!("expected qr output");
        };
        assert_eq!(
            caption,
            "obsidian://open?vault=Work%20Vault&file=projects%2Fq3%20plan.md"
        );
    }

    #[test]
    fn serializes_png_as_data_url() {
        let output = BlockOutput::Qr {
            png: vec![1, 2, 3],
            caption: "c".to_string(),
        };
        let json = serde_json::to_value(&output).expect("serialize");
        assert_eq!(json["kind"], "qr");
        assert_eq!(json["dataUrl"], "data:image/png;base64,AQID");
        assert_eq!(json["caption"], "c");

        let json = serde_json::to_value(BlockOutput::error("boom")).expect("serialize");
        assert_eq!(json["kind"], "error");
        assert_eq!(json["message"], "boom");
    }
}
