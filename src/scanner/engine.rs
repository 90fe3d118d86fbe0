//! # 摄像头引擎抽象
//!
//! ## 设计思路
//!
//! 实际的取帧与解码由外部引擎完成（桌面外壳中运行在 webview 内）。
//! 这里只定义会话需要的三个异步操作与配置模型，便于测试时替换为假实现。

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::settings::FacingMode;

/// 连续识别的帧率
pub const SCAN_FPS: u32 = 10;
/// 识别区域边长（像素）
pub const DETECTION_BOX_SIZE: u32 = 250;
/// 取景宽高比
pub const ASPECT_RATIO: f32 = 1.0;

/// 摄像头引擎错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    /// 用户或系统拒绝了摄像头权限
    #[error("Camera permission denied ({0})")]
    PermissionDenied(String),

    /// 设备被占用或已断开
    #[error("Camera is not available ({0})")]
    DeviceUnavailable(String),

    /// 引擎内部错误（原样透传引擎消息）
    #[error("{0}")]
    Engine(String),
}

/// 引擎报告的摄像头设备
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

/// 识别区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectionBox {
    pub width: u32,
    pub height: u32,
}

/// 启动连续识别时传给引擎的配置
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    pub fps: u32,
    pub qrbox: DetectionBox,
    pub aspect_ratio: f32,
    pub facing_mode: FacingMode,
}

impl CaptureConfig {
    pub fn with_facing_mode(facing_mode: FacingMode) -> Self {
        Self {
            fps: SCAN_FPS,
            qrbox: DetectionBox {
                width: DETECTION_BOX_SIZE,
                height: DETECTION_BOX_SIZE,
            },
            aspect_ratio: ASPECT_RATIO,
            facing_mode,
        }
    }
}

/// 外部摄像头扫描引擎
///
/// 识别结果不经由本 trait 返回：引擎通过回调调用
/// `ScannerSession::on_scan_success` / `on_scan_failure` 投递。
pub trait CameraEngine: Send + Sync + 'static {
    /// 枚举可用摄像头（按引擎报告顺序）
    fn list_cameras(&self) -> impl Future<Output = Result<Vec<CameraDevice>, CameraError>> + Send;

    /// 在指定设备上开始连续识别
    fn start(
        &self,
        device_id: &str,
        config: &CaptureConfig,
    ) -> impl Future<Output = Result<(), CameraError>> + Send;

    /// 停止识别并释放摄像头
    fn stop(&self) -> impl Future<Output = Result<(), CameraError>> + Send;
}
