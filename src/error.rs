//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，作为所有对外操作与 Tauri command 的返回类型。
//! 各子领域（笔记库、摄像头引擎）保留自己的错误枚举，在边界处通过 `From` 上转。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `VaultError` / `CameraError` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，满足 Tauri IPC 要求。

use serde::Serialize;

use crate::navigation::VaultError;
use crate::scanner::CameraError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 笔记库（文档存储）操作失败
    #[error("{0}")]
    Vault(#[from] VaultError),

    /// 摄像头扫描引擎错误
    #[error("{0}")]
    Camera(#[from] CameraError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 存储目录不可用
    #[error("存储目录不可用: {0}")]
    Storage(String),

    /// 设置读写失败
    #[error("设置错误: {0}")]
    Settings(String),

    /// 二维码生成失败
    #[error("二维码生成失败: {0}")]
    Render(String),

    /// 工作区（视图）操作失败
    #[error("工作区操作失败: {0}")]
    Workspace(String),

    /// 与前端 webview 的桥接失败
    #[error("前端桥接失败: {0}")]
    Bridge(String),
}

/// Tauri IPC 要求返回值实现 `Serialize`。
/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts_and_keeps_message() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn serializes_as_display_string() {
        let err = AppError::Settings("bad json".to_string());
        let json = serde_json::to_string(&err).expect("serialize error");
        assert_eq!(json, "\"设置错误: bad json\"");
    }

    #[test]
    fn camera_error_passes_message_through() {
        let err: AppError = CameraError::PermissionDenied("NotAllowedError".to_string()).into();
        assert_eq!(err.to_string(), CameraError::PermissionDenied("NotAllowedError".to_string()).to_string());
    }
}
