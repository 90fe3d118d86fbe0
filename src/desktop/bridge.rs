//! # webview 摄像头引擎桥接
//!
//! ## 设计思路
//!
//! 引擎的每个异步操作都变成一次“请求-回复”：
//! 1. 后端分配请求 ID，登记 `oneshot` 发送端，发出 `scanner://request` 事件
//! 2. 前端执行 html5-qrcode 对应操作，调用 `scanner_reply` 命令回传结果
//! 3. `CameraBridge::resolve` 唤醒等待中的请求
//!
//! 前端错误按 DOMException 名称映射为 `CameraError` 的不同分支。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tauri::{AppHandle, Emitter, Wry};
use tokio::sync::oneshot;

use crate::scanner::{CameraDevice, CameraEngine, CameraError, CaptureConfig};

pub const SCANNER_REQUEST_EVENT: &str = "scanner://request";

/// 前端对引擎请求的回复
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeReply {
    pub ok: bool,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
    /// DOMException 名称，如 `NotAllowedError`
    #[serde(default)]
    pub error_name: Option<String>,
}

impl BridgeReply {
    fn into_result(self) -> Result<serde_json::Value, CameraError> {
        if self.ok {
            return Ok(self.value);
        }

        let message = self.error.unwrap_or_default();
        Err(match self.error_name.as_deref() {
            Some("NotAllowedError") | Some("SecurityError") => CameraError::PermissionDenied(message),
            Some("NotReadableError") | Some("NotFoundError") | Some("OverconstrainedError") => {
                CameraError::DeviceUnavailable(message)
            }
            _ => CameraError::Engine(message),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CameraRequestEvent {
    request_id: u64,
    kind: &'static str,
    payload: serde_json::Value,
}

/// 挂起中的引擎请求表
#[derive(Default)]
pub struct CameraBridge {
    next_request_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<BridgeReply>>>,
}

impl CameraBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self) -> Result<(u64, oneshot::Receiver<BridgeReply>), CameraError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| CameraError::Engine("摄像头请求表锁已中毒".to_string()))?
            .insert(request_id, sender);
        Ok((request_id, receiver))
    }

    fn cancel(&self, request_id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&request_id);
        }
    }

    /// 前端回复到达；请求不存在（已取消或重复回复）时返回 `false`
    pub fn resolve(&self, request_id: u64, reply: BridgeReply) -> bool {
        let sender = match self.pending.lock() {
            Ok(mut pending) => pending.remove(&request_id),
            Err(_) => {
                log::warn!("摄像头请求表锁已中毒，丢弃回复 #{}", request_id);
                None
            }
        };

        match sender {
            Some(sender) => sender.send(reply).is_ok(),
            None => {
                log::debug!("收到未知摄像头请求的回复 #{}", request_id);
                false
            }
        }
    }
}

/// 运行在 webview 中的摄像头引擎
pub struct WebviewCameraEngine {
    app: AppHandle<Wry>,
    bridge: Arc<CameraBridge>,
}

impl WebviewCameraEngine {
    pub fn new(app: AppHandle<Wry>, bridge: Arc<CameraBridge>) -> Self {
        Self { app, bridge }
    }

    async fn request(
        &self,
        kind: &'static str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, CameraError> {
        let (request_id, receiver) = self.bridge.register()?;
        let event = CameraRequestEvent {
            request_id,
            kind,
            payload,
        };

        if let Err(err) = self.app.emit(SCANNER_REQUEST_EVENT, event) {
            self.bridge.cancel(request_id);
            return Err(CameraError::Engine(format!("发送摄像头请求失败: {}", err)));
        }

        let reply = receiver
            .await
            .map_err(|_| CameraError::Engine("摄像头请求已取消".to_string()))?;
        reply.into_result()
    }
}

impl CameraEngine for WebviewCameraEngine {
    async fn list_cameras(&self) -> Result<Vec<CameraDevice>, CameraError> {
        let value = self.request("list-cameras", serde_json::Value::Null).await?;
        serde_json::from_value(value)
            .map_err(|e| CameraError::Engine(format!("摄像头列表格式错误: {}", e)))
    }

    async fn start(&self, device_id: &str, config: &CaptureConfig) -> Result<(), CameraError> {
        let payload = serde_json::json!({ "deviceId": device_id, "config": config });
        self.request("start", payload).await.map(|_| ())
    }

    async fn stop(&self) -> Result<(), CameraError> {
        self.request("stop", serde_json::Value::Null).await.map(|_| ())
    }
}
