//! # Tauri 命令层
//!
//! ## 设计思路
//!
//! 命令层仅做 IPC 参数接收与结果返回，不承载业务逻辑。
//! 可能触发“停止摄像头”的命令必须是 `async`：停止操作在后台任务中执行，
//! 需要处于异步运行时之内。

use std::sync::Arc;

use tauri::{AppHandle, State, Wry};

use super::{BridgeReply, CameraBridge, EventWorkspace, ScannerRegistry, WebviewCameraEngine, WebviewHostNavigator, WebviewModal};
use crate::error::AppError;
use crate::extension::{self, CommandSpec, QrExtension};
use crate::navigation::{NavigationOutcome, NoteHandle};
use crate::render::BlockOutput;
use crate::settings::{FacingMode, PluginSettings};

/// 扫码命令 / 功能区入口：打开新弹窗并在后台初始化摄像头
///
/// 返回弹窗 ID，之后的识别回调与关闭都以它为准。
#[tauri::command]
pub async fn scan_qr_code(
    app: AppHandle<Wry>,
    extension: State<'_, QrExtension>,
    registry: State<'_, ScannerRegistry>,
    bridge: State<'_, Arc<CameraBridge>>,
) -> Result<u64, AppError> {
    let modal_id = registry.next_modal_id();
    let modal = Arc::new(WebviewModal::new(app.clone(), modal_id));
    modal.show();

    let engine = WebviewCameraEngine::new(app, Arc::clone(bridge.inner()));
    let session = extension.open_scanner(engine, modal);

    // 摄像头同一时刻只能被一个会话持有
    if let Some(previous) = registry.replace(modal_id, Arc::clone(&session)) {
        log::info!("新弹窗 #{} 取代旧会话 #{}", modal_id, previous.id());
        previous.close();
    }

    tauri::async_runtime::spawn(async move {
        session.open().await;
    });
    Ok(modal_id)
}

/// 前端引擎回复一次请求
#[tauri::command]
pub fn scanner_reply(bridge: State<'_, Arc<CameraBridge>>, request_id: u64, reply: BridgeReply) -> bool {
    bridge.resolve(request_id, reply)
}

/// 引擎识别成功
#[tauri::command]
pub async fn scanner_decoded(
    registry: State<'_, ScannerRegistry>,
    modal_id: u64,
    decoded: String,
) -> Result<Option<NavigationOutcome>, AppError> {
    let Some(session) = registry.get(modal_id) else {
        log::debug!("弹窗 #{} 没有活动会话，忽略识别结果", modal_id);
        return Ok(None);
    };

    let outcome = session.on_scan_success(&decoded);
    if outcome.is_some() {
        registry.remove(modal_id);
    }
    Ok(outcome)
}

/// 引擎本帧未识别到二维码
#[tauri::command]
pub fn scanner_decode_failed(registry: State<'_, ScannerRegistry>, modal_id: u64, reason: String) {
    if let Some(session) = registry.get(modal_id) {
        session.on_scan_failure(&reason);
    }
}

/// 用户关闭弹窗
#[tauri::command]
pub async fn scanner_close(registry: State<'_, ScannerRegistry>, modal_id: u64) -> Result<(), AppError> {
    if let Some(session) = registry.remove(modal_id) {
        session.close();
    }
    Ok(())
}

#[tauri::command]
pub fn open_note_by_path(extension: State<'_, QrExtension>, payload: String) -> NavigationOutcome {
    extension.open_note_by_path(&payload)
}

/// 代码块渲染；未知语言返回 `None`
#[tauri::command]
pub fn render_code_block(
    extension: State<'_, QrExtension>,
    language: String,
    source: String,
) -> Option<BlockOutput> {
    extension.process_code_block(&language, &source)
}

#[tauri::command]
pub fn get_plugin_settings(extension: State<'_, QrExtension>) -> PluginSettings {
    extension.settings().snapshot()
}

#[tauri::command]
pub fn set_default_camera(extension: State<'_, QrExtension>, mode: String) -> Result<PluginSettings, AppError> {
    let mode = FacingMode::parse(&mode)
        .ok_or_else(|| AppError::Settings(format!("未知的摄像头朝向: {}", mode)))?;
    extension.settings().set_default_camera(mode)
}

#[tauri::command]
pub fn set_scan_delay(extension: State<'_, QrExtension>, delay_ms: u32) -> Result<PluginSettings, AppError> {
    extension.settings().set_scan_delay(delay_ms)
}

/// 界面侧注册 / 注销宿主深度链接处理器
#[tauri::command]
pub fn register_deep_link_handler(host: State<'_, Arc<WebviewHostNavigator>>, available: bool) {
    host.set_available(available);
}

/// 界面侧活动文件变化
#[tauri::command]
pub fn set_active_note(workspace: State<'_, Arc<EventWorkspace>>, path: Option<String>) {
    workspace.set_active(path.filter(|p| !p.is_empty()).map(NoteHandle::new));
}

#[tauri::command]
pub fn list_extension_commands() -> Vec<CommandSpec> {
    extension::command_specs()
}
