//! 宿主能力的事件实现
//!
//! 核心层只认识 `Notifier` / `Workspace` / `HostNavigator` / `ScannerModal` 四个 trait，
//! 这里全部落到 webview 事件上，界面侧负责真正的渲染。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tauri::{AppHandle, Emitter, Wry};

use crate::deep_link::DeepLink;
use crate::error::AppError;
use crate::navigation::{HostNavigator, NoteHandle, Notifier, Workspace};
use crate::scanner::ScannerModal;

pub const NOTICE_EVENT: &str = "notice";
pub const OPEN_FILE_EVENT: &str = "workspace://open-file";
pub const HOST_DEEP_LINK_EVENT: &str = "host://open-deep-link";
pub const SCANNER_OPEN_EVENT: &str = "scanner://open";
pub const SCANNER_STATUS_EVENT: &str = "scanner://status";
pub const SCANNER_CLOSE_EVENT: &str = "scanner://close";

#[derive(Debug, Clone, Serialize)]
struct NoticePayload<'a> {
    message: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct OpenFilePayload<'a> {
    path: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModalPayload<'a> {
    modal_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

/// 提示消息：发出 `notice` 事件
pub struct EventNotifier {
    app: AppHandle<Wry>,
}

impl EventNotifier {
    pub fn new(app: AppHandle<Wry>) -> Self {
        Self { app }
    }
}

impl Notifier for EventNotifier {
    fn notice(&self, message: &str) {
        log::info!("提示: {}", message);
        if let Err(err) = self.app.emit(NOTICE_EVENT, NoticePayload { message }) {
            log::warn!("发送提示事件失败: {}", err);
        }
    }
}

/// 工作区：打开笔记即通知界面切换到该文件，并记为活动笔记
pub struct EventWorkspace {
    app: AppHandle<Wry>,
    active: Mutex<Option<NoteHandle>>,
}

impl EventWorkspace {
    pub fn new(app: AppHandle<Wry>) -> Self {
        Self {
            app,
            active: Mutex::new(None),
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<NoteHandle>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// 界面切换了活动文件（或全部关闭）
    pub fn set_active(&self, note: Option<NoteHandle>) {
        *self.lock_active() = note;
    }
}

impl Workspace for EventWorkspace {
    fn open_note(&self, note: &NoteHandle) -> Result<(), AppError> {
        self.app
            .emit(OPEN_FILE_EVENT, OpenFilePayload { path: &note.path })
            .map_err(|e| AppError::Workspace(format!("打开 {} 失败: {}", note.path, e)))?;
        self.set_active(Some(note.clone()));
        Ok(())
    }

    fn active_note(&self) -> Option<NoteHandle> {
        self.lock_active().clone()
    }
}

/// 宿主深度链接处理器
///
/// 界面侧注册处理器后才可用；未注册时导航走本地回退路径。
pub struct WebviewHostNavigator {
    app: AppHandle<Wry>,
    available: AtomicBool,
}

impl WebviewHostNavigator {
    pub fn new(app: AppHandle<Wry>) -> Self {
        Self {
            app,
            available: AtomicBool::new(false),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        log::info!("宿主深度链接处理器: {}", if available { "已注册" } else { "已注销" });
    }
}

impl HostNavigator for WebviewHostNavigator {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn open_deep_link(&self, link: &DeepLink) {
        if let Err(err) = self.app.emit(HOST_DEEP_LINK_EVENT, link) {
            log::warn!("发送深度链接事件失败: {}", err);
        }
    }
}

/// 扫码弹窗：状态文本与关闭请求都带上弹窗 ID，界面据此忽略过期事件
pub struct WebviewModal {
    app: AppHandle<Wry>,
    modal_id: u64,
}

impl WebviewModal {
    pub fn new(app: AppHandle<Wry>, modal_id: u64) -> Self {
        Self { app, modal_id }
    }

    fn emit(&self, event: &str, text: Option<&str>) {
        let payload = ModalPayload {
            modal_id: self.modal_id,
            text,
        };
        if let Err(err) = self.app.emit(event, payload) {
            log::warn!("弹窗 #{} 发送 {} 失败: {}", self.modal_id, event, err);
        }
    }

    pub fn show(&self) {
        self.emit(SCANNER_OPEN_EVENT, None);
    }
}

impl ScannerModal for WebviewModal {
    fn set_status(&self, text: &str) {
        self.emit(SCANNER_STATUS_EVENT, Some(text));
    }

    fn close(&self) {
        self.emit(SCANNER_CLOSE_EVENT, None);
    }
}
