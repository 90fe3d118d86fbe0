//! # 桌面外壳（desktop）
//!
//! ## 设计思路
//!
//! 在 Tauri 中，摄像头引擎（html5-qrcode）、弹窗、提示消息都运行在 webview 里。
//! 本模块把它们包装成核心层需要的 trait 实现，再以 Tauri command 暴露入口。
//!
//! - `bridge`：`WebviewCameraEngine`，通过事件发请求、通过命令收回复
//! - `host`：提示 / 工作区 / 弹窗 / 宿主深度链接处理器的事件实现
//! - `commands`：IPC 薄封装，不承载业务逻辑
//!
//! ## 调用链
//!
//! ```text
//! 前端 invoke("scan_qr_code")
//!    ↓
//! commands.rs（创建弹窗 + 新会话，后台 open）
//!    ↓
//! ScannerSession ──scanner://request──▶ 前端引擎
//!    ▲                                     │
//!    └──────── scanner_reply / scanner_decoded ◀┘
//! ```

pub mod bridge;
pub mod commands;
pub mod host;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tauri::{App, AppHandle, Manager, Wry};

use crate::error::AppError;
use crate::extension::QrExtension;
use crate::navigation::{FsVault, Navigator};
use crate::scanner::ScannerSession;
use crate::settings::{SettingsState, SettingsStore};

pub use bridge::{BridgeReply, CameraBridge, WebviewCameraEngine};
pub use host::{EventNotifier, EventWorkspace, WebviewHostNavigator, WebviewModal};

/// 桌面外壳中的扫描会话类型
pub type DesktopScanner = ScannerSession<WebviewCameraEngine>;

struct ActiveScanner {
    modal_id: u64,
    session: Arc<DesktopScanner>,
}

/// 当前活动的扫描会话（同一时刻至多一个，摄像头由它独占）
#[derive(Default)]
pub struct ScannerRegistry {
    next_modal_id: AtomicU64,
    current: Mutex<Option<ActiveScanner>>,
}

impl ScannerRegistry {
    fn lock(&self) -> MutexGuard<'_, Option<ActiveScanner>> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("扫描会话注册表锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    pub fn next_modal_id(&self) -> u64 {
        self.next_modal_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 登记新会话，返回被替换的旧会话（调用方负责关闭）
    pub fn replace(&self, modal_id: u64, session: Arc<DesktopScanner>) -> Option<Arc<DesktopScanner>> {
        self.lock()
            .replace(ActiveScanner { modal_id, session })
            .map(|previous| previous.session)
    }

    pub fn get(&self, modal_id: u64) -> Option<Arc<DesktopScanner>> {
        self.lock()
            .as_ref()
            .filter(|active| active.modal_id == modal_id)
            .map(|active| Arc::clone(&active.session))
    }

    pub fn remove(&self, modal_id: u64) -> Option<Arc<DesktopScanner>> {
        let mut current = self.lock();
        if current.as_ref().is_some_and(|active| active.modal_id == modal_id) {
            current.take().map(|active| active.session)
        } else {
            None
        }
    }
}

/// 初始化并注册全部托管状态
///
/// 在 `main.rs` 的 `setup` 阶段调用。
pub fn install(app: &App<Wry>) -> Result<(), AppError> {
    let handle = app.handle().clone();
    let app_data_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| AppError::Storage(format!("获取应用数据目录失败: {}", e)))?;

    let extension = build_extension(&handle, &app_data_dir)?;
    app.manage(extension.extension);
    app.manage(extension.workspace);
    app.manage(extension.host);
    app.manage(Arc::new(CameraBridge::new()));
    app.manage(ScannerRegistry::default());
    log::info!("desktop: 托管状态已注册");
    Ok(())
}

struct DesktopExtension {
    extension: QrExtension,
    workspace: Arc<EventWorkspace>,
    host: Arc<WebviewHostNavigator>,
}

fn build_extension(handle: &AppHandle<Wry>, app_data_dir: &Path) -> Result<DesktopExtension, AppError> {
    let settings = SettingsState::load(SettingsStore::new(app_data_dir.join("settings.json")));

    let vault = FsVault::open(app_data_dir.join("vault"))?;
    log::info!("笔记库路径: {}", vault.root().display());

    let workspace = Arc::new(EventWorkspace::new(handle.clone()));
    let host = Arc::new(WebviewHostNavigator::new(handle.clone()));
    let navigator = Navigator::new(
        Arc::new(vault),
        workspace.clone(),
        Arc::new(EventNotifier::new(handle.clone())),
        Some(host.clone()),
    );

    Ok(DesktopExtension {
        extension: QrExtension::new(Arc::new(navigator), settings),
        workspace,
        host,
    })
}
