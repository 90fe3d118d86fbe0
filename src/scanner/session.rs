//! # 扫描会话（状态机）
//!
//! ## 状态流转
//!
//! ```text
//! Idle ──open──▶ Initializing ──无摄像头/启动失败──▶ Failed
//!                     │
//!                  start 成功
//!                     ▼
//!                 Scanning ──首次识别成功──▶ Detected
//!                     │                          │
//!                  用户关闭                    导航后关闭
//!                     ▼                          ▼
//!                   Closed ◀─────────────────────┘
//! ```
//!
//! ## 并发约束
//!
//! 引擎回调与用户关闭可能在任意 `await` 点之间交错。唯一的正确性手段是
//! `scanning` 标志：成功回调在任何异步工作开始前用 `swap(false)` 同步地
//! 抢占它，因此重复回调、以及成功与关闭之间的竞争，最多只有一方会触发
//! 停止摄像头，且导航最多执行一次。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use super::engine::{CameraEngine, CameraError, CaptureConfig};
use crate::navigation::{NavigationOutcome, Navigator};
use crate::settings::PluginSettings;

pub const INITIALIZING_STATUS: &str = "Initializing camera...";
pub const SCANNING_STATUS: &str = "Scanning for QR codes...";
pub const NO_CAMERAS_STATUS: &str = "No cameras found. Please ensure camera access is allowed.";
const INIT_FAILED_FALLBACK: &str = "Failed to initialize camera";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// 扫描会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerState {
    Idle,
    Initializing,
    Scanning,
    Detected,
    Failed,
    Closed,
}

/// 扫描弹窗
///
/// 状态文本显示在弹窗内；`close` 请求界面关闭弹窗。
pub trait ScannerModal: Send + Sync {
    fn set_status(&self, text: &str);

    fn close(&self);
}

/// 一次扫描尝试，与一个弹窗实例一一对应，不跨弹窗复用
pub struct ScannerSession<E: CameraEngine> {
    id: u64,
    /// 引擎句柄；关闭时丢弃
    engine: Mutex<Option<Arc<E>>>,
    /// 是否处于连续识别中（成功与关闭竞争的唯一仲裁点）
    scanning: AtomicBool,
    state: Mutex<ScannerState>,
    capture: CaptureConfig,
    modal: Arc<dyn ScannerModal>,
    navigator: Arc<Navigator>,
}

impl<E: CameraEngine> ScannerSession<E> {
    pub fn new(
        engine: E,
        settings: &PluginSettings,
        modal: Arc<dyn ScannerModal>,
        navigator: Arc<Navigator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            engine: Mutex::new(Some(Arc::new(engine))),
            scanning: AtomicBool::new(false),
            state: Mutex::new(ScannerState::Idle),
            capture: CaptureConfig::with_facing_mode(settings.default_camera),
            modal,
            navigator,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ScannerState {
        *self.lock_state()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    pub fn capture_config(&self) -> &CaptureConfig {
        &self.capture
    }

    fn lock_state(&self) -> MutexGuard<'_, ScannerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn engine_handle(&self) -> Option<Arc<E>> {
        match self.engine.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn take_engine(&self) -> Option<Arc<E>> {
        match self.engine.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// 弹窗打开：枚举摄像头并开始连续识别
    ///
    /// 只会从 `Idle` 进入一次；失败时状态文本留在弹窗中，由用户手动关闭。
    pub async fn open(&self) {
        {
            let mut state = self.lock_state();
            if *state != ScannerState::Idle {
                log::warn!("扫描会话 #{} 已打开过（{:?}），忽略重复打开", self.id, *state);
                return;
            }
            *state = ScannerState::Initializing;
        }
        self.modal.set_status(INITIALIZING_STATUS);

        let Some(engine) = self.engine_handle() else {
            return;
        };

        let devices = match engine.list_cameras().await {
            Ok(devices) => devices,
            Err(err) => {
                self.fail(&err);
                return;
            }
        };

        let Some(device) = devices.into_iter().next() else {
            let mut state = self.lock_state();
            if *state == ScannerState::Initializing {
                *state = ScannerState::Failed;
                self.modal.set_status(NO_CAMERAS_STATUS);
            }
            log::warn!("扫描会话 #{}: 未发现可用摄像头", self.id);
            return;
        };

        if self.state() != ScannerState::Initializing {
            log::info!("扫描会话 #{}: 枚举期间弹窗已关闭，不再启动摄像头", self.id);
            return;
        }

        log::info!(
            "扫描会话 #{}: 使用摄像头 {} ({})",
            self.id,
            device.id,
            device.label
        );

        if let Err(err) = engine.start(&device.id, &self.capture).await {
            self.fail(&err);
            return;
        }

        let mut state = self.lock_state();
        if *state == ScannerState::Initializing {
            self.scanning.store(true, Ordering::SeqCst);
            *state = ScannerState::Scanning;
            self.modal.set_status(SCANNING_STATUS);
            log::info!("扫描会话 #{}: 开始识别", self.id);
        } else {
            drop(state);
            // 启动期间弹窗已关闭：摄像头此刻才真正打开，需要释放
            log::info!("扫描会话 #{}: 启动完成时弹窗已关闭，释放摄像头", self.id);
            spawn_stop(engine, self.id);
        }
    }

    fn fail(&self, err: &CameraError) {
        log::error!("扫描会话 #{} 初始化失败: {}", self.id, err);
        let mut state = self.lock_state();
        if *state != ScannerState::Initializing {
            return;
        }
        *state = ScannerState::Failed;

        let message = err.to_string();
        let message = if message.is_empty() {
            INIT_FAILED_FALLBACK
        } else {
            message.as_str()
        };
        self.modal.set_status(&format!("Error: {message}"));
    }

    /// 引擎识别成功回调
    ///
    /// 只有第一次成功会被处理：停止摄像头（不等待结果）、导航、关闭弹窗。
    /// 之后的回调返回 `None`。
    pub fn on_scan_success(&self, decoded: &str) -> Option<NavigationOutcome> {
        let Some(engine) = self.engine_handle() else {
            log::debug!("扫描会话 #{} 已关闭，忽略识别结果", self.id);
            return None;
        };

        if !self.scanning.swap(false, Ordering::SeqCst) {
            log::debug!("扫描会话 #{} 不在识别中，忽略识别结果", self.id);
            return None;
        }

        *self.lock_state() = ScannerState::Detected;
        log::info!("扫描会话 #{} 识别到二维码: {}", self.id, decoded);

        spawn_stop(engine, self.id);

        self.modal.set_status(&format!("QR Code detected: {decoded}"));
        let outcome = self.navigator.open_or_create(decoded);
        self.modal.close();
        self.close();

        Some(outcome)
    }

    /// 引擎识别失败回调（画面中没有二维码），正常运行时持续出现
    pub fn on_scan_failure(&self, reason: &str) {
        log::debug!("扫描会话 #{}: 本帧未识别: {}", self.id, reason);
    }

    /// 弹窗关闭
    ///
    /// 仍在识别时停止摄像头；否则直接丢弃引擎句柄，避免重复停止。可重复调用。
    pub fn close(&self) {
        let engine = self.take_engine();
        {
            let mut state = self.lock_state();
            if *state == ScannerState::Closed {
                return;
            }
            *state = ScannerState::Closed;
        }

        if let Some(engine) = engine {
            if self.scanning.swap(false, Ordering::SeqCst) {
                spawn_stop(engine, self.id);
            }
        }
        log::info!("扫描会话 #{} 已关闭", self.id);
    }
}

/// 尽力停止摄像头：后台执行，失败只记录日志，不阻塞调用方
fn spawn_stop<E: CameraEngine>(engine: Arc<E>, session_id: u64) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                match engine.stop().await {
                    Ok(()) => log::debug!("扫描会话 #{}: 摄像头已停止", session_id),
                    Err(err) => log::error!("扫描会话 #{}: 停止摄像头失败: {}", session_id, err),
                }
            });
        }
        Err(_) => {
            log::warn!("扫描会话 #{}: 没有异步运行时，跳过停止摄像头", session_id);
        }
    }
}
