//! 扩展入口模块
//!
//! # 设计思路
//!
//! 对应插件加载时注册的全部能力：功能区图标、命令面板命令、两个代码块处理器、
//! 设置页。这里只做装配与分发，具体逻辑都在各子模块中。
//!
//! # 实现思路
//!
//! - `QrExtension` 持有导航服务与设置状态，由宿主外壳注入。
//! - 每次打开扫码弹窗都创建全新的 `ScannerSession`，从不复用旧会话。
//! - 代码块按语言标记分发，未知语言返回 `None` 交给宿主默认渲染。

use std::sync::Arc;

use serde::Serialize;

use crate::navigation::{NavigationOutcome, Navigator};
use crate::render::{self, BlockOutput, QRCODE_BLOCK, QRCODE_LOCAL_BLOCK};
use crate::scanner::{CameraEngine, ScannerModal, ScannerSession};
use crate::settings::SettingsState;

/// 扫码命令 ID
pub const SCAN_COMMAND_ID: &str = "scan-qr-code";
/// 扫码命令 / 功能区提示文字
pub const SCAN_COMMAND_NAME: &str = "Scan QR Code";
/// 功能区图标名
pub const SCAN_RIBBON_ICON: &str = "scan";

/// 向宿主注册的命令描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: Option<&'static str>,
    /// 是否同时放到功能区
    pub ribbon: bool,
}

/// 扩展注册的全部命令
pub fn command_specs() -> Vec<CommandSpec> {
    vec![CommandSpec {
        id: SCAN_COMMAND_ID,
        name: SCAN_COMMAND_NAME,
        icon: Some(SCAN_RIBBON_ICON),
        ribbon: true,
    }]
}

/// 扩展注册的代码块语言
pub fn code_block_languages() -> [&'static str; 2] {
    [QRCODE_BLOCK, QRCODE_LOCAL_BLOCK]
}

/// 扩展运行期状态
pub struct QrExtension {
    navigator: Arc<Navigator>,
    settings: SettingsState,
}

impl QrExtension {
    pub fn new(navigator: Arc<Navigator>, settings: SettingsState) -> Self {
        Self {
            navigator,
            settings,
        }
    }

    pub fn navigator(&self) -> &Arc<Navigator> {
        &self.navigator
    }

    pub fn settings(&self) -> &SettingsState {
        &self.settings
    }

    /// 扫码命令 / 功能区图标：为新弹窗创建全新会话
    ///
    /// 返回的会话尚未打开，调用方在弹窗显示后执行 `open().await`。
    pub fn open_scanner<E: CameraEngine>(
        &self,
        engine: E,
        modal: Arc<dyn ScannerModal>,
    ) -> Arc<ScannerSession<E>> {
        let settings = self.settings.snapshot();
        let session = ScannerSession::new(engine, &settings, modal, Arc::clone(&self.navigator));
        log::info!(
            "创建扫描会话 #{}（摄像头朝向: {}）",
            session.id(),
            settings.default_camera.as_str()
        );
        session
    }

    /// 直接按载荷打开或创建笔记（不经过摄像头）
    pub fn open_note_by_path(&self, payload: &str) -> NavigationOutcome {
        self.navigator.open_or_create(payload)
    }

    /// 代码块处理器分发
    pub fn process_code_block(&self, language: &str, source: &str) -> Option<BlockOutput> {
        match language {
            QRCODE_BLOCK => Some(render::render_qrcode_block(source)),
            QRCODE_LOCAL_BLOCK => {
                let active = self.navigator.workspace().active_note();
                let vault_name = self.navigator.vault().name();
                Some(render::render_local_block(active.as_ref(), &vault_name))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::fakes::*;
    use crate::navigation::Workspace;
    use crate::settings::{FacingMode, SettingsStore};
    use crate::scanner::{CameraDevice, CameraError, CaptureConfig};
    use std::time::{SystemTime, UNIX_EPOCH};

    struct NullEngine;

    impl CameraEngine for NullEngine {
        async fn list_cameras(&self) -> Result<Vec<CameraDevice>, CameraError> {
            Ok(Vec::new())
        }

        async fn start(&self, _device_id: &str, _config: &CaptureConfig) -> Result<(), CameraError> {
            Ok(())
        }

        async fn stop(&self) -> Result<(), CameraError> {
            Ok(())
        }
    }

    struct SilentModal;

    impl ScannerModal for SilentModal {
        fn set_status(&self, _text: &str) {}
        fn close(&self) {}
    }

    fn extension() -> (QrExtension, Arc<RecordingWorkspace>, std::path::PathBuf) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("vault-qrcode-extension-test-{nanos}"));
        let workspace = Arc::new(RecordingWorkspace::default());
        let navigator = Arc::new(Navigator::new(
            Arc::new(MemoryVault::default()),
            workspace.clone(),
            Arc::new(RecordingNotifier::default()),
            None,
        ));
        let settings = SettingsState::load(SettingsStore::new(dir.join("settings.json")));
        (QrExtension::new(navigator, settings), workspace, dir)
    }

    #[test]
    fn registers_scan_command_and_ribbon() {
        let specs = command_specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].id, "scan-qr-code");
        assert_eq!(specs[0].name, "Scan QR Code");
        assert_eq!(specs[0].icon, Some("scan"));
        assert!(specs[0].ribbon);
        assert_eq!(code_block_languages(), ["qrcode", "qrcodelocal"]);
    }

    #[test]
    fn each_open_creates_a_fresh_session() {
        let (ext, _, dir) = extension();
        ext.settings().set_default_camera(FacingMode::User).expect("set camera");

        let first = ext.open_scanner(NullEngine, Arc::new(SilentModal));
        let second = ext.open_scanner(NullEngine, Arc::new(SilentModal));
        assert_ne!(first.id(), second.id());
        assert_eq!(second.capture_config().facing_mode, FacingMode::User);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn dispatches_code_blocks_by_language() {
        let (ext, workspace, _) = extension();

        assert!(matches!(
            ext.process_code_block("qrcode", "hello"),
            Some(BlockOutput::Qr { .. })
        ));
        assert_eq!(
            ext.process_code_block("qrcodelocal", ""),
            Some(BlockOutput::error("Error: No active file found."))
        );
        assert_eq!(ext.process_code_block("mermaid", "graph TD"), None);

        workspace
            .open_note(&crate::navigation::NoteHandle::new("daily/today.md"))
            .expect("open note");
        match ext.process_code_block("qrcodelocal", "") {
            Some(BlockOutput::Qr { caption, .. }) => assert_eq!(
                caption,
                "obsidian://open?vault=Test%20Vault&file=daily%2Ftoday.md"
            ),
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn open_note_by_path_uses_navigator() {
        let (ext, workspace, _) = extension();
        let outcome = ext.open_note_by_path("inbox");
        assert_eq!(outcome, NavigationOutcome::Created { path: "inbox.md".into() });
        assert_eq!(*workspace.opened.lock().unwrap(), vec!["inbox.md"]);
    }
}
