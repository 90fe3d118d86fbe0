//! 插件设置模块
//!
//! # 设计思路
//!
//! 设置以 JSON 对象持久化（键名保持 camelCase，与旧数据兼容）。
//! 读取时把已存储的值逐字段合并到默认值之上，而不是整体反序列化：
//! 旧版本缺字段、字段类型错误都不应让插件加载失败。
//!
//! # 实现思路
//!
//! - `PluginSettings::default()` 提供默认值（后置摄像头、500ms）。
//! - `merge_settings` 按字段读取 `serde_json::Value`，类型不符的字段保留默认值。
//! - `SettingsStore` 负责文件读写；文件缺失或损坏时回退默认值。
//! - `SettingsState` 持有内存中的设置，每次修改后立即保存（写入只来自设置界面）。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 扫描间隔下限（毫秒）
pub const SCAN_DELAY_MIN_MS: u32 = 100;
/// 扫描间隔上限（毫秒）
pub const SCAN_DELAY_MAX_MS: u32 = 2_000;
/// 设置界面滑块步长（毫秒）
pub const SCAN_DELAY_STEP_MS: u32 = 100;

const DEFAULT_SCAN_DELAY_MS: u32 = 500;

/// 摄像头朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// 后置摄像头
    #[default]
    Environment,
    /// 前置摄像头
    User,
}

impl FacingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "environment" => Some(Self::Environment),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    /// 设置界面展示名
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Environment => "Back Camera",
            Self::User => "Front Camera",
        }
    }
}

/// 插件设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSettings {
    pub default_camera: FacingMode,
    pub scan_delay: u32,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            default_camera: FacingMode::Environment,
            scan_delay: DEFAULT_SCAN_DELAY_MS,
        }
    }
}

fn clamp_scan_delay(value_ms: u64) -> u32 {
    value_ms.clamp(SCAN_DELAY_MIN_MS as u64, SCAN_DELAY_MAX_MS as u64) as u32
}

/// 滑块语义：先限幅，再对齐到步长
pub fn normalize_scan_delay(value_ms: u32) -> u32 {
    let clamped = clamp_scan_delay(value_ms as u64);
    let snapped = (clamped + SCAN_DELAY_STEP_MS / 2) / SCAN_DELAY_STEP_MS * SCAN_DELAY_STEP_MS;
    snapped.clamp(SCAN_DELAY_MIN_MS, SCAN_DELAY_MAX_MS)
}

/// 将已存储的设置逐字段合并到默认值之上
pub fn merge_settings(defaults: PluginSettings, stored: &serde_json::Value) -> PluginSettings {
    let mut merged = defaults;

    if let Some(value) = stored.get("defaultCamera") {
        match value.as_str().and_then(FacingMode::parse) {
            Some(mode) => merged.default_camera = mode,
            None => log::warn!("忽略无效的 defaultCamera 设置: {}", value),
        }
    }

    if let Some(value) = stored.get("scanDelay") {
        match value.as_u64() {
            Some(delay) => merged.scan_delay = clamp_scan_delay(delay),
            None => log::warn!("忽略无效的 scanDelay 设置: {}", value),
        }
    }

    merged
}

/// 设置文件读写
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取设置；文件缺失或损坏时返回默认值
    pub fn load(&self) -> PluginSettings {
        let defaults = PluginSettings::default();
        if !self.path.exists() {
            return defaults;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                log::warn!("读取设置文件失败，使用默认设置: {}", err);
                return defaults;
            }
        };

        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(stored) => merge_settings(defaults, &stored),
            Err(err) => {
                log::warn!("解析设置文件失败，使用默认设置: {}", err);
                defaults
            }
        }
    }

    pub fn save(&self, settings: &PluginSettings) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Settings(format!("创建设置目录失败: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// 运行期设置状态（读多写少，写入后立即落盘）
pub struct SettingsState {
    store: SettingsStore,
    current: Mutex<PluginSettings>,
}

impl SettingsState {
    pub fn load(store: SettingsStore) -> Self {
        let current = store.load();
        log::info!("设置已加载: {:?}", current);
        Self {
            store,
            current: Mutex::new(current),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PluginSettings> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("设置状态锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    pub fn snapshot(&self) -> PluginSettings {
        self.lock().clone()
    }

    pub fn set_default_camera(&self, mode: FacingMode) -> Result<PluginSettings, AppError> {
        let mut current = self.lock();
        current.default_camera = mode;
        self.store.save(&current)?;
        Ok(current.clone())
    }

    pub fn set_scan_delay(&self, delay_ms: u32) -> Result<PluginSettings, AppError> {
        let mut current = self.lock();
        current.scan_delay = normalize_scan_delay(delay_ms);
        self.store.save(&current)?;
        Ok(current.clone())
    }
}
