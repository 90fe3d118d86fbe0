//! # 导航服务模块（navigation）
//!
//! ## 设计思路
//!
//! 扫描得到的载荷要么是深度链接，要么是裸路径。本模块把它解析为具体笔记路径，
//! 然后执行“存在即打开，不存在即创建后打开”。
//!
//! 宿主能力通过 trait 注入，而不是依赖全局对象：
//! - `Vault`：按路径查找 / 创建笔记
//! - `Workspace`：在当前视图中打开笔记
//! - `Notifier`：非阻塞的提示消息
//! - `HostNavigator`：可选的宿主深度链接处理器，调用时再探测是否可用
//!
//! ## 调用链
//!
//! ```text
//! open_or_create(payload)
//!    ↓
//! resolve_payload（深度链接 / 旧前缀 / 裸路径）
//!    ├─ 宿主处理器可用 → 委托并返回
//!    ↓
//! normalize_note_path（补全 .md）
//!    ↓
//! Vault::get_note ── 命中 → Workspace::open_note
//!    └─ 未命中 → Vault::create_note → Workspace::open_note
//!    ↓
//! Notifier::notice（所有结果都以提示呈现，不向宿主抛错）
//! ```

mod service;
mod vault;

pub use service::{
    normalize_note_path, resolve_payload, HostNavigator, NavigationOutcome, Navigator,
    Notifier, ResolvedPayload, Workspace,
};
pub use vault::{FsVault, NoteHandle, Vault, VaultError, NOTE_EXTENSION};

#[cfg(test)]
pub(crate) use service::fakes;
