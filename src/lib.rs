//! # 笔记库二维码工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 前端 (webview + html5-qrcode)             │
//! │                                                          │
//! │  扫码弹窗 ── 代码块渲染 ── 设置页 ── 提示消息             │
//! │       ↕ scanner://request / scanner_reply 等              │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Tauri IPC (Result<T, AppError>)   [feature = "desktop"]
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ deep_link ── obsidian:// 深度链接解析 / 生成         │
//! │  ├─ navigation ─ 载荷解析 + 打开或创建笔记               │
//! │  │   └─ vault        本地目录笔记库                       │
//! │  ├─ scanner ──── 摄像头引擎抽象 + 扫描会话状态机          │
//! │  ├─ render ───── qrcode / qrcodelocal 代码块             │
//! │  ├─ settings ─── 插件设置（逐字段合并 + JSON 持久化）     │
//! │  ├─ extension ── 命令 / 功能区 / 代码块注册与分发         │
//! │  └─ desktop ──── Tauri 外壳：webview 桥接与命令           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，所有对外操作的返回类型 |
//! | [`deep_link`] | 解析 `obsidian://<动作>?file=..&vault=..`，生成本地笔记链接 |
//! | [`navigation`] | 扫描载荷 → 笔记路径 → 打开或创建，宿主能力以 trait 注入 |
//! | [`scanner`] | 摄像头枚举 / 启动 / 停止的生命周期，保证识别结果只处理一次 |
//! | [`render`] | 代码块二维码 PNG 生成 |
//! | [`settings`] | 默认摄像头与扫描间隔的读取、合并、保存 |
//! | [`extension`] | 插件装配：命令描述、每次扫码创建新会话、代码块分发 |

pub mod error;
pub mod deep_link;
pub mod navigation;
pub mod scanner;
pub mod render;
pub mod settings;
pub mod extension;

#[cfg(feature = "desktop")]
pub mod desktop;
