// 防止在 Windows 发布版本中显示额外的控制台窗口，不要删除！
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

//! # 笔记库二维码工具 — 应用入口
//!
//! 本文件仅负责应用初始化与命令注册。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use vault_qrcode::desktop::{self, commands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .setup(|app| {
            log::info!("setup: begin");
            desktop::install(app)?;
            log::info!("setup: complete");
            Ok(())
        })
        // 注册所有 Tauri 命令
        .invoke_handler(tauri::generate_handler![
            // 扫码弹窗与摄像头桥接
            commands::scan_qr_code,
            commands::scanner_reply,
            commands::scanner_decoded,
            commands::scanner_decode_failed,
            commands::scanner_close,
            // 导航
            commands::open_note_by_path,
            commands::register_deep_link_handler,
            commands::set_active_note,
            // 代码块
            commands::render_code_block,
            // 设置
            commands::get_plugin_settings,
            commands::set_default_camera,
            commands::set_scan_delay,
            // 扩展描述
            commands::list_extension_commands,
        ])
        .run(tauri::generate_context!())
        .expect("运行 Tauri 应用时出错");
}
