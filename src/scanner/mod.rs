//! # 扫码模块（scanner）
//!
//! ## 设计思路
//!
//! 管理外部摄像头扫描引擎的生命周期，并把第一次识别成功的结果交给导航服务。
//!
//! - `engine`：引擎抽象（枚举 / 启动 / 停止）、识别配置与错误模型
//! - `session`：单次扫描会话的状态机与弹窗交互
//!
//! ## 实现思路
//!
//! 引擎调用都是异步的，等待期间界面仍会派发识别回调与关闭事件。
//! 会话用一个 `AtomicBool` 在成功回调开头同步抢占“识别中”标志，
//! 保证导航只执行一次、摄像头不会被重复停止。
//! 停止摄像头是后台尽力清理，失败只记日志，从不阻塞导航与关闭弹窗。

mod engine;
mod session;

pub use engine::{
    CameraDevice, CameraEngine, CameraError, CaptureConfig, DetectionBox, ASPECT_RATIO,
    DETECTION_BOX_SIZE, SCAN_FPS,
};
pub use session::{
    ScannerModal, ScannerSession, ScannerState, INITIALIZING_STATUS, NO_CAMERAS_STATUS,
    SCANNING_STATUS,
};
