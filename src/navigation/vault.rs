//! # 笔记库（文档存储）
//!
//! ## 设计思路
//!
//! `Vault` trait 抽象宿主的文档存储：按路径查找、在路径上创建空笔记。
//! `FsVault` 是基于本地目录的实现，供桌面外壳与集成测试使用。
//!
//! ## 实现思路
//!
//! - 路径统一使用 `/` 分隔的库内相对路径，拒绝绝对路径与 `..`。
//! - 创建使用 `create_new`，绝不覆盖已存在的文件。
//! - 为创建笔记而新建的父目录在失败时回滚，不留下半成品。

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// 笔记文件扩展名
pub const NOTE_EXTENSION: &str = ".md";

/// 文档存储错误
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("非法笔记路径：{0}")]
    InvalidPath(String),

    #[error("笔记已存在：{0}")]
    AlreadyExists(String),

    #[error("文件错误：{0}")]
    Io(#[from] std::io::Error),
}

/// 已存在笔记的句柄（库内相对路径）
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NoteHandle {
    pub path: String,
}

impl NoteHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// 文件名（含扩展名）
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// 宿主文档存储
pub trait Vault: Send + Sync {
    /// 笔记库名称（用于生成指向本库的深度链接）
    fn name(&self) -> String;

    /// 查找路径上的笔记；不存在或不是文件时返回 `None`
    fn get_note(&self, path: &str) -> Option<NoteHandle>;

    /// 在路径上创建笔记，已存在时失败
    fn create_note(&self, path: &str, content: &str) -> Result<NoteHandle, VaultError>;
}

/// 基于本地目录的笔记库
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    name: String,
}

impl FsVault {
    /// 以目录为根打开笔记库，库名取目录名
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vault".to_string());
        Ok(Self { root, name })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, VaultError> {
        let relative = Path::new(path);
        if path.trim().is_empty() {
            return Err(VaultError::InvalidPath(path.to_string()));
        }

        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(VaultError::InvalidPath(path.to_string())),
            }
        }
        Ok(resolved)
    }
}

impl Vault for FsVault {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn get_note(&self, path: &str) -> Option<NoteHandle> {
        let full = self.resolve(path).ok()?;
        full.is_file().then(|| NoteHandle::new(path))
    }

    fn create_note(&self, path: &str, content: &str) -> Result<NoteHandle, VaultError> {
        let full = self.resolve(path)?;
        if full.exists() {
            return Err(VaultError::AlreadyExists(path.to_string()));
        }

        // 记录需要新建的父目录，失败时按从深到浅的顺序回滚
        let mut created_dirs = Vec::new();
        let mut cursor = full.parent();
        while let Some(dir) = cursor {
            if dir.exists() || dir == self.root {
                break;
            }
            created_dirs.push(dir.to_path_buf());
            cursor = dir.parent();
        }

        let result = (|| -> Result<(), VaultError> {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new().write(true).create_new(true).open(&full)?;
            if !content.is_empty() {
                if let Err(err) = file.write_all(content.as_bytes()) {
                    drop(file);
                    let _ = fs::remove_file(&full);
                    return Err(err.into());
                }
            }
            Ok(())
        })();

        if let Err(err) = result {
            for dir in &created_dirs {
                if let Err(cleanup_err) = fs::remove_dir(dir) {
                    log::warn!("回滚目录失败 {}: {}", dir.display(), cleanup_err);
                }
            }
            return Err(err);
        }

        log::info!("已创建笔记: {}", path);
        Ok(NoteHandle::new(path))
    }
}
