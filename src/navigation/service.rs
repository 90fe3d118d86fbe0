//! # 导航服务
//!
//! 载荷解析与“打开或创建”流程。所有对用户可见的结果都通过 `Notifier` 发出，
//! 同时以 `NavigationOutcome` 返回给调用方。

use std::sync::Arc;

use serde::Serialize;

use super::vault::{NoteHandle, Vault, NOTE_EXTENSION};
use crate::deep_link::{self, DeepLink, SCHEME_PREFIX};
use crate::error::AppError;

/// 在当前视图中打开笔记
pub trait Workspace: Send + Sync {
    fn open_note(&self, note: &NoteHandle) -> Result<(), AppError>;

    /// 当前活动笔记（供 `qrcodelocal` 代码块使用）
    fn active_note(&self) -> Option<NoteHandle>;
}

/// 非阻塞提示（toast）
pub trait Notifier: Send + Sync {
    fn notice(&self, message: &str);
}

/// 宿主提供的深度链接处理器
///
/// 不同宿主版本可能没有该能力，因此每次调用前都要探测 `is_available`。
pub trait HostNavigator: Send + Sync {
    fn is_available(&self) -> bool;

    fn open_deep_link(&self, link: &DeepLink);
}

/// 载荷解析结果（尚未考虑宿主处理器是否可用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPayload {
    /// `open` 动作且带有非空 `file`
    OpenLink(DeepLink),
    /// 解析成功但动作不是 `open`，不做任何导航
    UnsupportedAction(DeepLink),
    /// 作为库内路径处理（尚未补全扩展名）
    Path(String),
}

/// 导航结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// 已交给宿主处理器
    Delegated { link: DeepLink },
    /// 打开了已存在的笔记
    Opened { path: String },
    /// 新建并打开了笔记
    Created { path: String },
    /// 不支持的深度链接动作，未做任何事
    Ignored { action: String },
    /// 创建或打开失败
    Failed { path: String, reason: String },
}

/// 将载荷解析为导航目标
///
/// # 规则
/// 1. 深度链接解析成功、动作为 `open` 且 `file` 非空 → `OpenLink`
/// 2. 解析成功但动作不是 `open` → `UnsupportedAction`
/// 3. 匹配旧前缀 `obsidian://open?file=` 且剩余非空 → 剩余部分作为路径
/// 4. 其余情况 → 原始载荷作为路径（不因深度链接无法解析而失败）
pub fn resolve_payload(payload: &str) -> ResolvedPayload {
    if !payload.starts_with(SCHEME_PREFIX) {
        return ResolvedPayload::Path(payload.to_string());
    }

    match DeepLink::parse(payload) {
        Some(link) if link.is_open() && link.target_file().is_some() => {
            return ResolvedPayload::OpenLink(link);
        }
        Some(link) if !link.is_open() => {
            return ResolvedPayload::UnsupportedAction(link);
        }
        _ => {}
    }

    if let Some(path) = deep_link::strip_legacy_open_prefix(payload) {
        return ResolvedPayload::Path(path.to_string());
    }

    ResolvedPayload::Path(payload.to_string())
}

/// 没有 `.md` 结尾时补全扩展名
pub fn normalize_note_path(path: &str) -> String {
    if path.ends_with(NOTE_EXTENSION) {
        path.to_string()
    } else {
        format!("{path}{NOTE_EXTENSION}")
    }
}

/// 导航服务
///
/// 所有宿主能力在构造时注入；`host` 为 `None` 表示宿主完全没有深度链接处理器。
pub struct Navigator {
    vault: Arc<dyn Vault>,
    workspace: Arc<dyn Workspace>,
    notifier: Arc<dyn Notifier>,
    host: Option<Arc<dyn HostNavigator>>,
}

impl Navigator {
    pub fn new(
        vault: Arc<dyn Vault>,
        workspace: Arc<dyn Workspace>,
        notifier: Arc<dyn Notifier>,
        host: Option<Arc<dyn HostNavigator>>,
    ) -> Self {
        Self {
            vault,
            workspace,
            notifier,
            host,
        }
    }

    pub fn vault(&self) -> &Arc<dyn Vault> {
        &self.vault
    }

    pub fn workspace(&self) -> &Arc<dyn Workspace> {
        &self.workspace
    }

    /// 打开或创建载荷指向的笔记
    ///
    /// 从不返回错误：失败会以提示呈现，并体现在 `NavigationOutcome::Failed` 中。
    pub fn open_or_create(&self, payload: &str) -> NavigationOutcome {
        let path = match resolve_payload(payload) {
            ResolvedPayload::OpenLink(link) => {
                if let Some(host) = self.host.as_ref().filter(|h| h.is_available()) {
                    log::info!("交由宿主处理深度链接: {:?}", link);
                    host.open_deep_link(&link);
                    return NavigationOutcome::Delegated { link };
                }
                log::debug!("宿主深度链接处理器不可用，回退到本地路径");
                link.file.unwrap_or_default()
            }
            ResolvedPayload::UnsupportedAction(link) => {
                log::info!("忽略不支持的深度链接动作: {}", link.action);
                return NavigationOutcome::Ignored { action: link.action };
            }
            ResolvedPayload::Path(path) => path,
        };

        let path = normalize_note_path(&path);
        self.open_or_create_path(&path)
    }

    fn open_or_create_path(&self, path: &str) -> NavigationOutcome {
        if let Some(note) = self.vault.get_note(path) {
            return match self.workspace.open_note(&note) {
                Ok(()) => {
                    self.notifier.notice(&format!("Opened note: {}", note.name()));
                    NavigationOutcome::Opened { path: note.path }
                }
                Err(err) => self.report_open_failure(path, err),
            };
        }

        let note = match self.vault.create_note(path, "") {
            Ok(note) => note,
            Err(err) => {
                log::error!("创建笔记失败 {}: {}", path, err);
                self.notifier.notice(&format!("Failed to create note: {path}"));
                return NavigationOutcome::Failed {
                    path: path.to_string(),
                    reason: err.to_string(),
                };
            }
        };

        match self.workspace.open_note(&note) {
            Ok(()) => {
                self.notifier
                    .notice(&format!("Created and opened note: {}", note.name()));
                NavigationOutcome::Created { path: note.path }
            }
            Err(err) => self.report_open_failure(path, err),
        }
    }

    fn report_open_failure(&self, path: &str, err: AppError) -> NavigationOutcome {
        log::error!("打开笔记失败 {}: {}", path, err);
        self.notifier.notice(&format!("Failed to open note: {path}"));
        NavigationOutcome::Failed {
            path: path.to_string(),
            reason: err.to_string(),
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::fakes::*;
    use super::*;

    struct Harness {
        vault: Arc<MemoryVault>,
        workspace: Arc<RecordingWorkspace>,
        notifier: Arc<RecordingNotifier>,
        host: Arc<RecordingHost>,
        navigator: Navigator,
    }

    fn harness(existing: &[&str], with_host: bool) -> Harness {
        let vault = Arc::new(MemoryVault::with_notes(existing));
        let workspace = Arc::new(RecordingWorkspace::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let host = Arc::new(RecordingHost::default());
        let navigator = Navigator::new(
            vault.clone(),
            workspace.clone(),
            notifier.clone(),
            with_host.then(|| host.clone() as Arc<dyn HostNavigator>),
        );
        Harness {
            vault,
            workspace,
            notifier,
            host,
            navigator,
        }
    }

    #[test]
    fn bare_path_is_created_with_extension() {
        let h = harness(&[], false);
        let outcome = h.navigator.open_or_create("notes/todo");

        assert_eq!(outcome, NavigationOutcome::Created { path: "notes/todo.md".into() });
        assert_eq!(*h.workspace.opened.lock().unwrap(), vec!["notes/todo.md"]);
        assert_eq!(
            *h.notifier.messages.lock().unwrap(),
            vec!["Created and opened note: todo.md"]
        );
    }

    #[test]
    fn existing_note_is_opened() {
        let h = harness(&["inbox.md"], false);
        let outcome = h.navigator.open_or_create("inbox.md");

        assert_eq!(outcome, NavigationOutcome::Opened { path: "inbox.md".into() });
        assert_eq!(*h.notifier.messages.lock().unwrap(), vec!["Opened note: inbox.md"]);
    }

    #[test]
    fn deep_link_falls_back_to_file_without_host() {
        let h = harness(&[], false);
        let outcome = h.navigator.open_or_create("obsidian://open?file=notes%2Ftodo");
        assert_eq!(outcome, NavigationOutcome::Created { path: "notes/todo.md".into() });
    }

    #[test]
    fn deep_link_falls_back_when_host_probe_fails() {
        let h = harness(&[], true);
        h.host.available.store(false, Ordering::SeqCst);

        let outcome = h.navigator.open_or_create("obsidian://open?vault=V&file=a%20b.md");
        assert_eq!(outcome, NavigationOutcome::Created { path: "a b.md".into() });
        assert!(h.host.links.lock().unwrap().is_empty());
    }

    #[test]
    fn deep_link_is_delegated_when_host_available() {
        let h = harness(&[], true);
        h.host.available.store(true, Ordering::SeqCst);

        let outcome = h.navigator.open_or_create("obsidian://open?vault=Work&file=plan");
        let expected = DeepLink {
            action: "open".into(),
            file: Some("plan".into()),
            vault: Some("Work".into()),
        };
        assert_eq!(outcome, NavigationOutcome::Delegated { link: expected.clone() });
        assert_eq!(*h.host.links.lock().unwrap(), vec![expected]);
        assert!(h.workspace.opened.lock().unwrap().is_empty());
        assert!(h.notifier.messages.lock().unwrap().is_empty());
        assert!(h.vault.notes.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_file_value_uses_raw_payload() {
        let h = harness(&[], false);
        let outcome = h.navigator.open_or_create("obsidian://open?file=");
        assert_eq!(
            outcome,
            NavigationOutcome::Created { path: "obsidian://open?file=.md".into() }
        );
    }

    #[test]
    fn malformed_link_uses_legacy_prefix() {
        let h = harness(&[], false);
        let outcome = h.navigator.open_or_create("obsidian://open?file=100%");
        assert_eq!(outcome, NavigationOutcome::Created { path: "100%.md".into() });
    }

    #[test]
    fn unsupported_action_is_a_no_op() {
        let h = harness(&[], true);
        h.host.available.store(true, Ordering::SeqCst);

        let outcome = h.navigator.open_or_create("obsidian://search?query=x");
        assert_eq!(outcome, NavigationOutcome::Ignored { action: "search".into() });
        assert!(h.workspace.opened.lock().unwrap().is_empty());
        assert!(h.notifier.messages.lock().unwrap().is_empty());
        assert!(h.host.links.lock().unwrap().is_empty());
    }

    #[test]
    fn creation_failure_is_reported_once() {
        let h = harness(&[], false);
        h.vault.fail_create.store(true, Ordering::SeqCst);

        let outcome = h.navigator.open_or_create("bad");
        assert!(matches!(
            outcome,
            NavigationOutcome::Failed { ref path, .. } if path == "bad.md"
        ));
        assert_eq!(*h.notifier.messages.lock().unwrap(), vec!["Failed to create note: bad.md"]);
        assert!(h.workspace.opened.lock().unwrap().is_empty());
    }

    #[test]
    fn resolve_payload_branches() {
        assert_eq!(resolve_payload("a/b"), ResolvedPayload::Path("a/b".into()));
        assert_eq!(
            resolve_payload("obsidian://open?vault=x"),
            ResolvedPayload::Path("obsidian://open?vault=x".into())
        );
        assert!(matches!(
            resolve_payload("obsidian://new?file=x"),
            ResolvedPayload::UnsupportedAction(_)
        ));
        assert!(matches!(
            resolve_payload("obsidian://open?file=x"),
            ResolvedPayload::OpenLink(_)
        ));
    }

    #[test]
    fn normalize_only_appends_when_missing() {
        assert_eq!(normalize_note_path("a"), "a.md");
        assert_eq!(normalize_note_path("a.md"), "a.md");
        assert_eq!(normalize_note_path("a.txt"), "a.txt.md");
        assert_eq!(normalize_note_path(""), ".md");
    }
}
