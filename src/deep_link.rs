//! 深度链接解析模块
//!
//! # 设计思路
//!
//! 扫描到的二维码内容可能是笔记库的深度链接
//! （`obsidian://open?vault=<名称>&file=<路径>`），也可能只是裸路径。
//! 本模块只负责把字符串解析成结构化的 `DeepLink`，不做任何导航决策。
//!
//! # 实现思路
//!
//! - 前缀不匹配直接返回 `None`。
//! - 去掉前缀后按第一个 `?` 切分为动作段与查询段。
//! - 查询段按 `&` 拆分、每对按第一个 `=` 拆分；键或值缺失的参数静默丢弃。
//! - 百分号解码失败（非法转义或非法 UTF-8）时整体返回 `None`，从不向外抛错。

use std::borrow::Cow;

use serde::Serialize;

/// 笔记应用的自定义 URI scheme
pub const SCHEME: &str = "obsidian";

/// 深度链接前缀（`obsidian://`）
pub const SCHEME_PREFIX: &str = "obsidian://";

/// 旧版本生成的二维码使用的字面前缀
pub const LEGACY_OPEN_PREFIX: &str = "obsidian://open?file=";

/// 唯一被实际处理的动作
pub const OPEN_ACTION: &str = "open";

/// 解析后的深度链接
///
/// `action` 总是存在（格式异常时可能为空字符串）；
/// `file` / `vault` 已完成百分号解码，缺失时为 `None`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeepLink {
    pub action: String,
    pub file: Option<String>,
    pub vault: Option<String>,
}

impl DeepLink {
    /// 解析深度链接字符串
    ///
    /// # 返回
    /// - `Some(DeepLink)`：以 `obsidian://` 开头且解码成功
    /// - `None`：前缀不匹配，或任一参数值的百分号编码非法
    ///
    /// # 示例
    /// ```rust
    /// use vault_qrcode::deep_link::DeepLink;
    ///
    /// let link = DeepLink::parse("obsidian://open?file=notes%2Ftodo&vault=Work").unwrap();
    /// assert_eq!(link.action, "open");
    /// assert_eq!(link.file.as_deref(), Some("notes/todo"));
    /// assert_eq!(link.vault.as_deref(), Some("Work"));
    /// ```
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix(SCHEME_PREFIX)?;

        let (action, query) = match rest.split_once('?') {
            Some((action, query)) => (action, query),
            None => (rest, ""),
        };

        let mut file = None;
        let mut vault = None;

        if !query.is_empty() {
            for pair in query.split('&') {
                let Some((key, value)) = pair.split_once('=') else {
                    continue;
                };
                if key.is_empty() || value.is_empty() {
                    continue;
                }

                let Some(decoded) = percent_decode(value) else {
                    log::warn!("深度链接参数解码失败，放弃解析: {}={}", key, value);
                    return None;
                };

                match key {
                    "file" => file = Some(decoded.into_owned()),
                    "vault" => vault = Some(decoded.into_owned()),
                    _ => {}
                }
            }
        }

        Some(Self {
            action: action.to_string(),
            file,
            vault,
        })
    }

    /// 是否为 `open` 动作
    pub fn is_open(&self) -> bool {
        self.action == OPEN_ACTION
    }

    /// 可用于导航的目标文件（空字符串视为缺失）
    pub fn target_file(&self) -> Option<&str> {
        self.file.as_deref().filter(|f| !f.is_empty())
    }
}

/// 生成打开指定笔记的深度链接
///
/// 笔记库名与路径都会做百分号编码。
pub fn build_open_uri(vault: &str, file: &str) -> String {
    format!(
        "{SCHEME_PREFIX}{OPEN_ACTION}?vault={}&file={}",
        urlencoding::encode(vault),
        urlencoding::encode(file)
    )
}

/// 旧格式 `obsidian://open?file=<路径>` 的兼容识别
///
/// 返回去掉字面前缀后的路径；剩余部分为空时视为不匹配。
pub fn strip_legacy_open_prefix(payload: &str) -> Option<&str> {
    payload
        .strip_prefix(LEGACY_OPEN_PREFIX)
        .filter(|rest| !rest.is_empty())
}

/// 严格的百分号解码：`%` 后必须紧跟两位十六进制数字，结果必须是合法 UTF-8。
fn percent_decode(value: &str) -> Option<Cow<'_, str>> {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    urlencoding::decode(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_open_action_with_file_and_vault() {
        let link = DeepLink::parse("obsidian://open?file=notes%2Ftodo.md&vault=My%20Vault")
            .expect("should parse");
        assert_eq!(link.action, "open");
        assert_eq!(link.file.as_deref(), Some("notes/todo.md"));
        assert_eq!(link.vault.as_deref(), Some("My Vault"));
        assert!(link.is_open());
    }

    #[test]
    fn rejects_foreign_scheme() {
        assert_eq!(DeepLink::parse("https://example.com/open?file=a"), None);
        assert_eq!(DeepLink::parse("notes/todo"), None);
        assert_eq!(DeepLink::parse(""), None);
        assert_eq!(DeepLink::parse("obsidian:/open?file=a"), None);
    }

    #[test]
    fn action_without_query() {
        let link = DeepLink::parse("obsidian://new").expect("should parse");
        assert_eq!(link.action, "new");
        assert!(link.file.is_none());
        assert!(link.vault.is_none());
    }

    #[test]
    fn bare_prefix_yields_empty_action() {
        let link = DeepLink::parse("obsidian://").expect("should parse");
        assert_eq!(link.action, "");
        assert!(!link.is_open());
    }

    #[test]
    fn drops_pairs_missing_key_or_value() {
        let link = DeepLink::parse("obsidian://open?file=&=x&vault&flag=1&vault=V")
            .expect("should parse");
        assert_eq!(link.file, None);
        assert_eq!(link.vault.as_deref(), Some("V"));
    }

    #[test]
    fn value_keeps_everything_after_first_equals() {
        let link = DeepLink::parse("obsidian://open?file=a=b").expect("should parse");
        assert_eq!(link.file.as_deref(), Some("a=b"));
    }

    #[test]
    fn later_duplicate_wins() {
        let link = DeepLink::parse("obsidian://open?file=first&file=second").expect("should parse");
        assert_eq!(link.file.as_deref(), Some("second"));
    }

    #[test]
    fn malformed_percent_encoding_yields_none() {
        assert_eq!(DeepLink::parse("obsidian://open?file=100%"), None);
        assert_eq!(DeepLink::parse("obsidian://open?file=%zz"), None);
        assert_eq!(DeepLink::parse("obsidian://open?file=%C3"), None);
        // 未知参数同样参与解码
        assert_eq!(DeepLink::parse("obsidian://open?file=a&other=%E0%A4"), None);
    }

    #[test]
    fn plus_is_not_a_space() {
        let link = DeepLink::parse("obsidian://open?file=a+b").expect("should parse");
        assert_eq!(link.file.as_deref(), Some("a+b"));
    }

    #[test]
    fn target_file_ignores_empty_values() {
        let link = DeepLink {
            action: "open".to_string(),
            file: Some(String::new()),
            vault: None,
        };
        assert_eq!(link.target_file(), None);
    }

    #[test]
    fn build_open_uri_encodes_both_parts() {
        let uri = build_open_uri("My Vault", "daily/2024-01-01 plan.md");
        assert_eq!(
            uri,
            "obsidian://open?vault=My%20Vault&file=daily%2F2024-01-01%20plan.md"
        );

        let link = DeepLink::parse(&uri).expect("built uri should parse");
        assert_eq!(link.vault.as_deref(), Some("My Vault"));
        assert_eq!(link.file.as_deref(), Some("daily/2024-01-01 plan.md"));
    }

    #[test]
    fn legacy_prefix_requires_remainder() {
        assert_eq!(strip_legacy_open_prefix("obsidian://open?file=notes/a"), Some("notes/a"));
        assert_eq!(strip_legacy_open_prefix("obsidian://open?file="), None);
        assert_eq!(strip_legacy_open_prefix("obsidian://open?vault=x"), None);
    }
}
