//! App-name extraction for the `app_open`/`app_close` fast path.
//!
//! Ported from `original_source/agent/orchestrator/task_orchestrator.py`'s
//! `_extract_app_name`: a keyword-plus-whitespace regex first, then a
//! short-instruction-with-no-connective-words fallback that returns the
//! whole instruction verbatim.

use std::sync::OnceLock;

use regex::Regex;

const OPEN_KEYWORDS: &[&str] = &["打开", "启动", "运行", "开启", "open", "launch", "start", "run"];
const CLOSE_KEYWORDS: &[&str] = &["关闭", "退出", "结束", "停止", "close", "quit", "exit", "stop", "kill"];
const CONNECTIVE_WORDS: &[&str] = &["然后", "并", "和", "再"];
const SPLIT_CHARS: &[char] = &['然', '后', '并', '和', ',', '，'];

static KEYWORD_PATTERN: OnceLock<Regex> = OnceLock::new();

fn keyword_pattern() -> &'static Regex {
    KEYWORD_PATTERN.get_or_init(|| {
        let escaped: Vec<String> = OPEN_KEYWORDS
            .iter()
            .chain(CLOSE_KEYWORDS.iter())
            .map(|kw| regex::escape(kw))
            .collect();
        Regex::new(&format!(r"(?i)(?:{})\s+(.+)", escaped.join("|"))).expect("static app-name pattern is valid")
    })
}

fn split_on_connectives(s: &str) -> &str {
    match s.find(SPLIT_CHARS) {
        Some(idx) => s[..idx].trim(),
        None => s.trim(),
    }
}

/// Extract an application name from a free-form instruction, or `None` if
/// none can be confidently identified.
pub fn extract(instruction: &str) -> Option<String> {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return None;
    }

    if let Some(caps) = keyword_pattern().captures(instruction) {
        if let Some(m) = caps.get(1) {
            let app_name = split_on_connectives(m.as_str());
            if !app_name.is_empty() {
                return Some(app_name.to_string());
            }
        }
    }

    if instruction.chars().count() < 50 && !CONNECTIVE_WORDS.iter().any(|w| instruction.contains(w)) {
        return Some(instruction.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_after_open_keyword_with_space() {
        assert_eq!(extract("open Safari"), Some("Safari".to_string()));
    }

    #[test]
    fn extracts_after_close_keyword_with_space() {
        assert_eq!(extract("close Music app"), Some("Music app".to_string()));
    }

    #[test]
    fn strips_trailing_connective_clause() {
        assert_eq!(extract("open Safari 然后截图"), Some("Safari".to_string()));
    }

    #[test]
    fn falls_back_to_whole_instruction_when_short_and_bare() {
        assert_eq!(extract("计算器"), Some("计算器".to_string()));
    }

    #[test]
    fn returns_none_for_long_instruction_with_connectives() {
        let instruction = "打开浏览器 然后 搜索今天的新闻 并且 总结一下内容，这是一个很长的指令用来测试兜底逻辑是否正确地放弃提取";
        assert_eq!(extract(instruction), None);
    }

    #[test]
    fn returns_none_for_empty_instruction() {
        assert_eq!(extract("   "), None);
    }
}
