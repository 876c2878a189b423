//! Step-type alias normalization, shared by the planner's auto-rewrite pass
//! and the executor's pre-dispatch resolution.
//!
//! A confused reflector or planner sometimes emits a generic type
//! (`file_manager`, `FileManager`, `file_operation`, `app_control`, `shell`)
//! instead of a canonical one from the registered set. This maps those back
//! to a canonical type using the step's `action` text, and also catches a
//! canonical-but-wrong case: a `file_move` with no destination whose action
//! clearly means delete.

use crate::model::Step;

const DELETE_KEYWORDS: &[&str] = &["删除", "delete", "remove"];
const CLOSE_KEYWORDS: &[&str] = &["关闭", "退出", "结束", "停止", "close", "quit", "exit", "stop"];

/// Resolve `step`'s effective type, applying alias normalization. Returns
/// the step's own type unchanged when no alias rule applies.
pub fn normalize_step_type(step: &Step) -> String {
    let canonical_alias = step.step_type.to_lowercase();

    match canonical_alias.as_str() {
        "file_manager" | "filemanager" | "file_operation" => classify_file_op(&step.action),
        "app_control" | "shell" => classify_app_op(&step.action),
        _ => {
            if step.step_type == "file_move"
                && !step.params.contains_key("target_dir")
                && !step.params.contains_key("target_path")
                && contains_any(&step.action, DELETE_KEYWORDS)
            {
                "file_delete".to_string()
            } else {
                step.step_type.clone()
            }
        }
    }
}

fn classify_file_op(action: &str) -> String {
    let a = action.to_lowercase();
    if contains_any(&a, DELETE_KEYWORDS) {
        "file_delete"
    } else if a.contains("移动") || a.contains("move") {
        "file_move"
    } else if a.contains("复制") || a.contains("copy") {
        "file_copy"
    } else if a.contains("重命名") || a.contains("rename") {
        "file_rename"
    } else if a.contains("创建") || a.contains("create") {
        "file_create"
    } else if a.contains("写") || a.contains("write") {
        "file_write"
    } else {
        "file_read"
    }
    .to_string()
}

fn classify_app_op(action: &str) -> String {
    if contains_any(action, CLOSE_KEYWORDS) {
        "close_app".to_string()
    } else {
        "open_app".to_string()
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|n| lower.contains(&n.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn file_manager_alias_resolves_by_action() {
        let step = Step::new("file_manager", "删除这个文件");
        assert_eq!(normalize_step_type(&step), "file_delete");
    }

    #[test]
    fn app_control_alias_resolves_close() {
        let step = Step::new("app_control", "关闭微信");
        assert_eq!(normalize_step_type(&step), "close_app");
    }

    #[test]
    fn app_control_alias_defaults_open() {
        let step = Step::new("shell", "launch the music app");
        assert_eq!(normalize_step_type(&step), "open_app");
    }

    #[test]
    fn file_move_without_target_and_delete_action_becomes_delete() {
        let step = Step::new("file_move", "删除文件");
        assert_eq!(normalize_step_type(&step), "file_delete");
    }

    #[test]
    fn file_move_with_target_dir_stays_move() {
        let step = Step::new("file_move", "移动文件")
            .with_param("target_dir", Value::String("~/Desktop".into()));
        assert_eq!(normalize_step_type(&step), "file_move");
    }

    #[test]
    fn canonical_type_passes_through() {
        let step = Step::new("screenshot_desktop", "take a screenshot");
        assert_eq!(normalize_step_type(&step), "screenshot_desktop");
    }
}
