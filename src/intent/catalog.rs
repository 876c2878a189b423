//! Static intent catalog — canonical examples and the single-step metadata
//! each intent resolves to.
//!
//! Ported 1:1 from `original_source/agent/core/intent_router.py`'s
//! `intent_registry`/`intent_metadata` tables. Two intents
//! (`volume_control`/`brightness_control`/`system_info`) route to this
//! crate's closed step-type set directly (`set_volume`/`set_brightness`/
//! `get_system_info`) instead of the Python original's generic
//! `system_control` type, since that type isn't in the registered set here
//! and the catalog can just name the canonical type up front.

pub struct IntentDefinition {
    pub intent_type: &'static str,
    pub examples: &'static [&'static str],
    pub step_type: &'static str,
    pub action: &'static str,
}

pub const INTENT_CATALOG: &[IntentDefinition] = &[
    IntentDefinition {
        intent_type: "translate",
        examples: &[
            "Translate this to English",
            "翻译这段话",
            "How do you say X in Chinese?",
            "Translate the following text",
            "把这个翻译成英文",
            "英文翻译",
        ],
        step_type: "text_process",
        action: "translate",
    },
    IntentDefinition {
        intent_type: "summarize",
        examples: &["Summarize this text", "总结一下这段话", "Give me a summary", "概括核心内容", "提炼要点"],
        step_type: "text_process",
        action: "summarize",
    },
    IntentDefinition {
        intent_type: "polish",
        examples: &[
            "Polish this text",
            "润色一下这段文字",
            "Make this sound more professional",
            "优化这段话的表达",
            "修改语法错误",
        ],
        step_type: "text_process",
        action: "polish",
    },
    IntentDefinition {
        intent_type: "screenshot",
        examples: &[
            "Take a screenshot",
            "Capture the screen",
            "截个图",
            "截屏",
            "Screenshot the desktop",
            "保存屏幕截图",
        ],
        step_type: "screenshot_desktop",
        action: "screenshot",
    },
    IntentDefinition {
        intent_type: "volume_control",
        examples: &["Turn up the volume", "Mute the sound", "Volume down", "调大音量", "静音", "声音小一点"],
        step_type: "set_volume",
        action: "volume",
    },
    IntentDefinition {
        intent_type: "brightness_control",
        examples: &["Increase brightness", "Dim the screen", "Set brightness to 50%", "调亮屏幕", "屏幕太暗了", "亮度调高点"],
        step_type: "set_brightness",
        action: "brightness",
    },
    IntentDefinition {
        intent_type: "system_info",
        examples: &["Check disk usage", "Show battery status", "System information", "查看系统信息", "内存还剩多少", "电池状态"],
        step_type: "get_system_info",
        action: "sys_info",
    },
    IntentDefinition {
        intent_type: "app_open",
        examples: &["Open Safari", "Launch Calculator", "Open Discord", "打开浏览器", "启动计算器", "打开微信"],
        step_type: "open_app",
        action: "open",
    },
    IntentDefinition {
        intent_type: "app_close",
        examples: &["Close Safari", "Quit Music", "Kill the process", "关闭浏览器", "退出音乐", "关闭应用"],
        step_type: "close_app",
        action: "close",
    },
];
