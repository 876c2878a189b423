//! Tools — one `ToolAdapter` implementation per family of step types,
//! registered into a `ToolRegistry` keyed by canonical step type.
//!
//! ## Adapters
//!
//! - **browser**: `browser_*`/`download_file` steps are an honest
//!   `requires_user_action` stub (no backing automation crate); `request_login`,
//!   `request_qr_login`, `request_captcha`, `fill_login`, `fill_captcha` drive
//!   the real user-input side-channel instead (`tools::traits::request_input`)
//! - **file**: every `file_*`/`list_files` step
//! - **system**: clipboard, notifications, process spawn/close, sandboxed
//!   Python execution, and an honest stub for unsupported OS-control steps
//! - **text**: `text_process` (translate/summarize/polish), LLM-backed
//! - **email**: SMTP send, IMAP read/search/manage, attachment compression
//! - **reminder** / **workflow** / **history**: local SQLite-backed state
//!
//! ## Adding a New Adapter
//!
//! 1. Create a new file in `src/tools/` implementing `ToolAdapter`
//! 2. Add `mod` + `pub use` below
//! 3. Register it for its step type(s) in the binary entry point

mod traits;
mod registry;

mod browser;
mod email;
mod file;
mod history;
mod reminder;
pub(crate) mod store;
mod system;
mod text;
mod workflow;

pub use traits::ToolAdapter;
pub use registry::ToolRegistry;

pub use browser::BrowserAdapter;
pub use email::EmailAdapter;
pub use file::FileAdapter;
pub use history::HistoryAdapter;
pub use reminder::ReminderAdapter;
pub use store::SqliteStore;
pub use system::{
    ClipboardAdapter, NotificationAdapter, ProcessAdapter, PythonScriptAdapter,
    SystemInfoAdapter, UnsupportedAdapter,
};
pub use text::TextProcessAdapter;
pub use workflow::WorkflowAdapter;
