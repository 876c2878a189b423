//! `taskagent` — composition root.
//!
//! Loads configuration, builds every leaf-to-root layer (embedding
//! provider, structured/vector memory, intent router, tool registry,
//! sandbox, LLM provider, reflector/executor/orchestrator), then hands off
//! to the stdio service loop. Logging is initialized to stderr before
//! anything else touches the process's standard streams, since stdout
//! carries only the line-JSON protocol (spec.md §4.1).

use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use taskagent::agent::executor::{Emit, PlanExecutor};
use taskagent::agent::orchestrator::TaskOrchestrator;
use taskagent::agent::providers::build_provider;
use taskagent::agent::reflector::Reflector;
use taskagent::config::Config;
use taskagent::intent::IntentRouter;
use taskagent::memory::{
    spawn_compression_worker, ConversationSummarizer, EmbeddingProvider, MemoryCache, StructuredMemory,
    VectorMemory,
};
use taskagent::model::STEP_TYPES;
use taskagent::service::{event_emitter, Service};
use taskagent::tools::{
    BrowserAdapter, ClipboardAdapter, EmailAdapter, FileAdapter, HistoryAdapter, NotificationAdapter,
    ProcessAdapter, PythonScriptAdapter, ReminderAdapter, SqliteStore, SystemInfoAdapter, TextProcessAdapter,
    ToolRegistry, UnsupportedAdapter, WorkflowAdapter,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let startup_started = Instant::now();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("taskagent=info".parse().unwrap()),
        )
        .init();

    info!("starting taskagent v{}", taskagent::VERSION);

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "config load failed, refusing to start");
            std::process::exit(1);
        }
    };

    let current_task_id = Arc::new(StdMutex::new(None));

    let orchestrator = match build_orchestrator(&config, Arc::clone(&current_task_id)).await {
        Ok(o) => o,
        Err(e) => {
            error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    };

    let service = Service::new(orchestrator, current_task_id);
    service.run(startup_started).await;

    info!("taskagent shutting down");
}

async fn build_orchestrator(
    config: &Config,
    current_task_id: Arc<StdMutex<Option<serde_json::Value>>>,
) -> taskagent::Result<Arc<TaskOrchestrator>> {
    let embedding = Arc::new(EmbeddingProvider::new());
    embedding.start_loading();

    let cache = MemoryCache::new();
    let sqlite_path = std::path::PathBuf::from(&config.storage.sqlite.path);
    let vector_dir = std::path::PathBuf::from(&config.storage.memory.path);

    let structured_memory = Arc::new(StructuredMemory::open(&sqlite_path)?);
    let vector_memory = Arc::new(VectorMemory::open(&vector_dir, Arc::clone(&embedding), cache));

    let intent_router = Arc::new(IntentRouter::new(Arc::clone(&embedding)));

    // Built once at startup and rebound to the current request id on every
    // `execute` command (spec.md §4.8: "adapters are constructed once at
    // startup with references to ... a progress callback; the orchestrator
    // rebinds the callback per task"), so adapters needing the user-input
    // side-channel (e.g. `BrowserAdapter`) get it at construction time too.
    let emit = event_emitter(current_task_id);

    let store = Arc::new(SqliteStore::open(&sqlite_path)?);
    let registry = Arc::new(build_registry(config, store, Arc::clone(&emit)).await?);

    let provider = build_provider(config)?;
    let default_model = config
        .agent
        .model
        .clone()
        .unwrap_or_else(|| provider.default_model().to_string());

    let summarizer = Arc::new(ConversationSummarizer::new(Arc::clone(&provider), default_model.clone()));
    spawn_compression_worker(Arc::clone(&vector_memory), Some(summarizer), Duration::from_secs(6 * 60 * 60));

    let reflector = Arc::new(Reflector::new(Some(provider), default_model));

    let executor = Arc::new(PlanExecutor::new(Arc::clone(&registry), reflector, Arc::clone(&emit)));

    Ok(Arc::new(TaskOrchestrator::new(
        executor,
        intent_router,
        structured_memory,
        vector_memory,
        emit,
    )))
}

/// Registers exactly one adapter per entry in [`STEP_TYPES`]. Multi-type
/// adapters (file/email/history/reminder/workflow) are `Clone`, so one
/// instance is boxed once per step type it serves rather than shared behind
/// a second layer of indirection the registry doesn't otherwise need.
async fn build_registry(config: &Config, store: Arc<SqliteStore>, emit: Arc<Emit>) -> taskagent::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    const BROWSER_TYPES: &[&str] = &[
        "browser_navigate",
        "browser_click",
        "browser_fill",
        "browser_wait",
        "browser_check_element",
        "browser_screenshot",
        "download_file",
        "request_login",
        "request_qr_login",
        "request_captcha",
        "fill_login",
        "fill_captcha",
    ];
    for step_type in BROWSER_TYPES {
        registry.register(*step_type, Box::new(BrowserAdapter::new(Arc::clone(&emit))));
    }

    let file_adapter = FileAdapter::new(config.sandbox.allowed_dir.clone());
    const FILE_TYPES: &[&str] = &[
        "file_read",
        "file_write",
        "file_create",
        "file_delete",
        "file_rename",
        "file_move",
        "file_copy",
        "file_organize",
        "file_classify",
        "file_batch_rename",
        "file_batch_copy",
        "file_batch_organize",
        "list_files",
    ];
    for step_type in FILE_TYPES {
        registry.register(*step_type, Box::new(file_adapter.clone()));
    }

    registry.register("clipboard_read", Box::new(ClipboardAdapter));
    registry.register("clipboard_write", Box::new(ClipboardAdapter));
    registry.register("send_notification", Box::new(NotificationAdapter));
    for step_type in ["open_app", "close_app", "open_file", "open_folder"] {
        registry.register(step_type, Box::new(ProcessAdapter));
    }
    registry.register("get_system_info", Box::new(SystemInfoAdapter));

    match PythonScriptAdapter::new(&config.sandbox).await {
        Ok(adapter) => registry.register("execute_python_script", Box::new(adapter)),
        Err(e) => {
            warn!(error = %e, "sandbox unavailable, execute_python_script will report requires_user_action");
            registry.register(
                "execute_python_script",
                Box::new(UnsupportedAdapter::new("sandbox execution environment failed to initialize")),
            );
        }
    }

    let provider = build_provider(config)?;
    let default_model = config
        .agent
        .model
        .clone()
        .unwrap_or_else(|| provider.default_model().to_string());
    registry.register("text_process", Box::new(TextProcessAdapter::new(provider, default_model)));

    const UNSUPPORTED_SYSTEM_TYPES: &[(&str, &str)] = &[
        ("screenshot_desktop", "desktop screenshot capture isn't available in this build"),
        ("set_volume", "system volume control isn't available in this build"),
        ("set_brightness", "display brightness control isn't available in this build"),
        ("speak", "text-to-speech isn't available in this build"),
        ("keyboard_type", "keyboard input simulation isn't available in this build"),
        ("keyboard_shortcut", "keyboard input simulation isn't available in this build"),
        ("mouse_click", "mouse input simulation isn't available in this build"),
        ("mouse_move", "mouse input simulation isn't available in this build"),
        ("window_minimize", "window management isn't available in this build"),
        ("window_maximize", "window management isn't available in this build"),
        ("window_close", "window management isn't available in this build"),
        ("image_process", "image processing isn't available in this build"),
        ("download_latest_python_installer", "installer download isn't available in this build"),
    ];
    for (step_type, reason) in UNSUPPORTED_SYSTEM_TYPES {
        registry.register(*step_type, Box::new(UnsupportedAdapter::new(reason)));
    }

    let email_adapter = EmailAdapter::new(config.email.clone());
    const EMAIL_TYPES: &[&str] = &[
        "send_email",
        "search_emails",
        "get_email_details",
        "download_attachments",
        "manage_emails",
        "compress_files",
    ];
    for step_type in EMAIL_TYPES {
        registry.register(*step_type, Box::new(email_adapter.clone()));
    }

    let reminder_adapter = ReminderAdapter::new(Arc::clone(&store));
    for step_type in ["set_reminder", "list_reminders", "cancel_reminder"] {
        registry.register(step_type, Box::new(reminder_adapter.clone()));
    }

    let workflow_adapter = WorkflowAdapter::new(Arc::clone(&store));
    for step_type in ["create_workflow", "list_workflows", "delete_workflow"] {
        registry.register(step_type, Box::new(workflow_adapter.clone()));
    }

    let history_adapter = HistoryAdapter::new(store);
    const HISTORY_TYPES: &[&str] =
        &["get_task_history", "search_history", "add_favorite", "list_favorites", "remove_favorite"];
    for step_type in HISTORY_TYPES {
        registry.register(*step_type, Box::new(history_adapter.clone()));
    }

    debug_assert_registry_complete(&registry);
    Ok(registry)
}

fn debug_assert_registry_complete(registry: &ToolRegistry) {
    for step_type in STEP_TYPES {
        if registry.registered_types().iter().all(|t| t != step_type) {
            warn!(step_type, "STEP_TYPES entry has no registered adapter");
        }
    }
}
