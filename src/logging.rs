use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Global crash log directory, set during init.
static CRASH_LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize tracing with a colored stdout layer.
///
/// Default level: INFO (crate modules at DEBUG), override via RUST_LOG env.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,botforge_desktop=debug"));

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();

    tracing::debug!("Tracing initialized");
}

/// Install a panic hook that writes crash details to a file before aborting.
/// Must be called after the app data directory is known.
pub fn install_crash_hook(app_data_dir: &std::path::Path) {
    // Ensure backtraces are captured with full symbols
    if std::env::var("RUST_BACKTRACE").is_err() {
        std::env::set_var("RUST_BACKTRACE", "full");
    }

    let crash_dir = app_data_dir.join("crash_logs");
    let _ = std::fs::create_dir_all(&crash_dir);
    CRASH_LOG_DIR.set(crash_dir).ok();

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(dir) = CRASH_LOG_DIR.get() {
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let path = dir.join(format!("crash_{}.log", timestamp));

            let mut report = String::new();
            report.push_str(&format!(
                "=== BOTFORGE CRASH REPORT ===\n\
                 Time: {}\n\
                 Version: {}\n\n",
                chrono::Local::now().to_rfc3339(),
                env!("CARGO_PKG_VERSION"),
            ));

            if let Some(msg) = info.payload().downcast_ref::<&str>() {
                report.push_str(&format!("Panic: {}\n", msg));
            } else if let Some(msg) = info.payload().downcast_ref::<String>() {
                report.push_str(&format!("Panic: {}\n", msg));
            } else {
                report.push_str("Panic: <unknown payload>\n");
            }

            if let Some(loc) = info.location() {
                report.push_str(&format!(
                    "Location: {}:{}:{}\n",
                    loc.file(),
                    loc.line(),
                    loc.column()
                ));
            }

            report.push_str(&format!(
                "\nBacktrace:\n{}\n",
                std::backtrace::Backtrace::force_capture()
            ));

            let _ = std::fs::write(&path, &report);
            eprintln!("[CRASH] Report written to: {}", path.display());
        }

        prev_hook(info);
    }));

    tracing::info!("Crash hook installed");
}
