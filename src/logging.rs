#![cfg_attr(not(all(feature = "app", not(test))), allow(dead_code))]

use std::any::Any;

pub const LOG_FILE_BASENAME: &str = "task-shell";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 5;
pub const LOG_ENV: &str = "TASK_SHELL_LOG";

/// `TASK_SHELL_LOG`, then `RUST_LOG`, then the build default.
pub fn log_spec(custom: Option<String>, rust_log: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,task_shell_lib=debug"
    } else {
        "warn,task_shell_lib=info"
    };
    custom
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

#[cfg(all(feature = "app", not(test)))]
pub fn init_logging(
    data_dir: &std::path::Path,
) -> Result<flexi_logger::LoggerHandle, flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    std::fs::create_dir_all(data_dir)?;

    let spec = log_spec(std::env::var(LOG_ENV).ok(), std::env::var("RUST_LOG").ok());

    // The prompt owns stdout; only debug builds echo warnings to stderr.
    let handle = Logger::try_with_str(spec)?
        .log_to_file(
            // Same directory as the task store and its backups.
            FileSpec::default()
                .directory(data_dir)
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(if cfg!(debug_assertions) {
            Duplicate::Warn
        } else {
            Duplicate::None
        })
        .start()?;

    install_panic_hook();

    log::info!(
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        data_dir.display(),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(handle)
}

/// Routes panics into the log file, then runs the previous hook.
#[cfg(all(feature = "app", not(test)))]
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let at = info
            .location()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown location".to_string());
        log::error!(
            "task-shell panicked at {at}: {}\n{}",
            panic_message(info.payload()),
            std::backtrace::Backtrace::force_capture()
        );
        previous(info);
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_spec_prefers_custom_then_rust_log() {
        assert_eq!(
            log_spec(Some("trace".into()), Some("error".into())),
            "trace"
        );
        assert_eq!(log_spec(Some("  ".into()), Some("error".into())), "error");
        let fallback = log_spec(None, Some(String::new()));
        assert!(fallback.starts_with("warn,task_shell_lib="));
    }

    #[test]
    fn panic_message_reads_string_payloads() {
        let literal: Box<dyn Any + Send> = Box::new("store lock poisoned");
        assert_eq!(panic_message(literal.as_ref()), "store lock poisoned");
        let owned: Box<dyn Any + Send> = Box::new(format!("index {} out of bounds", 3));
        assert_eq!(panic_message(owned.as_ref()), "index 3 out of bounds");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "non-string payload");
    }
}
