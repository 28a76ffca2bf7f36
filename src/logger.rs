// src/logger.rs

use crate::config::Config;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Инициализация логирования через tracing.
///
/// Если в конфиге задан `log.file`, дублируем вывод в файл с суточной ротацией.
/// Возвращённый guard нужно держать до конца `main`, иначе хвост лога потеряется.
pub fn init(cfg: &Config) -> Option<WorkerGuard> {
    // Уровень из RUST_LOG, иначе из конфига
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log.level));

    let stdout_layer = fmt::layer().with_target(false);

    let (file_layer, guard) = match cfg.log.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().map(|n| n.to_owned()).unwrap_or_else(|| "orderfan.log".into());
            let appender = tracing_appender::rolling::daily(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_target(false).with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        "Logger initialized. Frontend = {:?}, log file = {:?}",
        cfg.frontend,
        cfg.log.file
    );
    guard
}
