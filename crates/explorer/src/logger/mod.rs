use std::{fs, fs::OpenOptions, path::PathBuf};

use chrono::Local;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// drop 되면 로그 flush 가 멈추므로 main 이 끝날 때까지 들고 있는다
pub struct TracingGuards {
    _file: WorkerGuard,
    _stdout: WorkerGuard,
}

/// stdout + 날짜별 파일 로깅. 파일에는 INFO 이상만 남긴다.
pub fn init_tracing(log_dir: &str) -> eyre::Result<TracingGuards> {
    let (file_writer, file_guard) = daily_file_appender(log_dir, "explorer")?;
    let (stdout_writer, stdout_guard) = non_blocking(std::io::stdout());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_filter = EnvFilter::new("info");

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(file_filter),
        )
        .with(fmt::layer().with_writer(stdout_writer).with_ansi(true))
        .try_init()?;

    Ok(TracingGuards {
        _file: file_guard,
        _stdout: stdout_guard,
    })
}

/// `{dir}/{prefix}.2025-11-29.log`
fn daily_file_appender(
    base_dir: &str,
    prefix: &str,
) -> eyre::Result<(non_blocking::NonBlocking, WorkerGuard)> {
    let date = Local::now().format("%Y-%m-%d").to_string();
    fs::create_dir_all(base_dir)?;

    let mut path = PathBuf::from(base_dir);
    path.push(log_file_name(prefix, &date));

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(non_blocking(file))
}

fn log_file_name(prefix: &str, date: &str) -> String {
    format!("{prefix}.{date}.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name() {
        assert_eq!(log_file_name("explorer", "2025-11-29"), "explorer.2025-11-29.log");
    }
}
