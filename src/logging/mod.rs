//! 日志初始化.
//!
//! 解析库只通过 `log` 门面输出, 这里用 tracing-subscriber 统一收集:
//! 控制台彩色输出, 以及可选的按天滚动日志文件.

use anyhow::{Context, Result};
use chrono::{Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 过滤指令, 语法同 `RUST_LOG` (如 `info`, `tao_parser=trace`), 可被 `TAO_LOG` 覆盖
    pub level: String,
    /// 日志文件目录, 为空时只输出到控制台
    pub directory: Option<String>,
    /// 日志文件名前缀
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "tao-parse".to_string(),
        }
    }
}

impl LoggingConfig {
    /// 以指定级别创建仅控制台输出的配置
    pub fn console(level: &str) -> Self {
        Self {
            level: level.to_string(),
            ..Default::default()
        }
    }

    /// 以 -v 计数选择级别: 0=info, 1=debug, 2+=trace
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        Self::console(level)
    }

    /// 设置 `TAO_LOG` 时以环境变量为准
    fn filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_env("TAO_LOG") {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level)
            .with_context(|| format!("日志过滤指令非法, level={}", self.level))
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 初始化全局日志, 进程内只能成功调用一次
pub fn init(config: &LoggingConfig) -> Result<()> {
    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .event_format(ConsoleFormatter)
        .with_filter(config.filter()?);

    let file_layer = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("创建日志目录失败, path={}", directory))?;
            let appender = tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix(&config.file_prefix)
                .filename_suffix("log")
                .build(Path::new(directory))
                .with_context(|| format!("创建日志文件失败, directory={}", directory))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            LOG_GUARD.set(guard).ok();
            Some(
                fmt::Layer::default()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(FileFormatter)
                    .with_filter(config.filter()?),
            )
        }
        None => None,
    };

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("日志系统已初始化")?;

    Ok(())
}

fn write_timestamp(writer: &mut Writer<'_>) -> std::fmt::Result {
    let now = Local::now();
    write!(
        writer,
        "[{:02}-{:02} {:02}:{:02}:{:02}.{:03}] ",
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.timestamp_subsec_millis()
    )
}

struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        write_timestamp(&mut writer)?;
        let color = match *meta.level() {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            _ => "\x1b[34m",
        };
        write!(
            writer,
            "{}{:5}\x1b[0m {} > ",
            color,
            meta.level().to_string(),
            meta.target()
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        write_timestamp(&mut writer)?;
        write!(
            writer,
            "{:5} {} > ",
            meta.level().to_string(),
            meta.target()
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.directory.is_none());
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: LoggingConfig =
            serde_json::from_str(r#"{"level": "tao_parser=trace", "directory": "logs"}"#)
                .unwrap();
        assert_eq!(config.level, "tao_parser=trace");
        assert_eq!(config.directory.as_deref(), Some("logs"));
        assert_eq!(config.file_prefix, "tao-parse");
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LoggingConfig::from_verbosity(0).level, "info");
        assert_eq!(LoggingConfig::from_verbosity(1).level, "debug");
        assert_eq!(LoggingConfig::from_verbosity(3).level, "trace");
        assert_eq!(LoggingConfig::console("warn").level, "warn");
    }
}
