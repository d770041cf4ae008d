//! Tracing subscriber setup.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::{Error, Result};

static NONBLOCKING_WORK_GUARD_KEEP: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Off,
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<Rotation> for tracing_appender::rolling::Rotation {
    fn from(rotation: Rotation) -> Self {
        match rotation {
            Rotation::Minutely => Self::MINUTELY,
            Rotation::Hourly => Self::HOURLY,
            Rotation::Daily => Self::DAILY,
            Rotation::Never => Self::NEVER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAppender {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: Format,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default = "default_dir")]
    pub dir: String,
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,
}

fn default_dir() -> String {
    "./logs".to_string()
}

fn default_filename_prefix() -> String {
    "taxosim".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: Format,
    /// Raw `EnvFilter` directives replacing the level, e.g.
    /// `taxosim=debug,warn`.
    #[serde(default)]
    pub override_filter: Option<String>,
    #[serde(default)]
    pub file_appender: Option<FileAppender>,
}

fn default_enable() -> bool {
    true
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enable: true,
            level: LogLevel::default(),
            format: Format::default(),
            override_filter: None,
            file_appender: None,
        }
    }
}

fn filter(level: LogLevel, override_filter: Option<&str>) -> Result<EnvFilter> {
    let directives = override_filter.map_or_else(|| format!("taxosim={}", level.as_str()), str::to_string);
    EnvFilter::try_new(&directives)
        .map_err(|err| Error::Configuration(format!("invalid log filter `{directives}`: {err}")))
}

fn fmt_layer<S, W>(format: Format, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_ansi(ansi).with_writer(writer);
    match format {
        Format::Compact => layer.compact().boxed(),
        Format::Pretty => layer.pretty().boxed(),
        Format::Json => layer.json().boxed(),
    }
}

/// Installs the global subscriber described by `config`.
///
/// A disabled logger installs nothing. A second call leaves the first
/// subscriber in place and reports it.
///
/// # Errors
///
/// Fails with [`Error::Configuration`] on an invalid filter.
pub fn init(config: &LoggerConfig) -> Result<()> {
    if !config.enable {
        return Ok(());
    }

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if let Some(appender) = config.file_appender.as_ref().filter(|appender| appender.enable) {
        let rolling = tracing_appender::rolling::RollingFileAppender::new(
            appender.rotation.into(),
            &appender.dir,
            &appender.filename_prefix,
        );
        let (writer, guard) = tracing_appender::non_blocking(rolling);
        if NONBLOCKING_WORK_GUARD_KEEP.set(guard).is_err() {
            eprintln!("cannot keep the file appender guard, file logs may be lost on exit");
        }
        layers.push(
            fmt_layer::<Registry, _>(appender.format, writer, false)
                .with_filter(filter(appender.level, None)?)
                .boxed(),
        );
    }

    layers.push(
        fmt_layer::<Registry, _>(config.format, std::io::stdout, true)
            .with_filter(filter(config.level, config.override_filter.as_deref())?)
            .boxed(),
    );

    if let Err(err) = tracing_subscriber::registry().with(layers).try_init() {
        eprintln!("tracing subscriber already installed: {err}");
    }
    Ok(())
}
