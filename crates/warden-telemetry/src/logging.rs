//! Subscriber construction.
//!
//! [`LogConfig`] describes one `fmt` layer: a filter (base level plus
//! per-target directives), a format, and where the lines go.
//! [`setup_logging`] installs it as the global subscriber.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{TelemetryError, TelemetryResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// How often a log file is started afresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    /// One file per day.
    #[default]
    Daily,
    /// One file per hour.
    Hourly,
    /// A single file.
    Never,
}

impl From<FileRotation> for Rotation {
    fn from(rotation: FileRotation) -> Self {
        match rotation {
            FileRotation::Daily => Self::DAILY,
            FileRotation::Hourly => Self::HOURLY,
            FileRotation::Never => Self::NEVER,
        }
    }
}

/// Line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, for terminals.
    #[default]
    Pretty,
    /// One short line per event.
    Compact,
    /// One JSON object per event.
    Json,
    /// The `tracing-subscriber` default.
    Full,
}

impl LogFormat {
    /// Name as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
            Self::Full => "full",
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> TelemetryResult<Self> {
        [Self::Pretty, Self::Compact, Self::Json, Self::Full]
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TelemetryError::Setting(format!("unknown log format {s:?}")))
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// Rolling files in this directory.
    File(PathBuf),
}

/// Naming and retention for [`LogTarget::File`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    /// File name prefix; files are named `<prefix>.<date>.log`.
    pub prefix: String,
    /// Rotation period.
    pub rotation: FileRotation,
    /// Files to keep; 0 keeps all of them.
    pub max_files: usize,
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            prefix: "warden".to_owned(),
            rotation: FileRotation::Daily,
            max_files: 0,
        }
    }
}

/// One `fmt` layer's worth of settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base filter, e.g. `info` or `warn,warden_engine=debug`.
    pub level: String,
    /// Line format.
    pub format: LogFormat,
    /// Destination.
    pub target: LogTarget,
    /// File settings, used with [`LogTarget::File`].
    pub file: FileLogConfig,
    /// Prefix lines with a timestamp.
    pub timestamps: bool,
    /// Colour output. Forced off for files.
    pub ansi: bool,
    /// Extra directives layered over `level`.
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
            target: LogTarget::Stderr,
            file: FileLogConfig::default(),
            timestamps: true,
            ansi: true,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Settings at `level`, otherwise default.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Use `format`.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Write to `target`.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Write rolling files `<prefix>.*.log` under `directory`.
    #[must_use]
    pub fn with_file_logging(
        mut self,
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        rotation: FileRotation,
    ) -> Self {
        self.target = LogTarget::File(directory.into());
        self.file.prefix = prefix.into();
        self.file.rotation = rotation;
        self
    }

    /// Add a directive such as `warden_engine=trace`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Omit timestamps.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Omit colour codes.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    fn filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::Setting(format!("level {:?}: {e}", self.level)))?;
        for raw in &self.directives {
            let directive: Directive = raw
                .parse()
                .map_err(|e| TelemetryError::Setting(format!("directive {raw:?}: {e}")))?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }

    fn writer(&self) -> TelemetryResult<BoxMakeWriter> {
        let dir = match &self.target {
            LogTarget::Stdout => return Ok(BoxMakeWriter::new(std::io::stdout)),
            LogTarget::Stderr => return Ok(BoxMakeWriter::new(std::io::stderr)),
            LogTarget::File(dir) => dir,
        };
        std::fs::create_dir_all(dir)?;
        let builder = RollingFileAppender::builder()
            .rotation(self.file.rotation.into())
            .filename_prefix(&self.file.prefix)
            .filename_suffix("log");
        let builder = match self.file.max_files {
            0 => builder,
            n => builder.max_log_files(n),
        };
        let appender = builder
            .build(dir)
            .map_err(|e| TelemetryError::Install(e.to_string()))?;
        Ok(BoxMakeWriter::new(appender))
    }

    fn layer(&self) -> TelemetryResult<BoxedLayer> {
        let filter = self.filter()?;
        let ansi = self.ansi && !matches!(self.target, LogTarget::File(_));
        let base = tracing_subscriber::fmt::layer()
            .with_writer(self.writer()?)
            .with_ansi(ansi)
            .with_target(true);

        let layer: BoxedLayer = match (self.format, self.timestamps) {
            (LogFormat::Pretty, true) => base.pretty().with_filter(filter).boxed(),
            (LogFormat::Pretty, false) => base.pretty().without_time().with_filter(filter).boxed(),
            (LogFormat::Compact, true) => base.compact().with_filter(filter).boxed(),
            (LogFormat::Compact, false) => {
                base.compact().without_time().with_filter(filter).boxed()
            },
            (LogFormat::Json, true) => base.json().with_filter(filter).boxed(),
            (LogFormat::Json, false) => base.json().without_time().with_filter(filter).boxed(),
            (LogFormat::Full, true) => base.with_filter(filter).boxed(),
            (LogFormat::Full, false) => base.without_time().with_filter(filter).boxed(),
        };
        Ok(layer)
    }
}

#[cfg(feature = "config")]
impl TryFrom<&warden_config::LoggingConfig> for LogConfig {
    type Error = TelemetryError;

    fn try_from(cfg: &warden_config::LoggingConfig) -> TelemetryResult<Self> {
        Ok(Self {
            level: cfg.level.clone(),
            format: cfg.format.parse()?,
            directives: cfg.directives.clone(),
            ..Self::default()
        })
    }
}

/// Install `config` as the global subscriber.
///
/// # Errors
///
/// [`TelemetryError::Setting`] for a bad filter, [`TelemetryError::Io`] if
/// the log directory cannot be created, and [`TelemetryError::Install`] if
/// a global subscriber is already set.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    tracing_subscriber::registry()
        .with(config.layer()?)
        .try_init()
        .map_err(|e| TelemetryError::Install(e.to_string()))
}

/// [`setup_logging`] with [`LogConfig::default`].
///
/// # Errors
///
/// As [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}
