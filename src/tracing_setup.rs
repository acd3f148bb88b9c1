use std::{fs, io, path::Path};

use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// How events are rendered on stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StdoutFormat {
    /// Level and message only.
    Compact,
    /// Timestamps and targets, for `-v`.
    Full,
    Json,
    /// Indented JSON, one event per block.
    PrettyJson,
}

impl StdoutFormat {
    pub fn from_flags(verbose: bool, log_json: bool, pretty: bool) -> Self {
        match (log_json, pretty, verbose) {
            (true, true, _) => Self::PrettyJson,
            (true, false, _) => Self::Json,
            (false, _, true) => Self::Full,
            (false, _, false) => Self::Compact,
        }
    }
}

/// Installs the global subscriber.
///
/// `run_log` adds a DEBUG-level JSON file layer for a sweep; the returned guard
/// must outlive every event so that file gets flushed.
pub fn init(format: StdoutFormat, verbose: bool, run_log: Option<&Path>) -> Option<WorkerGuard> {
    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_env_filter(verbose));

    let stdout_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        StdoutFormat::Compact => fmt::layer()
            .with_writer(io::stdout)
            .without_time()
            .with_target(false)
            .with_filter(stdout_filter)
            .boxed(),
        StdoutFormat::Full => fmt::layer()
            .with_writer(io::stdout)
            .with_filter(stdout_filter)
            .boxed(),
        StdoutFormat::Json => fmt::layer()
            .json()
            .with_writer(io::stdout)
            .with_filter(stdout_filter)
            .boxed(),
        StdoutFormat::PrettyJson => fmt::layer()
            .json()
            .with_writer(|| PrettyJsonWriter::new(io::stdout()))
            .with_filter(stdout_filter)
            .boxed(),
    };

    let (file_writer, guard) = match run_log.map(open_run_log) {
        Some(Ok((writer, guard))) => (Some(writer), Some(guard)),
        Some(Err(err)) => {
            eprintln!("Warning: run log disabled: {err}");
            (None, None)
        }
        None => (None, None),
    };
    let file_layer = file_writer.map(|writer| {
        fmt::layer().json().with_writer(writer).with_filter(
            Targets::new()
                .with_target("contextsweep", Level::DEBUG)
                .with_default(Level::INFO),
        )
    });

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

fn open_run_log(path: &Path) -> io::Result<(NonBlocking, WorkerGuard)> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    fs::create_dir_all(dir)
        .map_err(|err| io::Error::new(err.kind(), format!("{}: {err}", dir.display())))?;
    Ok(tracing_appender::non_blocking(
        tracing_appender::rolling::never(dir, file_name),
    ))
}

/// Re-renders each single-line JSON event as indented JSON.
struct PrettyJsonWriter<W: io::Write> {
    inner: W,
}

impl<W: io::Write> PrettyJsonWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: io::Write> io::Write for PrettyJsonWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let event = std::str::from_utf8(buf)
            .ok()
            .and_then(|text| serde_json::from_str::<serde_json::Value>(text.trim()).ok())
            .filter(serde_json::Value::is_object);
        match event {
            Some(event) => {
                serde_json::to_writer_pretty(&mut self.inner, &event)?;
                self.inner.write_all(b"\n")?;
                Ok(buf.len())
            }
            None => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn default_env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::new(if verbose {
        "contextsweep=debug,rig_core=warn,info"
    } else {
        "contextsweep=info,rig_core=warn,warn"
    })
}
