//! Program logging.
//!
//! Progress and warnings go to the terminal. When a run has an output folder, messages are also
//! written to log files there, split by severity, so that the path-share corrections and failed
//! scenarios of a batch can be reviewed after the run. Per-generation detail (resolved survival
//! curves and so on) is only logged at the `debug` level and gets its own file.
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{Level, LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The default log level for the program.
///
/// Used as a fallback if the user hasn't specified something else with the PVFLOW_LOG_LEVEL
/// environment variable or the settings.toml file.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable which overrides the log level in the settings file
const LOG_LEVEL_ENV_VAR: &str = "PVFLOW_LOG_LEVEL";

/// A log file in the output folder and the levels of message it receives
struct LogFile {
    name: &'static str,
    levels: RangeInclusive<Level>,
}

/// Log files written for a run. Errors and warnings are kept apart from progress messages.
const LOG_FILES: [LogFile; 3] = [
    LogFile {
        name: "pvflow_error.log",
        levels: Level::Error..=Level::Warn,
    },
    LogFile {
        name: "pvflow_info.log",
        levels: Level::Info..=Level::Info,
    },
    LogFile {
        name: "pvflow_debug.log",
        levels: Level::Debug..=Level::Trace,
    },
];

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger.
///
/// The level is taken from the `PVFLOW_LOG_LEVEL` environment variable if set, otherwise from the
/// settings file, otherwise `info`. Accepted values are `off`, `error`, `warn`, `info`, `debug` and
/// `trace` (case-insensitive).
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_file_path`: The folder to save log files in. If `None`, no log files are written.
pub fn init(log_level_from_settings: Option<&str>, log_file_path: Option<&Path>) -> Result<()> {
    let log_level = resolve_log_level(
        env::var(LOG_LEVEL_ENV_VAR).ok().as_deref(),
        log_level_from_settings,
    )?;

    let mut dispatch = console_dispatch(log_level);
    if let Some(log_file_path) = log_file_path {
        for log_file in &LOG_FILES {
            if let Some(file_dispatch) = file_dispatch(log_file_path, log_file, log_level)? {
                dispatch = dispatch.chain(file_dispatch);
            }
        }
    }

    dispatch.apply().context("Logger already initialised")?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

/// Choose the log level from the environment variable, the settings file or the default, in that
/// order of precedence
fn resolve_log_level(from_env: Option<&str>, from_settings: Option<&str>) -> Result<LevelFilter> {
    let log_level = from_env.or(from_settings).unwrap_or(DEFAULT_LOG_LEVEL);
    LevelFilter::from_str(log_level).map_err(|_| anyhow!("Unknown log level: {log_level}"))
}

/// Terminal output: warnings and errors to stderr, everything else to stdout.
///
/// Colours are only used if the stream is a terminal.
fn console_dispatch(log_level: LevelFilter) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let stdout_colours = io::stdout().is_terminal().then_some(colours);
    let stderr_colours = io::stderr().is_terminal().then_some(colours);

    Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > Level::Warn)
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, stdout_colours.as_ref());
                })
                .level(log_level)
                .chain(io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, stderr_colours.as_ref());
                })
                .level(log_level.min(LevelFilter::Warn))
                .chain(io::stderr()),
        )
}

/// Output to one of the log files in the output folder.
///
/// Progress is always logged to file, even if the terminal is quieter. Returns `None` for a file
/// which would receive no messages at this level.
fn file_dispatch(
    log_file_path: &Path,
    log_file: &LogFile,
    log_level: LevelFilter,
) -> Result<Option<Dispatch>> {
    let level = log_level.max(LevelFilter::Info);
    if *log_file.levels.start() > level {
        return Ok(None);
    }

    let file_path = log_file_path.join(log_file.name);
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&file_path)
        .with_context(|| format!("Could not create log file {}", file_path.display()))?;
    let levels = log_file.levels.clone();

    Ok(Some(
        Dispatch::new()
            .filter(move |metadata| levels.contains(&metadata.level()))
            .format(write_log_plain)
            .level(level)
            .chain(file),
    ))
}

/// Write a log line as `[time level module] message`.
///
/// The crate name is dropped from the module path, so engine messages show e.g. `simulation`.
fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");
    let module = target.strip_prefix("pvflow::").unwrap_or(target);

    out.finish(format_args!("[{timestamp} {level} {module}] {message}"));
}

fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record.target(), message);
}

fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<&ColoredLevelConfig>,
) {
    match colours {
        Some(colours) => write_log(out, colours.color(record.level()), record.target(), message),
        None => write_log_plain(out, message, record),
    }
}
