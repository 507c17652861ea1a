//! The logger core

use crate::caller::{CallerResolver, FrameFilter};
use crate::color::ColorFormatter;
use crate::dispatch::HookDispatcher;
use crate::event::{fields_from_pairs, FieldValue, Fields, LogEvent};
use crate::formatter::{Formatter, TextFormatter};
use crate::{Error, Level, LevelSet, Result, Sink};

use std::fmt::{self, Display};
use std::fs::File;
use std::io::{self, Write};
use std::panic::Location;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::warn;

/// Called by [`Logger::fatal`] after the event has been written.
pub type ExitHandler = fn(i32);

/// Frames from the top of the stack that are skipped before the caller
/// search starts. Only the resolver's own frame; the remaining frames of the
/// logger's call chain are rejected by the frame filter.
const CALLER_SKIP_FRAMES: usize = 1;

struct Shared {
    level: RwLock<Level>,
    formatter: RwLock<Arc<dyn Formatter>>,
    output: Mutex<Box<dyn Write + Send>>,
    dispatcher: RwLock<Arc<HookDispatcher>>,
    caller_context: AtomicBool,
    resolver: CallerResolver,
    exit: ExitHandler,
}

/// A leveled, structured logger.
///
/// Clones are cheap and share configuration, output and sinks; only the base
/// fields added through [`with_field`](Logger::with_field) and friends are
/// per clone.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
    fields: Fields,
}

impl Logger {
    /// Starts building a logger.
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Current threshold
    pub fn level(&self) -> Level {
        *self.shared.level.read()
    }

    /// Sets the threshold.
    ///
    /// Debug and Trace also switch to [`ColorFormatter`] and turn caller
    /// context on.
    pub fn set_level(&self, level: Level) {
        *self.shared.level.write() = level;
        if level.is_verbose() {
            self.set_formatter(ColorFormatter::new());
            self.enable_caller_context();
        }
    }

    /// Parses `name` and sets the threshold.
    pub fn set_level_name(&self, name: &str) -> Result<()> {
        self.set_level(name.parse()?);
        Ok(())
    }

    /// Returns true if an event at `level` would be emitted.
    #[inline(always)]
    pub fn is_enabled(&self, level: Level) -> bool {
        level.is_enabled_static() && level.is_at_least(self.level())
    }

    /// Replaces the formatter used for this logger's own output.
    pub fn set_formatter(&self, formatter: impl Formatter) {
        *self.shared.formatter.write() = Arc::new(formatter);
    }

    /// Replaces the output stream.
    pub fn set_output(&self, output: impl Write + Send + 'static) {
        *self.shared.output.lock() = Box::new(output);
    }

    /// Discards this logger's own output. Sinks still receive events.
    pub fn set_null_output(&self) {
        self.set_output(io::sink());
    }

    /// Registers a sink for the levels it reports.
    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        Arc::make_mut(&mut *self.shared.dispatcher.write()).register(sink);
    }

    /// Registers a sink for an explicit level set.
    pub fn add_sink_with_levels(&self, sink: Arc<dyn Sink>, levels: LevelSet) {
        Arc::make_mut(&mut *self.shared.dispatcher.write()).register_with_levels(sink, levels);
    }

    /// Attaches `func` and `src` to every emitted event from now on.
    pub fn enable_caller_context(&self) {
        self.shared.caller_context.store(true, Ordering::Relaxed);
    }

    /// Returns true if caller context is attached to events.
    pub fn caller_context_enabled(&self) -> bool {
        self.shared.caller_context.load(Ordering::Relaxed)
    }

    /// A logger sharing this one's configuration, with one more base field.
    #[must_use]
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let mut logger = self.clone();
        logger.fields.insert(key.into(), value.into());
        logger
    }

    /// A logger sharing this one's configuration, with more base fields.
    #[must_use]
    pub fn with_fields(&self, fields: Fields) -> Self {
        let mut logger = self.clone();
        logger.fields.extend(fields);
        logger
    }

    /// Like [`with_fields`](Self::with_fields), from alternating keys and values.
    ///
    /// # Panics
    ///
    /// Panics if `pairs` has an odd number of elements.
    #[must_use]
    pub fn with_field_pairs(&self, pairs: &[&str]) -> Self {
        self.with_fields(fields_from_pairs(pairs))
    }

    /// Base fields attached to every event
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Returns true if both loggers share the same core.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Logs `message` at `level`.
    #[track_caller]
    pub fn log(&self, level: Level, message: impl Display) {
        if !self.is_enabled(level) {
            return;
        }
        self.emit(level, message.to_string(), Location::caller());
    }

    /// Logs at Trace.
    #[track_caller]
    pub fn trace(&self, message: impl Display) {
        self.log(Level::Trace, message);
    }

    /// Logs at Debug.
    #[track_caller]
    pub fn debug(&self, message: impl Display) {
        self.log(Level::Debug, message);
    }

    /// Logs at Info.
    #[track_caller]
    pub fn info(&self, message: impl Display) {
        self.log(Level::Info, message);
    }

    /// Logs at Warn.
    #[track_caller]
    pub fn warn(&self, message: impl Display) {
        self.log(Level::Warn, message);
    }

    /// Logs at Error.
    #[track_caller]
    pub fn error(&self, message: impl Display) {
        self.log(Level::Error, message);
    }

    /// Logs at Fatal, then calls the exit handler with status 1.
    #[track_caller]
    pub fn fatal(&self, message: impl Display) {
        self.log(Level::Fatal, message);
        (self.shared.exit)(1);
    }

    /// Logs at Panic, then panics with the message.
    #[track_caller]
    pub fn panic(&self, message: impl Display) -> ! {
        let message = message.to_string();
        self.log(Level::Panic, &message);
        panic!("{message}");
    }

    /// Closes every registered sink and flushes the output.
    pub fn close(&self) -> Result<()> {
        let dispatcher = self.shared.dispatcher.read().clone();
        let closed = dispatcher.close_all();
        self.shared
            .output
            .lock()
            .flush()
            .map_err(|source| Error::Io {
                context: "flushing logger output".to_string(),
                source,
            })?;
        closed
    }

    fn emit(&self, level: Level, message: String, location: &Location<'_>) {
        let mut event = LogEvent::new(level, message).with_fields(self.fields.clone());
        if self.caller_context_enabled() {
            let caller = self.shared.resolver.resolve_or(CALLER_SKIP_FRAMES, location);
            event = event.with_caller(&caller);
        }

        let dispatcher = self.shared.dispatcher.read().clone();
        if let Err(error) = dispatcher.fire(&event) {
            warn!(%error, "failed to deliver log event");
        }

        let formatter = self.shared.formatter.read().clone();
        let line = formatter.format(&event);
        if let Err(error) = self.shared.output.lock().write_all(&line) {
            warn!(%error, "failed to write log output");
        }
    }

    fn from_parts(parts: Parts) -> Self {
        let mut dispatcher = HookDispatcher::new();
        for (sink, levels) in parts.sinks {
            match levels {
                Some(levels) => dispatcher.register_with_levels(sink, levels),
                None => dispatcher.register(sink),
            }
        }

        Self {
            shared: Arc::new(Shared {
                level: RwLock::new(parts.level),
                formatter: RwLock::new(parts.formatter),
                output: Mutex::new(parts.output),
                dispatcher: RwLock::new(Arc::new(dispatcher)),
                caller_context: AtomicBool::new(parts.caller_context),
                resolver: CallerResolver::new(parts.filter),
                exit: parts.exit,
            }),
            fields: parts.fields,
        }
    }
}

impl Default for Logger {
    /// Info threshold, text output on stderr, no sinks.
    fn default() -> Self {
        Self::from_parts(Parts::default())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("caller_context", &self.caller_context_enabled())
            .field("fields", &self.fields)
            .field("sinks", &*self.shared.dispatcher.read())
            .finish()
    }
}

fn exit_process(code: i32) {
    std::process::exit(code)
}

struct Parts {
    level: Level,
    formatter: Arc<dyn Formatter>,
    output: Box<dyn Write + Send>,
    fields: Fields,
    sinks: Vec<(Arc<dyn Sink>, Option<LevelSet>)>,
    caller_context: bool,
    filter: FrameFilter,
    exit: ExitHandler,
}

impl Default for Parts {
    fn default() -> Self {
        Self {
            level: Level::Info,
            formatter: Arc::new(TextFormatter::new()),
            output: Box::new(io::stderr()),
            fields: Fields::new(),
            sinks: Vec::new(),
            caller_context: false,
            filter: FrameFilter::default(),
            exit: exit_process,
        }
    }
}

enum LevelChoice {
    Level(Level),
    Name(String),
}

enum OutputChoice {
    Writer(Box<dyn Write + Send>),
    File(PathBuf),
}

/// Builder for [`Logger`].
///
/// Options apply in call order: `runtime_context()` followed by
/// `formatter(..)` keeps the explicit formatter, the reverse order keeps the
/// runtime-context formatter.
#[derive(Default)]
pub struct LoggerBuilder {
    level: Option<LevelChoice>,
    formatter: Option<Arc<dyn Formatter>>,
    output: Option<OutputChoice>,
    fields: Fields,
    sinks: Vec<(Arc<dyn Sink>, Option<LevelSet>)>,
    runtime_context: bool,
    filter: Option<FrameFilter>,
    exit: Option<ExitHandler>,
}

impl LoggerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the threshold. Debug and Trace also enable caller context.
    #[must_use]
    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(LevelChoice::Level(level));
        self
    }

    /// Sets the threshold by name; parsed by [`build`](Self::build).
    #[must_use]
    pub fn level_name(mut self, name: impl Into<String>) -> Self {
        self.level = Some(LevelChoice::Name(name.into()));
        self
    }

    /// Sets the formatter.
    #[must_use]
    pub fn formatter(mut self, formatter: impl Formatter) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    /// Enables caller context and switches to colored text output.
    #[must_use]
    pub fn runtime_context(mut self) -> Self {
        self.runtime_context = true;
        self.formatter = Some(Arc::new(TextFormatter::new().force_colors(true)));
        self
    }

    /// Writes the logger's own output to `output`.
    #[must_use]
    pub fn output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Some(OutputChoice::Writer(Box::new(output)));
        self
    }

    /// Discards the logger's own output.
    #[must_use]
    pub fn null_output(self) -> Self {
        self.output(io::sink())
    }

    /// Writes the logger's own output to `path`, created or truncated by
    /// [`build`](Self::build).
    #[must_use]
    pub fn file_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(OutputChoice::File(path.into()));
        self
    }

    /// Adds a base field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Adds base fields.
    #[must_use]
    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Adds base fields from alternating keys and values.
    ///
    /// # Panics
    ///
    /// Panics if `pairs` has an odd number of elements.
    #[must_use]
    pub fn field_pairs(self, pairs: &[&str]) -> Self {
        self.fields(fields_from_pairs(pairs))
    }

    /// Registers a sink for the levels it reports.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push((sink, None));
        self
    }

    /// Registers a sink for an explicit level set.
    #[must_use]
    pub fn sink_with_levels(mut self, sink: Arc<dyn Sink>, levels: impl Into<LevelSet>) -> Self {
        self.sinks.push((sink, Some(levels.into())));
        self
    }

    /// Replaces the frame filter used for caller context.
    #[must_use]
    pub fn frame_filter(mut self, filter: FrameFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Replaces what [`Logger::fatal`] calls after logging.
    #[must_use]
    pub fn exit_handler(mut self, exit: ExitHandler) -> Self {
        self.exit = Some(exit);
        self
    }

    /// Builds the logger.
    pub fn build(self) -> Result<Logger> {
        let defaults = Parts::default();

        let level = match self.level {
            None => defaults.level,
            Some(LevelChoice::Level(level)) => level,
            Some(LevelChoice::Name(name)) => name.parse()?,
        };

        let output = match self.output {
            None => defaults.output,
            Some(OutputChoice::Writer(writer)) => writer,
            Some(OutputChoice::File(path)) => {
                let file = File::create(&path).map_err(|source| Error::Io {
                    context: format!("creating log file {}", path.display()),
                    source,
                })?;
                Box::new(file)
            }
        };

        Ok(Logger::from_parts(Parts {
            level,
            formatter: self.formatter.unwrap_or(defaults.formatter),
            output,
            fields: self.fields,
            sinks: self.sinks,
            caller_context: self.runtime_context || level.is_verbose(),
            filter: self.filter.unwrap_or(defaults.filter),
            exit: self.exit.unwrap_or(defaults.exit),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySink, SharedBuffer};

    use std::sync::atomic::AtomicI32;

    static EXIT_CODE: AtomicI32 = AtomicI32::new(-1);

    fn record_exit(code: i32) {
        EXIT_CODE.store(code, Ordering::SeqCst);
    }

    #[test]
    fn test_fatal_calls_exit_handler() {
        let buffer = SharedBuffer::new();
        let logger = Logger::builder()
            .output(buffer.clone())
            .exit_handler(record_exit)
            .build()
            .unwrap();

        logger.fatal("cannot continue");
        assert_eq!(EXIT_CODE.load(Ordering::SeqCst), 1);
        assert!(buffer.contains("level=fatal"));
        assert!(buffer.contains("cannot continue"));
    }

    #[test]
    #[should_panic(expected = "invariant broken")]
    fn test_panic_level_panics() {
        let logger = Logger::builder().null_output().build().unwrap();
        logger.panic("invariant broken");
    }

    #[test]
    fn test_builder_level_name() {
        let logger = Logger::builder().level_name("warning").build().unwrap();
        assert_eq!(logger.level(), Level::Warn);
        assert!(!logger.caller_context_enabled());

        let error = Logger::builder().level_name("loud").build().unwrap_err();
        assert!(matches!(error, Error::InvalidLevel(name) if name == "loud"));
    }

    #[test]
    fn test_verbose_level_enables_caller_context() {
        let logger = Logger::builder().level(Level::Debug).build().unwrap();
        assert!(logger.caller_context_enabled());

        let logger = Logger::builder().null_output().build().unwrap();
        assert!(!logger.caller_context_enabled());
        logger.set_level(Level::Trace);
        assert!(logger.caller_context_enabled());
        assert_eq!(logger.level(), Level::Trace);
    }

    #[test]
    fn test_child_fields_do_not_leak() {
        let sink = MemorySink::new();
        let parent = Logger::builder()
            .null_output()
            .field("service", "api")
            .sink(Arc::new(sink.clone()))
            .build()
            .unwrap();
        let child = parent.with_field("request", 7);

        child.info("child");
        parent.info("parent");

        let events = sink.events();
        assert_eq!(events[0].field("request"), Some(&FieldValue::from(7)));
        assert_eq!(events[0].field("service"), Some(&FieldValue::from("api")));
        assert_eq!(events[1].field("request"), None);
        assert!(parent.ptr_eq(&child));
    }

    #[test]
    fn test_sinks_added_after_build() {
        let logger = Logger::builder().null_output().build().unwrap();
        let sink = MemorySink::new();
        logger.add_sink_with_levels(Arc::new(sink.clone()), LevelSet::only(Level::Error));

        logger.warn("ignored");
        logger.error("kept");
        assert_eq!(sink.messages(), vec!["kept".to_string()]);
    }

    #[test]
    fn test_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let logger = Logger::builder().file_output(&path).build().unwrap();
        logger.info("to the file");
        logger.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("msg=\"to the file\""));

        let missing = dir.path().join("missing").join("out.log");
        assert!(matches!(
            Logger::builder().file_output(missing).build(),
            Err(Error::Io { .. })
        ));
    }
}
