//! Call-site resolution
//!
//! Walks the current thread's stack and reports the first frame that belongs
//! to application code, skipping frames from the logging crates themselves,
//! the standard library, the test harness and process entry glue.

use std::panic::Location;
use std::path::{Component, Path};

/// Maximum number of frames examined after the skipped ones.
pub const MAX_CALLER_DEPTH: usize = 15;

const DEFAULT_MODULES: &[&str] = &[
    "hooklog_logger",
    "hooklog_logger_file",
    "std",
    "core",
    "alloc",
    "backtrace",
    "test",
    "log",
    "__rust_begin_short_backtrace",
    "__rust_end_short_backtrace",
    "__rust_try",
    "__libc_start_main",
    "__libc_start_call_main",
    "_start",
    "main",
];

const DEFAULT_FILES: &[&str] = &["/rustc/"];

/// A function symbol split into the parts used for the `func` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionName {
    /// Fully qualified symbol, without the hash suffix.
    pub path: String,
    /// Last path segment before the function name.
    pub package: String,
    /// Function name without its path.
    pub name: String,
}

impl FunctionName {
    /// Splits a demangled symbol.
    ///
    /// Closure segments are folded into the enclosing function, so
    /// `app::run::{{closure}}` reads as `app::run`. Returns `None` if the
    /// symbol has no path separator.
    pub fn parse(symbol: &str) -> Option<Self> {
        let mut path = symbol;
        let (prefix, name) = loop {
            let (prefix, name) = split_last_segment(path)?;
            if !is_closure_segment(name) {
                break (prefix, name);
            }
            path = prefix;
        };
        Some(Self {
            path: symbol.to_string(),
            package: last_segment(owner_path(prefix)).to_string(),
            name: name.to_string(),
        })
    }
}

/// The resolved call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerInfo {
    /// The calling function, when its symbol could be read.
    pub function: Option<FunctionName>,
    /// Source file, reduced to its last two path components.
    pub file: String,
    /// Source line.
    pub line: u32,
}

impl CallerInfo {
    /// Builds caller info from a demangled symbol and its location.
    ///
    /// Returns `None` if the symbol has no path separator.
    pub fn from_parts(symbol: &str, file: &Path, line: u32) -> Option<Self> {
        Some(Self {
            function: Some(FunctionName::parse(symbol)?),
            file: normalize_file(file),
            line,
        })
    }

    /// Builds caller info from a compiler-tracked location.
    pub fn from_location(location: &Location<'_>, function: Option<FunctionName>) -> Self {
        Self {
            function,
            file: normalize_file(Path::new(location.file())),
            line: location.line(),
        }
    }

    /// Value of the `func` field: `package::function`.
    pub fn func_field(&self) -> Option<String> {
        self.function
            .as_ref()
            .map(|function| format!("{}::{}", function.package, function.name))
    }

    /// Value of the `src` field: `file:line`.
    pub fn src_field(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// Decides which frames count as logging infrastructure.
///
/// Module entries match whole path segments: `std` rejects
/// `std::io::stdio::print` but not `stdlib::print`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFilter {
    modules: Vec<String>,
    files: Vec<String>,
}

impl FrameFilter {
    /// A filter that rejects nothing.
    pub fn empty() -> Self {
        Self {
            modules: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Rejects symbols under `prefix`.
    #[must_use]
    pub fn exclude_module(mut self, prefix: impl Into<String>) -> Self {
        self.modules.push(prefix.into());
        self
    }

    /// Rejects frames whose file path contains `fragment`.
    #[must_use]
    pub fn exclude_file(mut self, fragment: impl Into<String>) -> Self {
        self.files.push(fragment.into());
        self
    }

    /// Returns true if the symbol belongs to an excluded module.
    pub fn rejects_symbol(&self, symbol: &str) -> bool {
        let path = owner_path(symbol);
        self.modules
            .iter()
            .any(|prefix| has_module_prefix(path, prefix))
    }

    /// Returns true if the frame should be skipped.
    pub fn rejects(&self, symbol: &str, file: &Path) -> bool {
        if self.rejects_symbol(symbol) {
            return true;
        }
        let file = file.to_string_lossy();
        self.files
            .iter()
            .any(|fragment| file.contains(fragment.as_str()))
    }
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self {
            modules: DEFAULT_MODULES.iter().map(ToString::to_string).collect(),
            files: DEFAULT_FILES.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Finds the application frame that issued a logging call.
#[derive(Debug, Clone, Default)]
pub struct CallerResolver {
    filter: FrameFilter,
}

impl CallerResolver {
    /// Creates a resolver with a custom filter.
    pub fn new(filter: FrameFilter) -> Self {
        Self { filter }
    }

    /// The active filter.
    pub fn filter(&self) -> &FrameFilter {
        &self.filter
    }

    /// Resolves the caller from the stack alone.
    ///
    /// Frames belonging to the stack walker are never counted. Counting
    /// starts at this function's own frame, so `skip_frames == 1` starts the
    /// search at whoever called `resolve`. At most [`MAX_CALLER_DEPTH`]
    /// frames are examined after the skipped ones. Inlined functions count
    /// as frames of their own.
    ///
    /// Needs file and line debuginfo; see [`resolve_or`](Self::resolve_or)
    /// for builds without it.
    #[inline(never)]
    pub fn resolve(&self, skip_frames: usize) -> Option<CallerInfo> {
        self.walk(skip_frames + 1).located
    }

    /// Resolves the caller, falling back to `location` for the source
    /// position.
    ///
    /// A fully resolved frame wins. Otherwise the first accepted frame that
    /// only has a symbol supplies `func`, and `location` supplies `src`.
    /// Skip counting matches [`resolve`](Self::resolve).
    #[inline(never)]
    pub fn resolve_or(&self, skip_frames: usize, location: &Location<'_>) -> CallerInfo {
        let walk = self.walk(skip_frames + 1);
        walk.located
            .unwrap_or_else(|| CallerInfo::from_location(location, walk.unlocated))
    }

    #[inline(never)]
    fn walk(&self, skip_frames: usize) -> Walk {
        let end = skip_frames + MAX_CALLER_DEPTH;
        let mut index = 0usize;
        let mut walk = Walk::default();
        let mut exhausted = false;

        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                if walk.is_done() || exhausted {
                    return;
                }
                let Some(name) = symbol.name() else {
                    return;
                };
                let name = format!("{name:#}");
                if is_walker_frame(&name) {
                    return;
                }

                let current = index;
                index += 1;
                if current < skip_frames {
                    return;
                }
                if current >= end {
                    exhausted = true;
                    return;
                }
                self.visit(&mut walk, &name, symbol.filename(), symbol.lineno());
            });
            !walk.is_done() && !exhausted
        });

        walk
    }

    fn visit(&self, walk: &mut Walk, symbol: &str, file: Option<&Path>, line: Option<u32>) {
        match (file, line) {
            (Some(file), Some(line)) => {
                if !self.filter.rejects(symbol, file) {
                    walk.located = CallerInfo::from_parts(symbol, file, line);
                }
            }
            // Symbol table only: no file to filter on.
            _ => {
                if !self.filter.rejects_symbol(symbol) {
                    walk.unlocated = FunctionName::parse(symbol);
                }
            }
        }
    }
}

#[derive(Default)]
struct Walk {
    located: Option<CallerInfo>,
    unlocated: Option<FunctionName>,
}

impl Walk {
    fn is_done(&self) -> bool {
        self.located.is_some() || self.unlocated.is_some()
    }
}

fn is_closure_segment(segment: &str) -> bool {
    segment.starts_with("{{closure}}") || segment.starts_with("{closure#")
}

fn is_walker_frame(symbol: &str) -> bool {
    symbol.starts_with("_Unwind_") || has_module_prefix(owner_path(symbol), "backtrace")
}

fn has_module_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::") || rest.starts_with('<'))
}

/// Splits on the last `::` that is not inside `<...>`.
fn split_last_segment(symbol: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let mut split = None;
    let bytes = symbol.as_bytes();
    for (i, byte) in bytes.iter().enumerate() {
        match byte {
            b'<' => depth += 1,
            b'>' => depth -= 1,
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => split = Some(i),
            _ => {}
        }
    }
    let i = split?;
    let (prefix, name) = (&symbol[..i], &symbol[i + 2..]);
    (!prefix.is_empty() && !name.is_empty()).then_some((prefix, name))
}

/// Last `::` segment at bracket depth zero.
fn last_segment(path: &str) -> &str {
    match split_last_segment(path) {
        Some((_, last)) => last,
        None => path,
    }
}

/// The path a symbol is filed under.
///
/// `<a::Foo as b::Bar>::f` is filed under `a::Foo`; when the self type is
/// not a path (a generic parameter, a primitive) the trait path is used.
fn owner_path(symbol: &str) -> &str {
    let Some(rest) = symbol.strip_prefix('<') else {
        return symbol;
    };

    let mut depth = 1i32;
    let mut close = None;
    for (i, byte) in rest.bytes().enumerate() {
        match byte {
            b'<' => depth += 1,
            b'>' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(close) = close else {
        return symbol;
    };
    let inner = &rest[..close];

    let (self_type, trait_path) = match find_top_level_as(inner) {
        Some(i) => (&inner[..i], Some(&inner[i + 4..])),
        None => (inner, None),
    };
    let self_type = strip_type_sigils(self_type);
    match trait_path {
        Some(trait_path) if !self_type.contains("::") => trait_path,
        _ => self_type,
    }
}

fn find_top_level_as(inner: &str) -> Option<usize> {
    let mut depth = 0i32;
    let bytes = inner.as_bytes();
    for (i, byte) in bytes.iter().enumerate() {
        match byte {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' | b')' | b']' => depth -= 1,
            b' ' if depth == 0 && inner[i..].starts_with(" as ") => return Some(i),
            _ => {}
        }
    }
    None
}

fn strip_type_sigils(mut ty: &str) -> &str {
    loop {
        let trimmed = ty
            .trim_start_matches(['&', '*'])
            .trim_start_matches("mut ")
            .trim_start_matches("const ")
            .trim_start_matches("dyn ");
        if trimmed == ty {
            return ty;
        }
        ty = trimmed;
    }
}

/// Keeps the last two components of a path: `/src/app/handlers.rs` becomes
/// `app/handlers.rs`.
fn normalize_file(file: &Path) -> String {
    let parts: Vec<_> = file
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    let start = parts.len().saturating_sub(2);
    parts[start..].join("/")
}
