//! Origin labels for contract diagnostics.
//!
//! A contracted function does not know where it is lexically nested, so
//! definition sites record their nesting on a per-thread frame stack
//! ([`enter`], [`enter_module`], [`within`]). The stack is read once when a
//! function is decorated and turned into an [`Origin`] such as
//! `shapes module (src/shapes.rs), Outer.Inner.area()`.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::expr::{Scope, Value};

/// Frame name marking module-level code; everything up to and including the
/// outermost marker is dropped from the nesting path.
pub const MODULE_FRAME: &str = "<module>";

thread_local! {
    static FRAMES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Pops its frame (and anything pushed after it) when dropped.
#[must_use = "the frame is popped as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FrameGuard {
    depth: usize,
    // Frames live on a thread-local stack.
    _not_send: PhantomData<*const ()>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| frames.borrow_mut().truncate(self.depth));
    }
}

/// Push a named frame (a class, an enclosing function).
pub fn enter(name: impl Into<String>) -> FrameGuard {
    let name = name.into();
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        let depth = frames.len();
        frames.push(name);
        FrameGuard {
            depth,
            _not_send: PhantomData,
        }
    })
}

/// Push a module-level frame.
pub fn enter_module() -> FrameGuard {
    enter(MODULE_FRAME)
}

/// Run `f` with `name` pushed as the innermost frame.
pub fn within<R>(name: impl Into<String>, f: impl FnOnce() -> R) -> R {
    let _guard = enter(name);
    f()
}

/// The active frames on this thread, outermost first.
pub fn active_frames() -> Vec<String> {
    FRAMES.with(|frames| frames.borrow().clone())
}

/// Join frame names (outermost first) into a dotted nesting path.
///
/// Everything before and including the outermost [`MODULE_FRAME`] is
/// dropped; without a marker every frame is kept.
pub fn nesting_path<S: AsRef<str>>(frames: &[S]) -> String {
    let start = frames
        .iter()
        .position(|frame| frame.as_ref() == MODULE_FRAME)
        .map_or(0, |i| i + 1);
    frames[start..]
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

/// The module a contracted function is defined in.
///
/// `globals` are the module-level names contract expressions may refer to,
/// such as type aliases and user-defined classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub globals: Scope,
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            globals: Scope::new(),
        }
    }

    /// Add a module-level binding.
    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.bind(name, value);
        self
    }

    pub fn with_globals(mut self, globals: Scope) -> Self {
        self.globals = globals;
        self
    }
}

/// Where a contracted function lives, as shown in every diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub module: String,
    pub file: String,
    /// Dotted path of enclosing classes/functions; empty at top level.
    pub nesting: String,
    pub function: String,
}

impl Origin {
    /// Build the origin for `function` from this thread's active frames.
    pub fn resolve(module: &ModuleInfo, function: &str) -> Self {
        let frames = active_frames();
        Self {
            module: module.name.clone(),
            file: module.file.clone(),
            nesting: nesting_path(&frames),
            function: function.to_string(),
        }
    }

    /// `Outer.Inner.f`, or just `f` at top level.
    pub fn qualified_name(&self) -> String {
        if self.nesting.is_empty() {
            self.function.clone()
        } else {
            format!("{}.{}", self.nesting, self.function)
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} module ({}), {}()",
            self.module,
            self.file,
            self.qualified_name()
        )
    }
}
