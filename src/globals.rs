use std::{borrow::Cow, cell::RefCell, io::Write};

use const_format::concatcp;

use crate::error::generic_error_default;

pub type GenericError = for<'a> fn(Option<&mut (dyn Write + 'static)>, &str);

/// The version of this library as `major.minor.patch`.
pub const VERSION_STRING: &str = concatcp!(
    env!("CARGO_PKG_VERSION_MAJOR"),
    ".",
    env!("CARGO_PKG_VERSION_MINOR"),
    ".",
    env!("CARGO_PKG_VERSION_PATCH")
);

pub struct XmlGlobalState {
    scanner_version: Cow<'static, str>,
    pub(crate) generic_error: GenericError,
    pub(crate) generic_error_context: Option<Box<dyn Write>>,
    pub(crate) debug_entities: bool,
}

impl XmlGlobalState {
    fn new() -> Self {
        Self {
            scanner_version: Cow::Borrowed(VERSION_STRING),
            generic_error: generic_error_default,
            generic_error_context: None,
            debug_entities: false,
        }
    }
}

thread_local! {
    pub static GLOBAL_STATE: RefCell<XmlGlobalState> = RefCell::new(XmlGlobalState::new());
}

/// Set new generic error function and generic error context.
///
/// If `func` is `None`, set `generic_error_default`.
/// If `context` is `None`, current context is clear and no context is set.
pub fn set_generic_error(func: Option<GenericError>, context: Option<impl Write + 'static>) {
    GLOBAL_STATE.with_borrow_mut(|state| {
        state.generic_error = func.unwrap_or(generic_error_default);
        state.generic_error_context = context.map(|context| {
            let boxed: Box<dyn Write + 'static> = Box::new(context);
            boxed
        });
    });
}

/// Enable or disable the trace of entity starts and ends.
///
/// Traces are written through the generic error function.
pub fn set_debug_entities(debug: bool) {
    GLOBAL_STATE.with_borrow_mut(|state| state.debug_entities = debug);
}

pub fn get_debug_entities() -> bool {
    GLOBAL_STATE.with_borrow(|state| state.debug_entities)
}

pub fn get_scanner_version() -> String {
    GLOBAL_STATE.with_borrow(|state| state.scanner_version.to_string())
}
