//! Optional process-wide dispatcher handle
//!
//! Prefer passing a `Dispatcher` explicitly. This handle exists for call
//! sites that cannot be threaded through; it is built lazily from
//! `$APP_BASE_DIR/conf/log4g.*` (or the console default) and reset by
//! `close_global`, after which the next access builds a fresh one.

use std::sync::{Arc, Mutex, PoisonError};

use config_loader::ConfigLoader;
use contracts::LoggerConfig;
use tracing::warn;

use crate::dispatcher::Dispatcher;

static GLOBAL: Mutex<Option<Arc<Dispatcher>>> = Mutex::new(None);

/// The process-wide dispatcher, created on first access
pub fn logger() -> Arc<Dispatcher> {
    let mut global = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(global.get_or_insert_with(|| Arc::new(build_default())))
}

/// Replace the process-wide dispatcher, returning the previous one
pub fn install(dispatcher: Dispatcher) -> Option<Arc<Dispatcher>> {
    GLOBAL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(Arc::new(dispatcher))
}

/// Close the process-wide dispatcher and reset the handle
pub fn close_global() {
    let previous = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(dispatcher) = previous {
        dispatcher.close();
    }
}

fn build_default() -> Dispatcher {
    let config = ConfigLoader::load_or_default().unwrap_or_else(|e| {
        warn!(error = %e, "Unable to load logger config, using console default");
        LoggerConfig::default()
    });

    Dispatcher::from_config(&config).unwrap_or_else(|e| {
        warn!(error = %e, "Unable to set up configured sinks, using console default");
        Dispatcher::from_config(&LoggerConfig::default()).unwrap_or_default()
    })
}
