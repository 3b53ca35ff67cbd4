//! # Logging
//! src/logging.rs
//!
//! Inicialización de `tracing` para el proceso. El filtro se toma de
//! `RUST_LOG` (por defecto `info`).

use tracing_subscriber::EnvFilter;

/// Inicializa el subscriber global
///
/// Llamadas posteriores no hacen nada.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true);

    let _ = if json {
        builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init()
    } else {
        builder.with_target(false).try_init()
    };
}
