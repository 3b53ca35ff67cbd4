//! # Configuración
//! src/config.rs
//!
//! Configuración del binario de demostración con soporte para argumentos CLI
//! y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./affinity-jobs --workers-default 4 \
//!   --max-payload 65536 \
//!   --demo-threads 4 \
//!   --demo-jobs 100
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! JOBS_WORKERS_DEFAULT=8 JOBS_LOG_JSON=true ./affinity-jobs
//! ```

use crate::jobs::system::DEFAULT_MAX_PAYLOAD_SIZE;
use clap::Parser;

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Configuración del Job System y de la demo
#[derive(Debug, Clone, Parser)]
#[command(name = "affinity-jobs")]
#[command(about = "Job System con afinidad de threads")]
#[command(version = "0.1.0")]
pub struct Config {
    // === Workers ===

    /// Número de workers del pool Default (el worker Window siempre es uno)
    #[arg(long = "workers-default", default_value_t = default_worker_count(), env = "JOBS_WORKERS_DEFAULT")]
    pub default_workers: usize,

    /// Prefijo para los nombres de los threads
    #[arg(long = "thread-prefix", default_value = "jobs", env = "JOBS_THREAD_PREFIX")]
    pub thread_name_prefix: String,

    // === Payloads ===

    /// Tamaño máximo de un payload en bytes
    #[arg(long = "max-payload", default_value_t = DEFAULT_MAX_PAYLOAD_SIZE, env = "JOBS_MAX_PAYLOAD")]
    pub max_payload_size: usize,

    // === Logging ===

    /// Emitir logs en formato JSON
    #[arg(long = "log-json", env = "JOBS_LOG_JSON")]
    pub log_json: bool,

    // === Demo ===

    /// Threads que envían jobs en paralelo
    #[arg(long = "demo-threads", default_value = "4", env = "JOBS_DEMO_THREADS")]
    pub demo_threads: usize,

    /// Jobs enviados por cada thread
    #[arg(long = "demo-jobs", default_value = "100", env = "JOBS_DEMO_JOBS")]
    pub demo_jobs: usize,

    /// Ventanas simuladas creadas en el worker Window
    #[arg(long = "demo-windows", default_value = "3", env = "JOBS_DEMO_WINDOWS")]
    pub demo_windows: usize,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.default_workers == 0 {
            return Err("Default workers must be >= 1".to_string());
        }
        if self.max_payload_size == 0 {
            return Err("Max payload size must be > 0".to_string());
        }
        if self.thread_name_prefix.is_empty() {
            return Err("Thread prefix must not be empty".to_string());
        }
        if self.demo_threads == 0 {
            return Err("Demo threads must be >= 1".to_string());
        }
        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║               Affinity Job System Configuration             ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        println!("👷 Workers:");
        println!("   ┌──────────────┬──────────┐");
        println!("   │ Affinity     │ Workers  │");
        println!("   ├──────────────┼──────────┤");
        println!("   │ default      │ {:^8} │", self.default_workers);
        println!("   │ window       │ {:^8} │", 1);
        println!("   └──────────────┴──────────┘");
        println!("   Thread prefix: {}", self.thread_name_prefix);
        println!();
        println!("📦 Payloads:");
        println!("   Max size:     {} bytes", self.max_payload_size);
        println!();
        println!("🧪 Demo:");
        println!("   Threads:      {}", self.demo_threads);
        println!("   Jobs/thread:  {}", self.demo_jobs);
        println!("   Windows:      {}", self.demo_windows);
        println!();
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            default_workers: default_worker_count(),
            thread_name_prefix: "jobs".to_string(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            log_json: false,
            demo_threads: 4,
            demo_jobs: 100,
            demo_windows: 3,
        }
    }
}
