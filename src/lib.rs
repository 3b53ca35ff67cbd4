//! # Affinity Jobs
//! src/lib.rs
//!
//! Job System con afinidad de threads: media el acceso entre threads
//! arbitrarios y un conjunto pequeño de workers especializados, cada uno ligado
//! a un contexto de ejecución (en particular el único thread dueño de los
//! handles nativos de ventanas).
//!
//! ## Arquitectura
//!
//! El crate está dividido en módulos especializados:
//! - `jobs`: Job, cola FIFO por afinidad, workers y la fachada `JobSystem`
//! - `metrics`: Recolección de métricas por afinidad
//! - `config`: Configuración por CLI y variables de entorno
//! - `logging`: Inicialización de `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use affinity_jobs::jobs::{Affinity, JobSystem, JobSystemConfig};
//!
//! let system = JobSystem::initialize(JobSystemConfig::default()).expect("workers");
//!
//! let handle = system
//!     .add_job_with(Affinity::Window, &(7u32, 0u32), |ctx| {
//!         ctx.update::<(u32, u32), _>(|data| data.1 = data.0 * 6).unwrap();
//!     })
//!     .expect("accepted");
//!
//! system.wait(&handle).expect("wait");
//! let (_, result): (u32, u32) = handle.data().expect("decode");
//! assert_eq!(result, 42);
//!
//! system.shutdown();
//! ```

pub mod config;
pub mod jobs;
pub mod logging;
pub mod metrics;
