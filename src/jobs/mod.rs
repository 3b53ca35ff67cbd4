//! # Job System
//!
//! Scheduler con afinidad de thread. Cada afinidad tiene su propia cola FIFO
//! y sus propios workers; el worker `Window` es único y es el dueño de los
//! recursos nativos que solo pueden tocarse desde su thread.
//!
//! ## Flujo
//!
//! - `JobSystem::add_job` copia el payload y encola el job
//! - un worker de la misma afinidad lo ejecuta
//! - `JobSystem::wait` bloquea al caller hasta que termine
//! - el caller lee los resultados desde el payload del handle

pub mod affine;
pub mod error;
pub mod job;
pub mod payload;
pub mod queue;
pub mod system;
pub mod types;
pub mod worker;

pub use affine::ThreadBound;
pub use error::{JobError, JobResult};
pub use job::{JobContext, JobHandle};
pub use payload::{Payload, INLINE_PAYLOAD_CAPACITY};
pub use system::{JobSystem, JobSystemConfig, SystemStats};
pub use types::{Affinity, JobId, JobState, WorkerState};
