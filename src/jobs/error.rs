//! # Errores del Job System
//! src/jobs/error.rs

use crate::jobs::types::Affinity;
use thiserror::Error;

/// Resultado usado en todo el crate
pub type JobResult<T> = Result<T, JobError>;

/// Errores del Job System
#[derive(Debug, Error)]
pub enum JobError {
    /// El sistema (o la cola de esa afinidad) ya no acepta jobs
    #[error("job system is shutting down")]
    ShuttingDown,

    /// El payload supera el máximo configurado
    #[error("payload of {size} bytes exceeds the maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Falló la creación de un thread de worker (fatal en initialize)
    #[error("failed to spawn worker thread {name}: {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode payload: {0}")]
    PayloadEncode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode payload: {0}")]
    PayloadDecode(#[from] rmp_serde::decode::Error),

    /// Recurso thread-affine accedido desde otro thread
    #[error("thread-affine resource accessed from a thread that does not own it")]
    WrongThread,

    /// Un worker singleton esperando un job de su propia cola
    #[error("waiting on a {0} job from its only worker would never return")]
    WouldDeadlock(Affinity),

    /// La función del job hizo panic
    #[error("job function panicked")]
    JobPanicked,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl JobError {
    /// Indica si el error corresponde a un rechazo de submission
    pub fn is_rejection(&self) -> bool {
        matches!(self, JobError::ShuttingDown | JobError::PayloadTooLarge { .. })
    }
}
