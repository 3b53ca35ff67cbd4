//! # Tipos y Estructuras para el Job System
//! src/jobs/types.rs
//!
//! Define los tipos fundamentales: afinidad, estado de un job y de un worker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Contexto de ejecución en el que debe correr un job
///
/// El conjunto de afinidades es fijo y se conoce al inicializar el sistema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affinity {
    /// Pool de workers de propósito general
    Default,

    /// Worker único dueño de los handles nativos de ventanas
    Window,
}

impl Affinity {
    /// Todas las afinidades, en orden fijo
    pub const ALL: [Affinity; 2] = [Affinity::Default, Affinity::Window];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "default" => Some(Affinity::Default),
            "window" => Some(Affinity::Window),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Affinity::Default => "default",
            Affinity::Window => "window",
        }
    }

    /// Índice estable dentro de `ALL`
    pub fn index(&self) -> usize {
        match self {
            Affinity::Default => 0,
            Affinity::Window => 1,
        }
    }

    /// Verifica si la afinidad tiene exactamente un worker
    pub fn is_singleton(&self) -> bool {
        matches!(self, Affinity::Window)
    }
}

impl Default for Affinity {
    fn default() -> Self {
        Affinity::Default
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identificador monotónico de un job
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Estado de un job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Job en cola esperando ejecución
    Pending,

    /// Job ejecutándose en un worker de su afinidad
    Running,

    /// Job terminado; el payload ya contiene los resultados
    Completed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
        }
    }

    /// Verifica si el job está en estado terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed)
    }
}

/// Estado de un worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Executing,
    ShuttingDown,
    Terminated,
}
