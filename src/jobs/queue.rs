//! # Cola FIFO por Afinidad
//! src/jobs/queue.rs
//!
//! Implementa una cola thread-safe que entrega los jobs en orden de llegada.
//! Los workers se bloquean en un Condvar mientras la cola está vacía.

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::job::Job;
use crate::jobs::types::Affinity;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

/// Estado interno protegido por el Mutex
struct QueueState {
    jobs: VecDeque<Arc<Job>>,

    /// Una vez cerrada no se aceptan jobs nuevos, pero se drenan los que hay
    closed: bool,

    enqueued_total: u64,
}

/// Cola FIFO thread-safe de una afinidad
pub struct JobQueue {
    affinity: Affinity,

    state: Mutex<QueueState>,

    /// Condvar para notificar cuando hay nuevos jobs o se cierra la cola
    condvar: Condvar,
}

impl JobQueue {
    /// Crea una nueva cola para una afinidad
    pub fn new(affinity: Affinity) -> Self {
        Self {
            affinity,
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                closed: false,
                enqueued_total: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    /// Encola un job al final
    ///
    /// Retorna `ShuttingDown` si la cola ya fue cerrada.
    pub fn enqueue(&self, job: Arc<Job>) -> JobResult<()> {
        let mut state = self.state.lock();

        if state.closed {
            return Err(JobError::ShuttingDown);
        }

        state.jobs.push_back(job);
        state.enqueued_total += 1;

        // Notificar a un worker esperando
        self.condvar.notify_one();

        Ok(())
    }

    /// Desencola el job más antiguo
    ///
    /// Bloquea hasta que haya un job disponible. Retorna `None` solo cuando la
    /// cola está cerrada y vacía.
    pub fn dequeue(&self) -> Option<Arc<Job>> {
        let mut state = self.state.lock();

        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }

            if state.closed {
                return None;
            }

            self.condvar.wait(&mut state);
        }
    }

    /// Intenta desencolar sin bloquear
    pub fn try_dequeue(&self) -> Option<Arc<Job>> {
        self.state.lock().jobs.pop_front()
    }

    /// Cierra la cola y despierta a todos los workers
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.condvar.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Retorna el tamaño actual de la cola
    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    /// Verifica si la cola está vacía
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Obtiene estadísticas de la cola
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();

        QueueStats {
            affinity: self.affinity,
            pending: state.jobs.len(),
            enqueued_total: state.enqueued_total,
            closed: state.closed,
        }
    }
}

/// Estadísticas de una cola
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub affinity: Affinity,
    pub pending: usize,
    pub enqueued_total: u64,
    pub closed: bool,
}
