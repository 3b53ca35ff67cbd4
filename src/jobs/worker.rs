//! # Workers por Afinidad
//! src/jobs/worker.rs
//!
//! Cada worker es un thread del sistema operativo ligado a una única cola.
//! Consume jobs en orden hasta que la cola se cierra y queda vacía: al apagar
//! el sistema los jobs pendientes se drenan, nunca se descartan.

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::queue::JobQueue;
use crate::jobs::types::{Affinity, WorkerState};
use crate::metrics::JobMetrics;
use parking_lot::Mutex;
use std::cell::Cell;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, info, warn};

thread_local! {
    static CURRENT_AFFINITY: Cell<Option<Affinity>> = const { Cell::new(None) };
}

/// Afinidad del worker que ejecuta el thread actual
///
/// `None` para cualquier thread que no sea un worker del Job System.
pub fn current_affinity() -> Option<Affinity> {
    CURRENT_AFFINITY.with(|current| current.get())
}

/// Thread dedicado a una afinidad
pub struct WorkerThread {
    name: String,
    affinity: Affinity,
    state: Arc<Mutex<WorkerState>>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    /// Lanza un worker que consume `queue`
    pub fn spawn(
        name: String,
        queue: Arc<JobQueue>,
        metrics: JobMetrics,
        stack_size: Option<usize>,
    ) -> JobResult<Self> {
        let affinity = queue.affinity();
        let state = Arc::new(Mutex::new(WorkerState::Idle));

        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(size) = stack_size {
            builder = builder.stack_size(size);
        }

        let handle = {
            let worker_name = name.clone();
            let state = Arc::clone(&state);
            builder
                .spawn(move || worker_loop(worker_name, queue, state, metrics))
                .map_err(|source| JobError::WorkerSpawn {
                    name: name.clone(),
                    source,
                })?
        };

        Ok(Self {
            name,
            affinity,
            state,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    pub fn thread_id(&self) -> Option<ThreadId> {
        self.handle.as_ref().map(|handle| handle.thread().id())
    }

    /// Separa el `JoinHandle` del worker
    ///
    /// El worker original conserva nombre y estado (compartido), así que sigue
    /// apareciendo en las stats mientras el otro se usa para el join.
    pub(crate) fn detach(&mut self) -> WorkerThread {
        WorkerThread {
            name: self.name.clone(),
            affinity: self.affinity,
            state: Arc::clone(&self.state),
            handle: self.handle.take(),
        }
    }

    /// Espera a que el thread termine
    ///
    /// La cola debe estar cerrada antes, si no el join no retorna. Si el
    /// worker es el thread actual (shutdown lanzado desde un job) no se hace
    /// join.
    ///
    /// Saltar el propio join no evita todos los ciclos: si el shutdown corre en
    /// el worker `Window` mientras un worker `Default` espera un job `Window`
    /// que sigue en cola, el join de ese worker `Default` nunca retorna. Soltar
    /// el último `Arc<JobSystem>` dentro de un job tiene el mismo efecto, porque
    /// `Drop` llama a `shutdown`.
    pub fn join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        if handle.thread().id() == thread::current().id() {
            debug!(worker = %self.name, "skipping join of the current worker thread");
            return;
        }

        if handle.join().is_err() {
            warn!(worker = %self.name, "worker thread panicked");
        }
    }
}

/// Loop principal del worker
fn worker_loop(name: String, queue: Arc<JobQueue>, state: Arc<Mutex<WorkerState>>, metrics: JobMetrics) {
    let affinity = queue.affinity();
    CURRENT_AFFINITY.with(|current| current.set(Some(affinity)));

    info!(worker = %name, %affinity, "worker started");

    // Esperar por un job; None solo cuando la cola está cerrada y vacía
    while let Some(job) = queue.dequeue() {
        *state.lock() = WorkerState::Executing;
        debug!(worker = %name, job = %job.id(), "picked up job");

        if let Some(execution) = job.execute() {
            metrics.record_completed(affinity, execution.waited, execution.ran, execution.panicked);

            if execution.panicked {
                warn!(worker = %name, job = %job.id(), "job function panicked");
            } else {
                debug!(
                    worker = %name,
                    job = %job.id(),
                    elapsed_us = execution.ran.as_micros() as u64,
                    "completed job"
                );
            }
        }

        *state.lock() = if queue.is_closed() {
            WorkerState::ShuttingDown
        } else {
            WorkerState::Idle
        };
    }

    *state.lock() = WorkerState::Terminated;
    info!(worker = %name, %affinity, "worker stopped");
}
