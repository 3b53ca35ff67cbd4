//! # Job System
//! src/jobs/system.rs
//!
//! Fachada que coordina colas y workers de todas las afinidades: encolado,
//! espera bloqueante y apagado con drenado.
//!
//! No existe una instancia global: quien necesite el sistema recibe un
//! `Arc<JobSystem>` al construirse.

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::job::{Job, JobContext, JobFn, JobHandle};
use crate::jobs::payload::Payload;
use crate::jobs::queue::{JobQueue, QueueStats};
use crate::jobs::types::{Affinity, JobId, WorkerState};
use crate::jobs::worker::{self, WorkerThread};
use crate::metrics::{JobMetrics, MetricsSnapshot};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Máximo absoluto de bytes de payload por defecto (1 MiB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Configuración del Job System
#[derive(Debug, Clone)]
pub struct JobSystemConfig {
    /// Número de workers del pool `Default`
    pub default_workers: usize,

    /// Tamaño máximo de un payload en bytes
    pub max_payload_size: usize,

    /// Prefijo de los nombres de thread (`<prefijo>-<afinidad>-<n>`)
    pub thread_name_prefix: String,

    /// Tamaño de stack de los workers (None = default del sistema)
    pub stack_size: Option<usize>,
}

impl Default for JobSystemConfig {
    fn default() -> Self {
        Self {
            default_workers: thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            thread_name_prefix: "jobs".to_string(),
            stack_size: None,
        }
    }
}

impl JobSystemConfig {
    /// Crea una configuración desde el Config principal
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            default_workers: config.default_workers,
            max_payload_size: config.max_payload_size,
            thread_name_prefix: config.thread_name_prefix.clone(),
            stack_size: None,
        }
    }

    pub fn with_default_workers(mut self, workers: usize) -> Self {
        self.default_workers = workers;
        self
    }

    pub fn with_max_payload_size(mut self, max: usize) -> Self {
        self.max_payload_size = max;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Número de workers para una afinidad
    pub fn workers_for(&self, affinity: Affinity) -> usize {
        if affinity.is_singleton() {
            1
        } else {
            self.default_workers
        }
    }

    /// Valida la configuración
    pub fn validate(&self) -> JobResult<()> {
        if self.default_workers == 0 {
            return Err(JobError::InvalidConfig("default workers must be >= 1".to_string()));
        }
        if self.max_payload_size == 0 {
            return Err(JobError::InvalidConfig("max payload size must be > 0".to_string()));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(JobError::InvalidConfig("thread name prefix must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Scheduler de jobs con afinidad de thread
pub struct JobSystem {
    config: JobSystemConfig,

    /// Una cola por afinidad, indexada por `Affinity::index`
    queues: [Arc<JobQueue>; 2],

    workers: Mutex<Vec<WorkerThread>>,

    next_id: AtomicU64,

    metrics: JobMetrics,

    /// Threads de todos los workers, para detectar shutdown desde un job
    worker_threads: Vec<ThreadId>,

    shutting_down: AtomicBool,

    /// `true` cuando el primer shutdown terminó de hacer join
    stopped: Mutex<bool>,
    stopped_signal: Condvar,
}

impl JobSystem {
    /// Lanza todos los workers
    ///
    /// Si algún thread no se puede crear, los workers ya lanzados se apagan y
    /// se retorna `WorkerSpawn`: sin el worker de una afinidad singleton todas
    /// las operaciones que la requieren quedarían inutilizadas.
    pub fn initialize(config: JobSystemConfig) -> JobResult<Self> {
        config.validate()?;

        let queues = Affinity::ALL.map(|affinity| Arc::new(JobQueue::new(affinity)));
        let metrics = JobMetrics::new();
        let mut workers = Vec::new();

        for affinity in Affinity::ALL {
            for i in 0..config.workers_for(affinity) {
                let name = format!("{}-{}-{}", config.thread_name_prefix, affinity, i);
                let spawned = WorkerThread::spawn(
                    name,
                    Arc::clone(&queues[affinity.index()]),
                    metrics.clone(),
                    config.stack_size,
                );

                match spawned {
                    Ok(worker) => workers.push(worker),
                    Err(e) => {
                        error!(error = %e, "job system initialization failed");
                        for queue in &queues {
                            queue.close();
                        }
                        for worker in &mut workers {
                            worker.join();
                        }
                        return Err(e);
                    }
                }
            }
        }

        info!(
            default_workers = config.default_workers,
            max_payload_size = config.max_payload_size,
            "job system initialized"
        );

        let worker_threads = workers.iter().filter_map(WorkerThread::thread_id).collect();

        Ok(Self {
            config,
            queues,
            workers: Mutex::new(workers),
            next_id: AtomicU64::new(1),
            metrics,
            worker_threads,
            shutting_down: AtomicBool::new(false),
            stopped: Mutex::new(false),
            stopped_signal: Condvar::new(),
        })
    }

    pub fn config(&self) -> &JobSystemConfig {
        &self.config
    }

    /// Afinidad del worker que ejecuta el thread actual
    pub fn current_affinity() -> Option<Affinity> {
        worker::current_affinity()
    }

    /// `false` una vez iniciado el shutdown
    pub fn is_accepting(&self) -> bool {
        !self.shutting_down.load(Ordering::SeqCst)
    }

    fn queue(&self, affinity: Affinity) -> &JobQueue {
        &self.queues[affinity.index()]
    }

    /// Encola un job con una copia de `data` como payload
    ///
    /// `data` se copia antes de retornar; el caller puede liberarlo enseguida.
    /// Los resultados se leen desde el handle una vez completado el job.
    pub fn add_job<F>(&self, affinity: Affinity, data: &[u8], func: F) -> JobResult<JobHandle>
    where
        F: FnOnce(&mut JobContext<'_>) + Send + 'static,
    {
        self.check_accepting(affinity)?;
        self.check_payload_size(affinity, data.len())?;
        self.enqueue(affinity, Payload::copy_from(data), Box::new(func))
    }

    /// Variante tipada de `add_job`: `data` se codifica como payload
    pub fn add_job_with<T, F>(&self, affinity: Affinity, data: &T, func: F) -> JobResult<JobHandle>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&mut JobContext<'_>) + Send + 'static,
    {
        self.check_accepting(affinity)?;
        let payload = Payload::encode(data)?;
        self.check_payload_size(affinity, payload.len())?;
        self.enqueue(affinity, payload, Box::new(func))
    }

    /// Encola un closure sin payload (fire-and-forget si no se espera)
    pub fn add_task<F>(&self, affinity: Affinity, func: F) -> JobResult<JobHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        self.check_accepting(affinity)?;
        self.enqueue(affinity, Payload::empty(), Box::new(move |_: &mut JobContext<'_>| func()))
    }

    /// Ejecuta `func` en un worker de `affinity` y espera su resultado
    ///
    /// Si el caller ya es el worker de una afinidad singleton, `func` corre
    /// directamente en el thread actual, pero solo con la cola vacía: con jobs
    /// pendientes adelantarse rompería el orden FIFO y encolar detrás de ellos
    /// no terminaría nunca, así que se retorna `WouldDeadlock`.
    pub fn run<R, F>(&self, affinity: Affinity, func: F) -> JobResult<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if affinity.is_singleton() && worker::current_affinity() == Some(affinity) {
            let pending = self.queue(affinity).len();
            if pending > 0 {
                error!(%affinity, pending, "run from the affine worker with jobs still queued");
                return Err(JobError::WouldDeadlock(affinity));
            }
            debug!(%affinity, "already on the affine worker, running inline");
            return panic::catch_unwind(AssertUnwindSafe(func)).map_err(|_| JobError::JobPanicked);
        }

        let slot = Arc::new(Mutex::new(None));
        let handle = {
            let slot = Arc::clone(&slot);
            self.add_task(affinity, move || {
                *slot.lock() = Some(func());
            })?
        };

        handle.wait()?;
        let result = slot.lock().take();
        result.ok_or(JobError::JobPanicked)
    }

    /// Bloquea el thread actual hasta que el job termine
    pub fn wait(&self, handle: &JobHandle) -> JobResult<()> {
        handle.wait()
    }

    /// Espera con timeout; `Ok(false)` si el job no terminó a tiempo
    pub fn wait_timeout(&self, handle: &JobHandle, timeout: Duration) -> JobResult<bool> {
        handle.wait_timeout(timeout)
    }

    fn check_accepting(&self, affinity: Affinity) -> JobResult<()> {
        if self.is_accepting() {
            return Ok(());
        }
        self.metrics.record_rejected(affinity);
        warn!(%affinity, "job rejected: system is shutting down");
        Err(JobError::ShuttingDown)
    }

    fn check_payload_size(&self, affinity: Affinity, size: usize) -> JobResult<()> {
        let max = self.config.max_payload_size;
        if size <= max {
            return Ok(());
        }
        self.metrics.record_rejected(affinity);
        warn!(%affinity, size, max, "job rejected: payload too large");
        Err(JobError::PayloadTooLarge { size, max })
    }

    fn enqueue(&self, affinity: Affinity, payload: Payload, work: JobFn) -> JobResult<JobHandle> {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let job = Arc::new(Job::new(id, affinity, payload, work));

        if let Err(e) = self.queue(affinity).enqueue(Arc::clone(&job)) {
            self.metrics.record_rejected(affinity);
            warn!(%affinity, job = %id, "job rejected: queue closed");
            return Err(e);
        }

        self.metrics.record_submitted(affinity);
        debug!(%affinity, job = %id, "job queued");
        Ok(JobHandle::new(job))
    }

    /// Detiene el sistema drenando todas las colas
    ///
    /// Los jobs ya encolados se ejecutan hasta terminar antes de hacer join de
    /// los workers; los nuevos se rechazan con `ShuttingDown`. Solo la primera
    /// llamada hace el trabajo; las concurrentes bloquean hasta que termine.
    /// Desde un worker no se espera: el primer caller está haciendo join de
    /// ese mismo thread.
    pub fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            if !self.worker_threads.contains(&thread::current().id()) {
                let mut stopped = self.stopped.lock();
                while !*stopped {
                    self.stopped_signal.wait(&mut stopped);
                }
            }
            return;
        }

        let pending: usize = self.queues.iter().map(|queue| queue.len()).sum();
        info!(pending, "shutting down job system");

        for queue in &self.queues {
            queue.close();
        }

        // No retener el lock durante el join: un job drenado puede pedir stats
        let mut joiners: Vec<WorkerThread> = self
            .workers
            .lock()
            .iter_mut()
            .map(WorkerThread::detach)
            .collect();
        for worker in &mut joiners {
            worker.join();
        }

        *self.stopped.lock() = true;
        self.stopped_signal.notify_all();

        info!("job system stopped");
    }

    /// Obtiene estadísticas de colas, workers y métricas
    pub fn stats(&self) -> SystemStats {
        let workers = self
            .workers
            .lock()
            .iter()
            .map(|worker| WorkerStats {
                name: worker.name().to_string(),
                affinity: worker.affinity(),
                state: worker.state(),
            })
            .collect();

        SystemStats {
            accepting: self.is_accepting(),
            queues: self.queues.iter().map(|queue| queue.stats()).collect(),
            workers,
            metrics: self.metrics.snapshot(),
        }
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for JobSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSystem")
            .field("config", &self.config)
            .field("accepting", &self.is_accepting())
            .finish()
    }
}

/// Estado de un worker para stats
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStats {
    pub name: String,
    pub affinity: Affinity,
    pub state: WorkerState,
}

/// Snapshot completo del Job System
#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub accepting: bool,
    pub queues: Vec<QueueStats>,
    pub workers: Vec<WorkerStats>,
    pub metrics: MetricsSnapshot,
}

impl SystemStats {
    /// Serializa como JSON legible
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
