//! # Estructura de Job
//!
//! Un job es una función más una copia de su payload. La función corre una
//! sola vez, en un worker de su afinidad; el estado pasa a `Completed`
//! exactamente una vez y los waiters leen los resultados desde el payload.

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::payload::Payload;
use crate::jobs::types::{Affinity, JobId, JobState};
use crate::jobs::worker;
use parking_lot::{Condvar, Mutex};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Función de un job
pub type JobFn = Box<dyn FnOnce(&mut JobContext<'_>) + Send + 'static>;

/// Vista que recibe la función del job mientras se ejecuta
pub struct JobContext<'a> {
    id: JobId,
    affinity: Affinity,
    payload: &'a mut Payload,
}

impl<'a> JobContext<'a> {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    /// Decodifica el payload como `T`
    pub fn data<T: DeserializeOwned>(&self) -> JobResult<T> {
        self.payload.decode()
    }

    /// Escribe `value` como nuevo contenido del payload (resultados)
    pub fn set_data<T: Serialize + ?Sized>(&mut self, value: &T) -> JobResult<()> {
        self.payload.store(value)
    }

    /// Decodifica, modifica y vuelve a guardar el payload
    pub fn update<T, F>(&mut self, f: F) -> JobResult<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let mut data: T = self.payload.decode()?;
        f(&mut data);
        self.payload.store(&data)
    }

    pub fn bytes(&self) -> &[u8] {
        self.payload.as_bytes()
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.payload.as_bytes_mut()
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        self.payload
    }
}

/// Datos internos mutables del job (protegidos por Mutex)
#[derive(Debug)]
struct JobData {
    state: JobState,
    payload: Payload,
    panicked: bool,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

/// Resultado de ejecutar un job en un worker
#[derive(Debug, Clone, Copy)]
pub(crate) struct Execution {
    pub(crate) waited: Duration,
    pub(crate) ran: Duration,
    pub(crate) panicked: bool,
}

/// Representa un job individual
pub struct Job {
    id: JobId,
    affinity: Affinity,
    created_at: Instant,

    /// Se consume al ejecutar; `None` significa que ya corrió
    work: Mutex<Option<JobFn>>,

    data: Mutex<JobData>,

    /// Se notifica cuando el estado pasa a `Completed`
    completed: Condvar,
}

impl Job {
    pub(crate) fn new(id: JobId, affinity: Affinity, payload: Payload, work: JobFn) -> Self {
        Self {
            id,
            affinity,
            created_at: Instant::now(),
            work: Mutex::new(Some(work)),
            data: Mutex::new(JobData {
                state: JobState::Pending,
                payload,
                panicked: false,
                started_at: None,
                finished_at: None,
            }),
            completed: Condvar::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    pub fn state(&self) -> JobState {
        self.data.lock().state
    }

    /// Ejecuta la función en el thread actual y marca el job como completado
    ///
    /// Devuelve `None` si el job ya se había ejecutado.
    pub(crate) fn execute(&self) -> Option<Execution> {
        let work = self.work.lock().take()?;

        let (mut payload, started_at) = {
            let mut data = self.data.lock();
            let now = Instant::now();
            data.state = JobState::Running;
            data.started_at = Some(now);
            (std::mem::take(&mut data.payload), now)
        };

        let mut ctx = JobContext {
            id: self.id,
            affinity: self.affinity,
            payload: &mut payload,
        };
        let panicked = panic::catch_unwind(AssertUnwindSafe(|| work(&mut ctx))).is_err();

        let finished_at = Instant::now();
        {
            let mut data = self.data.lock();
            data.payload = payload;
            data.panicked = panicked;
            data.finished_at = Some(finished_at);
            data.state = JobState::Completed;
        }
        self.completed.notify_all();

        Some(Execution {
            waited: started_at.duration_since(self.created_at),
            ran: finished_at.duration_since(started_at),
            panicked,
        })
    }

    /// Bloquea hasta que el job esté completado
    pub(crate) fn wait_completed(&self) {
        let mut data = self.data.lock();
        while data.state != JobState::Completed {
            self.completed.wait(&mut data);
        }
    }

    /// Igual que `wait_completed` pero con límite de tiempo
    ///
    /// Retorna `true` si el job terminó antes del timeout. Un timeout que no
    /// cabe en un `Instant` equivale a esperar sin límite.
    pub(crate) fn wait_completed_for(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait_completed();
            return true;
        };
        let mut data = self.data.lock();
        while data.state != JobState::Completed {
            if self.completed.wait_until(&mut data, deadline).timed_out() {
                return data.state == JobState::Completed;
            }
        }
        true
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("affinity", &self.affinity)
            .field("state", &self.state())
            .finish()
    }
}

/// Handle compartido a un job encolado
///
/// Clonar el handle no copia el job; el job se libera cuando se suelta el
/// último handle y el worker terminó con él.
#[derive(Debug, Clone)]
pub struct JobHandle {
    job: Arc<Job>,
}

impl JobHandle {
    pub(crate) fn new(job: Arc<Job>) -> Self {
        Self { job }
    }

    pub fn id(&self) -> JobId {
        self.job.id
    }

    pub fn affinity(&self) -> Affinity {
        self.job.affinity
    }

    pub fn state(&self) -> JobState {
        self.job.state()
    }

    pub fn is_completed(&self) -> bool {
        self.state() == JobState::Completed
    }

    /// `true` si la función del job hizo panic
    pub fn panicked(&self) -> bool {
        self.job.data.lock().panicked
    }

    /// Bloquea el thread actual hasta que el job termine
    ///
    /// Si el caller es el único worker de la afinidad del job y el job aún no
    /// terminó, esperar nunca retornaría: se devuelve `WouldDeadlock`.
    pub fn wait(&self) -> JobResult<()> {
        self.check_self_wait()?;
        self.job.wait_completed();
        Ok(())
    }

    /// Espera con timeout; `Ok(false)` si el job no terminó a tiempo
    pub fn wait_timeout(&self, timeout: Duration) -> JobResult<bool> {
        self.check_self_wait()?;
        Ok(self.job.wait_completed_for(timeout))
    }

    fn check_self_wait(&self) -> JobResult<()> {
        let affinity = self.job.affinity;
        if affinity.is_singleton()
            && worker::current_affinity() == Some(affinity)
            && !self.is_completed()
        {
            tracing::error!(
                job = %self.job.id,
                %affinity,
                "worker waiting on a job queued behind itself"
            );
            return Err(JobError::WouldDeadlock(affinity));
        }
        Ok(())
    }

    /// Decodifica el payload como `T` (resultados escritos por el worker)
    pub fn data<T: DeserializeOwned>(&self) -> JobResult<T> {
        self.job.data.lock().payload.decode()
    }

    /// Copia de los bytes crudos del payload
    pub fn bytes(&self) -> Vec<u8> {
        self.job.data.lock().payload.as_bytes().to_vec()
    }

    /// Acceso de solo lectura al payload sin copiarlo
    pub fn with_payload<R>(&self, f: impl FnOnce(&Payload) -> R) -> R {
        f(&self.job.data.lock().payload)
    }

    /// Tiempo de ejecución (si ya empezó)
    pub fn execution_time(&self) -> Option<Duration> {
        let data = self.job.data.lock();
        data.started_at.map(|start| match data.finished_at {
            Some(end) => end.duration_since(start),
            None => start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn job_with(payload: Payload, work: impl FnOnce(&mut JobContext<'_>) + Send + 'static) -> Arc<Job> {
        Arc::new(Job::new(JobId(1), Affinity::Default, payload, Box::new(work)))
    }

    #[test]
    fn test_job_lifecycle() {
        let job = job_with(Payload::encode(&0u32).unwrap(), |ctx| {
            ctx.set_data(&42u32).unwrap();
        });
        let handle = JobHandle::new(Arc::clone(&job));

        assert_eq!(handle.state(), JobState::Pending);
        assert!(handle.execution_time().is_none());

        let execution = job.execute().unwrap();
        assert!(!execution.panicked);
        assert_eq!(handle.state(), JobState::Completed);
        assert_eq!(handle.data::<u32>().unwrap(), 42);
        assert!(handle.execution_time().is_some());
    }

    #[test]
    fn test_job_runs_only_once() {
        let job = job_with(Payload::empty(), |_| {});
        assert!(job.execute().is_some());
        assert!(job.execute().is_none());
    }

    #[test]
    fn test_panicking_job_still_completes() {
        let job = job_with(Payload::empty(), |_| panic!("boom"));
        let handle = JobHandle::new(Arc::clone(&job));

        let execution = job.execute().unwrap();
        assert!(execution.panicked);
        assert!(handle.is_completed());
        assert!(handle.panicked());
        assert!(handle.wait().is_ok());
    }

    #[test]
    fn test_wait_blocks_until_executed_elsewhere() {
        let job = job_with(Payload::copy_from(&[0]), |ctx| {
            thread::sleep(Duration::from_millis(20));
            ctx.bytes_mut()[0] = 7;
        });
        let handle = JobHandle::new(Arc::clone(&job));

        let runner = thread::spawn(move || {
            job.execute();
        });

        handle.wait().unwrap();
        assert_eq!(handle.bytes(), vec![7]);
        runner.join().unwrap();
    }

    #[test]
    fn test_wait_timeout_expires_on_pending_job() {
        let job = job_with(Payload::empty(), |_| {});
        let handle = JobHandle::new(job);
        assert!(!handle.wait_timeout(Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn test_wait_timeout_accepts_unbounded_duration() {
        let job = job_with(Payload::empty(), |_| thread::sleep(Duration::from_millis(20)));
        let handle = JobHandle::new(Arc::clone(&job));

        let runner = thread::spawn(move || {
            job.execute();
        });

        assert!(handle.wait_timeout(Duration::MAX).unwrap());
        assert!(handle.is_completed());
        // Ya completado: retorna enseguida
        assert!(handle.wait_timeout(Duration::MAX).unwrap());
        runner.join().unwrap();
    }

    #[test]
    fn test_update_modifies_typed_payload() {
        let job = job_with(Payload::encode(&(1u8, false)).unwrap(), |ctx| {
            ctx.update::<(u8, bool), _>(|data| data.1 = true).unwrap();
        });
        let handle = JobHandle::new(Arc::clone(&job));
        job.execute();

        assert_eq!(handle.data::<(u8, bool)>().unwrap(), (1, true));
    }
}
