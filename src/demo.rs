//! # Gestor de Ventanas Simulado
//! src/demo.rs
//!
//! Consumidor del Job System con la misma forma que un gestor de ventanas
//! nativo: los "handles" viven en el worker `Window` y todas las operaciones
//! sobre ellos se envían como jobs a esa afinidad.

use affinity_jobs::jobs::{Affinity, JobContext, JobResult, JobSystem, ThreadBound};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Estado nativo de una ventana; solo válido en el thread que la creó
#[derive(Debug, Default)]
struct NativeWindow {
    title: String,
    x: i32,
    y: i32,
    visible: bool,
}

type WindowTable = Arc<Mutex<HashMap<u64, ThreadBound<NativeWindow>>>>;

/// Aplica `f` a la ventana si existe y el thread actual es su dueño
fn with_window<R>(windows: &WindowTable, id: u64, f: impl FnOnce(&mut NativeWindow) -> R) -> Option<R> {
    let mut table = windows.lock();
    let window = table.get_mut(&id)?.get_mut().ok()?;
    Some(f(window))
}

/// Aplica `f` a los parámetros del job; los errores de codec se loguean
///
/// Retorna `false` si el payload no se pudo decodificar o volver a guardar.
fn update_params<T, F>(ctx: &mut JobContext<'_>, f: F) -> bool
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut T),
{
    match ctx.update::<T, _>(f) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(job = %ctx.id(), error = %e, "window job params codec failed");
            false
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SetTitleParams {
    window: u64,
    title: String,
    result: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Vector2Params {
    window: u64,
    x: i32,
    y: i32,
    result: bool,
}

/// Gestor de ventanas que enruta todo por el worker `Window`
pub struct WindowManager {
    jobs: Arc<JobSystem>,
    windows: WindowTable,
    next_id: AtomicU64,
}

impl WindowManager {
    pub fn new(jobs: Arc<JobSystem>) -> Self {
        Self {
            jobs,
            windows: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Crea una ventana en el worker `Window` y retorna su id
    pub fn create(&self, title: &str) -> JobResult<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let windows = Arc::clone(&self.windows);
        let title = title.to_string();

        self.jobs.run(Affinity::Window, move || {
            let window = NativeWindow {
                title,
                ..Default::default()
            };
            windows.lock().insert(id, ThreadBound::new(window));
        })?;

        Ok(id)
    }

    pub fn set_title(&self, id: u64, title: &str) -> JobResult<bool> {
        let windows = Arc::clone(&self.windows);
        let params = SetTitleParams {
            window: id,
            title: title.to_string(),
            result: false,
        };

        let handle = self.jobs.add_job_with(Affinity::Window, &params, move |ctx| {
            update_params::<SetTitleParams, _>(ctx, |p| {
                let title = p.title.clone();
                p.result = with_window(&windows, p.window, |w| w.title = title).is_some();
            });
        })?;
        self.jobs.wait(&handle)?;

        Ok(handle.data::<SetTitleParams>()?.result)
    }

    pub fn title(&self, id: u64) -> JobResult<Option<String>> {
        let windows = Arc::clone(&self.windows);
        self.jobs
            .run(Affinity::Window, move || with_window(&windows, id, |w| w.title.clone()))
    }

    pub fn set_position(&self, id: u64, x: i32, y: i32) -> JobResult<bool> {
        let windows = Arc::clone(&self.windows);
        let params = Vector2Params { window: id, x, y, result: false };

        let handle = self.jobs.add_job_with(Affinity::Window, &params, move |ctx| {
            update_params::<Vector2Params, _>(ctx, |p| {
                let (x, y) = (p.x, p.y);
                p.result = with_window(&windows, p.window, |w| {
                    w.x = x;
                    w.y = y;
                })
                .is_some();
            });
        })?;
        self.jobs.wait(&handle)?;

        Ok(handle.data::<Vector2Params>()?.result)
    }

    pub fn position(&self, id: u64) -> JobResult<Option<(i32, i32)>> {
        let windows = Arc::clone(&self.windows);
        let params = Vector2Params { window: id, x: 0, y: 0, result: false };

        let handle = self.jobs.add_job_with(Affinity::Window, &params, move |ctx| {
            update_params::<Vector2Params, _>(ctx, |p| {
                if let Some((x, y)) = with_window(&windows, p.window, |w| (w.x, w.y)) {
                    p.x = x;
                    p.y = y;
                    p.result = true;
                }
            });
        })?;
        self.jobs.wait(&handle)?;

        let data: Vector2Params = handle.data()?;
        Ok(data.result.then_some((data.x, data.y)))
    }

    pub fn set_visible(&self, id: u64, visible: bool) -> JobResult<bool> {
        let windows = Arc::clone(&self.windows);
        self.jobs.run(Affinity::Window, move || {
            with_window(&windows, id, |w| w.visible = visible).is_some()
        })
    }

    /// Procesa mensajes pendientes sin esperar (fire-and-forget)
    pub fn pump(&self) -> JobResult<()> {
        let windows = Arc::clone(&self.windows);
        self.jobs.add_task(Affinity::Window, move || {
            let visible = windows
                .lock()
                .values()
                .filter_map(|w| w.get().ok())
                .filter(|w| w.visible)
                .count();
            tracing::trace!(visible, "pumped window messages");
        })?;
        Ok(())
    }

    /// Destruye una ventana; no espera a que termine
    pub fn destroy(&self, id: u64) -> JobResult<()> {
        let windows = Arc::clone(&self.windows);
        self.jobs.add_task(Affinity::Window, move || {
            windows.lock().remove(&id);
        })?;
        Ok(())
    }

    pub fn count(&self) -> JobResult<usize> {
        let windows = Arc::clone(&self.windows);
        self.jobs.run(Affinity::Window, move || windows.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use affinity_jobs::jobs::JobSystemConfig;

    fn manager() -> WindowManager {
        let jobs = JobSystem::initialize(JobSystemConfig::default().with_default_workers(2)).unwrap();
        WindowManager::new(Arc::new(jobs))
    }

    #[test]
    fn test_window_roundtrip_through_window_worker() {
        let manager = manager();

        let id = manager.create("main").unwrap();
        assert!(manager.set_title(id, "renamed").unwrap());
        assert_eq!(manager.title(id).unwrap().as_deref(), Some("renamed"));

        assert!(manager.set_position(id, 120, -40).unwrap());
        assert_eq!(manager.position(id).unwrap(), Some((120, -40)));

        assert!(manager.set_visible(id, true).unwrap());
        manager.pump().unwrap();
    }

    #[test]
    fn test_unknown_window_reports_failure() {
        let manager = manager();
        assert!(!manager.set_title(99, "nope").unwrap());
        assert_eq!(manager.position(99).unwrap(), None);
    }

    #[test]
    fn test_destroy_is_ordered_before_later_queries() {
        let manager = manager();

        let id = manager.create("temp").unwrap();
        manager.destroy(id).unwrap();

        // FIFO en el worker Window: el destroy corre antes que el count
        assert_eq!(manager.count().unwrap(), 0);
    }

    #[test]
    fn test_params_codec_failure_is_reported() {
        let jobs = JobSystem::initialize(JobSystemConfig::default().with_default_workers(1)).unwrap();
        let outcome = Arc::new(Mutex::new(None));

        let handle = {
            let outcome = Arc::clone(&outcome);
            // 0xc1 no es un byte válido en MessagePack
            jobs.add_job(Affinity::Window, &[0xc1], move |ctx: &mut JobContext<'_>| {
                *outcome.lock() = Some(update_params::<Vector2Params, _>(ctx, |p| p.result = true));
            })
            .unwrap()
        };
        jobs.wait(&handle).unwrap();

        assert_eq!(*outcome.lock(), Some(false));
        assert_eq!(handle.bytes(), vec![0xc1]);
    }

    #[test]
    fn test_native_state_is_not_reachable_from_callers() {
        let manager = manager();
        let id = manager.create("pinned").unwrap();

        assert!(with_window(&manager.windows, id, |_| ()).is_none());
    }
}
