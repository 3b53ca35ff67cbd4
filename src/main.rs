//! # Affinity Jobs - Entry Point
//! src/main.rs
//!
//! Demostración del Job System: un gestor de ventanas simulado que enruta
//! todo por el worker `Window`, más una carga concurrente desde varios
//! threads. Al terminar imprime las estadísticas como JSON.

mod demo;

use affinity_jobs::config::Config;
use affinity_jobs::jobs::{Affinity, JobResult, JobSystem, JobSystemConfig};
use affinity_jobs::logging;
use demo::WindowManager;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

fn main() {
    let config = Config::new();

    if let Err(e) = config.validate() {
        eprintln!("💥 Configuración inválida: {}", e);
        std::process::exit(2);
    }

    logging::init(config.log_json);
    config.print_summary();

    // Sin todos los workers no hay sistema: abortar
    let jobs = match JobSystem::initialize(JobSystemConfig::from_config(&config)) {
        Ok(jobs) => Arc::new(jobs),
        Err(e) => {
            error!(error = %e, "failed to initialize job system");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config, &jobs) {
        error!(error = %e, "demo failed");
        jobs.shutdown();
        std::process::exit(1);
    }

    jobs.shutdown();

    match jobs.stats().to_json_pretty() {
        Ok(json) => println!("{}", json),
        Err(e) => error!(error = %e, "failed to serialize stats"),
    }
}

fn run(config: &Config, jobs: &Arc<JobSystem>) -> JobResult<()> {
    let windows = WindowManager::new(Arc::clone(jobs));

    for i in 0..config.demo_windows {
        let id = windows.create(&format!("window {}", i))?;
        windows.set_title(id, &format!("Affinity Jobs #{}", id))?;
        windows.set_position(id, 100 * i as i32, 50 * i as i32)?;
        windows.set_visible(id, true)?;
        windows.pump()?;

        info!(window = id, position = ?windows.position(id)?, title = ?windows.title(id)?, "window ready");
    }

    // Carga concurrente: cada thread incrementa un contador en el worker Window
    let counter = Arc::new(Mutex::new(0u64));
    thread::scope(|scope| -> JobResult<()> {
        let callers: Vec<_> = (0..config.demo_threads)
            .map(|_| {
                let counter = Arc::clone(&counter);
                scope.spawn(move || -> JobResult<()> {
                    let mut last = None;
                    for _ in 0..config.demo_jobs {
                        let counter = Arc::clone(&counter);
                        last = Some(jobs.add_task(Affinity::Window, move || *counter.lock() += 1)?);
                    }
                    if let Some(handle) = last {
                        jobs.wait(&handle)?;
                    }
                    Ok(())
                })
            })
            .collect();

        for caller in callers {
            caller.join().unwrap_or(Err(affinity_jobs::jobs::JobError::JobPanicked))?;
        }
        Ok(())
    })?;

    let expected = (config.demo_threads * config.demo_jobs) as u64;
    info!(counter = *counter.lock(), expected, "concurrent window jobs finished");

    // Trabajo de propósito general en el pool Default
    let sum: u64 = (1..=config.demo_jobs as u64)
        .map(|n| jobs.run(Affinity::Default, move || n * n))
        .collect::<JobResult<Vec<_>>>()?
        .into_iter()
        .sum();
    info!(sum, "default pool finished");

    for id in 1..=config.demo_windows as u64 {
        windows.destroy(id)?;
    }
    info!(remaining = windows.count()?, "windows destroyed");

    Ok(())
}
