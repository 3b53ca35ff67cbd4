//! Tests de integración para el Job System
//! tests/integration_test.rs
//!
//! Cada test levanta su propio `JobSystem`; no requieren nada externo.

use affinity_jobs::jobs::{
    Affinity, JobContext, JobError, JobState, JobSystem, JobSystemConfig, INLINE_PAYLOAD_CAPACITY,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Helper: sistema con un pool Default pequeño
fn system(default_workers: usize) -> Arc<JobSystem> {
    let config = JobSystemConfig::default()
        .with_default_workers(default_workers)
        .with_thread_name_prefix("it");
    Arc::new(JobSystem::initialize(config).expect("Failed to initialize job system"))
}

#[test]
fn test_window_jobs_run_in_submission_order() {
    let jobs = system(2);
    let order = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..3u32)
        .map(|i| {
            let order = Arc::clone(&order);
            jobs.add_task(Affinity::Window, move || order.lock().push(i))
                .expect("Failed to add job")
        })
        .collect();

    for handle in &handles {
        jobs.wait(handle).unwrap();
    }

    assert_eq!(*order.lock(), vec![0, 1, 2]);
}

#[test]
fn test_wait_observes_payload_written_by_job() {
    let jobs = system(2);

    let handle = jobs
        .add_job(Affinity::Default, &[0u8; 4], |ctx: &mut JobContext<'_>| {
            ctx.bytes_mut().copy_from_slice(&[1, 2, 3, 4]);
        })
        .unwrap();

    jobs.wait(&handle).unwrap();
    assert_eq!(handle.state(), JobState::Completed);
    assert_eq!(handle.bytes(), vec![1, 2, 3, 4]);
}

#[test]
fn test_inline_and_spilled_payloads_both_execute() {
    let jobs = system(2);
    let small = vec![7u8; 16];
    let large = vec![9u8; INLINE_PAYLOAD_CAPACITY * 4];

    let checks: Vec<_> = [small.clone(), large.clone()]
        .into_iter()
        .map(|data| {
            let expected = data.clone();
            jobs.add_job(Affinity::Window, &data, move |ctx: &mut JobContext<'_>| {
                assert_eq!(ctx.bytes(), expected.as_slice());
                ctx.bytes_mut()[0] = 0xff;
            })
            .unwrap()
        })
        .collect();

    for handle in &checks {
        jobs.wait(handle).unwrap();
        assert!(!handle.panicked());
        assert_eq!(handle.bytes()[0], 0xff);
    }

    assert!(checks[0].with_payload(|p| p.is_inline()));
    assert!(!checks[1].with_payload(|p| p.is_inline()));
    assert_eq!(checks[1].bytes().len(), large.len());
}

#[test]
fn test_wait_on_completed_job_returns_immediately() {
    let jobs = system(1);
    let handle = jobs.add_task(Affinity::Default, || {}).unwrap();
    jobs.wait(&handle).unwrap();

    let start = Instant::now();
    jobs.wait(&handle).unwrap();
    jobs.wait(&handle).unwrap();
    assert!(start.elapsed() < Duration::from_millis(50));
}

#[test]
fn test_shutdown_drains_queued_jobs() {
    let jobs = system(1);
    let done = Arc::new(Mutex::new(0usize));

    // Bloquea el worker Window para que el resto quede encolado
    let gate = jobs
        .add_task(Affinity::Window, || thread::sleep(Duration::from_millis(50)))
        .unwrap();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let done = Arc::clone(&done);
            jobs.add_task(Affinity::Window, move || *done.lock() += 1).unwrap()
        })
        .collect();

    let waiter = {
        let jobs = Arc::clone(&jobs);
        let last = handles[handles.len() - 1].clone();
        thread::spawn(move || jobs.wait(&last))
    };

    jobs.shutdown();

    assert!(gate.is_completed());
    assert!(handles.iter().all(|h| h.is_completed()));
    assert_eq!(*done.lock(), 20);
    assert!(waiter.join().unwrap().is_ok());

    let rejected = jobs.add_task(Affinity::Window, || {});
    assert!(matches!(rejected, Err(JobError::ShuttingDown)));
}

#[test]
fn test_default_job_computes_result_in_payload() {
    let jobs = system(4);

    let handle = jobs
        .add_job_with(Affinity::Default, &(6u32, 7u32, 0u32), |ctx| {
            ctx.update::<(u32, u32, u32), _>(|(a, b, out)| *out = *a * *b)
                .unwrap();
        })
        .unwrap();

    jobs.wait(&handle).unwrap();
    let (_, _, result): (u32, u32, u32) = handle.data().unwrap();
    assert_eq!(result, 42);
}

#[test]
fn test_window_jobs_see_writes_of_previous_window_jobs() {
    let jobs = system(2);
    let flag = Arc::new(AtomicBool::new(false));

    let writer = {
        let flag = Arc::clone(&flag);
        jobs.add_task(Affinity::Window, move || {
            thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::Relaxed);
        })
        .unwrap()
    };

    let reader = {
        let flag = Arc::clone(&flag);
        jobs.run(Affinity::Window, move || flag.load(Ordering::Relaxed))
    };

    assert!(writer.is_completed());
    assert!(reader.unwrap());
}

#[test]
fn test_concurrent_submitters_on_window_are_serialized() {
    let jobs = system(2);
    // Sin atomics: la exclusión la da el único worker Window
    let counter = Arc::new(Mutex::new(0u32));

    let submitters: Vec<_> = (0..4)
        .map(|_| {
            let jobs = Arc::clone(&jobs);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                let handles: Vec<_> = (0..100)
                    .map(|_| {
                        let counter = Arc::clone(&counter);
                        jobs.add_task(Affinity::Window, move || {
                            let current = *counter.lock();
                            *counter.lock() = current + 1;
                        })
                        .unwrap()
                    })
                    .collect();
                for handle in &handles {
                    jobs.wait(handle).unwrap();
                }
            })
        })
        .collect();

    for submitter in submitters {
        submitter.join().unwrap();
    }

    assert_eq!(*counter.lock(), 400);
}

#[test]
fn test_window_jobs_run_on_the_window_thread() {
    let jobs = system(2);

    let (name, affinity) = jobs
        .run(Affinity::Window, || {
            (
                thread::current().name().map(str::to_string),
                JobSystem::current_affinity(),
            )
        })
        .unwrap();

    assert_eq!(name.as_deref(), Some("it-window-0"));
    assert_eq!(affinity, Some(Affinity::Window));
    assert_eq!(JobSystem::current_affinity(), None);
}

#[test]
fn test_panicking_job_does_not_kill_worker() {
    let jobs = system(1);

    let bad = jobs
        .add_task(Affinity::Window, || panic!("boom"))
        .unwrap();
    jobs.wait(&bad).unwrap();
    assert!(bad.panicked());

    assert_eq!(jobs.run(Affinity::Window, || 5).unwrap(), 5);
}

#[test]
fn test_wait_timeout_on_slow_job() {
    let jobs = system(1);

    let slow = jobs
        .add_task(Affinity::Default, || thread::sleep(Duration::from_millis(200)))
        .unwrap();

    assert!(!jobs.wait_timeout(&slow, Duration::from_millis(10)).unwrap());
    assert!(jobs.wait_timeout(&slow, Duration::from_secs(5)).unwrap());
}

#[test]
fn test_stats_after_shutdown_count_completed_jobs() {
    let jobs = system(2);

    for _ in 0..10 {
        jobs.add_task(Affinity::Default, || {}).unwrap();
    }
    jobs.add_task(Affinity::Window, || {}).unwrap();
    jobs.shutdown();

    let stats = jobs.stats();
    assert!(!stats.accepting);

    let default = stats.metrics.for_affinity(Affinity::Default);
    assert_eq!(default.submitted, 10);
    assert_eq!(default.completed, 10);
    assert_eq!(stats.metrics.for_affinity(Affinity::Window).completed, 1);

    let json = stats.to_json_pretty().unwrap();
    assert!(json.contains("\"window\""));
}

#[test]
fn test_wait_timeout_with_max_duration_behaves_like_wait() {
    let jobs = system(1);

    let handle = jobs
        .add_task(Affinity::Default, || thread::sleep(Duration::from_millis(20)))
        .unwrap();

    assert!(jobs.wait_timeout(&handle, Duration::MAX).unwrap());
    assert!(handle.is_completed());
}

#[test]
fn test_submissions_from_window_job_keep_order() {
    let jobs = system(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    let outer = {
        let inner = Arc::clone(&jobs);
        let order = Arc::clone(&order);
        jobs.add_task(Affinity::Window, move || {
            for label in ["T1", "T2"] {
                let order = Arc::clone(&order);
                inner
                    .add_task(Affinity::Window, move || order.lock().push(label))
                    .unwrap();
            }
            // Con T1 y T2 en cola, adelantarse no está permitido
            let jumped = inner.run(Affinity::Window, || ());
            assert!(matches!(jumped, Err(JobError::WouldDeadlock(Affinity::Window))));
        })
        .unwrap()
    };

    jobs.wait(&outer).unwrap();
    assert!(!outer.panicked());

    jobs.run(Affinity::Window, || ()).unwrap();
    assert_eq!(*order.lock(), vec!["T1", "T2"]);
}

#[test]
fn test_every_shutdown_caller_returns_after_drain() {
    let jobs = system(2);
    let drained = Arc::new(Mutex::new(0usize));

    jobs.add_task(Affinity::Window, || thread::sleep(Duration::from_millis(100)))
        .unwrap();
    for _ in 0..5 {
        let drained = Arc::clone(&drained);
        jobs.add_task(Affinity::Window, move || *drained.lock() += 1).unwrap();
    }

    let callers: Vec<_> = (0..3)
        .map(|_| {
            let jobs = Arc::clone(&jobs);
            let drained = Arc::clone(&drained);
            thread::spawn(move || {
                jobs.shutdown();
                *drained.lock()
            })
        })
        .collect();

    for caller in callers {
        assert_eq!(caller.join().unwrap(), 5);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_window_preserves_fifo(count in 1usize..64) {
        let jobs = system(1);
        let order = Arc::new(Mutex::new(Vec::with_capacity(count)));

        let mut last = None;
        for i in 0..count {
            let order = Arc::clone(&order);
            last = Some(jobs.add_task(Affinity::Window, move || order.lock().push(i)).unwrap());
        }
        if let Some(handle) = last {
            jobs.wait(&handle).unwrap();
        }

        let expected: Vec<usize> = (0..count).collect();
        prop_assert_eq!(order.lock().clone(), expected);
    }
}
