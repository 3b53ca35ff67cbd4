//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta contadores y latencias de los jobs, separados por afinidad.

use crate::jobs::types::Affinity;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Máximo de latencias a guardar por afinidad (para calcular percentiles)
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct JobMetrics {
    inner: Arc<Mutex<[AffinityData; 2]>>,
    start_time: Instant,
}

/// Datos internos de una afinidad
#[derive(Default)]
struct AffinityData {
    submitted: u64,
    rejected: u64,
    completed: u64,
    panicked: u64,

    /// Tiempo en ejecución (microsegundos)
    run_latencies: VecDeque<u64>,

    /// Tiempo en cola antes de ejecutarse (microsegundos)
    queue_latencies: VecDeque<u64>,
}

fn push_sample(samples: &mut VecDeque<u64>, latency: Duration) {
    // Si tenemos demasiadas latencias, eliminar las más antiguas
    if samples.len() >= MAX_LATENCY_SAMPLES {
        samples.pop_front();
    }
    samples.push_back(latency.as_micros() as u64);
}

impl JobMetrics {
    /// Crea un nuevo collector de métricas
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Default::default())),
            start_time: Instant::now(),
        }
    }

    /// Registra un job aceptado en la cola
    pub fn record_submitted(&self, affinity: Affinity) {
        self.inner.lock()[affinity.index()].submitted += 1;
    }

    /// Registra un job rechazado al encolar
    pub fn record_rejected(&self, affinity: Affinity) {
        self.inner.lock()[affinity.index()].rejected += 1;
    }

    /// Registra un job terminado por un worker
    pub fn record_completed(&self, affinity: Affinity, queued: Duration, ran: Duration, panicked: bool) {
        let mut data = self.inner.lock();
        let data = &mut data[affinity.index()];

        data.completed += 1;
        if panicked {
            data.panicked += 1;
        }
        push_sample(&mut data.queue_latencies, queued);
        push_sample(&mut data.run_latencies, ran);
    }

    /// Obtiene un snapshot de las métricas
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.inner.lock();

        let per_affinity = Affinity::ALL
            .iter()
            .map(|affinity| {
                let data = &data[affinity.index()];
                AffinitySnapshot {
                    affinity: *affinity,
                    submitted: data.submitted,
                    rejected: data.rejected,
                    completed: data.completed,
                    panicked: data.panicked,
                    run_latency_us: LatencySummary::from_samples(&data.run_latencies),
                    queue_latency_us: LatencySummary::from_samples(&data.queue_latencies),
                }
            })
            .collect();

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            per_affinity,
        }
    }
}

impl Default for JobMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentiles de latencia en microsegundos
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub avg: u64,
    pub stddev: f64,
    pub samples: usize,
}

impl LatencySummary {
    /// Calcula percentiles, promedio y desviación estándar
    fn from_samples(latencies: &VecDeque<u64>) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }

        let mut sorted: Vec<u64> = latencies.iter().copied().collect();
        sorted.sort_unstable();

        let len = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let avg = sum / len as u64;

        let variance: f64 = sorted
            .iter()
            .map(|&x| {
                let diff = x as f64 - avg as f64;
                diff * diff
            })
            .sum::<f64>()
            / len as f64;

        Self {
            p50: sorted[len * 50 / 100],
            p95: sorted[len * 95 / 100],
            p99: sorted[len * 99 / 100],
            avg,
            stddev: variance.sqrt(),
            samples: len,
        }
    }
}

/// Métricas de una afinidad
#[derive(Debug, Clone, Serialize)]
pub struct AffinitySnapshot {
    pub affinity: Affinity,
    pub submitted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub panicked: u64,
    pub run_latency_us: LatencySummary,
    pub queue_latency_us: LatencySummary,
}

/// Snapshot de métricas (para uso externo)
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub per_affinity: Vec<AffinitySnapshot>,
}

impl MetricsSnapshot {
    pub fn for_affinity(&self, affinity: Affinity) -> &AffinitySnapshot {
        &self.per_affinity[affinity.index()]
    }
}
