//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Este módulo implementa la recolección y agregación de métricas de jobs:
//! - Contadores de jobs aceptados, rechazados, completados y con panic
//! - Latencias en cola y de ejecución (p50, p95, p99)

pub mod collector;

pub use collector::{AffinitySnapshot, JobMetrics, LatencySummary, MetricsSnapshot};
