pub mod access_phase;
pub mod backpressure;
pub mod request_metrics;
