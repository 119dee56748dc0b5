pub mod metrics;
pub mod tracer;

/// Scalar type of sample values, sample times and event attributes.
pub type Real = f64;
