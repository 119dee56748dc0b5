//! Tools for detecting events in sampled traces that keep growing.
//!
//! A [Detector] scans the samples appended to a trace since its last call,
//! hands every peak, trough or threshold crossing it finds to an
//! [AcceptPolicy], and pushes the accepted ones into an [EventStore].
//! Typical usage may look like:
//! ```rust
//! use event_detector::event_detection::{AcceptEvent, Detector, EventStore, Threshold, Trace};
//!
//! let times: Vec<f64> = (0..100).map(|i| i as f64 * 0.01).collect();
//! let values: Vec<f64> = times.iter().map(|t| (6.0 * t).sin()).collect();
//!
//! let trace = Trace::new(&values, &times);
//! let mut peaks = EventStore::new();
//! let mut troughs = EventStore::new();
//! let mut threshold = Threshold::new(0.5, 0.1, 10.0);
//!
//! let mut detector = Detector::default();
//! detector.init(&trace);
//! detector.peak_trough(&trace, &mut peaks, &mut troughs, &mut threshold, &mut AcceptEvent);
//! assert_eq!(peaks.len(), 1);
//! ```

pub mod datatype;
pub mod detectors;
pub mod policy;
pub mod store;

pub use datatype::{
    EpanechnikovKernel, Event, GaussKernel, Kernel, RectKernel, SampledSeries, TriangularKernel,
};
pub use detectors::{Decay, Detector, Direction, Threshold, Trace};
pub use event_detection_common::Real;
pub use policy::{AcceptEvent, AcceptPolicy, Candidate, Decision, EventKind, ScanContext};
pub use store::{EventStore, EventStoreView, NumberFormat, Notation, ObservationWindow, StoreError};
