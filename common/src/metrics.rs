use metrics::{describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = "event_detection_component_info";

    describe_gauge!(NAME, "Basic information about the component");

    let git_rev = option_env!("GIT_VERSION").unwrap_or("unknown");
    gauge!(NAME, "component" => name, "git_version" => git_rev).set(1);
}

pub mod names {
    use const_format::concatcp;

    pub const METRIC_NAME_PREFIX: &str = "event_detection_";

    pub const FAILURES: &str = concatcp!(METRIC_NAME_PREFIX, "failures");
    pub const TRACES_PROCESSED: &str = concatcp!(METRIC_NAME_PREFIX, "traces_processed");
    pub const SAMPLES_SCANNED: &str = concatcp!(METRIC_NAME_PREFIX, "samples_scanned");
    pub const EVENTS_DETECTED: &str = concatcp!(METRIC_NAME_PREFIX, "events_detected");
    pub const CANDIDATES_REJECTED: &str = concatcp!(METRIC_NAME_PREFIX, "candidates_rejected");
    pub const CANDIDATES_DEFERRED: &str = concatcp!(METRIC_NAME_PREFIX, "candidates_deferred");
    pub const LAST_THRESHOLD: &str = concatcp!(METRIC_NAME_PREFIX, "last_threshold");
}

pub mod detections {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
    pub enum DetectionKind {
        Peak,
        Trough,
        Rising,
        Falling,
    }

    // Label building function
    pub fn get_label(detection_kind: DetectionKind) -> (&'static str, &'static str) {
        (
            "detection_kind",
            match detection_kind {
                DetectionKind::Peak => "peak",
                DetectionKind::Trough => "trough",
                DetectionKind::Rising => "rising",
                DetectionKind::Falling => "falling",
            },
        )
    }
}

pub mod failures {
    #[derive(Debug, Clone, Eq, Hash, PartialEq)]
    pub enum FailureKind {
        FileWriteFailed,
        InvalidStoreState,
        TraceLoadFailed,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::FileWriteFailed => "file_write_failed",
                FailureKind::InvalidStoreState => "invalid_store_state",
                FailureKind::TraceLoadFailed => "trace_load_failed",
            },
        )
    }
}
