pub mod event_detection;
pub mod trace_file;
