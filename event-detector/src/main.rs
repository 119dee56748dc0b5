mod parameters;
mod processing;

use anyhow::{Context, Result};
use clap::Parser;
use event_detection_common::{
    init_tracer,
    metrics::{
        component_info_metric,
        failures::{self, FailureKind},
        names::{
            CANDIDATES_DEFERRED, CANDIDATES_REJECTED, EVENTS_DETECTED, FAILURES, LAST_THRESHOLD,
            SAMPLES_SCANNED, TRACES_PROCESSED,
        },
    },
};
use event_detector::{event_detection::Real, trace_file::TraceFile};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use parameters::{Mode, PolicyParameters};
use processing::Settings;
use rayon::prelude::*;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    net::SocketAddr,
    path::PathBuf,
};
use tracing::{error, info, level_filters::LevelFilter};

// cargo run --bin event-detector -- --trace-file trace.dat --chunk-size 64 peak-trough --threshold=0.5,0.1,10 --hist

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Text files with one `time value` sample per line
    #[clap(long, required = true)]
    trace_file: Vec<PathBuf>,

    /// Write the events here instead of to stdout
    #[clap(long)]
    output_file: Option<PathBuf>,

    /// Factor applied to event times on output
    #[clap(long, default_value = "1")]
    time_scale: Real,

    /// Feed each trace to the detector this many samples at a time, zero for all at once
    #[clap(long, default_value = "0")]
    chunk_size: usize,

    /// Capacity of the good and bad event histories
    #[clap(long, default_value = "1000")]
    history_size: usize,

    /// Weight of the newest event in the running means of each store
    #[clap(long, default_value = "0.03")]
    mean_ratio: Real,

    /// Keep only the newest events in stores of this capacity
    #[clap(long)]
    cyclic_capacity: Option<usize>,

    /// Also write the good and bad event histories
    #[clap(long)]
    write_history: bool,

    #[clap(flatten)]
    policy: PolicyParameters,

    /// If set, metrics are served in the prometheus format at this address
    #[clap(long, env)]
    observability_address: Option<SocketAddr>,

    /// Applied when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    pub(crate) mode: Mode,
}

fn describe_metrics() {
    metrics::describe_counter!(
        TRACES_PROCESSED,
        metrics::Unit::Count,
        "Number of traces processed"
    );
    metrics::describe_counter!(
        SAMPLES_SCANNED,
        metrics::Unit::Count,
        "Number of samples handed to the detector"
    );
    metrics::describe_counter!(
        EVENTS_DETECTED,
        metrics::Unit::Count,
        "Number of accepted events"
    );
    metrics::describe_counter!(
        CANDIDATES_REJECTED,
        metrics::Unit::Count,
        "Number of rejected candidates"
    );
    metrics::describe_counter!(
        CANDIDATES_DEFERRED,
        metrics::Unit::Count,
        "Number of times a decision on a candidate was deferred"
    );
    metrics::describe_counter!(
        FAILURES,
        metrics::Unit::Count,
        "Number of failures encountered"
    );
    metrics::describe_gauge!(LAST_THRESHOLD, "Threshold at the end of the last trace");
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let _tracer = init_tracer!(args.log_level)?;

    if let Some(address) = args.observability_address {
        PrometheusBuilder::new()
            .with_http_listener(address)
            .install()
            .context("prometheus metrics exporter should be setup")?;
        describe_metrics();
        component_info_metric("event-detector");
    }

    let settings = Settings {
        chunk_size: args.chunk_size,
        history_size: args.history_size,
        mean_ratio: args.mean_ratio,
        cyclic_capacity: args.cyclic_capacity,
        policy: args.policy.clone(),
    };

    let results: Vec<_> = args
        .trace_file
        .par_iter()
        .map(|path| {
            let detections = TraceFile::load(path)
                .map(|trace| processing::process(&trace, &args.mode, &settings));
            (path, detections)
        })
        .collect();

    let mut output: Box<dyn Write> = match &args.output_file {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Cannot create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    for (path, detections) in results {
        match detections {
            Ok(detections) => {
                info!(
                    "{}: threshold ended at {}",
                    path.display(),
                    detections.threshold.value
                );
                let source = path.display().to_string();
                if let Err(e) =
                    detections.write(&mut output, &source, args.time_scale, args.write_history)
                {
                    counter!(FAILURES, &[failures::get_label(FailureKind::FileWriteFailed)])
                        .increment(1);
                    return Err(e).context("Cannot write events");
                }
            }
            Err(e) => {
                error!("{}: {e}", path.display());
                counter!(FAILURES, &[failures::get_label(FailureKind::TraceLoadFailed)])
                    .increment(1);
            }
        }
    }
    output.flush()?;
    Ok(())
}
