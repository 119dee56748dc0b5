use crate::parameters::{Mode, PolicyParameters};
use event_detection_common::metrics::{
    detections::{self, DetectionKind},
    failures::{self, FailureKind},
    names::{
        CANDIDATES_DEFERRED, CANDIDATES_REJECTED, EVENTS_DETECTED, FAILURES, LAST_THRESHOLD,
        SAMPLES_SCANNED, TRACES_PROCESSED,
    },
};
use event_detector::{
    event_detection::{
        AcceptPolicy, Candidate, Decision, Detector, EventKind, EventStore, NumberFormat, Real,
        ScanContext, Threshold, Trace,
    },
    trace_file::TraceFile,
};
use metrics::{counter, gauge};
use std::io::{self, Write};
use tracing::{debug, warn};

/// Options shared by every trace of a run.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    /// Samples handed to the detector per call; zero feeds the whole trace at once.
    pub(crate) chunk_size: usize,
    pub(crate) history_size: usize,
    pub(crate) mean_ratio: Real,
    pub(crate) cyclic_capacity: Option<usize>,
    pub(crate) policy: PolicyParameters,
}

impl Settings {
    fn event_store(&self, ident: &str) -> EventStore {
        let mut store = match self.cyclic_capacity {
            Some(capacity) => EventStore::cyclic(capacity, true, false),
            None => EventStore::with_capacity(0, true, false),
        }
        .with_ident(ident);
        store.set_mean_ratio(self.mean_ratio);
        store
    }
}

fn detection_kind(kind: EventKind) -> DetectionKind {
    match kind {
        EventKind::Peak => DetectionKind::Peak,
        EventKind::Trough => DetectionKind::Trough,
        EventKind::Rising => DetectionKind::Rising,
        EventKind::Falling => DetectionKind::Falling,
    }
}

/// Rejects candidates following the previous event too closely and waits
/// for `settle` samples past each candidate. Every decision is counted.
struct ScreeningPolicy {
    min_interval: Real,
    settle: usize,
}

impl AcceptPolicy for ScreeningPolicy {
    fn evaluate(&mut self, candidate: &Candidate, context: &mut ScanContext<'_>) -> Decision {
        let label = [detections::get_label(detection_kind(candidate.kind))];
        if context.last() < candidate.position + self.settle + 1 {
            counter!(CANDIDATES_DEFERRED, &label).increment(1);
            return Decision::Defer;
        }
        let too_close = context
            .store()
            .back()
            .is_some_and(|previous| candidate.time - previous < self.min_interval);
        if too_close {
            counter!(CANDIDATES_REJECTED, &label).increment(1);
            Decision::Reject
        } else {
            counter!(EVENTS_DETECTED, &label).increment(1);
            Decision::accept(candidate)
        }
    }
}

/// The events found in one trace.
#[derive(Debug)]
pub(crate) struct Detections {
    pub(crate) stores: Vec<EventStore>,
    pub(crate) good_events: EventStore,
    pub(crate) bad_events: EventStore,
    pub(crate) threshold: Threshold,
}

impl Detections {
    /// Writes each store as a block of `time size` lines headed by its name.
    pub(crate) fn write<W: Write>(
        &self,
        writer: &mut W,
        source: &str,
        time_scale: Real,
        history: bool,
    ) -> io::Result<()> {
        let format = NumberFormat::default();
        let histories = [&self.good_events, &self.bad_events];
        let stores = self
            .stores
            .iter()
            .chain(histories.into_iter().filter(|_| history));
        for store in stores {
            writeln!(writer, "# {source}: {} ({} events)", store.ident(), store.len())?;
            store.save_sizes(writer, time_scale, &format, "")?;
        }
        Ok(())
    }
}

fn run<P: AcceptPolicy>(
    detector: &mut Detector,
    mode: &Mode,
    trace: &Trace,
    stores: &mut [EventStore],
    threshold: &mut Threshold,
    policy: &mut P,
) {
    let [events, others @ ..] = stores else {
        return;
    };
    match mode {
        Mode::PeakTrough(parameters) => {
            let Some(troughs) = others.first_mut() else {
                return;
            };
            match (&parameters.decay, parameters.hist) {
                (None, false) => detector.peak_trough(trace, events, troughs, threshold, policy),
                (None, true) => detector.peak_trough_hist(trace, events, troughs, threshold, policy),
                (Some(decay), false) => {
                    detector.dynamic_peak_trough(trace, events, troughs, threshold, &decay.0, policy)
                }
                (Some(decay), true) => detector
                    .dynamic_peak_trough_hist(trace, events, troughs, threshold, &decay.0, policy),
            }
        }
        Mode::Peak(parameters) => match (&parameters.decay, parameters.hist) {
            (None, false) => detector.peak(trace, events, threshold, policy),
            (None, true) => detector.peak_hist(trace, events, threshold, policy),
            (Some(decay), false) => detector.dynamic_peak(trace, events, threshold, &decay.0, policy),
            (Some(decay), true) => {
                detector.dynamic_peak_hist(trace, events, threshold, &decay.0, policy)
            }
        },
        Mode::Trough(parameters) => match (&parameters.decay, parameters.hist) {
            (None, false) => detector.trough(trace, events, threshold, policy),
            (None, true) => detector.trough_hist(trace, events, threshold, policy),
            (Some(decay), false) => {
                detector.dynamic_trough(trace, events, threshold, &decay.0, policy)
            }
            (Some(decay), true) => {
                detector.dynamic_trough_hist(trace, events, threshold, &decay.0, policy)
            }
        },
        Mode::Rising(parameters) => match &parameters.decay {
            None => detector.rising(trace, events, threshold, policy),
            Some(decay) => detector.dynamic_rising(trace, events, threshold, &decay.0, policy),
        },
        Mode::Falling(parameters) => match &parameters.decay {
            None => detector.falling(trace, events, threshold, policy),
            Some(decay) => detector.dynamic_falling(trace, events, threshold, &decay.0, policy),
        },
        Mode::ThresholdPeak(_) => detector.threshold_peak_hist(trace, events, threshold, policy),
        Mode::ThresholdTrough(_) => detector.threshold_trough_hist(trace, events, threshold, policy),
    }
}

fn store_names(mode: &Mode) -> &'static [&'static str] {
    match mode {
        Mode::PeakTrough(_) => &["Peaks", "Troughs"],
        Mode::Peak(_) | Mode::ThresholdPeak(_) => &["Peaks"],
        Mode::Trough(_) | Mode::ThresholdTrough(_) => &["Troughs"],
        Mode::Rising(_) => &["Rising"],
        Mode::Falling(_) => &["Falling"],
    }
}

/// Runs the detector selected by `mode` over `trace`, feeding it
/// `settings.chunk_size` samples at a time.
#[tracing::instrument(skip_all, fields(samples = trace.len()))]
pub(crate) fn process(trace: &TraceFile, mode: &Mode, settings: &Settings) -> Detections {
    let mut stores: Vec<EventStore> = store_names(mode)
        .iter()
        .map(|name| settings.event_store(name))
        .collect();
    let mut threshold = mode.threshold();
    let mut policy = ScreeningPolicy {
        min_interval: settings.policy.min_interval,
        settle: settings.policy.settle,
    };

    let mut detector = Detector::new(settings.history_size);
    detector.init(&trace.trace());

    let chunk_size = if settings.chunk_size == 0 {
        trace.len().max(1)
    } else {
        settings.chunk_size
    };
    let mut end = 0;
    loop {
        end = (end + chunk_size).min(trace.len());
        let chunk = trace.trace_until(end);
        run(&mut detector, mode, &chunk, &mut stores, &mut threshold, &mut policy);
        if end >= trace.len() {
            break;
        }
    }
    if let Some(candidate) = detector.pending() {
        debug!("Candidate at {} still undecided at the end of the trace", candidate.time);
    }

    for store in &stores {
        if let Err(e) = store.check() {
            warn!("{}: {e}", store.ident());
            counter!(FAILURES, &[failures::get_label(FailureKind::InvalidStoreState)])
                .increment(1);
        }
    }
    counter!(TRACES_PROCESSED).increment(1);
    counter!(SAMPLES_SCANNED).increment(trace.len() as u64);
    gauge!(LAST_THRESHOLD).set(threshold.value);

    Detections {
        stores,
        good_events: detector.good_events().clone(),
        bad_events: detector.bad_events().clone(),
        threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{CrossingParameters, ExtremaParameters, ThresholdWrapper};
    use assert_approx_eq::assert_approx_eq;

    fn sine_file() -> TraceFile {
        let text: String = (0..400)
            .map(|i| {
                let t = i as Real * 0.01;
                format!("{t} {}\n", (std::f64::consts::TAU * t).sin())
            })
            .collect();
        TraceFile::parse(text.as_bytes()).expect("trace is valid")
    }

    fn settings(chunk_size: usize, settle: usize) -> Settings {
        Settings {
            chunk_size,
            history_size: 100,
            mean_ratio: 0.1,
            cyclic_capacity: None,
            policy: PolicyParameters {
                min_interval: 0.0,
                settle,
            },
        }
    }

    fn peak_trough() -> Mode {
        Mode::PeakTrough(ExtremaParameters {
            threshold: ThresholdWrapper(Threshold::new(0.5, 0.1, 10.0)),
            decay: None,
            hist: true,
        })
    }

    #[test]
    fn chunking_does_not_change_the_events() {
        let trace = sine_file();
        let whole = process(&trace, &peak_trough(), &settings(0, 3));
        let chunked = process(&trace, &peak_trough(), &settings(7, 3));
        assert_eq!(whole.stores.len(), 2);
        assert_eq!(whole.stores[0].len(), 4);
        for (a, b) in whole.stores.iter().zip(&chunked.stores) {
            assert_eq!(a.collect_times(), b.collect_times());
        }
        assert_eq!(whole.good_events.len(), chunked.good_events.len());
    }

    #[test]
    fn minimum_interval_rejects() {
        let trace = sine_file();
        let mode = Mode::Rising(CrossingParameters {
            threshold: ThresholdWrapper(Threshold::new(0.0, -1.0, 1.0)),
            decay: None,
        });
        let mut settings = settings(0, 0);
        let all = process(&trace, &mode, &settings);
        assert_eq!(all.stores[0].len(), 4);

        settings.policy.min_interval = 1.5;
        let screened = process(&trace, &mode, &settings);
        assert_eq!(screened.stores[0].len(), 2);
        assert_approx_eq!(screened.stores[0].time(1) - screened.stores[0].time(0), 2.0, 0.011);
    }

    #[test]
    fn writes_blocks() {
        let trace = sine_file();
        let detections = process(&trace, &peak_trough(), &settings(0, 0));
        let mut buffer = Vec::new();
        detections
            .write(&mut buffer, "sine", 1.0, false)
            .expect("writing to a Vec cannot fail");
        let text = String::from_utf8(buffer).expect("output is utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# sine: Peaks (4 events)");
        assert_eq!(lines.len(), 2 + 4 + 4);
        assert!(!text.contains("GoodEvents"));
    }
}
