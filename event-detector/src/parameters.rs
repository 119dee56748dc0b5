use std::str::FromStr;

use anyhow::{Error, anyhow};
use clap::{Parser, Subcommand};
use event_detector::event_detection::{Decay, Real, Threshold};

#[derive(Default, Debug, Clone)]
pub struct ThresholdWrapper(pub(crate) Threshold);

impl FromStr for ThresholdWrapper {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let vals: Vec<_> = s.split(',').collect();
        if let [value, min, max] = vals.as_slice() {
            Ok(ThresholdWrapper(Threshold::new(
                Real::from_str(value.trim())?,
                Real::from_str(min.trim())?,
                Real::from_str(max.trim())?,
            )))
        } else {
            Err(anyhow!(
                "Incorrect number of parameters in threshold, expected pattern 'value,min,max', got '{s}'"
            ))
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct DecayWrapper(pub(crate) Decay);

impl FromStr for DecayWrapper {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let vals: Vec<_> = s.split(',').collect();
        if let [delay, decay] = vals.as_slice() {
            Ok(DecayWrapper(Decay::new(
                Real::from_str(delay.trim())?,
                Real::from_str(decay.trim())?,
            )))
        } else {
            Err(anyhow!(
                "Incorrect number of parameters in decay, expected pattern 'delay,decay', got '{s}'"
            ))
        }
    }
}

#[derive(Default, Debug, Clone, Parser)]
pub struct ExtremaParameters {
    /// Minimum amplitude of an extremum, with the range the threshold is kept in
    #[clap(long)]
    pub threshold: ThresholdWrapper,

    /// Lets the threshold decay towards its minimum while no event is found
    #[clap(long)]
    pub decay: Option<DecayWrapper>,

    /// Log candidates in the good and bad event histories
    #[clap(long)]
    pub hist: bool,
}

#[derive(Default, Debug, Clone, Parser)]
pub struct CrossingParameters {
    #[clap(long)]
    pub threshold: ThresholdWrapper,

    #[clap(long)]
    pub decay: Option<DecayWrapper>,
}

#[derive(Default, Debug, Clone, Parser)]
pub struct ThresholdExtremaParameters {
    #[clap(long)]
    pub threshold: ThresholdWrapper,
}

/// Rules applied to every candidate before it is stored.
#[derive(Default, Debug, Clone, Parser)]
pub struct PolicyParameters {
    /// Reject candidates closer than this to the previous event of their store
    #[clap(long, default_value = "0")]
    pub min_interval: Real,

    /// Wait until this many samples past a candidate are available before deciding on it
    #[clap(long, default_value = "0")]
    pub settle: usize,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    #[clap(about = "Detects peaks and troughs. Events consist of a time and an amplitude.")]
    PeakTrough(ExtremaParameters),
    #[clap(about = "Detects peaks only, tracking troughs without storing them.")]
    Peak(ExtremaParameters),
    #[clap(about = "Detects troughs only, tracking peaks without storing them.")]
    Trough(ExtremaParameters),
    #[clap(about = "Detects upward crossings of the threshold.")]
    Rising(CrossingParameters),
    #[clap(about = "Detects downward crossings of the threshold.")]
    Falling(CrossingParameters),
    #[clap(about = "Detects the largest maximum of each excursion above the threshold.")]
    ThresholdPeak(ThresholdExtremaParameters),
    #[clap(about = "Detects the smallest minimum of each excursion below the threshold.")]
    ThresholdTrough(ThresholdExtremaParameters),
}

impl Mode {
    pub(crate) fn threshold(&self) -> Threshold {
        match self {
            Mode::PeakTrough(parameters) | Mode::Peak(parameters) | Mode::Trough(parameters) => {
                parameters.threshold.0
            }
            Mode::Rising(parameters) | Mode::Falling(parameters) => parameters.threshold.0,
            Mode::ThresholdPeak(parameters) | Mode::ThresholdTrough(parameters) => {
                parameters.threshold.0
            }
        }
    }
}
