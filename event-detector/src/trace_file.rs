//! Plain text traces: one `time value` pair per line, separated by
//! whitespace or commas. Blank lines and lines starting with `#` are skipped,
//! further columns are ignored.

use crate::event_detection::{Real, Trace};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    num::ParseFloatError,
    path::Path,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TraceFileError {
    #[error("Cannot read trace: {0}")]
    Io(#[from] io::Error),
    #[error("Line {line}: expected 'time value', got '{text}'")]
    MissingColumn { line: usize, text: String },
    #[error("Line {line}: {source}")]
    InvalidNumber {
        line: usize,
        #[source]
        source: ParseFloatError,
    },
    #[error("Line {line}: time {time} precedes the previous sample")]
    NotMonotonic { line: usize, time: Real },
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct TraceFile {
    times: Vec<Real>,
    values: Vec<Real>,
}

impl TraceFile {
    pub fn load(path: &Path) -> Result<Self, TraceFileError> {
        let trace = Self::parse(BufReader::new(File::open(path)?))?;
        debug!("Loaded {} samples from {}", trace.len(), path.display());
        Ok(trace)
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Self, TraceFileError> {
        let mut trace = Self::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let number = |field: &str| {
                field
                    .parse::<Real>()
                    .map_err(|source| TraceFileError::InvalidNumber {
                        line: index + 1,
                        source,
                    })
            };
            let mut fields = text
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|field| !field.is_empty());
            let (Some(time), Some(value)) = (fields.next(), fields.next()) else {
                return Err(TraceFileError::MissingColumn {
                    line: index + 1,
                    text: text.to_owned(),
                });
            };
            let time = number(time)?;
            if trace.times.last().is_some_and(|&previous| time < previous) {
                return Err(TraceFileError::NotMonotonic {
                    line: index + 1,
                    time,
                });
            }
            trace.times.push(time);
            trace.values.push(number(value)?);
        }
        Ok(trace)
    }

    pub fn times(&self) -> &[Real] {
        &self.times
    }

    pub fn values(&self) -> &[Real] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The samples before `end`, as if the rest had not been recorded yet.
    pub fn trace_until(&self, end: usize) -> Trace<'_> {
        let end = end.min(self.len());
        Trace::new(&self.values[..end], &self.times[..end])
    }

    pub fn trace(&self) -> Trace<'_> {
        Trace::new(&self.values, &self.times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_separators() {
        let text = "# time value\n0.0 1.5\n\n0.1,2.5\n  0.2\t-3 ignored\n";
        let trace = TraceFile::parse(text.as_bytes()).expect("trace is valid");
        assert_eq!(trace.times(), &[0.0, 0.1, 0.2]);
        assert_eq!(trace.values(), &[1.5, 2.5, -3.0]);
        assert_eq!(trace.trace_until(2).last(), 2);
        assert_eq!(trace.trace_until(10).last(), 3);
    }

    #[test]
    fn reports_the_offending_line() {
        let error = TraceFile::parse("0 1\n0.5\n".as_bytes()).expect_err("second line is short");
        assert!(matches!(error, TraceFileError::MissingColumn { line: 2, .. }));

        let error = TraceFile::parse("0 1\n1 x\n".as_bytes()).expect_err("value is not a number");
        assert!(matches!(error, TraceFileError::InvalidNumber { line: 2, .. }));

        let error = TraceFile::parse("1 1\n0 1\n".as_bytes()).expect_err("times go backwards");
        assert!(matches!(error, TraceFileError::NotMonotonic { line: 2, .. }));
    }

    #[test]
    fn missing_file() {
        let error = TraceFile::load(Path::new("/nonexistent/trace.dat")).expect_err("no file");
        assert!(matches!(error, TraceFileError::Io(_)));
    }
}
