use super::super::Real;
use std::fmt::Display;

/// A single detected event.
/// `size` and `width` are only present when the store the event was read
/// from carries the corresponding channel.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub time: Real,
    pub size: Option<Real>,
    pub width: Option<Real>,
}

impl Event {
    pub fn new(time: Real) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    pub fn with_size(time: Real, size: Real) -> Self {
        Self {
            time,
            size: Some(size),
            width: None,
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{0}", self.time)?;
        if let Some(size) = self.size {
            write!(f, ",{size}")?;
        }
        if let Some(width) = self.width {
            write!(f, ",{width}")?;
        }
        Ok(())
    }
}
