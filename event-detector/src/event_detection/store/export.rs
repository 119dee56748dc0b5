use super::{EventStore, Real};
use std::io::{self, Write};
use strum::{Display, EnumString};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Notation {
    Fixed,
    Scientific,
    /// Fixed or scientific, whichever is shorter for the value, without trailing zeros.
    #[default]
    General,
}

/// How numbers are rendered by the text exporters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberFormat {
    pub notation: Notation,
    /// Field width; negative values align left.
    pub width: i32,
    /// Digits after the decimal point, or significant digits for [Notation::General].
    pub precision: usize,
    pub uppercase: bool,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            notation: Notation::General,
            width: 0,
            precision: 6,
            uppercase: false,
        }
    }
}

impl NumberFormat {
    pub fn new(notation: Notation, width: i32, precision: usize) -> Self {
        Self {
            notation,
            width,
            precision,
            uppercase: false,
        }
    }

    fn render(&self, value: Real) -> String {
        let text = match self.notation {
            Notation::Fixed => format!("{value:.*}", self.precision),
            Notation::Scientific => format!("{value:.*e}", self.precision),
            Notation::General => general(value, self.precision),
        };
        if self.uppercase {
            text.to_uppercase()
        } else {
            text
        }
    }

    /// Pads `text` to the field width.
    fn pad(&self, text: &str) -> String {
        let width = self.width.unsigned_abs() as usize;
        if self.width < 0 {
            format!("{text:<width$}")
        } else {
            format!("{text:>width$}")
        }
    }

    pub fn format(&self, value: Real) -> String {
        self.pad(&self.render(value))
    }
}

fn trim_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

fn general(value: Real, precision: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }
    let precision = precision.max(1);
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -4 || exponent >= precision as i32 {
        let text = format!("{value:.*e}", precision - 1);
        match text.split_once('e') {
            Some((mantissa, exponent)) => format!("{}e{exponent}", trim_zeros(mantissa)),
            None => text,
        }
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_owned()
    }
}

impl EventStore {
    fn save_lines<W: Write>(
        &self,
        writer: &mut W,
        scale: Real,
        format: &NumberFormat,
        suffix: impl Fn(usize) -> Option<String>,
        placeholder: Option<String>,
    ) -> io::Result<()> {
        if self.is_empty() {
            if let Some(placeholder) = placeholder {
                writeln!(writer, "{placeholder}")?;
            }
            return Ok(());
        }
        for index in self.oldest_valid_index()..self.len() {
            let time = format.format(self.time(index) * scale);
            match suffix(index) {
                Some(suffix) => writeln!(writer, "{time} {suffix}")?,
                None => writeln!(writer, "{time}")?,
            }
        }
        Ok(())
    }

    /// Writes one scaled event time per line.
    /// A store without events writes `placeholder` instead, unless it is empty.
    pub fn save_text<W: Write>(
        &self,
        writer: &mut W,
        scale: Real,
        format: &NumberFormat,
        placeholder: &str,
    ) -> io::Result<()> {
        let placeholder = (!placeholder.is_empty()).then(|| format.pad(placeholder));
        self.save_lines(writer, scale, format, |_| None, placeholder)
    }

    /// Writes `time y` pairs, e.g. for raster plots.
    pub fn save_points<W: Write>(
        &self,
        writer: &mut W,
        y: Real,
        scale: Real,
        format: &NumberFormat,
        placeholder: &str,
        placeholder_y: Real,
    ) -> io::Result<()> {
        let placeholder =
            (!placeholder.is_empty()).then(|| format!("{} {placeholder_y}", format.pad(placeholder)));
        self.save_lines(writer, scale, format, |_| Some(y.to_string()), placeholder)
    }

    /// Writes `time size` pairs. Stores without a size channel write their mean size.
    pub fn save_sizes<W: Write>(
        &self,
        writer: &mut W,
        scale: Real,
        format: &NumberFormat,
        placeholder: &str,
    ) -> io::Result<()> {
        let placeholder = (!placeholder.is_empty()).then(|| format.pad(placeholder));
        self.save_lines(
            writer,
            scale,
            format,
            |index| Some(self.size_at(index).unwrap_or(self.mean_size).to_string()),
            placeholder,
        )
    }
}
