//! Stored values and their lazily computed numeric form.
//!
//! CIF numbers carry an optional standard uncertainty in parentheses, scaled
//! to the last digit of the number: `1.234(5)` is `1.234 ± 0.005` and
//! `12(3)e2` is not a number, while `1.2e2(3)` is `120 ± 30`.

use std::cell::OnceCell;
use std::fmt;

use crate::error::DocumentError;

/// `.` (inapplicable) or `?` (unknown).
#[inline]
pub fn is_placeholder(value: &str) -> bool {
    value == "." || value == "?"
}

/// Convert a CIF number to `(value, uncertainty)`.
///
/// Accepts an optional sign, digits with an optional decimal point, an
/// optional exponent and an optional parenthesized uncertainty. The whole
/// string must be consumed and at least one mantissa digit must be present;
/// otherwise both halves are NaN. Placeholders (`.`, `?`) are NaN as well.
///
/// # Example
///
/// ```rust
/// use cifdoc_core::value::parse_number;
///
/// assert_eq!(parse_number("1.23(4)"), (1.23, 0.04));
/// assert_eq!(parse_number("12"), (12.0, 0.0));
/// assert!(parse_number("?").0.is_nan());
/// ```
pub fn parse_number(s: &str) -> (f64, f64) {
    const NAN: (f64, f64) = (f64::NAN, f64::NAN);

    let bytes = s.as_bytes();
    let mut i = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let mut mantissa = 0.0f64;
    let mut power: i32 = 0;
    let mut digits = 0usize;

    while let Some(d) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
        mantissa = mantissa * 10.0 + f64::from(d - b'0');
        digits += 1;
        i += 1;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        while let Some(d) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
            mantissa = mantissa * 10.0 + f64::from(d - b'0');
            power -= 1;
            digits += 1;
            i += 1;
        }
    }
    if digits == 0 {
        return NAN;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        let exp_negative = match bytes.get(i) {
            Some(b'-') => {
                i += 1;
                true
            }
            Some(b'+') => {
                i += 1;
                false
            }
            _ => false,
        };
        let mut exponent: i32 = 0;
        let mut exp_digits = 0usize;
        while let Some(d) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
            exponent = exponent.saturating_mul(10).saturating_add(i32::from(d - b'0'));
            exp_digits += 1;
            i += 1;
        }
        if exp_digits == 0 {
            return NAN;
        }
        power = power.saturating_add(if exp_negative { -exponent } else { exponent });
    }

    let mut uncertainty = 0.0f64;
    if bytes.get(i) == Some(&b'(') {
        i += 1;
        let mut su_digits = 0usize;
        while let Some(d) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
            uncertainty = uncertainty * 10.0 + f64::from(d - b'0');
            su_digits += 1;
            i += 1;
        }
        if su_digits == 0 || bytes.get(i) != Some(&b')') {
            return NAN;
        }
        i += 1;
    }

    if i != bytes.len() {
        return NAN;
    }

    let (value, uncertainty) = scale(mantissa, uncertainty, power);
    (if negative { -value } else { value }, uncertainty)
}

/// Multiply by `10^power`, dividing for negative powers so that short
/// decimals come out exact (`123 / 100` rather than `123 * 0.01`).
///
/// Zero stays zero even when the factor overflows to infinity.
#[inline]
fn scale(value: f64, uncertainty: f64, power: i32) -> (f64, f64) {
    let apply = |x: f64| {
        if x == 0.0 {
            0.0
        } else if power >= 0 {
            x * 10f64.powi(power)
        } else {
            x / 10f64.powi(power.saturating_neg())
        }
    };
    (apply(value), apply(uncertainty))
}

#[derive(Debug, Clone, PartialEq)]
struct Numeric {
    values: Vec<f64>,
    uncertainties: Vec<f64>,
}

/// The values of one tag: one string per loop row, or one for a scalar.
///
/// The numeric form is computed on first request and cached. Only the first
/// string decides: if it does not convert (including a `.` or `?`
/// placeholder) the whole column is treated as non-numeric. Later strings
/// that fail to convert become NaN.
#[derive(Clone, Default)]
pub struct Datavalue {
    strings: Vec<String>,
    numeric: OnceCell<Option<Numeric>>,
}

impl Datavalue {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    #[inline]
    pub fn first(&self) -> Option<&str> {
        self.get(0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Append a string, discarding any cached numeric form.
    pub fn push(&mut self, value: impl Into<String>) {
        self.strings.push(value.into());
        self.numeric.take();
    }

    /// Replace the string at `index`, discarding any cached numeric form.
    pub fn set(&mut self, index: usize, value: impl Into<String>) -> Option<String> {
        let slot = self.strings.get_mut(index)?;
        let old = std::mem::replace(slot, value.into());
        self.numeric.take();
        Some(old)
    }

    /// Remove and return the string at `index`.
    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index >= self.strings.len() {
            return None;
        }
        self.numeric.take();
        Some(self.strings.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.strings.iter()
    }

    /// Convert to numbers if not already done. Returns whether the column is numeric.
    pub fn convert(&self) -> bool {
        self.numeric().is_some()
    }

    /// Whether a numeric form has been computed and is usable.
    #[inline]
    pub fn is_converted(&self) -> bool {
        matches!(self.numeric.get(), Some(Some(_)))
    }

    /// Discard the cached numeric form so the next request recomputes it.
    pub fn reconvert(&mut self) {
        self.numeric.take();
    }

    /// Numeric values, one per string.
    pub fn doubles(&self) -> Result<&[f64], DocumentError> {
        self.numeric()
            .map(|n| n.values.as_slice())
            .ok_or_else(|| self.not_numeric())
    }

    /// Standard uncertainties, one per string; `0.0` where none was given.
    pub fn uncertainties(&self) -> Result<&[f64], DocumentError> {
        self.numeric()
            .map(|n| n.uncertainties.as_slice())
            .ok_or_else(|| self.not_numeric())
    }

    /// `(value, uncertainty)` of the string at `index`, if the column is numeric.
    pub fn number(&self, index: usize) -> Option<(f64, f64)> {
        let numeric = self.numeric()?;
        Some((*numeric.values.get(index)?, *numeric.uncertainties.get(index)?))
    }

    fn numeric(&self) -> Option<&Numeric> {
        self.numeric
            .get_or_init(|| {
                let first = self.strings.first()?;
                if parse_number(first).0.is_nan() {
                    return None;
                }
                let (values, uncertainties) =
                    self.strings.iter().map(|s| parse_number(s)).unzip();
                Some(Numeric {
                    values,
                    uncertainties,
                })
            })
            .as_ref()
    }

    fn not_numeric(&self) -> DocumentError {
        DocumentError::NotNumeric(self.first().unwrap_or_default().to_string())
    }
}

impl PartialEq for Datavalue {
    fn eq(&self, other: &Self) -> bool {
        self.strings == other.strings
    }
}

impl Eq for Datavalue {}

impl fmt::Debug for Datavalue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.strings).finish()
    }
}

impl<S: Into<String>> FromIterator<S> for Datavalue {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            strings: iter.into_iter().map(Into::into).collect(),
            numeric: OnceCell::new(),
        }
    }
}

impl From<Vec<String>> for Datavalue {
    fn from(strings: Vec<String>) -> Self {
        Self {
            strings,
            numeric: OnceCell::new(),
        }
    }
}

impl From<&str> for Datavalue {
    fn from(value: &str) -> Self {
        Self::from(vec![value.to_string()])
    }
}

impl From<String> for Datavalue {
    fn from(value: String) -> Self {
        Self::from(vec![value])
    }
}

impl<const N: usize> From<[&str; N]> for Datavalue {
    fn from(values: [&str; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Datavalue {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.strings.iter()
    }
}
