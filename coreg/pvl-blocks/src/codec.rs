use std::collections::BTreeMap;

use crate::{Error, Result};

/// Keys whose values are real numbers, possibly followed by a unit.
pub const REAL_KEYS: [&str; 4] = ["Sample", "Line", "SampleResidual", "LineResidual"];
/// Keys whose values are booleans.
pub const BOOL_KEYS: [&str; 1] = ["Reference"];

/// A cleaned PVL value.
#[derive(Debug, Clone, PartialEq)]
pub enum PvlValue {
    Text(String),
    Real(f64),
    Bool(bool),
}

impl std::fmt::Display for PvlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PvlValue::Text(s) => f.write_str(s),
            PvlValue::Real(v) => f.write_str(&format_real(*v)),
            PvlValue::Bool(true) => f.write_str("True"),
            PvlValue::Bool(false) => f.write_str("False"),
        }
    }
}

impl From<f64> for PvlValue {
    fn from(v: f64) -> Self {
        PvlValue::Real(v)
    }
}

impl From<bool> for PvlValue {
    fn from(v: bool) -> Self {
        PvlValue::Bool(v)
    }
}

impl From<String> for PvlValue {
    fn from(v: String) -> Self {
        PvlValue::Text(v)
    }
}

impl From<&str> for PvlValue {
    fn from(v: &str) -> Self {
        PvlValue::Text(v.to_string())
    }
}

/// Render a real so that integral values keep their decimal point.
pub fn format_real(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Parse the first whitespace separated token of `value`, dropping any
/// trailing unit such as `<pixels>`.
pub fn leading_real(value: &str) -> Option<f64> {
    value.split_whitespace().next()?.parse().ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    let token = value.split_whitespace().next()?;
    match token.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Decode the `key = value` lines of a block.
///
/// The first `=` separates key from value, both are trimmed. Later duplicate
/// keys replace earlier ones. Lines without `=` or with an empty key are
/// skipped.
pub fn decode<S: AsRef<str>>(lines: &[S]) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    for line in lines {
        if let Some((key, value)) = line.as_ref().split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            result.insert(key.to_string(), value.trim().to_string());
        }
    }
    result
}

/// Typed key/value mapping of one block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PvlDict(BTreeMap<String, PvlValue>);

impl PvlDict {
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&PvlValue> {
        self.0.get(key)
    }

    pub fn get_real(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(PvlValue::Real(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(PvlValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(PvlValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn insert<V: Into<PvlValue>>(&mut self, key: &str, value: V) {
        self.0.insert(key.to_string(), value.into());
    }
}

/// Convert the known numeric and boolean keys to typed values.
///
/// Keys not present stay absent. All other keys are kept as text.
pub fn clean(raw: BTreeMap<String, String>) -> Result<PvlDict> {
    let mut dict = BTreeMap::new();
    for (key, value) in raw {
        let typed = if REAL_KEYS.contains(&key.as_str()) {
            match leading_real(&value) {
                Some(v) => PvlValue::Real(v),
                None => return Err(Error::InvalidReal { key, value }),
            }
        } else if BOOL_KEYS.contains(&key.as_str()) {
            match parse_bool(&value) {
                Some(v) => PvlValue::Bool(v),
                None => return Err(Error::InvalidBool { key, value }),
            }
        } else {
            PvlValue::Text(value)
        };
        dict.insert(key, typed);
    }
    Ok(PvlDict(dict))
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Rewrite the values of `keys` in `lines` from `dict`.
///
/// A line is rewritten when it contains both `" <key> "` and `" = "`, so
/// `Sample` never matches a `SampleResidual` line. Indentation and line
/// endings are kept. Lines not matching any key are returned untouched.
pub fn encode<S: AsRef<str>>(lines: &[S], keys: &[&str], dict: &PvlDict) -> Result<Vec<String>> {
    let mut result = Vec::with_capacity(lines.len());
    for line in lines {
        let line = line.as_ref();
        let mut rewritten = None;
        for key in keys {
            let padded = format!(" {key} ");
            if line.contains(&padded) && line.contains(" = ") {
                let value = dict.get(key).ok_or_else(|| Error::MissingKey {
                    key: key.to_string(),
                })?;
                let (body, ending) = split_line_ending(line);
                let indent = &body[..body.len() - body.trim_start().len()];
                rewritten = Some(format!("{indent}{key} = {value}{ending}"));
            }
        }
        result.push(rewritten.unwrap_or_else(|| line.to_string()));
    }
    Ok(result)
}

/// Typed view of a `ControlMeasure` group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureRecord {
    pub serial_number: Option<String>,
    pub sample: Option<f64>,
    pub line: Option<f64>,
    pub sample_residual: Option<f64>,
    pub line_residual: Option<f64>,
    pub reference: Option<bool>,
}

impl MeasureRecord {
    pub fn from_dict(dict: &PvlDict) -> Self {
        Self {
            serial_number: dict.get_text("SerialNumber").map(String::from),
            sample: dict.get_real("Sample"),
            line: dict.get_real("Line"),
            sample_residual: dict.get_real("SampleResidual"),
            line_residual: dict.get_real("LineResidual"),
            reference: dict.get_bool("Reference"),
        }
    }

    /// The measured `(sample, line)`, both of which are required.
    pub fn position(&self) -> Result<(f64, f64)> {
        let sample = self.sample.ok_or_else(|| Error::MissingKey {
            key: "Sample".into(),
        })?;
        let line = self.line.ok_or_else(|| Error::MissingKey {
            key: "Line".into(),
        })?;
        Ok((sample, line))
    }
}
