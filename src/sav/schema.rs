use crate::sav::error::{Error, Result};
use crate::sav::types::{Measure, VarType, Variable};
use crate::sav::value::parse_numeric;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const SAV_MAX_NAME_LEN: usize = 64;
const SAV_SHORT_NAME_LEN: usize = 8;
const SAV_MAX_DECIMALS: u8 = 16;
const SAV_MAX_WIDTH: i32 = 32767;
const SAV_MAX_NON_STRING_WIDTH: i32 = 40;

/// Strings with value labels are capped at this segment width for
/// compatibility with the long-string value-label record.
const SAV_LABELED_STRING_WIDTH: i32 = 40;

/// Widest string a single variable record can describe.
const SAV_MAX_SEGMENT_STRING: i32 = 255;

/// Data bytes carried per segment of a very long string.
const SAV_SEGMENT_DATA_LEN: i32 = 252;

// Leading letter or @, the usual SPSS punctuation in the middle, and no
// trailing period. Single-character names are legal.
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z@]([A-Z0-9!._#@$]*[^.])?$").expect("variable name pattern")
});

/// Number of 8-byte case elements a field of the given width occupies.
/// Numeric fields (width 0) occupy one element.
pub(crate) fn element_count(width: i32) -> i32 {
    (width - 1) / 8 + 1
}

#[derive(Debug, Clone)]
pub(crate) enum LabelValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedLabel {
    pub value: LabelValue,
    pub label: String,
}

/// A declared variable after validation: index allocated, short name
/// resolved, width defaulted, value labels parsed.
#[derive(Debug, Clone)]
pub(crate) struct ColumnSpec {
    pub index: i32,
    pub name: String,
    pub short_name: String,
    pub var_type: VarType,
    pub measure: Measure,
    pub decimal: u8,
    pub width: i32,
    pub segments: i32,
    pub label: Option<String>,
    pub value_labels: Vec<ResolvedLabel>,
}

impl ColumnSpec {
    pub fn segment_width(&self, segment: i32) -> i32 {
        match self.var_type {
            VarType::Numeric | VarType::Date | VarType::Datetime => 0,
            VarType::Str if !self.value_labels.is_empty() => SAV_LABELED_STRING_WIDTH,
            VarType::Str if self.width > SAV_MAX_SEGMENT_STRING => {
                if segment < self.segments - 1 {
                    SAV_SEGMENT_DATA_LEN
                } else {
                    self.width - SAV_SEGMENT_DATA_LEN * (self.segments - 1)
                }
            }
            VarType::Str => self.width,
        }
    }

    /// Case elements across all segments.
    pub fn elements(&self) -> i32 {
        (0..self.segments)
            .map(|s| element_count(self.segment_width(s)))
            .sum()
    }

    /// Format word shared by the print and write fields: format code in
    /// the high byte, then width, then decimals.
    pub fn format_word(&self, segment_width: i32) -> i32 {
        let code = i32::from(self.var_type.format_code());
        match self.var_type {
            VarType::Str => code << 16 | segment_width << 8,
            _ => code << 16 | self.width << 8 | i32::from(self.decimal),
        }
    }
}

pub(crate) struct Dictionary {
    variables: Vec<ColumnSpec>,
    long_names: HashSet<String>,
    short_names: HashSet<String>,
    name_pairs: Vec<(String, String)>,
    next_index: i32,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            long_names: HashSet::new(),
            short_names: HashSet::new(),
            name_pairs: Vec::new(),
            next_index: 1,
        }
    }

    pub fn variables(&self) -> &[ColumnSpec] {
        &self.variables
    }

    /// Short-to-long name pairs in declaration order.
    pub fn name_pairs(&self) -> &[(String, String)] {
        &self.name_pairs
    }

    /// Total 8-byte elements per case, the header's nominal_case_size.
    pub fn case_size(&self) -> i32 {
        self.variables.iter().map(ColumnSpec::elements).sum()
    }

    /// Validates and appends a variable; no state changes on error.
    pub fn insert(&mut self, variable: Variable) -> Result<&ColumnSpec> {
        if variable.name.is_empty() || variable.name.len() > SAV_MAX_NAME_LEN {
            return Err(Error::InvalidName(variable.name));
        }
        if !NAME_PATTERN.is_match(&variable.name) {
            return Err(Error::InvalidName(variable.name));
        }
        if self.long_names.contains(&variable.name) {
            return Err(Error::DuplicateName(variable.name));
        }
        if variable.decimal > SAV_MAX_DECIMALS {
            return Err(Error::OutOfRange(format!(
                "decimal {} must be between 0 and {}",
                variable.decimal, SAV_MAX_DECIMALS
            )));
        }
        if variable.width < 0 || variable.width > SAV_MAX_WIDTH {
            return Err(Error::OutOfRange(format!(
                "width {} must be between 0 and {}",
                variable.width, SAV_MAX_WIDTH
            )));
        }
        if variable.var_type != VarType::Str && variable.width > SAV_MAX_NON_STRING_WIDTH {
            return Err(Error::UnsupportedWidth {
                name: variable.name,
                width: variable.width,
            });
        }
        let (width, decimal) = if variable.width == 0 {
            match variable.var_type {
                VarType::Numeric => (8 + i32::from(variable.decimal), variable.decimal),
                VarType::Date => (11, 0),
                VarType::Datetime => (20, 0),
                VarType::Str => (40, 0),
            }
        } else {
            if variable.width <= i32::from(variable.decimal) {
                return Err(Error::OutOfRange(format!(
                    "width {} must be greater than decimal {}",
                    variable.width, variable.decimal
                )));
            }
            (variable.width, variable.decimal)
        };

        let mut value_labels = Vec::with_capacity(variable.value_labels.len());
        for vl in &variable.value_labels {
            let value = match variable.var_type {
                VarType::Numeric => match parse_numeric(&vl.value) {
                    Some(n) => LabelValue::Number(n),
                    None => {
                        return Err(Error::InvalidValueLabel {
                            name: variable.name,
                            value: vl.value.clone(),
                        })
                    }
                },
                _ => LabelValue::Text(vl.value.clone()),
            };
            value_labels.push(ResolvedLabel {
                value,
                label: vl.label.clone(),
            });
        }

        let has_labels = !value_labels.is_empty();
        let segments = segment_count(variable.var_type, width, has_labels);
        let explicit_short = variable.short_name.as_deref().filter(|s| !s.is_empty());
        let short_name = self.resolve_short_name(&variable.name, explicit_short);

        let column = ColumnSpec {
            index: self.next_index,
            name: variable.name.clone(),
            short_name: short_name.clone(),
            var_type: variable.var_type,
            measure: variable.measure,
            decimal,
            width,
            segments,
            label: variable.label.filter(|l| !l.is_empty()),
            value_labels,
        };
        self.next_index += column.elements();
        self.long_names.insert(variable.name.clone());
        self.short_names.insert(short_name.clone());
        self.name_pairs.push((short_name, variable.name));
        self.variables.push(column);
        Ok(self.variables.last().expect("just pushed"))
    }

    /// Upper-cased 8-byte prefix of the long name (or the caller's
    /// explicit short name), with collisions resolved by overwriting the
    /// tail with a growing counter. The counter tag is clamped to its
    /// trailing 8 digits should it outgrow the field.
    fn resolve_short_name(&self, long_name: &str, explicit: Option<&str>) -> String {
        let base = explicit.unwrap_or(long_name).to_ascii_uppercase();
        let base = truncate_str(&base, SAV_SHORT_NAME_LEN);
        let mut short = base.to_string();
        let mut counter: u64 = 1;
        while self.short_names.contains(&short) {
            let tag = counter.to_string();
            let tag = &tag[tag.len().saturating_sub(SAV_SHORT_NAME_LEN)..];
            let head = truncate_str(base, SAV_SHORT_NAME_LEN - tag.len());
            short = format!("{head}{tag}");
            counter += 1;
        }
        short
    }
}

fn segment_count(var_type: VarType, width: i32, has_labels: bool) -> i32 {
    if var_type == VarType::Str && !has_labels && width > SAV_MAX_SEGMENT_STRING {
        (width + SAV_SEGMENT_DATA_LEN - 1) / SAV_SEGMENT_DATA_LEN
    } else {
        1
    }
}

/// Byte-length truncation that never splits a UTF-8 sequence.
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
