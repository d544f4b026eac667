#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Numeric,
    Date,
    Datetime,
    Str,
}

impl VarType {
    /// SPSS print/write format type stored in the high byte of the
    /// format word: F, EDATE, DATETIME, A.
    pub(crate) fn format_code(self) -> u8 {
        match self {
            VarType::Numeric => 5,
            VarType::Date => 20,
            VarType::Datetime => 22,
            VarType::Str => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Nominal,
    Ordinal,
    Scale,
}

impl Measure {
    pub(crate) fn code(self) -> i32 {
        match self {
            Measure::Nominal => 1,
            Measure::Ordinal => 2,
            Measure::Scale => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValueLabel {
    pub value: String,
    pub label: String,
}

impl ValueLabel {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// A column as supplied by the caller. Width 0 requests the default for
/// the type (numeric 8+decimals, date 11, datetime 20, string 40).
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub short_name: Option<String>,
    pub var_type: VarType,
    pub measure: Measure,
    pub decimal: u8,
    pub width: i32,
    pub label: Option<String>,
    pub value_labels: Vec<ValueLabel>,
}

impl Variable {
    pub fn new(name: impl Into<String>, var_type: VarType) -> Self {
        Self {
            name: name.into(),
            short_name: None,
            var_type,
            measure: Measure::Nominal,
            decimal: 0,
            width: 0,
            label: None,
            value_labels: Vec::new(),
        }
    }

    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measure = measure;
        self
    }

    pub fn with_decimal(mut self, decimal: u8) -> Self {
        self.decimal = decimal;
        self
    }

    pub fn with_width(mut self, width: i32) -> Self {
        self.width = width;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value_labels(mut self, labels: Vec<ValueLabel>) -> Self {
        self.value_labels = labels;
        self
    }
}
