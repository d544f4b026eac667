use crate::sav::bytecode::BytecodeWriter;
use crate::sav::error::{Error, Result};
use crate::sav::records;
use crate::sav::schema::{element_count, ColumnSpec, Dictionary, LabelValue};
use crate::sav::types::{Variable, VarType};
use crate::sav::value;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

const SAV_DEFAULT_PRODUCT: &str = "savwriter_rs 1.0";
const SAV_WRITE_BUF_LEN: usize = 8 * 1024 * 1024;

/// Streaming .sav writer.
///
/// Variables are declared first, then rows; the first row (or `finish`,
/// for a file without rows) closes the dictionary. `finish` consumes the
/// writer, patches the header's case size and case count in place, and
/// returns the sink, so it needs `Seek` alongside `Write` — use a
/// `Cursor<Vec<u8>>` for an in-memory file.
pub struct SavWriter<W: Write + Seek> {
    out: BufWriter<W>,
    bytecode: BytecodeWriter,
    dict: Dictionary,
    product_name: String,
    row_count: i32,
    dict_closed: bool,
}

impl SavWriter<File> {
    pub fn create(path: impl AsRef<Path>, product_name: &str) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(file, product_name)
    }
}

impl<W: Write + Seek> SavWriter<W> {
    /// Writes the header immediately; an empty `product_name` falls back
    /// to the crate's own identifier.
    pub fn new(sink: W, product_name: &str) -> Result<Self> {
        let product_name = if product_name.is_empty() {
            SAV_DEFAULT_PRODUCT.to_string()
        } else {
            product_name.to_string()
        };
        let mut out = BufWriter::with_capacity(SAV_WRITE_BUF_LEN, sink);
        records::write_file_header(&mut out, &product_name)?;
        Ok(Self {
            out,
            bytecode: BytecodeWriter::new(records::SAV_COMPRESSION_BIAS),
            dict: Dictionary::new(),
            product_name,
            row_count: 0,
            dict_closed: false,
        })
    }

    /// Validates, registers, and emits the variable's records. A failed
    /// validation leaves the writer untouched; the caller may correct
    /// the variable and retry.
    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        if self.dict_closed {
            return Err(Error::PhaseViolation);
        }
        let col = self.dict.insert(variable)?;
        records::write_variable_records(&mut self.out, col)?;
        Ok(())
    }

    /// Encodes one case. Cells are looked up by long variable name;
    /// absent or unparseable cells become system-missing (empty for
    /// strings), never errors.
    pub fn add_row(&mut self, values: &HashMap<String, String>) -> Result<()> {
        if !self.dict_closed {
            self.close_dictionary()?;
        }
        for col in self.dict.variables() {
            match values.get(&col.name) {
                None => match col.var_type {
                    VarType::Str => {
                        write_string_cell(&mut self.bytecode, &mut self.out, col, b"")?
                    }
                    _ => self.bytecode.write_missing(&mut self.out)?,
                },
                Some(text) => match col.var_type {
                    VarType::Str => {
                        write_string_cell(&mut self.bytecode, &mut self.out, col, text.as_bytes())?
                    }
                    VarType::Date => match value::parse_date(text) {
                        Some(v) => self.bytecode.write_number(&mut self.out, v)?,
                        None => self.bytecode.write_missing(&mut self.out)?,
                    },
                    VarType::Datetime => match value::parse_datetime(text) {
                        Some(v) => self.bytecode.write_number(&mut self.out, v)?,
                        None => self.bytecode.write_missing(&mut self.out)?,
                    },
                    VarType::Numeric => match value::parse_numeric(text) {
                        Some(v) => self.bytecode.write_number(&mut self.out, v)?,
                        None => self.bytecode.write_missing(&mut self.out)?,
                    },
                },
            }
        }
        self.row_count += 1;
        Ok(())
    }

    /// Flushes the final bytecode group, patches the header's case size
    /// and case count, and returns the sink.
    pub fn finish(mut self) -> Result<W> {
        if !self.dict_closed {
            self.close_dictionary()?;
        }
        self.bytecode.flush(&mut self.out)?;
        let case_size = self.dict.case_size();
        self.out.seek(SeekFrom::Start(records::SAV_NOMINAL_CASE_SIZE_OFFSET))?;
        records::write_i32(&mut self.out, case_size)?;
        self.out.seek(SeekFrom::Start(records::SAV_NCASES_OFFSET))?;
        records::write_i32(&mut self.out, self.row_count)?;
        self.out.flush()?;
        self.out
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }

    pub fn row_count(&self) -> i32 {
        self.row_count
    }

    /// The declared dictionary as a JSON string, for introspection and
    /// debugging.
    pub fn dictionary_json(&self) -> String {
        let variables = self
            .dict
            .variables()
            .iter()
            .map(|col| {
                let mut obj = Map::new();
                obj.insert("name".to_string(), json!(col.name));
                obj.insert("short_name".to_string(), json!(col.short_name));
                obj.insert("type".to_string(), json!(format!("{:?}", col.var_type)));
                obj.insert("measure".to_string(), json!(format!("{:?}", col.measure)));
                obj.insert("width".to_string(), json!(col.width));
                obj.insert("decimal".to_string(), json!(col.decimal));
                obj.insert("segments".to_string(), json!(col.segments));
                obj.insert("column_index".to_string(), json!(col.index));
                obj.insert("label".to_string(), json!(col.label));
                let mut labels = Map::new();
                for vl in &col.value_labels {
                    let key = match &vl.value {
                        LabelValue::Number(n) => n.to_string(),
                        LabelValue::Text(t) => t.clone(),
                    };
                    labels.insert(key, json!(vl.label));
                }
                obj.insert("value_labels".to_string(), Value::Object(labels));
                Value::Object(obj)
            })
            .collect::<Vec<_>>();
        json!({
            "product": self.product_name,
            "case_size": self.dict.case_size(),
            "row_count": self.row_count,
            "variables": variables,
        })
        .to_string()
    }

    /// The first-row prologue: value labels, the info-record catalog,
    /// and the termination record, in reader-mandated order.
    fn close_dictionary(&mut self) -> Result<()> {
        let columns = self.dict.variables();
        records::write_value_label_records(&mut self.out, columns)?;
        records::write_machine_integer_record(&mut self.out)?;
        records::write_machine_float_record(&mut self.out)?;
        records::write_display_params_record(&mut self.out, columns)?;
        records::write_long_var_names_record(&mut self.out, self.dict.name_pairs())?;
        records::write_very_long_strings_record(&mut self.out, columns)?;
        records::write_encoding_record(&mut self.out)?;
        records::write_long_string_labels_record(&mut self.out, columns)?;
        records::write_termination_record(&mut self.out)?;
        self.dict_closed = true;
        Ok(())
    }
}

/// Feeds each segment its slice of the (width-truncated) cell text; a
/// very long string hands 252 bytes to every segment but the last.
fn write_string_cell<W: Write>(
    bytecode: &mut BytecodeWriter,
    sink: &mut W,
    col: &ColumnSpec,
    text: &[u8],
) -> Result<()> {
    let mut rest = &text[..text.len().min(col.width as usize)];
    for segment in 0..col.segments {
        let width = col.segment_width(segment);
        let take = rest.len().min(width as usize);
        let (chunk, tail) = rest.split_at(take);
        rest = tail;
        bytecode.write_string_segment(sink, chunk, element_count(width) as usize)?;
    }
    Ok(())
}
