//! Dictionary record layouts. All integers are i32 little-endian, all
//! floats IEEE-754 binary64 little-endian.

use crate::sav::error::Result;
use crate::sav::schema::{element_count, ColumnSpec, LabelValue};
use crate::sav::types::VarType;
use chrono::Local;
use std::io::Write;

pub(crate) const SAV_HEADER_LEN: usize = 176;
pub(crate) const SAV_COMPRESSION_BIAS: f64 = 100.0;

/// Header fields patched at finish time.
pub(crate) const SAV_NOMINAL_CASE_SIZE_OFFSET: u64 = 68;
pub(crate) const SAV_NCASES_OFFSET: u64 = 80;

const SAV_RECORD_VARIABLE: i32 = 2;
const SAV_RECORD_VALUE_LABEL: i32 = 3;
const SAV_RECORD_VALUE_LABEL_VARS: i32 = 4;
const SAV_RECORD_INFO: i32 = 7;
const SAV_RECORD_DICT_TERMINATION: i32 = 999;

const SAV_SUBTYPE_MACHINE_INTEGER: i32 = 3;
const SAV_SUBTYPE_MACHINE_FLOAT: i32 = 4;
const SAV_SUBTYPE_DISPLAY_PARAMS: i32 = 11;
const SAV_SUBTYPE_LONG_VAR_NAMES: i32 = 13;
const SAV_SUBTYPE_VERY_LONG_STRINGS: i32 = 14;
const SAV_SUBTYPE_ENCODING: i32 = 20;
const SAV_SUBTYPE_LONG_STRING_LABELS: i32 = 21;

/// Windows code page identifier for UTF-8.
const SAV_CHARCODE_UTF8: i32 = 65001;

const SAV_MAX_VALUE_LABEL_LEN: usize = 120;
const SAV_DISPLAY_STRING_WIDTH_CAP: i32 = 40;

/// The 176-byte file header. The case-size and case-count fields carry
/// placeholders until `finish` patches them in place.
pub(crate) fn write_file_header<W: Write>(writer: &mut W, product_name: &str) -> Result<()> {
    let now = Local::now();
    let mut buf = Vec::with_capacity(SAV_HEADER_LEN);
    buf.extend_from_slice(b"$FL2");
    extend_padded(&mut buf, &format!("@(#) SPSS DATA FILE - {product_name}"), 60);
    extend_i32(&mut buf, 2); // layout_code
    extend_i32(&mut buf, 0); // nominal_case_size, patched at finish
    extend_i32(&mut buf, 1); // compression
    extend_i32(&mut buf, 0); // weight_index
    extend_i32(&mut buf, -1); // ncases, patched at finish
    buf.extend_from_slice(&SAV_COMPRESSION_BIAS.to_le_bytes());
    extend_padded(&mut buf, &now.format("%d %b %y").to_string(), 9);
    extend_padded(&mut buf, &now.format("%H:%M:%S").to_string(), 8);
    extend_padded(&mut buf, "Generated SPSS", 64);
    buf.extend_from_slice(&[0u8; 3]);
    debug_assert_eq!(buf.len(), SAV_HEADER_LEN);
    writer.write_all(&buf)?;
    Ok(())
}

/// One type-2 record per segment, each followed by enough continuation
/// stubs to cover the segment's extra 8-byte elements.
pub(crate) fn write_variable_records<W: Write>(writer: &mut W, col: &ColumnSpec) -> Result<()> {
    for segment in 0..col.segments {
        let width = col.segment_width(segment);
        let label = if segment == 0 { col.label.as_deref() } else { None };
        write_i32(writer, SAV_RECORD_VARIABLE)?;
        write_i32(writer, width)?;
        write_i32(writer, i32::from(label.is_some()))?;
        write_i32(writer, 0)?; // n_missing_values
        let format = col.format_word(width);
        write_i32(writer, format)?; // print
        write_i32(writer, format)?; // write
        write_padded(writer, &col.short_name, 8)?;
        if let Some(label) = label {
            let bytes = label.as_bytes();
            write_i32(writer, bytes.len() as i32)?;
            let padded = (bytes.len() + 3) / 4 * 4;
            let mut buf = vec![0u8; padded];
            buf[..bytes.len()].copy_from_slice(bytes);
            writer.write_all(&buf)?;
        }
        if width > 8 {
            for _ in 1..element_count(width) {
                write_continuation_record(writer)?;
            }
        }
    }
    Ok(())
}

fn write_continuation_record<W: Write>(writer: &mut W) -> Result<()> {
    write_i32(writer, SAV_RECORD_VARIABLE)?;
    write_i32(writer, -1)?; // extended string part
    write_i32(writer, 0)?;
    write_i32(writer, 0)?;
    write_i32(writer, 0)?;
    write_i32(writer, 0)?;
    write_padded(writer, "", 8)?;
    Ok(())
}

/// Type 3 + type 4 pairs for every non-string variable carrying labels.
/// String labels travel in the subtype-21 info record instead.
pub(crate) fn write_value_label_records<W: Write>(
    writer: &mut W,
    columns: &[ColumnSpec],
) -> Result<()> {
    for col in columns {
        if col.value_labels.is_empty() || col.var_type == VarType::Str {
            continue;
        }
        write_i32(writer, SAV_RECORD_VALUE_LABEL)?;
        write_i32(writer, col.value_labels.len() as i32)?;
        for vl in &col.value_labels {
            match &vl.value {
                LabelValue::Number(n) => write_f64(writer, *n)?,
                LabelValue::Text(t) => write_padded(writer, t, 8)?,
            }
            let bytes = vl.label.as_bytes();
            let len = bytes.len().min(SAV_MAX_VALUE_LABEL_LEN);
            writer.write_all(&[len as u8])?;
            // Space-padded so the length byte plus label fill whole
            // 8-byte units.
            let padded = (len + 8) / 8 * 8 - 1;
            let mut buf = vec![b' '; padded];
            buf[..len].copy_from_slice(&bytes[..len]);
            writer.write_all(&buf)?;
        }
        write_i32(writer, SAV_RECORD_VALUE_LABEL_VARS)?;
        write_i32(writer, 1)?; // var_count
        write_i32(writer, col.index)?;
    }
    Ok(())
}

pub(crate) fn write_machine_integer_record<W: Write>(writer: &mut W) -> Result<()> {
    write_i32(writer, SAV_RECORD_INFO)?;
    write_i32(writer, SAV_SUBTYPE_MACHINE_INTEGER)?;
    write_i32(writer, 4)?; // size
    write_i32(writer, 8)?; // count
    write_i32(writer, 0)?; // version_major
    write_i32(writer, 10)?; // version_minor
    write_i32(writer, 1)?; // version_revision
    write_i32(writer, -1)?; // machine_code
    write_i32(writer, 1)?; // floating_point_rep (IEEE)
    write_i32(writer, 1)?; // compression_code
    write_i32(writer, 2)?; // endianness (little)
    write_i32(writer, SAV_CHARCODE_UTF8)?;
    Ok(())
}

pub(crate) fn write_machine_float_record<W: Write>(writer: &mut W) -> Result<()> {
    write_i32(writer, SAV_RECORD_INFO)?;
    write_i32(writer, SAV_SUBTYPE_MACHINE_FLOAT)?;
    write_i32(writer, 8)?; // size
    write_i32(writer, 3)?; // count
    write_f64(writer, -f64::MAX)?; // sysmis
    write_f64(writer, f64::MAX)?; // highest
    write_f64(writer, -f64::MAX)?; // lowest
    Ok(())
}

pub(crate) fn write_display_params_record<W: Write>(
    writer: &mut W,
    columns: &[ColumnSpec],
) -> Result<()> {
    let total_segments: i32 = columns.iter().map(|c| c.segments).sum();
    write_i32(writer, SAV_RECORD_INFO)?;
    write_i32(writer, SAV_SUBTYPE_DISPLAY_PARAMS)?;
    write_i32(writer, 4)?; // size
    write_i32(writer, total_segments * 3)?;
    for col in columns {
        for segment in 0..col.segments {
            write_i32(writer, col.measure.code())?;
            match col.var_type {
                VarType::Str => {
                    let width = if segment != 0 {
                        8
                    } else {
                        col.width.min(SAV_DISPLAY_STRING_WIDTH_CAP)
                    };
                    write_i32(writer, width)?;
                    write_i32(writer, 0)?; // left aligned
                }
                _ => {
                    write_i32(writer, 8)?;
                    write_i32(writer, 1)?; // right aligned
                }
            }
        }
    }
    Ok(())
}

/// `SHORT=LONG` pairs for every variable, tab-separated, declaration
/// order. The size field stays 1 and the count carries the payload byte
/// length.
pub(crate) fn write_long_var_names_record<W: Write>(
    writer: &mut W,
    name_pairs: &[(String, String)],
) -> Result<()> {
    write_i32(writer, SAV_RECORD_INFO)?;
    write_i32(writer, SAV_SUBTYPE_LONG_VAR_NAMES)?;
    write_i32(writer, 1)?; // size
    let mut payload = Vec::new();
    for (i, (short, long)) in name_pairs.iter().enumerate() {
        if i > 0 {
            payload.push(b'\t');
        }
        payload.extend_from_slice(short.as_bytes());
        payload.push(b'=');
        payload.extend_from_slice(long.as_bytes());
    }
    write_i32(writer, payload.len() as i32)?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Emitted only when some string spans more than one segment; maps each
/// such short name to its declared width, zero-padded to five digits.
pub(crate) fn write_very_long_strings_record<W: Write>(
    writer: &mut W,
    columns: &[ColumnSpec],
) -> Result<()> {
    if !columns.iter().any(|c| c.segments > 1) {
        return Ok(());
    }
    write_i32(writer, SAV_RECORD_INFO)?;
    write_i32(writer, SAV_SUBTYPE_VERY_LONG_STRINGS)?;
    write_i32(writer, 1)?; // size
    let mut payload = Vec::new();
    for col in columns {
        if col.segments > 1 {
            payload.extend_from_slice(col.short_name.as_bytes());
            payload.push(b'=');
            payload.extend_from_slice(format!("{:05}", col.width).as_bytes());
            payload.push(0);
            payload.push(b'\t');
        }
    }
    write_i32(writer, payload.len() as i32)?;
    writer.write_all(&payload)?;
    Ok(())
}

pub(crate) fn write_encoding_record<W: Write>(writer: &mut W) -> Result<()> {
    write_i32(writer, SAV_RECORD_INFO)?;
    write_i32(writer, SAV_SUBTYPE_ENCODING)?;
    write_i32(writer, 1)?; // size
    write_i32(writer, 5)?; // count
    writer.write_all(b"UTF-8")?;
    Ok(())
}

/// Emitted only when a string variable carries value labels.
pub(crate) fn write_long_string_labels_record<W: Write>(
    writer: &mut W,
    columns: &[ColumnSpec],
) -> Result<()> {
    let mut payload = Vec::new();
    for col in columns {
        if col.var_type != VarType::Str || col.value_labels.is_empty() {
            continue;
        }
        extend_i32(&mut payload, col.short_name.len() as i32);
        payload.extend_from_slice(col.short_name.as_bytes());
        extend_i32(&mut payload, col.width);
        extend_i32(&mut payload, col.value_labels.len() as i32);
        for vl in &col.value_labels {
            let value = match &vl.value {
                LabelValue::Text(t) => t.as_bytes(),
                LabelValue::Number(_) => &[],
            };
            extend_i32(&mut payload, value.len() as i32);
            payload.extend_from_slice(value);
            extend_i32(&mut payload, vl.label.len() as i32);
            payload.extend_from_slice(vl.label.as_bytes());
        }
    }
    if payload.is_empty() {
        return Ok(());
    }
    write_i32(writer, SAV_RECORD_INFO)?;
    write_i32(writer, SAV_SUBTYPE_LONG_STRING_LABELS)?;
    write_i32(writer, 1)?; // size
    write_i32(writer, payload.len() as i32)?;
    writer.write_all(&payload)?;
    Ok(())
}

pub(crate) fn write_termination_record<W: Write>(writer: &mut W) -> Result<()> {
    write_i32(writer, SAV_RECORD_DICT_TERMINATION)?;
    write_i32(writer, 0)?; // filler
    Ok(())
}

pub(crate) fn write_i32<W: Write>(writer: &mut W, v: i32) -> Result<()> {
    writer.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_f64<W: Write>(writer: &mut W, v: f64) -> Result<()> {
    writer.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn extend_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn extend_padded(buf: &mut Vec<u8>, s: &str, len: usize) {
    let bytes = s.as_bytes();
    let copy_len = bytes.len().min(len);
    buf.extend_from_slice(&bytes[..copy_len]);
    buf.resize(buf.len() + (len - copy_len), b' ');
}

/// Space-padded, truncated fixed-width text field.
fn write_padded<W: Write>(writer: &mut W, s: &str, len: usize) -> Result<()> {
    let mut buf = vec![b' '; len];
    let bytes = s.as_bytes();
    let copy_len = bytes.len().min(len);
    buf[..copy_len].copy_from_slice(&bytes[..copy_len]);
    writer.write_all(&buf)?;
    Ok(())
}
