//! Structural decoder for the files the writer produces, used by the
//! integration suites to assert on record layout and case data.

use byteorder::{LittleEndian, ReadBytesExt};
use savwriter_rs::SavWriter;
use std::collections::HashMap;
use std::io::{Cursor, Read};

pub const SAV_BIAS: f64 = 100.0;

#[derive(Debug)]
pub struct Header {
    pub product: String,
    pub layout: i32,
    pub case_size: i32,
    pub compression: i32,
    pub weight_index: i32,
    pub ncases: i32,
    pub bias: f64,
    pub file_label: String,
}

/// One type-2 record; continuation stubs appear with width -1.
#[derive(Debug)]
pub struct VarRecord {
    pub width: i32,
    pub n_missing: i32,
    pub print_format: i32,
    pub write_format: i32,
    pub short_name: String,
    pub label: Option<String>,
}

#[derive(Debug)]
pub struct ValueLabelSet {
    pub labels: Vec<([u8; 8], String)>,
    pub var_indexes: Vec<i32>,
}

#[derive(Debug)]
pub struct InfoRecord {
    pub subtype: i32,
    pub size: i32,
    pub count: i32,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
pub struct SavFile {
    pub header: Header,
    pub variables: Vec<VarRecord>,
    pub value_labels: Vec<ValueLabelSet>,
    pub info: Vec<InfoRecord>,
    pub data: Vec<u8>,
}

/// One 8-byte case element as decoded from the bytecode stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    /// Compact opcode, value opcode - bias.
    Number(f64),
    /// Literal payload; numeric or string depending on the column.
    Literal([u8; 8]),
    /// The all-spaces string element.
    Spaces,
}

impl Cell {
    pub fn as_f64(&self) -> f64 {
        match self {
            Cell::Number(n) => *n,
            Cell::Literal(bytes) => f64::from_le_bytes(*bytes),
            other => panic!("not a numeric cell: {other:?}"),
        }
    }

    pub fn as_bytes(&self) -> [u8; 8] {
        match self {
            Cell::Literal(bytes) => *bytes,
            Cell::Spaces => *b"        ",
            other => panic!("not a string cell: {other:?}"),
        }
    }
}

impl SavFile {
    pub fn parse(bytes: &[u8]) -> SavFile {
        let mut cur = Cursor::new(bytes);
        let header = parse_header(&mut cur);
        let mut variables = Vec::new();
        let mut value_labels = Vec::new();
        let mut info = Vec::new();
        loop {
            let rec_type = cur.read_i32::<LittleEndian>().unwrap();
            match rec_type {
                2 => variables.push(parse_variable(&mut cur)),
                3 => value_labels.push(parse_value_label_set(&mut cur)),
                7 => info.push(parse_info(&mut cur)),
                999 => {
                    assert_eq!(cur.read_i32::<LittleEndian>().unwrap(), 0, "termination filler");
                    break;
                }
                other => panic!("unexpected record type {other}"),
            }
        }
        let mut data = Vec::new();
        cur.read_to_end(&mut data).unwrap();
        SavFile {
            header,
            variables,
            value_labels,
            info,
            data,
        }
    }

    pub fn info_record(&self, subtype: i32) -> Option<&InfoRecord> {
        self.info.iter().find(|r| r.subtype == subtype)
    }

    pub fn info_subtypes(&self) -> Vec<i32> {
        self.info.iter().map(|r| r.subtype).collect()
    }

    /// Decodes the compressed case stream into 8-byte elements.
    pub fn cells(&self) -> Vec<Cell> {
        let mut cells = Vec::new();
        let mut pos = 0;
        while pos + 8 <= self.data.len() {
            let command = &self.data[pos..pos + 8];
            pos += 8;
            let literals = command.iter().filter(|&&op| op == 253).count();
            let mut payload = &self.data[pos..pos + literals * 8];
            pos += literals * 8;
            for &op in command {
                match op {
                    0 => {}
                    252 => return cells,
                    253 => {
                        let (head, tail) = payload.split_at(8);
                        payload = tail;
                        cells.push(Cell::Literal(head.try_into().unwrap()));
                    }
                    254 => cells.push(Cell::Spaces),
                    255 => cells.push(Cell::Missing),
                    op => cells.push(Cell::Number(f64::from(op) - SAV_BIAS)),
                }
            }
        }
        assert_eq!(pos, self.data.len(), "trailing bytes after last command group");
        cells
    }
}

fn parse_header(cur: &mut Cursor<&[u8]>) -> Header {
    let mut magic = [0u8; 4];
    cur.read_exact(&mut magic).unwrap();
    assert_eq!(&magic, b"$FL2", "header magic");
    let product = read_string(cur, 60);
    let layout = cur.read_i32::<LittleEndian>().unwrap();
    let case_size = cur.read_i32::<LittleEndian>().unwrap();
    let compression = cur.read_i32::<LittleEndian>().unwrap();
    let weight_index = cur.read_i32::<LittleEndian>().unwrap();
    let ncases = cur.read_i32::<LittleEndian>().unwrap();
    let bias = cur.read_f64::<LittleEndian>().unwrap();
    let _creation_date = read_string(cur, 9);
    let _creation_time = read_string(cur, 8);
    let file_label = read_string(cur, 64);
    let mut padding = [0u8; 3];
    cur.read_exact(&mut padding).unwrap();
    assert_eq!(padding, [0, 0, 0], "header padding");
    Header {
        product,
        layout,
        case_size,
        compression,
        weight_index,
        ncases,
        bias,
        file_label,
    }
}

fn parse_variable(cur: &mut Cursor<&[u8]>) -> VarRecord {
    let width = cur.read_i32::<LittleEndian>().unwrap();
    let has_label = cur.read_i32::<LittleEndian>().unwrap();
    let n_missing = cur.read_i32::<LittleEndian>().unwrap();
    let print_format = cur.read_i32::<LittleEndian>().unwrap();
    let write_format = cur.read_i32::<LittleEndian>().unwrap();
    let short_name = read_string(cur, 8);
    let label = if has_label != 0 {
        let len = cur.read_i32::<LittleEndian>().unwrap() as usize;
        let text = read_string(cur, len);
        let pad = (4 - len % 4) % 4;
        skip(cur, pad);
        Some(text)
    } else {
        None
    };
    VarRecord {
        width,
        n_missing,
        print_format,
        write_format,
        short_name,
        label,
    }
}

fn parse_value_label_set(cur: &mut Cursor<&[u8]>) -> ValueLabelSet {
    let n_labels = cur.read_i32::<LittleEndian>().unwrap();
    let mut labels = Vec::new();
    for _ in 0..n_labels {
        let mut value = [0u8; 8];
        cur.read_exact(&mut value).unwrap();
        let len = {
            let mut byte = [0u8; 1];
            cur.read_exact(&mut byte).unwrap();
            byte[0] as usize
        };
        let label = read_string(cur, len);
        let pad = (8 - (len + 1) % 8) % 8;
        skip(cur, pad);
        labels.push((value, label));
    }
    assert_eq!(
        cur.read_i32::<LittleEndian>().unwrap(),
        4,
        "type-3 record must be followed by a type-4 record"
    );
    let var_count = cur.read_i32::<LittleEndian>().unwrap();
    let mut var_indexes = Vec::new();
    for _ in 0..var_count {
        var_indexes.push(cur.read_i32::<LittleEndian>().unwrap());
    }
    ValueLabelSet {
        labels,
        var_indexes,
    }
}

fn parse_info(cur: &mut Cursor<&[u8]>) -> InfoRecord {
    let subtype = cur.read_i32::<LittleEndian>().unwrap();
    let size = cur.read_i32::<LittleEndian>().unwrap();
    let count = cur.read_i32::<LittleEndian>().unwrap();
    let mut payload = vec![0u8; (size * count) as usize];
    cur.read_exact(&mut payload).unwrap();
    InfoRecord {
        subtype,
        size,
        count,
        payload,
    }
}

fn read_string(cur: &mut Cursor<&[u8]>, len: usize) -> String {
    let mut buf = vec![0u8; len];
    cur.read_exact(&mut buf).unwrap();
    String::from_utf8_lossy(&buf).trim_end().to_string()
}

fn skip(cur: &mut Cursor<&[u8]>, len: usize) {
    let mut buf = vec![0u8; len];
    cur.read_exact(&mut buf).unwrap();
}

/// Runs the build closure against an in-memory writer and returns the
/// finished file's bytes.
pub fn write_to_vec(build: impl FnOnce(&mut SavWriter<Cursor<Vec<u8>>>)) -> Vec<u8> {
    let mut writer = SavWriter::new(Cursor::new(Vec::new()), "").unwrap();
    build(&mut writer);
    writer.finish().unwrap().into_inner()
}

pub fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
