//! On-disk output through the file convenience paths.

use crate::common::{row, SavFile};
use savwriter_rs::{write_sav, SavWriter, VarType, Variable};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(prefix: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let pid = std::process::id();
    path.push(format!("{prefix}_{pid}_{nanos}.sav"));
    path
}

#[test]
fn test_create_writes_a_parseable_file() {
    let path = temp_path("savwriter_create");
    let mut writer = SavWriter::create(&path, "").unwrap();
    writer
        .add_variable(Variable::new("id", VarType::Numeric))
        .unwrap();
    writer.add_row(&row(&[("id", "7")])).unwrap();
    writer.finish().unwrap();

    let bytes = fs::read(&path).unwrap();
    let file = SavFile::parse(&bytes);
    assert_eq!(file.header.ncases, 1);
    assert_eq!(file.header.case_size, 1);
    assert_eq!(file.data[0], 107);

    let _ = fs::remove_file(&path);
}

#[test]
fn test_write_sav_one_shot() {
    let path = temp_path("savwriter_one_shot");
    let variables = vec![
        Variable::new("id", VarType::Numeric),
        Variable::new("name", VarType::Str).with_width(8),
    ];
    let rows = vec![
        row(&[("id", "1"), ("name", "ada")]),
        row(&[("id", "2"), ("name", "grace")]),
    ];
    write_sav(&path, "one-shot 1.0", variables, &rows).unwrap();

    let bytes = fs::read(&path).unwrap();
    let file = SavFile::parse(&bytes);
    assert_eq!(file.header.ncases, 2);
    assert_eq!(file.header.case_size, 2);
    assert_eq!(file.variables.len(), 2);
    assert_eq!(file.header.product, "@(#) SPSS DATA FILE - one-shot 1.0");

    let _ = fs::remove_file(&path);
}
