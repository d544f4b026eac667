pub(crate) mod bytecode;
pub(crate) mod error;
pub(crate) mod records;
pub(crate) mod schema;
pub(crate) mod types;
pub(crate) mod value;
pub mod writer;

pub use error::{Error, Result};
pub use types::{Measure, ValueLabel, VarType, Variable};
pub use writer::SavWriter;

use std::collections::HashMap;
use std::path::Path;

/// Write a complete .sav file in one call: declare every variable, then
/// stream the rows, then finish.
pub fn write_sav(
    path: impl AsRef<Path>,
    product_name: &str,
    variables: Vec<Variable>,
    rows: &[HashMap<String, String>],
) -> Result<()> {
    let mut writer = SavWriter::create(path, product_name)?;
    for variable in variables {
        writer.add_variable(variable)?;
    }
    for row in rows {
        writer.add_row(row)?;
    }
    writer.finish()?;
    Ok(())
}
