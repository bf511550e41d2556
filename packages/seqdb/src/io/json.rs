use std::io::Write;
use std::path::Path;

use eyre::{Report, WrapErr};
use serde::{Deserialize, Serialize};

use crate::io::fs::create_file;

pub fn json_parse<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Report> {
  serde_json::from_str(s).wrap_err("When parsing JSON")
}

pub fn json_stringify<T: Serialize>(obj: &T) -> Result<String, Report> {
  serde_json::to_string_pretty(obj).wrap_err("When converting an entry to JSON string")
}

pub fn json_write_impl<W: Write, T: Serialize>(writer: W, obj: &T) -> Result<(), Report> {
  serde_json::to_writer_pretty(writer, &obj).wrap_err("When writing JSON")
}

pub fn json_write<T: Serialize>(filepath: impl AsRef<Path>, obj: &T) -> Result<(), Report> {
  let filepath = filepath.as_ref();
  let file = create_file(filepath)?;
  json_write_impl(file, &obj).wrap_err_with(|| format!("When writing JSON to file: {filepath:#?}"))
}
