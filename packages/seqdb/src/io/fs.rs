use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

use eyre::{Report, WrapErr};

const BUF_SIZE: usize = 2 * 1024 * 1024;

/// Reads entire file into a string.
/// Compared to `std::fs::read_to_string` uses buffered reader
pub fn read_file_to_string(filepath: impl AsRef<Path>) -> Result<String, Report> {
  let filepath = filepath.as_ref();

  let file = File::open(filepath).wrap_err_with(|| format!("When opening file: {filepath:#?}"))?;
  let mut reader = BufReader::with_capacity(BUF_SIZE, file);

  let mut data = String::new();
  reader
    .read_to_string(&mut data)
    .wrap_err_with(|| format!("When reading file: {filepath:#?}"))?;

  Ok(data)
}

/// Creates the file and its parent directories, returning a buffered writer.
pub fn create_file(filepath: impl AsRef<Path>) -> Result<BufWriter<File>, Report> {
  let filepath = filepath.as_ref();
  if let Some(parent_dir) = filepath.parent() {
    if !parent_dir.as_os_str().is_empty() {
      fs::create_dir_all(parent_dir).wrap_err_with(|| format!("When creating directory '{parent_dir:#?}'"))?;
    }
  }
  let file = File::create(filepath).wrap_err_with(|| format!("When creating file: {filepath:#?}"))?;
  Ok(BufWriter::with_capacity(BUF_SIZE, file))
}
