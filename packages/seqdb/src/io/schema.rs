use std::path::Path;

use eyre::{eyre, Report, WrapErr};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::db::entry::Entry;
use crate::db::store::Seqdb;
use crate::io::fs::read_file_to_string;
use crate::io::json::{json_parse, json_write};

pub const SEQDB_JSON_DUMP_VERSION: &str = "sequence-database-v2";

/// On-disk document. Top-level keys starting with `_` or `?` are comments
/// and ignored on read; any other unknown key makes the load fail.
#[derive(Debug, Serialize, Deserialize)]
struct SeqdbFile {
  #[serde(rename = "  version")]
  version: String,

  data: Vec<Entry>,

  #[serde(flatten, default, skip_serializing_if = "IndexMap::is_empty")]
  extra: IndexMap<String, serde_json::Value>,
}

pub fn load(filepath: &Path) -> Result<Seqdb, Report> {
  let content = read_file_to_string(filepath)?;
  let file: SeqdbFile = json_parse(&content).wrap_err_with(|| format!("When reading seqdb from {filepath:#?}"))?;

  if file.version != SEQDB_JSON_DUMP_VERSION {
    return Err(eyre!("Unsupported seqdb version: \"{}\"", file.version));
  }
  if let Some(unknown) = file
    .extra
    .keys()
    .find(|key| !key.starts_with('_') && !key.starts_with('?'))
  {
    return Err(eyre!("Unknown key in seqdb file {filepath:#?}: \"{unknown}\""));
  }

  let mut seqdb = Seqdb::new();
  *seqdb.entries_mut() = file.data;
  Ok(seqdb)
}

pub fn save(seqdb: &Seqdb, filepath: &Path) -> Result<(), Report> {
  let file = SeqdbFile {
    version: SEQDB_JSON_DUMP_VERSION.to_owned(),
    data: seqdb.entries().to_vec(),
    extra: IndexMap::new(),
  };
  json_write(filepath, &file).wrap_err_with(|| format!("When saving seqdb to {filepath:#?}"))
}
