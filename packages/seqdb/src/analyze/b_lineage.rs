use log::warn;

use crate::db::seq::{Seq, SequenceNotAligned};
use crate::db::store::Seqdb;

/// Classifies B entries by the gap pattern of the final gapped sequences:
/// a deletion among positions 163-166 with 162 intact marks YAMAGATA (a
/// deletion at both 162 and 163 is the Vic 2016-2017 outlier). The stored
/// lineage is set when empty and a mismatch is only warned about.
pub(crate) fn detect(seqdb: &mut Seqdb) {
  for entry in seqdb.entries_mut() {
    if entry.virus_type() != "B" {
      continue;
    }
    let name = entry.name().to_owned();
    let detected: Vec<&str> = entry.seqs().iter().filter_map(|seq| detect_one(seq).ok()).collect();
    for detected_lineage in detected {
      if entry.lineage().is_empty() {
        entry.set_lineage(detected_lineage);
      } else if entry.lineage() != detected_lineage {
        warn!(
          "lineage conflict: {name}  stored: {} detected by sequence: {detected_lineage}",
          entry.lineage()
        );
      }
    }
  }
}

fn detect_one(seq: &Seq) -> Result<&'static str, SequenceNotAligned> {
  let lineage = if seq.amino_acid_at(162)? != '-' && any_deleted(seq)? {
    "YAMAGATA"
  } else {
    "VICTORIA"
  };
  Ok(lineage)
}

fn any_deleted(seq: &Seq) -> Result<bool, SequenceNotAligned> {
  for pos in [163, 164, 165, 166] {
    if seq.amino_acid_at(pos)? == '-' {
      return Ok(true);
    }
  }
  Ok(false)
}
