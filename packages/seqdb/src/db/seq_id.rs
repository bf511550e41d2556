use lazy_static::lazy_static;
use log::warn;
use regex::Regex;

use crate::db::store::{SeqRef, Seqdb};

lazy_static! {
  static ref RE_YEAR_SPACE: Regex = Regex::new("/[12][0-9][0-9][0-9] ").unwrap();
}

impl SeqRef<'_> {
  /// Stable identifier of this sequence variant:
  /// `"{name}__{first passage}"`, optionally percent-encoded.
  pub fn seq_id(&self, encoded: bool) -> String {
    let seq_id = format!("{}__{}", self.entry().name(), self.seq().passage())
      .trim()
      .to_owned();
    if encoded {
      urlencoding::encode(&seq_id).into_owned()
    } else {
      seq_id
    }
  }
}

impl Seqdb {
  /// Looks a sequence up by its seq-id.
  ///
  /// Two syntaxes are accepted, after percent-decoding:
  /// `"{name}__{passage}[__{duplicate index}]"`, and `"{name} {passage}"`
  /// where the name ends at the first `/YYYY ` (matched by hi-name first,
  /// passage second). When a string could satisfy both, the `__` form wins:
  /// the year-space parse runs only for ids without `__`.
  pub fn find_by_seq_id(&self, seq_id: &str) -> Option<SeqRef<'_>> {
    let seq_id = urlencoding::decode(seq_id).map_or_else(|_| seq_id.to_owned(), |decoded| decoded.into_owned());

    let found = if let Some((name, passage_distinct)) = seq_id.split_once("__") {
      self.find_by_passage_and_index(name, passage_distinct)
    } else {
      self.find_by_year_space(&seq_id)
    };

    if found.is_none() {
      warn!("\"{seq_id}\" not in seqdb");
    }
    found
  }

  fn find_by_passage_and_index(&self, name: &str, passage_distinct: &str) -> Option<SeqRef<'_>> {
    let (passage, index) = match passage_distinct.split_once("__") {
      Some((passage, index)) => (passage, index.parse::<usize>().unwrap_or(0)),
      None => (passage_distinct, 0),
    };
    let entry_index = self.find_index_by_name(name)?;
    let seq_index = self.entries()[entry_index]
      .seqs()
      .iter()
      .enumerate()
      .filter(|(_, seq)| seq.passage() == passage)
      .map(|(seq_index, _)| seq_index)
      .nth(index)?;
    self.seq_ref(entry_index, seq_index)
  }

  fn find_by_year_space(&self, seq_id: &str) -> Option<SeqRef<'_>> {
    let year_space = RE_YEAR_SPACE.find(seq_id);
    let look_for = match year_space {
      Some(found) => &seq_id[..found.end() - 1],
      None => seq_id,
    };
    let entry_index = self.find_index_by_name(look_for)?;
    let entry = &self.entries()[entry_index];

    let by_hi_name = entry
      .seqs()
      .iter()
      .position(|seq| seq.hi_name_present(seq_id));
    let seq_index = by_hi_name.or_else(|| {
      // Not found by hi-name, look by passage (or empty passage).
      let passage = year_space.map_or("", |found| &seq_id[found.end()..]);
      entry.seqs().iter().position(|seq| seq.passage_present(passage))
    })?;
    self.seq_ref(entry_index, seq_index)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  fn seqdb_with_passages() -> Seqdb {
    let mut seqdb = Seqdb::new();
    seqdb.add_sequence("A/FOO/1/2019", "A(H3N2)", "", "CDC", "2019-02-11", "X1", "MDCK1", "", &"QKIPGNDNSTATLE".repeat(30), "HA");
    seqdb.add_sequence("A/FOO/1/2019", "A(H3N2)", "", "CDC", "", "X2", "E3", "", &"WKIPGNDNSTATLE".repeat(30), "HA");
    seqdb
  }

  #[rstest]
  fn seq_id_round_trip() {
    let seqdb = seqdb_with_passages();
    let found = seqdb.find_by_seq_id("A/FOO/1/2019__MDCK1").expect("should find");
    assert_eq!(found.seq_id(false), "A/FOO/1/2019__MDCK1");
    assert_eq!(found.entry().name(), "A/FOO/1/2019");
    assert_eq!(found.seq().passage(), "MDCK1");
  }

  #[rstest]
  fn percent_encoded_seq_id_is_decoded() {
    let seqdb = seqdb_with_passages();
    let found = seqdb.find_by_seq_id("A%2FFOO%2F1%2F2019__E3").expect("should find");
    assert_eq!(found.seq().passage(), "E3");
  }

  #[rstest]
  fn year_space_form_falls_back_to_passage() {
    let seqdb = seqdb_with_passages();
    let found = seqdb.find_by_seq_id("A/FOO/1/2019 E3").expect("should find");
    assert_eq!(found.seq().passage(), "E3");
  }

  #[rstest]
  fn year_space_form_prefers_hi_names() {
    let mut seqdb = seqdb_with_passages();
    let hi_name = "A/FOO/1/2019 NYMC E3";
    {
      let entry = seqdb.find_by_name_mut("A/FOO/1/2019").unwrap();
      entry.seqs_mut()[0].add_hi_name(hi_name);
    }
    let found = seqdb.find_by_seq_id(hi_name).expect("should find");
    assert_eq!(found.indices().1, 0);
  }

  #[rstest]
  fn missing_seq_id_returns_none() {
    let seqdb = seqdb_with_passages();
    assert!(seqdb.find_by_seq_id("A/BAR/1/2019__MDCK1").is_none());
    assert!(seqdb.find_by_seq_id("A/FOO/1/2019__MDCK9").is_none());
  }
}
