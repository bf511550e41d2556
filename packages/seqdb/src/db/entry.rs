use serde::{Deserialize, Serialize};

use crate::db::seq::Seq;
use crate::messages::Messages;

/// One strain: canonical virus name plus all its sequence variants.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
  #[serde(rename = "N", default, skip_serializing_if = "String::is_empty")]
  pub(crate) name: String,

  #[serde(rename = "C", default, skip_serializing_if = "String::is_empty")]
  pub(crate) continent: String,

  #[serde(rename = "c", default, skip_serializing_if = "String::is_empty")]
  pub(crate) country: String,

  #[serde(rename = "d", default, skip_serializing_if = "Vec::is_empty")]
  pub(crate) dates: Vec<String>,

  #[serde(rename = "l", default, skip_serializing_if = "String::is_empty")]
  pub(crate) lineage: String,

  #[serde(rename = "v", default, skip_serializing_if = "String::is_empty")]
  pub(crate) virus_type: String,

  #[serde(rename = "s", default, skip_serializing_if = "Vec::is_empty")]
  pub(crate) seqs: Vec<Seq>,
}

impl Entry {
  pub fn new(name: &str, virus_type: &str, lineage: &str) -> Self {
    Self {
      name: name.to_owned(),
      virus_type: virus_type.to_owned(),
      lineage: lineage.to_owned(),
      ..Self::default()
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn virus_type(&self) -> &str {
    &self.virus_type
  }

  pub fn lineage(&self) -> &str {
    &self.lineage
  }

  pub fn set_lineage(&mut self, lineage: &str) {
    self.lineage = lineage.to_owned();
  }

  pub fn country(&self) -> &str {
    &self.country
  }

  pub fn continent(&self) -> &str {
    &self.continent
  }

  pub fn empty(&self) -> bool {
    self.seqs.is_empty()
  }

  pub fn seqs(&self) -> &[Seq] {
    &self.seqs
  }

  pub fn seqs_mut(&mut self) -> &mut Vec<Seq> {
    &mut self.seqs
  }

  pub fn number_of_seqs(&self) -> usize {
    self.seqs.len()
  }

  pub fn dates(&self) -> &[String] {
    &self.dates
  }

  /// Most recent date on record, empty when none.
  pub fn date(&self) -> &str {
    self.dates.last().map_or("", String::as_str)
  }

  /// Keeps the dates sorted and unique.
  pub fn add_date(&mut self, date: &str) {
    if !date.is_empty() {
      if let Err(insertion_pos) = self.dates.binary_search_by(|stored| stored.as_str().cmp(date)) {
        self.dates.insert(insertion_pos, date.to_owned());
      }
    }
  }

  /// `[begin, end)` filtering against the most recent date; entries without
  /// dates sort before every real date.
  pub fn date_within_range(&self, begin: &str, end: &str) -> bool {
    let date = if self.dates.is_empty() { "0000-00-00" } else { self.date() };
    (begin.is_empty() || date >= begin) && (end.is_empty() || date < end)
  }

  pub fn update_lineage(&mut self, lineage: &str, messages: &mut Messages) {
    if !lineage.is_empty() {
      if self.lineage.is_empty() {
        self.lineage = lineage.to_owned();
      } else if lineage != self.lineage {
        messages.warning(format!("Different lineages {} (stored) vs. {lineage} (ignored)", self.lineage));
      }
    }
  }

  /// Sets or checks the subtype, fixing the subtype prefix of the name too.
  ///
  /// NIMR sent a few sequences to gisaid as A(H3N0) while they are really
  /// A(H3N2) (detected by the aligner); that promotion is the one permitted
  /// subtype change.
  pub fn update_subtype_name(&mut self, subtype: &str, messages: &mut Messages) {
    if !subtype.is_empty() {
      if self.virus_type.is_empty() {
        self.virus_type = subtype.to_owned();
      } else if subtype != self.virus_type {
        if self.virus_type == "A(H3N0)" && subtype == "A(H3N2)" {
          self.virus_type = subtype.to_owned();
          if self.name.starts_with("A(H3N0)") {
            self.name.replace_range(5..6, "2");
          }
        } else {
          messages.warning(format!(
            "Different subtypes {} (stored) vs. {subtype} (ignored)",
            self.virus_type
          ));
        }
      }
      if self.name.starts_with("A/") {
        self.name = format!("{}{}", self.virus_type, &self.name[1..]);
      }
    }
  }

  pub fn remove_short_sequences(&mut self) -> bool {
    let before = self.seqs.len();
    self.seqs.retain(|seq| !seq.is_short());
    self.seqs.len() != before
  }

  pub fn remove_not_translated_sequences(&mut self) -> bool {
    let before = self.seqs.len();
    self.seqs.retain(Seq::translated);
    self.seqs.len() != before
  }

  pub fn has_lab(&self, lab: &str) -> bool {
    self.seqs.iter().any(|seq| seq.has_lab(lab))
  }

  /// All lab ids over all sequences, sorted and unique.
  pub fn lab_ids(&self) -> Vec<String> {
    let mut lab_ids: Vec<String> = self.seqs.iter().flat_map(|seq| seq.lab_ids()).collect();
    lab_ids.sort();
    lab_ids.dedup();
    lab_ids
  }

  pub fn find_by_hi_name(&self, hi_name: &str) -> Option<&Seq> {
    self.seqs.iter().find(|seq| seq.hi_name_present(hi_name))
  }

  /// `"{name} {variant}"` for every reassortant/passage variant of every
  /// sequence.
  pub fn make_all_names(&self) -> Vec<String> {
    self
      .seqs
      .iter()
      .flat_map(|seq| seq.make_all_reassortant_passage_variants())
      .map(|variant| format!("{} {variant}", self.name))
      .collect()
  }

  pub fn make_all_variants(&self) -> Vec<String> {
    self
      .seqs
      .iter()
      .flat_map(|seq| seq.make_all_reassortant_passage_variants())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  #[rstest]
  fn dates_stay_sorted_and_unique() {
    let mut entry = Entry::new("A(H3N2)/TEXAS/1/2019", "A(H3N2)", "");
    entry.add_date("2019-03-01");
    entry.add_date("2019-01-15");
    entry.add_date("2019-03-01");
    entry.add_date("");
    assert_eq!(entry.dates(), ["2019-01-15", "2019-03-01"]);
    assert_eq!(entry.date(), "2019-03-01");
  }

  #[rstest]
  #[case("", "", true)]
  #[case("2019-01-01", "", true)]
  #[case("", "2019-03-01", false)]
  #[case("2019-03-01", "2019-12-31", true)]
  #[case("2019-04-01", "", false)]
  fn date_range_uses_most_recent_date(#[case] begin: &str, #[case] end: &str, #[case] expected: bool) {
    let mut entry = Entry::new("A(H3N2)/TEXAS/1/2019", "A(H3N2)", "");
    entry.add_date("2019-01-15");
    entry.add_date("2019-03-01");
    assert_eq!(entry.date_within_range(begin, end), expected);
  }

  #[rstest]
  fn lineage_conflict_warns_and_keeps_stored() {
    let mut messages = Messages::new();
    let mut entry = Entry::new("B/BRISBANE/60/2008", "B", "");
    entry.update_lineage("VICTORIA", &mut messages);
    assert_eq!(entry.lineage(), "VICTORIA");
    assert!(messages.is_empty());

    entry.update_lineage("YAMAGATA", &mut messages);
    assert_eq!(entry.lineage(), "VICTORIA");
    assert!(!messages.is_empty());
  }

  #[rstest]
  fn subtype_fixes_the_name_prefix() {
    let mut messages = Messages::new();
    let mut entry = Entry::new("A/TEXAS/1/2019", "", "");
    entry.update_subtype_name("A(H3N2)", &mut messages);
    assert_eq!(entry.virus_type(), "A(H3N2)");
    assert_eq!(entry.name(), "A(H3N2)/TEXAS/1/2019");
  }

  #[rstest]
  fn h3n0_promotion_patches_stored_name() {
    let mut messages = Messages::new();
    let mut entry = Entry::new("A(H3N0)/LYON/1/2018", "A(H3N0)", "");
    entry.update_subtype_name("A(H3N2)", &mut messages);
    assert_eq!(entry.virus_type(), "A(H3N2)");
    assert_eq!(entry.name(), "A(H3N2)/LYON/1/2018");
    assert!(messages.is_empty());
  }

  #[rstest]
  fn conflicting_subtype_is_ignored_with_warning() {
    let mut messages = Messages::new();
    let mut entry = Entry::new("A(H3N2)/TEXAS/1/2019", "A(H3N2)", "");
    entry.update_subtype_name("A(H1N1)", &mut messages);
    assert_eq!(entry.virus_type(), "A(H3N2)");
    assert!(!messages.is_empty());
  }
}
