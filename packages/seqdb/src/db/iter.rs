use regex::{Regex, RegexBuilder};

use crate::db::entry::Entry;
use crate::db::seq::Seq;
use crate::db::store::{make_name, SeqRef, Seqdb};

/// Iterator over `(entry, seq)` pairs with chained filters, all AND-ed
/// together. Filters are plain predicates applied by the iterator body.
pub struct SeqdbIter<'a> {
  seqdb: &'a Seqdb,
  entry_index: usize,
  seq_index: usize,
  filter: Filter,
}

#[derive(Default)]
struct Filter {
  lab: Option<String>,
  lab_id: Option<(String, String)>,
  subtype: Option<String>,
  lineage: Option<String>,
  continent: Option<String>,
  country: Option<String>,
  aligned: bool,
  gene: Option<String>,
  clade: Option<String>,
  date_range: Option<(String, String)>,
  has_hi_name: bool,
  name_regex: Option<Regex>,
}

impl Filter {
  fn suitable_entry(&self, entry: &Entry) -> bool {
    self.subtype.as_deref().is_none_or(|subtype| entry.virus_type() == subtype)
      && self.lineage.as_deref().is_none_or(|lineage| entry.lineage() == lineage)
      && self
        .continent
        .as_deref()
        .is_none_or(|continent| entry.continent() == continent)
      && self.country.as_deref().is_none_or(|country| entry.country() == country)
      && self
        .date_range
        .as_ref()
        .is_none_or(|(begin, end)| entry.date_within_range(begin, end))
  }

  fn suitable_seq(&self, entry: &Entry, seq: &Seq) -> bool {
    (!self.aligned || seq.aligned())
      && self.gene.as_deref().is_none_or(|gene| seq.gene() == gene)
      && (!self.has_hi_name || seq.matched())
      && self.lab.as_deref().is_none_or(|lab| seq.has_lab(lab))
      && self
        .lab_id
        .as_ref()
        .is_none_or(|(lab, lab_id)| seq.match_lab_id(lab, lab_id))
      && self.clade.as_deref().is_none_or(|clade| seq.has_clade(clade))
      && self
        .name_regex
        .as_ref()
        .is_none_or(|re| re.is_match(&make_name(entry, seq, " ")))
  }
}

impl<'a> SeqdbIter<'a> {
  pub(crate) fn new(seqdb: &'a Seqdb) -> Self {
    Self {
      seqdb,
      entry_index: 0,
      seq_index: 0,
      filter: Filter::default(),
    }
  }

  pub fn filter_lab(mut self, lab: &str) -> Self {
    self.filter.lab = Some(lab.to_owned());
    self
  }

  pub fn filter_lab_id(mut self, lab: &str, lab_id: &str) -> Self {
    self.filter.lab_id = Some((lab.to_owned(), lab_id.to_owned()));
    self
  }

  pub fn filter_subtype(mut self, subtype: &str) -> Self {
    self.filter.subtype = Some(subtype.to_owned());
    self
  }

  pub fn filter_lineage(mut self, lineage: &str) -> Self {
    self.filter.lineage = Some(lineage.to_owned());
    self
  }

  pub fn filter_continent(mut self, continent: &str) -> Self {
    self.filter.continent = Some(continent.to_owned());
    self
  }

  pub fn filter_country(mut self, country: &str) -> Self {
    self.filter.country = Some(country.to_owned());
    self
  }

  pub fn filter_aligned(mut self, aligned: bool) -> Self {
    self.filter.aligned = aligned;
    self
  }

  pub fn filter_gene(mut self, gene: &str) -> Self {
    self.filter.gene = Some(gene.to_owned());
    self
  }

  pub fn filter_clade(mut self, clade: &str) -> Self {
    self.filter.clade = Some(clade.to_owned());
    self
  }

  /// `[begin, end)` against the entry's most recent date.
  pub fn filter_date_range(mut self, begin: &str, end: &str) -> Self {
    self.filter.date_range = Some((begin.to_owned(), end.to_owned()));
    self
  }

  pub fn filter_hi_name(mut self, has_hi_name: bool) -> Self {
    self.filter.has_hi_name = has_hi_name;
    self
  }

  /// Case-insensitive regex over [`SeqRef::make_name`].
  pub fn filter_name_regex(mut self, pattern: &str) -> Result<Self, regex::Error> {
    self.filter.name_regex = Some(RegexBuilder::new(pattern).case_insensitive(true).build()?);
    Ok(self)
  }
}

impl<'a> Iterator for SeqdbIter<'a> {
  type Item = SeqRef<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let entry = self.seqdb.entries().get(self.entry_index)?;
      if self.seq_index == 0 && !self.filter.suitable_entry(entry) {
        self.entry_index += 1;
        continue;
      }
      match entry.seqs().get(self.seq_index) {
        None => {
          self.entry_index += 1;
          self.seq_index = 0;
        }
        Some(seq) => {
          let current_seq_index = self.seq_index;
          self.seq_index += 1;
          if self.filter.suitable_seq(entry, seq) {
            return Some(SeqRef::new(self.seqdb, self.entry_index, current_seq_index));
          }
        }
      }
    }
  }
}
