use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use eyre::Report;
use itertools::Itertools;
use log::info;

use crate::analyze::b_lineage;
use crate::analyze::indels::InsertionsDeletionsDetector;
use crate::db::entry::Entry;
use crate::db::iter::SeqdbIter;
use crate::db::seq::Seq;
use crate::messages::Messages;

/// A sequence that failed translation or alignment during ingest, kept for
/// reporting.
#[derive(Debug, Clone)]
pub struct NotAlignedRecord {
  pub virus_type: String,
  pub name: String,
  pub nucleotides: String,
  pub amino_acids: String,
}

/// The sequence database: entries sorted by name plus a lazy secondary index
/// from hi-name to the owning sequence.
///
/// The hi-name index is invalidated whenever any `hi_names` set is mutated;
/// callers rebuild it explicitly via [`Seqdb::build_hi_name_index`].
#[derive(Debug, Default)]
pub struct Seqdb {
  pub(crate) entries: Vec<Entry>,
  hi_name_index: HashMap<String, (u32, u32)>,
  not_aligned: Vec<NotAlignedRecord>,
}

/// `(entry, seq)` index pair borrowing the store.
#[derive(Debug, Clone, Copy)]
pub struct SeqRef<'a> {
  seqdb: &'a Seqdb,
  entry_index: usize,
  seq_index: usize,
}

impl<'a> SeqRef<'a> {
  pub(crate) fn new(seqdb: &'a Seqdb, entry_index: usize, seq_index: usize) -> Self {
    Self { seqdb, entry_index, seq_index }
  }

  pub fn entry(&self) -> &'a Entry {
    &self.seqdb.entries[self.entry_index]
  }

  pub fn seq(&self) -> &'a Seq {
    &self.entry().seqs()[self.seq_index]
  }

  pub fn indices(&self) -> (usize, usize) {
    (self.entry_index, self.seq_index)
  }

  /// The first hi-name when the sequence was matched, otherwise
  /// `"{name}{separator}{passage}"`.
  pub fn make_name(&self, separator: &str) -> String {
    make_name(self.entry(), self.seq(), separator)
  }
}

pub(crate) fn make_name(entry: &Entry, seq: &Seq, separator: &str) -> String {
  match seq.hi_names().first() {
    Some(hi_name) => hi_name.clone(),
    None => format!("{}{separator}{}", entry.name(), seq.passage()).trim().to_owned(),
  }
}

impl Seqdb {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn number_of_entries(&self) -> usize {
    self.entries.len()
  }

  pub fn number_of_seqs(&self) -> usize {
    self.entries.iter().map(Entry::number_of_seqs).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn entries(&self) -> &[Entry] {
    &self.entries
  }

  pub fn entries_mut(&mut self) -> &mut Vec<Entry> {
    &mut self.entries
  }

  pub(crate) fn find_index_by_name(&self, name: &str) -> Option<usize> {
    self.entries.binary_search_by(|entry| entry.name().cmp(name)).ok()
  }

  pub fn find_by_name(&self, name: &str) -> Option<&Entry> {
    self.find_index_by_name(name).map(|index| &self.entries[index])
  }

  pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Entry> {
    let index = self.find_index_by_name(name)?;
    Some(&mut self.entries[index])
  }

  pub fn seq_ref(&self, entry_index: usize, seq_index: usize) -> Option<SeqRef<'_>> {
    let entry = self.entries.get(entry_index)?;
    entry.seqs().get(seq_index)?;
    Some(SeqRef::new(self, entry_index, seq_index))
  }

  /// Adds one incoming record, merging it into an existing entry and
  /// sequence when possible. Returns the collected warnings.
  pub fn add_sequence(
    &mut self,
    name: &str,
    virus_type: &str,
    lineage: &str,
    lab: &str,
    date: &str,
    lab_id: &str,
    passage: &str,
    reassortant: &str,
    sequence: &str,
    gene: &str,
  ) -> Messages {
    let mut messages = Messages::new();
    let name = name.trim();
    let mut entry = Entry::new(name, virus_type, lineage);

    let mut new_seq = Seq::new(sequence, gene);
    let align_result = new_seq.align(false, &mut messages, name);
    if !new_seq.aligned() && !new_seq.nucleotides_raw().is_empty() {
      self.not_aligned.push(NotAlignedRecord {
        virus_type: virus_type.to_owned(),
        name: name.to_owned(),
        nucleotides: new_seq.nucleotides_raw().to_owned(),
        amino_acids: new_seq.amino_acids_raw().to_owned(),
      });
    }
    if let Some(align) = &align_result {
      if align.update_subtype {
        entry.update_subtype_name(&align.subtype, &mut messages);
      }
    }

    let (entry_index, seq_index) = match self
      .entries
      .binary_search_by(|stored| stored.name().cmp(entry.name()))
    {
      Err(insertion_pos) => {
        entry.seqs_mut().push(new_seq);
        self.entries.insert(insertion_pos, entry);
        (insertion_pos, 0)
      }
      Ok(entry_pos) => {
        let stored = &mut self.entries[entry_pos];
        if let Some(align) = &align_result {
          if align.update_subtype {
            stored.update_subtype_name(&align.subtype, &mut messages);
          }
        }
        let seqs = stored.seqs_mut();
        let seq_pos = match seqs.iter_mut().position(|seq| seq.match_update(&new_seq)) {
          Some(found) => {
            seqs[found].update_gene(gene, &mut messages, true);
            found
          }
          None => {
            seqs.push(new_seq);
            seqs.len() - 1
          }
        };
        (entry_pos, seq_pos)
      }
    };

    let stored_entry = &mut self.entries[entry_index];
    if let Some(align) = &align_result {
      stored_entry.update_lineage(&align.lineage, &mut messages);
    }
    stored_entry.add_date(date);

    let stored_seq = &mut stored_entry.seqs_mut()[seq_index];
    stored_seq.add_reassortant(reassortant);
    stored_seq.add_passage(passage);
    stored_seq.add_lab_id(lab, lab_id);

    messages
  }

  /// Removes too-short and untranslated sequences and the entries left with
  /// no sequences at all.
  pub fn cleanup(&mut self, remove_short_sequences: bool) -> Messages {
    let mut messages = Messages::new();
    if remove_short_sequences {
      for entry in &mut self.entries {
        entry.remove_short_sequences();
      }
    }
    for entry in &mut self.entries {
      entry.remove_not_translated_sequences();
    }

    let num_entries_before = self.entries.len();
    self.entries.retain(|entry| !entry.empty());
    if self.entries.len() != num_entries_before {
      messages.warning(format!(
        "{} entries removed during cleanup",
        num_entries_before - self.entries.len()
      ));
    }
    messages
  }

  pub fn virus_types(&self) -> BTreeSet<String> {
    self.entries.iter().map(|entry| entry.virus_type().to_owned()).collect()
  }

  /// Infers evolutionary deletions per virus type, widening amino-acid
  /// strings with gaps so that same-subtype sequences align positionally.
  pub fn detect_insertions_deletions(&mut self) {
    for virus_type in self.virus_types() {
      let detector = InsertionsDeletionsDetector::new(self, &virus_type);
      detector.detect(self);
    }
  }

  /// Classifies B entries as YAMAGATA or VICTORIA from the deletion pattern
  /// around position 163 of the gapped sequences.
  pub fn detect_b_lineage(&mut self) {
    b_lineage::detect(self);
  }

  /// Recomputes the clade sets of all aligned sequences.
  pub fn update_clades(&mut self) {
    for entry in &mut self.entries {
      let virus_type = entry.virus_type.clone();
      let lineage = entry.lineage.clone();
      let name = entry.name.clone();
      for seq in entry.seqs_mut() {
        seq.update_clades(&virus_type, &lineage, &name);
      }
    }
  }

  pub fn build_hi_name_index(&mut self) {
    self.hi_name_index.clear();
    for (entry_index, entry) in self.entries.iter().enumerate() {
      for (seq_index, seq) in entry.seqs().iter().enumerate() {
        for hi_name in seq.hi_names() {
          if let Some((other_entry, _)) = self
            .hi_name_index
            .insert(hi_name.clone(), (entry_index as u32, seq_index as u32))
          {
            log::warn!(
              "{hi_name} was already in the hi-name index [{}] [{}]",
              self.entries[other_entry as usize].name(),
              entry.name()
            );
          }
        }
      }
    }
  }

  pub fn find_hi_name(&self, hi_name: &str) -> Option<SeqRef<'_>> {
    let &(entry_index, seq_index) = self.hi_name_index.get(hi_name)?;
    Some(SeqRef::new(self, entry_index as usize, seq_index as usize))
  }

  /// Matches chart antigens against the hi-name index: full name first, the
  /// canonical form for matching second.
  pub fn match_antigens(&self, antigens: &[Antigen]) -> Vec<Option<SeqRef<'_>>> {
    let mut num_matched = 0;
    let per_antigen = antigens
      .iter()
      .map(|antigen| {
        let found = self
          .find_hi_name(&antigen.full_name)
          .or_else(|| self.find_hi_name(&antigen.full_name_for_matching));
        if found.is_some() {
          num_matched += 1;
        } else {
          log::warn!("no sequence matches antigen \"{}\"", antigen.full_name);
        }
        found
      })
      .collect();
    info!("{num_matched} antigens have sequences in seqdb");
    per_antigen
  }

  pub fn all_hi_names(&self) -> Vec<String> {
    self
      .entries
      .iter()
      .flat_map(Entry::seqs)
      .flat_map(|seq| seq.hi_names().iter().cloned())
      .sorted()
      .dedup()
      .collect()
  }

  pub fn all_passages(&self) -> Vec<String> {
    self
      .entries
      .iter()
      .flat_map(Entry::seqs)
      .flat_map(|seq| seq.passages().iter().cloned())
      .sorted()
      .dedup()
      .collect()
  }

  pub fn remove_hi_names(&mut self) {
    for entry in &mut self.entries {
      for seq in entry.seqs_mut() {
        seq.clear_hi_names();
      }
    }
    self.hi_name_index.clear();
  }

  /// Per-seq traversal with chained AND-ed filters.
  pub fn iter(&self) -> SeqdbIter<'_> {
    SeqdbIter::new(self)
  }

  /// Database statistics: per virus type counts of entries, lineages,
  /// aligned/matched sequences, dates and clades.
  pub fn report(&self) -> String {
    let count_by = |predicate: &dyn Fn(&Entry) -> bool| {
      let mut counts = BTreeMap::<&str, usize>::new();
      for entry in self.entries.iter().filter(|entry| predicate(entry)) {
        *counts.entry(entry.virus_type()).or_default() += 1;
      }
      format_counts(&counts)
    };

    let mut lineages = BTreeMap::<&str, usize>::new();
    for entry in &self.entries {
      *lineages.entry(entry.lineage()).or_default() += 1;
    }

    format!(
      "Entries: {}\nVirus types: {}\nLineages: {}\nAligned: {}\nMatched: {}\nHave dates: {}\nHave clades: {}\n",
      self.entries.len(),
      count_by(&|_| true),
      format_counts(&lineages),
      count_by(&|entry| entry.seqs().iter().any(Seq::aligned)),
      count_by(&|entry| entry.seqs().iter().any(Seq::matched)),
      count_by(&|entry| !entry.dates().is_empty()),
      count_by(&|entry| entry.seqs().iter().any(|seq| !seq.clades().is_empty())),
    )
  }

  /// Unique prefixes of the not-aligned sequences, to spot missing align
  /// rules.
  pub fn report_not_aligned(&self, prefix_size: usize) -> String {
    let prefixes: Vec<String> = self
      .iter()
      .filter(|seq_ref| !seq_ref.seq().aligned())
      .map(|seq_ref| {
        let amino_acids = seq_ref.seq().amino_acids_raw();
        amino_acids[..amino_acids.len().min(prefix_size)].to_owned()
      })
      .sorted()
      .dedup()
      .collect();
    format!(
      "Prefixes of not aligned sequences of length {prefix_size}: {}\n{}\n",
      prefixes.len(),
      prefixes.join("\n")
    )
  }

  pub fn not_aligned_after_adding(&self) -> &[NotAlignedRecord] {
    &self.not_aligned
  }

  pub fn report_not_aligned_after_adding(&self) -> String {
    self
      .not_aligned
      .iter()
      .map(|record| format!("{} {}", record.virus_type, record.name))
      .join("\n")
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, Report> {
    crate::io::schema::load(path.as_ref())
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Report> {
    crate::io::schema::save(self, path.as_ref())
  }
}

fn format_counts(counts: &BTreeMap<&str, usize>) -> String {
  counts
    .iter()
    .map(|(key, count)| format!("\"{key}\": {count}"))
    .join(", ")
}

/// Chart antigen names offered to [`Seqdb::match_antigens`].
#[derive(Debug, Clone)]
pub struct Antigen {
  pub full_name: String,
  pub full_name_for_matching: String,
}
