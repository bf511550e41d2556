use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::align::catalog::{align as catalog_align, AlignResult};
use crate::align::shift::{apply_shift, InvalidShift, Shift};
use crate::align::translate::is_nucleotides;
use crate::align::translate_align::translate_and_align;
use crate::align::MINIMUM_SEQUENCE_AA_LENGTH;
use crate::analyze::clades::clades;
use crate::messages::Messages;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}: sequence not aligned")]
pub struct SequenceNotAligned(pub &'static str);

pub type LabIds = IndexMap<String, IndexSet<String>>;

fn default_gene() -> String {
  "HA".to_owned()
}

fn shift_missing() -> Shift {
  Shift::NotAligned
}

fn shift_not_aligned(shift: &Shift) -> bool {
  !shift.aligned()
}

mod shift_wire {
  use serde::{Deserialize, Deserializer, Serializer};

  use crate::align::shift::Shift;

  // Only aligned shifts reach the serializer (see skip_serializing_if); they
  // are stored as a bare integer.
  pub fn serialize<S: Serializer>(shift: &Shift, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i32(shift.value().unwrap_or_default())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Shift, D::Error> {
    i32::deserialize(deserializer).map(Shift::Aligned)
  }
}

/// One sequence variant of one strain.
///
/// A strain usually has one sequence, but reassortants, different passages
/// and submissions from different labs can produce variants that are not
/// sub/super-strings of each other and therefore kept separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seq {
  #[serde(rename = "p", default, skip_serializing_if = "IndexSet::is_empty")]
  pub(crate) passages: IndexSet<String>,

  #[serde(rename = "n", default, skip_serializing_if = "String::is_empty")]
  pub(crate) nucleotides: String,

  #[serde(rename = "a", default, skip_serializing_if = "String::is_empty")]
  pub(crate) amino_acids: String,

  #[serde(
    rename = "t",
    default = "shift_missing",
    with = "shift_wire",
    skip_serializing_if = "shift_not_aligned"
  )]
  pub(crate) nuc_shift: Shift,

  #[serde(
    rename = "s",
    default = "shift_missing",
    with = "shift_wire",
    skip_serializing_if = "shift_not_aligned"
  )]
  pub(crate) aa_shift: Shift,

  #[serde(rename = "l", default, skip_serializing_if = "IndexMap::is_empty")]
  pub(crate) lab_ids: LabIds,

  #[serde(rename = "g", default = "default_gene", skip_serializing_if = "String::is_empty")]
  pub(crate) gene: String,

  #[serde(rename = "h", default, skip_serializing_if = "IndexSet::is_empty")]
  pub(crate) hi_names: IndexSet<String>,

  #[serde(rename = "r", default, skip_serializing_if = "IndexSet::is_empty")]
  pub(crate) reassortants: IndexSet<String>,

  #[serde(rename = "c", default, skip_serializing_if = "IndexSet::is_empty")]
  pub(crate) clades: IndexSet<String>,

  #[serde(skip)]
  pub(crate) annotations: String,
}

impl Default for Seq {
  fn default() -> Self {
    Self {
      passages: IndexSet::new(),
      nucleotides: String::new(),
      amino_acids: String::new(),
      nuc_shift: Shift::NotAligned,
      aa_shift: Shift::NotAligned,
      lab_ids: LabIds::new(),
      gene: default_gene(),
      hi_names: IndexSet::new(),
      reassortants: IndexSet::new(),
      clades: IndexSet::new(),
      annotations: String::new(),
    }
  }
}

impl Seq {
  /// Classifies `sequence` as nucleotides or amino acids by character set.
  pub fn new(sequence: &str, gene: &str) -> Self {
    let mut seq = Self::default();
    if is_nucleotides(sequence) {
      seq.nucleotides = sequence.to_owned();
    } else {
      seq.amino_acids = sequence.to_owned();
    }
    if !gene.is_empty() {
      seq.gene = gene.to_owned();
    }
    seq
  }

  pub fn is_short(&self) -> bool {
    if self.amino_acids.is_empty() {
      self.nucleotides.len() < MINIMUM_SEQUENCE_AA_LENGTH * 3
    } else {
      self.amino_acids.len() < MINIMUM_SEQUENCE_AA_LENGTH
    }
  }

  pub fn translated(&self) -> bool {
    !self.amino_acids.is_empty()
  }

  pub fn aligned(&self) -> bool {
    self.aa_shift.aligned()
  }

  pub fn matched(&self) -> bool {
    !self.hi_names.is_empty()
  }

  /// Translates and/or aligns this sequence, updating shifts and gene.
  ///
  /// Nucleotide sequences are translated first; the nucleotide shift is
  /// derived from the amino-acid shift and the chosen reading frame.
  pub fn align(&mut self, force: bool, messages: &mut Messages, name: &str) -> Option<AlignResult> {
    enum WhatAlign {
      No,
      Nucleotides,
      AminoAcids,
    }

    let what_align = if !self.nucleotides.is_empty() && (self.amino_acids.is_empty() || force) {
      WhatAlign::Nucleotides
    } else if !self.amino_acids.is_empty() && self.nucleotides.is_empty() && (!self.aa_shift.aligned() || force) {
      WhatAlign::AminoAcids
    } else {
      WhatAlign::No
    };

    match what_align {
      WhatAlign::No => None,
      WhatAlign::Nucleotides => {
        self.aa_shift = Shift::NotAligned;
        let result = translate_and_align(&self.nucleotides, messages, name);
        if !result.amino_acids.is_empty() {
          self.amino_acids = result.amino_acids;
        }
        if let Some(align_result) = result.align {
          self.update_gene(&align_result.gene, messages, true);
          if let Shift::Aligned(shift) = align_result.shift {
            self.aa_shift = align_result.shift;
            self.nuc_shift = Shift::Aligned(-(result.offset as i32) + shift * 3);
          }
          Some(align_result)
        } else {
          self.aa_shift = Shift::AlignmentFailed;
          messages.warning(format!("Nucs not translated/aligned: {name}"));
          None
        }
      }
      WhatAlign::AminoAcids => {
        self.aa_shift = Shift::NotAligned;
        if let Some(align_result) = catalog_align(&self.amino_acids, messages) {
          self.aa_shift = align_result.shift;
          self.update_gene(&align_result.gene, messages, true);
          Some(align_result)
        } else {
          self.aa_shift = Shift::AlignmentFailed;
          messages.warning(format!("AA not aligned: {name}"));
          None
        }
      }
    }
  }

  /// Returns whether the new sequence matches this one (equal or a
  /// sub/super-string); on a super-string match the stored sequence data is
  /// replaced by the new one.
  pub(crate) fn match_update(&mut self, new_seq: &Seq) -> bool {
    if !new_seq.nucleotides.is_empty() {
      self.match_update_nucleotides(new_seq)
    } else {
      self.match_update_amino_acids(new_seq)
    }
  }

  fn replace_sequence_data(&mut self, new_seq: &Seq) {
    self.nucleotides = new_seq.nucleotides.clone();
    self.nuc_shift = new_seq.nuc_shift;
    self.amino_acids = new_seq.amino_acids.clone();
    self.aa_shift = new_seq.aa_shift;
  }

  fn match_update_nucleotides(&mut self, new_seq: &Seq) -> bool {
    if self.nucleotides.contains(&new_seq.nucleotides) {
      true // equal or sub-string of the stored one
    } else if new_seq.nucleotides.contains(&self.nucleotides) {
      self.replace_sequence_data(new_seq);
      true
    } else {
      false
    }
  }

  fn match_update_amino_acids(&mut self, new_seq: &Seq) -> bool {
    if self.amino_acids.contains(&new_seq.amino_acids) {
      true
    } else if new_seq.amino_acids.contains(&self.amino_acids) {
      self.replace_sequence_data(new_seq);
      true
    } else {
      false
    }
  }

  pub fn add_passage(&mut self, passage: &str) {
    if !passage.is_empty() {
      self.passages.insert(passage.to_owned());
    }
  }

  pub fn add_reassortant(&mut self, reassortant: &str) {
    if !reassortant.is_empty() {
      self.reassortants.insert(reassortant.to_owned());
    }
  }

  pub fn add_lab_id(&mut self, lab: &str, lab_id: &str) {
    if !lab.is_empty() {
      let lab_ids = self.lab_ids.entry(lab.to_owned()).or_default();
      if !lab_id.is_empty() {
        lab_ids.insert(lab_id.to_owned());
      }
    }
  }

  pub fn add_hi_name(&mut self, hi_name: &str) {
    self.hi_names.insert(hi_name.to_owned());
  }

  pub fn update_gene(&mut self, gene: &str, messages: &mut Messages, replace_ha: bool) {
    if !gene.is_empty() {
      if self.gene.is_empty() {
        self.gene = gene.to_owned();
      } else if gene != self.gene {
        if replace_ha && self.gene == "HA" {
          self.gene = gene.to_owned();
        } else {
          messages.warning(format!("[SAMESEQ] different genes {} vs. {gene}", self.gene));
        }
      }
    }
  }

  pub fn update_clades(&mut self, virus_type: &str, lineage: &str, name: &str) -> &IndexSet<String> {
    if self.aligned() {
      self.clades = clades(&self.amino_acids, self.aa_shift, virus_type, lineage, name)
        .into_iter()
        .collect();
    }
    &self.clades
  }

  pub fn clades(&self) -> &IndexSet<String> {
    &self.clades
  }

  pub fn has_clade(&self, clade: &str) -> bool {
    self.clades.contains(clade)
  }

  pub fn has_lab(&self, lab: &str) -> bool {
    self.lab_ids.contains_key(lab)
  }

  pub fn lab(&self) -> &str {
    self.lab_ids.first().map_or("", |(lab, _)| lab.as_str())
  }

  pub fn lab_id(&self) -> &str {
    self
      .lab_ids
      .first()
      .and_then(|(_, ids)| ids.first())
      .map_or("", String::as_str)
  }

  pub fn lab_ids_for_lab(&self, lab: &str) -> Vec<&str> {
    self
      .lab_ids
      .get(lab)
      .map(|ids| ids.iter().map(String::as_str).collect())
      .unwrap_or_default()
  }

  /// All lab ids in `"{lab}#{id}"` form.
  pub fn lab_ids(&self) -> Vec<String> {
    self
      .lab_ids
      .iter()
      .flat_map(|(lab, ids)| ids.iter().map(move |id| format!("{lab}#{id}")))
      .collect()
  }

  pub fn lab_ids_raw(&self) -> &LabIds {
    &self.lab_ids
  }

  pub fn match_lab_id(&self, lab: &str, lab_id: &str) -> bool {
    self.lab_ids.get(lab).is_some_and(|ids| ids.contains(lab_id))
  }

  pub fn passages(&self) -> &IndexSet<String> {
    &self.passages
  }

  pub fn passage(&self) -> &str {
    self.passages.first().map_or("", String::as_str)
  }

  pub fn passage_present(&self, passage: &str) -> bool {
    if self.passages.is_empty() {
      passage.is_empty()
    } else {
      self.passages.contains(passage)
    }
  }

  pub fn reassortants(&self) -> &IndexSet<String> {
    &self.reassortants
  }

  pub fn reassortant_match(&self, reassortant: &str) -> bool {
    if self.reassortants.is_empty() {
      reassortant.is_empty()
    } else {
      self.reassortants.contains(reassortant)
    }
  }

  pub fn hi_names(&self) -> &IndexSet<String> {
    &self.hi_names
  }

  pub fn hi_name_present(&self, hi_name: &str) -> bool {
    self.hi_names.contains(hi_name)
  }

  pub fn clear_hi_names(&mut self) {
    self.hi_names.clear();
  }

  pub fn gene(&self) -> &str {
    &self.gene
  }

  pub fn annotations(&self) -> &str {
    &self.annotations
  }

  pub fn amino_acids_raw(&self) -> &str {
    &self.amino_acids
  }

  pub fn nucleotides_raw(&self) -> &str {
    &self.nucleotides
  }

  pub fn amino_acids_shift(&self) -> Shift {
    self.aa_shift
  }

  pub fn nucleotides_shift(&self) -> Shift {
    self.nuc_shift
  }

  /// Amino acids, optionally brought into canonical reference coordinates.
  ///
  /// With `aligned`, the shift is applied (`left_part_size` extra characters
  /// of signal peptide and other leading material are kept), then everything
  /// outside the longest stop-free span is masked with `'X'` or truncated.
  /// A non-zero `resize` pads or truncates the result to that length.
  pub fn amino_acids(&self, aligned: bool, left_part_size: usize, resize: usize) -> Result<String, SequenceNotAligned> {
    let mut result = self.amino_acids.clone();
    if aligned {
      let shift = self.aa_shift.value().map_err(|_| SequenceNotAligned("amino_acids"))?;
      result = apply_shift(&result, shift + left_part_size as i32, 'X');
      let (start, len) = longest_stop_free_span(&result);
      result.replace_range(..start, &"X".repeat(start));
      result.truncate(start + len);
      if resize > 0 {
        resize_to(&mut result, resize, 'X');
      }
    }
    Ok(result)
  }

  /// Nucleotide counterpart of [`Seq::amino_acids`]: gap padding, no
  /// stop-codon trimming.
  pub fn nucleotides(&self, aligned: bool, left_part_size: usize, resize: usize) -> Result<String, SequenceNotAligned> {
    let mut result = self.nucleotides.clone();
    if aligned {
      let shift = self.nuc_shift.value().map_err(|_| SequenceNotAligned("nucleotides"))?;
      result = apply_shift(&result, shift + left_part_size as i32, '-');
      if resize > 0 {
        resize_to(&mut result, resize, '-');
      }
    }
    Ok(result)
  }

  /// Amino acid at a 1-based position in aligned coordinates.
  pub fn amino_acid_at(&self, pos: usize) -> Result<char, SequenceNotAligned> {
    let aligned = self.amino_acids(true, 0, 0)?;
    aligned
      .as_bytes()
      .get(pos.wrapping_sub(1))
      .map(|&aa| char::from(aa))
      .ok_or(SequenceNotAligned("amino_acid_at"))
  }

  /// Widens the stored amino acids by gaps at an aligned (0-based) position,
  /// recording a deletion found by the indel detector.
  pub fn add_deletions(&mut self, pos: usize, num_deletions: usize) -> Result<(), InvalidShift> {
    let shift = self.aa_shift.value()?;
    let index = pos as i64 - i64::from(shift);
    let index = usize::try_from(index.max(0)).unwrap_or(0).min(self.amino_acids.len());
    self.amino_acids.insert_str(index, &"-".repeat(num_deletions));
    Ok(())
  }

  /// `"{reassortant} {passage}"` for every combination, or the passages
  /// themselves for non-reassortant strains.
  pub fn make_all_reassortant_passage_variants(&self) -> Vec<String> {
    if self.reassortants.is_empty() {
      self.passages.iter().cloned().collect()
    } else {
      self
        .reassortants
        .iter()
        .flat_map(|reassortant| self.passages.iter().map(move |passage| format!("{reassortant} {passage}")))
        .collect()
    }
  }
}

fn longest_stop_free_span(amino_acids: &str) -> (usize, usize) {
  let mut longest_start = 0;
  let mut longest_len = 0;
  let mut start = 0;
  for part in amino_acids.split('*') {
    if part.len() > longest_len {
      longest_len = part.len();
      longest_start = start;
    }
    start += part.len() + 1;
  }
  (longest_start, longest_len)
}

fn resize_to(sequence: &mut String, len: usize, fill: char) {
  if sequence.len() > len {
    sequence.truncate(len);
  } else {
    while sequence.len() < len {
      sequence.push(fill);
    }
  }
}
