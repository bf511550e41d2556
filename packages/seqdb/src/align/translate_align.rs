use log::warn;

use crate::align::catalog::{align, AlignResult};
use crate::align::shift::Shift;
use crate::align::translate::translate_nucleotides_to_amino_acids;
use crate::align::{MINIMUM_SEQUENCE_AA_LENGTH, MINIMUM_SEQUENCE_NUC_LENGTH};
use crate::messages::Messages;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslateAlignResult {
  /// None when no reading frame could be aligned.
  pub align: Option<AlignResult>,
  /// On success the full translation of the chosen frame; on failure the
  /// longest stop-free candidate part, kept for diagnostics.
  pub amino_acids: String,
  /// Reading frame the amino acids came from.
  pub offset: usize,
}

/// Translates nucleotides in all three reading frames and aligns the result.
///
/// Some sequences (seen from CNIC and perhaps other labs) carry stop codons
/// in their initial part, so each frame is translated in full, split on stops
/// and every sufficiently long part is offered to the aligner. Most probably
/// just one frame leads to a shift.
pub fn translate_and_align(nucleotides: &str, messages: &mut Messages, name: &str) -> TranslateAlignResult {
  let mut not_aligned = TranslateAlignResult::default();
  if nucleotides.len() < MINIMUM_SEQUENCE_NUC_LENGTH {
    return not_aligned; // too short
  }

  let translated: Vec<String> = (0..3)
    .map(|offset| translate_nucleotides_to_amino_acids(nucleotides, offset))
    .collect();

  let mut results: Vec<TranslateAlignResult> = Vec::new();
  let mut longest_part = 0;
  for (offset, translation) in translated.iter().enumerate() {
    let mut prefix_len = 0;
    for part in translation.split('*') {
      longest_part = longest_part.max(part.len());
      if part.len() >= MINIMUM_SEQUENCE_AA_LENGTH {
        let mut part_messages = Messages::new();
        if let Some(mut align_result) = align(part, &mut part_messages) {
          // Convert the part-relative shift into a shift within the full
          // frame translation.
          if let Shift::Aligned(shift) = &mut align_result.shift {
            *shift -= prefix_len as i32;
          }
          results.push(TranslateAlignResult {
            align: Some(align_result),
            amino_acids: translation.clone(),
            offset,
          });
          messages.append(part_messages);
          break;
        } else if not_aligned.amino_acids.len() < part.len() {
          not_aligned.amino_acids = part.to_owned();
          not_aligned.offset = offset;
        }
      }
      prefix_len += 1 + part.len();
    }
  }

  if results.is_empty() {
    if longest_part >= MINIMUM_SEQUENCE_AA_LENGTH {
      warn!("not aligned: {name} longest part: {longest_part}");
    }
    return not_aligned;
  }
  if results.len() > 1 {
    messages.warning(format!("Multiple translations and alignment for: {nucleotides}"));
  }
  results.swap_remove(0)
}
