use std::collections::HashMap;

use lazy_static::lazy_static;

// Both DNA and RNA codons, plus the ambiguity codes observed for stops in lab
// submissions (TAR, TRA and the RNA equivalents).
static CODON_TO_AA: &[(&str, char)] = &[
  ("UGC", 'C'), ("GTA", 'V'), ("GTG", 'V'), ("CCT", 'P'), ("CUG", 'L'), ("AGG", 'R'), ("CTT", 'L'), ("CUU", 'L'),
  ("CTG", 'L'), ("GCU", 'A'), ("CCG", 'P'), ("AUG", 'M'), ("GGC", 'G'), ("UUA", 'L'), ("GAG", 'E'), ("UGG", 'W'),
  ("UUU", 'F'), ("UUG", 'L'), ("ACU", 'T'), ("TTA", 'L'), ("AAT", 'N'), ("CGU", 'R'), ("CCA", 'P'), ("GCC", 'A'),
  ("GCG", 'A'), ("TTG", 'L'), ("CAT", 'H'), ("AAC", 'N'), ("GCA", 'A'), ("GAU", 'D'), ("UAU", 'Y'), ("CAC", 'H'),
  ("AUA", 'I'), ("GUC", 'V'), ("TCG", 'S'), ("GGG", 'G'), ("AGC", 'S'), ("CTA", 'L'), ("GCT", 'A'), ("CCC", 'P'),
  ("ACC", 'T'), ("GAT", 'D'), ("TCC", 'S'), ("UAC", 'Y'), ("CAU", 'H'), ("UCG", 'S'), ("CAA", 'Q'), ("UCC", 'S'),
  ("AGU", 'S'), ("TTT", 'F'), ("ACA", 'T'), ("ACG", 'T'), ("CGC", 'R'), ("TGT", 'C'), ("CAG", 'Q'), ("GUA", 'V'),
  ("GGU", 'G'), ("AAG", 'K'), ("AGA", 'R'), ("ATA", 'I'), ("TAT", 'Y'), ("UCU", 'S'), ("TCA", 'S'), ("GAA", 'E'),
  ("AGT", 'S'), ("TCT", 'S'), ("ACT", 'T'), ("CGA", 'R'), ("GGT", 'G'), ("TGC", 'C'), ("UGU", 'C'), ("CUC", 'L'),
  ("GAC", 'D'), ("UUC", 'F'), ("GTC", 'V'), ("ATT", 'I'), ("TAC", 'Y'), ("CUA", 'L'), ("TTC", 'F'), ("GTT", 'V'),
  ("UCA", 'S'), ("AUC", 'I'), ("GGA", 'G'), ("GUG", 'V'), ("GUU", 'V'), ("AUU", 'I'), ("CGT", 'R'), ("CCU", 'P'),
  ("ATG", 'M'), ("AAA", 'K'), ("TGG", 'W'), ("CGG", 'R'), ("AAU", 'N'), ("CTC", 'L'), ("ATC", 'I'),
  ("TAA", '*'), ("UAA", '*'), ("TAG", '*'), ("UAG", '*'), ("TGA", '*'), ("UGA", '*'), ("TAR", '*'), ("TRA", '*'),
  ("UAR", '*'), ("URA", '*'),
];

lazy_static! {
  static ref CODONS: HashMap<&'static str, char> = CODON_TO_AA.iter().copied().collect();
}

/// Translates nucleotides to amino acids starting at reading-frame `offset`.
///
/// Unknown codons become `'X'`, stop codons are emitted as `'*'` without
/// terminating the translation, a trailing partial codon is dropped.
pub fn translate_nucleotides_to_amino_acids(nucleotides: &str, offset: usize) -> String {
  let mut amino_acids = String::with_capacity(nucleotides.len().saturating_sub(offset) / 3);
  let mut begin = offset;
  while begin + 3 <= nucleotides.len() {
    let codon = &nucleotides[begin..begin + 3];
    amino_acids.push(CODONS.get(codon).copied().unwrap_or('X'));
    begin += 3;
  }
  amino_acids
}

/// Character set test distinguishing nucleotide from amino-acid input: IUPAC
/// nucleotide notation plus gap and X (gisaid nucleotide sequences contain X).
pub fn is_nucleotides(sequence: &str) -> bool {
  const NUCLEOTIDE_ELEMENTS: &str = "-ABCDGHKMNRSTUVWXY";
  sequence.chars().all(|symbol| NUCLEOTIDE_ELEMENTS.contains(symbol))
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  #[rstest]
  #[case("ATGAAAACG", 0, "MKT")]
  #[case("ATGAAAACG", 1, "*K")]
  #[case("ATGAAAACGA", 1, "*KR")]
  #[case("ATGTAAACG", 0, "M*T")]
  #[case("ATGNNNACG", 0, "MXT")]
  #[case("AT", 0, "")]
  fn translation(#[case] nucleotides: &str, #[case] offset: usize, #[case] expected: &str) {
    assert_eq!(translate_nucleotides_to_amino_acids(nucleotides, offset), expected);
  }

  #[rstest]
  fn translation_length_is_whole_codons() {
    for offset in 0..3 {
      let translated = translate_nucleotides_to_amino_acids("ATGAAAACGTT", offset);
      assert_eq!(translated.len(), (11 - offset) / 3);
    }
  }

  #[rstest]
  fn rna_and_ambiguous_stops() {
    assert_eq!(translate_nucleotides_to_amino_acids("AUGUAR", 0), "M*");
    assert_eq!(translate_nucleotides_to_amino_acids("ATGTAR", 0), "M*");
  }

  #[rstest]
  #[case("ACGT", true)]
  #[case("ACGU-NX", true)]
  #[case("MKTIIALSYIFCLVLG", false)]
  #[case("QKIPGNDNSTATLE", false)]
  fn nucleotide_detection(#[case] sequence: &str, #[case] expected: bool) {
    assert_eq!(is_nucleotides(sequence), expected);
  }
}
