use std::collections::BTreeSet;

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

use crate::align::shift::Shift;
use crate::messages::Messages;

/// Outcome of matching an amino-acid string against the align-rule catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignResult {
  pub subtype: String,
  pub lineage: String,
  pub gene: String,
  pub shift: Shift,
  /// False for rules covering a family of N-types sharing an H pattern: they
  /// inform the shift but must not overwrite the entry's subtype.
  pub update_subtype: bool,
}

#[derive(Debug, Clone, Copy)]
enum ShiftMode {
  /// Shift derived from the match end: the aligned sequence begins right
  /// after the signal peptide.
  SignalPeptide,
  /// Shift is the given canonical position minus the match start.
  Fixed(i32),
}

struct AlignRule {
  subtype: &'static str,
  lineage: &'static str,
  gene: &'static str,
  mode: ShiftMode,
  re: Regex,
  /// Maximum index in the amino-acid string searched by this rule.
  endpos: usize,
  /// Debug identifier.
  name: &'static str,
}

fn rule(
  subtype: &'static str,
  lineage: &'static str,
  gene: &'static str,
  mode: ShiftMode,
  pattern: &str,
  endpos: usize,
  name: &'static str,
) -> AlignRule {
  AlignRule {
    subtype,
    lineage,
    gene,
    mode,
    re: Regex::new(pattern).unwrap(),
    endpos,
    name,
  }
}

use ShiftMode::{Fixed, SignalPeptide};

lazy_static! {
  // Curated per subtype/gene. Signal peptide patterns via
  // http://signalpeptide.com, the rest inferred from reference strains.
  static ref ALIGN_RULES: Vec<AlignRule> = vec![
    rule("A(H3N2)", "", "HA", SignalPeptide, "MKTIIA[FL][CS][CHY]I[FLS]C[LQ][AGIV][FL][AGS]", 40, "h3-MKT-1"),
    rule("A(H3N2)", "", "HA", SignalPeptide, "MKTIIVLSCFFCLAFS", 40, "h3-MKT-12"),
    rule("A(H3N2)", "", "HA", SignalPeptide, "MKTLIALSYIFCLVLG", 40, "h3-MKT-13"),
    rule("A(H3N2)", "", "HA", SignalPeptide, "MKTTTILILLTHWVHS", 40, "h3-MKT-14"),
    rule("A(H3N2)", "", "HA", Fixed(0), "QK[IL]PGN[DN]NSTATLCLGHHAVPNGTIVKTI", 100, "h3-QKIP"),
    rule("A(H3N2)", "", "HA", Fixed(10), "ATLCLGHHAV", 100, "h3-ATL"),
    rule("A(H3N2)", "", "HA", Fixed(36), "TNATELVQ", 100, "h3-TNA"),
    rule("A(H3N2)", "", "HA", Fixed(87), "VERSKAYSN", 100, "h3-VER"),

    // Kim, http://www.ncbi.nlm.nih.gov/nuccore/DQ415347.1
    rule("A(H3N2)", "", "NA", Fixed(0), "MNP[NS]QKI[IM]TIGS[IVX]SL[IT][ILV]", 20, "h3-NA-1"),

    rule("A(H1N1)", "", "HA", SignalPeptide, "MKVK[LY]LVLLCTFTATYA", 20, "h1-MKV-1"),
    rule("A(H1N1)", "SEASONAL", "HA", SignalPeptide, "MKVKLLVLLCTFSATYA", 20, "h1-MKV-2"),
    rule("A(H1N1)", "2009PDM", "HA", SignalPeptide, "M[EK][AV]IL.[VX][LM]L[CHY][TA][FL][AT]T[AT][NS]A", 100, "h1-MKA-2"),
    rule("A(H1N1)", "", "HA", Fixed(0), "DT[IL]CI[GX][HY]H[AT][DNTX][DN]", 100, "h1-DTL-1"),
    rule("A(H1N1)", "", "HA", Fixed(5), "GYHANNS[AT]DTV", 100, "h1-GYH"),
    rule("A(H1N1)", "", "HA", Fixed(96), "[DN]YEELREQL", 120, "h1-DYE"),
    rule("A(H1N1)", "", "HA", Fixed(105), "SSISSFER", 200, "h1-SSI"),

    rule("A(H1N1)", "", "NA", Fixed(0), "MNPNQKIITIG[SW][VI]CMTI", 20, "h1-NA-1"),
    rule("A(H1N1)", "", "NA", Fixed(73), "FAAGQSVVSVKLAGNSSLCPVSGWAIYSK", 200, "h1-NA-2"),
    rule("A(H1N1)", "", "NA", Fixed(249), "QASYKIFRIEKGKI", 300, "h1-NA-3"),

    rule("A(H1N1)", "", "M1", Fixed(0), "MSLLTEVETYVLSIIPSGPLKAEIAQRLESVFAGKNTDLEAL", 100, "h1-M1-1"),
    rule("A(H1N1)", "", "M1", Fixed(0), "MGLIYNRMGTVTTEAAFGLVCA", 200, "h1-M1-2"),
    rule("A(H1N1)", "", "M1", Fixed(0), "QRLESVFAGKNTDLEALMEWL", 200, "h1-M1-3"),

    // An H pattern shared by a family of N-types: informs the shift only.
    rule("*A(H2)", "", "HA", Fixed(-15), "M[AT]I....LLFT...GDQIC", 60, "h2-MAI"),
    rule("*A(H4)", "", "HA", Fixed(-16), "MLS...........SSQNY", 60, "h4-MLS"),
    rule("*A(H5)", "", "HA", Fixed(-16), "ME[KR]IV........VK[GS]D[HQR]IC", 60, "h5-MEK"),
    rule("*A(H6)", "", "HA", Fixed(-16), "MIAIIV.AIL.....SDKIC", 60, "h6-MIA"),
    rule("*A(H7)", "", "HA", Fixed(-18), "MN[IT]Q[IM]L...........[GA]DKIC", 60, "h7-MNT"),
    rule("*A(H8)", "", "HA", Fixed(-16), "MEKFIA.......NAYDRIC", 60, "h8-MEK"),
    rule("*A(H9)", "", "HA", Fixed(-18), "ME[AT]..............ADKIC", 60, "h9-MET"),
    rule("*A(H10)", "", "HA", Fixed(-17), "MYK............GLDKIC", 60, "h10-MYK"),
    rule("*A(H11)", "", "HA", Fixed(-16), "M[EK]K.............DEIC", 60, "h11-MEK"),
    rule("*A(H12)", "", "HA", Fixed(-17), "MEK...........[FL]AYDKIC", 60, "h12-MEK"),
    rule("*A(H13)", "", "HA", Fixed(-18), "MDI............[IV]QADRIC", 60, "h13-MDI"),
    rule("*A(H14)", "", "HA", Fixed(-17), "MIA...........AYSQITN", 60, "h14-MIA"),

    rule("*A(H5)", "", "HA", Fixed(0), "DQICIGYHANNST.Q.DTIMEKNVTVT", 100, "h5-DQIC"),

    // Inferred for B/INDONESIA/NIHRD-JBI152/2015 and B/CAMEROON/14V-8639/2014
    rule("B", "", "HA", SignalPeptide, "M[EKT][AGT][AIL][ICX]V[IL]L[IMT][AEILVX][AIVX][AMT]S[DHKNSTX][APX]", 100, "B-MKT"),
    rule("B", "", "HA", Fixed(0), "DR[ISV]C[AST][GX][ITV][IT][SWX]S[DKNX]SP[HXY][ILTVX][VX][KX]T[APT]T[QX][GV][EK][IV]NVTG[AV][IX][LPS]LT[AITX][AIST][LP][AIT][KRX]", 50, "B-DRICT"),
    rule("B", "", "HA", Fixed(3), "CTG[IVX]TS[AS]NSPHVVKTATQGEVNVTGVIPLTTTP", 50, "B-CTG"),
    rule("B", "", "HA", Fixed(23), "[XV]NVTGVIPLTTTPTK", 50, "B-VNV"),
    rule("B", "", "HA", Fixed(59), "CTDLDVALGRP", 150, "B-CTD"),
    rule("B", "", "HA", SignalPeptide, "MVVTSNA", 20, "B-MVV"),

    rule("B", "", "NA", Fixed(0), "MLPSTIQ[MT]LTL[FY][IL]TSGGVLLSLY[AV]S[AV][LS]LSYLLY[SX]DIL[LX][KR]F", 45, "B-NA"),
    rule("B", "", "NS1", Fixed(0), "MA[DN]NMTT[AT]QIEVGPGATNAT[IM]NFEAGILECYERLSWQ[KR]AL", 45, "B-NS1-1"),
    // Has an insertion at 2 or 3 compared to the above
    rule("B", "", "NS1", Fixed(0), "MA[NX][DN][NX]MTTTQIEVGPGATNATINFEAGILECYERLSWQR", 45, "B-NS1-2"),
    // Only CNIC sequences 2008-2009 have it, perhaps not HA
    rule("B", "", "", Fixed(0), "GNFLWLLHV", 45, "B-CNIC"),
  ];
}

impl AlignRule {
  fn try_match(&self, amino_acids: &str) -> Option<AlignResult> {
    let searched = &amino_acids[..amino_acids.len().min(self.endpos)];
    let found = self.re.find(searched)?;
    let shift = match self.mode {
      SignalPeptide => -(found.end() as i32),
      Fixed(position) => position - found.start() as i32,
    };
    let (subtype, update_subtype) = match self.subtype.strip_prefix('*') {
      Some(stripped) => (stripped, false),
      None => (self.subtype, true),
    };
    Some(AlignResult {
      subtype: subtype.to_owned(),
      lineage: self.lineage.to_owned(),
      gene: self.gene.to_owned(),
      shift: Shift::Aligned(shift),
      update_subtype,
    })
  }
}

/// Matches an amino-acid string against the catalog.
///
/// All matching rules are collected; when several match with different
/// subtypes or shifts a warning is emitted and the result of the first rule
/// in catalog order is still returned (catalog order is the tie-breaker).
pub fn align(amino_acids: &str, messages: &mut Messages) -> Option<AlignResult> {
  let mut results = ALIGN_RULES
    .iter()
    .filter_map(|rule| rule.try_match(amino_acids).map(|result| (rule.name, result)))
    .collect_vec();

  match results.len() {
    0 => {
      messages.warning(format!("Not aligned: {amino_acids}"));
      None
    }
    1 => Some(results.swap_remove(0).1),
    _ => {
      let subtypes: BTreeSet<&str> = results.iter().map(|(_, result)| result.subtype.as_str()).collect();
      let shifts: BTreeSet<Shift> = results.iter().map(|(_, result)| result.shift).collect();
      if subtypes.len() > 1 || shifts.len() > 1 {
        messages.warning(format!(
          "Multiple alignment matches produce different subtypes and/or shifts: {subtypes:?} {shifts:?} for {amino_acids}: {}",
          results.iter().map(|(name, _)| *name).join(" ")
        ));
      }
      Some(results.swap_remove(0).1)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  #[rstest]
  fn h3_signal_peptide_match() {
    let mut messages = Messages::new();
    let amino_acids = "MKTLIALSYIFCLVLGQKIPGNDNSTATLCLGHHAVPNGTIVKTITNDQIEVTNATELVQ";
    let result = align(amino_acids, &mut messages).unwrap();
    assert_eq!(result.subtype, "A(H3N2)");
    assert_eq!(result.gene, "HA");
    assert_eq!(result.shift, Shift::Aligned(-16));
    assert!(result.update_subtype);
  }

  #[rstest]
  fn h3_fixed_position_match() {
    let mut messages = Messages::new();
    // ATLCLGHHAV at index 26, canonical position 10: shift 10 - 26 = -16.
    let amino_acids = "MKTLIALSYIFCLVLGXXXXXXXXXXATLCLGHHAVPNGTIVKTITNDQIEV";
    let result = align(amino_acids, &mut messages).unwrap();
    assert_eq!(result.shift, Shift::Aligned(-16));
  }

  #[rstest]
  fn starred_subtype_informs_shift_only() {
    let mut messages = Messages::new();
    let amino_acids = "XDQICIGYHANNSTEQVDTIMEKNVTVTHA";
    let result = align(amino_acids, &mut messages).unwrap();
    assert_eq!(result.subtype, "A(H5)");
    assert!(!result.update_subtype);
    assert_eq!(result.shift, Shift::Aligned(-1));
  }

  #[rstest]
  fn no_match_warns_and_returns_none() {
    let mut messages = Messages::new();
    assert_eq!(align("QQQQQQQQQQ", &mut messages), None);
    assert!(!messages.is_empty());
  }

  #[rstest]
  fn endpos_limits_the_search() {
    let mut messages = Messages::new();
    // h3-MKT-13 searches only the first 40 characters.
    let mut amino_acids = "Q".repeat(45);
    amino_acids.push_str("MKTLIALSYIFCLVLG");
    assert_eq!(align(&amino_acids, &mut messages), None);
  }
}
