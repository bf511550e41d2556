use log::warn;

use crate::align::shift::Shift;

/// Amino acid at a 1-based canonical position, looked up in the raw string
/// via the shift. Out-of-range positions yield `None` and contribute no
/// clade.
fn aa_at(amino_acids: &str, shift: i32, pos: usize) -> Option<char> {
  let index = pos as i64 - 1 - i64::from(shift);
  let index = usize::try_from(index).ok()?;
  amino_acids.as_bytes().get(index).map(|&aa| char::from(aa))
}

/// Position-specific clade signatures for sequences of one strain.
///
/// Clades are technically defined by a phylogenetic tree; these operational
/// definitions by amino acids at a handful of positions are what the
/// cartography pipelines use.
pub fn clades(amino_acids: &str, shift: Shift, virus_type: &str, lineage: &str, name: &str) -> Vec<String> {
  let Ok(shift) = shift.value() else {
    return Vec::new();
  };
  match virus_type {
    "B" => match lineage {
      "YAMAGATA" => clades_b_yamagata(amino_acids, shift),
      "VICTORIA" => clades_b_victoria(amino_acids, shift, name),
      _ => Vec::new(),
    },
    "A(H1N1)" => clades_h1pdm(amino_acids, shift),
    "A(H3N2)" => clades_h3n2(amino_acids, shift),
    _ => Vec::new(),
  }
}

// 166N -> Y2, 166Y -> Y3 (victoria numeration, 163 is a gap)
fn clades_b_yamagata(amino_acids: &str, shift: i32) -> Vec<String> {
  match aa_at(amino_acids, shift, 166) {
    Some('N') => vec!["Y2".to_owned()],
    Some('Y') => vec!["Y3".to_owned()],
    _ => Vec::new(),
  }
}

fn clades_b_victoria(amino_acids: &str, shift: i32, name: &str) -> Vec<String> {
  let at = |pos| aa_at(amino_acids, shift, pos);
  let mut clades = Vec::new();

  if at(75) == Some('K') && at(172) == Some('P') && at(58).is_some_and(|aa| aa != 'P') {
    clades.push("1A".to_owned());
  } else if at(58) == Some('P') {
    clades.push("1B".to_owned());
  } else {
    clades.push("1".to_owned());
  }

  // Deletion mutants of 2017; the triple deletion is at 162, 163 and 164 by
  // convention.
  if at(162) == Some('-') && at(163) == Some('-') && at(164) == Some('-') {
    clades.push("TRIPLEDEL2017".to_owned());
  } else if at(162) == Some('-') && at(163) == Some('-') {
    clades.push("DEL2017".to_owned());
  } else if [162, 163, 164].iter().any(|&pos| at(pos) == Some('-')) {
    warn!("[{name}]: strange B/Vic deletion mutant: {amino_acids}");
  }
  clades
}

// 6B: 163Q, 6B1: 162N 163Q, 6B2: 152T 163Q
fn clades_h1pdm(amino_acids: &str, shift: i32) -> Vec<String> {
  let at = |pos| aa_at(amino_acids, shift, pos);
  let mut clades = Vec::new();
  if at(163) == Some('Q') {
    clades.push("6B".to_owned());
    if at(162) == Some('N') {
      clades.push("6B1".to_owned());
    }
    if at(152) == Some('T') {
      clades.push("6B2".to_owned());
    }
  }
  clades
}

struct CladeDesc {
  clade: &'static str,
  pos_aa: &'static [(usize, char)],
}

static CLADES_H3N2: &[CladeDesc] = &[
  CladeDesc { clade: "3C.3", pos_aa: &[(158, 'N'), (159, 'F')] },
  CladeDesc { clade: "3A", pos_aa: &[(138, 'S'), (159, 'S'), (225, 'D'), (326, 'R')] },
  CladeDesc { clade: "3B", pos_aa: &[(62, 'K'), (83, 'R'), (261, 'Q')] },
  CladeDesc { clade: "2A", pos_aa: &[(158, 'N'), (159, 'Y')] },
  CladeDesc { clade: "2A1", pos_aa: &[(158, 'N'), (159, 'Y'), (171, 'K'), (406, 'V'), (484, 'E')] },
  CladeDesc {
    clade: "2A1A",
    pos_aa: &[(121, 'K'), (135, 'K'), (158, 'N'), (159, 'Y'), (171, 'K'), (406, 'V'), (479, 'E'), (484, 'E')],
  },
  CladeDesc {
    clade: "2A1B",
    pos_aa: &[(92, 'R'), (121, 'K'), (158, 'N'), (159, 'Y'), (171, 'K'), (311, 'Q'), (406, 'V'), (484, 'E')],
  },
  CladeDesc { clade: "2A2", pos_aa: &[(131, 'K'), (142, 'K'), (158, 'N'), (159, 'Y'), (261, 'Q')] },
  CladeDesc {
    clade: "2A3",
    pos_aa: &[(121, 'K'), (135, 'K'), (144, 'K'), (150, 'K'), (158, 'N'), (159, 'Y'), (261, 'Q')],
  },
  CladeDesc {
    clade: "2A4",
    pos_aa: &[(31, 'S'), (53, 'N'), (142, 'G'), (144, 'R'), (158, 'N'), (159, 'Y'), (171, 'K'), (192, 'T'), (197, 'H')],
  },
  CladeDesc { clade: "GLY", pos_aa: &[(160, 'S')] },
  CladeDesc { clade: "GLY", pos_aa: &[(160, 'T')] },
  CladeDesc { clade: "159S", pos_aa: &[(159, 'S')] },
  CladeDesc { clade: "159F", pos_aa: &[(159, 'F')] },
  CladeDesc { clade: "159Y", pos_aa: &[(159, 'Y')] },
];

fn clades_h3n2(amino_acids: &str, shift: i32) -> Vec<String> {
  CLADES_H3N2
    .iter()
    .filter(|desc| {
      desc
        .pos_aa
        .iter()
        .all(|&(pos, aa)| aa_at(amino_acids, shift, pos) == Some(aa))
    })
    .map(|desc| desc.clade.to_owned())
    .collect()
}
