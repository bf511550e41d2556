use std::cmp::Reverse;

use log::{info, warn};

use crate::db::store::Seqdb;

pub(crate) const NORMAL_SEQUENCE_AA_LENGTH_H1: usize = 549;
pub(crate) const NORMAL_SEQUENCE_AA_LENGTH_H3: usize = 550;
pub(crate) const NORMAL_SEQUENCE_AA_LENGTH_B: usize = 570;

/// Raised by [`align_to`] when the candidate cannot be brought close enough
/// to the master; the caller may switch the master. Never escapes this
/// module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SwitchMaster;

#[derive(Debug)]
struct DetectorEntry {
  entry_index: usize,
  seq_index: usize,
  name: String,
  amino_acids: String,
  pos_number: Vec<(usize, usize)>,
}

/// Finds evolutionary deletions within one virus type by reconciling every
/// aligned amino-acid string against a master sequence, recording where gaps
/// have to be inserted to restore positional correspondence.
pub struct InsertionsDeletionsDetector {
  virus_type: String,
  entries: Vec<DetectorEntry>,
  master: String,
  master_switching_allowed: bool,
}

impl InsertionsDeletionsDetector {
  pub fn new(seqdb: &Seqdb, virus_type: &str) -> Self {
    let entries = seqdb
      .iter()
      .filter_subtype(virus_type)
      .filter_map(|seq_ref| {
        let (entry_index, seq_index) = seq_ref.indices();
        seq_ref.seq().amino_acids(true, 0, 0).ok().map(|amino_acids| DetectorEntry {
          entry_index,
          seq_index,
          name: seq_ref.make_name(" "),
          amino_acids,
          pos_number: Vec::new(),
        })
      })
      .collect();

    let mut detector = Self {
      virus_type: virus_type.to_owned(),
      entries,
      master: String::new(),
      master_switching_allowed: true,
    };
    detector.choose_master();
    detector
  }

  /// Prefers an entry of the canonical length for the virus type; such a
  /// master is not eligible for switching. Otherwise the first entry serves
  /// as a switchable master.
  fn choose_master(&mut self) {
    if self.entries.is_empty() {
      return;
    }
    let master_number_aa = match self.virus_type.as_str() {
      "A(H1N1)" => NORMAL_SEQUENCE_AA_LENGTH_H1,
      "A(H3N2)" => NORMAL_SEQUENCE_AA_LENGTH_H3,
      "B" => NORMAL_SEQUENCE_AA_LENGTH_B,
      _ => {
        if self.entries.len() > 10 {
          warn!("unknown normal sequence size for {}", self.virus_type);
        }
        0
      }
    };

    let canonical = (master_number_aa > 0)
      .then(|| {
        self
          .entries
          .iter()
          .find(|entry| entry.amino_acids.len() == master_number_aa)
      })
      .flatten();
    let (master_entry, switching_allowed) = match canonical {
      Some(entry) => (entry, false),
      None => (&self.entries[0], true),
    };
    self.master = master_entry.amino_acids.clone();
    self.master_switching_allowed = switching_allowed;
    info!("{}: master: {}\n{}", self.virus_type, master_entry.name, self.master);
  }

  pub fn detect(mut self, seqdb: &mut Seqdb) {
    if self.entries.is_empty() {
      return;
    }
    info!("detecting insertions/deletions in {}", self.virus_type);
    self.align_to_master(seqdb);

    let mut num_with_deletions = 0;
    for entry in &self.entries {
      if !entry.pos_number.is_empty() {
        let seq = &mut seqdb.entries[entry.entry_index].seqs_mut()[entry.seq_index];
        let mut applied = true;
        for &(pos, num_deletions) in &entry.pos_number {
          if seq.add_deletions(pos, num_deletions).is_err() {
            applied = false;
            break;
          }
        }
        if applied {
          num_with_deletions += 1;
        }
      }
    }
    if num_with_deletions > 0 {
      info!(
        "{}: {num_with_deletions} sequences with deletions detected, total sequences: {}",
        self.virus_type,
        self.entries.len()
      );
    }
  }

  fn align_to_master(&mut self, seqdb: &Seqdb) {
    let virus_type = self.virus_type.clone();
    let mut restart = true;
    while restart {
      restart = false;
      for index in 0..self.entries.len() {
        let master = self.master.clone();
        let entry = &mut self.entries[index];
        match align_to(&master, &mut entry.amino_acids, &virus_type) {
          Ok(pos_number) => entry.pos_number = pos_number,
          Err(SwitchMaster) => {
            entry.pos_number.clear();
            // Do not switch master if the new sequence is too short.
            if self.master_switching_allowed && entry.amino_acids.len() as f64 >= master.len() as f64 * 0.9 {
              // Perhaps the master itself has deletions: the switch is
              // accepted when the master aligns to this sequence.
              let mut master_to_align = master.clone();
              if align_to(&entry.amino_acids, &mut master_to_align, &virus_type).is_ok() {
                self.master = entry.amino_acids.clone();
                info!("{virus_type}: master changed to {}\n{}", entry.name, self.master);
                self.revert(seqdb);
                restart = true;
                break;
              }
            }
          }
        }
      }
    }
  }

  /// Restores every entry to the shift-applied amino acids from the store,
  /// dropping gaps inserted against the abandoned master.
  fn revert(&mut self, seqdb: &Seqdb) {
    for entry in &mut self.entries {
      if let Ok(amino_acids) = seqdb.entries()[entry.entry_index].seqs()[entry.seq_index].amino_acids(true, 0, 0) {
        entry.amino_acids = amino_acids;
      }
      entry.pos_number.clear();
    }
  }
}

/// A matching position: identical, known and not a gap.
fn common(a: u8, b: u8) -> bool {
  a == b && a != b'X' && a != b'-'
}

fn number_of_common_from(a: &[u8], start_a: usize, b: &[u8], start_b: usize) -> usize {
  a[start_a.min(a.len())..]
    .iter()
    .zip(&b[start_b.min(b.len())..])
    .filter(|&(&aa, &bb)| common(aa, bb))
    .count()
}

fn number_of_common(a: &str, b: &str) -> usize {
  number_of_common_from(a.as_bytes(), 0, b.as_bytes(), 0)
}

fn number_of_common_before(a: &[u8], b: &[u8], last: usize) -> usize {
  let last = last.min(a.len()).min(b.len());
  a[..last].iter().zip(&b[..last]).filter(|&(&aa, &bb)| common(aa, bb)).count()
}

/// Next position where the strings disagree, skipping matches and gaps.
fn next_mismatch(to_align: &[u8], master: &[u8], mut pos: usize) -> usize {
  let last_pos = to_align.len().min(master.len());
  while pos < last_pos && (common(to_align[pos], master[pos]) || to_align[pos] == b'-' || master[pos] == b'-') {
    pos += 1;
  }
  pos
}

#[derive(Debug, Clone, Copy)]
struct DeletionPos {
  pos: usize,
  num_deletions: usize,
  num_common: usize,
}

const MAX_NUM_DELETIONS: usize = 5;

fn deletion_candidates(pos_set: &mut Vec<DeletionPos>, master: &[u8], to_align: &[u8], pos: usize, common_before: usize) {
  let last_pos = master.len().min(to_align.len());
  if pos + MAX_NUM_DELETIONS < last_pos {
    for num_deletions in 1..=MAX_NUM_DELETIONS {
      if common(master[pos + num_deletions], to_align[pos]) {
        pos_set.push(DeletionPos {
          pos,
          num_deletions,
          num_common: common_before + number_of_common_from(master, pos + num_deletions, to_align, pos),
        });
      }
    }
  }
}

/// Infers gap insertions bringing `to_align` into positional correspondence
/// with `master`.
///
/// A cursor walks to each disagreeing position and considers inserting 1 to 5
/// gaps there; the candidate maximizing the number of common positions wins
/// (ties broken by the lowest position) and must strictly improve on the
/// current count. On convergence the achieved count must reach 70% of the
/// master length, otherwise `to_align` is restored and the caller is asked to
/// switch the master.
fn align_to(master: &str, to_align: &mut String, virus_type: &str) -> Result<Vec<(usize, usize)>, SwitchMaster> {
  let mut pos_number: Vec<(usize, usize)> = Vec::new();
  let mut start = 0;
  let mut best_common = number_of_common(master, to_align);
  let to_align_orig = to_align.clone();

  while start < to_align.len() {
    let current_common = number_of_common(master, to_align);
    let mut pos_set: Vec<DeletionPos> = Vec::new();
    {
      let master_bytes = master.as_bytes();
      let to_align_bytes = to_align.as_bytes();
      let mut pos = next_mismatch(to_align_bytes, master_bytes, start);
      let last_pos = to_align_bytes.len().min(master_bytes.len());
      while pos < last_pos {
        deletion_candidates(
          &mut pos_set,
          master_bytes,
          to_align_bytes,
          pos,
          number_of_common_before(master_bytes, to_align_bytes, pos),
        );
        pos = next_mismatch(to_align_bytes, master_bytes, pos + 1);
      }
    }
    start = to_align.len();

    if let Some(&candidate) = pos_set
      .iter()
      .min_by_key(|candidate| (Reverse(candidate.num_common), candidate.pos))
    {
      if candidate.num_common > current_common {
        let mut del_pos = candidate;
        if virus_type == "B" && del_pos.num_deletions == 1 && del_pos.pos > 163 - 1 && del_pos.pos <= 166 - 1 {
          // The yamagata deletion must be at 163. David Burke 2017-08-17:
          // deletions (and insertions) of amino acids usually occur in
          // regions of the protein structure where it changes direction
          // (loops); in the case of HA, after VPK and before NKTAT/YKNAT.
          to_align.insert_str(163 - 1, "-");
          del_pos = DeletionPos {
            pos: 163 - 1,
            num_deletions: 1,
            num_common: number_of_common(master, to_align),
          };
        } else if virus_type == "B" && del_pos.num_deletions == 3 && del_pos.pos == 164 - 1 {
          // The triple deletion is 162, 163 and 164 (1-based) by convention.
          to_align.insert_str(162 - 1, "---");
          del_pos = DeletionPos {
            pos: 162 - 1,
            num_deletions: 3,
            num_common: number_of_common(master, to_align),
          };
        } else {
          to_align.insert_str(del_pos.pos, &"-".repeat(del_pos.num_deletions));
        }
        start = del_pos.pos + del_pos.num_deletions + 1;
        pos_number.push((del_pos.pos, del_pos.num_deletions));
        best_common = best_common.max(del_pos.num_common);
      }
    }
  }

  if best_common < (master.len() as f64 * 0.7) as usize {
    *to_align = to_align_orig;
    return Err(SwitchMaster);
  }
  Ok(pos_number)
}
