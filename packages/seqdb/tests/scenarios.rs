use pretty_assertions::assert_eq;
use rstest::rstest;
use seqdb::{Antigen, Seqdb, Shift};

fn init_logging() {
  let _ = env_logger::builder().is_test(true).try_init();
}

fn aa_codon(amino_acid: char) -> &'static str {
  match amino_acid {
    'M' => "ATG",
    'K' => "AAA",
    'T' => "ACA",
    'L' => "CTG",
    'I' => "ATT",
    'A' => "GCT",
    'S' => "TCC",
    'Y' => "TAT",
    'F' => "TTT",
    'C' => "TGT",
    'V' => "GTG",
    'G' => "GGA",
    'Q' => "CAA",
    'P' => "CCC",
    'N' => "AAT",
    'D' => "GAT",
    'H' => "CAC",
    _ => panic!("no codon for {amino_acid}"),
  }
}

fn h3_nucleotides() -> String {
  format!("MKTLIALSYIFCLVLGQKIPGNDNSTATLCLGHHAVPNGTIVKTI{}", "T".repeat(400))
    .chars()
    .map(aa_codon)
    .collect()
}

/// 570 amino acids matching the B HA alignment rule at canonical position
/// 59, with position-unique filler so indel inference has signal.
fn b_amino_acids() -> String {
  let mut amino_acids: String = "ARNDCQEGHILKMFPSTWYV".repeat(30).chars().take(570).collect();
  amino_acids.replace_range(59..70, "CTDLDVALGRP");
  amino_acids
}

#[rstest]
fn h3_translation_and_alignment() {
  init_logging();
  let mut seqdb = Seqdb::new();
  let messages = seqdb.add_sequence(
    "A/TEXAS/1/2019",
    "A(H3N2)",
    "",
    "CDC",
    "2019-02-11",
    "2019700001",
    "MDCK1",
    "",
    &h3_nucleotides(),
    "",
  );
  assert!(messages.is_empty());

  let entry = seqdb.find_by_name("A(H3N2)/TEXAS/1/2019").expect("entry should exist");
  assert_eq!(entry.virus_type(), "A(H3N2)");
  let seq = &entry.seqs()[0];
  assert_eq!(seq.gene(), "HA");
  assert_eq!(seq.amino_acids_shift(), Shift::Aligned(-16));
  assert_eq!(seq.nucleotides_shift(), Shift::Aligned(-48));
  assert!(seq.amino_acids(true, 0, 0).unwrap().starts_with("QKIPGNDNSTATLCLGHHAV"));
}

#[rstest]
fn sub_string_ingest_merges_into_stored_entry() {
  let mut seqdb = Seqdb::new();
  seqdb.add_sequence("A/X/1/2019", "", "", "CDC", "", "", "MDCK1", "", "ABCDEFG", "");
  seqdb.add_sequence("A/X/1/2019", "", "", "CDC", "", "", "MDCK2", "", "BCDE", "");

  assert_eq!(seqdb.number_of_entries(), 1);
  let entry = seqdb.find_by_name("A/X/1/2019").unwrap();
  assert_eq!(entry.number_of_seqs(), 1);
  let seq = &entry.seqs()[0];
  assert_eq!(seq.amino_acids_raw(), "ABCDEFG");
  assert_eq!(seq.passages().iter().collect::<Vec<_>>(), ["MDCK1", "MDCK2"]);
}

#[rstest]
fn super_string_ingest_replaces_stored_sequence() {
  let mut seqdb = Seqdb::new();
  seqdb.add_sequence("A/X/1/2019", "", "", "CDC", "", "", "MDCK1", "", "BCDE", "");
  seqdb.add_sequence("A/X/1/2019", "", "", "CDC", "", "", "MDCK2", "", "ABCDEFG", "");

  let entry = seqdb.find_by_name("A/X/1/2019").unwrap();
  assert_eq!(entry.number_of_seqs(), 1);
  assert_eq!(entry.seqs()[0].amino_acids_raw(), "ABCDEFG");
}

#[rstest]
fn ingest_is_idempotent() {
  let ingest = |seqdb: &mut Seqdb| {
    seqdb.add_sequence(
      "A/TEXAS/1/2019",
      "A(H3N2)",
      "",
      "CDC",
      "2019-02-11",
      "2019700001",
      "MDCK1",
      "",
      &h3_nucleotides(),
      "",
    );
  };
  let mut once = Seqdb::new();
  ingest(&mut once);
  let mut twice = Seqdb::new();
  ingest(&mut twice);
  ingest(&mut twice);

  assert_eq!(once.entries(), twice.entries());
}

#[rstest]
fn entries_stay_sorted_by_name() {
  let mut seqdb = Seqdb::new();
  for name in ["B/PHUKET/3073/2013", "A/DELAWARE/1/2019", "B/BRISBANE/60/2008", "A/CALIFORNIA/7/2009"] {
    seqdb.add_sequence(name, "", "", "CDC", "", "", "", "", "QKIPGNDNSTATLE", "");
  }
  let names: Vec<&str> = seqdb.entries().iter().map(|entry| entry.name()).collect();
  let mut sorted = names.clone();
  sorted.sort_unstable();
  sorted.dedup();
  assert_eq!(names, sorted);
}

#[rstest]
fn hi_name_index_round_trip() {
  let mut seqdb = Seqdb::new();
  seqdb.add_sequence("A/X/1/2019", "", "", "CDC", "", "", "MDCK1", "", "ABCDEFG", "");
  seqdb.add_sequence("A/Y/1/2019", "", "", "CDC", "", "", "E3", "", "HIJKLMN", "");

  seqdb
    .find_by_name_mut("A/Y/1/2019")
    .unwrap()
    .seqs_mut()[0]
    .add_hi_name("A/Y/1/2019 E3");
  seqdb.build_hi_name_index();

  let found = seqdb.find_hi_name("A/Y/1/2019 E3").expect("should be indexed");
  assert_eq!(found.entry().name(), "A/Y/1/2019");
  assert_eq!(found.make_name(" "), "A/Y/1/2019 E3");
  assert!(seqdb.find_hi_name("A/X/1/2019 MDCK1").is_none());

  assert_eq!(seqdb.all_hi_names(), ["A/Y/1/2019 E3"]);
}

#[rstest]
fn match_antigens_tries_full_name_then_fallback() {
  let mut seqdb = Seqdb::new();
  seqdb.add_sequence("A/X/1/2019", "", "", "CDC", "", "", "MDCK1", "", "ABCDEFG", "");
  seqdb
    .find_by_name_mut("A/X/1/2019")
    .unwrap()
    .seqs_mut()[0]
    .add_hi_name("A/X/1/2019 MDCK1");
  seqdb.build_hi_name_index();

  let antigens = vec![
    Antigen {
      full_name: "A/X/1/2019 MDCK1".to_owned(),
      full_name_for_matching: String::new(),
    },
    Antigen {
      full_name: "A/X/1/2019 EGG".to_owned(),
      full_name_for_matching: "A/X/1/2019 MDCK1".to_owned(),
    },
    Antigen {
      full_name: "A/MISSING/1/2019".to_owned(),
      full_name_for_matching: "A/MISSING/1/2019 X".to_owned(),
    },
  ];
  let matched = seqdb.match_antigens(&antigens);
  assert!(matched[0].is_some());
  assert!(matched[1].is_some());
  assert!(matched[2].is_none());
}

#[rstest]
fn iterator_filters_chain_as_conjunction() {
  let mut seqdb = Seqdb::new();
  seqdb.add_sequence(
    "A/TEXAS/1/2019",
    "A(H3N2)",
    "",
    "CDC",
    "2019-02-11",
    "1",
    "MDCK1",
    "",
    &h3_nucleotides(),
    "",
  );
  seqdb.add_sequence("B/BRISBANE/60/2008", "B", "VICTORIA", "NIMR", "2008-08-04", "2", "E3", "", "HIJKLMN", "");

  assert_eq!(seqdb.iter().count(), 2);
  assert_eq!(seqdb.iter().filter_subtype("A(H3N2)").count(), 1);
  assert_eq!(seqdb.iter().filter_subtype("A(H3N2)").filter_aligned(true).count(), 1);
  assert_eq!(seqdb.iter().filter_subtype("B").filter_aligned(true).count(), 0);
  assert_eq!(seqdb.iter().filter_lab("CDC").count(), 1);
  assert_eq!(seqdb.iter().filter_lab_id("CDC", "1").count(), 1);
  assert_eq!(seqdb.iter().filter_lab_id("CDC", "2").count(), 0);
  assert_eq!(seqdb.iter().filter_date_range("2019-01-01", "2020-01-01").count(), 1);
  assert_eq!(seqdb.iter().filter_gene("HA").count(), 2);
  assert_eq!(seqdb.iter().filter_lineage("VICTORIA").count(), 1);
  assert_eq!(seqdb.iter().filter_hi_name(true).count(), 0);
  assert_eq!(
    seqdb.iter().filter_name_regex("brisbane").unwrap().count(),
    1
  );
  assert_eq!(
    seqdb
      .iter()
      .filter_subtype("A(H3N2)")
      .filter_lab("NIMR")
      .count(),
    0
  );
}

#[rstest]
fn cleanup_drops_short_and_untranslated_sequences() {
  let mut seqdb = Seqdb::new();
  seqdb.add_sequence("A/SHORT/1/2019", "", "", "CDC", "", "", "", "", "ABCDEFG", "");
  seqdb.add_sequence(
    "A/TEXAS/1/2019",
    "A(H3N2)",
    "",
    "CDC",
    "",
    "",
    "",
    "",
    &h3_nucleotides(),
    "",
  );
  let messages = seqdb.cleanup(true);
  assert_eq!(seqdb.number_of_entries(), 1);
  assert!(seqdb.find_by_name("A(H3N2)/TEXAS/1/2019").is_some());
  assert!(!messages.is_empty());
}

#[rstest]
fn yamagata_deletion_is_inferred_and_lineage_detected() {
  init_logging();
  let master = b_amino_acids();
  let mut shorter = master.clone();
  shorter.remove(164); // one amino acid lost shortly after position 163

  let mut seqdb = Seqdb::new();
  seqdb.add_sequence("B/MASTER/1/2017", "B", "", "CDC", "", "", "MDCK1", "", &master, "");
  seqdb.add_sequence("B/SHORTER/1/2017", "B", "", "CDC", "", "", "MDCK1", "", &shorter, "");

  for entry in seqdb.entries() {
    assert!(entry.seqs()[0].aligned(), "fixture must align: {}", entry.name());
  }

  seqdb.detect_insertions_deletions();

  let gapped = seqdb.find_by_name("B/SHORTER/1/2017").unwrap().seqs()[0]
    .amino_acids(true, 0, 0)
    .unwrap();
  // The deletion is pinned to position 163 (1-based).
  assert_eq!(&gapped[162..163], "-");
  assert_eq!(gapped.len(), master.len());
  // Gap insertion never shortens, the master is untouched.
  let master_stored = seqdb.find_by_name("B/MASTER/1/2017").unwrap().seqs()[0]
    .amino_acids(true, 0, 0)
    .unwrap();
  assert_eq!(master_stored, master);

  seqdb.detect_b_lineage();
  assert_eq!(seqdb.find_by_name("B/SHORTER/1/2017").unwrap().lineage(), "YAMAGATA");
  assert_eq!(seqdb.find_by_name("B/MASTER/1/2017").unwrap().lineage(), "VICTORIA");
}

#[rstest]
fn report_counts_virus_types() {
  let mut seqdb = Seqdb::new();
  seqdb.add_sequence("A/TEXAS/1/2019", "A(H3N2)", "", "CDC", "", "", "", "", &h3_nucleotides(), "");
  seqdb.add_sequence("B/BRISBANE/60/2008", "B", "VICTORIA", "NIMR", "", "", "", "", "HIJKLMN", "");
  let report = seqdb.report();
  assert!(report.contains("Entries: 2"));
  assert!(report.contains("\"A(H3N2)\": 1"));
  assert!(report.contains("\"B\": 1"));
}
