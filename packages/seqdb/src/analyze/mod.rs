pub mod b_lineage;
pub mod clades;
pub mod indels;
