pub mod catalog;
pub mod shift;
pub mod translate;
pub mod translate_align;

/// Sequences shorter than this are thrown away.
pub const MINIMUM_SEQUENCE_AA_LENGTH: usize = 400;
pub const MINIMUM_SEQUENCE_NUC_LENGTH: usize = MINIMUM_SEQUENCE_AA_LENGTH * 3;
