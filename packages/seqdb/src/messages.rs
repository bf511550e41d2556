use std::fmt;

use log::warn;

/// Warnings accumulated by ingest operations.
///
/// Conflicts discovered while adding sequences (gene, lineage, subtype,
/// ambiguous alignment) are never fatal: they are collected here, returned to
/// the caller and mirrored to the log.
#[derive(Debug, Clone, Default)]
pub struct Messages {
  warnings: Vec<String>,
}

impl Messages {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn warning(&mut self, message: impl Into<String>) {
    let message = message.into();
    warn!("{message}");
    self.warnings.push(message);
  }

  pub fn append(&mut self, other: Messages) {
    self.warnings.extend(other.warnings);
  }

  pub fn is_empty(&self) -> bool {
    self.warnings.is_empty()
  }

  pub fn warnings(&self) -> &[String] {
    &self.warnings
  }
}

impl fmt::Display for Messages {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.warnings.join("\n"))
  }
}
