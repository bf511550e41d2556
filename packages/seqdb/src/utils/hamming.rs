/// Hamming distance over the common prefix of the two sequences, used to
/// compare sequence variants of the same strain.
pub fn hamming_distance(first: &str, second: &str) -> usize {
  first
    .bytes()
    .zip(second.bytes())
    .filter(|(a, b)| a != b)
    .count()
}
