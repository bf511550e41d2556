pub mod hamming;
