/// Filesystem transport for CSV tables and per-fold prediction files.
pub mod fs;
