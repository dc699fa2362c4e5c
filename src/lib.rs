pub mod forest;
pub mod grouping;
pub mod merge;
pub mod scan;
pub mod score;
pub mod signal;
pub mod tsv;
