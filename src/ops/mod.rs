pub mod check;
pub mod ingest;
pub mod tree_ops;
