pub mod aligner;
pub mod engine_model;
pub mod rollback;
