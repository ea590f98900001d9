pub mod candidate_index;
pub mod identity;
pub mod record;
