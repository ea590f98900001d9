pub mod arbiter;
pub mod chat;
pub mod decision;
pub mod prompt;
