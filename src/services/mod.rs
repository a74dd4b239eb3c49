pub mod ai;
pub mod conversation;
