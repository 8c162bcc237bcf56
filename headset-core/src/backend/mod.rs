pub mod in_memory_session;
pub mod offline;
