pub mod pgpass;
pub mod retention;
pub mod verify;

// Trait-based abstraction for testability
pub mod dump;

// Re-export commonly used types and traits (used by test crate)
#[allow(unused_imports)]
pub use dump::{DumpProducer, PgDumpall};
