pub mod command;
pub mod layout;
pub mod locker;

// Trait-based pipeline steps (real + mock implementations)
pub mod archive;
pub mod dump;
pub mod retention;

// Re-export commonly used types and traits (used by test crate)
pub use archive::{ArchiveError, ArchiveFile, ArchiveOperations, FsArchiver};
pub use dump::{CommandDumper, DumpArtifact, DumpError, DumpOperations, DumpResult};
pub use layout::{ArchiveEntry, ArchiveLayout};
pub use retention::{FsRetention, RetentionError, RetentionOperations, RetentionReport};
