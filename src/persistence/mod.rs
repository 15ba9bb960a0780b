//! Persistence layer — the key-value seam plus the adapters shipped with
//! the crate.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileAdapter;
pub use memory::MemoryAdapter;
pub use traits::PersistenceAdapter;
