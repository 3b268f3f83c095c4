pub mod file;
pub mod memory;
pub mod sqlite;
pub mod traits;


pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::MetricStore;
