pub mod archive;
pub mod index;

pub use archive::ModpackArchive;
pub use index::{Environment, FileEnv, ModpackFile, ModpackIndex, Requirement, INDEX_FILE_NAME};
