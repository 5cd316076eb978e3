pub mod model;
pub mod modrinth;

pub use model::{Loader, Project, VersionDescriptor, VersionFile, VersionType};
pub use modrinth::{ModrinthRegistry, Registry, DEFAULT_BASE_URL};
