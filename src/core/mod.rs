// ─── Modpack installer core ───
// Manifest-driven install and reconciliation of Modrinth modpacks.
//
// Architecture:
//   core/
//     registry/   Loader/version model + Modrinth API client
//     resolver    Version id / number / latest / direct URL resolution
//     downloader/ Transport seam + hash verification
//     fetcher     Modpack archive download
//     pack/       modrinth.index.json model + archive/override extraction
//     installer   Concurrent, verified file installs
//     manifest/   Persisted install record + stale file reconciliation
//     pipeline    End-to-end install run

pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod installer;
pub mod manifest;
pub mod pack;
pub mod paths;
pub mod pipeline;
pub mod registry;
pub mod resolver;
