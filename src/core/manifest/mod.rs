pub mod reconcile;
pub mod store;

pub use reconcile::{ReconcileReport, Reconciler};
pub use store::{InstallManifest, ManifestStore, MANIFEST_ID};
