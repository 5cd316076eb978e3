#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mrpack_installer::core::downloader::integrity::digest_hex;
use mrpack_installer::core::downloader::{Fetched, Transport};
use mrpack_installer::core::pack::{ModpackFile, ModpackIndex, INDEX_FILE_NAME};
use mrpack_installer::core::registry::{
    Loader, Project, Registry, VersionDescriptor, VersionFile, VersionType,
};
use mrpack_installer::{InstallError, InstallResult};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const PROJECT_SLUG: &str = "test_project1";
pub const PROJECT_ID: &str = "efgh5678";
pub const CDN: &str = "https://cdn.example";

/// In-memory registry holding one project.
pub struct FakeRegistry {
    pub versions: Mutex<Vec<VersionDescriptor>>,
    pub calls: AtomicUsize,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            versions: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn publish(&self, version: VersionDescriptor) {
        self.versions.lock().unwrap().push(version);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn project(&self, id_or_slug: &str) -> InstallResult<Option<Project>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((id_or_slug == PROJECT_SLUG || id_or_slug == PROJECT_ID).then(|| Project {
            id: PROJECT_ID.into(),
            slug: PROJECT_SLUG.into(),
            title: None,
        }))
    }

    async fn project_versions(
        &self,
        _project_id: &str,
        loader: Loader,
    ) -> InstallResult<Vec<VersionDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .versions
            .lock()
            .unwrap()
            .iter()
            .filter(|v| loader.accepts(&v.loaders))
            .cloned()
            .collect())
    }

    async fn version(&self, version_id: &str) -> InstallResult<Option<VersionDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .versions
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.id == version_id)
            .cloned())
    }
}

/// Serves registered bodies; everything else is a 404.
pub struct FakeTransport {
    bodies: Mutex<HashMap<String, Fetched>>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            bodies: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn serve(&self, url: &str, bytes: Vec<u8>, content_type: Option<&str>) {
        self.bodies.lock().unwrap().insert(
            url.to_string(),
            Fetched {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
    }

    pub fn unserve(&self, url: &str) {
        self.bodies.lock().unwrap().remove(url);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str) -> InstallResult<Fetched> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| InstallError::DownloadFailed {
                url: url.to_string(),
                reason: "HTTP 404".into(),
            })
    }
}

pub fn basic_index() -> ModpackIndex {
    ModpackIndex {
        format_version: 1,
        game: "minecraft".into(),
        version_id: "1.0.0".into(),
        name: "Test Pack".into(),
        files: Vec::new(),
        dependencies: BTreeMap::from([
            ("minecraft".to_string(), "1.20.1".to_string()),
            ("forge".to_string(), "47.2.0".to_string()),
        ]),
    }
}

/// A file hosted on the fake CDN, registered with the transport.
pub fn hosted_file(transport: &FakeTransport, path: &str, body: &str) -> ModpackFile {
    let url = format!("{CDN}/files/{path}");
    transport.serve(&url, body.as_bytes().to_vec(), None);
    ModpackFile {
        path: path.into(),
        hashes: BTreeMap::from([
            ("sha1".to_string(), digest_hex("sha1", body.as_bytes()).unwrap()),
            (
                "sha512".to_string(),
                digest_hex("sha512", body.as_bytes()).unwrap(),
            ),
        ]),
        env: None,
        downloads: vec![url],
        file_size: Some(body.len() as u64),
    }
}

pub fn build_mrpack(index: &ModpackIndex, extra: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(INDEX_FILE_NAME, SimpleFileOptions::default())
        .unwrap();
    writer
        .write_all(serde_json::to_string(index).unwrap().as_bytes())
        .unwrap();
    for (name, body) in extra {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Publish `index` as version `id` and host its archive.
pub fn publish_version(
    registry: &FakeRegistry,
    transport: &FakeTransport,
    id: &str,
    number: &str,
    loaders: &[Loader],
    day: u32,
    archive: Vec<u8>,
) {
    let url = format!("{CDN}/versions/{id}/pack.mrpack");
    let hashes = BTreeMap::from([("sha512".to_string(), digest_hex("sha512", &archive).unwrap())]);
    transport.serve(&url, archive, Some("application/x-modrinth-modpack+zip"));
    registry.publish(VersionDescriptor {
        id: id.into(),
        project_id: PROJECT_ID.into(),
        version_number: number.into(),
        version_type: VersionType::Release,
        loaders: loaders.iter().copied().collect::<BTreeSet<_>>(),
        date_published: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        files: vec![VersionFile {
            url,
            filename: "pack.mrpack".into(),
            primary: true,
            hashes,
        }],
    });
}

/// Every regular file under `root` (relative path → contents).
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/");
                out.insert(rel, std::fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}
