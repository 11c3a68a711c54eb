//! Static asset access: templates, fonts and reference documents.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

/// Category of a static asset; decides its sub-directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// PDF backdrop for a rendered document, stored as `pdf/<name>.pdf`.
    Template,
    /// TrueType font program, stored as `fonts/<name>`.
    Font,
    /// Reference document served unmodified, stored as `pdf/<name>.pdf`.
    StaticDocument,
}

/// The two embedded font faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontAsset {
    Regular,
    Bold,
}

impl FontAsset {
    pub fn file_name(&self) -> &'static str {
        match self {
            FontAsset::Regular => "DejaVuSans.ttf",
            FontAsset::Bold => "DejaVuSans-Bold.ttf",
        }
    }

    /// PostScript name written as the PDF `BaseFont`.
    pub fn base_font(&self) -> &'static str {
        match self {
            FontAsset::Regular => "DejaVuSans",
            FontAsset::Bold => "DejaVuSans-Bold",
        }
    }
}

/// Read-only source of asset bytes. Implementations must be safe to share
/// across concurrent renders.
pub trait AssetStore: Send + Sync {
    /// Load an asset by kind and name. `NotFound` means the asset is absent.
    fn load(&self, kind: AssetKind, name: &str) -> io::Result<Arc<[u8]>>;
}

/// Assets laid out on disk under one root directory.
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of an asset.
    pub fn path_for(&self, kind: AssetKind, name: &str) -> PathBuf {
        match kind {
            AssetKind::Template | AssetKind::StaticDocument => {
                self.root.join("pdf").join(format!("{name}.pdf"))
            }
            AssetKind::Font => self.root.join("fonts").join(name),
        }
    }
}

impl AssetStore for DirAssetStore {
    fn load(&self, kind: AssetKind, name: &str) -> io::Result<Arc<[u8]>> {
        // Names come from compiled-in tables, but never let one escape the root.
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(io::Error::new(io::ErrorKind::NotFound, "invalid asset name"));
        }
        let path = self.path_for(kind, name);
        debug!(path = %path.display(), "loading asset");
        std::fs::read(&path).map(Arc::from)
    }
}

/// In-memory assets, for tests and embedded deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: HashMap<(AssetKind, String), Arc<[u8]>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: AssetKind, name: &str, bytes: impl Into<Arc<[u8]>>) {
        self.assets.insert((kind, name.to_string()), bytes.into());
    }

    pub fn with(mut self, kind: AssetKind, name: &str, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(kind, name, bytes);
        self
    }
}

impl AssetStore for MemoryAssetStore {
    fn load(&self, kind: AssetKind, name: &str) -> io::Result<Arc<[u8]>> {
        self.assets
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{name} not in store")))
    }
}

/// Process-wide cache in front of another store.
///
/// Entries are filled lazily on first successful load and never evicted;
/// assets are immutable for the life of the process. Misses are not cached
/// so a later deployment fix is picked up without a restart.
pub struct CachedAssetStore<S> {
    inner: S,
    entries: DashMap<(AssetKind, String), Arc<[u8]>>,
}

impl<S: AssetStore> CachedAssetStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
        }
    }

    /// Number of cached assets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: AssetStore> AssetStore for CachedAssetStore<S> {
    fn load(&self, kind: AssetKind, name: &str) -> io::Result<Arc<[u8]>> {
        let key = (kind, name.to_string());
        if let Some(hit) = self.entries.get(&key) {
            return Ok(Arc::clone(hit.value()));
        }
        let bytes = self.inner.load(kind, name)?;
        self.entries.insert(key, Arc::clone(&bytes));
        Ok(bytes)
    }
}
