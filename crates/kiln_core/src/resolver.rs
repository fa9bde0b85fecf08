//! Path resolution for documents and the files they reference.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Turns a path or relative URI into the bytes behind it.
///
/// Used for the primary document and every external buffer or image.
pub trait PathResolver: Send + Sync {
    fn resolve(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Reads from the local file system, optionally relative to a base directory.
#[derive(Clone, Debug, Default)]
pub struct FileResolver {
    base_dir: Option<PathBuf>,
}

impl FileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl PathResolver for FileResolver {
    fn resolve(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.full_path(path))
    }
}

/// Serves files from memory. Counts resolve calls so callers can tell
/// whether a load hit the cache.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    files: RwLock<HashMap<String, Arc<[u8]>>>,
    resolve_count: AtomicUsize,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        if let Ok(mut files) = self.files.write() {
            files.insert(normalize(&path.into()), bytes.into());
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_file(self, path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(path, bytes);
        self
    }

    /// Number of successful and failed resolve calls so far.
    pub fn resolve_count(&self) -> usize {
        self.resolve_count.load(Ordering::SeqCst)
    }
}

impl PathResolver for MemoryResolver {
    fn resolve(&self, path: &str) -> io::Result<Vec<u8>> {
        self.resolve_count.fetch_add(1, Ordering::SeqCst);
        let files = self
            .files
            .read()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "resolver lock poisoned"))?;
        files
            .get(&normalize(path))
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}")))
    }
}

/// Forward slashes, no leading `./`.
fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}

/// Join a URI referenced by a document to the document's directory.
///
/// URIs are percent-decoded first (`my%20file.bin` -> `my file.bin`).
pub fn resolve_relative(document_path: &str, uri: &str) -> String {
    let uri = urlencoding::decode(uri)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| uri.to_string());

    let uri_path = Path::new(&uri);
    if uri_path.is_absolute() {
        return uri;
    }

    match Path::new(document_path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            normalize(&dir.join(uri_path).to_string_lossy())
        }
        _ => uri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve_relative("a.gltf", "a.bin"), "a.bin");
        assert_eq!(resolve_relative("models/a.gltf", "a.bin"), "models/a.bin");
        assert_eq!(
            resolve_relative("models/a.gltf", "tex/my%20image.png"),
            "models/tex/my image.png"
        );
    }

    #[test]
    fn test_memory_resolver_counts_calls() {
        let resolver = MemoryResolver::new().with_file("a.bin", vec![1u8, 2, 3]);
        assert_eq!(resolver.resolve("a.bin").unwrap(), vec![1, 2, 3]);
        assert_eq!(resolver.resolve("./a.bin").unwrap(), vec![1, 2, 3]);
        assert!(resolver.resolve("missing.bin").is_err());
        assert_eq!(resolver.resolve_count(), 3);
    }

    #[test]
    fn test_file_resolver_missing_file() {
        let resolver = FileResolver::with_base_dir("/definitely/not/here");
        let err = resolver.resolve("a.gltf").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
