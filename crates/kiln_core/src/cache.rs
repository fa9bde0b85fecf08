//! Reference-counted cache of decoded documents.
//!
//! An [`AssetManager`] maps source paths to [`DecodedAssetBundle`]s. The
//! first [`acquire`](AssetManager::acquire) of a path decodes the document;
//! later ones share the same bundle and bump its count. When
//! [`release`](AssetManager::release) drops the count to zero the entry is
//! removed from the map and then disposed, exactly once.
//!
//! The manager is an ordinary value. Create one per application (or per
//! test) and pass it where loads happen.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::animation::AnimationClip;
use crate::config::LoaderConfig;
use crate::error::LoadResult;
use crate::gltf::{GltfLoader, LoadedScene};
use crate::material::Material;
use crate::mesh::MergedMesh;
use crate::resolver::PathResolver;
use crate::scene::SceneGraph;
use crate::texture::Texture;

/// Called once per bundle when it is disposed, so hosts can free GPU copies.
///
/// Only bundles published to the cache are disposed. When two threads miss
/// on the same path at once, the losing decode is dropped without reaching
/// the hook; hosts should not create GPU copies before `acquire` returns.
pub type DisposeHook = Box<dyn Fn(&DecodedAssetBundle) + Send + Sync>;

/// Everything decoded from one source path.
#[derive(Debug)]
pub struct DecodedAssetBundle {
    pub path: String,

    /// Template hierarchy; instances clone it
    pub scene: SceneGraph,

    pub meshes: Vec<Arc<MergedMesh>>,
    pub materials: Vec<Arc<Material>>,
    pub textures: Vec<Arc<Texture>>,
    pub animations: Vec<Arc<AnimationClip>>,

    disposed: AtomicBool,
}

impl DecodedAssetBundle {
    pub fn new(path: impl Into<String>, loaded: LoadedScene) -> Self {
        let LoadedScene { scene, assets } = loaded;
        Self {
            path: path.into(),
            scene,
            meshes: assets.meshes,
            materials: assets.materials,
            textures: assets.textures,
            animations: assets.animations,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Run disposal. Returns `false` if it already ran.
    fn dispose(&self, hook: Option<&DisposeHook>) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(hook) = hook {
            hook(self);
        }
        log::debug!(
            "Disposed {}: {} meshes, {} materials, {} textures, {} clips",
            self.path,
            self.meshes.len(),
            self.materials.len(),
            self.textures.len(),
            self.animations.len()
        );
        true
    }

    /// Approximate texture memory held by the bundle.
    pub fn texture_bytes(&self) -> usize {
        self.textures.iter().map(|t| t.data.size_bytes()).sum()
    }
}

/// A value plus the number of consumers holding it.
#[derive(Debug)]
pub struct ReferenceCounter<T> {
    value: T,
    count: usize,
}

impl<T> ReferenceCounter<T> {
    /// Starts with one reference.
    pub fn new(value: T) -> Self {
        Self { value, count: 1 }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn increment(&mut self) -> usize {
        self.count += 1;
        self.count
    }

    /// Never goes below zero.
    pub fn decrement(&mut self) -> usize {
        self.count = self.count.saturating_sub(1);
        self.count
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Path-keyed, reference-counted bundle cache.
pub struct AssetManager {
    config: LoaderConfig,
    resolver: Arc<dyn PathResolver>,
    entries: Mutex<HashMap<String, ReferenceCounter<Arc<DecodedAssetBundle>>>>,
    dispose_hook: Option<DisposeHook>,
}

impl AssetManager {
    pub fn new(config: LoaderConfig, resolver: Arc<dyn PathResolver>) -> Self {
        Self {
            config,
            resolver,
            entries: Mutex::new(HashMap::new()),
            dispose_hook: None,
        }
    }

    /// Register a hook run once for every disposed bundle.
    pub fn with_dispose_hook(mut self, hook: impl Fn(&DecodedAssetBundle) + Send + Sync + 'static) -> Self {
        self.dispose_hook = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, ReferenceCounter<Arc<DecodedAssetBundle>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bundle for `path`, decoding it if no one holds it yet.
    ///
    /// Every successful call must be paired with one [`release`](Self::release).
    /// Decoding runs without the lock held; if another thread publishes the
    /// same path first, its bundle wins and ours is dropped. A failed decode
    /// leaves no entry.
    pub fn acquire(&self, path: &str) -> LoadResult<Arc<DecodedAssetBundle>> {
        if let Some(entry) = self.entries().get_mut(path) {
            let count = entry.increment();
            log::debug!("Reusing {} (refs: {})", path, count);
            return Ok(Arc::clone(entry.value()));
        }

        let loaded = GltfLoader::new(self.resolver.as_ref(), &self.config)
            .load(path)
            .map_err(|err| err.with_path(path))?;
        let bundle = Arc::new(DecodedAssetBundle::new(path, loaded));

        match self.entries().entry(path.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.increment();
                log::debug!("{} was published concurrently, discarding duplicate decode", path);
                Ok(Arc::clone(entry.value()))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ReferenceCounter::new(Arc::clone(&bundle)));
                Ok(bundle)
            }
        }
    }

    /// Drop one reference to `path`. At zero the bundle is evicted and
    /// disposed; returns whether that happened. Unknown paths are ignored.
    pub fn release(&self, path: &str) -> bool {
        let evicted = {
            let mut entries = self.entries();
            let Some(entry) = entries.get_mut(path) else {
                log::debug!("Release of untracked path {}", path);
                return false;
            };
            if entry.decrement() > 0 {
                return false;
            }
            entries.remove(path)
        };

        match evicted {
            Some(entry) => entry.into_inner().dispose(self.dispose_hook.as_ref()),
            None => false,
        }
    }

    /// Acquire `path` and clone its scene into a new instance that releases
    /// the path when dropped.
    pub fn instantiate(self: &Arc<Self>, path: &str) -> LoadResult<SceneInstance> {
        let bundle = self.acquire(path)?;
        Ok(SceneInstance {
            scene: bundle.scene.clone(),
            reference: AssetReference {
                manager: Arc::downgrade(self),
                path: path.to_string(),
            },
        })
    }

    /// Live reference count for `path`, `None` if not cached.
    pub fn reference_count(&self, path: &str) -> Option<usize> {
        self.entries().get(path).map(ReferenceCounter::count)
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.entries().contains_key(path)
    }

    /// Cached paths, sorted.
    pub fn loaded_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.entries().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Evict and dispose every bundle regardless of its count.
    pub fn clear(&self) {
        let drained: Vec<_> = self.entries().drain().collect();
        for (path, entry) in drained {
            if entry.count() > 0 {
                log::warn!("Clearing {} with {} live references", path, entry.count());
            }
            entry.into_inner().dispose(self.dispose_hook.as_ref());
        }
    }
}

impl Drop for AssetManager {
    fn drop(&mut self) {
        self.clear();
    }
}

/// A consumer's hold on a cached path. Holds only a weak handle to the
/// manager and releases the path on drop.
#[derive(Debug)]
pub struct AssetReference {
    manager: Weak<AssetManager>,
    path: String,
}

impl AssetReference {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for AssetReference {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.release(&self.path);
        }
    }
}

/// One live copy of a cached scene.
#[derive(Debug)]
pub struct SceneInstance {
    /// This instance's own hierarchy; meshes, materials and clips are shared
    pub scene: SceneGraph,
    reference: AssetReference,
}

impl SceneInstance {
    pub fn path(&self) -> &str {
        self.reference.path()
    }
}
