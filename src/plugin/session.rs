//! Process-scoped state shared by renders and the rebuild coordinator.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::config::SiteConfig;
use crate::core::ExecutionMode;
use crate::deps::{DependencyRecorder, DependencyStore};
use crate::hydrate::{Bundler, EsbuildBundler, HydrationBuilder};
use crate::render::{CompileError, CompileOptions, CompiledUnit, ContentCompiler, MdxCompiler};

/// Owns the compile cache, dependency recorder, hydration builder and the
/// running watcher, from startup until [`super::MdxPlugin`]'s exit hook.
pub struct Session {
    compiler: Box<dyn ContentCompiler>,
    /// blake3(directory, body) → compiled unit
    compiled: RwLock<FxHashMap<String, Arc<CompiledUnit>>>,
    recorder: Arc<DependencyRecorder>,
    hydrator: Arc<HydrationBuilder>,
    mode: ExecutionMode,
    pub(super) watch: Mutex<Option<super::WatchHandle>>,
}

impl Session {
    pub fn new(
        compiler: Box<dyn ContentCompiler>,
        recorder: DependencyRecorder,
        hydrator: HydrationBuilder,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            compiler,
            compiled: RwLock::new(FxHashMap::default()),
            recorder: Arc::new(recorder),
            hydrator: Arc::new(hydrator),
            mode,
            watch: Mutex::new(None),
        }
    }

    /// Default compiler, esbuild bundler and stores from `config`.
    pub fn from_config(config: &SiteConfig, mode: ExecutionMode) -> Self {
        let store = DependencyStore::new(config.deps_file(), config.deps_mirror());
        let bundler: Arc<dyn Bundler> = Arc::new(EsbuildBundler::new(config.hydrate.bundler.clone()));
        Self::new(
            Box::new(MdxCompiler::default()),
            DependencyRecorder::new(store),
            HydrationBuilder::new(config.hydrate_settings(), bundler),
            mode,
        )
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn recorder(&self) -> &Arc<DependencyRecorder> {
        &self.recorder
    }

    pub fn hydrator(&self) -> &Arc<HydrationBuilder> {
        &self.hydrator
    }

    /// Compile `body` of the document at `path`, reusing a cached unit.
    pub fn compile(&self, path: &Path, body: &str) -> Result<Arc<CompiledUnit>, CompileError> {
        let base_dir = path.parent().map(Path::to_path_buf);
        let key = cache_key(base_dir.as_deref(), body);

        if let Some(unit) = self.compiled.read().get(&key) {
            return Ok(Arc::clone(unit));
        }

        let options = CompileOptions {
            development: self.mode.is_development(),
            base_dir,
        };
        let unit = Arc::new(self.compiler.compile(body, &options)?);
        self.compiled.write().insert(key, Arc::clone(&unit));
        Ok(unit)
    }

    /// Drop every compiled unit.
    pub fn invalidate_compiled(&self) {
        let mut compiled = self.compiled.write();
        crate::debug!("render"; "dropping {} compiled unit(s)", compiled.len());
        compiled.clear();
    }

    pub fn compiled_len(&self) -> usize {
        self.compiled.read().len()
    }
}

fn cache_key(base_dir: Option<&Path>, body: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    if let Some(dir) = base_dir {
        hasher.update(dir.as_os_str().as_encoded_bytes());
    }
    hasher.update(&[0]);
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize().as_bytes())
}
