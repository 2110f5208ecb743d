//! Specifier resolution.
//!
//! Resolution is a pure function of the specifier, the base directory, the
//! mode and the filesystem layout. Nothing is cached between calls, so
//! independent requests may run concurrently.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::context::{ExecutionContext, LoadMode, ModuleSystem};
use super::error::LoadError;
use super::package;
use crate::watcher::normalize_lexically;

/// Extensions tried, in order, on an extensionless or directory specifier.
///
/// `.mjs` is never probed: an ES module file is only reachable when its
/// extension is spelled out.
pub const PROBE_EXTENSIONS: [&str; 5] = ["ts", "tsx", "cjs", "js", "json"];

/// TypeScript sources tried when a `.js` specifier does not exist.
const JS_SOURCE_EXTENSIONS: [&str; 2] = ["ts", "tsx"];

/// A module path as given by the caller, plus how it is being loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub specifier: String,
    pub mode: LoadMode,
}

impl LoadRequest {
    pub fn new(specifier: impl Into<String>, mode: LoadMode) -> Self {
        Self {
            specifier: specifier.into(),
            mode,
        }
    }
}

/// A file found for a specifier, with its natural module system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub absolute_path: PathBuf,
    pub module_system: ModuleSystem,
}

/// Classified result of a load request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub module: ResolvedModule,
    pub mode: LoadMode,
    /// System the module executes under after mode forcing.
    pub effective_system: ModuleSystem,
    pub context: ExecutionContext,
}

impl LoadOutcome {
    /// The runtime's self-report line: `loaded <path> <capabilities>`.
    ///
    /// The path is shown relative to `relative_to` with `/` separators. A
    /// `relative_to` that cannot be canonicalized (it does not exist, say) is
    /// compared as given, and a module outside it is shown absolute.
    pub fn describe(&self, relative_to: &Path) -> String {
        let root = relative_to
            .canonicalize()
            .unwrap_or_else(|_| relative_to.to_path_buf());
        let shown = match self.module.absolute_path.strip_prefix(&root) {
            Ok(relative) => relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => self.module.absolute_path.display().to_string(),
        };

        format!("loaded {shown} {}", self.context.to_json())
    }
}

/// Resolves specifiers relative to a base directory.
#[derive(Debug, Clone)]
pub struct Resolver {
    base: PathBuf,
}

impl Resolver {
    /// Resolver rooted at `base`, canonicalized when it exists.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let base = base.canonicalize().unwrap_or(base);
        Self { base }
    }

    /// Resolver for specifiers written inside `module`.
    pub fn for_module(module: &ResolvedModule) -> Self {
        let base = module
            .absolute_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Execute `specifier` as an entry point.
    pub fn load(&self, specifier: &str) -> Result<LoadOutcome, LoadError> {
        self.request(&LoadRequest::new(specifier, LoadMode::Load))
    }

    /// Dynamically import `specifier`.
    pub fn import(&self, specifier: &str) -> Result<LoadOutcome, LoadError> {
        self.request(&LoadRequest::new(specifier, LoadMode::Import))
    }

    /// Synchronously require `specifier`.
    pub fn require(&self, specifier: &str) -> Result<LoadOutcome, LoadError> {
        self.request(&LoadRequest::new(specifier, LoadMode::Require))
    }

    /// Resolve a request and derive its execution context.
    pub fn request(&self, request: &LoadRequest) -> Result<LoadOutcome, LoadError> {
        let module = self.resolve(&request.specifier, request.mode)?;
        let effective_system = request.mode.effective_system(module.module_system);

        Ok(LoadOutcome {
            module,
            mode: request.mode,
            effective_system,
            context: ExecutionContext::for_system(effective_system),
        })
    }

    /// Find the file `specifier` refers to and its natural module system.
    pub fn resolve(&self, specifier: &str, mode: LoadMode) -> Result<ResolvedModule, LoadError> {
        let not_found = || LoadError::ModuleNotFound {
            specifier: specifier.to_string(),
            mode,
        };

        let candidate = self.candidate(specifier).ok_or_else(not_found)?;
        let found = resolve_file(&candidate).ok_or_else(not_found)?;
        let absolute_path = found.canonicalize().unwrap_or(found);
        let module_system = natural_system(&absolute_path)?;

        crate::debug_event!(
            "loader",
            "resolved",
            "{specifier} ({mode}) -> {} [{module_system}]",
            absolute_path.display()
        );

        Ok(ResolvedModule {
            absolute_path,
            module_system,
        })
    }

    /// Turn a specifier into a filesystem path, if it is path-like.
    ///
    /// Bare specifiers (package names, `node:` built-ins) are not paths.
    fn candidate(&self, specifier: &str) -> Option<PathBuf> {
        if specifier.starts_with("file:") {
            let path = url::Url::parse(specifier).ok()?.to_file_path().ok()?;
            return Some(normalize_lexically(&path));
        }

        let path = Path::new(specifier);
        if path.is_absolute() {
            return Some(normalize_lexically(path));
        }

        let relative = specifier == "."
            || specifier == ".."
            || specifier.starts_with("./")
            || specifier.starts_with("../");
        relative.then(|| normalize_lexically(&self.base.join(path)))
    }
}

/// Apply the file, probe and directory-index rules to a candidate path.
fn resolve_file(candidate: &Path) -> Option<PathBuf> {
    if let Some(extension) = candidate.extension() {
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }
        if extension == "js" {
            let source = JS_SOURCE_EXTENSIONS
                .iter()
                .map(|ext| candidate.with_extension(ext))
                .find(|path| path.is_file());
            if source.is_some() {
                return source;
            }
        }
    }

    if let Some(found) = probe(candidate) {
        return Some(found);
    }

    if candidate.is_dir() {
        return probe(&candidate.join("index"));
    }

    None
}

/// First existing `stem.<ext>` for the probe extensions.
fn probe(stem: &Path) -> Option<PathBuf> {
    PROBE_EXTENSIONS
        .iter()
        .map(|ext| with_appended_extension(stem, ext))
        .find(|path| path.is_file())
}

/// `a/b.c` + `ts` -> `a/b.c.ts` (unlike `with_extension`, never replaces).
fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Module system a file has on its own, before mode forcing.
fn natural_system(path: &Path) -> Result<ModuleSystem, LoadError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("mjs") => Ok(ModuleSystem::Esm),
        Some("cjs") => Ok(ModuleSystem::Cjs),
        _ => {
            let dir = path.parent().unwrap_or(path);
            package::ambient_module_system(dir)
        }
    }
}
