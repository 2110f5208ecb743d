//! Module systems, load modes and the capabilities they imply.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// The two systems a module may execute under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleSystem {
    Esm,
    Cjs,
}

impl fmt::Display for ModuleSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSystem::Esm => f.write_str("esm"),
            ModuleSystem::Cjs => f.write_str("cjs"),
        }
    }
}

/// How a module was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Executed directly as the entry point.
    Load,
    /// Dynamic `import()`.
    Import,
    /// Synchronous `require()`.
    Require,
}

impl LoadMode {
    pub const ALL: [LoadMode; 3] = [LoadMode::Load, LoadMode::Import, LoadMode::Require];

    /// The system the module actually executes under.
    ///
    /// `require()` compiles whatever it loads as CommonJS, even a `.mjs`
    /// file or one inside a `"type": "module"` package. The other modes keep
    /// the file's natural system.
    pub fn effective_system(self, natural: ModuleSystem) -> ModuleSystem {
        match self {
            LoadMode::Require => ModuleSystem::Cjs,
            LoadMode::Load | LoadMode::Import => natural,
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::Load => f.write_str("load"),
            LoadMode::Import => f.write_str("import"),
            LoadMode::Require => f.write_str("require"),
        }
    }
}

impl FromStr for LoadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "load" => Ok(LoadMode::Load),
            "import" => Ok(LoadMode::Import),
            "require" => Ok(LoadMode::Require),
            other => Err(format!(
                "unknown load mode '{other}' (expected load, import or require)"
            )),
        }
    }
}

/// Runtime capabilities visible to an executing module.
///
/// Serializes with the short keys the runtime's self-report uses, in this
/// field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutionContext {
    /// `node:`-prefixed built-in imports resolve.
    #[serde(rename = "nodePrefix")]
    pub node_prefix_imports_allowed: bool,
    /// `import()` is callable.
    #[serde(rename = "hasDynamicImport")]
    pub dynamic_import_available: bool,
    /// `__dirname` / `__filename` are defined.
    #[serde(rename = "dirname")]
    pub dirname_available: bool,
    /// Stack frames carry the module's function names.
    #[serde(rename = "nameInError")]
    pub errors_carry_module_name: bool,
    /// Stack traces are mapped back through source maps.
    #[serde(rename = "sourceMap")]
    pub source_maps_applied: bool,
}

impl ExecutionContext {
    /// Capabilities of a module executing under `system`.
    ///
    /// Directory-name introspection is the only capability that differs.
    pub fn for_system(system: ModuleSystem) -> Self {
        Self {
            node_prefix_imports_allowed: true,
            dynamic_import_available: true,
            dirname_available: system == ModuleSystem::Cjs,
            errors_carry_module_name: true,
            source_maps_applied: true,
        }
    }

    /// Compact JSON, e.g. `{"nodePrefix":true,...}`.
    pub fn to_json(&self) -> String {
        // Plain struct of bools; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}
