//! Module resolution and execution contexts.
//!
//! A [`LoadRequest`] names a module the way source code does (a relative or
//! absolute path, or a `file:` URL) together with how it is being loaded.
//! The [`Resolver`] finds the file, decides which module system it runs
//! under and derives the [`ExecutionContext`] it will see.
//!
//! | mode      | `.mjs` | `.cjs` | other, `"type": "module"` | other |
//! |-----------|--------|--------|---------------------------|-------|
//! | `load`    | ESM    | CJS    | ESM                       | CJS   |
//! | `import`  | ESM    | CJS    | ESM                       | CJS   |
//! | `require` | CJS    | CJS    | CJS                       | CJS   |
//!
//! Every capability is available under both systems except `__dirname`,
//! which only CommonJS defines.

mod context;
mod error;
pub mod package;
mod resolve;

pub use context::{ExecutionContext, LoadMode, ModuleSystem};
pub use error::LoadError;
pub use resolve::{LoadOutcome, LoadRequest, PROBE_EXTENSIONS, ResolvedModule, Resolver};
