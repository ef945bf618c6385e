//! Slipway - target-definition and dependency-resolution engine for a
//! meta-build tool.
//!
//! This crate turns declarative build-file statements ("define a static
//! library named X with these sources, deps, and configs") into a fully
//! resolved graph of typed targets, ready for downstream codegen such as a
//! low-level build-ordering emitter or an external dependency-manifest
//! writer. The build-declaration parser, the emitters themselves, and path
//! normalization are external collaborators; this crate is the in-memory
//! graph builder between them.

pub mod core;
pub mod generator;
pub mod resolver;
pub mod util;

pub use crate::core::{
    context::BuildContext,
    label::Label,
    settings::BuildSettings,
    source_file::{SourceDir, SourceFile},
    target::{OutputType, Target},
    tool::{Tool, ToolType},
    toolchain::Toolchain,
    value::{Origin, Scope, Value},
};

pub use crate::generator::{
    generate_target, resume_target, Declaration, GenerateError, GenerateOutcome,
};
pub use crate::resolver::{generate_all, DepKind, ResolvedGraph};
pub use crate::util::InternedString;
