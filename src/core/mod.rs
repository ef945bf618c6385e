//! Core data model: source files, labels, declaration values, substitution
//! patterns, tools, toolchains, and targets.

pub mod context;
pub mod label;
pub mod settings;
pub mod source_file;
pub mod substitution;
pub mod target;
pub mod tool;
pub mod toolchain;
pub mod value;
