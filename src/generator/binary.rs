//! The shared generator for the five binary target kinds: executable,
//! loadable_module, shared_library, source_set, static_library.

use super::{extract, GenerateError, TargetGenerator};
use crate::core::source_file::SourceKind;
use crate::core::value::Value;
use crate::util::InternedString;

pub(super) fn fill(generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    generator.fill_sources()?;
    generator.fill_public()?;
    generator.fill_check_includes()?;
    fill_output_name(generator)?;
    fill_crate_values(generator)?;
    validate_compile_tools(generator)
}

fn fill_output_name(generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    if let Some(value) = generator.scope.get("output_name", true).cloned() {
        let name = extract::expect_string(&value, "output_name")?;
        generator.target.output_name = Some(name.to_string());
    }
    Ok(())
}

/// Crate-level attributes consumed by the dependency-manifest emitter.
fn fill_crate_values(generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    if let Some(value) = generator.scope.get("crate_name", true).cloned() {
        let name = extract::expect_string(&value, "crate_name")?;
        generator.target.rust_values.crate_name = Some(InternedString::new(name));
    }

    if let Some(value) = generator.scope.get("edition", true).cloned() {
        let edition = extract::expect_string(&value, "edition")?;
        generator.target.rust_values.edition = InternedString::new(edition);
    }

    if let Some(value) = generator.scope.get("cfgs", true).cloned() {
        let items = extract::expect_string_list(&value, "cfgs")?;
        generator.target.rust_values.cfgs = items
            .iter()
            .map(|item| item.as_string().expect("checked above").to_string())
            .collect();
    }

    if let Some(value) = generator.scope.get("crate_root", true).cloned() {
        let root = extract::expect_string(&value, "crate_root")?;
        generator.target.rust_values.crate_root =
            Some(generator.scope.source_dir().resolve_file(root));
    } else if generator.target.rust_values.crate_name.is_some() {
        infer_crate_root(generator);
    }

    Ok(())
}

/// When a crate name was declared but no root, take the first compiled
/// source as the root.
fn infer_crate_root(generator: &mut TargetGenerator) {
    let inferred = generator
        .target
        .sources
        .iter()
        .find(|s| s.kind() == SourceKind::Rust)
        .cloned();
    generator.target.rust_values.crate_root = inferred;
}

/// Every compiled source must have a tool in the target's toolchain.
///
/// The check only fires when the toolchain is already registered; a target
/// evaluated ahead of its toolchain definition is checked by the scheduler
/// once the toolchain freezes.
fn validate_compile_tools(generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    let Some(toolchain) = generator.ctx.toolchain(generator.target.toolchain_label()) else {
        return Ok(());
    };

    for source in &generator.target.sources {
        let kind = source.kind();
        if !kind.participates_in_compilation() {
            continue;
        }
        if toolchain.tool_for_source_kind(kind).is_none() {
            return Err(GenerateError::NoToolForSource {
                file: source.value().to_string(),
                kind,
                toolchain: toolchain.label().to_string(),
                origin: source_origin(generator),
            });
        }
    }
    Ok(())
}

fn source_origin(generator: &TargetGenerator) -> crate::core::value::Origin {
    generator
        .scope
        .peek("sources")
        .map(|v: &Value| v.origin)
        .unwrap_or(generator.decl_origin)
}
