//! The generators for bundle_data and create_bundle targets.
//!
//! bundle_data declares files destined for a bundle: one per-source output
//! pattern whose expansion is anchored at a bundle directory placeholder,
//! which exempts it from the usual output-dir prefix test. create_bundle
//! declares the bundle's directory layout, which must itself live under
//! the build directory.

use super::{extract, GenerateError, TargetGenerator};
use crate::core::substitution::PatternRange;
use crate::core::target::BundleValues;

pub(super) fn fill_bundle_data(generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    generator.fill_sources()?;
    if generator.target.sources.is_empty() {
        return Err(GenerateError::MissingField {
            field: "sources",
            target_type: "bundle_data",
            origin: generator.decl_origin,
        });
    }

    let Some(value) = generator.scope.get("outputs", true).cloned() else {
        return Err(GenerateError::MissingField {
            field: "outputs",
            target_type: "bundle_data",
            origin: generator.decl_origin,
        });
    };
    let outputs = extract::extract_substitution_list(&value, "outputs")?;
    if outputs.len() != 1 {
        return Err(GenerateError::OutputCountMismatch {
            expected: 1,
            found: outputs.len(),
            origin: value.origin,
        });
    }

    // The bundle anchor replaces the output-dir containment test: the
    // bundle directories are validated once, on the create_bundle target.
    let pattern = &outputs.patterns()[0];
    match pattern.ranges().first() {
        Some(PatternRange::Placeholder(t)) if t.is_bundle_dir() => {}
        _ => {
            return Err(GenerateError::BadBundleOutput {
                origin: pattern.origin(),
            })
        }
    }

    generator.target.outputs = outputs;
    Ok(())
}

pub(super) fn fill_create_bundle(generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    let root_dir = required_dir(generator, "bundle_root_dir")?;
    let contents_dir = optional_dir(generator, "bundle_contents_dir")?.unwrap_or_else(|| root_dir.clone());
    let resources_dir =
        optional_dir(generator, "bundle_resources_dir")?.unwrap_or_else(|| contents_dir.clone());

    let product_type = match generator.scope.get("product_type", true).cloned() {
        Some(value) => extract::expect_string(&value, "product_type")?.to_string(),
        None => String::new(),
    };

    generator.target.bundle_values = Some(BundleValues {
        root_dir,
        contents_dir,
        resources_dir,
        product_type,
    });
    Ok(())
}

fn required_dir(generator: &mut TargetGenerator, field: &'static str) -> Result<String, GenerateError> {
    match optional_dir(generator, field)? {
        Some(dir) => Ok(dir),
        None => Err(GenerateError::MissingField {
            field,
            target_type: "create_bundle",
            origin: generator.decl_origin,
        }),
    }
}

fn optional_dir(
    generator: &mut TargetGenerator,
    field: &'static str,
) -> Result<Option<String>, GenerateError> {
    let Some(value) = generator.scope.get(field, true).cloned() else {
        return Ok(None);
    };
    let text = extract::expect_string(&value, field)?;
    let resolved = generator.scope.source_dir().resolve_entry(text);
    generator.ensure_string_is_in_output_dir(&resolved, value.origin)?;
    Ok(Some(resolved))
}
