//! The generator for action and action_foreach targets.
//!
//! Both run a script with templated arguments. A plain action runs once
//! and may not use per-source placeholders anywhere; action_foreach runs
//! once per source and therefore requires a non-empty source list.

use super::{extract, GenerateError, TargetGenerator};
use crate::core::substitution::SubstitutionType;
use crate::core::target::OutputType;
use crate::core::value::Origin;

pub(super) fn fill(generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    let foreach = generator.target.output_type() == OutputType::ActionForEach;
    let keyword = generator.target.output_type().keyword();

    generator.fill_sources()?;
    if foreach && generator.target.sources.is_empty() {
        return Err(GenerateError::MissingField {
            field: "sources",
            target_type: keyword,
            origin: generator.decl_origin,
        });
    }

    fill_script(generator, keyword)?;
    fill_args(generator)?;
    fill_depfile(generator)?;
    fill_action_outputs(generator, keyword)?;

    if !foreach {
        reject_per_source(generator)?;
    }
    Ok(())
}

fn fill_script(
    generator: &mut TargetGenerator,
    keyword: &'static str,
) -> Result<(), GenerateError> {
    let Some(value) = generator.scope.get("script", true).cloned() else {
        return Err(GenerateError::MissingField {
            field: "script",
            target_type: keyword,
            origin: generator.decl_origin,
        });
    };
    let text = extract::expect_string(&value, "script")?;
    generator.target.action_values.script = Some(generator.resolve_file(text));
    Ok(())
}

fn fill_args(generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    if let Some(value) = generator.scope.get("args", true).cloned() {
        generator.target.action_values.args = extract::extract_substitution_list(&value, "args")?;
    }
    Ok(())
}

fn fill_depfile(generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    let Some(value) = generator.scope.get("depfile", true).cloned() else {
        return Ok(());
    };
    let pattern = extract::extract_substitution_pattern(&value, "depfile")?;
    generator.ensure_substitution_is_in_output_dir(&pattern)?;
    generator.target.action_values.depfile = Some(pattern);
    Ok(())
}

fn fill_action_outputs(
    generator: &mut TargetGenerator,
    keyword: &'static str,
) -> Result<(), GenerateError> {
    generator.fill_outputs(true)?;
    if generator.target.outputs.is_empty() {
        return Err(GenerateError::MissingField {
            field: "outputs",
            target_type: keyword,
            origin: generator.decl_origin,
        });
    }
    Ok(())
}

/// A plain action has no per-source context to expand against.
fn reject_per_source(generator: &TargetGenerator) -> Result<(), GenerateError> {
    let values = &generator.target.action_values;
    let check = |types: Vec<SubstitutionType>, origin: Origin| {
        for t in types {
            if t.is_per_source() {
                return Err(GenerateError::PerSourceSubstitution {
                    token: t.keyword(),
                    origin,
                });
            }
        }
        Ok(())
    };

    for pattern in values.args.patterns() {
        check(pattern.required_types(), pattern.origin())?;
    }
    if let Some(depfile) = &values.depfile {
        check(depfile.required_types(), depfile.origin())?;
    }
    for pattern in generator.target.outputs.patterns() {
        check(pattern.required_types(), pattern.origin())?;
    }
    Ok(())
}
