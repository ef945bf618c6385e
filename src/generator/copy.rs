//! The generator for copy targets.
//!
//! A copy target names its sources and exactly one output pattern. With a
//! single source the pattern may be literal; with several it must expand
//! per source so the copies land on distinct paths.

use super::{GenerateError, TargetGenerator};

pub(super) fn fill(generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    generator.fill_sources()?;
    if generator.target.sources.is_empty() {
        return Err(GenerateError::MissingField {
            field: "sources",
            target_type: "copy",
            origin: generator.decl_origin,
        });
    }

    generator.fill_outputs(true)?;
    let outputs = &generator.target.outputs;
    if outputs.len() != 1 {
        return Err(GenerateError::OutputCountMismatch {
            expected: 1,
            found: outputs.len(),
            origin: generator.decl_origin,
        });
    }

    let pattern = &outputs.patterns()[0];
    let per_source = pattern.required_types().iter().any(|t| t.is_per_source());
    if generator.target.sources.len() > 1 && !per_source {
        return Err(GenerateError::CopyNeedsPerSourceOutput {
            origin: pattern.origin(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::core::context::BuildContext;
    use crate::core::label::Label;
    use crate::core::settings::BuildSettings;
    use crate::core::source_file::SourceDir;
    use crate::core::value::{Origin, Scope, Value};
    use crate::generator::{generate_target, Declaration, GenerateError};

    fn context() -> BuildContext {
        let tc = Label::new("//tc/", "gcc", "//tc/", "gcc");
        BuildContext::new(BuildSettings::new("/p", "//out/Default/", tc))
    }

    fn scope() -> Scope {
        Scope::new(SourceDir::new("//app/"), Label::new("//tc/", "gcc", "//tc/", "gcc"))
    }

    fn decl(name: &str) -> Declaration {
        Declaration {
            target_type: "copy".to_string(),
            args: vec![Value::string(name, Origin::synthetic())],
            origin: Origin::synthetic(),
        }
    }

    fn string_list(items: &[&str]) -> Value {
        Value::list(
            items
                .iter()
                .map(|s| Value::string(*s, Origin::synthetic()))
                .collect(),
            Origin::synthetic(),
        )
    }

    #[test]
    fn test_single_source_literal_output() {
        let ctx = context();
        let mut scope = scope();
        scope.set("sources", string_list(&["config.json"]));
        scope.set("outputs", string_list(&["//out/Default/config.json"]));

        assert!(generate_target(&ctx, &mut scope, &decl("cfg")).is_ok());
    }

    #[test]
    fn test_requires_sources() {
        let ctx = context();
        let mut scope = scope();
        scope.set("outputs", string_list(&["//out/Default/x"]));

        let err = generate_target(&ctx, &mut scope, &decl("cfg")).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::MissingField { field: "sources", .. }
        ));
    }

    #[test]
    fn test_requires_exactly_one_output() {
        let ctx = context();
        let mut scope = scope();
        scope.set("sources", string_list(&["a.txt"]));
        scope.set(
            "outputs",
            string_list(&["//out/Default/a.txt", "//out/Default/b.txt"]),
        );

        let err = generate_target(&ctx, &mut scope, &decl("cfg")).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::OutputCountMismatch { expected: 1, found: 2, .. }
        ));
    }

    #[test]
    fn test_multiple_sources_need_per_source_pattern() {
        let ctx = context();
        let mut scope = scope();
        scope.set("sources", string_list(&["a.txt", "b.txt"]));
        scope.set("outputs", string_list(&["//out/Default/data.txt"]));

        let err = generate_target(&ctx, &mut scope, &decl("data")).unwrap_err();
        assert!(matches!(err, GenerateError::CopyNeedsPerSourceOutput { .. }));
    }

    #[test]
    fn test_multiple_sources_with_per_source_pattern() {
        let ctx = context();
        let mut scope = scope();
        scope.set("sources", string_list(&["a.txt", "b.txt"]));
        scope.set(
            "outputs",
            string_list(&["{{target_out_dir}}/{{source_file_part}}"]),
        );

        assert!(generate_target(&ctx, &mut scope, &decl("data")).is_ok());
    }
}
