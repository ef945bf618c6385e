//! The generator for group targets.
//!
//! A group is a named collection of dependencies. Everything it carries
//! (deps, configs, visibility, data) is filled by the common passes, so
//! there is nothing type-specific to do.

use super::{GenerateError, TargetGenerator};

pub(super) fn fill(_generator: &mut TargetGenerator) -> Result<(), GenerateError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::core::context::BuildContext;
    use crate::core::label::Label;
    use crate::core::settings::BuildSettings;
    use crate::core::source_file::SourceDir;
    use crate::core::value::{Origin, Scope, Value};
    use crate::generator::{generate_target, Declaration, GenerateOutcome};

    #[test]
    fn test_group_carries_deps_only() {
        let tc = Label::new("//tc/", "gcc", "//tc/", "gcc");
        let ctx = BuildContext::new(BuildSettings::new("/p", "//out/Default/", tc));
        let mut scope = Scope::new(SourceDir::new("//app/"), tc);
        scope.set(
            "deps",
            Value::list(
                vec![
                    Value::string("//lib:net", Origin::synthetic()),
                    Value::string(":helper", Origin::synthetic()),
                ],
                Origin::synthetic(),
            ),
        );

        let decl = Declaration {
            target_type: "group".to_string(),
            args: vec![Value::string("everything", Origin::synthetic())],
            origin: Origin::synthetic(),
        };

        let outcome = generate_target(&ctx, &mut scope, &decl).unwrap();
        let GenerateOutcome::Resolved(target) = outcome else {
            panic!("expected resolution");
        };

        assert_eq!(target.private_deps().len(), 2);
        assert!(target.sources().is_empty());
        assert!(target.outputs().is_empty());
    }
}
