//! Target generation: the two-phase evaluation protocol and dispatch.
//!
//! A declaration is evaluated in up to two passes. The first pass fills the
//! order-sensitive prerequisite fields (dependent configs, dependencies,
//! ordinary configs for binaries, metadata, visibility). If the scope still
//! holds opaque values after that, the target captures a snapshot of the
//! scope and defers; the external scheduler resumes it once the referenced
//! context has loaded. A completed pass fills the remaining fields, runs
//! the output-type-specific generator, and inserts the resolved target into
//! the graph. Errors abort the whole run and leave nothing in the graph.

pub mod errors;
pub mod extract;

mod action;
mod binary;
mod bundle;
mod copy;
mod group;
mod write_data;

use std::sync::Arc;

use tracing::debug;

use crate::core::context::BuildContext;
use crate::core::label::{Label, Visibility};
use crate::core::source_file::SourceFile;
use crate::core::substitution::{PatternRange, SubstitutionPattern};
use crate::core::target::{OutputFile, OutputType, ResolutionState, Target};
use crate::core::value::{OpaqueValue, Origin, Scope, Value};

pub use errors::GenerateError;

/// One parsed target-defining call, as handed over by the parser.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// The output-type keyword, e.g. `static_library`.
    pub target_type: String,
    /// The call arguments; exactly one string (the target name) is valid.
    pub args: Vec<Value>,
    /// Where the call was written.
    pub origin: Origin,
}

/// The outcome of a generator run. Deferral is a normal suspension, kept
/// distinct from errors.
#[derive(Debug)]
pub enum GenerateOutcome {
    /// The target fully resolved and was inserted into the graph.
    Resolved(Arc<Target>),
    /// The scope held opaque values; the target carries a snapshot and
    /// waits for [`resume_target`].
    Deferred(Box<Target>),
}

/// Evaluate a target-defining declaration (first pass).
pub fn generate_target(
    ctx: &BuildContext,
    scope: &mut Scope,
    decl: &Declaration,
) -> Result<GenerateOutcome, GenerateError> {
    let name = match decl.args.as_slice() {
        [single] => expect_name(single)?,
        _ => return Err(GenerateError::BadDeclaration { origin: decl.origin }),
    };

    let toolchain = scope.toolchain();
    let label = Label::new(
        scope.source_dir().value(),
        name,
        toolchain.dir(),
        toolchain.name(),
    );

    debug!(label = %label.user_visible_name(true), "defining target");

    let output_type = OutputType::from_keyword(&decl.target_type).ok_or_else(|| {
        GenerateError::UnknownTargetType {
            keyword: decl.target_type.clone(),
            origin: decl.origin,
        }
    })?;

    let mut target = Box::new(Target::new(label, output_type));
    target.origin = decl.origin;
    let status = TargetGenerator {
        target: &mut target,
        scope,
        ctx,
        decl_origin: decl.origin,
    }
    .run(true)?;

    finish(ctx, target, status)
}

/// Re-evaluate a deferred target from its captured snapshot.
///
/// `resolve` maps each opaque value to its now-known content, or `None` if
/// it is still unresolvable, in which case the target defers again.
/// Resuming a target that never deferred is an internal bug.
pub fn resume_target<F>(
    ctx: &BuildContext,
    mut target: Box<Target>,
    resolve: F,
) -> Result<GenerateOutcome, GenerateError>
where
    F: Fn(&OpaqueValue) -> Option<Value>,
{
    let snapshot = target
        .definition_snapshot
        .clone()
        .unwrap_or_else(|| panic!("resume_target on {} without a snapshot", target.label()));

    let mut scope = snapshot.into_scope(resolve);
    let decl_origin = target.origin();

    let status = TargetGenerator {
        target: &mut target,
        scope: &mut scope,
        ctx,
        decl_origin,
    }
    .run(false)?;

    if matches!(status, RunStatus::Complete) {
        // Resolution succeeded; the snapshot has served its purpose.
        target.definition_snapshot = None;
    }
    finish(ctx, target, status)
}

fn finish(
    ctx: &BuildContext,
    mut target: Box<Target>,
    status: RunStatus,
) -> Result<GenerateOutcome, GenerateError> {
    match status {
        RunStatus::Deferred => Ok(GenerateOutcome::Deferred(target)),
        RunStatus::Complete => {
            target.set_state(ResolutionState::Resolved);
            Ok(GenerateOutcome::Resolved(ctx.graph().insert(*target)))
        }
    }
}

fn expect_name(value: &Value) -> Result<&str, GenerateError> {
    value
        .as_string()
        .ok_or(GenerateError::BadDeclaration { origin: value.origin })
}

/// How a run ended (errors travel separately).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Complete,
    Deferred,
}

/// Fills one target from one evaluation scope. Lives for a single pass.
struct TargetGenerator<'a> {
    target: &'a mut Target,
    scope: &'a mut Scope,
    ctx: &'a BuildContext,
    decl_origin: Origin,
}

impl<'a> TargetGenerator<'a> {
    fn run(mut self, first_pass: bool) -> Result<RunStatus, GenerateError> {
        // Dependencies, configs, visibility, and metadata must be listed
        // explicitly (never opaque): they are needed at evaluation time to
        // trigger the resolution chain.
        if first_pass {
            self.fill_dependent_configs()?;
            self.fill_dependencies()?;
            if self.target.is_binary() {
                self.fill_configs()?;
            }
            self.fill_metadata()?;
            self.fill_visibility()?;
        }

        if self.scope.contains_opaque() {
            if first_pass {
                self.target.definition_snapshot = Some(self.scope.snapshot());
                // The remaining bindings will be re-read from the snapshot,
                // so they count as consumed now.
                self.scope.mark_all_used();
            }
            self.target.set_state(ResolutionState::Deferred);
            return Ok(RunStatus::Deferred);
        }

        self.fill_data()?;
        self.fill_testonly()?;
        self.fill_assert_no_deps()?;
        self.fill_write_runtime_deps()?;

        self.do_type_specific()?;

        self.target.set_state(ResolutionState::Filled);
        Ok(RunStatus::Complete)
    }

    fn do_type_specific(&mut self) -> Result<(), GenerateError> {
        match self.target.output_type() {
            OutputType::BundleData => bundle::fill_bundle_data(self),
            OutputType::CreateBundle => bundle::fill_create_bundle(self),
            OutputType::Copy => copy::fill(self),
            OutputType::Action | OutputType::ActionForEach => action::fill(self),
            OutputType::Group => group::fill(self),
            OutputType::Executable
            | OutputType::LoadableModule
            | OutputType::SharedLibrary
            | OutputType::SourceSet
            | OutputType::StaticLibrary => binary::fill(self),
            OutputType::WriteData => write_data::fill(self),
        }
    }

    // Common fillers, shared by the type-specific generators.

    fn fill_sources(&mut self) -> Result<(), GenerateError> {
        let Some(value) = self.scope.get("sources", true).cloned() else {
            return Ok(());
        };
        self.target.sources =
            extract::extract_relative_files(&value, "sources", self.scope.source_dir())?;
        Ok(())
    }

    fn fill_public(&mut self) -> Result<(), GenerateError> {
        let Some(value) = self.scope.get("public", true).cloned() else {
            return Ok(());
        };
        // An explicit public list turns off headers-are-public-by-default.
        self.target.all_headers_public = false;
        self.target.public_headers =
            extract::extract_relative_files(&value, "public", self.scope.source_dir())?;
        Ok(())
    }

    fn fill_configs(&mut self) -> Result<(), GenerateError> {
        self.fill_generic_configs("configs", |t| &mut t.configs)
    }

    fn fill_dependent_configs(&mut self) -> Result<(), GenerateError> {
        self.fill_generic_configs("all_dependent_configs", |t| &mut t.all_dependent_configs)?;
        self.fill_generic_configs("public_configs", |t| &mut t.public_configs)
    }

    fn fill_generic_configs(
        &mut self,
        var: &str,
        dest: impl FnOnce(&mut Target) -> &mut Vec<Label>,
    ) -> Result<(), GenerateError> {
        let Some(value) = self.scope.get(var, true).cloned() else {
            return Ok(());
        };
        let default_toolchain = self.ctx.settings().default_toolchain();
        *dest(self.target) = extract::extract_unique_labels(
            &value,
            var,
            self.scope.source_dir(),
            default_toolchain,
        )?;
        Ok(())
    }

    fn fill_dependencies(&mut self) -> Result<(), GenerateError> {
        self.fill_generic_deps("deps", |t| &mut t.private_deps)?;
        self.fill_generic_deps("public_deps", |t| &mut t.public_deps)?;
        self.fill_generic_deps("data_deps", |t| &mut t.data_deps)?;

        // "data_deps" was previously named "datadeps". Read the old name
        // only when the new one is absent; presence of "data_deps" wins
        // outright, it is never merged.
        if self.scope.peek("data_deps").is_none() {
            self.fill_generic_deps("datadeps", |t| &mut t.data_deps)?;
        }
        Ok(())
    }

    fn fill_generic_deps(
        &mut self,
        var: &str,
        dest: impl FnOnce(&mut Target) -> &mut Vec<Label>,
    ) -> Result<(), GenerateError> {
        let Some(value) = self.scope.get(var, true).cloned() else {
            return Ok(());
        };
        let default_toolchain = self.ctx.settings().default_toolchain();
        *dest(self.target) =
            extract::extract_labels(&value, var, self.scope.source_dir(), default_toolchain)?;
        Ok(())
    }

    fn fill_metadata(&mut self) -> Result<(), GenerateError> {
        let Some(value) = self.scope.get("metadata", true).cloned() else {
            return Ok(());
        };
        let Some(contents) = value.as_scope() else {
            return Err(GenerateError::TypeMismatch {
                field: "metadata".to_string(),
                expected: "scope",
                found: value.type_name(),
                origin: value.origin,
            });
        };

        // Metadata entries must hold lists so a later graph walk can
        // concatenate them; deeper type verification happens at walk time.
        for (key, entry) in contents {
            if entry.as_list().is_none() {
                return Err(GenerateError::MetadataNotList {
                    key: key.to_string(),
                    origin: entry.origin,
                });
            }
        }

        self.target.metadata.fill(
            contents.clone(),
            self.scope.source_dir().clone(),
            value.origin,
        );
        Ok(())
    }

    fn fill_visibility(&mut self) -> Result<(), GenerateError> {
        let Some(value) = self.scope.get("visibility", true).cloned() else {
            return Ok(());
        };
        let patterns =
            extract::extract_label_patterns(&value, "visibility", self.scope.source_dir())?;
        self.target.visibility = Visibility::restricted(patterns);
        Ok(())
    }

    fn fill_data(&mut self) -> Result<(), GenerateError> {
        let Some(value) = self.scope.get("data", true).cloned() else {
            return Ok(());
        };
        let items = extract::expect_string_list(&value, "data")?;
        let dir = self.scope.source_dir();
        self.target.data = items
            .iter()
            .map(|item| dir.resolve_entry(item.as_string().expect("checked above")))
            .collect();
        Ok(())
    }

    fn fill_testonly(&mut self) -> Result<(), GenerateError> {
        if let Some(value) = self.scope.get("testonly", true).cloned() {
            self.target.testonly = extract::expect_boolean(&value, "testonly")?;
        }
        Ok(())
    }

    fn fill_assert_no_deps(&mut self) -> Result<(), GenerateError> {
        if let Some(value) = self.scope.get("assert_no_deps", true).cloned() {
            self.target.assert_no_deps = extract::extract_label_patterns(
                &value,
                "assert_no_deps",
                self.scope.source_dir(),
            )?;
        }
        Ok(())
    }

    fn fill_write_runtime_deps(&mut self) -> Result<(), GenerateError> {
        let Some(value) = self.scope.get("write_runtime_deps", true).cloned() else {
            return Ok(());
        };
        let text = extract::expect_string(&value, "write_runtime_deps")?;
        let file = self.scope.source_dir().resolve_file(text);
        self.ensure_string_is_in_output_dir(file.value(), value.origin)?;
        self.target.write_runtime_deps_output =
            Some(OutputFile::new(self.ctx.settings().build_dir(), &file));
        Ok(())
    }

    fn fill_check_includes(&mut self) -> Result<(), GenerateError> {
        if let Some(value) = self.scope.get("check_includes", true).cloned() {
            self.target.check_includes = extract::expect_boolean(&value, "check_includes")?;
        }
        Ok(())
    }

    /// Fill the declared outputs, enforcing output-directory containment.
    ///
    /// When `allow_substitutions` is false the target type takes literal
    /// outputs only, and any placeholder is an error.
    fn fill_outputs(&mut self, allow_substitutions: bool) -> Result<(), GenerateError> {
        let Some(value) = self.scope.get("outputs", true).cloned() else {
            return Ok(());
        };
        let outputs = extract::extract_substitution_list(&value, "outputs")?;

        if !allow_substitutions && !outputs.required_types().is_empty() {
            return Err(GenerateError::SubstitutionsNotAllowed { origin: value.origin });
        }

        for pattern in outputs.patterns() {
            self.ensure_substitution_is_in_output_dir(pattern)?;
        }

        self.target.outputs = outputs;
        Ok(())
    }

    /// The conservative static containment check for one output pattern.
    ///
    /// A literal-led pattern must carry the build-dir prefix verbatim; a
    /// placeholder-led pattern must start with a token from the
    /// always-in-output-dir allowlist. Anything else is rejected even if
    /// its typical expansion would land inside, because this is a static
    /// guarantee, not a runtime one.
    fn ensure_substitution_is_in_output_dir(
        &self,
        pattern: &SubstitutionPattern,
    ) -> Result<(), GenerateError> {
        let Some(first) = pattern.ranges().first() else {
            return Err(GenerateError::EmptyPattern {
                origin: pattern.origin(),
            });
        };

        match first {
            PatternRange::Literal(literal) => {
                self.ensure_string_is_in_output_dir(literal, pattern.origin())
            }
            PatternRange::Placeholder(token) => {
                if token.expands_in_output_dir() {
                    Ok(())
                } else {
                    Err(GenerateError::NotInOutputDir {
                        value: pattern.original().to_string(),
                        build_dir: self.ctx.settings().build_dir().to_string(),
                        origin: pattern.origin(),
                    })
                }
            }
        }
    }

    fn ensure_string_is_in_output_dir(
        &self,
        value: &str,
        origin: Origin,
    ) -> Result<(), GenerateError> {
        if value.starts_with(self.ctx.settings().build_dir()) {
            Ok(())
        } else {
            Err(GenerateError::NotInOutputDir {
                value: value.to_string(),
                build_dir: self.ctx.settings().build_dir().to_string(),
                origin,
            })
        }
    }

    /// Resolve one declared file reference against the declaring directory.
    fn resolve_file(&self, text: &str) -> SourceFile {
        self.scope.source_dir().resolve_file(text)
    }
}
