//! Generator error types and diagnostics.
//!
//! Everything here is a user-facing error: unknown constructs, type
//! mismatches, and containment violations. Internal ordering bugs (a
//! toolchain queried before setup-complete, two items sharing a label) are
//! not represented; those panic at the invariant site. Deferral is not an
//! error either; it is a distinct outcome of the generator run.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::label::LabelError;
use crate::core::source_file::SourceKind;
use crate::core::substitution::SubstitutionError;
use crate::core::value::Origin;
use crate::util::diagnostic::Diagnostic;

/// Error during target generation.
///
/// The dispatch aborts on the first error rather than accumulating: one
/// clear diagnostic per invocation.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum GenerateError {
    #[error("target generator requires one string argument ({origin})")]
    #[diagnostic(code(slipway::generate::bad_declaration))]
    BadDeclaration { origin: Origin },

    #[error("not a known target type: `{keyword}` ({origin})")]
    #[diagnostic(code(slipway::generate::unknown_target_type))]
    UnknownTargetType { keyword: String, origin: Origin },

    #[error("`{field}` must be a {expected}, got a {found} ({origin})")]
    #[diagnostic(code(slipway::generate::type_mismatch))]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
        origin: Origin,
    },

    #[error("{source} ({origin})")]
    #[diagnostic(code(slipway::generate::invalid_label))]
    InvalidLabel {
        source: LabelError,
        origin: Origin,
    },

    #[error("{source} ({origin})")]
    #[diagnostic(code(slipway::generate::invalid_pattern))]
    InvalidPattern {
        source: SubstitutionError,
        origin: Origin,
    },

    #[error("this has an empty value in it ({origin})")]
    #[diagnostic(code(slipway::generate::empty_pattern))]
    EmptyPattern { origin: Origin },

    #[error("file `{value}` is not inside the output directory `{build_dir}` ({origin})")]
    #[diagnostic(
        code(slipway::generate::not_in_output_dir),
        help("generated files normally use \"$target_out_dir/foo\" or \"{{{{source_gen_dir}}}}/foo\"")
    )]
    NotInOutputDir {
        value: String,
        build_dir: String,
        origin: Origin,
    },

    #[error("source expansions are not allowed here ({origin})")]
    #[diagnostic(
        code(slipway::generate::substitutions_not_allowed),
        help("this target type takes literal outputs; write them without {{{{...}}}} expansions")
    )]
    SubstitutionsNotAllowed { origin: Origin },

    #[error("per-source expansion `{{{{{token}}}}}` in a non-foreach action ({origin})")]
    #[diagnostic(
        code(slipway::generate::per_source_in_action),
        help("use action_foreach to run the script once per source")
    )]
    PerSourceSubstitution { token: &'static str, origin: Origin },

    #[error("{target_type} target requires `{field}` ({origin})")]
    #[diagnostic(code(slipway::generate::missing_field))]
    MissingField {
        field: &'static str,
        target_type: &'static str,
        origin: Origin,
    },

    #[error("expected exactly {expected} output(s), got {found} ({origin})")]
    #[diagnostic(code(slipway::generate::output_count))]
    OutputCountMismatch {
        expected: usize,
        found: usize,
        origin: Origin,
    },

    #[error("copying multiple sources needs a per-source output pattern ({origin})")]
    #[diagnostic(
        code(slipway::generate::copy_needs_per_source),
        help("use a {{{{source_file_part}}}} or similar expansion so each copy gets its own output")
    )]
    CopyNeedsPerSourceOutput { origin: Origin },

    #[error("metadata entry `{key}` must be a list ({origin})")]
    #[diagnostic(code(slipway::generate::metadata_not_list))]
    MetadataNotList { key: String, origin: Origin },

    #[error("unknown output conversion `{value}` ({origin})")]
    #[diagnostic(code(slipway::generate::unknown_output_conversion))]
    UnknownOutputConversion { value: String, origin: Origin },

    #[error("no tool in toolchain `{toolchain}` compiles `{file}` ({kind:?}) ({origin})")]
    #[diagnostic(code(slipway::generate::no_tool_for_source))]
    NoToolForSource {
        file: String,
        kind: SourceKind,
        toolchain: String,
        origin: Origin,
    },

    #[error("bundle_data outputs must start with a bundle directory expansion ({origin})")]
    #[diagnostic(
        code(slipway::generate::bad_bundle_output),
        help("start the output with {{{{bundle_root_dir}}}}, {{{{bundle_contents_dir}}}}, or {{{{bundle_resources_dir}}}}")
    )]
    BadBundleOutput { origin: Origin },
}

impl GenerateError {
    /// Where the offending value was written.
    pub fn origin(&self) -> Origin {
        match self {
            GenerateError::BadDeclaration { origin }
            | GenerateError::UnknownTargetType { origin, .. }
            | GenerateError::TypeMismatch { origin, .. }
            | GenerateError::InvalidLabel { origin, .. }
            | GenerateError::InvalidPattern { origin, .. }
            | GenerateError::EmptyPattern { origin }
            | GenerateError::NotInOutputDir { origin, .. }
            | GenerateError::SubstitutionsNotAllowed { origin }
            | GenerateError::PerSourceSubstitution { origin, .. }
            | GenerateError::MissingField { origin, .. }
            | GenerateError::OutputCountMismatch { origin, .. }
            | GenerateError::CopyNeedsPerSourceOutput { origin }
            | GenerateError::MetadataNotList { origin, .. }
            | GenerateError::UnknownOutputConversion { origin, .. }
            | GenerateError::NoToolForSource { origin, .. }
            | GenerateError::BadBundleOutput { origin } => *origin,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string()).with_origin(self.origin());

        match self {
            GenerateError::NotInOutputDir { value, build_dir, .. } => {
                diag = diag
                    .with_context(format!("`{value}` resolves outside `{build_dir}`"))
                    .with_suggestion("use \"$target_out_dir/<file>\"")
                    .with_suggestion("use \"{{source_gen_dir}}/<file>\"");
            }
            GenerateError::UnknownTargetType { keyword, .. } => {
                diag = diag.with_context(format!(
                    "`{keyword}` is not in the set of known target types"
                ));
            }
            GenerateError::PerSourceSubstitution { .. } => {
                diag = diag.with_suggestion("change the target type to action_foreach");
            }
            GenerateError::CopyNeedsPerSourceOutput { .. } => {
                diag = diag.with_suggestion(
                    "add a per-source expansion such as {{source_file_part}} to the output",
                );
            }
            _ => {}
        }

        diag
    }
}
