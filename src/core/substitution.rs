//! Substitution patterns: templates of literal text and placeholder tokens.
//!
//! Tool command lines, declared outputs, and action templates are written
//! with `{{token}}` placeholders that expand later against a concrete
//! source/target context. The token set is closed; an unrecognized token is
//! an unknown-construct error at parse time, not expansion time.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::value::Origin;

/// Error produced while parsing a substitution pattern.
#[derive(Debug, Clone, Error)]
pub enum SubstitutionError {
    #[error("unknown substitution token `{{{{{token}}}}}`")]
    UnknownToken { token: String },

    #[error("unterminated `{{{{` in substitution pattern")]
    Unterminated,
}

/// The closed set of placeholder tokens.
///
/// Values are sequential so they can index the fixed-size tables below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubstitutionType {
    /// The source file, relative to the build directory.
    Source,
    /// The source file name with directory and extension stripped.
    SourceNamePart,
    /// The source file name with the directory stripped.
    SourceFilePart,
    /// The source file's directory.
    SourceDir,
    /// The source file's directory relative to the source root.
    SourceRootRelativeDir,
    /// The generated-file directory corresponding to the source.
    SourceGenDir,
    /// The object-file directory corresponding to the source.
    SourceOutDir,
    /// The target's label.
    Label,
    /// The name part of the target's label.
    LabelName,
    /// The top-level generated-file directory.
    RootGenDir,
    /// The top-level output directory.
    RootOutDir,
    /// The per-target generated-file directory.
    TargetGenDir,
    /// The per-target output directory.
    TargetOutDir,
    /// The target's computed output name.
    TargetOutputName,
    /// The tool's output, usable in link commands.
    Output,
    /// The root directory of a bundle.
    BundleRootDir,
    /// The contents directory of a bundle.
    BundleContentsDir,
    /// The resources directory of a bundle.
    BundleResourcesDir,
}

/// Number of substitution types, for fixed-size tables.
pub const NUM_SUBSTITUTION_TYPES: usize = 18;

/// Placeholder tokens whose expansion is guaranteed by construction to lie
/// under the build output directory. This is the containment-validation
/// allowlist: membership is policy data, so keep it a table.
pub const OUTPUT_DIR_SAFE_TYPES: &[SubstitutionType] = &[
    SubstitutionType::SourceGenDir,
    SubstitutionType::SourceOutDir,
    SubstitutionType::RootGenDir,
    SubstitutionType::RootOutDir,
    SubstitutionType::TargetGenDir,
    SubstitutionType::TargetOutDir,
];

impl SubstitutionType {
    /// Every token, in table order.
    pub const ALL: [SubstitutionType; NUM_SUBSTITUTION_TYPES] = [
        SubstitutionType::Source,
        SubstitutionType::SourceNamePart,
        SubstitutionType::SourceFilePart,
        SubstitutionType::SourceDir,
        SubstitutionType::SourceRootRelativeDir,
        SubstitutionType::SourceGenDir,
        SubstitutionType::SourceOutDir,
        SubstitutionType::Label,
        SubstitutionType::LabelName,
        SubstitutionType::RootGenDir,
        SubstitutionType::RootOutDir,
        SubstitutionType::TargetGenDir,
        SubstitutionType::TargetOutDir,
        SubstitutionType::TargetOutputName,
        SubstitutionType::Output,
        SubstitutionType::BundleRootDir,
        SubstitutionType::BundleContentsDir,
        SubstitutionType::BundleResourcesDir,
    ];

    /// The keyword written between `{{` and `}}`.
    pub fn keyword(&self) -> &'static str {
        match self {
            SubstitutionType::Source => "source",
            SubstitutionType::SourceNamePart => "source_name_part",
            SubstitutionType::SourceFilePart => "source_file_part",
            SubstitutionType::SourceDir => "source_dir",
            SubstitutionType::SourceRootRelativeDir => "source_root_relative_dir",
            SubstitutionType::SourceGenDir => "source_gen_dir",
            SubstitutionType::SourceOutDir => "source_out_dir",
            SubstitutionType::Label => "label",
            SubstitutionType::LabelName => "label_name",
            SubstitutionType::RootGenDir => "root_gen_dir",
            SubstitutionType::RootOutDir => "root_out_dir",
            SubstitutionType::TargetGenDir => "target_gen_dir",
            SubstitutionType::TargetOutDir => "target_out_dir",
            SubstitutionType::TargetOutputName => "target_output_name",
            SubstitutionType::Output => "output",
            SubstitutionType::BundleRootDir => "bundle_root_dir",
            SubstitutionType::BundleContentsDir => "bundle_contents_dir",
            SubstitutionType::BundleResourcesDir => "bundle_resources_dir",
        }
    }

    /// Look a keyword up in the closed token set.
    pub fn parse(keyword: &str) -> Option<SubstitutionType> {
        SubstitutionType::ALL
            .iter()
            .copied()
            .find(|t| t.keyword() == keyword)
    }

    /// Index into fixed-size per-token tables.
    pub fn index(self) -> usize {
        SubstitutionType::ALL
            .iter()
            .position(|t| *t == self)
            .expect("token present in ALL")
    }

    /// Whether this token expands differently for each source file.
    pub fn is_per_source(&self) -> bool {
        matches!(
            self,
            SubstitutionType::Source
                | SubstitutionType::SourceNamePart
                | SubstitutionType::SourceFilePart
                | SubstitutionType::SourceDir
                | SubstitutionType::SourceRootRelativeDir
                | SubstitutionType::SourceGenDir
                | SubstitutionType::SourceOutDir
        )
    }

    /// Whether this token always expands under the build output directory.
    pub fn expands_in_output_dir(&self) -> bool {
        OUTPUT_DIR_SAFE_TYPES.contains(self)
    }

    /// Whether this token names a bundle directory.
    pub fn is_bundle_dir(&self) -> bool {
        matches!(
            self,
            SubstitutionType::BundleRootDir
                | SubstitutionType::BundleContentsDir
                | SubstitutionType::BundleResourcesDir
        )
    }
}

impl fmt::Display for SubstitutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}}}}}", self.keyword())
    }
}

/// One parsed range of a pattern: literal text or a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternRange {
    Literal(String),
    Placeholder(SubstitutionType),
}

/// A parsed template of literal text interleaved with placeholders.
///
/// A pattern with no ranges is invalid; consumers reject it during output
/// validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionPattern {
    ranges: Vec<PatternRange>,
    original: String,
    origin: Origin,
}

impl SubstitutionPattern {
    /// Parse a template string.
    pub fn parse(input: &str, origin: Origin) -> Result<SubstitutionPattern, SubstitutionError> {
        let mut ranges = Vec::new();
        let mut rest = input;

        while !rest.is_empty() {
            match rest.find("{{") {
                None => {
                    ranges.push(PatternRange::Literal(rest.to_string()));
                    rest = "";
                }
                Some(open) => {
                    if open > 0 {
                        ranges.push(PatternRange::Literal(rest[..open].to_string()));
                    }
                    let after = &rest[open + 2..];
                    let close = after.find("}}").ok_or(SubstitutionError::Unterminated)?;
                    let token = &after[..close];
                    let sub_type = SubstitutionType::parse(token).ok_or_else(|| {
                        SubstitutionError::UnknownToken {
                            token: token.to_string(),
                        }
                    })?;
                    ranges.push(PatternRange::Placeholder(sub_type));
                    rest = &after[close + 2..];
                }
            }
        }

        Ok(SubstitutionPattern {
            ranges,
            original: input.to_string(),
            origin,
        })
    }

    /// The parsed ranges, in order.
    pub fn ranges(&self) -> &[PatternRange] {
        &self.ranges
    }

    /// The unparsed template text, for diagnostics.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Where the template was written.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// The placeholder tokens this pattern uses, in first-use order.
    pub fn required_types(&self) -> Vec<SubstitutionType> {
        let mut types = Vec::new();
        for range in &self.ranges {
            if let PatternRange::Placeholder(t) = range {
                if !types.contains(t) {
                    types.push(*t);
                }
            }
        }
        types
    }

    /// Record this pattern's placeholders into a bits summary.
    pub fn fill_bits(&self, bits: &mut SubstitutionBits) {
        for range in &self.ranges {
            if let PatternRange::Placeholder(t) = range {
                bits.set(*t);
            }
        }
    }
}

/// A list of substitution patterns, e.g. a target's declared outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionList {
    patterns: Vec<SubstitutionPattern>,
}

impl SubstitutionList {
    pub fn new(patterns: Vec<SubstitutionPattern>) -> Self {
        SubstitutionList { patterns }
    }

    pub fn patterns(&self) -> &[SubstitutionPattern] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// The union of placeholder tokens across all patterns.
    pub fn required_types(&self) -> Vec<SubstitutionType> {
        let mut types = Vec::new();
        for pattern in &self.patterns {
            for t in pattern.required_types() {
                if !types.contains(&t) {
                    types.push(t);
                }
            }
        }
        types
    }

    /// Record every pattern's placeholders into a bits summary.
    pub fn fill_bits(&self, bits: &mut SubstitutionBits) {
        for pattern in &self.patterns {
            pattern.fill_bits(bits);
        }
    }
}

/// A fixed-size summary of which placeholder tokens are in use.
///
/// A toolchain computes one of these over all of its tools when setup
/// completes, so downstream writers know which expansions to precompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstitutionBits {
    used: [bool; NUM_SUBSTITUTION_TYPES],
}

impl SubstitutionBits {
    pub fn new() -> Self {
        SubstitutionBits::default()
    }

    pub fn set(&mut self, t: SubstitutionType) {
        self.used[t.index()] = true;
    }

    pub fn is_used(&self, t: SubstitutionType) -> bool {
        self.used[t.index()]
    }

    /// Union another summary into this one.
    pub fn merge_from(&mut self, other: &SubstitutionBits) {
        for (mine, theirs) in self.used.iter_mut().zip(other.used.iter()) {
            *mine |= *theirs;
        }
    }

    /// The tokens currently set, in table order.
    pub fn used_types(&self) -> Vec<SubstitutionType> {
        SubstitutionType::ALL
            .iter()
            .copied()
            .filter(|t| self.is_used(*t))
            .collect()
    }
}
