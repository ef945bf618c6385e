//! The resolved build target and its typed attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::label::{Label, LabelPattern, Visibility};
use crate::core::source_file::{SourceDir, SourceFile};
use crate::core::substitution::{SubstitutionList, SubstitutionPattern};
use crate::core::value::{DeclarationSnapshot, Origin, Value};
use crate::util::InternedString;

/// The closed set of target output types.
///
/// The five binary kinds share one generator keyed by the sub-kind; the
/// rest each have their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    BundleData,
    CreateBundle,
    Copy,
    Action,
    ActionForEach,
    Executable,
    Group,
    LoadableModule,
    SharedLibrary,
    SourceSet,
    StaticLibrary,
    WriteData,
}

impl OutputType {
    /// The declaration keyword for this output type.
    pub fn keyword(&self) -> &'static str {
        match self {
            OutputType::BundleData => "bundle_data",
            OutputType::CreateBundle => "create_bundle",
            OutputType::Copy => "copy",
            OutputType::Action => "action",
            OutputType::ActionForEach => "action_foreach",
            OutputType::Executable => "executable",
            OutputType::Group => "group",
            OutputType::LoadableModule => "loadable_module",
            OutputType::SharedLibrary => "shared_library",
            OutputType::SourceSet => "source_set",
            OutputType::StaticLibrary => "static_library",
            OutputType::WriteData => "write_data",
        }
    }

    /// Map a declaration keyword to its output type.
    pub fn from_keyword(keyword: &str) -> Option<OutputType> {
        const ALL: [OutputType; 12] = [
            OutputType::BundleData,
            OutputType::CreateBundle,
            OutputType::Copy,
            OutputType::Action,
            OutputType::ActionForEach,
            OutputType::Executable,
            OutputType::Group,
            OutputType::LoadableModule,
            OutputType::SharedLibrary,
            OutputType::SourceSet,
            OutputType::StaticLibrary,
            OutputType::WriteData,
        ];
        ALL.iter().copied().find(|t| t.keyword() == keyword)
    }

    /// Whether this is one of the five binary kinds.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            OutputType::Executable
                | OutputType::LoadableModule
                | OutputType::SharedLibrary
                | OutputType::SourceSet
                | OutputType::StaticLibrary
        )
    }
}

/// Where a target is in the two-phase evaluation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// Declared, nothing filled yet.
    Created,
    /// First pass ran but the scope held opaque values; a snapshot is
    /// attached and the target is waiting to be re-evaluated.
    Deferred,
    /// All fields filled; not yet inserted into the graph.
    Filled,
    /// Immutable and inserted into the resolved target graph.
    Resolved,
}

/// A file path relative to the build output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    value: String,
}

impl OutputFile {
    /// Rebase a build-dir-contained source file onto the build directory.
    ///
    /// Callers validate containment first; a file outside the build dir is
    /// an internal bug here.
    pub fn new(build_dir: &str, file: &SourceFile) -> Self {
        let stripped = file
            .value()
            .strip_prefix(build_dir)
            .unwrap_or_else(|| panic!("{} is not inside {}", file.value(), build_dir));
        OutputFile {
            value: stripped.to_string(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Metadata attached to a target: a scope of list-valued entries collected
/// lazily by a graph-wide walk (the walk itself is a separate collector).
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    contents: BTreeMap<InternedString, Value>,
    source_dir: Option<SourceDir>,
    origin: Option<Origin>,
}

impl Metadata {
    pub fn contents(&self) -> &BTreeMap<InternedString, Value> {
        &self.contents
    }

    pub fn source_dir(&self) -> Option<&SourceDir> {
        self.source_dir.as_ref()
    }

    pub fn origin(&self) -> Option<Origin> {
        self.origin
    }

    pub(crate) fn fill(
        &mut self,
        contents: BTreeMap<InternedString, Value>,
        source_dir: SourceDir,
        origin: Origin,
    ) {
        self.contents = contents;
        self.source_dir = Some(source_dir);
        self.origin = Some(origin);
    }
}

/// Action-specific values: the script and its templated arguments.
#[derive(Debug, Clone, Default)]
pub struct ActionValues {
    pub(crate) script: Option<SourceFile>,
    pub(crate) args: SubstitutionList,
    pub(crate) depfile: Option<SubstitutionPattern>,
}

impl ActionValues {
    pub fn script(&self) -> Option<&SourceFile> {
        self.script.as_ref()
    }

    pub fn args(&self) -> &SubstitutionList {
        &self.args
    }

    pub fn depfile(&self) -> Option<&SubstitutionPattern> {
        self.depfile.as_ref()
    }
}

/// Bundle-structure values for create_bundle targets.
#[derive(Debug, Clone, Default)]
pub struct BundleValues {
    pub(crate) root_dir: String,
    pub(crate) contents_dir: String,
    pub(crate) resources_dir: String,
    pub(crate) product_type: String,
}

impl BundleValues {
    pub fn root_dir(&self) -> &str {
        &self.root_dir
    }

    pub fn contents_dir(&self) -> &str {
        &self.contents_dir
    }

    pub fn resources_dir(&self) -> &str {
        &self.resources_dir
    }

    pub fn product_type(&self) -> &str {
        &self.product_type
    }
}

/// How a write-data target serializes its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputConversion {
    /// The value's default display form.
    #[default]
    Default,
    /// The value as a bare string.
    String,
    /// One list element per line.
    ListLines,
    /// JSON.
    Json,
}

impl OutputConversion {
    /// Parse the declaration keyword. Empty means default.
    pub fn parse(keyword: &str) -> Option<OutputConversion> {
        match keyword {
            "" => Some(OutputConversion::Default),
            "string" => Some(OutputConversion::String),
            "list lines" => Some(OutputConversion::ListLines),
            "json" => Some(OutputConversion::Json),
            _ => None,
        }
    }
}

/// Write-data-specific values.
#[derive(Debug, Clone)]
pub struct WriteDataValues {
    pub(crate) contents: Value,
    pub(crate) conversion: OutputConversion,
}

impl WriteDataValues {
    pub fn contents(&self) -> &Value {
        &self.contents
    }

    pub fn conversion(&self) -> OutputConversion {
        self.conversion
    }
}

/// Rust-specific values read by the external dependency-manifest emitter.
#[derive(Debug, Clone)]
pub struct RustValues {
    pub(crate) crate_name: Option<InternedString>,
    pub(crate) edition: InternedString,
    pub(crate) cfgs: Vec<String>,
    pub(crate) crate_root: Option<SourceFile>,
}

impl Default for RustValues {
    fn default() -> Self {
        RustValues {
            crate_name: None,
            edition: InternedString::new("2021"),
            cfgs: Vec::new(),
            crate_root: None,
        }
    }
}

/// The central resolved unit of the build graph.
///
/// Created empty at declaration time, filled across one or two evaluation
/// passes, then resolved and inserted into the graph. Once resolved it is
/// immutable: a single generator writes it, everyone else reads.
#[derive(Debug, Clone)]
pub struct Target {
    label: Label,
    output_type: OutputType,
    state: ResolutionState,
    /// Where the declaring call was written, kept so a later evaluation
    /// pass reports errors against the declaration site.
    pub(crate) origin: Origin,

    pub(crate) sources: Vec<SourceFile>,
    pub(crate) public_headers: Vec<SourceFile>,
    pub(crate) all_headers_public: bool,
    pub(crate) check_includes: bool,

    pub(crate) private_deps: Vec<Label>,
    pub(crate) public_deps: Vec<Label>,
    pub(crate) data_deps: Vec<Label>,

    pub(crate) configs: Vec<Label>,
    pub(crate) all_dependent_configs: Vec<Label>,
    pub(crate) public_configs: Vec<Label>,

    pub(crate) metadata: Metadata,
    pub(crate) visibility: Visibility,
    pub(crate) testonly: bool,
    pub(crate) assert_no_deps: Vec<LabelPattern>,

    /// File-or-directory runtime data paths (trailing slash = directory).
    pub(crate) data: Vec<String>,

    pub(crate) outputs: SubstitutionList,
    pub(crate) output_name: Option<String>,
    pub(crate) write_runtime_deps_output: Option<OutputFile>,

    pub(crate) action_values: ActionValues,
    pub(crate) bundle_values: Option<BundleValues>,
    pub(crate) write_data_values: Option<WriteDataValues>,
    pub(crate) rust_values: RustValues,

    pub(crate) definition_snapshot: Option<DeclarationSnapshot>,
}

impl Target {
    /// Create an empty target in the `Created` state.
    pub fn new(label: Label, output_type: OutputType) -> Self {
        Target {
            label,
            output_type,
            state: ResolutionState::Created,
            origin: Origin::synthetic(),
            sources: Vec::new(),
            public_headers: Vec::new(),
            all_headers_public: true,
            check_includes: true,
            private_deps: Vec::new(),
            public_deps: Vec::new(),
            data_deps: Vec::new(),
            configs: Vec::new(),
            all_dependent_configs: Vec::new(),
            public_configs: Vec::new(),
            metadata: Metadata::default(),
            visibility: Visibility::public(),
            testonly: false,
            assert_no_deps: Vec::new(),
            data: Vec::new(),
            outputs: SubstitutionList::default(),
            output_name: None,
            write_runtime_deps_output: None,
            action_values: ActionValues::default(),
            bundle_values: None,
            write_data_values: None,
            rust_values: RustValues::default(),
            definition_snapshot: None,
        }
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    /// Where the declaring call was written.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub(crate) fn set_state(&mut self, state: ResolutionState) {
        self.state = state;
    }

    /// Whether this is one of the five binary kinds.
    pub fn is_binary(&self) -> bool {
        self.output_type.is_binary()
    }

    /// The label of the toolchain this target is built under.
    pub fn toolchain_label(&self) -> Label {
        self.label.toolchain_label()
    }

    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    pub fn public_headers(&self) -> &[SourceFile] {
        &self.public_headers
    }

    /// Whether every header is public (no explicit `public` list given).
    pub fn all_headers_public(&self) -> bool {
        self.all_headers_public
    }

    pub fn check_includes(&self) -> bool {
        self.check_includes
    }

    pub fn private_deps(&self) -> &[Label] {
        &self.private_deps
    }

    pub fn public_deps(&self) -> &[Label] {
        &self.public_deps
    }

    pub fn data_deps(&self) -> &[Label] {
        &self.data_deps
    }

    /// Every dependency edge, private then public then data.
    pub fn all_deps(&self) -> impl Iterator<Item = Label> + '_ {
        self.private_deps
            .iter()
            .chain(self.public_deps.iter())
            .chain(self.data_deps.iter())
            .copied()
    }

    pub fn configs(&self) -> &[Label] {
        &self.configs
    }

    pub fn all_dependent_configs(&self) -> &[Label] {
        &self.all_dependent_configs
    }

    pub fn public_configs(&self) -> &[Label] {
        &self.public_configs
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub fn testonly(&self) -> bool {
        self.testonly
    }

    pub fn assert_no_deps(&self) -> &[LabelPattern] {
        &self.assert_no_deps
    }

    pub fn data(&self) -> &[String] {
        &self.data
    }

    pub fn outputs(&self) -> &SubstitutionList {
        &self.outputs
    }

    /// The declared output name override, or the label name.
    pub fn output_name(&self) -> &str {
        self.output_name.as_deref().unwrap_or(self.label.name().as_str())
    }

    pub fn write_runtime_deps_output(&self) -> Option<&OutputFile> {
        self.write_runtime_deps_output.as_ref()
    }

    pub fn action_values(&self) -> &ActionValues {
        &self.action_values
    }

    pub fn bundle_values(&self) -> Option<&BundleValues> {
        self.bundle_values.as_ref()
    }

    pub fn write_data_values(&self) -> Option<&WriteDataValues> {
        self.write_data_values.as_ref()
    }

    // Read-only surface for the external dependency-manifest emitter.

    /// The crate name: declared, or derived from the label.
    pub fn crate_name(&self) -> InternedString {
        self.rust_values.crate_name.unwrap_or(self.label.name())
    }

    /// The declared language edition.
    pub fn edition(&self) -> InternedString {
        self.rust_values.edition
    }

    /// Conditional-compilation flags.
    pub fn cfgs(&self) -> &[String] {
        &self.rust_values.cfgs
    }

    /// The crate root source, when one was declared or inferred.
    pub fn crate_root(&self) -> Option<&SourceFile> {
        self.rust_values.crate_root.as_ref()
    }

    /// The deferred snapshot, present only between evaluation passes.
    pub fn definition_snapshot(&self) -> Option<&DeclarationSnapshot> {
        self.definition_snapshot.as_ref()
    }
}
