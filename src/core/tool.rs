//! Tool definitions: one compiler/linker configuration per tool type.

use crate::core::source_file::SourceKind;
use crate::core::substitution::{SubstitutionBits, SubstitutionList, SubstitutionPattern};

/// The closed set of tool types a toolchain can configure.
///
/// Values are sequential so each toolchain can hold its tools in a
/// fixed-size table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolType {
    Cc,
    Cxx,
    ObjC,
    ObjCxx,
    Asm,
    Rustc,
    Alink,
    Solink,
    SolinkModule,
    Link,
    Stamp,
    Copy,
    Action,
}

/// Number of tool types, for fixed-size tables.
pub const NUM_TOOL_TYPES: usize = 13;

impl ToolType {
    /// Every tool type, in table order.
    pub const ALL: [ToolType; NUM_TOOL_TYPES] = [
        ToolType::Cc,
        ToolType::Cxx,
        ToolType::ObjC,
        ToolType::ObjCxx,
        ToolType::Asm,
        ToolType::Rustc,
        ToolType::Alink,
        ToolType::Solink,
        ToolType::SolinkModule,
        ToolType::Link,
        ToolType::Stamp,
        ToolType::Copy,
        ToolType::Action,
    ];

    /// The keyword used in toolchain definitions.
    pub fn keyword(&self) -> &'static str {
        match self {
            ToolType::Cc => "cc",
            ToolType::Cxx => "cxx",
            ToolType::ObjC => "objc",
            ToolType::ObjCxx => "objcxx",
            ToolType::Asm => "asm",
            ToolType::Rustc => "rustc",
            ToolType::Alink => "alink",
            ToolType::Solink => "solink",
            ToolType::SolinkModule => "solink_module",
            ToolType::Link => "link",
            ToolType::Stamp => "stamp",
            ToolType::Copy => "copy",
            ToolType::Action => "action",
        }
    }

    /// Look a keyword up in the closed tool set.
    pub fn parse(keyword: &str) -> Option<ToolType> {
        ToolType::ALL.iter().copied().find(|t| t.keyword() == keyword)
    }

    /// Index into fixed-size per-tool tables.
    pub fn index(self) -> usize {
        ToolType::ALL
            .iter()
            .position(|t| *t == self)
            .expect("tool type present in ALL")
    }

    /// The tool responsible for compiling a source kind, if any.
    ///
    /// Headers, objects, .def files, and unknown files are never compiled,
    /// so they have no tool. Go sources are recognized but have no tool in
    /// this tool set.
    pub fn for_source_kind(kind: SourceKind) -> Option<ToolType> {
        match kind {
            SourceKind::C => Some(ToolType::Cc),
            SourceKind::Cpp => Some(ToolType::Cxx),
            SourceKind::ObjC => Some(ToolType::ObjC),
            SourceKind::ObjCpp => Some(ToolType::ObjCxx),
            SourceKind::Asm => Some(ToolType::Asm),
            SourceKind::Rust => Some(ToolType::Rustc),
            SourceKind::Rc
            | SourceKind::Go
            | SourceKind::Unknown
            | SourceKind::Header
            | SourceKind::Object
            | SourceKind::Def => None,
        }
    }
}

/// One (tool type, toolchain) pair's configuration.
///
/// Created while the toolchain is being defined and frozen once the
/// toolchain's setup-complete step runs; owned exclusively by its toolchain.
#[derive(Debug, Clone)]
pub struct Tool {
    tool_type: ToolType,
    command: Option<SubstitutionPattern>,
    description: Option<SubstitutionPattern>,
    outputs: SubstitutionList,
    depfile: Option<SubstitutionPattern>,
    output_prefix: String,
    default_output_extension: String,
    sysroot: Option<String>,
}

impl Tool {
    /// Create an empty tool of the given type.
    pub fn new(tool_type: ToolType) -> Self {
        Tool {
            tool_type,
            command: None,
            description: None,
            outputs: SubstitutionList::default(),
            depfile: None,
            output_prefix: String::new(),
            default_output_extension: String::new(),
            sysroot: None,
        }
    }

    /// Set the command template.
    pub fn with_command(mut self, command: SubstitutionPattern) -> Self {
        self.command = Some(command);
        self
    }

    /// Set the description template shown while the tool runs.
    pub fn with_description(mut self, description: SubstitutionPattern) -> Self {
        self.description = Some(description);
        self
    }

    /// Set the output file pattern(s).
    pub fn with_outputs(mut self, outputs: SubstitutionList) -> Self {
        self.outputs = outputs;
        self
    }

    /// Set the depfile template.
    pub fn with_depfile(mut self, depfile: SubstitutionPattern) -> Self {
        self.depfile = Some(depfile);
        self
    }

    /// Set the output file prefix (e.g. "lib").
    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    /// Set the default output extension (e.g. ".so").
    pub fn with_default_output_extension(mut self, ext: impl Into<String>) -> Self {
        self.default_output_extension = ext.into();
        self
    }

    /// Set the sysroot supplying platform standard-library code.
    pub fn with_sysroot(mut self, sysroot: impl Into<String>) -> Self {
        self.sysroot = Some(sysroot.into());
        self
    }

    pub fn tool_type(&self) -> ToolType {
        self.tool_type
    }

    pub fn command(&self) -> Option<&SubstitutionPattern> {
        self.command.as_ref()
    }

    pub fn description(&self) -> Option<&SubstitutionPattern> {
        self.description.as_ref()
    }

    pub fn outputs(&self) -> &SubstitutionList {
        &self.outputs
    }

    pub fn depfile(&self) -> Option<&SubstitutionPattern> {
        self.depfile.as_ref()
    }

    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    pub fn default_output_extension(&self) -> &str {
        &self.default_output_extension
    }

    pub fn sysroot(&self) -> Option<&str> {
        self.sysroot.as_deref()
    }

    /// Record every placeholder this tool's templates can produce.
    pub fn fill_substitution_bits(&self, bits: &mut SubstitutionBits) {
        if let Some(command) = &self.command {
            command.fill_bits(bits);
        }
        if let Some(description) = &self.description {
            description.fill_bits(bits);
        }
        if let Some(depfile) = &self.depfile {
            depfile.fill_bits(bits);
        }
        self.outputs.fill_bits(bits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::substitution::SubstitutionType;
    use crate::core::value::Origin;

    #[test]
    fn test_tool_keyword_round_trip() {
        for t in ToolType::ALL {
            assert_eq!(ToolType::parse(t.keyword()), Some(t));
        }
        assert_eq!(ToolType::parse("weird"), None);
    }

    #[test]
    fn test_tool_for_source_kind() {
        assert_eq!(ToolType::for_source_kind(SourceKind::C), Some(ToolType::Cc));
        assert_eq!(ToolType::for_source_kind(SourceKind::Cpp), Some(ToolType::Cxx));
        assert_eq!(ToolType::for_source_kind(SourceKind::Rust), Some(ToolType::Rustc));
        assert_eq!(ToolType::for_source_kind(SourceKind::Header), None);
        assert_eq!(ToolType::for_source_kind(SourceKind::Object), None);
    }

    #[test]
    fn test_fill_substitution_bits() {
        let origin = Origin::synthetic();
        let tool = Tool::new(ToolType::Cc)
            .with_command(
                SubstitutionPattern::parse("gcc -c {{source}} -o {{output}}", origin).unwrap(),
            )
            .with_outputs(SubstitutionList::new(vec![SubstitutionPattern::parse(
                "{{source_out_dir}}/{{source_name_part}}.o",
                origin,
            )
            .unwrap()]));

        let mut bits = SubstitutionBits::new();
        tool.fill_substitution_bits(&mut bits);

        assert!(bits.is_used(SubstitutionType::Source));
        assert!(bits.is_used(SubstitutionType::Output));
        assert!(bits.is_used(SubstitutionType::SourceOutDir));
        assert!(!bits.is_used(SubstitutionType::TargetOutDir));
    }
}
