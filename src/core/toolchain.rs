//! The toolchain: one identity's configured tool set.
//!
//! A toolchain is an Item (it has a label and participates in dependency
//! management). It is built incrementally while its definition is
//! evaluated, then frozen by `setup_complete()`. Querying tools before the
//! freeze is an internal ordering bug and panics; after the freeze the
//! whole structure is read-only and safe to share across threads.

use std::collections::BTreeMap;

use crate::core::label::Label;
use crate::core::source_file::SourceKind;
use crate::core::substitution::SubstitutionBits;
use crate::core::target::{OutputType, Target};
use crate::core::tool::{Tool, ToolType, NUM_TOOL_TYPES};
use crate::core::value::Value;
use crate::util::InternedString;

/// Holds the tools and settings for one toolchain identity.
#[derive(Debug)]
pub struct Toolchain {
    label: Label,
    tools: [Option<Tool>; NUM_TOOL_TYPES],
    setup_complete: bool,
    substitution_bits: SubstitutionBits,
    deps: Vec<Label>,
    args: BTreeMap<InternedString, Value>,
    propagates_configs: bool,
}

impl Toolchain {
    /// Create a toolchain in the building state.
    pub fn new(label: Label) -> Self {
        Toolchain {
            label,
            tools: Default::default(),
            setup_complete: false,
            substitution_bits: SubstitutionBits::new(),
            deps: Vec::new(),
            args: BTreeMap::new(),
            propagates_configs: false,
        }
    }

    /// This toolchain's identity.
    pub fn label(&self) -> Label {
        self.label
    }

    /// Insert a tool into its fixed slot. The last writer for a given tool
    /// type wins. Callable only while building.
    pub fn set_tool(&mut self, tool: Tool) {
        assert!(
            !self.setup_complete,
            "set_tool on {} after setup_complete",
            self.label
        );
        let idx = tool.tool_type().index();
        self.tools[idx] = Some(tool);
    }

    /// Freeze the toolchain and compute the substitution-bits summary.
    ///
    /// Calling this twice is a caller bug.
    pub fn setup_complete(&mut self) {
        assert!(
            !self.setup_complete,
            "setup_complete called twice on {}",
            self.label
        );
        for tool in self.tools.iter().flatten() {
            tool.fill_substitution_bits(&mut self.substitution_bits);
        }
        self.setup_complete = true;
    }

    /// Whether the toolchain has been frozen.
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete
    }

    /// The tool in a given slot, or `None` if unconfigured.
    pub fn tool(&self, tool_type: ToolType) -> Option<&Tool> {
        self.tools[tool_type.index()].as_ref()
    }

    /// The tool that compiles the given source kind.
    ///
    /// `None` means the kind has no configured tool; whether that is fatal
    /// is the caller's call (a binary target with such a source errors at
    /// target-resolution time).
    pub fn tool_for_source_kind(&self, kind: SourceKind) -> Option<&Tool> {
        assert!(
            self.setup_complete,
            "tool_for_source_kind on {} before setup_complete",
            self.label
        );
        ToolType::for_source_kind(kind).and_then(|t| self.tool(t))
    }

    /// The tool producing the final output for the given target.
    ///
    /// Not always the tool you would expect: a copy target's one logical
    /// output is the completion stamp covering the individual copies, so
    /// copy maps to the stamp tool even when a copy tool is configured.
    pub fn tool_for_target_final_output(&self, target: &Target) -> Option<&Tool> {
        assert!(
            self.setup_complete,
            "tool_for_target_final_output on {} before setup_complete",
            self.label
        );
        let tool_type = match target.output_type() {
            OutputType::Executable => ToolType::Link,
            OutputType::SharedLibrary => ToolType::Solink,
            OutputType::LoadableModule => ToolType::SolinkModule,
            OutputType::StaticLibrary => ToolType::Alink,
            OutputType::SourceSet
            | OutputType::Group
            | OutputType::Copy
            | OutputType::BundleData
            | OutputType::CreateBundle
            | OutputType::Action
            | OutputType::ActionForEach
            | OutputType::WriteData => ToolType::Stamp,
        };
        self.tool(tool_type)
    }

    /// Which placeholder tokens any of this toolchain's tools use.
    pub fn substitution_bits(&self) -> &SubstitutionBits {
        assert!(
            self.setup_complete,
            "substitution_bits on {} before setup_complete",
            self.label
        );
        &self.substitution_bits
    }

    /// The sysroot supplying platform standard-library code, read from the
    /// first tool that declares one.
    pub fn sysroot(&self) -> Option<&str> {
        self.tools.iter().flatten().find_map(|t| t.sysroot())
    }

    /// Targets that must be resolved before compiling any target in this
    /// toolchain.
    pub fn deps(&self) -> &[Label] {
        &self.deps
    }

    /// Add a toolchain-level dependency.
    pub fn add_dep(&mut self, dep: Label) {
        assert!(!self.setup_complete, "add_dep on {} after setup_complete", self.label);
        self.deps.push(dep);
    }

    /// Build-argument overrides applied to scopes evaluated under this
    /// toolchain, as if passed on the command line.
    pub fn args(&self) -> &BTreeMap<InternedString, Value> {
        &self.args
    }

    /// Set a build-argument override.
    pub fn set_arg(&mut self, name: impl Into<InternedString>, value: Value) {
        assert!(!self.setup_complete, "set_arg on {} after setup_complete", self.label);
        self.args.insert(name.into(), value);
    }

    /// Whether public and all-dependent configs in this toolchain propagate
    /// to targets in other toolchains.
    pub fn propagates_configs(&self) -> bool {
        self.propagates_configs
    }

    pub fn set_propagates_configs(&mut self, propagates: bool) {
        self.propagates_configs = propagates;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::substitution::{
        SubstitutionList, SubstitutionPattern, SubstitutionType,
    };
    use crate::core::value::Origin;

    fn tc_label() -> Label {
        Label::new("//build/toolchain/", "gcc", "//build/toolchain/", "gcc")
    }

    fn simple_tool(tool_type: ToolType, command: &str) -> Tool {
        Tool::new(tool_type)
            .with_command(SubstitutionPattern::parse(command, Origin::synthetic()).unwrap())
    }

    fn target(output_type: OutputType) -> Target {
        let label = Label::new("//app/", "t", "//build/toolchain/", "gcc");
        Target::new(label, output_type)
    }

    #[test]
    fn test_tool_lookup_after_setup() {
        let mut tc = Toolchain::new(tc_label());
        tc.set_tool(simple_tool(ToolType::Cc, "gcc -c {{source}} -o {{output}}"));
        tc.set_tool(simple_tool(ToolType::Stamp, "touch {{output}}"));
        tc.setup_complete();

        assert!(tc.tool_for_source_kind(SourceKind::C).is_some());
        assert!(tc.tool_for_source_kind(SourceKind::Cpp).is_none());
        assert!(tc.tool_for_source_kind(SourceKind::Header).is_none());
    }

    #[test]
    fn test_last_writer_wins() {
        let mut tc = Toolchain::new(tc_label());
        tc.set_tool(simple_tool(ToolType::Cc, "gcc -c {{source}}"));
        tc.set_tool(
            simple_tool(ToolType::Cc, "clang -c {{source}}").with_output_prefix("x"),
        );
        tc.setup_complete();

        assert_eq!(tc.tool(ToolType::Cc).unwrap().output_prefix(), "x");
    }

    #[test]
    #[should_panic(expected = "before setup_complete")]
    fn test_query_before_setup_panics() {
        let tc = Toolchain::new(tc_label());
        tc.tool_for_source_kind(SourceKind::C);
    }

    #[test]
    #[should_panic(expected = "setup_complete called twice")]
    fn test_double_setup_panics() {
        let mut tc = Toolchain::new(tc_label());
        tc.setup_complete();
        tc.setup_complete();
    }

    #[test]
    fn test_copy_target_gets_stamp_tool() {
        let mut tc = Toolchain::new(tc_label());
        tc.set_tool(simple_tool(ToolType::Copy, "cp {{source}} {{output}}"));
        tc.set_tool(simple_tool(ToolType::Stamp, "touch {{output}}"));
        tc.setup_complete();

        // The copy tool is configured, but a copy target's final output is
        // its completion stamp.
        let tool = tc.tool_for_target_final_output(&target(OutputType::Copy)).unwrap();
        assert_eq!(tool.tool_type(), ToolType::Stamp);
    }

    #[test]
    fn test_binary_final_output_tools() {
        let mut tc = Toolchain::new(tc_label());
        tc.set_tool(simple_tool(ToolType::Link, "ld {{output}}"));
        tc.set_tool(simple_tool(ToolType::Alink, "ar {{output}}"));
        tc.set_tool(simple_tool(ToolType::Stamp, "touch {{output}}"));
        tc.setup_complete();

        assert_eq!(
            tc.tool_for_target_final_output(&target(OutputType::Executable))
                .unwrap()
                .tool_type(),
            ToolType::Link
        );
        assert_eq!(
            tc.tool_for_target_final_output(&target(OutputType::StaticLibrary))
                .unwrap()
                .tool_type(),
            ToolType::Alink
        );
        assert_eq!(
            tc.tool_for_target_final_output(&target(OutputType::SourceSet))
                .unwrap()
                .tool_type(),
            ToolType::Stamp
        );
    }

    #[test]
    fn test_substitution_bits_union() {
        let mut tc = Toolchain::new(tc_label());
        tc.set_tool(simple_tool(ToolType::Cc, "gcc -c {{source}} -o {{output}}"));
        tc.set_tool(
            Tool::new(ToolType::Alink).with_outputs(SubstitutionList::new(vec![
                SubstitutionPattern::parse(
                    "{{target_out_dir}}/{{target_output_name}}.a",
                    Origin::synthetic(),
                )
                .unwrap(),
            ])),
        );
        tc.setup_complete();

        let bits = tc.substitution_bits();
        assert!(bits.is_used(SubstitutionType::Source));
        assert!(bits.is_used(SubstitutionType::Output));
        assert!(bits.is_used(SubstitutionType::TargetOutDir));
        assert!(bits.is_used(SubstitutionType::TargetOutputName));
        assert!(!bits.is_used(SubstitutionType::SourceGenDir));
    }

    #[test]
    fn test_deps_and_args_survive_the_freeze() {
        let mut tc = Toolchain::new(tc_label());
        tc.add_dep(Label::new("//build/", "compiler_setup", "//build/toolchain/", "gcc"));
        tc.set_arg("is_debug", Value::boolean(true, Origin::synthetic()));
        tc.set_arg(
            "target_os",
            Value::string("linux", Origin::synthetic()),
        );
        tc.set_propagates_configs(true);
        tc.setup_complete();

        assert_eq!(tc.deps().len(), 1);
        assert_eq!(tc.deps()[0].name().as_str(), "compiler_setup");
        assert_eq!(tc.args().len(), 2);
        assert_eq!(tc.args()["is_debug"].as_boolean(), Some(true));
        assert_eq!(tc.args()["target_os"].as_string(), Some("linux"));
        assert!(tc.propagates_configs());
    }

    #[test]
    fn test_set_arg_last_writer_wins() {
        let mut tc = Toolchain::new(tc_label());
        tc.set_arg("is_debug", Value::boolean(true, Origin::synthetic()));
        tc.set_arg("is_debug", Value::boolean(false, Origin::synthetic()));
        tc.setup_complete();

        assert_eq!(tc.args()["is_debug"].as_boolean(), Some(false));
    }

    #[test]
    #[should_panic(expected = "add_dep")]
    fn test_add_dep_after_freeze_panics() {
        let mut tc = Toolchain::new(tc_label());
        tc.setup_complete();
        tc.add_dep(Label::new("//build/", "late", "//build/toolchain/", "gcc"));
    }

    #[test]
    #[should_panic(expected = "set_arg")]
    fn test_set_arg_after_freeze_panics() {
        let mut tc = Toolchain::new(tc_label());
        tc.setup_complete();
        tc.set_arg("is_debug", Value::boolean(true, Origin::synthetic()));
    }

    #[test]
    fn test_sysroot_from_tool() {
        let mut tc = Toolchain::new(tc_label());
        tc.set_tool(
            simple_tool(ToolType::Rustc, "rustc {{source}}").with_sysroot("/opt/rust/sysroot"),
        );
        tc.setup_complete();

        assert_eq!(tc.sysroot(), Some("/opt/rust/sysroot"));
    }
}
