//! Build-wide settings: source root, output directory, default toolchain.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::core::label::Label;
use crate::core::source_file::SourceDir;

/// Immutable settings shared by every declaration in one build.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    root_path: String,
    build_dir: String,
    default_toolchain: Label,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    root_path: String,
    build_dir: String,
    default_toolchain: String,
}

impl BuildSettings {
    /// Create settings from validated parts.
    ///
    /// `build_dir` is source-absolute with a trailing slash (for example
    /// `//out/Default/`); anything else is a construction bug.
    pub fn new(
        root_path: impl Into<String>,
        build_dir: impl Into<String>,
        default_toolchain: Label,
    ) -> Self {
        let build_dir = build_dir.into();
        assert!(
            build_dir.starts_with("//") && build_dir.ends_with('/'),
            "malformed build dir: {build_dir:?}"
        );
        BuildSettings {
            root_path: root_path.into(),
            build_dir,
            default_toolchain,
        }
    }

    /// Load settings from a TOML document.
    ///
    /// ```toml
    /// root_path = "/home/me/project"
    /// build_dir = "//out/Default/"
    /// default_toolchain = "//build/toolchain:gcc"
    /// ```
    pub fn from_toml_str(input: &str) -> Result<BuildSettings> {
        let raw: RawSettings =
            toml::from_str(input).context("failed to parse build settings")?;

        if !raw.build_dir.starts_with("//") || !raw.build_dir.ends_with('/') {
            bail!(
                "build_dir must be source-absolute with a trailing slash, got `{}`",
                raw.build_dir
            );
        }

        // Bootstrapping: the default toolchain reference is resolved with a
        // placeholder toolchain, then rebuilt as its own toolchain identity.
        let placeholder = Label::new("//", "none", "//", "none");
        let parsed = Label::resolve(&raw.default_toolchain, &SourceDir::new("//"), placeholder)
            .with_context(|| {
                format!("invalid default_toolchain `{}`", raw.default_toolchain)
            })?;
        let default_toolchain =
            Label::new(parsed.dir(), parsed.name(), parsed.dir(), parsed.name());

        Ok(BuildSettings::new(
            raw.root_path,
            raw.build_dir,
            default_toolchain,
        ))
    }

    /// The OS path of the source root.
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// The sandboxed output directory every generated file must live under.
    pub fn build_dir(&self) -> &str {
        &self.build_dir
    }

    /// The toolchain used when a label carries no explicit toolchain.
    pub fn default_toolchain(&self) -> Label {
        self.default_toolchain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml() {
        let settings = BuildSettings::from_toml_str(
            r#"
            root_path = "/home/me/project"
            build_dir = "//out/Default/"
            default_toolchain = "//build/toolchain:gcc"
            "#,
        )
        .unwrap();

        assert_eq!(settings.root_path(), "/home/me/project");
        assert_eq!(settings.build_dir(), "//out/Default/");

        let tc = settings.default_toolchain();
        assert_eq!(tc.dir().as_str(), "//build/toolchain/");
        assert_eq!(tc.name().as_str(), "gcc");
        assert_eq!(tc.toolchain_name().as_str(), "gcc");
    }

    #[test]
    fn test_rejects_relative_build_dir() {
        let err = BuildSettings::from_toml_str(
            r#"
            root_path = "/p"
            build_dir = "out/Default/"
            default_toolchain = "//tc:gcc"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("build_dir"));
    }

    #[test]
    fn test_rejects_bad_toolchain() {
        assert!(BuildSettings::from_toml_str(
            r#"
            root_path = "/p"
            build_dir = "//out/"
            default_toolchain = ""
            "#,
        )
        .is_err());
    }
}
