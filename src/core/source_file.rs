//! Source file paths and source classification.
//!
//! A `SourceFile` is a path within the source tree, classified once at
//! construction into a `SourceKind` from its extension. The kind picks the
//! compile tool and decides whether the file participates in compilation at
//! all. Classification is a pure, total function; unknown extensions map to
//! `SourceKind::Unknown`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The category of a source file, derived from its extension.
///
/// Values are sequential so they can index fixed-size tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Unknown,
    Asm,
    C,
    Cpp,
    Header,
    ObjC,
    ObjCpp,
    Rc,
    /// Object files can be inputs too (.o and .obj).
    Object,
    Def,
    Rust,
    Go,
}

impl SourceKind {
    /// Classify a path by its extension.
    pub fn classify(path: &str) -> SourceKind {
        let ext = match path.rsplit_once('.') {
            Some((_, ext)) if !ext.contains('/') => ext,
            _ => return SourceKind::Unknown,
        };
        match ext {
            "c" => SourceKind::C,
            "cc" | "cpp" | "cxx" | "c++" => SourceKind::Cpp,
            "h" | "hpp" | "hxx" | "hh" | "inc" => SourceKind::Header,
            "m" => SourceKind::ObjC,
            "mm" => SourceKind::ObjCpp,
            "s" | "S" | "asm" => SourceKind::Asm,
            "rc" => SourceKind::Rc,
            "o" | "obj" => SourceKind::Object,
            "def" => SourceKind::Def,
            "rs" => SourceKind::Rust,
            "go" => SourceKind::Go,
            _ => SourceKind::Unknown,
        }
    }

    /// Whether files of this kind are handed to a compile tool.
    ///
    /// Headers, linker .def files, prebuilt objects, unknown files, and the
    /// kinds with no tool in the toolchain's tool set ride along as inputs
    /// but are never compiled.
    pub fn participates_in_compilation(&self) -> bool {
        !matches!(
            self,
            SourceKind::Unknown
                | SourceKind::Header
                | SourceKind::Object
                | SourceKind::Def
                | SourceKind::Rc
                | SourceKind::Go
        )
    }
}

/// A file within the source tree.
///
/// Always begins with a slash and never ends in one. Source-absolute paths
/// use the `//` prefix (relative to the source root); a single leading slash
/// is a system-absolute path. Equality and ordering are by the raw string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    value: String,
    kind: SourceKind,
}

impl SourceFile {
    /// Create a source file from an already-absolute path.
    ///
    /// Panics if the path does not start with a slash or ends in one; these
    /// are produced by resolution, not by user input, so a violation is an
    /// internal bug.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        assert!(
            value.starts_with('/') && !value.ends_with('/'),
            "malformed source file path: {value:?}"
        );
        let kind = SourceKind::classify(&value);
        SourceFile { value, kind }
    }

    /// The raw path string.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The classified source kind.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Everything after the last slash.
    pub fn name(&self) -> &str {
        match self.value.rfind('/') {
            Some(idx) => &self.value[idx + 1..],
            None => &self.value,
        }
    }

    /// The containing directory.
    pub fn dir(&self) -> SourceDir {
        match self.value.rfind('/') {
            Some(idx) => SourceDir::new(&self.value[..idx + 1]),
            None => SourceDir::new("/"),
        }
    }

    /// True for `//`-prefixed paths, which are relative to the source root.
    pub fn is_source_absolute(&self) -> bool {
        self.value.starts_with("//")
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A directory within the source tree.
///
/// Always begins and ends with a slash, matching `SourceFile` conventions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceDir {
    value: String,
}

impl SourceDir {
    /// Create a source directory.
    ///
    /// Panics on malformed input for the same reason as [`SourceFile::new`].
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        assert!(
            value.starts_with('/') && value.ends_with('/'),
            "malformed source dir: {value:?}"
        );
        SourceDir { value }
    }

    /// The raw directory string.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Resolve a declared file reference relative to this directory.
    ///
    /// Absolute references (`//...` or `/...`) pass through; anything else is
    /// appended to this directory. Full path normalization lives in an
    /// external utility, not here.
    pub fn resolve_file(&self, input: &str) -> SourceFile {
        if input.starts_with('/') {
            SourceFile::new(input)
        } else {
            SourceFile::new(format!("{}{}", self.value, input))
        }
    }

    /// Resolve a declared reference as either a file or a directory string.
    ///
    /// Data entries use a trailing slash to mean "the whole directory"; the
    /// resolved string keeps that distinction.
    pub fn resolve_entry(&self, input: &str) -> String {
        if input.starts_with('/') {
            input.to_string()
        } else {
            format!("{}{}", self.value, input)
        }
    }
}

impl fmt::Display for SourceDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(SourceKind::classify("//a/b.c"), SourceKind::C);
        assert_eq!(SourceKind::classify("//a/b.cc"), SourceKind::Cpp);
        assert_eq!(SourceKind::classify("//a/b.cpp"), SourceKind::Cpp);
        assert_eq!(SourceKind::classify("//a/b.h"), SourceKind::Header);
        assert_eq!(SourceKind::classify("//a/b.m"), SourceKind::ObjC);
        assert_eq!(SourceKind::classify("//a/b.mm"), SourceKind::ObjCpp);
        assert_eq!(SourceKind::classify("//a/b.S"), SourceKind::Asm);
        assert_eq!(SourceKind::classify("//a/b.o"), SourceKind::Object);
        assert_eq!(SourceKind::classify("//a/b.rs"), SourceKind::Rust);
        assert_eq!(SourceKind::classify("//a/b.go"), SourceKind::Go);
        assert_eq!(SourceKind::classify("//a/b.weird"), SourceKind::Unknown);
        assert_eq!(SourceKind::classify("//a/noext"), SourceKind::Unknown);
    }

    #[test]
    fn test_classify_dot_in_directory() {
        // The dot belongs to a directory name, not an extension.
        assert_eq!(SourceKind::classify("//a.dir/noext"), SourceKind::Unknown);
    }

    #[test]
    fn test_source_file_parts() {
        let f = SourceFile::new("//lib/net/socket.cc");
        assert_eq!(f.name(), "socket.cc");
        assert_eq!(f.dir().value(), "//lib/net/");
        assert_eq!(f.kind(), SourceKind::Cpp);
        assert!(f.is_source_absolute());
    }

    #[test]
    fn test_resolve_relative_file() {
        let dir = SourceDir::new("//app/");
        assert_eq!(dir.resolve_file("main.c").value(), "//app/main.c");
        assert_eq!(dir.resolve_file("//other/x.c").value(), "//other/x.c");
        assert_eq!(dir.resolve_file("/usr/x.c").value(), "/usr/x.c");
    }

    #[test]
    fn test_resolve_entry_keeps_trailing_slash() {
        let dir = SourceDir::new("//app/");
        assert_eq!(dir.resolve_entry("assets/"), "//app/assets/");
        assert_eq!(dir.resolve_entry("assets/icon.png"), "//app/assets/icon.png");
    }

    #[test]
    #[should_panic]
    fn test_malformed_source_file_panics() {
        SourceFile::new("relative/path.c");
    }

    #[test]
    fn test_source_files_order_by_raw_string() {
        let mut files = vec![
            SourceFile::new("//b/main.c"),
            SourceFile::new("//a/z.h"),
            SourceFile::new("//a/a.cc"),
        ];
        files.sort();
        let values: Vec<&str> = files.iter().map(SourceFile::value).collect();
        assert_eq!(values, ["//a/a.cc", "//a/z.h", "//b/main.c"]);
    }
}
