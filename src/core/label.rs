//! Labels - globally unique identities for graph items.
//!
//! A label combines the declaring directory, the item name, and the
//! toolchain it is built under. Two items with equal labels are the same
//! item. Labels are interned: equality and hashing are pointer operations,
//! and cloning is a copy.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{LazyLock, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::source_file::SourceDir;
use crate::util::InternedString;

static LABEL_INTERNER: LazyLock<RwLock<HashMap<LabelInner, &'static LabelInner>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Error produced when a label or label pattern cannot be parsed.
#[derive(Debug, Clone, Error)]
#[error("invalid label `{text}`: {reason}")]
pub struct LabelError {
    pub text: String,
    pub reason: &'static str,
}

impl LabelError {
    fn new(text: impl Into<String>, reason: &'static str) -> Self {
        LabelError {
            text: text.into(),
            reason,
        }
    }
}

/// The unique identity of an item (a target or a toolchain).
#[derive(Clone, Copy)]
pub struct Label {
    inner: &'static LabelInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LabelInner {
    dir: InternedString,
    name: InternedString,
    toolchain_dir: InternedString,
    toolchain_name: InternedString,
}

impl Label {
    /// Create a label from its four components.
    ///
    /// `dir` and `toolchain_dir` must be source-absolute directories
    /// (`//...` with a trailing slash).
    pub fn new(
        dir: impl Into<InternedString>,
        name: impl Into<InternedString>,
        toolchain_dir: impl Into<InternedString>,
        toolchain_name: impl Into<InternedString>,
    ) -> Self {
        let inner = LabelInner {
            dir: dir.into(),
            name: name.into(),
            toolchain_dir: toolchain_dir.into(),
            toolchain_name: toolchain_name.into(),
        };
        Self::intern(inner)
    }

    fn intern(inner: LabelInner) -> Self {
        {
            let interner = LABEL_INTERNER.read().unwrap();
            if let Some(&interned) = interner.get(&inner) {
                return Label { inner: interned };
            }
        }

        let mut interner = LABEL_INTERNER.write().unwrap();
        if let Some(&interned) = interner.get(&inner) {
            return Label { inner: interned };
        }

        let leaked: &'static LabelInner = Box::leak(Box::new(inner.clone()));
        interner.insert(inner, leaked);

        Label { inner: leaked }
    }

    /// Resolve a user-written label reference against the declaring
    /// directory.
    ///
    /// Accepted forms: `//dir:name`, `//dir` (name defaults to the last
    /// directory component), `:name` (current directory), `sub/dir:name`
    /// and `sub/dir` (relative to `current_dir`). A `(//tc_dir:tc_name)`
    /// suffix overrides the toolchain; otherwise the reference inherits
    /// `default_toolchain`'s toolchain identity.
    pub fn resolve(
        input: &str,
        current_dir: &SourceDir,
        default_toolchain: Label,
    ) -> Result<Label, LabelError> {
        if input.is_empty() {
            return Err(LabelError::new(input, "empty label"));
        }

        // Split off an explicit toolchain override.
        let (body, toolchain) = match input.find('(') {
            Some(open) => {
                let Some(stripped) = input[open..].strip_prefix('(').and_then(|s| s.strip_suffix(')'))
                else {
                    return Err(LabelError::new(input, "unterminated toolchain suffix"));
                };
                let tc = Label::resolve(stripped, current_dir, default_toolchain)?;
                (&input[..open], (tc.dir(), tc.name()))
            }
            None => (
                input,
                (
                    default_toolchain.toolchain_dir(),
                    default_toolchain.toolchain_name(),
                ),
            ),
        };

        let (dir_part, name_part) = match body.rfind(':') {
            Some(colon) => (&body[..colon], Some(&body[colon + 1..])),
            None => (body, None),
        };

        let dir = if dir_part.is_empty() {
            current_dir.value().to_string()
        } else if let Some(rest) = dir_part.strip_prefix("//") {
            if rest.is_empty() {
                "//".to_string()
            } else {
                format!("//{}/", rest.trim_end_matches('/'))
            }
        } else if dir_part.starts_with('/') {
            return Err(LabelError::new(input, "system-absolute labels are not allowed"));
        } else {
            format!("{}{}/", current_dir.value(), dir_part.trim_end_matches('/'))
        };

        let name = match name_part {
            Some(name) if !name.is_empty() => name.to_string(),
            Some(_) => return Err(LabelError::new(input, "empty name after colon")),
            None => {
                // Name defaults to the last directory component.
                let trimmed = dir.trim_end_matches('/');
                match trimmed.rsplit_once('/') {
                    Some((_, last)) if !last.is_empty() => last.to_string(),
                    _ => return Err(LabelError::new(input, "no name and no directory component")),
                }
            }
        };

        Ok(Label::new(dir, name, toolchain.0, toolchain.1))
    }

    /// The declaring directory.
    pub fn dir(&self) -> InternedString {
        self.inner.dir
    }

    /// The item name.
    pub fn name(&self) -> InternedString {
        self.inner.name
    }

    /// The toolchain's declaring directory.
    pub fn toolchain_dir(&self) -> InternedString {
        self.inner.toolchain_dir
    }

    /// The toolchain's name.
    pub fn toolchain_name(&self) -> InternedString {
        self.inner.toolchain_name
    }

    /// The label of this item's toolchain, as its own label.
    pub fn toolchain_label(&self) -> Label {
        Label::new(
            self.inner.toolchain_dir,
            self.inner.toolchain_name,
            self.inner.toolchain_dir,
            self.inner.toolchain_name,
        )
    }

    /// Format for display, optionally with the toolchain qualifier.
    pub fn user_visible_name(&self, include_toolchain: bool) -> String {
        let base = format!("{}:{}", self.inner.dir.trim_end_matches('/'), self.inner.name);
        if include_toolchain && !self.inner.toolchain_name.is_empty() {
            format!(
                "{}({}:{})",
                base,
                self.inner.toolchain_dir.trim_end_matches('/'),
                self.inner.toolchain_name
            )
        } else {
            base
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.inner, state)
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner
            .dir
            .cmp(&other.inner.dir)
            .then_with(|| self.inner.name.cmp(&other.inner.name))
            .then_with(|| self.inner.toolchain_dir.cmp(&other.inner.toolchain_dir))
            .then_with(|| self.inner.toolchain_name.cmp(&other.inner.toolchain_name))
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", self.user_visible_name(true))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_visible_name(true))
    }
}

impl Serialize for Label {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct LabelData<'a> {
            dir: &'a str,
            name: &'a str,
            toolchain_dir: &'a str,
            toolchain_name: &'a str,
        }

        LabelData {
            dir: self.inner.dir.as_str(),
            name: self.inner.name.as_str(),
            toolchain_dir: self.inner.toolchain_dir.as_str(),
            toolchain_name: self.inner.toolchain_name.as_str(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct LabelData {
            dir: String,
            name: String,
            toolchain_dir: String,
            toolchain_name: String,
        }

        let data = LabelData::deserialize(deserializer)?;
        Ok(Label::new(
            data.dir,
            data.name,
            data.toolchain_dir,
            data.toolchain_name,
        ))
    }
}

/// How a label pattern constrains the labels it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Matches one exact directory + name.
    Exact,
    /// Matches every target declared directly in one directory (`//dir:*`).
    Directory,
    /// Matches every target under a directory tree (`//dir/*`).
    RecursiveDirectory,
}

/// A pattern over labels, used by visibility and assert-no-deps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPattern {
    kind: PatternKind,
    dir: InternedString,
    name: InternedString,
}

impl LabelPattern {
    /// Parse a user-written pattern against the declaring directory.
    ///
    /// `//dir/*` matches recursively, `//dir:*` matches one directory,
    /// anything else resolves like a label and matches exactly. Patterns
    /// ignore toolchains.
    pub fn parse(input: &str, current_dir: &SourceDir) -> Result<LabelPattern, LabelError> {
        if input == "*" {
            return Ok(LabelPattern {
                kind: PatternKind::RecursiveDirectory,
                dir: InternedString::new("//"),
                name: InternedString::default(),
            });
        }

        if let Some(prefix) = input.strip_suffix(":*") {
            let dir = Self::resolve_dir(prefix, input, current_dir)?;
            return Ok(LabelPattern {
                kind: PatternKind::Directory,
                dir: InternedString::new(dir),
                name: InternedString::default(),
            });
        }

        if let Some(prefix) = input.strip_suffix("/*") {
            let dir = Self::resolve_dir(prefix, input, current_dir)?;
            return Ok(LabelPattern {
                kind: PatternKind::RecursiveDirectory,
                dir: InternedString::new(dir),
                name: InternedString::default(),
            });
        }

        // An exact pattern reads like a label; the toolchain placeholder is
        // irrelevant because matching ignores it.
        let placeholder = Label::new("//", "none", "//", "none");
        let label = Label::resolve(input, current_dir, placeholder)?;
        Ok(LabelPattern {
            kind: PatternKind::Exact,
            dir: label.dir(),
            name: label.name(),
        })
    }

    fn resolve_dir(
        prefix: &str,
        original: &str,
        current_dir: &SourceDir,
    ) -> Result<String, LabelError> {
        if prefix.is_empty() {
            return Ok(current_dir.value().to_string());
        }
        if let Some(rest) = prefix.strip_prefix("//") {
            if rest.is_empty() {
                return Ok("//".to_string());
            }
            return Ok(format!("//{}/", rest.trim_end_matches('/')));
        }
        if prefix.starts_with('/') {
            return Err(LabelError::new(original, "system-absolute patterns are not allowed"));
        }
        Ok(format!(
            "{}{}/",
            current_dir.value(),
            prefix.trim_end_matches('/')
        ))
    }

    /// The pattern kind.
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Whether this pattern matches the given label (toolchain ignored).
    pub fn matches(&self, label: &Label) -> bool {
        match self.kind {
            PatternKind::Exact => label.dir() == self.dir && label.name() == self.name,
            PatternKind::Directory => label.dir() == self.dir,
            PatternKind::RecursiveDirectory => label.dir().starts_with(self.dir.as_str()),
        }
    }
}

impl fmt::Display for LabelPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PatternKind::Exact => {
                write!(f, "{}:{}", self.dir.trim_end_matches('/'), self.name)
            }
            PatternKind::Directory => write!(f, "{}:*", self.dir.trim_end_matches('/')),
            PatternKind::RecursiveDirectory => write!(f, "{}*", self.dir),
        }
    }
}

/// A target's visibility specification.
///
/// Absent patterns mean fully public; an explicit empty list means
/// visible to nobody but itself.
#[derive(Debug, Clone, Default)]
pub struct Visibility {
    patterns: Option<Vec<LabelPattern>>,
}

impl Visibility {
    /// Fully public visibility.
    pub fn public() -> Self {
        Visibility { patterns: None }
    }

    /// Visibility restricted to the given patterns.
    pub fn restricted(patterns: Vec<LabelPattern>) -> Self {
        Visibility {
            patterns: Some(patterns),
        }
    }

    /// Whether an item with this visibility can be depended on from `from`.
    pub fn can_see_me(&self, from: &Label) -> bool {
        match &self.patterns {
            None => true,
            Some(patterns) => patterns.iter().any(|p| p.matches(from)),
        }
    }

    /// The explicit patterns, if visibility is restricted.
    pub fn patterns(&self) -> Option<&[LabelPattern]> {
        self.patterns.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_tc() -> Label {
        Label::new("//build/toolchain/", "gcc", "//build/toolchain/", "gcc")
    }

    #[test]
    fn test_label_interning() {
        let a = Label::new("//app/", "main", "//tc/", "gcc");
        let b = Label::new("//app/", "main", "//tc/", "gcc");
        let c = Label::new("//app/", "other", "//tc/", "gcc");

        assert_eq!(a, b);
        assert!(std::ptr::eq(a.inner, b.inner));
        assert_ne!(a, c);
    }

    #[test]
    fn test_resolve_absolute_with_name() {
        let dir = SourceDir::new("//app/");
        let label = Label::resolve("//lib/net:socket", &dir, default_tc()).unwrap();
        assert_eq!(label.dir().as_str(), "//lib/net/");
        assert_eq!(label.name().as_str(), "socket");
        assert_eq!(label.toolchain_name().as_str(), "gcc");
    }

    #[test]
    fn test_resolve_name_defaults_to_last_component() {
        let dir = SourceDir::new("//app/");
        let label = Label::resolve("//lib/net", &dir, default_tc()).unwrap();
        assert_eq!(label.dir().as_str(), "//lib/net/");
        assert_eq!(label.name().as_str(), "net");
    }

    #[test]
    fn test_resolve_current_dir_and_relative() {
        let dir = SourceDir::new("//app/");
        let here = Label::resolve(":helper", &dir, default_tc()).unwrap();
        assert_eq!(here.dir().as_str(), "//app/");
        assert_eq!(here.name().as_str(), "helper");

        let rel = Label::resolve("sub:thing", &dir, default_tc()).unwrap();
        assert_eq!(rel.dir().as_str(), "//app/sub/");
        assert_eq!(rel.name().as_str(), "thing");
    }

    #[test]
    fn test_resolve_toolchain_suffix() {
        let dir = SourceDir::new("//app/");
        let label = Label::resolve("//lib:x(//tc:msvc)", &dir, default_tc()).unwrap();
        assert_eq!(label.toolchain_dir().as_str(), "//tc/");
        assert_eq!(label.toolchain_name().as_str(), "msvc");
    }

    #[test]
    fn test_resolve_rejects_bad_labels() {
        let dir = SourceDir::new("//app/");
        assert!(Label::resolve("", &dir, default_tc()).is_err());
        assert!(Label::resolve("//lib:", &dir, default_tc()).is_err());
        assert!(Label::resolve("/abs:x", &dir, default_tc()).is_err());
    }

    #[test]
    fn test_user_visible_name() {
        let label = Label::new("//lib/net/", "socket", "//tc/", "gcc");
        assert_eq!(label.user_visible_name(false), "//lib/net:socket");
        assert_eq!(label.user_visible_name(true), "//lib/net:socket(//tc:gcc)");
    }

    #[test]
    fn test_pattern_matching() {
        let dir = SourceDir::new("//app/");
        let label = Label::new("//lib/net/", "socket", "//tc/", "gcc");
        let deep = Label::new("//lib/net/inner/", "x", "//tc/", "gcc");

        let exact = LabelPattern::parse("//lib/net:socket", &dir).unwrap();
        assert!(exact.matches(&label));
        assert!(!exact.matches(&deep));

        let directory = LabelPattern::parse("//lib/net:*", &dir).unwrap();
        assert!(directory.matches(&label));
        assert!(!directory.matches(&deep));

        let recursive = LabelPattern::parse("//lib/*", &dir).unwrap();
        assert!(recursive.matches(&label));
        assert!(recursive.matches(&deep));

        let everything = LabelPattern::parse("*", &dir).unwrap();
        assert!(everything.matches(&label));
    }

    #[test]
    fn test_visibility_default_public() {
        let from = Label::new("//anywhere/", "t", "//tc/", "gcc");
        assert!(Visibility::public().can_see_me(&from));
        assert!(!Visibility::restricted(vec![]).can_see_me(&from));
    }
}
