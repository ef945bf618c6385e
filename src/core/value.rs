//! Declaration-scope values and the deferred-evaluation snapshot.
//!
//! The parser (an external collaborator) hands the generator a scope of
//! typed values with source provenance. Values form a closed tagged union;
//! the `Opaque` case marks a value whose concrete content depends on
//! not-yet-loaded context. A declaration whose scope still holds opaque
//! values after the prerequisite fields are filled is deferred: the scope is
//! captured as an owned, serializable snapshot and re-evaluated later as a
//! pure function of (snapshot, newly-resolved context).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::label::Label;
use crate::core::source_file::SourceDir;
use crate::util::InternedString;

/// Source-location provenance for a declaration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub file: InternedString,
    pub line: u32,
    pub column: u32,
}

impl Origin {
    pub fn new(file: impl Into<InternedString>, line: u32, column: u32) -> Self {
        Origin {
            file: file.into(),
            line,
            column,
        }
    }

    /// A placeholder origin for values synthesized in tests or by tooling.
    pub fn synthetic() -> Self {
        Origin::new("<synthetic>", 0, 0)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A value whose concrete content cannot yet be determined.
///
/// `reference` names the binding or import the value depends on, for
/// diagnostics and for the scheduler's later resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpaqueValue {
    pub reference: InternedString,
}

/// The closed set of declaration value shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String(String),
    Boolean(bool),
    List(Vec<Value>),
    Scope(BTreeMap<InternedString, Value>),
    Opaque(OpaqueValue),
}

/// A typed declaration value with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub kind: ValueKind,
    pub origin: Origin,
}

impl Value {
    pub fn string(s: impl Into<String>, origin: Origin) -> Self {
        Value {
            kind: ValueKind::String(s.into()),
            origin,
        }
    }

    pub fn boolean(b: bool, origin: Origin) -> Self {
        Value {
            kind: ValueKind::Boolean(b),
            origin,
        }
    }

    pub fn list(items: Vec<Value>, origin: Origin) -> Self {
        Value {
            kind: ValueKind::List(items),
            origin,
        }
    }

    pub fn scope(bindings: BTreeMap<InternedString, Value>, origin: Origin) -> Self {
        Value {
            kind: ValueKind::Scope(bindings),
            origin,
        }
    }

    pub fn opaque(reference: impl Into<InternedString>, origin: Origin) -> Self {
        Value {
            kind: ValueKind::Opaque(OpaqueValue {
                reference: reference.into(),
            }),
            origin,
        }
    }

    /// A human-readable name for this value's type, used in type-mismatch
    /// diagnostics.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ValueKind::String(_) => "string",
            ValueKind::Boolean(_) => "boolean",
            ValueKind::List(_) => "list",
            ValueKind::Scope(_) => "scope",
            ValueKind::Opaque(_) => "opaque value",
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match &self.kind {
            ValueKind::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scope(&self) -> Option<&BTreeMap<InternedString, Value>> {
        match &self.kind {
            ValueKind::Scope(bindings) => Some(bindings),
            _ => None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self.kind, ValueKind::Opaque(_))
    }

    /// Whether this value or anything nested inside it is opaque.
    pub fn contains_opaque(&self) -> bool {
        match &self.kind {
            ValueKind::Opaque(_) => true,
            ValueKind::List(items) => items.iter().any(Value::contains_opaque),
            ValueKind::Scope(bindings) => bindings.values().any(Value::contains_opaque),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    used: bool,
}

/// One declaration's evaluation scope.
///
/// Bindings track whether they have been consumed so unused-variable
/// reporting and deferred re-reads both work. The scope also carries the
/// declaring directory and the toolchain identity under which the
/// declaration is being evaluated.
#[derive(Debug, Clone)]
pub struct Scope {
    source_dir: SourceDir,
    toolchain: Label,
    bindings: BTreeMap<InternedString, Binding>,
}

impl Scope {
    pub fn new(source_dir: SourceDir, toolchain: Label) -> Self {
        Scope {
            source_dir,
            toolchain,
            bindings: BTreeMap::new(),
        }
    }

    /// The directory the declaration lives in.
    pub fn source_dir(&self) -> &SourceDir {
        &self.source_dir
    }

    /// The toolchain this declaration is evaluated under.
    pub fn toolchain(&self) -> Label {
        self.toolchain
    }

    /// Bind a value, replacing any previous binding of the same name.
    pub fn set(&mut self, name: impl Into<InternedString>, value: Value) {
        self.bindings.insert(
            name.into(),
            Binding {
                value,
                used: false,
            },
        );
    }

    /// Look up a binding, optionally marking it consumed.
    pub fn get(&mut self, name: &str, mark_used: bool) -> Option<&Value> {
        let binding = self.bindings.get_mut(name)?;
        if mark_used {
            binding.used = true;
        }
        Some(&binding.value)
    }

    /// Look up a binding without touching the used flag.
    pub fn peek(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name).map(|b| &b.value)
    }

    /// Whether any binding holds an opaque value, at any nesting depth.
    pub fn contains_opaque(&self) -> bool {
        self.bindings.values().any(|b| b.value.contains_opaque())
    }

    /// Mark every binding consumed. Called when a declaration defers, since
    /// the bindings will be re-read from the snapshot later.
    pub fn mark_all_used(&mut self) {
        for binding in self.bindings.values_mut() {
            binding.used = true;
        }
    }

    /// Names of bindings that were never consumed.
    pub fn unused_names(&self) -> Vec<InternedString> {
        self.bindings
            .iter()
            .filter(|(_, b)| !b.used)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Capture an owned copy of the current bindings for deferred
    /// re-evaluation.
    pub fn snapshot(&self) -> DeclarationSnapshot {
        DeclarationSnapshot {
            source_dir: self.source_dir.clone(),
            toolchain: self.toolchain,
            bindings: self
                .bindings
                .iter()
                .map(|(name, b)| (*name, b.value.clone()))
                .collect(),
        }
    }
}

/// An owned closure over a declaration scope, captured when evaluation must
/// be deferred.
///
/// Exists only between the first and a later evaluation attempt; discarded
/// once resolution succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationSnapshot {
    source_dir: SourceDir,
    toolchain: Label,
    bindings: BTreeMap<InternedString, Value>,
}

impl DeclarationSnapshot {
    /// Rebuild an evaluation scope, replacing opaque values through the
    /// caller-supplied resolver.
    ///
    /// The resolver returns `None` for values that are still unresolvable;
    /// those stay opaque, and the re-run will defer again.
    pub fn into_scope<F>(&self, resolve: F) -> Scope
    where
        F: Fn(&OpaqueValue) -> Option<Value>,
    {
        let mut scope = Scope::new(self.source_dir.clone(), self.toolchain);
        for (name, value) in &self.bindings {
            scope.set(*name, resolve_value(value, &resolve));
        }
        scope
    }

    /// The directory the deferred declaration lives in.
    pub fn source_dir(&self) -> &SourceDir {
        &self.source_dir
    }
}

fn resolve_value<F>(value: &Value, resolve: &F) -> Value
where
    F: Fn(&OpaqueValue) -> Option<Value>,
{
    match &value.kind {
        ValueKind::Opaque(opaque) => resolve(opaque).unwrap_or_else(|| value.clone()),
        ValueKind::List(items) => Value {
            kind: ValueKind::List(items.iter().map(|v| resolve_value(v, resolve)).collect()),
            origin: value.origin,
        },
        ValueKind::Scope(bindings) => Value {
            kind: ValueKind::Scope(
                bindings
                    .iter()
                    .map(|(k, v)| (*k, resolve_value(v, resolve)))
                    .collect(),
            ),
            origin: value.origin,
        },
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_scope() -> Scope {
        let tc = Label::new("//tc/", "gcc", "//tc/", "gcc");
        Scope::new(SourceDir::new("//app/"), tc)
    }

    #[test]
    fn test_get_marks_used() {
        let mut scope = test_scope();
        scope.set("testonly", Value::boolean(true, Origin::synthetic()));

        assert_eq!(scope.unused_names().len(), 1);
        assert!(scope.get("testonly", true).is_some());
        assert!(scope.unused_names().is_empty());
    }

    #[test]
    fn test_contains_opaque_is_recursive() {
        let mut scope = test_scope();
        scope.set(
            "deps",
            Value::list(
                vec![Value::opaque("other_target", Origin::synthetic())],
                Origin::synthetic(),
            ),
        );
        assert!(scope.contains_opaque());
    }

    #[test]
    fn test_snapshot_resolves_opaque_values() {
        let mut scope = test_scope();
        scope.set("extra", Value::opaque("late_binding", Origin::synthetic()));
        scope.set("name", Value::string("x", Origin::synthetic()));

        let snapshot = scope.snapshot();
        let mut resolved = snapshot.into_scope(|opaque| {
            (opaque.reference.as_str() == "late_binding")
                .then(|| Value::string("resolved", Origin::synthetic()))
        });

        assert_eq!(
            resolved.get("extra", false).unwrap().as_string(),
            Some("resolved")
        );
        assert!(!resolved.contains_opaque());
    }

    #[test]
    fn test_snapshot_keeps_unresolvable_opaque() {
        let mut scope = test_scope();
        scope.set("extra", Value::opaque("still_missing", Origin::synthetic()));

        let resolved = scope.snapshot().into_scope(|_| None);
        assert!(resolved.contains_opaque());
    }

    #[test]
    fn test_snapshot_serde_round_trip() {
        let mut scope = test_scope();
        scope.set("testonly", Value::boolean(true, Origin::synthetic()));
        scope.set("extra", Value::opaque("late", Origin::synthetic()));

        let snapshot = scope.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: DeclarationSnapshot = serde_json::from_str(&json).unwrap();

        let mut restored = back.into_scope(|_| None);
        assert_eq!(
            restored.get("testonly", false).unwrap().as_boolean(),
            Some(true)
        );
        assert!(restored.contains_opaque());
    }
}
