//! The build context: settings, the toolchain registry, and the resolved
//! target graph.
//!
//! The context replaces ambient globals. It is passed explicitly into the
//! generator so ownership and thread-safety stay visible: toolchains are
//! registered exactly once per identity and shared frozen, and targets are
//! inserted once, already resolved.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::label::Label;
use crate::core::settings::BuildSettings;
use crate::core::toolchain::Toolchain;
use crate::resolver::ResolvedGraph;

/// Shared state for one build-description load.
#[derive(Debug)]
pub struct BuildContext {
    settings: BuildSettings,
    toolchains: RwLock<HashMap<Label, Arc<Toolchain>>>,
    graph: ResolvedGraph,
}

impl BuildContext {
    pub fn new(settings: BuildSettings) -> Self {
        BuildContext {
            settings,
            toolchains: RwLock::new(HashMap::new()),
            graph: ResolvedGraph::new(),
        }
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    pub fn graph(&self) -> &ResolvedGraph {
        &self.graph
    }

    /// Register a frozen toolchain under its label.
    ///
    /// Registering two toolchains with the same label, or an unfrozen one,
    /// is an internal invariant breach and panics.
    pub fn register_toolchain(&self, toolchain: Toolchain) -> Arc<Toolchain> {
        assert!(
            toolchain.is_setup_complete(),
            "toolchain {} registered before setup_complete",
            toolchain.label()
        );
        let label = toolchain.label();
        let shared = Arc::new(toolchain);

        let mut toolchains = self.toolchains.write().unwrap();
        if toolchains.insert(label, Arc::clone(&shared)).is_some() {
            panic!("two toolchains registered for {label}");
        }
        shared
    }

    /// Get the toolchain registered for a label, if any.
    pub fn toolchain(&self, label: Label) -> Option<Arc<Toolchain>> {
        self.toolchains.read().unwrap().get(&label).cloned()
    }

    /// Get the toolchain for a label, materializing it exactly once.
    ///
    /// The factory runs only when no toolchain is registered yet; if two
    /// threads race, one factory result wins and both get the same
    /// instance. The factory must return a frozen toolchain.
    pub fn toolchain_or_register<F>(&self, label: Label, factory: F) -> Arc<Toolchain>
    where
        F: FnOnce() -> Toolchain,
    {
        if let Some(existing) = self.toolchain(label) {
            return existing;
        }

        let built = factory();
        assert!(
            built.is_setup_complete(),
            "toolchain factory for {label} returned an unfrozen toolchain"
        );
        assert!(
            built.label() == label,
            "toolchain factory for {label} returned toolchain {}",
            built.label()
        );

        let mut toolchains = self.toolchains.write().unwrap();
        // Another thread may have won the race while the factory ran.
        Arc::clone(
            toolchains
                .entry(label)
                .or_insert_with(|| Arc::new(built)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context() -> BuildContext {
        let tc = Label::new("//tc/", "gcc", "//tc/", "gcc");
        BuildContext::new(BuildSettings::new("/p", "//out/Default/", tc))
    }

    fn frozen_toolchain(label: Label) -> Toolchain {
        let mut tc = Toolchain::new(label);
        tc.setup_complete();
        tc
    }

    #[test]
    fn test_register_and_lookup() {
        let ctx = test_context();
        let label = Label::new("//tc/", "gcc", "//tc/", "gcc");

        assert!(ctx.toolchain(label).is_none());
        ctx.register_toolchain(frozen_toolchain(label));
        assert!(ctx.toolchain(label).is_some());
    }

    #[test]
    #[should_panic(expected = "two toolchains registered")]
    fn test_duplicate_registration_panics() {
        let ctx = test_context();
        let label = Label::new("//tc/", "gcc", "//tc/", "gcc");
        ctx.register_toolchain(frozen_toolchain(label));
        ctx.register_toolchain(frozen_toolchain(label));
    }

    #[test]
    fn test_lazy_materialization_runs_factory_once() {
        let ctx = test_context();
        let label = Label::new("//tc/", "msvc", "//tc/", "msvc");

        let first = ctx.toolchain_or_register(label, || frozen_toolchain(label));
        let second = ctx.toolchain_or_register(label, || panic!("factory must not rerun"));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    #[should_panic(expected = "before setup_complete")]
    fn test_register_unfrozen_panics() {
        let ctx = test_context();
        let label = Label::new("//tc/", "gcc", "//tc/", "gcc");
        ctx.register_toolchain(Toolchain::new(label));
    }
}
