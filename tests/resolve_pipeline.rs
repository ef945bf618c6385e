//! End-to-end resolution scenarios: declarations in, resolved graph out.

use slipway::{
    generate_all, generate_target, resume_target, BuildContext, BuildSettings, Declaration,
    DepKind, GenerateOutcome, Label, Origin, OutputType, Scope, SourceDir, Tool, ToolType,
    Toolchain, Value,
};

fn init_logging() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

fn default_toolchain() -> Label {
    Label::new("//build/toolchain/", "gcc", "//build/toolchain/", "gcc")
}

fn context() -> BuildContext {
    init_logging();
    BuildContext::new(BuildSettings::new(
        "/home/me/project",
        "//out/Default/",
        default_toolchain(),
    ))
}

fn scope_in(dir: &str) -> Scope {
    Scope::new(SourceDir::new(dir), default_toolchain())
}

fn decl(target_type: &str, name: &str) -> Declaration {
    Declaration {
        target_type: target_type.to_string(),
        args: vec![Value::string(name, Origin::synthetic())],
        origin: Origin::new("//app/BUILD.sw", 1, 1),
    }
}

fn string_list(items: &[&str]) -> Value {
    Value::list(
        items
            .iter()
            .map(|s| Value::string(*s, Origin::synthetic()))
            .collect(),
        Origin::synthetic(),
    )
}

fn resolve(outcome: GenerateOutcome) -> std::sync::Arc<slipway::Target> {
    match outcome {
        GenerateOutcome::Resolved(target) => target,
        GenerateOutcome::Deferred(target) => {
            panic!("unexpected deferral of {}", target.label())
        }
    }
}

#[test]
fn static_library_with_deferred_dep_resolves_on_resume() {
    let ctx = context();

    // The library names a dependency and an opaque source list; the first
    // pass records the dependency edge and defers.
    let mut scope = scope_in("//lib/");
    scope.set("sources", string_list(&["net.c", "net.h"]));
    scope.set("extra_cflags", Value::opaque("platform_flags", Origin::synthetic()));
    scope.set("deps", string_list(&["//base:strings"]));

    let GenerateOutcome::Deferred(deferred) =
        generate_target(&ctx, &mut scope, &decl("static_library", "net")).unwrap()
    else {
        panic!("expected deferral");
    };
    assert!(ctx.graph().is_empty());
    assert_eq!(deferred.private_deps().len(), 1);

    // The dependency itself resolves normally.
    let mut dep_scope = scope_in("//base/");
    dep_scope.set("sources", string_list(&["strings.c"]));
    resolve(generate_target(&ctx, &mut dep_scope, &decl("static_library", "strings")).unwrap());

    // Resuming with the opaque value resolved completes the library.
    let net = resolve(
        resume_target(&ctx, deferred, |opaque| {
            (opaque.reference.as_str() == "platform_flags")
                .then(|| string_list(&["-DPOSIX"]))
        })
        .unwrap(),
    );

    assert_eq!(net.sources().len(), 2);
    assert_eq!(ctx.graph().len(), 2);

    // The graph orders the dependency before the dependent.
    let order = ctx.graph().resolution_order().unwrap();
    let pos = |name: &str| {
        order
            .iter()
            .position(|l| l.name().as_str() == name)
            .unwrap()
    };
    assert!(pos("strings") < pos("net"));

    let dep_graph = ctx.graph().dependency_graph();
    assert_eq!(dep_graph.edge_count(), 1);
    assert!(dep_graph.edge_weights().all(|k| *k == DepKind::Private));
}

#[test]
fn fully_literal_declaration_resolves_in_one_pass() {
    let ctx = context();
    let mut scope = scope_in("//app/");
    scope.set("sources", string_list(&["main.c"]));
    scope.set("output_name", Value::string("app64", Origin::synthetic()));

    let target = resolve(generate_target(&ctx, &mut scope, &decl("executable", "app")).unwrap());
    assert!(target.definition_snapshot().is_none());
    assert_eq!(target.output_name(), "app64");
    assert_eq!(ctx.graph().len(), 1);
}

#[test]
fn copy_target_final_output_uses_the_stamp_tool() {
    let ctx = context();
    let tc_label = default_toolchain();

    let mut toolchain = Toolchain::new(tc_label);
    toolchain.set_tool(Tool::new(ToolType::Copy));
    toolchain.set_tool(Tool::new(ToolType::Stamp));
    toolchain.setup_complete();
    let toolchain = ctx.register_toolchain(toolchain);

    let mut scope = scope_in("//app/");
    scope.set("sources", string_list(&["a.txt", "b.txt"]));
    scope.set(
        "outputs",
        string_list(&["{{target_out_dir}}/{{source_file_part}}"]),
    );

    let target = resolve(generate_target(&ctx, &mut scope, &decl("copy", "assets")).unwrap());
    assert_eq!(target.output_type(), OutputType::Copy);

    // A copy's single logical output is the completion stamp, even with a
    // copy tool configured.
    let tool = toolchain.tool_for_target_final_output(&target).unwrap();
    assert_eq!(tool.tool_type(), ToolType::Stamp);
}

#[test]
fn containment_violation_aborts_without_touching_the_graph() {
    let ctx = context();
    let mut scope = scope_in("//app/");
    scope.set("sources", string_list(&["a.txt"]));
    scope.set("outputs", string_list(&["../outside/file.txt"]));

    let err = generate_target(&ctx, &mut scope, &decl("copy", "leak")).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("not inside the output directory"));
    assert!(ctx.graph().is_empty());
}

#[test]
fn unknown_target_type_reports_and_leaves_graph_empty() {
    let ctx = context();
    let err = generate_target(
        &ctx,
        &mut scope_in("//app/"),
        &decl("not_a_real_type", "x"),
    )
    .unwrap_err();

    assert!(err.to_string().contains("not_a_real_type"));
    assert!(ctx.graph().is_empty());
}

#[test]
fn parallel_batch_matches_sequential_resolution() {
    let sequential_ctx = context();
    let parallel_ctx = context();

    let build = |dir: &str, name: &str, dep: Option<&str>| {
        let mut scope = scope_in(dir);
        scope.set("sources", string_list(&["impl.c"]));
        if let Some(dep) = dep {
            scope.set("deps", string_list(&[dep]));
        }
        (scope, decl("static_library", name))
    };

    let declarations = vec![
        build("//a/", "a", Some("//b:b")),
        build("//b/", "b", Some("//c:c")),
        build("//c/", "c", None),
        build("//d/", "d", None),
    ];

    for (mut scope, declaration) in declarations.clone() {
        resolve(generate_target(&sequential_ctx, &mut scope, &declaration).unwrap());
    }

    let outcomes = generate_all(&parallel_ctx, declarations);
    assert_eq!(outcomes.len(), 4);
    for outcome in outcomes {
        resolve(outcome.unwrap());
    }

    assert_eq!(parallel_ctx.graph().len(), sequential_ctx.graph().len());
    let sequential: Vec<_> = sequential_ctx
        .graph()
        .targets()
        .iter()
        .map(|t| t.label())
        .collect();
    let parallel: Vec<_> = parallel_ctx
        .graph()
        .targets()
        .iter()
        .map(|t| t.label())
        .collect();
    assert_eq!(sequential, parallel);
}

#[test]
fn write_data_and_action_coexist_in_one_graph() {
    let ctx = context();

    let mut scope = scope_in("//gen/");
    scope.set("outputs", string_list(&["//out/Default/gen/flags.json"]));
    scope.set("contents", string_list(&["fast", "small"]));
    scope.set("output_conversion", Value::string("json", Origin::synthetic()));
    resolve(generate_target(&ctx, &mut scope, &decl("write_data", "flags")).unwrap());

    let mut scope = scope_in("//gen/");
    scope.set("script", Value::string("stamp.py", Origin::synthetic()));
    scope.set("outputs", string_list(&["{{target_gen_dir}}/stamp"]));
    scope.set("deps", string_list(&["//gen:flags"]));
    resolve(generate_target(&ctx, &mut scope, &decl("action", "stamp")).unwrap());

    assert_eq!(ctx.graph().len(), 2);
    let order = ctx.graph().resolution_order().unwrap();
    assert_eq!(order.len(), 2);
    assert_eq!(order[0].name().as_str(), "flags");
    assert_eq!(order[1].name().as_str(), "stamp");
}
