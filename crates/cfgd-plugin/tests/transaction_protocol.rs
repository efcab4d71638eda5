//! End-to-end tests: discovery through the transaction protocol.

use std::path::Path;
use std::sync::{Arc, Mutex};

use cfgd_core::config::{AppConfig, PluginRole};
use cfgd_plugin::prelude::*;

type CallLog = Arc<Mutex<Vec<String>>>;

/// Behaviour of one recorded hook.
#[derive(Clone, Copy)]
enum Outcome {
    Ok,
    Fail,
    Panic,
}

fn recorded(log: &CallLog, kind: HookKind, outcome: Outcome) -> HookFn {
    let log = Arc::clone(log);
    HookFn::from_sync(move |handle, _args| {
        log.lock()
            .unwrap()
            .push(format!("{}:{}", handle.name(), kind.symbol()));
        match outcome {
            Outcome::Ok => 0,
            Outcome::Fail => -1,
            Outcome::Panic => panic!("{} blew up", handle.name()),
        }
    })
}

fn full_module(log: &CallLog) -> StaticModule {
    HookKind::ALL
        .into_iter()
        .fold(StaticModule::new(), |module, kind| {
            module.on(kind, recorded(log, kind, Outcome::Ok))
        })
}

fn single(log: &CallLog, kind: HookKind, outcome: Outcome) -> StaticModule {
    StaticModule::new().on(kind, recorded(log, kind, outcome))
}

fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(format!("{name}.plugin")), b"").expect("write unit");
    }
}

fn manager(dir: &Path, loader: StaticModuleLoader) -> PluginManager {
    let mut config = AppConfig::default();
    config.plugins.backend_dir = dir.display().to_string();
    config.plugins.extension = "plugin".to_string();
    PluginManager::new(Arc::new(config), PluginRole::Backend, Arc::new(loader))
}

fn context() -> TransactionContext {
    TransactionContext::new(SnapshotRef::new("candidate"), SnapshotRef::new("running"))
}

fn drain(log: &CallLog) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

#[tokio::test]
async fn test_discovery_order_is_lexical_and_repeatable() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(dir.path(), &["zebra", "alpha", "mid"]);
    std::fs::write(dir.path().join("README.txt"), b"not a plugin").expect("write");

    let mut orders = Vec::new();
    for _ in 0..2 {
        let log = CallLog::default();
        let loader = StaticModuleLoader::new("plugin")
            .with_module("zebra", full_module(&log))
            .with_module("alpha", full_module(&log))
            .with_module("mid", full_module(&log));
        let manager = manager(dir.path(), loader);

        assert_eq!(manager.load_all().await.expect("load"), 3);
        assert_eq!(
            drain(&log),
            vec!["alpha:plugin_init", "mid:plugin_init", "zebra:plugin_init"]
        );
        orders.push(manager.registry().names().await);
    }

    assert_eq!(orders[0], vec!["alpha", "mid", "zebra"]);
    assert_eq!(orders[0], orders[1]);
}

#[tokio::test]
async fn test_init_failure_keeps_earlier_plugins() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(dir.path(), &["a", "b", "c", "d"]);

    let log = CallLog::default();
    let loader = StaticModuleLoader::new("plugin")
        .with_module("a", full_module(&log))
        .with_module("b", full_module(&log))
        .with_module("c", single(&log, HookKind::Init, Outcome::Fail))
        .with_module("d", full_module(&log));
    let manager = manager(dir.path(), loader);

    let err = manager.load_all().await.unwrap_err();
    assert!(matches!(err, PluginError::LoadFailure { ref plugin, .. } if plugin == "c"));
    assert_eq!(manager.registry().names().await, vec!["a", "b"]);
    assert!(!drain(&log).iter().any(|call| call.starts_with("d:")));
}

#[tokio::test]
async fn test_init_failure_drops_its_dependencies() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(dir.path(), &["a", "b"]);

    let log = CallLog::default();
    let registers_then_fails = StaticModule::new().on(
        HookKind::Init,
        HookFn::new(|handle: PluginHandle, _args: HookArgs| async move {
            handle
                .register_dependency(
                    DependencyKind::Validate,
                    DependencyCallback::new(|_, _| 0),
                    serde_json::Value::Null,
                    "system*",
                )
                .await
                .expect("registered while initialising");
            -1
        }),
    );
    let loader = StaticModuleLoader::new("plugin")
        .with_module("a", full_module(&log))
        .with_module("b", registers_then_fails);
    let manager = manager(dir.path(), loader);

    let err = manager.load_all().await.unwrap_err();
    assert!(matches!(err, PluginError::LoadFailure { ref plugin, .. } if plugin == "b"));
    assert_eq!(manager.registry().names().await, vec!["a"]);

    let dependencies = manager.host().dependencies();
    assert!(dependencies.lookup_for_key("system.x").await.is_empty());
    assert!(dependencies.entries_for("b").await.is_empty());
    assert_eq!(dependencies.len().await, 0);
}

/// Drives `ctx` up to, but not including, `phase`.
async fn advance_to(
    orchestrator: &TransactionOrchestrator,
    ctx: &mut TransactionContext,
    phase: HookKind,
) {
    if phase == HookKind::Begin {
        return;
    }
    orchestrator.begin(ctx).await.expect("begin");
    if phase == HookKind::End {
        orchestrator.complete(ctx).await.expect("complete");
    }
}

async fn run_phase(
    orchestrator: &TransactionOrchestrator,
    ctx: &mut TransactionContext,
    phase: HookKind,
) -> Result<PhaseReport, TransactionError> {
    match phase {
        HookKind::Begin => orchestrator.begin(ctx).await,
        HookKind::Complete => orchestrator.complete(ctx).await,
        HookKind::End => orchestrator.end(ctx).await,
        other => unreachable!("{other} is not a vetoing transaction phase"),
    }
}

#[tokio::test]
async fn test_failing_middle_plugin_stops_every_vetoing_phase() {
    let phases = [HookKind::Begin, HookKind::Complete, HookKind::End];
    let outcomes = [Outcome::Fail, Outcome::Panic];

    for phase in phases {
        for outcome in outcomes {
            let dir = tempfile::tempdir().expect("tempdir");
            touch(dir.path(), &["a", "b", "c"]);

            let log = CallLog::default();
            let loader = StaticModuleLoader::new("plugin")
                .with_module("a", full_module(&log))
                .with_module("b", single(&log, phase, outcome))
                .with_module("c", full_module(&log));
            let manager = manager(dir.path(), loader);
            manager.load_all().await.expect("load");

            let orchestrator = manager.orchestrator();
            let mut ctx = context();
            advance_to(&orchestrator, &mut ctx, phase).await;
            drain(&log);

            let err = run_phase(&orchestrator, &mut ctx, phase).await.unwrap_err();
            match (&err, outcome) {
                (
                    TransactionError::PhaseFailed {
                        phase: failed,
                        source: PluginError::FatalFault { plugin, hook, .. },
                    },
                    Outcome::Panic,
                ) => {
                    assert_eq!(*failed, phase);
                    assert_eq!(plugin, "b");
                    assert_eq!(*hook, phase);
                }
                (
                    TransactionError::PhaseFailed {
                        phase: failed,
                        source: PluginError::HookFailure { plugin, .. },
                    },
                    Outcome::Fail,
                ) => {
                    assert_eq!(*failed, phase);
                    assert_eq!(plugin, "b");
                }
                _ => panic!("unexpected {phase} error: {err}"),
            }

            let symbol = phase.symbol();
            assert_eq!(
                drain(&log),
                vec![format!("a:{symbol}"), format!("b:{symbol}")],
                "c must not run after b fails {symbol}"
            );
        }
    }
}

#[tokio::test]
async fn test_begin_veto_stops_later_plugins() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(dir.path(), &["a", "b", "c"]);

    let log = CallLog::default();
    let loader = StaticModuleLoader::new("plugin")
        .with_module("a", full_module(&log))
        .with_module("b", single(&log, HookKind::Begin, Outcome::Fail))
        .with_module("c", full_module(&log));
    let manager = manager(dir.path(), loader);
    manager.load_all().await.expect("load");
    drain(&log);

    let orchestrator = manager.orchestrator();
    let mut ctx = context();
    let err = orchestrator.begin(&mut ctx).await.unwrap_err();

    assert!(matches!(err, TransactionError::PhaseFailed { phase: HookKind::Begin, .. }));
    assert_eq!(err.plugin(), Some("b"));
    assert_eq!(drain(&log), vec!["a:transaction_begin", "b:transaction_begin"]);
    assert_eq!(ctx.phase(), TransactionPhase::Began);
}

#[tokio::test]
async fn test_abort_reaches_every_plugin_despite_failures() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(dir.path(), &["a", "b", "c"]);

    let log = CallLog::default();
    let loader = StaticModuleLoader::new("plugin")
        .with_module("a", single(&log, HookKind::Abort, Outcome::Fail))
        .with_module("b", single(&log, HookKind::Abort, Outcome::Panic))
        .with_module("c", single(&log, HookKind::Abort, Outcome::Ok));
    let manager = manager(dir.path(), loader);
    manager.load_all().await.expect("load");

    let orchestrator = manager.orchestrator();
    let mut ctx = context();
    orchestrator.begin(&mut ctx).await.expect("begin");
    let report = orchestrator.abort(&mut ctx).await.expect("abort never fails");

    assert_eq!(
        drain(&log),
        vec!["a:transaction_abort", "b:transaction_abort", "c:transaction_abort"]
    );
    assert_eq!(report.suppressed.len(), 2);
    assert!(matches!(report.suppressed[1].error, PluginError::FatalFault { .. }));
    assert_eq!(ctx.phase(), TransactionPhase::Aborted);
}

#[tokio::test]
async fn test_missing_complete_hook_is_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(dir.path(), &["a", "b"]);

    let log = CallLog::default();
    let loader = StaticModuleLoader::new("plugin")
        .with_module("a", StaticModule::new())
        .with_module("b", single(&log, HookKind::Complete, Outcome::Ok));
    let manager = manager(dir.path(), loader);
    manager.load_all().await.expect("load");

    let orchestrator = manager.orchestrator();
    let mut ctx = context();
    orchestrator.begin(&mut ctx).await.expect("begin");
    let report = orchestrator.complete(&mut ctx).await.expect("complete");

    assert_eq!(report.skipped, vec!["a"]);
    assert_eq!(report.invoked, vec!["b"]);
    assert_eq!(drain(&log), vec!["b:transaction_complete"]);
}

#[tokio::test]
async fn test_dependency_registration_uses_caller_identity() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(dir.path(), &["routing"]);

    let module = StaticModule::new().on(
        HookKind::Init,
        HookFn::new(|handle: PluginHandle, _args: HookArgs| async move {
            handle
                .register_dependency(
                    DependencyKind::Commit,
                    DependencyCallback::new(|_, _| 0),
                    serde_json::json!({"table": "main"}),
                    "routes[].next_hop*",
                )
                .await
                .is_ok()
        }),
    );
    let loader = StaticModuleLoader::new("plugin").with_module("routing", module);
    let manager = manager(dir.path(), loader);
    manager.load_all().await.expect("load");

    let dependencies = manager.host().dependencies();
    let matches = dependencies.lookup_for_key("routes.0.next_hop.2").await;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].plugin, "routing");

    let stray = manager.host().handle("ghost");
    let err = stray
        .register_dependency(
            DependencyKind::Validate,
            DependencyCallback::new(|_, _| 0),
            serde_json::Value::Null,
            "system*",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::UnknownCaller { ref caller } if caller == "ghost"));
    assert_eq!(dependencies.len().await, 1);
}

#[tokio::test]
async fn test_transaction_sequence_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(dir.path(), &["a", "b", "c"]);

    let log = CallLog::default();
    let loader = StaticModuleLoader::new("plugin")
        .with_module("a", full_module(&log))
        .with_module("b", StaticModule::new())
        .with_module("c", full_module(&log));
    let manager = manager(dir.path(), loader);
    manager.load_all().await.expect("load");
    drain(&log);

    let orchestrator = manager.orchestrator();
    let mut runs = Vec::new();
    for _ in 0..2 {
        let mut first = context();
        orchestrator.begin(&mut first).await.expect("begin");
        orchestrator.abort(&mut first).await.expect("abort");

        let mut second = context();
        orchestrator.begin(&mut second).await.expect("begin");
        orchestrator.complete(&mut second).await.expect("complete");
        orchestrator.end(&mut second).await.expect("end");
        assert_eq!(second.phase(), TransactionPhase::Ended);
        assert_ne!(first.id(), second.id());

        runs.push(drain(&log));
    }

    assert_eq!(runs[0].len(), 10);
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn test_out_of_order_phases_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(dir.path(), &["a"]);

    let log = CallLog::default();
    let manager = manager(
        dir.path(),
        StaticModuleLoader::new("plugin").with_module("a", full_module(&log)),
    );
    manager.load_all().await.expect("load");
    drain(&log);

    let orchestrator = manager.orchestrator();
    let mut ctx = context();

    let err = orchestrator.end(&mut ctx).await.unwrap_err();
    assert!(matches!(
        err,
        TransactionError::InvalidTransition {
            from: TransactionPhase::NotStarted,
            phase: HookKind::End,
        }
    ));
    assert!(drain(&log).is_empty());

    orchestrator.begin(&mut ctx).await.expect("begin");
    assert!(orchestrator.begin(&mut ctx).await.is_err());
    assert!(orchestrator.end(&mut ctx).await.is_err());
    assert_eq!(drain(&log), vec!["a:transaction_begin"]);
}
