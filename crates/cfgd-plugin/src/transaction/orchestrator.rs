//! Transaction orchestrator — drives begin, complete, end and abort across
//! every registered plugin.
//!
//! The orchestrator never rolls back on its own: when `begin`, `complete` or
//! `end` fails, the driver decides whether to call
//! [`TransactionOrchestrator::abort`].

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use cfgd_core::error::{AppError, ErrorKind};

use super::context::{TransactionContext, TransactionPhase};
use crate::error::PluginError;
use crate::hooks::definitions::{HookArgs, HookKind};
use crate::hooks::dispatcher::{self, PhaseReport};
use crate::host::PluginHost;

/// Errors surfaced to the transaction driver.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The phase cannot run from the context's current phase.
    #[error("cannot run {phase} while transaction is {from}")]
    InvalidTransition {
        /// Phase the context was in.
        from: TransactionPhase,
        /// Hook that was requested.
        phase: HookKind,
    },

    /// A plugin vetoed or faulted during a vetoing phase.
    #[error("{phase} failed: {source}")]
    PhaseFailed {
        /// The phase that failed.
        phase: HookKind,
        /// The plugin failure.
        #[source]
        source: PluginError,
    },
}

impl TransactionError {
    /// Returns the plugin that caused the failure, if any.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::InvalidTransition { .. } => None,
            Self::PhaseFailed { source, .. } => source.plugin(),
        }
    }
}

impl From<TransactionError> for AppError {
    fn from(err: TransactionError) -> Self {
        AppError::with_source(ErrorKind::Transaction, err.to_string(), err)
    }
}

/// Runs transaction phases against one plugin host.
///
/// Transactions are serialized by the caller; at most one is in flight.
#[derive(Debug, Clone)]
pub struct TransactionOrchestrator {
    host: Arc<PluginHost>,
}

impl TransactionOrchestrator {
    /// Creates an orchestrator over `host`'s registry.
    pub fn new(host: Arc<PluginHost>) -> Self {
        Self { host }
    }

    /// Dispatches `transaction_begin`, stopping at the first veto.
    #[instrument(
        skip(self, ctx),
        fields(transaction_id = %ctx.id(), started_at = %ctx.started_at())
    )]
    pub async fn begin(
        &self,
        ctx: &mut TransactionContext,
    ) -> Result<PhaseReport, TransactionError> {
        let allowed = [TransactionPhase::NotStarted];
        self.advance(ctx, HookKind::Begin, &allowed, TransactionPhase::Began)?;
        self.vetoing(ctx, HookKind::Begin).await
    }

    /// Dispatches `transaction_complete`, stopping at the first veto.
    #[instrument(
        skip(self, ctx),
        fields(transaction_id = %ctx.id(), started_at = %ctx.started_at())
    )]
    pub async fn complete(
        &self,
        ctx: &mut TransactionContext,
    ) -> Result<PhaseReport, TransactionError> {
        let allowed = [TransactionPhase::Began];
        self.advance(ctx, HookKind::Complete, &allowed, TransactionPhase::Completed)?;
        self.vetoing(ctx, HookKind::Complete).await
    }

    /// Dispatches `transaction_end`, stopping at the first failure.
    ///
    /// Plugins called before a failure have already finalized; nothing is
    /// undone. On failure the context stays `Completed` and may be aborted.
    #[instrument(
        skip(self, ctx),
        fields(transaction_id = %ctx.id(), started_at = %ctx.started_at())
    )]
    pub async fn end(
        &self,
        ctx: &mut TransactionContext,
    ) -> Result<PhaseReport, TransactionError> {
        Self::check(ctx, HookKind::End, &[TransactionPhase::Completed])?;
        let report = self.vetoing(ctx, HookKind::End).await?;
        ctx.set_phase(TransactionPhase::Ended);
        info!(invoked = report.invoked.len(), "Transaction ended");
        Ok(report)
    }

    /// Dispatches `transaction_abort` to every plugin that has it.
    ///
    /// Failures are logged and collected in the report, never returned.
    #[instrument(
        skip(self, ctx),
        fields(transaction_id = %ctx.id(), started_at = %ctx.started_at())
    )]
    pub async fn abort(
        &self,
        ctx: &mut TransactionContext,
    ) -> Result<PhaseReport, TransactionError> {
        self.advance(
            ctx,
            HookKind::Abort,
            &[TransactionPhase::Began, TransactionPhase::Completed],
            TransactionPhase::Aborting,
        )?;

        let args = HookArgs::Transaction(ctx.clone());
        let report = dispatcher::run_best_effort(&self.host, HookKind::Abort, args).await;
        ctx.set_phase(TransactionPhase::Aborted);

        if !report.is_clean() {
            warn!(
                failures = report.suppressed.len(),
                "Transaction aborted with suppressed failures"
            );
        } else {
            info!(invoked = report.invoked.len(), "Transaction aborted");
        }
        Ok(report)
    }

    fn check(
        ctx: &TransactionContext,
        phase: HookKind,
        allowed: &[TransactionPhase],
    ) -> Result<(), TransactionError> {
        if allowed.contains(&ctx.phase()) {
            Ok(())
        } else {
            warn!(from = %ctx.phase(), phase = %phase, "Rejected phase transition");
            Err(TransactionError::InvalidTransition {
                from: ctx.phase(),
                phase,
            })
        }
    }

    fn advance(
        &self,
        ctx: &mut TransactionContext,
        phase: HookKind,
        allowed: &[TransactionPhase],
        next: TransactionPhase,
    ) -> Result<(), TransactionError> {
        Self::check(ctx, phase, allowed)?;
        ctx.set_phase(next);
        Ok(())
    }

    async fn vetoing(
        &self,
        ctx: &TransactionContext,
        phase: HookKind,
    ) -> Result<PhaseReport, TransactionError> {
        dispatcher::run_vetoing(&self.host, phase, HookArgs::Transaction(ctx.clone()))
            .await
            .map_err(|source| TransactionError::PhaseFailed { phase, source })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::hooks::table::HookFn;
    use crate::module::StaticModule;
    use crate::plugin::Plugin;
    use crate::transaction::context::SnapshotRef;

    type CallLog = Arc<Mutex<Vec<String>>>;

    fn recording(log: &CallLog, kind: HookKind, signal: i32) -> HookFn {
        let log = Arc::clone(log);
        HookFn::from_sync(move |handle, args| {
            let phase = args.transaction().map(|ctx| ctx.phase().to_string()).unwrap_or_default();
            log.lock()
                .unwrap()
                .push(format!("{}.{}@{}", handle.name(), kind.symbol(), phase));
            signal
        })
    }

    async fn host_with(plugins: Vec<(&str, StaticModule)>) -> Arc<PluginHost> {
        let host = PluginHost::for_tests();
        for (name, module) in plugins {
            host.registry()
                .insert(Arc::new(Plugin::new(name, format!("{name}.plugin"), &module)))
                .await
                .expect("insert");
        }
        host
    }

    fn context() -> TransactionContext {
        TransactionContext::new(SnapshotRef::new("candidate"), SnapshotRef::new("running"))
    }

    #[tokio::test]
    async fn test_hooks_see_advanced_phase() {
        let log = CallLog::default();
        let module = StaticModule::new()
            .on(HookKind::Begin, recording(&log, HookKind::Begin, 0))
            .on(HookKind::Complete, recording(&log, HookKind::Complete, 0))
            .on(HookKind::End, recording(&log, HookKind::End, 0));
        let orchestrator = TransactionOrchestrator::new(host_with(vec![("ntp", module)]).await);

        let mut ctx = context();
        orchestrator.begin(&mut ctx).await.expect("begin");
        orchestrator.complete(&mut ctx).await.expect("complete");
        orchestrator.end(&mut ctx).await.expect("end");

        assert_eq!(ctx.phase(), TransactionPhase::Ended);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "ntp.transaction_begin@began",
                "ntp.transaction_complete@completed",
                "ntp.transaction_end@completed",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_end_stays_abortable() {
        let log = CallLog::default();
        let module = StaticModule::new()
            .on(HookKind::End, recording(&log, HookKind::End, -1))
            .on(HookKind::Abort, recording(&log, HookKind::Abort, 0));
        let orchestrator = TransactionOrchestrator::new(host_with(vec![("ntp", module)]).await);

        let mut ctx = context();
        orchestrator.begin(&mut ctx).await.expect("begin");
        orchestrator.complete(&mut ctx).await.expect("complete");

        let err = orchestrator.end(&mut ctx).await.unwrap_err();
        assert!(matches!(err, TransactionError::PhaseFailed { phase: HookKind::End, .. }));
        assert_eq!(err.plugin(), Some("ntp"));
        assert_eq!(ctx.phase(), TransactionPhase::Completed);

        orchestrator.abort(&mut ctx).await.expect("abort");
        assert_eq!(ctx.phase(), TransactionPhase::Aborted);
        assert_eq!(
            log.lock().unwrap().last().map(String::as_str),
            Some("ntp.transaction_abort@aborting")
        );
    }

    #[tokio::test]
    async fn test_invalid_transitions_invoke_nothing() {
        let log = CallLog::default();
        let module = StaticModule::new()
            .on(HookKind::Complete, recording(&log, HookKind::Complete, 0))
            .on(HookKind::Abort, recording(&log, HookKind::Abort, 0));
        let orchestrator = TransactionOrchestrator::new(host_with(vec![("ntp", module)]).await);

        let mut ctx = context();
        let err = orchestrator.complete(&mut ctx).await.unwrap_err();
        assert!(matches!(
            err,
            TransactionError::InvalidTransition {
                from: TransactionPhase::NotStarted,
                phase: HookKind::Complete,
            }
        ));
        assert!(orchestrator.abort(&mut ctx).await.is_err());
        assert!(orchestrator.end(&mut ctx).await.is_err());
        assert_eq!(ctx.phase(), TransactionPhase::NotStarted);
        assert!(log.lock().unwrap().is_empty());

        orchestrator.begin(&mut ctx).await.expect("begin");
        orchestrator.abort(&mut ctx).await.expect("abort");
        assert!(orchestrator.abort(&mut ctx).await.is_err());
        assert!(orchestrator.begin(&mut ctx).await.is_err());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_abort_reports_suppressed_failures() {
        let log = CallLog::default();
        let plugins = vec![
            ("a", StaticModule::new().on(HookKind::Abort, recording(&log, HookKind::Abort, -1))),
            ("b", StaticModule::new()),
            ("c", StaticModule::new().on(HookKind::Abort, recording(&log, HookKind::Abort, 0))),
        ];
        let orchestrator = TransactionOrchestrator::new(host_with(plugins).await);

        let mut ctx = context();
        orchestrator.begin(&mut ctx).await.expect("begin");
        let report = orchestrator.abort(&mut ctx).await.expect("abort");

        assert_eq!(report.invoked, vec!["a", "c"]);
        assert_eq!(report.skipped, vec!["b"]);
        assert_eq!(report.suppressed.len(), 1);
        assert_eq!(report.suppressed[0].plugin, "a");
    }

    #[test]
    fn test_error_maps_to_transaction_kind() {
        let err = TransactionError::InvalidTransition {
            from: TransactionPhase::Ended,
            phase: HookKind::Begin,
        };
        assert_eq!(err.to_string(), "cannot run transaction_begin while transaction is ended");
        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::Transaction);
    }
}
