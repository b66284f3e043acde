//! Run lifecycle controller.
//!
//! Owns the pipeline state, serializes stage runs and emits events for presentation layers.

use super::state::PipelineState;
use crate::engine::service::BiasService;
use crate::engine::{PipelineError, StageExecutor, StageOutput};
use crate::model::{PipelineEvent, PipelineInput, Stage};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// Run `stage` with the input as currently shown in the UI.
    Run { stage: Stage, input: PipelineInput },
    Quit,
}

/// Handle for the stage currently in flight.
struct RunCtx {
    stage: Stage,
    handle: Option<JoinHandle<Result<StageOutput, PipelineError>>>,
}

fn now_utc() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Serve UI commands until quit, running at most one stage at a time.
///
/// Returns the final pipeline state once the in-flight stage (if any) has finished.
pub(crate) async fn run_controller<S>(
    mut state: PipelineState,
    executor: Arc<StageExecutor<S>>,
    event_tx: UnboundedSender<PipelineEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> PipelineState
where
    S: BiasService + 'static,
{
    let mut run_ctx: Option<RunCtx> = None;
    let mut quit_pending = false;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv(), if !quit_pending => {
                match cmd {
                    Some(UiCommand::Run { stage, input }) => {
                        // Rejected, not queued: a request made while busy drops its input edit too.
                        if run_ctx.is_none() {
                            state.set_input(input);
                        }
                        match state.begin(stage) {
                            Ok(req) => {
                                let _ = event_tx.send(PipelineEvent::StageStarted { stage });
                                let exec = executor.clone();
                                let handle = tokio::spawn(async move { exec.run(req).await });
                                run_ctx = Some(RunCtx { stage, handle: Some(handle) });
                            }
                            Err(e) => {
                                let _ = event_tx.send(PipelineEvent::Rejected {
                                    stage,
                                    message: e.to_string(),
                                });
                            }
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        // Quit waits for the in-flight stage so its outcome is committed.
                        quit_pending = true;
                        if run_ctx.is_none() {
                            break;
                        }
                        let _ = event_tx.send(PipelineEvent::Info(
                            "Waiting for the running stage to finish…".into(),
                        ));
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            maybe_done = async {
                if let Some(ctx) = &mut run_ctx {
                    if let Some(h) = ctx.handle.as_mut() {
                        return Some(h.await);
                    }
                }
                futures::future::pending().await
            } => {
                let Some(join_res) = maybe_done else { continue };
                let Some(ctx) = run_ctx.take() else { continue };
                let stage = ctx.stage;
                match join_res {
                    Ok(Ok(output)) => {
                        let result = state.complete(output).clone();
                        let _ = event_tx.send(PipelineEvent::StageCompleted {
                            stage,
                            result: Box::new(result),
                            completed_at: now_utc(),
                        });
                    }
                    Ok(Err(e)) => {
                        state.fail();
                        tracing::warn!(%stage, error = %e, "stage failed");
                        let _ = event_tx.send(PipelineEvent::StageFailed {
                            stage,
                            message: e.to_string(),
                        });
                    }
                    Err(e) => {
                        state.fail();
                        let _ = event_tx.send(PipelineEvent::StageFailed {
                            stage,
                            message: format!("Stage task failed: {e}"),
                        });
                    }
                }
                if quit_pending {
                    break;
                }
            }
        }
    }

    state
}
