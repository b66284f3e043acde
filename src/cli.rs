use crate::engine::service::HttpBiasService;
use crate::model::{PipelineInput, ServiceConfig, Stage};
use crate::orchestrator::Pipeline;
use crate::report;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "bias-analyzer",
    version,
    about = "Drive a web page through the bias analysis pipeline"
)]
pub struct Cli {
    /// Base URL of the analysis service
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// Page to analyze
    #[arg(long)]
    pub url: Option<String>,

    /// Ask the service to fetch the page with a headless browser
    #[arg(long)]
    pub use_selenium: bool,

    /// Stage to run; repeat to run several in order (text/JSON modes)
    #[arg(long = "stage", value_enum)]
    pub stages: Vec<Stage>,

    /// Print JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text result and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Per-request timeout, e.g. 90s. Unbounded when omitted.
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// User-Agent header sent to the service
    #[arg(long)]
    pub user_agent: Option<String>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !self.json && !self.text
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!("--json and --text are mutually exclusive"));
    }

    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    if args.json {
        return run_json(args).await;
    }

    run_text(args).await
}

/// Build a `ServiceConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ServiceConfig {
    ServiceConfig {
        base_url: args.base_url.clone(),
        user_agent: args
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("bias-analyzer/{}", env!("CARGO_PKG_VERSION"))),
        request_timeout: args.timeout.map(Duration::from),
    }
}

pub fn build_input(args: &Cli) -> PipelineInput {
    PipelineInput::new(args.url.clone().unwrap_or_default(), args.use_selenium)
}

/// Stages for the non-interactive modes; bias analysis when none were given.
pub fn requested_stages(args: &Cli) -> Vec<Stage> {
    if args.stages.is_empty() {
        vec![Stage::AnalyzeBias]
    } else {
        args.stages.clone()
    }
}

fn build_pipeline(args: &Cli) -> Result<Pipeline<HttpBiasService>> {
    let cfg = build_config(args);
    tracing::debug!(base_url = %cfg.base_url, timeout = ?cfg.request_timeout, "service config");
    let service = HttpBiasService::new(&cfg).context("failed to set up service client")?;
    Ok(Pipeline::new(service, build_input(args)))
}

async fn run_text(args: Cli) -> Result<()> {
    let mut pipeline = build_pipeline(&args)?;
    let (out_tx, out_handle) = spawn_output_writer();

    let mut outcome = Ok(());
    for stage in requested_stages(&args) {
        let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", stage.title())));
        match pipeline.run(stage).await {
            Ok(result) => {
                let model = report::project(result);
                let _ = out_tx.send(OutputLine::Stdout(format!(
                    "== Result: {} ==",
                    stage.as_id().to_uppercase()
                )));
                for line in report::render_lines(&model) {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }
            Err(e) => {
                outcome = Err::<(), _>(e).with_context(|| format!("stage {stage} failed"));
                break;
            }
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    outcome
}

async fn run_json(args: Cli) -> Result<()> {
    let mut pipeline = build_pipeline(&args)?;

    for stage in requested_stages(&args) {
        pipeline
            .run(stage)
            .await
            .with_context(|| format!("stage {stage} failed"))?;
    }

    let state = pipeline.state();
    let doc = serde_json::json!({
        "active_stage": state.active_stage(),
        "input": state.input(),
        "result": state.result(),
        "view": state.result().map(report::project),
        "artifacts": state.artifacts(),
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(argv: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bias-analyzer").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_point_at_local_service() {
        let args = parse(&[]);
        let cfg = build_config(&args);
        assert_eq!(cfg.base_url, "http://127.0.0.1:8000");
        assert_eq!(cfg.request_timeout, None);
        assert!(cfg.user_agent.starts_with("bias-analyzer/"));
        assert!(args.is_interactive());
        assert_eq!(requested_stages(&args), vec![Stage::AnalyzeBias]);
    }

    #[test]
    fn stages_keep_command_line_order() {
        let args = parse(&[
            "--text",
            "--url",
            "http://example.com",
            "--stage",
            "enhance",
            "--stage",
            "analyze-enhanced",
            "--use-selenium",
            "--timeout",
            "90s",
        ]);
        assert_eq!(
            requested_stages(&args),
            vec![Stage::EnhanceText, Stage::AnalyzeEnhanced]
        );
        assert_eq!(
            build_input(&args),
            PipelineInput::new("http://example.com", true)
        );
        assert_eq!(
            build_config(&args).request_timeout,
            Some(Duration::from_secs(90))
        );
        assert!(!args.is_interactive());
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let res = Cli::try_parse_from(["bias-analyzer", "--stage", "summarize"]);
        assert!(res.is_err());
    }
}
