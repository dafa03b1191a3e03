use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use assayer::domain::{Assessment, FindingStatus, Profile, ReportFormat};
use assayer::ports::CancelToken;
use assayer::{
    AssayerConfig, AuditRequest, audit, build_registry, cluster_controller, cluster_ports,
    reconciler_settings,
};

#[derive(Parser)]
#[command(name = "assayer", version, about = "Kubernetes cluster assessments")]
struct Cli {
    /// Configuration file; defaults to $ASSAYER_CONFIG_PATH, then ~/.assayer/config.yaml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Kubeconfig context, overriding the configuration file.
    #[arg(long, global = true, env = "ASSAYER_KUBE_CONTEXT")]
    context: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single assessment now and print the result.
    Audit(AuditArgs),
    /// Reconcile Assessment resources until interrupted.
    Controller,
    /// List registered validators.
    Validators,
    /// List built-in profiles.
    Profiles,
}

#[derive(Args)]
struct AuditArgs {
    #[arg(long, default_value = "on-demand")]
    name: String,
    #[arg(long, default_value = "")]
    profile: String,
    /// Validators to run; all of them when omitted.
    #[arg(long, value_delimiter = ',')]
    validators: Vec<String>,
    #[arg(long, default_value = "")]
    min_severity: String,
    /// Report formats to store in the configured reports directory.
    #[arg(long, value_delimiter = ',')]
    report: Vec<ReportArg>,
    #[arg(long, value_enum, default_value_t = Output::Summary)]
    output: Output,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportArg {
    Json,
    Html,
    Pdf,
}

impl From<ReportArg> for ReportFormat {
    fn from(arg: ReportArg) -> Self {
        match arg {
            ReportArg::Json => ReportFormat::Json,
            ReportArg::Html => ReportFormat::Html,
            ReportArg::Pdf => ReportFormat::Pdf,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Summary,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(AssayerConfig::default_path);
    let mut config = AssayerConfig::load_from_path(&config_path)?;
    if cli.context.is_some() {
        config.kube.context = cli.context.clone();
    }

    match cli.command {
        Command::Audit(args) => run_audit(&config, args).await,
        Command::Controller => run_controller(&config).await,
        Command::Validators => list_validators(),
        Command::Profiles => {
            for name in Profile::names() {
                let profile = Profile::resolve(name);
                println!("{:<12} {:?}", profile.name, profile.strictness);
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancels the returned token on Ctrl-C.
fn shutdown_token() -> CancelToken {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
        }
        trigger.cancel();
    });
    cancel
}

async fn run_audit(config: &AssayerConfig, args: AuditArgs) -> Result<()> {
    if !args.min_severity.is_empty() && args.min_severity.parse::<FindingStatus>().is_err() {
        warn!(min_severity = %args.min_severity, "unknown severity, reporting every finding");
    }
    let registry = build_registry()?;
    let ports = cluster_ports(config).await?;
    let cancel = shutdown_token();
    let request = AuditRequest {
        name: args.name,
        profile: args.profile,
        validators: args.validators,
        min_severity: args.min_severity,
        reports: args.report.into_iter().map(ReportFormat::from).collect(),
    };
    let assessment = audit(ports, registry, reconciler_settings(config), &cancel, request).await?;

    match args.output {
        Output::Json => {
            let rendered = serde_json::to_string_pretty(&assessment.status)
                .context("failed to encode assessment status")?;
            println!("{rendered}");
        }
        Output::Summary => print_summary(&assessment),
    }
    Ok(())
}

fn print_summary(assessment: &Assessment) {
    let status = &assessment.status;
    if let Some(info) = &status.cluster_info {
        println!(
            "Cluster: {} ({}) nodes={} namespaces={}",
            info.kubernetes_version, info.platform, info.node_count, info.namespace_count
        );
    }
    for finding in &status.findings {
        let target = finding.resource.as_deref().unwrap_or("-");
        println!(
            "{:<5} {:<14} {:<40} {}",
            finding.status.as_str(),
            finding.category,
            finding.id,
            target
        );
    }
    if let Some(summary) = &status.summary {
        println!();
        println!(
            "Checks: {}  pass={} warn={} fail={} info={}",
            summary.total_checks,
            summary.pass_count,
            summary.warn_count,
            summary.fail_count,
            summary.info_count
        );
        match summary.score {
            Some(score) => println!("Score: {score}/100 (profile {})", summary.profile_used),
            None => println!("Score: n/a (profile {})", summary.profile_used),
        }
    }
    println!("{}", status.message);
}

async fn run_controller(config: &AssayerConfig) -> Result<()> {
    let registry = build_registry()?;
    if registry.is_empty() {
        bail!("no validators registered");
    }
    let controller = cluster_controller(config, registry).await?;
    controller.run(shutdown_token()).await
}

fn list_validators() -> Result<()> {
    let registry = build_registry()?;
    for validator in registry.list() {
        println!(
            "{:<22} {:<14} {}",
            validator.name(),
            validator.category(),
            validator.description()
        );
    }
    Ok(())
}
