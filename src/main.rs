use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use staffflow_adapter::AdapterRegistry;
use staffflow_config::{Capability, NotificationSettings, Settings, StepCatalog, WorkflowType};
use staffflow_orchestrator::{
  NoopSender, NotificationSender, Orchestrator, OrchestratorConfig, WebhookSender,
};
use staffflow_store::{NewRequest, RequestStatus, SqliteStore};

/// Staffflow - onboarding and offboarding orchestration
#[derive(Parser)]
#[command(name = "staffflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.staffflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Settings file (default: <data-dir>/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Database URL, overriding the settings file
  #[arg(long, global = true, env = "STAFFFLOW_DATABASE_URL")]
  database_url: Option<String>,

  /// Workflow catalog JSON, overriding the built-in definitions
  #[arg(long, global = true)]
  workflows: Option<PathBuf>,

  /// Log at debug level
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Create the data directory, default settings and database
  Init,

  /// Create a new onboarding/offboarding request
  Create {
    /// Workflow type, e.g. onboarding or offboarding
    #[arg(long = "type")]
    workflow_type: String,

    #[arg(long)]
    name: String,

    #[arg(long)]
    position: String,

    #[arg(long)]
    section: String,

    /// Effective date (YYYY-MM-DD)
    #[arg(long)]
    date: NaiveDate,

    /// Capabilities to grant or revoke (default: all)
    #[arg(long, value_delimiter = ',')]
    access: Vec<Capability>,

    #[arg(long)]
    personal_email: Option<String>,

    #[arg(long)]
    mobile: Option<String>,

    #[arg(long)]
    fixed_line: Option<String>,

    /// Existing directory account, for offboarding
    #[arg(long)]
    directory_email: Option<String>,

    #[arg(long, env = "STAFFFLOW_ACTOR", default_value = "cli")]
    by: String,
  },

  /// Start a pending request
  Start { request_id: i64 },

  /// Continue an interrupted request
  Resume { request_id: i64 },

  /// Show a request with its steps and activity
  Show { request_id: i64 },

  /// List requests
  List {
    /// Only requests in this status
    #[arg(long)]
    status: Option<RequestStatus>,
  },

  /// List manual tasks awaiting a human
  Tasks,

  /// Complete a manual task
  Complete {
    step_id: i64,

    #[arg(long)]
    notes: String,

    #[arg(long, env = "STAFFFLOW_ACTOR")]
    by: String,
  },

  /// Re-run a failed automatable step
  Retry {
    step_id: i64,

    #[arg(long, env = "STAFFFLOW_ACTOR")]
    by: String,
  },

  /// Mark a manual step as not applicable
  Skip {
    step_id: i64,

    #[arg(long)]
    reason: String,

    #[arg(long, env = "STAFFFLOW_ACTOR")]
    by: String,
  },

  /// List the configured workflow types and their steps
  Workflows,
}

type CliOrchestrator = Orchestrator<SqliteStore, Arc<dyn NotificationSender>>;

fn main() -> Result<()> {
  let mut cli = Cli::parse();

  let filter = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let Some(command) = cli.command.take() else {
    println!("staffflow - use --help to see available commands");
    return Ok(());
  };

  let data_dir = match &cli.data_dir {
    Some(dir) => dir.clone(),
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".staffflow"),
  };
  let config_path = cli
    .config
    .clone()
    .unwrap_or_else(|| data_dir.join("config.json"));

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run(&cli, command, &data_dir, &config_path).await })
}

async fn run(cli: &Cli, command: Commands, data_dir: &Path, config_path: &Path) -> Result<()> {
  if let Commands::Init = command {
    return init(cli, data_dir, config_path).await;
  }

  let settings = Settings::load_or_default(config_path)
    .with_context(|| format!("failed to load settings: {}", config_path.display()))?;
  let catalog = load_catalog(cli, &settings)?;

  if let Commands::Workflows = command {
    let workflows: Vec<_> = catalog
      .workflow_types()
      .into_iter()
      .filter_map(|t| catalog.get(t))
      .collect();
    return print_json(&workflows);
  }

  let orch = build_orchestrator(cli, &settings, data_dir, catalog).await?;

  match command {
    Commands::Create {
      workflow_type,
      name,
      position,
      section,
      date,
      access,
      personal_email,
      mobile,
      fixed_line,
      directory_email,
      by,
    } => {
      let access = if access.is_empty() {
        Capability::ALL.to_vec()
      } else {
        access
      };
      let request = NewRequest {
        workflow_type: WorkflowType::new(workflow_type),
        full_name: name,
        position,
        section,
        effective_date: date,
        personal_email,
        mobile,
        fixed_line,
        access,
        directory_email,
      };
      let request_id = orch
        .create_request(request, &by)
        .await
        .context("failed to create request")?;
      print_json(&json!({ "request_id": request_id }))
    }
    Commands::Start { request_id } => {
      let result = orch
        .start(request_id)
        .await
        .with_context(|| format!("failed to start request {request_id}"))?;
      print_json(&result)
    }
    Commands::Resume { request_id } => {
      let result = orch
        .resume(request_id)
        .await
        .with_context(|| format!("failed to resume request {request_id}"))?;
      print_json(&result)
    }
    Commands::Show { request_id } => {
      let detail = orch
        .get_request(request_id)
        .await
        .with_context(|| format!("failed to load request {request_id}"))?;
      print_json(&detail)
    }
    Commands::List { status } => print_json(&orch.list_requests(status).await?),
    Commands::Tasks => print_json(&orch.list_pending_manual_tasks().await?),
    Commands::Complete { step_id, notes, by } => {
      let step = orch
        .complete_manual_task(step_id, &notes, &by)
        .await
        .with_context(|| format!("failed to complete step {step_id}"))?;
      print_json(&step)
    }
    Commands::Retry { step_id, by } => {
      let step = orch
        .retry_step(step_id, &by)
        .await
        .with_context(|| format!("failed to retry step {step_id}"))?;
      print_json(&step)
    }
    Commands::Skip {
      step_id,
      reason,
      by,
    } => {
      let step = orch
        .skip_step(step_id, &reason, &by)
        .await
        .with_context(|| format!("failed to skip step {step_id}"))?;
      print_json(&step)
    }
    Commands::Init | Commands::Workflows => Ok(()),
  }
}

async fn init(cli: &Cli, data_dir: &Path, config_path: &Path) -> Result<()> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  if !config_path.exists() {
    let content = serde_json::to_string_pretty(&Settings::default())?;
    tokio::fs::write(config_path, content)
      .await
      .with_context(|| format!("failed to write settings: {}", config_path.display()))?;
    info!(path = %config_path.display(), "wrote default settings");
  }

  let settings = Settings::load(config_path)
    .with_context(|| format!("failed to load settings: {}", config_path.display()))?;
  let database_url = database_url(cli, &settings, data_dir);
  open_store(&database_url).await?;

  print_json(&json!({
    "data_dir": data_dir,
    "config": config_path,
    "database_url": database_url,
  }))
}

fn load_catalog(cli: &Cli, settings: &Settings) -> Result<StepCatalog> {
  match cli.workflows.as_ref().or(settings.workflows_file.as_ref()) {
    Some(path) => StepCatalog::load(path)
      .with_context(|| format!("failed to load workflows: {}", path.display())),
    None => Ok(StepCatalog::builtin()),
  }
}

fn database_url(cli: &Cli, settings: &Settings, data_dir: &Path) -> String {
  cli
    .database_url
    .clone()
    .or_else(|| settings.database_url.clone())
    .unwrap_or_else(|| format!("sqlite://{}", data_dir.join("staffflow.db").display()))
}

async fn open_store(database_url: &str) -> Result<SqliteStore> {
  let store = SqliteStore::connect(database_url)
    .await
    .with_context(|| format!("failed to open database: {database_url}"))?;
  store.migrate().await.context("failed to run migrations")?;
  Ok(store)
}

async fn build_orchestrator(
  cli: &Cli,
  settings: &Settings,
  data_dir: &Path,
  catalog: StepCatalog,
) -> Result<CliOrchestrator> {
  if cli.database_url.is_none() && settings.database_url.is_none() {
    tokio::fs::create_dir_all(data_dir)
      .await
      .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
  }
  let store = open_store(&database_url(cli, settings, data_dir)).await?;

  let adapters =
    AdapterRegistry::from_settings(&settings.adapters).context("invalid adapter settings")?;
  info!(backends = ?adapters.names(), "adapters configured");

  let sender: Arc<dyn NotificationSender> = match &settings.notification {
    NotificationSettings::None => Arc::new(NoopSender),
    NotificationSettings::Webhook { url } => {
      let timeout = Duration::from_millis(settings.notification_timeout_ms);
      Arc::new(WebhookSender::new(url.clone(), timeout).context("invalid webhook settings")?)
    }
  };

  Ok(
    Orchestrator::new(store, Arc::new(catalog), adapters)
      .with_config(OrchestratorConfig::from(settings))
      .with_sender(sender),
  )
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
