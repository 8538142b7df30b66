use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use converge_client::{Client, ConfigOverride, ReqwestTransport};
use converge_cli::config::load_config;
use converge_core::{ApplyOptions, LifecycleParam};
use converge_engine::{compute, ResourceKind};
use eyre::Result;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "converge", about = "Declarative reconciliation for compute resources")]
struct Cli {
    /// Config file (default: <config dir>/converge/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base path
    #[arg(long, global = true)]
    base_path: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one resource
    Get(ResourceArgs),
    /// List resources under a parent (project, location, ...)
    List {
        #[command(flatten)]
        target: ResourceArgs,
        #[arg(long)]
        page_size: Option<u32>,
        /// Follow page tokens to the end
        #[arg(long)]
        all: bool,
    },
    /// Show what apply would do
    Plan {
        #[command(flatten)]
        target: ResourceArgs,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Converge one resource to the desired state
    Apply {
        #[command(flatten)]
        target: ResourceArgs,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Delete one resource
    Delete(ResourceArgs),
    /// Delete every resource under a parent
    DeleteAll {
        #[command(flatten)]
        target: ResourceArgs,
        /// Only delete resources whose name starts with this prefix
        #[arg(long)]
        name_prefix: Option<String>,
    },
}

#[derive(clap::Args)]
struct ResourceArgs {
    /// Resource type, e.g. network or compute.forwarding_rule
    resource_type: String,
    /// JSON file with the resource (or parent), `-` for stdin
    file: PathBuf,
}

#[derive(clap::Args)]
struct PolicyArgs {
    #[arg(long = "lifecycle", value_enum)]
    lifecycle: Vec<Lifecycle>,
    /// JSON file identifying the existing resource, if it differs from the desired one
    #[arg(long)]
    state_hint: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Lifecycle {
    BlockCreation,
    BlockAcquire,
    BlockModification,
    BlockDestruction,
    AllowRecreate,
}

impl From<Lifecycle> for LifecycleParam {
    fn from(value: Lifecycle) -> Self {
        match value {
            Lifecycle::BlockCreation => LifecycleParam::BlockCreation,
            Lifecycle::BlockAcquire => LifecycleParam::BlockAcquire,
            Lifecycle::BlockModification => LifecycleParam::BlockModification,
            Lifecycle::BlockDestruction => LifecycleParam::BlockDestruction,
            Lifecycle::AllowRecreate => LifecycleParam::AllowRecreate,
        }
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("failed to read {}: {e}", path.display()))?
    };
    Ok(serde_json::from_str(&contents)?)
}

fn resolve_kind(name: &str) -> Result<Box<dyn ResourceKind>> {
    compute::kind_for(name).ok_or_else(|| {
        eyre::eyre!(
            "unknown resource type {name:?}; expected one of {}",
            compute::RESOURCE_TYPES.join(", ")
        )
    })
}

fn options(policy: &PolicyArgs) -> Result<ApplyOptions> {
    let mut options = ApplyOptions::default();
    for param in &policy.lifecycle {
        options = options.with_lifecycle((*param).into());
    }
    if let Some(path) = &policy.state_hint {
        options = options.with_state_hint(read_json(path)?);
    }
    Ok(options)
}

fn print(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = load_config(cli.config.as_deref())?;
    let mut transport = ReqwestTransport::new(&config.client)?;
    if let Some(token) = config.credentials.token() {
        transport = transport.with_bearer_token(token);
    }
    let mut client = Client::new(config.client, Arc::new(transport));
    if let Some(base) = cli.base_path {
        client = client.clone_with(&[ConfigOverride::BasePath(base)]);
    }

    match cli.command {
        Command::Get(target) => {
            let kind = resolve_kind(&target.resource_type)?;
            let resource = read_json(&target.file)?;
            print(&converge_engine::get(&client, kind.as_ref(), &resource).await?)?;
        }
        Command::List { target, page_size, all } => {
            let kind = resolve_kind(&target.resource_type)?;
            let parent = read_json(&target.file)?;
            let mut page = converge_engine::list(&client, kind.as_ref(), &parent, page_size).await?;
            let mut items = std::mem::take(&mut page.items);
            while all && page.has_next() {
                page.next(&client, kind.as_ref()).await?;
                items.append(&mut page.items);
            }
            print(&items)?;
        }
        Command::Plan { target, policy } => {
            let kind = resolve_kind(&target.resource_type)?;
            let desired = read_json(&target.file)?;
            let plan =
                converge_engine::plan(&client, kind.as_ref(), &desired, &options(&policy)?).await?;
            print(&serde_json::json!({
                "addr": plan.addr,
                "action": plan.action,
                "operations": plan.operation_names(),
                "diffs": plan.diffs,
            }))?;
        }
        Command::Apply { target, policy } => {
            let kind = resolve_kind(&target.resource_type)?;
            let desired = read_json(&target.file)?;
            let outcome =
                converge_engine::apply(&client, kind.as_ref(), &desired, &options(&policy)?)
                    .await?;
            print(&outcome)?;
        }
        Command::Delete(target) => {
            let kind = resolve_kind(&target.resource_type)?;
            let resource = read_json(&target.file)?;
            converge_engine::delete(&client, kind.as_ref(), &resource).await?;
            tracing::info!(addr = %kind.addr(&resource), "deleted");
        }
        Command::DeleteAll { target, name_prefix } => {
            let kind = resolve_kind(&target.resource_type)?;
            let parent = read_json(&target.file)?;
            let prefix = name_prefix.unwrap_or_default();
            let deleted = converge_engine::delete_all(&client, kind.as_ref(), &parent, |item| {
                prefix.is_empty()
                    || item
                        .get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|name| name.starts_with(&prefix))
            })
            .await?;
            print(&serde_json::json!({ "deleted": deleted }))?;
        }
    }

    Ok(())
}
