//! openplan agent
//!
//! Reads an OpenAPI document, then answers natural-language requests against
//! that API with the plan/execute/replan loop.
//!
//! Usage:
//!   openplan-agent                      # REPL, one request per line
//!   openplan-agent ask "list my playlists"
//!   openplan-agent endpoints
//!   openplan-agent docs "GET /me then GET /playlists/abc/tracks"

use anyhow::Context;
use clap::{Parser, Subcommand};
use openplan::agent::{NodeUpdate, PlanExecuteLoop};
use openplan::auth::{oauth_scopes, AuthHeaders};
use openplan::catalog::{load_raw_spec, reduce_openapi_spec, ReduceOptions};
use openplan::config::AgentConfig;
use openplan::llm::{LlmProvider, OpenAiCompatibleProvider};
use openplan::requests::RequestsWrapper;
use openplan::tools::prepare_tools;
use openplan::{Anchoring, EndpointResolver, OperationCatalog};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "openplan-agent")]
#[command(about = "Plan-and-execute agent over an OpenAPI-described web API")]
struct Args {
    /// Path to agent configuration file (TOML format)
    #[arg(long, env = "OPENPLAN_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// OpenAPI document (YAML or JSON); overrides the config file
    #[arg(long)]
    spec_path: Option<PathBuf>,

    /// LLM model name
    #[arg(long)]
    llm_model: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long)]
    llm_base_url: Option<String>,

    /// Match catalog templates against the whole mention (full) or its start (prefix)
    #[arg(long, value_parser = parse_anchoring)]
    anchoring: Option<Anchoring>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive prompt (default)
    Repl,
    /// Run a single request
    Ask {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// List the operations of the API
    Endpoints,
    /// Print the documentation of the endpoints mentioned in TEXT
    Docs {
        #[arg(required = true)]
        text: Vec<String>,
    },
}

fn parse_anchoring(value: &str) -> Result<Anchoring, String> {
    match value.to_lowercase().as_str() {
        "full" => Ok(Anchoring::Full),
        "prefix" => Ok(Anchoring::Prefix),
        other => Err(format!("expected 'full' or 'prefix', got '{}'", other)),
    }
}

impl Args {
    /// File, then `OPENPLAN_*` variables, then CLI flags.
    fn load_config(&self) -> anyhow::Result<AgentConfig> {
        let config = match &self.config_path {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                AgentConfig::from_file(path)?
            }
            None => AgentConfig::default(),
        };
        let mut config = config.apply_env()?;

        if let Some(spec_path) = &self.spec_path {
            config.api.spec_path = spec_path.clone();
        }
        if let Some(model) = &self.llm_model {
            config.llm.model = model.clone();
        }
        if let Some(base_url) = &self.llm_base_url {
            config.llm.base_url = base_url.clone();
        }
        if let Some(anchoring) = self.anchoring {
            config.agent.anchoring = anchoring;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("openplan=info".parse()?)
                .add_directive("openplan_agent=info".parse()?),
        )
        .with_ansi(false)
        .init();

    let args = Args::parse();
    let config = args.load_config()?;

    let raw_spec = load_raw_spec(&config.api.spec_path)
        .with_context(|| format!("Failed to load OpenAPI document {}", config.api.spec_path.display()))?;
    let catalog = Arc::new(reduce_openapi_spec(&raw_spec, ReduceOptions::default())?);
    info!(
        "Loaded {} operations from {}",
        catalog.len(),
        config.api.spec_path.display()
    );

    match args.command.unwrap_or(Command::Repl) {
        Command::Endpoints => {
            print_endpoints(&catalog);
            Ok(())
        }
        Command::Docs { text } => print_docs(catalog, config.agent.anchoring, &text.join(" ")),
        Command::Ask { query } => {
            let agent = build_agent(&config, &raw_spec, catalog)?;
            run_query(&agent, &query.join(" ")).await
        }
        Command::Repl => {
            let agent = build_agent(&config, &raw_spec, catalog)?;
            repl(&agent).await
        }
    }
}

fn print_endpoints(catalog: &OperationCatalog) {
    if let Some(base_url) = catalog.base_url() {
        println!("Base url: {}", base_url);
    }
    for line in catalog.endpoint_descriptions() {
        println!("{}", line);
    }
}

fn print_docs(catalog: Arc<OperationCatalog>, anchoring: Anchoring, text: &str) -> anyhow::Result<()> {
    let resolver = EndpointResolver::with_anchoring(catalog, anchoring)?;
    let docs = resolver.api_docs(text)?;
    if docs.is_empty() {
        println!("No endpoint mentions found.");
    } else {
        print!("{}", docs);
    }
    Ok(())
}

fn build_agent(config: &AgentConfig, raw_spec: &Value, catalog: Arc<OperationCatalog>) -> anyhow::Result<PlanExecuteLoop> {
    let auth = match AuthHeaders::bearer_from_env(&config.api.access_token_env) {
        Ok(auth) => auth,
        Err(e) => {
            match oauth_scopes(raw_spec, &config.api.security_scheme) {
                Ok(scopes) => error!(
                    "Set {} to a user access token granted these scopes: {}",
                    config.api.access_token_env,
                    scopes.join(" ")
                ),
                Err(_) => error!("Set {} to an API access token", config.api.access_token_env),
            }
            return Err(e.into());
        }
    };

    let requests = Arc::new(RequestsWrapper::new(
        auth,
        Duration::from_secs(config.api.timeout_seconds),
    )?);
    let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatibleProvider::from_env(&config.llm)?);
    info!("LLM: {} via {}", llm.model(), config.llm.base_url);

    if catalog.base_url().is_none() {
        warn!("OpenAPI document declares no servers; tool URLs must be absolute");
    }

    let toolbox = prepare_tools(
        requests,
        llm.clone(),
        config.api.allow_dangerous_requests,
        &config.api.allowed_operations,
    )?
    .with_response_length(config.api.response_length);
    info!("Tools: {}", toolbox.names().join(", "));

    Ok(PlanExecuteLoop::build(llm, catalog, Arc::new(toolbox), &config.agent)?)
}

async fn run_query(agent: &PlanExecuteLoop, query: &str) -> anyhow::Result<()> {
    let state = agent
        .run(query, |event| {
            println!("{}", event);
            if matches!(event.update, NodeUpdate::Response(_)) {
                println!();
            }
        })
        .await?;

    if state.response.is_none() {
        println!("No response: the plan ran out of steps.");
    }
    Ok(())
}

async fn repl(agent: &PlanExecuteLoop) -> anyhow::Result<()> {
    println!("Type a request, or 'exit' to quit");
    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("Command: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if matches!(line, "exit" | "quit") {
                    break;
                }
                if let Err(e) = run_query(agent, line).await {
                    eprintln!("Error: {:#}", e);
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
