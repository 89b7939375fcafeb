use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use trademicro_client::api::types::{NewBrokerToken, NewFamilyMember, NewTask, RecordId};
use trademicro_client::display::TaskFilter;
use trademicro_client::services::{
    BrokerTokenService, DashboardService, FamilyMemberService, SymbolService, TaskService,
    TradeService, UserService,
};
use trademicro_client::{
    store, ApiClient, AppError, ClientConfig, ErrorResponse, LogNotifier, TokenStore,
};

#[derive(Parser)]
#[command(name = "trademicro")]
#[command(about = "TradeMicro API client: session, broker tokens, tasks and dashboard data")]
#[command(version)]
struct Cli {
    /// Log filter (trace, debug, info, warn, error or a RUST_LOG directive)
    #[arg(short, long)]
    log_level: Option<String>,

    /// TOML configuration file
    #[arg(short, long, env = "TRADEMICRO_CONFIG")]
    config: Option<PathBuf>,

    /// API base URL
    #[arg(long, env = "TRADEMICRO_API_URL")]
    api_url: Option<String>,

    /// Token store: file, keychain or memory
    #[arg(long, env = "TRADEMICRO_TOKEN_STORE")]
    store: Option<String>,

    /// Directory holding the encrypted session file
    #[arg(long, env = "TRADEMICRO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the session token
    Login {
        username: String,

        #[arg(short, long, env = "TRADEMICRO_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Drop the session token
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Check API health (no login needed)
    Health,

    /// List symbols
    Symbols,

    /// List trades
    Trades,

    /// Manage broker tokens
    Tokens {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Manage background tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Manage family members
    Family {
        #[command(subcommand)]
        command: FamilyCommands,
    },

    /// Record counts per resource
    Counts,

    /// Load every dashboard panel
    Dashboard,
}

#[derive(Subcommand)]
enum TokenCommands {
    /// List tokens with masked values and expiry
    List,

    Add {
        #[arg(short, long)]
        broker: String,

        #[arg(short, long)]
        token: String,
    },

    Update {
        id: String,

        #[arg(short, long)]
        token: String,
    },

    Delete { id: String },
}

#[derive(Subcommand)]
enum TaskCommands {
    List {
        /// Status filter, e.g. PENDING (default: all)
        #[arg(short, long, default_value = "all")]
        status: String,
    },

    Show { id: String },

    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        command: String,

        /// Run on the remote worker instead of the API host
        #[arg(long)]
        worker: bool,

        /// Command arguments
        #[arg(last = true)]
        args: Vec<String>,
    },

    Start { id: String },

    Cancel { id: String },

    Logs { id: String },
}

#[derive(Subcommand)]
enum FamilyCommands {
    List,

    Add {
        #[arg(short, long)]
        name: String,

        #[arg(long, default_value = "")]
        email: String,

        #[arg(long, default_value = "")]
        phone: String,

        #[arg(long, default_value = "", hide_default_value = true)]
        pin: String,

        #[arg(long, default_value = "")]
        client_id: String,

        #[arg(long, default_value = "", hide_default_value = true)]
        client_token: String,
    },

    /// Change only the given fields
    Update {
        id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        pin: Option<String>,

        #[arg(long)]
        client_id: Option<String>,

        #[arg(long)]
        client_token: Option<String>,
    },

    Delete { id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    trademicro_client::init_tracing(
        cli.log_level
            .as_deref()
            .unwrap_or(trademicro_client::DEFAULT_LOG_FILTER),
    );

    if let Err(e) = run(cli).await {
        report(&e);
        std::process::exit(1);
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<AppError>() {
        Some(app_err) => {
            let response = ErrorResponse::from(app_err);
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&response).unwrap_or(response.message)
            );
            if app_err.requires_login() {
                eprintln!("Run `trademicro login <username>` to start a new session.");
            }
        }
        None => eprintln!("Error: {:#}", err),
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;

    if let Some(url) = &cli.api_url {
        config.base_url = url.clone();
    }
    if let Some(backend) = &cli.store {
        config.store = backend.parse()?;
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }

    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn count_json(count: trademicro_client::Result<u64>) -> Value {
    match count {
        Ok(n) => json!(n),
        Err(e) => json!(ErrorResponse::from(e)),
    }
}

fn list_json<T: Serialize>(items: &trademicro_client::Result<Vec<T>>) -> Value {
    match items {
        Ok(items) => json!(items),
        Err(e) => json!(ErrorResponse::from(e)),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let token_store = store::open(&config).context("Failed to open token store")?;
    let client = ApiClient::new(&config, Arc::clone(&token_store))?;

    match cli.command {
        Commands::Login { username, password } => {
            if password.is_empty() {
                bail!("Password is required");
            }
            let session = client.login(&username, &password).await?;
            print_json(&json!({
                "status": "logged_in",
                "username": username,
                "authenticated_at": session.authenticated_at,
                "store": token_store.name(),
            }))?;
        }
        Commands::Logout => {
            client.logout();
            print_json(&json!({ "status": "logged_out" }))?;
        }
        Commands::Whoami => print_json(&UserService::current_user(&client).await?)?,
        Commands::Health => print_json(&UserService::health(&client).await?)?,
        Commands::Symbols => print_json(&SymbolService::list(&client).await?)?,
        Commands::Trades => print_json(&TradeService::list(&client).await?)?,
        Commands::Tokens { command } => run_tokens(&client, command).await?,
        Commands::Tasks { command } => run_tasks(&client, command).await?,
        Commands::Family { command } => run_family(&client, command).await?,
        Commands::Counts => {
            let counts = DashboardService::load_counts(&client).await;
            print_json(&json!({
                "symbols": count_json(counts.symbols),
                "trades": count_json(counts.trades),
                "broker_tokens": count_json(counts.broker_tokens),
                "tasks": count_json(counts.tasks),
            }))?;
        }
        Commands::Dashboard => {
            let snapshot = DashboardService::refresh(&client, &LogNotifier).await;
            print_json(&json!({
                "trades": list_json(&snapshot.trades),
                "symbols": list_json(&snapshot.symbols),
                "broker_tokens": list_json(&snapshot.broker_tokens),
                "tasks": list_json(&snapshot.tasks),
            }))?;
        }
    }

    Ok(())
}

async fn run_tokens(client: &ApiClient, command: TokenCommands) -> Result<()> {
    match command {
        TokenCommands::List => {
            let now = chrono::Utc::now();
            let tokens = BrokerTokenService::list(client).await?;
            let rows: Vec<Value> = tokens
                .iter()
                .map(|t| {
                    json!({
                        "id": t.id,
                        "broker": t.broker,
                        "token": t.masked_token(),
                        "created_at": t.created_at,
                        "expiry": t.expiry_at(now),
                    })
                })
                .collect();
            print_json(&rows)?;
        }
        TokenCommands::Add { broker, token } => {
            let created =
                BrokerTokenService::create(client, &NewBrokerToken { broker, token }).await?;
            print_json(&json!({
                "id": created.id,
                "broker": created.broker,
                "token": created.masked_token(),
            }))?;
        }
        TokenCommands::Update { id, token } => {
            BrokerTokenService::update(client, &RecordId::from(id), &token).await?;
            print_json(&json!({ "status": "updated" }))?;
        }
        TokenCommands::Delete { id } => {
            BrokerTokenService::delete(client, &RecordId::from(id)).await?;
            print_json(&json!({ "status": "deleted" }))?;
        }
    }
    Ok(())
}

async fn run_tasks(client: &ApiClient, command: TaskCommands) -> Result<()> {
    match command {
        TaskCommands::List { status } => {
            let filter: TaskFilter = status.parse()?;
            let tasks = TaskService::filter(client, &filter).await?;
            let rows: Vec<Value> = tasks
                .iter()
                .map(|t| {
                    let mut row = json!(t);
                    row["cancellable"] = json!(t.is_pending());
                    row
                })
                .collect();
            print_json(&rows)?;
        }
        TaskCommands::Show { id } => {
            print_json(&TaskService::get(client, &RecordId::from(id)).await?)?
        }
        TaskCommands::Create {
            name,
            command,
            worker,
            args,
        } => {
            let task = NewTask {
                name,
                command,
                args,
                run_on_worker: worker,
                ..NewTask::default()
            };
            print_json(&TaskService::create(client, &task).await?)?;
        }
        TaskCommands::Start { id } => {
            print_json(&TaskService::start(client, &RecordId::from(id)).await?)?
        }
        TaskCommands::Cancel { id } => {
            print_json(&TaskService::cancel(client, &RecordId::from(id)).await?)?
        }
        TaskCommands::Logs { id } => {
            let logs = TaskService::logs(client, &RecordId::from(id)).await?;
            print!("{}", logs.stdout);
            if !logs.stderr.is_empty() {
                eprint!("{}", logs.stderr);
            }
        }
    }
    Ok(())
}

async fn run_family(client: &ApiClient, command: FamilyCommands) -> Result<()> {
    match command {
        FamilyCommands::List => print_json(&FamilyMemberService::list(client).await?)?,
        FamilyCommands::Add {
            name,
            email,
            phone,
            pin,
            client_id,
            client_token,
        } => {
            let member = NewFamilyMember {
                name,
                email,
                phone,
                pin,
                client_id,
                client_token,
            };
            print_json(&FamilyMemberService::create(client, &member).await?)?;
        }
        FamilyCommands::Update {
            id,
            name,
            email,
            phone,
            pin,
            client_id,
            client_token,
        } => {
            let changes = member_changes([
                ("name", name),
                ("email", email),
                ("phone", phone),
                ("pin", pin),
                ("client_id", client_id),
                ("client_token", client_token),
            ]);
            if changes.is_empty() {
                bail!("Nothing to update, pass at least one field");
            }
            let updated =
                FamilyMemberService::update(client, &RecordId::from(id), &Value::Object(changes))
                    .await?;
            print_json(&updated)?;
        }
        FamilyCommands::Delete { id } => {
            FamilyMemberService::delete(client, &RecordId::from(id)).await?;
            print_json(&json!({ "status": "deleted" }))?;
        }
    }
    Ok(())
}

/// JSON object of the fields that were given
fn member_changes<const N: usize>(fields: [(&str, Option<String>); N]) -> Map<String, Value> {
    fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::String(v))))
        .collect()
}
