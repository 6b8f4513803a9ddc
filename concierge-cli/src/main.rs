//! concierge-cli - drive the concierge server from a terminal
//!
//! Submits browser tasks through `/api/run` and follows them by polling
//! `/api/task/{id}`, the same way the web front-end does.
//!
//! # Subcommands
//! - `run <task> [--interval <secs>]`  - dispatch a task and wait for it
//! - `intent <query>`                  - show how an utterance is classified
//! - `task <id>` / `session <id>`      - print the provider object
//! - `stop <task id>`                  - stop a running task
//! - `tavus check|replicas|personas`   - avatar service diagnostics
//! - `status`                          - show server health

use std::thread;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use concierge_core::Task;
use serde_json::{json, Value};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";
const DEFAULT_INTERVAL_SECS: u64 = 5;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "concierge-cli",
    version,
    about = "Concierge - dispatch browser tasks and avatar sessions from the terminal"
)]
struct Cli {
    /// Concierge server URL (overrides CONCIERGE_URL env var)
    #[arg(long, env = "CONCIERGE_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a browser task and wait until it finishes
    Run {
        /// Natural-language task description
        task: String,

        /// Seconds between status polls
        #[arg(short, long, default_value_t = DEFAULT_INTERVAL_SECS)]
        interval: u64,
    },

    /// Classify an utterance as an action or a conversation
    Intent {
        query: String,
    },

    /// Print a task as reported by the provider
    Task {
        id: String,
    },

    /// Print a session as reported by the provider
    Session {
        id: String,
    },

    /// Stop a running task
    Stop {
        id: String,
    },

    /// Avatar service diagnostics
    Tavus {
        #[command(subcommand)]
        command: TavusCommand,
    },

    /// Show Concierge server status
    Status,
}

#[derive(Debug, Subcommand)]
enum TavusCommand {
    /// Create a test conversation and print its details
    Check {
        /// Replica id (defaults to the server's configured replica)
        #[arg(long)]
        replica: Option<String>,

        /// Persona id (defaults to the server's configured persona)
        #[arg(long)]
        persona: Option<String>,

        #[arg(long, default_value = "Automated Verification Test")]
        name: String,

        /// Maximum call length in seconds
        #[arg(long, default_value_t = 60)]
        max_call_duration: u64,
    },

    /// List available replicas
    Replicas,

    /// List available personas
    Personas,
}

// ============================================================================
// HTTP Client
// ============================================================================

struct ApiClient {
    http: reqwest::blocking::Client,
    server: String,
}

impl ApiClient {
    fn new(server: &str) -> anyhow::Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            server: server.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, path: &str) -> anyhow::Result<Value> {
        let url = format!("{}{}", self.server, path);
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|e| anyhow::anyhow!("connection failed to {}: {}", url, e))?;
        read_response(resp)
    }

    fn post(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        let url = format!("{}{}", self.server, path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| anyhow::anyhow!("connection failed to {}: {}", url, e))?;
        read_response(resp)
    }
}

fn read_response(resp: reqwest::blocking::Response) -> anyhow::Result<Value> {
    let status = resp.status();
    let text = resp.text().unwrap_or_default();

    if !status.is_success() {
        bail!("server returned {}: {}", status, error_detail(&text));
    }

    Ok(serde_json::from_str(&text)?)
}

/// The server's `detail` message if the body carries one, else the raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

// ============================================================================
// Task polling
// ============================================================================

#[derive(Debug)]
enum PollOutcome {
    Completed(Task),
    Paused(Task),
}

/// Fetch the task every `interval` until it is terminal or paused.
fn wait_for_task<F, S>(mut fetch: F, mut on_status: S, interval: Duration) -> anyhow::Result<PollOutcome>
where
    F: FnMut() -> anyhow::Result<Task>,
    S: FnMut(&Task),
{
    loop {
        let task = fetch()?;
        on_status(&task);

        if task.is_terminal() {
            return Ok(PollOutcome::Completed(task));
        }
        if task.is_paused() {
            return Ok(PollOutcome::Paused(task));
        }

        thread::sleep(interval);
    }
}

// ============================================================================
// Commands
// ============================================================================

fn do_run(api: &ApiClient, task: &str, interval: u64) -> anyhow::Result<()> {
    println!("Creating task...");
    let dispatch = api.post("/api/run", &json!({ "task": task }))?;

    let task_id = match dispatch["taskId"].as_str() {
        Some(id) => id.to_string(),
        None => bail!("server response had no taskId: {}", dispatch),
    };
    println!("Task created! ID: {}", task_id);
    println!("Session ID: {}", dispatch["sessionId"].as_str().unwrap_or("?"));
    if let Some(live_url) = dispatch["liveUrl"].as_str() {
        println!("Watch live: {}", live_url);
    }

    println!("Waiting for task to complete...");
    let path = format!("/api/task/{}", task_id);
    let outcome = wait_for_task(
        || Ok(serde_json::from_value(api.get(&path)?)?),
        |t| println!("Status: {}", t.status.as_deref().unwrap_or("unknown")),
        Duration::from_secs(interval),
    )?;

    match outcome {
        PollOutcome::Completed(task) => {
            println!("\nTask Completed!");
            println!("Output:");
            match task.output {
                Some(Value::String(s)) => println!("{}", s),
                Some(other) => println!("{}", serde_json::to_string_pretty(&other)?),
                None => println!("(none)"),
            }
        }
        PollOutcome::Paused(_) => println!("Task paused."),
    }

    Ok(())
}

fn do_intent(api: &ApiClient, query: &str) -> anyhow::Result<()> {
    let intent = api.post("/api/process_intent", &json!({ "query": query }))?;
    println!("Type:    {}", intent["type"].as_str().unwrap_or("?"));
    println!("Message: {}", intent["message"].as_str().unwrap_or(""));
    if let Some(task) = intent["task"].as_str() {
        println!("Task:    {}", task);
    }
    Ok(())
}

fn do_print(api: &ApiClient, path: &str) -> anyhow::Result<()> {
    let body = api.get(path)?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn do_stop(api: &ApiClient, id: &str) -> anyhow::Result<()> {
    let task = api.post(&format!("/api/task/{}/stop", id), &json!({}))?;
    println!("Task {}: {}", id, task["status"].as_str().unwrap_or("unknown"));
    Ok(())
}

fn do_tavus(api: &ApiClient, command: TavusCommand) -> anyhow::Result<()> {
    match command {
        TavusCommand::Check {
            replica,
            persona,
            name,
            max_call_duration,
        } => {
            let body = tavus_check_body(replica, persona, &name, max_call_duration);
            println!("Creating test conversation...");
            let conversation = api.post("/api/tavus/session", &body)?;
            println!("\nSUCCESS! Conversation created.");
            println!("{}", "-".repeat(30));
            for (label, key) in [
                ("Conversation ID", "conversation_id"),
                ("Conversation Name", "conversation_name"),
                ("Conversation URL", "conversation_url"),
                ("Status", "status"),
            ] {
                println!("{}: {}", label, conversation[key].as_str().unwrap_or("?"));
            }
            println!("{}", "-".repeat(30));
        }
        TavusCommand::Replicas => {
            let replicas = api.get("/api/tavus/replicas")?;
            print_listing(&replicas, "replica_id", "replica_name", "No replicas found.");
        }
        TavusCommand::Personas => {
            let personas = api.get("/api/tavus/personas")?;
            print_listing(&personas, "persona_id", "persona_name", "No personas found.");
        }
    }
    Ok(())
}

fn tavus_check_body(
    replica: Option<String>,
    persona: Option<String>,
    name: &str,
    max_call_duration: u64,
) -> Value {
    let mut body = json!({
        "conversation_name": name,
        "properties": {
            "max_call_duration": max_call_duration,
            "enable_recording": true
        }
    });
    if let Some(replica) = replica {
        body["replica_id"] = json!(replica);
    }
    if let Some(persona) = persona {
        body["persona_id"] = json!(persona);
    }
    body
}

fn print_listing(items: &Value, id_key: &str, name_key: &str, empty: &str) {
    let items = items.as_array().map(Vec::as_slice).unwrap_or(&[]);
    if items.is_empty() {
        println!("{}", empty);
        return;
    }
    for item in items {
        println!(
            "ID: {} | Name: {}",
            item[id_key].as_str().unwrap_or("?"),
            item[name_key].as_str().unwrap_or("?")
        );
    }
}

/// Show the server status by calling GET /api/health.
fn do_status(api: &ApiClient) -> anyhow::Result<()> {
    let body = api.get("/api/health")?;
    println!("Concierge server: {}", body["status"].as_str().unwrap_or("unknown"));
    println!("Version:          {}", body["version"].as_str().unwrap_or("?"));
    println!("Automation:       {}", body["automation_provider"].as_str().unwrap_or("?"));
    println!("Tavus configured: {}", body["tavus_configured"].as_bool().unwrap_or(false));
    match body["active_session"]["sessionId"].as_str() {
        Some(id) => println!("Active session:   {}", id),
        None => println!("Active session:   none"),
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();

    let result = ApiClient::new(&cli.server).and_then(|api| match cli.command {
        Commands::Run { task, interval } => do_run(&api, &task, interval),
        Commands::Intent { query } => do_intent(&api, &query),
        Commands::Task { id } => do_print(&api, &format!("/api/task/{}", id)),
        Commands::Session { id } => do_print(&api, &format!("/api/session/{}", id)),
        Commands::Stop { id } => do_stop(&api, &id),
        Commands::Tavus { command } => do_tavus(&api, command),
        Commands::Status => do_status(&api),
    });

    if let Err(e) = result {
        eprintln!("concierge-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
