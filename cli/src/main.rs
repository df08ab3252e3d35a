mod actions;
mod browse;
mod client;
mod forms;
mod render;
mod state;

use actions::Outcome;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use client::{ApiClient, DEFAULT_API_URL};
use colored::*;
use common::validation::validate_create;
use common::{ListParams, Severity, Status, UnknownFields};
use serde_json::json;

#[derive(Parser)]
#[command(name = "tracker", version, about = "Terminal client for the incident tracker")]
struct Cli {
    /// Base URL of the tracker server.
    #[arg(long, env = "TRACKER_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive, full-screen incident list (default).
    Browse,
    /// Print one page of incidents.
    List(ListArgs),
    /// Show one incident.
    Show { id: String },
    /// Create an incident from flags, or interactively when title, service or severity is missing.
    Create(CreateArgs),
    /// Edit an incident interactively; only changed fields are sent.
    Edit { id: String },
    /// Delete an incident.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
    /// Show server status and open incident counts.
    Status,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, short)]
    search: Option<String>,
    #[arg(long)]
    severity: Option<Severity>,
    #[arg(long)]
    status: Option<Status>,
    #[arg(long)]
    service: Option<String>,
    /// id, title, service, severity, status, owner, summary, createdAt, updatedAt
    #[arg(long)]
    sort_by: Option<String>,
    /// asc or desc
    #[arg(long)]
    sort_order: Option<String>,
    #[arg(long, short, default_value_t = 1)]
    page: u32,
    #[arg(long, short, default_value_t = 10)]
    limit: u32,
}

impl ListArgs {
    fn params(&self) -> ListParams {
        ListParams {
            page: Some(self.page.to_string()),
            limit: Some(self.limit.to_string()),
            search: self.search.clone(),
            severity: self.severity.map(|s| s.as_str().to_string()),
            status: self.status.map(|s| s.as_str().to_string()),
            service: self.service.clone(),
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        }
    }
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    service: Option<String>,
    #[arg(long)]
    severity: Option<Severity>,
    #[arg(long)]
    status: Option<Status>,
    #[arg(long)]
    owner: Option<String>,
    #[arg(long)]
    summary: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.api_url)?;

    match cli.command.unwrap_or(Command::Browse) {
        Command::Browse => browse::run(&client).await,
        Command::List(args) => {
            let page = client.list(&args.params()).await?;
            println!();
            for line in render::table(&page, None, None) {
                println!("{}", line);
            }
            println!();
            Ok(())
        }
        Command::Show { id } => {
            let incident = client.get(&id).await?;
            println!();
            for line in render::detail(&incident) {
                println!("{}", line);
            }
            Ok(())
        }
        Command::Create(args) => finish(create(&client, args).await?),
        Command::Edit { id } => {
            let current = client.get(&id).await?;
            finish(actions::edit(&client, &current).await?)
        }
        Command::Delete { id, yes } => {
            let incident = client.get(&id).await?;
            finish(actions::delete(&client, &incident, yes).await?)
        }
        Command::Status => {
            let report = client.status().await?;
            println!();
            for line in render::status(&report) {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

async fn create(client: &ApiClient, args: CreateArgs) -> Result<Outcome> {
    let (Some(title), Some(service), Some(severity)) = (args.title, args.service, args.severity) else {
        println!("{}", "New incident".bright_cyan().bold());
        return actions::create(client).await;
    };

    let mut body = json!({
        "title": title,
        "service": service,
        "severity": severity,
        "status": args.status.unwrap_or_default(),
    });
    if let Some(owner) = args.owner {
        body["owner"] = json!(owner);
    }
    if let Some(summary) = args.summary {
        body["summary"] = json!(summary);
    }
    let incident = validate_create(&body, UnknownFields::Reject)?;
    Ok(actions::submit_new(client, &incident).await)
}

fn finish(outcome: Outcome) -> Result<()> {
    if let Outcome::Failed(message) = outcome {
        anyhow::bail!(message);
    }
    outcome.print();
    Ok(())
}
