use std::path::PathBuf;

use clap::{Parser, Subcommand};

use hoststate::control::protocol::{HostRecord, ServiceRecord, TableRecord};
use hoststate::control::{ControlClient, ControlRequest, ControlResponse};
use hoststate::model::Target;

#[derive(Parser)]
#[command(name = "hoststatectl")]
#[command(about = "Control client for the hoststate packet-filter engine", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "/var/run/hoststated.sock")]
    socket: PathBuf,

    /// Print raw JSON replies
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show services, tables and hosts
    Show,
    /// Enable or disable a service
    Service {
        #[command(subcommand)]
        action: Action,
    },
    /// Enable or disable a table
    Table {
        #[command(subcommand)]
        action: Action,
    },
    /// Enable or disable a host
    Host {
        #[command(subcommand)]
        action: Action,
    },
    /// Ask the daemon to reload its configuration
    Reload,
    /// Stream state changes until interrupted
    Monitor,
}

#[derive(Subcommand)]
enum Action {
    Enable {
        /// Numeric id or name
        target: String,
    },
    Disable {
        target: String,
    },
}

impl Commands {
    fn request(&self) -> ControlRequest {
        match self {
            Commands::Show => ControlRequest::Show,
            Commands::Reload => ControlRequest::Reload,
            Commands::Monitor => ControlRequest::Monitor,
            Commands::Service { action } => match action {
                Action::Enable { target } => ControlRequest::ServiceEnable { target: Target::parse(target) },
                Action::Disable { target } => ControlRequest::ServiceDisable { target: Target::parse(target) },
            },
            Commands::Table { action } => match action {
                Action::Enable { target } => ControlRequest::TableEnable { target: Target::parse(target) },
                Action::Disable { target } => ControlRequest::TableDisable { target: Target::parse(target) },
            },
            Commands::Host { action } => match action {
                Action::Enable { target } => ControlRequest::HostEnable { target: Target::parse(target) },
                Action::Disable { target } => ControlRequest::HostDisable { target: Target::parse(target) },
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut client = ControlClient::connect(&cli.socket).await?;

    if let Commands::Show = cli.command {
        let records = client.show().await?;
        if cli.json {
            for record in &records {
                println!("{}", serde_json::to_string(record)?);
            }
        } else {
            print_summary(&records);
        }
        return Ok(());
    }

    client.send(&cli.command.request()).await?;
    let monitor = matches!(cli.command, Commands::Monitor);

    while let Some(response) = client.recv().await? {
        if cli.json {
            println!("{}", serde_json::to_string(&response)?);
        }
        match response {
            ControlResponse::Ok if !monitor => {
                if !cli.json {
                    println!("command succeeded");
                }
                return Ok(());
            }
            ControlResponse::Fail { reason } => {
                if !cli.json {
                    eprintln!("command failed: {}", reason);
                }
                std::process::exit(1);
            }
            ControlResponse::Event(event) if !cli.json => {
                println!("{}", serde_json::to_string(&event)?);
            }
            _ => {}
        }
    }

    Ok(())
}

fn print_summary(records: &[ControlResponse]) {
    println!("{:<5}{:<10}{:<24}{:<16}{}", "Id", "Type", "Name", "Avlblty", "Status");
    for record in records {
        match record {
            ControlResponse::Service(s) => print_service(s),
            ControlResponse::Table(t) => print_table(t),
            ControlResponse::Host(h) => print_host(h),
            _ => {}
        }
    }
}

fn print_service(s: &ServiceRecord) {
    let status = if s.disabled { "disabled".to_string() } else { s.state.to_string() };
    println!("{:<5}{:<10}{:<24}{:<16}{}", s.id, "service", s.name, "", status);
}

fn print_table(t: &TableRecord) {
    let status = if t.disabled {
        "disabled".to_string()
    } else if t.active {
        format!("active ({} of {} up)", t.up, t.hosts)
    } else {
        format!("standby ({} of {} up)", t.up, t.hosts)
    };
    println!("{:<5}{:<10}{:<24}{:<16}{}", t.id, "table", t.name, "", status);
}

fn print_host(h: &HostRecord) {
    let availability = match h.availability {
        Some(pct) => format!("{:.2}%", pct),
        None => String::new(),
    };
    let status = if h.disabled { "disabled".to_string() } else { h.status.to_string() };
    println!("{:<5}{:<10}{:<24}{:<16}{}", h.id, "host", h.name, availability, status);
}
