//! hive-ctl CLI tool
//!
//! Talks to a running hive-node over its agent socket.
//!
//! Usage:
//!   hive-ctl activate <agent> <weight>
//!   hive-ctl heartbeat <agent>
//!   hive-ctl withdraw <agent>
//!   hive-ctl status <agent>
//!   hive-ctl propose <topic> [quorum]
//!   hive-ctl vote <agent> <proposal> <for|against|abstain>
//!   hive-ctl proposal <proposal>
//!   hive-ctl proposals
//!   hive-ctl stats
//!   hive-ctl ping

use hive_consensus::{Choice, Quorum};
use hive_node::agent_socket::default_socket_path;
use hive_node::{AgentCommand, AgentResponse};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;

fn print_usage() {
    eprintln!("hive-ctl - Drive a Hive node from the shell");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  hive-ctl activate <agent> <weight>                 Register an agent");
    eprintln!("  hive-ctl heartbeat <agent>                         Refresh liveness");
    eprintln!("  hive-ctl withdraw <agent>                          Leave the mesh");
    eprintln!("  hive-ctl status <agent>                            Record and neighbors");
    eprintln!("  hive-ctl propose <topic> [quorum]                  Open a proposal for the mesh");
    eprintln!("  hive-ctl vote <agent> <proposal> <choice>          Cast for/against/abstain");
    eprintln!("  hive-ctl proposal <proposal>                       Proposal and tally");
    eprintln!("  hive-ctl proposals                                 Open proposals");
    eprintln!("  hive-ctl stats                                     Node counters");
    eprintln!("  hive-ctl ping                                      Check if node is running");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  HIVE_AGENT_SOCKET  Path to agent socket (default: ./hive-data/agent.sock)");
}

fn send_command(cmd: &AgentCommand) -> Result<AgentResponse, String> {
    let socket_path = default_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to hive-node at {:?}: {}\n\
             Is the hive-node running?",
            socket_path, e
        )
    })?;

    let cmd_json = serde_json::to_string(cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn arg<T: std::str::FromStr>(args: &[String], index: usize, name: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    let raw = args
        .get(index)
        .ok_or_else(|| format!("{} requires a {} argument", args[1], name))?;
    raw.parse().map_err(|e| format!("invalid {} {:?}: {}", name, raw, e))
}

fn parse_command(args: &[String]) -> Result<AgentCommand, String> {
    let cmd = match args[1].as_str() {
        "activate" => AgentCommand::Activate {
            agent: arg(args, 2, "agent")?,
            weight: arg::<u64>(args, 3, "weight")?.into(),
            hint: None,
        },
        "heartbeat" => AgentCommand::Heartbeat {
            agent: arg(args, 2, "agent")?,
        },
        "withdraw" => AgentCommand::Withdraw {
            agent: arg(args, 2, "agent")?,
        },
        "status" => AgentCommand::Status {
            agent: arg(args, 2, "agent")?,
        },
        "propose" => {
            let quorum = match args.get(3) {
                Some(_) => Some(Quorum::new(arg(args, 3, "quorum")?).map_err(|e| e.to_string())?),
                None => None,
            };
            AgentCommand::OpenProposal {
                proposer: None,
                topic: arg(args, 2, "topic")?,
                description: String::new(),
                quorum,
                window_secs: None,
            }
        }
        "vote" => {
            let choice = match arg::<String>(args, 4, "choice")?.as_str() {
                "for" => Choice::For,
                "against" => Choice::Against,
                "abstain" => Choice::Abstain,
                other => return Err(format!("invalid choice {:?}", other)),
            };
            AgentCommand::Vote {
                agent: arg(args, 2, "agent")?,
                proposal: arg(args, 3, "proposal")?,
                choice,
            }
        }
        "proposal" => AgentCommand::Proposal {
            proposal: arg(args, 2, "proposal")?,
        },
        "proposals" => AgentCommand::OpenProposals,
        "stats" => AgentCommand::Stats,
        "ping" => AgentCommand::Ping,
        other => return Err(format!("Unknown command: {}", other)),
    };
    Ok(cmd)
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }
    if matches!(args[1].as_str(), "-h" | "--help" | "help") {
        print_usage();
        std::process::exit(0);
    }

    let cmd = match parse_command(&args) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    match send_command(&cmd) {
        Ok(AgentResponse::Pong) => println!("pong - hive-node is running"),
        Ok(AgentResponse::Ok { message }) => println!("{}", message),
        Ok(AgentResponse::Error { kind, error, retryable }) => {
            eprintln!("Error ({}{}): {}", kind, if retryable { ", retryable" } else { "" }, error);
            std::process::exit(1);
        }
        Ok(other) => match serde_json::to_string_pretty(&other) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
