//! Run a short call list against a live device.
//!
//! Connects over SSH, executes `show version` and `show clock`, stores
//! the version output and prints it.
//!
//! # Prerequisites
//!
//! - A reachable SSH host with an interactive shell
//! - Valid credentials (username/password or inline key material)
//!
//! # Usage
//!
//! ```bash
//! cargo run --example run_calls -- --host 192.168.1.1 --user admin --password secret
//! ```

use std::env;

use termflow::{AuthConfig, Call, MemoryStore, PropertyStore, RunContext, Runner, SshTransport};
use termflow::auth::AddressList;
use termflow::template::NoTemplates;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let auth = AuthConfig {
        ip: Some(AddressList::One(args.host.clone())),
        user: Some(args.user.clone()),
        password: args.password.clone().map(Into::into),
        port: Some(args.port),
        ..AuthConfig::default()
    };

    let calls = vec![
        Call::action("show version").save_to("version"),
        Call::action("show clock"),
    ];

    let transport = SshTransport;
    let store = MemoryStore::new();
    let ctx = RunContext::new("demo-run", "demo_instance", "demo");

    println!("Connecting to {}:{}...", args.host, args.port);
    Runner::new(&transport, &NoTemplates, &store, ctx)
        .run(&auth, &AuthConfig::default(), &calls)
        .await?;

    println!("{}", "-".repeat(50));
    match store.get("demo_instance", "version") {
        Some(version) => println!("{version}"),
        None => println!("no version output captured"),
    }
    println!("{}", "-".repeat(50));
    println!("Done!");

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 22u16;
        let mut user = env::var("USER").unwrap_or_else(|_| "root".to_string());
        let mut password = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self {
            host,
            port,
            user,
            password,
        }
    }

    fn print_help() {
        println!(
            r#"termflow run_calls example

USAGE:
    cargo run --example run_calls -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Target host [default: localhost]
    -p, --port <PORT>        SSH port [default: 22]
    -u, --user <USER>        Username [default: $USER]
    -P, --password <PASS>    Password for authentication
    --help                   Print this help message
"#
        );
    }
}
