//! Prospect Agent - company data and AI criteria-matching service.
//!
//! Usage:
//! - Normal mode: `prospect-agent`
//! - With custom port: `prospect-agent --port 9090`

use prospect_agent::RuntimeConfig;

fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("Prospect Agent - company data and AI criteria-matching service");
    println!();
    println!("USAGE:");
    println!("    prospect-agent [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>    Override the listening port");
    println!("    -h, --help       Print help information");
    println!();
    println!("EXAMPLES:");
    println!("    prospect-agent                # Listen on $PORT (default 8080)");
    println!("    prospect-agent --port 9090    # Custom port");
}

fn main() {
    let config = parse_args();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    rt.block_on(async {
        prospect_agent::init_and_run_with_config(config).await;
    });
}
