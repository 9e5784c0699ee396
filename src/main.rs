//! CLI entry point for ember-gamebook
//!
//! Inspects and maintains the saves kept in a save directory.

use ember_gamebook::cli::saves;
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    match command {
        "--help" | "-h" => {
            print_usage();
            return;
        }
        "saves" | "show" | "export" | "delete" | "reset" => {}
        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    }

    let Some(dir) = args.get(2).map(PathBuf::from) else {
        eprintln!("Error: Missing save directory");
        eprintln!();
        print_usage();
        process::exit(1);
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: Failed to start runtime");
            eprintln!("Reason: {}", err);
            process::exit(1);
        }
    };

    let result = runtime.block_on(run(command, &dir, &args));

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        for cause in err.chain().skip(1) {
            eprintln!("Reason: {}", cause);
        }
        process::exit(1);
    }
}

async fn run(command: &str, dir: &Path, args: &[String]) -> anyhow::Result<()> {
    match command {
        "saves" => saves::list_saves(dir).await,
        "show" => saves::show_state(dir, args.get(3).map(String::as_str)).await,
        "export" => saves::export_slot(dir, slot_arg(args)?).await,
        "delete" => saves::delete_slot(dir, slot_arg(args)?).await,
        "reset" => saves::reset_state(dir).await,
        other => anyhow::bail!("Unknown command '{other}'"),
    }
}

fn slot_arg(args: &[String]) -> anyhow::Result<u32> {
    let arg = args
        .get(3)
        .ok_or_else(|| anyhow::anyhow!("Missing slot number"))?;
    saves::parse_slot(arg)
}

fn print_usage() {
    println!("ember-gamebook - Gamebook save maintenance");
    println!();
    println!("USAGE:");
    println!("    ember-gamebook <command> <dir> [args]");
    println!();
    println!("COMMANDS:");
    println!("    saves <dir>            List occupied save slots");
    println!("    show <dir> [path]      Print the live state, or a dotted path into it");
    println!("    export <dir> <slot>    Print the raw JSON of a save slot");
    println!("    delete <dir> <slot>    Delete a save slot");
    println!("    reset <dir>            Reset the live state to defaults");
    println!("    --help, -h             Show this help message");
    println!();
    println!("Set RUST_LOG=debug for diagnostic output.");
    println!();
    println!("EXAMPLES:");
    println!("    ember-gamebook saves ./saves");
    println!("    ember-gamebook show ./saves settings.textSpeed");
}
