//! clfs-ctl — command-line client for a clfs server.

use anyhow::{Context, Result};

use clfs_core::wire::DEFAULT_PORT;
use clfs_core::Outcome;
use libclfs::Client;

// ── Subcommand handlers ───────────────────────────────────────────────────────

fn parse_id(s: &str) -> Result<u32> {
    s.parse()
        .with_context(|| format!("object id must be a 32-bit unsigned number: {s}"))
}

fn report(op: &str, id: u32, outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Ok => {
            println!("{op} {id}: ok");
            Ok(())
        }
        other => anyhow::bail!("{op} {id} failed: {other}"),
    }
}

async fn cmd_put(client: &Client<String>, id: &str, path: &str) -> Result<()> {
    let id = parse_id(id)?;
    let data = std::fs::read(path).with_context(|| format!("failed to read file: {path}"))?;
    let outcome = client
        .put(id, &data)
        .await
        .with_context(|| format!("PUT {id} failed"))?;
    report("PUT", id, outcome)?;
    println!("  {} bytes stored", data.len());
    Ok(())
}

async fn cmd_get(
    client: &Client<String>,
    id: &str,
    len: &str,
    out: Option<&str>,
    keep: bool,
) -> Result<()> {
    let id = parse_id(id)?;
    let len: u32 = len.parse().context("length must be a number")?;
    let data = if keep {
        client.get_without_ack(id, len).await
    } else {
        client.get(id, len).await
    }
    .with_context(|| format!("GET {id} failed"))?;

    match out {
        Some(path) => {
            std::fs::write(path, &data).with_context(|| format!("failed to write {path}"))?;
            println!("GET {id}: {} bytes written to {path}", data.len());
        }
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(&data)
                .context("failed to write to stdout")?;
        }
    }
    Ok(())
}

async fn cmd_rm(client: &Client<String>, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let outcome = client
        .remove(id)
        .await
        .with_context(|| format!("RM {id} failed"))?;
    report("RM", id, outcome)
}

fn print_usage() {
    println!("Usage: clfs-ctl [--addr <host:port>] [--keep] <command>");
    println!();
    println!("Commands:");
    println!("  put <id> <file>            Store a file as object <id>");
    println!("  get <id> <len> [out]       Fetch object <id> of <len> bytes (consumes it)");
    println!("  rm <id>                    Discard object <id>");
    println!();
    println!("Options:");
    println!("  --addr <host:port>   Server address (default: 127.0.0.1:{})", DEFAULT_PORT);
    println!("  --keep               Leave the object on the server after get");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut addr = format!("127.0.0.1:{DEFAULT_PORT}");
    let mut keep = false;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" => {
                i += 1;
                addr = args.get(i).context("--addr requires a value")?.clone();
            }
            "--keep" => keep = true,
            other => remaining.push(other),
        }
        i += 1;
    }

    let client = Client::new(addr);

    match remaining.as_slice() {
        ["put", id, path]              => cmd_put(&client, id, path).await,
        ["get", id, len]               => cmd_get(&client, id, len, None, keep).await,
        ["get", id, len, out]          => cmd_get(&client, id, len, Some(out), keep).await,
        ["rm", id]                     => cmd_rm(&client, id).await,
        ["help"] | ["--help"] | ["-h"] => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
