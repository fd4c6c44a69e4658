use anyhow::{bail, Context, Result};
use std::{
    env, fs,
    io::{self, BufRead, Write},
    path::PathBuf,
};

use ext_scope_inspector::protocol::{error_names, ROOT_ACTOR};
use ext_scope_inspector::{route_packet, InspectorConfig, ScopeSnapshot, ThreadActor};

fn usage() {
    eprintln!("scope-inspect [--config <file>] --snapshot <file> [--requests <file>]");
    eprintln!();
    eprintln!("Loads a scope-chain snapshot, prints the innermost scope's actor id,");
    eprintln!("then answers one request packet per input line (stdin by default).");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <file>    TOML file with a [scope_inspector] table");
    eprintln!("  --snapshot <file>  JSON scope-chain snapshot");
    eprintln!("  --requests <file>  JSON request packets, one per line");
    eprintln!();
    eprintln!("Logging is controlled by SCOPE_INSPECTOR_LOG (default: info).");
}

struct Args {
    config: Option<PathBuf>,
    snapshot: PathBuf,
    requests: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut config = None;
    let mut snapshot = None;
    let mut requests = None;

    while let Some(a) = args.next() {
        match a.as_str() {
            "--config" => {
                config = Some(PathBuf::from(
                    args.next().context("--config requires a path")?,
                ));
            }
            "--snapshot" => {
                snapshot = Some(PathBuf::from(
                    args.next().context("--snapshot requires a path")?,
                ));
            }
            "--requests" => {
                requests = Some(PathBuf::from(
                    args.next().context("--requests requires a path")?,
                ));
            }
            "-h" | "--help" => {
                usage();
                std::process::exit(0);
            }
            other => {
                usage();
                bail!("unknown argument: {}", other);
            }
        }
    }

    let Some(snapshot) = snapshot else {
        usage();
        bail!("--snapshot is required");
    };

    Ok(Args {
        config,
        snapshot,
        requests,
    })
}

fn load_config(path: Option<&PathBuf>) -> Result<InspectorConfig> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            InspectorConfig::from_toml_str(&text).context("parsing config")
        }
        None => Ok(InspectorConfig::default()),
    }
}

fn main() -> Result<()> {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("SCOPE_INSPECTOR_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = parse_args()?;
    let config = load_config(args.config.as_ref())?;

    let snapshot_text = fs::read_to_string(&args.snapshot)
        .with_context(|| format!("reading snapshot {}", args.snapshot.display()))?;
    let snapshot: serde_json::Value =
        serde_json::from_str(&snapshot_text).context("parsing snapshot JSON")?;
    let env = ScopeSnapshot::from_value(snapshot).context("building scope chain")?;

    let mut thread = ThreadActor::new(config);
    let actor = thread.create_environment_actor(env);
    tracing::info!(actor = %actor.actor_id(), "Loaded snapshot");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", serde_json::json!({ "actor": actor.actor_id() }))?;

    let input: Box<dyn BufRead> = match &args.requests {
        Some(path) => Box::new(io::BufReader::new(
            fs::File::open(path)
                .with_context(|| format!("opening requests {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    for (line_no, line) in input.lines().enumerate() {
        let line = line.context("reading request")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<serde_json::Value>(line) {
            Ok(packet) => route_packet(&mut thread, packet),
            Err(e) => {
                tracing::warn!(line = line_no + 1, "Skipping invalid JSON: {}", e);
                serde_json::json!({
                    "from": ROOT_ACTOR,
                    "error": error_names::MALFORMED_PACKET,
                    "message": e.to_string()
                })
            }
        };
        writeln!(out, "{}", reply)?;
    }

    Ok(())
}
