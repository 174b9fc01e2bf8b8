use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use http::Uri;
use tracing::debug;

use k8_api_rewriter::new_shared;
use k8_api_rewriter::rules::RulesConfig;
use k8_api_rewriter::Action;
use k8_api_rewriter::Outcome;

/// Rename or restore a Kubernetes JSON payload with a rule file.
///
/// The payload is renamed, as a client request would be, unless --restore is given.
#[derive(Debug, Parser)]
#[command(name = "k8-rewrite-util", version)]
struct Opt {
    /// rule file, YAML or JSON
    #[arg(long, value_name = "FILE")]
    rules: PathBuf,

    /// restore a server response instead of renaming a request
    #[arg(long)]
    restore: bool,

    /// API path the payload was sent to or received from
    #[arg(long, default_value = "/")]
    path: String,

    /// treat the payload as a PATCH body
    #[arg(long, conflicts_with = "restore")]
    patch: bool,

    /// JSON payload
    payload: PathBuf,
}

fn main() {
    fluvio_future::subscriber::init_tracer(None);
    if let Err(err) = run(Opt::parse()) {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run(opt: Opt) -> Result<()> {
    let config = RulesConfig::from_file(&opt.rules)
        .with_context(|| format!("unable to load rules from {}", opt.rules.display()))?;
    let rewriter = new_shared(config)?;

    let uri: Uri = opt
        .path
        .parse()
        .with_context(|| format!("invalid api path: {}", opt.path))?;
    let target = rewriter.target_request(&uri);
    debug!(resource = %target.resource_for_log(), path = %target.request_uri(), "target");

    let body = fs::read(&opt.payload)
        .with_context(|| format!("unable to read payload {}", opt.payload.display()))?;

    let outcome = if opt.patch {
        rewriter.rewrite_patch(&target, &body)?
    } else {
        let action = if opt.restore {
            Action::Restore
        } else {
            Action::Rename
        };
        rewriter.rewrite_json_payload(&target, &body, action)?
    };

    match outcome {
        Outcome::Excluded => eprintln!("payload excluded"),
        Outcome::Unchanged => print_json(&body)?,
        Outcome::Rewritten(rewritten) => print_json(&rewritten)?,
    }
    Ok(())
}

fn print_json(body: &[u8]) -> Result<()> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
