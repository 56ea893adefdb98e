//! Connectivity check for operators.
//!
//! Resolves the candidate plan from the `CAMPUSGATE_*` environment, probes
//! it and prints what the dashboard would see. Exits non-zero when nothing
//! is reachable.
//!
//! ```sh
//! export CAMPUSGATE_API_HOST=api.campus.edu
//! export CAMPUSGATE_PAGE_SCHEME=https
//! cargo run --bin campusgate-probe -- --all
//! ```

use campusgate_fallback::{ConnectionProber, ProtocolResolver, ResilienceConfig};

const USAGE: &str = "Usage: campusgate-probe [--all] [--json]

  --all    probe every candidate instead of stopping at the first success
  --json   print the report as JSON";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campusgate=info,warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut exhaustive = false;
    let mut json = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--all" => exhaustive = true,
            "--json" => json = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return;
            }
            other => {
                eprintln!("Error: unknown argument '{other}'\n\n{USAGE}");
                std::process::exit(2);
            }
        }
    }

    let mut config = ResilienceConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(2);
    });
    config.probe.exhaustive = exhaustive;

    let resolver = ProtocolResolver::new(&config.resolver).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(2);
    });
    let prober = ConnectionProber::new(config.page, config.probe.clone()).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(2);
    });

    let plan = resolver.resolve(config.page);
    let report = prober.probe(plan.candidates()).await;

    if json {
        let results: Vec<serde_json::Value> = report
            .results()
            .iter()
            .map(|r| {
                serde_json::json!({
                    "candidate": r.candidate.base_url(),
                    "reachable": r.reachable,
                    "status": r.status,
                    "latency_ms": r.latency.map(|l| l.as_millis() as u64),
                    "error": r.error,
                })
            })
            .collect();
        let document = serde_json::json!({
            "page": config.page.scheme,
            "override": plan.is_override(),
            "demo_fallback": plan.demo_fallback(),
            "candidates": plan.candidates().iter().map(|c| c.base_url()).collect::<Vec<_>>(),
            "results": results,
            "selected": report.selected().map(|c| c.base_url()),
        });
        match serde_json::to_string_pretty(&document) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error: {e}"),
        }
    } else {
        println!("Page transport: {}", config.page.scheme);
        if plan.is_override() {
            println!("Base URL override in effect");
        }
        println!("\nCandidates:");
        for (i, candidate) in plan.candidates().iter().enumerate() {
            let note = if plan.is_blocked(candidate) {
                "  (blocked: mixed content)"
            } else {
                ""
            };
            println!("  {}. {}{}", i + 1, candidate, note);
        }

        println!("\nProbe results:");
        for result in report.results() {
            match (&result.error, result.latency) {
                (None, Some(latency)) => println!(
                    "  ok    {} ({} ms, HTTP {})",
                    result.candidate,
                    latency.as_millis(),
                    result.status.unwrap_or_default()
                ),
                (Some(error), _) => {
                    println!("  fail  {} [{}] {}", result.candidate, error.kind, error.message);
                    if let Some(remediation) = &error.remediation {
                        println!("        hint: {remediation}");
                    }
                }
                (None, None) => println!("  ?     {}", result.candidate),
            }
        }

        match report.selected() {
            Some(candidate) => println!("\nLive endpoint: {candidate}"),
            None if plan.demo_fallback() => {
                println!("\nNo live endpoint. Demo data is the only option from this page.")
            }
            None => println!("\nNo live endpoint."),
        }
    }

    if !report.is_live() {
        std::process::exit(1);
    }
}
