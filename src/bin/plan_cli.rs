//! Thin CLI for interactive plan inspection (SPEC_FULL §0).
//!
//! Reads a query off stdin or a `--query` argument using a tiny embedded
//! s-expression-like reader — not a full Datalog parser (spec.md §1
//! explicitly places text parsing out of scope) — and prints the realized
//! plan's phases as JSON.
//!
//! ```text
//! plan_cli '[:find ?e ?n :where [?e :person/name ?n] [(> ?e 100)]]'
//! ```

use dlplanner::config::PlannerConfig;
use dlplanner::{plan, Query};

mod reader;

fn init_logging(config: &PlannerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let config = PlannerConfig::load().unwrap_or_default();
    init_logging(&config);

    let source: String = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
                .expect("failed to read query from stdin");
            buf
        }
    };

    let query: Query = match reader::read_query(&source) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("failed to read query: {e}");
            std::process::exit(1);
        }
    };

    let options = config.to_options();
    match plan(&query, &options) {
        Ok(realized) => {
            let json = serde_json::to_string_pretty(&realized).expect("serialize plan");
            println!("{json}");
        }
        Err(e) => {
            eprintln!("planning failed: {e}");
            std::process::exit(1);
        }
    }
}
