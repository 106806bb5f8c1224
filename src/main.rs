use anyhow::Result;
use std::sync::{Arc, Mutex};

use vor_bench::bench::{BenchmarkReport, BenchmarkRunner, MockSearchServer};
use vor_bench::config::Config;
use vor_bench::error::BenchError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

    let config = match Config::load() {
        Ok(config) => config,
        Err(BenchError::Usage(message)) => {
            println!("{}", program);
            eprintln!("{}", message);
            eprintln!("Need command-line arguments:");
            eprintln!("\t<iters> <test1> <test2> ...");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    // Stdout carries only the JSON document in JSON mode
    if config.json_output {
        eprintln!("{}", program);
    } else {
        println!("{}", program);
    }

    // Initialize logging with the configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    config.validate()?;

    let mut bench_config = config.benchmark_config();

    // Kept alive until the run finishes; dropping it shuts it down
    let mut mock_server = None;
    if config.standalone {
        let mut server = MockSearchServer::new(config.mock_server_config());
        let port = server.start().await?;
        tracing::info!("Mock search server started on port {}", port);
        bench_config = bench_config.pointed_at("127.0.0.1", port);
        mock_server = Some(server);
    }

    tracing::info!(
        "Benchmarking {} with {} iteration(s) over {} test file(s)",
        bench_config.addr(),
        bench_config.iterations,
        bench_config.tests.len()
    );

    let mut runner = BenchmarkRunner::new(bench_config);
    if config.json_output {
        runner = runner.with_warning_sink(Arc::new(Mutex::new(std::io::stderr())));
    }
    let snapshot = match runner.run().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!("Benchmark aborted: {}", e);
            if e.is_connection_error() {
                tracing::error!("Make sure the search server is running and reachable.");
            }
            return Err(e.into());
        }
    };

    let report = BenchmarkReport::from_snapshot(&program, runner.config(), snapshot);

    if config.json_output {
        println!("{}", report.to_json());
    } else {
        report.print_summary();
        if config.details {
            report.print_table();
        }
    }

    if let Some(mut server) = mock_server {
        tracing::debug!("{} requests served by mock server", server.request_count());
        server.stop();
    }

    Ok(())
}
