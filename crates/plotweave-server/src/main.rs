use plotweave_common::PlotError;
use plotweave_logger::log;
use plotweave_logger::LogSeverity::{Fatal, Info, Warning};
use plotweave_server::config::DEFAULT_CONFIG_PATH;
use plotweave_server::{driver, ServerConfig, SummarySink};
use std::env;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    log("Plotweave init".to_string(), Info);

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config = match ServerConfig::load(&path) {
        Ok(config) => config,
        Err(PlotError::IoError(err)) => {
            log(
                format!("Could not read {} ({}), using the default world", path, err),
                Warning,
            );
            ServerConfig::default()
        }
        Err(err) => {
            log(format!("Invalid config {}: {}", path, err), Fatal);
            process::exit(1);
        }
    };

    let sink = Arc::new(SummarySink::default());
    match driver::run(config, sink.clone()).await {
        Ok(_) => log(
            format!(
                "Done: {} chunk(s), {} block(s), {} byte(s) encoded",
                sink.chunks(),
                sink.blocks(),
                sink.bytes()
            ),
            Info,
        ),
        Err(err) => {
            log(format!("Generation failed: {}", err), Fatal);
            process::exit(1);
        }
    }
}
