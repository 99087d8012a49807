use log_tailer::Tailer;
use std::env;
use std::process;
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "log_tailer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <file_path>", args[0]);
        process::exit(1);
    }

    let file_path = &args[1];

    let tailer = match Tailer::new(file_path) {
        Ok(tailer) => tailer,
        Err(e) => {
            eprintln!("Error setting up tailer: {}", e);
            process::exit(1);
        }
    };

    let mut lines = match tailer.lines() {
        Ok(lines) => lines,
        Err(e) => {
            eprintln!("Error starting tailer: {}", e);
            process::exit(1);
        }
    };

    let stopper = tailer.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    tracing::info!("following {}", file_path);
    while let Some(line_result) = lines.next().await {
        match line_result {
            Ok(line) => println!("{}", line),
            Err(e) => {
                eprintln!("Error reading file: {}", e);
                process::exit(1);
            }
        }
    }
}
