//! Writes a few lines, rotates the file the way logrotate's `create` mode
//! does, and shows the tailer carrying on with the new file.

use log_tailer::{TailOptions, Tailer};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio_stream::StreamExt;

fn append(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    write!(file, "{}\r\n", line)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("log_tailer=debug").init();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("demo.log");

    let tailer = Tailer::with_options(
        &path,
        TailOptions::default().with_retry_interval(Duration::from_millis(50)),
    )?;
    let mut lines = tailer.lines()?;

    let writer_path = path.clone();
    let stopper = tailer.clone();
    tokio::spawn(async move {
        for batch in 0..3 {
            for i in 0..3 {
                append(&writer_path, &format!("batch {} line {}", batch, i)).ok();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            fs::rename(&writer_path, writer_path.with_extension(format!("log.{}", batch))).ok();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        stopper.stop();
    });

    while let Some(line) = lines.next().await {
        println!("{}", line?);
    }

    println!("stopped");
    Ok(())
}
