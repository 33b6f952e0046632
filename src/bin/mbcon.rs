//! Console front end wired around the simulated device.
//!
//! Runs an optional script file, then reads commands from stdin until EOF or
//! `exit`. Engine output is rendered line by line: `info`/`response` on
//! stdout, `error` on stderr.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use mbcon::engine::{Engine, EngineOptions, Event};
use mbcon::memory::{self, Bank, DeviceMemory};
use mbcon::script;
use mbcon::transport::MemoryTransport;

#[derive(Parser, Debug)]
#[command(name = "mbcon", about = "Modbus-style console against a simulated register device")]
struct Args {
    /// Unit id (a.k.a. slave address) of the simulated device
    #[arg(short, long, default_value_t = 1)]
    unit_id: u8,

    /// Run a script file before the interactive prompt
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// TOML memory image for the simulated device
    #[arg(short = 'm', long)]
    image: Option<PathBuf>,

    /// Input-register area size when no image is given
    #[arg(long, default_value_t = 2000)]
    input_len: usize,

    /// Holding-register area size when no image is given
    #[arg(long, default_value_t = 2000)]
    holding_len: usize,

    /// Idle-timer quiet window in milliseconds
    #[arg(long)]
    idle_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mem = match &args.image {
        Some(path) => {
            let image = memory::load_image_file(path)
                .with_context(|| format!("loading memory image {}", path.display()))?;
            DeviceMemory::from_image(&image).context("applying memory image presets")?
        }
        None => DeviceMemory::new(args.input_len, args.holding_len),
    };
    log::info!(
        "simulated device: {} input / {} holding registers, unit {}",
        mem.len(Bank::Input),
        mem.len(Bank::Holding),
        args.unit_id
    );
    let transport = MemoryTransport::new(mem, args.unit_id);

    let mut options = EngineOptions::default().with_unit_id(args.unit_id);
    if let Some(ms) = args.idle_ms {
        options = options.with_idle_window(Duration::from_millis(ms));
    }
    let engine = Engine::spawn(transport, options);

    let mut printer_rx = engine.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match printer_rx.recv().await {
                Ok(Event::Info(line) | Event::Response(line)) => println!("{line}"),
                Ok(Event::Error(line)) => eprintln!("error: {line}"),
                Ok(Event::AfterJob | Event::QueueIdle) => {}
                Ok(Event::End(err)) => {
                    if let Some(err) = err {
                        eprintln!("fatal: {err}");
                    }
                    break;
                }
                Err(RecvError::Lagged(n)) => log::warn!("printer lagged by {n} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Some(file) = &args.file {
        script::run_script(&engine, file)
            .await
            .with_context(|| format!("running script {}", file.display()))?;
    }

    let mut end_rx = engine.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !engine.is_stopped() {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Some((command, cmd_args)) = script::parse_line(&line) {
                        engine.enqueue(command, cmd_args);
                    }
                }
                None => {
                    // stdin EOF behaves like an explicit exit
                    engine.enqueue("exit", Vec::new());
                    break;
                }
            },
            event = end_rx.recv() => {
                if matches!(event, Ok(Event::End(_)) | Err(RecvError::Closed)) {
                    break;
                }
            }
        }
    }

    engine.join().await;
    let _ = printer.await;
    Ok(())
}
