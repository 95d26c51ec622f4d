//! A small command-line front-end for the pipeline: reads one side of a BGP session's raw
//! byte stream from a file (or stdin) and prints each message it parses and each lifecycle
//! event the session reaches.

use bgp_pipe::pipe::{CallbackFilter, Direction, DirectionMask, Options, Pipe};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "bgp-pipe-demo", about = "Feed a raw BGP byte stream through bgp-pipe")]
struct Args {
    /// Path to a file of raw BGP messages (header-framed). Reads stdin if omitted.
    file: Option<PathBuf>,

    /// Which direction to attach the stream to.
    #[arg(long, value_enum, default_value = "r")]
    direction: DirectionArg,

    /// Print parsed messages instead of just counting them.
    #[arg(long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum DirectionArg {
    L,
    R,
}

impl From<DirectionArg> for Direction {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::L => Direction::L,
            DirectionArg::R => Direction::R,
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut bytes = Vec::new();
    match &args.file {
        Some(path) => {
            std::fs::File::open(path)
                .and_then(|mut f| f.read_to_end(&mut bytes))
                .unwrap_or_else(|e| {
                    log::error!("failed to read {}: {e}", path.display());
                    std::process::exit(1);
                });
        }
        None => {
            std::io::stdin().read_to_end(&mut bytes).unwrap_or_else(|e| {
                log::error!("failed to read stdin: {e}");
                std::process::exit(1);
            });
        }
    }

    let verbose = args.verbose;
    let log_cb: bgp_pipe::pipe::CallbackFn = Arc::new(move |msg| {
        if verbose {
            println!("{:?}: {:?}", msg.msg_type, msg.parsed());
        } else {
            println!("{:?}", msg.msg_type);
        }
        true
    });
    let mut callback = bgp_pipe::pipe::Callback::new(1, DirectionMask::BOTH, log_cb);
    callback.name = Some("print".to_string());
    let callback = Arc::new(callback);

    let event_cb: bgp_pipe::pipe::HandlerFn = Arc::new(|event| {
        log::info!("event: {}", event.event_type);
        true
    });
    let handler = Arc::new(bgp_pipe::pipe::Handler::new(
        1,
        vec!["*".to_string()],
        DirectionMask::BOTH,
        event_cb,
    ));

    let pipe = Pipe::new(Options {
        handlers: vec![handler],
        ..Options::default()
    });
    pipe.start().expect("pipe already started");

    let input = pipe.attach_input(args.direction.into(), &[callback], false, CallbackFilter::all());
    if let Err(e) = input.write_bytes(&bytes).await {
        log::error!("ingest error: {e}");
    }

    drop(input);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    pipe.stop().await.ok();
}
