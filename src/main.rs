use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use frame_duplex::loopback::{self, LoopbackDevice};
use frame_duplex::{
    BinaryFileSink, ExchangeCoordinator, FrameSource, HarnessConfig, HexDumpSink,
    ReaderSource, duplex_info, duplex_log, duplex_warn, transport,
};
use humansize::{BINARY, format_size};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Streams raw frames through an image-processing device over TCP", long_about = None)]
struct Args {
    /// Harness configuration (TOML). Built-in board defaults otherwise.
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push a raw input stream to the device and capture its output.
    Run {
        /// Raw input file, a whole number of input frames.
        input: PathBuf,

        /// Where output_frames.bin and the hex dumps go (default: <input dir>/recv_out).
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Device address, overrides the config.
        #[arg(long)]
        address: Option<String>,

        /// Device port, overrides the config.
        #[arg(long)]
        port: Option<u16>,

        /// Number of leading frames to dump as hex text.
        #[arg(long, value_name = "K")]
        dump: Option<u64>,
    },

    /// Act as the device: answer every input frame with an output frame.
    Loopback {
        #[arg(long, default_value = "0.0.0.0:6001")]
        listen: String,

        /// Send frames back unchanged instead of tiling them to the output size.
        #[arg(long)]
        echo: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    duplex_log::init_logging(duplex_log::DEFAULT_FILTER);

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };

    match args.command {
        Command::Run { input, output_dir, address, port, dump } => {
            if let Some(address) = address {
                cfg.remote_address = address;
            }
            if let Some(port) = port {
                cfg.remote_port = port;
            }
            if let Some(dump) = dump {
                cfg.dump_first_frames = dump;
            }
            run(cfg, input, output_dir).await
        }
        Command::Loopback { listen, echo } => {
            let geometry = cfg.geometry();
            let processor = if echo {
                if geometry.input_frame_bytes != geometry.output_frame_bytes {
                    bail!("--echo needs equal input and output frame sizes");
                }
                loopback::echo()
            } else {
                loopback::tile(geometry.output_len())
            };
            let device = LoopbackDevice::bind(&listen, geometry, processor)
                .await
                .with_context(|| format!("binding {listen}"))?
                .with_no_delay(cfg.no_delay);
            device.run().await?;
            Ok(())
        }
    }
}

async fn run(cfg: HarnessConfig, input: PathBuf, output_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let source = ReaderSource::open(&input)
        .await
        .with_context(|| format!("opening {}", input.display()))?;

    // Alignment is checked before any connection is made.
    let coordinator = ExchangeCoordinator::new(cfg.exchange());
    let num_frames = coordinator.plan(source.total_bytes())?;
    let geometry = cfg.geometry();

    let out_dir = output_dir.unwrap_or_else(|| {
        input.parent().map(|p| p.join("recv_out")).unwrap_or_else(|| PathBuf::from("recv_out"))
    });
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("creating {}", out_dir.display()))?;

    duplex_info!("Input: {} ({})", input.display(), format_size(source.total_bytes(), BINARY));
    duplex_info!("Frames: {}", num_frames);
    duplex_info!("Expect RX: {}", format_size(geometry.expected_output(num_frames), BINARY));

    let bin_path = out_dir.join("output_frames.bin");
    let sink = HexDumpSink::new(
        BinaryFileSink::create(&bin_path).await?,
        &out_dir,
        cfg.dump_first_frames,
        cfg.hex_layout(),
    );

    let stream = transport::connect(&cfg.transport()).await?;
    let (reader, writer) = stream.into_split();

    let cancel = coordinator.cancel_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            duplex_warn!("Interrupted, stopping exchange");
            cancel.cancel();
        }
    });

    let outcome = coordinator.run_split(source, sink, reader, writer).await?;
    let session = outcome.session;
    let sink = outcome.sink.into_inner();

    println!(
        "sent {}/{} frames ({}), received {}/{} frames ({}) in {:.2?}",
        session.frames_sent,
        session.num_frames,
        format_size(session.bytes_sent, BINARY),
        session.frames_received,
        session.num_frames,
        format_size(session.bytes_received, BINARY),
        session.elapsed,
    );
    println!("output binary: {} ({} frames)", sink.path().display(), sink.frames_written());

    session.into_result()?;
    Ok(())
}
