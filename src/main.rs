// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use gesture_control::{
    Command, DetectorError, Dispatcher, EventExporter, Frame, GestureConfig, GestureSession,
    HandDetector, LoggingSink, PerformanceMetrics, ReplayDetector,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "gesture_control",
    about = "Replay a recorded hand-landmark stream through the gesture pipeline"
)]
struct Args {
    /// JSON config file (missing sections use defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Landmark recording, one JSON frame per line
    input: PathBuf,
}

/// Runs every frame of the stream through the session, queueing commands and
/// recording events as they are produced.
fn replay(
    detector: &mut impl HandDetector,
    session: &mut GestureSession,
    dispatcher: &mut Dispatcher,
    exporter: &mut EventExporter,
    config: &GestureConfig,
) -> Result<PerformanceMetrics> {
    let mut metrics = PerformanceMetrics::new();
    // Last frame geometry, reused for records that fail to parse
    let mut last_frame = Frame::empty(0.0, 0, 0);
    loop {
        let frame = match detector.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(metrics),
            Err(e @ DetectorError::Parse { .. }) => {
                warn!("{}, treating as an empty frame", e);
                Frame::empty(last_frame.timestamp, last_frame.width, last_frame.height)
            }
            Err(e) => return Err(e.into()),
        };

        let (output, latest) = session.process_frame_with_metrics(&frame);
        metrics = latest;
        let index = session.frame_count();

        if let Some(event) = output.confirmed {
            exporter.add_gesture(index, frame.timestamp, &event);
            if let Some(command) = Command::for_gesture(&event) {
                dispatcher.submit(command);
            }
        }
        if let Some(event) = output.revolution {
            exporter.add_revolution(index, frame.timestamp, &event);
            if let Some(command) = Command::for_revolution(&event, &config.dispatch) {
                dispatcher.submit(command);
            }
        }

        last_frame = frame;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => GestureConfig::load(path)?,
        None => GestureConfig::default(),
    };

    let file = File::open(&args.input)
        .with_context(|| format!("cannot open landmark stream {}", args.input.display()))?;
    let mut detector = ReplayDetector::new(BufReader::new(file));

    let mut session = GestureSession::new(config.clone());
    let mut dispatcher = Dispatcher::spawn(LoggingSink, &config.dispatch);
    let mut exporter = EventExporter::new(config.output_directory(), None);

    let span = tracing::info_span!("session", id = %session.id());
    let metrics = span.in_scope(|| {
        replay(&mut detector, &mut session, &mut dispatcher, &mut exporter, &config)
    })?;

    let stats = dispatcher.shutdown().await;
    info!(
        "processed {} frames: {} commands executed, {} failed, {} dropped",
        session.frame_count(),
        stats.executed,
        stats.failed,
        stats.dropped
    );
    info!(
        "{} events recorded, {:.1} fps ({:.2} ms per frame)",
        exporter.records().len(),
        metrics.avg_fps,
        metrics.avg_processing_time * 1000.0
    );

    exporter.set_frames_seen(session.frame_count());
    let csv_path = exporter.export_csv()?;
    let report_path = exporter.generate_report()?;
    info!("events written to {}", csv_path.display());
    info!("report written to {}", report_path.display());

    Ok(())
}
