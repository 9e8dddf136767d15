use persistent_anchors::backend::MockBackend;
use persistent_anchors::core::{AnchorPayload, NativeTrackingState, Pose, RawObservation, TrackingStateReason};
use persistent_anchors::tracking::AnchorChangeEvent;
use persistent_anchors::utils::{AnchorManagerConfig, ConfigurationManager};
use persistent_anchors::PersistentAnchorManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const FRAME_S: f64 = 1.0 / 30.0;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    Registry::default().with(filter).with(fmt_layer).init();
}

fn load_config(args: &[String]) -> Result<AnchorManagerConfig, Box<dyn std::error::Error>> {
    match args.get(1).map(String::as_str) {
        None => Ok(AnchorManagerConfig {
            temporal_fusion_enabled: true,
            interpolation_enabled: true,
            interpolation_duration_s: 0.25,
            ..AnchorManagerConfig::default()
        }),
        Some(path) => Ok(ConfigurationManager::from_file(path)?.config().clone()),
    }
}

/// Scripted session against the mock backend; every change event is printed as JSON
fn run_session(config: AnchorManagerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut manager = PersistentAnchorManager::new(MockBackend::new(), config)?;
    manager.subscribe(Box::new(|event: &AnchorChangeEvent| {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("failed to serialize event: {}", e),
        }
    }));

    let lobby = AnchorPayload::from_base64("bG9iYnktZW50cmFuY2UtYW5jaG9y")?;
    let desk = AnchorPayload::from_base64("ZnJvbnQtZGVzay1hbmNob3I=")?;
    let lobby_id = manager.try_localize(&lobby)?;
    let desk_id = manager.try_localize(&desk)?;
    println!("VPS session: {}", manager.get_vps_session_id()?);

    let mut timestamp_ms = 1_000;
    for frame in 0..12 {
        timestamp_ms += 33;
        let jitter = if frame % 2 == 0 { 0.02 } else { -0.02 };
        let backend = manager.backend_mut();
        backend.report_localization(
            lobby_id,
            RawObservation::tracking(Pose::from_position(1.0 + jitter, 0.0, -2.0), timestamp_ms).with_confidence(0.9),
        )?;

        match frame {
            2 => backend.report_localization(
                desk_id,
                RawObservation::tracking(Pose::from_position(-3.0, 0.0, 1.5), timestamp_ms)
                    .with_state(NativeTrackingState::Limited, TrackingStateReason::Relocalizing)
                    .with_confidence(0.3),
            )?,
            5 => backend.report_localization(
                desk_id,
                RawObservation::tracking(Pose::from_position(-3.1, 0.0, 1.4), timestamp_ms).with_confidence(0.8),
            )?,
            8 => backend.set_tracking_state(desk_id, NativeTrackingState::None, TrackingStateReason::ExcessiveMotion)?,
            10 => backend.report_removed(desk_id)?,
            _ => {}
        }

        let summary = manager.tick(FRAME_S)?;
        if !summary.is_clean() {
            eprintln!("frame {}: {} records rejected", frame, summary.rejected.len());
        }
    }

    manager.destroy(lobby_id);
    println!("Anchors remaining: {}", manager.anchor_count());
    manager.dispose();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 3 && args[1] == "--write-default-config" {
        let mut manager = ConfigurationManager::new();
        manager.save_to_file(&args[2])?;
        println!("Wrote default configuration to {}", args[2]);
        return Ok(());
    }

    if args.len() > 2 {
        eprintln!(
            "Usage: {} [config.json]",
            args.first().map_or("persistent_anchors", |s| s.as_str())
        );
        eprintln!(
            "   or: {} --write-default-config <path>",
            args.first().map_or("persistent_anchors", |s| s.as_str())
        );
        return Err("Invalid arguments".into());
    }

    let config = load_config(&args)?;
    run_session(config)
}
