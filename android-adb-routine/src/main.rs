use android_adb_routine::adb::{AdbBackend, AdbError, AdbResult};
use android_adb_routine::args::{Args, Mode};
use android_adb_routine::config::RunConfig;
use android_adb_routine::routine::{
    FORCED_EXIT_CODE, InterruptAction, SequencePlan, StageSequencer, on_interrupt,
};
use android_adb_routine::template_matching::{DirTemplateStore, TemplateStore};
use std::path::Path;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

const SCREENSHOT_FILE: &str = "screenshot.png";

#[tokio::main]
async fn main() -> ExitCode {
    let Some(args) = Args::parse() else {
        return ExitCode::SUCCESS;
    };

    let default_level = if args.debug_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = match &args.config_path {
        Some(path) => match RunConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("❌ {e}");
                return ExitCode::FAILURE;
            }
        },
        None => RunConfig::default(),
    };
    args.overrides.apply(&mut config);
    if let Err(e) = config.validate() {
        log::error!("❌ {e}");
        return ExitCode::FAILURE;
    }

    let plan = match &args.plan_path {
        Some(path) => match SequencePlan::load(path) {
            Ok(plan) => plan,
            Err(e) => {
                log::error!("❌ {e}");
                return ExitCode::FAILURE;
            }
        },
        None => SequencePlan::standard_round(),
    };

    if args.mode == Mode::DumpPlan {
        return match plan.to_yaml() {
            Ok(yaml) => {
                print!("{yaml}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("❌ {e}");
                ExitCode::FAILURE
            }
        };
    }

    log::info!(
        "🔌 Connecting to {} (impl='{}')",
        config.device_id,
        config.backend.as_str()
    );
    let backend = match AdbBackend::connect_with(&config.device_id, config.backend).await {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("❌ Could not connect to {}: {e}", config.device_id);
            if let Ok(devices) = AdbBackend::list_devices(config.backend).await {
                for device in devices {
                    log::info!("📱 Available device: {}", device.name);
                }
            }
            return ExitCode::FAILURE;
        }
    };
    log::info!("📱 Connected to {}", backend.device_name());

    if args.mode == Mode::Screenshot {
        return match save_screenshot(&backend, Path::new(SCREENSHOT_FILE)).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                log::error!("❌ Screenshot failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let store = DirTemplateStore::new(config.template_dir.clone());
    preflight_templates(&store, &plan);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&ctrl_c) {
                InterruptAction::Cancel => log::info!(
                    "⏹️ Ctrl-C received, stopping at the next checkpoint (press again to quit now)"
                ),
                InterruptAction::ForceExit => {
                    log::warn!("⛔ Second Ctrl-C, exiting immediately");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        }
    });

    let mut sequencer = StageSequencer::new(&store, &backend, &backend, config, cancel);
    let reason = sequencer.run(&plan).await;
    log::info!(
        "✅ Finished ({reason:?}) after {} rounds",
        sequencer.run_state().round
    );
    ExitCode::SUCCESS
}

async fn save_screenshot(backend: &AdbBackend, path: &Path) -> AdbResult<()> {
    let capture = backend.screen_capture().await?;
    tokio::fs::write(path, &capture.bytes)
        .await
        .map_err(|source| AdbError::WriteCapture {
            path: path.display().to_string(),
            source,
        })?;
    log::info!(
        "✅ Screenshot ({} bytes, {}ms) saved to {}",
        capture.bytes.len(),
        capture.duration_ms,
        path.display()
    );
    Ok(())
}

/// Missing templates only produce warnings; their stages are skipped at runtime.
fn preflight_templates(store: &DirTemplateStore, plan: &SequencePlan) {
    if let Ok(available) = store.list() {
        log::debug!(
            "📂 {} templates in {}",
            available.len(),
            store.root().display()
        );
    }
    let mut missing = 0;
    for name in plan.template_names() {
        if let Err(e) = store.load(&name) {
            log::warn!("⚠️ {e}");
            missing += 1;
        }
    }
    if missing > 0 {
        log::warn!("⚠️ {missing} templates unavailable, their stages will be skipped");
    }
}
