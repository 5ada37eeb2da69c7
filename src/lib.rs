pub mod auth;
pub mod capture;
pub mod db;
pub mod error;
pub mod farm;
pub mod forms;
pub mod layout;
pub mod navigation;
pub mod prediction;
pub mod recommendations;
pub mod sensor;
pub mod settings;
pub mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use log::{info, warn};

use capture::{
    device::{select_provider, MediaDevice},
    events::{EventSink, LogSink},
    orchestrator::{OrchestratorConfig, SessionOrchestrator},
    session::SessionPhase,
};
use db::Database;
use error::NetworkError;
use navigation::{MethodSelection, Navigator, Route, RouteStack};
use prediction::PredictionClient;
use settings::{AppSettings, SettingsStore};

const ENABLE_LOGS: bool = true;


const CAMERA_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Long-lived services shared by every screen.
pub struct App {
    settings: SettingsStore,
    db: Database,
    device: Arc<dyn MediaDevice>,
    navigator: Arc<RouteStack>,
    events: Arc<dyn EventSink>,
}

impl App {
    pub fn bootstrap(data_dir: &Path, events: Arc<dyn EventSink>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let db = Database::new(data_dir.join("agrisense.sqlite3"))?;
        let device = select_provider(settings.get().camera_provider);
        info!("Camera provider: {}", device.name());

        Ok(Self {
            settings,
            db,
            device,
            navigator: Arc::new(RouteStack::default()),
            events,
        })
    }

    pub fn settings(&self) -> AppSettings {
        self.settings.get()
    }

    pub fn settings_store(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn navigator(&self) -> &RouteStack {
        &self.navigator
    }

    /// A fresh capture session bound to the shared device and navigator.
    pub fn capture_session(&self) -> SessionOrchestrator {
        let settings = self.settings.get();
        let navigator: Arc<dyn Navigator> = self.navigator.clone();
        SessionOrchestrator::new(
            Arc::clone(&self.device),
            navigator,
            Arc::clone(&self.events),
            OrchestratorConfig {
                facing: settings.default_facing,
                analysis_duration: settings.analysis_duration(),
                ready_timeout: Some(CAMERA_READY_TIMEOUT),
                completion_route: Route::CropRecommendation,
            },
        )
    }

    pub fn prediction_client(&self) -> Result<PredictionClient, NetworkError> {
        let settings = self.settings.get();
        let timeout = settings.prediction_timeout();
        PredictionClient::new(settings.prediction_endpoint, timeout)
    }
}

fn data_dir() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("AGRISENSE_DATA_DIR").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("agrisense"))
}

/// Headless walkthrough of the app: sign in, create a farm, run both
/// analysis variants and list the recommendations.
pub fn run() {
    let data_dir = data_dir();

    let debug = SettingsStore::new(data_dir.join("settings.json"))
        .map(|store| store.get().debug)
        .unwrap_or(false);
    utils::logging::init(if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    info!("AgriSense starting up...");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            log_error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(walkthrough(&data_dir)) {
        log_error!("Walkthrough failed: {err:#}");
        std::process::exit(1);
    }
}

async fn walkthrough(data_dir: &Path) -> Result<()> {
    let app = App::bootstrap(data_dir, Arc::new(LogSink))?;
    let navigator = app.navigator();

    navigator.push(Route::SignIn);
    let credentials = auth::Credentials {
        email: "demo@agrisense.app".into(),
        password: "demo".into(),
    };
    let user = auth::sign_in(app.db(), navigator, &credentials).await?;
    info!("Signed in as {}", user.email);

    navigator.push(Route::CreateFarm);
    let draft = farm::FarmDraft {
        farm_name: "Demo Farm".into(),
        farm_size: "25 acres".into(),
        farm_location: "Nakuru, Kenya".into(),
        soil_type: "Loamy".into(),
        irrigation_type: "Drip".into(),
        climate_zone: "Tropical".into(),
    };
    let stored = farm::create_farm(app.db(), navigator, &draft).await?;
    info!("Farm #{} ready", stored.id);

    run_camera_variant(&app).await?;
    run_sensor_variant(&app).await?;

    for crop in recommendations::catalog() {
        println!(
            "{}. {} ({}) score {} [{}] plant {}",
            crop.rank,
            crop.name,
            crop.scientific_name,
            crop.growth_score,
            crop.rating().as_str(),
            crop.planting_season
        );
    }

    let layout = layout::MainLayout::new(navigator, app.db());
    layout.logout().await?;
    info!("Final route: {}", navigator.current().unwrap_or(Route::Welcome));
    Ok(())
}

async fn run_camera_variant(app: &App) -> Result<()> {
    let mut selection = MethodSelection::default();
    selection.select(capture::simulator::AnalysisMethod::Camera);
    navigator_proceed(app, &selection);

    let mut session = app.capture_session();
    let phase = match session.enter().await {
        Ok(phase) => phase,
        Err(err) => {
            warn!("Camera unavailable: {}", err.alert().message);
            session.exit();
            return Ok(());
        }
    };
    if let SessionPhase::PermissionDenied(reason) = phase {
        warn!("Camera access denied: {}", reason.user_message());
        session.exit();
        return Ok(());
    }

    session.wait_until_ready().await?;
    let Some(image) = session.capture().await? else {
        warn!("Camera was not ready; skipping capture");
        session.exit();
        return Ok(());
    };
    info!("Captured {} bytes from the {} camera", image.len(), image.facing().as_str());

    session.analyze()?;
    session.run_to_completion().await?;
    navigator_back_to_selection(app);
    Ok(())
}

async fn run_sensor_variant(app: &App) -> Result<()> {
    let mut selection = MethodSelection::default();
    selection.select(capture::simulator::AnalysisMethod::Sensor);
    navigator_proceed(app, &selection);

    let form = sensor::SensorForm {
        ph: "6.5".into(),
        moisture: "42".into(),
        temperature: "24".into(),
        nitrogen: "35".into(),
        phosphorus: "18".into(),
        potassium: "22".into(),
        soil_texture: "Loamy".into(),
        ..Default::default()
    };
    let readings = form.validate()?;

    let mut session = app.capture_session();
    session.analyze_readings(readings)?;
    session.run_to_completion().await?;
    Ok(())
}

fn navigator_proceed(app: &App, selection: &MethodSelection) {
    app.navigator().push(Route::MethodSelection);
    selection.proceed(app.navigator());
}

fn navigator_back_to_selection(app: &App) {
    let navigator = app.navigator();
    while navigator.current() != Some(Route::Dashboard) && navigator.back() {}
}
