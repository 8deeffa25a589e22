mod app;
mod config;

use anyhow::Result;
use winit::dpi::LogicalSize;

use henge_engine::device::GpuInit;
use henge_engine::logging::{init_logging, LoggingConfig};
use henge_engine::window::{Runtime, RuntimeConfig};

use crate::app::{log_controls, ViewerApp};
use crate::config::ViewerConfig;

const TITLE: &str = "henge";

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let cfg = ViewerConfig::load();
    log::info!("assets: {}", cfg.asset_dir.display());
    log_controls();

    let app = ViewerApp::new(&cfg, TITLE);

    let runtime = RuntimeConfig {
        title: TITLE.to_string(),
        initial_size: LogicalSize::new(800.0, 600.0),
    };
    Runtime::run(runtime, GpuInit::default(), app)
}
