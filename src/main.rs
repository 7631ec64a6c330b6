use anyhow::{Context, Result};
use clap::Parser;
use particle_wave::config::Config;

fn main() -> Result<()> {
    let cfg = Config::parse();
    init_logging(&cfg)?;
    log::info!("particle_wave {} starting", env!("CARGO_PKG_VERSION"));
    particle_wave::app::run(cfg)
}

/// Logs only go to `--log-file`; stderr would tear the alternate screen.
fn init_logging(cfg: &Config) -> Result<()> {
    let Some(path) = cfg.log_file.as_deref() else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;
    env_logger::builder()
        .filter_level(cfg.log_level.filter())
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}
