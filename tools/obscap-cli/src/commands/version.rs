//! Print the capture engine version.

use obscap_capture_engine::EngineKind;
use obscap_common::config::AppConfig;

use super::open_session;

pub fn run(engine: EngineKind, config: &AppConfig) -> anyhow::Result<()> {
    let session = open_session(engine, config);
    println!("Engine version: {}", session.query_version());
    session.shutdown()?;
    Ok(())
}
