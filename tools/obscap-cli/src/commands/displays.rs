//! List capturable displays.

use obscap_capture_engine::EngineKind;
use obscap_common::config::AppConfig;

use super::open_session;

pub fn run(engine: EngineKind, config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let session = open_session(engine, config);
    session.initialize()?;

    let listed = session.list_displays();
    session.shutdown()?;
    let displays = listed?;

    if json {
        println!("{}", serde_json::to_string_pretty(&displays)?);
        return Ok(());
    }

    println!("Displays: {}", displays.len());
    for d in &displays {
        println!(
            "  [{}] {} {} at ({}, {}) {}",
            d.id,
            d.label,
            d.bounds(),
            d.x,
            d.y,
            if d.primary { "(primary)" } else { "" }
        );
    }
    Ok(())
}
