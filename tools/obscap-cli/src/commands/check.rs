//! Check permission and system capabilities.

use obscap_capture_engine::EngineKind;
use obscap_common::config::AppConfig;
use obscap_platform_core::{DisplayServer, PermissionStatus};
use obscap_platform_linux::capabilities::{
    all_required_available, check_capabilities, print_capability_report,
};
use obscap_platform_linux::detect_display_server;

use super::open_session;

pub fn run(engine: EngineKind, config: &AppConfig, request: bool) -> anyhow::Result<()> {
    println!("obscap System Check");
    println!("{}", "=".repeat(50));

    let session = open_session(engine, config);
    println!("[OK] Engine version: {}", session.query_version());

    let mut permission = session.check_capture_permission();
    if request && permission == PermissionStatus::NotDetermined {
        permission = session.request_capture_permission();
    }
    match permission {
        PermissionStatus::Granted => println!("[OK] Screen recording permission: granted"),
        PermissionStatus::NotApplicable => {
            println!("[OK] Screen recording permission: not applicable on this platform")
        }
        other => println!("[WARN] Screen recording permission: {other}"),
    }

    if cfg!(target_os = "linux") {
        match detect_display_server() {
            DisplayServer::Wayland => println!("[OK] Display server: Wayland"),
            DisplayServer::X11 => println!("[OK] Display server: X11"),
            _ => println!("[WARN] Display server: Unknown"),
        }

        let capabilities = check_capabilities();
        println!();
        print_capability_report(&capabilities);
        println!();
        if all_required_available(&capabilities) {
            println!("All required capabilities are available.");
        } else {
            println!("Some required capabilities are missing. See above for fixes.");
        }
    }

    println!();
    match session.initialize() {
        Ok(handle) => {
            println!("[OK] Engine initialized ({handle})");
            match session.list_displays() {
                Ok(displays) => {
                    println!("[OK] Displays detected: {}", displays.len());
                    for d in &displays {
                        println!(
                            "     [{}] {} {} {}",
                            d.id,
                            d.label,
                            d.bounds(),
                            if d.primary { "(primary)" } else { "" }
                        );
                    }
                }
                Err(e) => println!("[FAIL] Display enumeration: {e}"),
            }
        }
        Err(e) => println!("[FAIL] Engine initialization: {e}"),
    }

    session.shutdown()?;
    Ok(())
}
