//! Integration tests: config file, sysfs dock sensor and layout use cases
//! wired together against the in-memory display provider.

use std::path::PathBuf;

use thinkdock::application::dock_layout::{apply_dock_layout, LayoutPolicy, PanelPlacement};
use thinkdock::application::dock_watch::DockWatcher;
use thinkdock::infrastructure::dock::{DockSensor, SysfsDock};
use thinkdock::infrastructure::storage::config::load_config_from;
use thinkdock_core::provider::mock::fixture;
use thinkdock_core::{
    Alignment, ConnectionState, MockDisplayProvider, Point, ScreenResources,
};

const MODALIAS: &str = "acpi:IBM0079:PNP0C15:LNXDOCK:\n";

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "thinkdock_it_{}_{name}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

#[test]
fn test_config_file_policy_drives_docked_layout() {
    // Arrange
    let dir = scratch_dir("policy");
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        "[layout]\nplacement = \"left\"\nalignment = \"center\"\n",
    )
    .unwrap();
    let cfg = load_config_from(&path).expect("config loads");
    let policy = LayoutPolicy::from(&cfg.layout);
    let mut provider = MockDisplayProvider::new(fixture::docked());

    // Act
    let report = apply_dock_layout(&mut provider, &policy, true).expect("layout applies");

    // Assert
    assert_eq!(policy.alignment, Alignment::Center);
    assert_eq!(report.enabled.len(), 2);
    assert_eq!(report.origin, Point::new(-1366, 0));
    assert_eq!(report.screen.pixels.width, 1366 + 1920);
    assert_eq!(report.screen.pixels.height, 1080);

    let after = ScreenResources::query(&provider).unwrap();
    let panel = after.output(fixture::LVDS).unwrap().controller().unwrap();
    let external = after.output(fixture::DP2).unwrap().controller().unwrap();
    // (1080 - 768) / 2 = 156
    assert_eq!(after.controller(panel).unwrap().position(), Point::new(0, 156));
    assert_eq!(after.controller(external).unwrap().position(), Point::new(1366, 0));

    // Cleanup
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_undock_after_docked_layout_keeps_panel_only() {
    // Arrange
    let policy = LayoutPolicy::default();
    let mut provider = MockDisplayProvider::new(fixture::docked());
    apply_dock_layout(&mut provider, &policy, true).unwrap();

    let mut snapshot = provider.current_snapshot().clone();
    let dp = snapshot
        .outputs
        .iter_mut()
        .find(|o| o.id == fixture::DP2)
        .unwrap();
    dp.connection = ConnectionState::Disconnected;
    provider.replace_snapshot(snapshot);

    // Act
    let report = apply_dock_layout(&mut provider, &policy, false).unwrap();

    // Assert
    assert_eq!(report.enabled.len(), 1);
    assert_eq!(report.screen.pixels.width, 1366);
    assert_eq!(report.screen.pixels.height, 768);
    let request = provider.last_applied().unwrap();
    assert_eq!(request.primary_output, fixture::LVDS);
    assert_eq!(request.controllers[0].outputs, vec![fixture::LVDS]);
}

#[test]
fn test_external_only_switches_panel_controller_off() {
    // Arrange
    let policy = LayoutPolicy {
        placement: PanelPlacement::ExternalOnly,
        ..LayoutPolicy::default()
    };
    let mut provider = MockDisplayProvider::new(fixture::docked());

    // Act
    let report = apply_dock_layout(&mut provider, &policy, true).unwrap();

    // Assert
    assert_eq!(report.enabled.len(), 1);
    assert_eq!(report.disabled.len(), 1);
    assert_eq!(report.screen.pixels.width, 1920);
    assert_eq!(provider.last_applied().unwrap().primary_output, fixture::DP2);
}

#[test]
fn test_watcher_follows_sysfs_dock_state() {
    // Arrange
    let dir = scratch_dir("watch");
    let docked_path = dir.join("docked");
    let modalias_path = dir.join("modalias");
    std::fs::write(&docked_path, "0\n").unwrap();
    std::fs::write(&modalias_path, MODALIAS).unwrap();
    let dock = SysfsDock::new(&docked_path, &modalias_path, MODALIAS);
    let policy = LayoutPolicy::default();
    let mut provider = MockDisplayProvider::new(fixture::docked());
    let mut watcher = DockWatcher::new();

    // Act
    let undocked = watcher.tick(&dock, &mut provider, &policy);
    let idle = watcher.tick(&dock, &mut provider, &policy);
    std::fs::write(&docked_path, "1\n").unwrap();
    let docked = watcher.tick(&dock, &mut provider, &policy);

    // Assert
    assert!(dock.is_present());
    assert_eq!(undocked.unwrap().unwrap().enabled.len(), 1);
    assert!(idle.is_none());
    assert_eq!(docked.unwrap().unwrap().enabled.len(), 2);
    assert_eq!(watcher.applied(), Some(true));
    assert_eq!(provider.applied().len(), 2);

    // Cleanup
    std::fs::remove_dir_all(&dir).ok();
}
