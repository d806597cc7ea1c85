//! Integration tests for configuration loading
//!
//! Tests that verify config loading from files and environment variables.

use sdfview::config::AppConfig;
use sdfview_core::Mode;
use sdfview_render::Colormap;
use serial_test::serial;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sdfview_config_{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
#[serial]
fn test_env_override() {
    std::env::set_var("SDFVIEW_WINDOW__TITLE", "Test From Env");
    let config = AppConfig::load().unwrap();
    std::env::remove_var("SDFVIEW_WINDOW__TITLE");
    assert_eq!(config.window.title, "Test From Env");
}

#[test]
#[serial]
fn test_default_file_loading() {
    std::env::remove_var("SDFVIEW_WINDOW__TITLE");
    let config = AppConfig::load().unwrap();
    assert_eq!(config.view.colormap, Colormap::Viridis);
    assert!(config.data.dir.is_none());
}

#[test]
#[serial]
fn test_user_file_overrides_default() {
    let dir = scratch_dir("user_override");
    std::fs::write(
        dir.join("default.toml"),
        "[view]\nmode = \"layer\"\nsurface = 0.05\ninverse = false\ncolormap = \"viridis\"\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("user.toml"),
        "[view]\nmode = \"grid layer\"\nsurface = 0.2\ninverse = true\ncolormap = \"gray\"\nclim = [0.0, 2.0]\n\n[data]\ndir = \"/data/brain\"\n",
    )
    .unwrap();

    let config = AppConfig::load_from(&dir).unwrap();
    assert_eq!(config.view.mode, Mode::GridLayer);
    assert_eq!(config.view.surface, 0.2);
    assert!(config.view.inverse);
    assert_eq!(config.view.colormap, Colormap::Gray);
    assert_eq!(config.view.clim, Some([0.0, 2.0]));
    assert_eq!(config.data.dir, Some(PathBuf::from("/data/brain")));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
#[serial]
fn test_env_override_beats_user_file() {
    let dir = scratch_dir("env_beats_user");
    std::fs::write(dir.join("user.toml"), "[debug]\nlog_level = \"debug\"\n").unwrap();

    std::env::set_var("SDFVIEW_DEBUG__LOG_LEVEL", "trace");
    let config = AppConfig::load_from(&dir);
    std::env::remove_var("SDFVIEW_DEBUG__LOG_LEVEL");

    assert_eq!(config.unwrap().debug.log_level, "trace");
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
#[serial]
fn test_invalid_window_size_rejected() {
    let dir = scratch_dir("zero_width");
    std::fs::write(
        dir.join("user.toml"),
        "[window]\ntitle = \"x\"\nwidth = 0\nheight = 600\nfullscreen = false\nvsync = true\n",
    )
    .unwrap();

    assert!(AppConfig::load_from(&dir).is_err());
    std::fs::remove_dir_all(&dir).unwrap();
}
