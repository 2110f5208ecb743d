use std::env;
use std::fs;
use tempfile::TempDir;
use watchrun::{CrashPolicy, Settings};

// All environment manipulation lives in one test; the process environment is
// shared between test threads.
#[test]
fn test_env_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    fs::write(&config_path, "[watch]\ndebounce_ms = 300\nclear_screen = true\n").unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("WATCHRUN_WATCH__DEBOUNCE_MS", "42");
        env::set_var("WATCHRUN_WATCH__CLEAR_SCREEN", "false");
        env::set_var("WATCHRUN_WATCH__CRASH_POLICY", "restart");
        env::set_var("WATCHRUN_LOGGING__DEFAULT", "debug");
    }

    let settings = Settings::load_from(&config_path);

    unsafe {
        env::remove_var("WATCHRUN_WATCH__DEBOUNCE_MS");
        env::remove_var("WATCHRUN_WATCH__CLEAR_SCREEN");
        env::remove_var("WATCHRUN_WATCH__CRASH_POLICY");
        env::remove_var("WATCHRUN_LOGGING__DEFAULT");
    }

    let settings = settings.unwrap();

    // Env wins over the file
    assert_eq!(settings.watch.debounce_ms, 42);
    assert!(!settings.watch.clear_screen);
    assert_eq!(settings.watch.crash_policy, CrashPolicy::Restart);
    assert_eq!(settings.logging.default, "debug");

    // Untouched keys keep their defaults
    assert_eq!(settings.version, 1);
    assert!(!settings.watch.exclude.is_empty());
}
