use reefdesk::config::ConfigLoader;
use std::{
    env, fs,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    unsafe {
        env::remove_var("REEFDESK_PROFILE");
        env::remove_var("REEFDESK_API_BIND_ADDR");
        env::remove_var("REEFDESK_LOG_LEVEL");
        env::remove_var("REEFDESK_DATABASE_URL");
        env::remove_var("REEFDESK_OPERATOR_TOKEN");
        env::remove_var("REEFDESK_OPERATOR_TOKENS");
        env::remove_var("REEFDESK_EVENT_QUEUE_CAPACITY");
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    // Operator tokens are the one required setting.
    unsafe {
        env::set_var("REEFDESK_OPERATOR_TOKEN", "local-dev-token");
    }

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());
    let cfg = loader.load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.events.queue_capacity, 1024);
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "REEFDESK_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "REEFDESK_API_BIND_ADDR=192.168.0.10:5000\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "REEFDESK_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "REEFDESK_PROFILE=test\nREEFDESK_API_BIND_ADDR=127.0.0.1:4000\nREEFDESK_OPERATOR_TOKEN=layered-test-token\n",
    );

    let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());
    let cfg = loader.load().expect("layered config loads");

    assert_eq!(cfg.profile, "test");
    // The most specific file (.env.test.local) wins.
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    clear_env();
}

#[test]
fn process_environment_wins_over_files() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "REEFDESK_API_BIND_ADDR=127.0.0.1:3000\nREEFDESK_OPERATOR_TOKEN=file-token\n",
    );

    unsafe {
        env::set_var("REEFDESK_API_BIND_ADDR", "127.0.0.1:9999");
    }

    let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());
    let cfg = loader.load().expect("config loads");

    assert_eq!(cfg.api_bind_addr, "127.0.0.1:9999");
    assert_eq!(cfg.operator_tokens, vec!["file-token".to_string()]);
    clear_env();
}

#[test]
fn operator_tokens_accept_comma_separated_list() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("REEFDESK_OPERATOR_TOKENS", "alpha, beta ,gamma,");
    }

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());
    let cfg = loader.load().expect("config loads");

    assert_eq!(
        cfg.operator_tokens,
        vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()]
    );
    clear_env();
}

#[test]
fn missing_operator_tokens_fail_validation() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());
    let err = loader.load().unwrap_err();

    assert!(err.to_string().contains("operator tokens"));
    clear_env();
}

#[test]
fn invalid_bind_addr_is_rejected() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("REEFDESK_OPERATOR_TOKEN", "local-dev-token");
        env::set_var("REEFDESK_API_BIND_ADDR", "not-an-address");
    }

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());
    let err = loader.load().unwrap_err();

    assert!(err.to_string().contains("not-an-address"));
    clear_env();
}

#[test]
fn event_queue_capacity_is_configurable_and_validated() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("REEFDESK_OPERATOR_TOKEN", "local-dev-token");
        env::set_var("REEFDESK_EVENT_QUEUE_CAPACITY", "256");
    }

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());
    let cfg = loader.load().expect("config loads");
    assert_eq!(cfg.events.queue_capacity, 256);

    unsafe {
        env::set_var("REEFDESK_EVENT_QUEUE_CAPACITY", "0");
    }
    let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());
    assert!(loader.load().is_err());
    clear_env();
}
