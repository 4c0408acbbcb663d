use estate_api::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const KEYS: &[&str] = &[
    "ESTATE_PROFILE",
    "ESTATE_API_BIND_ADDR",
    "ESTATE_LOG_LEVEL",
    "ESTATE_DATABASE_URL",
    "ESTATE_JWT_SECRET",
    "ESTATE_JWT_EXPIRES_IN_SECONDS",
    "ESTATE_UPLOAD_DIR",
    "ESTATE_MAX_IMAGE_BYTES",
    "ESTATE_CORS_ORIGINS",
    "ESTATE_SEED_DEMO_DATA",
];

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
        for key in KEYS {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

fn loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_only_secret_is_set() {
    let _guard = env_guard();
    clear_env();
    let dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("ESTATE_JWT_SECRET", "dev-secret");
    }

    let cfg = loader(&dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:5000");
    assert_eq!(cfg.upload_dir, PathBuf::from("uploads"));
    assert_eq!(cfg.max_image_bytes, 5 * 1024 * 1024);
    assert!(!cfg.seed_demo_data);
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn missing_secret_is_rejected() {
    let _guard = env_guard();
    clear_env();
    let dir = TempDir::new().unwrap();

    let err = loader(&dir).load().unwrap_err();

    assert!(matches!(err, ConfigError::MissingJwtSecret));
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();
    let dir = TempDir::new().unwrap();

    write_env_file(
        &dir,
        ".env",
        "ESTATE_PROFILE=staging\nESTATE_LOG_LEVEL=warn\nESTATE_JWT_SECRET=base-secret-that-is-long-enough-for-it\n",
    );
    write_env_file(&dir, ".env.local", "ESTATE_LOG_LEVEL=debug\n");
    write_env_file(
        &dir,
        ".env.staging",
        "ESTATE_API_BIND_ADDR=127.0.0.1:7000\nESTATE_CORS_ORIGINS=https://a.example, https://b.example\n",
    );
    write_env_file(&dir, ".env.staging.local", "ESTATE_MAX_IMAGE_BYTES=1024\n");

    let cfg = loader(&dir).load().expect("layered config loads");

    assert_eq!(cfg.profile, "staging");
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(cfg.api_bind_addr, "127.0.0.1:7000");
    assert_eq!(cfg.max_image_bytes, 1024);
    assert_eq!(
        cfg.cors_origins,
        vec!["https://a.example".to_string(), "https://b.example".to_string()]
    );
    clear_env();
}

#[test]
fn process_env_overrides_files() {
    let _guard = env_guard();
    clear_env();
    let dir = TempDir::new().unwrap();
    write_env_file(
        &dir,
        ".env",
        "ESTATE_JWT_SECRET=dev-secret\nESTATE_SEED_DEMO_DATA=false\n",
    );
    unsafe {
        env::set_var("ESTATE_SEED_DEMO_DATA", "true");
        env::set_var("ESTATE_UPLOAD_DIR", "/srv/estate/uploads");
    }

    let cfg = loader(&dir).load().expect("config loads");

    assert!(cfg.seed_demo_data);
    assert_eq!(cfg.upload_dir, PathBuf::from("/srv/estate/uploads"));
    clear_env();
}

#[test]
fn production_requires_strong_secret() {
    let _guard = env_guard();
    clear_env();
    let dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("ESTATE_PROFILE", "prod");
        env::set_var("ESTATE_JWT_SECRET", "short");
    }

    let err = loader(&dir).load().unwrap_err();

    assert!(matches!(err, ConfigError::WeakJwtSecret { length: 5, .. }));
    clear_env();
}

#[test]
fn invalid_numbers_and_addresses_are_reported() {
    let _guard = env_guard();
    clear_env();
    let dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("ESTATE_JWT_SECRET", "dev-secret");
        env::set_var("ESTATE_MAX_IMAGE_BYTES", "lots");
    }

    let err = loader(&dir).load().unwrap_err();
    assert!(
        matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "ESTATE_MAX_IMAGE_BYTES")
    );

    unsafe {
        env::remove_var("ESTATE_MAX_IMAGE_BYTES");
        env::set_var("ESTATE_API_BIND_ADDR", "not-an-address");
    }
    let err = loader(&dir).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    clear_env();
}
