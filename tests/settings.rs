use ferrous_kernel::{ActivationError, Kernel, KernelSettings, Lifetime};
use serial_test::serial;
use std::env;
use std::time::Duration;

const VARIABLES: [&str; 4] = [
    "FERROUS_KERNEL_CACHE_PRUNING_INTERVAL_MS",
    "FERROUS_KERNEL_ACTIVATION_CACHE_DISABLED",
    "FERROUS_KERNEL_IMPLICIT_SELF_BINDING",
    "FERROUS_KERNEL_MAX_RESOLUTION_DEPTH",
];

fn clear_environment() {
    for variable in VARIABLES {
        env::remove_var(variable);
    }
}

#[test]
#[serial]
fn test_from_env_without_variables_matches_defaults() {
    clear_environment();
    assert_eq!(KernelSettings::from_env().unwrap(), KernelSettings::default());
}

#[test]
#[serial]
fn test_from_env_overlays_variables() {
    clear_environment();
    env::set_var("FERROUS_KERNEL_CACHE_PRUNING_INTERVAL_MS", "250");
    env::set_var("FERROUS_KERNEL_ACTIVATION_CACHE_DISABLED", "true");
    env::set_var("FERROUS_KERNEL_IMPLICIT_SELF_BINDING", "off");
    env::set_var("FERROUS_KERNEL_MAX_RESOLUTION_DEPTH", "64");

    let settings = KernelSettings::from_env().unwrap();
    clear_environment();

    assert_eq!(settings.cache_pruning_interval, Some(Duration::from_millis(250)));
    assert!(settings.activation_cache_disabled);
    assert!(!settings.allow_implicit_self_binding);
    assert_eq!(settings.max_resolution_depth, 64);
    assert_eq!(settings.default_lifetime, Lifetime::Transient);
}

#[test]
#[serial]
fn test_zero_interval_disables_pruning() {
    clear_environment();
    env::set_var("FERROUS_KERNEL_CACHE_PRUNING_INTERVAL_MS", "0");

    let settings = KernelSettings::from_env().unwrap();
    clear_environment();

    assert_eq!(settings.cache_pruning_interval, None);
    let kernel = Kernel::with_settings(settings);
    assert_eq!(kernel.settings().cache_pruning_interval, None);
}

#[test]
#[serial]
fn test_invalid_value_names_variable() {
    clear_environment();
    env::set_var("FERROUS_KERNEL_MAX_RESOLUTION_DEPTH", "deep");

    let result = KernelSettings::from_env();
    clear_environment();

    match result {
        Err(ActivationError::InvalidArgument { argument, reason }) => {
            assert_eq!(argument, "FERROUS_KERNEL_MAX_RESOLUTION_DEPTH");
            assert!(reason.contains("deep"));
        }
        other => panic!("expected an invalid argument, got {:?}", other),
    }
}

#[cfg(feature = "config")]
#[test]
fn test_settings_serialize_durations_in_milliseconds() {
    let settings = KernelSettings::default().with_cache_pruning_interval(Some(Duration::from_millis(1500)));
    let json = serde_json::to_value(&settings).unwrap();
    assert_eq!(json["cache_pruning_interval_ms"], 1500);
    assert_eq!(json["default_lifetime"], "transient");

    let parsed: KernelSettings =
        serde_json::from_str(r#"{"cache_pruning_interval_ms": null, "default_lifetime": "singleton"}"#).unwrap();
    assert_eq!(parsed.cache_pruning_interval, None);
    assert_eq!(parsed.default_lifetime, Lifetime::Singleton);
    assert_eq!(parsed.max_resolution_depth, 1024);
}
