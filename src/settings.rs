//! Kernel settings.

use std::env;
use std::time::Duration;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{ActivationError, ActivationResult};
use crate::lifetime::Lifetime;

/// Prefix of the environment variables read by [`KernelSettings::from_env`].
pub const ENV_PREFIX: &str = "FERROUS_KERNEL";

/// Settings of a [`Kernel`](crate::Kernel).
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Kernel, KernelSettings, Lifetime};
/// use std::time::Duration;
///
/// let settings = KernelSettings::default()
///     .with_cache_pruning_interval(Some(Duration::from_secs(5)))
///     .with_default_lifetime(Lifetime::Singleton)
///     .with_max_resolution_depth(64);
///
/// let kernel = Kernel::with_settings(settings);
/// assert_eq!(kernel.settings().max_resolution_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct KernelSettings {
    /// How often dead scopes are swept from the caches. `None` disables the
    /// background pruner.
    #[cfg_attr(feature = "config", serde(with = "duration_ms", rename = "cache_pruning_interval_ms"))]
    pub cache_pruning_interval: Option<Duration>,
    /// When set, the pipeline does not remember which instances it already
    /// activated and runs the strategies on every resolution.
    pub activation_cache_disabled: bool,
    /// Bind constructible concrete types to themselves on first request.
    pub allow_implicit_self_binding: bool,
    /// Lifetime of bindings that do not choose one.
    pub default_lifetime: Lifetime,
    /// Deepest dependency chain a single resolution may build.
    pub max_resolution_depth: usize,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            cache_pruning_interval: Some(Duration::from_secs(30)),
            activation_cache_disabled: false,
            allow_implicit_self_binding: true,
            default_lifetime: Lifetime::Transient,
            max_resolution_depth: 1024,
        }
    }
}

impl KernelSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_pruning_interval(mut self, interval: Option<Duration>) -> Self {
        self.cache_pruning_interval = interval;
        self
    }

    pub fn with_activation_cache_disabled(mut self, disabled: bool) -> Self {
        self.activation_cache_disabled = disabled;
        self
    }

    pub fn with_implicit_self_binding(mut self, allow: bool) -> Self {
        self.allow_implicit_self_binding = allow;
        self
    }

    pub fn with_default_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.default_lifetime = lifetime;
        self
    }

    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    /// Default settings overlaid with `FERROUS_KERNEL_*` environment variables.
    pub fn from_env() -> ActivationResult<Self> {
        Self::default().overlay_env()
    }

    /// Overlays the `FERROUS_KERNEL_*` environment variables that are set:
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `FERROUS_KERNEL_CACHE_PRUNING_INTERVAL_MS` | `cache_pruning_interval` (`0` disables) |
    /// | `FERROUS_KERNEL_ACTIVATION_CACHE_DISABLED` | `activation_cache_disabled` |
    /// | `FERROUS_KERNEL_IMPLICIT_SELF_BINDING` | `allow_implicit_self_binding` |
    /// | `FERROUS_KERNEL_MAX_RESOLUTION_DEPTH` | `max_resolution_depth` |
    ///
    /// # Errors
    ///
    /// `InvalidArgument` naming the variable when a value does not parse.
    pub fn overlay_env(mut self) -> ActivationResult<Self> {
        if let Some(millis) = env_value("CACHE_PRUNING_INTERVAL_MS", "FERROUS_KERNEL_CACHE_PRUNING_INTERVAL_MS", parse_u64)? {
            self.cache_pruning_interval = (millis > 0).then(|| Duration::from_millis(millis));
        }
        if let Some(disabled) = env_value("ACTIVATION_CACHE_DISABLED", "FERROUS_KERNEL_ACTIVATION_CACHE_DISABLED", parse_bool)? {
            self.activation_cache_disabled = disabled;
        }
        if let Some(allow) = env_value("IMPLICIT_SELF_BINDING", "FERROUS_KERNEL_IMPLICIT_SELF_BINDING", parse_bool)? {
            self.allow_implicit_self_binding = allow;
        }
        if let Some(depth) = env_value("MAX_RESOLUTION_DEPTH", "FERROUS_KERNEL_MAX_RESOLUTION_DEPTH", parse_u64)? {
            self.max_resolution_depth = usize::try_from(depth).map_err(|_| ActivationError::InvalidArgument {
                argument: "FERROUS_KERNEL_MAX_RESOLUTION_DEPTH",
                reason: format!("{depth} does not fit in usize"),
            })?;
        }
        tracing::debug!(target: "ferrous_kernel", settings = ?self, "Applied environment overrides");
        Ok(self)
    }
}

fn env_value<T>(
    key: &str,
    argument: &'static str,
    parse: fn(&str) -> Option<T>,
) -> ActivationResult<Option<T>> {
    let Ok(value) = env::var(format!("{ENV_PREFIX}_{key}")) else {
        return Ok(None);
    };
    parse(value.trim())
        .map(Some)
        .ok_or_else(|| ActivationError::InvalidArgument {
            argument,
            reason: format!("cannot parse {value:?}"),
        })
}

fn parse_u64(value: &str) -> Option<u64> {
    value.parse().ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(feature = "config")]
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis))
    }
}
