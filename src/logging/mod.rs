//! Log filter construction
//!
//! Turns [`LoggingConfig`](crate::config::LoggingConfig) into an `EnvFilter`
//! directive string. `RUST_LOG`, when set, takes precedence over the result.

/// Build filter directives string from LoggingConfig
///
/// A filter string in the format: "base_level,edgepulse::component1=level1,..."
/// Components are emitted in sorted order so the result is stable.
///
/// # Examples
///
/// ```
/// use edgepulse::config::logging::{LogFormat, LoggingConfig};
/// use edgepulse::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("stream".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,edgepulse::stream=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",edgepulse::{}={}", component, level));
        }
    }

    filter_str
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;
    use std::collections::HashMap;

    #[test]
    fn test_filter_base_level_only() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(build_filter_directives(&config), "warn");
    }

    #[test]
    fn test_filter_components_sorted() {
        let mut levels = HashMap::new();
        levels.insert("stream".to_string(), "trace".to_string());
        levels.insert("fetch".to_string(), "debug".to_string());
        let config = LoggingConfig {
            component_levels: Some(levels),
            ..LoggingConfig::default()
        };
        assert_eq!(
            build_filter_directives(&config),
            "info,edgepulse::fetch=debug,edgepulse::stream=trace"
        );
    }
}
