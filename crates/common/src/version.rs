use serde::Serialize;

/// Build information baked into a binary by its build script
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} build, features: {}) built {} with {}",
            self.version,
            self.build_profile,
            self.build_features,
            self.build_timestamp,
            self.rust_version
        )
    }
}

/// Collect [`BuildInfo`] from the environment the calling crate was
///  compiled in
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo {
            build_profile: option_env!("BUILD_PROFILE").unwrap_or("unknown"),
            build_features: option_env!("BUILD_FEATURES").unwrap_or("none"),
            version: option_env!("REPO_VERSION").unwrap_or(env!("CARGO_PKG_VERSION")),
            build_timestamp: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
            rust_version: option_env!("RUST_VERSION").unwrap_or("unknown"),
        }
    };
}
