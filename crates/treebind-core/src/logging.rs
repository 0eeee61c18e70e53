//! One-shot tracing initialization for binaries and test harnesses
//! embedding the engine.

use std::sync::Once;

use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Output profile for the global tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Compact human-readable output.
    Development,
    /// JSON structured output.
    Production,
    /// Silent; claims the global default so binder spans have a sink.
    Test,
}

impl Profile {
    /// Filter directive applied when `RUST_LOG` is not set.
    pub fn default_directive(self) -> &'static str {
        match self {
            Profile::Development => "treebind=debug",
            Profile::Production | Profile::Test => "treebind=info",
        }
    }
}

static INIT: Once = Once::new();

/// Install the global tracing subscriber for the given profile.
///
/// May be called from multiple entry points (application startup, test
/// helpers); only the first call takes effect.
pub fn init(profile: Profile) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_directive()));
        match profile {
            Profile::Development => {
                tracing_subscriber::fmt().with_env_filter(filter).init();
            }
            Profile::Production => {
                tracing_subscriber::fmt().json().with_env_filter(filter).init();
            }
            Profile::Test => {
                tracing_subscriber::registry().init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_per_profile() {
        assert_eq!(Profile::Development.default_directive(), "treebind=debug");
        assert_eq!(Profile::Production.default_directive(), "treebind=info");
        assert_eq!(Profile::Test.default_directive(), "treebind=info");
    }

    #[test]
    fn test_repeated_init_is_a_no_op() {
        init(Profile::Test);
        // First call wins; later calls with any profile must not panic over
        // an already-set global default.
        init(Profile::Development);
        init(Profile::Test);
    }
}
