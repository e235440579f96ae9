//! Property-test run profile read from the environment.
//!
//! CI raises case counts through `GROVE_PBT_CASES`; local runs keep the
//! defaults each suite passes in.

use std::env;

/// Environment variable overriding proptest case counts.
pub const GROVE_PBT_CASES_ENV_KEY: &str = "GROVE_PBT_CASES";
/// Environment variable enabling forked proptest execution.
pub const GROVE_PBT_FORK_ENV_KEY: &str = "GROVE_PBT_FORK";

/// Case count and fork mode for a property suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProptestRunProfile {
    cases: u32,
    fork: bool,
}

impl ProptestRunProfile {
    /// Reads overrides, falling back to the given defaults when a variable is
    /// unset or malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use grove_test_support::ci::property_test_profile::ProptestRunProfile;
    ///
    /// let profile = ProptestRunProfile::load(32, false);
    /// assert!(profile.cases() > 0);
    /// ```
    #[must_use]
    pub fn load(default_cases: u32, default_fork: bool) -> Self {
        Self {
            cases: override_or(GROVE_PBT_CASES_ENV_KEY, default_cases, parse_cases),
            fork: override_or(GROVE_PBT_FORK_ENV_KEY, default_fork, parse_flag),
        }
    }

    /// Cases per property.
    #[must_use]
    pub fn cases(&self) -> u32 {
        self.cases
    }

    /// Whether cases run in forked subprocesses.
    #[must_use]
    pub fn fork(&self) -> bool {
        self.fork
    }
}

fn override_or<T: Copy>(key: &'static str, default: T, parse: fn(&str) -> Result<T, String>) -> T {
    let Ok(raw) = env::var(key) else {
        return default;
    };
    parse(&raw).unwrap_or_else(|reason| {
        tracing::warn!(env = key, raw = %raw, reason = %reason, "ignoring malformed property-test override");
        default
    })
}

fn parse_cases(raw: &str) -> Result<u32, String> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err("cases must be positive".to_owned()),
        Ok(cases) => Ok(cases),
        Err(error) => Err(format!("not a case count: {error}")),
    }
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("`{other}` is not a boolean flag")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = env::var(key).ok();
            match value {
                // SAFETY: tests serialize environment access with ENV_LOCK.
                Some(value) => unsafe { env::set_var(key, value) },
                // SAFETY: as above.
                None => unsafe { env::remove_var(key) },
            }
            Self { key, original }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                // SAFETY: tests serialize environment access with ENV_LOCK.
                Some(value) => unsafe { env::set_var(self.key, value) },
                // SAFETY: as above.
                None => unsafe { env::remove_var(self.key) },
            }
        }
    }

    #[rstest]
    #[case(None, 64)]
    #[case(Some("1"), 1)]
    #[case(Some(" 4096 "), 4096)]
    #[case(Some("0"), 64)]
    #[case(Some("-3"), 64)]
    #[case(Some("many"), 64)]
    fn case_overrides(#[case] raw: Option<&str>, #[case] expected: u32) {
        let _lock = ENV_LOCK.lock().expect("env lock");
        let _cases = EnvGuard::set(GROVE_PBT_CASES_ENV_KEY, raw);
        let _fork = EnvGuard::set(GROVE_PBT_FORK_ENV_KEY, None);

        assert_eq!(ProptestRunProfile::load(64, false).cases(), expected);
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some("off"), false)]
    #[case(Some("NO"), false)]
    #[case(Some("1"), true)]
    #[case(Some("maybe"), true)]
    #[case(Some(""), true)]
    fn fork_overrides(#[case] raw: Option<&str>, #[case] expected: bool) {
        let _lock = ENV_LOCK.lock().expect("env lock");
        let _cases = EnvGuard::set(GROVE_PBT_CASES_ENV_KEY, None);
        let _fork = EnvGuard::set(GROVE_PBT_FORK_ENV_KEY, raw);

        assert_eq!(ProptestRunProfile::load(64, true).fork(), expected);
    }
}
