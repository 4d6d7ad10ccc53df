use std::collections::HashMap;

/// Read-only snapshot of environment variables.
///
/// Credentials are looked up by fixed names at table-build time, so a plain
/// map is enough; tests construct one in memory instead of touching the
/// process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl<const N: usize> From<[(&str, &str); N]> for EnvVars {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self {
            vars: pairs
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EnvVars;

    #[test]
    fn set_and_get() {
        let env = EnvVars::default().set("APP1_GITHUB_CLIENT_ID", "id-1");
        assert_eq!(env.get("APP1_GITHUB_CLIENT_ID"), Some("id-1"));
        assert_eq!(env.get("APP1_GITHUB_CLIENT_SECRET"), None);
    }
}
