use serde::{Deserialize, Serialize};

/// One external command to run as a validation check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Display form for reports, e.g. `cargo test --all`.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Which checks to run. Absent commands are simply not run; an empty
/// config runs nothing and passes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub test_command: Option<CommandSpec>,
    pub lint_command: Option<CommandSpec>,
    #[serde(default)]
    pub custom_checks: Vec<CommandSpec>,
}

impl ValidatorConfig {
    pub fn checks(&self) -> Vec<&CommandSpec> {
        let mut checks = Vec::new();
        if let Some(test) = &self.test_command {
            checks.push(test);
        }
        if let Some(lint) = &self.lint_command {
            checks.push(lint);
        }
        checks.extend(self.custom_checks.iter());
        checks
    }

    pub fn is_empty(&self) -> bool {
        self.test_command.is_none() && self.lint_command.is_none() && self.custom_checks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_rendering() {
        let spec = CommandSpec::new("tests", "cargo").with_args(["test", "--all"]);
        assert_eq!(spec.command_line(), "cargo test --all");
        assert_eq!(CommandSpec::new("lint", "mylint").command_line(), "mylint");
    }

    #[test]
    fn test_checks_preserves_order() {
        let config = ValidatorConfig {
            test_command: Some(CommandSpec::new("tests", "cargo")),
            lint_command: Some(CommandSpec::new("lint", "clippy")),
            custom_checks: vec![CommandSpec::new("audit", "cargo-audit")],
        };
        let names: Vec<_> = config.checks().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["tests", "lint", "audit"]);
    }

    #[test]
    fn test_default_config_is_empty() {
        assert!(ValidatorConfig::default().is_empty());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ValidatorConfig = serde_json::from_str(
            r#"{"test_command": {"name": "tests", "program": "true"}}"#,
        )
        .unwrap();
        assert!(config.lint_command.is_none());
        assert!(config.custom_checks.is_empty());
        assert!(config.test_command.unwrap().args.is_empty());
    }
}
