//! ServerQuery command construction.

use std::fmt;

use crate::escape::escape;

/// A ServerQuery command: a name followed by `key=value` arguments and
/// `-option` flags.
///
/// Values are escaped when the command is rendered, so callers pass raw
/// strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<(String, String)>,
    options: Vec<String>,
}

impl Command {
    /// Create a command with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            options: Vec::new(),
        }
    }

    /// Append a `key=value` argument.
    pub fn arg(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args.push((key.into(), value.to_string()));
        self
    }

    /// Append a `-option` flag (given without the leading dash).
    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    /// The command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `login client_login_name=.. client_login_password=..`
    pub fn login(username: &str, password: &str) -> Self {
        Self::new("login")
            .arg("client_login_name", username)
            .arg("client_login_password", password)
    }

    /// `use sid=..`
    pub fn use_virtual_server(sid: u32) -> Self {
        Self::new("use").arg("sid", sid)
    }

    /// `channellist`
    pub fn channel_list() -> Self {
        Self::new("channellist")
    }

    /// `clientlist`
    pub fn client_list() -> Self {
        Self::new("clientlist")
    }

    /// `quit`
    pub fn quit() -> Self {
        Self::new("quit")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (key, value) in &self.args {
            write!(f, " {}={}", key, escape(value))?;
        }
        for option in &self.options {
            write!(f, " -{}", option)?;
        }
        Ok(())
    }
}
