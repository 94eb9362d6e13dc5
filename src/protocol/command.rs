use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::DELIMITER;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("'{0}' command contains the frame delimiter")]
    EmbeddedDelimiter(&'static str),
    #[error("failed to encode command arguments: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Arguments of a `login` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Login {
    pub protocol: u32,
    pub client: String,
    pub clientver: f64,
}

/// Paging options of a `get` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetOptions {
    pub page: u32,
    pub results: u64,
    pub sort: String,
}

/// Membership test selecting `len` consecutive identifiers from `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdFilter {
    pub field: &'static str,
    pub start: u64,
    pub len: u64,
}

impl fmt::Display for IdFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} = [", self.field)?;
        for (i, id) in (self.start..self.start + self.len).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        f.write_str("])")
    }
}

/// A request understood by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login(Login),
    DbStats,
    Get {
        entity: String,
        flags: String,
        filter: String,
        options: GetOptions,
    },
    Set {
        entity: String,
        ids: String,
        fields: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login(_) => "login",
            Command::DbStats => "dbstats",
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
        }
    }

    /// Renders the command as a single delimiter-terminated frame.
    pub fn encode(&self) -> Result<Vec<u8>, CommandError> {
        let text = match self {
            Command::Login(login) => format!("login {}", serde_json::to_string(login)?),
            Command::DbStats => "dbstats".to_string(),
            Command::Get {
                entity,
                flags,
                filter,
                options,
            } => format!(
                "get {entity} {flags} {filter} {}",
                serde_json::to_string(options)?
            ),
            Command::Set {
                entity,
                ids,
                fields,
            } => format!("set {entity} {ids} {fields}"),
        };

        let mut frame = text.into_bytes();
        if frame.contains(&DELIMITER) {
            return Err(CommandError::EmbeddedDelimiter(self.name()));
        }
        frame.push(DELIMITER);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_login_compact() {
        let command = Command::Login(Login {
            protocol: 1,
            client: "test".to_string(),
            clientver: 0.1,
        });

        assert_eq!(
            command.encode().unwrap(),
            b"login {\"protocol\":1,\"client\":\"test\",\"clientver\":0.1}\x04"
        );
    }

    #[test]
    fn encode_dbstats() {
        assert_eq!(Command::DbStats.encode().unwrap(), b"dbstats\x04");
    }

    #[test]
    fn encode_get() {
        let filter = IdFilter {
            field: "id",
            start: 1,
            len: 3,
        };
        let command = Command::Get {
            entity: "vn".to_string(),
            flags: "basic".to_string(),
            filter: filter.to_string(),
            options: GetOptions {
                page: 1,
                results: 25,
                sort: "id".to_string(),
            },
        };

        assert_eq!(
            String::from_utf8(command.encode().unwrap()).unwrap(),
            "get vn basic (id = [1, 2, 3]) {\"page\":1,\"results\":25,\"sort\":\"id\"}\x04"
        );
    }

    #[test]
    fn encode_set() {
        let command = Command::Set {
            entity: "votelist".to_string(),
            ids: "17".to_string(),
            fields: "{\"vote\":80}".to_string(),
        };

        assert_eq!(
            command.encode().unwrap(),
            b"set votelist 17 {\"vote\":80}\x04"
        );
    }

    #[test]
    fn filter_window_offset() {
        let filter = IdFilter {
            field: "uid",
            start: 101,
            len: 2,
        };
        assert_eq!(filter.to_string(), "(uid = [101, 102])");
    }

    #[test]
    fn reject_embedded_delimiter() {
        let command = Command::Set {
            entity: "vnlist".to_string(),
            ids: "1\x04".to_string(),
            fields: "{}".to_string(),
        };

        let err = command.encode().unwrap_err();
        assert!(matches!(err, CommandError::EmbeddedDelimiter("set")));
    }
}
