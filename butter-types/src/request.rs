// SPDX-License-Identifier: GPL-3.0-only

use serde_json::Value;
use thiserror::Error;

/// A request line could not be understood
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("request is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("request must be a non-empty array starting with a command name")]
    NotACommand,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("bad arguments for {command}: {reason}")]
    BadArguments {
        command: &'static str,
        reason: String,
    },
}

/// A recognized daemon command with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ListSubvolumes,
    CreateSnapshot {
        source: String,
        destination: String,
        read_only: bool,
    },
    RenameSnapshot {
        before: String,
        after: String,
    },
    DeleteSnapshot {
        path: String,
    },
}

impl Request {
    pub const LIST_SUBVOLUMES: &'static str = "list_subvolumes";
    pub const CREATE_SNAPSHOT: &'static str = "create_snapshot";
    pub const RENAME_SNAPSHOT: &'static str = "rename_snapshot";
    pub const DELETE_SNAPSHOT: &'static str = "delete_snapshot";

    /// Parse one request line of the form `[command, ...args]`
    pub fn parse(line: &str) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_str(line)
            .map_err(|error| RequestError::InvalidJson(error.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        let Value::Array(items) = value else {
            return Err(RequestError::NotACommand);
        };
        let mut items = items.into_iter();
        let command = match items.next() {
            Some(Value::String(command)) => command,
            _ => return Err(RequestError::NotACommand),
        };
        let args: Vec<Value> = items.collect();

        match command.as_str() {
            Self::LIST_SUBVOLUMES => {
                expect_arity(Self::LIST_SUBVOLUMES, &args, 0)?;
                Ok(Self::ListSubvolumes)
            }
            Self::CREATE_SNAPSHOT => {
                expect_arity(Self::CREATE_SNAPSHOT, &args, 3)?;
                Ok(Self::CreateSnapshot {
                    source: string_arg(Self::CREATE_SNAPSHOT, &args[0], "source")?,
                    destination: string_arg(Self::CREATE_SNAPSHOT, &args[1], "destination")?,
                    read_only: args[2].as_bool().ok_or_else(|| RequestError::BadArguments {
                        command: Self::CREATE_SNAPSHOT,
                        reason: "read_only must be a boolean".to_string(),
                    })?,
                })
            }
            Self::RENAME_SNAPSHOT => {
                expect_arity(Self::RENAME_SNAPSHOT, &args, 2)?;
                Ok(Self::RenameSnapshot {
                    before: string_arg(Self::RENAME_SNAPSHOT, &args[0], "before")?,
                    after: string_arg(Self::RENAME_SNAPSHOT, &args[1], "after")?,
                })
            }
            Self::DELETE_SNAPSHOT => {
                expect_arity(Self::DELETE_SNAPSHOT, &args, 1)?;
                Ok(Self::DeleteSnapshot {
                    path: string_arg(Self::DELETE_SNAPSHOT, &args[0], "path")?,
                })
            }
            _ => Err(RequestError::UnknownCommand(command)),
        }
    }

    pub fn command(&self) -> &'static str {
        match self {
            Self::ListSubvolumes => Self::LIST_SUBVOLUMES,
            Self::CreateSnapshot { .. } => Self::CREATE_SNAPSHOT,
            Self::RenameSnapshot { .. } => Self::RENAME_SNAPSHOT,
            Self::DeleteSnapshot { .. } => Self::DELETE_SNAPSHOT,
        }
    }
}

fn expect_arity(command: &'static str, args: &[Value], expected: usize) -> Result<(), RequestError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RequestError::BadArguments {
            command,
            reason: format!("expected {expected} argument(s), got {}", args.len()),
        })
    }
}

fn string_arg(command: &'static str, value: &Value, name: &str) -> Result<String, RequestError> {
    value
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| RequestError::BadArguments {
            command,
            reason: format!("{name} must be a string"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!(
            Request::parse(r#"["list_subvolumes"]"#),
            Ok(Request::ListSubvolumes)
        );
        assert_eq!(
            Request::parse(r#"["create_snapshot", "/home", "/.snapshots/home-1", true]"#),
            Ok(Request::CreateSnapshot {
                source: "/home".to_string(),
                destination: "/.snapshots/home-1".to_string(),
                read_only: true,
            })
        );
        assert_eq!(
            Request::parse(r#"["rename_snapshot", "/a", "/b"]"#),
            Ok(Request::RenameSnapshot {
                before: "/a".to_string(),
                after: "/b".to_string(),
            })
        );
        assert_eq!(
            Request::parse(r#"["delete_snapshot", "/a"]"#),
            Ok(Request::DeleteSnapshot {
                path: "/a".to_string()
            })
        );
    }

    #[test]
    fn unknown_command_is_reported_by_name() {
        assert_eq!(
            Request::parse(r#"["list_snapshots"]"#),
            Err(RequestError::UnknownCommand("list_snapshots".to_string()))
        );
    }

    #[test]
    fn rejects_non_array_and_wrong_arguments() {
        assert_eq!(
            Request::parse(r#"{"command": "list_subvolumes"}"#),
            Err(RequestError::NotACommand)
        );
        assert_eq!(Request::parse("[]"), Err(RequestError::NotACommand));
        assert!(matches!(
            Request::parse(r#"["delete_snapshot"]"#),
            Err(RequestError::BadArguments { command: "delete_snapshot", .. })
        ));
        assert!(matches!(
            Request::parse(r#"["create_snapshot", "/a", "/b", "yes"]"#),
            Err(RequestError::BadArguments { command: "create_snapshot", .. })
        ));
        assert!(matches!(
            Request::parse("not json"),
            Err(RequestError::InvalidJson(_))
        ));
    }
}
