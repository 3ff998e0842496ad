//! The `:` command line.
//!
//! Column lists are comma separated; paths and names may contain spaces
//! (everything after the verb is taken as-is).

use std::path::PathBuf;

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    File(PathBuf),
    Sheet(String),
    Load,
    Date(String),
    /// Value columns of the current tab.
    Columns(Vec<String>),
    Range { start: String, end: String },
    Confidence(String),
    PeriodAdd { start: String, end: String },
    PeriodRemove,
    /// One-based, as listed on screen.
    PeriodSelect(usize),
    Limits(bool),
    Average(bool),
    Run,
    Export,
    Clear,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?}")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

fn split_verb(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    }
}

fn two_dates(rest: &str, usage: &'static str) -> Result<(String, String), CommandError> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(start), Some(end), None) => Ok((start.to_string(), end.to_string())),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn on_off(rest: &str, usage: &'static str) -> Result<bool, CommandError> {
    match rest {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn required(rest: &str, usage: &'static str) -> Result<String, CommandError> {
    if rest.is_empty() {
        Err(CommandError::Usage(usage))
    } else {
        Ok(rest.to_string())
    }
}

/// Parse one command line; a leading `:` is ignored.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim().trim_start_matches(':');
    let (verb, rest) = split_verb(line);
    match verb {
        "" => Err(CommandError::Empty),
        "file" | "open" => Ok(Command::File(PathBuf::from(required(rest, "file <path>")?))),
        "sheet" => Ok(Command::Sheet(required(rest, "sheet <name>")?)),
        "load" => Ok(Command::Load),
        "date" => Ok(Command::Date(required(rest, "date <column>")?)),
        "cols" | "columns" => {
            let cols: Vec<String> = rest
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
            if cols.is_empty() {
                return Err(CommandError::Usage("cols <a,b,...>"));
            }
            Ok(Command::Columns(cols))
        }
        "range" => {
            let (start, end) = two_dates(rest, "range <start> <end>")?;
            Ok(Command::Range { start, end })
        }
        "conf" | "confidence" => Ok(Command::Confidence(required(rest, "conf <percent>")?)),
        "period" => {
            let (sub, args) = split_verb(rest);
            match sub {
                "add" => {
                    let (start, end) = two_dates(args, "period add <start> <end>")?;
                    Ok(Command::PeriodAdd { start, end })
                }
                "rm" | "remove" => Ok(Command::PeriodRemove),
                "sel" | "select" => args
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .map(Command::PeriodSelect)
                    .ok_or(CommandError::Usage("period sel <n>")),
                _ => Err(CommandError::Usage("period add|rm|sel")),
            }
        }
        "limits" => on_off(rest, "limits on|off").map(Command::Limits),
        "avg" | "average" => on_off(rest, "avg on|off").map(Command::Average),
        "run" => Ok(Command::Run),
        "export" => Ok(Command::Export),
        "clear" => Ok(Command::Clear),
        "q" | "quit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_keep_spaces() {
        assert_eq!(
            parse_command(":file /data/plant a.xlsx"),
            Ok(Command::File(PathBuf::from("/data/plant a.xlsx")))
        );
    }

    #[test]
    fn columns_are_comma_separated() {
        assert_eq!(
            parse_command("cols A, B ,C"),
            Ok(Command::Columns(vec!["A".into(), "B".into(), "C".into()]))
        );
        assert!(parse_command("cols ,").is_err());
    }

    #[test]
    fn periods() {
        assert_eq!(
            parse_command("period add 2023-01-01 2023-03-31"),
            Ok(Command::PeriodAdd {
                start: "2023-01-01".into(),
                end: "2023-03-31".into()
            })
        );
        assert_eq!(parse_command("period sel 2"), Ok(Command::PeriodSelect(2)));
        assert_eq!(parse_command("period rm"), Ok(Command::PeriodRemove));
        assert!(parse_command("period sel 0").is_err());
        assert!(parse_command("period add 2023-01-01").is_err());
    }

    #[test]
    fn toggles() {
        assert_eq!(parse_command("limits off"), Ok(Command::Limits(false)));
        assert_eq!(parse_command("avg on"), Ok(Command::Average(true)));
        assert_eq!(
            parse_command("avg maybe"),
            Err(CommandError::Usage("avg on|off"))
        );
    }

    #[test]
    fn errors() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_command("plot"),
            Err(CommandError::Unknown("plot".into()))
        );
        assert_eq!(
            parse_command("sheet"),
            Err(CommandError::Usage("sheet <name>"))
        );
    }
}
