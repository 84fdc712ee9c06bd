//! Command-scoped flag declarations and the single-dash flag grammar
//!
//! A [`FlagSet`] is owned by one command. It parses the tokens handed to that
//! command, stops at the first positional argument, and keeps the rest for
//! dispatch. Flags are written `-name`, `--name`, `-name=value` or
//! `-name value`; boolean flags never consume the following token.

use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

/// Errors produced while parsing arguments against a [`FlagSet`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    #[error("flag provided but not defined: -{0}")]
    NotDefined(String),
    #[error("bad flag syntax: {0}")]
    BadSyntax(String),
    #[error("flag needs an argument: -{0}")]
    MissingArgument(String),
    #[error("invalid value {value:?} for flag -{name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
    /// `-h` or `-help` was given and the set does not declare it.
    #[error("help requested")]
    Help,
}

/// The typed value held by a flag
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl FlagValue {
    /// Placeholder shown after the flag name in help output.
    fn type_name(&self) -> &'static str {
        match self {
            FlagValue::String(_) => "string",
            FlagValue::Bool(_) => "",
            FlagValue::Int(_) => "int",
            FlagValue::Float(_) => "float",
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            FlagValue::String(s) => s.is_empty(),
            FlagValue::Bool(b) => !b,
            FlagValue::Int(i) => *i == 0,
            FlagValue::Float(f) => *f == 0.0,
        }
    }

    /// Parse `raw` into a value of the same kind as `self`.
    fn parse_like(&self, raw: &str) -> Result<FlagValue, String> {
        match self {
            FlagValue::String(_) => Ok(FlagValue::String(raw.to_string())),
            FlagValue::Bool(_) => parse_bool(raw).map(FlagValue::Bool),
            FlagValue::Int(_) => parse_int(raw).map(FlagValue::Int),
            FlagValue::Float(_) => raw
                .parse::<f64>()
                .map(FlagValue::Float)
                .map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::String(s) => f.write_str(s),
            FlagValue::Bool(b) => write!(f, "{b}"),
            FlagValue::Int(i) => write!(f, "{i}"),
            FlagValue::Float(x) => write!(f, "{x}"),
        }
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err("invalid boolean".to_string()),
    }
}

/// Parse an integer literal: an optional sign, then decimal digits, a
/// `0x`, `0o` or `0b` prefixed number, or a leading-zero octal number.
/// Single underscores may separate digits.
fn parse_int(raw: &str) -> Result<i64, String> {
    let (sign, unsigned) = match raw.as_bytes().first() {
        Some(b'-') => ("-", &raw[1..]),
        Some(b'+') => ("", &raw[1..]),
        _ => ("", raw),
    };
    let prefix = unsigned.get(..2).map(str::to_ascii_lowercase);
    let (radix, digits, prefixed) = match prefix.as_deref() {
        Some("0x") => (16, &unsigned[2..], true),
        Some("0o") => (8, &unsigned[2..], true),
        Some("0b") => (2, &unsigned[2..], true),
        _ if unsigned.len() > 1 && unsigned.starts_with('0') => (8, &unsigned[1..], true),
        _ => (10, unsigned, false),
    };
    if digits.starts_with(['+', '-']) {
        return Err("invalid digit found in string".to_string());
    }
    // The prefix counts as a digit, so "0x_ff" is allowed and "_1" is not
    let separated = digits
        .split('_')
        .enumerate()
        .all(|(i, part)| !part.is_empty() || (i == 0 && prefixed));
    if !separated {
        return Err("misplaced digit separator".to_string());
    }
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    i64::from_str_radix(&format!("{sign}{digits}"), radix).map_err(|e| e.to_string())
}

/// A single declared flag
#[derive(Debug, Clone)]
pub struct Flag {
    name: String,
    usage: String,
    default: FlagValue,
    value: FlagValue,
    set: bool,
}

impl Flag {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn usage(&self) -> &str {
        &self.usage
    }

    #[must_use]
    pub fn default_value(&self) -> &FlagValue {
        &self.default
    }

    #[must_use]
    pub fn value(&self) -> &FlagValue {
        &self.value
    }

    /// Whether the flag was given on the command line (or through [`FlagSet::set`]).
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.set
    }

    fn is_bool(&self) -> bool {
        matches!(self.default, FlagValue::Bool(_))
    }

    /// Split the usage into a value placeholder and the text to display.
    ///
    /// A back-quoted word in the usage becomes the placeholder and loses its
    /// quotes, so `"load config from `file`"` renders as `-config file`.
    #[must_use]
    pub fn unquote_usage(&self) -> (String, String) {
        if let Some(start) = self.usage.find('`')
            && let Some(len) = self.usage[start + 1..].find('`')
        {
            let name = &self.usage[start + 1..start + 1 + len];
            let usage = format!(
                "{}{}{}",
                &self.usage[..start],
                name,
                &self.usage[start + 2 + len..]
            );
            return (name.to_string(), usage);
        }
        (self.default.type_name().to_string(), self.usage.clone())
    }
}

/// An ordered set of declared flags plus the positional arguments left over
/// from the last parse
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    flags: Vec<Flag>,
    args: Vec<String>,
    parsed: bool,
}

impl FlagSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a string flag.
    ///
    /// # Panics
    ///
    /// Panics if the name is already declared or is not a valid flag name.
    pub fn string(&mut self, name: &str, default: &str, usage: &str) -> &mut Self {
        self.declare(name, FlagValue::String(default.to_string()), usage)
    }

    /// Declare a boolean flag.
    ///
    /// # Panics
    ///
    /// Panics if the name is already declared or is not a valid flag name.
    pub fn bool(&mut self, name: &str, default: bool, usage: &str) -> &mut Self {
        self.declare(name, FlagValue::Bool(default), usage)
    }

    /// Declare an integer flag.
    ///
    /// # Panics
    ///
    /// Panics if the name is already declared or is not a valid flag name.
    pub fn int(&mut self, name: &str, default: i64, usage: &str) -> &mut Self {
        self.declare(name, FlagValue::Int(default), usage)
    }

    /// Declare a floating point flag.
    ///
    /// # Panics
    ///
    /// Panics if the name is already declared or is not a valid flag name.
    pub fn float(&mut self, name: &str, default: f64, usage: &str) -> &mut Self {
        self.declare(name, FlagValue::Float(default), usage)
    }

    fn declare(&mut self, name: &str, default: FlagValue, usage: &str) -> &mut Self {
        assert!(
            !name.is_empty() && !name.starts_with('-') && !name.contains('='),
            "flag {name:?} has an invalid name"
        );
        assert!(self.lookup(name).is_none(), "flag redefined: {name}");
        self.flags.push(Flag {
            name: name.to_string(),
            usage: usage.to_string(),
            value: default.clone(),
            default,
            set: false,
        });
        self
    }

    /// Declared flags in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.lookup(name)?.value() {
            FlagValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.lookup(name)?.value() {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.lookup(name)?.value() {
            FlagValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.lookup(name)?.value() {
            FlagValue::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Set a declared flag from its textual form.
    ///
    /// # Errors
    ///
    /// Returns `FlagError::NotDefined` for unknown names and
    /// `FlagError::InvalidValue` if `raw` does not parse as the flag's kind.
    pub fn set(&mut self, name: &str, raw: &str) -> Result<(), FlagError> {
        let flag = self
            .flags
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| FlagError::NotDefined(name.to_string()))?;
        flag.value = flag
            .default
            .parse_like(raw)
            .map_err(|reason| FlagError::InvalidValue {
                name: name.to_string(),
                value: raw.to_string(),
                reason,
            })?;
        flag.set = true;
        Ok(())
    }

    /// Whether [`FlagSet::parse`] has been called.
    #[must_use]
    pub fn parsed(&self) -> bool {
        self.parsed
    }

    /// Positional arguments remaining after the last parse.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Parse flags from the front of `args`, keeping the rest as positional
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns the first malformed, unknown or invalid flag. `FlagError::Help`
    /// is returned for an undeclared `-h`/`-help`.
    pub fn parse(&mut self, args: &[String]) -> Result<(), FlagError> {
        self.parsed = true;
        self.args.clear();
        let mut rest = args;
        while let Some((token, tail)) = rest.split_first() {
            let Some(flag) = flag_token(token) else {
                break;
            };
            rest = tail;
            let body = match flag {
                FlagToken::Terminator => break,
                FlagToken::Body(body) => body,
            };
            if body.is_empty() || body.starts_with('-') || body.starts_with('=') {
                return Err(FlagError::BadSyntax(token.clone()));
            }
            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };
            let Some(flag) = self.lookup(name) else {
                if name == "h" || name == "help" {
                    return Err(FlagError::Help);
                }
                return Err(FlagError::NotDefined(name.to_string()));
            };
            let value = if flag.is_bool() {
                inline.unwrap_or("true").to_string()
            } else if let Some(value) = inline {
                value.to_string()
            } else if let Some((next, tail)) = rest.split_first() {
                rest = tail;
                next.clone()
            } else {
                return Err(FlagError::MissingArgument(name.to_string()));
            };
            self.set(name, &value)?;
        }
        self.args = rest.to_vec();
        Ok(())
    }

    /// Write the default help listing of every declared flag.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_defaults(&self, w: &mut dyn Write) -> io::Result<()> {
        for flag in &self.flags {
            let mut line = format!("  -{}", flag.name);
            let (value_name, usage) = flag.unquote_usage();
            if !value_name.is_empty() {
                line.push(' ');
                line.push_str(&value_name);
            }
            // Single-letter boolean flags keep their usage on the same line
            if line.len() <= 4 {
                line.push('\t');
            } else {
                line.push_str("\n    \t");
            }
            line.push_str(&usage.replace('\n', "\n    \t"));
            if !flag.default.is_zero() {
                match &flag.default {
                    FlagValue::String(s) => line.push_str(&format!(" (default {s:?})")),
                    other => line.push_str(&format!(" (default {other})")),
                }
            }
            writeln!(w, "{line}")?;
        }
        Ok(())
    }
}

enum FlagToken<'a> {
    /// A lone `--`, consumed and ending flag parsing.
    Terminator,
    /// Everything after the leading dashes.
    Body(&'a str),
}

/// Classify a token, returning `None` when it is positional.
fn flag_token(token: &str) -> Option<FlagToken<'_>> {
    if token.len() < 2 || !token.starts_with('-') {
        return None;
    }
    if token == "--" {
        return Some(FlagToken::Terminator);
    }
    let body = token.strip_prefix("--").unwrap_or(&token[1..]);
    Some(FlagToken::Body(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn sample() -> FlagSet {
        let mut flags = FlagSet::new();
        flags
            .string("name", "default", "name flag")
            .int("count", 0, "count flag")
            .bool("v", false, "verbose output")
            .float("ratio", 1.5, "sampling ratio");
        flags
    }

    #[test]
    fn test_parse_and_set_flags() {
        let mut flags = sample();
        flags
            .parse(&args(&["-name=foo", "-count=5", "rest"]))
            .unwrap();
        assert_eq!(flags.get_string("name"), Some("foo"));
        assert_eq!(flags.get_int("count"), Some(5));
        assert_eq!(flags.args(), args(&["rest"]).as_slice());
        assert!(flags.lookup("name").unwrap().is_set());
        assert!(!flags.lookup("v").unwrap().is_set());
    }

    #[test]
    fn test_value_in_next_token_and_double_dash() {
        let mut flags = sample();
        flags
            .parse(&args(&["--name", "bar", "-v", "--ratio=0.25", "x", "-count=3"]))
            .unwrap();
        assert_eq!(flags.get_string("name"), Some("bar"));
        assert_eq!(flags.get_bool("v"), Some(true));
        assert_eq!(flags.get_float("ratio"), Some(0.25));
        // Parsing stops at the first positional argument
        assert_eq!(flags.get_int("count"), Some(0));
        assert_eq!(flags.args(), args(&["x", "-count=3"]).as_slice());
    }

    #[test]
    fn test_bool_does_not_consume_next_token() {
        let mut flags = sample();
        flags.parse(&args(&["-v", "false"])).unwrap();
        assert_eq!(flags.get_bool("v"), Some(true));
        assert_eq!(flags.args(), args(&["false"]).as_slice());

        flags.parse(&args(&["-v=false"])).unwrap();
        assert_eq!(flags.get_bool("v"), Some(false));
    }

    #[test]
    fn test_terminator_and_lone_dash() {
        let mut flags = sample();
        flags.parse(&args(&["--", "-v"])).unwrap();
        assert_eq!(flags.get_bool("v"), Some(false));
        assert_eq!(flags.args(), args(&["-v"]).as_slice());

        flags.parse(&args(&["-", "-v"])).unwrap();
        assert_eq!(flags.args(), args(&["-", "-v"]).as_slice());
    }

    #[test]
    fn test_parse_errors() {
        let mut flags = sample();
        assert_eq!(
            flags.parse(&args(&["-nope"])),
            Err(FlagError::NotDefined("nope".to_string()))
        );
        assert_eq!(
            flags.parse(&args(&["---name"])),
            Err(FlagError::BadSyntax("---name".to_string()))
        );
        assert_eq!(
            flags.parse(&args(&["-=x"])),
            Err(FlagError::BadSyntax("-=x".to_string()))
        );
        assert_eq!(
            flags.parse(&args(&["-count"])),
            Err(FlagError::MissingArgument("count".to_string()))
        );
        assert!(matches!(
            flags.parse(&args(&["-count=five"])),
            Err(FlagError::InvalidValue { ref name, ref value, .. })
                if name == "count" && value == "five"
        ));
        assert!(matches!(
            flags.parse(&args(&["-v=maybe"])),
            Err(FlagError::InvalidValue { .. })
        ));
        assert_eq!(flags.parse(&args(&["-help"])), Err(FlagError::Help));
        assert_eq!(flags.parse(&args(&["-h"])), Err(FlagError::Help));
    }

    #[test]
    fn test_int_literals() {
        let mut flags = sample();
        for (raw, expected) in [
            ("0x10", 16),
            ("0XfF", 255),
            ("0o17", 15),
            ("017", 15),
            ("-0b101", -5),
            ("+42", 42),
            ("1_000", 1000),
            ("0x_10", 16),
            ("0", 0),
            ("-9223372036854775808", i64::MIN),
        ] {
            flags.parse(&args(&["-count", raw])).unwrap();
            assert_eq!(flags.get_int("count"), Some(expected), "{raw}");
        }
        for raw in ["08", "0x", "_1", "1__0", "1_", "+-1", "0b2", "1e3"] {
            assert!(
                matches!(
                    flags.parse(&args(&["-count", raw])),
                    Err(FlagError::InvalidValue { .. })
                ),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FlagError::NotDefined("x".to_string()).to_string(),
            "flag provided but not defined: -x"
        );
        let err = FlagError::InvalidValue {
            name: "count".to_string(),
            value: "five".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value \"five\" for flag -count: invalid digit found in string"
        );
    }

    #[test]
    #[should_panic(expected = "flag redefined: name")]
    fn test_redefined_flag_panics() {
        let mut flags = sample();
        flags.string("name", "", "again");
    }

    #[test]
    fn test_write_defaults() {
        let mut buf = Vec::new();
        sample().write_defaults(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "  -name string\n    \tname flag (default \"default\")\n\
             \x20 -count int\n    \tcount flag\n\
             \x20 -v\tverbose output\n\
             \x20 -ratio float\n    \tsampling ratio (default 1.5)\n"
        );
    }

    #[test]
    fn test_write_defaults_backquoted_name_and_multiline_usage() {
        let mut flags = FlagSet::new();
        flags.string("config", "", "load settings from `file`\nrelative to the cwd");
        let mut buf = Vec::new();
        flags.write_defaults(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "  -config file\n    \tload settings from file\n    \trelative to the cwd\n"
        );
    }
}
