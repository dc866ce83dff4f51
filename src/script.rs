//! Migration scripts.
//!
//! A migration script is a list of operation calls, one per line, with `--`
//! comments:
//!
//! ```text
//! -- @name: 20260101120000_add_reports
//! op.create_view("active_users", "SELECT id FROM users WHERE active")
//! op.replace_view("totals", "SELECT sum(n) FROM t", schema="reporting", drop=true)
//! op.drop_view("legacy_report")
//! ```
//!
//! Rendering goes through [`OpCall`]'s `Display`; parsing uses nom and
//! produces the same [`OpCall`] values, which the
//! [`OperationRegistry`](crate::registry::OperationRegistry) turns back into
//! operations.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while, take_while1},
    character::complete::{char, hex_digit1, multispace0, multispace1, not_line_ending},
    combinator::{cut, map, map_opt, opt, recognize, value, verify},
    multi::{fold_many0, many0, separated_list0},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    IResult,
};
use std::fmt;

use crate::error::{ViewError, ViewResult};
use crate::ops::ViewOp;
use crate::schema::SchemaName;

/// A literal argument in an operation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Str(String),
    Bool(bool),
    Null,
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Str(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Debug formatting escapes quotes, backslashes and control characters
            ArgValue::Str(s) => write!(f, "{:?}", s),
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Null => write!(f, "null"),
        }
    }
}

/// One operation call: `op.<name>(<args>, <key>=<value>)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpCall {
    pub name: String,
    pub args: Vec<ArgValue>,
    pub kwargs: Vec<(String, ArgValue)>,
}

impl OpCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            kwargs: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Append a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.kwargs.push((key.into(), value.into()));
        self
    }

    /// `schema="..."` for named schemas; nothing for the default schema.
    pub fn schema_kwarg(self, schema: &SchemaName) -> Self {
        match schema {
            SchemaName::Default => self,
            SchemaName::Named(name) => self.kwarg("schema", name.as_str()),
        }
    }

    /// Argument by position, or by keyword.
    pub fn get(&self, index: usize, key: &str) -> Option<&ArgValue> {
        self.args.get(index).or_else(|| {
            self.kwargs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
        })
    }

    /// Reject calls that don't fit the parameter list `params`.
    pub fn expect_params(&self, params: &[&str]) -> ViewResult<()> {
        if self.args.len() > params.len() {
            return Err(ViewError::invalid_argument(
                &self.name,
                format!(
                    "takes at most {} positional arguments, got {}",
                    params.len(),
                    self.args.len()
                ),
            ));
        }

        for (i, (key, _)) in self.kwargs.iter().enumerate() {
            let Some(position) = params.iter().position(|p| p == key) else {
                return Err(ViewError::invalid_argument(
                    &self.name,
                    format!("unexpected keyword argument '{}'", key),
                ));
            };
            if position < self.args.len() || self.kwargs[..i].iter().any(|(k, _)| k == key) {
                return Err(ViewError::invalid_argument(
                    &self.name,
                    format!("argument '{}' given more than once", key),
                ));
            }
        }

        Ok(())
    }

    pub fn required_str(&self, index: usize, key: &str) -> ViewResult<String> {
        match self.get(index, key) {
            Some(ArgValue::Str(s)) => Ok(s.clone()),
            Some(other) => Err(ViewError::invalid_argument(
                &self.name,
                format!("'{}' must be a string, got {}", key, other),
            )),
            None => Err(ViewError::invalid_argument(
                &self.name,
                format!("missing required argument '{}'", key),
            )),
        }
    }

    /// A string argument that may be absent or `null`.
    pub fn optional_str(&self, index: usize, key: &str) -> ViewResult<Option<String>> {
        match self.get(index, key) {
            Some(ArgValue::Str(s)) => Ok(Some(s.clone())),
            Some(ArgValue::Null) | None => Ok(None),
            Some(other) => Err(ViewError::invalid_argument(
                &self.name,
                format!("'{}' must be a string or null, got {}", key, other),
            )),
        }
    }

    /// A boolean argument, `false` when absent.
    pub fn flag(&self, index: usize, key: &str) -> ViewResult<bool> {
        match self.get(index, key) {
            Some(ArgValue::Bool(b)) => Ok(*b),
            None => Ok(false),
            Some(other) => Err(ViewError::invalid_argument(
                &self.name,
                format!("'{}' must be true or false, got {}", key, other),
            )),
        }
    }
}

impl fmt::Display for OpCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .args
            .iter()
            .map(|v| v.to_string())
            .chain(self.kwargs.iter().map(|(k, v)| format!("{}={}", k, v)))
            .collect::<Vec<_>>();
        write!(f, "op.{}({})", self.name, args.join(", "))
    }
}

/// Upgrade and downgrade scripts for one migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    pub upgrade: String,
    pub downgrade: String,
}

/// Render `ops` as an upgrade script, and their reversal as the downgrade.
///
/// The downgrade runs the reversed operations in reverse order. Fails if any
/// operation cannot be reversed.
pub fn render_migration(ops: &[ViewOp]) -> ViewResult<MigrationScript> {
    let upgrade = ops.iter().map(ViewOp::render).collect::<Vec<_>>();

    let downgrade = ops
        .iter()
        .rev()
        .map(|op| op.reverse().map(|reversed| reversed.render()))
        .collect::<ViewResult<Vec<_>>>()?;

    Ok(MigrationScript {
        upgrade: upgrade.join("\n"),
        downgrade: downgrade.join("\n"),
    })
}

/// Parse a migration script into operation calls.
pub fn parse_script(input: &str) -> ViewResult<Vec<OpCall>> {
    match parse_calls(input) {
        Ok(("", calls)) => Ok(calls),
        Ok((remaining, _)) => Err(ViewError::script(
            input.len() - remaining.len(),
            format!("Unexpected content: '{}'", first_line(remaining)),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ViewError::script(
            input.len() - e.input.len(),
            format!("Parse failed near '{}'", first_line(e.input)),
        )),
        Err(nom::Err::Incomplete(_)) => Err(ViewError::script(input.len(), "Unexpected end of input")),
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or_default()
}

/// Whitespace and `--` comments.
fn skip(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            multispace1,
            recognize(pair(tag("--"), not_line_ending)),
        ))),
    )(input)
}

fn parse_calls(input: &str) -> IResult<&str, Vec<OpCall>> {
    preceded(skip, many0(terminated(parse_call, skip)))(input)
}

/// Parse `op.name(args)`.
fn parse_call(input: &str) -> IResult<&str, OpCall> {
    let (input, _) = tag("op.")(input)?;
    let (input, name) = cut(parse_identifier)(input)?;
    let (input, _) = cut(preceded(multispace0, char('(')))(input)?;
    let (input, args) = cut(separated_list0(
        delimited(multispace0, char(','), multispace0),
        preceded(multispace0, parse_arg),
    ))(input)?;
    let (input, _) = opt(preceded(multispace0, char(',')))(input)?;
    let (input, _) = cut(preceded(multispace0, char(')')))(input)?;

    let mut call = OpCall::new(name);
    for arg in args {
        match arg {
            Arg::Positional(v) => call.args.push(v),
            Arg::Keyword(k, v) => call.kwargs.push((k.to_string(), v)),
        }
    }
    Ok((input, call))
}

enum Arg<'a> {
    Positional(ArgValue),
    Keyword(&'a str, ArgValue),
}

fn parse_arg(input: &str) -> IResult<&str, Arg<'_>> {
    alt((
        map(
            separated_pair(
                parse_identifier,
                delimited(multispace0, char('='), multispace0),
                parse_value,
            ),
            |(k, v)| Arg::Keyword(k, v),
        ),
        map(parse_value, Arg::Positional),
    ))(input)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn parse_value(input: &str) -> IResult<&str, ArgValue> {
    alt((
        map(parse_string, ArgValue::Str),
        value(ArgValue::Bool(true), tag("true")),
        value(ArgValue::Bool(false), tag("false")),
        value(ArgValue::Null, tag("null")),
    ))(input)
}

enum Fragment<'a> {
    Literal(&'a str),
    Escaped(char),
}

/// Parse a double-quoted string with backslash escapes.
fn parse_string(input: &str) -> IResult<&str, String> {
    let literal = verify(is_not("\"\\"), |s: &str| !s.is_empty());
    let fragment = alt((
        map(literal, Fragment::Literal),
        map(parse_escape, Fragment::Escaped),
    ));
    let body = fold_many0(fragment, String::new, |mut out, fragment| {
        match fragment {
            Fragment::Literal(s) => out.push_str(s),
            Fragment::Escaped(c) => out.push(c),
        }
        out
    });

    delimited(char('"'), body, cut(char('"')))(input)
}

fn parse_escape(input: &str) -> IResult<&str, char> {
    preceded(
        char('\\'),
        alt((
            value('\\', char('\\')),
            value('"', char('"')),
            value('\'', char('\'')),
            value('\n', char('n')),
            value('\r', char('r')),
            value('\t', char('t')),
            value('\0', char('0')),
            map_opt(delimited(tag("u{"), hex_digit1, char('}')), |hex: &str| {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            }),
        )),
    )(input)
}
