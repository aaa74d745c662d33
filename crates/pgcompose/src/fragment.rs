//! Template fragments: the (template, args, params) algebra every SQL piece is built from.
//!
//! A template contains two kinds of slots:
//!
//! - `{}` takes the next argument (a nested fragment or a literal identifier), which is
//!   substituted textually.
//! - `{?}` takes the next bound parameter, which becomes a driver placeholder when compiled
//!   and an SQL literal when rendered.
//!
//! ```ignore
//! use pgcompose::{Arg, Fragment, Value};
//!
//! let f = Fragment::make("{} = {?}", vec![Arg::ident("users.id")], vec![Value::from(1)])?;
//! assert_eq!(f.render(), "users.id = 1");
//! assert_eq!(f.compile().sql, "users.id = %s");
//! ```

use crate::error::{OrmError, OrmResult};
use crate::value::{Value, scalar_to_sql};
use std::fmt;
use std::ops::Add;
use tokio_postgres::types::ToSql;

/// Argument slot marker.
pub const ARG_SLOT: &str = "{}";
/// Parameter slot marker.
pub const PARAM_SLOT: &str = "{?}";

/// Driver placeholder token emitted for each bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placeholder {
    /// `%s` (DB-API `format` paramstyle).
    #[default]
    Format,
    /// `?` (`qmark` paramstyle).
    Question,
    /// `$1, $2, ...` (PostgreSQL native, used by tokio-postgres).
    Numbered,
}

impl Placeholder {
    fn write(self, out: &mut String, index: usize) {
        match self {
            Placeholder::Format => out.push_str("%s"),
            Placeholder::Question => out.push('?'),
            Placeholder::Numbered => {
                out.push('$');
                out.push_str(&index.to_string());
            }
        }
    }
}

/// Decides the delimiter used by [`Fragment::concat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FragmentKind {
    /// Joined with a single space.
    #[default]
    Plain,
    /// Joined with ` AND `.
    Filter,
    /// Joined with `, `.
    Comma,
    /// Joined with `; `.
    Statement,
    /// The empty fragment.
    Empty,
}

impl FragmentKind {
    pub fn delimiter(self) -> &'static str {
        match self {
            FragmentKind::Plain => " ",
            FragmentKind::Filter => " AND ",
            FragmentKind::Comma => ", ",
            FragmentKind::Statement => "; ",
            FragmentKind::Empty => "",
        }
    }
}

/// A template argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Fragment(Fragment),
    /// Literal text substituted as-is (identifiers, keywords, raw SQL).
    Ident(String),
}

impl Arg {
    pub fn ident(text: impl Into<String>) -> Self {
        Arg::Ident(text.into())
    }
}

impl From<Fragment> for Arg {
    fn from(f: Fragment) -> Self {
        Arg::Fragment(f)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Ident(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Ident(s)
    }
}

enum Token<'a> {
    Text(&'a str),
    Arg,
    Param,
}

/// Split a template into literal text and slot tokens.
fn tokens(template: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut rest = template;
    loop {
        let next_arg = rest.find(ARG_SLOT);
        let next_param = rest.find(PARAM_SLOT);
        let (pos, token, len) = match (next_arg, next_param) {
            (None, None) => break,
            (Some(a), Some(p)) if p < a => (p, Token::Param, PARAM_SLOT.len()),
            (Some(a), _) => (a, Token::Arg, ARG_SLOT.len()),
            (None, Some(p)) => (p, Token::Param, PARAM_SLOT.len()),
        };
        if pos > 0 {
            out.push(Token::Text(&rest[..pos]));
        }
        out.push(token);
        rest = &rest[pos + len..];
    }
    if !rest.is_empty() {
        out.push(Token::Text(rest));
    }
    out
}

/// Count `(argument slots, parameter slots)` in a template.
pub fn slot_counts(template: &str) -> (usize, usize) {
    tokens(template)
        .iter()
        .fold((0, 0), |(a, p), token| match token {
            Token::Arg => (a + 1, p),
            Token::Param => (a, p + 1),
            Token::Text(_) => (a, p),
        })
}

/// A composable piece of SQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    template: String,
    args: Vec<Arg>,
    params: Vec<Value>,
    kind: FragmentKind,
}

impl Fragment {
    /// Build a fragment, checking that slot counts match `args` and `params`.
    pub fn make(
        template: impl Into<String>,
        args: Vec<Arg>,
        params: Vec<Value>,
    ) -> OrmResult<Self> {
        let template = template.into();
        let (arg_slots, param_slots) = slot_counts(&template);
        if arg_slots != args.len() {
            return Err(OrmError::template_arity(format!(
                "template {template:?} has {arg_slots} argument slot(s) but {} argument(s) were given",
                args.len()
            )));
        }
        if param_slots != params.len() {
            return Err(OrmError::template_arity(format!(
                "template {template:?} has {param_slots} parameter slot(s) but {} parameter(s) were given",
                params.len()
            )));
        }
        Ok(Self::from_parts(template, args, params))
    }

    /// Internal constructor for templates whose slot counts are fixed by the caller.
    pub(crate) fn from_parts(
        template: impl Into<String>,
        args: Vec<Arg>,
        params: Vec<Value>,
    ) -> Self {
        let template = template.into();
        debug_assert_eq!(slot_counts(&template), (args.len(), params.len()));
        Self {
            template,
            args,
            params,
            kind: FragmentKind::Plain,
        }
    }

    /// Wrap fragments into a fixed template, e.g. `wrap("({})", [inner])`.
    pub(crate) fn wrap(template: &str, args: impl IntoIterator<Item = Fragment>) -> Self {
        Self::from_parts(
            template,
            args.into_iter().map(Arg::Fragment).collect(),
            Vec::new(),
        )
    }

    /// The identity element of [`Fragment::concat`].
    pub fn empty() -> Self {
        Self {
            template: String::new(),
            args: Vec::new(),
            params: Vec::new(),
            kind: FragmentKind::Empty,
        }
    }

    /// Pass-through SQL text. Never scanned for slots and never escaped.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::from_parts(ARG_SLOT, vec![Arg::Ident(text.into())], Vec::new())
    }

    /// A single bound parameter.
    pub fn param(value: impl Into<Value>) -> Self {
        Self::from_parts(PARAM_SLOT, Vec::new(), vec![value.into()])
    }

    pub fn with_kind(mut self, kind: FragmentKind) -> Self {
        if !self.is_empty() {
            self.kind = kind;
        }
        self
    }

    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Parameters bound directly on this fragment (not on nested ones).
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.template.is_empty() && self.args.is_empty() && self.params.is_empty()
    }

    /// Number of parameters reachable in this fragment's tree.
    pub fn param_count(&self) -> usize {
        self.params.len()
            + self
                .args
                .iter()
                .map(|arg| match arg {
                    Arg::Fragment(f) => f.param_count(),
                    Arg::Ident(_) => 0,
                })
                .sum::<usize>()
    }

    /// Concatenate using this fragment's kind delimiter.
    pub fn concat(self, other: Fragment) -> Self {
        let delimiter = self.kind.delimiter();
        self.concat_with(other, delimiter)
    }

    /// Concatenate with an explicit delimiter. Empty fragments are absorbed.
    pub fn concat_with(mut self, other: Fragment, delimiter: &str) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        self.template.push_str(delimiter);
        self.template.push_str(&other.template);
        self.args.extend(other.args);
        self.params.extend(other.params);
        self
    }

    /// Concatenate a sequence of fragments with the delimiter of `kind`.
    pub fn join(parts: impl IntoIterator<Item = Fragment>, kind: FragmentKind) -> Self {
        parts
            .into_iter()
            .fold(Fragment::empty(), |acc, part| {
                acc.concat_with(part, kind.delimiter())
            })
            .with_kind(kind)
    }

    /// Human-readable SQL with parameters inlined as literals.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        self.write_rendered(&mut out);
        out
    }

    fn write_rendered(&self, out: &mut String) {
        let mut args = self.args.iter();
        let mut params = self.params.iter();
        for token in tokens(&self.template) {
            match token {
                Token::Text(text) => out.push_str(text),
                Token::Arg => match args.next() {
                    Some(Arg::Fragment(f)) => f.write_rendered(out),
                    Some(Arg::Ident(text)) => out.push_str(text),
                    None => {}
                },
                Token::Param => {
                    if let Some(value) = params.next() {
                        out.push_str(&scalar_to_sql(value));
                    }
                }
            }
        }
    }

    /// Parameterized SQL using `%s` placeholders.
    pub fn compile(&self) -> CompiledQuery {
        self.compile_with(Placeholder::default())
    }

    /// Parameterized SQL using the given placeholder style.
    pub fn compile_with(&self, placeholder: Placeholder) -> CompiledQuery {
        let mut sql = String::with_capacity(self.template.len());
        let mut params = Vec::with_capacity(self.param_count());
        self.write_compiled(&mut sql, &mut params, placeholder);
        CompiledQuery { sql, params }
    }

    fn write_compiled(&self, out: &mut String, params: &mut Vec<Value>, placeholder: Placeholder) {
        let mut args = self.args.iter();
        let mut own = self.params.iter();
        for token in tokens(&self.template) {
            match token {
                Token::Text(text) => out.push_str(text),
                Token::Arg => match args.next() {
                    Some(Arg::Fragment(f)) => f.write_compiled(out, params, placeholder),
                    Some(Arg::Ident(text)) => out.push_str(text),
                    None => {}
                },
                Token::Param => {
                    if let Some(value) = own.next() {
                        params.push(value.clone());
                        placeholder.write(out, params.len());
                    }
                }
            }
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Add for Fragment {
    type Output = Fragment;

    fn add(self, rhs: Fragment) -> Fragment {
        self.concat(rhs)
    }
}

/// Compiled SQL plus its parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl CompiledQuery {
    /// Get parameters as references for tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect()
    }
}

mod sealed {
    pub trait Sealed {}
}

pub(crate) use sealed::Sealed;

/// Anything that produces a [`Fragment`]: columns, expressions, aggregates, statements.
///
/// The set of implementors is closed; use [`Fragment::raw`] to pass through other SQL.
pub trait Renderable: Sealed {
    fn fragment(&self) -> Fragment;
}

impl Sealed for Fragment {}

impl Renderable for Fragment {
    fn fragment(&self) -> Fragment {
        self.clone()
    }
}
