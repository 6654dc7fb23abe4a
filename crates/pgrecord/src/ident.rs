//! SQL identifier quoting.
//!
//! Two renderings are used:
//!
//! - [`quote_identifier`] always quotes. Table descriptors use it for every
//!   identifier they emit, so catalog names round-trip exactly.
//! - [`sanitize_identifier`] leaves plain lower-case names (`[a-z0-9_]`, not
//!   starting with a digit) bare and quotes everything else. The free-standing
//!   statement builders use it so hand-written table names stay readable.
//!
//! [`Ident`] parses dotted and quoted table names such as `public.widgets` or
//! `"Odd"."Name"` for the free-standing builders.

use crate::error::{OrmError, OrmResult};

/// Double-quote `name`, doubling embedded quotes. NUL characters are dropped.
pub fn quote_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    push_quoted(&mut out, name);
    out
}

/// Emit `name` bare when it is a plain lower-case identifier, quoted otherwise.
pub fn sanitize_identifier(name: &str) -> String {
    if is_plain(name) {
        name.to_string()
    } else {
        quote_identifier(name)
    }
}

fn is_plain(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit())
}

fn push_quoted(out: &mut String, name: &str) {
    out.push('"');
    for ch in name.chars() {
        match ch {
            '"' => out.push_str("\"\""),
            '\0' => {}
            _ => out.push(ch),
        }
    }
    out.push('"');
}

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// Written without quotes; rendered bare only when plain.
    Unquoted(String),
    /// Written with quotes; always rendered quoted.
    Quoted(String),
}

/// A possibly schema-qualified SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Parse an identifier string, supporting dotted and quoted forms.
    ///
    /// - Dotted: `schema.table`
    /// - Quoted: `"CamelCase"."UserTable"`
    /// - Mixed: `public."UserTable"`
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::precondition("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::precondition(
                "identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') if chars.peek().is_some() => {}
                    Some('.') => return Err(OrmError::precondition("trailing '.' in identifier")),
                    Some(c) => {
                        return Err(OrmError::precondition(format!(
                            "expected '.' between identifier parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            name.push('"');
                        }
                        Some('"') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(OrmError::precondition("unclosed quoted identifier"));
                        }
                    }
                }
                if name.is_empty() {
                    return Err(OrmError::precondition("empty quoted identifier"));
                }
                parts.push(IdentPart::Quoted(name));
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                if c == '"' {
                    return Err(OrmError::precondition(format!(
                        "unexpected quote in identifier '{s}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(OrmError::precondition("empty identifier segment"));
            }
            parts.push(IdentPart::Unquoted(name));
        }

        Ok(Self { parts })
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Unquoted(s) if is_plain(s) => out.push_str(s),
                IdentPart::Unquoted(s) | IdentPart::Quoted(s) => push_quoted(&mut out, s),
            }
        }
        out
    }
}

/// Convert an input into an [`Ident`].
pub trait IntoIdent {
    fn into_ident(self) -> OrmResult<Ident>;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> OrmResult<Ident> {
        Ok(self)
    }
}

impl IntoIdent for &Ident {
    fn into_ident(self) -> OrmResult<Ident> {
        Ok(self.clone())
    }
}

impl IntoIdent for &str {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(&self)
    }
}
