//! SDL scanning.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while scanning an SDL document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Document contained no type definitions.
    #[error("schema document is empty")]
    Empty,

    /// Ran out of input inside a block.
    #[error("unexpected end of schema document (unclosed block)")]
    UnexpectedEof,

    /// Token that cannot start a definition.
    #[error("unexpected token `{0}` at top level")]
    UnexpectedToken(String),

    /// Structural expectation violated.
    #[error("expected {expected}, found `{found}`")]
    Expected { expected: &'static str, found: String },

    /// Same type defined twice in one document.
    #[error("type `{0}` is defined more than once in this document")]
    DuplicateType(String),

    /// Object-like type with no fields.
    #[error("type `{0}` has an empty body")]
    EmptyTypeBody(String),
}

/// Kind of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Object,
    Interface,
    Enum,
    Input,
    Union,
    Scalar,
}

/// A single field: name, the named type it returns, and the full type
/// expression as written.
///
/// `reviews: [Review!]!` records `type_name = "Review"` (for reference
/// resolution) and `type_text = "[Review!]!"` (for rendering).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub type_name: String,
    pub type_text: String,
}

/// One type definition or extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    /// True for `extend type X` definitions.
    pub extend: bool,
    pub fields: Vec<FieldDef>,
    /// Enum values or union members; empty for other kinds.
    #[serde(default)]
    pub members: Vec<String>,
}

/// Structural model of one service's partial schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSchema {
    pub types: Vec<TypeDef>,
}

impl PartialSchema {
    /// Names of types this document defines (not extensions).
    pub fn defined_types(&self) -> impl Iterator<Item = &str> {
        self.types
            .iter()
            .filter(|t| !t.extend)
            .map(|t| t.name.as_str())
    }

    /// Whether this document defines (not extends) `name`.
    pub fn defines(&self, name: &str) -> bool {
        self.defined_types().any(|t| t == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    Punct(char),
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Ident(s) => s.clone(),
            Tok::Punct(c) => c.to_string(),
        }
    }
}

fn tokenize(source: &str) -> Vec<Tok> {
    let mut toks = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == ',' {
            i += 1;
        } else if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '"' {
            // Block string or string literal; contents are descriptions, skipped.
            if chars[i..].len() >= 3 && chars[i + 1] == '"' && chars[i + 2] == '"' {
                i += 3;
                while i + 2 < chars.len()
                    && !(chars[i] == '"' && chars[i + 1] == '"' && chars[i + 2] == '"')
                {
                    i += 1;
                }
                i = (i + 3).min(chars.len());
            } else {
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
        } else if c == '_' || c.is_ascii_alphabetic() {
            let start = i;
            while i < chars.len() && (chars[i] == '_' || chars[i].is_ascii_alphanumeric()) {
                i += 1;
            }
            toks.push(Tok::Ident(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit() || c == '-' {
            // Numeric literal (default values); skipped.
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                i += 1;
            }
        } else {
            toks.push(Tok::Punct(c));
            i += 1;
        }
    }
    toks
}

struct Cursor {
    toks: Vec<Tok>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let t = self.toks.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<String, SchemaError> {
        match self.next() {
            Some(Tok::Ident(s)) => Ok(s),
            Some(other) => Err(SchemaError::Expected {
                expected,
                found: other.describe(),
            }),
            None => Err(SchemaError::UnexpectedEof),
        }
    }

    fn expect_punct(&mut self, p: char, expected: &'static str) -> Result<(), SchemaError> {
        match self.next() {
            Some(Tok::Punct(c)) if c == p => Ok(()),
            Some(other) => Err(SchemaError::Expected {
                expected,
                found: other.describe(),
            }),
            None => Err(SchemaError::UnexpectedEof),
        }
    }

    fn eat_punct(&mut self, p: char) -> bool {
        if matches!(self.peek(), Some(Tok::Punct(c)) if *c == p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skip a balanced `(...)` group, assuming the opener was just consumed.
    fn skip_group(&mut self, open: char, close: char) -> Result<(), SchemaError> {
        let mut depth = 1;
        while depth > 0 {
            match self.next() {
                Some(Tok::Punct(c)) if c == open => depth += 1,
                Some(Tok::Punct(c)) if c == close => depth -= 1,
                Some(_) => {}
                None => return Err(SchemaError::UnexpectedEof),
            }
        }
        Ok(())
    }

    /// Skip any trailing `@directive(...)` applications.
    fn skip_directives(&mut self) -> Result<(), SchemaError> {
        while self.eat_punct('@') {
            self.expect_ident("directive name")?;
            if self.eat_punct('(') {
                self.skip_group('(', ')')?;
            }
        }
        Ok(())
    }
}

/// Scan an SDL document into a [`PartialSchema`].
///
/// This is the malformed-input gate: a document rejected here never reaches
/// the registry.
pub fn parse_partial(source: &str) -> Result<PartialSchema, SchemaError> {
    let mut cur = Cursor {
        toks: tokenize(source),
        pos: 0,
    };
    let mut schema = PartialSchema::default();

    while let Some(tok) = cur.next() {
        let mut keyword = match tok {
            Tok::Ident(s) => s,
            Tok::Punct(c) => return Err(SchemaError::UnexpectedToken(c.to_string())),
        };

        let extend = keyword == "extend";
        if extend {
            keyword = cur.expect_ident("definition keyword after `extend`")?;
        }

        match keyword.as_str() {
            "type" | "interface" | "input" => {
                let kind = match keyword.as_str() {
                    "type" => TypeKind::Object,
                    "interface" => TypeKind::Interface,
                    _ => TypeKind::Input,
                };
                let name = cur.expect_ident("type name")?;
                skip_implements(&mut cur)?;
                cur.skip_directives()?;
                cur.expect_punct('{', "`{` opening type body")?;
                let fields = parse_fields(&mut cur)?;
                if fields.is_empty() {
                    return Err(SchemaError::EmptyTypeBody(name));
                }
                push_type(&mut schema, TypeDef { name, kind, extend, fields, members: Vec::new() })?;
            }
            "enum" => {
                let name = cur.expect_ident("enum name")?;
                cur.skip_directives()?;
                cur.expect_punct('{', "`{` opening enum body")?;
                let mut members = Vec::new();
                loop {
                    match cur.next() {
                        Some(Tok::Punct('}')) => break,
                        Some(Tok::Ident(value)) => {
                            cur.skip_directives()?;
                            members.push(value);
                        }
                        Some(other) => {
                            return Err(SchemaError::Expected {
                                expected: "enum value or `}`",
                                found: other.describe(),
                            })
                        }
                        None => return Err(SchemaError::UnexpectedEof),
                    }
                }
                if members.is_empty() {
                    return Err(SchemaError::EmptyTypeBody(name));
                }
                push_type(&mut schema, TypeDef { name, kind: TypeKind::Enum, extend, fields: Vec::new(), members })?;
            }
            "union" => {
                let name = cur.expect_ident("union name")?;
                cur.skip_directives()?;
                cur.expect_punct('=', "`=` after union name")?;
                let mut members = vec![cur.expect_ident("union member")?];
                while cur.eat_punct('|') {
                    members.push(cur.expect_ident("union member")?);
                }
                push_type(&mut schema, TypeDef { name, kind: TypeKind::Union, extend, fields: Vec::new(), members })?;
            }
            "scalar" => {
                let name = cur.expect_ident("scalar name")?;
                cur.skip_directives()?;
                push_type(&mut schema, TypeDef { name, kind: TypeKind::Scalar, extend, fields: Vec::new(), members: Vec::new() })?;
            }
            "schema" => {
                cur.skip_directives()?;
                cur.expect_punct('{', "`{` opening schema body")?;
                cur.skip_group('{', '}')?;
            }
            "directive" => {
                cur.expect_punct('@', "`@` after `directive`")?;
                cur.expect_ident("directive name")?;
                if cur.eat_punct('(') {
                    cur.skip_group('(', ')')?;
                }
                // `on LOCATION | LOCATION ...`
                let on = cur.expect_ident("`on`")?;
                if on != "on" {
                    return Err(SchemaError::Expected { expected: "`on`", found: on });
                }
                cur.expect_ident("directive location")?;
                while cur.eat_punct('|') {
                    cur.expect_ident("directive location")?;
                }
            }
            other => return Err(SchemaError::UnexpectedToken(other.to_string())),
        }
    }

    if schema.types.is_empty() {
        return Err(SchemaError::Empty);
    }
    Ok(schema)
}

fn push_type(schema: &mut PartialSchema, def: TypeDef) -> Result<(), SchemaError> {
    if !def.extend && schema.types.iter().any(|t| !t.extend && t.name == def.name) {
        return Err(SchemaError::DuplicateType(def.name));
    }
    schema.types.push(def);
    Ok(())
}

fn skip_implements(cur: &mut Cursor) -> Result<(), SchemaError> {
    if matches!(cur.peek(), Some(Tok::Ident(s)) if s == "implements") {
        cur.next();
        cur.expect_ident("interface name")?;
        while cur.eat_punct('&') {
            cur.expect_ident("interface name")?;
        }
    }
    Ok(())
}

fn parse_fields(cur: &mut Cursor) -> Result<Vec<FieldDef>, SchemaError> {
    let mut fields = Vec::new();
    loop {
        match cur.next() {
            Some(Tok::Punct('}')) => return Ok(fields),
            Some(Tok::Ident(name)) => {
                if cur.eat_punct('(') {
                    cur.skip_group('(', ')')?;
                }
                cur.expect_punct(':', "`:` after field name")?;
                let (type_name, type_text) = parse_field_type(cur)?;
                // Default values on input fields.
                if cur.eat_punct('=') {
                    if matches!(cur.peek(), Some(Tok::Ident(_))) {
                        cur.next();
                    } else if cur.eat_punct('[') {
                        cur.skip_group('[', ']')?;
                    }
                }
                cur.skip_directives()?;
                fields.push(FieldDef { name, type_name, type_text });
            }
            Some(other) => {
                return Err(SchemaError::Expected {
                    expected: "field name or `}`",
                    found: other.describe(),
                })
            }
            None => return Err(SchemaError::UnexpectedEof),
        }
    }
}

fn parse_field_type(cur: &mut Cursor) -> Result<(String, String), SchemaError> {
    let mut text = String::new();
    while cur.eat_punct('[') {
        text.push('[');
    }
    let name = cur.expect_ident("type name")?;
    text.push_str(&name);
    loop {
        if cur.eat_punct(']') {
            text.push(']');
        } else if cur.eat_punct('!') {
            text.push('!');
        } else {
            break;
        }
    }
    Ok((name, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_with_fields() {
        let schema = parse_partial(
            r#"
            type Query {
              me: User
            }

            type User @key(fields: "id") {
              id: ID!
              name: String
              reviews(first: Int = 10): [Review!]!
            }
            "#,
        )
        .unwrap();

        assert_eq!(schema.types.len(), 2);
        let user = &schema.types[1];
        assert_eq!(user.name, "User");
        assert_eq!(user.kind, TypeKind::Object);
        assert!(!user.extend);
        assert_eq!(user.fields.len(), 3);
        assert_eq!(user.fields[2].name, "reviews");
        assert_eq!(user.fields[2].type_name, "Review");
        assert_eq!(user.fields[2].type_text, "[Review!]!");
    }

    #[test]
    fn test_parse_extend_type() {
        let schema = parse_partial(
            r#"
            type Review {
              body: String!
            }

            extend type User @key(fields: "id") {
              reviews: [Review]
            }
            "#,
        )
        .unwrap();

        assert!(schema.defines("Review"));
        assert!(!schema.defines("User"));
        let ext = schema.types.iter().find(|t| t.name == "User").unwrap();
        assert!(ext.extend);
    }

    #[test]
    fn test_enum_union_scalar() {
        let schema = parse_partial(
            r#"
            scalar DateTime
            enum Role { ADMIN USER }
            union Media = Photo | Video
            type Photo { url: String }
            type Video { url: String }
            type Query { media: Media }
            "#,
        )
        .unwrap();
        assert!(schema.defines("DateTime"));
        assert!(schema.defines("Role"));
        assert!(schema.defines("Media"));
    }

    #[test]
    fn test_unclosed_body_rejected() {
        let err = parse_partial("type Query { me: User").unwrap_err();
        assert_eq!(err, SchemaError::UnexpectedEof);
    }

    #[test]
    fn test_empty_document_rejected() {
        assert_eq!(parse_partial("  # just a comment\n").unwrap_err(), SchemaError::Empty);
    }

    #[test]
    fn test_missing_colon_rejected() {
        let err = parse_partial("type Query { me User }").unwrap_err();
        assert!(matches!(err, SchemaError::Expected { expected, .. } if expected.contains(":")));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let err = parse_partial("type A { x: Int }\ntype A { y: Int }").unwrap_err();
        assert_eq!(err, SchemaError::DuplicateType("A".into()));
    }

    #[test]
    fn test_empty_body_rejected() {
        let err = parse_partial("type A { }").unwrap_err();
        assert_eq!(err, SchemaError::EmptyTypeBody("A".into()));
    }

    #[test]
    fn test_descriptions_and_comments_skipped() {
        let schema = parse_partial(
            r#"
            """
            The root query type.
            """
            type Query {
              # current viewer
              "the viewer" me: User
            }
            type User { id: ID! }
            "#,
        )
        .unwrap();
        assert_eq!(schema.types[0].fields.len(), 1);
    }
}
