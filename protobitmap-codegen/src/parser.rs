use protobitmap::TypeTag;

use crate::error::{Error, Pos, Result};
use crate::lexer::{tokenize, Span, Token, TokenKind};

/// Option name that marks an enum as a bitmap
pub const BITMAP_OPTION: &str = "(bitmap)";

/// Name of the value every bitmap enum gets for the empty set
pub const BITMAP_NONE: &str = "None";

const MAX_FIELD_NUMBER: i128 = 536_870_911;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProtoFile {
    pub syntax: Option<String>,
    pub package: Option<String>,
    pub imports: Vec<String>,
    pub options: Vec<OptionDecl>,
    pub messages: Vec<Message>,
    pub enums: Vec<EnumDef>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    pub name: String,
    pub pos: Pos,
    pub fields: Vec<Field>,
    pub messages: Vec<Message>,
    pub enums: Vec<EnumDef>,
    pub options: Vec<OptionDecl>,
    pub oneofs: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    Singular,
    Optional,
    Required,
    Repeated,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    Scalar(TypeTag),
    /// Message or enum reference as written in the source
    Named(String),
    Map(TypeTag, Box<FieldType>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub pos: Pos,
    pub label: Label,
    pub ty: FieldType,
    pub number: u32,
    pub options: Vec<OptionDecl>,
    pub oneof: Option<String>,
    /// Type token, or the value type token of a map
    pub ty_span: Span,
    /// Full name of the bitmap enum this field was typed with before the transform
    pub bitmap: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub pos: Pos,
    pub keyword: Span,
    pub open: Span,
    pub close: Span,
    pub options: Vec<OptionDecl>,
    pub values: Vec<EnumValue>,
    /// Comments between the last value and the closing brace
    pub dangling: Vec<String>,
    /// Storage type, set by the transform for bitmap enums
    pub bitmap: Option<TypeTag>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub pos: Pos,
    pub span: Span,
    pub number: i128,
    pub options: Vec<OptionDecl>,
    /// Source span of `[ ... ]`
    pub options_span: Option<Span>,
    pub leading: Vec<String>,
    pub trailing: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionDecl {
    pub name: String,
    pub value: Constant,
    pub span: Span,
    /// Same-line comment after an `option ...;` statement
    pub trailing: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Ident(String),
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    /// Raw text of a `{ ... }` value
    Aggregate(String),
}

impl EnumDef {
    pub fn is_bitmap(&self) -> bool {
        self.options.iter().any(OptionDecl::is_bitmap)
    }
}

impl OptionDecl {
    pub fn is_bitmap(&self) -> bool {
        let named = self.name == BITMAP_OPTION || (self.name.starts_with('(') && self.name.ends_with(".bitmap)"));
        named && self.value != Constant::Bool(false)
    }
}

impl Message {
    pub fn visit_enums(&self, scope: &str, f: &mut impl FnMut(&str, &EnumDef)) {
        let scope = join_name(scope, &self.name);
        for e in &self.enums {
            f(&scope, e);
        }
        for m in &self.messages {
            m.visit_enums(&scope, f);
        }
    }
}

/// `a.b` + `C` -> `a.b.C`
pub fn join_name(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

pub fn parse(src: &str) -> Result<ProtoFile> {
    let tokens = tokenize(src)?;
    let mut p = Parser {
        src,
        tokens,
        idx: 0,
        comments: Vec::new(),
    };
    p.file()
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    idx: usize,
    comments: Vec<String>,
}

fn is_comment(t: &Token) -> bool {
    matches!(t.kind, TokenKind::Comment(_))
}

impl<'a> Parser<'a> {
    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens[self.idx ..].iter()
            .filter(|t| !is_comment(t))
            .nth(n)
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_symbol(&self, c: char) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Symbol(s), .. }) if *s == c)
    }

    fn peek_ident(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Ident(s), .. }) if s == kw)
    }

    fn peek_at_symbol(&self, n: usize, c: char) -> bool {
        matches!(self.peek_at(n), Some(Token { kind: TokenKind::Symbol(s), .. }) if *s == c)
    }

    /// Next significant token, comments on the way are buffered
    fn next(&mut self, expected: &str) -> Result<Token> {
        loop {
            let tok = match self.tokens.get(self.idx) {
                Some(tok) => tok.clone(),
                None => return Err(Error::Eof(expected.to_string())),
            };
            self.idx += 1;
            match tok.kind {
                TokenKind::Comment(c) => self.comments.push(c),
                _ => return Ok(tok),
            }
        }
    }

    fn take_comments(&mut self) -> Vec<String> {
        std::mem::take(&mut self.comments)
    }

    /// Comment sitting right after the previous token on the same line
    fn trailing_comment(&mut self, line: usize) -> Option<String> {
        match self.tokens.get(self.idx) {
            Some(Token { kind: TokenKind::Comment(c), pos, .. }) if pos.line == line => {
                let c = c.clone();
                self.idx += 1;
                Some(c)
            }
            _ => None,
        }
    }

    fn unexpected<T>(&self, tok: &Token, expected: &str) -> Result<T> {
        Err(Error::Expected {
            pos: tok.pos,
            expected: expected.to_string(),
            found: tok.kind.to_string(),
        })
    }

    fn expect_symbol(&mut self, c: char) -> Result<Token> {
        let expected = format!("`{}`", c);
        let tok = self.next(&expected)?;
        match tok.kind {
            TokenKind::Symbol(s) if s == c => Ok(tok),
            _ => self.unexpected(&tok, &expected),
        }
    }

    fn eat_symbol(&mut self, c: char) -> Result<bool> {
        if self.peek_symbol(c) {
            self.expect_symbol(c)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Token)> {
        let tok = self.next(what)?;
        match &tok.kind {
            TokenKind::Ident(s) => Ok((s.clone(), tok.clone())),
            _ => self.unexpected(&tok, what),
        }
    }

    fn expect_str(&mut self, what: &str) -> Result<String> {
        let tok = self.next(what)?;
        let mut value = match &tok.kind {
            TokenKind::Str(s) => s.clone(),
            _ => return self.unexpected(&tok, what),
        };
        // Adjacent literals concatenate
        while matches!(self.peek(), Some(Token { kind: TokenKind::Str(_), .. })) {
            if let TokenKind::Str(s) = self.next(what)?.kind {
                value.push_str(&s);
            }
        }
        Ok(value)
    }

    fn int(&self, tok: &Token) -> Result<i128> {
        match &tok.kind {
            TokenKind::Int(text) => parse_int(text).ok_or_else(|| Error::BadNumber(tok.pos, text.clone())),
            _ => self.unexpected(tok, "integer"),
        }
    }

    fn file(&mut self) -> Result<ProtoFile> {
        let mut file = ProtoFile::default();

        while let Some(tok) = self.peek().cloned() {
            self.comments.clear();
            let kw = match &tok.kind {
                TokenKind::Ident(kw) => kw.clone(),
                TokenKind::Symbol(';') => {
                    self.next(";")?;
                    continue;
                }
                _ => return self.unexpected(&tok, "top-level statement"),
            };

            match kw.as_str() {
                "syntax" | "edition" => {
                    self.next(&kw)?;
                    self.expect_symbol('=')?;
                    file.syntax = Some(self.expect_str("syntax string")?);
                    self.expect_symbol(';')?;
                }
                "package" => {
                    self.next(&kw)?;
                    file.package = Some(self.expect_ident("package name")?.0);
                    self.expect_symbol(';')?;
                }
                "import" => {
                    self.next(&kw)?;
                    if self.peek_ident("public") || self.peek_ident("weak") {
                        self.next("import modifier")?;
                    }
                    file.imports.push(self.expect_str("import path")?);
                    self.expect_symbol(';')?;
                }
                "option" => {
                    let opt = self.option_stmt()?;
                    file.options.push(opt);
                }
                "message" => {
                    self.next(&kw)?;
                    file.messages.push(self.message()?);
                }
                "enum" => {
                    let kw_tok = self.next(&kw)?;
                    file.enums.push(self.enum_def(kw_tok)?);
                }
                "service" | "extend" => {
                    self.next(&kw)?;
                    self.skip_block()?;
                }
                _ => return self.unexpected(&tok, "top-level statement"),
            }
        }

        Ok(file)
    }

    /// `option name = value;` starting at the `option` keyword
    fn option_stmt(&mut self) -> Result<OptionDecl> {
        let start = self.next("option")?.span.start;
        let name = self.option_name()?;
        self.expect_symbol('=')?;
        let value = self.constant()?;
        let semi = self.expect_symbol(';')?;
        let trailing = self.trailing_comment(semi.pos.line);
        Ok(OptionDecl {
            name,
            value,
            span: Span { start, end: semi.span.end },
            trailing,
        })
    }

    fn option_name(&mut self) -> Result<String> {
        let mut name = if self.eat_symbol('(')? {
            let (ext, _) = self.expect_ident("extension name")?;
            self.expect_symbol(')')?;
            format!("({})", ext)
        } else {
            self.expect_ident("option name")?.0
        };

        // `(ext).sub.field` lexes the suffix as a dotted identifier
        while self.peek().map_or(false, |t| matches!(&t.kind, TokenKind::Ident(s) if s.starts_with('.'))) {
            let (sub, _) = self.expect_ident("option sub-field")?;
            name.push_str(&sub);
        }

        Ok(name)
    }

    fn constant(&mut self) -> Result<Constant> {
        let tok = match self.peek() {
            Some(tok) => tok.clone(),
            None => return Err(Error::Eof("constant".to_string())),
        };

        let value = match &tok.kind {
            TokenKind::Str(_) => Constant::Str(self.expect_str("string")?),
            TokenKind::Symbol('{') => {
                let open = self.next("{")?;
                let close = self.skip_balanced()?;
                Constant::Aggregate(self.src[open.span.end .. close.span.start].trim().to_string())
            }
            TokenKind::Symbol(sign @ '-') | TokenKind::Symbol(sign @ '+') => {
                let negative = *sign == '-';
                self.next("sign")?;
                match self.number()? {
                    Constant::Int(v) if negative => Constant::Int(-v),
                    Constant::Float(v) if negative => Constant::Float(-v),
                    c => c,
                }
            }
            TokenKind::Ident(s) => {
                self.next("constant")?;
                match s.as_str() {
                    "true" => Constant::Bool(true),
                    "false" => Constant::Bool(false),
                    "inf" => Constant::Float(f64::INFINITY),
                    "nan" => Constant::Float(f64::NAN),
                    _ => Constant::Ident(s.clone()),
                }
            }
            TokenKind::Int(_) | TokenKind::Float(_) => self.number()?,
            _ => return self.unexpected(&tok, "constant"),
        };

        Ok(value)
    }

    fn number(&mut self) -> Result<Constant> {
        let tok = self.next("number")?;
        match &tok.kind {
            TokenKind::Int(_) => Ok(Constant::Int(self.int(&tok)?)),
            TokenKind::Float(text) => {
                text.trim_end_matches(|c| c == 'f' || c == 'F')
                    .parse::<f64>()
                    .map(Constant::Float)
                    .map_err(|_| Error::BadNumber(tok.pos, text.clone()))
            }
            TokenKind::Ident(s) if s == "inf" => Ok(Constant::Float(f64::INFINITY)),
            TokenKind::Ident(s) if s == "nan" => Ok(Constant::Float(f64::NAN)),
            _ => self.unexpected(&tok, "number"),
        }
    }

    /// `[a = 1, (b) = "x"]`, returns the options and the bracket span
    fn field_options(&mut self) -> Result<(Vec<OptionDecl>, Option<Span>)> {
        if !self.peek_symbol('[') {
            return Ok((Vec::new(), None));
        }

        let start = self.expect_symbol('[')?.span.start;
        let mut options = Vec::new();
        loop {
            let first = self.peek().map(|t| t.span.start).unwrap_or(start);
            let name = self.option_name()?;
            self.expect_symbol('=')?;
            let value = self.constant()?;
            let last = self.tokens[self.idx - 1].span.end;
            options.push(OptionDecl {
                name,
                value,
                span: Span { start: first, end: last },
                trailing: None,
            });

            if !self.eat_symbol(',')? {
                break;
            }
        }
        let end = self.expect_symbol(']')?.span.end;

        Ok((options, Some(Span { start, end })))
    }

    /// Consumes through the `}` matching an already consumed `{`
    fn skip_balanced(&mut self) -> Result<Token> {
        let mut depth = 1;
        loop {
            let tok = self.next("`}`")?;
            match tok.kind {
                TokenKind::Symbol('{') => depth += 1,
                TokenKind::Symbol('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(tok);
                    }
                }
                _ => (),
            }
        }
    }

    /// Skips a header and its `{ ... }` body
    fn skip_block(&mut self) -> Result<()> {
        loop {
            let tok = self.next("`{`")?;
            if let TokenKind::Symbol('{') = tok.kind {
                self.skip_balanced()?;
                return Ok(());
            }
        }
    }

    fn skip_statement(&mut self) -> Result<()> {
        while self.next("`;`")?.kind != TokenKind::Symbol(';') {}
        Ok(())
    }

    /// Message name and body, after the `message` keyword
    fn message(&mut self) -> Result<Message> {
        let (name, name_tok) = self.expect_ident("message name")?;
        self.expect_symbol('{')?;

        let mut msg = Message {
            name,
            pos: name_tok.pos,
            ..Default::default()
        };

        loop {
            self.comments.clear();
            let tok = match self.peek() {
                Some(tok) => tok.clone(),
                None => return Err(Error::Eof("`}`".to_string())),
            };

            let kw = match &tok.kind {
                TokenKind::Symbol('}') => {
                    self.next("}")?;
                    break;
                }
                TokenKind::Symbol(';') => {
                    self.next(";")?;
                    continue;
                }
                TokenKind::Ident(kw) => kw.clone(),
                _ => return self.unexpected(&tok, "message element"),
            };

            match kw.as_str() {
                "message" => {
                    self.next(&kw)?;
                    msg.messages.push(self.message()?);
                }
                "enum" => {
                    let kw_tok = self.next(&kw)?;
                    msg.enums.push(self.enum_def(kw_tok)?);
                }
                "option" => {
                    let opt = self.option_stmt()?;
                    msg.options.push(opt);
                }
                "oneof" => {
                    self.next(&kw)?;
                    self.oneof(&mut msg)?;
                }
                "reserved" | "extensions" => {
                    self.next(&kw)?;
                    self.skip_statement()?;
                }
                "extend" => {
                    self.next(&kw)?;
                    self.skip_block()?;
                }
                _ => {
                    let field = self.field(None)?;
                    msg.fields.push(field);
                }
            }
        }

        Ok(msg)
    }

    fn oneof(&mut self, msg: &mut Message) -> Result<()> {
        let (name, _) = self.expect_ident("oneof name")?;
        self.expect_symbol('{')?;

        loop {
            if self.eat_symbol('}')? {
                break;
            }
            if self.eat_symbol(';')? {
                continue;
            }
            if self.peek_ident("option") {
                self.option_stmt()?;
                continue;
            }
            let field = self.field(Some(&name))?;
            msg.fields.push(field);
        }

        msg.oneofs.push(name);
        Ok(())
    }

    fn field(&mut self, oneof: Option<&str>) -> Result<Field> {
        let (mut ty_name, mut ty_tok) = self.expect_ident("field type")?;

        let label = match ty_name.as_str() {
            "repeated" => Label::Repeated,
            "optional" => Label::Optional,
            "required" => Label::Required,
            _ => Label::Singular,
        };

        // `optional foo = 1;` is a field of type `optional`
        let label = if label != Label::Singular && oneof.is_none() && !self.peek_at_symbol(1, '=') {
            let (n, t) = self.expect_ident("field type")?;
            ty_name = n;
            ty_tok = t;
            label
        } else {
            Label::Singular
        };

        if ty_name == "group" {
            return Err(Error::Group(ty_tok.pos));
        }

        let (ty, ty_span) = if ty_name == "map" && self.peek_symbol('<') {
            self.expect_symbol('<')?;
            let (key, key_tok) = self.expect_ident("map key type")?;
            let key = match TypeTag::from_keyword(&key) {
                Some(k) => k,
                None => return self.unexpected(&key_tok, "scalar map key type"),
            };
            self.expect_symbol(',')?;
            let (value, value_tok) = self.expect_ident("map value type")?;
            self.expect_symbol('>')?;
            (FieldType::Map(key, Box::new(field_type(value))), value_tok.span)
        } else {
            (field_type(ty_name), ty_tok.span)
        };

        let (name, name_tok) = self.expect_ident("field name")?;
        self.expect_symbol('=')?;
        let num_tok = self.next("field number")?;
        let number = self.int(&num_tok)?;
        if number < 1 || number > MAX_FIELD_NUMBER {
            return Err(Error::FieldNumber(num_tok.pos, number));
        }
        let (options, _) = self.field_options()?;
        self.expect_symbol(';')?;

        Ok(Field {
            name,
            pos: name_tok.pos,
            label,
            ty,
            number: number as u32,
            options,
            oneof: oneof.map(str::to_string),
            ty_span,
            bitmap: None,
        })
    }

    /// Enum name and body, `kw` is the already consumed `enum` keyword
    fn enum_def(&mut self, kw: Token) -> Result<EnumDef> {
        let (name, name_tok) = self.expect_ident("enum name")?;
        let open = self.expect_symbol('{')?.span;
        self.comments.clear();

        let mut options = Vec::new();
        let mut values = Vec::new();

        let close = loop {
            let tok = match self.peek() {
                Some(tok) => tok.clone(),
                None => return Err(Error::Eof("`}`".to_string())),
            };

            match &tok.kind {
                TokenKind::Symbol('}') => break self.next("}")?.span,
                TokenKind::Symbol(';') => {
                    self.next(";")?;
                }
                TokenKind::Ident(kw) if kw == "option" && !self.peek_at_symbol(1, '=') => {
                    options.push(self.option_stmt()?);
                }
                TokenKind::Ident(kw) if kw == "reserved" && !self.peek_at_symbol(1, '=') => {
                    self.next("reserved")?;
                    self.skip_statement()?;
                }
                TokenKind::Ident(_) => values.push(self.enum_value()?),
                _ => return self.unexpected(&tok, "enum value"),
            }
        };

        Ok(EnumDef {
            name,
            pos: name_tok.pos,
            keyword: kw.span,
            open,
            close,
            options,
            values,
            dangling: self.take_comments(),
            bitmap: None,
        })
    }

    fn enum_value(&mut self) -> Result<EnumValue> {
        let (name, name_tok) = self.expect_ident("enum value name")?;
        let leading = self.take_comments();

        self.expect_symbol('=')?;
        let negative = self.eat_symbol('-')?;
        let num_tok = self.next("enum value number")?;
        let number = self.int(&num_tok)?;
        let (options, options_span) = self.field_options()?;
        let semi = self.expect_symbol(';')?;
        let trailing = self.trailing_comment(semi.pos.line);

        Ok(EnumValue {
            name,
            pos: name_tok.pos,
            span: name_tok.span,
            number: if negative { -number } else { number },
            options,
            options_span,
            leading,
            trailing,
        })
    }
}

fn field_type(name: String) -> FieldType {
    match TypeTag::from_keyword(&name) {
        Some(ty) => FieldType::Scalar(ty),
        None => FieldType::Named(name),
    }
}

fn parse_int(text: &str) -> Option<i128> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i128::from_str_radix(hex, 16).ok()
    } else if text.len() > 1 && text.starts_with('0') {
        i128::from_str_radix(&text[1..], 8).ok()
    } else {
        text.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVILEGED: &str = r#"
syntax = "proto3";

package riscv;

import public "bitmap.proto";

message Privileged {
  // Privilege modes
  enum Mode {
    option (bitmap) = true;
    M = 0; // machine
    S = 1 [deprecated = true];
    /* user */
    U = 2;
    // spare
  }

  Mode modes = 1;
  repeated string names = 2 [packed = false];
  map<string, Mode> by_name = 3;
  oneof choice {
    uint32 raw = 4;
    Privileged nested = 5;
  }
  reserved 6, 8 to 10;
}

service Hart {
  rpc Get(Privileged) returns (Privileged) {}
}
"#;

    #[test]
    fn parses_file_header() {
        let f = parse(PRIVILEGED).unwrap();
        assert_eq!(f.syntax.as_deref(), Some("proto3"));
        assert_eq!(f.package.as_deref(), Some("riscv"));
        assert_eq!(f.imports, ["bitmap.proto"]);
        assert_eq!(f.messages.len(), 1);
    }

    #[test]
    fn parses_bitmap_enum() {
        let f = parse(PRIVILEGED).unwrap();
        let mode = &f.messages[0].enums[0];
        assert_eq!(mode.name, "Mode");
        assert!(mode.is_bitmap());

        let names: Vec<_> = mode.values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["M", "S", "U"]);

        assert_eq!(mode.values[0].trailing.as_deref(), Some("// machine"));
        assert_eq!(mode.values[1].options[0].name, "deprecated");
        let span = mode.values[1].options_span.unwrap();
        assert_eq!(&PRIVILEGED[span.start .. span.end], "[deprecated = true]");
        assert_eq!(mode.values[2].leading, ["/* user */"]);
        assert_eq!(mode.dangling, ["// spare"]);
        assert_eq!(&PRIVILEGED[mode.open.start .. mode.open.end], "{");
    }

    #[test]
    fn parses_fields() {
        let f = parse(PRIVILEGED).unwrap();
        let fields = &f.messages[0].fields;
        assert_eq!(fields.len(), 5);

        assert_eq!(fields[0].ty, FieldType::Named("Mode".into()));
        assert_eq!(&PRIVILEGED[fields[0].ty_span.start .. fields[0].ty_span.end], "Mode");

        assert_eq!(fields[1].label, Label::Repeated);
        assert_eq!(fields[1].ty, FieldType::Scalar(TypeTag::STRING));

        assert_eq!(
            fields[2].ty,
            FieldType::Map(TypeTag::STRING, Box::new(FieldType::Named("Mode".into()))),
        );
        assert_eq!(&PRIVILEGED[fields[2].ty_span.start .. fields[2].ty_span.end], "Mode");

        assert_eq!(fields[3].oneof.as_deref(), Some("choice"));
        assert_eq!(fields[4].number, 5);
        assert_eq!(f.messages[0].oneofs, ["choice"]);
    }

    #[test]
    fn bitmap_option_values() {
        let on = parse("enum A { option (bitmap) = true; X = 0; }").unwrap();
        assert!(on.enums[0].is_bitmap());
        let off = parse("enum A { option (bitmap) = false; X = 0; }").unwrap();
        assert!(!off.enums[0].is_bitmap());
        let qualified = parse("enum A { option (opts.bitmap) = 1; X = 0; }").unwrap();
        assert!(qualified.enums[0].is_bitmap());
        let other = parse("enum A { option allow_alias = true; X = 0; }").unwrap();
        assert!(!other.enums[0].is_bitmap());
    }

    #[test]
    fn option_trailing_comment() {
        let f = parse("enum A {\n  // lead\n  option (bitmap) = true; // flags\n  X = 0;\n}").unwrap();
        let e = &f.enums[0];
        assert_eq!(e.options[0].trailing.as_deref(), Some("// flags"));
        assert_eq!(e.values[0].leading, ["// lead"]);
    }

    #[test]
    fn constants() {
        let f = parse(r#"
            option a = -12;
            option b = 0x10;
            option c = "x" 'y';
            option (d).e.f = 1.5;
            option g = { k: 1 };
            option h = FOO;
        "#).unwrap();
        let values: Vec<_> = f.options.iter().map(|o| (o.name.as_str(), o.value.clone())).collect();
        assert_eq!(values, vec![
            ("a", Constant::Int(-12)),
            ("b", Constant::Int(16)),
            ("c", Constant::Str("xy".into())),
            ("(d).e.f", Constant::Float(1.5)),
            ("g", Constant::Aggregate("k: 1".into())),
            ("h", Constant::Ident("FOO".into())),
        ]);
    }

    #[test]
    fn keyword_named_values() {
        let f = parse("enum E { option = 0; reserved = 1; } message M { optional option opt = 1; }").unwrap();
        assert_eq!(f.enums[0].values.len(), 2);
        assert_eq!(f.messages[0].fields[0].name, "opt");
        assert_eq!(f.messages[0].fields[0].label, Label::Optional);
        assert_eq!(f.messages[0].fields[0].ty, FieldType::Named("option".into()));
    }

    #[test]
    fn errors() {
        assert_eq!(
            parse("message M { uint32 x = 0; }"),
            Err(Error::FieldNumber(Pos { line: 1, col: 24 }, 0)),
        );
        assert_eq!(
            parse("message M { uint32 x = 99999999999999999999; }"),
            Err(Error::FieldNumber(Pos { line: 1, col: 24 }, 99_999_999_999_999_999_999)),
        );
        assert_eq!(
            parse("message M { uint32 x 1; }"),
            Err(Error::Expected {
                pos: Pos { line: 1, col: 22 },
                expected: "`=`".into(),
                found: "`1`".into(),
            }),
        );
        assert_eq!(parse("message M {"), Err(Error::Eof("`}`".into())));
        assert_eq!(
            parse("message M { optional group G = 1 {} }"),
            Err(Error::Group(Pos { line: 1, col: 22 })),
        );
    }
}
