use log::{debug, info};

use protobitmap::{bit, TypeTag, MAX_BITMAP_FLAGS};

use crate::desc::{BitmapDesc, FlagDesc, RetypedField, TransformReport};
use crate::error::{Error, Pos, Result};
use crate::lexer::Span;
use crate::parser::{
    join_name,
    parse,
    Constant,
    EnumDef,
    EnumValue,
    Field,
    FieldType,
    Message,
    OptionDecl,
    ProtoFile,
    BITMAP_NONE,
};
use crate::scope::{SymbolKind, Symbols};

/// Aliases cannot survive the renumbering, protoc rejects the option without them
const ALLOW_ALIAS: &str = "allow_alias";

const DEFAULT: &str = "default";

/// Result of rewriting a schema
#[derive(Clone, Debug)]
pub struct Transformed {
    /// Schema text with bitmap enums and the fields using them rewritten
    pub text: String,
    /// Parsed schema after the rewrite
    pub file: ProtoFile,
    pub report: TransformReport,
}

struct Edit {
    span: Span,
    text: String,
}

struct Rewriter<'a> {
    src: &'a str,
    edits: Vec<Edit>,
    report: TransformReport,
}

pub fn transform(src: &str) -> Result<Transformed> {
    let mut file = parse(src)?;
    let package = file.package.clone().unwrap_or_default();

    let mut rw = Rewriter {
        src,
        edits: Vec::new(),
        report: TransformReport {
            package: file.package.clone(),
            ..Default::default()
        },
    };

    // Bitmap enums first, field types resolve against the result
    for e in &mut file.enums {
        rw.enum_def(&package, e)?;
    }
    for m in &mut file.messages {
        rw.message_enums(&package, m)?;
    }

    let symbols = Symbols::collect(&file);
    if !rw.report.bitmaps.is_empty() {
        for m in &mut file.messages {
            rw.message_fields(&package, m, &symbols)?;
        }
    }

    info!("{} bitmap enum(s), {} field(s) retyped", rw.report.bitmaps.len(), rw.report.retyped.len());

    let text = rw.apply();
    Ok(Transformed {
        text,
        file,
        report: rw.report,
    })
}

impl<'a> Rewriter<'a> {
    fn message_enums(&mut self, scope: &str, msg: &mut Message) -> Result<()> {
        let scope = join_name(scope, &msg.name);
        for e in &mut msg.enums {
            self.enum_def(&scope, e)?;
        }
        for m in &mut msg.messages {
            self.message_enums(&scope, m)?;
        }
        Ok(())
    }

    fn enum_def(&mut self, scope: &str, e: &mut EnumDef) -> Result<()> {
        if !e.is_bitmap() {
            return Ok(());
        }

        let full_name = join_name(scope, &e.name);
        if e.values.iter().any(|v| v.name == BITMAP_NONE) {
            return Err(Error::ReservedNone(full_name));
        }
        let width = TypeTag::for_bit_count(e.values.len()).ok_or_else(|| Error::TooManyFlags {
            name: full_name.clone(),
            count: e.values.len(),
            max: MAX_BITMAP_FLAGS,
        })?;

        let mut flags = Vec::with_capacity(e.values.len());
        for (i, v) in e.values.iter_mut().enumerate() {
            let value = bit(i as u32);
            v.number = value as i128;
            flags.push(FlagDesc {
                name: v.name.clone(),
                value,
            });
        }

        let body = self.enum_body(e);
        self.edits.push(Edit {
            span: Span { start: e.open.start, end: e.close.end },
            text: body,
        });

        e.values.insert(0, EnumValue {
            name: BITMAP_NONE.to_string(),
            pos: Pos::default(),
            span: Span::default(),
            number: 0,
            options: Vec::new(),
            options_span: None,
            leading: Vec::new(),
            trailing: None,
        });
        e.options.retain(kept_option);
        e.bitmap = Some(width);

        debug!("bitmap {}: {} flag(s) stored as {}", full_name, flags.len(), width);
        self.report.bitmaps.push(BitmapDesc {
            full_name,
            width,
            flags,
        });
        Ok(())
    }

    /// New `{ ... }` for a bitmap enum whose values are already renumbered
    fn enum_body(&self, e: &EnumDef) -> String {
        let outer = line_indent(self.src, e.keyword.start);
        let inner = e.values.first()
            .and_then(|v| own_line_indent(self.src, v.span.start))
            .unwrap_or_else(|| format!("{}  ", outer));

        let mut body = String::from("{\n");
        body.push_str(&format!("{}{} = 0;", inner, BITMAP_NONE));
        // The marker's comment moves to the value that replaces it
        if let Some(c) = e.options.iter().find(|o| o.is_bitmap()).and_then(|o| o.trailing.as_ref()) {
            body.push(' ');
            body.push_str(c);
        }
        body.push('\n');

        for opt in e.options.iter().filter(|o| kept_option(o)) {
            body.push_str(&format!("{}{}", inner, slice(self.src, opt.span)));
            if let Some(c) = &opt.trailing {
                body.push(' ');
                body.push_str(c);
            }
            body.push('\n');
        }

        for v in &e.values {
            for c in &v.leading {
                body.push_str(&format!("{}{}\n", inner, c));
            }
            body.push_str(&format!("{}{} = {}", inner, v.name, v.number));
            if let Some(span) = v.options_span {
                body.push(' ');
                body.push_str(slice(self.src, span));
            }
            body.push(';');
            if let Some(c) = &v.trailing {
                body.push(' ');
                body.push_str(c);
            }
            body.push('\n');
        }

        for c in &e.dangling {
            body.push_str(&format!("{}{}\n", inner, c));
        }

        body.push_str(&outer);
        body.push('}');
        body
    }

    fn message_fields(&mut self, scope: &str, msg: &mut Message, symbols: &Symbols) -> Result<()> {
        let scope = join_name(scope, &msg.name);

        for f in &mut msg.fields {
            let target = match &mut f.ty {
                FieldType::Map(_, value) => value.as_mut(),
                ty => ty,
            };
            let name = match target {
                FieldType::Named(name) => name.clone(),
                _ => continue,
            };

            let (full, width) = match symbols.resolve(&scope, &name) {
                Some((full, SymbolKind::Bitmap(width))) => (full, width),
                _ => continue,
            };

            *target = FieldType::Scalar(width);
            f.bitmap = Some(full.clone());
            self.edits.push(Edit {
                span: f.ty_span,
                text: width.keyword().to_string(),
            });
            self.field_default(&scope, f, &full)?;

            debug!("field {}.{}: {} -> {}", scope, f.name, name, width);
            self.report.retyped.push(RetypedField {
                message: scope.clone(),
                field: f.name.clone(),
                bitmap: full,
                width,
            });
        }

        for m in &mut msg.messages {
            self.message_fields(&scope, m, symbols)?;
        }
        Ok(())
    }

    /// proto2 `[default = FLAG]` on a retyped field becomes the flag's value
    fn field_default(&mut self, scope: &str, f: &mut Field, bitmap: &str) -> Result<()> {
        let field = join_name(scope, &f.name);
        let opt = match f.options.iter_mut().find(|o| o.name == DEFAULT) {
            Some(opt) => opt,
            None => return Ok(()),
        };

        let flags = self.report.bitmap(bitmap).map(|b| b.flags.as_slice()).unwrap_or_default();
        let value = match &opt.value {
            Constant::Ident(name) if name == BITMAP_NONE => Some(0),
            Constant::Ident(name) => flags.iter().find(|fl| &fl.name == name).map(|fl| fl.value),
            _ => None,
        };
        let value = value.ok_or_else(|| Error::BadDefault {
            field,
            bitmap: bitmap.to_string(),
            value: match &opt.value {
                Constant::Ident(name) => name.clone(),
                other => format!("{:?}", other),
            },
        })?;

        opt.value = Constant::Int(value as i128);
        self.edits.push(Edit {
            span: opt.span,
            text: format!("{} = {}", DEFAULT, value),
        });
        Ok(())
    }

    fn apply(&mut self) -> String {
        self.edits.sort_by_key(|e| e.span.start);

        let mut out = String::with_capacity(self.src.len());
        let mut at = 0;
        for edit in &self.edits {
            out.push_str(&self.src[at .. edit.span.start]);
            out.push_str(&edit.text);
            at = edit.span.end;
        }
        out.push_str(&self.src[at ..]);
        out
    }
}

fn kept_option(o: &OptionDecl) -> bool {
    !o.is_bitmap() && o.name != ALLOW_ALIAS
}

fn slice(src: &str, span: Span) -> &str {
    &src[span.start .. span.end]
}

fn line_start(src: &str, offset: usize) -> usize {
    src[.. offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Leading whitespace of the line holding `offset`
fn line_indent(src: &str, offset: usize) -> String {
    let start = line_start(src, offset);
    src[start .. offset]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// Indentation before `offset` when nothing else precedes it on its line
fn own_line_indent(src: &str, offset: usize) -> Option<String> {
    let prefix = &src[line_start(src, offset) .. offset];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        Some(prefix.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rewrites_privileged() {
        let src = "\
syntax = \"proto3\";
package riscv;

message Privileged {
  enum Mode {
    option (bitmap) = true;
    M = 0;
    S = 1;
  }

  Mode modes = 1;
}
";
        let out = transform(src).unwrap();
        assert_eq!(out.text, "\
syntax = \"proto3\";
package riscv;

message Privileged {
  enum Mode {
    None = 0;
    M = 1;
    S = 2;
  }

  uint32 modes = 1;
}
");

        let mode = &out.file.messages[0].enums[0];
        assert_eq!(mode.bitmap, Some(TypeTag::UINT32));
        let values: Vec<_> = mode.values.iter().map(|v| (v.name.as_str(), v.number)).collect();
        assert_eq!(values, [("None", 0), ("M", 1), ("S", 2)]);

        let modes = &out.file.messages[0].fields[0];
        assert_eq!(modes.ty, FieldType::Scalar(TypeTag::UINT32));
        assert_eq!(modes.bitmap.as_deref(), Some("riscv.Privileged.Mode"));

        assert_eq!(out.report.retyped.len(), 1);
        assert_eq!(out.report.retyped[0].message, "riscv.Privileged");
    }

    #[test]
    fn keeps_comments_and_options() {
        let src = "\
enum Perm {
  // read
  option (bitmap) = true; // flags
  option allow_alias = true;
  option deprecated = true; // old
  R = 4; // r
  W = 2 [deprecated = true];
  reserved 7;
  /* execute */
  X = 1;
  // more later
}
";
        let out = transform(src).unwrap();
        assert_eq!(out.text, "\
enum Perm {
  None = 0; // flags
  option deprecated = true; // old
  // read
  R = 1; // r
  W = 2 [deprecated = true];
  /* execute */
  X = 4;
  // more later
}
");
        let names: Vec<_> = out.file.enums[0].options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["deprecated"]);
    }

    #[test]
    fn drops_allow_alias() {
        let src = "enum P {\n  option (bitmap) = true;\n  option allow_alias = true;\n  A = 0;\n  B = 1;\n}\n";
        let out = transform(src).unwrap();
        assert_eq!(out.text, "enum P {\n  None = 0;\n  A = 1;\n  B = 2;\n}\n");
    }

    #[test]
    fn rewrites_flag_defaults() {
        let src = "\
syntax = \"proto2\";
message M {
  enum E { option (bitmap) = true; A = 0; B = 1; }
  optional E e = 1 [default = B];
  optional E n = 2 [default = None, deprecated = true];
}
";
        let out = transform(src).unwrap();
        assert!(out.text.contains("  optional uint32 e = 1 [default = 2];\n"));
        assert!(out.text.contains("  optional uint32 n = 2 [default = 0, deprecated = true];\n"));
        assert_eq!(out.file.messages[0].fields[0].options[0].value, Constant::Int(2));
    }

    #[test]
    fn unknown_flag_default() {
        let src = "message M { enum E { option (bitmap) = true; A = 0; } optional E e = 1 [default = C]; }";
        assert_eq!(
            transform(src).unwrap_err(),
            Error::BadDefault { field: "M.e".into(), bitmap: "M.E".into(), value: "C".into() },
        );
    }

    #[test]
    fn one_line_enum() {
        let src = "  enum B { option (bitmap) = true; A = 0; B = 1; }\n";
        let out = transform(src).unwrap();
        assert_eq!(out.text, "  enum B {\n    None = 0;\n    A = 1;\n    B = 2;\n  }\n");
    }

    #[test]
    fn scoped_field_types() {
        let src = "\
package p;
enum Mode { option (bitmap) = true; A = 0; }
message Inner {
  enum Mode { PLAIN = 0; }
  Mode shadowed = 1;
  .p.Mode absolute = 2;
  repeated Mode plain = 3;
}
message Outer {
  repeated Mode modes = 1;
  map<string, Mode> named = 2;
  Inner inner = 3;
}
";
        let out = transform(src).unwrap();
        assert!(out.text.contains("  Mode shadowed = 1;\n"));
        assert!(out.text.contains("  uint32 absolute = 2;\n"));
        assert!(out.text.contains("  repeated Mode plain = 3;\n"));
        assert!(out.text.contains("  repeated uint32 modes = 1;\n"));
        assert!(out.text.contains("  map<string, uint32> named = 2;\n"));
        assert!(out.text.contains("  Inner inner = 3;\n"));

        let fields: Vec<_> = out.report.retyped.iter()
            .map(|r| format!("{}.{}", r.message, r.field))
            .collect();
        assert_eq!(fields, ["p.Inner.absolute", "p.Outer.modes", "p.Outer.named"]);
    }

    #[test]
    fn wide_bitmap() {
        let names: Vec<String> = (0 .. 40).map(|i| format!("F{} = {};", i, i)).collect();
        let src = format!("enum Wide {{ option (bitmap) = true; {} }}\nmessage M {{ Wide w = 1; }}\n", names.join(" "));
        let out = transform(&src).unwrap();
        assert_eq!(out.report.bitmaps[0].width, TypeTag::UINT64);
        assert_eq!(out.report.bitmaps[0].flags[39].value, 1 << 39);
        assert!(out.text.contains("uint64 w = 1;"));
        assert!(out.text.contains("F39 = 549755813888;"));
    }

    #[test]
    fn too_many_flags() {
        let names: Vec<String> = (0 .. 65).map(|i| format!("F{} = {};", i, i)).collect();
        let src = format!("enum Huge {{ option (bitmap) = true; {} }}", names.join(" "));
        assert_eq!(
            transform(&src).unwrap_err(),
            Error::TooManyFlags { name: "Huge".into(), count: 65, max: 64 },
        );
    }

    #[test]
    fn none_is_reserved() {
        let src = "package p; enum E { option (bitmap) = true; None = 0; A = 1; }";
        assert_eq!(transform(src).unwrap_err(), Error::ReservedNone("p.E".into()));
    }

    #[test]
    fn untouched_without_bitmaps() {
        let src = "syntax = \"proto3\";\n// hi\nenum E { A = 0; }\nmessage M { E e = 1; }\n";
        let out = transform(src).unwrap();
        assert_eq!(out.text, src);
        assert!(out.report.bitmaps.is_empty());
    }

    #[test]
    fn idempotent() {
        let src = "message M {\n  enum E {\n    option (bitmap) = true;\n    A = 0;\n  }\n  E e = 1;\n}\n";
        let once = transform(src).unwrap().text;
        let twice = transform(&once).unwrap().text;
        assert_eq!(once, twice);
    }
}
