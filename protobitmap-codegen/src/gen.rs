use std::collections::HashMap;

use log::{debug, warn};
use proc_macro2::{Literal, Span, TokenStream};
use quote::{format_ident, quote};
use syn::Ident;

use protobitmap::TypeTag;

use crate::error::{Error, Result};
use crate::parser::{
    join_name,
    EnumDef,
    Field,
    FieldType,
    Label,
    Message,
    ProtoFile,
};
use crate::scope::{SymbolKind, Symbols};

/// Entry point for codegen, `file` must already be transformed
pub fn gen(file: &ProtoFile) -> Result<String> {
    let g = Generator::new(file);

    let package = file.package.clone().unwrap_or_default();
    let module: Vec<String> = package.split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let mut items = g.scope(&package, &module, &file.enums, &file.messages)?;

    // Package segments become nested modules, innermost first
    for seg in module.iter().rev() {
        let seg = ident(seg);
        items = quote!(
            pub mod #seg {
                #items
            }
        );
    }

    Ok(items.to_string())
}

struct Generator {
    symbols: Symbols,
    /// Module path of every type, by full name
    modules: HashMap<String, Vec<String>>,
}

impl Generator {
    fn new(file: &ProtoFile) -> Self {
        let mut modules = HashMap::new();
        let package = file.package.clone().unwrap_or_default();
        let root: Vec<String> = package.split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        for e in &file.enums {
            modules.insert(join_name(&package, &e.name), root.clone());
        }
        for m in &file.messages {
            collect_modules(&mut modules, &package, &root, m);
        }

        Self {
            symbols: Symbols::collect(file),
            modules,
        }
    }

    fn scope(&self, scope: &str, module: &[String], enums: &[EnumDef], messages: &[Message]) -> Result<TokenStream> {
        let mut out = TokenStream::new();

        for e in enums {
            let full = join_name(scope, &e.name);
            let def = match e.bitmap {
                Some(width) => bitmap_def::gen(e, width),
                None => enum_def::gen(&full, e)?,
            };
            out.extend(def);
        }

        for m in messages {
            let full = join_name(scope, &m.name);
            out.extend(message_def::gen(self, &full, module, m)?);

            if !m.enums.is_empty() || !m.messages.is_empty() {
                let inner_name = snake_case(&m.name);
                let mut inner_mod = module.to_vec();
                inner_mod.push(inner_name.clone());

                let inner = self.scope(&full, &inner_mod, &m.enums, &m.messages)?;
                let inner_name = ident(&inner_name);
                out.extend(quote!(
                    pub mod #inner_name {
                        #inner
                    }
                ));
            }
        }

        Ok(out)
    }

    /// Relative path from `from` to the type `full_name`
    fn type_path(&self, from: &[String], full_name: &str) -> TokenStream {
        let name = full_name.rsplit('.').next().unwrap_or(full_name);
        let target = self.modules.get(full_name).cloned().unwrap_or_default();

        let supers = from.iter().map(|_| quote!(super::));
        let mods = target.iter().map(|m| ident(m));
        let name = ident(name);
        quote!( #(#supers)* #(#mods::)* #name )
    }

    fn field_kind(&self, scope: &str, module: &[String], f: &Field) -> Result<Option<FieldKind>> {
        if let Some(bitmap) = &f.bitmap {
            let width = match &f.ty {
                FieldType::Scalar(w) => *w,
                _ => {
                    warn!("skipping map field {}.{}", scope, f.name);
                    return Ok(None);
                }
            };
            return Ok(Some(FieldKind::Bitmap(self.type_path(module, bitmap), width)));
        }

        let kind = match &f.ty {
            FieldType::Scalar(ty) => FieldKind::Scalar(*ty),
            FieldType::Map(..) => {
                warn!("skipping map field {}.{}", scope, f.name);
                return Ok(None);
            }
            FieldType::Named(name) => {
                let unresolved = || Error::UnresolvedType {
                    field: join_name(scope, &f.name),
                    ty: name.clone(),
                };
                let (full, kind) = self.symbols.resolve(scope, name).ok_or_else(unresolved)?;
                let path = self.type_path(module, &full);
                match kind {
                    SymbolKind::Message => FieldKind::Message(path),
                    SymbolKind::Enum => FieldKind::Enum(path),
                    // Only reachable for schemas that were not transformed
                    SymbolKind::Bitmap(width) => FieldKind::Bitmap(path, width),
                }
            }
        };

        Ok(Some(kind))
    }
}

fn collect_modules(modules: &mut HashMap<String, Vec<String>>, scope: &str, module: &[String], m: &Message) {
    let full = join_name(scope, &m.name);
    let mut inner = module.to_vec();
    inner.push(snake_case(&m.name));

    for e in &m.enums {
        modules.insert(join_name(&full, &e.name), inner.clone());
    }
    for nested in &m.messages {
        collect_modules(modules, &full, &inner, nested);
    }
    modules.insert(full, module.to_vec());
}

enum FieldKind {
    Scalar(TypeTag),
    Message(TokenStream),
    Enum(TokenStream),
    Bitmap(TokenStream, TypeTag),
}

/// Generation of plain enums
mod enum_def {
    use super::*;

    pub fn gen(full: &str, e: &EnumDef) -> Result<TokenStream> {
        let name = ident(&e.name);

        let mut seen = Vec::new();
        let mut variants = Vec::new();
        let mut numbers = Vec::new();
        for v in &e.values {
            // allow_alias duplicates cannot be Rust discriminants
            if seen.contains(&v.number) {
                debug!("enum {}: skipping alias {}", full, v.name);
                continue;
            }
            seen.push(v.number);
            variants.push(ident(&v.name));
            numbers.push(Literal::i32_unsuffixed(v.number as i32));
        }

        let first = match variants.first() {
            Some(first) => first.clone(),
            None => return Err(Error::EmptyEnum(full.to_string())),
        };

        Ok(quote!(
            #[allow(non_camel_case_types)]
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
            #[repr(i32)]
            pub enum #name {
                #( #variants = #numbers, )*
            }

            impl #name {
                pub fn from_i32(v: i32) -> Option<#name> {
                    match v {
                        #( #numbers => Some(#name::#variants), )*
                        _ => None,
                    }
                }
            }

            impl Default for #name {
                fn default() -> Self {
                    #name::#first
                }
            }
        ))
    }
}

/// Generation of bitmap flag sets
mod bitmap_def {
    use super::*;

    pub fn gen(e: &EnumDef, width: TypeTag) -> TokenStream {
        let name = ident(&e.name);
        let repr = rust_ty(width);
        let width_tag = type_tag(width);

        let flags: Vec<_> = e.values.iter().filter(|v| v.number != 0).collect();
        let consts: Vec<Ident> = flags.iter().map(|v| ident(&v.name)).collect();
        let names: Vec<&str> = flags.iter().map(|v| v.name.as_str()).collect();
        let values: Vec<Literal> = flags.iter()
            .map(|v| match width {
                TypeTag::UINT32 => Literal::u32_unsuffixed(v.number as u32),
                _ => Literal::u64_unsuffixed(v.number as u64),
            })
            .collect();
        let wide: Vec<Literal> = flags.iter().map(|v| Literal::u64_suffixed(v.number as u64)).collect();

        quote!(
            ::protobitmap::bitflags::bitflags! {
                #[derive(Default)]
                pub struct #name: #repr {
                    #(
                        #[allow(non_upper_case_globals)]
                        const #consts = #values;
                    )*
                }
            }

            impl ::protobitmap::Bitmap for #name {
                const WIDTH: ::protobitmap::TypeTag = #width_tag;
                const FLAGS: &'static [(&'static str, u64)] = &[ #( (#names, #wide), )* ];

                fn to_bits(self) -> u64 {
                    self.bits() as u64
                }

                fn from_bits_u64(bits: u64) -> Option<Self> {
                    ::core::convert::TryFrom::try_from(bits).ok().and_then(Self::from_bits)
                }
            }
        )
    }
}

/// Generation of message structs and their accessors
mod message_def {
    use super::*;

    pub fn gen(g: &Generator, full: &str, module: &[String], m: &Message) -> Result<TokenStream> {
        let name = ident(&m.name);
        let mut storage = TokenStream::new();
        let mut accessors = TokenStream::new();

        for f in &m.fields {
            let kind = match g.field_kind(full, module, f)? {
                Some(kind) => kind,
                None => continue,
            };
            let field = ident(&snake_case(&f.name));
            let (ty, methods) = if f.label == Label::Repeated {
                repeated(f, &field, &kind)
            } else {
                singular(&field, &kind)
            };
            storage.extend(quote!( #field: #ty, ));
            accessors.extend(methods);
        }

        Ok(quote!(
            #[derive(Clone, Debug, Default, PartialEq)]
            pub struct #name {
                #storage
            }

            impl #name {
                pub fn new() -> Self {
                    Self::default()
                }

                #accessors
            }
        ))
    }

    fn names(field: &Ident) -> (Ident, Ident, Ident) {
        let raw = field.to_string();
        let raw = raw.trim_start_matches("r#");
        (
            format_ident!("set_{}", raw),
            format_ident!("clear_{}", raw),
            format_ident!("mutable_{}", raw),
        )
    }

    fn singular(field: &Ident, kind: &FieldKind) -> (TokenStream, TokenStream) {
        let (set, clear, mutable) = names(field);

        match kind {
            FieldKind::Scalar(TypeTag::STRING) => (quote!(String), quote!(
                pub fn #field(&self) -> &str {
                    &self.#field
                }
                pub fn #set(&mut self, v: impl Into<String>) {
                    self.#field = v.into();
                }
                pub fn #mutable(&mut self) -> &mut String {
                    &mut self.#field
                }
                pub fn #clear(&mut self) {
                    self.#field.clear();
                }
            )),
            FieldKind::Scalar(TypeTag::BYTES) => (quote!(Vec<u8>), quote!(
                pub fn #field(&self) -> &[u8] {
                    &self.#field
                }
                pub fn #set(&mut self, v: impl Into<Vec<u8>>) {
                    self.#field = v.into();
                }
                pub fn #mutable(&mut self) -> &mut Vec<u8> {
                    &mut self.#field
                }
                pub fn #clear(&mut self) {
                    self.#field.clear();
                }
            )),
            FieldKind::Scalar(ty) => {
                let ty = rust_ty(*ty);
                (quote!(#ty), quote!(
                    pub fn #field(&self) -> #ty {
                        self.#field
                    }
                    pub fn #set(&mut self, v: #ty) {
                        self.#field = v;
                    }
                    pub fn #clear(&mut self) {
                        self.#field = Default::default();
                    }
                ))
            }
            FieldKind::Enum(path) => (quote!(i32), quote!(
                pub fn #field(&self) -> #path {
                    #path::from_i32(self.#field).unwrap_or_default()
                }
                pub fn #set(&mut self, v: #path) {
                    self.#field = v as i32;
                }
                pub fn #clear(&mut self) {
                    self.#field = 0;
                }
            )),
            FieldKind::Bitmap(path, width) => {
                let repr = rust_ty(*width);
                (quote!(#repr), quote!(
                    pub fn #field(&self) -> #path {
                        #path::from_bits_truncate(self.#field)
                    }
                    pub fn #set(&mut self, v: #path) {
                        self.#field = v.bits();
                    }
                    pub fn #clear(&mut self) {
                        self.#field = 0;
                    }
                ))
            }
            FieldKind::Message(path) => {
                let has = format_ident!("has_{}", field.to_string().trim_start_matches("r#"));
                (quote!(Option<Box<#path>>), quote!(
                    pub fn #field(&self) -> Option<&#path> {
                        self.#field.as_deref()
                    }
                    pub fn #has(&self) -> bool {
                        self.#field.is_some()
                    }
                    pub fn #set(&mut self, v: #path) {
                        self.#field = Some(Box::new(v));
                    }
                    pub fn #mutable(&mut self) -> &mut #path {
                        self.#field.get_or_insert_with(Box::default)
                    }
                    pub fn #clear(&mut self) {
                        self.#field = None;
                    }
                ))
            }
        }
    }

    fn repeated(f: &Field, field: &Ident, kind: &FieldKind) -> (TokenStream, TokenStream) {
        let (_, clear, mutable) = names(field);
        let raw = field.to_string();
        let raw = raw.trim_start_matches("r#");
        let add = format_ident!("add_{}", raw);
        let len = format_ident!("{}_len", raw);

        let (elem, value, push) = match kind {
            FieldKind::Scalar(TypeTag::STRING) => (quote!(String), quote!(impl Into<String>), quote!(v.into())),
            FieldKind::Scalar(TypeTag::BYTES) => (quote!(Vec<u8>), quote!(impl Into<Vec<u8>>), quote!(v.into())),
            FieldKind::Scalar(ty) => {
                let ty = rust_ty(*ty);
                (quote!(#ty), quote!(#ty), quote!(v))
            }
            FieldKind::Enum(path) => (quote!(i32), quote!(#path), quote!(v as i32)),
            FieldKind::Bitmap(path, width) => {
                let repr = rust_ty(*width);
                (quote!(#repr), quote!(#path), quote!(v.bits()))
            }
            FieldKind::Message(path) => (quote!(#path), quote!(#path), quote!(v)),
        };

        debug!("repeated field {} #{}", f.name, f.number);

        (quote!(Vec<#elem>), quote!(
            pub fn #field(&self) -> &[#elem] {
                &self.#field
            }
            pub fn #len(&self) -> usize {
                self.#field.len()
            }
            pub fn #add(&mut self, v: #value) {
                self.#field.push(#push);
            }
            pub fn #mutable(&mut self) -> &mut Vec<#elem> {
                &mut self.#field
            }
            pub fn #clear(&mut self) {
                self.#field.clear();
            }
        ))
    }
}

fn rust_ty(ty: TypeTag) -> TokenStream {
    use TypeTag::*;
    match ty {
        DOUBLE                       => quote!(f64),
        FLOAT                        => quote!(f32),
        INT32 | SINT32 | SFIXED32    => quote!(i32),
        INT64 | SINT64 | SFIXED64    => quote!(i64),
        UINT32 | FIXED32             => quote!(u32),
        UINT64 | FIXED64             => quote!(u64),
        BOOL                         => quote!(bool),
        STRING                       => quote!(String),
        BYTES                        => quote!(Vec<u8>),
    }
}

fn type_tag(ty: TypeTag) -> TokenStream {
    let variant = format_ident!("{}", format!("{:?}", ty));
    quote!(::protobitmap::TypeTag::#variant)
}

/// Identifier for a schema name, raw when it collides with a Rust keyword
fn ident(name: &str) -> Ident {
    match name {
        "self" | "super" | "crate" | "Self" | "_" => format_ident!("{}_", name),
        _ if syn::parse_str::<Ident>(name).is_ok() => Ident::new(name, Span::call_site()),
        _ => Ident::new_raw(name, Span::call_site()),
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower { out.push('_'); }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::transform;

    fn generate(src: &str) -> Result<String> {
        gen(&transform(src)?.file)
    }

    /// Token text with all whitespace removed, so checks do not depend on
    /// how proc-macro2 spaces its output
    fn squash(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    const PRIVILEGED: &str = "
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

    #[test]
    fn bitmap_accessors() {
        let out = squash(&generate(PRIVILEGED).unwrap());
        assert!(out.starts_with("pubmodriscv{"));
        assert!(out.contains("pubstructPrivileged{modes:u32,}"));
        assert!(out.contains("pubfnmodes(&self)->super::riscv::privileged::Mode{super::riscv::privileged::Mode::from_bits_truncate(self.modes)}"));
        assert!(out.contains("pubfnset_modes(&mutself,v:super::riscv::privileged::Mode){self.modes=v.bits();}"));
        assert!(out.contains("pubmodprivileged{::protobitmap::bitflags::bitflags!{#[derive(Default)]pubstructMode:u32{"));
        assert!(out.contains("constM=1;"));
        assert!(out.contains("constS=2;"));
        assert!(!out.contains("constNone"));
        assert!(out.contains("constWIDTH:::protobitmap::TypeTag=::protobitmap::TypeTag::UINT32;"));
        assert!(out.contains("&[(\"M\",1u64),(\"S\",2u64),]"));
    }

    #[test]
    fn plain_enum_and_messages() {
        let out = squash(&generate("
            enum Xlen { option allow_alias = true; X32 = 0; X64 = 1; RV64 = 1; NEG = -1; }
            message Hart {
                Xlen xlen = 1;
                Hart parent = 2;
                repeated string names = 3;
                bytes blob = 4;
                map<string, uint32> ids = 5;
            }
        ").unwrap());

        assert!(out.contains("pubenumXlen{X32=0,X64=1,NEG=-1,}"));
        assert!(out.contains("-1=>Some(Xlen::NEG),"));
        assert!(out.contains("implDefaultforXlen{fndefault()->Self{Xlen::X32}}"));
        assert!(out.contains("pubstructHart{xlen:i32,parent:Option<Box<Hart>>,names:Vec<String>,blob:Vec<u8>,}"));
        assert!(out.contains("pubfnxlen(&self)->Xlen{Xlen::from_i32(self.xlen).unwrap_or_default()}"));
        assert!(out.contains("pubfnhas_parent(&self)->bool"));
        assert!(out.contains("pubfnadd_names(&mutself,v:implInto<String>){self.names.push(v.into());}"));
        assert!(out.contains("pubfnnames_len(&self)->usize"));
        assert!(!out.contains("ids"));
    }

    #[test]
    fn keyword_names() {
        let out = squash(&generate("message M { uint32 type = 1; string self = 2; }").unwrap());
        assert!(out.contains("r#type:u32"));
        assert!(out.contains("pubfnset_type(&mutself,v:u32)"));
        assert!(out.contains("self_:String"));
    }

    #[test]
    fn unresolved_type() {
        assert_eq!(
            generate("package p; message M { Missing m = 1; }").unwrap_err(),
            Error::UnresolvedType { field: "p.M.m".into(), ty: "Missing".into() },
        );
    }

    #[test]
    fn empty_enum() {
        assert_eq!(generate("enum E {}").unwrap_err(), Error::EmptyEnum("E".into()));
    }

    #[test]
    fn names() {
        assert_eq!(snake_case("Privileged"), "privileged");
        assert_eq!(snake_case("HartConfig"), "hart_config");
        assert_eq!(snake_case("hart_id"), "hart_id");
        assert_eq!(snake_case("isaV2"), "isa_v2");
        assert_eq!(ident("modes").to_string(), "modes");
        assert_eq!(ident("type").to_string(), "r#type");
        assert_eq!(ident("super").to_string(), "super_");
    }
}
