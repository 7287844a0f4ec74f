use std::collections::HashMap;

use protobitmap::TypeTag;

use crate::parser::{join_name, Message, ProtoFile};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Message,
    Enum,
    Bitmap(TypeTag),
}

/// Every message and enum of a file by full name (`pkg.Outer.Inner`)
#[derive(Clone, Debug, Default)]
pub struct Symbols {
    types: HashMap<String, SymbolKind>,
}

impl Symbols {
    pub fn collect(file: &ProtoFile) -> Symbols {
        let mut symbols = Symbols::default();
        let package = file.package.clone().unwrap_or_default();

        for e in &file.enums {
            symbols.insert_enum(&package, &e.name, e.bitmap);
        }
        for m in &file.messages {
            symbols.insert_message(&package, m);
        }
        symbols
    }

    fn insert_enum(&mut self, scope: &str, name: &str, bitmap: Option<TypeTag>) {
        let kind = match bitmap {
            Some(width) => SymbolKind::Bitmap(width),
            None => SymbolKind::Enum,
        };
        self.types.insert(join_name(scope, name), kind);
    }

    fn insert_message(&mut self, scope: &str, msg: &Message) {
        let full = join_name(scope, &msg.name);
        for e in &msg.enums {
            self.insert_enum(&full, &e.name, e.bitmap);
        }
        for m in &msg.messages {
            self.insert_message(&full, m);
        }
        self.types.insert(full, SymbolKind::Message);
    }

    pub fn get(&self, full_name: &str) -> Option<SymbolKind> {
        self.types.get(full_name).copied()
    }

    /// Resolves a type reference written inside `scope`.
    ///
    /// `.a.B` is absolute; anything else is looked up in `scope` and then in each
    /// enclosing scope out to the file root.
    pub fn resolve(&self, scope: &str, name: &str) -> Option<(String, SymbolKind)> {
        if let Some(abs) = name.strip_prefix('.') {
            return self.get(abs).map(|k| (abs.to_string(), k));
        }

        let mut scope = scope;
        loop {
            let candidate = join_name(scope, name);
            if let Some(kind) = self.get(&candidate) {
                return Some((candidate, kind));
            }
            if scope.is_empty() {
                return None;
            }
            scope = match scope.rfind('.') {
                Some(i) => &scope[.. i],
                None => "",
            };
        }
    }
}
