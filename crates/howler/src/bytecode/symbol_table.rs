//! Compile-time name resolution.
//!
//! The symbol table is the compile-time analogue of the evaluator's
//! environment chain: names map to a scope and a slot index instead of a
//! value. Resolving a name that lives in a non-global enclosing function
//! turns it into a free variable of the current table, which is how closure
//! capture lists are built up the lexical chain.

use ahash::AHashMap;

use crate::builtins::Builtin;

/// Where a resolved name lives at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// Slot in the VM's globals array.
    Global,
    /// Slot relative to the current frame's base pointer.
    Local,
    /// Index into the fixed builtin table.
    Builtin,
    /// Index into the current closure's captured values.
    Free,
}

/// A resolved name: its scope and the index to load it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// A lexically scoped name→symbol table.
#[derive(Debug, Default)]
pub struct SymbolTable {
    store: AHashMap<String, Symbol>,
    pub num_definitions: usize,
    outer: Option<Box<SymbolTable>>,
    /// Symbols this scope captures from enclosing functions, in capture
    /// order. The compiler emits the matching loads right before the
    /// `OpClosure` so the list mirrors the closure's free values exactly.
    pub free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A top-level table with every builtin predefined at its fixed index.
    #[must_use]
    pub fn new_with_builtins() -> Self {
        let mut table = Self::new();
        for builtin in Builtin::ALL {
            table.define_builtin(builtin.index() as usize, builtin.into());
        }
        table
    }

    /// Wraps `outer` as the enclosing scope of a fresh table.
    #[must_use]
    pub fn new_enclosed(outer: Self) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            ..Self::default()
        }
    }

    /// Unwraps the enclosing table, dropping this scope.
    #[must_use]
    pub fn into_outer(self) -> Option<Self> {
        self.outer.map(|outer| *outer)
    }

    /// Defines `name` in this scope: global when there is no outer table,
    /// local otherwise. Redefinition allocates a fresh slot.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_none() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
        };
        self.num_definitions += 1;
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Predefines a builtin at a fixed index without consuming a slot.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Resolves `name`, walking outward. A hit in a non-global enclosing
    /// function is recorded as a free variable of this table (and of every
    /// table in between, since the recursion rebinds it level by level).
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }
        let outer_symbol = self.outer.as_mut()?.resolve(name)?;
        if matches!(outer_symbol.scope, SymbolScope::Global | SymbolScope::Builtin) {
            return Some(outer_symbol);
        }
        Some(self.define_free(outer_symbol))
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        let name = original.name.clone();
        self.free_symbols.push(original);
        let symbol = Symbol {
            name: name.clone(),
            scope: SymbolScope::Free,
            index: self.free_symbols.len() - 1,
        };
        self.store.insert(name, symbol.clone());
        symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str, scope: SymbolScope, index: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            scope,
            index,
        }
    }

    #[test]
    fn test_define() {
        let mut global = SymbolTable::new();
        assert_eq!(global.define("a"), symbol("a", SymbolScope::Global, 0));
        assert_eq!(global.define("b"), symbol("b", SymbolScope::Global, 1));

        let mut first_local = SymbolTable::new_enclosed(global);
        assert_eq!(first_local.define("c"), symbol("c", SymbolScope::Local, 0));
        assert_eq!(first_local.define("d"), symbol("d", SymbolScope::Local, 1));

        let mut second_local = SymbolTable::new_enclosed(first_local);
        assert_eq!(second_local.define("e"), symbol("e", SymbolScope::Local, 0));
        assert_eq!(second_local.define("f"), symbol("f", SymbolScope::Local, 1));
    }

    #[test]
    fn test_resolve_global() {
        let mut global = SymbolTable::new();
        global.define("a");
        global.define("b");

        assert_eq!(global.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
        assert_eq!(global.resolve("b"), Some(symbol("b", SymbolScope::Global, 1)));
        assert_eq!(global.resolve("c"), None);
    }

    #[test]
    fn test_resolve_local_and_global_through_nesting() {
        let mut global = SymbolTable::new();
        global.define("a");
        global.define("b");
        let mut first_local = SymbolTable::new_enclosed(global);
        first_local.define("c");
        first_local.define("d");
        let mut second_local = SymbolTable::new_enclosed(first_local);
        second_local.define("e");
        second_local.define("f");

        assert_eq!(
            second_local.resolve("a"),
            Some(symbol("a", SymbolScope::Global, 0))
        );
        assert_eq!(
            second_local.resolve("e"),
            Some(symbol("e", SymbolScope::Local, 0))
        );
        assert_eq!(
            second_local.resolve("f"),
            Some(symbol("f", SymbolScope::Local, 1))
        );
    }

    #[test]
    fn test_define_and_resolve_builtins() {
        let mut global = SymbolTable::new_with_builtins();
        assert_eq!(
            global.resolve("len"),
            Some(symbol("len", SymbolScope::Builtin, 0))
        );
        assert_eq!(
            global.resolve("push"),
            Some(symbol("push", SymbolScope::Builtin, 5))
        );

        // Builtins stay visible (and builtin-scoped) through nested tables.
        let mut local = SymbolTable::new_enclosed(global);
        assert_eq!(
            local.resolve("puts"),
            Some(symbol("puts", SymbolScope::Builtin, 1))
        );
        assert!(local.free_symbols.is_empty());
    }

    #[test]
    fn test_resolve_free() {
        let mut global = SymbolTable::new();
        global.define("a");
        global.define("b");
        let mut first_local = SymbolTable::new_enclosed(global);
        first_local.define("c");
        first_local.define("d");
        let mut second_local = SymbolTable::new_enclosed(first_local);
        second_local.define("e");
        second_local.define("f");

        // c and d live in the enclosing function: they become free here.
        assert_eq!(
            second_local.resolve("c"),
            Some(symbol("c", SymbolScope::Free, 0))
        );
        assert_eq!(
            second_local.resolve("d"),
            Some(symbol("d", SymbolScope::Free, 1))
        );
        assert_eq!(
            second_local.free_symbols,
            vec![
                symbol("c", SymbolScope::Local, 0),
                symbol("d", SymbolScope::Local, 1),
            ]
        );

        // Globals and locals resolve without becoming free.
        assert_eq!(
            second_local.resolve("a"),
            Some(symbol("a", SymbolScope::Global, 0))
        );
        assert_eq!(
            second_local.resolve("e"),
            Some(symbol("e", SymbolScope::Local, 0))
        );
        assert_eq!(second_local.free_symbols.len(), 2);
    }

    #[test]
    fn test_unresolvable_free() {
        let mut global = SymbolTable::new();
        global.define("a");
        let mut first_local = SymbolTable::new_enclosed(global);
        first_local.define("c");
        let mut second_local = SymbolTable::new_enclosed(first_local);
        second_local.define("e");
        second_local.define("f");

        assert!(second_local.resolve("a").is_some());
        assert!(second_local.resolve("c").is_some());
        assert!(second_local.resolve("e").is_some());
        assert!(second_local.resolve("f").is_some());
        assert_eq!(second_local.resolve("b"), None);
        assert_eq!(second_local.resolve("d"), None);
    }

    #[test]
    fn test_resolving_a_free_variable_twice_reuses_the_slot() {
        let mut global = SymbolTable::new();
        global.define("a");
        let mut outer_fn = SymbolTable::new_enclosed(global);
        outer_fn.define("b");
        let mut inner_fn = SymbolTable::new_enclosed(outer_fn);

        assert_eq!(inner_fn.resolve("b"), Some(symbol("b", SymbolScope::Free, 0)));
        assert_eq!(inner_fn.resolve("b"), Some(symbol("b", SymbolScope::Free, 0)));
        assert_eq!(inner_fn.free_symbols.len(), 1);
    }
}
