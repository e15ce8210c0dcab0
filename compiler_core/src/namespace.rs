//! Hierarchical symbol table built by the evaluator.
//!
//! Namespaces live in an arena owned by [`NamespaceGraph`]; every namespace
//! except Root has exactly one parent, so following parent links from any
//! namespace always terminates at Root.

use std::collections::HashMap;
use std::fmt;

use frontend::Position;
use string_interner::{DefaultStringInterner, DefaultSymbol};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(pub u32);

impl NamespaceId {
    pub const ROOT: NamespaceId = NamespaceId(0);
}

/// Result of name resolution: which namespace declared the symbol and at
/// which position in its symbol list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymbolRef {
    pub namespace: NamespaceId,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int,
    Double,
    Bool,
    String,
}

impl ValueType {
    pub fn from_type_name(name: &str) -> Option<ValueType> {
        match name {
            "int" => Some(ValueType::Int),
            "double" => Some(ValueType::Double),
            "bool" => Some(ValueType::Bool),
            "string" => Some(ValueType::String),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Int | ValueType::Double)
    }

    /// Only integers and booleans can key an associative array.
    pub fn is_array_key(self) -> bool {
        matches!(self, ValueType::Int | ValueType::Bool)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Int => "Int",
            ValueType::Double => "Double",
            ValueType::Bool => "Bool",
            ValueType::String => "String",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Scalar(ValueType),
    Array { key: ValueType, value: ValueType },
    Function { params: Vec<ValueType>, ret: Option<ValueType> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: DefaultSymbol,
    pub kind: SymbolKind,
    pub position: Position,
}

impl Symbol {
    /// `Scalar : x`, `Int[Bool] : flags` or `Function : f`.
    pub fn describe(&self, interner: &DefaultStringInterner) -> String {
        let name = interner.resolve(self.name).unwrap_or("<unknown>");
        match &self.kind {
            SymbolKind::Scalar(_) => format!("Scalar : {name}"),
            SymbolKind::Array { key, value } => format!("{value}[{key}] : {name}"),
            SymbolKind::Function { .. } => format!("Function : {name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Root,
    Function,
    If,
    Else,
    While,
    Block,
}

impl ScopeKind {
    pub fn default_name(self) -> &'static str {
        match self {
            ScopeKind::Root => "Root",
            ScopeKind::Function => "function",
            ScopeKind::If => "if",
            ScopeKind::Else => "else",
            ScopeKind::While => "while",
            ScopeKind::Block => "block",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Namespace {
    pub name: String,
    pub kind: ScopeKind,
    pub parent: Option<NamespaceId>,
    /// Declaration order.
    pub symbols: Vec<Symbol>,
    pub children: Vec<NamespaceId>,
    pub position: Option<Position>,
    index: HashMap<DefaultSymbol, u32>,
    sealed: bool,
}

impl Namespace {
    fn new(name: String, kind: ScopeKind, parent: Option<NamespaceId>, position: Option<Position>) -> Self {
        Namespace {
            name,
            kind,
            parent,
            symbols: Vec::new(),
            children: Vec::new(),
            position,
            index: HashMap::new(),
            sealed: false,
        }
    }

    pub fn lookup(&self, name: DefaultSymbol) -> Option<u32> {
        self.index.get(&name).copied()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclareError {
    /// The name already exists in this namespace; the first declaration is
    /// kept.
    Duplicate(SymbolRef),
    /// The namespace was closed by the evaluator.
    Sealed(NamespaceId),
    UnknownNamespace(NamespaceId),
}

#[derive(Debug, Clone)]
pub struct NamespaceGraph {
    namespaces: Vec<Namespace>,
}

impl Default for NamespaceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceGraph {
    pub fn new() -> Self {
        NamespaceGraph {
            namespaces: vec![Namespace::new(
                ScopeKind::Root.default_name().to_string(),
                ScopeKind::Root,
                None,
                None,
            )],
        }
    }

    pub fn root(&self) -> &Namespace {
        &self.namespaces[0]
    }

    pub fn get(&self, id: NamespaceId) -> Option<&Namespace> {
        self.namespaces.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = (NamespaceId, &Namespace)> {
        self.namespaces
            .iter()
            .enumerate()
            .map(|(i, ns)| (NamespaceId(i as u32), ns))
    }

    pub fn symbol(&self, symbol: SymbolRef) -> Option<&Symbol> {
        self.get(symbol.namespace)?.symbols.get(symbol.index as usize)
    }

    pub fn parent(&self, id: NamespaceId) -> Option<NamespaceId> {
        self.get(id)?.parent
    }

    /// `id` followed by each enclosing namespace up to and including Root.
    pub fn ancestors(&self, id: NamespaceId) -> impl Iterator<Item = NamespaceId> + '_ {
        std::iter::successors(self.get(id).map(|_| id), move |current| self.parent(*current))
    }

    pub fn depth(&self, id: NamespaceId) -> usize {
        self.ancestors(id).count().saturating_sub(1)
    }

    pub fn lookup_local(&self, namespace: NamespaceId, name: DefaultSymbol) -> Option<SymbolRef> {
        let index = self.get(namespace)?.lookup(name)?;
        Some(SymbolRef { namespace, index })
    }

    /// Lexical lookup: the innermost declaration visible from `from`.
    pub fn resolve(&self, from: NamespaceId, name: DefaultSymbol) -> Option<SymbolRef> {
        self.ancestors(from).find_map(|ns| self.lookup_local(ns, name))
    }

    /// Nearest enclosing function namespace, if any.
    pub fn enclosing_function(&self, from: NamespaceId) -> Option<NamespaceId> {
        self.ancestors(from)
            .find(|ns| self.get(*ns).is_some_and(|n| n.kind == ScopeKind::Function))
    }

    pub(crate) fn open_child(
        &mut self,
        parent: NamespaceId,
        name: impl Into<String>,
        kind: ScopeKind,
        position: Option<Position>,
    ) -> NamespaceId {
        let id = NamespaceId(self.namespaces.len() as u32);
        self.namespaces.push(Namespace::new(name.into(), kind, Some(parent), position));
        if let Some(parent) = self.namespaces.get_mut(parent.0 as usize) {
            parent.children.push(id);
        }
        id
    }

    pub(crate) fn declare(&mut self, namespace: NamespaceId, symbol: Symbol) -> Result<SymbolRef, DeclareError> {
        let ns = self
            .namespaces
            .get_mut(namespace.0 as usize)
            .ok_or(DeclareError::UnknownNamespace(namespace))?;
        if ns.sealed {
            return Err(DeclareError::Sealed(namespace));
        }
        if let Some(index) = ns.lookup(symbol.name) {
            return Err(DeclareError::Duplicate(SymbolRef { namespace, index }));
        }
        let index = ns.symbols.len() as u32;
        ns.index.insert(symbol.name, index);
        ns.symbols.push(symbol);
        Ok(SymbolRef { namespace, index })
    }

    pub(crate) fn seal(&mut self, namespace: NamespaceId) {
        if let Some(ns) = self.namespaces.get_mut(namespace.0 as usize) {
            ns.sealed = true;
        }
    }
}
