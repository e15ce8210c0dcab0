//! Concrete parse tree handed from the parser to the compiler back end.
//!
//! Nodes live in an arena and refer to their children by [`NodeId`]. The tree
//! is built bottom-up by the parser and is read-only afterwards.

use crate::token::{Position, Token, TokenType};

/// Grammar rule labels shared by the parser and the back end.
pub mod rules {
    pub const START: &str = "Start";
    pub const FUNC_DECL: &str = "FuncDecl";
    pub const PARAM_LIST: &str = "ParamList";
    pub const PARAM: &str = "Param";
    pub const TYPE: &str = "Type";
    pub const ARRAY_TYPE: &str = "ArrayType";
    pub const STATEMENT: &str = "Statement";
    pub const VAR_DECL: &str = "VarDecl";
    pub const ARRAY_DECL: &str = "ArrayDecl";
    pub const ASSIGNMENT: &str = "Assignment";
    pub const IF_STATEMENT: &str = "IfStatement";
    pub const WHILE_STATEMENT: &str = "WhileStatement";
    pub const RETURN_STATEMENT: &str = "ReturnStatement";
    pub const PRINT_STATEMENT: &str = "PrintStatement";
    pub const CALL_STATEMENT: &str = "CallStatement";
    pub const BLOCK: &str = "Block";
    pub const EXPR: &str = "Expr";
    pub const OR_EXPR: &str = "OrExpr";
    pub const AND_EXPR: &str = "AndExpr";
    pub const COMP_EXPR: &str = "CompExpr";
    pub const ADD_EXPR: &str = "AddExpr";
    pub const MUL_EXPR: &str = "MulExpr";
    pub const UNARY_EXPR: &str = "UnaryExpr";
    pub const PRIMARY: &str = "Primary";
    pub const CALL_EXPR: &str = "CallExpr";
    pub const ARG_LIST: &str = "ArgList";
    pub const INDEX_EXPR: &str = "IndexExpr";

    /// Productions that only exist to encode precedence or alternation.
    pub const WRAPPERS: &[&str] = &[
        STATEMENT, EXPR, OR_EXPR, AND_EXPR, COMP_EXPR, ADD_EXPR, MUL_EXPR, UNARY_EXPR, PRIMARY, TYPE,
    ];

    pub fn is_wrapper(label: &str) -> bool {
        WRAPPERS.contains(&label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    /// Rule name for interior nodes, literal token text for leaves.
    pub label: String,
    pub position: Option<Position>,
    /// Token kind, present on leaves only.
    pub token: Option<TokenType>,
    pub children: Vec<NodeId>,
}

impl ParseNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_token(&self, kind: TokenType) -> bool {
        self.token == Some(kind)
    }

    pub fn is_token_text(&self, kind: TokenType, text: &str) -> bool {
        self.token == Some(kind) && self.label == text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeShapeError {
    EmptyTree,
    LeafWithoutPosition(NodeId),
    /// The id does not name a node of the tree.
    MissingNode(NodeId),
    DanglingChild { parent: NodeId, child: NodeId },
    /// The node is reachable along more than one path, so the tree has a
    /// cycle or a shared subtree.
    Cycle(NodeId),
}

impl std::fmt::Display for TreeShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TreeShapeError::EmptyTree => write!(f, "parse tree has no root"),
            TreeShapeError::LeafWithoutPosition(id) => write!(f, "leaf node {} has no source position", id.0),
            TreeShapeError::MissingNode(id) => write!(f, "node {} does not exist", id.0),
            TreeShapeError::DanglingChild { parent, child } => {
                write!(f, "node {} refers to missing child {}", parent.0, child.0)
            }
            TreeShapeError::Cycle(id) => write!(f, "node {} is reached more than once", id.0),
        }
    }
}

impl std::error::Error for TreeShapeError {}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseTree {
    nodes: Vec<ParseNode>,
    root: Option<NodeId>,
}

impl ParseTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: None,
        }
    }

    fn push(&mut self, node: ParseNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn add_token(&mut self, token: &Token) -> NodeId {
        self.push(ParseNode {
            label: token.text.clone(),
            position: Some(token.position),
            token: Some(token.kind),
            children: vec![],
        })
    }

    pub fn add_leaf(&mut self, label: impl Into<String>, token: TokenType, position: Position) -> NodeId {
        self.push(ParseNode {
            label: label.into(),
            position: Some(position),
            token: Some(token),
            children: vec![],
        })
    }

    /// Structural node; carries no position of its own.
    pub fn add_rule(&mut self, label: &str, children: Vec<NodeId>) -> NodeId {
        self.push(ParseNode {
            label: label.to_string(),
            position: None,
            token: None,
            children,
        })
    }

    pub fn add_node(&mut self, node: ParseNode) -> NodeId {
        self.push(node)
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&ParseNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Position of the node itself, or of the leftmost positioned node
    /// below it.
    pub fn leftmost_position(&self, id: NodeId) -> Option<Position> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            if std::mem::replace(&mut seen[id.0 as usize], true) {
                continue;
            }
            if node.position.is_some() {
                return node.position;
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Checks the invariants the back end relies on: a root exists, every
    /// child index is valid, every node is reached exactly once from the
    /// root and every leaf is anchored to a token.
    pub fn validate(&self) -> Result<(), TreeShapeError> {
        let root = self.root.ok_or(TreeShapeError::EmptyTree)?;
        if self.get(root).is_none() {
            return Err(TreeShapeError::MissingNode(root));
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                return Err(TreeShapeError::MissingNode(id));
            };
            if std::mem::replace(&mut seen[id.0 as usize], true) {
                return Err(TreeShapeError::Cycle(id));
            }
            if node.is_leaf() && node.position.is_none() {
                return Err(TreeShapeError::LeafWithoutPosition(id));
            }
            for child in &node.children {
                if self.get(*child).is_none() {
                    return Err(TreeShapeError::DanglingChild { parent: id, child: *child });
                }
                stack.push(*child);
            }
        }
        Ok(())
    }

    /// Depth-first pre-order walk yielding each node id with its depth.
    /// Missing ids and nodes already yielded are skipped.
    pub fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        if let Some(root) = self.root {
            let mut seen = vec![false; self.nodes.len()];
            let mut stack = vec![(root, 0usize)];
            while let Some((id, depth)) = stack.pop() {
                match seen.get_mut(id.0 as usize) {
                    Some(visited) if !*visited => *visited = true,
                    _ => continue,
                }
                out.push((id, depth));
                for child in self.children(id).iter().rev() {
                    stack.push((*child, depth + 1));
                }
            }
        }
        out
    }
}
