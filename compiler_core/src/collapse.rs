//! Removal of single-child wrapper productions from a parse tree.

use frontend::{rules, NodeId, ParseNode, ParseTree};

/// Copies `tree`, replacing every chain of wrapper rules that have exactly one
/// child with the innermost non-wrapper node. The surviving node keeps its
/// own position, or inherits the leftmost position of the chain it replaced.
/// Applying the transform twice yields the same tree as applying it once.
pub fn collapse_wrappers(tree: &ParseTree) -> ParseTree {
    let mut out = ParseTree::with_capacity(tree.len());
    let mut seen = vec![false; tree.len()];
    if let Some(root) = tree.root()
        && let Some(new_root) = copy_node(tree, root, &mut seen, &mut out)
    {
        out.set_root(new_root);
    }
    out
}

fn is_collapsible(node: &ParseNode) -> bool {
    node.token.is_none() && node.children.len() == 1 && rules::is_wrapper(&node.label)
}

/// Marks `id` as copied; `None` when it is missing or was reached before,
/// which drops the edge instead of following a cycle.
fn visit<'t>(src: &'t ParseTree, id: NodeId, seen: &mut [bool]) -> Option<&'t ParseNode> {
    let node = src.get(id)?;
    let visited = seen.get_mut(id.0 as usize)?;
    if *visited {
        return None;
    }
    *visited = true;
    Some(node)
}

fn copy_node(src: &ParseTree, id: NodeId, seen: &mut [bool], out: &mut ParseTree) -> Option<NodeId> {
    let mut node = visit(src, id, seen)?;
    let mut chain_position = node.position;
    let mut collapsed = false;
    while is_collapsible(node) {
        node = visit(src, node.children[0], seen)?;
        chain_position = chain_position.or(node.position);
        collapsed = true;
    }
    let children: Vec<NodeId> = node
        .children
        .iter()
        .filter_map(|child| copy_node(src, *child, seen, out))
        .collect();
    let position = if collapsed {
        chain_position.or_else(|| children.iter().find_map(|c| out.leftmost_position(*c)))
    } else {
        node.position
    };
    Some(out.add_node(ParseNode {
        label: node.label.clone(),
        position,
        token: node.token,
        children,
    }))
}
