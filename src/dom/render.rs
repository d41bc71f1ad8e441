use super::{HostTree, NodeId};
use crate::view::AbstractView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPosition {
    /// Before the container's first child.
    AfterBegin,
    /// After the container's last child.
    BeforeEnd,
}

/// Mounts `view`'s element into `container`.
pub fn render<V>(tree: &mut HostTree, container: NodeId, view: &mut V, position: RenderPosition)
where
    V: AbstractView + ?Sized,
{
    let node = view.element(tree);
    tree.insert(container, node, position);
}

/// Swaps `old`'s mounted element for `new`'s. Both views keep their nodes.
pub fn replace<N, O>(tree: &mut HostTree, new: &mut N, old: &mut O)
where
    N: AbstractView + ?Sized,
    O: AbstractView + ?Sized,
{
    let new_node = new.element(tree);
    let old_node = old.element(tree);
    tree.replace_node(new_node, old_node);
}

/// Unmounts `view` and frees its element.
pub fn remove<V>(tree: &mut HostTree, view: &mut V)
where
    V: AbstractView + ?Sized,
{
    view.remove_element(tree);
}
