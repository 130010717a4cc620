//! In-memory document tree.
//!
//! Stands in for the browser DOM: every plot owns one [`Document`] holding
//! its SVG groups and HTML tooltip overlays. Nodes live in an arena and are
//! addressed by [`NodeId`]. Removed slots go on a free list and are reused;
//! each slot carries a generation that is bumped on removal, so a stale id
//! reports [`Error::StaleNode`] instead of aliasing the slot's new node.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    /// Arena slot of this node. Slots are reused after removal.
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }

    /// Generation of the slot when this node was created.
    #[must_use]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    html: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            styles: BTreeMap::new(),
            html: None,
            parent,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// An arena-backed element tree with a single root.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new("div")
    }
}

impl Document {
    /// Create a document whose root element has the given tag.
    #[must_use]
    pub fn new(root_tag: &str) -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::new(root_tag, None)),
            }],
            free: Vec::new(),
            live: 1,
            root: NodeId {
                index: 0,
                generation: 0,
            },
        }
    }

    /// The root element.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Number of arena slots, live or free. Bounded by the peak node count.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Always false: the root cannot be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `node` is still part of the document.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.get(node).is_ok()
    }

    fn get(&self, node: NodeId) -> Result<&Node> {
        self.slots
            .get(node.index)
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(Error::StaleNode(node.index))
    }

    fn get_mut(&mut self, node: NodeId) -> Result<&mut Node> {
        self.slots
            .get_mut(node.index)
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(Error::StaleNode(node.index))
    }

    /// Append a new element as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> Result<NodeId> {
        self.get(parent)?;
        let node = Some(Node::new(tag, Some(parent)));
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = node;
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot { generation: 0, node });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        self.get_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Detach `node` and drop it together with its whole subtree.
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        if node == self.root {
            return Err(Error::InvalidArgument("cannot remove the document root".to_string()));
        }
        let parent = self.get(node)?.parent;
        if let Some(parent) = parent {
            if let Ok(parent) = self.get_mut(parent) {
                parent.children.retain(|c| *c != node);
            }
        }
        self.drop_subtree(node);
        Ok(())
    }

    fn drop_subtree(&mut self, node: NodeId) {
        let mut pending = vec![node];
        while let Some(next) = pending.pop() {
            let Some(slot) = self
                .slots
                .get_mut(next.index)
                .filter(|slot| slot.generation == next.generation)
            else {
                continue;
            };
            if let Some(removed) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(next.index);
                self.live -= 1;
                pending.extend(removed.children);
            }
        }
    }

    /// Tag name of `node`.
    pub fn tag(&self, node: NodeId) -> Result<&str> {
        Ok(&self.get(node)?.tag)
    }

    /// Parent of `node`, `None` for the root or a removed node.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).ok().and_then(|n| n.parent)
    }

    /// Children of `node` in document order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// Last child of `node`.
    #[must_use]
    pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).last().copied()
    }

    /// Set an attribute.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl ToString) -> Result<()> {
        self.get_mut(node)?
            .attrs
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Read an attribute.
    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get(node).ok()?.attrs.get(name).map(String::as_str)
    }

    /// Set an inline style property.
    pub fn set_style(&mut self, node: NodeId, name: &str, value: impl ToString) -> Result<()> {
        self.get_mut(node)?
            .styles
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Remove an inline style property.
    pub fn remove_style(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.get_mut(node)?.styles.remove(name);
        Ok(())
    }

    /// Read an inline style property.
    #[must_use]
    pub fn style(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get(node).ok()?.styles.get(name).map(String::as_str)
    }

    /// Replace the inner html of `node`. Existing children are removed.
    pub fn set_html(&mut self, node: NodeId, html: impl Into<String>) -> Result<()> {
        let children = std::mem::take(&mut self.get_mut(node)?.children);
        for child in children {
            self.drop_subtree(child);
        }
        self.get_mut(node)?.html = Some(html.into());
        Ok(())
    }

    /// Inner html set through [`Document::set_html`].
    #[must_use]
    pub fn html(&self, node: NodeId) -> Option<&str> {
        self.get(node).ok()?.html.as_deref()
    }

    /// All live nodes whose `id` attribute equals `id`, in slot order.
    pub fn nodes_with_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.slots.iter().enumerate().filter_map(move |(index, slot)| {
            slot.node
                .as_ref()
                .filter(|n| n.attrs.get("id").is_some_and(|v| v == id))
                .map(|_| NodeId {
                    index,
                    generation: slot.generation,
                })
        })
    }

    /// First live node whose `id` attribute equals `id`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.nodes_with_id(id).next()
    }

    /// Serialize `node` and its subtree to markup.
    pub fn to_markup(&self, node: NodeId) -> Result<String> {
        let mut out = String::with_capacity(1024);
        self.write_node(node, &mut out)?;
        Ok(out)
    }

    fn write_node(&self, node: NodeId, out: &mut String) -> Result<()> {
        let n = self.get(node)?;
        let _ = write!(out, "<{}", n.tag);
        for (name, value) in &n.attrs {
            let _ = write!(out, r#" {name}="{}""#, escape_attr(value));
        }
        if !n.styles.is_empty() {
            let css: String = n.styles.iter().map(|(k, v)| format!("{k}:{v};")).collect();
            let _ = write!(out, r#" style="{}""#, escape_attr(&css));
        }
        if n.html.is_none() && n.children.is_empty() {
            out.push_str("/>");
            return Ok(());
        }
        out.push('>');
        if let Some(html) = &n.html {
            out.push_str(html);
        }
        for child in &n.children {
            self.write_node(*child, out)?;
        }
        let _ = write!(out, "</{}>", n.tag);
        Ok(())
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
