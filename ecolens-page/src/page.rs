//! The host-page document model
//!
//! A mutable element tree standing in for the third-party page: selector
//! queries, class/attribute edits, activation events, document readiness, and
//! the mutation-watch primitive that delivers batches of newly added elements
//! matching a selector. Pages are seeded from real HTML via `scraper`.

use std::collections::HashMap;
use std::sync::Arc;

use ego_tree::{NodeId, Tree};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::selector::Selector;

/// A node in the page tree: an element or a run of text
#[derive(Debug, Clone)]
pub enum PageNode {
    Element(ElementData),
    Text(String),
}

/// Element payload: tag, class list, and remaining attributes
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    classes: Vec<String>,
    attrs: HashMap<String, String>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            classes: Vec::new(),
            attrs: HashMap::new(),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Attribute lookup; `class` reads the synthesized class list
    pub fn attr(&self, name: &str) -> Option<String> {
        if name == "class" {
            if self.classes.is_empty() {
                return None;
            }
            return Some(self.classes.join(" "));
        }
        self.attrs.get(name).cloned()
    }

    fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        if name == "class" {
            self.classes = value.split_whitespace().map(str::to_string).collect();
        } else {
            self.attrs.insert(name.to_string(), value.to_string());
        }
    }
}

struct ActivationListener {
    tx: UnboundedSender<NodeId>,
    prevent_default: bool,
}

struct Watch {
    root: NodeId,
    selector: Selector,
    tx: UnboundedSender<Vec<NodeId>>,
}

struct PageInner {
    location: String,
    tree: RwLock<Tree<PageNode>>,
    watches: Mutex<Vec<Watch>>,
    listeners: Mutex<HashMap<NodeId, Vec<ActivationListener>>>,
    ready: watch::Sender<bool>,
}

/// Shared handle to one page. Cloning is cheap; all clones see one tree.
#[derive(Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

impl Page {
    /// An empty page (bare `html` root), still loading
    pub fn new(location: impl Into<String>) -> Self {
        let tree = Tree::new(PageNode::Element(ElementData::new("html")));
        Self::from_tree(location.into(), tree)
    }

    /// Seed a page from an HTML document
    pub fn from_html(location: impl Into<String>, html: &str) -> Self {
        let document = scraper::Html::parse_document(html);
        let mut tree = Tree::new(PageNode::Element(ElementData::new("html")));
        let root = tree.root().id();

        if let Some(html_el) = document
            .tree
            .root()
            .children()
            .find(|c| c.value().is_element())
        {
            convert_children(&html_el, &mut tree, root);
        }

        Self::from_tree(location.into(), tree)
    }

    fn from_tree(location: String, tree: Tree<PageNode>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(PageInner {
                location,
                tree: RwLock::new(tree),
                watches: Mutex::new(Vec::new()),
                listeners: Mutex::new(HashMap::new()),
                ready,
            }),
        }
    }

    /// The page's URL
    pub fn location(&self) -> &str {
        &self.inner.location
    }

    /// Root element of the page
    pub fn root(&self) -> NodeId {
        self.inner.tree.read().root().id()
    }

    // ---- readiness ----------------------------------------------------

    /// Mark the document as having finished initial loading
    pub fn mark_ready(&self) {
        self.inner.ready.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.ready.borrow()
    }

    /// Resolves once the document has finished initial loading
    pub async fn ready(&self) {
        let mut rx = self.inner.ready.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    // ---- structure ----------------------------------------------------

    /// Create a detached element
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner
            .tree
            .write()
            .orphan(PageNode::Element(ElementData::new(tag)))
            .id()
    }

    fn create_text(&self, text: &str) -> NodeId {
        self.inner
            .tree
            .write()
            .orphan(PageNode::Text(text.to_string()))
            .id()
    }

    /// Attach `child` as the last child of `parent`
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        if !self.attach(parent, child, false) {
            return;
        }
        self.dispatch_added(&[child]);
    }

    /// Attach `child` as the first child of `parent`
    pub fn prepend_child(&self, parent: NodeId, child: NodeId) {
        if !self.attach(parent, child, true) {
            return;
        }
        self.dispatch_added(&[child]);
    }

    fn attach(&self, parent: NodeId, child: NodeId, prepend: bool) -> bool {
        if parent == child {
            warn!("refusing to attach a node to itself");
            return false;
        }
        let mut tree = self.inner.tree.write();
        if tree.get(parent).is_none() || tree.get(child).is_none() {
            warn!("attach on unknown node ignored");
            return false;
        }
        // Re-attachment moves the subtree
        if let Some(mut node) = tree.get_mut(child) {
            node.detach();
        }
        let mut parent_node = tree.get_mut(parent).expect("parent checked above");
        if prepend {
            parent_node.prepend_id(child);
        } else {
            parent_node.append_id(child);
        }
        true
    }

    /// Parse an HTML fragment and append its top-level nodes under `parent`.
    /// Returns the ids of the top-level elements created.
    pub fn append_html(&self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let fragment = scraper::Html::parse_fragment(html);
        let mut created = Vec::new();

        {
            let mut tree = self.inner.tree.write();
            if tree.get(parent).is_none() {
                warn!("append_html on unknown node ignored");
                return created;
            }
            if let Some(fragment_root) = fragment
                .tree
                .root()
                .children()
                .find(|c| c.value().is_element())
            {
                for child in fragment_root.children() {
                    if let Some(id) = convert_node(&child, &mut tree, parent) {
                        if matches!(tree.get(id).map(|n| n.value()), Some(PageNode::Element(_))) {
                            created.push(id);
                        }
                    }
                }
            }
        }

        if !created.is_empty() {
            self.dispatch_added(&created);
        }
        created
    }

    /// Detach a node (and its subtree) from the document
    pub fn detach(&self, node: NodeId) {
        let mut tree = self.inner.tree.write();
        if let Some(mut n) = tree.get_mut(node) {
            n.detach();
        }
    }

    /// Whether `node` is attached under the document root
    pub fn contains(&self, node: NodeId) -> bool {
        let tree = self.inner.tree.read();
        let root = tree.root().id();
        match tree.get(node) {
            Some(n) => n.id() == root || n.ancestors().any(|a| a.id() == root),
            None => false,
        }
    }

    // ---- element state ------------------------------------------------

    pub fn add_class(&self, node: NodeId, class: &str) {
        self.with_element(node, |el| el.add_class(class));
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        self.with_element(node, |el| el.set_attr(name, value));
    }

    /// Set the live form-control value (stored as the `value` attribute)
    pub fn set_value(&self, node: NodeId, value: &str) {
        self.set_attr(node, "value", value);
    }

    /// Replace the node's children with a single text node
    pub fn set_text(&self, node: NodeId, text: &str) {
        let text_id = self.create_text(text);
        let mut tree = self.inner.tree.write();
        let Some(target) = tree.get(node) else {
            warn!("set_text on unknown node ignored");
            return;
        };
        let children: Vec<NodeId> = target.children().map(|c| c.id()).collect();
        for child in children {
            if let Some(mut c) = tree.get_mut(child) {
                c.detach();
            }
        }
        tree.get_mut(node)
            .expect("node checked above")
            .append_id(text_id);
    }

    fn with_element(&self, node: NodeId, f: impl FnOnce(&mut ElementData)) {
        let mut tree = self.inner.tree.write();
        match tree.get_mut(node) {
            Some(mut n) => {
                if let PageNode::Element(el) = n.value() {
                    f(el);
                } else {
                    warn!("element operation on text node ignored");
                }
            }
            None => warn!("element operation on unknown node ignored"),
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        let tree = self.inner.tree.read();
        match tree.get(node)?.value() {
            PageNode::Element(el) => Some(el.tag.clone()),
            PageNode::Text(_) => None,
        }
    }

    pub fn classes(&self, node: NodeId) -> Vec<String> {
        let tree = self.inner.tree.read();
        match tree.get(node).map(|n| n.value()) {
            Some(PageNode::Element(el)) => el.classes().to_vec(),
            _ => Vec::new(),
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        let tree = self.inner.tree.read();
        matches!(
            tree.get(node).map(|n| n.value()),
            Some(PageNode::Element(el)) if el.has_class(class)
        )
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        let tree = self.inner.tree.read();
        match tree.get(node)?.value() {
            PageNode::Element(el) => el.attr(name),
            PageNode::Text(_) => None,
        }
    }

    /// The live form-control value, if any
    pub fn value(&self, node: NodeId) -> Option<String> {
        self.attr(node, "value")
    }

    /// Concatenated descendant text, empty string if none
    pub fn text_content(&self, node: NodeId) -> String {
        let tree = self.inner.tree.read();
        let Some(node) = tree.get(node) else {
            return String::new();
        };
        let mut out = String::new();
        for descendant in node.descendants() {
            if let PageNode::Text(text) = descendant.value() {
                out.push_str(text);
            }
        }
        out
    }

    // ---- queries ------------------------------------------------------

    /// First element in document order matching `selector`
    pub fn query(&self, selector: &Selector) -> Option<NodeId> {
        let tree = self.inner.tree.read();
        tree.root()
            .descendants()
            .find(|n| selector.matches(&tree, n.id()))
            .map(|n| n.id())
    }

    /// All elements in document order matching `selector`
    pub fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        let tree = self.inner.tree.read();
        tree.root()
            .descendants()
            .filter(|n| selector.matches(&tree, n.id()))
            .map(|n| n.id())
            .collect()
    }

    /// First direct child of `parent` matching `selector` (the `:scope >` form)
    pub fn query_children(&self, parent: NodeId, selector: &Selector) -> Option<NodeId> {
        let tree = self.inner.tree.read();
        tree.get(parent)?
            .children()
            .find(|n| selector.matches(&tree, n.id()))
            .map(|n| n.id())
    }

    // ---- activation events --------------------------------------------

    /// Register a listener for activations of `node`, forwarding into `tx`.
    /// `prevent_default` suppresses the default navigation action.
    pub fn add_activation_listener(
        &self,
        node: NodeId,
        tx: UnboundedSender<NodeId>,
        prevent_default: bool,
    ) {
        self.inner
            .listeners
            .lock()
            .entry(node)
            .or_default()
            .push(ActivationListener { tx, prevent_default });
    }

    /// Convenience: register a listener and return its receiver
    pub fn on_activate(&self, node: NodeId, prevent_default: bool) -> UnboundedReceiver<NodeId> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_activation_listener(node, tx, prevent_default);
        rx
    }

    /// Fire an activation (user click) on `node`. Returns whether any live
    /// listener suppressed the default navigation action.
    pub fn activate(&self, node: NodeId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let Some(list) = listeners.get_mut(&node) else {
            return false;
        };
        let mut suppressed = false;
        list.retain(|listener| match listener.tx.send(node) {
            Ok(()) => {
                if listener.prevent_default {
                    suppressed = true;
                }
                true
            }
            Err(_) => false,
        });
        suppressed
    }

    // ---- mutation watches ---------------------------------------------

    /// Watch for elements newly added under `root` that match `selector`.
    /// Each insertion delivers one batch, in document order of addition.
    pub fn watch_added(&self, root: NodeId, selector: Selector) -> UnboundedReceiver<Vec<NodeId>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.watches.lock().push(Watch { root, selector, tx });
        rx
    }

    fn dispatch_added(&self, inserted: &[NodeId]) {
        let mut batches: Vec<(usize, Vec<NodeId>)> = Vec::new();
        {
            let tree = self.inner.tree.read();
            let watches = self.inner.watches.lock();

            for (index, watch) in watches.iter().enumerate() {
                let mut batch = Vec::new();
                for &top in inserted {
                    let Some(node) = tree.get(top) else { continue };
                    let in_scope = node.id() == watch.root
                        || node.ancestors().any(|a| a.id() == watch.root);
                    if !in_scope {
                        continue;
                    }
                    batch.extend(
                        node.descendants()
                            .filter(|d| watch.selector.matches(&tree, d.id()))
                            .map(|d| d.id()),
                    );
                }
                if !batch.is_empty() {
                    batches.push((index, batch));
                }
            }
        }

        if batches.is_empty() {
            return;
        }

        let mut dead = Vec::new();
        {
            let watches = self.inner.watches.lock();
            for (index, batch) in batches {
                debug!(matches = batch.len(), "mutation batch delivered");
                if watches[index].tx.send(batch).is_err() {
                    dead.push(index);
                }
            }
        }
        if !dead.is_empty() {
            let mut watches = self.inner.watches.lock();
            for index in dead.into_iter().rev() {
                if index < watches.len() {
                    watches.remove(index);
                }
            }
        }
    }

    // ---- rendering ----------------------------------------------------

    /// Indented text rendering of a subtree, for demos and debugging
    pub fn render_tree(&self, node: NodeId) -> String {
        let tree = self.inner.tree.read();
        let mut out = String::new();
        if let Some(node) = tree.get(node) {
            render_node(&node, 0, &mut out);
        }
        out
    }
}

fn render_node(node: &ego_tree::NodeRef<'_, PageNode>, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    match node.value() {
        PageNode::Element(el) => {
            out.push_str(&el.tag);
            if let Some(id) = el.attr("id") {
                out.push('#');
                out.push_str(&id);
            }
            for class in el.classes() {
                out.push('.');
                out.push_str(class);
            }
            out.push('\n');
            for child in node.children() {
                render_node(&child, depth + 1, out);
            }
        }
        PageNode::Text(text) => {
            out.push('"');
            out.push_str(text.trim());
            out.push_str("\"\n");
        }
    }
}

fn convert_children(
    src: &ego_tree::NodeRef<'_, scraper::Node>,
    tree: &mut Tree<PageNode>,
    parent: NodeId,
) {
    for child in src.children() {
        convert_node(&child, tree, parent);
    }
}

fn convert_node(
    src: &ego_tree::NodeRef<'_, scraper::Node>,
    tree: &mut Tree<PageNode>,
    parent: NodeId,
) -> Option<NodeId> {
    match src.value() {
        scraper::Node::Element(el) => {
            let mut data = ElementData::new(el.name());
            for class in el.classes() {
                data.add_class(class);
            }
            for (name, value) in el.attrs() {
                if name != "class" {
                    data.set_attr(name, value);
                }
            }
            let id = tree.orphan(PageNode::Element(data)).id();
            tree.get_mut(parent)
                .expect("parent exists during conversion")
                .append_id(id);
            for grandchild in src.children() {
                convert_node(&grandchild, tree, id);
            }
            Some(id)
        }
        scraper::Node::Text(text) => {
            let text: &str = text;
            // Whitespace-only runs are markup indentation, not content
            if text.trim().is_empty() {
                return None;
            }
            let id = tree.orphan(PageNode::Text(text.to_string())).id();
            tree.get_mut(parent)
                .expect("parent exists during conversion")
                .append_id(id);
            Some(id)
        }
        _ => None,
    }
}
