//! Compositional construction of injected markup
//!
//! An overlay element is composed detached (styles plus optional text), then
//! attached with one of two idempotent operations. The style spec derives the
//! lookup selector used by those operations; composition and lookup share one
//! derivation so idempotency cannot silently break.

use ego_tree::NodeId;
use futures::future::BoxFuture;
use tracing::debug;

use crate::page::Page;
use crate::selector::Selector;

/// The class set applied to a composed element, in application order
#[derive(Debug, Clone)]
pub struct StyleSpec {
    classes: Vec<String>,
}

impl StyleSpec {
    /// A single class
    pub fn single(class: impl Into<String>) -> Self {
        Self {
            classes: vec![class.into()],
        }
    }

    /// An ordered list of classes. Order does not change the visual result
    /// but is preserved for selector construction.
    pub fn classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn class_list(&self) -> &[String] {
        &self.classes
    }

    /// The derived lookup selector: every class must be present
    pub fn selector(&self) -> Selector {
        Selector::for_classes(self.classes.iter().cloned())
    }
}

/// Text content for a composed element: available now, or resolved later.
/// Each resolved string becomes its own inline child node.
pub enum TextSpec {
    Ready(Vec<String>),
    Deferred(BoxFuture<'static, Vec<String>>),
}

impl TextSpec {
    pub fn text(text: impl Into<String>) -> Self {
        TextSpec::Ready(vec![text.into()])
    }

    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TextSpec::Ready(lines.into_iter().map(Into::into).collect())
    }

    pub fn deferred(future: BoxFuture<'static, Vec<String>>) -> Self {
        TextSpec::Deferred(future)
    }

    async fn resolve(self) -> Vec<String> {
        match self {
            TextSpec::Ready(lines) => lines,
            TextSpec::Deferred(future) => future.await,
        }
    }
}

/// A composed, detached element plus the style spec that identifies it
#[derive(Debug)]
pub struct ElementHandle {
    node: NodeId,
    style: StyleSpec,
}

impl ElementHandle {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn style(&self) -> &StyleSpec {
        &self.style
    }
}

/// Builds overlay markup against one page
#[derive(Clone)]
pub struct OverlayBuilder {
    page: Page,
}

impl OverlayBuilder {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Compose a detached container: a `div` carrying the style classes and,
    /// if a text spec is supplied, one `span` child per resolved string.
    /// Never attaches the result to the document.
    pub async fn compose(&self, style: StyleSpec, text: Option<TextSpec>) -> ElementHandle {
        let node = self.page.create_element("div");
        for class in style.class_list() {
            self.page.add_class(node, class);
        }

        if let Some(spec) = text {
            for line in spec.resolve().await {
                let span = self.page.create_element("span");
                self.page.set_text(span, &line);
                self.page.append_child(node, span);
            }
        }

        ElementHandle { node, style }
    }

    /// Attach `handle` under `parent` unless a direct child already matches
    /// its derived selector; in that case return the existing element.
    pub fn append_once(&self, parent: NodeId, handle: &ElementHandle) -> NodeId {
        let selector = handle.style.selector();
        if let Some(existing) = self.page.query_children(parent, &selector) {
            debug!(selector = %selector, "append_once found existing element");
            return existing;
        }
        self.page.append_child(parent, handle.node);
        handle.node
    }

    /// Remove any direct children of `parent` matching the derived selector,
    /// then insert `handle` as the first child. At most one matching direct
    /// child survives.
    pub fn replace_or_prepend(&self, parent: NodeId, handle: &ElementHandle) -> NodeId {
        let selector = handle.style.selector();
        while let Some(existing) = self.page.query_children(parent, &selector) {
            debug!(selector = %selector, "replace_or_prepend removing existing element");
            self.page.detach(existing);
        }
        self.page.prepend_child(parent, handle.node);
        handle.node
    }
}
