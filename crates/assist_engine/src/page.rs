use std::collections::HashMap;

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::dom;

/// Index of a document inside a [`Page`]; the main document is always 0.
pub type DocIndex = usize;

pub const MAIN_DOCUMENT: DocIndex = 0;

/// Identity of one element across a pass.
///
/// A handle only resolves while its document is still at the same render
/// generation; after a re-render it is stale and must not be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub doc: DocIndex,
    pub node: NodeId,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSlot {
    Loaded(DocIndex),
    CrossOrigin { address: Option<String> },
}

/// What the host reports when a frame element gets content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameContent {
    SameOrigin {
        address: Option<String>,
        html: String,
    },
    CrossOrigin {
        address: Option<String>,
    },
}

#[derive(Debug)]
pub struct PageDocument {
    address: Option<String>,
    html: Html,
    values: HashMap<NodeId, String>,
    frames: HashMap<NodeId, FrameSlot>,
    generation: u64,
}

impl PageDocument {
    fn parse(address: Option<String>, html: &str) -> Self {
        Self {
            address,
            html: Html::parse_document(html),
            values: HashMap::new(),
            frames: HashMap::new(),
            generation: 0,
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(node).and_then(ElementRef::wrap)
    }

    pub fn body(&self) -> ElementRef<'_> {
        Selector::parse("body")
            .ok()
            .and_then(|sel| self.html.select(&sel).next())
            .unwrap_or_else(|| self.html.root_element())
    }

    /// Frame elements (`iframe`, `frame`) in document order.
    pub fn frame_elements(&self) -> Vec<ElementRef<'_>> {
        match Selector::parse("iframe, frame") {
            Ok(sel) => self.html.select(&sel).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn frame_slot(&self, frame: NodeId) -> Option<&FrameSlot> {
        self.frames.get(&frame)
    }

    pub fn handle(&self, doc: DocIndex, element: ElementRef<'_>) -> ElementHandle {
        ElementHandle {
            doc,
            node: element.id(),
            generation: self.generation,
        }
    }

    /// Current value of a form field: the written overlay, else the markup value.
    pub fn value_of(&self, element: ElementRef<'_>) -> String {
        match self.values.get(&element.id()) {
            Some(value) => value.clone(),
            None => dom::markup_value(element),
        }
    }
}

/// An in-memory page: the main document plus every frame document the host
/// has attached, addressed by [`DocIndex`].
#[derive(Debug)]
pub struct Page {
    documents: Vec<PageDocument>,
    // Frame documents whose parent was re-rendered; reused by the next attach.
    detached: Vec<DocIndex>,
}

impl Page {
    pub fn new(address: Option<&str>, html: &str) -> Self {
        Self {
            documents: vec![PageDocument::parse(address.map(str::to_owned), html)],
            detached: Vec::new(),
        }
    }

    pub fn main(&self) -> &PageDocument {
        &self.documents[MAIN_DOCUMENT]
    }

    pub fn address(&self) -> Option<&str> {
        self.main().address()
    }

    pub fn document(&self, doc: DocIndex) -> Option<&PageDocument> {
        self.documents.get(doc)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Changes the main address without a reload (history API); passing markup
    /// re-renders the main document too.
    pub fn navigate(&mut self, address: &str, html: Option<&str>) {
        if let Some(html) = html {
            self.replace_html(MAIN_DOCUMENT, html);
        }
        self.documents[MAIN_DOCUMENT].address = Some(address.to_owned());
    }

    /// Re-renders one document: new markup, new generation, written values and
    /// frame slots dropped. Frame documents below it become free for reuse.
    pub fn replace_html(&mut self, doc: DocIndex, html: &str) -> bool {
        if doc >= self.documents.len() {
            return false;
        }
        self.detach_frames(doc);
        let document = &mut self.documents[doc];
        document.html = Html::parse_document(html);
        document.values.clear();
        document.generation += 1;
        true
    }

    fn detach_frames(&mut self, doc: DocIndex) {
        let mut pending = vec![doc];
        while let Some(index) = pending.pop() {
            let Some(document) = self.documents.get_mut(index) else {
                continue;
            };
            for (_, slot) in document.frames.drain() {
                if let FrameSlot::Loaded(child) = slot {
                    if child != MAIN_DOCUMENT && !self.detached.contains(&child) {
                        self.detached.push(child);
                        pending.push(child);
                    }
                }
            }
        }
    }

    /// Attaches content to a frame element of `parent`. Same-origin content
    /// reuses the document slot the frame already had, if any.
    pub fn attach_frame(
        &mut self,
        parent: DocIndex,
        frame: NodeId,
        content: FrameContent,
    ) -> Option<DocIndex> {
        let existing = {
            let document = self.documents.get(parent)?;
            let element = document.element(frame)?;
            if !dom::is_frame_element(element) {
                return None;
            }
            document.frames.get(&frame).cloned()
        };

        match content {
            FrameContent::CrossOrigin { address } => {
                self.documents[parent]
                    .frames
                    .insert(frame, FrameSlot::CrossOrigin { address });
                None
            }
            FrameContent::SameOrigin { address, html } => {
                let index = match existing {
                    Some(FrameSlot::Loaded(index)) => {
                        self.replace_html(index, &html);
                        self.documents[index].address = address;
                        index
                    }
                    _ => match self.take_detached(parent) {
                        Some(index) => {
                            self.replace_html(index, &html);
                            self.documents[index].address = address;
                            index
                        }
                        None => {
                            self.documents.push(PageDocument::parse(address, &html));
                            self.documents.len() - 1
                        }
                    },
                };
                self.documents[parent]
                    .frames
                    .insert(frame, FrameSlot::Loaded(index));
                Some(index)
            }
        }
    }

    fn take_detached(&mut self, parent: DocIndex) -> Option<DocIndex> {
        let position = self.detached.iter().rposition(|&index| index != parent)?;
        Some(self.detached.remove(position))
    }

    /// Convenience for hosts that know frames by their `src` attribute.
    pub fn attach_frame_by_src(
        &mut self,
        parent: DocIndex,
        src: &str,
        content: FrameContent,
    ) -> Option<DocIndex> {
        let frame = self
            .documents
            .get(parent)?
            .frame_elements()
            .into_iter()
            .find(|el| el.value().attr("src").map(str::trim) == Some(src.trim()))?
            .id();
        self.attach_frame(parent, frame, content)
    }

    pub fn resolve(&self, handle: ElementHandle) -> Option<ElementRef<'_>> {
        let document = self.documents.get(handle.doc)?;
        if document.generation != handle.generation {
            return None;
        }
        document.element(handle.node)
    }

    pub fn field_value(&self, handle: ElementHandle) -> Option<String> {
        let element = self.resolve(handle)?;
        Some(self.documents[handle.doc].value_of(element))
    }

    /// Writes the value overlay; refuses stale handles.
    pub fn set_field_value(&mut self, handle: ElementHandle, text: &str) -> bool {
        if self.resolve(handle).is_none() {
            return false;
        }
        self.documents[handle.doc]
            .values
            .insert(handle.node, text.to_owned());
        true
    }

    /// True when `node` is the element with `id` or sits inside it.
    pub fn is_inside_id(&self, doc: DocIndex, node: NodeId, id: &str) -> bool {
        let Some(document) = self.documents.get(doc) else {
            return false;
        };
        let Some(start) = document.html.tree.get(node) else {
            return false;
        };
        std::iter::once(start)
            .chain(start.ancestors())
            .filter_map(ElementRef::wrap)
            .any(|el| el.value().id() == Some(id))
    }
}

/// Whether a frame `src` is readable from a document at `base`.
/// Relative sources, `about:` and `javascript:` frames inherit the parent origin.
pub fn is_same_origin(base: Option<&str>, src: &str) -> bool {
    let src = src.trim();
    if src.is_empty() || src.starts_with("about:") || src.starts_with("javascript:") {
        return true;
    }
    let base = base.and_then(|b| Url::parse(b).ok());
    let target = match Url::parse(src) {
        Ok(url) => url,
        Err(_) => match base.as_ref().and_then(|b| b.join(src).ok()) {
            Some(url) => url,
            None => return true,
        },
    };
    match base {
        Some(base) => base.origin() == target.origin(),
        None => false,
    }
}

/// Resolves a frame `src` against its parent address.
pub fn resolve_address(base: Option<&str>, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(src) {
        return Some(url.into());
    }
    base.and_then(|b| Url::parse(b).ok())
        .and_then(|b| b.join(src).ok())
        .map(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN: &str = r#"<iframe src="box_char.php"></iframe><iframe src="menu.php"></iframe>"#;

    fn attach_all(page: &mut Page) -> DocIndex {
        let listing = page
            .attach_frame_by_src(
                MAIN_DOCUMENT,
                "box_char.php",
                FrameContent::SameOrigin {
                    address: None,
                    html: r#"<iframe src="mail_send.php"></iframe>"#.to_owned(),
                },
            )
            .unwrap();
        page.attach_frame_by_src(
            listing,
            "mail_send.php",
            FrameContent::SameOrigin {
                address: None,
                html: "<textarea name='message'></textarea>".to_owned(),
            },
        );
        page.attach_frame_by_src(
            MAIN_DOCUMENT,
            "menu.php",
            FrameContent::SameOrigin {
                address: None,
                html: "<a href='#'>inbox</a>".to_owned(),
            },
        );
        listing
    }

    #[test]
    fn rerender_and_reattach_reuses_frame_documents() {
        let mut page = Page::new(Some("https://mem44.com/staff/index.php"), MAIN);
        let listing = attach_all(&mut page);
        assert_eq!(page.document_count(), 4);

        let stale = {
            let document = page.document(listing).unwrap();
            document.handle(listing, document.body())
        };
        for _ in 0..3 {
            assert!(page.replace_html(MAIN_DOCUMENT, MAIN));
            attach_all(&mut page);
        }
        assert_eq!(page.document_count(), 4);
        assert!(page.resolve(stale).is_none());
    }

    #[test]
    fn relative_frames_are_same_origin() {
        let base = Some("https://mem44.com/staff/index.php");
        assert!(is_same_origin(base, "box_char.php?page=2"));
        assert!(is_same_origin(base, "https://mem44.com/staff/mailbox.php"));
        assert!(!is_same_origin(base, "https://ads.example.net/frame"));
        assert!(is_same_origin(base, "about:blank"));
    }

    #[test]
    fn frame_address_resolves_against_parent() {
        assert_eq!(
            resolve_address(Some("https://mem44.com/staff/index.php"), "box_char.php").as_deref(),
            Some("https://mem44.com/staff/box_char.php")
        );
        assert_eq!(resolve_address(None, "box_char.php"), None);
    }
}
