use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::ElementRef;

use crate::model::{DocumentHandle, DocumentRole};
use crate::page::{is_same_origin, resolve_address, DocIndex, FrameSlot, Page, MAIN_DOCUMENT};

fn frame_name(element: ElementRef<'_>) -> Option<String> {
    let value = element.value();
    value
        .attr("name")
        .or_else(|| value.attr("id"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Flat list of documents: main first, then frames in document order,
/// depth-first. Unreadable frames are listed with `reachable = false`.
pub fn enumerate_documents(page: &Page, max_depth: usize) -> Vec<DocumentHandle> {
    let mut out = vec![DocumentHandle {
        doc: Some(MAIN_DOCUMENT),
        frame_element: None,
        role: DocumentRole::Main,
        address: page.address().map(str::to_owned),
        frame_name: None,
        reachable: true,
        depth: 0,
        ordinal: 0,
    }];
    let mut visited = HashSet::from([MAIN_DOCUMENT]);
    walk(page, MAIN_DOCUMENT, page.address(), 1, max_depth, &mut visited, &mut out);
    out
}

/// `base` is the parent's effective address, which may come from the
/// frame's declared src when the document was attached without one.
fn walk(
    page: &Page,
    parent: DocIndex,
    base: Option<&str>,
    depth: usize,
    max_depth: usize,
    visited: &mut HashSet<DocIndex>,
    out: &mut Vec<DocumentHandle>,
) {
    if depth > max_depth {
        return;
    }
    let Some(document) = page.document(parent) else {
        return;
    };
    for frame in document.frame_elements() {
        let src = frame.value().attr("src").unwrap_or_default();
        let declared = resolve_address(base, src);
        let (doc, address, reachable) = match document.frame_slot(frame.id()) {
            Some(FrameSlot::Loaded(index)) if !visited.contains(index) => {
                let address = page
                    .document(*index)
                    .and_then(|d| d.address().map(str::to_owned))
                    .or(declared);
                (Some(*index), address, true)
            }
            // A slot pointing back up the tree would loop.
            Some(FrameSlot::Loaded(_)) => (None, declared, false),
            Some(FrameSlot::CrossOrigin { address }) => (None, address.clone().or(declared), false),
            None => {
                let address = if is_same_origin(base, src) {
                    declared
                } else {
                    declared.or_else(|| Some(src.to_owned()))
                };
                (None, address, false)
            }
        };
        let ordinal = out.len();
        out.push(DocumentHandle {
            doc,
            frame_element: Some((parent, frame.id())),
            role: DocumentRole::Frame,
            address,
            frame_name: frame_name(frame),
            reachable,
            depth,
            ordinal,
        });
        if let Some(index) = doc {
            visited.insert(index);
            let child_base = out[ordinal].address.clone();
            walk(page, index, child_base.as_deref(), depth + 1, max_depth, visited, out);
        }
    }
}

/// One-shot content listeners on frame elements, keyed by element identity
/// and render generation of the parent document.
#[derive(Debug, Default)]
pub struct FrameWatchers {
    armed: HashSet<(DocIndex, NodeId, u64)>,
    disconnected: bool,
}

impl FrameWatchers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a listener on every frame not already watched; returns how many
    /// were newly armed.
    pub fn watch(&mut self, page: &Page, handles: &[DocumentHandle]) -> usize {
        if self.disconnected {
            return 0;
        }
        let mut added = 0;
        for (parent, node) in handles.iter().filter_map(|h| h.frame_element) {
            let Some(generation) = page.document(parent).map(|d| d.generation()) else {
                continue;
            };
            if self.armed.insert((parent, node, generation)) {
                added += 1;
            }
        }
        added
    }

    /// Consumes the listener for `frame`; true when one was armed.
    pub fn fire(&mut self, page: &Page, parent: DocIndex, frame: NodeId) -> bool {
        if self.disconnected {
            return false;
        }
        let Some(generation) = page.document(parent).map(|d| d.generation()) else {
            return false;
        };
        self.armed.remove(&(parent, frame, generation))
    }

    pub fn armed(&self) -> usize {
        self.armed.len()
    }

    pub fn disconnect(&mut self) {
        self.armed.clear();
        self.disconnected = true;
    }

    pub fn reconnect(&mut self) {
        self.disconnected = false;
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::FrameContent;

    const MAIN: &str = r#"<iframe name="list" src="box_char.php"></iframe>
                          <iframe src="https://ads.example.net/x"></iframe>"#;

    fn page() -> Page {
        let mut page = Page::new(Some("https://mem44.com/staff/index.php"), MAIN);
        page.attach_frame_by_src(
            MAIN_DOCUMENT,
            "box_char.php",
            FrameContent::SameOrigin {
                address: None,
                html: r#"<frameset><frame name="inner" src="mailbox.php"></frameset>"#.to_owned(),
            },
        );
        page.attach_frame_by_src(
            MAIN_DOCUMENT,
            "https://ads.example.net/x",
            FrameContent::CrossOrigin { address: None },
        );
        page
    }

    #[test]
    fn enumerates_nested_frames_in_document_order() {
        let handles = enumerate_documents(&page(), 6);
        let summary: Vec<_> = handles
            .iter()
            .map(|h| (h.depth, h.reachable, h.address.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, true, Some("https://mem44.com/staff/index.php".to_owned())),
                (1, true, Some("https://mem44.com/staff/box_char.php".to_owned())),
                (2, false, Some("https://mem44.com/staff/mailbox.php".to_owned())),
                (1, false, Some("https://ads.example.net/x".to_owned())),
            ]
        );
    }

    #[test]
    fn depth_cap_stops_recursion() {
        let handles = enumerate_documents(&page(), 1);
        assert_eq!(handles.len(), 3);
    }

    #[test]
    fn watching_twice_arms_once() {
        let page = page();
        let handles = enumerate_documents(&page, 6);
        let mut watchers = FrameWatchers::new();
        assert_eq!(watchers.watch(&page, &handles), 3);
        assert_eq!(watchers.watch(&page, &handles), 0);
        let (parent, node) = handles[1].frame_element.unwrap();
        assert!(watchers.fire(&page, parent, node));
        assert!(!watchers.fire(&page, parent, node));
        assert_eq!(watchers.armed(), 2);
        watchers.disconnect();
        assert_eq!(watchers.armed(), 0);
        assert_eq!(watchers.watch(&page, &handles), 0);
    }
}
