//! Saved page snapshots.
//!
//! A snapshot directory holds `snapshot.ron` plus the HTML files it names:
//!
//! ```ron
//! (
//!     address: Some("https://site.test/staff/index.php"),
//!     file: "index.html",
//!     frames: [
//!         (src: "box_char.php", source: File(path: "box_char.html")),
//!         (src: "https://ads.partner.test/banner", source: CrossOrigin),
//!     ],
//! )
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use assist_engine::{resolve_address, DocIndex, FrameContent, Page, MAIN_DOCUMENT};
use assist_logging::assist_warn;
use serde::Deserialize;

pub(crate) const SNAPSHOT_FILE: &str = "snapshot.ron";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) enum FrameSource {
    File {
        path: PathBuf,
        #[serde(default)]
        address: Option<String>,
    },
    CrossOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct FrameEntry {
    /// The `src` attribute of the frame element in its parent.
    pub src: String,
    pub source: FrameSource,
    #[serde(default)]
    pub frames: Vec<FrameEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(default)]
    pub address: Option<String>,
    pub file: PathBuf,
    #[serde(default)]
    pub frames: Vec<FrameEntry>,
    #[serde(skip)]
    dir: PathBuf,
}

impl Snapshot {
    pub(crate) fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SNAPSHOT_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading snapshot description {}", path.display()))?;
        let mut snapshot: Snapshot = ron::from_str(&content)
            .with_context(|| format!("parsing snapshot description {}", path.display()))?;
        snapshot.dir = dir.to_path_buf();
        Ok(snapshot)
    }

    pub(crate) fn main_path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }

    pub(crate) fn main_html(&self) -> Result<String> {
        read_html(&self.main_path())
    }

    pub(crate) fn build_page(&self) -> Result<Page> {
        let mut page = Page::new(self.address.as_deref(), &self.main_html()?);
        self.attach_frames(&mut page)?;
        Ok(page)
    }

    /// Loads every described frame into `page`, depth first.
    pub(crate) fn attach_frames(&self, page: &mut Page) -> Result<()> {
        let base = self.address.clone();
        self.attach_level(page, MAIN_DOCUMENT, base.as_deref(), &self.frames)
    }

    fn attach_level(
        &self,
        page: &mut Page,
        parent: DocIndex,
        parent_address: Option<&str>,
        frames: &[FrameEntry],
    ) -> Result<()> {
        for frame in frames {
            let content = match &frame.source {
                FrameSource::CrossOrigin => FrameContent::CrossOrigin { address: None },
                FrameSource::File { path, address } => FrameContent::SameOrigin {
                    address: address
                        .clone()
                        .or_else(|| resolve_address(parent_address, &frame.src)),
                    html: read_html(&self.dir.join(path))?,
                },
            };
            let address = match &content {
                FrameContent::SameOrigin { address, .. } => address.clone(),
                FrameContent::CrossOrigin { .. } => None,
            };
            match page.attach_frame_by_src(parent, &frame.src, content) {
                Some(doc) => self.attach_level(page, doc, address.as_deref(), &frame.frames)?,
                None if matches!(frame.source, FrameSource::File { .. }) => {
                    assist_warn!("No frame with src {:?} in document {}", frame.src, parent);
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Latest modification time over the description and all named files.
    pub(crate) fn modified(&self) -> Option<SystemTime> {
        let mut paths = vec![self.dir.join(SNAPSHOT_FILE), self.main_path()];
        collect_frame_paths(&self.dir, &self.frames, &mut paths);
        paths
            .iter()
            .filter_map(|p| fs::metadata(p).and_then(|m| m.modified()).ok())
            .max()
    }
}

fn collect_frame_paths(dir: &Path, frames: &[FrameEntry], out: &mut Vec<PathBuf>) {
    for frame in frames {
        if let FrameSource::File { path, .. } = &frame.source {
            out.push(dir.join(path));
        }
        collect_frame_paths(dir, &frame.frames, out);
    }
}

fn read_html(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading page file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assist_engine::enumerate_documents;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn nested_frames_are_attached_depth_first() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            SNAPSHOT_FILE,
            r#"(
                address: Some("https://site.test/staff/index.php"),
                file: "index.html",
                frames: [
                    (
                        src: "box_char.php",
                        source: File(path: "box_char.html"),
                        frames: [(src: "mail_send.php", source: File(path: "compose.html"))],
                    ),
                    (src: "https://ads.partner.test/banner", source: CrossOrigin),
                ],
            )"#,
        );
        write(
            dir.path(),
            "index.html",
            r#"<iframe src="box_char.php"></iframe><iframe src="https://ads.partner.test/banner"></iframe>"#,
        );
        write(dir.path(), "box_char.html", r#"<iframe src="mail_send.php"></iframe>"#);
        write(dir.path(), "compose.html", "<textarea name='message'></textarea>");

        let snapshot = Snapshot::load(dir.path()).unwrap();
        let page = snapshot.build_page().unwrap();
        let handles = enumerate_documents(&page, 6);

        let shape: Vec<(usize, bool, Option<String>)> = handles
            .iter()
            .map(|h| (h.depth, h.reachable, h.address.clone()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (0, true, Some("https://site.test/staff/index.php".to_owned())),
                (1, true, Some("https://site.test/staff/box_char.php".to_owned())),
                (2, true, Some("https://site.test/staff/mail_send.php".to_owned())),
                (1, false, Some("https://ads.partner.test/banner".to_owned())),
            ]
        );
        assert!(snapshot.modified().is_some());
    }

    #[test]
    fn missing_page_file_is_an_error() {
        let dir = tempdir().unwrap();
        write(dir.path(), SNAPSHOT_FILE, r#"(file: "absent.html")"#);
        let snapshot = Snapshot::load(dir.path()).unwrap();
        let err = snapshot.build_page().unwrap_err();
        assert!(err.to_string().contains("absent.html"), "{err}");
    }
}
