//! Serializable outline of a box tree.

use crate::boxes::Mp4Box;
use serde::Serialize;

/// JSON-serializable outline of a decoded box tree.
///
/// Offsets are those of the encoded layout: children always sit at the end
/// of their parent's payload, after any fixed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxSummary {
    pub offset: u64,
    pub size: u64,
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BoxSummary>,
}

/// Summarize `boxes`, laid out back to back from `offset`.
///
/// `max_depth` limits how many levels below `boxes` are included; `None` walks the whole tree.
pub fn summarize(boxes: &[Box<dyn Mp4Box>], offset: u64, max_depth: Option<usize>) -> Vec<BoxSummary> {
    let mut out = Vec::with_capacity(boxes.len());
    let mut pos = offset;
    for b in boxes {
        let size = b.size();
        let children = match max_depth {
            Some(0) => Vec::new(),
            depth => {
                let kids = b.children();
                let kids_size: u64 = kids.iter().map(|c| c.size()).sum();
                summarize(kids, pos + size - kids_size, depth.map(|d| d - 1))
            }
        };
        out.push(BoxSummary {
            offset: pos,
            size,
            typ: b.box_type().to_string(),
            children,
        });
        pos += size;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::FourCC;
    use crate::kinds::{ContainerBox, FreeBox, StsdBox, VisualSampleEntryBox};

    #[test]
    fn offsets_follow_encoded_layout() {
        let mut stsd = StsdBox::default();
        stsd.add_entry(Box::new(VisualSampleEntryBox::new(FourCC(*b"avc1"), 640, 480)));
        let stbl = ContainerBox::new(FourCC(*b"stbl")).with_child(stsd);
        let boxes: Vec<Box<dyn Mp4Box>> = vec![Box::new(FreeBox::zeroed(4)), Box::new(stbl)];

        let s = summarize(&boxes, 0, None);
        assert_eq!(s[0].offset, 0);
        assert_eq!(s[0].size, 12);
        assert_eq!(s[1].offset, 12);
        let stsd = &s[1].children[0];
        assert_eq!(stsd.offset, 20);
        // header (8) + full box header (4) + entry count (4)
        assert_eq!(stsd.children[0].offset, 36);
        assert_eq!(stsd.children[0].typ, "avc1");
    }

    #[test]
    fn depth_limit_drops_children() {
        let moov = ContainerBox::new(FourCC(*b"moov")).with_child(ContainerBox::new(FourCC(*b"trak")));
        let boxes: Vec<Box<dyn Mp4Box>> = vec![Box::new(moov)];
        assert!(summarize(&boxes, 0, Some(0))[0].children.is_empty());
        assert_eq!(summarize(&boxes, 0, Some(1))[0].children.len(), 1);

        let json = serde_json::to_string(&summarize(&boxes, 0, Some(0))).unwrap();
        assert_eq!(json, r#"[{"offset":0,"size":16,"type":"moov"}]"#);
    }
}
