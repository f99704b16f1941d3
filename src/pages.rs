use std::collections::HashSet;

use log::warn;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectId};

/// One leaf of the page tree: its object identity and its (possibly
/// inherited) `/MediaBox`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRef {
    pub id: ObjectId,
    pub media_box: [f64; 4],
}

const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Walks `/Root → /Pages` depth-first, left to right, producing the ordered
/// page index. A broken tree is reported via `Error::InvalidTree`; callers
/// that tolerate a missing/invalid tree (`Document::open`) log and carry on
/// with an empty index instead of failing outright.
pub fn walk(document: &Document) -> Result<Vec<PageRef>> {
    let root_ref = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| Error::MissingRoot)?;
    let catalog = document.get_object(root_ref, false).ok_or(Error::MissingRoot)?;
    let catalog_dict = catalog.as_dict().map_err(|_| Error::MissingRoot)?;
    let pages_ref = catalog_dict
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::MissingRoot)?;

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    walk_node(document, pages_ref, DEFAULT_MEDIA_BOX, &mut out, &mut seen)?;
    Ok(out)
}

fn walk_node(
    document: &Document,
    id: ObjectId,
    inherited_media_box: [f64; 4],
    out: &mut Vec<PageRef>,
    seen: &mut HashSet<ObjectId>,
) -> Result<()> {
    if !seen.insert(id) {
        warn!("page tree cycle detected at {id:?}, stopping traversal");
        return Ok(());
    }

    let node = document.get_object(id, false).ok_or(Error::InvalidTree)?;
    let dict = node.as_dict().map_err(|_| Error::InvalidTree)?;
    let media_box = read_media_box(dict).unwrap_or(inherited_media_box);

    match dict.get_type() {
        Ok(t) if t == b"Pages" => {
            let kids = dict.get(b"Kids").and_then(Object::as_array).map_err(|_| Error::InvalidTree)?;
            for kid in kids {
                let kid_id = kid.as_reference().map_err(|_| Error::InvalidTree)?;
                walk_node(document, kid_id, media_box, out, seen)?;
            }
            Ok(())
        }
        Ok(t) if t == b"Page" => {
            out.push(PageRef { id, media_box });
            Ok(())
        }
        _ => Err(Error::InvalidTree),
    }
}

fn read_media_box(dict: &crate::dictionary::Dictionary) -> Option<[f64; 4]> {
    let arr = dict.get(b"MediaBox").and_then(Object::as_array).ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut box_values = [0.0; 4];
    for (i, value) in arr.iter().enumerate() {
        box_values[i] = value.as_f64().ok()?;
    }
    Some(box_values)
}
