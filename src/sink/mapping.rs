//! Builds the `origname.info` sidecar and assigns every node in a processed
//! tree its on-disk save name, ported from `support.c`'s `addInfoFile` /
//! `writeMapping` / `mkOsNames`.
//!
//! The original threads these through a single linked list (`content->next`)
//! and inserts the info file as a synthetic sibling node so one pass over
//! the list saves it along with everything else. This crate keeps the info
//! file as a separate `Content` returned to the caller instead of spliced
//! into `children` — `Content<'a>`'s tree is a `Vec` of real members, and
//! threading a foreign, always-synthetic node through it would leak into
//! every other piece of code that walks `children`.

use std::path::Path;

use crate::content::{Content, Kind};
use crate::naming::{replace_ext, CollisionTable};

/// Creates the (empty, not yet named on disk) info sidecar for the file
/// named `root_fname`, mirroring `addInfoFile`'s `makeDescriptor` call.
pub fn new_info_file<'a>(root_fname: &str) -> Content<'a> {
    let name = format!("{root_fname}.info");
    let mut info = Content::new(Kind::Mapping, &[], name.clone(), None);
    info.output.fname = Some(name);
    info
}

/// Assigns `node` (and, for libraries, every descendant) a collision-free
/// save path under `target_dir`, appending a mapping line to `info` for
/// every entry whose name was mapped, carries a comment, or was skipped.
///
/// `flatten` mirrors the `EXTRACT` flag in `mkOsNames`: when set, a nested
/// library's members are saved directly into `target_dir` with no
/// subdirectory of their own; when clear, each library gets its own
/// subdirectory named after itself.
pub fn assign_names<'a>(
    node: &mut Content<'a>,
    target_dir: &Path,
    table: &mut CollisionTable,
    flatten: bool,
    info: &mut Content<'a>,
) {
    match node.kind {
        Kind::Library => {
            if flatten {
                for child in &mut node.children {
                    assign_names(child, target_dir, table, flatten, info);
                }
            } else {
                let fname = replace_ext(node.output.fname.as_deref().unwrap_or(""), "");
                node.output.fname = Some(fname.clone());
                let sub_dir = table.unique_name(target_dir, &fname);
                node.save_name = Some(fname);
                node.save_path = Some(sub_dir.clone());
                write_mapping_line(info, node);
                for child in &mut node.children {
                    assign_names(child, &sub_dir, table, flatten, info);
                }
            }
        }
        Kind::Skipped | Kind::Missing => {
            write_mapping_line(info, node);
        }
        _ => {
            let fname = node.output.fname.clone().unwrap_or_default();
            let path = table.unique_name(target_dir, &fname);
            node.save_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            node.save_path = Some(path);
            write_mapping_line(info, node);
        }
    }
}

/// Gives the info sidecar its own save path, or downgrades it to `Skipped`
/// if nothing was ever written to it, mirroring the tail of `mkOsNames`.
pub fn finalize_info_file(info: &mut Content, target_dir: &Path, table: &mut CollisionTable) {
    if info.output.buf.is_empty() {
        info.kind = Kind::Skipped;
        return;
    }
    let fname = info.output.fname.clone().unwrap_or_default();
    let path = table.unique_name(target_dir, &fname);
    info.save_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    info.save_path = Some(path);
    let line = mapping_text(info);
    info.out_str(&line);
}

/// Builds the mapping-file text for one node, mirroring `writeMapping`.
/// Returns the empty string when nothing needs recording (the ordinary
/// case: a plain file saved under its own unmapped name).
fn mapping_text(node: &Content) -> String {
    let mut s = String::new();
    if let Some(msg) = &node.msg {
        s.push_str(msg);
    }

    let name_mapped = node.save_path.as_ref().is_some_and(|path| {
        let saved = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let original = node.output.fname.as_deref().unwrap_or("");
        !saved.eq_ignore_ascii_case(original)
    });
    let skipped = matches!(node.kind, Kind::Skipped | Kind::Missing);

    if node.comment.is_some() || name_mapped || skipped {
        if let Some(fname) = &node.output.fname {
            s.push_str(fname);
        }
        if name_mapped {
            if let Some(path) = &node.save_path {
                let saved = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                s.push_str(" <=> ");
                s.push_str(saved);
            }
        }
        if skipped {
            s.push_str(" - not saved");
        }
        if let Some(comment) = &node.comment {
            s.push_str(" -- ");
            s.push_str(comment);
        }
        s.push('\n');
    }
    s
}

fn write_mapping_line(info: &mut Content, node: &Content) {
    let line = mapping_text(node);
    if !line.is_empty() {
        info.out_str(&line);
    }
}
