//! Writes a processed `Content` tree out as real files and directories,
//! ported from `memio.c`'s `saveContent` plus `os.c`'s `setFileTime` /
//! `safeMkdir`.
//!
//! The original also restores file ownership and permissions on POSIX;
//! CP/M carries neither concept, so (unlike the teacher's own
//! `util/file_status.rs`, which restores uid/gid/mode alongside mtime) this
//! only ever touches the modification time (see `DESIGN.md`).

use std::fs;
use std::path::Path;

use filetime::FileTime;

use crate::content::{Content, Kind, Timestamp};

/// Recursively saves `node` (and, for a `Library`, every descendant) under
/// whatever `save_path` [`crate::sink::mapping::assign_names`] already
/// assigned. Returns `false` if any file or directory failed to write, but
/// keeps going rather than aborting the whole tree.
pub fn save_tree(node: &Content) -> bool {
    match node.kind {
        Kind::Skipped | Kind::Missing => true,
        Kind::Library => save_library(node),
        _ => save_leaf(node),
    }
}

fn save_library(node: &Content) -> bool {
    let mut ok = true;
    if let Some(path) = &node.save_path {
        match fs::create_dir_all(path) {
            Ok(()) => set_mtime(path, node.output.fdate),
            Err(e) => {
                crate::displaylevel!(1, "{} - cannot create sub directory ({e})\n", path.display());
                ok = false;
            }
        }
    }
    for child in &node.children {
        ok = save_tree(child) && ok;
    }
    ok
}

fn save_leaf(node: &Content) -> bool {
    let Some(path) = &node.save_path else {
        return true;
    };
    let (ok, err) = match fs::write(path, &node.output.buf) {
        Ok(()) => {
            set_mtime(path, node.output.fdate);
            (true, String::new())
        }
        Err(e) => {
            let _ = fs::remove_file(path);
            (false, format!(" - problem writing file ({e})"))
        }
    };
    report(node, path, &err);
    ok
}

fn set_mtime(path: &Path, fdate: Option<Timestamp>) {
    if let Some(fdate) = fdate {
        let ft = FileTime::from_unix_time(fdate, 0);
        let _ = filetime::set_file_mtime(path, ft);
    }
}

/// Prints the `orig -> saved` rename notice (or just the error, if the name
/// was not mapped), mirroring `saveContent`'s `nameCmp`-gated `printf`.
fn report(node: &Content, path: &Path, err: &str) {
    let saved = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let original = node.output.fname.as_deref().unwrap_or("");
    if !saved.eq_ignore_ascii_case(original) {
        crate::displayout!("{original} -> {}{err}\n", path.display());
    } else if !err.is_empty() {
        crate::displayout!("{}{err}\n", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::mapping::{assign_names, finalize_info_file, new_info_file};
    use crate::naming::CollisionTable;
    use std::path::PathBuf;

    #[test]
    fn writes_a_plain_file_and_sets_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let body = b"hello world".to_vec();
        let mut c = Content::new(Kind::Stored, &body, "hello.txt".into(), None);
        c.output.fname = Some("hello.txt".into());
        c.output.buf = body.clone();
        c.output.fdate = Some(1_700_000_000);

        let mut table = CollisionTable::new();
        let mut info = new_info_file("hello.txt");
        assign_names(&mut c, dir.path(), &mut table, false, &mut info);

        assert!(save_tree(&c));
        let saved_path = c.save_path.clone().unwrap();
        assert_eq!(fs::read(&saved_path).unwrap(), body);
    }

    #[test]
    fn library_creates_subdirectory_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        let empty: &[u8] = &[];
        let mut lib = Content::new(Kind::Library, empty, "inner.lbr".into(), None);
        lib.output.fname = Some("inner.lbr".into());
        let body = b"member data".to_vec();
        let mut member = Content::new(Kind::Stored, &body, "member.txt".into(), None);
        member.output.fname = Some("member.txt".into());
        member.output.buf = body.clone();
        lib.children.push(member);

        let mut table = CollisionTable::new();
        let mut info = new_info_file("inner.lbr");
        assign_names(&mut lib, dir.path(), &mut table, false, &mut info);

        assert!(save_tree(&lib));
        let sub_dir = lib.save_path.clone().unwrap();
        assert!(sub_dir.is_dir());
        assert_eq!(fs::read(sub_dir.join("member.txt")).unwrap(), body);
    }

    #[test]
    fn skipped_node_has_no_save_path_and_is_a_no_op() {
        let mut c = Content::new(Kind::Skipped, &[], "dead.txt".into(), None);
        c.save_path = Some(PathBuf::from("/should/never/be/touched"));
        assert!(save_tree(&c));
    }

    #[test]
    fn finalize_info_file_is_written_alongside_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = CollisionTable::new();
        let mut info = new_info_file("a.lbr");
        info.out_str("!! something went missing\n");
        finalize_info_file(&mut info, dir.path(), &mut table);
        assert!(save_tree(&info));
        let path = info.save_path.unwrap();
        assert!(fs::read_to_string(path).unwrap().contains("something went missing"));
    }
}
