//! Binary entry point for the `mlbr` command-line tool.
//!
//! Ports the post-argument-parsing section of `main()` in `main.c`: load
//! each file, drive the content graph, print the always-on listing, then
//! (depending on which of `-x`/`-d`/`-z` was given) extract to a directory,
//! a stem-named subdirectory, or a zip file. Everything here is the "sketch
//! only" external-collaborator layer spec.md keeps out of the hard core.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use mlbr::cli::Cli;
use mlbr::content::{Content, Kind, Status};
use mlbr::driver::{process_file, DriverOptions};
use mlbr::file::load_file;
use mlbr::naming::{self, replace_ext, CollisionTable};
use mlbr::sink::mapping::{assign_names, finalize_info_file, new_info_file};
use mlbr::sink::{tree, zipfile};
use mlbr::verbosity;

fn method_label(kind: Kind) -> &'static str {
    match kind {
        Kind::Squeezed => "Squeezed",
        Kind::Crunched => "Crunched",
        Kind::CrunchV1 => "CrunchV1",
        Kind::CrunchV2 => "CrunchV2",
        Kind::CrLzh => "Cr-Lzh",
        Kind::CrLzhV1 => "Cr-LzhV1",
        Kind::CrLzhV2 => "Cr-LzhV2",
        Kind::Library => "Library",
        Kind::Stored => "Stored",
        Kind::Skipped => "Skipped",
        Kind::Missing => "No Data",
        Kind::Mapping => "Mapping",
    }
}

fn is_compressed(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Squeezed | Kind::Crunched | Kind::CrunchV1 | Kind::CrunchV2 | Kind::CrLzh | Kind::CrLzhV1 | Kind::CrLzhV2
    )
}

/// `displayDate` in `main.c`: a UTC `yyyy-mm-dd hh:mm` rendering, per the
/// open question in spec.md §9 (no local-time conversion in the core).
fn display_date(ts: mlbr::content::Timestamp) -> String {
    let (y, mo, d, h, mi, _s) = mlbr::timestamp::unix_to_civil(ts);
    format!("{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}")
}

/// Recursive listing walk, mirroring `list()`'s flat traversal of the
/// linked list that `parseLbr` splices library members into right after
/// their parent — a `Content` tree's pre-order walk produces the same
/// output order.
fn list_node(node: &Content, root_fdate: Option<mlbr::content::Timestamp>) {
    let fname = node.output.fname.as_deref().unwrap_or("");
    print!("{fname:<12} {:>7} {:<9}", node.output.buf.len(), method_label(node.kind));
    if is_compressed(node.kind) {
        print!(" ({:<12} {:>7}) ", node.input.fname, node.input.buf.len());
    } else {
        print!("{:<24}", ' ');
    }
    if node.status.contains(Status::BAD_CRC) {
        print!("X");
    } else if node.status.contains(Status::NO_CRC) {
        print!("-");
    } else {
        print!(" ");
    }
    print!(" ");
    match node.output.fdate.or(root_fdate) {
        Some(ts) => print!("{}", display_date(ts)),
        None => print!("    <no date>   "),
    }
    if let Some(comment) = &node.comment {
        print!(" {comment}");
    }
    if node.kind == Kind::Library && node.children.is_empty() {
        print!("\n -- empty library --");
    }
    println!();
    for child in &node.children {
        list_node(child, root_fdate);
    }
}

fn list(root: &Content) {
    println!();
    list_node(root, root.input.fdate);
    println!();
}

/// Creates `dir` (and any missing parents), mirroring `resolveDir`.
fn resolve_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("problems creating target directory {}", dir.display()))
}

/// Splices a root `Library` node's own children directly into `target_dir`
/// instead of giving the root a subdirectory of its own — the behavior
/// `-x`/plain extract and a `-d`-with-`--no-expand` stem directory both
/// want, versus `assign_names`'s normal "every library gets its own
/// subdirectory" recursion.
///
/// `flatten_nested` controls what happens *below* the root: `false` keeps
/// `assign_names`'s usual one-subdirectory-per-library recursion for
/// deeper libraries (the `-d` case), `true` flattens every level (plain
/// `-x`, and `-d --no-expand` within the stem directory it already got).
fn assign_names_flat_root(root: &mut Content, target_dir: &Path, table: &mut CollisionTable, flatten_nested: bool, info: &mut Content) {
    if root.kind == Kind::Library {
        for child in &mut root.children {
            assign_names(child, target_dir, table, flatten_nested, info);
        }
    } else {
        assign_names(root, target_dir, table, flatten_nested, info);
    }
}

fn run_one(cli: &Cli, path: &Path) -> Result<()> {
    println!("{}:", path.display());
    let loaded = load_file(path).ok_or_else(|| anyhow::anyhow!("{}: could not be read", path.display()))?;

    let opts = DriverOptions {
        force: cli.force,
        recurse: cli.recurse,
        ignore_crc: cli.ignore_crc,
        ignore_corrupt: cli.ignore_corrupt,
    };
    let mut root = Content::new(Kind::Stored, &loaded.buf, loaded.fname.clone(), loaded.fdate);
    let save_count = process_file(&mut root, 0, &opts);

    list(&root);

    if save_count == 0 {
        return Ok(());
    }

    let user_dir = cli.dir.clone().unwrap_or_default();
    let mut table = CollisionTable::new();
    let mut info = new_info_file(&loaded.fname);

    if cli.extract || cli.extract_sub {
        let target_dir = if cli.extract_sub {
            user_dir.join(replace_ext(&loaded.fname, ""))
        } else {
            user_dir.clone()
        };
        resolve_dir(&target_dir)?;
        if cli.extract_sub && cli.expand_nested() {
            assign_names(&mut root, &target_dir, &mut table, false, &mut info);
        } else {
            // Plain `-x` flattens every level; `-d --no-expand` gives the
            // stem directory itself but flattens everything beneath it.
            assign_names_flat_root(&mut root, &target_dir, &mut table, true, &mut info);
        }
        finalize_info_file(&mut info, &target_dir, &mut table);
        if !(tree::save_tree(&root) && tree::save_tree(&info)) {
            anyhow::bail!("{}: one or more members could not be saved", path.display());
        }
    } else if cli.zip {
        resolve_dir(&user_dir)?;
        assign_names(&mut root, &user_dir, &mut table, false, &mut info);
        finalize_info_file(&mut info, &user_dir, &mut table);
        let zip_path: PathBuf = user_dir.join(replace_ext(&loaded.fname, ".zip"));
        zipfile::write_zip(&root, &zip_path).with_context(|| format!("{}: failed writing zip", zip_path.display()))?;
        if !tree::save_tree(&info) {
            anyhow::bail!("{}: failed writing info sidecar", path.display());
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    verbosity::set_level(2 + cli.verbose as u32);
    naming::set_keep_case(cli.keep_case);

    let mut ok = true;
    for path in &cli.files {
        if let Err(e) = run_one(&cli, path) {
            eprintln!("mlbr: {e:#}");
            ok = false;
        }
    }

    std::process::exit(if ok { 0 } else { 1 });
}
