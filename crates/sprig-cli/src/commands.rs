use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use sprig_sdk::config::KEYS;
use sprig_sdk::{Object, ObjectId, Repository, Tree};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot read current directory")?,
    };

    match cli.command {
        Command::Init(args) => cmd_init(&dir, args),
        Command::HashObject(args) => cmd_hash_object(&dir, args),
        Command::CatFile(args) => cmd_cat_file(&dir, args),
        Command::LsTree(args) => cmd_ls_tree(&dir, args),
        Command::WriteTree(_) => cmd_write_tree(&dir),
        Command::CommitTree(args) => cmd_commit_tree(&dir, args),
        Command::Commit(args) => cmd_commit(&dir, args),
        Command::Config(args) => cmd_config(&dir, args),
        Command::Fsck(_) => cmd_fsck(&dir),
    }
}

fn cmd_init(dir: &Path, args: InitArgs) -> anyhow::Result<()> {
    let path = match args.path {
        Some(path) => dir.join(path),
        None => dir.to_path_buf(),
    };
    fs::create_dir_all(&path).with_context(|| format!("cannot create {}", path.display()))?;
    Repository::init(&path)?;
    println!(
        "{} Initialized empty sprig repository in {}",
        "✓".green().bold(),
        path.join(sprig_sdk::METADATA_DIR).display().to_string().bold()
    );
    Ok(())
}

fn cmd_hash_object(dir: &Path, args: HashObjectArgs) -> anyhow::Result<()> {
    // Hashing alone works outside a repository.
    let repo = if args.write { Some(Repository::discover(dir)?) } else { None };

    for file in &args.files {
        let path = resolve_path(dir, file);
        let data = fs::read(&path).with_context(|| format!("cannot read {}", path.display()))?;
        let id = match &repo {
            Some(repo) => repo.hash_object(&data, true)?,
            None => sprig_sdk::Record::new(sprig_sdk::Blob::new(&data)).oid(),
        };
        println!("{id}");
    }
    Ok(())
}

fn cmd_cat_file(dir: &Path, args: CatFileArgs) -> anyhow::Result<()> {
    let repo = Repository::discover(dir)?;
    let id = repo.resolve(&args.object)?;

    if args.mode.kind {
        println!("{}", repo.kind(&id)?);
        return Ok(());
    }

    let record = repo.read(&id)?;
    if args.mode.size {
        println!("{}", record.len());
        return Ok(());
    }

    let mut out = io::stdout().lock();
    match record.object() {
        Object::Blob(blob) => out.write_all(blob.data())?,
        Object::Tree(tree) => print_tree(&repo, tree, &mut out)?,
        Object::Commit(_) => out.write_all(record.body())?,
    }
    out.flush()?;
    Ok(())
}

fn cmd_ls_tree(dir: &Path, args: LsTreeArgs) -> anyhow::Result<()> {
    let repo = Repository::discover(dir)?;
    let id = repo.resolve(&args.tree)?;
    let mut out = io::stdout().lock();
    for item in repo.ls_tree(&id)? {
        write_listing(&mut out, item.mode.mode_bits(), &item.kind.to_string(), &item.id, &item.name)?;
    }
    Ok(())
}

fn cmd_write_tree(dir: &Path) -> anyhow::Result<()> {
    let repo = Repository::discover(dir)?;
    println!("{}", repo.write_tree()?);
    Ok(())
}

fn cmd_commit_tree(dir: &Path, args: CommitTreeArgs) -> anyhow::Result<()> {
    let repo = Repository::discover(dir)?;
    let tree = repo.resolve(&args.tree)?;
    let parents = resolve_all(&repo, &args.parents)?;
    println!("{}", repo.commit_tree(tree, &parents, &args.message)?);
    Ok(())
}

fn cmd_commit(dir: &Path, args: CommitArgs) -> anyhow::Result<()> {
    let repo = Repository::discover(dir)?;
    let parents = resolve_all(&repo, &args.parents)?;
    let id = repo.commit(&parents, &args.message)?;
    let summary = args.message.lines().next().unwrap_or("");
    let kind = if parents.is_empty() { "root-commit" } else { "commit" };
    println!("[{} {}] {}", kind.cyan(), id.short_hex().yellow(), summary);
    Ok(())
}

fn cmd_config(dir: &Path, args: ConfigArgs) -> anyhow::Result<()> {
    let mut repo = Repository::discover(dir)?;
    match (args.key, args.value) {
        (None, _) => {
            for key in KEYS {
                match repo.config().get(key)? {
                    Some(value) => println!("{} = {}", key.bold(), value),
                    None => println!("{} = {}", key.bold(), "(unset)".dimmed()),
                }
            }
        }
        (Some(key), None) => match repo.config().get(&key)? {
            Some(value) => println!("{value}"),
            None => anyhow::bail!("{key} is not set"),
        },
        (Some(key), Some(value)) => {
            repo.set_config(&key, &value)?;
            println!("{} {} = {}", "✓".green().bold(), key.bold(), value);
        }
    }
    Ok(())
}

fn cmd_fsck(dir: &Path) -> anyhow::Result<()> {
    let repo = Repository::discover(dir)?;
    let report = repo.verify()?;
    if report.is_valid() {
        println!("{} {} objects verified, no issues", "✓".green().bold(), report.checked);
        return Ok(());
    }

    for violation in &report.violations {
        println!(
            "{} {} {:?}: {}",
            "✗".red().bold(),
            violation.id.to_string().yellow(),
            violation.kind,
            violation.description
        );
    }
    anyhow::bail!(
        "{} of {} objects have problems",
        report.violations.len(),
        report.checked
    )
}

fn resolve_path(dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() { file.to_path_buf() } else { dir.join(file) }
}

fn resolve_all(repo: &Repository, specs: &[String]) -> anyhow::Result<Vec<ObjectId>> {
    specs
        .iter()
        .map(|spec| repo.resolve(spec).map_err(anyhow::Error::from))
        .collect()
}

fn print_tree(repo: &Repository, tree: &Tree, out: &mut impl Write) -> anyhow::Result<()> {
    for entry in tree.entries() {
        let kind = repo.kind(&entry.object_id)?;
        write_listing(out, entry.mode.mode_bits(), kind.as_str(), &entry.object_id, &entry.name)?;
    }
    Ok(())
}

fn write_listing(
    out: &mut impl Write,
    mode: u32,
    kind: &str,
    id: &ObjectId,
    name: &[u8],
) -> io::Result<()> {
    write!(out, "{mode:06o} {kind} {id}\t")?;
    out.write_all(name)?;
    writeln!(out)
}
