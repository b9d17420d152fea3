//! Thin wrappers around the system `git` command.
//!
//! Every function takes the working directory it operates on and either
//! returns parsed output or an [`Error::GitCommand`] carrying git's stderr.
//! The system binary is used on purpose: SSH keys, credential helpers and
//! anything else configured in `~/.gitconfig` keep working for `clone` and
//! `fetch`.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use log::debug;

use crate::backend::Identity;
use crate::error::{Error, Result};

fn command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir)
        .args(args)
        // Never wait on an interactive credential prompt.
        .env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

fn command_error(dir: &Path, args: &[&str], message: String) -> Error {
    Error::GitCommand {
        command: args.join(" "),
        path: dir.display().to_string(),
        stderr: message,
    }
}

fn failure(dir: &Path, args: &[&str], output: &Output) -> Error {
    // `git am` and `git merge-base` report some failures on stdout only
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let message = if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    };
    command_error(dir, args, message)
}

fn spawn(dir: &Path, args: &[&str], envs: &[(&str, String)], stdin: Option<&[u8]>) -> Result<Output> {
    debug!("git {} (in {})", args.join(" "), dir.display());

    let mut cmd = command(dir, args);
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let output = match stdin {
        None => cmd.output(),
        Some(input) => {
            cmd.stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            let mut child = cmd
                .spawn()
                .map_err(|e| command_error(dir, args, e.to_string()))?;
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input)?;
            }
            child.wait_with_output()
        }
    };

    output.map_err(|e| command_error(dir, args, e.to_string()))
}

fn run_bytes(dir: &Path, args: &[&str], envs: &[(&str, String)], stdin: Option<&[u8]>) -> Result<Vec<u8>> {
    let output = spawn(dir, args, envs, stdin)?;
    if !output.status.success() {
        return Err(failure(dir, args, &output));
    }
    Ok(output.stdout)
}

fn run_with(dir: &Path, args: &[&str], envs: &[(&str, String)]) -> Result<String> {
    let stdout = run_bytes(dir, args, envs, None)?;
    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

fn run(dir: &Path, args: &[&str]) -> Result<String> {
    run_with(dir, args, &[])
}

/// Runs a command whose exit code 1 means "no" rather than failure.
fn run_predicate(dir: &Path, args: &[&str]) -> Result<Option<String>> {
    let output = spawn(dir, args, &[], None)?;
    match output.status.code() {
        Some(0) => Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string())),
        Some(1) => Ok(None),
        _ => Err(failure(dir, args, &output)),
    }
}

fn author_env(identity: &Identity, date: Option<&str>) -> Vec<(&'static str, String)> {
    let mut envs = vec![
        ("GIT_AUTHOR_NAME", identity.name.clone()),
        ("GIT_AUTHOR_EMAIL", identity.email.clone()),
    ];
    if let Some(date) = date {
        envs.push(("GIT_AUTHOR_DATE", date.to_string()));
    }
    envs
}

fn committer_env(identity: &Identity, date: Option<&str>) -> Vec<(&'static str, String)> {
    let mut envs = vec![
        ("GIT_COMMITTER_NAME", identity.name.clone()),
        ("GIT_COMMITTER_EMAIL", identity.email.clone()),
    ];
    if let Some(date) = date {
        envs.push(("GIT_COMMITTER_DATE", date.to_string()));
    }
    envs
}

/// Clone `source` into `dest`, creating parent directories as needed.
pub fn clone(source: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let dest_arg = dest.to_string_lossy();
    // Relative sources resolve against the process working directory.
    run(Path::new("."), &["clone", "--quiet", source, &dest_arg])?;
    Ok(())
}

/// Whether `dir` is the top level of a git working copy.
///
/// A directory nested inside some other repository does not count.
pub fn is_repository(dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    let Ok(toplevel) = run(dir, &["rev-parse", "--show-toplevel"]) else {
        return false;
    };
    match (fs::canonicalize(toplevel.trim()), fs::canonicalize(dir)) {
        (Ok(top), Ok(here)) => top == here,
        _ => false,
    }
}

/// Fetch `origin`, force-checkout `branch` at the remote tip and hard reset.
///
/// Tags are not fetched so local tag markers are never clobbered by upstream.
pub fn fetch_and_hard_reset_to_remote(dir: &Path, branch: &str) -> Result<()> {
    let remote_ref = format!("refs/remotes/origin/{}", branch);
    run(dir, &["fetch", "--quiet", "--no-tags", "origin"])?;
    run(dir, &["checkout", "--quiet", "--force", "-B", branch, &remote_ref])?;
    run(dir, &["reset", "--quiet", "--hard", &remote_ref])?;
    Ok(())
}

/// Delete untracked files and directories; ignored files are kept.
pub fn remove_untracked(dir: &Path) -> Result<()> {
    run(dir, &["clean", "--quiet", "--force", "-d"])?;
    Ok(())
}

pub fn checkout(dir: &Path, reference: &str) -> Result<()> {
    run(dir, &["checkout", "--quiet", reference])?;
    Ok(())
}

/// Name of the checked-out branch, `None` when `HEAD` is detached.
pub fn current_branch(dir: &Path) -> Result<Option<String>> {
    run_predicate(dir, &["symbolic-ref", "--quiet", "--short", "HEAD"])
}

/// Create `name` at `HEAD` and switch to it.
pub fn create_branch(dir: &Path, name: &str) -> Result<()> {
    run(dir, &["checkout", "--quiet", "-b", name])?;
    Ok(())
}

pub fn delete_branch(dir: &Path, name: &str) -> Result<()> {
    run(dir, &["branch", "--quiet", "-D", name])?;
    Ok(())
}

/// Local branches matching a `for-each-ref` pattern relative to `refs/heads/`.
pub fn list_branches(dir: &Path, pattern: &str) -> Result<Vec<String>> {
    let refs_pattern = format!("refs/heads/{}", pattern);
    let stdout = run(dir, &["for-each-ref", "--format=%(refname)", &refs_pattern])?;
    Ok(stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("refs/heads/"))
        .map(str::to_string)
        .collect())
}

pub fn is_ancestor(dir: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
    Ok(run_predicate(dir, &["merge-base", "--is-ancestor", ancestor, descendant])?.is_some())
}

/// Commit id a tag points at (peeled through annotated tags), if the tag exists.
pub fn resolve_tag(dir: &Path, name: &str) -> Result<Option<String>> {
    let spec = format!("refs/tags/{}^{{commit}}", name);
    let output = spawn(dir, &["rev-parse", "--quiet", "--verify", &spec], &[], None)?;
    if output.status.success() {
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    } else {
        Ok(None)
    }
}

/// Full commit id of any revision expression.
pub fn rev_parse(dir: &Path, reference: &str) -> Result<String> {
    let spec = format!("{}^{{commit}}", reference);
    Ok(run(dir, &["rev-parse", "--verify", &spec])?.trim().to_string())
}

/// Tag refs as `(name, commit, annotated)`, annotated tags peeled to their commit.
fn tag_targets(dir: &Path) -> Result<Vec<(String, String, bool)>> {
    let stdout = run(
        dir,
        &[
            "for-each-ref",
            "--format=%(refname) %(objectname) %(*objectname)",
            "refs/tags",
        ],
    )?;

    let mut tags = Vec::new();
    for line in stdout.lines() {
        let mut fields = line.split_whitespace();
        let (Some(refname), Some(object)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Some(name) = refname.strip_prefix("refs/tags/") else {
            continue;
        };
        match fields.next() {
            Some(peeled) => tags.push((name.to_string(), peeled.to_string(), true)),
            None => tags.push((name.to_string(), object.to_string(), false)),
        }
    }
    Ok(tags)
}

/// Tags reachable from `HEAD`, ordered from the tip backwards.
///
/// Tags sharing one commit are listed by name.
pub fn list_tags_newest_first(dir: &Path) -> Result<Vec<String>> {
    let mut by_commit: HashMap<String, Vec<String>> = HashMap::new();
    for (name, commit, _) in tag_targets(dir)? {
        by_commit.entry(commit).or_default().push(name);
    }
    if by_commit.is_empty() {
        return Ok(Vec::new());
    }

    let history = run(dir, &["rev-list", "--topo-order", "HEAD"])?;
    let mut ordered = Vec::new();
    for commit in history.lines() {
        if let Some(names) = by_commit.get_mut(commit.trim()) {
            names.sort();
            ordered.append(names);
        }
    }
    Ok(ordered)
}

/// Stage everything except ignored files and commit it.
pub fn commit_all(dir: &Path, author: &Identity, committer: &Identity, message: &str) -> Result<()> {
    run(dir, &["add", "--all"])?;

    let mut envs = author_env(author, None);
    envs.extend(committer_env(committer, None));
    run_with(
        dir,
        &[
            "-c",
            "commit.gpgsign=false",
            "commit",
            "--quiet",
            "--no-verify",
            "-m",
            message,
        ],
        &envs,
    )?;
    Ok(())
}

/// Tracked modifications or untracked, non-ignored files are present.
pub fn has_uncommitted_changes(dir: &Path) -> Result<bool> {
    Ok(!run(dir, &["status", "--porcelain"])?.trim().is_empty())
}

/// Stash tracked and untracked changes. Returns whether anything was stashed.
pub fn stash(dir: &Path, identity: &Identity) -> Result<bool> {
    if !has_uncommitted_changes(dir)? {
        return Ok(false);
    }
    let mut envs = author_env(identity, None);
    envs.extend(committer_env(identity, None));
    run_with(
        dir,
        &[
            "stash",
            "push",
            "--quiet",
            "--include-untracked",
            "-m",
            "patchstack: uncommitted changes",
        ],
        &envs,
    )?;
    Ok(true)
}

pub fn stash_pop(dir: &Path) -> Result<()> {
    run(dir, &["stash", "pop", "--quiet", "--index"])?;
    Ok(())
}

/// Fields of a commit object that the rewrite carries over.
#[derive(Debug, PartialEq, Eq)]
struct CommitObject {
    tree: String,
    parents: Vec<String>,
    author_name: String,
    author_email: String,
    /// Raw `<seconds> <offset>` author timestamp.
    author_date: String,
    /// Message encoding, present only when it is not UTF-8.
    encoding: Option<String>,
    message: Vec<u8>,
}

fn parse_ident(value: &str) -> Option<(String, String, String)> {
    let open = value.find('<')?;
    let close = value.rfind('>')?;
    if close < open {
        return None;
    }
    let name = value[..open].trim().to_string();
    let email = value[open + 1..close].to_string();
    let date = value[close + 1..].trim().to_string();
    Some((name, email, date))
}

fn parse_commit_object(raw: &[u8]) -> Option<CommitObject> {
    let split = raw.windows(2).position(|w| w == b"\n\n");
    let (header, message) = match split {
        Some(at) => (&raw[..at], raw[at + 2..].to_vec()),
        None => (raw, Vec::new()),
    };
    let header = String::from_utf8_lossy(header);

    let mut tree = None;
    let mut parents = Vec::new();
    let mut author = None;
    let mut encoding = None;
    for line in header.lines() {
        if let Some(value) = line.strip_prefix("tree ") {
            tree = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("parent ") {
            parents.push(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("author ") {
            author = parse_ident(value);
        } else if let Some(value) = line.strip_prefix("encoding ") {
            encoding = Some(value.trim().to_string());
        }
    }

    let (author_name, author_email, author_date) = author?;
    Some(CommitObject {
        tree: tree?,
        parents,
        author_name,
        author_email,
        author_date,
        encoding,
        message,
    })
}

/// Recreate every commit in `start..end` with `committer` as committer and the
/// author timestamp as commit timestamp.
///
/// `HEAD` and tags pointing at rewritten commits are moved to the new ids;
/// trees are unchanged so the index and working tree need no update.
/// Returns how many commits received a new id; zero means the range was
/// already normalized.
pub fn rewrite_committer_metadata(dir: &Path, start: &str, end: &str, committer: &Identity) -> Result<usize> {
    let range = format!("{}..{}", start, end);
    let history = run(dir, &["rev-list", "--reverse", "--topo-order", &range])?;

    let mut rewritten: HashMap<String, String> = HashMap::new();
    for sha in history.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let raw = run_bytes(dir, &["cat-file", "commit", sha], &[], None)?;
        let commit = parse_commit_object(&raw).ok_or_else(|| {
            command_error(dir, &["cat-file", "commit", sha], "unparseable commit object".to_string())
        })?;

        let parents: Vec<String> = commit
            .parents
            .iter()
            .map(|p| rewritten.get(p).cloned().unwrap_or_else(|| p.clone()))
            .collect();

        let encoding = commit
            .encoding
            .as_ref()
            .map(|e| format!("i18n.commitEncoding={}", e));
        let mut args = vec!["-c", "commit.gpgsign=false"];
        if let Some(encoding) = &encoding {
            args.push("-c");
            args.push(encoding);
        }
        args.push("commit-tree");
        args.push(commit.tree.as_str());
        for parent in &parents {
            args.push("-p");
            args.push(parent);
        }

        let date = format!("@{}", commit.author_date);
        let author = Identity {
            name: commit.author_name.clone(),
            email: commit.author_email.clone(),
        };
        let mut envs = author_env(&author, Some(&date));
        envs.extend(committer_env(committer, Some(&date)));

        let stdout = run_bytes(dir, &args, &envs, Some(&commit.message))?;
        let new_sha = String::from_utf8_lossy(&stdout).trim().to_string();
        rewritten.insert(sha.to_string(), new_sha);
    }

    let changed: HashMap<&String, &String> = rewritten.iter().filter(|(old, new)| old != new).collect();
    if changed.is_empty() {
        return Ok(0);
    }

    let head = rev_parse(dir, "HEAD")?;
    if let Some(new_head) = changed.get(&head) {
        run(
            dir,
            &["update-ref", "-m", "patchstack: normalize committer", "HEAD", new_head.as_str(), &head],
        )?;
    }

    for (name, commit, annotated) in tag_targets(dir)? {
        if let Some(new_commit) = changed.get(&commit) {
            if annotated {
                debug!("tag {} is annotated; replacing it with a lightweight tag", name);
            }
            let refname = format!("refs/tags/{}", name);
            run(dir, &["update-ref", &refname, new_commit.as_str()])?;
        }
    }

    Ok(changed.len())
}

/// Write one `NNNN-<subject>.patch` file per commit in `start..end` into
/// `output_dir`, returning the written paths in sequence order.
pub fn export_patch_series(dir: &Path, start: &str, end: &str, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let range = format!("{}..{}", start, end);
    let out_arg = output_dir.to_string_lossy();
    let stdout = run(
        dir,
        &[
            "format-patch",
            "--no-signature",
            "--output-directory",
            &out_arg,
            &range,
        ],
    )?;

    Ok(stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            let path = PathBuf::from(l);
            if path.is_absolute() {
                path
            } else {
                dir.join(path)
            }
        })
        .collect())
}

/// Apply one mailbox-format patch as a new commit on `HEAD`.
///
/// On failure the `git am` session is left in place for inspection; see
/// [`has_pending_apply`] and [`quit_pending_apply`].
pub fn apply_patch(dir: &Path, patch: &Path, committer: &Identity) -> Result<()> {
    let patch_arg = patch.to_string_lossy();
    run_with(
        dir,
        &[
            "-c",
            "commit.gpgsign=false",
            "am",
            "--quiet",
            "--committer-date-is-author-date",
            &patch_arg,
        ],
        &committer_env(committer, None),
    )?;
    Ok(())
}

/// Whether an interrupted `git am` session is waiting in `dir`.
pub fn has_pending_apply(dir: &Path) -> Result<bool> {
    let state_dir = PathBuf::from(run(dir, &["rev-parse", "--git-path", "rebase-apply"])?.trim());
    let state_dir = if state_dir.is_absolute() {
        state_dir
    } else {
        dir.join(state_dir)
    };
    Ok(state_dir.is_dir())
}

/// Drop an interrupted `git am` session. `HEAD`, index and working tree are
/// left as they are.
pub fn quit_pending_apply(dir: &Path) -> Result<()> {
    run(dir, &["am", "--quit"])?;
    Ok(())
}
