//! # Glob
//!
//! Pattern search over any registered backend.
//!
//! ## Pattern Syntax
//!
//! | Form | Meaning |
//! |------|---------|
//! | `{a,b}` | Alternatives, expanded before matching |
//! | `%%name%%` | Replaced by every value bound to `name` |
//! | `*`, `?`, `[..]` | Wildcards within one path component |
//! | `**` / `**N` | Any descendants, up to `N` levels deep (default 3) |
//!
//! Patterns are split on the separator and merged into a prefix tree, so
//! `/etc/*.conf` and `/etc/ssh/*` list `/etc` only once.
//!
//! ```rust,no_run
//! use irfs::{Glob, GlobOptions, Session};
//!
//! let session = Session::default();
//! let glob = Glob::new(&session, GlobOptions::from_session(&session));
//! for info in glob.collect(&["/etc/{passwd,shadow}", "/var/log/**2/*.log"]).unwrap() {
//!     println!("{}", info.filename());
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::iter;
use std::rc::Rc;
use std::sync::LazyLock;

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;

use crate::{API_FILESYSTEM, FileInformation, FileSpec, FsError, Session};

/// Default depth of a bare `**` component.
pub const DEFAULT_RECURSION_DEPTH: usize = 3;

/// Listings kept before the child cache is reset.
const CACHE_LIMIT: usize = 50;

static EXPANSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+,[^}]+)\}|%%([^%]+?)%%").expect("valid regex"));

static RECURSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(\d*)").expect("valid regex"));

/// Options controlling a [`Glob`] search.
#[derive(Debug, Clone)]
pub struct GlobOptions {
    /// Directory relative patterns are resolved against. Defaults to the
    /// filesystem root.
    pub root: Option<String>,
    /// Match names without regard to case.
    pub case_insensitive: bool,
    /// Separator patterns are split on.
    pub path_sep: char,
    /// Filesystem tag to search.
    pub filesystem: String,
    /// Values for `%%name%%` placeholders.
    pub interpolations: HashMap<String, Vec<String>>,
}

impl GlobOptions {
    /// Options using the session's tag and separator.
    pub fn from_session(session: &Session) -> Self {
        Self {
            root: None,
            case_insensitive: true,
            path_sep: session.config().path_sep,
            filesystem: session.config().filesystem.clone(),
            interpolations: HashMap::new(),
        }
    }

    /// Search below `root` instead of the filesystem root.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Toggle case-insensitive matching.
    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Bind a `%%name%%` placeholder.
    pub fn with_interpolation<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interpolations
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for GlobOptions {
    fn default() -> Self {
        Self {
            root: None,
            case_insensitive: true,
            path_sep: if cfg!(windows) { '\\' } else { '/' },
            filesystem: API_FILESYSTEM.to_string(),
            interpolations: HashMap::new(),
        }
    }
}

// ============================================================================
// Pattern tree
// ============================================================================

#[derive(Clone)]
enum Component {
    Literal(String),
    Wildcard {
        pattern: String,
        matcher: GlobMatcher,
    },
    Recursive {
        pattern: String,
        matcher: GlobMatcher,
        depth: usize,
    },
}

impl Component {
    fn parse(text: &str, case_insensitive: bool) -> Result<Self, FsError> {
        if let Some(caps) = RECURSION.captures(text) {
            let depth = match caps.get(1).map(|m| m.as_str()) {
                None | Some("") => DEFAULT_RECURSION_DEPTH,
                Some(digits) => digits.parse().map_err(|_| FsError::InvalidPattern {
                    pattern: text.to_string(),
                    details: "recursion depth out of range".into(),
                })?,
            };
            let pattern = RECURSION.replace(text, "*").into_owned();
            let matcher = compile(&pattern, case_insensitive)?;
            return Ok(Component::Recursive {
                pattern,
                matcher,
                depth,
            });
        }

        if text.contains(['*', '?', '[']) {
            let matcher = compile(text, case_insensitive)?;
            return Ok(Component::Wildcard {
                pattern: text.to_string(),
                matcher,
            });
        }

        Ok(Component::Literal(text.to_string()))
    }

    fn key(&self) -> (u8, &str, usize) {
        match self {
            Component::Literal(name) => (0, name, 0),
            Component::Wildcard { pattern, .. } => (1, pattern, 0),
            Component::Recursive { pattern, depth, .. } => (2, pattern, *depth),
        }
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Literal(name) => write!(f, "Literal({name:?})"),
            Component::Wildcard { pattern, .. } => write!(f, "Wildcard({pattern:?})"),
            Component::Recursive { pattern, depth, .. } => {
                write!(f, "Recursive({pattern:?}, {depth})")
            }
        }
    }
}

fn compile(pattern: &str, case_insensitive: bool) -> Result<GlobMatcher, FsError> {
    GlobBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| FsError::InvalidPattern {
            pattern: pattern.to_string(),
            details: e.to_string(),
        })
}

#[derive(Debug, Default)]
struct Node {
    terminal: bool,
    children: Vec<(Rc<Component>, Rc<RefCell<Node>>)>,
}

impl Node {
    fn insert(&mut self, mut components: Vec<Component>) {
        if components.is_empty() {
            self.terminal = true;
            return;
        }
        let head = components.remove(0);
        let child = match self.children.iter().find(|(c, _)| **c == head) {
            Some((_, child)) => Rc::clone(child),
            None => {
                let child = Rc::new(RefCell::new(Node::default()));
                self.children.push((Rc::new(head), Rc::clone(&child)));
                child
            }
        };
        child.borrow_mut().insert(components);
    }
}

/// Expand `{a,b}` groups and `%%name%%` placeholders into plain patterns.
fn expand(pattern: &str, interpolations: &HashMap<String, Vec<String>>) -> Result<Vec<String>, FsError> {
    let Some(caps) = EXPANSION.captures(pattern) else {
        return Ok(vec![pattern.to_string()]);
    };
    let Some(whole) = caps.get(0) else {
        return Ok(vec![pattern.to_string()]);
    };

    let alternatives: Vec<String> = match (caps.get(1), caps.get(2)) {
        (Some(group), _) => group.as_str().split(',').map(String::from).collect(),
        (None, Some(name)) => interpolations
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| FsError::InvalidPattern {
                pattern: pattern.to_string(),
                details: format!("unknown interpolation {}", name.as_str()),
            })?,
        (None, None) => Vec::new(),
    };

    let prefix = &pattern[..whole.start()];
    let suffixes = expand(&pattern[whole.end()..], interpolations)?;
    Ok(alternatives
        .iter()
        .flat_map(|alt| suffixes.iter().map(move |suffix| format!("{prefix}{alt}{suffix}")))
        .collect())
}

// ============================================================================
// Glob
// ============================================================================

/// Lazy pattern search.
///
/// Directory listings are cached per search so that several patterns
/// touching the same directory list it once.
pub struct Glob {
    session: Session,
    options: GlobOptions,
    cache: RefCell<HashMap<String, Rc<Vec<FileInformation>>>>,
}

impl Glob {
    /// A search in `session` with `options`.
    pub fn new(session: &Session, options: GlobOptions) -> Self {
        Self {
            session: session.clone(),
            options,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The options this search was built with.
    pub fn options(&self) -> &GlobOptions {
        &self.options
    }

    /// Every path matching any of `patterns`.
    ///
    /// Patterns are validated up front; matching happens as the iterator
    /// is consumed. A root that cannot be resolved yields nothing.
    ///
    /// # Errors
    ///
    /// - [`FsError::UnsupportedFilesystem`] if no backend serves the tag
    /// - [`FsError::InvalidPattern`] for malformed patterns or unknown
    ///   placeholders
    pub fn collect<S: AsRef<str>>(
        &self,
        patterns: &[S],
    ) -> Result<Box<dyn Iterator<Item = FileInformation> + '_>, FsError> {
        self.session.registry().require(&self.options.filesystem)?;

        let mut tree = Node::default();
        for pattern in patterns {
            for expanded in expand(pattern.as_ref(), &self.options.interpolations)? {
                let components = expanded
                    .split(self.options.path_sep)
                    .filter(|s| !s.is_empty())
                    .map(|s| Component::parse(s, self.options.case_insensitive))
                    .collect::<Result<Vec<_>, _>>()?;
                tree.insert(components);
            }
        }
        tracing::debug!(patterns = patterns.len(), "glob tree built");

        let sep = self.options.path_sep;
        let root_name = self.options.root.clone().unwrap_or_else(|| sep.to_string());
        let root = FileSpec::with_options(root_name, self.options.filesystem.clone(), sep);
        let start: Box<dyn Iterator<Item = FileInformation> + '_> =
            match self.session.file_factory(root) {
                Ok(info) => self.filter(Rc::new(RefCell::new(tree)), info),
                Err(e) => {
                    tracing::debug!(error = %e, "glob root unavailable");
                    Box::new(iter::empty())
                }
            };
        Ok(start)
    }

    fn filter<'a>(
        &'a self,
        node: Rc<RefCell<Node>>,
        info: FileInformation,
    ) -> Box<dyn Iterator<Item = FileInformation> + 'a> {
        let children = node.borrow().children.clone();
        Box::new(children.into_iter().flat_map(move |(component, next)| {
            self.expand_component(&component, &info)
                .flat_map(move |matched| {
                    let (terminal, leaf) = {
                        let next = next.borrow();
                        (next.terminal, next.children.is_empty())
                    };
                    let here = terminal.then(|| matched.clone());
                    let below: Box<dyn Iterator<Item = FileInformation> + 'a> = if leaf {
                        Box::new(iter::empty())
                    } else {
                        self.filter(Rc::clone(&next), matched)
                    };
                    here.into_iter().chain(below)
                })
        }))
    }

    fn expand_component<'a>(
        &'a self,
        component: &Component,
        info: &FileInformation,
    ) -> Box<dyn Iterator<Item = FileInformation> + 'a> {
        if !info.is_dir() {
            return Box::new(iter::empty());
        }
        match component {
            Component::Literal(name) => Box::new(self.literal(info, name).into_iter()),
            Component::Wildcard { matcher, .. } => {
                Box::new(self.matching(info, matcher).into_iter())
            }
            Component::Recursive { matcher, depth, .. } => {
                self.recurse(matcher.clone(), info.clone(), 1, *depth)
            }
        }
    }

    fn literal(&self, info: &FileInformation, name: &str) -> Vec<FileInformation> {
        if cfg!(windows) && info.filename().filesystem() == API_FILESYSTEM {
            return self
                .session
                .file_factory(info.filename().add(name))
                .into_iter()
                .collect();
        }

        // a case-sensitive host may hold several names that fold together
        let folded = name.to_lowercase();
        self.children(info)
            .iter()
            .filter(|c| match c.filename().file_name() {
                Some(n) if self.options.case_insensitive => n.to_lowercase() == folded,
                Some(n) => n == name,
                None => false,
            })
            .cloned()
            .collect()
    }

    fn matching(&self, info: &FileInformation, matcher: &GlobMatcher) -> Vec<FileInformation> {
        self.children(info)
            .iter()
            .filter(|c| c.filename().file_name().is_some_and(|n| matcher.is_match(n)))
            .cloned()
            .collect()
    }

    /// Yields only the descendants matching the component's own pattern,
    /// not every child of the directories it passes through.
    fn recurse<'a>(
        &'a self,
        matcher: GlobMatcher,
        info: FileInformation,
        depth: usize,
        max: usize,
    ) -> Box<dyn Iterator<Item = FileInformation> + 'a> {
        let matched = self.matching(&info, &matcher);
        Box::new(matched.into_iter().flat_map(move |child| {
            let below: Box<dyn Iterator<Item = FileInformation> + 'a> = if depth < max && child.is_dir() {
                self.recurse(matcher.clone(), child.clone(), depth + 1, max)
            } else {
                Box::new(iter::empty())
            };
            iter::once(child).chain(below)
        }))
    }

    /// Children of `info`, listed at most once per search.
    fn children(&self, info: &FileInformation) -> Rc<Vec<FileInformation>> {
        let key = info.filename().name().to_string();
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Rc::clone(hit);
        }

        let listed = Rc::new(info.list().collect::<Vec<_>>());
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= CACHE_LIMIT {
            tracing::trace!("glob listing cache reset");
            cache.clear();
        }
        cache.insert(key, Rc::clone(&listed));
        listed
    }
}

impl fmt::Debug for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Glob")
            .field("options", &self.options)
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionConfig;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("etc/ssh")).unwrap();
        fs::create_dir_all(dir.path().join("var/log/app/old")).unwrap();
        fs::write(dir.path().join("etc/passwd"), b"root").unwrap();
        fs::write(dir.path().join("etc/Hosts"), b"").unwrap();
        fs::write(dir.path().join("etc/ssh/sshd_config"), b"").unwrap();
        fs::write(dir.path().join("var/log/app/a.log"), b"").unwrap();
        fs::write(dir.path().join("var/log/app/old/b.log"), b"").unwrap();
        dir
    }

    fn search(dir: &tempfile::TempDir, options: GlobOptions, patterns: &[&str]) -> Vec<String> {
        let session = Session::new(SessionConfig::default().with_path_sep('/'));
        let root = dir.path().to_str().unwrap().replace('\\', "/");
        let glob = Glob::new(&session, options.with_root(root.clone()));
        let mut names: Vec<String> = glob
            .collect(patterns)
            .unwrap()
            .map(|i| i.filename().name().replace('\\', "/")[root.len() + 1..].to_string())
            .collect();
        names.sort();
        names
    }

    fn options() -> GlobOptions {
        GlobOptions {
            path_sep: '/',
            ..GlobOptions::default()
        }
    }

    #[test]
    fn expands_groups_and_interpolations() {
        let mut vars = HashMap::new();
        vars.insert("user".to_string(), vec!["alice".to_string(), "bob".to_string()]);
        let mut out = expand("/home/%%user%%/{a,b}", &vars).unwrap();
        out.sort();
        assert_eq!(
            out,
            vec!["/home/alice/a", "/home/alice/b", "/home/bob/a", "/home/bob/b"]
        );
        assert_eq!(expand("/plain", &vars).unwrap(), vec!["/plain"]);
    }

    #[test]
    fn unknown_interpolation_is_rejected() {
        let err = expand("/%%nope%%", &HashMap::new()).unwrap_err();
        assert!(matches!(err, FsError::InvalidPattern { .. }));
    }

    #[test]
    fn parses_component_kinds() {
        assert_eq!(
            format!("{:?}", Component::parse("etc", true).unwrap()),
            "Literal(\"etc\")"
        );
        assert_eq!(
            format!("{:?}", Component::parse("*.log", true).unwrap()),
            "Wildcard(\"*.log\")"
        );
        assert_eq!(
            format!("{:?}", Component::parse("**", true).unwrap()),
            "Recursive(\"*\", 3)"
        );
        assert_eq!(
            format!("{:?}", Component::parse("**5", true).unwrap()),
            "Recursive(\"*\", 5)"
        );
    }

    #[test]
    fn shared_prefixes_merge() {
        let mut tree = Node::default();
        tree.insert(vec![Component::Literal("etc".into()), Component::Literal("a".into())]);
        tree.insert(vec![Component::Literal("etc".into()), Component::Literal("b".into())]);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].1.borrow().children.len(), 2);
    }

    #[test]
    fn matches_literals_and_wildcards() {
        let dir = tree();
        assert_eq!(search(&dir, options(), &["etc/passwd"]), vec!["etc/passwd"]);
        assert_eq!(
            search(&dir, options(), &["etc/*"]),
            vec!["etc/Hosts", "etc/passwd", "etc/ssh"]
        );
        assert_eq!(
            search(&dir, options(), &["etc/{passwd,ssh/sshd_config}"]),
            vec!["etc/passwd", "etc/ssh/sshd_config"]
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn case_sensitivity_is_configurable() {
        let dir = tree();
        assert_eq!(search(&dir, options(), &["ETC/hosts"]), vec!["etc/Hosts"]);
        let strict = options().with_case_insensitive(false);
        assert!(search(&dir, strict.clone(), &["etc/hosts"]).is_empty());
        assert!(search(&dir, strict, &["etc/h*"]).is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn literal_matches_every_case_variant() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Hosts"), b"").unwrap();
        fs::write(dir.path().join("hosts"), b"").unwrap();

        assert_eq!(search(&dir, options(), &["hosts"]), vec!["Hosts", "hosts"]);
        assert_eq!(search(&dir, options(), &["host[s]"]), vec!["Hosts", "hosts"]);
        let strict = options().with_case_insensitive(false);
        assert_eq!(search(&dir, strict, &["Hosts"]), vec!["Hosts"]);
    }

    #[test]
    fn recursive_component_respects_depth() {
        let dir = tree();
        assert_eq!(
            search(&dir, options(), &["var/**/*.log"]),
            vec!["var/log/app/a.log", "var/log/app/old/b.log"]
        );
        assert_eq!(search(&dir, options(), &["var/**1/*.log"]), Vec::<String>::new());
        assert_eq!(search(&dir, options(), &["var/**2/*.log"]), vec!["var/log/app/a.log"]);
    }

    #[test]
    fn prefix_and_leaf_both_yield() {
        let dir = tree();
        assert_eq!(
            search(&dir, options(), &["etc", "etc/passwd"]),
            vec!["etc", "etc/passwd"]
        );
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = tree();
        let session = Session::new(SessionConfig::default().with_path_sep('/'));
        let missing = dir.path().join("nope").to_str().unwrap().to_string();
        let glob = Glob::new(&session, options().with_root(missing));
        assert_eq!(glob.collect(&["*"]).unwrap().count(), 0);
    }

    #[test]
    fn unregistered_filesystem_is_rejected() {
        let session = Session::default();
        let glob = Glob::new(
            &session,
            GlobOptions {
                filesystem: "NTFS".into(),
                ..options()
            },
        );
        assert!(matches!(
            glob.collect(&["*"]).err(),
            Some(FsError::UnsupportedFilesystem { .. })
        ));
    }

    #[test]
    fn invalid_wildcard_is_rejected() {
        let session = Session::default();
        let glob = Glob::new(&session, options());
        assert!(matches!(
            glob.collect(&["/etc/[a-"]).err(),
            Some(FsError::InvalidPattern { .. })
        ));
    }
}
