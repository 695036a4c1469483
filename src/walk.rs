//! Recursive traversal built on [`FileInformation::list`].

use std::collections::HashSet;
use std::fmt;

use crate::{Children, FileInformation};

/// Depth-first iterator over every descendant of a directory.
///
/// Each directory is expanded only when the walk reaches it, so dropping the
/// iterator stops all further I/O. A directory whose (device, inode) pair
/// was already expanded is yielded but not entered again, which keeps
/// symlink cycles finite. Backends that report inode `0` opt out of that
/// check.
///
/// ```rust,no_run
/// use irfs::{Session, Walk};
///
/// let session = Session::default();
/// let root = session.file_factory("/etc").unwrap();
/// for info in Walk::new(&root).max_depth(2) {
///     println!("{} {}", info.mode(), info.filename());
/// }
/// ```
pub struct Walk {
    stack: Vec<Children>,
    max_depth: Option<usize>,
    visited: HashSet<(u64, u64)>,
}

impl Walk {
    /// Walk everything below `root`. `root` itself is not yielded.
    pub fn new(root: &FileInformation) -> Self {
        let mut walk = Self {
            stack: Vec::new(),
            max_depth: None,
            visited: HashSet::new(),
        };
        if walk.first_visit(root) {
            walk.stack.push(root.list());
        }
        walk
    }

    /// Stop descending below `depth` levels; `1` yields direct children only.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        if depth == 0 {
            self.stack.clear();
        }
        self
    }

    fn first_visit(&mut self, dir: &FileInformation) -> bool {
        if dir.inode() == 0 {
            return true;
        }
        self.visited.insert((dir.device(), dir.inode()))
    }
}

impl Iterator for Walk {
    type Item = FileInformation;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let depth = self.stack.len();
            let child = match self.stack.last_mut()?.next() {
                Some(child) => child,
                None => {
                    self.stack.pop();
                    continue;
                }
            };

            let descend = child.is_dir() && self.max_depth.is_none_or(|max| depth < max);
            if descend && self.first_visit(&child) {
                self.stack.push(child.list());
            }
            return Some(child);
        }
    }
}

impl fmt::Debug for Walk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Walk")
            .field("depth", &self.stack.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
