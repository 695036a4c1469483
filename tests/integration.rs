//! Integration tests exercising dispatch end to end.
//!
//! These tests verify that:
//! 1. Specs are routed to the backend registered for their tag
//! 2. A complete in-memory backend works through every public entry point
//! 3. Failures stay soft where collection expects them to
//! 4. The live backend agrees with the host filesystem

use irfs::*;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// In-Memory Image Backend
// =============================================================================

/// A read-only image: fixed records, fixed listings, fixed content.
#[derive(Default)]
struct ImageBackend {
    records: HashMap<String, StatRecord>,
    listings: HashMap<String, Vec<String>>,
    content: HashMap<String, Vec<u8>>,
    stats: AtomicUsize,
}

impl ImageBackend {
    fn dir(mut self, path: &str, children: &[&str]) -> Self {
        self.records.insert(
            path.into(),
            StatRecord {
                mode: S_IFDIR | 0o755,
                ino: self.records.len() as u64 + 1,
                dev: 7,
                nlink: 2,
                ..Default::default()
            },
        );
        self.listings
            .insert(path.into(), children.iter().map(|c| c.to_string()).collect());
        self
    }

    fn file(mut self, path: &str, mode: u32, data: &[u8]) -> Self {
        self.records.insert(
            path.into(),
            StatRecord {
                mode: S_IFREG | mode,
                ino: self.records.len() as u64 + 1,
                size: data.len() as u64,
                dev: 7,
                nlink: 1,
                uid: 1000,
                gid: 100,
                mtime: 1_600_000_000,
                ..Default::default()
            },
        );
        self.content.insert(path.into(), data.to_vec());
        self
    }
}

impl FileBackend for ImageBackend {
    fn stat(&self, path: &str, _follow_symlinks: bool) -> io::Result<StatRecord> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        self.records
            .get(path)
            .cloned()
            .ok_or_else(|| io::ErrorKind::NotFound.into())
    }

    fn read_dir(&self, path: &str) -> io::Result<NameIter> {
        let names = self
            .listings
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        Ok(NameIter::from_vec(names.into_iter().map(Ok).collect()))
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn ReadSeek>> {
        let data = self
            .content
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn join(&self, dir: &str, name: &str) -> String {
        if dir == "/" {
            format!("/{name}")
        } else {
            format!("{dir}/{name}")
        }
    }
}

struct FixedIdentities {
    lookups: Arc<AtomicUsize>,
}

impl IdentitySource for FixedIdentities {
    fn user(&self, uid: u32) -> Option<User> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        (uid == 1000).then(|| User {
            uid: Some(1000),
            username: Some("analyst".into()),
            homedir: Some("/home/analyst".into()),
            shell: Some("/bin/sh".into()),
        })
    }

    fn group(&self, gid: u32) -> Option<Group> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        (gid == 100).then(|| Group {
            gid: Some(100),
            group_name: Some("users".into()),
        })
    }
}

fn image() -> ImageBackend {
    ImageBackend::default()
        .dir("/", &["bin", "home", "missing"])
        .dir("/bin", &["sh", "su"])
        .file("/bin/sh", 0o755, b"#!elf")
        .file("/bin/su", 0o4755, b"setuid")
        .dir("/home", &["analyst"])
        .dir("/home/analyst", &["notes.txt"])
        .file("/home/analyst/notes.txt", 0o640, b"abc")
}

fn image_session() -> Session {
    image_session_counting(Arc::default())
}

fn image_session_counting(lookups: Arc<AtomicUsize>) -> Session {
    let mut registry = BackendRegistry::with_defaults();
    registry.register("IMAGE", image());
    Session::with_parts(
        SessionConfig::default().with_filesystem("IMAGE").with_path_sep('/'),
        registry,
        IdentityCache::with_source(FixedIdentities { lookups }),
    )
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn dispatch_routes_by_tag() {
    let session = image_session();
    let info = session.file_factory(session.spec("/bin/sh")).unwrap();
    assert_eq!(info.filename().name(), "/bin/sh");
    assert_eq!(info.filename().filesystem(), "IMAGE");
    assert_eq!(info.size(), 5);
    assert_eq!(info.device(), 7);
}

#[test]
fn dispatch_to_unregistered_tag_fails_hard() {
    let session = image_session();
    let err = file_factory(FileSpec::with_options("/", "NTFS", '/'), &session).unwrap_err();
    assert_eq!(err.to_string(), "unsupported filesystem type: NTFS");
    assert!(!err.is_recoverable());
}

#[test]
fn missing_path_fails_soft() {
    let session = image_session();
    let err = session.file_factory(session.spec("/nope")).unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
}

#[test]
fn shared_backend_serves_two_tags() {
    let backend: Arc<dyn FileBackend> = Arc::new(image());
    let mut registry = BackendRegistry::new();
    registry.register_shared("A", Arc::clone(&backend));
    registry.register_shared("B", backend);
    let session = Session::with_registry(SessionConfig::default(), registry);

    let a = session.file_factory(FileSpec::with_options("/bin", "A", '/')).unwrap();
    let b = session.file_factory(FileSpec::with_options("/bin", "B", '/')).unwrap();
    assert_eq!(a.inode(), b.inode());
    assert!(session.file_factory(FileSpec::with_options("/bin", "API", '/')).is_err());
}

// =============================================================================
// Metadata
// =============================================================================

#[test]
fn permissions_render_like_ls() {
    let session = image_session();
    let sh = session.file_factory(session.spec("/bin/sh")).unwrap();
    let su = session.file_factory(session.spec("/bin/su")).unwrap();
    let bin = session.file_factory(session.spec("/bin")).unwrap();

    assert_eq!(sh.mode().to_string(), "-rwxr-xr-x");
    assert_eq!(su.mode().filemode(), "-rwsr-xr-x");
    assert_eq!(bin.mode().filemode(), "drwxr-xr-x");
    assert!(bin.is_dir());
    assert!(!sh.is_dir());
}

#[test]
fn owners_resolve_once_per_id() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let session = image_session_counting(Arc::clone(&lookups));
    let notes = session.file_factory(session.spec("/home/analyst/notes.txt")).unwrap();
    assert_eq!(notes.user().to_string(), "analyst (1000)");
    assert_eq!(notes.group().to_string(), "users (100)");

    // every file in the image shares the same owner ids
    for path in ["/bin/sh", "/bin/su", "/home/analyst/notes.txt"] {
        session.file_factory(session.spec(path)).unwrap();
    }
    assert_eq!(lookups.load(Ordering::SeqCst), 2);

    // unknown ids are remembered too
    let bin = session.file_factory(session.spec("/bin")).unwrap();
    assert!(bin.user().uid.is_none());
    assert!(bin.user().is_empty());
    session.file_factory(session.spec("/home")).unwrap();
    assert_eq!(lookups.load(Ordering::SeqCst), 4);
    assert_eq!(session.identities().from_uid(1000).username.as_deref(), Some("analyst"));
}

#[test]
fn timestamps_are_tagged() {
    let session = image_session();
    let notes = session.file_factory(session.spec("/home/analyst/notes.txt")).unwrap();
    assert_eq!(notes.mtime().field(), TimestampField::Modified);
    assert_eq!(notes.mtime().secs(), 1_600_000_000);
    assert_eq!(notes.mtime().to_string(), "2020-09-13 12:26:40Z");
    assert_eq!(notes.atime().field().name(), "st_atime");
}

#[test]
fn attribute_paths_reach_nested_values() {
    let session = image_session();
    let notes = session.file_factory(session.spec("/home/analyst/notes.txt")).unwrap();
    assert_eq!(
        notes.select("st_uid.username"),
        Some(AttributeValue::Text("analyst".into()))
    );
    assert_eq!(notes.select("st_gid.gid"), Some(AttributeValue::Integer(100)));
    assert_eq!(notes.select("st_size"), Some(AttributeValue::Integer(3)));
    assert!(notes.select("st_uid.nope").is_none());

    let spec = FileSpec::try_from(notes.get("filename").unwrap()).unwrap();
    assert_eq!(&spec, notes.filename());
    assert!(matches!(
        FileSpec::try_from(AttributeValue::Integer(3)),
        Err(FsError::InvalidFileSpec { found: "integer" })
    ));
}

// =============================================================================
// Traversal
// =============================================================================

#[test]
fn list_skips_unstatable_children() {
    let session = image_session();
    let root = session.file_factory(session.spec("/")).unwrap();
    let mut names: Vec<String> = root.list().map(|c| c.filename().to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["/bin", "/home"]);
}

#[test]
fn list_is_lazy() {
    let backend = Arc::new(image());
    let mut registry = BackendRegistry::new();
    registry.register_shared("IMAGE", backend.clone());
    let session = Session::with_registry(
        SessionConfig::default().with_filesystem("IMAGE").with_path_sep('/'),
        registry,
    );

    let bin = session.file_factory(session.spec("/bin")).unwrap();
    let before = backend.stats.load(Ordering::SeqCst);
    let mut children = bin.list();
    assert_eq!(backend.stats.load(Ordering::SeqCst), before);
    children.next().unwrap();
    assert_eq!(backend.stats.load(Ordering::SeqCst), before + 1);
}

#[test]
fn walk_visits_whole_image() {
    let session = image_session();
    let root = session.file_factory(session.spec("/")).unwrap();
    let mut names: Vec<String> = Walk::new(&root).map(|c| c.filename().to_string()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "/bin",
            "/bin/sh",
            "/bin/su",
            "/home",
            "/home/analyst",
            "/home/analyst/notes.txt"
        ]
    );
}

#[test]
fn glob_searches_image() {
    let session = image_session();
    let options = GlobOptions::from_session(&session).with_interpolation("user", ["analyst"]);
    let glob = Glob::new(&session, options);
    let mut names: Vec<String> = glob
        .collect(&["/bin/s?", "/home/%%user%%/*.txt"])
        .unwrap()
        .map(|c| c.filename().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["/bin/sh", "/bin/su", "/home/analyst/notes.txt"]);
}

// =============================================================================
// Content
// =============================================================================

#[test]
fn content_reads_through_backend() {
    let session = image_session();
    let notes = session.file_factory(session.spec("/home/analyst/notes.txt")).unwrap();

    let mut text = String::new();
    notes.open().unwrap().read_to_string(&mut text).unwrap();
    assert_eq!(text, "abc");
    assert_eq!(notes.read_range(1, 1).unwrap(), b"b");

    let hashes = hash_file(&notes, &[HashType::Sha256]).unwrap();
    assert_eq!(
        hashes[0].to_string(),
        "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn hashing_a_directory_is_rejected() {
    let session = image_session();
    let home = session.file_factory(session.spec("/home")).unwrap();
    let err = hash_file(&home, &[HashType::Sha256]).unwrap_err();
    assert!(matches!(err, FsError::NotAFile { ref path } if path == "/home"));
    assert!(err.is_recoverable());
}

// =============================================================================
// Live Backend
// =============================================================================

#[test]
fn live_backend_matches_host() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("evidence.bin"), vec![0u8; 4096]).unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();

    let session = Session::default();
    let root = session.file_factory(dir.path().to_str().unwrap()).unwrap();
    assert!(root.is_dir());

    let mut children: Vec<FileInformation> = root.list().collect();
    children.sort_by(|a, b| a.filename().name().cmp(b.filename().name()));
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].filename().file_name(), Some("evidence.bin"));
    assert_eq!(children[0].size(), 4096);
    assert!(children[1].is_dir());
}

#[cfg(unix)]
#[test]
fn live_backend_resolves_current_user() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mine");
    fs::write(&path, b"").unwrap();

    let session = Session::default();
    let info = session.file_factory(path.to_str().unwrap()).unwrap();
    assert_eq!(info.user().uid, Some(unsafe { libc::geteuid() }));
}

#[test]
fn session_is_shareable_across_threads() {
    let session = image_session();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let session = session.clone();
            std::thread::spawn(move || {
                session
                    .file_factory(session.spec("/bin/sh"))
                    .map(|i| i.size())
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 5);
    }
}
