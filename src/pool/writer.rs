//! Walk output: one shared sink, one line per walk.
//!
//! [`WalkWriter`] serializes every entity's walk list in a single critical
//! section, so lines never interleave and an entity's walks stay
//! contiguous. Files are gzip-compressed unless plain output is requested.
//!
//! Next to every walk file the writer keeps an entity log
//! (`<walk file>.entities`): the seed of every finished entity, one per
//! line, unshortened. Entries are committed only after the walks before
//! them have been flushed, so the log never claims more than the walk file
//! holds. Resuming reads this log instead of guessing seeds from walk lines.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::OutputError;
use crate::walk::shorten::{Identity, TokenShortener};

/// Result type for output operations.
pub type OutputResult<T> = std::result::Result<T, OutputError>;

/// Suffix appended to a walk file's name to get its entity log.
pub const ENTITY_LOG_SUFFIX: &str = ".entities";

/// A byte sink that can be finalized.
///
/// `finish` must flush everything and write any trailer (e.g. the gzip
/// footer); errors from it are reported, not swallowed.
pub trait WalkSink: Write + Send {
    fn finish(self: Box<Self>) -> io::Result<()>;
}

impl<W: Write + Send> WalkSink for GzEncoder<W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut inner = (*self).finish()?;
        inner.flush()
    }
}

impl<W: Write + Send> WalkSink for BufWriter<W> {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.flush()
    }
}

/// Finished seeds waiting for the next flush of the walk sink.
struct EntityLog {
    file: File,
    pending: String,
}

impl EntityLog {
    fn commit(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            self.file.write_all(self.pending.as_bytes())?;
            self.pending.clear();
        }
        Ok(())
    }
}

struct OpenSinks {
    walks: Box<dyn WalkSink>,
    log: Option<EntityLog>,
}

/// Thread-safe walk writer over a single sink.
pub struct WalkWriter {
    sinks: Mutex<Option<OpenSinks>>,
    shortener: Arc<dyn TokenShortener>,
    lines_written: AtomicU64,
}

impl WalkWriter {
    /// Create (or truncate) a walk file and its entity log. Parent
    /// directories are created.
    pub fn create(path: &Path, compress: bool) -> OutputResult<Self> {
        let create_err = |path: &Path| {
            let path = path.display().to_string();
            move |e| OutputError::Create { path, source: e }
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(create_err(parent))?;
        }
        let file = BufWriter::new(File::create(path).map_err(create_err(path))?);
        let log_path = entity_log_path(path);
        let log = File::create(&log_path).map_err(create_err(&log_path))?;

        let walks: Box<dyn WalkSink> = if compress {
            Box::new(GzEncoder::new(file, Compression::default()))
        } else {
            Box::new(file)
        };
        tracing::debug!(path = %path.display(), compress, "opened walk file");
        Ok(Self::open(walks, Some(EntityLog {
            file: log,
            pending: String::new(),
        })))
    }

    /// Wrap an arbitrary sink. No entity log is kept.
    pub fn from_sink(sink: Box<dyn WalkSink>) -> Self {
        Self::open(sink, None)
    }

    fn open(walks: Box<dyn WalkSink>, log: Option<EntityLog>) -> Self {
        Self {
            sinks: Mutex::new(Some(OpenSinks { walks, log })),
            shortener: Arc::new(Identity),
            lines_written: AtomicU64::new(0),
        }
    }

    /// Shorten tokens with `shortener` when writing.
    pub fn with_shortener(mut self, shortener: Arc<dyn TokenShortener>) -> Self {
        self.shortener = shortener;
        self
    }

    /// Append `entity`'s walks, one per line, as a single uninterrupted
    /// write, and mark the entity finished.
    ///
    /// An entity with no walks is still marked finished.
    pub fn write_entity(&self, entity: &str, walks: &[String]) -> OutputResult<()> {
        let mut buffer = String::with_capacity(walks.iter().map(|w| w.len() + 1).sum());
        for walk in walks {
            self.shortener.shorten_walk(walk, &mut buffer);
            buffer.push('\n');
        }

        let mut guard = self.sinks.lock().expect("walk sink lock poisoned");
        let sinks = guard.as_mut().ok_or(OutputError::Closed)?;
        sinks
            .walks
            .write_all(buffer.as_bytes())
            .map_err(|e| OutputError::Write { source: e })?;
        if let Some(log) = sinks.log.as_mut() {
            log.pending.push_str(entity);
            log.pending.push('\n');
        }
        self.lines_written
            .fetch_add(walks.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Flush buffered walks to the underlying sink, then commit the
    /// entities they belong to to the entity log.
    pub fn flush(&self) -> OutputResult<()> {
        let mut guard = self.sinks.lock().expect("walk sink lock poisoned");
        let sinks = guard.as_mut().ok_or(OutputError::Closed)?;
        sinks
            .walks
            .flush()
            .map_err(|e| OutputError::Write { source: e })?;
        if let Some(log) = sinks.log.as_mut() {
            log.commit().map_err(|e| OutputError::Write { source: e })?;
        }
        Ok(())
    }

    /// Finalize the sink. Further writes fail with [`OutputError::Closed`].
    pub fn close(&self) -> OutputResult<()> {
        let sinks = self
            .sinks
            .lock()
            .expect("walk sink lock poisoned")
            .take()
            .ok_or(OutputError::Closed)?;
        sinks
            .walks
            .finish()
            .map_err(|e| OutputError::Write { source: e })?;
        if let Some(mut log) = sinks.log {
            log.commit().map_err(|e| OutputError::Write { source: e })?;
        }
        tracing::debug!(lines = self.lines_written(), "closed walk file");
        Ok(())
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.sinks.lock().expect("walk sink lock poisoned").is_none()
    }

    /// Number of walk lines written so far.
    pub fn lines_written(&self) -> u64 {
        self.lines_written.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for WalkWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkWriter")
            .field("lines_written", &self.lines_written())
            .finish()
    }
}

/// The entity log kept next to `walk_file`.
pub fn entity_log_path(walk_file: &Path) -> PathBuf {
    let mut name = OsString::from(walk_file.as_os_str());
    name.push(ENTITY_LOG_SUFFIX);
    PathBuf::from(name)
}

/// Whether `path` is an entity log rather than a walk file.
pub fn is_entity_log(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(ENTITY_LOG_SUFFIX))
}

/// Whether `path` names a gzip file.
pub fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Open a walk file for line-by-line reading, decompressing `.gz` files.
pub fn open_walk_reader(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    Ok(if is_gzip(path) {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}

/// Read every walk line of a file.
pub fn read_walk_file(path: &Path) -> OutputResult<Vec<String>> {
    let read_err = |e| OutputError::Read {
        path: path.display().to_string(),
        source: e,
    };
    open_walk_reader(path)
        .map_err(read_err)?
        .lines()
        .collect::<io::Result<Vec<_>>>()
        .map_err(read_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::shorten::PrefixShortener;

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl WalkSink for FailingSink {
        fn finish(self: Box<Self>) -> io::Result<()> {
            Ok(())
        }
    }

    fn walks(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn gzip_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("walks").join("walk_file.txt.gz");

        let writer = WalkWriter::create(&path, true).unwrap();
        writer.write_entity("A", &walks(&["A p B", "A q C"])).unwrap();
        writer.write_entity("B", &walks(&["B r D"])).unwrap();
        writer.close().unwrap();

        assert_eq!(writer.lines_written(), 3);
        assert_eq!(read_walk_file(&path).unwrap(), vec!["A p B", "A q C", "B r D"]);
    }

    #[test]
    fn plain_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("walks.txt");

        let writer = WalkWriter::create(&path, false).unwrap();
        writer.write_entity("A", &walks(&["A p B"])).unwrap();
        writer.close().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A p B\n");
    }

    #[test]
    fn entity_log_is_committed_on_flush_and_close() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("walks.txt.gz");
        let log = entity_log_path(&path);
        assert_eq!(log, dir.path().join("walks.txt.gz.entities"));
        assert!(is_entity_log(&log));
        assert!(!is_entity_log(&path));

        let writer = WalkWriter::create(&path, true).unwrap();
        writer.write_entity("http://ex.org/A", &walks(&["http://ex.org/A p B"])).unwrap();
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "");

        writer.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "http://ex.org/A\n");

        writer.write_entity("http://ex.org/Z", &[]).unwrap();
        writer.close().unwrap();
        assert_eq!(
            std::fs::read_to_string(&log).unwrap(),
            "http://ex.org/A\nhttp://ex.org/Z\n"
        );
        assert!(matches!(writer.flush(), Err(OutputError::Closed)));
    }

    #[test]
    fn flushed_gzip_prefix_is_readable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("walks.txt.gz");

        let writer = WalkWriter::create(&path, true).unwrap();
        writer.write_entity("A", &walks(&["A p B"])).unwrap();
        writer.flush().unwrap();

        // The stream has no trailer yet, but the flushed lines decode.
        let mut lines = open_walk_reader(&path).unwrap().lines();
        assert_eq!(lines.next().unwrap().unwrap(), "A p B");
        writer.close().unwrap();
    }

    #[test]
    fn entity_log_keeps_full_identifiers() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("walks.txt");

        let writer = WalkWriter::create(&path, false)
            .unwrap()
            .with_shortener(Arc::new(PrefixShortener::new([("http://ex.org/", "ex")])));
        writer
            .write_entity(
                "http://ex.org/A",
                &walks(&["http://ex.org/A http://ex.org/p http://ex.org/B"]),
            )
            .unwrap();
        writer.close().unwrap();

        assert_eq!(read_walk_file(&path).unwrap(), vec!["ex:A ex:p ex:B"]);
        assert_eq!(
            std::fs::read_to_string(entity_log_path(&path)).unwrap(),
            "http://ex.org/A\n"
        );
    }

    #[test]
    fn writes_after_close_fail() {
        let dir = tempfile::TempDir::new().unwrap();
        let writer = WalkWriter::create(&dir.path().join("w.txt.gz"), true).unwrap();
        writer.close().unwrap();

        assert!(writer.is_closed());
        assert!(matches!(
            writer.write_entity("A", &walks(&["A p B"])),
            Err(OutputError::Closed)
        ));
        assert!(matches!(writer.close(), Err(OutputError::Closed)));
    }

    #[test]
    fn sink_failure_is_reported() {
        let writer = WalkWriter::from_sink(Box::new(FailingSink));
        let err = writer.write_entity("A", &walks(&["A p B"]));
        assert!(matches!(err, Err(OutputError::Write { .. })));
        assert_eq!(writer.lines_written(), 0);
    }

    #[test]
    fn concurrent_writes_keep_lists_contiguous() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("walks.txt");
        let writer = Arc::new(WalkWriter::create(&path, false).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let writer = Arc::clone(&writer);
                std::thread::spawn(move || {
                    let list: Vec<String> = (0..50).map(|i| format!("E{t} p X{i}")).collect();
                    writer.write_entity(&format!("E{t}"), &list).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        writer.close().unwrap();

        let lines = read_walk_file(&path).unwrap();
        assert_eq!(lines.len(), 400);
        for block in lines.chunks(50) {
            let seed = block[0].split(' ').next().unwrap();
            assert!(block.iter().all(|l| l.starts_with(&format!("{seed} "))));
        }
        let logged = std::fs::read_to_string(entity_log_path(&path)).unwrap();
        assert_eq!(logged.lines().count(), 8);
    }

    #[test]
    fn missing_walk_file() {
        let err = read_walk_file(Path::new("/nonexistent/walks.txt"));
        assert!(matches!(err, Err(OutputError::Read { .. })));
    }
}
