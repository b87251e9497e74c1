//! Trace file I/O
//!
//! Reading loads a whole trace eagerly into a bounded lock-free queue that
//! replaying workers pop from. Writing appends one line per call; the file is
//! opened and closed on every append so a crashed run still leaves every
//! completed line on disk.

use crossbeam::queue::ArrayQueue;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Load every non-blank line of `path` into a FIFO queue
///
/// Lines are decoded one at a time; invalid UTF-8 is replaced with U+FFFD so
/// a single damaged line never costs the rest of the trace.
pub fn read_lines<P: AsRef<Path>>(path: P) -> io::Result<ArrayQueue<String>> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let mut lines = Vec::new();
    for (lineno, raw) in BufReader::new(file).split(b'\n').enumerate() {
        let mut raw = raw?;
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        let line = match String::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(
                    "Invalid UTF-8 on line {} of {}; replacing bad bytes",
                    lineno + 1,
                    path.display()
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        lines.push(line);
    }

    let queue = ArrayQueue::new(lines.len().max(1));
    for line in lines {
        // capacity equals the line count
        let _ = queue.push(line);
    }
    Ok(queue)
}

/// Append `line` plus a newline to `path`, creating parent directories first
pub fn append_line<P: AsRef<Path>>(path: P, line: &str) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    file.write_all(buf.as_bytes())
}

/// Trace sink shared by all workers of a run
#[derive(Debug)]
pub struct TraceWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TraceWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line; concurrent callers never interleave partial lines
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let _guard = self.lock.lock();
        append_line(&self.path, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_read_lines_skips_blank() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.txt");
        fs::write(&path, "a\n\n  \nb\nc\n").unwrap();

        let queue = read_lines(&path).unwrap();
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop().as_deref(), Some("a"));
        assert_eq!(queue.pop().as_deref(), Some("b"));
        assert_eq!(queue.pop().as_deref(), Some("c"));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_read_lines_keeps_lines_around_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.txt");
        let mut content = Vec::new();
        for i in 0..10 {
            content.extend_from_slice(format!("LOAD\tuser{i}\tALLfields\t\n").as_bytes());
        }
        content.extend_from_slice(b"LOAD\tuser\xff\tALLfields\t\r\n");
        content.extend_from_slice(b"LOAD\tuser10\tALLfields\t\n");
        fs::write(&path, content).unwrap();

        let queue = read_lines(&path).unwrap();
        assert_eq!(queue.len(), 12);
        for _ in 0..10 {
            queue.pop().unwrap();
        }
        assert_eq!(queue.pop().as_deref(), Some("LOAD\tuser\u{FFFD}\tALLfields\t"));
        assert_eq!(queue.pop().as_deref(), Some("LOAD\tuser10\tALLfields\t"));
    }

    #[test]
    fn test_read_lines_directory_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(read_lines(dir.path()).is_err());
    }

    #[test]
    fn test_read_lines_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();

        let queue = read_lines(&path).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_read_lines_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(read_lines(dir.path().join("nope.txt")).is_err());
    }

    #[test]
    fn test_append_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/trace.txt");

        append_line(&path, "first").unwrap();
        append_line(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_concurrent_writers_keep_lines_whole() {
        let dir = TempDir::new().unwrap();
        let writer = Arc::new(TraceWriter::new(dir.path().join("trace.txt")));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let writer = Arc::clone(&writer);
                thread::spawn(move || {
                    for i in 0..50 {
                        writer.write_line(&format!("thread{t}\tline{i}")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let content = fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            let (t, i) = line.split_once('\t').unwrap();
            assert!(t.starts_with("thread"));
            assert!(i.starts_with("line"));
        }
    }
}
