//! The pager maps page numbers to resident page buffers and to file offsets.
//!
//! The database file is a flat array of [`PAGE_SIZE`] pages. Pages are read
//! lazily: a page is pulled into memory the first time the tree touches it
//! and stays resident until close. There is no eviction, so the footprint is
//! bounded by `TABLE_MAX_PAGES * PAGE_SIZE`.
//!
//! Resident pages sit behind `Arc<Mutex<..>>` handles so tree operations can
//! hold guards over two distinct pages at once (a split writes the old and
//! the new sibling together). The engine is single threaded; a `try_lock`
//! that fails means the same page was requested twice in one operation,
//! which is a bug surfaced as a storage error rather than a deadlock.

use super::node::Node;
use crate::errors::Error;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Page size 4 kilobytes because it's the same size as a page used in
/// the virtual memory systems of most computer architectures.
pub const PAGE_SIZE: usize = 4096;

pub const TABLE_MAX_PAGES: usize = 400;

pub struct Pager {
    file: File,
    file_length: u64,
    num_pages: u32,
    pages: heapless::Vec<Option<Arc<Mutex<Node>>>, TABLE_MAX_PAGES>,
}

impl Pager {
    /// Opens or creates the database file and validates its length.
    ///
    /// # Errors
    /// Returns an `Error::Storage` if the file length is not a whole number
    /// of pages, or an `Error::Io` if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let file_length = file.seek(SeekFrom::End(0))?;

        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(err!(
                Storage,
                "Db file is not a whole number of pages. Corrupt file."
            ));
        }

        let num_pages = (file_length / PAGE_SIZE as u64) as u32;
        debug!(
            path = %path.display(),
            file_length,
            num_pages,
            "Opened database file"
        );

        Ok(Pager {
            file,
            file_length,
            num_pages,
            pages: heapless::Vec::new(),
        })
    }

    /// Makes `page_num` resident.
    ///
    /// Pages inside the file are read from disk; pages past the end of the
    /// file come up zeroed and must be initialized by the caller. Counts the
    /// page toward `num_pages` either way.
    pub fn load(&mut self, page_num: u32) -> Result<(), Error> {
        if page_num as usize >= TABLE_MAX_PAGES {
            return Err(err!(
                Storage,
                "Tried to fetch page number out of bounds. {} >= {}",
                page_num,
                TABLE_MAX_PAGES
            ));
        }

        while self.pages.len() <= page_num as usize {
            if self.pages.push(None).is_err() {
                return Err(err!(Storage, "Page table full at {}", self.pages.len()));
            }
        }

        if self.pages[page_num as usize].is_none() {
            let pages_on_disk = (self.file_length / PAGE_SIZE as u64) as u32;
            let node = if page_num < pages_on_disk {
                let mut buf = [0u8; PAGE_SIZE];
                let mut file = &self.file;
                file.seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                file.read_exact(&mut buf)?;
                Node::from_bytes(&buf)
            } else {
                Node::zeroed()
            };
            self.pages[page_num as usize] = Some(Arc::new(Mutex::new(node)));
        }

        if page_num + 1 > self.num_pages {
            self.num_pages = page_num + 1;
        }
        Ok(())
    }

    /// Returns a guard over a resident page. [`Pager::load`] must have been
    /// called for the page first.
    pub fn get(&self, page_num: u32) -> Result<MutexGuard<'_, Node>, Error> {
        let slot = self
            .pages
            .get(page_num as usize)
            .and_then(|p| p.as_ref())
            .ok_or_else(|| err!(Storage, "Memory page {} not found.", page_num))?;

        slot.try_lock()
            .map_err(|_| err!(Storage, "Page {} is already locked", page_num))
    }

    /// Writes a resident page back to its slot in the file. Pages that were
    /// never pulled into memory are untouched on disk and are skipped.
    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        let data = match self.pages.get(page_num as usize).and_then(|p| p.as_ref()) {
            Some(slot) => {
                slot.try_lock()
                    .map_err(|_| err!(Storage, "Page {} is already locked", page_num))?
                    .data
            }
            None => return Ok(()),
        };

        let offset = page_num as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&data)?;
        if offset + PAGE_SIZE as u64 > self.file_length {
            self.file_length = offset + PAGE_SIZE as u64;
        }
        Ok(())
    }

    /// Flushes every resident page, releases the buffers and syncs the file.
    pub fn close(&mut self) -> Result<(), Error> {
        let mut flushed = 0;
        for page_num in 0..self.num_pages {
            if self
                .pages
                .get(page_num as usize)
                .and_then(|p| p.as_ref())
                .is_some()
            {
                self.flush(page_num)?;
                flushed += 1;
            }
            if let Some(slot) = self.pages.get_mut(page_num as usize) {
                *slot = None;
            }
        }
        self.file.sync_all()?;
        info!(flushed, "Flushed {} pages.", flushed);
        Ok(())
    }

    /// Until recycling of deleted pages exists, new pages always go onto the
    /// end of the file.
    pub fn unused_page_num(&self) -> u32 {
        self.num_pages
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// The largest key in the subtree rooted at `page_num`: the last cell of
    /// a leaf, or recursively the max key of an internal node's right child.
    pub fn node_max_key(&mut self, page_num: u32) -> Result<u32, Error> {
        use super::node::NodeType;

        self.load(page_num)?;
        let next = {
            let node = self.get(page_num)?;
            match node.node_type()? {
                NodeType::Leaf => {
                    let num_cells = node.leaf_node_num_cells()?;
                    if num_cells == 0 {
                        return Err(err!(Storage, "Empty leaf {} has no max key", page_num));
                    }
                    return node.leaf_node_key(num_cells - 1);
                }
                NodeType::Internal => node.internal_node_right_child()?,
            }
        };
        self.node_max_key(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::node::initialize_leaf_node;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 0);
        assert_eq!(pager.unused_page_num(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_open_rejects_partial_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.db");
        std::fs::write(&path, vec![0u8; PAGE_SIZE + 1]).unwrap();
        assert!(Pager::open(&path).is_err());
    }

    #[test]
    fn test_load_and_get() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let mut pager = Pager::open(&path).unwrap();

        assert!(pager.get(0).is_err()); // not resident yet
        pager.load(0).unwrap();
        assert_eq!(pager.num_pages(), 1);
        assert_eq!(pager.unused_page_num(), 1);

        let mut node = pager.get(0).unwrap();
        initialize_leaf_node(&mut node);
        node.set_leaf_node_num_cells(3);
        drop(node);
        assert_eq!(pager.get(0).unwrap().leaf_node_num_cells().unwrap(), 3);
    }

    #[test]
    fn test_two_guards_at_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let mut pager = Pager::open(&path).unwrap();
        pager.load(0).unwrap();
        pager.load(1).unwrap();

        let mut a = pager.get(0).unwrap();
        let mut b = pager.get(1).unwrap();
        initialize_leaf_node(&mut a);
        initialize_leaf_node(&mut b);
        a.set_leaf_node_num_cells(1);
        b.set_leaf_node_num_cells(2);
        drop(a);
        drop(b);
        assert_eq!(pager.get(0).unwrap().leaf_node_num_cells().unwrap(), 1);
        assert_eq!(pager.get(1).unwrap().leaf_node_num_cells().unwrap(), 2);
    }

    #[test]
    fn test_load_out_of_bounds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let mut pager = Pager::open(&path).unwrap();
        assert!(pager.load(TABLE_MAX_PAGES as u32).is_err());
    }

    #[test]
    fn test_flush_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = Pager::open(&path).unwrap();
            pager.load(0).unwrap();
            {
                let mut node = pager.get(0).unwrap();
                initialize_leaf_node(&mut node);
                node.set_leaf_node_num_cells(5);
                node.set_leaf_node_key(0, 99).unwrap();
            }
            pager.close().unwrap();
        }

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, PAGE_SIZE as u64);

        let mut pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 1);
        pager.load(0).unwrap();
        let node = pager.get(0).unwrap();
        assert_eq!(node.leaf_node_num_cells().unwrap(), 5);
        assert_eq!(node.leaf_node_key(0).unwrap(), 99);
    }
}
