use crate::error::Result;
use crate::results::PostRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Ordered collection of posts, unique by title
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    posts: Vec<PostRecord>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_posts(posts: Vec<PostRecord>) -> Self {
        Self { posts }
    }

    pub fn posts(&self) -> &[PostRecord] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn contains_title(&self, title: &str) -> bool {
        self.posts.iter().any(|post| post.title == title)
    }

    /// Appends `record` unless a post with the same title is already archived.
    ///
    /// Returns whether the record was added. Titles are the key because not
    /// every post carries an id.
    pub fn merge_if_new(&mut self, record: PostRecord) -> bool {
        if self.contains_title(&record.title) {
            ::log::debug!("Already archived: {}", record.title);
            return false;
        }

        ::log::debug!("Archiving new post: {}", record.title);
        self.posts.push(record);
        true
    }

    /// Sorts by numeric id, highest first. Posts without a numeric id go last
    /// and keep their relative order.
    pub fn sort_by_id_desc(&mut self) {
        self.posts.sort_by(|a, b| b.numeric_id().cmp(&a.numeric_id()));
    }

    pub fn into_posts(self) -> Vec<PostRecord> {
        self.posts
    }
}

/// JSON file holding the archive between runs
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    path: PathBuf,
}

impl ArchiveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the archive into memory.
    ///
    /// A missing file is normal for a first run. An unreadable or malformed
    /// file is logged and the run continues from an empty archive. A malformed
    /// file is copied to `<name>.bak` first, since the next `save` replaces it.
    pub fn load(&self) -> Archive {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                ::log::info!(
                    "Backup file does not exist, it will be created as {}",
                    self.path.display()
                );
                return Archive::new();
            }
            Err(e) => {
                ::log::error!(
                    "Error reading existing backup file {}: {}",
                    self.path.display(),
                    e
                );
                return Archive::new();
            }
        };

        ::log::info!("Backup file exists. Reading it into memory...");
        match serde_json::from_str::<Vec<PostRecord>>(&contents) {
            Ok(posts) => {
                ::log::info!("Backup file loaded with {} posts", posts.len());
                Archive::from_posts(posts)
            }
            Err(e) => {
                ::log::error!(
                    "Error parsing existing backup file {}: {}",
                    self.path.display(),
                    e
                );
                self.keep_unparsed_copy();
                Archive::new()
            }
        }
    }

    /// Replaces the file with the archive as a pretty-printed JSON array
    pub fn save(&self, archive: &Archive) -> Result<()> {
        ::log::info!("Writing JSON data to backup file...");
        let json = serde_json::to_string_pretty(archive.posts())?;

        // Write beside the target and rename so the old file is replaced whole
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        ::log::info!("JSON data has been written to {}", self.path.display());
        Ok(())
    }

    /// Where a backup file that failed to parse is preserved
    pub fn unparsed_copy_path(&self) -> PathBuf {
        self.sibling_path(".bak")
    }

    fn keep_unparsed_copy(&self) {
        let bak_path = self.unparsed_copy_path();
        match fs::copy(&self.path, &bak_path) {
            Ok(_) => ::log::warn!(
                "Unparsed backup file copied to {} before it is replaced",
                bak_path.display()
            ),
            Err(e) => ::log::error!(
                "Failed to copy unparsed backup file to {}: {}",
                bak_path.display(),
                e
            ),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        self.sibling_path(".tmp")
    }

    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }
}
