//! Operation result types
//!
//! Operation names used in events, and the progress record of a directory
//! rename.

use std::fmt;

/// The named façade operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Upload,
    Download,
    ListDirectory,
    DeleteFile,
    RenameFile,
    CreateDirectory,
    RemoveDirectory,
    RenameDirectory,
    FileSize,
    FileExists,
    FileMtime,
    SetPermissions,
    SearchFiles,
    HealthCheck,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Upload => "upload",
            Operation::Download => "download",
            Operation::ListDirectory => "list_directory",
            Operation::DeleteFile => "delete_file",
            Operation::RenameFile => "rename_file",
            Operation::CreateDirectory => "create_directory",
            Operation::RemoveDirectory => "remove_directory",
            Operation::RenameDirectory => "rename_directory",
            Operation::FileSize => "get_file_size",
            Operation::FileExists => "file_exists",
            Operation::FileMtime => "get_file_mtime",
            Operation::SetPermissions => "set_file_permissions",
            Operation::SearchFiles => "search_files",
            Operation::HealthCheck => "check_ftp_health",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a directory rename got before it stopped.
///
/// Steps run in order: list the old directory, create the new one, move each
/// entry, remove the old one. Nothing is rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameProgress {
    /// Entries to move, as listed by the server. `None` until listed.
    pub entries: Option<Vec<String>>,
    pub directory_created: bool,
    /// Entries already moved, in order.
    pub moved: Vec<String>,
    pub old_removed: bool,
}

impl RenameProgress {
    /// Listed entries that were not moved.
    pub fn pending(&self) -> Vec<&str> {
        self.entries
            .iter()
            .flatten()
            .filter(|entry| !self.moved.contains(*entry))
            .map(String::as_str)
            .collect()
    }
}

impl fmt::Display for RenameProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(entries) = &self.entries else {
            return f.write_str("nothing done, listing failed");
        };
        write!(
            f,
            "target {}, {}/{} entries moved, source {}",
            if self.directory_created {
                "created"
            } else {
                "not created"
            },
            self.moved.len(),
            entries.len(),
            if self.old_removed {
                "removed"
            } else {
                "not removed"
            }
        )
    }
}
