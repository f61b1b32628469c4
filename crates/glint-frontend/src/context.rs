// context.rs

use std::cell::Cell;
use std::path::PathBuf;

use crate::span::FileId;

/// A source file registered with the context.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub contents: String,
}

/// Driver-owned state shared across the whole compilation: the file list,
/// the include-directory search list, and the sticky error flag.
#[derive(Debug, Default)]
pub struct Context {
    files: Vec<SourceFile>,
    include_directories: Vec<PathBuf>,
    error: Cell<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>, contents: impl Into<String>) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile {
            name: name.into(),
            contents: contents.into(),
        });
        id
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn add_include_directory(&mut self, dir: impl Into<PathBuf>) {
        self.include_directories.push(dir.into());
    }

    pub fn include_directories(&self) -> &[PathBuf] {
        &self.include_directories
    }

    pub fn has_error(&self) -> bool {
        self.error.get()
    }

    pub fn set_error(&self) {
        self.error.set(true);
    }
}
