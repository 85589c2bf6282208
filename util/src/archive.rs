//! Struct archiving functionality
//!
//! To add archiving functionality to a struct implement the `Archived` trait.
//! Records are written as timestamped CSV rows, one file per archived item.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::Path;
use std::fs::{File, OpenOptions};
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
///
/// A default archiver has no file behind it and silently discards records,
/// which lets modules run without a session (e.g. in tests).
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a timestamped csv.
///
/// To implement this trait, the struct shall have an `Archiver` member for
/// each archive file. The archivers shall be setup in the struct's `init` or
/// `new` functions. Records must be flat (no nested sequences) since they are
/// written as CSV rows.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut session_path = session.arch_root.clone();
        session_path.push(path);

        // Create any intermediate directories
        if let Some(parent) = session_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Create the file (truncating any previous one) and open it for
        // appending
        File::create(&session_path)?;
        let file = OpenOptions::new()
            .append(true)
            .open(session_path)?;

        let w = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer: Some(w)
        })
    }

    /// Returns true if this archiver is backed by a file.
    pub fn is_active(&self) -> bool {
        self.writer.is_some()
    }

    /// Serialise a record into the archive.
    ///
    /// Does nothing if the archiver has not been initialised.
    pub fn serialise<T: Serialize>(
        &mut self, record: T
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(ref mut w) = self.writer {
            w.serialize(record)?;
            w.flush()?;
        }

        Ok(())
    }
}
