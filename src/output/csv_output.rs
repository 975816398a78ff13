//! CSV output handler
//!
//! Pages are written as `Url,Title,Description,Type`, failed links as
//! `Url,Depth,Type` and external links as `Url,Type`. The header is written
//! only when a file is created (or found empty); later batches append rows.
//! Commas inside values are replaced with spaces.

use crate::config::OutputConfig;
use crate::link::{Link, QueuedLink, WebPage};
use crate::output::traits::{BatchSink, OutputResult};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub const PAGES_HEADER: [&str; 4] = ["Url", "Title", "Description", "Type"];
pub const QUEUED_LINKS_HEADER: [&str; 3] = ["Url", "Depth", "Type"];
pub const LINKS_HEADER: [&str; 2] = ["Url", "Type"];

/// Appends batches to CSV files
#[derive(Debug, Clone)]
pub struct CsvBatchWriter {
    pages_path: PathBuf,
    failed_path: Option<PathBuf>,
    external_path: Option<PathBuf>,
}

impl CsvBatchWriter {
    pub fn new(
        pages_path: impl Into<PathBuf>,
        failed_path: Option<PathBuf>,
        external_path: Option<PathBuf>,
    ) -> Self {
        Self {
            pages_path: pages_path.into(),
            failed_path,
            external_path,
        }
    }

    /// Builds a writer from the output configuration
    ///
    /// Returns None when no pages path is configured; batches are then
    /// kept in memory.
    pub fn from_config(config: &OutputConfig) -> Option<Self> {
        let pages_path = config.pages_path.clone()?;
        Some(Self::new(
            pages_path,
            config.failed_path.clone(),
            config.external_path.clone(),
        ))
    }

    pub fn pages_path(&self) -> &Path {
        &self.pages_path
    }

    pub fn failed_path(&self) -> Option<&Path> {
        self.failed_path.as_deref()
    }

    pub fn external_path(&self) -> Option<&Path> {
        self.external_path.as_deref()
    }
}

impl BatchSink for CsvBatchWriter {
    fn write_pages(&self, pages: &[WebPage]) -> OutputResult<()> {
        write_pages(&self.pages_path, pages)
    }

    /// Failed links are dropped when no failed path is configured
    fn write_failed(&self, links: &[QueuedLink]) -> OutputResult<()> {
        match &self.failed_path {
            Some(path) => write_queued_links(path, links),
            None => Ok(()),
        }
    }

    /// External links are dropped when no external path is configured
    fn write_external(&self, links: &[Link]) -> OutputResult<()> {
        match &self.external_path {
            Some(path) => write_links(path, links),
            None => Ok(()),
        }
    }
}

/// Appends pages to a CSV file
pub fn write_pages(path: &Path, pages: &[WebPage]) -> OutputResult<()> {
    if pages.is_empty() {
        return Ok(());
    }

    let mut writer = open_writer(path, &PAGES_HEADER)?;
    for page in pages {
        writer.write_record([
            sanitize(&page.url),
            sanitize(&page.title),
            sanitize(&page.description),
            page.link_type.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Appends queued-shape links (with depth) to a CSV file
pub fn write_queued_links(path: &Path, links: &[QueuedLink]) -> OutputResult<()> {
    if links.is_empty() {
        return Ok(());
    }

    let mut writer = open_writer(path, &QUEUED_LINKS_HEADER)?;
    for link in links {
        writer.write_record([
            sanitize(&link.url),
            link.depth.to_string(),
            link.link_type.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Appends plain links to a CSV file
pub fn write_links(path: &Path, links: &[Link]) -> OutputResult<()> {
    if links.is_empty() {
        return Ok(());
    }

    let mut writer = open_writer(path, &LINKS_HEADER)?;
    for link in links {
        writer.write_record([sanitize(&link.url), link.link_type.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn open_writer(path: &Path, header: &[&str]) -> OutputResult<csv::Writer<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let needs_header = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if needs_header {
        writer.write_record(header)?;
    }
    Ok(writer)
}

fn sanitize(value: &str) -> String {
    value.replace(',', " ")
}
