use nf_core::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthStats {
    pub total: usize,
    pub days: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct YearStats {
    pub total: usize,
    pub months: BTreeMap<String, MonthStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub total: usize,
    pub years: BTreeMap<String, YearStats>,
}

/// Counts of organized files per source, year, month and day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganizationStats {
    pub total_articles: usize,
    pub sources: BTreeMap<String, SourceStats>,
}

impl OrganizationStats {
    pub fn total_sources(&self) -> usize {
        self.sources.len()
    }
}

fn subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    Ok(dirs)
}

fn count_txt(dir: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "txt") {
            count += 1;
        }
    }
    Ok(count)
}

/// Walk `root/<source>/<year>/<month>/<day>/*.txt`. A missing root is empty.
pub fn collect_statistics(root: &Path) -> Result<OrganizationStats> {
    let mut stats = OrganizationStats::default();
    if !root.is_dir() {
        return Ok(stats);
    }

    for (source, source_path) in subdirs(root)? {
        let mut source_stats = SourceStats::default();
        for (year, year_path) in subdirs(&source_path)? {
            let mut year_stats = YearStats::default();
            for (month, month_path) in subdirs(&year_path)? {
                let mut month_stats = MonthStats::default();
                for (day, day_path) in subdirs(&month_path)? {
                    let files = count_txt(&day_path)?;
                    month_stats.total += files;
                    month_stats.days.insert(day, files);
                }
                year_stats.total += month_stats.total;
                year_stats.months.insert(month, month_stats);
            }
            source_stats.total += year_stats.total;
            source_stats.years.insert(year, year_stats);
        }
        stats.total_articles += source_stats.total;
        stats.sources.insert(source, source_stats);
    }
    Ok(stats)
}
