//! Facilities for discovering token files and loading the ordered token stream.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::{Result, WordGroupError};

/// Discovers files rooted at the provided input paths according to the corpus configuration.
///
/// Directories are traversed recursively by default; set [`CorpusConfig::recursive`] to
/// `false` to limit discovery to the first level.  Files inside a directory are returned in
/// file-name order so the token stream is identical across runs and platforms.
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], cfg: &CorpusConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(WordGroupError::InvalidConfig(format!(
                "input path {path:?} does not exist"
            )));
        }
        let metadata = fs::metadata(path)
            .map_err(|err| WordGroupError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            let depth = if cfg.recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(path)
                .max_depth(depth)
                .follow_links(cfg.follow_symlinks)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|err| WordGroupError::Internal(err.to_string()))?;
                if entry.file_type().is_file() {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if metadata.is_file() {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(WordGroupError::InvalidConfig(
            "no files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

/// Splits `text` into whitespace-separated tokens.
#[must_use]
pub fn tokenize(text: &str, lowercase: bool) -> Vec<String> {
    text.split_whitespace()
        .map(|token| {
            if lowercase {
                token.to_lowercase()
            } else {
                token.to_string()
            }
        })
        .collect()
}

/// Loads the ordered token stream from every discovered file.
///
/// Files are read in discovery order and their tokens concatenated.  An input set that holds
/// files but no tokens yields an empty stream rather than an error.
pub fn load_tokens<P: AsRef<Path>>(inputs: &[P], cfg: &CorpusConfig) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    for path in collect_paths(inputs, cfg)? {
        let text = fs::read_to_string(&path)
            .map_err(|err| WordGroupError::io(err, Some(path.clone())))?;
        tokens.extend(tokenize(&text, cfg.lowercase));
    }
    Ok(tokens)
}
