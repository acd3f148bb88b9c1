use std::{
    collections::{BTreeSet, HashSet},
    fs,
    io::ErrorKind,
    path::Path,
};

use crate::core::{Error, ResultRecord, Result};

/// Keys of pairs that already have a record in the output file.
///
/// A pair is identified by `(model, question text, special_context)`, so
/// switching models never reuses another model's answers.
#[derive(Debug, Default)]
pub struct CompletedPairs {
    keys: HashSet<(String, String, String)>,
    models: BTreeSet<String>,
}

impl CompletedPairs {
    /// Reads an existing output file. A missing file yields an empty ledger.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(Error::input(
                    path,
                    format!("failed to read existing output: {err}"),
                ));
            }
        };

        let mut ledger = Self::default();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: ResultRecord = serde_json::from_str(line).map_err(|err| {
                Error::input(path, format!("existing output line {}: {err}", idx + 1))
            })?;
            ledger.insert(&record);
        }
        Ok(ledger)
    }

    pub fn contains(&self, model: &str, question: &str, special_context: &str) -> bool {
        self.keys.contains(&(
            model.to_string(),
            question.to_string(),
            special_context.to_string(),
        ))
    }

    pub fn insert(&mut self, record: &ResultRecord) {
        self.models.insert(record.model.clone());
        self.keys.insert((
            record.model.clone(),
            record.question.clone(),
            record.special_context.clone(),
        ));
    }

    /// Models with records in the file other than `model`, sorted.
    pub fn other_models(&self, model: &str) -> Vec<&str> {
        self.models
            .iter()
            .map(String::as_str)
            .filter(|seen| *seen != model)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
