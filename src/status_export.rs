use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::core::{Error, ResultRecord, Result};

/// Aggregate view of an output file, for `contextsweep status`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct OutputSummary {
    pub path: String,
    pub records: usize,
    pub distinct_questions: usize,
    pub prompt_tokens: u64,
    pub response_tokens: u64,
    pub by_special_context: BTreeMap<String, usize>,
    pub by_model: BTreeMap<String, usize>,
}

impl OutputSummary {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| Error::input(path, format!("failed to read output: {err}")))?;
        let mut records = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: ResultRecord = serde_json::from_str(line)
                .map_err(|err| Error::input(path, format!("line {}: {err}", idx + 1)))?;
            records.push(record);
        }
        Ok(Self::from_records(path.display().to_string(), &records))
    }

    pub fn from_records(path: String, records: &[ResultRecord]) -> Self {
        let mut summary = Self {
            path,
            records: records.len(),
            ..Self::default()
        };
        let mut questions = BTreeSet::new();
        for record in records {
            questions.insert(record.question.as_str());
            summary.prompt_tokens += record.num_prompt_tokens;
            summary.response_tokens += record.num_response_tokens;
            *summary
                .by_special_context
                .entry(record.special_context.clone())
                .or_default() += 1;
            *summary.by_model.entry(record.model.clone()).or_default() += 1;
        }
        summary.distinct_questions = questions.len();
        summary
    }
}
