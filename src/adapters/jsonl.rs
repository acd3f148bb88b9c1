//! Newline-delimited JSON input loading and append-only record output.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;

use crate::core::{Context, Error, Question, ResultRecord, Result, ports::RecordSink};

/// Reads every non-blank line of `path` as one `T`, preserving file order.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = fs::read_to_string(path)
        .map_err(|err| Error::input(path, format!("failed to read file: {err}")))?;
    parse_lines(path, &raw)
}

pub fn load_questions(path: &Path) -> Result<Vec<Question>> {
    load_records(path)
}

pub fn load_contexts(path: &Path) -> Result<Vec<Context>> {
    load_records(path)
}

fn parse_lines<T: DeserializeOwned>(path: &Path, raw: &str) -> Result<Vec<T>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .map_err(|err| Error::input(path, format!("line {}: {err}", idx + 1)))
        })
        .collect()
}

/// Appends records to a file, one JSON object per line.
///
/// The file is opened, written, flushed and closed for every record, so a
/// crash never leaves more than the records already acknowledged.
#[derive(Debug, Clone)]
pub struct JsonlAppender {
    path: PathBuf,
}

impl JsonlAppender {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|err| {
                Error::output(&path, format!("failed to create parent directory: {err}"))
            })?;
        }
        Ok(Self { path })
    }
}

impl RecordSink for JsonlAppender {
    fn append(&mut self, record: &ResultRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)
            .map_err(|err| Error::output(&self.path, format!("failed to encode record: {err}")))?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| Error::output(&self.path, format!("failed to open: {err}")))?;
        file.write_all(&line)
            .and_then(|()| file.flush())
            .map_err(|err| Error::output(&self.path, format!("failed to write: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(question: &str, special_context: &str) -> ResultRecord {
        ResultRecord {
            question: question.into(),
            category: "cat".into(),
            response: "Réponse ✓".into(),
            num_prompt_tokens: 3,
            num_response_tokens: 4,
            special_context: special_context.into(),
            model: "m".into(),
            max_tokens: 1500,
            temperature: 0.0,
        }
    }

    #[test]
    fn loads_lines_in_order_and_skips_blank_ones() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("questions.jsonl");
        fs::write(
            &path,
            "{\"question\":\"Q1\",\"category\":\"C1\"}\n\n   \n{\"question\":\"Q2\",\"category\":\"C2\"}\n",
        )
        .unwrap();

        let questions = load_questions(&path).expect("questions load");
        let texts: Vec<&str> = questions.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(texts, vec!["Q1", "Q2"]);
    }

    #[test]
    fn reports_the_offending_line_number() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("contexts.jsonl");
        fs::write(
            &path,
            "{\"context\":\"a\",\"category\":\"A\"}\n{not json}\n",
        )
        .unwrap();

        let err = load_contexts(&path).unwrap_err();
        assert!(matches!(err, Error::Input { .. }));
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn missing_keys_are_reported() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("contexts.jsonl");
        fs::write(&path, "{\"context\":\"a\"}\n").unwrap();

        let err = load_contexts(&path).unwrap_err();
        assert!(err.to_string().contains("category"), "{err}");
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let temp = tempdir().unwrap();
        let err = load_questions(&temp.path().join("absent.jsonl")).unwrap_err();
        assert!(err.to_string().contains("failed to read file"), "{err}");
    }

    #[test]
    fn appends_without_truncating_and_keeps_unicode() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("out.jsonl");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{\"existing\":true}\n").unwrap();

        let mut sink = JsonlAppender::new(&path).unwrap();
        sink.append(&record("Q1", "A")).unwrap();
        sink.append(&record("Q2", "B")).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "{\"existing\":true}");
        assert!(lines[1].contains("Réponse ✓"));
        let decoded: ResultRecord = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(decoded, record("Q2", "B"));
    }

    #[test]
    fn creates_missing_parent_directories() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a").join("b").join("out.jsonl");
        let mut sink = JsonlAppender::new(&path).unwrap();
        sink.append(&record("Q", "no_prompt")).unwrap();
        assert!(path.exists());
    }
}
