use crate::libmondai::kotae::{AnswerArea, AnswerInput};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Kind of question, as encoded by the integer `problemType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ProblemType {
    SingleChoice,
    MultipleChoice,
    IndefiniteChoice,
    FillIn,
    Other(i64),
}

impl From<i64> for ProblemType {
    fn from(value: i64) -> Self {
        match value {
            1 => ProblemType::SingleChoice,
            2 => ProblemType::MultipleChoice,
            3 => ProblemType::IndefiniteChoice,
            5 => ProblemType::FillIn,
            other => ProblemType::Other(other),
        }
    }
}

impl From<ProblemType> for i64 {
    fn from(value: ProblemType) -> Self {
        match value {
            ProblemType::SingleChoice => 1,
            ProblemType::MultipleChoice => 2,
            ProblemType::IndefiniteChoice => 3,
            ProblemType::FillIn => 5,
            ProblemType::Other(other) => other,
        }
    }
}

impl ProblemType {
    pub fn is_multi_choice(self) -> bool {
        matches!(
            self,
            ProblemType::MultipleChoice | ProblemType::IndefiniteChoice
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProblemOption {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl ProblemOption {
    pub fn label(&self) -> String {
        format!("{}: {}", self.key, self.value)
    }
}

/// One problem record. Owned by the caller; the dialog only ever writes
/// `answers`, and fields it does not understand are carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<ProblemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ProblemOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blanks: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Problem {
    pub fn from_json(json: &str) -> serde_json::Result<Problem> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn options(&self) -> &[ProblemOption] {
        self.options.as_deref().unwrap_or_default()
    }

    pub fn answers(&self) -> &[String] {
        self.answers.as_deref().unwrap_or_default()
    }

    pub fn has_blanks(&self) -> bool {
        self.blanks.as_ref().is_some_and(|blanks| !blanks.is_empty())
    }

    /// Number of fill-in slots. A record without a `blanks` field still gets
    /// one slot; an explicitly empty `blanks` gets none.
    pub fn blank_count(&self) -> usize {
        match &self.blanks {
            Some(blanks) => blanks.len(),
            None => 1,
        }
    }

    pub fn image_path(&self) -> Option<&Path> {
        match &self.image {
            Some(path) if !path.as_os_str().is_empty() => Some(path.as_path()),
            _ => None,
        }
    }

    pub fn page_label(&self) -> String {
        match &self.page {
            None | Some(Value::Null) => String::from("N/A"),
            Some(Value::String(page)) => page.clone(),
            Some(page) => page.to_string(),
        }
    }

    /// Replaces `answers` wholesale with whatever the input area currently
    /// holds. Without an input area there is nothing to extract and the record
    /// is left alone.
    pub fn commit_answers(&mut self, area: Option<&AnswerArea>) {
        match area {
            Some(area) => {
                let answers = area.extract();
                debug!("[Answer] Committing {:?}", answers);
                self.answers = Some(answers);
            }
            None => debug!("[Answer] No answer area, nothing to commit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_problem_types_from_integers() {
        let problem = Problem::from_json(r#"{"problemType": 3}"#).unwrap();
        assert_eq!(problem.problem_type, Some(ProblemType::IndefiniteChoice));
        assert!(problem.problem_type.unwrap().is_multi_choice());

        let problem = Problem::from_json(r#"{"problemType": 4}"#).unwrap();
        assert_eq!(problem.problem_type, Some(ProblemType::Other(4)));
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let problem = Problem::from_json(
            r#"{"problemType": 1, "page": 12, "problemId": "p-77", "score": 2.5}"#,
        )
        .unwrap();
        let written: Value = serde_json::from_str(&problem.to_json().unwrap()).unwrap();

        assert_eq!(written["problemId"], json!("p-77"));
        assert_eq!(written["score"], json!(2.5));
        assert_eq!(written["problemType"], json!(1));
        assert_eq!(problem.page_label(), "12");
    }

    #[test]
    fn blank_count_distinguishes_absent_from_empty() {
        let absent = Problem::from_json(r#"{"problemType": 5}"#).unwrap();
        assert_eq!(absent.blank_count(), 1);
        assert!(!absent.has_blanks());

        let empty = Problem::from_json(r#"{"problemType": 5, "blanks": []}"#).unwrap();
        assert_eq!(empty.blank_count(), 0);

        let three = Problem::from_json(r#"{"blanks": [{}, {}, {}]}"#).unwrap();
        assert_eq!(three.blank_count(), 3);
        assert!(three.has_blanks());
    }

    #[test]
    fn empty_image_path_counts_as_missing() {
        let problem = Problem::from_json(r#"{"image": ""}"#).unwrap();
        assert!(problem.image_path().is_none());
        assert_eq!(problem.page_label(), "N/A");
    }

    #[test]
    fn commit_replaces_prior_answers() {
        let mut problem = Problem::from_json(
            r#"{"problemType": 2,
                "options": [{"key": "A", "value": "1"}, {"key": "B", "value": "2"}],
                "answers": ["A", "B"]}"#,
        )
        .unwrap();
        let mut area = AnswerArea::for_problem(&problem).unwrap();
        area.populate(&[String::from("B")]);

        problem.commit_answers(Some(&area));
        assert_eq!(problem.answers(), ["B"]);
    }

    #[test]
    fn commit_without_area_keeps_record() {
        let mut problem = Problem::from_json(r#"{"problemType": 4, "answers": ["essay"]}"#).unwrap();
        problem.commit_answers(None);
        assert_eq!(problem.answers(), ["essay"]);
    }
}
