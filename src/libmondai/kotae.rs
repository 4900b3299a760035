use crate::libmondai::mondai::{Problem, ProblemOption, ProblemType};
use log::{debug, warn};
use thiserror::Error;

/// Two-way transfer between answer data and the state behind an input area.
pub trait AnswerInput {
    fn populate(&mut self, candidate: &[String]);
    fn extract(&self) -> Vec<String>;
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no usable answer")]
pub struct NoUsableAnswer;

/// Single-choice input. An empty `selected` means nothing is chosen.
#[derive(Debug, Clone)]
pub struct RadioGroup {
    options: Vec<ProblemOption>,
    selected: String,
}

impl RadioGroup {
    pub fn new(options: &[ProblemOption], answers: &[String]) -> Self {
        Self {
            options: options.to_vec(),
            selected: answers.first().cloned().unwrap_or_default(),
        }
    }

    pub fn options(&self) -> &[ProblemOption] {
        &self.options
    }

    pub fn selected(&self) -> Option<&str> {
        if self.selected.is_empty() {
            None
        } else {
            Some(&self.selected)
        }
    }

    pub fn select(&mut self, key: &str) -> bool {
        if self.options.iter().any(|opt| opt.key == key) {
            self.selected = key.to_string();
            true
        } else {
            warn!("[Answer] '{}' is not one of the options", key);
            false
        }
    }

    /// Options alongside the selection slot, for widgets that bind to both.
    pub fn parts_mut(&mut self) -> (&[ProblemOption], &mut String) {
        (&self.options, &mut self.selected)
    }
}

impl AnswerInput for RadioGroup {
    fn populate(&mut self, candidate: &[String]) {
        if let Some(first) = candidate.first() {
            debug!("[Answer] Selecting {:?}", first);
            self.selected = first.clone();
        }
    }

    fn extract(&self) -> Vec<String> {
        vec![self.selected.clone()]
    }
}

/// Multi-choice input, one flag per option in declaration order.
#[derive(Debug, Clone)]
pub struct CheckboxGroup {
    entries: Vec<(ProblemOption, bool)>,
}

impl CheckboxGroup {
    pub fn new(options: &[ProblemOption], answers: &[String]) -> Self {
        Self {
            entries: options
                .iter()
                .map(|opt| (opt.clone(), answers.contains(&opt.key)))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[(ProblemOption, bool)] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = (&ProblemOption, &mut bool)> {
        self.entries.iter_mut().map(|(opt, checked)| (&*opt, checked))
    }

    pub fn toggle(&mut self, key: &str) -> bool {
        match self.entries.iter_mut().find(|(opt, _)| opt.key == key) {
            Some((_, checked)) => {
                *checked = !*checked;
                true
            }
            None => {
                warn!("[Answer] '{}' is not one of the options", key);
                false
            }
        }
    }
}

impl AnswerInput for CheckboxGroup {
    fn populate(&mut self, candidate: &[String]) {
        for (opt, checked) in self.entries.iter_mut() {
            *checked = candidate.contains(&opt.key);
        }
    }

    fn extract(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, checked)| *checked)
            .map(|(opt, _)| opt.key.clone())
            .collect()
    }
}

/// Fill-in input. The number of fields is fixed when it is built.
#[derive(Debug, Clone)]
pub struct TextFieldSequence {
    fields: Vec<String>,
}

impl TextFieldSequence {
    pub fn new(count: usize, answers: &[String]) -> Self {
        Self {
            fields: (0..count)
                .map(|i| answers.get(i).cloned().unwrap_or_default())
                .collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [String] {
        &mut self.fields
    }

    pub fn set(&mut self, index: usize, text: &str) -> bool {
        match self.fields.get_mut(index) {
            Some(field) => {
                *field = text.to_string();
                true
            }
            None => {
                warn!(
                    "[Answer] Blank {} out of range ({} blanks)",
                    index + 1,
                    self.fields.len()
                );
                false
            }
        }
    }
}

impl AnswerInput for TextFieldSequence {
    fn populate(&mut self, candidate: &[String]) {
        for (field, text) in self.fields.iter_mut().zip(candidate) {
            *field = text.clone();
        }
    }

    fn extract(&self) -> Vec<String> {
        self.fields.clone()
    }
}

#[derive(Debug, Clone)]
pub enum AnswerArea {
    Radio(RadioGroup),
    Checkbox(CheckboxGroup),
    Fill(TextFieldSequence),
}

impl AnswerArea {
    /// Picks the input strategy for a problem; first match wins. Problems that
    /// match nothing get no input area at all.
    pub fn for_problem(problem: &Problem) -> Option<AnswerArea> {
        let area = match problem.problem_type {
            Some(ProblemType::SingleChoice) => Some(AnswerArea::Radio(RadioGroup::new(
                problem.options(),
                problem.answers(),
            ))),
            Some(kind) if kind.is_multi_choice() => Some(AnswerArea::Checkbox(
                CheckboxGroup::new(problem.options(), problem.answers()),
            )),
            kind if problem.has_blanks() || kind == Some(ProblemType::FillIn) => Some(
                AnswerArea::Fill(TextFieldSequence::new(problem.blank_count(), problem.answers())),
            ),
            _ => None,
        };
        debug!("[Answer] Built answer area {:?}", area);
        area
    }

    /// Feeds a candidate (e.g. a model reply) through the population path.
    /// An empty candidate changes nothing.
    pub fn apply_candidate(&mut self, candidate: &[String]) -> Result<(), NoUsableAnswer> {
        if candidate.is_empty() {
            return Err(NoUsableAnswer);
        }
        self.populate(candidate);
        Ok(())
    }
}

impl AnswerInput for AnswerArea {
    fn populate(&mut self, candidate: &[String]) {
        match self {
            AnswerArea::Radio(group) => group.populate(candidate),
            AnswerArea::Checkbox(group) => group.populate(candidate),
            AnswerArea::Fill(fields) => fields.populate(candidate),
        }
    }

    fn extract(&self) -> Vec<String> {
        match self {
            AnswerArea::Radio(group) => group.extract(),
            AnswerArea::Checkbox(group) => group.extract(),
            AnswerArea::Fill(fields) => fields.extract(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn abc() -> Vec<ProblemOption> {
        ["A", "B", "C"]
            .iter()
            .map(|key| ProblemOption {
                key: key.to_string(),
                value: format!("option {key}"),
            })
            .collect()
    }

    fn problem(json: &str) -> Problem {
        Problem::from_json(json).unwrap()
    }

    #[test]
    fn single_choice_preselects_prior_answer() {
        let problem = problem(
            r#"{"problemType": 1,
                "options": [{"key": "A", "value": "x"}, {"key": "B", "value": "y"}],
                "answers": ["B"]}"#,
        );
        let area = AnswerArea::for_problem(&problem).unwrap();
        match &area {
            AnswerArea::Radio(group) => assert_eq!(group.selected(), Some("B")),
            other => panic!("expected radio group, got {other:?}"),
        }
        assert_eq!(area.extract(), strings(&["B"]));
    }

    #[test]
    fn single_choice_without_selection_extracts_placeholder() {
        let group = RadioGroup::new(&abc(), &[]);
        assert_eq!(group.selected(), None);
        assert_eq!(group.extract(), strings(&[""]));
    }

    #[test]
    fn radio_population_uses_first_candidate_only() {
        let mut group = RadioGroup::new(&abc(), &strings(&["A"]));
        group.populate(&strings(&["C", "B"]));
        assert_eq!(group.extract(), strings(&["C"]));

        group.populate(&[]);
        assert_eq!(group.extract(), strings(&["C"]));
    }

    #[test]
    fn radio_population_takes_first_candidate_verbatim() {
        let mut group = RadioGroup::new(&abc(), &strings(&["A"]));
        group.populate(&strings(&["E"]));
        assert_eq!(group.selected(), Some("E"));
        assert_eq!(group.extract(), strings(&["E"]));
    }

    #[test]
    fn manual_selection_rejects_unknown_keys() {
        let mut group = RadioGroup::new(&abc(), &strings(&["A"]));
        assert!(!group.select("Z"));
        assert_eq!(group.extract(), strings(&["A"]));
    }

    #[test]
    fn multi_choice_extracts_in_declaration_order() {
        let mut group = CheckboxGroup::new(&abc(), &strings(&["C", "A"]));
        assert_eq!(group.extract(), strings(&["A", "C"]));

        group.toggle("C");
        group.toggle("B");
        group.toggle("C");
        assert_eq!(group.extract(), strings(&["A", "B", "C"]));
    }

    #[test]
    fn both_multi_choice_variants_get_checkboxes() {
        for kind in [2, 3] {
            let problem = problem(&format!(
                r#"{{"problemType": {kind}, "options": [{{"key": "A"}}, {{"key": "B"}}]}}"#
            ));
            assert!(matches!(
                AnswerArea::for_problem(&problem),
                Some(AnswerArea::Checkbox(_))
            ));
        }
    }

    #[test]
    fn checkbox_population_clears_previous_checks() {
        let mut group = CheckboxGroup::new(&abc(), &strings(&["A", "C"]));
        group.populate(&strings(&["B"]));
        assert_eq!(group.extract(), strings(&["B"]));
    }

    #[test]
    fn checkbox_population_is_membership_based() {
        let mut group = CheckboxGroup::new(&abc(), &[]);
        group.populate(&strings(&["C", "X", "A"]));
        assert_eq!(group.extract(), strings(&["A", "C"]));
    }

    #[test]
    fn fill_in_seeds_leading_fields() {
        let problem = problem(r#"{"problemType": 5, "blanks": [1, 2, 3], "answers": ["x", "y"]}"#);
        let area = AnswerArea::for_problem(&problem).unwrap();
        assert_eq!(area.extract(), strings(&["x", "y", ""]));
    }

    #[test]
    fn blanks_select_fill_in_regardless_of_type() {
        let problem = problem(r#"{"problemType": 4, "blanks": [null, null]}"#);
        match AnswerArea::for_problem(&problem) {
            Some(AnswerArea::Fill(fields)) => assert_eq!(fields.fields().len(), 2),
            other => panic!("expected text fields, got {other:?}"),
        }
    }

    #[test]
    fn short_candidate_leaves_trailing_fields() {
        let mut fields = TextFieldSequence::new(3, &strings(&["a", "b", "c"]));
        fields.populate(&strings(&["x"]));
        assert_eq!(fields.extract(), strings(&["x", "b", "c"]));
    }

    #[test]
    fn long_candidate_cannot_grow_fields() {
        let mut fields = TextFieldSequence::new(2, &[]);
        fields.populate(&strings(&["1", "2", "3"]));
        assert_eq!(fields.extract(), strings(&["1", "2"]));
        assert!(!fields.set(2, "3"));
    }

    #[test]
    fn other_type_has_no_area() {
        assert!(AnswerArea::for_problem(&problem(r#"{"problemType": 4}"#)).is_none());
        assert!(AnswerArea::for_problem(&problem(r#"{"blanks": []}"#)).is_none());
    }

    #[test]
    fn empty_candidate_is_rejected_without_mutation() {
        let mut area = AnswerArea::Checkbox(CheckboxGroup::new(&abc(), &strings(&["A"])));
        assert_eq!(area.apply_candidate(&[]), Err(NoUsableAnswer));
        assert_eq!(area.extract(), strings(&["A"]));
    }
}
