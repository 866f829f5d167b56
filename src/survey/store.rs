// Persistence of the scores of each response.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::survey::*;

/// The flat record handed to the persistence layer: the scores of a response,
/// with the answers they were computed from.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "responseId")]
    pub response_id: String,
    pub scores: BTreeMap<String, f64>,
    #[serde(rename = "propagationScore")]
    pub propagation_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    /// The eight alignment ratings, when the response gave them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub alignment: BTreeMap<String, f64>,
    #[serde(rename = "firstDegree", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub first_degree: BTreeMap<String, u64>,
    #[serde(rename = "secondDegree", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub second_degree: BTreeMap<String, u64>,
    #[serde(rename = "thirdDegree", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub third_degree: BTreeMap<String, u64>,
    #[serde(rename = "selectedScores", default, skip_serializing_if = "Vec::is_empty")]
    pub selected_scores: Vec<String>,
}

fn nonzero_counts(counts: &CategoryCounts) -> BTreeMap<String, u64> {
    Category::ALL
        .iter()
        .filter(|c| counts.get(**c) > 0)
        .map(|c| (c.key().to_string(), counts.get(*c)))
        .collect()
}

impl ScoreRecord {
    pub fn from_card(card: &ScoreCard) -> ScoreRecord {
        ScoreRecord {
            project_id: card.project_id.clone(),
            response_id: card.response_id.clone(),
            scores: card.named_scores().into_iter().collect(),
            propagation_score: card.propagation_score(),
            ..ScoreRecord::default()
        }
    }

    /// Copies what the respondent answered next to the scores.
    pub fn with_answers(mut self, response: &SurveyResponse) -> ScoreRecord {
        self.connection = response.connection.clone();
        if let Some(ratings) = response.alignment {
            self.alignment = AlignmentRatings::KEYS
                .iter()
                .zip(ratings.ratings())
                .map(|(k, x)| (k.to_string(), x))
                .collect();
        }
        self.first_degree = nonzero_counts(&response.first_degree);
        self.second_degree = nonzero_counts(&response.second_degree);
        self.third_degree = nonzero_counts(&response.third_degree);
        self.selected_scores = response
            .selected_scores
            .iter()
            .map(|s| s.title().to_string())
            .collect();
        self
    }
}

/// Where the scores end up. A failed write is returned to the caller as is.
pub trait ScoreStore {
    fn write(&mut self, record: &ScoreRecord) -> SurveyResult<()>;
}

/// Appends one JSON object per line.
pub struct JsonLinesStore {
    path: String,
}

impl JsonLinesStore {
    pub fn new(path: &str) -> JsonLinesStore {
        JsonLinesStore {
            path: path.to_string(),
        }
    }
}

impl ScoreStore for JsonLinesStore {
    fn write(&mut self, record: &ScoreRecord) -> SurveyResult<()> {
        let line = serde_json::to_string(record).context(ParsingJsonSnafu {})?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context(WritingOutputSnafu {
                path: self.path.clone(),
            })?;
        writeln!(file, "{}", line).context(WritingOutputSnafu {
            path: self.path.clone(),
        })?;
        debug!(
            "JsonLinesStore: stored response {} in {}",
            record.response_id, self.path
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub records: Vec<ScoreRecord>,
}

impl ScoreStore for MemoryStore {
    fn write(&mut self, record: &ScoreRecord) -> SurveyResult<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(response_id: &str) -> ScoreRecord {
        let mut scores = BTreeMap::new();
        scores.insert("duration_score".to_string(), 0.25);
        ScoreRecord {
            project_id: "P".to_string(),
            response_id: response_id.to_string(),
            scores,
            propagation_score: 0.1,
            ..ScoreRecord::default()
        }
    }

    #[test]
    fn memory_store_keeps_records_in_order() {
        let mut store = MemoryStore::default();
        store.write(&record("a")).unwrap();
        store.write(&record("b")).unwrap();
        let ids: Vec<&str> = store.records.iter().map(|r| r.response_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn json_lines_store_appends() {
        let path = std::env::temp_dir().join(format!("ripplescore_store_{}.jsonl", std::process::id()));
        let path_s = path.display().to_string();
        let _ = fs::remove_file(&path);
        let mut store = JsonLinesStore::new(&path_s);
        store.write(&record("a")).unwrap();
        store.write(&record("b")).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: ScoreRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back, record("b"));
        assert!(lines[0].contains("\"responseId\":\"a\""));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn records_keep_the_answers() {
        let catalog = Catalog::standard();
        let mut ratings = AlignmentRatings::DEFAULT;
        assert!(ratings.set("goals", 0.9));
        let mut builder = Builder::new(&catalog)
            .project("P", "R-3")
            .connection("Community")
            .alignment(ratings)
            .unwrap()
            .selected_scores(&[ReportSection::RippleEffect]);
        builder.influence(Degree::First, Category::Student, 2.0).unwrap();
        builder.influence(Degree::Second, Category::Faculty, 1.0).unwrap();
        let response = builder.build();
        let card = run_scoring(
            &response,
            &catalog,
            &ScoringRules::DEFAULT_RULES,
            &PropagationRules::DEFAULT_RULES,
        )
        .unwrap();
        let rec = ScoreRecord::from_card(&card).with_answers(&response);
        assert_eq!(rec.connection.as_deref(), Some("Community"));
        assert_eq!(rec.alignment.len(), 8);
        assert_eq!(rec.alignment["goals"], 0.9);
        assert_eq!(rec.alignment["values"], 0.5);
        assert_eq!(rec.first_degree.get("students"), Some(&2));
        assert_eq!(rec.first_degree.len(), 1);
        assert_eq!(rec.second_degree.get("faculty"), Some(&1));
        assert!(rec.third_degree.is_empty());
        assert_eq!(rec.selected_scores, vec!["Ripple Effect Scores".to_string()]);

        let line = serde_json::to_string(&rec).unwrap();
        assert!(line.contains("\"firstDegree\":{\"students\":2}"));
        assert!(!line.contains("thirdDegree"));
        let back: ScoreRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back.second_degree, rec.second_degree);
        assert_eq!(back.selected_scores, rec.selected_scores);
    }

    #[test]
    fn write_failures_are_reported() {
        let mut store = JsonLinesStore::new("/nonexistent-dir/ripplescore/scores.jsonl");
        assert!(store.write(&record("a")).is_err());
    }
}
