// Reading responses from JSON documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::survey::io_common::make_default_id;
use crate::survey::*;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonLikelihood {
    #[serde(rename = "withinGroup")]
    within_group: Option<f64>,
    #[serde(rename = "outsideGroup")]
    outside_group: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonResponse {
    #[serde(rename = "projectId")]
    project_id: Option<String>,
    #[serde(rename = "responseId")]
    response_id: Option<String>,
    #[serde(rename = "projectName")]
    project_name: Option<String>,
    connection: Option<String>,
    alignment: Option<BTreeMap<String, f64>>,
    #[serde(rename = "alignmentScore")]
    alignment_score: Option<f64>,
    #[serde(default)]
    rankings: BTreeMap<String, Vec<String>>,
    #[serde(rename = "firstDegree", default)]
    first_degree: BTreeMap<String, f64>,
    #[serde(rename = "secondDegree", default)]
    second_degree: BTreeMap<String, f64>,
    #[serde(rename = "thirdDegree", default)]
    third_degree: BTreeMap<String, f64>,
    #[serde(rename = "secondDegreeLikelihood")]
    second_degree_likelihood: Option<JsonLikelihood>,
    #[serde(rename = "thirdDegreeLikelihood")]
    third_degree_likelihood: Option<JsonLikelihood>,
    #[serde(rename = "selectedScores", default)]
    selected_scores: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonResponses {
    One(Box<JsonResponse>),
    Many(Vec<JsonResponse>),
}

pub fn read_json_responses(path: String) -> SurveyResult<Vec<ParsedResponse>> {
    let default_id = make_default_id(&path);
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let responses: Vec<JsonResponse> =
        match serde_json::from_str(&contents).context(ParsingJsonSnafu {})? {
            JsonResponses::One(r) => vec![*r],
            JsonResponses::Many(l) => l,
        };
    debug!("read_json_responses: {} responses", responses.len());
    Ok(responses
        .into_iter()
        .enumerate()
        .map(|(idx, r)| to_parsed(r, default_id(idx + 1)))
        .collect())
}

fn to_parsed(r: JsonResponse, default_id: String) -> ParsedResponse {
    let mut counts: Vec<(Degree, String, f64)> = Vec::new();
    for (degree, m) in [
        (Degree::First, &r.first_degree),
        (Degree::Second, &r.second_degree),
        (Degree::Third, &r.third_degree),
    ] {
        for (key, x) in m.iter() {
            counts.push((degree, key.clone(), *x));
        }
    }

    let mut likelihoods: Vec<(Degree, String, f64)> = Vec::new();
    for (degree, l) in [
        (Degree::Second, &r.second_degree_likelihood),
        (Degree::Third, &r.third_degree_likelihood),
    ] {
        if let Some(l) = l {
            if let Some(x) = l.within_group {
                likelihoods.push((degree, "within_group".to_string(), x));
            }
            if let Some(x) = l.outside_group {
                likelihoods.push((degree, "outside_group".to_string(), x));
            }
        }
    }

    ParsedResponse {
        id: Some(r.response_id.unwrap_or(default_id)),
        project_id: r.project_id,
        project_name: r.project_name,
        connection: r.connection,
        alignment: r.alignment.unwrap_or_default().into_iter().collect(),
        alignment_score: r.alignment_score,
        rankings: r.rankings.into_iter().collect(),
        counts,
        likelihoods,
        selected_scores: r.selected_scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_one_response_or_many() {
        let one: JsonResponses = serde_json::from_str(r#"{"responseId": "a"}"#).unwrap();
        assert!(matches!(one, JsonResponses::One(_)));
        let many: JsonResponses =
            serde_json::from_str(r#"[{"responseId": "a"}, {"projectId": "p"}]"#).unwrap();
        match many {
            JsonResponses::Many(l) => assert_eq!(l.len(), 2),
            _ => panic!("expected a list"),
        }
    }

    #[test]
    fn converts_to_parsed_response() {
        let r: JsonResponse = serde_json::from_str(
            r#"{
                "projectId": "P",
                "rankings": { "duration": ["Multiple Years (1)"] },
                "firstDegree": { "faculty": 2 },
                "thirdDegreeLikelihood": { "outsideGroup": 0.1 }
            }"#,
        )
        .unwrap();
        let pr = to_parsed(r, "f.json-00000001".to_string());
        assert_eq!(pr.id, Some("f.json-00000001".to_string()));
        assert_eq!(pr.counts, vec![(Degree::First, "faculty".to_string(), 2.0)]);
        assert_eq!(
            pr.likelihoods,
            vec![(Degree::Third, "outside_group".to_string(), 0.1)]
        );
        assert!(pr.alignment.is_empty());
    }
}
