use log::{debug, info, warn};

use impact_scoring::builder::{AlignmentRatings, Builder, ReportSection, SurveyResponse};
use impact_scoring::catalog::Catalog;
use impact_scoring::propagation::{score_graph, InfluenceGraph, PropagationReport};
use impact_scoring::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_msforms;
pub mod store;

use crate::survey::config_reader::*;
use crate::survey::store::*;

#[derive(Debug, Snafu)]
pub enum SurveyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file has no data"))]
    EmptyExcel {},
    #[snafu(display("Unexpected cell in row {lineno}, column {column}: {content}"))]
    ExcelWrongCellType {
        lineno: usize,
        column: String,
        content: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a non-negative integer"))]
    ParsingJsonNumber {},
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error opening CSV file: {source}"))]
    CsvOpen { source: csv::Error },
    #[snafu(display("Error reading line {lineno}: {source}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Invalid value {content:?} in line {lineno}, column {column}"))]
    InvalidCell {
        lineno: usize,
        column: String,
        content: String,
    },
    #[snafu(display("Response {response_id} cannot be scored: {source}"))]
    InvalidResponse {
        source: ScoringErrors,
        response_id: String,
    },
    #[snafu(display("Invalid rules: {source}"))]
    InvalidRules { source: ScoringErrors },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

/// A response, as parsed by the readers.
/// This is before any check: labels, counts and likelihoods are kept as found.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ParsedResponse {
    pub id: Option<String>,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub connection: Option<String>,
    pub alignment: Vec<(String, f64)>,
    pub alignment_score: Option<f64>,
    pub rankings: Vec<(String, Vec<String>)>,
    pub counts: Vec<(Degree, String, f64)>,
    /// `within_group` or `outside_group`, per degree.
    pub likelihoods: Vec<(Degree, String, f64)>,
    pub selected_scores: Vec<String>,
}

/// What a run should do, assembled from the command line.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RunSettings {
    pub config_path: Option<String>,
    pub input: Option<String>,
    pub input_type: Option<String>,
    pub excel_worksheet_name: Option<String>,
    pub out: Option<String>,
    pub reference: Option<String>,
    pub store: Option<String>,
    pub alignment_score: Option<f64>,
}

fn read_responses(path: String, cfs: &FileSource) -> SurveyResult<Vec<ParsedResponse>> {
    info!("Attempting to read response file {:?}", path);
    match cfs.provider.as_str() {
        "json" => io_json::read_json_responses(path),
        "csv" => io_csv::read_csv_responses(path),
        "msforms" => io_msforms::read_msforms_responses(path, cfs),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

/// Turns a parsed response into a checked one.
///
/// The alignment used for the ripple effect is, in order: the alignment score
/// of the response, the mean of its alignment ratings, the alignment score of
/// the source, the default of the rules.
fn validate_response(
    pr: &ParsedResponse,
    catalog: &Catalog,
    source: &FileSource,
    default_project: &str,
) -> SurveyResult<SurveyResponse> {
    let response_id = pr.id.clone().unwrap_or_default();
    let project_id = pr
        .project_id
        .clone()
        .unwrap_or_else(|| default_project.to_string());

    let mut builder = Builder::new(catalog).project(&project_id, &response_id);
    if let Some(name) = &pr.project_name {
        builder = builder.project_name(name);
    }
    if let Some(c) = &pr.connection {
        builder = builder.connection(c);
    }

    if !pr.alignment.is_empty() {
        let mut ratings = AlignmentRatings::DEFAULT;
        for (key, x) in pr.alignment.iter() {
            ensure_whatever!(
                ratings.set(key, *x),
                "Response {}: unknown alignment rating {:?}",
                response_id,
                key
            );
        }
        builder = builder
            .alignment(ratings)
            .context(InvalidResponseSnafu {
                response_id: response_id.clone(),
            })?;
    }
    let alignment_score = match (pr.alignment_score, pr.alignment.is_empty()) {
        (Some(x), _) => Some(x),
        (None, true) => source.alignment_score,
        (None, false) => None,
    };
    if let Some(x) = alignment_score {
        builder = builder.alignment_score(x).context(InvalidResponseSnafu {
            response_id: response_id.clone(),
        })?;
    }

    for (key, labels) in pr.rankings.iter() {
        builder
            .add_ranking_by_key(key, labels)
            .context(InvalidResponseSnafu {
                response_id: response_id.clone(),
            })?;
    }
    for (degree, key, x) in pr.counts.iter() {
        builder
            .influence_by_key(*degree, key, *x)
            .context(InvalidResponseSnafu {
                response_id: response_id.clone(),
            })?;
    }

    for degree in [Degree::Second, Degree::Third] {
        let mut likelihood = GroupLikelihood::DEFAULT;
        for (d, key, x) in pr.likelihoods.iter().filter(|(d, _, _)| *d == degree) {
            match key.as_str() {
                "within_group" => likelihood.within_group = *x,
                "outside_group" => likelihood.outside_group = *x,
                _ => whatever!(
                    "Response {}: unknown likelihood {:?} for degree {:?}",
                    response_id,
                    key,
                    d
                ),
            }
        }
        let res = match degree {
            Degree::Third => {
                builder.third_degree_likelihood(likelihood.within_group, likelihood.outside_group)
            }
            _ => builder.second_degree_likelihood(likelihood.within_group, likelihood.outside_group),
        };
        res.context(InvalidResponseSnafu {
            response_id: response_id.clone(),
        })?;
    }

    let mut sections: Vec<ReportSection> = Vec::new();
    for title in pr.selected_scores.iter() {
        match ReportSection::from_title(title) {
            Some(s) => sections.push(s),
            None => whatever!("Response {}: unknown score section {:?}", response_id, title),
        }
    }
    builder = builder.selected_scores(&sections);

    let response = builder.build();
    debug!("validate_response: {:?}", response);
    Ok(response)
}

fn fmt_score(x: f64) -> String {
    format!("{:.4}", x)
}

fn ripple_to_json(report: &PropagationReport) -> JSValue {
    let layers: Vec<JSValue> = report
        .layers
        .iter()
        .map(|l| {
            json!({
                "layer": l.layer.to_string(),
                "nodes": l.node_count.to_string(),
                "score": fmt_score(l.score),
            })
        })
        .collect();
    json!({
        "nodes": report.nodes.len().to_string(),
        "edges": report.edge_count.to_string(),
        "layers": layers,
        "alignment": fmt_score(report.alignment_score),
        "propagationScore": fmt_score(report.project_score),
    })
}

/// The summary entry of a response. Only the sections the respondent asked for are written.
fn response_to_json(response: &SurveyResponse, card: &ScoreCard) -> JSValue {
    let mut js: JSMap<String, JSValue> = JSMap::new();
    js.insert("projectId".to_string(), json!(card.project_id));
    js.insert("responseId".to_string(), json!(card.response_id));
    if let Some(c) = &response.connection {
        js.insert("connection".to_string(), json!(c));
    }
    for section in response.report_sections() {
        match section {
            ReportSection::DirectIndicators => {
                let mut scores: JSMap<String, JSValue> = JSMap::new();
                for d in Dimension::ALL {
                    scores.insert(d.key().to_string(), json!(fmt_score(card.dimension(d))));
                }
                js.insert("directIndicatorScores".to_string(), JSValue::Object(scores));
            }
            ReportSection::ProjectImpact => {
                let mut scores: JSMap<String, JSValue> = JSMap::new();
                for c in Composite::ALL {
                    scores.insert(c.key().to_string(), json!(fmt_score(card.composite(c))));
                }
                js.insert("projectImpactScores".to_string(), JSValue::Object(scores));
            }
            ReportSection::Alignment => {
                let mut scores: JSMap<String, JSValue> = JSMap::new();
                if let Some(ratings) = &response.alignment {
                    for (key, x) in AlignmentRatings::KEYS.iter().zip(ratings.ratings()) {
                        scores.insert(key.to_string(), json!(fmt_score(x)));
                    }
                }
                scores.insert("overall".to_string(), json!(fmt_score(card.alignment_score)));
                js.insert("alignmentScores".to_string(), JSValue::Object(scores));
            }
            ReportSection::RippleEffect => {
                js.insert(
                    "rippleEffectScores".to_string(),
                    ripple_to_json(&card.propagation),
                );
            }
        }
    }
    JSValue::Object(js)
}

fn build_summary_js(config: &SurveyConfig, results: Vec<JSValue>) -> SurveyResult<JSValue> {
    let scoring_rules = config.rules.scoring_rules()?;
    let propagation_rules = config.rules.propagation_rules()?;
    let c = OutputConfig {
        project_name: config.output_settings.project_name.clone(),
        sources: config
            .response_sources
            .iter()
            .map(|s| io_common::simplify_file_name(&s.file_path))
            .collect(),
        normalization_constant: scoring_rules.normalization_constant.to_string(),
        position_decay: scoring_rules.position_decay.to_string(),
        damping_factor: propagation_rules.damping_factor.to_string(),
    };
    Ok(json!({
        "config": c,
        "results": results }))
}

fn score_network(
    path: String,
    cfs: &FileSource,
    project_id: &str,
    rules: &PropagationRules,
) -> SurveyResult<(JSValue, ScoreRecord)> {
    info!("Attempting to read network file {:?}", path);
    let response_id = io_common::simplify_file_name(&path);
    let edges = io_csv::read_network_csv(path)?;
    let graph = InfluenceGraph::from_edges(&edges).context(InvalidResponseSnafu {
        response_id: response_id.clone(),
    })?;
    if graph.node_count() > rules.max_nodes {
        return Err(ScoringErrors::GraphTooLarge {
            max_nodes: rules.max_nodes,
        })
        .context(InvalidResponseSnafu { response_id });
    }
    let alignment = cfs.alignment_score.unwrap_or(rules.default_alignment_score);
    validate_alignment(alignment).context(InvalidResponseSnafu {
        response_id: response_id.clone(),
    })?;
    let report = score_graph(&graph, alignment, rules);

    let js = json!({
        "projectId": project_id,
        "responseId": response_id,
        "rippleEffectScores": ripple_to_json(&report),
    });
    let mut scores = std::collections::BTreeMap::new();
    scores.insert("propagation_score".to_string(), report.project_score);
    let record = ScoreRecord {
        project_id: project_id.to_string(),
        response_id,
        scores,
        propagation_score: report.project_score,
        ..ScoreRecord::default()
    };
    Ok((js, record))
}

/// Hands every record to the store. Stops at the first failure.
pub fn persist(store: &mut dyn ScoreStore, records: &[ScoreRecord]) -> SurveyResult<()> {
    for record in records.iter() {
        store.write(record)?;
    }
    info!("persist: stored {} records", records.len());
    Ok(())
}

// The configuration of a run without configuration file.
fn config_from_settings(settings: &RunSettings) -> SurveyResult<SurveyConfig> {
    let input = match &settings.input {
        Some(x) => x.clone(),
        None => whatever!("Either a configuration file or an input file must be provided"),
    };
    Ok(SurveyConfig {
        output_settings: OutputSettings {
            project_name: io_common::simplify_file_name(&input),
            output_directory: None,
        },
        response_sources: vec![],
        rules: SurveyRules::default(),
        store: None,
    })
}

fn resolve(root: &Path, file_path: &str) -> String {
    let p: PathBuf = root.join(file_path);
    p.as_path().display().to_string()
}

pub fn run_survey(settings: &RunSettings) -> SurveyResult<()> {
    let (mut config, root_p): (SurveyConfig, PathBuf) = match &settings.config_path {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root_p)
        }
        None => (config_from_settings(settings)?, PathBuf::new()),
    };
    info!("config: {:?}", config);

    // The command line takes precedence over the configuration file.
    let mut sources: Vec<(String, FileSource)> = config
        .response_sources
        .iter()
        .map(|s| (resolve(&root_p, &s.file_path), s.clone()))
        .collect();
    if let Some(input) = &settings.input {
        let source = FileSource {
            provider: settings
                .input_type
                .clone()
                .unwrap_or_else(|| "csv".to_string()),
            file_path: input.clone(),
            excel_worksheet_name: None,
            alignment_score: None,
        };
        config.response_sources = vec![source.clone()];
        sources = vec![(input.clone(), source)];
    }
    for (_, s) in sources.iter_mut() {
        if settings.excel_worksheet_name.is_some() {
            s.excel_worksheet_name = settings.excel_worksheet_name.clone();
        }
        if settings.alignment_score.is_some() {
            s.alignment_score = settings.alignment_score;
        }
    }
    ensure_whatever!(!sources.is_empty(), "No response sources were provided");

    let catalog = Catalog::standard();
    let scoring_rules = config.rules.scoring_rules()?;
    let propagation_rules = config.rules.propagation_rules()?;
    let project_name = config.output_settings.project_name.clone();

    let mut results: Vec<JSValue> = Vec::new();
    let mut records: Vec<ScoreRecord> = Vec::new();
    for (path, cfs) in sources.iter() {
        if cfs.provider == "network_csv" {
            let (js, record) = score_network(path.clone(), cfs, &project_name, &propagation_rules)?;
            results.push(js);
            records.push(record);
            continue;
        }
        let parsed = read_responses(path.clone(), cfs)?;
        debug!("run_survey: {} responses in {}", parsed.len(), path);
        for pr in parsed.iter() {
            let response = validate_response(pr, &catalog, cfs, &project_name)?;
            let card = run_scoring(&response, &catalog, &scoring_rules, &propagation_rules)
                .context(InvalidResponseSnafu {
                    response_id: response.response_id.clone(),
                })?;
            results.push(response_to_json(&response, &card));
            records.push(ScoreRecord::from_card(&card).with_answers(&response));
        }
    }

    let result_js = build_summary_js(&config, results)?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    let out_path: Option<String> = match (&settings.out, &config.output_settings.output_directory) {
        (Some(x), _) if x == "stdout" => None,
        (Some(x), _) => Some(x.clone()),
        (None, Some(dir)) => Some(resolve(
            &root_p,
            &format!("{}/{}_summary.json", dir, project_name),
        )),
        (None, None) => None,
    };
    match out_path {
        Some(p) => {
            info!("Writing summary to {:?}", p);
            fs::write(&p, &pretty_js_stats).context(WritingOutputSnafu { path: p.clone() })?;
        }
        None => {
            println!("{}", pretty_js_stats);
        }
    }

    let store_path: Option<String> = match (&settings.store, &config.store) {
        (Some(x), _) => Some(x.clone()),
        (None, Some(s)) => Some(resolve(&root_p, &s.file_path)),
        (None, None) => None,
    };
    if let Some(p) = store_path {
        let mut store = JsonLinesStore::new(&p);
        persist(&mut store, &records)?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &settings.reference {
        let summary_ref = read_summary(summary_p.clone())?;
        debug!("summary: {:?}", summary_ref);
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
fn run_survey_test(test_name: &str, config_lpath: &str, summary_lpath: &str) {
    let test_dir = option_env!("SURVEY_TEST_DIR").unwrap_or(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/data"
    ));
    info!("Running test {}", test_name);
    let settings = RunSettings {
        config_path: Some(format!("{}/{}/{}", test_dir, test_name, config_lpath)),
        reference: Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
        out: Some("stdout".to_string()),
        ..RunSettings::default()
    };
    let res = run_survey(&settings);
    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = snafu::ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        panic!("test {} failed: {}", test_name, e);
    }
}

#[cfg(test)]
pub fn test_wrapper(test_name: &str) {
    run_survey_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}
