// Helpers shared by the tabular readers.

use std::path::Path;

use crate::survey::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// The ranked statements of a cell, in order. Empty entries are dropped.
pub fn split_labels(cell: &str) -> Vec<String> {
    cell.split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_cell(column: &str, value: &str, lineno: usize) -> SurveyResult<f64> {
    value.parse::<f64>().ok().context(InvalidCellSnafu {
        lineno,
        column: column.to_string(),
        content: value.to_string(),
    })
}

fn parse_degree(prefix: &str) -> Option<Degree> {
    match prefix {
        "first_degree" => Some(Degree::First),
        "second_degree" => Some(Degree::Second),
        "third_degree" => Some(Degree::Third),
        _ => None,
    }
}

/// Records the value of one cell of a flat export. Empty cells keep the defaults.
pub fn apply_column(
    pr: &mut ParsedResponse,
    column: &str,
    value: &str,
    lineno: usize,
) -> SurveyResult<()> {
    let column = column.trim();
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    match column {
        "response_id" => pr.id = Some(value.to_string()),
        "project_id" => pr.project_id = Some(value.to_string()),
        "project_name" => pr.project_name = Some(value.to_string()),
        "connection" => pr.connection = Some(value.to_string()),
        "alignment_score" => pr.alignment_score = Some(parse_cell(column, value, lineno)?),
        "selected_scores" => pr.selected_scores = split_labels(value),
        c => match c.split_once('.') {
            Some(("alignment", key)) => {
                let x = parse_cell(column, value, lineno)?;
                pr.alignment.push((key.to_string(), x));
            }
            Some((prefix, key)) if parse_degree(prefix).is_some() => {
                let x = parse_cell(column, value, lineno)?;
                if let Some(degree) = parse_degree(prefix) {
                    match key {
                        "within_group" | "outside_group" => {
                            pr.likelihoods.push((degree, key.to_string(), x))
                        }
                        _ => pr.counts.push((degree, key.to_string(), x)),
                    }
                }
            }
            _ if Dimension::from_key(c).is_some() => {
                pr.rankings.push((c.to_string(), split_labels(value)));
            }
            _ => {
                debug!("apply_column: ignoring column {:?}", c);
            }
        },
    }
    Ok(())
}
