// Primitives for reading CSV files.

use std::fs::File;

use crate::survey::io_common::{apply_column, make_default_id};
use crate::survey::*;

/// One response per row, with a header row.
pub fn read_csv_responses(path: String) -> SurveyResult<Vec<ParsedResponse>> {
    let default_id = make_default_id(&path);
    let (header, records) = get_records(&path)?;
    debug!("read_csv_responses: header: {:?}", header);

    let mut res: Vec<ParsedResponse> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is the first line.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        debug!("read_csv_responses: lineno: {:?} row: {:?}", lineno, line);
        let mut pr = ParsedResponse::default();
        for (column, value) in header.iter().zip(line.iter()) {
            apply_column(&mut pr, column, value, lineno)?;
        }
        if pr.id.is_none() {
            pr.id = Some(default_id(lineno));
        }
        res.push(pr);
    }
    Ok(res)
}

fn get_records(path: &str) -> SurveyResult<(Vec<String>, csv::StringRecordsIntoIter<File>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {})?;
    let header: Vec<String> = rdr
        .headers()
        .context(CsvOpenSnafu {})?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();
    Ok((header, rdr.into_records()))
}

/// The edge table `from,to,layer_number` of an influence network.
pub fn read_network_csv(path: String) -> SurveyResult<Vec<(String, String, u32)>> {
    let (header, records) = get_records(&path)?;
    let column = |name: &str| -> SurveyResult<usize> {
        match header.iter().position(|c| c == name) {
            Some(idx) => Ok(idx),
            None => whatever!("{}: missing column {:?}", path, name),
        }
    };
    let from_idx = column("from")?;
    let to_idx = column("to")?;
    let layer_idx = column("layer_number")?;

    let mut res: Vec<(String, String, u32)> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let cell = |i: usize, name: &str| -> SurveyResult<String> {
            line.get(i)
                .map(|s| s.trim().to_string())
                .context(InvalidCellSnafu {
                    lineno,
                    column: name.to_string(),
                    content: "".to_string(),
                })
        };
        let from = cell(from_idx, "from")?;
        let to = cell(to_idx, "to")?;
        let layer_s = cell(layer_idx, "layer_number")?;
        let layer = layer_s.parse::<u32>().ok().context(InvalidCellSnafu {
            lineno,
            column: "layer_number".to_string(),
            content: layer_s.clone(),
        })?;
        res.push((from, to, layer));
    }
    debug!("read_network_csv: {} edges", res.len());
    Ok(res)
}
