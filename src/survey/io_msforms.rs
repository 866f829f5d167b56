use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::survey::io_common::{apply_column, make_default_id};
use crate::survey::*;

/// One response per row of the worksheet, with a header row. The columns are
/// the same as for CSV exports.
pub fn read_msforms_responses(path: String, cfs: &FileSource) -> SurveyResult<Vec<ParsedResponse>> {
    let default_id = make_default_id(&path);

    let wrange = get_range(&path, cfs)?;

    let mut header: Vec<String> = Vec::new();
    for (idx, cell) in wrange.rows().next().context(EmptyExcelSnafu {})?.iter().enumerate() {
        let name = read_cell(cell, 1, &format!("#{}", idx + 1))?;
        header.push(name.trim().to_string());
    }
    debug!("read_msforms_responses: header: {:?}", header);

    let mut iter = wrange.rows();
    iter.next();
    let mut res: Vec<ParsedResponse> = Vec::new();
    for (idx, row) in iter.enumerate() {
        // Rows are numbered from 1, the header included.
        let lineno = idx + 2;
        debug!("read_msforms_responses: lineno: {:?} row: {:?}", lineno, row);
        let mut pr = ParsedResponse::default();
        for (column, cell) in header.iter().zip(row.iter()) {
            let value = read_cell(cell, lineno, column)?;
            apply_column(&mut pr, column, &value, lineno)?;
        }
        if pr.id.is_none() {
            pr.id = Some(default_id(lineno));
        }
        res.push(pr);
    }
    Ok(res)
}

/// The text of a cell. Dates are kept as Excel serial numbers.
fn read_cell(cell: &DataType, lineno: usize, column: &str) -> SurveyResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::DateTime(f) => Ok(f.to_string()),
        DataType::Bool(b) => Ok(b.to_string()),
        DataType::Empty => Ok("".to_string()),
        _ => Err(SurveyError::ExcelWrongCellType {
            lineno,
            column: column.to_string(),
            content: format!("{:?}", cell),
        }),
    }
}

fn get_range(path: &String, cfs: &FileSource) -> SurveyResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "read_excel_file: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let p = path.clone();
    let mut workbook: Xlsx<_> =
        open_workbook(p).context(OpeningExcelSnafu { path: path.clone() })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path: path.clone() })?;

        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu {}.fail(),
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_excel_file: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => whatever!(
                "{}: the workbook has several worksheets, the worksheet name must be provided",
                path
            ),
        }
    }
}
