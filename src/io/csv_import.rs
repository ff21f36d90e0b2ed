use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::errors::{GanttError, Result};
use crate::model::calendar;
use crate::model::TaskRecord;

/// Task records read from a CSV file, and how many rows were dropped.
#[derive(Debug, Clone, Default)]
pub struct CsvImport {
    pub records: Vec<TaskRecord>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Name,
    Start,
    End,
    Progress,
    Resource,
    Dependencies,
    Subtasks,
    Parent,
    ChangeResource,
    Issue,
}

/// Map a status word or a number to progress in percent.
fn parse_progress(s: &str) -> f64 {
    let s = s.trim().trim_end_matches('%');
    if let Ok(n) = s.parse::<f64>() {
        return n.clamp(0.0, 100.0);
    }
    match s.to_lowercase().as_str() {
        "finished" | "done" | "complete" | "completed" => 100.0,
        "in progress" | "in-progress" | "active" | "started" => 50.0,
        "released" | "planned" => 25.0,
        _ => 0.0,
    }
}

/// Normalize a date cell to `YYYY-MM-DD HH:mm:ss`. Empty cells are `None`;
/// cells no format accepts are an error.
fn parse_date(s: &str) -> std::result::Result<Option<String>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let date = calendar::parse(s).ok().or_else(|| {
        ["%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y", "%m-%d-%Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    });
    match date {
        Some(d) => Ok(Some(calendar::format(d, "YYYY-MM-DD HH:mm:ss", "en"))),
        None => Err(s.to_string()),
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "y" | "1" | "x")
}

/// Detect delimiter by checking the first line for common separators.
fn detect_delimiter(first_line: &str) -> u8 {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    let tabs = first_line.matches('\t').count();

    if semicolons > commas && semicolons >= tabs {
        b';'
    } else if tabs > commas {
        b'\t'
    } else {
        b','
    }
}

fn normalize_header(h: &str) -> String {
    h.trim().to_lowercase().replace([' ', '-', '_'], "")
}

fn header_to_column(normalized: &str) -> Option<Column> {
    match normalized {
        "id" | "taskid" | "key" | "code" => Some(Column::Id),
        "name" | "task" | "tasklabel" | "taskname" | "label" | "title" | "activity" | "operation" => {
            Some(Column::Name)
        }
        "start" | "startdate" | "from" | "begin" | "begindate" => Some(Column::Start),
        "end" | "enddate" | "to" | "finish" | "finishdate" | "due" | "duedate" => Some(Column::End),
        "progress" | "status" | "state" | "percent" | "complete" => Some(Column::Progress),
        "resource" | "resourceid" | "machine" | "workcenter" | "line" => Some(Column::Resource),
        "dependencies" | "dependson" | "predecessors" | "after" => Some(Column::Dependencies),
        "subtasks" | "children" => Some(Column::Subtasks),
        "parent" | "parenttask" | "parentid" | "parentname" | "subtaskof" => Some(Column::Parent),
        "changeresource" | "movable" => Some(Column::ChangeResource),
        "issue" | "issuetype" => Some(Column::Issue),
        _ => None,
    }
}

/// Split an id list cell. Commas belong to the CSV, so lists inside a cell
/// are separated by `;` or `|`.
fn split_ids(s: &str) -> Vec<String> {
    s.split([';', '|'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Import task records from a CSV file.
///
/// Auto-detects the delimiter (comma, semicolon, tab) and matches headers
/// loosely ("Task Name", "start_date", ...). A name column is required; rows
/// without a name or with an unreadable date are skipped and counted.
pub fn import_csv(path: &Path) -> Result<CsvImport> {
    let content = std::fs::read_to_string(path)?;
    let import = import_str(&content)?;
    log::info!(
        "imported {} tasks from {} ({} rows skipped)",
        import.records.len(),
        path.display(),
        import.skipped
    );
    Ok(import)
}

pub fn import_str(content: &str) -> Result<CsvImport> {
    let first_line = content.lines().next().unwrap_or("");
    let delimiter = detect_delimiter(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let columns: Vec<Option<Column>> = headers
        .iter()
        .map(|h| header_to_column(&normalize_header(h)))
        .collect();
    if !columns.contains(&Some(Column::Name)) {
        let found: Vec<&str> = headers.iter().collect();
        return Err(GanttError::Import(format!(
            "no task name column; found headers {found:?}"
        )));
    }

    let mut records = Vec::new();
    let mut parents: Vec<Option<String>> = Vec::new();
    let mut skipped = 0usize;

    for (i, row) in reader.records().enumerate() {
        let line = i + 2;
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping CSV row {line}: {e}");
                skipped += 1;
                continue;
            }
        };

        let mut record = TaskRecord::default();
        let mut parent = None;
        let mut bad_date = None;
        for (field, column) in row.iter().zip(&columns) {
            let Some(column) = column else {
                continue;
            };
            match column {
                Column::Id => record.id = Some(field.to_string()).filter(|s| !s.is_empty()),
                Column::Name => record.name = field.to_string(),
                Column::Start => match parse_date(field) {
                    Ok(d) => record.start = d,
                    Err(raw) => bad_date = Some(raw),
                },
                Column::End => match parse_date(field) {
                    Ok(d) => record.end = d,
                    Err(raw) => bad_date = Some(raw),
                },
                Column::Progress => record.progress = parse_progress(field),
                Column::Resource => record.resourceid = Some(field.to_string()).filter(|s| !s.is_empty()),
                Column::Dependencies => record.dependencies = split_ids(field),
                Column::Subtasks => record.subtasks = split_ids(field),
                Column::Parent => parent = Some(field.to_string()).filter(|s| !s.is_empty()),
                Column::ChangeResource => record.changeresource = parse_flag(field),
                Column::Issue => record.issuetype = Some(field.to_string()).filter(|s| !s.is_empty()),
            }
        }

        if record.name.is_empty() {
            skipped += 1;
            continue;
        }
        if let Some(raw) = bad_date {
            log::warn!("skipping CSV row {line}: unreadable date '{raw}'");
            skipped += 1;
            continue;
        }
        if record.id.is_none() {
            record.id = Some(uuid::Uuid::new_v4().to_string());
        }
        parents.push(parent);
        records.push(record);
    }

    if records.is_empty() {
        return Err(GanttError::Import(format!(
            "no usable rows ({skipped} skipped)"
        )));
    }

    // Parent cells may hold an id or another row's name.
    let by_name: HashMap<String, String> = records
        .iter()
        .filter_map(|r| Some((r.name.to_lowercase(), r.id.clone()?)))
        .collect();
    for (record, parent) in records.iter_mut().zip(parents) {
        let Some(parent) = parent else {
            continue;
        };
        let id = by_name
            .get(&parent.to_lowercase())
            .cloned()
            .unwrap_or(parent);
        if record.id.as_deref() != Some(id.as_str()) {
            record.parenttask = Some(id);
        }
    }

    Ok(CsvImport { records, skipped })
}
