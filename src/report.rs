use std::fmt::Write as _;

use crate::pipeline::{MetadataStatus, RunReport};

const HEADERS: [&str; 3] = ["dataset", "written", "detail"];

pub fn render_report(report: &RunReport) -> String {
    let rows = report
        .outcomes()
        .iter()
        .map(|(filename, outcome)| {
            let mut detail = outcome.status.describe();
            match &outcome.metadata {
                Some(MetadataStatus::Written) => detail.push_str("; metadata written"),
                Some(MetadataStatus::Failed(reason)) => {
                    let _ = write!(detail, "; metadata skipped ({reason})");
                }
                None => {}
            }
            [
                filename.clone(),
                outcome.status.written().to_string(),
                detail,
            ]
        })
        .collect::<Vec<_>>();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    push_line(&mut output, &HEADERS.map(str::to_string), &widths);
    push_line(&mut output, &widths.map(|w| "-".repeat(w)), &widths);
    for row in &rows {
        push_line(&mut output, row, &widths);
    }
    output
}

fn push_line(output: &mut String, cells: &[String; 3], widths: &[usize; 3]) {
    let mut line = String::new();
    for (idx, (cell, &width)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let _ = write!(line, "{cell:<width$}");
    }
    let _ = writeln!(output, "{}", line.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{DatasetOutcome, DatasetStatus};

    #[test]
    fn renders_one_line_per_dataset() {
        let mut report = RunReport::new();
        report.record(
            "indicator_1-1-1.csv".to_string(),
            DatasetOutcome {
                identifier: "u1".to_string(),
                status: DatasetStatus::Written,
                metadata: Some(MetadataStatus::Written),
            },
        );
        report.record(
            "indicator_2-1-1.csv".to_string(),
            DatasetOutcome {
                identifier: "u2".to_string(),
                status: DatasetStatus::NoData,
                metadata: None,
            },
        );
        let rendered = render_report(&report);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "dataset              written  detail"
        );
        assert_eq!(
            lines[2],
            "indicator_1-1-1.csv  true     written; metadata written"
        );
        assert_eq!(lines[3], "indicator_2-1-1.csv  false    no data available");
    }
}
