use colored::{ColoredString, Colorize};

use super::Finding;

const HEADERS: [&str; 4] = ["URL", "Method", "Status", "Response Snippet"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_scanned: usize,
    pub urls_checked: usize,
    pub endpoints_found: usize,
    pub output_path: String,
    pub aborted: bool,
}

fn flatten(cell: &str) -> String {
    cell.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn paint(column: usize, cell: &str) -> ColoredString {
    match column {
        0 => cell.magenta(),
        1 => cell.bright_magenta(),
        2 => cell.cyan(),
        _ => cell.bright_blue(),
    }
}

fn border(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for w in widths {
        line.push_str(&"-".repeat(w + 2));
        line.push('+');
    }
    line
}

/// Bordered table of findings, one ruled row per finding.
pub fn render_table(findings: &[Finding]) -> String {
    let rows: Vec<[String; 4]> = super::table_rows(findings)
        .into_iter()
        .map(|row| row.map(|cell| flatten(&cell)))
        .collect();

    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();
    for row in rows.iter() {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let rule = border(&widths);
    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push('|');
    for (i, h) in HEADERS.iter().enumerate() {
        let padded = format!(" {:<width$} ", h, width = widths[i]);
        out.push_str(&padded.bold().bright_magenta().to_string());
        out.push('|');
    }
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    for row in rows.iter() {
        out.push('|');
        for (i, cell) in row.iter().enumerate() {
            let padded = format!(" {:<width$} ", cell, width = widths[i]);
            out.push_str(&paint(i, &padded).to_string());
            out.push('|');
        }
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
    }
    out
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    if summary.aborted {
        out.push_str(&format!("{}\n", "Scan aborted.".bold().yellow()));
    } else {
        out.push_str(&format!("{}\n", "Scan complete.".bold().bright_magenta()));
    }
    out.push_str(&format!(
        "{} {}\n",
        "Total files scanned:".bright_magenta(),
        summary.files_scanned.to_string().bold().white()
    ));
    out.push_str(&format!(
        "{} {}\n",
        "Total URLs checked:".bright_magenta(),
        summary.urls_checked.to_string().bold().white()
    ));
    out.push_str(&format!(
        "{} {}\n",
        "API endpoints found:".bright_magenta(),
        summary.endpoints_found.to_string().bold().green()
    ));
    out.push_str(&format!(
        "{} {}\n",
        "Results saved to".bright_magenta(),
        summary.output_path.bold().blue()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain<F: FnOnce() -> String>(f: F) -> String {
        colored::control::set_override(false);
        let out = f();
        colored::control::unset_override();
        out
    }

    #[test]
    fn table_pads_columns_and_flattens_newlines() {
        let findings = vec![Finding {
            url: "http://x.test/api/users".to_string(),
            method: "GET".to_string(),
            status: 200,
            snippet: "{\n\"a\":1}".to_string(),
            content_type: "application/json".to_string(),
        }];
        let table = plain(|| render_table(&findings));
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].contains("URL"));
        assert!(lines[3].contains("| http://x.test/api/users | GET    | 200    |"));
        assert!(lines[3].contains("{ \"a\":1}"));
        assert!(lines.iter().all(|l| l.chars().count() == lines[0].chars().count()));
    }

    #[test]
    fn summary_reports_counts_and_location() {
        let text = plain(|| {
            render_summary(&RunSummary {
                files_scanned: 3,
                urls_checked: 16,
                endpoints_found: 2,
                output_path: "x.test_root_found_apis.json".to_string(),
                aborted: false,
            })
        });
        assert!(text.contains("Scan complete."));
        assert!(text.contains("Total files scanned: 3"));
        assert!(text.contains("Total URLs checked: 16"));
        assert!(text.contains("API endpoints found: 2"));
        assert!(text.contains("Results saved to x.test_root_found_apis.json"));
    }
}
