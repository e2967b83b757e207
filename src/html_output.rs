//! HTML report rendering
//!
//! Self-contained document with embedded CSS; every section is a plain table.

use crate::conflict::ConflictKind;
use crate::report::Report;
use std::collections::BTreeMap;

/// HTML report formatter
#[derive(Debug)]
pub struct HtmlReport<'a> {
    report: &'a Report,
    title: String,
}

impl<'a> HtmlReport<'a> {
    pub fn new(report: &'a Report) -> Self {
        Self {
            report,
            title: "I/O Trace Report".to_string(),
        }
    }

    /// Override the document title (e.g. with the trace path)
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Escape HTML special characters
    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    fn generate_styles() -> &'static str {
        r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px;
            background-color: #f5f5f5;
        }
        h1, h2 {
            color: #333;
        }
        table {
            border-collapse: collapse;
            width: 100%;
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }
        th, td {
            border: 1px solid #ddd;
            padding: 8px;
            text-align: left;
        }
        th {
            background-color: #4a90d9;
            color: white;
            font-weight: bold;
        }
        tr:nth-child(even) {
            background-color: #f9f9f9;
        }
        .file {
            font-family: monospace;
            color: #0066cc;
        }
        .num {
            font-family: monospace;
            text-align: right;
        }
        .conflict {
            color: #cc0000;
            font-weight: bold;
        }
        .stats-table th {
            background-color: #5cb85c;
        }
        .footer {
            margin-top: 20px;
            font-size: 0.8em;
            color: #888;
            text-align: center;
        }
        "#
    }

    fn header_row(headers: &[&str]) -> String {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| format!("<th>{}</th>", Self::escape_html(h)))
            .collect();
        format!("<tr>{}</tr>", cells.join(""))
    }

    fn open_table(html: &mut String, title: &str, class: Option<&str>, headers: &[&str]) {
        html.push_str(&format!("    <h2>{}</h2>\n", Self::escape_html(title)));
        match class {
            Some(class) => html.push_str(&format!("    <table class=\"{}\">\n", class)),
            None => html.push_str("    <table>\n"),
        }
        html.push_str("        ");
        html.push_str(&Self::header_row(headers));
        html.push('\n');
    }

    fn push_row(html: &mut String, cells: &[String]) {
        html.push_str("        <tr>");
        for cell in cells {
            html.push_str(cell);
        }
        html.push_str("</tr>\n");
    }

    fn text_cell(text: &str) -> String {
        format!("<td>{}</td>", Self::escape_html(text))
    }

    fn file_cell(name: &str) -> String {
        format!(r#"<td class="file">{}</td>"#, Self::escape_html(name))
    }

    fn num_cell(value: impl std::fmt::Display) -> String {
        format!(r#"<td class="num">{}</td>"#, value)
    }

    /// Generate the complete HTML document
    pub fn to_html(&self) -> String {
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n");
        html.push_str("<html lang=\"en\">\n");

        html.push_str("<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str(
            "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        html.push_str(&format!(
            "    <title>{}</title>\n",
            Self::escape_html(&self.title)
        ));
        html.push_str("    <style>");
        html.push_str(Self::generate_styles());
        html.push_str("</style>\n");
        html.push_str("</head>\n");

        html.push_str("<body>\n");
        html.push_str(&format!("    <h1>{}</h1>\n", Self::escape_html(&self.title)));

        self.render_ranks(&mut html);
        self.render_layers(&mut html);
        self.render_functions(&mut html);
        self.render_patterns(&mut html);
        self.render_conflicts(&mut html);
        self.render_statistics(&mut html);
        Self::render_sizes(&mut html, "Read Sizes", &self.report.summary.read_sizes);
        Self::render_sizes(&mut html, "Write Sizes", &self.report.summary.write_sizes);
        self.render_diagnostics(&mut html);

        html.push_str("    <div class=\"footer\">\n");
        html.push_str("        Generated by iovista\n");
        html.push_str("    </div>\n");

        html.push_str("</body>\n");
        html.push_str("</html>\n");

        html
    }

    fn render_ranks(&self, html: &mut String) {
        let summary = &self.report.summary;
        Self::open_table(html, "Records per Rank", None, &["Rank", "Records", "Files"]);
        for (rank, counts) in summary.ranks.iter().enumerate() {
            Self::push_row(
                html,
                &[
                    Self::num_cell(rank),
                    Self::num_cell(counts.records),
                    Self::num_cell(counts.files),
                ],
            );
        }
        Self::push_row(
            html,
            &[
                Self::text_cell("total"),
                Self::num_cell(summary.total_records()),
                Self::num_cell(summary.total_rank_files()),
            ],
        );
        html.push_str("    </table>\n");
    }

    fn render_layers(&self, html: &mut String) {
        let layers = self.report.summary.layers;
        Self::open_table(html, "Calls per Layer", None, &["Layer", "Calls"]);
        let rows = [
            ("HDF5", layers.hdf5),
            ("MPI", layers.mpi),
            ("POSIX", layers.posix),
        ];
        for (label, calls) in rows {
            Self::push_row(html, &[Self::text_cell(label), Self::num_cell(calls)]);
        }
        html.push_str("    </table>\n");
    }

    fn render_functions(&self, html: &mut String) {
        let summary = &self.report.summary;
        Self::open_table(html, "Function Calls", None, &["Function", "Calls"]);
        for function in &summary.functions {
            Self::push_row(
                html,
                &[Self::text_cell(&function.name), Self::num_cell(function.calls)],
            );
        }
        html.push_str("    </table>\n");

        Self::open_table(html, "Function Time", None, &["Function", "Seconds"]);
        for function in summary.functions_by_time() {
            Self::push_row(
                html,
                &[
                    Self::text_cell(&function.name),
                    Self::num_cell(format!("{:.6}", function.time)),
                ],
            );
        }
        html.push_str("    </table>\n");
    }

    fn render_patterns(&self, html: &mut String) {
        let patterns = &self.report.patterns;
        let total = patterns.total();
        Self::open_table(html, "Access Patterns", None, &["Pattern", "Count", "%"]);
        for (label, count) in patterns.entries() {
            let pct = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            Self::push_row(
                html,
                &[
                    Self::text_cell(label),
                    Self::num_cell(count),
                    Self::num_cell(format!("{:.2}", pct)),
                ],
            );
        }
        html.push_str("    </table>\n");
    }

    fn render_conflicts(&self, html: &mut String) {
        let labels: Vec<String> = ConflictKind::ALL
            .iter()
            .flat_map(|k| [format!("{} same rank", k), format!("{} diff rank", k)])
            .collect();
        let mut headers = vec!["File"];
        headers.extend(labels.iter().map(String::as_str));

        Self::open_table(html, "Conflicts", None, &headers);
        for (file, tally) in &self.report.conflicts {
            let mut cells = vec![Self::file_cell(file)];
            for kind in ConflictKind::ALL {
                let split = tally.get(kind);
                for count in [split.same_rank, split.different_rank] {
                    if count > 0 && kind != ConflictKind::Rar {
                        cells.push(format!(r#"<td class="num conflict">{}</td>"#, count));
                    } else {
                        cells.push(Self::num_cell(count));
                    }
                }
            }
            Self::push_row(html, &cells);
        }
        html.push_str("    </table>\n");
    }

    fn render_statistics(&self, html: &mut String) {
        Self::open_table(
            html,
            "File Statistics",
            Some("stats-table"),
            &[
                "File",
                "Bytes written",
                "Write time (s)",
                "Write MB/s",
                "Bytes read",
                "Read time (s)",
                "Read MB/s",
                "Metadata time (s)",
            ],
        );
        for (file, stats) in &self.report.statistics {
            Self::push_row(
                html,
                &[
                    Self::file_cell(file),
                    Self::num_cell(stats.bytes_written),
                    Self::num_cell(format!("{:.6}", stats.write_time)),
                    Self::num_cell(format!("{:.2}", stats.write_bandwidth())),
                    Self::num_cell(stats.bytes_read),
                    Self::num_cell(format!("{:.6}", stats.read_time)),
                    Self::num_cell(format!("{:.2}", stats.read_bandwidth())),
                    Self::num_cell(format!("{:.6}", stats.metadata_time)),
                ],
            );
        }
        html.push_str("    </table>\n");
    }

    fn render_sizes(html: &mut String, title: &str, sizes: &BTreeMap<u64, u64>) {
        Self::open_table(html, title, None, &["Bytes", "Count"]);
        for (size, count) in sizes {
            Self::push_row(html, &[Self::num_cell(size), Self::num_cell(count)]);
        }
        html.push_str("    </table>\n");
    }

    fn render_diagnostics(&self, html: &mut String) {
        let d = self.report.diagnostics;
        Self::open_table(html, "Skipped Records", None, &["Reason", "Records"]);
        for (label, count) in [
            ("unknown function", d.out_of_range),
            ("no file argument", d.unresolved_file),
            ("ignored file", d.ignored_file),
            ("malformed arguments", d.malformed_args),
            ("negative duration", d.negative_duration),
        ] {
            Self::push_row(html, &[Self::text_cell(label), Self::num_cell(count)]);
        }
        html.push_str("    </table>\n");
    }
}
