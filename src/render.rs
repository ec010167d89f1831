//! HTML fragments for the selection list and the results table.
//!
//! Every file name comes from the user or the service, so all of them pass
//! through [`escape_html`] before they reach the markup.

use crate::format::{escape_html, format_file_size};
use crate::model::{ConversionResult, SelectedFile};
use std::fmt::Write;

/// `<ul>` of selected files, one `<li>` per file with its size.
pub fn render_selection_html(files: &[SelectedFile]) -> String {
    let mut html = String::from("<ul class=\"file-list\">\n");
    for (index, file) in files.iter().enumerate() {
        let _ = writeln!(
            html,
            "  <li data-index=\"{index}\"><span class=\"file-name\">{}</span> \
             <span class=\"file-size\">{}</span></li>",
            escape_html(&file.name),
            format_file_size(file.size),
        );
    }
    html.push_str("</ul>\n");
    html
}

/// `<table>` of results with a download link for each row that has a file id.
///
/// `download_url` maps a file id to its download URL.
pub fn render_results_html(
    results: &[ConversionResult],
    download_url: impl Fn(&str) -> String,
) -> String {
    let mut html = String::from(
        "<table class=\"results\">\n  <thead><tr><th>File</th><th>Status</th>\
         <th>Size</th><th></th></tr></thead>\n  <tbody>\n",
    );

    for result in results {
        let size = result
            .size
            .map(format_file_size)
            .unwrap_or_else(|| "-".to_string());
        let action = match result.file_id.as_deref() {
            Some(id) => format!(
                "<a class=\"download\" href=\"{}\" download=\"{}\">Download</a>",
                escape_html(&download_url(id)),
                escape_html(&result.converted_name),
            ),
            None => "<span class=\"download disabled\">Unavailable</span>".to_string(),
        };
        let _ = writeln!(
            html,
            "    <tr class=\"{status}\"><td title=\"{original}\">{converted}</td>\
             <td>{status}</td><td>{size}</td><td>{action}</td></tr>",
            status = result.status,
            original = escape_html(&result.original_name),
            converted = escape_html(&result.converted_name),
        );
    }

    html.push_str("  </tbody>\n</table>\n");
    html
}
