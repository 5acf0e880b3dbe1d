//! Plain-text rendering of the view models for the terminal front end.

use epd_core::csv_preview::CsvPreview;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::views::{MappingEditorView, ProgressView, ResultsView};

/// Longest cell text before it is cut off.
const MAX_CELL_WIDTH: usize = 32;

/// Headers and preview rows as a table, followed by the total row count.
pub fn render_preview(preview: &CsvPreview) -> String {
    let mut table = Builder::default();
    table.push_record(preview.headers.iter().map(|h| truncate(h)));
    for row in &preview.rows {
        table.push_record(row.iter().map(|v| truncate(v)));
    }

    let mut output = table.build().with(Style::modern()).to_string();
    output.push_str(&format!(
        "\n{} data row(s), showing {}\n",
        preview.total_row_count,
        preview.rows.len()
    ));
    output
}

pub fn render_mapping_editor(view: &MappingEditorView) -> String {
    let mut table = Builder::default();
    table.push_record(["Column", "Samples", "Field", "Suggestions"]);
    for row in &view.rows {
        let field = match &row.selected {
            Some(key) => view
                .import_type
                .field(key)
                .map(|f| format!("{} ({key})", f.display_label))
                .unwrap_or_else(|| key.clone()),
            None => "-".to_string(),
        };
        let suggestions = row
            .suggestions
            .iter()
            .map(|c| c.key)
            .collect::<Vec<_>>()
            .join(", ");

        table.push_record([
            truncate(&row.source_column),
            truncate(&row.samples.join(" | ")),
            field,
            suggestions,
        ]);
    }

    let mut output = format!("{} import mapping\n", view.import_type.label());
    output.push_str(&table.build().with(Style::modern()).to_string());
    output.push_str(&format!(
        "\n{} of {} column(s) mapped, {} row(s) to import\n",
        view.mapped_columns,
        view.rows.len(),
        view.total_row_count
    ));
    if !view.missing_required.is_empty() {
        output.push_str(&format!(
            "Required fields not mapped: {}\n",
            view.missing_required.join(", ")
        ));
    }
    output
}

pub fn render_progress(view: &ProgressView) -> String {
    format!(
        "{} - {} succeeded, {} failed",
        view.summary(),
        view.successful_rows,
        view.failed_rows
    )
}

pub fn render_results(view: &ResultsView) -> String {
    let mut output = String::new();
    output.push_str(if view.succeeded {
        "Import completed\n"
    } else {
        "Import failed\n"
    });

    let mut summary = Builder::default();
    summary.push_record(["Total rows", &view.total_rows.to_string()]);
    summary.push_record(["Imported", &view.successful_rows.to_string()]);
    summary.push_record(["Failed", &view.failed_rows.to_string()]);
    output.push_str(&summary.build().with(Style::modern()).to_string());
    output.push('\n');

    if !view.categories.is_empty() {
        output.push_str("\nErrors by category\n");
        let mut categories = Builder::default();
        for category in &view.categories {
            categories.push_record([category.label, &category.count.to_string()]);
        }
        output.push_str(&categories.build().with(Style::modern()).to_string());
        output.push('\n');
    }

    if !view.errors.is_empty() {
        output.push_str("\nRow errors\n");
        let mut errors = Builder::default();
        errors.push_record(["Row", "Field", "Message"]);
        for error in &view.errors {
            errors.push_record([
                error.row_number.to_string(),
                error.field_name.clone().unwrap_or_default(),
                error.message.clone(),
            ]);
        }
        output.push_str(&errors.build().with(Style::modern()).to_string());
        output.push('\n');
        if view.remaining_errors > 0 {
            output.push_str(&format!("... and {} more\n", view.remaining_errors));
        }
    }

    output
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_WIDTH {
        s.to_string()
    } else {
        let cut: String = s.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{cut}...")
    }
}
