//! Column mapping editor.
//!
//! One row per CSV header with a few sample values, the selected target
//! and every canonical field as an option. A field already chosen for
//! another column is shown disabled so it is not picked twice by accident;
//! the controller itself does not enforce that.

use epd_core::auto_map::Candidate;
use epd_core::fields::ImportType;
use serde::Serialize;

use crate::session::SessionSnapshot;

/// Sample values shown per column.
pub const SAMPLE_VALUE_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOption {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    /// Used by a different column.
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingRow {
    pub source_column: String,
    pub samples: Vec<String>,
    pub selected: Option<String>,
    pub options: Vec<FieldOption>,
    /// Auto-mapper candidates other than the selected field, best first.
    pub suggestions: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEditorView {
    pub import_type: ImportType,
    pub rows: Vec<MappingRow>,
    /// Labels of required fields no column maps to.
    pub missing_required: Vec<&'static str>,
    pub mapped_columns: usize,
    pub total_row_count: usize,
    pub can_upload: bool,
}

/// Build the editor for a snapshot. `None` until a preview is loaded.
pub fn build_mapping_editor(snapshot: &SessionSnapshot) -> Option<MappingEditorView> {
    let preview = snapshot.preview.as_ref()?;
    let fields = snapshot.import_type.fields();
    let mapping = &snapshot.mapping;

    let rows = preview
        .headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let selected = mapping.get(header);

            let options = fields
                .iter()
                .map(|field| FieldOption {
                    key: field.key,
                    label: field.display_label,
                    required: field.required,
                    disabled: mapping
                        .iter()
                        .any(|(source, target)| target == field.key && source != header),
                })
                .collect();

            let suggestions = snapshot
                .suggestions
                .iter()
                .find(|s| &s.header == header)
                .map(|s| {
                    s.candidates
                        .iter()
                        .filter(|c| Some(c.key) != selected)
                        .copied()
                        .collect()
                })
                .unwrap_or_default();

            MappingRow {
                source_column: header.clone(),
                samples: preview
                    .sample_values(index)
                    .into_iter()
                    .filter(|v| !v.is_empty())
                    .take(SAMPLE_VALUE_LIMIT)
                    .map(String::from)
                    .collect(),
                selected: selected.map(String::from),
                options,
                suggestions,
            }
        })
        .collect();

    let missing_required = fields
        .iter()
        .filter(|f| f.required && !mapping.is_target_used(f.key))
        .map(|f| f.display_label)
        .collect();

    Some(MappingEditorView {
        import_type: snapshot.import_type,
        rows,
        missing_required,
        mapped_columns: mapping.len(),
        total_row_count: preview.total_row_count,
        can_upload: snapshot.can_upload(),
    })
}
