//! Column auto-mapper.
//!
//! Proposes a [`ColumnMapping`] for a set of CSV headers using a
//! [`FieldMappingTable`]:
//!
//! 1. exact, case-sensitive lookup in the direct mappings;
//! 2. otherwise the first alternatives entry (in declared order) whose
//!    names equal the header or are contained in it, case-insensitively;
//! 3. otherwise the column stays unmapped.
//!
//! Because step 2 is ambiguous by nature, [`suggest`] also exposes every
//! candidate per header, ranked, and [`HeuristicPolicy::SuggestOnly`] keeps
//! substring matches out of the applied mapping.

use serde::{Deserialize, Serialize};

use crate::field_mapping::FieldMappingTable;
use crate::fields::ImportType;
use crate::mapping::ColumnMapping;

/// How a header matched a canonical field. Ordered strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Listed verbatim in the direct mappings.
    Direct,
    /// Equal to an alternative name, ignoring case.
    Exact,
    /// Contains an alternative name, ignoring case.
    Contains,
}

/// One possible target for a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub key: &'static str,
    pub kind: MatchKind,
}

/// All candidates for one header, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderSuggestion {
    pub header: String,
    pub candidates: Vec<Candidate>,
}

impl HeaderSuggestion {
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

/// Which matches [`auto_map_with`] applies to the mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicPolicy {
    /// Apply direct matches, then the first alternatives entry that matches
    /// by equality or containment.
    Apply,
    /// Apply direct matches and unambiguous case-insensitive equality only,
    /// never claiming a target twice. Substring matches remain suggestions.
    #[default]
    SuggestOnly,
}

/// Propose a mapping with [`HeuristicPolicy::Apply`].
pub fn auto_map(
    headers: &[String],
    import_type: ImportType,
    table: &FieldMappingTable,
) -> ColumnMapping {
    auto_map_with(headers, import_type, table, HeuristicPolicy::Apply)
}

/// Propose a mapping under an explicit policy. Pure and deterministic.
pub fn auto_map_with(
    headers: &[String],
    import_type: ImportType,
    table: &FieldMappingTable,
    policy: HeuristicPolicy,
) -> ColumnMapping {
    let mut mapping = ColumnMapping::new();

    for header in headers {
        let target = match policy {
            HeuristicPolicy::Apply => direct_match(header, import_type, table).or_else(|| {
                alternative_matches(header, import_type, table)
                    .first()
                    .map(|c| c.key)
            }),
            HeuristicPolicy::SuggestOnly => {
                confident_match(header, import_type, table).filter(|key| !mapping.is_target_used(key))
            }
        };

        if let Some(key) = target {
            mapping.update(header, Some(key));
        }
    }

    mapping
}

/// Every candidate for every header, ranked by [`MatchKind`] and then by
/// declaration order in the table.
pub fn suggest(
    headers: &[String],
    import_type: ImportType,
    table: &FieldMappingTable,
) -> Vec<HeaderSuggestion> {
    headers
        .iter()
        .map(|header| HeaderSuggestion {
            header: header.clone(),
            candidates: candidates_for(header, import_type, table),
        })
        .collect()
}

/// Ranked candidates for a single header.
pub fn candidates_for(
    header: &str,
    import_type: ImportType,
    table: &FieldMappingTable,
) -> Vec<Candidate> {
    let direct = direct_match(header, import_type, table);
    let mut candidates: Vec<Candidate> = direct
        .map(|key| Candidate {
            key,
            kind: MatchKind::Direct,
        })
        .into_iter()
        .collect();

    candidates.extend(
        alternative_matches(header, import_type, table)
            .into_iter()
            .filter(|c| Some(c.key) != direct),
    );
    // Stable sort keeps declaration order within a kind.
    candidates.sort_by_key(|c| c.kind);
    candidates
}

// ---- private helpers ----

fn direct_match(
    header: &str,
    import_type: ImportType,
    table: &FieldMappingTable,
) -> Option<&'static str> {
    table
        .direct_target(header)
        .filter(|key| import_type.has_field(key))
}

/// Alternatives entries matching `header`, in declaration order.
fn alternative_matches(
    header: &str,
    import_type: ImportType,
    table: &FieldMappingTable,
) -> Vec<Candidate> {
    let needle = header.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    table
        .alternatives
        .iter()
        .filter(|(key, _)| import_type.has_field(key))
        .filter_map(|(key, alts)| {
            let kind = if alts.iter().any(|alt| needle == *alt) {
                MatchKind::Exact
            } else if alts.iter().any(|alt| needle.contains(alt)) {
                MatchKind::Contains
            } else {
                return None;
            };
            Some(Candidate { key: *key, kind })
        })
        .collect()
}

/// Direct match, or the single case-insensitive exact alternative match.
fn confident_match(
    header: &str,
    import_type: ImportType,
    table: &FieldMappingTable,
) -> Option<&'static str> {
    if let Some(key) = direct_match(header, import_type, table) {
        return Some(key);
    }
    let exact: Vec<_> = alternative_matches(header, import_type, table)
        .into_iter()
        .filter(|c| c.kind == MatchKind::Exact)
        .collect();
    match exact.as_slice() {
        [only] => Some(only.key),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_mapping::DUTCH;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dutch_headers_map_through_direct_mappings() {
        let mapping = auto_map(
            &headers(&["Voornaam", "Achternaam", "E-mailadres"]),
            ImportType::Clients,
            &DUTCH,
        );
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.get("Voornaam"), Some("first_name"));
        assert_eq!(mapping.get("Achternaam"), Some("last_name"));
        assert_eq!(mapping.get("E-mailadres"), Some("email"));
    }

    #[test]
    fn direct_match_beats_alternative_substring() {
        // "Voornaam" contains "naam", an alternative of last_name, but the
        // direct mapping must win.
        let candidates = candidates_for("Voornaam", ImportType::Clients, &DUTCH);
        assert!(candidates.iter().any(|c| c.key == "last_name"));

        let mapping = auto_map(&headers(&["Voornaam"]), ImportType::Clients, &DUTCH);
        assert_eq!(mapping.get("Voornaam"), Some("first_name"));
    }

    #[test]
    fn alternatives_match_case_insensitively_and_by_containment() {
        let mapping = auto_map(
            &headers(&["VOORNAAM", "Mailadres klant", "Unrelated"]),
            ImportType::Clients,
            &DUTCH,
        );
        assert_eq!(mapping.get("VOORNAAM"), Some("first_name"));
        assert_eq!(mapping.get("Mailadres klant"), Some("email"));
        assert_eq!(mapping.get("Unrelated"), None);
    }

    #[test]
    fn first_declared_alternative_wins() {
        // "Naam huisarts" contains "naam" (last_name) and "huisarts"
        // (general_practitioner); last_name is declared first.
        let mapping = auto_map(&headers(&["Naam huisarts"]), ImportType::Clients, &DUTCH);
        assert_eq!(mapping.get("Naam huisarts"), Some("last_name"));
    }

    #[test]
    fn auto_map_is_deterministic() {
        let input = headers(&["Naam", "Geb. datum", "Telefoon mobiel", "Postcode", "Stad"]);
        let first = auto_map(&input, ImportType::Clients, &DUTCH);
        for _ in 0..10 {
            assert_eq!(auto_map(&input, ImportType::Clients, &DUTCH), first);
        }
    }

    #[test]
    fn fields_outside_the_import_type_are_ignored() {
        let mapping = auto_map(&headers(&["BSN"]), ImportType::Therapists, &DUTCH);
        assert!(mapping.is_empty());
    }

    #[test]
    fn suggest_ranks_all_candidates() {
        let suggestions = suggest(&headers(&["Naam huisarts"]), ImportType::Clients, &DUTCH);
        let keys: Vec<_> = suggestions[0].candidates.iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["last_name", "general_practitioner"]);
        assert!(suggestions[0]
            .candidates
            .iter()
            .all(|c| c.kind == MatchKind::Contains));
    }

    #[test]
    fn exact_alternative_ranks_above_containment() {
        let candidates = candidates_for("straat", ImportType::Clients, &DUTCH);
        assert_eq!(candidates[0].key, "street");
        assert_eq!(candidates[0].kind, MatchKind::Exact);
    }

    #[test]
    fn suggest_only_skips_substring_matches() {
        let mapping = auto_map_with(
            &headers(&["Voornaam", "voorletters", "Naam huisarts"]),
            ImportType::Clients,
            &DUTCH,
            HeuristicPolicy::SuggestOnly,
        );
        assert_eq!(mapping.get("Voornaam"), Some("first_name"));
        // Exact alternative of first_name, but the target is already claimed.
        assert_eq!(mapping.get("voorletters"), None);
        assert_eq!(mapping.get("Naam huisarts"), None);
    }

    #[test]
    fn suggest_only_applies_unambiguous_exact_alternative() {
        let mapping = auto_map_with(
            &headers(&["sofinummer", "huisnr"]),
            ImportType::Clients,
            &DUTCH,
            HeuristicPolicy::SuggestOnly,
        );
        assert_eq!(mapping.get("sofinummer"), Some("bsn"));
        assert_eq!(mapping.get("huisnr"), Some("house_number"));
    }
}
