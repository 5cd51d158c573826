//! English to German administrative-area names.
//!
//! The geocoder answers in English for a handful of German states. The table
//! is closed; anything not listed passes through unchanged.

const REGION_TRANSLATIONS: &[(&str, &str)] = &[
    ("Rhineland-Palatinate", "Rheinland-Pfalz"),
    ("Bavaria", "Bayern"),
    ("North Rhine-Westphalia", "Nordrhein-Westfalen"),
    ("Lower Saxony", "Niedersachsen"),
    ("Saxony", "Sachsen"),
    ("Saxony-Anhalt", "Sachsen-Anhalt"),
];

/// Translate a region name, returning the input when no mapping exists.
pub fn translate_region(region: &str) -> &str {
    REGION_TRANSLATIONS
        .iter()
        .find(|(english, _)| *english == region)
        .map(|(_, german)| *german)
        .unwrap_or(region)
}
