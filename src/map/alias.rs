// ---------------------------------------------------------------------------
// OWID location label → world GeoJSON `properties.name`
// ---------------------------------------------------------------------------

/// Labels that differ between the OWID dataset and the world GeoJSON.
/// Anything not listed is assumed to match verbatim.
const ALIASES: &[(&str, &str)] = &[
    ("United States", "United States of America"),
    ("Democratic Republic of Congo", "Democratic Republic of the Congo"),
    ("Congo", "Republic of the Congo"),
    ("Cote d'Ivoire", "Ivory Coast"),
    ("Tanzania", "United Republic of Tanzania"),
    ("Czechia", "Czech Republic"),
    ("Serbia", "Republic of Serbia"),
    ("North Macedonia", "Macedonia"),
    ("Guinea-Bissau", "Guinea Bissau"),
    ("Bahamas", "The Bahamas"),
    ("Timor", "East Timor"),
    ("Eswatini", "Swaziland"),
    ("Palestine", "West Bank"),
];

/// Name to look up in the GeoJSON for a dataset location.
pub fn geo_name(location: &str) -> &str {
    ALIASES
        .iter()
        .find(|(owid, _)| *owid == location)
        .map(|(_, geo)| *geo)
        .unwrap_or(location)
}
