//! Country-name canonicalization across sources. Joins on country identity
//! would otherwise fail on spelling and code differences between datasets.

/// Canonical key and its known variant spellings / ISO codes. Resolution
/// order depends on table order, so the list mirrors the upstream mapping.
const COUNTRY_VARIANTS: &[(&str, &[&str])] = &[
    ("austria", &["austria", "at", "aut"]),
    ("belgium", &["belgium", "be", "bel"]),
    ("bulgaria", &["bulgaria", "bg", "bgr"]),
    ("croatia", &["croatia", "hr", "hrv"]),
    ("cyprus", &["cyprus", "cy", "cyp"]),
    (
        "czech_republic",
        &["czech republic", "czechia", "cz", "cze", "czech rep."],
    ),
    ("denmark", &["denmark", "dk", "dnk"]),
    ("estonia", &["estonia", "ee", "est"]),
    ("finland", &["finland", "fi", "fin"]),
    ("france", &["france", "fr", "fra"]),
    ("germany", &["germany", "de", "deu", "deutschland"]),
    ("greece", &["greece", "gr", "grc", "hellenic republic"]),
    ("hungary", &["hungary", "hu", "hun"]),
    ("ireland", &["ireland", "ie", "irl"]),
    ("italy", &["italy", "it", "ita"]),
    ("latvia", &["latvia", "lv", "lva"]),
    ("lithuania", &["lithuania", "lt", "ltu"]),
    ("luxembourg", &["luxembourg", "lu", "lux"]),
    ("malta", &["malta", "mt", "mlt"]),
    ("netherlands", &["netherlands", "nl", "nld", "holland"]),
    ("poland", &["poland", "pl", "pol"]),
    ("portugal", &["portugal", "pt", "prt"]),
    ("romania", &["romania", "ro", "rou"]),
    ("slovakia", &["slovakia", "sk", "svk", "slovak republic"]),
    ("slovenia", &["slovenia", "si", "svn"]),
    ("spain", &["spain", "es", "esp"]),
    ("sweden", &["sweden", "se", "swe"]),
    (
        "united_kingdom",
        &[
            "united kingdom",
            "uk",
            "gbr",
            "great britain",
            "britain",
            "england",
            "scotland",
            "wales",
        ],
    ),
    (
        "united_states",
        &["united states", "usa", "us", "america", "united states of america"],
    ),
    (
        "european_union",
        &["european union", "eu", "eu27", "eu-27", "eu 27", "european union (27)"],
    ),
    ("china", &["china", "cn", "chn", "people's republic of china", "prc"]),
    ("japan", &["japan", "jp", "jpn"]),
    ("south_korea", &["south korea", "korea", "kr", "kor", "republic of korea"]),
    ("indonesia", &["indonesia", "id", "idn"]),
    ("brazil", &["brazil", "br", "bra"]),
    ("india", &["india", "in", "ind"]),
    ("russia", &["russia", "ru", "rus", "russian federation"]),
    ("canada", &["canada", "ca", "can"]),
    ("australia", &["australia", "au", "aus"]),
    ("norway", &["norway", "no", "nor"]),
    ("switzerland", &["switzerland", "ch", "che"]),
    ("iceland", &["iceland", "is", "isl"]),
    ("turkey", &["turkey", "tr", "tur", "turkiye"]),
    ("mexico", &["mexico", "mx", "mex"]),
    ("argentina", &["argentina", "ar", "arg"]),
    ("south_africa", &["south africa", "za", "zaf"]),
    ("egypt", &["egypt", "eg", "egy"]),
    ("saudi_arabia", &["saudi arabia", "sa", "sau"]),
    ("uae", &["united arab emirates", "uae", "ae", "are"]),
    ("israel", &["israel", "il", "isr"]),
    ("new_zealand", &["new zealand", "nz", "nzl"]),
    ("chile", &["chile", "cl", "chl"]),
    ("colombia", &["colombia", "co", "col"]),
    ("ukraine", &["ukraine", "ua", "ukr"]),
];

/// Resolve a free-text country name or code to a canonical key.
///
/// Total function: exact variant match first, then substring containment,
/// and as a last resort a lowercased underscore-separated form of the input
/// itself. The fallback key is stable but not guaranteed canonical.
pub fn canonicalize(name: &str) -> String {
    let cleaned = name.trim().to_lowercase().replace(['-', '_'], " ");
    if cleaned.is_empty() {
        return String::new();
    }

    for (canonical, variants) in COUNTRY_VARIANTS {
        if variants.iter().any(|v| *v == cleaned) {
            return (*canonical).to_string();
        }
    }

    for (canonical, variants) in COUNTRY_VARIANTS {
        if variants
            .iter()
            .any(|v| cleaned.contains(v) || v.contains(cleaned.as_str()))
        {
            return (*canonical).to_string();
        }
    }

    cleaned.replace(' ', "_")
}

/// True when two free-text names resolve to the same canonical key.
pub fn same_country(a: &str, b: &str) -> bool {
    canonicalize(a) == canonicalize(b)
}

/// Known variants for a canonical key, if the key is in the static table.
pub fn variants_for(canonical: &str) -> Option<&'static [&'static str]> {
    COUNTRY_VARIANTS
        .iter()
        .find(|(c, _)| *c == canonical)
        .map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_variants_resolve() {
        assert_eq!(canonicalize("USA"), "united_states");
        assert_eq!(canonicalize("united states"), "united_states");
        assert_eq!(canonicalize("Deutschland"), "germany");
        assert_eq!(canonicalize("SE"), "sweden");
    }

    #[test]
    fn america_aliases_agree() {
        assert_eq!(canonicalize("USA"), canonicalize("united states"));
        assert_eq!(canonicalize("USA"), canonicalize("America"));
    }

    #[test]
    fn separator_variants_resolve() {
        assert_eq!(canonicalize("Czech-Republic"), "czech_republic");
        assert_eq!(canonicalize("czech_republic"), "czech_republic");
    }

    #[test]
    fn unknown_name_yields_stable_key() {
        assert_eq!(canonicalize("Wakanda"), "wakanda");
        assert_eq!(canonicalize(""), "");
    }

    #[test]
    fn eu_aggregate_resolves() {
        assert_eq!(canonicalize("EU-27"), "european_union");
        assert_eq!(canonicalize("European Union"), "european_union");
    }

    #[test]
    fn join_predicate_matches_across_sources() {
        assert!(same_country("SE", "Sweden"));
        assert!(!same_country("Sweden", "Norway"));
    }
}
