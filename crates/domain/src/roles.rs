//! Economic role normalization.
//!
//! Audits and questions store the party's regulatory role as free text,
//! historically in both French and English. Matching is case-insensitive
//! and goes through a small synonym table so that, for example,
//! "distributeur" and "distributor" compare equal.

const ROLE_SYNONYMS: &[(&str, &str)] = &[
    ("fabricant", "manufacturer"),
    ("mandataire", "authorized_representative"),
    ("representant autorise", "authorized_representative"),
    ("representant_autorise", "authorized_representative"),
    ("authorised_representative", "authorized_representative"),
    ("importateur", "importer"),
    ("distributeur", "distributor"),
];

// Accented spellings stored verbatim by older imports; SQL cannot fold
// accents without an extension, so these are matched literally.
const ACCENTED_ROLE_FORMS: &[(&str, &str)] = &[
    ("représentant autorisé", "authorized_representative"),
    ("représentant_autorisé", "authorized_representative"),
];

fn fold_accents(value: &str) -> String {
    value
        .chars()
        .map(|character| match character {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' => 'a',
            'î' | 'ï' => 'i',
            'ô' => 'o',
            'û' | 'ù' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Reduces a stored role value to its canonical lower-case English form.
///
/// Unknown values fold accents and case but otherwise pass through, so two
/// arbitrary spellings still compare equal when they agree literally.
#[must_use]
pub fn canonical_economic_role(raw: &str) -> String {
    let folded = fold_accents(&raw.trim().to_lowercase());
    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");

    ROLE_SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == collapsed)
        .map(|(_, canonical)| (*canonical).to_owned())
        .unwrap_or(collapsed)
}

/// Lists every stored spelling equivalent to the given role.
///
/// Lets a SQL `lower(economic_role) = ANY(...)` clause reproduce the
/// synonym matching without accent folding in the database.
#[must_use]
pub fn role_match_forms(role: &str) -> Vec<String> {
    let canonical = canonical_economic_role(role);
    let mut forms = vec![canonical.clone()];

    for (alias, target) in ROLE_SYNONYMS {
        if *target == canonical {
            forms.push((*alias).to_owned());
        }
    }
    for (accented, target) in ACCENTED_ROLE_FORMS {
        if *target == canonical {
            forms.push((*accented).to_owned());
        }
    }

    forms.sort();
    forms.dedup();
    forms
}

/// Returns whether a stored role value means "applies to every role".
#[must_use]
pub fn role_is_generic(role: Option<&str>) -> bool {
    match role {
        None => true,
        Some(value) => {
            let canonical = canonical_economic_role(value);
            canonical.is_empty() || canonical == "all" || canonical == "tous"
        }
    }
}

/// Compares two stored role values for equivalence.
#[must_use]
pub fn roles_match(left: &str, right: &str) -> bool {
    canonical_economic_role(left) == canonical_economic_role(right)
}

#[cfg(test)]
mod tests {
    use super::{canonical_economic_role, role_is_generic, role_match_forms, roles_match};

    #[test]
    fn french_and_english_spellings_match() {
        assert!(roles_match("distributeur", "distributor"));
        assert!(roles_match("Fabricant", "MANUFACTURER"));
        assert!(roles_match("représentant autorisé", "authorized_representative"));
        assert!(roles_match("mandataire", "Représentant  Autorisé"));
    }

    #[test]
    fn unknown_roles_match_literally_only() {
        assert!(roles_match("notified body", "Notified Body"));
        assert!(!roles_match("notified body", "importer"));
    }

    #[test]
    fn generic_markers_are_recognized() {
        assert!(role_is_generic(None));
        assert!(role_is_generic(Some("")));
        assert!(role_is_generic(Some("  ")));
        assert!(role_is_generic(Some("all")));
        assert!(role_is_generic(Some("Tous")));
        assert!(!role_is_generic(Some("importer")));
    }

    #[test]
    fn match_forms_cover_every_equivalent_spelling() {
        let forms = role_match_forms("Fabricant");
        assert!(forms.contains(&"fabricant".to_owned()));
        assert!(forms.contains(&"manufacturer".to_owned()));

        let forms = role_match_forms("mandataire");
        assert!(forms.contains(&"authorized_representative".to_owned()));
        assert!(forms.contains(&"représentant autorisé".to_owned()));
    }

    #[test]
    fn canonical_form_is_stable() {
        assert_eq!(canonical_economic_role("  Importateur "), "importer");
        assert_eq!(canonical_economic_role("distributor"), "distributor");
    }
}
