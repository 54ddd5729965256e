//! Word inflection for model, table, and facet names.
//!
//! The directory only needs a small inflection surface: turning plural
//! source names into singular model keys (`repositories` -> `repository`),
//! deriving table names from model aliases (`Repository` -> `repositories`),
//! and capitalizing wrap keys. The rule tables below cover that surface;
//! they are not a full English inflector.

use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered singularization rules, most specific first.
static SINGULAR_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"([^aeiouy]|qu)ies$").unwrap(), "${1}y"),
        (Regex::new(r"(ch|sh|ss|x|z)es$").unwrap(), "${1}"),
        (Regex::new(r"([^s])s$").unwrap(), "${1}"),
    ]
});

/// Ordered pluralization rules, most specific first.
static PLURAL_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"([^aeiouy]|qu)y$").unwrap(), "${1}ies"),
        (Regex::new(r"(ch|sh|ss|x|z)$").unwrap(), "${1}es"),
        (Regex::new(r"([^s])$").unwrap(), "${1}s"),
    ]
});

/// Boundary between a lowercase/digit character and an uppercase one.
static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());

fn apply(rules: &[(Regex, &'static str)], word: &str) -> String {
    for (pattern, replacement) in rules {
        if pattern.is_match(word) {
            return pattern.replace(word, *replacement).into_owned();
        }
    }
    word.to_string()
}

/// Singular form of a word (`repositories` -> `repository`, `repos` -> `repo`).
///
/// Words with no matching rule come back unchanged, so already-singular
/// input is stable.
#[must_use]
pub fn singularize(word: &str) -> String {
    apply(&SINGULAR_RULES, word)
}

/// Plural form of a word (`repository` -> `repositories`, `github` -> `githubs`).
#[must_use]
pub fn pluralize(word: &str) -> String {
    apply(&PLURAL_RULES, word)
}

/// Capitalized camel case for an underscored word (`pull_request` -> `PullRequest`).
#[must_use]
pub fn camelize(word: &str) -> String {
    word.split('_').map(ucfirst).collect()
}

/// Underscored form of a camel-cased word (`DataSource` -> `data_source`).
#[must_use]
pub fn underscore(word: &str) -> String {
    CAMEL_BOUNDARY
        .replace_all(word, "${1}_${2}")
        .to_lowercase()
}

/// Table name for a model alias (`Repository` -> `repositories`).
#[must_use]
pub fn tableize(alias: &str) -> String {
    pluralize(&underscore(alias))
}

fn ucfirst(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singularizes_source_names() {
        assert_eq!(singularize("repositories"), "repository");
        assert_eq!(singularize("repos"), "repo");
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("issues"), "issue");
        assert_eq!(singularize("githubs"), "github");
    }

    #[test]
    fn singularizes_facet_type_plurals() {
        for (plural, singular) in [
            ("models", "model"),
            ("controllers", "controller"),
            ("views", "view"),
            ("behaviors", "behavior"),
            ("components", "component"),
            ("helpers", "helper"),
            ("shells", "shell"),
            ("themes", "theme"),
            ("datasources", "datasource"),
            ("libs", "lib"),
            ("tests", "test"),
            ("vendors", "vendor"),
            ("apps", "app"),
            ("configs", "config"),
            ("resources", "resource"),
        ] {
            assert_eq!(singularize(plural), singular);
        }
    }

    #[test]
    fn singular_input_is_stable() {
        assert_eq!(singularize("user"), "user");
        assert_eq!(singularize("model"), "model");
        assert_eq!(singularize(""), "");
    }

    #[test]
    fn preserves_leading_case() {
        assert_eq!(singularize("Repositories"), "Repository");
        assert_eq!(singularize("Repos"), "Repo");
    }

    #[test]
    fn pluralizes() {
        assert_eq!(pluralize("repository"), "repositories");
        assert_eq!(pluralize("github"), "githubs");
        assert_eq!(pluralize("issue"), "issues");
        assert_eq!(pluralize("user"), "users");
        // Already-plural words fall through every rule untouched.
        assert_eq!(pluralize("users"), "users");
    }

    #[test]
    fn camelizes() {
        assert_eq!(camelize("repository"), "Repository");
        assert_eq!(camelize("pull_request"), "PullRequest");
        assert_eq!(camelize(""), "");
    }

    #[test]
    fn underscores() {
        assert_eq!(underscore("DataSource"), "data_source");
        assert_eq!(underscore("Repository"), "repository");
    }

    #[test]
    fn tableizes_model_aliases() {
        assert_eq!(tableize("Repository"), "repositories");
        assert_eq!(tableize("Github"), "githubs");
        assert_eq!(tableize("Issue"), "issues");
        assert_eq!(tableize("User"), "users");
    }
}
