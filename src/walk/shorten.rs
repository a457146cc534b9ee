//! Token shortening applied when walks are written.
//!
//! Long IRIs dominate walk file size. A [`TokenShortener`] maps each token to
//! a compact form; it is stateless so every worker can share one instance.

use std::borrow::Cow;

/// Stateless per-token transform.
pub trait TokenShortener: Send + Sync {
    fn shorten<'a>(&self, token: &'a str) -> Cow<'a, str>;

    /// Apply [`shorten`](Self::shorten) to every token of a space-separated walk.
    fn shorten_walk(&self, walk: &str, out: &mut String) {
        for (i, token) in walk.split(' ').enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&self.shorten(token));
        }
    }
}

/// Leaves tokens unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl TokenShortener for Identity {
    fn shorten<'a>(&self, token: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(token)
    }

    fn shorten_walk(&self, walk: &str, out: &mut String) {
        out.push_str(walk);
    }
}

/// Well-known vocabularies and the DBpedia/Wikidata namespaces, as
/// `(namespace, prefix)`.
pub const COMMON_NAMESPACES: &[(&str, &str)] = &[
    ("http://www.w3.org/1999/02/22-rdf-syntax-ns#", "rdf"),
    ("http://www.w3.org/2000/01/rdf-schema#", "rdfs"),
    ("http://www.w3.org/2002/07/owl#", "owl"),
    ("http://www.w3.org/2001/XMLSchema#", "xsd"),
    ("http://www.w3.org/2004/02/skos/core#", "skos"),
    ("http://xmlns.com/foaf/0.1/", "foaf"),
    ("http://purl.org/dc/terms/", "dct"),
    ("http://dbpedia.org/resource/", "dbr"),
    ("http://dbpedia.org/ontology/", "dbo"),
    ("http://dbpedia.org/property/", "dbp"),
    ("http://www.wikidata.org/entity/", "wd"),
    ("http://www.wikidata.org/prop/direct/", "wdt"),
];

/// Rewrites `namespace + local` as `prefix:local`.
///
/// When several namespaces match, the longest one wins.
#[derive(Debug, Clone, Default)]
pub struct PrefixShortener {
    /// `(namespace, prefix)`, longest namespace first.
    namespaces: Vec<(String, String)>,
}

impl PrefixShortener {
    pub fn new<I, N, P>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        let mut namespaces: Vec<(String, String)> = namespaces
            .into_iter()
            .map(|(ns, prefix)| (ns.into(), prefix.into()))
            .filter(|(ns, _)| !ns.is_empty())
            .collect();
        namespaces.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { namespaces }
    }

    /// Number of configured namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

impl TokenShortener for PrefixShortener {
    fn shorten<'a>(&self, token: &'a str) -> Cow<'a, str> {
        for (namespace, prefix) in &self.namespaces {
            if let Some(local) = token.strip_prefix(namespace.as_str()) {
                return Cow::Owned(format!("{prefix}:{local}"));
            }
        }
        Cow::Borrowed(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_a_no_op() {
        let mut out = String::new();
        Identity.shorten_walk("http://x/A http://x/p http://x/B", &mut out);
        assert_eq!(out, "http://x/A http://x/p http://x/B");
    }

    #[test]
    fn longest_namespace_wins() {
        let shortener = PrefixShortener::new([
            ("http://ex.org/", "ex"),
            ("http://ex.org/onto/", "onto"),
        ]);
        assert_eq!(shortener.shorten("http://ex.org/onto/Person"), "onto:Person");
        assert_eq!(shortener.shorten("http://ex.org/Alice"), "ex:Alice");
        assert_eq!(shortener.shorten("urn:other"), "urn:other");
    }

    #[test]
    fn shortens_every_token_of_a_walk() {
        let mut out = String::new();
        PrefixShortener::new(COMMON_NAMESPACES.iter().copied()).shorten_walk(
            "http://dbpedia.org/resource/Berlin http://dbpedia.org/ontology/country http://dbpedia.org/resource/Germany",
            &mut out,
        );
        assert_eq!(out, "dbr:Berlin dbo:country dbr:Germany");
    }
}
