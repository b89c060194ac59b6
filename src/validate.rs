use serde::{Deserialize, Serialize};
use url::Url;

use crate::text;

/// Length of a hex encoded SHA-256 digest.
pub const FINGERPRINT_LENGTH: usize = 64;

/// User editable fields of a repository.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepoForm {
    pub address: String,
    pub fingerprint: String,
    pub username: String,
    pub password: String,
}

/// Validity of each [`RepoForm`] field, `true` meaning valid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Validation {
    pub address: bool,
    pub fingerprint: bool,
    pub username: bool,
    pub password: bool,
}

impl Validation {
    pub fn check(form: &RepoForm) -> Self {
        let auth = authentication(&form.username, &form.password);

        Self {
            address: normalize_address(&form.address).is_some(),
            fingerprint: fingerprint(&form.fingerprint),
            username: auth,
            password: auth,
        }
    }

    pub const fn is_valid(self) -> bool {
        self.address && self.fingerprint && self.username && self.password
    }
}

/// Normalize a repository address into its canonical form, or `None` if it isn't an absolute,
/// hierarchical URI.
///
/// The path is cropped to the repository base (see [`text::path_cropped`]) while query and
/// fragment are kept as they are.
pub fn normalize_address(address: &str) -> Option<String> {
    if !is_strict_uri(address) {
        return None;
    }

    let mut url = Url::parse(address).ok()?;
    if url.cannot_be_a_base() {
        return None;
    }

    let path = text::path_cropped(url.path()).to_owned();
    url.set_path(&path);

    Some(url.into())
}

/// Whether the address is a well-formed URI with an authority. URL parsers silently repair input
/// like surrounding or embedded whitespace, backslashes, a missing `//` after the scheme or
/// characters that need escaping, so this has to be checked before parsing.
fn is_strict_uri(address: &str) -> bool {
    let Some((scheme, rest)) = address.split_once(':') else {
        return false;
    };

    let scheme_valid = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    let chars_valid = !address.chars().any(|c| {
        c.is_whitespace()
            || c.is_control()
            || matches!(c, '\\' | '"' | '<' | '>' | '^' | '`' | '{' | '|' | '}')
    });

    let escapes_valid = address.split('%').skip(1).all(|part| {
        part.get(..2)
            .is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
    });

    scheme_valid && rest.starts_with("//") && chars_valid && escapes_valid
}

/// Either empty (unsigned repository) or exactly as long as a hex encoded SHA-256 digest.
///
/// The length is counted in UTF-16 code units, the way Android measures strings, and the content
/// is not checked for hex digits.
pub fn fingerprint(value: &str) -> bool {
    value.is_empty() || value.encode_utf16().count() == FINGERPRINT_LENGTH
}

/// Username and password must be both set or both empty, and the username can't contain a
/// colon as that separates both parts in the encoded credentials.
pub fn authentication(username: &str, password: &str) -> bool {
    let username_invalid = username.contains(':');
    let username_missing = username.is_empty() && !password.is_empty();
    let password_missing = !username.is_empty() && password.is_empty();

    !(username_invalid || username_missing || password_missing)
}

/// Repository details extracted from a shared repository link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Prefill {
    pub address: String,
    pub fingerprint: Option<String>,
}

/// Best-effort parsing of a shared repository link, like
/// `fdroidrepos://example.com/repo?fingerprint=...`.
///
/// Anything that doesn't look like a repository link results in `None`.
pub fn prefill(text: &str) -> Option<Prefill> {
    let text = text.trim();
    let text = if let Some(rest) = text.strip_prefix("fdroidrepos:") {
        format!("https:{rest}")
    } else if let Some(rest) = text.strip_prefix("fdroidrepo:") {
        format!("http:{rest}")
    } else {
        text.to_owned()
    };

    let mut url = Url::parse(&text).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let fingerprint = url
        .query_pairs()
        .filter(|(key, _)| key.eq_ignore_ascii_case("fingerprint"))
        .find_map(|(_, value)| text::null_if_empty(&value).map(str::to_uppercase));

    let path = text::path_cropped(url.path()).to_owned();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    Some(Prefill {
        address: url.into(),
        fingerprint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINGERPRINT: &str = "43238D512C1E5EB2D6569F4A3AFBF5523418B82E0A3ED1552770ABB9A9C9CCAB";

    #[test]
    fn address_valid() {
        assert_eq!(
            Some("https://example.com/repo?x=1"),
            normalize_address("https://example.com/repo/index.xml?x=1").as_deref()
        );
        assert_eq!(
            Some("https://f-droid.org/repo"),
            normalize_address("https://f-droid.org/repo/").as_deref()
        );
        assert_eq!(
            Some("https://user:pw@example.com:8443/fdroid/repo#top"),
            normalize_address("https://user:pw@Example.COM:8443/fdroid/./repo/#top").as_deref()
        );
        assert_eq!(
            Some("http://10.0.0.2/repo"),
            normalize_address("http://10.0.0.2:80/repo").as_deref()
        );
        assert_eq!(
            Some("https://example.com/"),
            normalize_address("https://example.com").as_deref()
        );
        assert_eq!(
            Some("https://example.com/a%20b?q=%C3%A4"),
            normalize_address("HTTPS://example.com/a%20b/?q=%C3%A4").as_deref()
        );
    }

    #[test]
    fn address_invalid() {
        for address in [
            "",
            "example.com/repo",
            "/repo",
            "https://",
            "mailto:someone@example.com",
            "http://exa mple.com/repo",
            "not a uri",
            " https://example.com/repo ",
            "https://example.com/repo\n",
            "https://exa\tmple.com/re\npo",
            "https:example.com/repo",
            "https:/example.com/repo",
            "https:\\\\example.com\\repo",
            "https://example.com\\repo",
            "HTTPS://example.com/a b",
            "https://example.com/a%2",
            "https://example.com/a%zz",
            "https://example.com/{repo}",
            "1https://example.com/repo",
            "://example.com/repo",
        ] {
            assert_eq!(None, normalize_address(address), "{address:?}");
        }
    }

    #[test]
    fn address_idempotent() {
        for address in [
            "https://example.com/repo/index.xml?x=1",
            "https://example.com/a/../b/entry.jar/",
            "https://example.com",
            "http://user@host:1234/path/?q=a%20b#frag",
            "ftp://mirror.example.org/pub/fdroid//",
        ] {
            let once = normalize_address(address).unwrap();
            assert_eq!(Some(once.clone()), normalize_address(&once), "{address}");
        }
    }

    #[test]
    fn address_roundtrip_parts() {
        let normalized = normalize_address("HTTPS://Example.com:444/repo/index-v1.jar?a=1#f").unwrap();
        let url = Url::parse(&normalized).unwrap();

        assert_eq!("https", url.scheme());
        assert_eq!(Some("example.com"), url.host_str());
        assert_eq!(Some(444), url.port());
        assert_eq!("/repo", url.path());
        assert_eq!(Some("a=1"), url.query());
        assert_eq!(Some("f"), url.fragment());
    }

    #[test]
    fn fingerprint_length() {
        assert!(fingerprint(""));
        assert!(fingerprint(FINGERPRINT));
        assert!(fingerprint(&"z".repeat(64)));
        assert!(!fingerprint(&"A".repeat(63)));
        assert!(!fingerprint(&"A".repeat(65)));
        assert!(fingerprint(&"ä".repeat(64)));
        assert!(fingerprint(&"😀".repeat(32)));
        assert!(!fingerprint(&"😀".repeat(64)));
    }

    #[test]
    fn authentication_pairs() {
        assert!(authentication("", ""));
        assert!(authentication("a", "x"));
        assert!(!authentication("a", ""));
        assert!(!authentication("", "b"));
        assert!(!authentication("a:b", "x"));
        assert!(!authentication(":", ""));
        assert!(authentication("a", "x:y"));
    }

    #[test]
    fn check_form() {
        let form = RepoForm {
            address: "https://example.com/repo".to_owned(),
            fingerprint: FINGERPRINT.to_owned(),
            username: "user".to_owned(),
            password: "secret".to_owned(),
        };
        assert!(Validation::check(&form).is_valid());

        let validation = Validation::check(&RepoForm {
            username: "us:er".to_owned(),
            ..form.clone()
        });
        assert_eq!(
            Validation {
                address: true,
                fingerprint: true,
                username: false,
                password: false,
            },
            validation
        );
        assert!(!validation.is_valid());

        let validation = Validation::check(&RepoForm {
            address: "repo".to_owned(),
            fingerprint: "ABC".to_owned(),
            ..form
        });
        assert!(!validation.address);
        assert!(!validation.fingerprint);
        assert!(validation.username);
    }

    #[test]
    fn check_empty_form() {
        let validation = Validation::check(&RepoForm::default());
        assert!(!validation.address);
        assert!(validation.fingerprint);
        assert!(validation.username);
        assert!(validation.password);
    }

    #[test]
    fn prefill_repo_link() {
        let link = format!(
            "fdroidrepos://example.com/fdroid/repo/?FINGERPRINT={}",
            FINGERPRINT.to_lowercase()
        );

        assert_eq!(
            Some(Prefill {
                address: "https://example.com/fdroid/repo".to_owned(),
                fingerprint: Some(FINGERPRINT.to_owned()),
            }),
            prefill(&link)
        );
    }

    #[test]
    fn prefill_plain_link() {
        assert_eq!(
            Some(Prefill {
                address: "http://example.com/repo".to_owned(),
                fingerprint: None,
            }),
            prefill("  fdroidrepo://example.com/repo/index-v1.jar?fingerprint=#x\n")
        );
        assert_eq!(
            Some(Prefill {
                address: "https://example.com/repo".to_owned(),
                fingerprint: Some("AB".to_owned()),
            }),
            prefill("https://example.com/repo?other=1&Fingerprint=ab")
        );
    }

    #[test]
    fn prefill_garbage() {
        for text in ["", "hello world", "ftp://example.com/repo", "fdroidrepos:", "file:///tmp"] {
            assert_eq!(None, prefill(text), "{text:?}");
        }
    }
}
