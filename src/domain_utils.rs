/// Minimal domain hierarchy utilities
pub struct DomainUtils;

impl DomainUtils {
    /// Extract domain from email address
    pub fn extract_domain(email: &str) -> Option<String> {
        email
            .split('@')
            .nth(1)
            .filter(|d| !d.is_empty())
            .map(|s| s.to_lowercase())
    }

    /// Check if domain matches any in list (with hierarchy support)
    pub fn matches_domain_list<S: AsRef<str>>(domain: &str, domain_list: &[S]) -> bool {
        domain_list
            .iter()
            .any(|pattern| Self::is_same_or_subdomain(domain, pattern.as_ref()))
    }

    /// `mail.example.com` and `example.com` both match `example.com`; `notexample.com` does not.
    pub fn is_same_or_subdomain(domain: &str, parent: &str) -> bool {
        let domain_lower = domain.to_lowercase();
        let parent_lower = parent.to_lowercase();

        if parent_lower.is_empty() {
            return false;
        }

        domain_lower == parent_lower || domain_lower.ends_with(&format!(".{}", parent_lower))
    }

    /// Host part of a URL, lower-cased.
    pub fn url_host(url: &str) -> Option<String> {
        url::Url::parse(url)
            .ok()?
            .host_str()
            .map(|h| h.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            DomainUtils::extract_domain("user@Example.com"),
            Some("example.com".to_string())
        );
        assert_eq!(DomainUtils::extract_domain("invalid"), None);
        assert_eq!(DomainUtils::extract_domain("user@"), None);
    }

    #[test]
    fn test_matches_domain_list() {
        let domains = vec!["example.com".to_string(), "test.org".to_string()];

        assert!(DomainUtils::matches_domain_list("example.com", &domains));
        assert!(DomainUtils::matches_domain_list(
            "mail.example.com",
            &domains
        ));
        assert!(!DomainUtils::matches_domain_list("other.com", &domains));
        assert!(!DomainUtils::matches_domain_list("notexample.com", &domains));
    }

    #[test]
    fn test_url_host() {
        assert_eq!(
            DomainUtils::url_host("https://Login.Example.com/path"),
            Some("login.example.com".to_string())
        );
        assert_eq!(DomainUtils::url_host("not a url"), None);
    }
}
