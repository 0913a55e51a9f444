use std::collections::BTreeMap;

use super::PrError;

/// Maps repository short names to provider repository ids.
///
/// Built once from the `[repos]` table and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct RepositoryResolver {
    repositories: BTreeMap<String, String>,
}

impl RepositoryResolver {
    pub fn new(repositories: BTreeMap<String, String>) -> Self {
        Self { repositories }
    }

    pub fn resolve(&self, name: &str) -> Result<&str, PrError> {
        self.repositories
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| PrError::RepositoryNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> RepositoryResolver {
        RepositoryResolver::new(BTreeMap::from([
            ("api".to_string(), "ocid1.devopsrepository.oc1..api".to_string()),
            ("web".to_string(), "ocid1.devopsrepository.oc1..web".to_string()),
        ]))
    }

    #[test]
    fn test_resolves_known_name() {
        assert_eq!(
            resolver().resolve("web").unwrap(),
            "ocid1.devopsrepository.oc1..web"
        );
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let err = resolver().resolve("mobile").unwrap_err();
        assert!(matches!(err, PrError::RepositoryNotFound(ref name) if name == "mobile"));
    }

    #[test]
    fn test_lookup_is_exact() {
        assert!(resolver().resolve("API").is_err());
        assert!(RepositoryResolver::default().resolve("api").is_err());
    }
}
