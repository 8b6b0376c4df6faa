use secrecy::SecretString;
use url::Url;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Where the hosted store lives and the anonymous key used for every request.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub url: Url,
    pub anon_key: SecretString,
}

impl BackendConfig {
    pub fn new(url: Url, anon_key: SecretString) -> Self {
        Self {
            url: with_trailing_slash(url),
            anon_key,
        }
    }

    pub fn rest_url(&self, path: &str) -> crate::Result<Url> {
        Ok(self.url.join(&format!("rest/v1/{}", path.trim_start_matches('/')))?)
    }

    pub fn storage_url(&self, path: &str) -> crate::Result<Url> {
        Ok(self
            .url
            .join(&format!("storage/v1/{}", path.trim_start_matches('/')))?)
    }
}

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub url: Url,
    pub api_key: SecretString,
    pub model: String,
}

impl GeneratorConfig {
    pub fn new(url: Url, api_key: SecretString, model: Option<String>) -> Self {
        Self {
            url: with_trailing_slash(url),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        }
    }

    pub fn generate_url(&self) -> crate::Result<Url> {
        Ok(self
            .url
            .join(&format!("v1beta/models/{}:generateContent", self.model))?)
    }
}

// `Url::join` replaces the last segment unless the base ends with a slash.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> BackendConfig {
        BackendConfig::new(
            Url::parse("https://project.example.co/").unwrap(),
            SecretString::new("anon".to_owned()),
        )
    }

    #[test]
    fn test_rest_url_joins_table() {
        let url = backend().rest_url("/summaries").unwrap();

        assert_eq!(url.as_str(), "https://project.example.co/rest/v1/summaries");
    }

    #[test]
    fn test_base_without_trailing_slash_keeps_prefix() {
        let config = BackendConfig::new(
            Url::parse("https://proxy.example.co/supabase").unwrap(),
            SecretString::new("anon".to_owned()),
        );

        assert_eq!(
            config.rest_url("users").unwrap().as_str(),
            "https://proxy.example.co/supabase/rest/v1/users"
        );
    }

    #[test]
    fn test_storage_url() {
        let url = backend().storage_url("object/sources").unwrap();

        assert_eq!(
            url.as_str(),
            "https://project.example.co/storage/v1/object/sources"
        );
    }

    #[test]
    fn test_generator_defaults_model() {
        let config = GeneratorConfig::new(
            Url::parse("https://ai.example.com/").unwrap(),
            SecretString::new("key".to_owned()),
            None,
        );

        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config
            .generate_url()
            .unwrap()
            .as_str()
            .ends_with(":generateContent"));
    }
}
