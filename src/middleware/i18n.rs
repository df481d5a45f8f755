// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

const DEFAULT_LANG: &str = "pt";

// Extrator de idioma (Accept-Language). Só o código base: "pt-BR" -> "pt".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|header_str| {
                accept_language::parse(header_str)
                    .first() // Pega o idioma de maior prioridade
                    .map(|tag| tag.split('-').next().unwrap_or(tag).to_lowercase())
            })
            .filter(|lang| !lang.is_empty())
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());

        Ok(Locale::from_header(header_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn picks_highest_priority_base_language() {
        assert_eq!(Locale::from_header(Some("en-US,pt;q=0.8")).0, "en");
        assert_eq!(Locale::from_header(Some("pt-BR")).0, "pt");
    }

    #[test]
    fn defaults_to_portuguese() {
        assert_eq!(Locale::from_header(None), Locale::default());
        assert_eq!(Locale::from_header(Some("")).0, "pt");
    }

    #[tokio::test]
    async fn extractor_reads_accept_language() {
        let request = Request::builder()
            .header(header::ACCEPT_LANGUAGE, "en")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let locale = Locale::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(locale.0, "en");
    }
}
