use std::time::Duration;

use serde::Serialize;

use crate::dtos::{SummaryDto, SummaryFacet, SummaryLength};

/// Placeholder substituted for any facet the external service failed to
/// produce. The summarize endpoint degrades to this text instead of failing.
pub const FACET_UNAVAILABLE: &str = "Ringkasan tidak tersedia.";

/// Request body for the text-generation service (`POST {llm_url}/v1/responses`).
#[derive(Debug, Serialize)]
pub struct LLMRequestTextInput {
    pub model: String,
    pub input: String,
}

/// HTTP client wrapper for the external text-generation service.
///
/// Cloning is cheap; reqwest::Client uses Arc internally.
#[derive(Clone)]
pub struct HttpClient {
    pub conn: reqwest::Client,
}

impl HttpClient {
    pub fn new(conn: reqwest::Client) -> Self {
        Self { conn }
    }

    /// Ask the external service for a structured facet summary.
    ///
    /// Always produces a complete mapping over exactly the requested facets.
    /// Transport errors, timeouts, unparseable replies, and missing keys all
    /// degrade to [`FACET_UNAVAILABLE`] per facet; the caller never sees an
    /// error from here.
    pub async fn get_structured_summary(
        &self,
        llm_url: &str,
        model_name: &str,
        content: &str,
        facets: &[SummaryFacet],
        length: SummaryLength,
        timeout: Duration,
    ) -> SummaryDto {
        let full_url = format!("{}/v1/responses", llm_url);

        let request_body = LLMRequestTextInput {
            model: model_name.to_string(),
            input: build_summary_prompt(content, facets, length),
        };

        let response = match self
            .conn
            .post(full_url)
            .timeout(timeout)
            .json(&request_body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Summarization service unreachable: {}", e);
                return degraded_summary(facets);
            }
        };

        let json_value: serde_json::Value = match response.json().await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Summarization service returned a malformed body: {}", e);
                return degraded_summary(facets);
            }
        };

        // Reply structure: {"output": [{"content": [{"text": "..."}]}]}
        let reply_text = match json_value["output"][0]["content"][0]["text"].as_str() {
            Some(text) => text,
            None => {
                tracing::warn!("Summarization reply carried no text output");
                return degraded_summary(facets);
            }
        };

        parse_summary_reply(reply_text, facets)
    }
}

/// Prompt asking for a JSON object keyed by exactly the requested facets,
/// answered in Indonesian at the requested length register.
fn build_summary_prompt(content: &str, facets: &[SummaryFacet], length: SummaryLength) -> String {
    let keys = facets
        .iter()
        .map(|f| format!("\"{}\"", f.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    let register = match length {
        SummaryLength::Short => "satu kalimat pendek",
        SummaryLength::Medium => "satu sampai dua kalimat",
        SummaryLength::Long => "dua sampai tiga kalimat",
    };

    format!(
        "Baca artikel berikut dan jawab dalam bahasa Indonesia. \
        Balas HANYA dengan satu objek JSON yang memiliki tepat kunci-kunci berikut: {keys}. \
        Setiap nilai adalah jawaban {register} untuk dimensi tersebut. \
        Jangan tambahkan kunci lain dan jangan tambahkan teks di luar objek JSON.\n\n{content}"
    )
}

/// Every requested facet populated with the failure placeholder.
pub fn degraded_summary(facets: &[SummaryFacet]) -> SummaryDto {
    let mut summary = SummaryDto::default();
    for facet in facets {
        summary.set(*facet, FACET_UNAVAILABLE.to_string());
    }
    summary
}

/// Normalize the raw model reply into a facet map.
///
/// Strips an optional `</think>` preamble and code fences, parses the rest
/// as JSON, then filters strictly to the requested facets: extra keys are
/// discarded, missing or non-string values become the placeholder. An
/// unparseable reply degrades every facet.
pub fn parse_summary_reply(reply: &str, facets: &[SummaryFacet]) -> SummaryDto {
    let mut text = reply;
    if let Some((_, after)) = text.split_once("</think>") {
        text = after;
    }
    let text = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let parsed: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Summarization reply was not valid JSON: {}", e);
            return degraded_summary(facets);
        }
    };

    let object = match parsed.as_object() {
        Some(object) => object,
        None => {
            tracing::warn!("Summarization reply was not a JSON object");
            return degraded_summary(facets);
        }
    };

    let mut summary = SummaryDto::default();
    for facet in facets {
        let value = object
            .get(facet.as_str())
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match value {
            Some(answer) => summary.set(*facet, answer.to_string()),
            None => summary.set(*facet, FACET_UNAVAILABLE.to_string()),
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHO_WHAT: [SummaryFacet; 2] = [SummaryFacet::Who, SummaryFacet::What];

    #[test]
    fn keeps_exactly_the_requested_keys() {
        let reply = r#"{"who": "Pejabat daerah.", "what": "Peresmian jembatan.",
                        "where": "Bandung.", "extra": "dibuang"}"#;
        let summary = parse_summary_reply(reply, &WHO_WHAT);

        assert_eq!(summary.get(SummaryFacet::Who), Some("Pejabat daerah."));
        assert_eq!(summary.get(SummaryFacet::What), Some("Peresmian jembatan."));
        // keys that were not requested never make it through
        assert_eq!(summary.get(SummaryFacet::Where), None);
        assert_eq!(
            serde_json::to_string(&summary).unwrap(),
            r#"{"who":"Pejabat daerah.","what":"Peresmian jembatan."}"#
        );
    }

    #[test]
    fn missing_keys_get_the_placeholder() {
        let reply = r#"{"who": "Warga setempat."}"#;
        let summary = parse_summary_reply(reply, &WHO_WHAT);

        assert_eq!(summary.get(SummaryFacet::Who), Some("Warga setempat."));
        assert_eq!(summary.get(SummaryFacet::What), Some(FACET_UNAVAILABLE));
    }

    #[test]
    fn unparseable_reply_degrades_every_facet() {
        let summary = parse_summary_reply("maaf, saya tidak bisa", &WHO_WHAT);

        assert_eq!(summary.get(SummaryFacet::Who), Some(FACET_UNAVAILABLE));
        assert_eq!(summary.get(SummaryFacet::What), Some(FACET_UNAVAILABLE));
    }

    #[test]
    fn non_string_values_get_the_placeholder() {
        let reply = r#"{"who": 42, "what": ["a", "b"]}"#;
        let summary = parse_summary_reply(reply, &WHO_WHAT);

        assert_eq!(summary.get(SummaryFacet::Who), Some(FACET_UNAVAILABLE));
        assert_eq!(summary.get(SummaryFacet::What), Some(FACET_UNAVAILABLE));
    }

    #[test]
    fn strips_think_preamble_and_code_fences() {
        let reply = "<think>menimbang-nimbang</think>\n```json\n{\"who\": \"Panitia.\", \"what\": \"Festival.\"}\n```";
        let summary = parse_summary_reply(reply, &WHO_WHAT);

        assert_eq!(summary.get(SummaryFacet::Who), Some("Panitia."));
        assert_eq!(summary.get(SummaryFacet::What), Some("Festival."));
    }

    #[test]
    fn degraded_summary_covers_all_requested_facets() {
        let summary = degraded_summary(&SummaryFacet::ALL);
        for facet in SummaryFacet::ALL {
            assert_eq!(summary.get(facet), Some(FACET_UNAVAILABLE));
        }
    }
}
