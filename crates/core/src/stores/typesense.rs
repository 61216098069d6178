use crate::query::{distribute, phrase_query};
use crate::traits::TranscriptIndex;
use crate::{ImportSummary, SearchError, SearchOptions, SearchQuery, TranscriptDocument};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const BACKEND: &str = "typesense";
const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

#[derive(Debug, Clone)]
pub struct TypesenseConfig {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub api_key: String,
    pub collection: String,
    pub connection_timeout: Duration,
}

impl Default for TypesenseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8108,
            protocol: "http".to_string(),
            api_key: String::new(),
            collection: "transcripts".to_string(),
            connection_timeout: Duration::from_secs(4),
        }
    }
}

pub struct TypesenseStore {
    client: Arc<Client>,
    base_url: Url,
    api_key: String,
    collection: String,
}

impl TypesenseStore {
    pub fn new(config: TypesenseConfig) -> Result<Self, SearchError> {
        let base_url = Url::parse(&format!(
            "{}://{}:{}",
            config.protocol, config.host, config.port
        ))?;
        let client = Client::builder()
            .timeout(config.connection_timeout)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            api_key: config.api_key,
            collection: config.collection,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn url(&self, path: &str) -> Result<Url, SearchError> {
        Ok(self.base_url.join(path)?)
    }

    pub async fn ensure_collection(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .get(self.url(&format!("/collections/{}", self.collection))?)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if response.status() == StatusCode::OK {
            return Ok(());
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(response.status()));
        }

        debug!(collection = %self.collection, "creating typesense collection");
        let response = self
            .client
            .post(self.url("/collections")?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&collection_schema(&self.collection))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        Ok(())
    }

    async fn search_single(
        &self,
        query: &SearchQuery,
        options: &SearchOptions,
    ) -> Result<Vec<TranscriptDocument>, SearchError> {
        let mut url = self.url(&format!("/collections/{}/documents/search", self.collection))?;
        url.query_pairs_mut()
            .extend_pairs(single_search_params(query, options));

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let body = successful_json(response).await?;

        parse_search_result(&body)
    }

    async fn search_video_ids(
        &self,
        query: &SearchQuery,
        options: &SearchOptions,
    ) -> Result<Vec<TranscriptDocument>, SearchError> {
        let mut url = self.url("/multi_search")?;
        url.query_pairs_mut()
            .extend_pairs(common_search_params(options));

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&multi_search_body(&self.collection, query, options))
            .send()
            .await?;
        let body = successful_json(response).await?;

        let results = body
            .pointer("/results")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::BackendResponse {
                backend: BACKEND.to_string(),
                details: "multi search response has no results".to_string(),
            })?;

        let mut documents = Vec::new();
        for result in results {
            documents.extend(parse_search_result(result)?);
        }
        Ok(documents)
    }
}

#[async_trait]
impl TranscriptIndex for TypesenseStore {
    async fn index_documents(
        &self,
        documents: &[TranscriptDocument],
    ) -> Result<ImportSummary, SearchError> {
        if documents.is_empty() {
            return Ok(ImportSummary::default());
        }

        let payload = documents
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, serde_json::Error>>()?
            .join("\n");

        let mut url = self.url(&format!("/collections/{}/documents/import", self.collection))?;
        url.query_pairs_mut()
            .append_pair("action", "upsert")
            .append_pair("batch_size", &documents.len().to_string());

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Content-Type", "text/plain")
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        let body = response.text().await?;
        parse_import_response(&body)
    }

    async fn search_transcripts(
        &self,
        query: &SearchQuery,
        options: &SearchOptions,
    ) -> Result<Vec<TranscriptDocument>, SearchError> {
        debug!(query = %query.text, collection = %self.collection, "searching transcripts");

        if query.filters.video_ids.is_empty() {
            self.search_single(query, options).await
        } else {
            self.search_video_ids(query, options).await
        }
    }
}

fn backend_error(status: StatusCode) -> SearchError {
    SearchError::BackendResponse {
        backend: BACKEND.to_string(),
        details: status.to_string(),
    }
}

async fn successful_json(response: Response) -> Result<Value, SearchError> {
    if !response.status().is_success() {
        return Err(backend_error(response.status()));
    }
    Ok(response.json().await?)
}

fn collection_schema(name: &str) -> Value {
    json!({
        "name": name,
        "fields": [
            {"name": "title", "type": "string"},
            {"name": "channel_id", "type": "string", "facet": true},
            {"name": "channel_name", "type": "string"},
            {"name": "video_id", "type": "string"},
            {"name": "duration", "type": "int32"},
            {"name": "upload_date", "type": "int64"},
            {"name": "transcript", "type": "string[]"},
            {"name": "timestamps", "type": "int64[]", "index": false, "optional": true}
        ],
        "default_sorting_field": "upload_date"
    })
}

fn common_search_params(options: &SearchOptions) -> Vec<(&'static str, String)> {
    vec![
        ("sort_by", options.sort_by.clone()),
        ("per_page", options.per_page.to_string()),
        ("page", "1".to_string()),
        ("prefix", "false".to_string()),
        ("drop_tokens_threshold", "0".to_string()),
        ("typo_tokens_threshold", "0".to_string()),
        ("highlight_start_tag", String::new()),
        ("highlight_end_tag", String::new()),
        ("enable_highlight_v1", "false".to_string()),
    ]
}

fn single_search_params(
    query: &SearchQuery,
    options: &SearchOptions,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("q", phrase_query(&query.text)),
        ("query_by", "transcript".to_string()),
    ];
    if let Some(channel_id) = &query.filters.channel_id {
        params.push(("filter_by", channel_filter(channel_id)));
    }
    params.extend(common_search_params(options));
    params
}

fn multi_search_body(collection: &str, query: &SearchQuery, options: &SearchOptions) -> Value {
    let searches = distribute(&query.filters.video_ids, options.video_id_groups)
        .into_iter()
        .map(|group| {
            let mut filter = video_id_filter(&group);
            if let Some(channel_id) = &query.filters.channel_id {
                filter = format!("{filter} && {}", channel_filter(channel_id));
            }
            json!({
                "collection": collection,
                "q": phrase_query(&query.text),
                "query_by": "transcript",
                "filter_by": filter,
            })
        })
        .collect::<Vec<_>>();

    json!({ "searches": searches })
}

fn channel_filter(channel_id: &str) -> String {
    format!("channel_id:=`{channel_id}`")
}

fn video_id_filter(video_ids: &[String]) -> String {
    let quoted = video_ids
        .iter()
        .map(|id| format!("`{id}`"))
        .collect::<Vec<_>>()
        .join(",");
    format!("video_id:=[{quoted}]")
}

// Hints come from `highlight.transcript[i].matched_tokens`.
fn parse_search_result(result: &Value) -> Result<Vec<TranscriptDocument>, SearchError> {
    if let Some(error) = result.pointer("/error").and_then(Value::as_str) {
        return Err(SearchError::BackendResponse {
            backend: BACKEND.to_string(),
            details: error.to_string(),
        });
    }

    let hits = result
        .pointer("/hits")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut documents = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(raw_document) = hit.pointer("/document").cloned() else {
            warn!("typesense hit without a document");
            continue;
        };

        let mut document = match serde_json::from_value::<TranscriptDocument>(raw_document) {
            Ok(document) => document,
            Err(error) => {
                warn!(reason = %error, "skipping malformed typesense document");
                continue;
            }
        };

        document.matched_tokens = hit.pointer("/highlight/transcript").and_then(hint_tokens);
        documents.push(document);
    }

    Ok(documents)
}

fn hint_tokens(field: &Value) -> Option<Vec<Vec<String>>> {
    let entries = field.as_array()?;
    Some(
        entries
            .iter()
            .map(|entry| {
                entry
                    .pointer("/matched_tokens")
                    .and_then(Value::as_array)
                    .map(|tokens| {
                        tokens
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect(),
    )
}

fn parse_import_response(body: &str) -> Result<ImportSummary, SearchError> {
    let mut summary = ImportSummary::default();

    for line in body.lines().filter(|line| !line.trim().is_empty()) {
        let value: Value = serde_json::from_str(line)?;
        if value.pointer("/success").and_then(Value::as_bool) == Some(true) {
            summary.successes += 1;
        } else {
            summary.failures += 1;
            let reason = value
                .pointer("/error")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            warn!(reason = reason, "typesense rejected a document");
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryFilters;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
    const CREATED: &str = "HTTP/1.1 201 Created\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}";
    const UNAVAILABLE: &str =
        "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";

    // One connection per canned response, in order.
    fn serve(responses: Vec<&'static str>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                read_request(&mut stream);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        port
    }

    fn read_request(stream: &mut TcpStream) {
        let mut reader = BufReader::new(stream);
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                return;
            }
            if line == "\r\n" {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut body = vec![0u8; content_length];
        let _ = reader.read_exact(&mut body);
    }

    fn local_store(port: u16) -> TypesenseStore {
        TypesenseStore::new(TypesenseConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..TypesenseConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn missing_collection_is_created() {
        let store = local_store(serve(vec![NOT_FOUND, CREATED]));
        store.ensure_collection().await.expect("collection setup should succeed");
    }

    #[tokio::test]
    async fn failed_collection_setup_is_a_backend_error() {
        let store = local_store(serve(vec![NOT_FOUND, UNAVAILABLE]));
        let error = store
            .ensure_collection()
            .await
            .expect_err("a 503 from typesense should fail setup");

        assert!(matches!(
            error,
            SearchError::BackendResponse { ref details, .. } if details.contains("503")
        ));
        assert!(!error.is_client_error());
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn single_search_is_a_filtered_phrase_query() {
        let query = SearchQuery {
            text: "Dynamic Programming".to_string(),
            filters: QueryFilters {
                channel_id: Some("UC123".to_string()),
                video_ids: Vec::new(),
            },
        };
        let params = single_search_params(&query, &SearchOptions::default());

        assert_eq!(param(&params, "q"), Some("\"Dynamic Programming\""));
        assert_eq!(param(&params, "query_by"), Some("transcript"));
        assert_eq!(param(&params, "filter_by"), Some("channel_id:=`UC123`"));
        assert_eq!(param(&params, "sort_by"), Some("upload_date:desc"));
        assert_eq!(param(&params, "per_page"), Some("250"));
        assert_eq!(param(&params, "page"), Some("1"));
        assert_eq!(param(&params, "prefix"), Some("false"));
        assert_eq!(param(&params, "drop_tokens_threshold"), Some("0"));
        assert_eq!(param(&params, "typo_tokens_threshold"), Some("0"));
        assert_eq!(param(&params, "highlight_start_tag"), Some(""));
        assert_eq!(param(&params, "highlight_end_tag"), Some(""));
    }

    #[test]
    fn unfiltered_search_has_no_filter_by() {
        let params = single_search_params(&SearchQuery::new("game"), &SearchOptions::default());
        assert_eq!(param(&params, "filter_by"), None);
        assert_eq!(param(&params, "q"), Some("\"game\""));
    }

    #[test]
    fn multi_search_has_one_sub_search_per_id_group() {
        let query = SearchQuery {
            text: "game".to_string(),
            filters: QueryFilters {
                channel_id: None,
                video_ids: (0..7).map(|index| format!("id-{index}")).collect(),
            },
        };
        let body = multi_search_body("transcripts", &query, &SearchOptions::default());
        let searches = body.pointer("/searches").and_then(Value::as_array).unwrap();

        assert_eq!(searches.len(), 5);
        assert_eq!(
            searches[0],
            json!({
                "collection": "transcripts",
                "q": "\"game\"",
                "query_by": "transcript",
                "filter_by": "video_id:=[`id-0`,`id-1`]",
            })
        );
        assert_eq!(searches[4]["filter_by"], "video_id:=[`id-6`]");
    }

    #[test]
    fn multi_search_combines_channel_and_id_filters() {
        let query = SearchQuery {
            text: "game".to_string(),
            filters: QueryFilters {
                channel_id: Some("UC1".to_string()),
                video_ids: vec!["a".to_string()],
            },
        };
        let body = multi_search_body("transcripts", &query, &SearchOptions::default());
        assert_eq!(
            body["searches"][0]["filter_by"],
            "video_id:=[`a`] && channel_id:=`UC1`"
        );
    }

    fn hit(id: &str, highlight: Value) -> Value {
        json!({
            "document": {
                "id": id,
                "video_id": id,
                "title": "Intro to algorithms",
                "channel_id": "UC123",
                "channel_name": "CS Channel",
                "duration": 900,
                "upload_date": 20230412,
                "transcript": ["he said dynamic", "programming is cool"],
                "timestamps": [0, 3]
            },
            "highlight": highlight
        })
    }

    #[test]
    fn search_result_attaches_hints_per_sentence() {
        let body = json!({
            "hits": [hit("abc", json!({
                "transcript": [
                    {"matched_tokens": ["dynamic"], "snippet": "he said dynamic"},
                    {"matched_tokens": ["programming"], "snippet": "programming is cool"}
                ]
            }))]
        });

        let documents = parse_search_result(&body).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(
            documents[0].matched_tokens,
            Some(vec![vec!["dynamic".to_string()], vec!["programming".to_string()]])
        );
        assert_eq!(documents[0].timestamps, vec![0, 3]);
    }

    #[test]
    fn hits_without_highlight_have_no_hints() {
        let body = json!({ "hits": [hit("abc", Value::Null)] });
        let documents = parse_search_result(&body).unwrap();
        assert_eq!(documents[0].matched_tokens, None);
    }

    #[test]
    fn malformed_documents_are_skipped() {
        let body = json!({
            "hits": [
                {"document": {"id": "broken"}},
                hit("ok", Value::Null)
            ]
        });
        let documents = parse_search_result(&body).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "ok");
    }

    #[test]
    fn sub_search_errors_are_backend_errors() {
        let body = json!({"code": 400, "error": "Could not find a field named `video_id`"});
        assert!(matches!(
            parse_search_result(&body),
            Err(SearchError::BackendResponse { .. })
        ));
    }

    #[test]
    fn import_response_counts_successes_and_failures() {
        let body = "{\"success\":true}\n{\"success\":false,\"error\":\"bad\"}\n{\"success\":true}\n";
        let summary = parse_import_response(body).unwrap();
        assert_eq!(summary, ImportSummary { successes: 2, failures: 1 });
    }

    #[test]
    fn filters_quote_ids() {
        assert_eq!(channel_filter("UC-1"), "channel_id:=`UC-1`");
        assert_eq!(
            video_id_filter(&["a".to_string(), "b".to_string()]),
            "video_id:=[`a`,`b`]"
        );
    }

    #[test]
    fn store_builds_urls_from_config() {
        let store = TypesenseStore::new(TypesenseConfig {
            host: "search.example.com".to_string(),
            port: 443,
            protocol: "https".to_string(),
            ..TypesenseConfig::default()
        })
        .unwrap();

        let url = store.url("/collections/transcripts").unwrap();
        assert_eq!(url.as_str(), "https://search.example.com/collections/transcripts");
        assert_eq!(store.collection(), "transcripts");
    }
}
