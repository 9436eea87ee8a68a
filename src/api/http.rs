use super::wire::{Envelope, RoundRequest, SearchRequest, SummaryBody};
use super::{ApiError, ApiResult, SankhyaApi};
use crate::model::{RoundResult, RunConfig, Summary, WorkflowParameters};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

const VERIFY: &str = "verificar_conexoes";
const SEARCH: &str = "buscar_planejamentos";
const PROCESS_ROUND: &str = "processar_rodada";
const SUMMARY: &str = "resumo";
const FINALIZE: &str = "finalizar_conexoes";

#[derive(Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(cfg: &RunConfig) -> Result<Self> {
        let mut raw = cfg.base_url.trim().to_string();
        // Url::join drops the last segment unless the base ends with a slash.
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw).with_context(|| format!("invalid base URL {raw:?}"))?;
        let http = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .context("build http client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> ApiResult<Url> {
        self.base_url
            .join(name)
            .map_err(|e| ApiError::InvalidRequest(format!("{name}: {e}")))
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> ApiResult<T> {
        // The backend reports failures in-band, so the body is parsed whatever the status.
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { status, source })
    }

    async fn post_envelope<B: serde::Serialize + ?Sized>(
        &self,
        name: &str,
        body: Option<&B>,
    ) -> ApiResult<Envelope> {
        let url = self.endpoint(name)?;
        tracing::debug!(%url, "POST");
        let req = self.http.post(url);
        let req = match body {
            Some(b) => req.json(b),
            None => req.header(reqwest::header::CONTENT_TYPE, "application/json"),
        };
        let resp = req.send().await?;
        Self::read_json(resp).await
    }
}

#[async_trait]
impl SankhyaApi for HttpBackend {
    async fn verify_connections(&self) -> ApiResult<String> {
        let env = self.post_envelope::<()>(VERIFY, None).await?;
        if env.sucesso {
            Ok(env.mensagem.unwrap_or_else(|| "connections established".into()))
        } else {
            Err(ApiError::Backend(env.error_text()))
        }
    }

    async fn search_plans(&self, params: &WorkflowParameters) -> ApiResult<u64> {
        let body = SearchRequest::from(params);
        let env = self.post_envelope(SEARCH, Some(&body)).await?;
        if env.sucesso {
            Ok(env.total.unwrap_or(0))
        } else {
            Err(ApiError::Backend(env.error_text()))
        }
    }

    async fn process_round(
        &self,
        params: &WorkflowParameters,
        round: u32,
    ) -> ApiResult<RoundResult> {
        let body = RoundRequest {
            data_planejamento: params.planning_date_str(),
            braco: params.branch(),
            rodada: round,
        };
        let env = self.post_envelope(PROCESS_ROUND, Some(&body)).await?;
        Ok(env.into())
    }

    async fn fetch_summary(&self) -> ApiResult<Summary> {
        let url = self.endpoint(SUMMARY)?;
        tracing::debug!(%url, "GET");
        let resp = self.http.get(url).send().await?;
        let body: SummaryBody = Self::read_json(resp).await?;
        Ok(body.into())
    }

    async fn finalize_connections(&self) -> ApiResult<()> {
        let url = self.endpoint(FINALIZE)?;
        tracing::debug!(%url, "POST");
        self.http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlanQuery;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    type Seen = Arc<Mutex<Vec<(String, String)>>>;

    /// Minimal HTTP/1.1 responder: answers each request from `route` and records
    /// `(request line, body)`.
    async fn serve(route: fn(&str) -> (u16, String)) -> (String, Seen) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                let header_end = loop {
                    let n = sock.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break None;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(i) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        break Some(i + 4);
                    }
                };
                let Some(header_end) = header_end else {
                    continue;
                };
                let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
                let len = head
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                while buf.len() < header_end + len {
                    let n = sock.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                let line = head.lines().next().unwrap_or_default().to_string();
                let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
                let (status, reply) = route(&line);
                seen2.lock().unwrap().push((line, body));
                let resp = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
                    reply.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        (format!("http://{addr}/api/sankhya"), seen)
    }

    fn backend(base_url: String) -> HttpBackend {
        HttpBackend::new(&RunConfig {
            base_url,
            round_delay: Duration::from_millis(0),
            request_timeout: Duration::from_secs(5),
            beacon_grace: Duration::from_millis(300),
            user_agent: "test".into(),
        })
        .unwrap()
    }

    fn params() -> WorkflowParameters {
        WorkflowParameters::try_from(&PlanQuery {
            planning_date: "2024-05-10".into(),
            branch: 1,
            start_round: 2,
            end_round: 3,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn search_posts_json_and_reads_total() {
        let (url, seen) = serve(|line| {
            assert!(line.starts_with("POST /api/sankhya/buscar_planejamentos"));
            (200, r#"{"sucesso": true, "total": 12}"#.into())
        })
        .await;
        let total = backend(url).search_plans(&params()).await.unwrap();
        assert_eq!(total, 12);
        let seen = seen.lock().unwrap();
        let body: serde_json::Value = serde_json::from_str(&seen[0].1).unwrap();
        assert_eq!(body["rodada_inicial"], 2);
        assert_eq!(body["data_planejamento"], "2024-05-10");
    }

    #[tokio::test]
    async fn backend_failure_is_reported_even_on_error_status() {
        let (url, _) = serve(|_| (500, r#"{"sucesso": false, "erro": "Falha na conexão com o banco Oracle"}"#.into())).await;
        let err = backend(url).verify_connections().await.unwrap_err();
        assert!(matches!(err, ApiError::Backend(ref m) if m.contains("Oracle")));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let (url, _) = serve(|_| (502, "<html>bad gateway</html>".into())).await;
        let err = backend(url).process_round(&params(), 2).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { status: 502, .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn summary_is_fetched_with_get() {
        let (url, seen) = serve(|_| {
            (
                200,
                r#"{"total_ops_criadas": 1, "total_falhas": 0, "ops_criadas_sucesso": [{"nuplan": 5, "idiproc": 77}], "detalhes_falhas": []}"#.into(),
            )
        })
        .await;
        let s = backend(url).fetch_summary().await.unwrap();
        assert_eq!(s.success_list[0].created_op_id, 77);
        assert!(seen.lock().unwrap()[0].0.starts_with("GET /api/sankhya/resumo"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = backend(format!("http://{addr}/api/sankhya/"))
            .finalize_connections()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn rejects_unparsable_base_url() {
        let res = HttpBackend::new(&RunConfig {
            base_url: "not a url".into(),
            round_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(1),
            beacon_grace: Duration::ZERO,
            user_agent: "test".into(),
        });
        assert!(res.is_err());
    }
}
