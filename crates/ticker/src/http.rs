//! GET-JSON transport shared by the price sources.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use ticker_common::{Result, TickerError};
use tracing::debug;

const USER_AGENT: &str = concat!("crypto-ticker/", env!("CARGO_PKG_VERSION"));

/// `TickerError::Upstream` 에 남기는 응답 본문 최대 길이
const MAX_ERROR_BODY: usize = 200;

/// 모든 요청에 `timeout` 이 걸린 HTTP 클라이언트 생성
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| TickerError::Network(format!("failed to create HTTP client: {}", e)))
}

/// GET 한 번 보내고 JSON 본문을 디코딩. 재시도 없음
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    timeout: Duration,
) -> Result<T> {
    debug!("GET {} {:?}", url, query);

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| map_reqwest_error(e, timeout))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| map_reqwest_error(e, timeout))?;

    if !status.is_success() {
        debug!("Upstream {} body: {}", status, body);
        return Err(TickerError::Upstream {
            status: status.as_u16(),
            body: excerpt(&body, MAX_ERROR_BODY),
        });
    }

    Ok(serde_json::from_str(&body)?)
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> TickerError {
    if err.is_timeout() {
        TickerError::Timeout(timeout)
    } else if err.is_decode() {
        TickerError::Decode(err.to_string())
    } else {
        TickerError::Network(err.to_string())
    }
}

/// 공백과 줄바꿈을 한 칸으로 합친 뒤 `max_chars` 에서 자름
fn excerpt(text: &str, max_chars: usize) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match line.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &line[..idx]),
        None => line,
    }
}
