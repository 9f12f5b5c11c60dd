//! HTTP 后端：通过 reqwest 调用对话服务
//!
//! 对话类请求与健康探测使用两个 Client，各自带超时；超时、连接失败、非 2xx、响应体无法解析
//! 都归为 TransportError。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::backend::{
    ChatBackend, ChatReply, ChatRequest, HealthReport, HistoryReply, TransportError,
};

/// 基于 reqwest 的后端实现
pub struct HttpBackend {
    base_url: String,
    client: Client,
    health_client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, request_timeout_secs: u64, health_timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(request_timeout_secs),
            health_client: build_client(health_timeout_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 在 base_url 后追加路径段；会话 ID 作为单独一段，其中的 `/`、`?`、`#` 会被百分号编码
    fn conversation_url(
        &self,
        prefix: &[&str],
        conversation_id: &str,
    ) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| TransportError::Network(format!("invalid base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| TransportError::Network(format!("invalid base url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(prefix)
            .push(conversation_id);
        Ok(url)
    }
}

fn build_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_decode() {
        TransportError::Malformed(e.to_string())
    } else if let Some(status) = e.status() {
        TransportError::Status(status.as_u16())
    } else {
        TransportError::Network(e.to_string())
    }
}

/// 检查状态码后把响应体解析为 T；读取失败与解析失败分开归类
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, TransportError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
    }
    let body = resp.text().await.map_err(map_reqwest_error)?;
    serde_json::from_str(&body).map_err(|e| TransportError::Malformed(e.to_string()))
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        let resp = self
            .client
            .post(self.url("/chat"))
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(resp).await
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), TransportError> {
        let resp = self
            .client
            .delete(self.conversation_url(&["chat", "clear"], conversation_id)?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(())
    }

    async fn history(&self, conversation_id: &str) -> Result<HistoryReply, TransportError> {
        let resp = self
            .client
            .get(self.conversation_url(&["chat", "history"], conversation_id)?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(resp).await
    }

    async fn health(&self) -> Result<HealthReport, TransportError> {
        let resp = self
            .health_client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new("http://localhost:8000/", 60, 5);
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(backend.url("/health"), "http://localhost:8000/health");
    }

    #[test]
    fn test_conversation_id_is_one_path_segment() {
        let backend = HttpBackend::new("http://localhost:8000/", 60, 5);
        let url = backend
            .conversation_url(&["chat", "clear"], "a/b?c#d")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/chat/clear/a%2Fb%3Fc%23d"
        );

        let prefixed = HttpBackend::new("http://localhost:8000/api", 60, 5);
        let url = prefixed
            .conversation_url(&["chat", "history"], "abc123")
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/chat/history/abc123");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        // 绑定后立即释放端口，保证无人监听
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(&format!("http://{}", addr), 2, 2);
        let err = backend.health().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Network(_) | TransportError::Timeout
        ));
    }
}
