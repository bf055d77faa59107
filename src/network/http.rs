use agent_core::http::{HttpClient, HttpResponse};
use agent_core::OtaError;
use embedded_svc::http::client::Client;
use esp_idf_svc::http::client::{Configuration as HttpConfig, EspHttpConnection};
use esp_idf_svc::io::Read;
use std::time::Duration;

const READ_CHUNK: usize = 1024;

/// Blocking HTTPS GET over the ESP-IDF client with the certificate bundle
/// attached. A fresh connection is opened per request.
pub struct EspHttpClient {
    timeout: Duration,
}

impl EspHttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn transport<E: std::fmt::Debug>(context: &str) -> impl FnOnce(E) -> OtaError + '_ {
        move |e| OtaError::Transport(format!("{}: {:?}", context, e))
    }
}

impl HttpClient for EspHttpClient {
    fn get(&mut self, url: &str, max_body: usize) -> Result<HttpResponse, OtaError> {
        let config = HttpConfig {
            buffer_size: Some(4096),
            timeout: Some(self.timeout),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };

        let connection = EspHttpConnection::new(&config).map_err(Self::transport("connect"))?;
        let mut client = Client::wrap(connection);
        let request = client.get(url).map_err(Self::transport("request"))?;
        let mut response = request.submit().map_err(Self::transport("submit"))?;
        let status = response.status();
        log::debug!("GET {} -> {}", url, status);

        let mut body = Vec::new();
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let bytes_read = response.read(&mut buf).map_err(Self::transport("read"))?;
            if bytes_read == 0 {
                break;
            }
            if body.len() + bytes_read > max_body {
                return Err(OtaError::InvalidSize(body.len() + bytes_read));
            }
            body.extend_from_slice(&buf[..bytes_read]);
        }

        Ok(HttpResponse { status, body })
    }
}
