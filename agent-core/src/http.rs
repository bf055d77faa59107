use crate::error::OtaError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Body as text for log output, cut to `max` characters.
    pub fn body_preview(&self, max: usize) -> String {
        String::from_utf8_lossy(&self.body).chars().take(max).collect()
    }
}

/// Blocking HTTP GET with a transport-level timeout.
pub trait HttpClient {
    /// Transport failures map to [`OtaError::Transport`]; a body longer than
    /// `max_body` bytes is abandoned with [`OtaError::InvalidSize`].
    fn get(&mut self, url: &str, max_body: usize) -> Result<HttpResponse, OtaError>;
}

impl<T: HttpClient + ?Sized> HttpClient for &mut T {
    fn get(&mut self, url: &str, max_body: usize) -> Result<HttpResponse, OtaError> {
        (**self).get(url, max_body)
    }
}
