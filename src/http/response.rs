use std::io::{self, Write};
use std::time::SystemTime;

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

/// The wire side of a response.
///
/// [`Response::send`] calls these in order, once per request: the status
/// line, every header, the header terminator, then the body.
pub trait Transport {
    fn write_status_line(&mut self, code: u16) -> io::Result<()>;
    fn write_header(&mut self, name: &str, value: &str) -> io::Result<()>;
    fn end_headers(&mut self) -> io::Result<()>;
    fn write_body(&mut self, body: &[u8]) -> io::Result<()>;
}

/// Encodes a response as HTTP/1.1 bytes into any writer.
pub struct WireWriter<W: Write> {
    inner: W,
}

impl<W: Write> WireWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Transport for WireWriter<W> {
    fn write_status_line(&mut self, code: u16) -> io::Result<()> {
        write!(self.inner, "HTTP/1.1 {} {}\r\n", code, reason_phrase(code))?;
        self.write_header("Date", &httpdate::fmt_http_date(SystemTime::now()))
    }

    fn write_header(&mut self, name: &str, value: &str) -> io::Result<()> {
        write!(self.inner, "{}: {}\r\n", name, value)
    }

    fn end_headers(&mut self) -> io::Result<()> {
        self.inner.write_all(b"\r\n")
    }

    fn write_body(&mut self, body: &[u8]) -> io::Result<()> {
        self.inner.write_all(body)?;
        self.inner.flush()
    }
}

pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        414 => "URI Too Long",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Response builder shared by every stage of a request.
///
/// Headers keep their insertion order on the wire. Setting a header that is
/// already present (names compare case-insensitively) replaces its value in
/// place.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    sent: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Response {
    pub fn new(status: u16) -> Response {
        Response {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            sent: false,
        }
    }

    // Chainable status setter
    pub fn status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        let (name, value) = (name.as_ref(), value.as_ref());
        match self.position(name) {
            Some(index) => self.headers[index].1 = value.to_owned(),
            None => self.headers.push((name.to_owned(), value.to_owned())),
        }
        self
    }

    /// Sets `name` only when no value is present yet.
    pub fn default_header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        if self.position(name.as_ref()).is_none() {
            self.headers
                .push((name.as_ref().to_owned(), value.as_ref().to_owned()));
        }
        self
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self
    }

    pub fn data<B: AsRef<[u8]>>(&mut self, content: B) -> &mut Self {
        self.body.extend_from_slice(content.as_ref());
        self
    }

    pub fn html<T: AsRef<str>>(&mut self, text: T) -> &mut Self {
        self.data(text.as_ref()).default_header("Content-Type", HTML)
    }

    pub fn text<T: AsRef<str>>(&mut self, text: T) -> &mut Self {
        self.data(text.as_ref()).default_header("Content-Type", TEXT)
    }

    /// Drops the body along with the headers that describe it.
    pub fn reset_body(&mut self) -> &mut Self {
        self.body.clear();
        self.remove_header("Content-Type")
            .remove_header("Content-Length")
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.headers[index].1.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Writes the response through `transport`.
    ///
    /// Only the first call reaches the wire. `Content-Type` and
    /// `Content-Length` are filled in when no stage set them.
    pub fn send(&mut self, transport: &mut dyn Transport) -> io::Result<()> {
        if self.sent {
            return Ok(());
        }
        self.sent = true;

        let length = self.body.len().to_string();
        self.default_header("Content-Type", HTML)
            .default_header("Content-Length", length);

        transport.write_status_line(self.status)?;
        for (name, value) in &self.headers {
            transport.write_header(name, value)?;
        }
        transport.end_headers()?;
        transport.write_body(&self.body)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Transport for Recorder {
        fn write_status_line(&mut self, code: u16) -> io::Result<()> {
            self.calls.push(format!("status {}", code));
            Ok(())
        }

        fn write_header(&mut self, name: &str, value: &str) -> io::Result<()> {
            self.calls.push(format!("{}: {}", name, value));
            Ok(())
        }

        fn end_headers(&mut self) -> io::Result<()> {
            self.calls.push("end".to_string());
            Ok(())
        }

        fn write_body(&mut self, body: &[u8]) -> io::Result<()> {
            self.calls.push(format!("body {}", String::from_utf8_lossy(body)));
            Ok(())
        }
    }

    #[test]
    fn send_writes_in_order_with_defaults() {
        let mut response = Response::default();
        response.header("X-Server-Type", "test").html("<h1>Hi</h1>");

        let mut recorder = Recorder::default();
        response.send(&mut recorder).unwrap();

        assert_eq!(
            recorder.calls,
            vec![
                "status 200",
                "X-Server-Type: test",
                "Content-Type: text/html; charset=utf-8",
                "Content-Length: 11",
                "end",
                "body <h1>Hi</h1>",
            ]
        );
    }

    #[test]
    fn send_happens_once() {
        let mut response = Response::default();
        let mut recorder = Recorder::default();
        response.send(&mut recorder).unwrap();
        response.status(500).html("late");
        response.send(&mut recorder).unwrap();

        assert_eq!(recorder.calls.iter().filter(|c| c.starts_with("status")).count(), 1);
        assert!(response.is_sent());
    }

    #[test]
    fn explicit_content_headers_win() {
        let mut response = Response::default();
        response
            .header("content-type", "application/json")
            .header("Content-Length", "99")
            .data("{}");

        let mut recorder = Recorder::default();
        response.send(&mut recorder).unwrap();

        assert!(recorder.calls.contains(&"content-type: application/json".to_string()));
        assert!(recorder.calls.contains(&"Content-Length: 99".to_string()));
        assert!(!recorder.calls.iter().any(|c| c.starts_with("Content-Type")));
    }

    #[test]
    fn header_replaces_in_place() {
        let mut response = Response::default();
        response.header("A", "1").header("B", "2").header("a", "3");
        assert_eq!(
            response.headers(),
            &[("A".to_string(), "3".to_string()), ("B".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn html_appends_body() {
        let mut response = Response::default();
        response.html("<p>a</p>").html("<p>b</p>");
        assert_eq!(response.body(), b"<p>a</p><p>b</p>");
        assert_eq!(response.get_header("Content-Type"), Some(HTML));
    }

    #[test]
    fn reset_body_clears_content_headers() {
        let mut response = Response::default();
        response.header("X-Keep", "1").text("partial");
        response.reset_body();
        assert!(response.body().is_empty());
        assert_eq!(response.get_header("Content-Type"), None);
        assert_eq!(response.get_header("X-Keep"), Some("1"));
    }

    #[test]
    fn wire_writer_encodes_http() {
        let mut response = Response::new(404);
        response.html("nope");
        let mut writer = WireWriter::new(Vec::new());
        response.send(&mut writer).unwrap();

        let wire = String::from_utf8(writer.into_inner()).unwrap();
        assert!(wire.starts_with("HTTP/1.1 404 Not Found\r\nDate: "));
        assert!(wire.contains("Content-Length: 4\r\n"));
        assert!(wire.ends_with("\r\n\r\nnope"));
    }
}
