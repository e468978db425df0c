//! Buffered response and its wire rendition.

use std::io::{self, Write};

use tracing::warn;

/// Content type sent unless a controller overrides it.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Highest brotli quality.
const MAX_QUALITY: u32 = 11;
/// Brotli window size, base-2 logarithm.
const WINDOW_BITS: u32 = 22;
const BUFFER_SIZE: usize = 4096;

/// Response being assembled for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    notices: Vec<String>,
    output: String,
    compression: u32,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Creates a `200` response with the default content type.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: vec![(String::from("Content-Type"), String::from(DEFAULT_CONTENT_TYPE))],
            notices: Vec::new(),
            output: String::new(),
            compression: 0,
        }
    }

    /// Status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Appends a header line. Repeated names are sent repeatedly.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Replaces every header named `name` with a single value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.into()));
    }

    /// First header value named `name`.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Header lines in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Turns the response into a redirect to `url`.
    pub fn redirect(&mut self, url: &str, status: u16) {
        let location = url.replace(['\r', '\n'], "").replace("&amp;", "&");
        self.status = status;
        self.set_header("Location", location);
    }

    /// Body written by the dispatched action.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Replaces the body.
    pub fn set_output(&mut self, output: impl Into<String>) {
        self.output = output.into();
    }

    /// Appends to the body.
    pub fn append_output(&mut self, output: &str) {
        self.output.push_str(output);
    }

    /// Adds markup rendered ahead of the body, such as displayed faults.
    pub fn add_notice(&mut self, html: impl Into<String>) {
        self.notices.push(html.into());
    }

    /// Compression level; `0` disables compression.
    #[must_use]
    pub const fn compression(&self) -> u32 {
        self.compression
    }

    /// Sets the compression level. Levels above the brotli maximum are
    /// capped.
    pub fn set_compression(&mut self, level: u32) {
        self.compression = level.min(MAX_QUALITY);
    }

    /// Produces the bytes to send.
    ///
    /// The body is brotli-compressed when a level is set, the client accepts
    /// `br`, and there is something to compress. A compression failure falls
    /// back to the plain body.
    #[must_use]
    pub fn render(&self, accepts_br: bool) -> Rendered {
        let mut body = self.notices.concat();
        body.push_str(&self.output);
        let mut headers = self.headers.clone();

        if self.compression > 0 && accepts_br && !body.is_empty() {
            match compress(body.as_bytes(), self.compression) {
                Ok(compressed) => {
                    headers.push((String::from("Content-Encoding"), String::from("br")));
                    return Rendered {
                        status: self.status,
                        headers,
                        body: compressed,
                    };
                }
                Err(error) => {
                    warn!(target: "emporium::response", error = %error, "compression failed");
                }
            }
        }

        Rendered {
            status: self.status,
            headers,
            body: body.into_bytes(),
        }
    }
}

fn compress(input: &[u8], quality: u32) -> io::Result<Vec<u8>> {
    let mut writer = brotli::CompressorWriter::new(Vec::new(), BUFFER_SIZE, quality, WINDOW_BITS);
    writer.write_all(input)?;
    Ok(writer.into_inner())
}

/// Final status, headers, and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Status code.
    pub status: u16,
    /// Header lines in order.
    pub headers: Vec<(String, String)>,
    /// Possibly compressed body.
    pub body: Vec<u8>,
}

impl Rendered {
    /// Writes a CGI response: a `Status:` line, the headers, a blank line,
    /// and the body.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn write_cgi<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Status: {} {}", self.status, reason_phrase(self.status))?;
        for (name, value) in &self.headers {
            writeln!(out, "{name}: {value}")?;
        }
        writeln!(out)?;
        out.write_all(&self.body)?;
        out.flush()
    }
}

/// Reason phrase for the status codes the framework produces.
#[must_use]
pub const fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
