pub(crate) mod codec;

#[cfg(feature = "fuzzing")]
pub mod fuzzing {
    /// Exercise the request-line splitter on arbitrary input.
    pub fn parse_request_line(line: &str) {
        let _ = super::codec::RequestLine::parse(line);
    }

    /// Exercise the forward-request header filter on arbitrary input.
    pub fn accumulate_client_header(line: &str) {
        let mut forward = super::codec::ForwardRequest::new("fuzz.invalid", "/");
        let _ = forward.push_client_line(line);
    }
}
