//! One inbound request paired with its outbound response.

use crate::request::Request;
use crate::response::Response;

/// The unit every [`Handler`](crate::Handler) and
/// [`Middleware`](crate::middleware::Middleware) operates on.
///
/// Created by the transport once per request and dropped once the response
/// has been sent. Never shared between requests.
pub struct Exchange {
    request: Request,
    response: Response,
}

impl Exchange {
    pub fn new(request: Request, response: Response) -> Self {
        Self { request, response }
    }

    pub fn request(&self) -> &Request { &self.request }
    pub fn request_mut(&mut self) -> &mut Request { &mut self.request }
    pub fn response(&self) -> &Response { &self.response }
    pub fn response_mut(&mut self) -> &mut Response { &mut self.response }

    pub fn into_parts(self) -> (Request, Response) {
        (self.request, self.response)
    }
}
