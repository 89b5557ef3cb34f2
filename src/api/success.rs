use actix_web::{
    body::BoxBody, cookie::Cookie, http::StatusCode, HttpRequest, HttpResponse, Responder,
};
use serde::Serialize;
use std::borrow::Cow;

/// `{ "data": ..., "message": ... }` envelope shared by every handler.
#[derive(Serialize)]
pub struct SuccessData<T: Serialize> {
    pub data: Option<T>,
    pub message: Option<Cow<'static, str>>,
}

pub struct Success<T: Serialize> {
    pub status: StatusCode,
    pub body: Option<SuccessData<T>>,
    pub cookies: Vec<Cookie<'static>>,
}

impl<T: Serialize> Success<T> {
    fn with_body(status: StatusCode, data: Option<T>) -> Self {
        Self { status, body: Some(SuccessData { data, message: None }), cookies: Vec::new() }
    }

    pub fn ok(data: Option<T>) -> Self {
        Self::with_body(StatusCode::OK, data)
    }

    pub fn created(data: Option<T>) -> Self {
        Self::with_body(StatusCode::CREATED, data)
    }

    pub fn no_content() -> Self {
        Self { status: StatusCode::NO_CONTENT, body: None, cookies: Vec::new() }
    }

    /// No-op on bodiless responses.
    pub fn message(mut self, msg: impl Into<Cow<'static, str>>) -> Self {
        if let Some(body) = self.body.as_mut() {
            body.message = Some(msg.into());
        }
        self
    }

    pub fn cookies(mut self, cookies: Vec<Cookie<'static>>) -> Self {
        self.cookies = cookies;
        self
    }
}

impl<T: Serialize> Responder for Success<T> {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        let mut response = HttpResponse::build(self.status);
        self.cookies.into_iter().for_each(|cookie| {
            response.cookie(cookie);
        });

        match self.body {
            Some(body) => response.json(body),
            None => response.finish(),
        }
    }
}
