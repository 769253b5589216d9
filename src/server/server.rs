use bytes::Bytes;
use chrono_tz::Tz;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::{
    body::{Body, Incoming},
    header::AUTHORIZATION,
    service::Service,
    Method, Request, Response, StatusCode,
};
use serde::Serialize;
use tracing::{debug, error};
use url_escape::decode;

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

use crate::{
    contact::form::ContactForm,
    database::sqlite::SqliteStore,
    session::{
        gate::{AuthState, Redirect, SessionGate},
        store::SessionStore,
    },
    timing::{business_now::business_datetime_now, schedule::Schedule},
};

use super::myresponse::{
    AdminResponse, ContactResponse, Credentials, LoginResponse, RedirectResponse, SlotsResponse,
};

type ServerResult = Result<Response<Full<Bytes>>, hyper::Error>;
type BoxError = Box<dyn std::error::Error + Send + Sync>;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// The Server
///
/// Exposes the slot engine, the contact form composer and the admin session
/// gate as JSON endpoints. The gate is shared by every connection; each
/// request takes the lock only for as long as it needs it.
pub struct Server<S = SqliteStore> {
    gate: Arc<Mutex<SessionGate<S>>>,
    schedule: Arc<Schedule>,
    timezone: Tz,
}

impl<S> Clone for Server<S> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            schedule: self.schedule.clone(),
            timezone: self.timezone,
        }
    }
}

impl<S: SessionStore> Server<S> {
    /// Settles the gate from whatever was persisted before handing it out.
    pub fn setup(mut gate: SessionGate<S>, schedule: Schedule, timezone: Tz) -> Self {
        gate.check_session();
        Self {
            gate: Arc::new(Mutex::new(gate)),
            schedule: Arc::new(schedule),
            timezone,
        }
    }

    /// Parses the query parameters and returns a `hashmap` of key pair values
    /// Returns `None` if the parameters are malformed
    fn parse_params(text: &str) -> Option<HashMap<String, String>> {
        let mut map: HashMap<String, String> = HashMap::new();
        for pairs in text.split('&') {
            let mut iterator = pairs.split('=');
            map.insert(
                iterator.next()?.to_string(),
                decode(iterator.next()?).to_string(),
            );
        }
        Some(map)
    }

    /// The /api/slots API endpoint.
    ///
    /// Requires a `date` parameter. A date that can't be read is not an error,
    /// it just has no slots.
    fn slots(&self, query: Option<&str>) -> ServerResult {
        let Some(params) = query else {
            return Self::bad_request("Parameters not provided. Required date.");
        };

        let Some(map) = Self::parse_params(params) else {
            return Self::bad_request("Malformed Parameters.");
        };

        let Some(date) = map.get("date") else {
            return Self::bad_request("date not provided.");
        };

        let day = self.schedule.slots_for(date);
        Self::ok_data(SlotsResponse::new(date, day))
    }

    /// The /api/contact API endpoint.
    ///
    /// Validates the submitted form and returns both the message ready for
    /// the email delivery service and the record for the contacts API.
    fn contact(&self, body: &[u8]) -> ServerResult {
        let form: ContactForm = match serde_json::from_slice(body) {
            Ok(form) => form,
            Err(_) => return Self::bad_request("Malformed payload."),
        };
        match form.compose(&self.schedule, business_datetime_now(self.timezone)) {
            Ok(email) => Self::ok_data(ContactResponse::new(email, form.payload())),
            Err(err) => Self::bad_request(&err.to_string()),
        }
    }

    /// The /api/login API endpoint.
    fn login(&self, body: &[u8]) -> ServerResult {
        let credentials: Credentials = match serde_json::from_slice(body) {
            Ok(credentials) => credentials,
            Err(_) => return Self::bad_request("Malformed payload."),
        };
        let Ok(mut gate) = self.gate.lock() else {
            return Self::server_error("Session state unavailable.");
        };
        match gate.sign_in(&credentials.username, &credentials.password) {
            Ok(record) => {
                let redirect = Redirect::AdminRoot(gate.admin_path().to_owned());
                Self::ok_data(LoginResponse::new(record, redirect.path()))
            }
            Err(err) => Self::unauthorized(&err.to_string()),
        }
    }

    /// The /api/logout API endpoint. Only the holder of the live token may
    /// end the session.
    fn logout(&self, authorization: Option<&str>) -> ServerResult {
        let Some(token) = Self::bearer_token(authorization) else {
            return Self::unauthorized("Missing bearer token.");
        };
        let Ok(mut gate) = self.gate.lock() else {
            return Self::server_error("Session state unavailable.");
        };
        if !gate.verify_token(token) {
            return Self::unauthorized("Session expired or invalid.");
        }
        let redirect = gate.logout();
        Self::ok_data(RedirectResponse::new(redirect.path()))
    }

    /// The /api/session API endpoint. Re-reads the persisted record so an
    /// expired session is reported as such. Callers without the live token
    /// always see `unauthorized`.
    fn session(&self, authorization: Option<&str>) -> ServerResult {
        let Ok(mut gate) = self.gate.lock() else {
            return Self::server_error("Session state unavailable.");
        };
        let verified = match Self::bearer_token(authorization) {
            Some(token) => gate.verify_token(token),
            None => {
                gate.check_session();
                false
            }
        };
        if !verified {
            return Self::ok_data(AuthState::Unauthorized);
        }
        Self::ok_data(gate.state().clone())
    }

    /// The /api/admin API endpoint. Needs the live session's bearer token.
    fn admin(&self, authorization: Option<&str>) -> ServerResult {
        let Some(token) = Self::bearer_token(authorization) else {
            return Self::unauthorized("Missing bearer token.");
        };
        let Ok(mut gate) = self.gate.lock() else {
            return Self::server_error("Session state unavailable.");
        };
        if !gate.verify_token(token) {
            return Self::unauthorized("Session expired or invalid.");
        }
        match gate.state() {
            AuthState::Authorized { username } => Self::ok_data(AdminResponse::new(
                username.clone(),
                gate.admin_path().to_owned(),
            )),
            _ => Self::unauthorized("Session expired or invalid."),
        }
    }

    fn bearer_token(authorization: Option<&str>) -> Option<&str> {
        authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Collects at most `MAX_BODY_BYTES` of `body` and hands it to `handle`.
    /// Oversized or unreadable bodies are a 400.
    async fn with_body<B, F>(body: B, handle: F) -> ServerResult
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
        F: FnOnce(&[u8]) -> ServerResult,
    {
        match Limited::new(body, MAX_BODY_BYTES).collect().await {
            Ok(collected) => handle(&collected.to_bytes()),
            Err(err) if err.is::<LengthLimitError>() => Self::bad_request("Payload too large."),
            Err(err) => {
                error!("Could not read request body: {}", err);
                Self::bad_request("Could not read request body.")
            }
        }
    }

    async fn route(&self, req: Request<Incoming>) -> ServerResult {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        debug!("{} {}", method, path);

        let authorization = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let authorization = authorization.as_deref();

        match (method, path.as_str()) {
            (Method::GET, "/api/slots") => self.slots(req.uri().query()),
            (Method::GET, "/api/session") => self.session(authorization),
            (Method::GET, "/api/admin") => self.admin(authorization),
            (Method::POST, "/api/contact") => {
                Self::with_body(req.into_body(), |body| self.contact(body)).await
            }
            (Method::POST, "/api/login") => {
                Self::with_body(req.into_body(), |body| self.login(body)).await
            }
            (Method::POST, "/api/logout") => self.logout(authorization),
            _ => Self::not_found(""),
        }
    }

    fn respond(status: StatusCode, body: Bytes) -> ServerResult {
        let mut res = Response::new(Full::new(body));
        *res.status_mut() = status;
        Ok(res)
    }

    fn error_body(message: &str) -> Bytes {
        Bytes::from(serde_json::json!({ "error": message }).to_string())
    }

    /// Return a 200 OK response with the data provided.
    fn ok_data<T: Serialize>(body: T) -> ServerResult {
        match serde_json::to_vec(&body) {
            Ok(data) => Self::respond(StatusCode::OK, Bytes::from(data)),
            Err(err) => {
                error!("Could not serialize response: {}", err);
                Self::server_error("Could not serialize response.")
            }
        }
    }

    /// Return a 500 Internal Server Error response with the message provided.
    fn server_error(message: &str) -> ServerResult {
        Self::respond(StatusCode::INTERNAL_SERVER_ERROR, Self::error_body(message))
    }

    /// Return a 404 Not Found response with the message provided. The message here is optional.
    /// Leave it empty for no message.
    fn not_found(message: &str) -> ServerResult {
        let body = if message.is_empty() {
            Bytes::new()
        } else {
            Self::error_body(message)
        };
        Self::respond(StatusCode::NOT_FOUND, body)
    }

    /// Return a 400 Bad Request response with the message provided.
    fn bad_request(message: &str) -> ServerResult {
        Self::respond(StatusCode::BAD_REQUEST, Self::error_body(message))
    }

    /// Return a 401 Unauthorized response with the message provided.
    fn unauthorized(message: &str) -> ServerResult {
        Self::respond(StatusCode::UNAUTHORIZED, Self::error_body(message))
    }
}

impl<S: SessionStore + Send + 'static> Service<Request<Incoming>> for Server<S> {
    type Response = Response<Full<Bytes>>;
    type Error = hyper::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let server = self.clone();
        Box::pin(async move { server.route(req).await })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::{config::AdminConfig, session::store::MemoryStore};

    fn server() -> Server<MemoryStore> {
        let admin = AdminConfig {
            username: "admin".to_owned(),
            password: "pw".to_owned(),
            path: "backstage".to_owned(),
        };
        Server::setup(
            SessionGate::new(admin, MemoryStore::new()),
            Schedule::standard(),
            chrono_tz::Asia::Dhaka,
        )
    }

    async fn body(res: Response<Full<Bytes>>) -> (StatusCode, Value) {
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[test]
    fn query_parsing() {
        let map = Server::<MemoryStore>::parse_params("date=2024-03-09&x=a%20b").unwrap();
        assert_eq!(map["date"], "2024-03-09");
        assert_eq!(map["x"], "a b");
        assert!(Server::<MemoryStore>::parse_params("date").is_none());
    }

    #[tokio::test]
    async fn slots_endpoint() {
        let server = server();

        let (status, value) = body(server.slots(Some("date=2024-03-09")).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["closed"], json!(false));
        assert_eq!(value["slots"].as_array().unwrap().len(), 12);
        assert_eq!(value["slots"][0], json!("10:00 AM"));

        let (_, value) = body(server.slots(Some("date=2024-03-10")).unwrap()).await;
        assert_eq!(value, json!({ "date": "2024-03-10", "closed": true, "slots": [] }));

        let (status, _) = body(server.slots(None).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = body(server.slots(Some("day=2024-03-10")).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn contact_endpoint() {
        let server = server();
        let form = json!({
            "name": "Rahim",
            "email": "rahim@example.com",
            "message": "Hello",
            "schedule": { "enabled": true, "date": "2024-03-09", "time": "11:00 AM" }
        });
        let (status, value) = body(server.contact(form.to_string().as_bytes()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(value["email"]["message"]
            .as_str()
            .unwrap()
            .ends_with("Time: 11:00 AM\nTimezone: Asia/Dhaka"));
        assert_eq!(value["email"]["from_email"], json!("rahim@example.com"));
        assert_eq!(
            value["contact"],
            json!({ "name": "Rahim", "email": "rahim@example.com", "message": "Hello" })
        );

        let form = json!({
            "name": "Rahim",
            "email": "rahim@example.com",
            "message": "Hello",
            "schedule": { "enabled": true, "date": "2024-03-10", "time": "" }
        });
        let (status, value) = body(server.contact(form.to_string().as_bytes()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            value["error"],
            json!("Please complete the schedule: select a date and a time slot.")
        );

        let (status, _) = body(server.contact(b"not json").unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_admin_logout() {
        let server = server();

        let (_, value) = body(server.session(None).unwrap()).await;
        assert_eq!(value, json!({ "state": "unauthorized" }));

        let bad = json!({ "username": "admin", "password": "wrong" }).to_string();
        let (status, value) = body(server.login(bad.as_bytes()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(value["error"], json!("Invalid username or password"));

        let good = json!({ "username": "admin", "password": "pw" }).to_string();
        let (status, value) = body(server.login(good.as_bytes()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["redirect"], json!("/backstage"));
        let token = value["token"].as_str().unwrap().to_owned();

        let header = format!("Bearer {}", token);
        let (_, value) = body(server.session(Some(&header)).unwrap()).await;
        assert_eq!(value, json!({ "state": "authorized", "username": "admin" }));

        let (status, value) = body(server.admin(Some(&header)).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({ "username": "admin", "admin_path": "backstage" }));

        let (status, _) = body(server.admin(Some("Bearer forged")).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = body(server.admin(None).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, value) = body(server.logout(Some(&header)).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({ "redirect": "/" }));
        let (status, _) = body(server.admin(Some(&header)).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (_, value) = body(server.session(Some(&header)).unwrap()).await;
        assert_eq!(value, json!({ "state": "unauthorized" }));
    }

    #[tokio::test]
    async fn callers_without_the_token_cannot_touch_the_session() {
        let server = server();
        let good = json!({ "username": "admin", "password": "pw" }).to_string();
        let (_, value) = body(server.login(good.as_bytes()).unwrap()).await;
        let header = format!("Bearer {}", value["token"].as_str().unwrap());

        for authorization in [None, Some("Bearer forged"), Some("Bearer "), Some("Basic abc")] {
            let (status, value) = body(server.session(authorization).unwrap()).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(value, json!({ "state": "unauthorized" }), "{authorization:?}");

            let (status, _) = body(server.logout(authorization).unwrap()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{authorization:?}");
        }

        // The admin's own session is untouched
        let (status, value) = body(server.admin(Some(&header)).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["username"], json!("admin"));
        let (_, value) = body(server.session(Some(&header)).unwrap()).await;
        assert_eq!(value, json!({ "state": "authorized", "username": "admin" }));
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected() {
        let server = server();

        let big = Full::new(Bytes::from(vec![b'a'; MAX_BODY_BYTES + 1]));
        let res = Server::<MemoryStore>::with_body(big, |_| panic!("handler must not run")).await;
        let (status, value) = body(res.unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], json!("Payload too large."));

        let form = json!({ "name": "Rahim", "email": "rahim@example.com", "message": "Hi" });
        let small = Full::new(Bytes::from(form.to_string()));
        let res = Server::<MemoryStore>::with_body(small, |body| server.contact(body)).await;
        assert_eq!(res.unwrap().status(), StatusCode::OK);
    }
}
