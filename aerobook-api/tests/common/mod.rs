#![allow(dead_code)]

use std::collections::HashMap;

use aerobook_api::{app, AppState};
use aerobook_core::{Flight, FlightForm};
use aerobook_store::app_config::{
    AuthConfig, BookingRules, Config, DatabaseConfig, ServerConfig, SessionBackend, SessionConfig,
};
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn flash(&self) -> Option<String> {
        self.json()["flash"]["message"].as_str().map(str::to_string)
    }

    pub fn assert_redirect(&self, to: &str) {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "expected redirect to {}", to);
        assert_eq!(self.location.as_deref(), Some(to));
    }
}

/// One browser: shares the router and storage but keeps its own cookies.
pub struct TestClient {
    router: Router,
    cookies: HashMap<String, String>,
    pub state: AppState,
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig { port: 0 },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        session: SessionConfig {
            backend: SessionBackend::Memory,
            redis_url: None,
            ttl_seconds: 600,
        },
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_seconds: 600,
        },
        booking: BookingRules::default(),
    }
}

impl TestClient {
    pub async fn new() -> Self {
        let state = AppState::from_config(&test_config()).await.unwrap();
        Self {
            router: app(state.clone()),
            cookies: HashMap::new(),
            state,
        }
    }

    pub fn new_visitor(&self) -> Self {
        Self {
            router: self.router.clone(),
            cookies: HashMap::new(),
            state: self.state.clone(),
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::builder().method("GET").uri(uri);
        self.send(request, Body::empty()).await
    }

    pub async fn get_with_header(&mut self, uri: &str, name: &str, value: &str) -> TestResponse {
        let request = Request::builder().method("GET").uri(uri).header(name, value);
        self.send(request, Body::empty()).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = serde_urlencoded::to_string(fields).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request, Body::from(body)).await
    }

    /// Follows a redirect and returns the page it lands on.
    pub async fn follow(&mut self, response: &TestResponse) -> TestResponse {
        let to = response.location.clone().expect("not a redirect");
        self.get(&to).await
    }

    async fn send(&mut self, mut request: axum::http::request::Builder, body: Body) -> TestResponse {
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        }

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let raw = set_cookie.to_str().unwrap();
            let pair = raw.split(';').next().unwrap_or("");
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            if value.is_empty() || raw.contains("Max-Age=0") {
                self.cookies.remove(name.trim());
            } else {
                self.cookies.insert(name.trim().to_string(), value.to_string());
            }
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse { status, location, body }
    }
}

pub async fn seed_flight(state: &AppState, from: &str, to: &str, date: &str, fclass: &str, price: i64) -> Flight {
    let flight = FlightForm {
        city_from: from.into(),
        city_to: to.into(),
        depart_date: date.into(),
        arrival_date: date.into(),
        depart_time: "07:15".into(),
        arrival_time: "10:45".into(),
        fclass: fclass.into(),
        price: price.to_string(),
    }
    .validate()
    .unwrap();

    state.flight_repo.create_flight(&flight).await.unwrap()
}

pub fn passenger_fields(count: usize) -> Vec<(String, String)> {
    let mut fields = vec![
        ("email".to_string(), "traveller@example.com".to_string()),
        ("phone".to_string(), "0123456789".to_string()),
    ];
    for i in 0..count {
        fields.push((format!("title{}", i), "Mx".to_string()));
        fields.push((format!("fname{}", i), format!("First{}", i)));
        fields.push((format!("lname{}", i), format!("Last{}", i)));
        fields.push((format!("nationality{}", i), "Danish".to_string()));
        fields.push((format!("gender{}", i), "Other".to_string()));
    }
    fields
}

pub fn as_pairs(fields: &[(String, String)]) -> Vec<(&str, &str)> {
    fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

/// Drives a one-way search up to the payment page.
pub async fn prepare_one_way(client: &mut TestClient, flight: &Flight, seat: &str) {
    let date = flight.depart_date.to_string();
    let search = client
        .post_form(
            "/",
            &[
                ("cityFrom", flight.city_from.as_str()),
                ("cityTo", flight.city_to.as_str()),
                ("departDate", date.as_str()),
                ("returnDate", ""),
                ("fclass", flight.fclass.as_str()),
                ("passenger_num", "1"),
            ],
        )
        .await;
    search.assert_redirect("/departure");

    client
        .get(&format!("/save_flight/{}", flight.num))
        .await
        .assert_redirect("/personal-details");

    let fields = passenger_fields(1);
    client
        .post_form("/personal-details", &as_pairs(&fields))
        .await
        .assert_redirect("/seat?chosenSeat=NA");

    client
        .get(&format!("/save-seat/{}", seat))
        .await
        .assert_redirect("/meal");
    client.get("/meal/standard").await.assert_redirect("/payment");
}

/// Completes a one-way booking, returning the `/confirmed/...` location.
pub async fn book_one_way(client: &mut TestClient, flight: &Flight, seat: &str) -> String {
    prepare_one_way(client, flight, seat).await;

    let paid = client.post_form("/payment", &[]).await;
    assert_eq!(paid.status, StatusCode::SEE_OTHER);
    paid.location.unwrap()
}
