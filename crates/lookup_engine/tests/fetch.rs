mod common;

use std::time::Duration;

use common::{config, CREDENTIAL, LOGIN_PAGE, NOT_FOUND_PAGE, RECORD_PAGE};
use lookup_core::FailureReason;
use lookup_engine::{
    validate_session, FetchError, FetchSettings, Fetcher, ReqwestFetcher, SessionCheck,
    SESSION_PROBE_IDENTIFIER,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOOKUP_PATH: &str = "/VehicleInfo/retrieveLimitedVehicleInformation.action";

fn fetcher_for(server: &MockServer) -> ReqwestFetcher {
    let endpoint = format!("{}{}", server.uri(), LOOKUP_PATH);
    ReqwestFetcher::new(FetchSettings::with_endpoint(endpoint)).expect("client builds")
}

async fn serve(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(LOOKUP_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn record_page_becomes_vehicle_record() {
    common::init_logging();
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_raw(RECORD_PAGE, "text/html; charset=utf-8"),
    )
    .await;

    let record = fetcher_for(&server)
        .fetch("ABC-1234", &config(1, 2.0))
        .await
        .expect("record");

    assert_eq!(record.vehicle_number, "ABC-1234");
    assert_eq!(record.report_date, "2024-05-01 10:22");
    assert_eq!(record.name_of_ownership, "JOHN DOE");
    assert_eq!(record.engine_number, "2NZ-1234567");
    assert_eq!(record.vehicle_class, "MOTOR CAR");
    assert_eq!(record.make, "TOYOTA");
    assert_eq!(record.model, "AXIO");
    assert_eq!(record.year_of_manufacture, "2012");
}

#[tokio::test]
async fn request_carries_form_fields_and_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOOKUP_PATH))
        .and(header("cookie", format!("JSESSIONID={CREDENTIAL}").as_str()))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("nicNumber=2200000000"))
        .and(body_string_contains("contactNumber=0777777777"))
        .and(body_string_contains("vehicleRegistrationNumber=ABC-1234"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(RECORD_PAGE, "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher_for(&server).fetch("ABC-1234", &config(1, 2.0)).await;
    assert!(result.is_ok(), "unexpected failure: {result:?}");
}

#[tokio::test]
async fn unauthorized_status_is_session_invalid() {
    let server = MockServer::start().await;
    serve(&server, ResponseTemplate::new(401)).await;

    let err = fetcher_for(&server)
        .fetch("ABC-1234", &config(1, 2.0))
        .await
        .unwrap_err();
    assert_eq!(err, FailureReason::SessionInvalid);
}

#[tokio::test]
async fn redirect_to_login_is_session_invalid() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(302).insert_header(
            "location",
            format!("{}/VehicleInfo/indexOauth.action", server.uri()).as_str(),
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/VehicleInfo/indexOauth.action"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>welcome</html>", "text/html"))
        .mount(&server)
        .await;

    let err = fetcher_for(&server)
        .fetch("ABC-1234", &config(1, 2.0))
        .await
        .unwrap_err();
    assert_eq!(err, FailureReason::SessionInvalid);
}

#[tokio::test]
async fn login_form_body_is_session_invalid() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_raw(LOGIN_PAGE, "text/html"),
    )
    .await;

    let err = fetcher_for(&server)
        .fetch("ABC-1234", &config(1, 2.0))
        .await
        .unwrap_err();
    assert_eq!(err, FailureReason::SessionInvalid);
}

#[tokio::test]
async fn search_form_again_is_not_found() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_raw(NOT_FOUND_PAGE, "text/html"),
    )
    .await;

    let err = fetcher_for(&server)
        .fetch("ZZZ-9999", &config(1, 2.0))
        .await
        .unwrap_err();
    assert_eq!(err, FailureReason::NotFound);
}

#[tokio::test]
async fn server_error_is_network_error() {
    let server = MockServer::start().await;
    serve(&server, ResponseTemplate::new(500)).await;

    let err = fetcher_for(&server)
        .fetch("ABC-1234", &config(1, 2.0))
        .await
        .unwrap_err();
    assert_eq!(err, FailureReason::network("http status 500"));
}

#[tokio::test]
async fn unexpected_body_is_parse_error() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_raw(r#"{"error": true}"#, "application/json"),
    )
    .await;

    let err = fetcher_for(&server)
        .fetch("ABC-1234", &config(1, 2.0))
        .await
        .unwrap_err();
    assert!(matches!(err, FailureReason::ParseError { .. }), "{err:?}");
}

#[tokio::test]
async fn slow_response_times_out_as_network_error() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200)
            .set_body_raw(RECORD_PAGE, "text/html")
            .set_delay(Duration::from_millis(500)),
    )
    .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(100),
        ..FetchSettings::with_endpoint(format!("{}{}", server.uri(), LOOKUP_PATH))
    };
    let fetcher = ReqwestFetcher::new(settings).expect("client builds");

    let err = fetcher.fetch("ABC-1234", &config(1, 2.0)).await.unwrap_err();
    assert!(matches!(err, FailureReason::NetworkError { .. }), "{err:?}");
}

#[tokio::test]
async fn unreachable_host_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let endpoint = format!("http://127.0.0.1:{port}{LOOKUP_PATH}");

    let fetcher = ReqwestFetcher::new(FetchSettings::with_endpoint(endpoint)).unwrap();
    let err = fetcher.fetch("ABC-1234", &config(1, 2.0)).await.unwrap_err();
    assert!(matches!(err, FailureReason::NetworkError { .. }), "{err:?}");
}

#[test]
fn malformed_endpoint_is_rejected_up_front() {
    let err = ReqwestFetcher::new(FetchSettings::with_endpoint("not a url")).unwrap_err();
    assert!(matches!(err, FetchError::InvalidEndpoint { .. }), "{err:?}");
}

#[tokio::test]
async fn session_probe_accepts_not_found_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOOKUP_PATH))
        .and(body_string_contains(format!(
            "vehicleRegistrationNumber={SESSION_PROBE_IDENTIFIER}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_raw(NOT_FOUND_PAGE, "text/html"))
        .mount(&server)
        .await;

    let check = validate_session(&fetcher_for(&server), &config(1, 2.0)).await;
    assert_eq!(check, SessionCheck::Accepted);
}

#[tokio::test]
async fn session_probe_reports_rejection() {
    let server = MockServer::start().await;
    serve(&server, ResponseTemplate::new(403)).await;

    let check = validate_session(&fetcher_for(&server), &config(1, 2.0)).await;
    assert_eq!(check, SessionCheck::Rejected);
}

#[tokio::test]
async fn session_probe_reports_unreachable_service() {
    let server = MockServer::start().await;
    serve(&server, ResponseTemplate::new(503)).await;

    let check = validate_session(&fetcher_for(&server), &config(1, 2.0)).await;
    assert_eq!(
        check,
        SessionCheck::Unreachable("network error: http status 503".to_string())
    );
}
