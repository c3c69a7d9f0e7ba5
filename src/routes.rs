use axum::{
    extract::Extension,
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use mongodb::Database;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::controllers::{
    booking_controller::*, home_controller, movie_controller::*, show_controller::*,
    theatre_controller::*,
};

pub fn create_router(db: Database, allowed_origin: HeaderValue) -> Router {
    Router::new()
        .route("/", get(home_controller::index))
        .route("/movies", get(load_movies).post(add_movie))
        .route(
            "/movies/:id",
            get(load_movie).patch(update_movie).delete(delete_movie),
        )
        .route("/movies/:id/theatres", get(load_theatres_by_movie))
        .route("/theatres", get(load_theatres).post(add_theatre))
        .route("/theatres/owner/:owner_id", get(load_theatres_by_owner))
        .route("/theatres/:id", patch(update_theatre).delete(delete_theatre))
        .route("/theatres/:id/shows", get(load_shows_by_theatre))
        .route("/shows", post(add_show))
        .route("/shows/:id", get(load_show).delete(delete_show))
        .route("/shows/:id/seat-map", get(load_seat_map))
        .route("/bookings", post(book_show))
        .route("/users/:id/bookings", get(load_user_bookings))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_origin(allowed_origin)
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use mongodb::{
        bson::oid::ObjectId,
        options::{ClientOptions, ServerAddress},
        Client,
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    // Nothing listens on this address. Every request below fails before the
    // handler touches the database.
    fn app() -> Router {
        let options = ClientOptions::builder()
            .hosts(vec![ServerAddress::parse("127.0.0.1:1").unwrap()])
            .server_selection_timeout(Duration::from_millis(200))
            .build();
        let client = Client::with_options(options).unwrap();
        create_router(
            client.database("showtime-test"),
            HeaderValue::from_static("http://localhost:3000"),
        )
    }

    async fn body_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn get_json(uri: &str) -> Value {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }

    async fn post_json(uri: &str, body: String) -> Value {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }

    #[tokio::test]
    async fn index_reports_service() {
        let json = get_json("/").await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["service"], env!("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn invalid_show_id_is_a_failed_envelope() {
        let json = get_json("/shows/not-an-id").await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Invalid show id");
    }

    #[tokio::test]
    async fn past_show_is_rejected() {
        let body = json!({
            "name": "Matinee",
            "date": "2001-01-01",
            "time": "14:30",
            "movie": ObjectId::new().to_hex(),
            "theatre": ObjectId::new().to_hex(),
            "totalSeats": 120,
            "seatConfiguration": {
                "economy": { "start": 1, "end": 60 },
                "middle": { "start": 61, "end": 100 },
                "premium": { "start": 101, "end": 120 }
            },
            "tierPrices": { "economy": 150.0, "middle": 250.0, "premium": 400.0 }
        });

        let json = post_json("/shows", body.to_string()).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Show date must be in the future");
    }

    #[tokio::test]
    async fn booking_without_seats_is_rejected() {
        let body = json!({
            "show": ObjectId::new().to_hex(),
            "user": ObjectId::new().to_hex(),
            "seats": [],
            "paymentRef": "cs_test_123"
        });

        let json = post_json("/bookings", body.to_string()).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Select at least one seat");
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let json = post_json("/bookings", "{\"show\": ".to_string()).await;
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn invalid_day_filter_is_rejected() {
        let uri = format!("/movies/{}/theatres?date=tomorrow", ObjectId::new().to_hex());
        let json = get_json(&uri).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Invalid date 'tomorrow', expected YYYY-MM-DD");
    }

    #[tokio::test]
    async fn invalid_seat_selection_is_rejected() {
        let uri = format!("/shows/{}/seat-map?selected=4,x", ObjectId::new().to_hex());
        let json = get_json(&uri).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Invalid seat number 'x'");
    }

    #[tokio::test]
    async fn non_numeric_toggle_is_rejected() {
        let uri = format!("/shows/{}/seat-map?toggle=abc", ObjectId::new().to_hex());
        let json = get_json(&uri).await;
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn oversized_show_is_rejected() {
        let body = json!({
            "name": "Stadium",
            "date": "2999-01-01",
            "time": "20:00",
            "movie": ObjectId::new().to_hex(),
            "theatre": ObjectId::new().to_hex(),
            "totalSeats": 4294967294_u32,
            "seatConfiguration": {
                "economy": { "start": 1, "end": 4294967292_u32 },
                "middle": { "start": 4294967293_u32, "end": 4294967293_u32 },
                "premium": { "start": 4294967294_u32, "end": 4294967294_u32 }
            },
            "tierPrices": { "economy": 1.0, "middle": 2.0, "premium": 3.0 }
        });

        let json = post_json("/shows", body.to_string()).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Total seats cannot exceed 1000");
    }
}
