use axum::{Json, extract::Query};

use todotag_types::api::{QueryResponse, SayHelloQuery};

/// GET /queries/say-hello, the schema's custom greeting query.
pub async fn say_hello(Query(query): Query<SayHelloQuery>) -> Json<QueryResponse<String>> {
    let name = query.name.unwrap_or_else(|| "world".to_string());
    Json(QueryResponse {
        data: format!("Hello, {}!", name),
    })
}
