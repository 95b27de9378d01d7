use crate::error::KintreeError;
use crate::http::types::{parse_dob, CreatePersonRequest, RelationRequest, UpdatePersonRequest};
use crate::http::AppState;
use crate::kinship;
use crate::store::{self, PersonInput, PersonPatch};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

type HandlerResult = std::result::Result<Response, KintreeError>;

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// GET / - full dump of persons and relationships
pub async fn home(State(state): State<AppState>) -> HandlerResult {
    let persons = store::list_persons(&state.db).await?;
    let relationships = store::list_relations(&state.db).await?;
    Ok(Json(serde_json::json!({
        "persons": persons,
        "relationships": relationships,
    }))
    .into_response())
}

/// GET /persons
pub async fn list_persons(State(state): State<AppState>) -> HandlerResult {
    let persons = store::list_persons(&state.db).await?;
    Ok(Json(persons).into_response())
}

/// POST /persons
pub async fn create_person(
    State(state): State<AppState>,
    Json(req): Json<CreatePersonRequest>,
) -> HandlerResult {
    let input = PersonInput {
        first_name: req.first_name,
        last_name: req.last_name,
        gender: req.gender,
        dob: parse_dob(&req.dob)?,
    };
    let person = store::insert_person(&state.db, input).await?;
    log::info!("Added person {} {} (id {})", person.first_name, person.last_name, person.id);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": person.id,
            "message": "Person added successfully",
        })),
    )
        .into_response())
}

/// GET /persons/{id}
pub async fn get_person(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult {
    match store::person_by_id(&state.db, id).await? {
        Some(person) => Ok(Json(person).into_response()),
        None => {
            log::warn!("Person with id {} not found", id);
            Err(KintreeError::PersonNotFound(id))
        }
    }
}

/// PUT /persons/{id}
pub async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePersonRequest>,
) -> HandlerResult {
    let dob = match req.dob {
        Some(raw) => Some(parse_dob(&raw)?),
        None => None,
    };
    let patch = PersonPatch {
        first_name: req.first_name,
        last_name: req.last_name,
        gender: req.gender,
        dob,
    };
    store::update_person(&state.db, id, patch).await?;
    log::info!("Updated person id {}", id);
    Ok(Json(serde_json::json!({ "message": "Person updated successfully" })).into_response())
}

/// DELETE /persons/{id} - also removes relationships referencing the person
pub async fn delete_person(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult {
    store::delete_person(&state.db, id).await?;
    log::info!("Deleted person id {}", id);
    Ok(Json(serde_json::json!({ "message": "Person deleted successfully" })).into_response())
}

/// POST /relations
pub async fn create_relation(
    State(state): State<AppState>,
    Json(req): Json<RelationRequest>,
) -> HandlerResult {
    if store::person_by_id(&state.db, req.parent_id).await?.is_none() {
        log::warn!("Parent with id {} not found", req.parent_id);
        return Ok(json_error(StatusCode::NOT_FOUND, "Parent not found"));
    }
    if store::person_by_id(&state.db, req.child_id).await?.is_none() {
        log::warn!("Child with id {} not found", req.child_id);
        return Ok(json_error(StatusCode::NOT_FOUND, "Child not found"));
    }

    let relation = store::insert_relation(&state.db, req.parent_id, req.child_id).await?;
    log::info!(
        "Relation created: parent {}, child {}",
        relation.parent_id,
        relation.child_id
    );
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": relation.id,
            "message": "Relation created successfully",
        })),
    )
        .into_response())
}

/// DELETE /relations
pub async fn delete_relation(
    State(state): State<AppState>,
    Json(req): Json<RelationRequest>,
) -> HandlerResult {
    store::delete_relation(&state.db, req.parent_id, req.child_id).await?;
    log::info!(
        "Relation deleted: parent {}, child {}",
        req.parent_id,
        req.child_id
    );
    Ok(Json(serde_json::json!({ "message": "Relation deleted successfully" })).into_response())
}

/// GET /cousins/{id} - kinship report for a person
pub async fn cousins(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult {
    let report = kinship::resolve_kinship(&state.db, id).await?;
    Ok(Json(report).into_response())
}

/// GET /health
pub async fn health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "kintree",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{migrate, Db};
    use std::path::Path as StdPath;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn setup_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);
        let migrations_dir = StdPath::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();
        (AppState { db: Arc::new(db) }, temp_dir)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn person_request(first: &str) -> CreatePersonRequest {
        CreatePersonRequest {
            first_name: first.to_string(),
            last_name: "Test".to_string(),
            gender: "female".to_string(),
            dob: "1990-06-15".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_person() {
        let (state, _temp) = setup_state().await;

        let response = create_person(State(state.clone()), Json(person_request("Ada")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);

        let response = get_person(State(state), Path(1)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["first_name"], "Ada");
        assert_eq!(body["dob"], "1990-06-15");
    }

    #[tokio::test]
    async fn test_get_person_not_found() {
        let (state, _temp) = setup_state().await;
        let err = get_person(State(state), Path(42)).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Person not found");
    }

    #[tokio::test]
    async fn test_create_person_invalid_dob() {
        let (state, _temp) = setup_state().await;
        let mut req = person_request("Ada");
        req.dob = "15-06-1990".to_string();

        let err = create_person(State(state), Json(req)).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid date format, use YYYY-MM-DD");
    }

    #[tokio::test]
    async fn test_update_person() {
        let (state, _temp) = setup_state().await;
        create_person(State(state.clone()), Json(person_request("Ada")))
            .await
            .unwrap();

        let patch = UpdatePersonRequest {
            last_name: Some("Byron".to_string()),
            ..Default::default()
        };
        let response = update_person(State(state.clone()), Path(1), Json(patch))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = get_person(State(state), Path(1)).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["last_name"], "Byron");
        assert_eq!(body["first_name"], "Ada");
    }

    #[tokio::test]
    async fn test_delete_person() {
        let (state, _temp) = setup_state().await;
        create_person(State(state.clone()), Json(person_request("Ada")))
            .await
            .unwrap();

        let response = delete_person(State(state.clone()), Path(1)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let err = get_person(State(state), Path(1)).await.unwrap_err();
        assert!(matches!(err, KintreeError::PersonNotFound(1)));
    }

    #[tokio::test]
    async fn test_create_relation_missing_endpoints() {
        let (state, _temp) = setup_state().await;
        create_person(State(state.clone()), Json(person_request("Ada")))
            .await
            .unwrap();

        let response = create_relation(
            State(state.clone()),
            Json(RelationRequest {
                parent_id: 99,
                child_id: 1,
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Parent not found");

        let response = create_relation(
            State(state),
            Json(RelationRequest {
                parent_id: 1,
                child_id: 99,
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Child not found");
    }

    #[tokio::test]
    async fn test_duplicate_relation_rejected() {
        let (state, _temp) = setup_state().await;
        create_person(State(state.clone()), Json(person_request("Ada")))
            .await
            .unwrap();
        create_person(State(state.clone()), Json(person_request("Byron")))
            .await
            .unwrap();

        let req = || RelationRequest {
            parent_id: 1,
            child_id: 2,
        };
        let response = create_relation(State(state.clone()), Json(req()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let err = create_relation(State(state), Json(req())).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Relation already exists");
    }

    #[tokio::test]
    async fn test_delete_relation_not_found() {
        let (state, _temp) = setup_state().await;
        let err = delete_relation(
            State(state),
            Json(RelationRequest {
                parent_id: 1,
                child_id: 2,
            }),
        )
        .await
        .unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cousins_report() {
        let (state, _temp) = setup_state().await;
        // a(1) -> b(2), a(1) -> c(3), b(2) -> d(4), c(3) -> e(5)
        for name in ["A", "B", "C", "D", "E"] {
            create_person(State(state.clone()), Json(person_request(name)))
                .await
                .unwrap();
        }
        for (parent_id, child_id) in [(1, 2), (1, 3), (2, 4), (3, 5)] {
            create_relation(
                State(state.clone()),
                Json(RelationRequest {
                    parent_id,
                    child_id,
                }),
            )
            .await
            .unwrap();
        }

        let response = cousins(State(state), Path(4)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["parents"][0]["id"], 2);
        assert_eq!(body["grandparents"][0]["id"], 1);
        assert_eq!(body["aunts_and_uncles"][0]["id"], 3);
        assert_eq!(body["cousins"][0]["id"], 5);
    }

    #[tokio::test]
    async fn test_cousins_unknown_subject() {
        let (state, _temp) = setup_state().await;
        let err = cousins(State(state), Path(9999)).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let response = health().await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["service"], "kintree");
    }
}
