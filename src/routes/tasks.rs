use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;

use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{parse_task_id, TaskInput, TaskQuery, TaskUpdate},
    state::AppState,
};

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

/// Retrieves the authenticated user's tasks, newest first.
///
/// ## Query Parameters:
/// - `status` (optional): `Pending`, `In Progress` or `Complete`.
/// - `type` (optional): `Task`, `Incident`, `Bug`, `Feature` or `Maintenance`.
///
/// ## Responses:
/// - `200 OK`: JSON array of tasks (empty when none match).
/// - `400 Bad Request`: Unknown filter value.
/// - `401 Unauthorized`: Missing or invalid bearer token.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let tasks = state.db.list_tasks(user.id, &query_params).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Request Body:
/// - `title`: Required, must contain a non-whitespace character.
/// - `description` (optional): Defaults to an empty string.
/// - `status` (optional): Defaults to `Pending`.
/// - `type` (optional): Defaults to `Task`.
///
/// ## Responses:
/// - `201 Created`: The stored task.
/// - `400 Bad Request`: Blank title, oversized fields or unknown enum values.
/// - `401 Unauthorized`: Missing or invalid bearer token.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let task = task_data.into_inner().into_task(user.id)?;
    let task = state.db.insert_task(task).await?;
    log::info!("User {} created task {}", user.id, task.id);

    state.metrics.refresh_task_gauges(state.db.as_ref()).await;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves one task. Tasks of other users are reported as not found.
///
/// ## Responses:
/// - `200 OK`: The task.
/// - `400 Bad Request`: The id is not a valid UUID.
/// - `404 Not Found`: No such task for this user.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let id = parse_task_id(&task_id)?;
    let task = state
        .db
        .find_task(user.id, id)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Updates the provided fields of a task. Any status may replace any other;
/// concurrent updates are last-write-wins.
///
/// ## Responses:
/// - `200 OK`: The updated task.
/// - `400 Bad Request`: Bad id, blank title or unknown enum values.
/// - `404 Not Found`: No such task for this user.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<String>,
    task_data: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    let id = parse_task_id(&task_id)?;
    let changes = task_data.into_inner().into_changes()?;

    let task = state
        .db
        .update_task(user.id, id, &changes)
        .await?
        .ok_or_else(task_not_found)?;

    state.metrics.refresh_task_gauges(state.db.as_ref()).await;
    Ok(HttpResponse::Ok().json(task))
}

/// Permanently deletes a task.
///
/// ## Responses:
/// - `200 OK`: `{"message": "Task deleted successfully"}`.
/// - `400 Bad Request`: The id is not a valid UUID.
/// - `404 Not Found`: No such task for this user, including already deleted ones.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let id = parse_task_id(&task_id)?;
    if !state.db.delete_task(user.id, id).await? {
        return Err(task_not_found());
    }
    log::info!("User {} deleted task {}", user.id, id);

    state.metrics.refresh_task_gauges(state.db.as_ref()).await;
    Ok(HttpResponse::Ok().json(json!({ "message": "Task deleted successfully" })))
}
