use std::collections::{HashMap, HashSet};

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{sign_login, AuthConfig, AuthorizationLevel};
use crate::balance::{balance_total, compute_balances};
use crate::error::ApiError;
use crate::exchange::{compute_direct_debts, compute_settlements};
use crate::schemas::{
    Balance, ExpenseInput, Participant, ParticipantId, SplitPolicy, Trip, TOLERANCE,
};
use crate::split::resolve_split;
use crate::store::TripStore;
use crate::summary::{filter_by_date_range, share_of, DateRange, TripSummary};

#[derive(Deserialize, Serialize)]
struct NewTripJson {
    name: String,
    #[serde(default)]
    participants: Vec<Participant>,
}

#[derive(Deserialize, Serialize)]
struct SplitPreviewJson {
    amount: f64,
    #[serde(default)]
    policy: SplitPolicy,
    participants: Vec<ParticipantId>,
    #[serde(default)]
    inputs: HashMap<ParticipantId, f64>,
}

#[derive(Deserialize, Serialize)]
struct LoginRequestJson {
    participant_id: ParticipantId,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize, Serialize)]
struct ShareJson {
    participant_id: ParticipantId,
    share: f64,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(list_trips)
        .service(add_trip)
        .service(get_trip)
        .service(add_participant)
        .service(issue_login)
        .service(get_share)
        .service(add_expense)
        .service(replace_expense)
        .service(remove_expense)
        .service(preview_split)
        .service(get_balances)
        .service(get_settlements)
        .service(get_debts)
        .service(get_summary);
}

async fn load_trip(
    store: &dyn TripStore,
    id: &str,
    caller: &AuthorizationLevel,
) -> Result<Trip, ApiError> {
    let trip = store
        .find_trip(id)
        .await?
        .ok_or_else(|| ApiError::trip_not_found(id))?;
    if !caller.can_access(&trip) {
        return Err(ApiError::Forbidden(id.to_string()));
    }
    Ok(trip)
}

fn trip_balances(trip: &Trip) -> Vec<Balance> {
    let balances = compute_balances(&trip.expenses, &trip.roster());
    let drift = balance_total(&balances);
    if drift.abs() >= TOLERANCE {
        tracing::warn!(trip = %trip.id, drift, "balances do not net to zero");
    }
    balances
}

// Expenses may only reference people on the roster. The balance engine
// tolerates strangers, but new data should never introduce them.
fn validate_expense(trip: &Trip, input: &ExpenseInput) -> Result<(), ApiError> {
    if input.title.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "expense title cannot be empty".to_string(),
        ));
    }
    let unknown = std::iter::once(&input.payer)
        .chain(&input.participants)
        .chain(input.inputs.keys())
        .find(|id| !trip.has_participant(id));
    match unknown {
        Some(id) => Err(ApiError::BadRequest(format!(
            "participant \"{id}\" is not part of trip \"{}\"",
            trip.id
        ))),
        None => Ok(()),
    }
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

#[get("/trips")]
async fn list_trips(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
) -> Result<HttpResponse, ApiError> {
    let trips: Vec<Trip> = store
        .list_trips()
        .await?
        .into_iter()
        .filter(|trip| caller.can_access(trip))
        .collect();
    Ok(HttpResponse::Ok().json(trips))
}

#[put("/trips/{id}")]
async fn add_trip(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    id: web::Path<String>,
    json: web::Json<NewTripJson>,
) -> Result<HttpResponse, ApiError> {
    let NewTripJson { name, participants } = json.into_inner();
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("trip name cannot be empty".to_string()));
    }
    let mut seen = HashSet::new();
    if let Some(duplicate) = participants.iter().find(|p| !seen.insert(p.id.as_str())) {
        return Err(ApiError::BadRequest(format!(
            "participant \"{}\" is listed twice",
            duplicate.id
        )));
    }

    let trip = Trip {
        id: id.into_inner(),
        name,
        participants,
        expenses: Vec::new(),
        created_at: Utc::now(),
    };
    // Members can only open trips they belong to.
    if !caller.can_access(&trip) {
        return Err(ApiError::Forbidden(trip.id));
    }

    store.create_trip(trip.clone()).await?;
    tracing::info!(trip = %trip.id, "trip created");
    Ok(HttpResponse::Created().json(trip))
}

#[get("/trips/{id}")]
async fn get_trip(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let trip = load_trip(store.get_ref(), &id, &caller).await?;
    Ok(HttpResponse::Ok().json(trip))
}

#[post("/trips/{id}/participants")]
async fn add_participant(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    id: web::Path<String>,
    participant: web::Json<Participant>,
) -> Result<HttpResponse, ApiError> {
    let trip = load_trip(store.get_ref(), &id, &caller).await?;
    let participant = participant.into_inner();
    if participant.id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "participant id cannot be empty".to_string(),
        ));
    }

    if !store.add_participant(&trip.id, participant.clone()).await? {
        return Err(ApiError::trip_not_found(&trip.id));
    }
    tracing::info!(trip = %trip.id, participant = %participant.id, "participant added");
    Ok(HttpResponse::Created().json(participant))
}

#[post("/trips/{id}/logins")]
async fn issue_login(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    auth: web::Data<AuthConfig>,
    id: web::Path<String>,
    json: web::Json<LoginRequestJson>,
) -> Result<HttpResponse, ApiError> {
    if caller != AuthorizationLevel::Service {
        return Err(ApiError::Forbidden(id.into_inner()));
    }
    let trip = load_trip(store.get_ref(), &id, &caller).await?;
    let request = json.into_inner();
    if !trip.has_participant(&request.participant_id) {
        return Err(ApiError::NotFound {
            entity: "participant",
            id: request.participant_id,
        });
    }

    let issued_at = Utc::now().timestamp().to_string();
    let login = sign_login(
        &request.participant_id,
        request.name.as_deref(),
        &issued_at,
        &auth,
    )
    .ok_or(ApiError::Unauthorized)?;
    tracing::debug!(trip = %trip.id, participant = %login.participant_id, "login issued");
    Ok(HttpResponse::Ok().json(login))
}

#[get("/trips/{id}/participants/{participant_id}/share")]
async fn get_share(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    path: web::Path<(String, String)>,
    range: web::Query<DateRange>,
) -> Result<HttpResponse, ApiError> {
    let (id, participant_id) = path.into_inner();
    let trip = load_trip(store.get_ref(), &id, &caller).await?;
    let expenses = filter_by_date_range(&trip.expenses, range.from, range.to);
    let share = share_of(expenses, &participant_id);
    Ok(HttpResponse::Ok().json(ShareJson {
        participant_id,
        share,
    }))
}

#[post("/trips/{id}/expenses")]
async fn add_expense(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    id: web::Path<String>,
    input: web::Json<ExpenseInput>,
) -> Result<HttpResponse, ApiError> {
    let trip = load_trip(store.get_ref(), &id, &caller).await?;
    let input = input.into_inner();
    validate_expense(&trip, &input)?;

    let expense = input.resolve(Uuid::new_v4().to_string())?;
    if !store.push_expense(&trip.id, expense.clone()).await? {
        return Err(ApiError::trip_not_found(&trip.id));
    }
    tracing::info!(
        trip = %trip.id,
        expense = %expense.id,
        amount = expense.amount,
        "expense added"
    );
    Ok(HttpResponse::Created().json(expense))
}

#[put("/trips/{id}/expenses/{expense_id}")]
async fn replace_expense(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    path: web::Path<(String, String)>,
    input: web::Json<ExpenseInput>,
) -> Result<HttpResponse, ApiError> {
    let (id, expense_id) = path.into_inner();
    let trip = load_trip(store.get_ref(), &id, &caller).await?;
    if !trip.expenses.iter().any(|e| e.id == expense_id) {
        return Err(ApiError::expense_not_found(&expense_id));
    }
    let input = input.into_inner();
    validate_expense(&trip, &input)?;

    let expense = input.resolve(expense_id)?;
    if !store.replace_expense(&trip.id, expense.clone()).await? {
        return Err(ApiError::expense_not_found(&expense.id));
    }
    tracing::info!(trip = %trip.id, expense = %expense.id, "expense replaced");
    Ok(HttpResponse::Ok().json(expense))
}

#[delete("/trips/{id}/expenses/{expense_id}")]
async fn remove_expense(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (id, expense_id) = path.into_inner();
    let trip = load_trip(store.get_ref(), &id, &caller).await?;
    if !store.remove_expense(&trip.id, &expense_id).await? {
        return Err(ApiError::expense_not_found(&expense_id));
    }
    tracing::info!(trip = %trip.id, expense = %expense_id, "expense removed");
    Ok(HttpResponse::NoContent().finish())
}

#[post("/split/preview")]
async fn preview_split(
    _caller: AuthorizationLevel,
    json: web::Json<SplitPreviewJson>,
) -> Result<HttpResponse, ApiError> {
    let preview = json.into_inner();
    let splits = resolve_split(
        preview.amount,
        preview.policy,
        &preview.participants,
        &preview.inputs,
    )?;
    Ok(HttpResponse::Ok().json(splits))
}

#[get("/trips/{id}/balances")]
async fn get_balances(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let trip = load_trip(store.get_ref(), &id, &caller).await?;
    Ok(HttpResponse::Ok().json(trip_balances(&trip)))
}

#[get("/trips/{id}/settlements")]
async fn get_settlements(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let trip = load_trip(store.get_ref(), &id, &caller).await?;
    Ok(HttpResponse::Ok().json(compute_settlements(&trip_balances(&trip))))
}

#[get("/trips/{id}/debts")]
async fn get_debts(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let trip = load_trip(store.get_ref(), &id, &caller).await?;
    Ok(HttpResponse::Ok().json(compute_direct_debts(&trip.expenses)))
}

#[get("/trips/{id}/summary")]
async fn get_summary(
    caller: AuthorizationLevel,
    store: web::Data<dyn TripStore>,
    id: web::Path<String>,
    range: web::Query<DateRange>,
) -> Result<HttpResponse, ApiError> {
    let trip = load_trip(store.get_ref(), &id, &caller).await?;
    Ok(HttpResponse::Ok().json(TripSummary::build(&trip, range.into_inner())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{sign_login, AuthConfig};
    use crate::schemas::{Balance, Expense, Settlement};
    use crate::store::tests::trip;
    use crate::store::MemoryTripStore;
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::json;
    use std::sync::Arc;

    const TOKEN: &str = "service-secret";

    macro_rules! test_app {
        ($store:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::from($store.clone()))
                    .app_data(web::Data::new(AuthConfig::new(TOKEN)))
                    .configure(configure),
            )
            .await
        };
    }

    fn store_with(trips: Vec<Trip>) -> Arc<dyn TripStore> {
        Arc::new(MemoryTripStore::with_trips(trips))
    }

    fn member(id: &str) -> String {
        let login = sign_login(id, None, "1720000000", &AuthConfig::new(TOKEN)).unwrap();
        serde_json::to_string(&login).unwrap()
    }

    fn dinner(amount: f64, payer: &str) -> serde_json::Value {
        json!({
            "title": "Dinner",
            "amount": amount,
            "payer": payer,
            "date": "2024-07-02",
            "category": "food",
            "participants": ["a", "b", "c"],
        })
    }

    #[actix_web::test]
    async fn health_needs_no_credentials() {
        let app = test_app!(store_with(vec![]));
        let req = test::TestRequest::get().uri("/health").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "OK");
    }

    #[actix_web::test]
    async fn credentials_are_required() {
        let app = test_app!(store_with(vec![trip("lisbon", &["a"])]));

        let req = test::TestRequest::get().uri("/trips/lisbon").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/trips/lisbon")
            .insert_header((AUTHORIZATION, "wrong"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/trips/lisbon")
            .insert_header((AUTHORIZATION, member("eve")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/trips/lisbon")
            .insert_header((AUTHORIZATION, member("a")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn create_trip() {
        let store = store_with(vec![]);
        let app = test_app!(store);
        let body = json!({
            "name": "Lisbon",
            "participants": [{"id": "a", "name": "Ana"}, {"id": "b", "name": "Bob"}],
        });

        let req = test::TestRequest::put()
            .uri("/trips/lisbon")
            .insert_header((AUTHORIZATION, TOKEN))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Trip = test::read_body_json(resp).await;
        assert_eq!(created.roster(), vec!["a", "b"]);

        let req = test::TestRequest::put()
            .uri("/trips/lisbon")
            .insert_header((AUTHORIZATION, TOKEN))
            .set_json(&body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        // A member cannot open a trip they are not part of.
        let req = test::TestRequest::put()
            .uri("/trips/porto")
            .insert_header((AUTHORIZATION, member("eve")))
            .set_json(&body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri("/trips/porto")
            .insert_header((AUTHORIZATION, TOKEN))
            .set_json(json!({"name": "Porto", "participants": [{"id": "a", "name": "A"}, {"id": "a", "name": "A"}]}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        assert_eq!(store.list_trips().await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn members_list_only_their_trips() {
        let app = test_app!(store_with(vec![
            trip("lisbon", &["a", "b"]),
            trip("porto", &["b", "c"]),
        ]));
        let req = test::TestRequest::get()
            .uri("/trips")
            .insert_header((AUTHORIZATION, member("a")))
            .to_request();
        let trips: Vec<Trip> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].id, "lisbon");

        let req = test::TestRequest::get()
            .uri("/trips")
            .insert_header((AUTHORIZATION, TOKEN))
            .to_request();
        let trips: Vec<Trip> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(trips.len(), 2);
    }

    #[actix_web::test]
    async fn participants_can_be_added_once() {
        let store = store_with(vec![trip("lisbon", &["a"])]);
        let app = test_app!(store);
        let add = |id: &str| {
            test::TestRequest::post()
                .uri("/trips/lisbon/participants")
                .insert_header((AUTHORIZATION, member("a")))
                .set_json(json!({"id": id, "name": id.to_uppercase()}))
                .to_request()
        };

        assert_eq!(test::call_service(&app, add("b")).await.status(), StatusCode::CREATED);
        assert_eq!(test::call_service(&app, add("b")).await.status(), StatusCode::CONFLICT);
        let trip = store.find_trip("lisbon").await.unwrap().unwrap();
        assert_eq!(trip.roster(), vec!["a", "b"]);
    }

    #[actix_web::test]
    async fn two_dinners_settle_up() {
        let store = store_with(vec![trip("lisbon", &["a", "b", "c"])]);
        let app = test_app!(store);

        for (amount, payer) in [(90.0, "a"), (60.0, "b")] {
            let req = test::TestRequest::post()
                .uri("/trips/lisbon/expenses")
                .insert_header((AUTHORIZATION, member(payer)))
                .set_json(dinner(amount, payer))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let expense: Expense = test::read_body_json(resp).await;
            assert_eq!(expense.splits.len(), 3);
        }

        let req = test::TestRequest::get()
            .uri("/trips/lisbon/balances")
            .insert_header((AUTHORIZATION, member("c")))
            .to_request();
        let balances: Vec<Balance> = test::call_and_read_body_json(&app, req).await;
        let values: Vec<f64> = balances.iter().map(|b| b.balance).collect();
        assert_eq!(values, vec![40.0, 10.0, -50.0]);

        let req = test::TestRequest::get()
            .uri("/trips/lisbon/settlements")
            .insert_header((AUTHORIZATION, member("c")))
            .to_request();
        let settlements: Vec<Settlement> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            settlements,
            vec![
                Settlement {
                    from: "c".to_string(),
                    to: "a".to_string(),
                    amount: 40.0
                },
                Settlement {
                    from: "c".to_string(),
                    to: "b".to_string(),
                    amount: 10.0
                },
            ]
        );

        let req = test::TestRequest::get()
            .uri("/trips/lisbon/debts")
            .insert_header((AUTHORIZATION, TOKEN))
            .to_request();
        let debts: Vec<Settlement> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(debts.len(), 3);

        let req = test::TestRequest::get()
            .uri("/trips/lisbon/summary?from=2024-07-01&to=2024-07-31")
            .insert_header((AUTHORIZATION, TOKEN))
            .to_request();
        let summary: TripSummary = test::call_and_read_body_json(&app, req).await;
        assert_eq!(summary.expense_count, 2);
        assert_eq!(summary.total_spend, 150.0);
        assert_eq!(summary.settlements, settlements);

        let req = test::TestRequest::get()
            .uri("/trips/lisbon/summary?from=2024-08-01")
            .insert_header((AUTHORIZATION, TOKEN))
            .to_request();
        let summary: TripSummary = test::call_and_read_body_json(&app, req).await;
        assert_eq!(summary.expense_count, 0);
        assert!(summary.settlements.is_empty());
    }

    #[actix_web::test]
    async fn invalid_expenses_are_blocked() {
        let store = store_with(vec![trip("lisbon", &["a", "b", "c"])]);
        let app = test_app!(store);
        let post = |body: serde_json::Value| {
            test::TestRequest::post()
                .uri("/trips/lisbon/expenses")
                .insert_header((AUTHORIZATION, TOKEN))
                .set_json(body)
                .to_request()
        };

        let mut exact = dinner(100.0, "a");
        exact["policy"] = json!("exact");
        exact["inputs"] = json!({"a": 40, "b": 40, "c": 15});
        let resp = test::call_service(&app, post(exact)).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("amount mismatch"));

        let mut stranger = dinner(30.0, "a");
        stranger["participants"] = json!(["a", "zed"]);
        assert_eq!(
            test::call_service(&app, post(stranger)).await.status(),
            StatusCode::BAD_REQUEST
        );

        let mut untitled = dinner(30.0, "a");
        untitled["title"] = json!("  ");
        assert_eq!(
            test::call_service(&app, post(untitled)).await.status(),
            StatusCode::BAD_REQUEST
        );

        let mut nobody = dinner(30.0, "a");
        nobody["participants"] = json!([]);
        assert_eq!(
            test::call_service(&app, post(nobody)).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        assert!(store
            .find_trip("lisbon")
            .await
            .unwrap()
            .unwrap()
            .expenses
            .is_empty());
    }

    #[actix_web::test]
    async fn expenses_are_replaced_and_removed() {
        let store = store_with(vec![trip("lisbon", &["a", "b", "c"])]);
        let app = test_app!(store);

        let req = test::TestRequest::post()
            .uri("/trips/lisbon/expenses")
            .insert_header((AUTHORIZATION, TOKEN))
            .set_json(dinner(90.0, "a"))
            .to_request();
        let expense: Expense = test::call_and_read_body_json(&app, req).await;

        let mut edit = dinner(120.0, "b");
        edit["policy"] = json!("shares");
        edit["inputs"] = json!({"a": 2});
        let req = test::TestRequest::put()
            .uri(&format!("/trips/lisbon/expenses/{}", expense.id))
            .insert_header((AUTHORIZATION, TOKEN))
            .set_json(edit)
            .to_request();
        let replaced: Expense = test::call_and_read_body_json(&app, req).await;
        assert_eq!(replaced.id, expense.id);
        let amounts: Vec<f64> = replaced.splits.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![60.0, 30.0, 30.0]);

        let req = test::TestRequest::put()
            .uri("/trips/lisbon/expenses/missing")
            .insert_header((AUTHORIZATION, TOKEN))
            .set_json(dinner(10.0, "a"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let delete = || {
            test::TestRequest::delete()
                .uri(&format!("/trips/lisbon/expenses/{}", expense.id))
                .insert_header((AUTHORIZATION, TOKEN))
                .to_request()
        };
        assert_eq!(test::call_service(&app, delete()).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(test::call_service(&app, delete()).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn issued_logins_grant_member_access() {
        let app = test_app!(store_with(vec![trip("lisbon", &["a", "b"])]));
        let issue = |auth: String, participant: &str| {
            test::TestRequest::post()
                .uri("/trips/lisbon/logins")
                .insert_header((AUTHORIZATION, auth))
                .set_json(json!({"participant_id": participant, "name": "Ana"}))
                .to_request()
        };

        let login: serde_json::Value =
            test::call_and_read_body_json(&app, issue(TOKEN.to_string(), "a")).await;
        let req = test::TestRequest::get()
            .uri("/trips/lisbon")
            .insert_header((AUTHORIZATION, login.to_string()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let resp = test::call_service(&app, issue(member("a"), "b")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let resp = test::call_service(&app, issue(TOKEN.to_string(), "zed")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn my_share() {
        let store = store_with(vec![trip("lisbon", &["a", "b", "c"])]);
        let app = test_app!(store);
        for (amount, payer) in [(90.0, "a"), (60.0, "b")] {
            let req = test::TestRequest::post()
                .uri("/trips/lisbon/expenses")
                .insert_header((AUTHORIZATION, TOKEN))
                .set_json(dinner(amount, payer))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get()
            .uri("/trips/lisbon/participants/c/share")
            .insert_header((AUTHORIZATION, member("c")))
            .to_request();
        let share: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(share, json!({"participant_id": "c", "share": 50.0}));

        let req = test::TestRequest::get()
            .uri("/trips/lisbon/participants/c/share?to=2024-07-01")
            .insert_header((AUTHORIZATION, member("c")))
            .to_request();
        let share: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(share["share"], 0.0);
    }

    #[actix_web::test]
    async fn unknown_trip_is_not_found() {
        let app = test_app!(store_with(vec![]));
        let req = test::TestRequest::get()
            .uri("/trips/nowhere/balances")
            .insert_header((AUTHORIZATION, TOKEN))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Couldn't find the desired trip: nowhere");
    }

    #[actix_web::test]
    async fn split_preview() {
        let app = test_app!(store_with(vec![]));
        let req = test::TestRequest::post()
            .uri("/split/preview")
            .insert_header((AUTHORIZATION, member("anyone")))
            .set_json(json!({
                "amount": 200,
                "policy": "percentage",
                "participants": ["a", "b"],
                "inputs": {"a": 25, "b": 75},
            }))
            .to_request();
        let splits: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            splits,
            json!([
                {"participant_id": "a", "amount": 50.0},
                {"participant_id": "b", "amount": 150.0},
            ])
        );

        let req = test::TestRequest::post()
            .uri("/split/preview")
            .insert_header((AUTHORIZATION, TOKEN))
            .set_json(json!({"amount": 10, "policy": "shares", "participants": ["a"], "inputs": {"a": 0}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
