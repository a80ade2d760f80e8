use chrono::{DateTime, Utc};
use malkhana::{
    models::{NewStatusEntry, Officer, Role, Station, SubmitPropertyRequest},
    repository::{PostgresRepository, Repository},
    scope::{PropertyQuery, Scope, SearchCategory},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Database pool plus a station name unique to one test, so runs against a shared
/// database never see each other's rows.
struct DbTestContext {
    pool: PgPool,
    station: String,
    officer_email: String,
}

impl DbTestContext {
    /// `None` when `DATABASE_URL` is unset; these tests need a live Postgres.
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping Postgres repository test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        let tag = Uuid::new_v4().simple().to_string();
        let context = DbTestContext {
            pool,
            station: format!("thana {tag}"),
            officer_email: format!("sho-{tag}@police.test"),
        };
        context.create_station(&context.station).await;
        context
            .repository()
            .create_officer(Officer {
                email: context.officer_email.clone(),
                name: "SHO".to_string(),
                role: "station-admin".to_string(),
                station: context.station.clone(),
            })
            .await
            .unwrap()
            .expect("officer created");

        Some(context)
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }

    fn scope(&self) -> Scope {
        Scope::for_caller(Role::Viewer, &self.station)
    }

    async fn create_station(&self, name: &str) {
        self.repository()
            .create_station(Station {
                name: name.to_string(),
                ..Station::default()
            })
            .await
            .unwrap()
            .expect("station created");
    }

    /// Generates a label slot in `station` and completes it. Returns the property id.
    async fn submit(&self, station: &str, fill: SubmitPropertyRequest) -> String {
        let repo = self.repository();
        let qr_id = format!("https://malkhana.test/property/{}", Uuid::new_v4());
        repo.create_qr_slots(station, vec![qr_id.clone()])
            .await
            .unwrap();

        let property_id = Uuid::new_v4().simple().to_string();
        let record = repo
            .submit_property(
                &property_id,
                SubmitPropertyRequest { qr_id, ..fill },
                &self.officer_email,
            )
            .await
            .unwrap()
            .expect("slot completed");
        assert_eq!(record.property_id.as_deref(), Some(property_id.as_str()));
        property_id
    }

    async fn search(&self, category: SearchCategory, value: &str) -> Vec<String> {
        let query = PropertyQuery::search(self.scope(), category, value).unwrap();
        self.repository()
            .query_properties(&query)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|record| record.property_id)
            .collect()
    }
}

// --- Test Data Helpers ---

fn form() -> SubmitPropertyRequest {
    SubmitPropertyRequest {
        qr_id: String::new(),
        fir_number: Some("FIR-12/2024".to_string()),
        offence_category: Some("theft".to_string()),
        investigating_officer: Some("SI Verma".to_string()),
        description: Some("Black mobile phone".to_string()),
        seized_at: None,
        rack_id: None,
        box_id: None,
    }
}

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
}

// --- Search ---

#[tokio::test]
async fn test_seized_on_covers_whole_day_only() {
    let Some(ctx) = DbTestContext::setup().await else { return };

    let last_second = ctx
        .submit(&ctx.station, SubmitPropertyRequest {
            seized_at: Some(at("2024-05-01T23:59:59Z")),
            ..form()
        })
        .await;
    let midnight = ctx
        .submit(&ctx.station, SubmitPropertyRequest {
            seized_at: Some(at("2024-05-01T00:00:00Z")),
            ..form()
        })
        .await;
    let next_day = ctx
        .submit(&ctx.station, SubmitPropertyRequest {
            seized_at: Some(at("2024-05-02T00:00:00Z")),
            ..form()
        })
        .await;

    let found = ctx.search(SearchCategory::SeizedOn, "2024-05-01").await;
    assert_eq!(found.len(), 2);
    assert!(found.contains(&last_second));
    assert!(found.contains(&midnight));
    assert!(!found.contains(&next_day));
}

#[tokio::test]
async fn test_other_offence_is_a_prefix_match() {
    let Some(ctx) = DbTestContext::setup().await else { return };

    let bucket = ctx
        .submit(&ctx.station, SubmitPropertyRequest {
            offence_category: Some("Other - misc".to_string()),
            ..form()
        })
        .await;
    let embedded = ctx
        .submit(&ctx.station, SubmitPropertyRequest {
            offence_category: Some("some other category".to_string()),
            ..form()
        })
        .await;

    assert_eq!(ctx.search(SearchCategory::Offence, "other").await, vec![bucket]);
    // Any other value is a plain substring search.
    let found = ctx.search(SearchCategory::Offence, "other c").await;
    assert_eq!(found, vec![embedded]);
}

#[tokio::test]
async fn test_like_wildcards_in_search_value_are_literal() {
    let Some(ctx) = DbTestContext::setup().await else { return };

    let percent = ctx
        .submit(&ctx.station, SubmitPropertyRequest {
            description: Some("100% cotton bag".to_string()),
            ..form()
        })
        .await;
    ctx.submit(&ctx.station, SubmitPropertyRequest {
        description: Some("1000 rupees".to_string()),
        ..form()
    })
    .await;

    assert_eq!(ctx.search(SearchCategory::Description, "100%").await, vec![percent]);
    assert!(ctx.search(SearchCategory::FirNumber, "_").await.is_empty());
}

// --- Station isolation ---

#[tokio::test]
async fn test_station_scope_hides_other_stations() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let neighbour = format!("{} east", ctx.station);
    ctx.create_station(&neighbour).await;

    let own = ctx.submit(&ctx.station, form()).await;
    let foreign = ctx.submit(&neighbour, form()).await;

    let repo = ctx.repository();
    let listed: Vec<String> = repo
        .query_properties(&PropertyQuery::list(ctx.scope()))
        .await
        .unwrap()
        .into_iter()
        .filter_map(|record| record.property_id)
        .collect();
    assert_eq!(listed, vec![own.clone()]);

    assert_eq!(ctx.search(SearchCategory::FirNumber, "FIR-12").await, vec![own.clone()]);

    let everything = repo
        .query_properties(&PropertyQuery::list(Scope::for_caller(Role::Admin, &ctx.station)))
        .await
        .unwrap();
    let ids: Vec<_> = everything.iter().filter_map(|r| r.property_id.clone()).collect();
    assert!(ids.contains(&own));
    assert!(ids.contains(&foreign));
}

#[tokio::test]
async fn test_stats_are_station_scoped() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let neighbour = format!("{} west", ctx.station);
    ctx.create_station(&neighbour).await;

    ctx.submit(&ctx.station, form()).await;
    ctx.submit(&neighbour, form()).await;
    ctx.repository()
        .create_qr_slots(&ctx.station, vec![format!("https://malkhana.test/property/{}", Uuid::new_v4())])
        .await
        .unwrap();

    let stats = ctx.repository().get_stats(&ctx.scope()).await.unwrap();
    assert_eq!(stats.total_properties, 1);
    assert_eq!(stats.pending_labels, 1);
    assert_eq!(stats.status_entries, 1);
}

// --- Submission and status log ---

#[tokio::test]
async fn test_submit_writes_initial_status_entry() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let property_id = ctx.submit(&ctx.station, form()).await;

    let log = repo.get_status_log(&property_id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, "deposited");
    assert_eq!(log[0].officer_email, ctx.officer_email);

    let record = repo.get_property(&property_id).await.unwrap().unwrap();
    assert_eq!(record.current_status.as_deref(), Some("deposited"));
    assert!(record.submitted_at.is_some());
}

#[tokio::test]
async fn test_submit_is_single_use_per_label() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let property_id = ctx.submit(&ctx.station, form()).await;
    let qr_id = repo.get_property(&property_id).await.unwrap().unwrap().qr_id;

    let second = repo
        .submit_property(
            &Uuid::new_v4().simple().to_string(),
            SubmitPropertyRequest { qr_id, ..form() },
            &ctx.officer_email,
        )
        .await
        .unwrap();
    assert!(second.is_none());
    assert_eq!(repo.get_status_log(&property_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_append_status_mirrors_current_status() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let property_id = ctx.submit(&ctx.station, form()).await;

    let entry = repo
        .append_status(NewStatusEntry {
            property_id: property_id.clone(),
            status: "sent_to_court".to_string(),
            remarks: Some("Sessions court, case 44".to_string()),
            officer_email: ctx.officer_email.clone(),
        })
        .await
        .unwrap();
    assert_eq!(entry.status, "sent_to_court");

    let log = repo.get_status_log(&property_id).await.unwrap();
    let statuses: Vec<_> = log.iter().map(|e| e.status.as_str()).collect();
    assert_eq!(statuses, ["deposited", "sent_to_court"]);

    let record = repo.get_property(&property_id).await.unwrap().unwrap();
    assert_eq!(record.current_status.as_deref(), Some("sent_to_court"));
}

#[tokio::test]
async fn test_status_log_rejects_update_and_delete() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let property_id = ctx.submit(&ctx.station, form()).await;

    let update = sqlx::query("UPDATE status_logs SET remarks = 'x' WHERE property_id = $1")
        .bind(&property_id)
        .execute(&ctx.pool)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM status_logs WHERE property_id = $1")
        .bind(&property_id)
        .execute(&ctx.pool)
        .await;
    assert!(delete.is_err());

    let log = ctx.repository().get_status_log(&property_id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].remarks, None);
}
